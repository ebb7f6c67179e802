use axum::{
    extract::{Path, State},
    response::IntoResponse,
    routing::{get, put},
    Json, Router,
};
use serde::Deserialize;
use serde_json::json;
use std::sync::Arc;

use crate::error::{AppError, AppResult};
use crate::middleware::AuthUser;
use crate::models::review::{average_rating, ProfileReview};
use crate::models::watchlist::WatchlistMovie;
use crate::models::PublicUser;
use crate::AppState;

/// Картинка приходит data-URL'ом или ссылкой, больше 1 МБ не принимаем.
const MAX_PROFILE_PIC_LEN: usize = 1024 * 1024;

pub fn routes() -> Router<Arc<AppState>> {
    Router::new()
        .route("/{id}", get(get_profile))
        .route("/{id}/picture", put(update_picture))
}

#[derive(Debug, Deserialize)]
pub struct PictureRequest {
    pub profile_pic: Option<String>,
}

// GET /profile/{id}
async fn get_profile(
    State(state): State<Arc<AppState>>,
    Path(id): Path<i32>,
) -> AppResult<impl IntoResponse> {
    let pool = &state.db.pool;
    let (user, watchlist, reviews) = futures::try_join!(
        PublicUser::find(id, pool),
        WatchlistMovie::for_user(id, pool),
        ProfileReview::for_user(id, pool),
    )?;

    let user = user.ok_or_else(|| AppError::NotFound("User not found".into()))?;
    let average = average_rating(reviews.iter().map(|r| r.rating));

    Ok(Json(json!({
        "user": user,
        "watchlist": watchlist,
        "reviews": reviews,
        "average_rating": average,
    })))
}

// PUT /profile/{id}/picture
async fn update_picture(
    State(state): State<Arc<AppState>>,
    user: AuthUser,
    Path(id): Path<i32>,
    Json(req): Json<PictureRequest>,
) -> AppResult<impl IntoResponse> {
    user.ensure_is(id)?;

    let pic = req
        .profile_pic
        .map(|p| p.trim().to_string())
        .filter(|p| !p.is_empty())
        .ok_or_else(|| AppError::BadRequest("Profile picture data is required".into()))?;
    if pic.len() > MAX_PROFILE_PIC_LEN {
        return Err(AppError::BadRequest("Profile picture is too large".into()));
    }

    let updated = PublicUser::set_profile_pic(id, &pic, &state.db.pool)
        .await?
        .ok_or_else(|| AppError::NotFound("User not found".into()))?;

    Ok(Json(json!({
        "success": true,
        "message": "Profile picture updated successfully",
        "user": updated,
    })))
}
