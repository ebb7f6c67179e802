use axum::{
    extract::{Path, State},
    http::StatusCode,
    response::IntoResponse,
    routing::{get, post},
    Json, Router,
};
use serde::Deserialize;
use serde_json::json;
use std::sync::Arc;

use crate::error::{AppError, AppResult};
use crate::middleware::AuthUser;
use crate::models::movie::movie_exists;
use crate::models::watchlist::WatchlistMovie;
use crate::models::WatchlistEntry;
use crate::AppState;

pub fn routes() -> Router<Arc<AppState>> {
    Router::new()
        .route("/", post(add_to_watchlist))
        .route("/{user_id}", get(get_watchlist))
        .route("/{user_id}/{movie_id}", get(check_watchlist).delete(remove_from_watchlist))
}

#[derive(Debug, Deserialize)]
pub struct AddRequest {
    pub movie_id: i32,
}

// GET /watchlist/{user_id}/{movie_id}
async fn check_watchlist(
    State(state): State<Arc<AppState>>,
    Path((user_id, movie_id)): Path<(i32, i32)>,
) -> AppResult<impl IntoResponse> {
    let in_watchlist = WatchlistEntry::contains(user_id, movie_id, &state.db.pool).await?;
    Ok(Json(json!({ "inWatchlist": in_watchlist })))
}

// POST /watchlist
async fn add_to_watchlist(
    State(state): State<Arc<AppState>>,
    user: AuthUser,
    Json(req): Json<AddRequest>,
) -> AppResult<impl IntoResponse> {
    if req.movie_id <= 0 {
        return Err(AppError::BadRequest("movie_id must be > 0".into()));
    }
    if !movie_exists(req.movie_id, &state.db.pool).await? {
        return Err(AppError::NotFound("Movie not found".into()));
    }

    let entry = WatchlistEntry::add(user.user_id, req.movie_id, &state.db.pool)
        .await?
        .ok_or_else(|| AppError::Conflict("Movie already in watchlist".into()))?;

    Ok((
        StatusCode::CREATED,
        Json(json!({
            "message": "Movie added to watchlist",
            "watchlistEntry": entry,
        })),
    ))
}

// DELETE /watchlist/{user_id}/{movie_id}
async fn remove_from_watchlist(
    State(state): State<Arc<AppState>>,
    user: AuthUser,
    Path((user_id, movie_id)): Path<(i32, i32)>,
) -> AppResult<impl IntoResponse> {
    user.ensure_is(user_id)?;

    let removed = WatchlistEntry::remove(user_id, movie_id, &state.db.pool)
        .await?
        .ok_or_else(|| AppError::NotFound("Movie not found in watchlist".into()))?;

    Ok(Json(json!({
        "message": "Movie removed from watchlist",
        "removedEntry": removed,
    })))
}

// GET /watchlist/{user_id}
async fn get_watchlist(
    State(state): State<Arc<AppState>>,
    Path(user_id): Path<i32>,
) -> AppResult<impl IntoResponse> {
    let movies = WatchlistMovie::for_user(user_id, &state.db.pool).await?;
    Ok(Json(json!({ "watchlist": movies })))
}
