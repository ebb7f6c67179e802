use axum::{
    extract::{Path, State},
    http::StatusCode,
    response::IntoResponse,
    routing::{post, put},
    Json, Router,
};
use serde::Deserialize;
use serde_json::json;
use std::sync::Arc;
use validator::Validate;

use crate::error::{AppError, AppResult};
use crate::middleware::AuthUser;
use crate::models::movie::movie_exists;
use crate::models::review::NewReview;
use crate::models::Review;
use crate::AppState;

pub fn routes() -> Router<Arc<AppState>> {
    Router::new()
        .route("/", post(create_review))
        .route("/{review_id}", put(update_review).delete(delete_review))
}

#[derive(Debug, Deserialize, Validate)]
#[serde(rename_all = "camelCase")]
pub struct CreateReviewRequest {
    #[validate(range(min = 1, message = "Movie ID is required"))]
    pub movie_id: i32,
    #[validate(range(min = 1, max = 5, message = "Rating must be between 1 and 5"))]
    pub rating: i32,
    #[validate(length(min = 1, max = 5000, message = "Review content must be 1 to 5000 characters"))]
    pub content: String,
}

#[derive(Debug, Deserialize, Validate)]
pub struct UpdateReviewRequest {
    #[validate(range(min = 1, max = 5, message = "Rating must be between 1 and 5"))]
    pub rating: i32,
    #[validate(length(min = 1, max = 5000, message = "Review content must be 1 to 5000 characters"))]
    pub content: String,
}

/// Отзыв должен существовать и принадлежать пользователю.
async fn owned_review(state: &AppState, review_id: i32, user: &AuthUser) -> AppResult<Review> {
    let review = Review::find(review_id, &state.db.pool)
        .await?
        .ok_or_else(|| AppError::NotFound("Review not found".into()))?;
    if review.user_id != user.user_id {
        return Err(AppError::Forbidden("You can only modify your own reviews".into()));
    }
    Ok(review)
}

// POST /reviews
async fn create_review(
    State(state): State<Arc<AppState>>,
    user: AuthUser,
    Json(req): Json<CreateReviewRequest>,
) -> AppResult<impl IntoResponse> {
    let req = CreateReviewRequest {
        content: req.content.trim().to_string(),
        ..req
    };
    req.validate()?;

    if !movie_exists(req.movie_id, &state.db.pool).await? {
        return Err(AppError::NotFound("Movie not found".into()));
    }

    match Review::create(req.movie_id, user.user_id, req.rating, &req.content, &state.db.pool).await? {
        NewReview::Created(review) => Ok((
            StatusCode::CREATED,
            Json(json!({
                "success": true,
                "message": "Review submitted successfully",
                "review": review,
            })),
        )),
        NewReview::AlreadyReviewed => Err(AppError::Conflict(
            "You have already reviewed this movie. Use the edit feature to update your review.".into(),
        )),
    }
}

// PUT /reviews/{review_id}
async fn update_review(
    State(state): State<Arc<AppState>>,
    user: AuthUser,
    Path(review_id): Path<i32>,
    Json(req): Json<UpdateReviewRequest>,
) -> AppResult<impl IntoResponse> {
    let req = UpdateReviewRequest {
        content: req.content.trim().to_string(),
        ..req
    };
    req.validate()?;

    owned_review(&state, review_id, &user).await?;

    let review = Review::update(review_id, req.rating, &req.content, &state.db.pool)
        .await?
        .ok_or_else(|| AppError::NotFound("Review not found".into()))?;

    Ok(Json(json!({
        "success": true,
        "message": "Review updated successfully",
        "review": review,
    })))
}

// DELETE /reviews/{review_id}
async fn delete_review(
    State(state): State<Arc<AppState>>,
    user: AuthUser,
    Path(review_id): Path<i32>,
) -> AppResult<impl IntoResponse> {
    owned_review(&state, review_id, &user).await?;

    if !Review::delete(review_id, &state.db.pool).await? {
        return Err(AppError::NotFound("Review not found".into()));
    }

    Ok(Json(json!({
        "success": true,
        "message": "Review deleted successfully",
    })))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn rating_bounds() {
        let ok = UpdateReviewRequest { rating: 5, content: "Great".into() };
        assert!(ok.validate().is_ok());

        let low = UpdateReviewRequest { rating: 0, content: "Meh".into() };
        let err: AppError = low.validate().unwrap_err().into();
        assert_eq!(err.to_string(), "Rating must be between 1 and 5");
    }

    #[test]
    fn empty_content_is_rejected() {
        let req = CreateReviewRequest { movie_id: 3, rating: 4, content: String::new() };
        assert!(req.validate().is_err());
    }

    #[test]
    fn request_uses_camel_case() {
        let req: CreateReviewRequest =
            serde_json::from_str(r#"{"movieId": 9, "rating": 3, "content": "fine"}"#).unwrap();
        assert_eq!(req.movie_id, 9);
    }
}
