use axum::{
    extract::State,
    http::StatusCode,
    response::IntoResponse,
    routing::get,
    Json, Router,
};
use chrono::{DateTime, Utc};
use serde_json::json;
use std::sync::Arc;

use crate::AppState;

pub fn routes() -> Router<Arc<AppState>> {
    Router::new()
        .route("/", get(index))
        .route("/health", get(health))
}

async fn index() -> Json<serde_json::Value> {
    Json(json!({
        "message": "Cinema booking API",
        "endpoints": {
            "/auth": "Authentication routes",
            "/movies": "Movie routes",
            "/reviews": "Review routes",
            "/watchlist": "Watchlist routes",
            "/profile": "Profile routes",
            "/bookings": "Booking routes",
            "/health": "Health check"
        }
    }))
}

// GET /health - проверка соединения с БД
async fn health(State(state): State<Arc<AppState>>) -> impl IntoResponse {
    let res = sqlx::query_scalar::<_, DateTime<Utc>>("SELECT NOW()")
        .fetch_one(&state.db.pool)
        .await;

    match res {
        Ok(timestamp) => (
            StatusCode::OK,
            Json(json!({
                "status": "healthy",
                "database": "connected",
                "timestamp": timestamp,
            })),
        ),
        Err(e) => {
            tracing::error!("Health check failed: {:?}", e);
            (
                StatusCode::SERVICE_UNAVAILABLE,
                Json(json!({
                    "status": "unhealthy",
                    "database": "disconnected",
                    "error": "Database connection failed",
                })),
            )
        }
    }
}
