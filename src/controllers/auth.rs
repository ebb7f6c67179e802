use axum::{
    extract::State,
    http::StatusCode,
    response::IntoResponse,
    routing::{get, post},
    Json, Router,
};
use serde::Deserialize;
use serde_json::json;
use std::sync::Arc;
use validator::Validate;

use crate::error::{AppError, AppResult};
use crate::middleware::AuthUser;
use crate::models::User;
use crate::services::auth::{hash_password, verify_password};
use crate::AppState;

pub fn routes() -> Router<Arc<AppState>> {
    Router::new()
        .route("/signup", post(signup))
        .route("/login", post(login))
        .route("/me", get(me))
}

#[derive(Debug, Deserialize, Validate)]
pub struct SignupRequest {
    #[validate(length(min = 3, max = 32, message = "Username must be 3 to 32 characters"))]
    pub username: String,
    #[validate(length(min = 8, max = 128, message = "Password must be 8 to 128 characters"))]
    pub password: String,
}

#[derive(Debug, Deserialize)]
pub struct LoginRequest {
    pub username: String,
    pub password: String,
}

// POST /auth/signup
async fn signup(
    State(state): State<Arc<AppState>>,
    Json(req): Json<SignupRequest>,
) -> AppResult<impl IntoResponse> {
    let req = SignupRequest {
        username: req.username.trim().to_string(),
        password: req.password,
    };
    req.validate()?;

    let hash = hash_password(req.password, state.config.auth.bcrypt_cost).await?;

    let user = User::create(&req.username, &hash, &state.db.pool)
        .await?
        .ok_or_else(|| AppError::Conflict("Username already exists".into()))?;

    tracing::info!("user {} signed up as {}", user.user_id, user.name);

    Ok((
        StatusCode::CREATED,
        Json(json!({
            "success": true,
            "message": "User created successfully",
            "user": { "id": user.user_id, "name": user.name },
        })),
    ))
}

// POST /auth/login
async fn login(
    State(state): State<Arc<AppState>>,
    Json(req): Json<LoginRequest>,
) -> AppResult<impl IntoResponse> {
    if req.username.trim().is_empty() || req.password.is_empty() {
        return Err(AppError::BadRequest("Username and password are required".into()));
    }

    let user = User::find_by_name(req.username.trim(), &state.db.pool)
        .await?
        .ok_or(AppError::InvalidCredentials)?;

    if !verify_password(req.password, user.password_hash.clone()).await? {
        return Err(AppError::InvalidCredentials);
    }

    // не критично, если не обновилось
    if let Err(e) = User::touch_last_login(user.user_id, &state.db.pool).await {
        tracing::warn!("failed to update last_logged_in for {}: {:?}", user.user_id, e);
    }

    let token = state.tokens.issue(user.user_id, &user.name)?;

    Ok(Json(json!({
        "success": true,
        "message": "Login successful",
        "user": { "id": user.user_id, "name": user.name },
        "token": token,
    })))
}

// GET /auth/me
async fn me(user: AuthUser) -> Json<serde_json::Value> {
    Json(json!({
        "user": { "id": user.user_id, "name": user.name }
    }))
}
