use axum::{
    extract::FromRequestParts,
    http::{header, request::Parts},
};
use base64::{engine::general_purpose, Engine as _};
use std::sync::Arc;

use crate::error::AppError;
use crate::models::User;
use crate::services::auth::verify_password;

#[derive(Debug, Clone)]
pub struct AuthUser {
    pub user_id: i32,
    pub name: String,
}

impl AuthUser {
    /// 403, если пользователь пытается действовать от имени другого.
    pub fn ensure_is(&self, user_id: i32) -> Result<(), AppError> {
        if self.user_id == user_id {
            Ok(())
        } else {
            Err(AppError::Forbidden("You can only access your own data".into()))
        }
    }
}

enum Credentials {
    Bearer(String),
    Basic { name: String, password: String },
}

fn parse_authorization(value: &str) -> Result<Credentials, AppError> {
    if let Some(token) = value.strip_prefix("Bearer ") {
        let token = token.trim();
        if token.is_empty() {
            return Err(AppError::Unauthorized);
        }
        return Ok(Credentials::Bearer(token.to_string()));
    }

    let encoded = value.strip_prefix("Basic ").ok_or(AppError::Unauthorized)?;
    let decoded = general_purpose::STANDARD
        .decode(encoded.trim())
        .map_err(|_| AppError::Unauthorized)?;
    let credentials = String::from_utf8(decoded).map_err(|_| AppError::Unauthorized)?;

    // Разделяем name:password
    let (name, password) = credentials.split_once(':').ok_or(AppError::Unauthorized)?;
    Ok(Credentials::Basic {
        name: name.to_string(),
        password: password.to_string(),
    })
}

// Bearer JWT или Basic Auth
impl FromRequestParts<Arc<crate::AppState>> for AuthUser {
    type Rejection = AppError;

    async fn from_request_parts(
        parts: &mut Parts,
        state: &Arc<crate::AppState>,
    ) -> Result<Self, Self::Rejection> {
        let auth_header = parts
            .headers
            .get(header::AUTHORIZATION)
            .and_then(|value| value.to_str().ok())
            .ok_or(AppError::Unauthorized)?;

        match parse_authorization(auth_header)? {
            Credentials::Bearer(token) => {
                let claims = state.tokens.verify(&token)?;
                Ok(AuthUser {
                    user_id: claims.sub,
                    name: claims.name,
                })
            }
            Credentials::Basic { name, password } => {
                let user = User::find_by_name(&name, &state.db.pool)
                    .await?
                    .ok_or(AppError::InvalidCredentials)?;
                if !verify_password(password, user.password_hash.clone()).await? {
                    return Err(AppError::InvalidCredentials);
                }
                Ok(AuthUser {
                    user_id: user.user_id,
                    name: user.name,
                })
            }
        }
    }
}
