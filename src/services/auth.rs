use chrono::{Duration, Utc};
use jsonwebtoken::{decode, encode, DecodingKey, EncodingKey, Header, Validation};
use serde::{Deserialize, Serialize};

use crate::config::JwtConfig;
use crate::error::AppError;

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Claims {
    pub sub: i32,
    pub name: String,
    pub iat: i64,
    pub exp: i64,
}

#[derive(Clone)]
pub struct TokenService {
    encoding: EncodingKey,
    decoding: DecodingKey,
    ttl: Duration,
}

impl TokenService {
    pub fn new(config: &JwtConfig) -> Self {
        Self {
            encoding: EncodingKey::from_secret(config.secret.as_bytes()),
            decoding: DecodingKey::from_secret(config.secret.as_bytes()),
            ttl: Duration::hours(config.expires_in_hours),
        }
    }

    pub fn issue(&self, user_id: i32, name: &str) -> Result<String, AppError> {
        let now = Utc::now();
        let claims = Claims {
            sub: user_id,
            name: name.to_string(),
            iat: now.timestamp(),
            exp: (now + self.ttl).timestamp(),
        };
        encode(&Header::default(), &claims, &self.encoding)
            .map_err(|e| AppError::Internal(format!("jwt encode: {e}")))
    }

    /// Любая ошибка проверки токена - это 401.
    pub fn verify(&self, token: &str) -> Result<Claims, AppError> {
        decode::<Claims>(token, &self.decoding, &Validation::default())
            .map(|data| data.claims)
            .map_err(|e| {
                tracing::debug!("rejected token: {}", e);
                AppError::Unauthorized
            })
    }
}

// bcrypt намеренно медленный, поэтому уводим его с рантайма
pub async fn hash_password(password: String, cost: u32) -> Result<String, AppError> {
    let hash = tokio::task::spawn_blocking(move || bcrypt::hash(password, cost)).await??;
    Ok(hash)
}

pub async fn verify_password(password: String, hash: String) -> Result<bool, AppError> {
    let ok = tokio::task::spawn_blocking(move || bcrypt::verify(password, &hash)).await??;
    Ok(ok)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn tokens(hours: i64) -> TokenService {
        TokenService::new(&JwtConfig {
            secret: "unit-test-secret".into(),
            expires_in_hours: hours,
        })
    }

    #[test]
    fn issued_token_verifies() {
        let svc = tokens(1);
        let token = svc.issue(42, "ripley").unwrap();
        let claims = svc.verify(&token).unwrap();
        assert_eq!(claims.sub, 42);
        assert_eq!(claims.name, "ripley");
    }

    #[test]
    fn expired_token_is_rejected() {
        let svc = tokens(-2);
        let token = svc.issue(1, "dallas").unwrap();
        assert!(matches!(svc.verify(&token), Err(AppError::Unauthorized)));
    }

    #[test]
    fn token_from_other_secret_is_rejected() {
        let other = TokenService::new(&JwtConfig {
            secret: "someone-else".into(),
            expires_in_hours: 1,
        });
        let token = other.issue(1, "ash").unwrap();
        assert!(matches!(tokens(1).verify(&token), Err(AppError::Unauthorized)));
    }

    #[tokio::test]
    async fn password_hash_round_trip() {
        let hash = hash_password("nostromo-180".into(), 4).await.unwrap();
        assert!(verify_password("nostromo-180".into(), hash.clone()).await.unwrap());
        assert!(!verify_password("wrong".into(), hash).await.unwrap());
    }
}
