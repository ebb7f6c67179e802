use serde::Serialize;
use sqlx::{FromRow, PgPool};
use chrono::{DateTime, Utc};

#[derive(Debug, Clone, FromRow)]
pub struct User {
    pub user_id: i32,
    pub name: String,
    pub password_hash: String,
    pub bio: Option<String>,
    pub profile_pic: Option<String>,
    pub created_at: DateTime<Utc>,
    pub last_logged_in: Option<DateTime<Utc>>,
}

/// То, что можно показывать другим пользователям.
#[derive(Debug, Clone, FromRow, Serialize)]
pub struct PublicUser {
    pub user_id: i32,
    pub name: String,
    pub bio: Option<String>,
    pub profile_pic: Option<String>,
}

impl User {
    pub async fn find_by_name(name: &str, pool: &PgPool) -> Result<Option<User>, sqlx::Error> {
        sqlx::query_as::<_, User>(
            "SELECT user_id, name, password_hash, bio, profile_pic, created_at, last_logged_in
             FROM users WHERE name = $1"
        )
        .bind(name)
        .fetch_optional(pool)
        .await
    }

    /// Создаёт пользователя; `None`, если имя уже занято.
    pub async fn create(
        name: &str,
        password_hash: &str,
        pool: &PgPool,
    ) -> Result<Option<PublicUser>, sqlx::Error> {
        sqlx::query_as::<_, PublicUser>(
            "INSERT INTO users (name, password_hash) VALUES ($1, $2)
             ON CONFLICT (name) DO NOTHING
             RETURNING user_id, name, bio, profile_pic"
        )
        .bind(name)
        .bind(password_hash)
        .fetch_optional(pool)
        .await
    }

    pub async fn touch_last_login(user_id: i32, pool: &PgPool) -> Result<(), sqlx::Error> {
        sqlx::query("UPDATE users SET last_logged_in = NOW() WHERE user_id = $1")
            .bind(user_id)
            .execute(pool)
            .await?;
        Ok(())
    }
}

impl PublicUser {
    pub async fn find(user_id: i32, pool: &PgPool) -> Result<Option<PublicUser>, sqlx::Error> {
        sqlx::query_as::<_, PublicUser>(
            "SELECT user_id, name, bio, profile_pic FROM users WHERE user_id = $1"
        )
        .bind(user_id)
        .fetch_optional(pool)
        .await
    }

    pub async fn set_profile_pic(
        user_id: i32,
        profile_pic: &str,
        pool: &PgPool,
    ) -> Result<Option<PublicUser>, sqlx::Error> {
        sqlx::query_as::<_, PublicUser>(
            "UPDATE users SET profile_pic = $1 WHERE user_id = $2
             RETURNING user_id, name, bio, profile_pic"
        )
        .bind(profile_pic)
        .bind(user_id)
        .fetch_optional(pool)
        .await
    }
}
