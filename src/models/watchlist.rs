use chrono::{DateTime, NaiveDate, Utc};
use serde::Serialize;
use sqlx::{FromRow, PgPool};

#[derive(Debug, Clone, FromRow, Serialize)]
pub struct WatchlistEntry {
    pub user_id: i32,
    pub movie_id: i32,
    pub added_at: DateTime<Utc>,
}

#[derive(Debug, Clone, FromRow, Serialize)]
pub struct WatchlistMovie {
    pub movie_id: i32,
    pub name: String,
    pub poster: Option<String>,
    pub release_date: Option<NaiveDate>,
    pub language: Option<String>,
    pub added_at: DateTime<Utc>,
}

impl WatchlistEntry {
    pub async fn contains(user_id: i32, movie_id: i32, pool: &PgPool) -> Result<bool, sqlx::Error> {
        sqlx::query_scalar::<_, bool>(
            "SELECT EXISTS(SELECT 1 FROM watchlist WHERE user_id = $1 AND movie_id = $2)"
        )
        .bind(user_id)
        .bind(movie_id)
        .fetch_one(pool)
        .await
    }

    /// `None`, если фильм уже в списке.
    pub async fn add(user_id: i32, movie_id: i32, pool: &PgPool) -> Result<Option<WatchlistEntry>, sqlx::Error> {
        sqlx::query_as::<_, WatchlistEntry>(
            "INSERT INTO watchlist (user_id, movie_id, added_at) VALUES ($1, $2, NOW())
             ON CONFLICT (user_id, movie_id) DO NOTHING
             RETURNING user_id, movie_id, added_at"
        )
        .bind(user_id)
        .bind(movie_id)
        .fetch_optional(pool)
        .await
    }

    pub async fn remove(user_id: i32, movie_id: i32, pool: &PgPool) -> Result<Option<WatchlistEntry>, sqlx::Error> {
        sqlx::query_as::<_, WatchlistEntry>(
            "DELETE FROM watchlist WHERE user_id = $1 AND movie_id = $2
             RETURNING user_id, movie_id, added_at"
        )
        .bind(user_id)
        .bind(movie_id)
        .fetch_optional(pool)
        .await
    }
}

impl WatchlistMovie {
    pub async fn for_user(user_id: i32, pool: &PgPool) -> Result<Vec<WatchlistMovie>, sqlx::Error> {
        sqlx::query_as::<_, WatchlistMovie>(
            r#"
            SELECT m.movie_id, m.name, m.poster, m.release_date, m.language, w.added_at
            FROM watchlist w
            JOIN movies m ON m.movie_id = w.movie_id
            WHERE w.user_id = $1
            ORDER BY w.added_at DESC
            "#
        )
        .bind(user_id)
        .fetch_all(pool)
        .await
    }
}
