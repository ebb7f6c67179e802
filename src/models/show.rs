use chrono::{DateTime, Utc};
use serde::Serialize;
use sqlx::{FromRow, PgExecutor, PgPool};

/// Сеанс в расписании фильма.
#[derive(Debug, Clone, FromRow, Serialize)]
pub struct ShowTime {
    pub show_id: i32,
    pub time: DateTime<Utc>,
    pub theatre_id: i32,
    pub theatre_name: String,
    pub district_name: Option<String>,
}

/// Шапка сеанса для схемы зала и подтверждения брони.
#[derive(Debug, Clone, FromRow, Serialize)]
pub struct ShowInfo {
    pub show_id: i32,
    pub movie_id: i32,
    pub theatre_id: i32,
    pub time: DateTime<Utc>,
    pub movie_name: String,
    pub theatre_name: String,
}

impl ShowInfo {
    pub async fn find<'e, E>(executor: E, show_id: i32) -> Result<Option<ShowInfo>, sqlx::Error>
    where
        E: PgExecutor<'e>,
    {
        sqlx::query_as::<_, ShowInfo>(
            r#"
            SELECT s.show_id, s.movie_id, s.theatre_id, s.show_time AS time,
                   m.name AS movie_name, t.name AS theatre_name
            FROM shows s
            JOIN movies m ON m.movie_id = s.movie_id
            JOIN theatres t ON t.theatre_id = s.theatre_id
            WHERE s.show_id = $1
            "#
        )
        .bind(show_id)
        .fetch_optional(executor)
        .await
    }
}

impl ShowTime {
    /// Предстоящие сеансы фильма по времени.
    pub async fn upcoming_for_movie(movie_id: i32, pool: &PgPool) -> Result<Vec<ShowTime>, sqlx::Error> {
        sqlx::query_as::<_, ShowTime>(
            r#"
            SELECT s.show_id, s.show_time AS time, s.theatre_id,
                   t.name AS theatre_name, d.name AS district_name
            FROM shows s
            JOIN theatres t ON t.theatre_id = s.theatre_id
            LEFT JOIN districts d ON d.district_id = t.district_id
            WHERE s.movie_id = $1 AND s.show_time >= NOW()
            ORDER BY s.show_time, t.name
            "#
        )
        .bind(movie_id)
        .fetch_all(pool)
        .await
    }
}
