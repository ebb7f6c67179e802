use chrono::NaiveDate;
use serde::{Deserialize, Serialize};
use sqlx::{FromRow, PgPool};

/// Карточка фильма в списке.
#[derive(Debug, Clone, FromRow, Serialize, Deserialize)]
pub struct MovieSummary {
    pub movie_id: i32,
    pub name: String,
    pub poster: Option<String>,
    pub release_date: Option<NaiveDate>,
    pub language: Option<String>,
    pub rating: Option<f64>,
    pub now_showing: bool,
}

#[derive(Debug, Clone, FromRow, Serialize, Deserialize)]
pub struct CastMember {
    pub cast_id: i32,
    pub name: String,
    pub photo: Option<String>,
}

#[derive(Debug, Clone, FromRow, Serialize, Deserialize)]
pub struct MovieDetail {
    pub movie_id: i32,
    pub name: String,
    pub language: Option<String>,
    pub release_date: Option<NaiveDate>,
    pub synopsis: Option<String>,
    pub runtime: Option<i32>,
    pub poster: Option<String>,
    pub trailer: Option<String>,
    pub rating: Option<f64>,
    pub now_showing: bool,
    pub director: Option<String>,
    #[sqlx(skip)]
    pub cast: Vec<CastMember>,
}

impl MovieDetail {
    pub async fn find(movie_id: i32, pool: &PgPool) -> Result<Option<MovieDetail>, sqlx::Error> {
        let movie = sqlx::query_as::<_, MovieDetail>(
            r#"
            SELECT m.movie_id, m.name, m.language, m.release_date, m.synopsis, m.runtime,
                   m.poster, m.trailer, m.rating, m.now_showing, d.dir_name AS director
            FROM movies m
            LEFT JOIN directors d ON d.dir_id = m.dir_id
            WHERE m.movie_id = $1
            "#
        )
        .bind(movie_id)
        .fetch_optional(pool)
        .await?;

        let Some(mut movie) = movie else {
            return Ok(None);
        };

        movie.cast = sqlx::query_as::<_, CastMember>(
            r#"
            SELECT c.cast_id, c.name, c.photo
            FROM movie_cast mc
            JOIN cast_members c ON c.cast_id = mc.cast_id
            WHERE mc.movie_id = $1
            ORDER BY mc.billing_order, c.name
            "#
        )
        .bind(movie_id)
        .fetch_all(pool)
        .await?;

        Ok(Some(movie))
    }
}

pub async fn movie_exists(movie_id: i32, pool: &PgPool) -> Result<bool, sqlx::Error> {
    sqlx::query_scalar::<_, bool>("SELECT EXISTS(SELECT 1 FROM movies WHERE movie_id = $1)")
        .bind(movie_id)
        .fetch_one(pool)
        .await
}
