use chrono::{DateTime, Utc};
use serde::Serialize;
use sqlx::{FromRow, PgPool};

#[derive(Debug, Clone, FromRow, Serialize)]
pub struct Review {
    pub review_id: i32,
    pub movie_id: i32,
    pub user_id: i32,
    pub rating: i32,
    pub review_text: String,
    pub added_at: DateTime<Utc>,
}

/// Отзыв со страницы фильма.
#[derive(Debug, Clone, FromRow, Serialize)]
pub struct MovieReview {
    pub review_id: i32,
    pub user_id: i32,
    pub user_name: String,
    pub rating: i32,
    pub review_text: String,
    pub added_at: DateTime<Utc>,
}

/// Отзыв в профиле пользователя.
#[derive(Debug, Clone, FromRow, Serialize)]
pub struct ProfileReview {
    pub review_id: i32,
    pub movie_id: i32,
    pub movie_name: String,
    pub poster: Option<String>,
    pub rating: i32,
    pub review_text: String,
    pub added_at: DateTime<Utc>,
}

pub enum NewReview {
    Created(Review),
    AlreadyReviewed,
}

const REVIEW_COLUMNS: &str = "review_id, movie_id, user_id, rating, review_text, added_at";

impl Review {
    pub async fn find(review_id: i32, pool: &PgPool) -> Result<Option<Review>, sqlx::Error> {
        sqlx::query_as::<_, Review>(&format!(
            "SELECT {REVIEW_COLUMNS} FROM reviews WHERE review_id = $1"
        ))
        .bind(review_id)
        .fetch_optional(pool)
        .await
    }

    /// Один отзыв на фильм от пользователя: повторная вставка не проходит по UNIQUE.
    pub async fn create(
        movie_id: i32,
        user_id: i32,
        rating: i32,
        text: &str,
        pool: &PgPool,
    ) -> Result<NewReview, sqlx::Error> {
        let row = sqlx::query_as::<_, Review>(&format!(
            "INSERT INTO reviews (movie_id, user_id, rating, review_text, added_at)
             VALUES ($1, $2, $3, $4, NOW())
             ON CONFLICT (movie_id, user_id) DO NOTHING
             RETURNING {REVIEW_COLUMNS}"
        ))
        .bind(movie_id)
        .bind(user_id)
        .bind(rating)
        .bind(text)
        .fetch_optional(pool)
        .await?;

        Ok(match row {
            Some(review) => NewReview::Created(review),
            None => NewReview::AlreadyReviewed,
        })
    }

    pub async fn update(
        review_id: i32,
        rating: i32,
        text: &str,
        pool: &PgPool,
    ) -> Result<Option<Review>, sqlx::Error> {
        sqlx::query_as::<_, Review>(&format!(
            "UPDATE reviews SET rating = $1, review_text = $2, added_at = NOW()
             WHERE review_id = $3
             RETURNING {REVIEW_COLUMNS}"
        ))
        .bind(rating)
        .bind(text)
        .bind(review_id)
        .fetch_optional(pool)
        .await
    }

    pub async fn delete(review_id: i32, pool: &PgPool) -> Result<bool, sqlx::Error> {
        let res = sqlx::query("DELETE FROM reviews WHERE review_id = $1")
            .bind(review_id)
            .execute(pool)
            .await?;
        Ok(res.rows_affected() > 0)
    }
}

impl MovieReview {
    pub async fn for_movie(movie_id: i32, pool: &PgPool) -> Result<Vec<MovieReview>, sqlx::Error> {
        sqlx::query_as::<_, MovieReview>(
            r#"
            SELECT r.review_id, r.user_id, u.name AS user_name, r.rating, r.review_text, r.added_at
            FROM reviews r
            JOIN users u ON u.user_id = r.user_id
            WHERE r.movie_id = $1
            ORDER BY r.added_at DESC
            "#
        )
        .bind(movie_id)
        .fetch_all(pool)
        .await
    }
}

impl ProfileReview {
    pub async fn for_user(user_id: i32, pool: &PgPool) -> Result<Vec<ProfileReview>, sqlx::Error> {
        sqlx::query_as::<_, ProfileReview>(
            r#"
            SELECT r.review_id, r.movie_id, m.name AS movie_name, m.poster,
                   r.rating, r.review_text, r.added_at
            FROM reviews r
            JOIN movies m ON m.movie_id = r.movie_id
            WHERE r.user_id = $1
            ORDER BY r.added_at DESC
            "#
        )
        .bind(user_id)
        .fetch_all(pool)
        .await
    }
}

/// Средняя оценка с двумя знаками после запятой, "0.00" без отзывов.
pub fn average_rating<I>(ratings: I) -> String
where
    I: IntoIterator<Item = i32>,
{
    let (sum, count) = ratings
        .into_iter()
        .fold((0i64, 0u32), |(sum, count), r| (sum + i64::from(r), count + 1));
    if count == 0 {
        return "0.00".to_string();
    }
    format!("{:.2}", sum as f64 / f64::from(count))
}
