use serde::{Deserialize, Serialize};
use sqlx::PgPool;

use crate::models::MovieSummary;

pub const DEFAULT_LIMIT: i64 = 20;
pub const MAX_LIMIT: i64 = 100;

/// Параметры списка фильмов после нормализации.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MovieQuery {
    pub q: Option<String>,
    pub now_showing: Option<bool>,
    pub language: Option<String>,
    pub limit: i64,
    pub offset: i64,
}

impl MovieQuery {
    pub fn new(
        q: Option<String>,
        now_showing: Option<bool>,
        language: Option<String>,
        limit: Option<i64>,
        offset: Option<i64>,
    ) -> Self {
        Self {
            q: q.map(|s| Self::prepare_search_query(&s)).filter(|s| !s.is_empty()),
            now_showing,
            language: language
                .map(|l| l.trim().to_ascii_lowercase())
                .filter(|l| !l.is_empty()),
            limit: limit.unwrap_or(DEFAULT_LIMIT).clamp(1, MAX_LIMIT),
            offset: offset.unwrap_or(0).max(0),
        }
    }

    /// Управляющие символы превращает в пробелы и сжимает пробелы.
    fn prepare_search_query(query: &str) -> String {
        query
            .chars()
            .map(|c| if c.is_control() { ' ' } else { c })
            .collect::<String>()
            .split_whitespace()
            .collect::<Vec<_>>()
            .join(" ")
    }

    /// Подстрока для ILIKE с экранированными `%`, `_` и `\`.
    fn like_pattern(q: &str) -> String {
        let mut escaped = String::with_capacity(q.len() + 2);
        escaped.push('%');
        for c in q.chars() {
            if matches!(c, '%' | '_' | '\\') {
                escaped.push('\\');
            }
            escaped.push(c);
        }
        escaped.push('%');
        escaped
    }
}

/// Клиент для поиска фильмов
#[derive(Clone)]
pub struct SearchClient {
    pool: PgPool,
}

impl SearchClient {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }

    pub async fn search_movies(&self, query: &MovieQuery) -> Result<Vec<MovieSummary>, sqlx::Error> {
        match &query.q {
            Some(q) => self.name_search(q, query).await,
            // Быстрый путь для пустых запросов
            None => self.listing(query).await,
        }
    }

    async fn listing(&self, query: &MovieQuery) -> Result<Vec<MovieSummary>, sqlx::Error> {
        sqlx::query_as::<_, MovieSummary>(
            r#"
            SELECT movie_id, name, poster, release_date, language, rating, now_showing
            FROM movies
            WHERE ($1::bool IS NULL OR now_showing = $1)
              AND ($2::text IS NULL OR language = $2)
            ORDER BY now_showing DESC, release_date DESC NULLS LAST, movie_id
            LIMIT $3 OFFSET $4
            "#
        )
        .bind(query.now_showing)
        .bind(query.language.as_deref())
        .bind(query.limit)
        .bind(query.offset)
        .fetch_all(&self.pool)
        .await
    }

    async fn name_search(&self, q: &str, query: &MovieQuery) -> Result<Vec<MovieSummary>, sqlx::Error> {
        // сначала точные совпадения по началу названия, потом остальные
        sqlx::query_as::<_, MovieSummary>(
            r#"
            SELECT movie_id, name, poster, release_date, language, rating, now_showing
            FROM movies
            WHERE name ILIKE $1 ESCAPE '\'
              AND ($2::bool IS NULL OR now_showing = $2)
              AND ($3::text IS NULL OR language = $3)
            ORDER BY (lower(name) LIKE (lower($4) || '%')) DESC,
                     release_date DESC NULLS LAST,
                     movie_id
            LIMIT $5 OFFSET $6
            "#
        )
        .bind(MovieQuery::like_pattern(q))
        .bind(query.now_showing)
        .bind(query.language.as_deref())
        .bind(q)
        .bind(query.limit)
        .bind(query.offset)
        .fetch_all(&self.pool)
        .await
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn normalizes_pagination_and_text() {
        let q = MovieQuery::new(Some("  the   dark\tknight ".into()), None, Some(" EN ".into()), Some(500), Some(-3));
        assert_eq!(q.q.as_deref(), Some("the dark knight"));
        assert_eq!(q.language.as_deref(), Some("en"));
        assert_eq!(q.limit, MAX_LIMIT);
        assert_eq!(q.offset, 0);
    }

    #[test]
    fn blank_query_becomes_listing() {
        let q = MovieQuery::new(Some("   ".into()), Some(true), None, None, None);
        assert_eq!(q.q, None);
        assert_eq!(q.limit, DEFAULT_LIMIT);
    }

    #[test]
    fn like_wildcards_are_escaped() {
        assert_eq!(MovieQuery::like_pattern("100%_off"), "%100\\%\\_off%");
        assert_eq!(MovieQuery::like_pattern("a\\b"), "%a\\\\b%");
    }
}
