use crate::cache::CacheService;
use crate::search_client::MovieQuery;
use redis::AsyncCommands;
use sha2::{Digest, Sha256};
use tracing::warn;

impl CacheService {
    /// Получает закешированный JSON по ключу. Ошибки Redis считаем промахом.
    pub async fn get_cached_json(&self, key: &str) -> Option<String> {
        let redis = self.redis.as_ref()?;
        let mut conn = redis.conn.clone();
        match conn.get::<_, Option<String>>(key).await {
            Ok(value) => value,
            Err(e) => {
                warn!("redis get {} failed: {:?}", key, e);
                None
            }
        }
    }

    pub async fn cache_movie(&self, movie_id: i32, json: &str) {
        self.put(&movie_key(movie_id), json, self.ttl.movie_ttl_secs).await;
    }

    pub async fn cache_search_result(&self, key: &str, json: &str) {
        self.put(key, json, self.ttl.search_ttl_secs).await;
    }

    async fn put(&self, key: &str, value: &str, ttl_seconds: u64) {
        let Some(redis) = &self.redis else { return };
        let mut conn = redis.conn.clone();
        let res: Result<(), _> = conn.set_ex(key, value, ttl_seconds).await;
        if let Err(e) = res {
            warn!("failed to cache {}: {:?}", key, e);
        }
    }
}

pub fn movie_key(movie_id: i32) -> String {
    format!("movie:{}", movie_id)
}

/// Ключ кеша поиска: sha256 от канонической query-строки запроса.
pub fn search_key(query: &MovieQuery) -> String {
    let canonical = serde_urlencoded::to_string(query).unwrap_or_default();
    format!("movies:search:{:x}", Sha256::digest(canonical.as_bytes()))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn equal_queries_share_a_key() {
        let a = MovieQuery::new(Some("alien".into()), Some(true), None, Some(20), None);
        let b = MovieQuery::new(Some("  alien ".into()), Some(true), None, None, Some(0));
        assert_eq!(search_key(&a), search_key(&b));
    }

    #[test]
    fn different_pages_differ() {
        let a = MovieQuery::new(None, None, None, None, Some(0));
        let b = MovieQuery::new(None, None, None, None, Some(20));
        assert_ne!(search_key(&a), search_key(&b));
        assert!(search_key(&a).starts_with("movies:search:"));
        assert_eq!(search_key(&a).len(), "movies:search:".len() + 64);
    }
}
