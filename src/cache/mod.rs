use crate::{config::CacheConfig, database::Database, redis_client::RedisClient};
use tracing::info;

pub mod movies;
pub mod seats;

/// Кеш поверх Redis. Без Redis все методы ходят прямо в БД, а ошибки Redis
/// только логируются - запрос из-за кеша не падает.
#[derive(Clone)]
pub struct CacheService {
    redis: Option<RedisClient>,
    db: Database,
    ttl: CacheConfig,
}

impl CacheService {
    pub fn new(redis: Option<RedisClient>, db: Database, ttl: CacheConfig) -> Self {
        Self { redis, db, ttl }
    }

    pub fn is_enabled(&self) -> bool {
        self.redis.is_some()
    }

    // Прогрев кеша при старте
    pub async fn warmup_cache(&self) {
        if !self.is_enabled() {
            return;
        }
        info!("Starting cache warmup...");

        match self.now_showing_show_ids().await {
            Ok(show_ids) => {
                for show_id in &show_ids {
                    let _ = self.get_booked_seats(*show_id).await;
                }
                info!("Warmed seat maps for {} upcoming shows", show_ids.len());
            }
            Err(e) => tracing::warn!("cache warmup skipped: {:?}", e),
        }

        info!("Cache warmup done");
    }

    async fn now_showing_show_ids(&self) -> Result<Vec<i32>, sqlx::Error> {
        sqlx::query_scalar::<_, i32>(
            "SELECT s.show_id
             FROM shows s
             JOIN movies m ON m.movie_id = s.movie_id
             WHERE m.now_showing AND s.show_time >= NOW()
             ORDER BY s.show_time
             LIMIT 100"
        )
        .fetch_all(&self.db.pool)
        .await
    }
}
