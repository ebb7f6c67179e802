use crate::cache::CacheService;
use redis::{AsyncCommands, Script};
use tracing::{debug, warn};

// Пишем карту мест, только если версия сеанса не сдвинулась с момента чтения из БД.
const SAVE_IF_CURRENT: &str = r"
local v = redis.call('GET', KEYS[2]) or '0'
if v == ARGV[1] then
    redis.call('SET', KEYS[1], ARGV[2], 'EX', ARGV[3])
    return 1
end
return 0
";

impl CacheService {
    /// Занятые места сеанса: сначала кеш, потом БД.
    ///
    /// Версию снимаем до чтения из БД: если между чтением и записью
    /// случилась бронь или отмена, устаревший список в кеш не попадёт.
    pub async fn get_booked_seats(&self, show_id: i32) -> Result<Vec<i32>, sqlx::Error> {
        if let Some(seats) = self.get_seats_from_cache(show_id).await {
            return Ok(seats);
        }

        let version = self.seats_version(show_id).await;
        let seats = self.load_seats_from_db(show_id).await?;
        if let Some(version) = version {
            self.save_seats_if_current(show_id, version, &seats).await;
        }
        Ok(seats)
    }

    // Инвалидировать кеш мест: новая версия + удаление ключа одной транзакцией
    pub async fn invalidate_seats(&self, show_id: i32) {
        let Some(redis) = &self.redis else { return };
        let mut conn = redis.conn.clone();
        let res: Result<(), _> = redis::pipe()
            .atomic()
            .incr(version_key(show_id), 1)
            .ignore()
            .del(seats_key(show_id))
            .ignore()
            .query_async(&mut conn)
            .await;
        match res {
            Ok(()) => debug!("Invalidated seats cache for show {}", show_id),
            Err(e) => warn!("failed to invalidate seats cache for show {}: {:?}", show_id, e),
        }
    }

    async fn load_seats_from_db(&self, show_id: i32) -> Result<Vec<i32>, sqlx::Error> {
        sqlx::query_scalar::<_, i32>(
            "SELECT seat_no FROM booked_seats WHERE show_id = $1 ORDER BY seat_no"
        )
        .bind(show_id)
        .fetch_all(&self.db.pool)
        .await
    }

    async fn get_seats_from_cache(&self, show_id: i32) -> Option<Vec<i32>> {
        let redis = self.redis.as_ref()?;
        let mut conn = redis.conn.clone();
        let data: Option<String> = match conn.get(seats_key(show_id)).await {
            Ok(data) => data,
            Err(e) => {
                warn!("redis get failed for show {}: {:?}", show_id, e);
                return None;
            }
        };
        serde_json::from_str(&data?).ok()
    }

    // None - Redis недоступен, писать в кеш нельзя
    async fn seats_version(&self, show_id: i32) -> Option<i64> {
        let redis = self.redis.as_ref()?;
        let mut conn = redis.conn.clone();
        match conn.get::<_, Option<i64>>(version_key(show_id)).await {
            Ok(version) => Some(version.unwrap_or(0)),
            Err(e) => {
                warn!("redis get failed for seats version of show {}: {:?}", show_id, e);
                None
            }
        }
    }

    async fn save_seats_if_current(&self, show_id: i32, version: i64, seats: &[i32]) -> bool {
        let Some(redis) = &self.redis else { return false };
        let Ok(data) = serde_json::to_string(seats) else { return false };
        let mut conn = redis.conn.clone();
        let script = Script::new(SAVE_IF_CURRENT);
        let res: Result<i32, _> = script
            .key(seats_key(show_id))
            .key(version_key(show_id))
            .arg(version)
            .arg(data)
            .arg(self.ttl.seats_ttl_secs)
            .invoke_async(&mut conn)
            .await;
        match res {
            Ok(1) => true,
            Ok(_) => {
                debug!("Seats of show {} changed during load, not caching", show_id);
                false
            }
            Err(e) => {
                warn!("failed to cache seats for show {}: {:?}", show_id, e);
                false
            }
        }
    }
}

fn seats_key(show_id: i32) -> String {
    format!("seats:{}", show_id)
}

fn version_key(show_id: i32) -> String {
    format!("seats:{}:ver", show_id)
}
