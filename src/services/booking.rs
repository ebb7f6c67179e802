//! booking.rs
//!
//! Транзакционное бронирование мест на сеанс.
//!
//! Порядок в транзакции:
//! 1.  Проверяем, что сеанс существует.
//! 2.  Ищем пересечения запрошенных мест с уже забронированными.
//! 3.  Создаём бронь с кодом подтверждения и вставляем по строке на место.
//! 4.  Коммитим.
//!
//! Проверка в п.2 сама по себе гонку не закрывает: два запроса могут пройти её
//! одновременно. Гонку закрывает первичный ключ `booked_seats (show_id, seat_no)`:
//! проигравший получает unique violation, который превращается в тот же конфликт.

use chrono::{DateTime, Utc};
use serde::Serialize;
use sqlx::PgPool;
use thiserror::Error;
use tracing::{info, warn};

use crate::models::ShowInfo;
use crate::services::seating::{SeatGrid, SeatPosition};

const SEATS_PRIMARY_KEY: &str = "booked_seats_pkey";
const CODE_ATTEMPTS: usize = 3;
const BASE36: &[u8; 36] = b"0123456789ABCDEFGHIJKLMNOPQRSTUVWXYZ";

#[derive(Debug, Error)]
pub enum BookingError {
    #[error("show not found")]
    ShowNotFound,
    #[error("booking not found")]
    BookingNotFound,
    #[error("booking belongs to another user")]
    NotOwner,
    #[error("seats already booked: {0:?}")]
    SeatsTaken(Vec<i32>),
    #[error("could not allocate a unique confirmation code")]
    CodeExhausted,
    #[error(transparent)]
    Database(#[from] sqlx::Error),
}

#[derive(Debug, Clone, Serialize)]
pub struct BookedShow {
    pub show_id: i32,
    pub movie_name: String,
    pub theatre_name: String,
    pub time: DateTime<Utc>,
}

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct BookingConfirmation {
    pub booking_id: i64,
    pub confirmation_code: String,
    pub booking_time: DateTime<Utc>,
    pub total_seats: usize,
    pub seats: Vec<SeatPosition>,
    pub show: BookedShow,
}

#[derive(Debug, Clone, Serialize)]
pub struct CancelledBooking {
    pub booking_id: i64,
    pub show_id: i32,
    pub released_seats: Vec<i32>,
}

/// "BK" + последние 6 цифр unix-времени в мс + 4 символа base36 из `entropy`.
pub fn confirmation_code(now: DateTime<Utc>, entropy: u128) -> String {
    let millis = now.timestamp_millis().rem_euclid(1_000_000);
    let mut code = format!("BK{millis:06}");
    let mut rest = entropy;
    for _ in 0..4 {
        code.push(char::from(BASE36[(rest % 36) as usize]));
        rest /= 36;
    }
    code
}

pub fn generate_confirmation_code() -> String {
    confirmation_code(Utc::now(), uuid::Uuid::new_v4().as_u128())
}

#[derive(Clone)]
pub struct BookingService {
    pool: PgPool,
    grid: SeatGrid,
}

impl BookingService {
    pub fn new(pool: PgPool, grid: SeatGrid) -> Self {
        Self { pool, grid }
    }

    /// Бронирует уже провалидированные (`SeatGrid::validate_selection`) места.
    pub async fn book_seats(
        &self,
        show_id: i32,
        user_id: i32,
        seats: &[i32],
    ) -> Result<BookingConfirmation, BookingError> {
        let mut tx = self.pool.begin().await?;

        let show = ShowInfo::find(&mut *tx, show_id)
            .await?
            .ok_or(BookingError::ShowNotFound)?;

        let taken: Vec<i32> = sqlx::query_scalar(
            "SELECT seat_no FROM booked_seats
             WHERE show_id = $1 AND seat_no = ANY($2)
             ORDER BY seat_no"
        )
        .bind(show_id)
        .bind(seats)
        .fetch_all(&mut *tx)
        .await?;

        if !taken.is_empty() {
            tx.rollback().await?;
            return Err(BookingError::SeatsTaken(taken));
        }

        // коллизия кода не ломает транзакцию благодаря ON CONFLICT DO NOTHING
        let mut inserted: Option<(i64, String, DateTime<Utc>)> = None;
        for _ in 0..CODE_ATTEMPTS {
            let code = generate_confirmation_code();
            let row: Option<(i64, DateTime<Utc>)> = sqlx::query_as(
                "INSERT INTO bookings (confirmation_code, user_id, show_id)
                 VALUES ($1, $2, $3)
                 ON CONFLICT (confirmation_code) DO NOTHING
                 RETURNING booking_id, created_at"
            )
            .bind(&code)
            .bind(user_id)
            .bind(show_id)
            .fetch_optional(&mut *tx)
            .await?;

            if let Some((id, created_at)) = row {
                inserted = Some((id, code, created_at));
                break;
            }
            warn!("confirmation code collision on {}, regenerating", code);
        }
        let (booking_id, code, created_at) = inserted.ok_or(BookingError::CodeExhausted)?;

        let insert_seats = sqlx::query(
            "INSERT INTO booked_seats (booking_id, show_id, seat_no)
             SELECT $1, $2, UNNEST($3::int4[])"
        )
        .bind(booking_id)
        .bind(show_id)
        .bind(seats)
        .execute(&mut *tx)
        .await;

        if let Err(e) = insert_seats {
            if is_seat_conflict(&e) {
                // параллельная бронь успела раньше: откатываемся и сообщаем какие места заняты
                tx.rollback().await?;
                let taken = self.taken_among(show_id, seats).await?;
                info!("show {}: lost race for seats {:?}", show_id, taken);
                return Err(BookingError::SeatsTaken(taken));
            }
            return Err(e.into());
        }

        tx.commit().await?;

        info!(
            "booking {} ({}) confirmed: user {} show {} seats {:?}",
            booking_id, code, user_id, show_id, seats
        );

        Ok(BookingConfirmation {
            booking_id,
            confirmation_code: code,
            booking_time: created_at,
            total_seats: seats.len(),
            seats: seats.iter().filter_map(|&s| self.grid.position(s)).collect(),
            show: BookedShow {
                show_id: show.show_id,
                movie_name: show.movie_name,
                theatre_name: show.theatre_name,
                time: show.time,
            },
        })
    }

    /// Отмена брони владельцем. Места освобождаются каскадом.
    pub async fn cancel_booking(
        &self,
        booking_id: i64,
        user_id: i32,
    ) -> Result<CancelledBooking, BookingError> {
        let mut tx = self.pool.begin().await?;

        let owner: Option<(i32, i32)> = sqlx::query_as(
            "SELECT user_id, show_id FROM bookings WHERE booking_id = $1 FOR UPDATE"
        )
        .bind(booking_id)
        .fetch_optional(&mut *tx)
        .await?;

        let (owner_id, show_id) = owner.ok_or(BookingError::BookingNotFound)?;
        if owner_id != user_id {
            tx.rollback().await?;
            return Err(BookingError::NotOwner);
        }

        let released_seats: Vec<i32> = sqlx::query_scalar(
            "DELETE FROM booked_seats WHERE booking_id = $1 RETURNING seat_no"
        )
        .bind(booking_id)
        .fetch_all(&mut *tx)
        .await?;

        sqlx::query("DELETE FROM bookings WHERE booking_id = $1")
            .bind(booking_id)
            .execute(&mut *tx)
            .await?;

        tx.commit().await?;

        info!("booking {} cancelled, {} seats released", booking_id, released_seats.len());

        Ok(CancelledBooking {
            booking_id,
            show_id,
            released_seats,
        })
    }

    async fn taken_among(&self, show_id: i32, seats: &[i32]) -> Result<Vec<i32>, sqlx::Error> {
        sqlx::query_scalar(
            "SELECT seat_no FROM booked_seats
             WHERE show_id = $1 AND seat_no = ANY($2)
             ORDER BY seat_no"
        )
        .bind(show_id)
        .bind(seats)
        .fetch_all(&self.pool)
        .await
    }
}

fn is_seat_conflict(err: &sqlx::Error) -> bool {
    match err {
        sqlx::Error::Database(db) => {
            db.is_unique_violation() && db.constraint() == Some(SEATS_PRIMARY_KEY)
        }
        _ => false,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;

    struct Fixture {
        alice: i32,
        bob: i32,
        show_id: i32,
    }

    async fn seed(pool: &PgPool) -> Fixture {
        let alice: i32 = sqlx::query_scalar(
            "INSERT INTO users (name, password_hash) VALUES ('alice', 'x') RETURNING user_id"
        )
        .fetch_one(pool)
        .await
        .unwrap();
        let bob: i32 = sqlx::query_scalar(
            "INSERT INTO users (name, password_hash) VALUES ('bob', 'x') RETURNING user_id"
        )
        .fetch_one(pool)
        .await
        .unwrap();
        let movie_id: i32 = sqlx::query_scalar(
            "INSERT INTO movies (name, release_date) VALUES ('Heat', '1995-12-15') RETURNING movie_id"
        )
        .fetch_one(pool)
        .await
        .unwrap();
        let district_id: i32 = sqlx::query_scalar(
            "INSERT INTO districts (name) VALUES ('Central') RETURNING district_id"
        )
        .fetch_one(pool)
        .await
        .unwrap();
        let theatre_id: i32 = sqlx::query_scalar(
            "INSERT INTO theatres (name, district_id) VALUES ('Odeon', $1) RETURNING theatre_id"
        )
        .bind(district_id)
        .fetch_one(pool)
        .await
        .unwrap();
        let show_id: i32 = sqlx::query_scalar(
            "INSERT INTO shows (movie_id, theatre_id, show_time)
             VALUES ($1, $2, NOW() + INTERVAL '1 day') RETURNING show_id"
        )
        .bind(movie_id)
        .bind(theatre_id)
        .fetch_one(pool)
        .await
        .unwrap();
        Fixture { alice, bob, show_id }
    }

    async fn seat_rows(pool: &PgPool, show_id: i32) -> i64 {
        sqlx::query_scalar("SELECT COUNT(*) FROM booked_seats WHERE show_id = $1")
            .bind(show_id)
            .fetch_one(pool)
            .await
            .unwrap()
    }

    #[sqlx::test(migrations = "./migrations")]
    async fn booking_returns_confirmation(pool: PgPool) {
        let f = seed(&pool).await;
        let service = BookingService::new(pool.clone(), SeatGrid::default());

        let booking = service.book_seats(f.show_id, f.alice, &[1, 16]).await.unwrap();
        assert_eq!(booking.total_seats, 2);
        assert!(booking.confirmation_code.starts_with("BK"));
        assert_eq!(booking.show.movie_name, "Heat");
        assert_eq!(booking.show.theatre_name, "Odeon");
        assert_eq!(booking.seats[0].row_letter, 'A');
        assert_eq!(booking.seats[1].row_letter, 'B');
        assert_eq!(seat_rows(&pool, f.show_id).await, 2);
    }

    #[sqlx::test(migrations = "./migrations")]
    async fn concurrent_bookings_of_same_seats_have_one_winner(pool: PgPool) {
        let f = seed(&pool).await;
        let service = BookingService::new(pool.clone(), SeatGrid::default());
        let seats = vec![40, 41, 42];

        let handles: Vec<_> = (0..6)
            .map(|i| {
                let service = service.clone();
                let seats = seats.clone();
                let user = if i % 2 == 0 { f.alice } else { f.bob };
                tokio::spawn(async move { service.book_seats(f.show_id, user, &seats).await })
            })
            .collect();

        let mut winners = 0;
        for handle in handles {
            match handle.await.unwrap() {
                Ok(_) => winners += 1,
                Err(BookingError::SeatsTaken(taken)) => assert!(!taken.is_empty()),
                Err(e) => panic!("unexpected error: {e:?}"),
            }
        }
        assert_eq!(winners, 1);
        assert_eq!(seat_rows(&pool, f.show_id).await, seats.len() as i64);
    }

    #[sqlx::test(migrations = "./migrations")]
    async fn overlapping_booking_reports_only_taken_seats(pool: PgPool) {
        let f = seed(&pool).await;
        let service = BookingService::new(pool.clone(), SeatGrid::default());

        service.book_seats(f.show_id, f.alice, &[5, 6]).await.unwrap();
        let err = service.book_seats(f.show_id, f.bob, &[6, 7]).await.unwrap_err();
        assert!(matches!(err, BookingError::SeatsTaken(ref seats) if seats == &vec![6]));
        // место 7 от откатанной брони не осталось
        assert_eq!(seat_rows(&pool, f.show_id).await, 2);
    }

    #[sqlx::test(migrations = "./migrations")]
    async fn unknown_show_is_not_found(pool: PgPool) {
        let f = seed(&pool).await;
        let service = BookingService::new(pool, SeatGrid::default());

        let err = service.book_seats(999_999, f.alice, &[1]).await.unwrap_err();
        assert!(matches!(err, BookingError::ShowNotFound));
    }

    #[sqlx::test(migrations = "./migrations")]
    async fn only_owner_can_cancel(pool: PgPool) {
        let f = seed(&pool).await;
        let service = BookingService::new(pool.clone(), SeatGrid::default());
        let booking = service.book_seats(f.show_id, f.alice, &[9, 8]).await.unwrap();

        let err = service.cancel_booking(booking.booking_id, f.bob).await.unwrap_err();
        assert!(matches!(err, BookingError::NotOwner));
        assert_eq!(seat_rows(&pool, f.show_id).await, 2);

        let err = service.cancel_booking(booking.booking_id + 1000, f.alice).await.unwrap_err();
        assert!(matches!(err, BookingError::BookingNotFound));

        let cancelled = service.cancel_booking(booking.booking_id, f.alice).await.unwrap();
        let mut released = cancelled.released_seats;
        released.sort_unstable();
        assert_eq!(released, vec![8, 9]);
        assert_eq!(cancelled.show_id, f.show_id);
        assert_eq!(seat_rows(&pool, f.show_id).await, 0);

        let err = service.cancel_booking(booking.booking_id, f.alice).await.unwrap_err();
        assert!(matches!(err, BookingError::BookingNotFound));
    }

    #[sqlx::test(migrations = "./migrations")]
    async fn cancelled_seats_can_be_booked_again(pool: PgPool) {
        let f = seed(&pool).await;
        let service = BookingService::new(pool.clone(), SeatGrid::default());

        let first = service.book_seats(f.show_id, f.alice, &[20, 21]).await.unwrap();
        service.cancel_booking(first.booking_id, f.alice).await.unwrap();

        let second = service.book_seats(f.show_id, f.bob, &[21, 20]).await.unwrap();
        assert_ne!(second.booking_id, first.booking_id);
        assert_eq!(seat_rows(&pool, f.show_id).await, 2);
    }

    #[test]
    fn code_has_prefix_timestamp_and_suffix() {
        let now = Utc.timestamp_millis_opt(1_729_450_123_456).unwrap();
        let code = confirmation_code(now, 0);
        assert_eq!(code, "BK1234560000");
    }

    #[test]
    fn code_suffix_is_base36_of_entropy() {
        let now = Utc.timestamp_millis_opt(42).unwrap();
        // 35 + 1*36 -> "Z1", остальные разряды нули
        assert_eq!(confirmation_code(now, 35 + 36), "BK000042Z100");
    }

    #[test]
    fn generated_codes_are_well_formed() {
        for _ in 0..50 {
            let code = generate_confirmation_code();
            assert_eq!(code.len(), 12);
            assert!(code.starts_with("BK"));
            assert!(code[2..8].chars().all(|c| c.is_ascii_digit()));
            assert!(code[8..].chars().all(|c| c.is_ascii_digit() || c.is_ascii_uppercase()));
        }
    }

    #[test]
    fn non_database_errors_are_not_seat_conflicts() {
        assert!(!is_seat_conflict(&sqlx::Error::RowNotFound));
    }
}
