use chrono::{DateTime, Utc};
use serde::Serialize;
use sqlx::{FromRow, PgPool};

/// Одна строка истории: бронь + одно место.
#[derive(Debug, Clone, FromRow)]
pub struct BookingHistoryRow {
    pub booking_id: i64,
    pub confirmation_code: String,
    pub created_at: DateTime<Utc>,
    pub show_id: i32,
    pub show_time: DateTime<Utc>,
    pub movie_name: String,
    pub movie_poster: Option<String>,
    pub theatre_name: String,
    pub seat_no: i32,
}

#[derive(Debug, Clone, Serialize)]
pub struct BookingSummary {
    pub booking_id: i64,
    pub confirmation_code: String,
    pub booked_at: DateTime<Utc>,
    pub show_id: i32,
    pub show_time: DateTime<Utc>,
    pub movie_name: String,
    pub movie_poster: Option<String>,
    pub theatre_name: String,
    pub total_seats: usize,
    pub seats: Vec<i32>,
}

impl BookingHistoryRow {
    /// Строки упорядочены по брони (новые первыми), внутри брони по месту.
    pub async fn for_user(user_id: i32, pool: &PgPool) -> Result<Vec<BookingHistoryRow>, sqlx::Error> {
        sqlx::query_as::<_, BookingHistoryRow>(
            r#"
            SELECT b.booking_id, b.confirmation_code, b.created_at, b.show_id,
                   s.show_time, m.name AS movie_name, m.poster AS movie_poster,
                   t.name AS theatre_name, bs.seat_no
            FROM bookings b
            JOIN booked_seats bs ON bs.booking_id = b.booking_id
            JOIN shows s ON s.show_id = b.show_id
            JOIN movies m ON m.movie_id = s.movie_id
            JOIN theatres t ON t.theatre_id = s.theatre_id
            WHERE b.user_id = $1
            ORDER BY b.booking_id DESC, bs.seat_no
            "#
        )
        .bind(user_id)
        .fetch_all(pool)
        .await
    }
}

/// Сворачивает строки истории в брони, сохраняя порядок.
pub fn group_history(rows: Vec<BookingHistoryRow>) -> Vec<BookingSummary> {
    let mut out: Vec<BookingSummary> = Vec::new();
    for row in rows {
        match out.last_mut() {
            Some(last) if last.booking_id == row.booking_id => {
                last.seats.push(row.seat_no);
                last.total_seats = last.seats.len();
            }
            _ => out.push(BookingSummary {
                booking_id: row.booking_id,
                confirmation_code: row.confirmation_code,
                booked_at: row.created_at,
                show_id: row.show_id,
                show_time: row.show_time,
                movie_name: row.movie_name,
                movie_poster: row.movie_poster,
                theatre_name: row.theatre_name,
                total_seats: 1,
                seats: vec![row.seat_no],
            }),
        }
    }
    out
}
