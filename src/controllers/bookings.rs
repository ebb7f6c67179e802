use axum::{
    extract::{Path, State},
    http::StatusCode,
    response::IntoResponse,
    routing::{delete, get, post},
    Json, Router,
};
use serde::Deserialize;
use serde_json::json;
use std::collections::HashSet;
use std::sync::Arc;

use crate::error::{AppError, AppResult};
use crate::middleware::AuthUser;
use crate::models::booking::group_history;
use crate::models::{BookingHistoryRow, ShowInfo};
use crate::AppState;

pub fn routes() -> Router<Arc<AppState>> {
    Router::new()
        .route("/shows/{show_id}/seats", get(get_seats))
        .route("/shows/{show_id}/book", post(create_booking))
        .route("/user/{user_id}/bookings", get(get_user_bookings))
        .route("/bookings/{booking_id}", delete(cancel_booking))
}

/* ---------- SEATS ---------- */

// GET /bookings/shows/{show_id}/seats
async fn get_seats(
    State(state): State<Arc<AppState>>,
    Path(show_id): Path<i32>,
) -> AppResult<impl IntoResponse> {
    if show_id <= 0 {
        return Err(AppError::BadRequest("show_id must be > 0".into()));
    }

    let show = ShowInfo::find(&state.db.pool, show_id)
        .await?
        .ok_or_else(|| AppError::NotFound("Show not found".into()))?;

    let booked: HashSet<i32> = state.cache.get_booked_seats(show_id).await?.into_iter().collect();
    let map = state.grid.seat_map(&booked);

    Ok(Json(json!({
        "showInfo": show,
        "seatsByRow": map.seats_by_row,
        "totalSeats": map.total_seats,
        "availableSeats": map.available_seats,
        "bookedSeats": map.booked_seats,
    })))
}

/* ---------- BOOKINGS ---------- */

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CreateBookingRequest {
    pub selected_seats: Vec<i32>,
}

// POST /bookings/shows/{show_id}/book
async fn create_booking(
    State(state): State<Arc<AppState>>,
    user: AuthUser,
    Path(show_id): Path<i32>,
    Json(req): Json<CreateBookingRequest>,
) -> AppResult<impl IntoResponse> {
    if show_id <= 0 {
        return Err(AppError::BadRequest("show_id must be > 0".into()));
    }

    let seats = state
        .grid
        .validate_selection(&req.selected_seats, state.config.booking.max_seats_per_booking)?;

    tracing::debug!("booking request: user {} show {} seats {:?}", user.user_id, show_id, seats);

    let booking = state.bookings.book_seats(show_id, user.user_id, &seats).await?;

    state.cache.invalidate_seats(show_id).await;

    Ok((
        StatusCode::CREATED,
        Json(json!({
            "success": true,
            "message": "Booking confirmed successfully!",
            "booking": booking,
        })),
    ))
}

// GET /bookings/user/{user_id}/bookings
async fn get_user_bookings(
    State(state): State<Arc<AppState>>,
    user: AuthUser,
    Path(user_id): Path<i32>,
) -> AppResult<impl IntoResponse> {
    user.ensure_is(user_id)?;

    let rows = BookingHistoryRow::for_user(user_id, &state.db.pool).await?;
    let bookings = group_history(rows);

    Ok(Json(json!({
        "total": bookings.len(),
        "bookings": bookings,
    })))
}

// DELETE /bookings/bookings/{booking_id}
async fn cancel_booking(
    State(state): State<Arc<AppState>>,
    user: AuthUser,
    Path(booking_id): Path<i64>,
) -> AppResult<impl IntoResponse> {
    if booking_id <= 0 {
        return Err(AppError::BadRequest("booking_id must be > 0".into()));
    }

    let cancelled = state.bookings.cancel_booking(booking_id, user.user_id).await?;

    // Инвалидируем кеш мест этого сеанса
    state.cache.invalidate_seats(cancelled.show_id).await;

    Ok(Json(json!({
        "success": true,
        "message": "Booking cancelled successfully",
        "booking": cancelled,
    })))
}
