pub mod health;
pub mod auth;
pub mod movies;
pub mod reviews;
pub mod watchlist;
pub mod profile;
pub mod bookings;

use axum::Router;
use std::sync::Arc;

pub fn routes() -> Router<Arc<crate::AppState>> {
    Router::new()
        .merge(health::routes())
        .nest("/auth", auth::routes())
        .nest("/movies", movies::routes())
        .nest("/reviews", reviews::routes())
        .nest("/watchlist", watchlist::routes())
        .nest("/profile", profile::routes())
        .nest("/bookings", bookings::routes())
}
