pub mod user;
pub mod movie;
pub mod show;
pub mod review;
pub mod watchlist;
pub mod booking;

pub use user::{PublicUser, User};
pub use movie::{CastMember, MovieDetail, MovieSummary};
pub use show::{ShowInfo, ShowTime};
pub use review::Review;
pub use watchlist::WatchlistEntry;
pub use booking::{BookingHistoryRow, BookingSummary};
