pub mod auth;
pub mod booking;
pub mod catalogue;
pub mod seating;
pub mod tmdb;
