pub mod auth;
pub mod booking;
pub mod config;
pub mod database;
pub mod date;
pub mod error;
pub mod handlers;
pub mod listing;
pub mod query;
pub mod rating;
pub mod settlement;
