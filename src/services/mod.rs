pub mod auth;
pub mod calendar;
pub mod downstream;
pub mod exchange;
pub mod session;
