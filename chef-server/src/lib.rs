pub mod config;
pub mod errors;
pub mod routes;
pub mod templates;
pub mod uploads;
