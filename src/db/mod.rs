mod connection;
mod migrations;
mod models;
mod repositories;

pub use connection::Database;
pub use models::{DailyAppStats, DatabaseStats, UsageSession};
