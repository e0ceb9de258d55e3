//! Per-app usage tracking with gentle overlay reminders.
//!
//! The crate records how long monitored apps hold the foreground, persists
//! those sessions to SQLite, and periodically surfaces a small banner with
//! the running totals. [`service::MonitorService`] is the entry point; feed
//! it focus events and it does the rest.

pub mod banner;
pub mod db;
pub mod foreground;
pub mod preferences;
pub mod service;
pub mod tracker;
pub mod utils;

pub use banner::{BannerState, BannerSurface, ExpandedContent, MinimizedContent};
pub use db::{DailyAppStats, DatabaseStats, Database, UsageSession};
pub use foreground::ForegroundQuery;
pub use preferences::UserPreferences;
pub use service::{MonitorService, ServiceEvent};
pub use tracker::SessionInfo;
