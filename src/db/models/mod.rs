mod session;

pub use session::{DailyAppStats, DatabaseStats, UsageSession};
