//! Foreground signal source: a debounced window-focus event stream plus an
//! independent polling confirmation of which package owns the foreground.

mod debounce;
mod poller;

pub use debounce::{FocusDebouncer, SAME_PACKAGE_WINDOW_MS, SETTLE_DELAY_MS};
pub use poller::ForegroundPoller;

use std::time::Duration;

/// OS-level query surface for foreground-package checks.
///
/// Implementations wrap whatever usage-stats facility the platform offers;
/// tests substitute fakes.
pub trait ForegroundQuery: Send + Sync {
    /// Whether the process holds the permission required for usage queries.
    fn has_query_permission(&self) -> bool;

    /// The package most recently used within the given lookback window, or
    /// `None` when the OS returns nothing useful.
    fn recent_foreground_package(&self, window: Duration) -> Option<String>;
}

/// Checks whether a package currently owns the foreground.
///
/// Fails open: without the query permission, or when the OS has no answer,
/// the package is assumed to still be foreground so sessions are never
/// closed on missing data.
pub fn is_in_foreground(
    query: &dyn ForegroundQuery,
    package_name: &str,
    window: Duration,
) -> bool {
    if !query.has_query_permission() {
        return true;
    }
    match query.recent_foreground_package(window) {
        Some(top) => top == package_name,
        None => true,
    }
}
