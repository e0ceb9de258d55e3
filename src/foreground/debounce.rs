use log::debug;

/// Repeated events for the same package inside this window are dropped.
pub const SAME_PACKAGE_WINDOW_MS: i64 = 500;

/// Quiet period an accepted candidate must survive before it commits.
pub const SETTLE_DELAY_MS: u64 = 300;

/// First-stage filter over the raw window-focus event stream.
///
/// `observe` decides whether an event becomes a transition candidate; the
/// caller then arms (or re-arms) a settle timer of [`SETTLE_DELAY_MS`] so
/// that flapping during app-switch animations collapses into one committed
/// transition.
#[derive(Debug, Default)]
pub struct FocusDebouncer {
    last_package: Option<String>,
    last_event_ms: i64,
}

impl FocusDebouncer {
    pub fn new() -> Self {
        Self::default()
    }

    /// Returns true when the event should start (or restart) the settle
    /// timer; false when it is a duplicate to discard.
    pub fn observe(&mut self, package_name: &str, timestamp_ms: i64) -> bool {
        if self.last_package.as_deref() == Some(package_name)
            && timestamp_ms - self.last_event_ms < SAME_PACKAGE_WINDOW_MS
        {
            debug!("Debounce: dropping rapid repeat for {package_name}");
            return false;
        }

        self.last_package = Some(package_name.to_string());
        self.last_event_ms = timestamp_ms;
        true
    }
}
