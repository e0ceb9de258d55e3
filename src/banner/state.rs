use crate::utils::time::format_duration;

/// Lifecycle of the overlay banner.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BannerState {
    /// Off screen, waiting for the next scheduled interval.
    Hidden,
    /// Minimized strip on screen, waiting for a tap.
    VisibleWaiting,
    /// Expanded by the user, showing full stats.
    VisibleExpanded,
}

/// Time figures rendered on the banner.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct TimeStats {
    pub session_ms: i64,
    pub today_total_ms: i64,
}

impl TimeStats {
    pub fn formatted_session(&self) -> String {
        format_duration(self.session_ms)
    }

    pub fn formatted_today_total(&self) -> String {
        format_duration(self.today_total_ms)
    }
}

/// Accent tier for the banner icon, a step function of session length.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SeverityTier {
    Relaxed,
    Notice,
    Warning,
    Critical,
}

impl SeverityTier {
    pub fn for_elapsed_ms(elapsed_ms: i64) -> Self {
        let minutes = elapsed_ms / 60_000;
        match minutes {
            m if m < 5 => Self::Relaxed,
            m if m < 15 => Self::Notice,
            m if m < 30 => Self::Warning,
            _ => Self::Critical,
        }
    }

    pub fn accent_color(&self) -> &'static str {
        match self {
            Self::Relaxed => "#4CAF50",
            Self::Notice => "#FFC107",
            Self::Warning => "#FF9800",
            Self::Critical => "#F44336",
        }
    }
}
