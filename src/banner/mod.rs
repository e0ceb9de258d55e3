//! Overlay banner: interval scheduling, the visible state machine and the
//! rendering seam behind it.

mod manager;
mod messages;
mod scheduler;
mod state;
mod surface;

pub use manager::BannerManager;
pub use messages::{MessageRotation, MOTIVATIONAL_MESSAGES};
pub use scheduler::{BannerScheduler, MIN_BANNER_INTERVAL_MS};
pub use state::{BannerState, SeverityTier, TimeStats};
pub use surface::{BannerSurface, ExpandedContent, MinimizedContent};
