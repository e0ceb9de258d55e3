use std::{sync::Arc, time::Duration};

use log::{debug, info};
use tokio::{sync::mpsc, task::JoinHandle, time::sleep};

use crate::{preferences::UserPreferences, service::ServiceEvent};

use super::state::BannerState;

/// Floor applied to the configured interval.
pub const MIN_BANNER_INTERVAL_MS: u64 = 5_000;

/// Arms the one-shot timer that decides when the next banner appears.
///
/// At most one timer is ever armed: the `scheduled` flag is set when a timer
/// is placed and only cleared once the resulting banner is shown, suppressed,
/// or cancelled. The timer fires by posting [`ServiceEvent::BannerDue`] back
/// into the service loop rather than touching banner state itself.
pub struct BannerScheduler {
    preferences: Arc<UserPreferences>,
    events: mpsc::Sender<ServiceEvent>,
    timer: Option<JoinHandle<()>>,
    scheduled: bool,
}

impl BannerScheduler {
    pub fn new(preferences: Arc<UserPreferences>, events: mpsc::Sender<ServiceEvent>) -> Self {
        Self {
            preferences,
            events,
            timer: None,
            scheduled: false,
        }
    }

    /// Arms the timer. Returns false without arming when banners are
    /// disabled, no session is active, a banner is already on screen, or a
    /// timer is already pending.
    pub fn schedule_next(&mut self, current_state: BannerState, has_active_session: bool) -> bool {
        if !self.preferences.show_banner() {
            debug!("Not scheduling: banners disabled");
            return false;
        }
        if !has_active_session {
            debug!("Not scheduling: no active session");
            return false;
        }
        if current_state != BannerState::Hidden {
            debug!("Not scheduling: banner already visible ({current_state:?})");
            return false;
        }
        if self.scheduled {
            debug!("Not scheduling: timer already pending");
            return false;
        }

        let interval_ms = self.preferences.banner_interval_ms().max(MIN_BANNER_INTERVAL_MS);
        info!("Next banner in {}s", interval_ms / 1_000);

        if let Some(timer) = self.timer.take() {
            timer.abort();
        }
        let events = self.events.clone();
        self.timer = Some(tokio::spawn(async move {
            sleep(Duration::from_millis(interval_ms)).await;
            let _ = events.send(ServiceEvent::BannerDue).await;
        }));
        self.scheduled = true;
        true
    }

    /// The armed timer produced a visible banner; the slot is free again.
    pub fn banner_shown(&mut self) {
        self.scheduled = false;
    }

    /// The armed timer fired but the banner was not shown. Clears the slot
    /// so a new timer can be armed; without this the scheduler would stay
    /// silent for the rest of the session.
    pub fn banner_suppressed(&mut self) {
        self.scheduled = false;
    }

    pub fn cancel_all(&mut self) {
        if let Some(timer) = self.timer.take() {
            timer.abort();
        }
        self.scheduled = false;
    }
}

impl Drop for BannerScheduler {
    fn drop(&mut self) {
        self.cancel_all();
    }
}
