use std::{sync::Arc, time::Duration};

use log::{debug, info, warn};
use tokio::{
    sync::mpsc,
    task::JoinHandle,
    time::{interval, MissedTickBehavior},
};
use tokio_util::sync::CancellationToken;

use crate::service::ServiceEvent;

use super::{is_in_foreground, ForegroundQuery};

const CHECK_INTERVAL: Duration = Duration::from_millis(500);
const LOOKBACK_WINDOW: Duration = Duration::from_secs(2);

/// Polling confirmation that the tracked package still owns the foreground.
///
/// Covers exits the focus-event stream misses (transient system overlays
/// stealing focus). On a foreground-to-background transition the poll task
/// posts [`ServiceEvent::ForegroundLost`] and stops itself.
pub struct ForegroundPoller {
    query: Arc<dyn ForegroundQuery>,
    events: mpsc::Sender<ServiceEvent>,
    handle: Option<JoinHandle<()>>,
    cancel_token: Option<CancellationToken>,
}

impl ForegroundPoller {
    pub fn new(query: Arc<dyn ForegroundQuery>, events: mpsc::Sender<ServiceEvent>) -> Self {
        Self {
            query,
            events,
            handle: None,
            cancel_token: None,
        }
    }

    /// Starts polling for the given package, replacing any previous poll
    /// task so at most one is ever in flight.
    pub fn start(&mut self, package_name: String) {
        self.stop();

        if !self.query.has_query_permission() {
            // Degraded mode: without the permission every check would
            // report "still foreground", so polling is pointless.
            debug!("Foreground poller idle: usage query permission not granted");
            return;
        }

        let cancel_token = CancellationToken::new();
        let token = cancel_token.clone();
        let query = Arc::clone(&self.query);
        let events = self.events.clone();

        let handle = tokio::spawn(async move {
            let mut ticker = interval(CHECK_INTERVAL);
            ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);
            let mut was_in_foreground = true;

            loop {
                tokio::select! {
                    _ = ticker.tick() => {
                        let in_foreground =
                            is_in_foreground(query.as_ref(), &package_name, LOOKBACK_WINDOW);
                        if was_in_foreground && !in_foreground {
                            info!("Foreground lost for {package_name}");
                            if events
                                .send(ServiceEvent::ForegroundLost {
                                    package_name: package_name.clone(),
                                })
                                .await
                                .is_err()
                            {
                                warn!("Service loop gone, dropping foreground-lost signal");
                            }
                            break;
                        }
                        was_in_foreground = in_foreground;
                    }
                    _ = token.cancelled() => {
                        debug!("Foreground poller cancelled for {package_name}");
                        break;
                    }
                }
            }
        });

        self.handle = Some(handle);
        self.cancel_token = Some(cancel_token);
    }

    /// Stops any in-flight poll task. Idempotent.
    pub fn stop(&mut self) {
        if let Some(token) = self.cancel_token.take() {
            token.cancel();
        }
        if let Some(handle) = self.handle.take() {
            handle.abort();
        }
    }
}

impl Drop for ForegroundPoller {
    fn drop(&mut self) {
        self.stop();
    }
}
