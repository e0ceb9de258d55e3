//! The monitoring service: one event loop owning the session tracker and
//! banner state machine.
//!
//! Every input (focus events, timer expiries, taps, poller signals) arrives
//! as a [`ServiceEvent`] on one channel and is applied by a single task, so
//! transitions are totally ordered and the state needs no locks. Timers are
//! spawned tasks that post their expiry back into the same channel.

use std::{sync::Arc, time::Duration};

use chrono::Duration as ChronoDuration;
use log::{debug, error, info, warn};
use tokio::{
    sync::{mpsc, watch},
    task::JoinHandle,
    time::sleep,
};

use crate::{
    banner::{BannerManager, BannerSurface},
    db::Database,
    foreground::{FocusDebouncer, ForegroundPoller, ForegroundQuery, SETTLE_DELAY_MS},
    preferences::UserPreferences,
    tracker::{PackageClassifier, SessionInfo, SessionTracker, MAX_SESSION_AGE_MS},
    utils::clock::Clock,
};

/// Pause between closing the previous session and opening the next on an
/// app switch, so the two writes never race in the store.
const OPEN_DELAY_MS: u64 = 100;

/// Pause inside an over-age session restart.
const RESTART_DELAY_MS: u64 = 500;

/// Sessions older than this are purged at startup.
const RETENTION_DAYS: i64 = 30;

const EVENT_CHANNEL_CAPACITY: usize = 64;

/// Everything that can happen to the service.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ServiceEvent {
    /// Raw window-focus change from the platform.
    Focus {
        package_name: String,
        timestamp_ms: i64,
    },
    /// A focus candidate survived the settle delay.
    FocusSettled { package_name: String },
    /// The post-switch open delay elapsed.
    OpenPending { package_name: String },
    /// The poller saw the tracked package leave the foreground.
    ForegroundLost { package_name: String },
    /// The banner interval timer fired.
    BannerDue,
    /// User tapped the banner.
    BannerTapped,
    ExpandAnimationDone,
    HideAnimationDone,
    /// One-second refresh while the banner is visible.
    LiveTick,
    /// Request to show a free-form notice.
    AdHocBanner { message: String },
    AdHocTimeout,
    /// Host explicitly asked for tracking of a package, bypassing the
    /// focus stream and the monitored-set check.
    StartTracking { package_name: String },
    /// User explicitly ended tracking of the current app.
    EndSession,
    Shutdown,
}

/// Handle to a running monitor service.
///
/// Cheap to use from any task; all methods just post events. Dropping the
/// handle without calling [`MonitorService::shutdown`] leaves the loop
/// running until the channel closes.
pub struct MonitorService {
    events: mpsc::Sender<ServiceEvent>,
    session_rx: watch::Receiver<Option<SessionInfo>>,
    handle: JoinHandle<()>,
}

impl MonitorService {
    /// Spawns the service loop. Startup maintenance (dropping incomplete
    /// rows, 30-day retention sweep) runs before the first event.
    pub fn start(
        db: Database,
        preferences: Arc<UserPreferences>,
        clock: Arc<dyn Clock>,
        query: Arc<dyn ForegroundQuery>,
        surface: Box<dyn BannerSurface>,
        own_package: impl Into<String>,
    ) -> Self {
        let (events_tx, events_rx) = mpsc::channel(EVENT_CHANNEL_CAPACITY);
        let (session_tx, session_rx) = watch::channel(None);

        let actor = ServiceActor {
            tracker: SessionTracker::new(db.clone(), Arc::clone(&clock)),
            banner: BannerManager::new(
                surface,
                Arc::clone(&preferences),
                db.clone(),
                Arc::clone(&clock),
                Arc::clone(&query),
                events_tx.clone(),
            ),
            classifier: PackageClassifier::new(own_package),
            debouncer: FocusDebouncer::new(),
            poller: ForegroundPoller::new(query, events_tx.clone()),
            preferences,
            db,
            clock,
            events: events_tx.clone(),
            session_tx,
            settle_timer: None,
            open_timer: None,
        };

        let handle = tokio::spawn(actor.run(events_rx));

        Self {
            events: events_tx,
            session_rx,
            handle,
        }
    }

    pub async fn on_focus_event(&self, package_name: &str, timestamp_ms: i64) {
        self.post(ServiceEvent::Focus {
            package_name: package_name.to_string(),
            timestamp_ms,
        })
        .await;
    }

    pub async fn start_tracking(&self, package_name: &str) {
        self.post(ServiceEvent::StartTracking {
            package_name: package_name.to_string(),
        })
        .await;
    }

    pub async fn end_active_session(&self) {
        self.post(ServiceEvent::EndSession).await;
    }

    pub async fn banner_tapped(&self) {
        self.post(ServiceEvent::BannerTapped).await;
    }

    pub async fn show_ad_hoc_banner(&self, message: impl Into<String>) {
        self.post(ServiceEvent::AdHocBanner {
            message: message.into(),
        })
        .await;
    }

    /// Snapshot of the active session, if any.
    pub fn current_session(&self) -> Option<SessionInfo> {
        self.session_rx.borrow().clone()
    }

    /// Watch channel for session changes, for UIs that want push updates.
    pub fn subscribe(&self) -> watch::Receiver<Option<SessionInfo>> {
        self.session_rx.clone()
    }

    /// Closes any active session and stops the loop.
    pub async fn shutdown(self) {
        self.post(ServiceEvent::Shutdown).await;
        if let Err(e) = self.handle.await {
            if !e.is_cancelled() {
                warn!("Service loop ended abnormally: {e}");
            }
        }
    }

    async fn post(&self, event: ServiceEvent) {
        if self.events.send(event).await.is_err() {
            warn!("Service loop is gone, event dropped");
        }
    }
}

struct ServiceActor {
    tracker: SessionTracker,
    banner: BannerManager,
    classifier: PackageClassifier,
    debouncer: FocusDebouncer,
    poller: ForegroundPoller,
    preferences: Arc<UserPreferences>,
    db: Database,
    clock: Arc<dyn Clock>,
    events: mpsc::Sender<ServiceEvent>,
    session_tx: watch::Sender<Option<SessionInfo>>,
    settle_timer: Option<JoinHandle<()>>,
    open_timer: Option<JoinHandle<()>>,
}

impl ServiceActor {
    async fn run(mut self, mut events_rx: mpsc::Receiver<ServiceEvent>) {
        self.startup_maintenance().await;
        info!("Monitor service running");

        while let Some(event) = events_rx.recv().await {
            if !self.handle_event(event).await {
                break;
            }
        }

        self.poller.stop();
        self.banner.cancel_timers();
        if let Some(timer) = self.settle_timer.take() {
            timer.abort();
        }
        if let Some(timer) = self.open_timer.take() {
            timer.abort();
        }
        info!("Monitor service stopped");
    }

    /// Returns false when the loop should exit.
    async fn handle_event(&mut self, event: ServiceEvent) -> bool {
        match event {
            ServiceEvent::Focus {
                package_name,
                timestamp_ms,
            } => self.on_focus(package_name, timestamp_ms),
            ServiceEvent::FocusSettled { package_name } => {
                self.on_focus_settled(package_name).await;
            }
            ServiceEvent::OpenPending { package_name } => {
                if !self.tracker.has_active() {
                    self.open_session(&package_name).await;
                }
            }
            ServiceEvent::ForegroundLost { package_name } => {
                if self.tracker.active_package() == Some(package_name.as_str()) {
                    info!("{package_name} left the foreground");
                    self.end_session().await;
                }
            }
            ServiceEvent::BannerDue => self.banner.on_banner_due().await,
            ServiceEvent::BannerTapped => self.banner.on_tapped().await,
            ServiceEvent::ExpandAnimationDone => self.banner.on_expand_animation_done(),
            ServiceEvent::HideAnimationDone => self.banner.on_hide_animation_done(),
            ServiceEvent::LiveTick => self.banner.on_live_tick().await,
            ServiceEvent::AdHocBanner { message } => self.banner.show_ad_hoc(&message),
            ServiceEvent::AdHocTimeout => self.banner.on_ad_hoc_timeout(),
            ServiceEvent::StartTracking { package_name } => {
                if self.tracker.active_package() != Some(package_name.as_str()) {
                    self.end_session().await;
                    // The close guard may keep the old session; never stack
                    // a second open row on top of it.
                    if !self.tracker.has_active() {
                        self.open_session(&package_name).await;
                    }
                }
            }
            ServiceEvent::EndSession => {
                self.end_session().await;
            }
            ServiceEvent::Shutdown => {
                self.end_session().await;
                return false;
            }
        }
        true
    }

    /// Stage one of focus handling: drop rapid repeats, then let the
    /// candidate settle before committing.
    fn on_focus(&mut self, package_name: String, timestamp_ms: i64) {
        if !self.debouncer.observe(&package_name, timestamp_ms) {
            return;
        }

        if let Some(timer) = self.settle_timer.take() {
            timer.abort();
        }
        let events = self.events.clone();
        self.settle_timer = Some(tokio::spawn(async move {
            sleep(Duration::from_millis(SETTLE_DELAY_MS)).await;
            let _ = events.send(ServiceEvent::FocusSettled { package_name }).await;
        }));
    }

    /// Stage two: the transition table.
    async fn on_focus_settled(&mut self, package_name: String) {
        debug!("Focus settled on {package_name}");

        if self.classifier.is_system_package(&package_name) {
            if self.classifier.keeps_session_alive(&package_name) {
                debug!("Transient system surface {package_name}, session continues");
            } else if self.tracker.has_active() {
                info!("System surface {package_name} took over, ending session");
                self.end_session().await;
            }
            return;
        }

        let is_monitored =
            self.preferences.show_banner() && self.preferences.is_monitored(&package_name);

        let active = self.tracker.active_package().map(str::to_string);
        match active.as_deref() {
            Some(active) if active != package_name => {
                info!("App switch: {active} -> {package_name}");
                self.end_session().await;
                if is_monitored {
                    self.open_after(package_name, OPEN_DELAY_MS);
                }
            }
            Some(_) if is_monitored => {
                // Same app still in front. Restart over-age sessions so a
                // single row never spans an entire afternoon.
                if self
                    .tracker
                    .session_age_ms()
                    .is_some_and(|age| age > MAX_SESSION_AGE_MS)
                {
                    info!("Session for {package_name} exceeded max age, restarting");
                    self.end_session().await;
                    self.open_after(package_name, RESTART_DELAY_MS);
                }
            }
            Some(_) => {}
            None if is_monitored => {
                self.open_session(&package_name).await;
            }
            None => debug!("{package_name} not monitored, staying idle"),
        }
    }

    fn open_after(&mut self, package_name: String, delay_ms: u64) {
        if let Some(timer) = self.open_timer.take() {
            timer.abort();
        }
        let events = self.events.clone();
        self.open_timer = Some(tokio::spawn(async move {
            sleep(Duration::from_millis(delay_ms)).await;
            let _ = events.send(ServiceEvent::OpenPending { package_name }).await;
        }));
    }

    async fn open_session(&mut self, package_name: &str) {
        let Some(info) = self.tracker.open(package_name).await else {
            return;
        };
        self.poller.start(package_name.to_string());
        self.banner.on_session_started(info.clone());
        self.session_tx.send_replace(Some(info));
    }

    async fn end_session(&mut self) {
        if !self.tracker.close().await {
            return;
        }
        self.poller.stop();
        self.banner.on_session_ended();
        self.session_tx.send_replace(None);
    }

    async fn startup_maintenance(&self) {
        match self.db.delete_incomplete().await {
            Ok(0) => {}
            Ok(n) => info!("Dropped {n} incomplete sessions from a previous run"),
            Err(e) => error!("Failed to drop incomplete sessions: {e:#}"),
        }

        let cutoff = self.clock.now_ms() - ChronoDuration::days(RETENTION_DAYS).num_milliseconds();
        match self.db.delete_older_than(cutoff).await {
            Ok(0) => {}
            Ok(n) => info!("Retention sweep removed {n} sessions older than {RETENTION_DAYS} days"),
            Err(e) => error!("Retention sweep failed: {e:#}"),
        }
    }
}
