use std::{sync::Arc, time::Duration};

use log::{debug, error, info, warn};
use tokio::{sync::mpsc, task::JoinHandle, time::sleep};

use crate::{
    db::Database,
    foreground::{is_in_foreground, ForegroundQuery},
    preferences::UserPreferences,
    service::ServiceEvent,
    tracker::SessionInfo,
    utils::{clock::Clock, time::start_of_day_ms},
};

use super::{
    messages::MessageRotation,
    scheduler::BannerScheduler,
    state::{BannerState, SeverityTier, TimeStats},
    surface::{BannerSurface, ExpandedContent, MinimizedContent},
};

const ANIMATION_MS: u64 = 300;
const LIVE_TICK_MS: u64 = 1_000;
const AD_HOC_TIMEOUT_MS: u64 = 15_000;
const FOREGROUND_LOOKBACK: Duration = Duration::from_secs(2);

/// Drives the banner through its states in response to service events.
///
/// Runs entirely inside the service loop; the only concurrency is the timer
/// tasks it spawns, which feed events back through the same channel. The
/// surface is attached lazily on the first show and detached once the hide
/// animation completes or the session ends.
pub struct BannerManager {
    surface: Box<dyn BannerSurface>,
    scheduler: BannerScheduler,
    state: BannerState,
    session: Option<SessionInfo>,
    attached: bool,
    is_animating: bool,
    ad_hoc_visible: bool,
    live_timer: Option<JoinHandle<()>>,
    ad_hoc_timer: Option<JoinHandle<()>>,
    animation_timer: Option<JoinHandle<()>>,
    messages: MessageRotation,
    events: mpsc::Sender<ServiceEvent>,
    db: Database,
    clock: Arc<dyn Clock>,
    query: Arc<dyn ForegroundQuery>,
}

impl BannerManager {
    #[allow(clippy::too_many_arguments)]
    pub fn new(
        surface: Box<dyn BannerSurface>,
        preferences: Arc<UserPreferences>,
        db: Database,
        clock: Arc<dyn Clock>,
        query: Arc<dyn ForegroundQuery>,
        events: mpsc::Sender<ServiceEvent>,
    ) -> Self {
        let scheduler = BannerScheduler::new(preferences, events.clone());
        Self {
            surface,
            scheduler,
            state: BannerState::Hidden,
            session: None,
            attached: false,
            is_animating: false,
            ad_hoc_visible: false,
            live_timer: None,
            ad_hoc_timer: None,
            animation_timer: None,
            messages: MessageRotation::default(),
            events,
            db,
            clock,
            query,
        }
    }

    pub fn state(&self) -> BannerState {
        self.state
    }

    pub fn on_session_started(&mut self, session: SessionInfo) {
        info!("Banner flow armed for {}", session.package_name);
        self.session = Some(session);
        self.state = BannerState::Hidden;
        self.scheduler.schedule_next(self.state, true);
    }

    pub fn on_session_ended(&mut self) {
        info!("Banner flow torn down");
        self.scheduler.cancel_all();
        self.stop_live_updates();
        self.cancel_animation();
        self.detach_surface();
        self.session = None;
        self.state = BannerState::Hidden;
        self.is_animating = false;
    }

    /// The scheduled interval elapsed; show the banner if the tracked app
    /// still owns the foreground.
    pub async fn on_banner_due(&mut self) {
        let Some(session) = self.session.clone() else {
            self.scheduler.banner_suppressed();
            return;
        };

        if !is_in_foreground(self.query.as_ref(), &session.package_name, FOREGROUND_LOOKBACK) {
            debug!("{} not foreground, banner suppressed", session.package_name);
            self.scheduler.banner_suppressed();
            self.scheduler.schedule_next(self.state, true);
            return;
        }

        if self.state != BannerState::Hidden {
            debug!("Banner already visible, ignoring due signal");
            self.scheduler.banner_suppressed();
            return;
        }

        if !self.attached {
            if let Err(e) = self.surface.attach() {
                error!("Could not attach banner surface: {e:#}");
                self.scheduler.banner_suppressed();
                self.scheduler.schedule_next(self.state, true);
                return;
            }
            self.attached = true;
        }

        let stats = self.current_time_stats(&session).await;
        let content = self.minimized_content(&session, stats);
        self.surface.render_minimized(&content);
        self.state = BannerState::VisibleWaiting;
        self.scheduler.banner_shown();
        self.start_live_updates();
        info!("Banner shown minimized for {}", session.app_name);
    }

    /// User tapped the banner. Waiting expands, expanded begins the hide.
    pub async fn on_tapped(&mut self) {
        if self.is_animating {
            debug!("Tap ignored mid-animation");
            return;
        }
        match self.state {
            BannerState::VisibleWaiting => self.expand().await,
            BannerState::VisibleExpanded => self.begin_hide(),
            BannerState::Hidden => debug!("Tap with banner hidden, ignored"),
        }
    }

    async fn expand(&mut self) {
        let Some(session) = self.session.clone() else {
            return;
        };
        let stats = self.current_time_stats(&session).await;
        let content = self.expanded_content(&session, stats);
        self.surface.render_expanded(&content);
        self.state = BannerState::VisibleExpanded;
        self.start_animation(ServiceEvent::ExpandAnimationDone);
        info!("Banner expanded");
    }

    fn begin_hide(&mut self) {
        self.stop_live_updates();
        // State flips before the animation so a schedule request issued
        // during the hide sees Hidden.
        self.state = BannerState::Hidden;
        self.start_animation(ServiceEvent::HideAnimationDone);
    }

    pub fn on_expand_animation_done(&mut self) {
        self.is_animating = false;
    }

    pub fn on_hide_animation_done(&mut self) {
        self.is_animating = false;
        self.detach_surface();
        if self.session.is_some() {
            self.scheduler.schedule_next(self.state, true);
        }
        info!("Banner fully hidden");
    }

    /// One-second refresh of whatever is on screen.
    pub async fn on_live_tick(&mut self) {
        let Some(session) = self.session.clone() else {
            self.stop_live_updates();
            return;
        };
        let stats = self.current_time_stats(&session).await;
        match self.state {
            BannerState::VisibleWaiting => {
                let content = self.minimized_content(&session, stats);
                self.surface.render_minimized(&content);
            }
            BannerState::VisibleExpanded => {
                let content = self.expanded_content(&session, stats);
                self.surface.render_expanded(&content);
            }
            BannerState::Hidden => self.stop_live_updates(),
        }
    }

    /// Shows a free-form notice outside the session flow, auto-hidden after
    /// fifteen seconds.
    pub fn show_ad_hoc(&mut self, message: &str) {
        if let Some(timer) = self.ad_hoc_timer.take() {
            timer.abort();
        }
        if !self.attached {
            if let Err(e) = self.surface.attach() {
                error!("Could not attach surface for notice: {e:#}");
                return;
            }
            self.attached = true;
        }
        self.surface.render_notice(message);
        self.ad_hoc_visible = true;

        let events = self.events.clone();
        self.ad_hoc_timer = Some(tokio::spawn(async move {
            sleep(Duration::from_millis(AD_HOC_TIMEOUT_MS)).await;
            let _ = events.send(ServiceEvent::AdHocTimeout).await;
        }));
        info!("Ad-hoc notice shown: {message}");
    }

    pub fn on_ad_hoc_timeout(&mut self) {
        if !self.ad_hoc_visible {
            return;
        }
        self.ad_hoc_visible = false;
        // Only tear the surface down when the session banner is not using it.
        if self.state == BannerState::Hidden {
            self.detach_surface();
        }
        debug!("Ad-hoc notice expired");
    }

    pub fn cancel_timers(&mut self) {
        self.scheduler.cancel_all();
        self.stop_live_updates();
        self.cancel_animation();
        if let Some(timer) = self.ad_hoc_timer.take() {
            timer.abort();
        }
    }

    fn start_animation(&mut self, done_event: ServiceEvent) {
        self.cancel_animation();
        self.is_animating = true;
        let events = self.events.clone();
        self.animation_timer = Some(tokio::spawn(async move {
            sleep(Duration::from_millis(ANIMATION_MS)).await;
            let _ = events.send(done_event).await;
        }));
    }

    fn cancel_animation(&mut self) {
        if let Some(timer) = self.animation_timer.take() {
            timer.abort();
        }
    }

    fn start_live_updates(&mut self) {
        self.stop_live_updates();
        let events = self.events.clone();
        self.live_timer = Some(tokio::spawn(async move {
            loop {
                sleep(Duration::from_millis(LIVE_TICK_MS)).await;
                if events.send(ServiceEvent::LiveTick).await.is_err() {
                    break;
                }
            }
        }));
    }

    fn stop_live_updates(&mut self) {
        if let Some(timer) = self.live_timer.take() {
            timer.abort();
        }
    }

    fn detach_surface(&mut self) {
        if !self.attached {
            return;
        }
        if let Err(e) = self.surface.detach() {
            warn!("Error detaching banner surface: {e:#}");
        }
        self.attached = false;
        self.ad_hoc_visible = false;
    }

    fn minimized_content(&self, session: &SessionInfo, stats: TimeStats) -> MinimizedContent {
        MinimizedContent {
            app_name: session.app_name.clone(),
            session_time: stats.formatted_session(),
            accent_color: SeverityTier::for_elapsed_ms(stats.session_ms).accent_color(),
        }
    }

    fn expanded_content(&mut self, session: &SessionInfo, stats: TimeStats) -> ExpandedContent {
        let message = self
            .messages
            .maybe_advance(&mut rand::thread_rng())
            .to_string();
        ExpandedContent {
            app_name: session.app_name.clone(),
            session_time: stats.formatted_session(),
            today_total: stats.formatted_today_total(),
            message,
            accent_color: SeverityTier::for_elapsed_ms(stats.session_ms).accent_color(),
        }
    }

    /// Session elapsed plus today's persisted total for the same package.
    /// Store failures degrade to a zero total instead of hiding the banner.
    async fn current_time_stats(&self, session: &SessionInfo) -> TimeStats {
        let now = self.clock.now_ms();
        let today = start_of_day_ms(now);
        let today_total_ms = match self
            .db
            .app_time_on_date(&session.package_name, today, now)
            .await
        {
            Ok(total) => total,
            Err(e) => {
                warn!("Failed to read today's total: {e:#}");
                0
            }
        };
        TimeStats {
            session_ms: session.duration_ms(now),
            today_total_ms,
        }
    }
}
