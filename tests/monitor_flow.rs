//! End-to-end runs of the monitor service with a recording banner surface
//! and a scripted foreground query.

use std::{
    sync::{Arc, Mutex},
    time::Duration,
};

use anyhow::Result;
use appnudge::{
    banner::BannerManager,
    db::Database,
    preferences::{UserPreferences, DEMO_INTERVAL_SENTINEL},
    service::{MonitorService, ServiceEvent},
    tracker::SessionInfo,
    utils::clock::{Clock, ManualClock},
    BannerSurface, ExpandedContent, ForegroundQuery, MinimizedContent,
};
use tempfile::tempdir;
use tokio::{sync::mpsc, time::sleep};

const APP: &str = "com.instagram.android";
const LAUNCHER: &str = "com.android.launcher3";
const OWN_PACKAGE: &str = "com.example.appnudge";

#[derive(Debug, Clone, PartialEq, Eq)]
enum SurfaceCall {
    Attach,
    Detach,
    Minimized(String),
    Expanded(String),
    Notice(String),
}

#[derive(Clone, Default)]
struct Recorder(Arc<Mutex<Vec<SurfaceCall>>>);

impl Recorder {
    fn calls(&self) -> Vec<SurfaceCall> {
        self.0.lock().unwrap().clone()
    }

    fn count(&self, f: impl Fn(&SurfaceCall) -> bool) -> usize {
        self.calls().iter().filter(|c| f(c)).count()
    }

    fn attaches(&self) -> usize {
        self.count(|c| matches!(c, SurfaceCall::Attach))
    }

    fn detaches(&self) -> usize {
        self.count(|c| matches!(c, SurfaceCall::Detach))
    }

    fn minimized_renders(&self) -> usize {
        self.count(|c| matches!(c, SurfaceCall::Minimized(_)))
    }

    fn expanded_renders(&self) -> usize {
        self.count(|c| matches!(c, SurfaceCall::Expanded(_)))
    }
}

struct RecordingSurface(Recorder);

impl BannerSurface for RecordingSurface {
    fn attach(&mut self) -> Result<()> {
        self.0 .0.lock().unwrap().push(SurfaceCall::Attach);
        Ok(())
    }

    fn detach(&mut self) -> Result<()> {
        self.0 .0.lock().unwrap().push(SurfaceCall::Detach);
        Ok(())
    }

    fn render_minimized(&mut self, content: &MinimizedContent) {
        self.0
             .0
            .lock()
            .unwrap()
            .push(SurfaceCall::Minimized(content.app_name.clone()));
    }

    fn render_expanded(&mut self, content: &ExpandedContent) {
        self.0
             .0
            .lock()
            .unwrap()
            .push(SurfaceCall::Expanded(content.app_name.clone()));
    }

    fn render_notice(&mut self, message: &str) {
        self.0
             .0
            .lock()
            .unwrap()
            .push(SurfaceCall::Notice(message.to_string()));
    }
}

struct FakeQuery {
    permission: bool,
    top: Mutex<Option<String>>,
}

impl FakeQuery {
    fn without_permission() -> Arc<Self> {
        Arc::new(Self {
            permission: false,
            top: Mutex::new(None),
        })
    }

    fn with_top(package: &str) -> Arc<Self> {
        Arc::new(Self {
            permission: true,
            top: Mutex::new(Some(package.to_string())),
        })
    }

    fn set_top(&self, package: &str) {
        *self.top.lock().unwrap() = Some(package.to_string());
    }
}

impl ForegroundQuery for FakeQuery {
    fn has_query_permission(&self) -> bool {
        self.permission
    }

    fn recent_foreground_package(&self, _window: Duration) -> Option<String> {
        self.top.lock().unwrap().clone()
    }
}

struct Fixture {
    _dir: tempfile::TempDir,
    db: Database,
    clock: Arc<ManualClock>,
    recorder: Recorder,
    service: MonitorService,
}

fn start_service(query: Arc<dyn ForegroundQuery>) -> Fixture {
    let dir = tempdir().unwrap();
    let db = Database::new(dir.path().join("usage.sqlite")).unwrap();
    let preferences = Arc::new(UserPreferences::new(dir.path().join("prefs.json")).unwrap());
    preferences
        .set_banner_interval_minutes(DEMO_INTERVAL_SENTINEL)
        .unwrap();
    preferences.add_monitored_package(APP).unwrap();

    let clock = Arc::new(ManualClock::starting_at(1_700_000_000_000));
    let recorder = Recorder::default();
    let service = MonitorService::start(
        db.clone(),
        preferences,
        clock.clone(),
        query,
        Box::new(RecordingSurface(recorder.clone())),
        OWN_PACKAGE,
    );
    Fixture {
        _dir: dir,
        db,
        clock,
        recorder,
        service,
    }
}

/// Yields to the runtime until `cond` holds, giving the store worker thread
/// room to finish in-flight writes. Keeps the test task runnable the whole
/// time, so the paused clock never auto-advances and arms no timers; the
/// deadline is real wall-clock time.
async fn wait_until(mut cond: impl FnMut() -> bool) {
    let deadline = std::time::Instant::now() + Duration::from_secs(5);
    while !cond() {
        assert!(
            std::time::Instant::now() < deadline,
            "condition not reached in time"
        );
        tokio::task::yield_now().await;
    }
}

#[tokio::test(start_paused = true)]
async fn monitored_app_opens_and_closes_a_session() {
    let fx = start_service(FakeQuery::without_permission());

    fx.service.on_focus_event(APP, fx.clock.now_ms()).await;
    sleep(Duration::from_millis(350)).await;
    wait_until(|| fx.service.current_session().is_some()).await;

    let session = fx.service.current_session().unwrap();
    assert_eq!(session.package_name, APP);
    assert_eq!(session.app_name, "Instagram");

    fx.clock.advance_ms(30_000);
    fx.service.on_focus_event(LAUNCHER, fx.clock.now_ms()).await;
    sleep(Duration::from_millis(350)).await;
    wait_until(|| fx.service.current_session().is_none()).await;

    let stored = fx.db.latest_session_for(APP).await.unwrap().unwrap();
    assert!(!stored.is_open());
    assert_eq!(stored.duration_ms(0), 30_000);

    fx.service.shutdown().await;
}

#[tokio::test(start_paused = true)]
async fn unmonitored_app_is_ignored() {
    let fx = start_service(FakeQuery::without_permission());

    fx.service
        .on_focus_event("com.spotify.music", fx.clock.now_ms())
        .await;
    sleep(Duration::from_millis(500)).await;
    tokio::task::yield_now().await;

    assert!(fx.service.current_session().is_none());
    assert!(fx.db.active_sessions().await.unwrap().is_empty());

    fx.service.shutdown().await;
}

#[tokio::test(start_paused = true)]
async fn keyboard_focus_keeps_session_alive_but_launcher_ends_it() {
    let fx = start_service(FakeQuery::without_permission());

    fx.service.on_focus_event(APP, fx.clock.now_ms()).await;
    sleep(Duration::from_millis(350)).await;
    wait_until(|| fx.service.current_session().is_some()).await;

    // Keyboard pops up: session survives.
    fx.clock.advance_ms(2_000);
    fx.service
        .on_focus_event("com.samsung.android.honeyboard", fx.clock.now_ms())
        .await;
    sleep(Duration::from_millis(350)).await;
    tokio::task::yield_now().await;
    assert!(fx.service.current_session().is_some());

    // Launcher takes over: session ends.
    fx.clock.advance_ms(2_000);
    fx.service.on_focus_event(LAUNCHER, fx.clock.now_ms()).await;
    sleep(Duration::from_millis(350)).await;
    wait_until(|| fx.service.current_session().is_none()).await;

    fx.service.shutdown().await;
}

#[tokio::test(start_paused = true)]
async fn rapid_focus_repeats_collapse_into_one_session() {
    let fx = start_service(FakeQuery::without_permission());

    let base = fx.clock.now_ms();
    for i in 0..5 {
        fx.service.on_focus_event(APP, base + i * 50).await;
    }
    sleep(Duration::from_millis(400)).await;
    wait_until(|| fx.service.current_session().is_some()).await;

    assert_eq!(fx.db.active_sessions().await.unwrap().len(), 1);

    fx.service.shutdown().await;
}

#[tokio::test(start_paused = true)]
async fn over_age_session_is_restarted() {
    let fx = start_service(FakeQuery::without_permission());

    fx.service.on_focus_event(APP, fx.clock.now_ms()).await;
    sleep(Duration::from_millis(350)).await;
    wait_until(|| fx.service.current_session().is_some()).await;
    let first_start = fx.service.current_session().unwrap().start_time_ms;

    // Same app refocused an hour later: the old row closes and a fresh one
    // opens after the restart pause.
    fx.clock.advance_ms(61 * 60_000);
    fx.service.on_focus_event(APP, fx.clock.now_ms()).await;
    sleep(Duration::from_millis(900)).await;
    wait_until(|| {
        fx.service
            .current_session()
            .is_some_and(|s| s.start_time_ms > first_start)
    })
    .await;

    let all = fx
        .db
        .sessions_between(first_start, fx.clock.now_ms())
        .await
        .unwrap();
    assert_eq!(all.len(), 2);
    assert!(all.iter().any(|s| !s.is_open() && s.start_time == first_start));
    assert!(all.iter().any(|s| s.is_open()));

    fx.service.shutdown().await;
}

#[tokio::test(start_paused = true)]
async fn banner_shows_expands_and_hides_then_rearms() {
    let fx = start_service(FakeQuery::without_permission());

    fx.service.on_focus_event(APP, fx.clock.now_ms()).await;
    sleep(Duration::from_millis(350)).await;
    wait_until(|| fx.service.current_session().is_some()).await;

    // Demo interval: banner due after ten seconds.
    sleep(Duration::from_secs(11)).await;
    wait_until(|| fx.recorder.minimized_renders() > 0).await;
    assert_eq!(fx.recorder.attaches(), 1);

    fx.service.banner_tapped().await;
    wait_until(|| fx.recorder.expanded_renders() > 0).await;

    // Let the expand animation finish, then tap to dismiss.
    sleep(Duration::from_millis(350)).await;
    fx.service.banner_tapped().await;
    sleep(Duration::from_millis(350)).await;
    wait_until(|| fx.recorder.detaches() == 1).await;

    // The dismissal re-armed the scheduler for the next interval.
    let shown_before = fx.recorder.attaches();
    sleep(Duration::from_secs(11)).await;
    wait_until(|| fx.recorder.attaches() > shown_before).await;

    fx.service.shutdown().await;
}

#[tokio::test(start_paused = true)]
async fn tap_during_animation_is_ignored() {
    let fx = start_service(FakeQuery::without_permission());

    fx.service.on_focus_event(APP, fx.clock.now_ms()).await;
    sleep(Duration::from_millis(350)).await;
    wait_until(|| fx.service.current_session().is_some()).await;

    sleep(Duration::from_secs(11)).await;
    wait_until(|| fx.recorder.minimized_renders() > 0).await;

    // First tap expands; second lands mid-animation and must not dismiss.
    fx.service.banner_tapped().await;
    wait_until(|| fx.recorder.expanded_renders() > 0).await;
    fx.service.banner_tapped().await;
    tokio::task::yield_now().await;
    assert_eq!(fx.recorder.detaches(), 0);

    fx.service.shutdown().await;
}

#[tokio::test(start_paused = true)]
async fn session_end_tears_the_banner_down() {
    let fx = start_service(FakeQuery::without_permission());

    fx.service.on_focus_event(APP, fx.clock.now_ms()).await;
    sleep(Duration::from_millis(350)).await;
    wait_until(|| fx.service.current_session().is_some()).await;

    sleep(Duration::from_secs(11)).await;
    wait_until(|| fx.recorder.minimized_renders() > 0).await;

    fx.clock.advance_ms(15_000);
    fx.service.on_focus_event(LAUNCHER, fx.clock.now_ms()).await;
    sleep(Duration::from_millis(350)).await;
    wait_until(|| fx.recorder.detaches() == 1).await;
    assert!(fx.service.current_session().is_none());

    // No further banners without a session.
    sleep(Duration::from_secs(30)).await;
    tokio::task::yield_now().await;
    assert_eq!(fx.recorder.attaches(), 1);

    fx.service.shutdown().await;
}

#[tokio::test(start_paused = true)]
async fn session_end_while_expanded_forces_hidden_without_a_tap() {
    let fx = start_service(FakeQuery::without_permission());

    fx.service.on_focus_event(APP, fx.clock.now_ms()).await;
    sleep(Duration::from_millis(350)).await;
    wait_until(|| fx.service.current_session().is_some()).await;

    sleep(Duration::from_secs(11)).await;
    wait_until(|| fx.recorder.minimized_renders() > 0).await;

    fx.service.banner_tapped().await;
    wait_until(|| fx.recorder.expanded_renders() > 0).await;

    // Leaving the app while expanded tears the banner down immediately,
    // with no dismissing tap and no waiting on the hide animation.
    fx.clock.advance_ms(5_000);
    fx.service.on_focus_event(LAUNCHER, fx.clock.now_ms()).await;
    sleep(Duration::from_millis(350)).await;
    wait_until(|| fx.recorder.detaches() == 1).await;
    assert!(fx.service.current_session().is_none());

    // The live ticker died with the session and nothing re-schedules.
    let renders = fx.recorder.minimized_renders() + fx.recorder.expanded_renders();
    sleep(Duration::from_secs(30)).await;
    tokio::task::yield_now().await;
    assert_eq!(
        fx.recorder.minimized_renders() + fx.recorder.expanded_renders(),
        renders
    );
    assert_eq!(fx.recorder.attaches(), 1);

    fx.service.shutdown().await;
}

#[tokio::test(start_paused = true)]
async fn ad_hoc_notice_auto_hides_after_fifteen_seconds() {
    let fx = start_service(FakeQuery::without_permission());

    fx.service.show_ad_hoc_banner("take a breath").await;
    wait_until(|| {
        fx.recorder
            .calls()
            .contains(&SurfaceCall::Notice("take a breath".to_string()))
    })
    .await;
    assert_eq!(fx.recorder.attaches(), 1);

    sleep(Duration::from_secs(16)).await;
    wait_until(|| fx.recorder.detaches() == 1).await;

    fx.service.shutdown().await;
}

#[tokio::test(start_paused = true)]
async fn suppressed_banner_rearms_the_scheduler() {
    let dir = tempdir().unwrap();
    let db = Database::new(dir.path().join("usage.sqlite")).unwrap();
    let preferences = Arc::new(UserPreferences::new(dir.path().join("prefs.json")).unwrap());
    preferences
        .set_banner_interval_minutes(DEMO_INTERVAL_SENTINEL)
        .unwrap();
    let clock = Arc::new(ManualClock::starting_at(1_700_000_000_000));
    let recorder = Recorder::default();
    let query = FakeQuery::with_top(LAUNCHER);

    let (tx, mut rx) = mpsc::channel::<ServiceEvent>(16);
    let mut manager = BannerManager::new(
        Box::new(RecordingSurface(recorder.clone())),
        preferences,
        db,
        clock.clone(),
        query.clone(),
        tx,
    );

    manager.on_session_started(SessionInfo {
        package_name: APP.to_string(),
        app_name: "Instagram".to_string(),
        start_time_ms: clock.now_ms(),
    });

    // First interval elapses while another app is on top.
    assert_eq!(rx.recv().await, Some(ServiceEvent::BannerDue));
    manager.on_banner_due().await;
    assert_eq!(recorder.attaches(), 0, "suppressed banner must not attach");

    // The suppression released the slot: a second timer was armed.
    assert_eq!(rx.recv().await, Some(ServiceEvent::BannerDue));

    // Back in the foreground the banner finally shows.
    query.set_top(APP);
    manager.on_banner_due().await;
    assert_eq!(recorder.attaches(), 1);
    assert!(recorder.minimized_renders() > 0);
}
