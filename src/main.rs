//! Scripted demo: feeds a few focus events through the service and prints
//! what the banner surface would render, then dumps the day's totals.

use std::{sync::Arc, time::Duration};

use anyhow::Result;
use appnudge::{
    db::Database,
    preferences::{UserPreferences, DEMO_INTERVAL_SENTINEL},
    service::MonitorService,
    utils::{
        clock::{Clock, SystemClock},
        time::{format_duration, start_of_day_ms},
    },
    BannerSurface, ExpandedContent, ForegroundQuery, MinimizedContent,
};
use tokio::time::sleep;

const OWN_PACKAGE: &str = "com.example.appnudge";
const DEMO_APP: &str = "com.instagram.android";

/// Demo stand-in for the platform usage-stats facility. Reports no
/// permission, so foreground checks fail open and the session only ends on
/// explicit focus changes.
struct NoPermissionQuery;

impl ForegroundQuery for NoPermissionQuery {
    fn has_query_permission(&self) -> bool {
        false
    }

    fn recent_foreground_package(&self, _window: Duration) -> Option<String> {
        None
    }
}

/// Prints renders instead of drawing an overlay.
struct ConsoleSurface;

impl BannerSurface for ConsoleSurface {
    fn attach(&mut self) -> Result<()> {
        println!("[banner] attached");
        Ok(())
    }

    fn detach(&mut self) -> Result<()> {
        println!("[banner] detached");
        Ok(())
    }

    fn render_minimized(&mut self, content: &MinimizedContent) {
        println!(
            "[banner] {} {} ({})",
            content.app_name, content.session_time, content.accent_color
        );
    }

    fn render_expanded(&mut self, content: &ExpandedContent) {
        println!(
            "[banner] {} session {} | today {} | {}",
            content.app_name, content.session_time, content.today_total, content.message
        );
    }

    fn render_notice(&mut self, message: &str) {
        println!("[banner] notice: {message}");
    }
}

#[tokio::main]
async fn main() -> Result<()> {
    env_logger::Builder::from_default_env()
        .filter_level(log::LevelFilter::Info)
        .init();

    let data_dir = std::env::temp_dir().join("appnudge-demo");
    std::fs::create_dir_all(&data_dir)?;

    let db = Database::new(data_dir.join("appnudge.sqlite3"))?;
    log::info!("Using store at {}", db.path().display());
    let preferences = Arc::new(UserPreferences::new(data_dir.join("preferences.json"))?);
    preferences.set_banner_interval_minutes(DEMO_INTERVAL_SENTINEL)?;
    preferences.add_monitored_package(DEMO_APP)?;

    let clock: Arc<dyn Clock> = Arc::new(SystemClock);
    let service = MonitorService::start(
        db.clone(),
        Arc::clone(&preferences),
        Arc::clone(&clock),
        Arc::new(NoPermissionQuery),
        Box::new(ConsoleSurface),
        OWN_PACKAGE,
    );

    println!("Opening {DEMO_APP}; banner due in 10s (demo interval)");
    service.on_focus_event(DEMO_APP, clock.now_ms()).await;

    // Let the banner appear, expand it, then dismiss it.
    sleep(Duration::from_secs(12)).await;
    service.banner_tapped().await;
    sleep(Duration::from_secs(2)).await;
    service.banner_tapped().await;
    sleep(Duration::from_secs(1)).await;

    service.show_ad_hoc_banner("Demo notice, gone in 15s").await;
    sleep(Duration::from_secs(1)).await;

    println!("Switching to the launcher; session should close");
    service
        .on_focus_event("com.android.launcher3", clock.now_ms())
        .await;
    sleep(Duration::from_secs(1)).await;

    let now = clock.now_ms();
    let today = start_of_day_ms(now);
    println!("\nToday's usage:");
    for stats in db.stats_by_package_on_date(today, now).await? {
        println!(
            "  {:40} {:>3} sessions  {}",
            stats.package_name,
            stats.session_count,
            format_duration(stats.total_time_ms)
        );
    }

    service.shutdown().await;
    Ok(())
}
