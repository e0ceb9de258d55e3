use anyhow::Result;

/// Content for the minimized strip.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MinimizedContent {
    pub app_name: String,
    pub session_time: String,
    pub accent_color: &'static str,
}

/// Content for the expanded card.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ExpandedContent {
    pub app_name: String,
    pub session_time: String,
    pub today_total: String,
    pub message: String,
    pub accent_color: &'static str,
}

/// Rendering target for the banner.
///
/// The state machine drives this blindly; platform glue (an overlay window,
/// a terminal line, a test recorder) lives behind it. `attach` may fail when
/// the platform refuses the overlay, in which case the banner stays hidden.
pub trait BannerSurface: Send + Sync {
    fn attach(&mut self) -> Result<()>;
    fn detach(&mut self) -> Result<()>;
    fn render_minimized(&mut self, content: &MinimizedContent);
    fn render_expanded(&mut self, content: &ExpandedContent);
    /// One-off notice shown outside the session flow.
    fn render_notice(&mut self, message: &str);
}
