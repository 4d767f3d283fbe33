use std::time::Duration;

use crate::models::ColorToken;

/// Timing and palette knobs for an editing session
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Settings {
    /// One remark is scheduled per entry after each triggering edit
    pub remark_delays: Vec<Duration>,
    /// Assigned round-robin to sentences when they get their first remark
    pub remark_colors: Vec<ColorToken>,
    /// Repeated commits at one separator inside this window are coalesced
    pub commit_debounce: Duration,
    pub double_click: Duration,
}

impl Default for Settings {
    fn default() -> Self {
        Self {
            remark_delays: vec![Duration::from_secs(2), Duration::from_secs(5)],
            remark_colors: ["amber", "teal", "rose", "violet"]
                .into_iter()
                .map(ColorToken::from)
                .collect(),
            commit_debounce: Duration::from_millis(500),
            double_click: Duration::from_millis(300),
        }
    }
}
