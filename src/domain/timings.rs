use std::time::Duration;

pub const DEFAULT_PAUSE: Duration = Duration::from_secs(5);
pub const DEFAULT_REFRESH: Duration = Duration::from_secs(10);
pub const DEFAULT_DISPLAY: Duration = Duration::from_secs(15);

/// The three windows driving the typing protocol.
///
/// `display` should exceed `refresh` so a remote that keeps typing never
/// expires between two refreshes.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct TypingTimings {
    /// Local inactivity after which STOPPED is sent.
    pub pause: Duration,
    /// Interval at which STARTED is re-sent during a long typing session.
    pub refresh: Duration,
    /// How long a remote STARTED stays visible without a refresh.
    pub display: Duration,
}

impl Default for TypingTimings {
    fn default() -> Self {
        Self {
            pause: DEFAULT_PAUSE,
            refresh: DEFAULT_REFRESH,
            display: DEFAULT_DISPLAY,
        }
    }
}

impl TypingTimings {
    pub fn display_outlasts_refresh(&self) -> bool {
        self.display > self.refresh
    }
}
