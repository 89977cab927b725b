use serde::Serialize;
use std::fmt;

/// Lifecycle state of a crawl run
///
/// ```text
/// Idle ──start──▶ Running ◀──resume/pause──▶ Paused
///                    │                          │
///        exhausted / page cap                 stop
///                    ▼                          ▼
///                Completed                   Stopped
/// ```
///
/// `stop()` also moves a Running run to Stopped. Completed and Stopped runs go
/// back to Running on the next `start()`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum RunState {
    #[default]
    Idle,
    Running,
    Paused,
    Stopped,
    Completed,
}

impl RunState {
    /// Returns true while a run owns the engine (Running or Paused)
    pub fn is_active(&self) -> bool {
        matches!(self, Self::Running | Self::Paused)
    }

    /// Returns true for the two end states of a run
    pub fn is_finished(&self) -> bool {
        matches!(self, Self::Stopped | Self::Completed)
    }

    /// Label shown with progress updates
    pub fn status_label(&self) -> &'static str {
        match self {
            Self::Idle => "Idle",
            Self::Running => "Scraping...",
            Self::Paused => "Paused",
            Self::Stopped => "Stopped",
            Self::Completed => "Completed",
        }
    }

    /// Converts to a string representation for storage
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Idle => "idle",
            Self::Running => "running",
            Self::Paused => "paused",
            Self::Stopped => "stopped",
            Self::Completed => "completed",
        }
    }

    /// Parses the storage representation
    pub fn from_str_value(s: &str) -> Option<Self> {
        match s {
            "idle" => Some(Self::Idle),
            "running" => Some(Self::Running),
            "paused" => Some(Self::Paused),
            "stopped" => Some(Self::Stopped),
            "completed" => Some(Self::Completed),
            _ => None,
        }
    }
}

impl fmt::Display for RunState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.as_str())
    }
}
