//! Domain types for idle tracking and the shutdown policy.

use std::fmt;
use std::time::Duration;

/// Default idle threshold in minutes.
pub const DEFAULT_IDLE_THRESHOLD_MINUTES: u64 = 90;

/// Inactivity (in whole minutes) that escalates monitoring into a warning.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct IdleThreshold(u64);

impl IdleThreshold {
    /// Create a threshold. Zero is rejected since every sample would breach it,
    /// and so is anything too large to express in seconds.
    pub fn from_minutes(minutes: u64) -> Option<Self> {
        (minutes > 0 && minutes.checked_mul(60).is_some()).then_some(Self(minutes))
    }

    pub fn minutes(self) -> u64 {
        self.0
    }

    pub fn as_duration(self) -> Duration {
        Duration::from_secs(self.0.saturating_mul(60))
    }

    /// Whether a sampled inactivity breaches this threshold (`>=`).
    pub fn is_breached_by(self, inactivity: InactivityDuration) -> bool {
        inactivity.as_duration() >= self.as_duration()
    }
}

impl Default for IdleThreshold {
    fn default() -> Self {
        Self(DEFAULT_IDLE_THRESHOLD_MINUTES)
    }
}

impl fmt::Display for IdleThreshold {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// Time elapsed since the last keyboard or pointer event.
///
/// Produced fresh by an input monitor for a single decision and never cached.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord)]
pub struct InactivityDuration(Duration);

impl InactivityDuration {
    pub const ZERO: Self = Self(Duration::ZERO);

    pub fn new(duration: Duration) -> Self {
        Self(duration)
    }

    pub fn from_millis(millis: u64) -> Self {
        Self(Duration::from_millis(millis))
    }

    pub fn as_duration(self) -> Duration {
        self.0
    }

    /// Minutes rounded to two decimal places, for reporting only.
    pub fn rounded_minutes(self) -> f64 {
        (self.0.as_secs_f64() / 60.0 * 100.0).round() / 100.0
    }
}

impl fmt::Display for InactivityDuration {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{:.2}", self.rounded_minutes())
    }
}

/// State of the idle monitor. One instance per process, owned by the machine.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MonitorState {
    Monitoring,
    Warning,
    ShutdownCommitted,
}

impl MonitorState {
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Monitoring => "monitoring",
            Self::Warning => "warning",
            Self::ShutdownCommitted => "shutdown-committed",
        }
    }
}

/// Fixed waits driving the state machine.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Timings {
    /// Wait between samples while monitoring, and before the very first sample.
    pub sample_interval: Duration,

    /// Wait after the warning is shown before the commit decision.
    pub grace_period: Duration,

    /// How long the "still here" line stays up before the notice is dismissed.
    pub dismiss_delay: Duration,
}

impl Default for Timings {
    fn default() -> Self {
        Self {
            sample_interval: Duration::from_secs(10 * 60),
            grace_period: Duration::from_secs(5 * 60),
            dismiss_delay: Duration::from_secs(4),
        }
    }
}

/// Format a duration as minutes for user-facing text: "5" or "0.02".
pub fn format_minutes(duration: Duration) -> String {
    let secs = duration.as_secs();
    if duration.subsec_nanos() == 0 && secs % 60 == 0 {
        return (secs / 60).to_string();
    }
    format!("{:.2}", duration.as_secs_f64() / 60.0)
}
