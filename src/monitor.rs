//! Idle-to-shutdown state machine.
//!
//! ```text
//! Monitoring --(idle >= threshold)--> Warning --(still idle)--> ShutdownCommitted
//!     ^                                  |
//!     +------(input during grace)--------+
//! ```
//!
//! The machine waits one sample interval before its first sample, because
//! right after a resume from sleep the reported idle time still covers the
//! whole sleep. A failed idle query never causes a transition.

use std::time::Duration;

use tokio_util::sync::CancellationToken;
use tracing::{debug, info, warn};

use crate::config::Config;
use crate::domain::{IdleThreshold, InactivityDuration, MonitorState, Timings, format_minutes};
use crate::event_log::{EventLog, LogEvent};
use crate::idle::InputMonitor;
use crate::notify::{NoticeHandle, Notifier};
use crate::shutdown::ShutdownExecutor;

const STILL_HERE_LINE: &str = "OK, you're still here...";
const SHUTTING_DOWN_LINE: &str = "Shutting down...";

/// How `run` ended.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RunOutcome {
    /// The shutdown executor was invoked.
    ShutdownCommitted,
    /// The process was asked to stop before a shutdown was committed.
    Stopped,
}

/// How a warning was resolved.
enum Resolution {
    Cancelled,
    Committed,
    Stopped,
}

/// External capabilities the machine drives.
pub struct Collaborators {
    pub input: Box<dyn InputMonitor>,
    pub notifier: Box<dyn Notifier>,
    pub executor: Box<dyn ShutdownExecutor>,
    pub event_log: Box<dyn EventLog>,
}

/// Owns the monitor state and the polling loop.
pub struct IdleShutdownMachine {
    threshold: IdleThreshold,
    verbose: bool,
    timings: Timings,
    state: MonitorState,
    #[cfg(test)]
    history: Vec<MonitorState>,
    input: Box<dyn InputMonitor>,
    notifier: Box<dyn Notifier>,
    executor: Box<dyn ShutdownExecutor>,
    event_log: Box<dyn EventLog>,
}

impl IdleShutdownMachine {
    pub fn new(config: &Config, timings: Timings, parts: Collaborators) -> Self {
        Self {
            threshold: config.threshold(),
            verbose: config.verbose,
            timings,
            state: MonitorState::Monitoring,
            #[cfg(test)]
            history: vec![MonitorState::Monitoring],
            input: parts.input,
            notifier: parts.notifier,
            executor: parts.executor,
            event_log: parts.event_log,
        }
    }

    pub fn state(&self) -> MonitorState {
        self.state
    }

    /// Every state entered so far, starting with `Monitoring`.
    #[cfg(test)]
    pub fn history(&self) -> &[MonitorState] {
        &self.history
    }

    /// Run until a shutdown is committed or `stop` is cancelled.
    pub async fn run(&mut self, stop: &CancellationToken) -> RunOutcome {
        info!("Max idle time configured: {} minutes", self.threshold);
        debug!(
            "Waiting {:?} before the first sample (verbose={})",
            self.timings.sample_interval, self.verbose
        );

        if !wait(self.timings.sample_interval, stop).await {
            return RunOutcome::Stopped;
        }

        loop {
            match self.state {
                MonitorState::Monitoring => {
                    if self.check_idle().await {
                        self.transition(MonitorState::Warning);
                        continue;
                    }
                    if !wait(self.timings.sample_interval, stop).await {
                        return RunOutcome::Stopped;
                    }
                }
                MonitorState::Warning => match self.warn_and_resolve(stop).await {
                    Resolution::Cancelled => self.transition(MonitorState::Monitoring),
                    Resolution::Committed => self.transition(MonitorState::ShutdownCommitted),
                    Resolution::Stopped => return RunOutcome::Stopped,
                },
                MonitorState::ShutdownCommitted => {
                    self.executor.commit_shutdown().await;
                    return RunOutcome::ShutdownCommitted;
                }
            }
        }
    }

    /// Take one monitoring sample. Returns true on a threshold breach.
    async fn check_idle(&mut self) -> bool {
        let Some(idle) = self.sample().await else {
            return false;
        };

        if self.verbose {
            self.record(&LogEvent::IdleSample(idle));
        }

        self.threshold.is_breached_by(idle)
    }

    /// Show the warning, wait out the grace period and decide.
    async fn warn_and_resolve(&mut self, stop: &CancellationToken) -> Resolution {
        let grace = self.timings.grace_period;
        let mut notice = self.show(&warning_message(self.threshold, grace)).await;
        self.append(&mut notice, &warning_note(grace)).await;

        loop {
            if !wait(grace, stop).await {
                self.close(notice, true).await;
                return Resolution::Stopped;
            }

            let Some(idle) = self.sample().await else {
                warn!("Could not confirm inactivity, extending the grace period");
                continue;
            };

            if self.threshold.is_breached_by(idle) {
                info!("No activity during grace period, shutting down");
                self.record(&LogEvent::ShutdownCommitted);
                self.append(&mut notice, SHUTTING_DOWN_LINE).await;
                self.close(notice, false).await;
                return Resolution::Committed;
            }

            info!("Activity detected, shutdown cancelled");
            self.append(&mut notice, STILL_HERE_LINE).await;
            let dismissed = wait(self.timings.dismiss_delay, stop).await;
            self.close(notice, true).await;
            self.record(&LogEvent::ShutdownCancelled);
            return if dismissed {
                Resolution::Cancelled
            } else {
                Resolution::Stopped
            };
        }
    }

    /// Fresh inactivity sample, or `None` when the platform query failed.
    async fn sample(&mut self) -> Option<InactivityDuration> {
        match self.input.sample_inactivity().await {
            Ok(idle) => {
                info!("idle for {} minutes", idle);
                Some(idle)
            }
            Err(e) => {
                warn!("{}; treating user as active", e);
                None
            }
        }
    }

    fn transition(&mut self, next: MonitorState) {
        info!("State: {} -> {}", self.state.as_str(), next.as_str());
        self.state = next;
        #[cfg(test)]
        self.history.push(next);
    }

    fn record(&mut self, event: &LogEvent) {
        if let Err(e) = self.event_log.append(event) {
            warn!("Failed to record event: {}", e);
        }
    }

    async fn show(&mut self, message: &str) -> Option<NoticeHandle> {
        match self.notifier.show(message).await {
            Ok(handle) => Some(handle),
            Err(e) => {
                warn!("Failed to show shutdown warning: {}", e);
                None
            }
        }
    }

    async fn append(&mut self, notice: &mut Option<NoticeHandle>, text: &str) {
        if let Some(handle) = notice
            && let Err(e) = self.notifier.append_line(handle, text).await
        {
            warn!("Failed to update shutdown warning: {}", e);
        }
    }

    async fn close(&mut self, notice: Option<NoticeHandle>, discard_changes: bool) {
        if let Some(handle) = notice
            && let Err(e) = self.notifier.close(handle, discard_changes).await
        {
            warn!("Failed to close shutdown warning: {}", e);
        }
    }
}

/// Sleep for `duration`. Returns false if `stop` fired first.
async fn wait(duration: Duration, stop: &CancellationToken) -> bool {
    tokio::select! {
        () = tokio::time::sleep(duration) => true,
        () = stop.cancelled() => false,
    }
}

fn warning_message(threshold: IdleThreshold, grace: Duration) -> String {
    format!(
        "Computer was not touched for {} minutes and will shut down in {} minutes.",
        threshold,
        format_minutes(grace)
    )
}

fn warning_note(grace: Duration) -> String {
    format!(
        "Note: to prevent shutdown move the mouse in the next {} minutes.",
        format_minutes(grace)
    )
}
