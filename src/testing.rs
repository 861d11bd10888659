//! Test doubles for the state machine's collaborators.

use std::collections::VecDeque;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};
use std::time::Duration;

use async_trait::async_trait;
use tokio::time::Instant;

use crate::domain::InactivityDuration;
use crate::event_log::{EventLog, LogError, LogEvent};
use crate::idle::{IdleError, InputMonitor};
use crate::notify::{NoticeHandle, Notifier, NotifyError};
use crate::shutdown::ShutdownExecutor;

/// Input monitor driven by the (paused) tokio clock.
///
/// Reports `carried + time since last input`. `touch` simulates a key press.
#[derive(Clone)]
pub struct SimulatedInput {
    inner: Arc<Mutex<SimulatedState>>,
}

struct SimulatedState {
    last_input: Instant,
    carried: Duration,
    failures: usize,
    samples: Vec<Instant>,
}

impl SimulatedInput {
    /// Start as if the user had already been away for `already_idle`.
    pub fn idle_for(already_idle: Duration) -> Self {
        Self {
            inner: Arc::new(Mutex::new(SimulatedState {
                last_input: Instant::now(),
                carried: already_idle,
                failures: 0,
                samples: Vec::new(),
            })),
        }
    }

    pub fn touch(&self) {
        let mut state = self.inner.lock().unwrap();
        state.last_input = Instant::now();
        state.carried = Duration::ZERO;
    }

    /// Make the next `count` samples fail.
    pub fn fail_next(&self, count: usize) {
        self.inner.lock().unwrap().failures = count;
    }

    /// Times at which samples were taken, failed ones included.
    pub fn sample_times(&self) -> Vec<Instant> {
        self.inner.lock().unwrap().samples.clone()
    }
}

#[async_trait]
impl InputMonitor for SimulatedInput {
    async fn sample_inactivity(&mut self) -> Result<InactivityDuration, IdleError> {
        let mut state = self.inner.lock().unwrap();
        state.samples.push(Instant::now());
        if state.failures > 0 {
            state.failures -= 1;
            return Err(IdleError::PlatformQuery("simulated outage".to_string()));
        }
        Ok(InactivityDuration::new(
            state.carried + state.last_input.elapsed(),
        ))
    }
}

/// Input monitor replaying a fixed script, repeating the last entry.
pub struct ScriptedInput {
    script: VecDeque<Option<Duration>>,
    last: Option<Duration>,
}

impl ScriptedInput {
    /// `None` entries simulate a failed query.
    pub fn new(script: impl IntoIterator<Item = Option<Duration>>) -> Self {
        Self {
            script: script.into_iter().collect(),
            last: None,
        }
    }
}

#[async_trait]
impl InputMonitor for ScriptedInput {
    async fn sample_inactivity(&mut self) -> Result<InactivityDuration, IdleError> {
        let next = match self.script.pop_front() {
            Some(entry) => {
                self.last = entry;
                entry
            }
            None => self.last,
        };
        next.map(InactivityDuration::new)
            .ok_or_else(|| IdleError::PlatformQuery("scripted outage".to_string()))
    }
}

/// One recorded notifier call.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum NotifierCall {
    Show(String),
    AppendLine(String),
    Close { discard_changes: bool },
}

/// Notifier that records calls without touching the screen.
#[derive(Clone, Default)]
pub struct RecordingNotifier {
    calls: Arc<Mutex<Vec<NotifierCall>>>,
}

impl RecordingNotifier {
    pub fn calls(&self) -> Vec<NotifierCall> {
        self.calls.lock().unwrap().clone()
    }
}

#[async_trait]
impl Notifier for RecordingNotifier {
    async fn show(&mut self, message: &str) -> Result<NoticeHandle, NotifyError> {
        let mut calls = self.calls.lock().unwrap();
        calls.push(NotifierCall::Show(message.to_string()));
        let id = u32::try_from(calls.len()).unwrap_or(u32::MAX);
        Ok(NoticeHandle::new(id, message))
    }

    async fn append_line(&mut self, handle: &mut NoticeHandle, text: &str) -> Result<(), NotifyError> {
        handle.lines.push(text.to_string());
        self.calls
            .lock()
            .unwrap()
            .push(NotifierCall::AppendLine(text.to_string()));
        Ok(())
    }

    async fn close(&mut self, _handle: NoticeHandle, discard_changes: bool) -> Result<(), NotifyError> {
        self.calls
            .lock()
            .unwrap()
            .push(NotifierCall::Close { discard_changes });
        Ok(())
    }
}

/// Notifier whose every call fails.
pub struct BrokenNotifier;

#[async_trait]
impl Notifier for BrokenNotifier {
    async fn show(&mut self, _message: &str) -> Result<NoticeHandle, NotifyError> {
        Err(NotifyError::Unavailable("no display".to_string()))
    }

    async fn append_line(&mut self, _handle: &mut NoticeHandle, _text: &str) -> Result<(), NotifyError> {
        Err(NotifyError::Unavailable("no display".to_string()))
    }

    async fn close(&mut self, _handle: NoticeHandle, _discard_changes: bool) -> Result<(), NotifyError> {
        Err(NotifyError::Unavailable("no display".to_string()))
    }
}

/// Shutdown executor that only counts invocations.
#[derive(Clone, Default)]
pub struct CountingShutdown {
    count: Arc<AtomicUsize>,
}

impl CountingShutdown {
    pub fn count(&self) -> usize {
        self.count.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl ShutdownExecutor for CountingShutdown {
    async fn commit_shutdown(&mut self) {
        self.count.fetch_add(1, Ordering::SeqCst);
    }
}

/// Event log kept in memory.
#[derive(Clone, Default)]
pub struct MemoryEventLog {
    events: Arc<Mutex<Vec<LogEvent>>>,
}

impl MemoryEventLog {
    pub fn events(&self) -> Vec<LogEvent> {
        self.events.lock().unwrap().clone()
    }

    pub fn count(&self, event: &LogEvent) -> usize {
        self.events().iter().filter(|e| *e == event).count()
    }
}

impl EventLog for MemoryEventLog {
    fn append(&mut self, event: &LogEvent) -> Result<(), LogError> {
        self.events.lock().unwrap().push(event.clone());
        Ok(())
    }
}
