//! Shutdown warning notices.
//!
//! Provides the `Notifier` trait used to tell the user a shutdown is pending.
//! The state machine never reads anything back from a notice; the user cancels
//! by producing input, which is picked up by the next idle sample.

pub mod desktop;

use async_trait::async_trait;
use clap::ValueEnum;
use thiserror::Error;
use tracing::{info, warn};

pub use desktop::DesktopNotifier;

/// Handle to a notice that is currently shown.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct NoticeHandle {
    /// Backend-specific notice id.
    pub id: u32,

    /// All lines shown so far, first line included.
    pub lines: Vec<String>,
}

impl NoticeHandle {
    pub fn new(id: u32, message: &str) -> Self {
        Self {
            id,
            lines: vec![message.to_string()],
        }
    }

    /// Full notice text.
    pub fn body(&self) -> String {
        self.lines.join("\n")
    }
}

/// Errors that can occur while showing a notice.
#[derive(Error, Debug)]
pub enum NotifyError {
    #[error("Notification service unavailable: {0}")]
    Unavailable(String),

    #[error("Notification call failed: {0}")]
    CallFailed(String),
}

/// Capability to display a warning to the user.
#[async_trait]
pub trait Notifier: Send {
    /// Show a new notice.
    async fn show(&mut self, message: &str) -> Result<NoticeHandle, NotifyError>;

    /// Add a line to a shown notice.
    async fn append_line(&mut self, handle: &mut NoticeHandle, text: &str) -> Result<(), NotifyError>;

    /// Close a notice. With `discard_changes` the notice disappears at once;
    /// otherwise its final text is left for the user to read.
    async fn close(&mut self, handle: NoticeHandle, discard_changes: bool) -> Result<(), NotifyError>;
}

/// Which notifier to use.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, ValueEnum)]
pub enum NotifierKind {
    /// Desktop notifications, falling back to the log when unavailable.
    #[default]
    Desktop,
    /// Operator log only.
    Log,
}

/// Build the notifier for the selected kind.
pub async fn notifier_for(kind: NotifierKind) -> Box<dyn Notifier> {
    match kind {
        NotifierKind::Log => Box::new(LogNotifier::new()),
        NotifierKind::Desktop => match DesktopNotifier::connect().await {
            Ok(notifier) => Box::new(notifier),
            Err(e) => {
                warn!("{}. Falling back to log notices.", e);
                Box::new(LogNotifier::new())
            }
        },
    }
}

/// Notifier that writes notices to the operator log.
#[derive(Debug, Default)]
pub struct LogNotifier {
    next_id: u32,
}

impl LogNotifier {
    pub fn new() -> Self {
        Self::default()
    }
}

#[async_trait]
impl Notifier for LogNotifier {
    async fn show(&mut self, message: &str) -> Result<NoticeHandle, NotifyError> {
        self.next_id += 1;
        warn!("[notice {}] {}", self.next_id, message);
        Ok(NoticeHandle::new(self.next_id, message))
    }

    async fn append_line(&mut self, handle: &mut NoticeHandle, text: &str) -> Result<(), NotifyError> {
        warn!("[notice {}] {}", handle.id, text);
        handle.lines.push(text.to_string());
        Ok(())
    }

    async fn close(&mut self, handle: NoticeHandle, discard_changes: bool) -> Result<(), NotifyError> {
        info!(
            "[notice {}] closed ({})",
            handle.id,
            if discard_changes { "dismissed" } else { "final" }
        );
        Ok(())
    }
}
