//! Input inactivity sampling.
//!
//! Provides the `InputMonitor` trait and backends for X11 (MIT-SCREEN-SAVER)
//! and systemd-logind.

pub mod logind;
pub mod x11;

use std::env;

use async_trait::async_trait;
use clap::ValueEnum;
use thiserror::Error;
use tracing::info;

pub use logind::LogindMonitor;
pub use x11::X11Monitor;

use crate::domain::InactivityDuration;

/// Errors that can occur while querying the platform for idle time.
#[derive(Error, Debug)]
pub enum IdleError {
    #[error("Platform idle query failed: {0}")]
    PlatformQuery(String),
}

/// Source of "time since last keyboard or pointer input".
#[async_trait]
pub trait InputMonitor: Send {
    /// Sample the current inactivity.
    ///
    /// Must return promptly. Callers treat an error as "user active".
    async fn sample_inactivity(&mut self) -> Result<InactivityDuration, IdleError>;
}

/// Which idle backend to use.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, ValueEnum)]
pub enum IdleBackend {
    /// X11 when `DISPLAY` is set, logind otherwise.
    #[default]
    Auto,
    /// X11 MIT-SCREEN-SAVER extension.
    X11,
    /// systemd-logind session idle hint.
    Logind,
}

/// Build the input monitor for the selected backend.
///
/// Backends connect lazily, so this never fails; an unavailable platform
/// shows up as sampling errors instead.
pub fn monitor_for(backend: IdleBackend) -> Box<dyn InputMonitor> {
    let resolved = match backend {
        IdleBackend::Auto if env::var_os("DISPLAY").is_some() => IdleBackend::X11,
        IdleBackend::Auto => IdleBackend::Logind,
        other => other,
    };

    info!("Using idle backend: {:?}", resolved);

    match resolved {
        IdleBackend::Logind => Box::new(LogindMonitor::new()),
        _ => Box::new(X11Monitor::new()),
    }
}
