//! System shutdown.
//!
//! Issues the OS power-off command and then, unconditionally, clicks through
//! the desktop shutdown menu as a redundant trigger. Neither path is verified:
//! if the command works the process dies with the machine.

use std::process::Stdio;
use std::str::FromStr;
use std::time::Duration;

use async_trait::async_trait;
use thiserror::Error;
use tokio::process::Command;
use tracing::{debug, info, warn};
use x11rb::connection::Connection;
use x11rb::errors::ConnectionError;
use x11rb::protocol::xproto::{BUTTON_PRESS_EVENT, BUTTON_RELEASE_EVENT, MOTION_NOTIFY_EVENT};
use x11rb::protocol::xtest::ConnectionExt as XTestConnectionExt;
use x11rb::rust_connection::RustConnection;

/// Default power-off command.
pub const DEFAULT_SHUTDOWN_COMMAND: &[&str] = &["systemctl", "poweroff"];

/// Pointer button used for fallback clicks.
const LEFT_BUTTON: u8 = 1;

/// Delay after each fallback click.
const CLICK_DELAY: Duration = Duration::from_secs(1);

/// Errors injecting a fallback click.
#[derive(Error, Debug)]
pub enum ClickError {
    #[error("XTEST fake input failed: {0}")]
    FakeInput(#[source] ConnectionError),

    #[error("Failed to flush X11 connection: {0}")]
    Flush(#[source] ConnectionError),
}

/// Screen position of a fallback click.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ClickPoint {
    pub x: i16,
    pub y: i16,
}

impl ClickPoint {
    pub const fn new(x: i16, y: i16) -> Self {
        Self { x, y }
    }

    /// Shutdown menu button, then its confirm entry.
    pub fn default_sequence() -> Vec<Self> {
        vec![Self::new(20, 1030), Self::new(20, 980)]
    }
}

impl FromStr for ClickPoint {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let (x, y) = s
            .split_once(',')
            .ok_or_else(|| format!("expected X,Y but got {s:?}"))?;
        let parse = |v: &str| {
            v.trim()
                .parse::<i16>()
                .map_err(|e| format!("invalid coordinate {v:?}: {e}"))
        };
        Ok(Self::new(parse(x)?, parse(y)?))
    }
}

/// Capability to power the machine off.
#[async_trait]
pub trait ShutdownExecutor: Send {
    /// Fire the shutdown. Success cannot be observed from this process.
    async fn commit_shutdown(&mut self);
}

/// Shutdown through the OS command plus the scripted click fallback.
#[derive(Debug, Clone)]
pub struct SystemShutdown {
    command: Vec<String>,
    clicks: Vec<ClickPoint>,
    dry_run: bool,
}

impl SystemShutdown {
    pub fn new(command: Vec<String>, clicks: Vec<ClickPoint>, dry_run: bool) -> Self {
        let command = if command.is_empty() {
            DEFAULT_SHUTDOWN_COMMAND.iter().map(ToString::to_string).collect()
        } else {
            command
        };
        let clicks = if clicks.is_empty() {
            ClickPoint::default_sequence()
        } else {
            clicks
        };

        Self {
            command,
            clicks,
            dry_run,
        }
    }

    /// Spawn the power-off command without waiting for it.
    fn spawn_command(&self) {
        let Some((program, args)) = self.command.split_first() else {
            return;
        };

        if self.dry_run {
            info!("[DRY RUN] Would execute: {}", self.command.join(" "));
            return;
        }

        info!("Executing: {}", self.command.join(" "));
        match Command::new(program)
            .args(args)
            .stdin(Stdio::null())
            .stdout(Stdio::null())
            .stderr(Stdio::null())
            .spawn()
        {
            Ok(child) => debug!("Shutdown command spawned (pid {:?})", child.id()),
            Err(e) => warn!("Failed to spawn shutdown command: {}", e),
        }
    }

    /// Click through the shutdown menu. Failures are not reported.
    async fn click_fallback(&self) {
        if self.dry_run {
            info!("[DRY RUN] Would click at {:?}", self.clicks);
            return;
        }

        let display = match RustConnection::connect(None) {
            Ok((conn, screen_num)) => {
                let root = conn.setup().roots.get(screen_num).map(|screen| screen.root);
                root.map(|root| (conn, root))
            }
            Err(e) => {
                debug!("Fallback clicks skipped, no X11 display: {}", e);
                None
            }
        };

        for point in &self.clicks {
            if let Some((conn, root)) = &display
                && let Err(e) = click(conn, *root, *point)
            {
                debug!("Fallback click at {:?} failed: {}", point, e);
            }
            tokio::time::sleep(CLICK_DELAY).await;
        }
    }
}

#[async_trait]
impl ShutdownExecutor for SystemShutdown {
    async fn commit_shutdown(&mut self) {
        self.spawn_command();
        self.click_fallback().await;
    }
}

/// Move the pointer to `point` and press/release the left button via XTEST.
fn click(conn: &RustConnection, root: u32, point: ClickPoint) -> Result<(), ClickError> {
    conn.xtest_fake_input(MOTION_NOTIFY_EVENT, 0, 0, root, point.x, point.y, 0)
        .map_err(ClickError::FakeInput)?;
    conn.xtest_fake_input(BUTTON_PRESS_EVENT, LEFT_BUTTON, 0, root, 0, 0, 0)
        .map_err(ClickError::FakeInput)?;
    conn.xtest_fake_input(BUTTON_RELEASE_EVENT, LEFT_BUTTON, 0, root, 0, 0, 0)
        .map_err(ClickError::FakeInput)?;
    conn.flush().map_err(ClickError::Flush)?;
    Ok(())
}
