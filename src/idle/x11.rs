//! Idle detection via the X11 MIT-SCREEN-SAVER extension.

use std::time::Duration;

use async_trait::async_trait;
use tracing::{debug, trace};
use x11rb::connection::Connection;
use x11rb::protocol::screensaver::ConnectionExt as ScreensaverConnectionExt;
use x11rb::rust_connection::RustConnection;

use super::{IdleError, InputMonitor};
use crate::domain::InactivityDuration;

/// Upper bound on one connect-and-query round trip.
const QUERY_TIMEOUT: Duration = Duration::from_secs(5);

/// X11 connection plus the root window of the default screen.
struct Display {
    conn: RustConnection,
    root: u32,
}

/// Input monitor backed by `XScreenSaverQueryInfo`.
///
/// Connects on first use and drops the connection after any error so the
/// next sample reconnects. The round trip runs on the blocking pool, so a
/// hung X server costs a timeout instead of a runtime worker.
#[derive(Default)]
pub struct X11Monitor {
    display: Option<Display>,
}

impl X11Monitor {
    pub fn new() -> Self {
        Self::default()
    }

    fn connect() -> Result<Display, IdleError> {
        let (conn, screen_num) = RustConnection::connect(None)
            .map_err(|e| IdleError::PlatformQuery(format!("X11 connect failed: {e}")))?;

        let root = conn
            .setup()
            .roots
            .get(screen_num)
            .map(|screen| screen.root)
            .ok_or_else(|| IdleError::PlatformQuery(format!("No X11 screen {screen_num}")))?;

        debug!("Connected to X11 display (screen {})", screen_num);
        Ok(Display { conn, root })
    }

    fn query(display: &Display) -> Result<InactivityDuration, IdleError> {
        let reply = display
            .conn
            .screensaver_query_info(display.root)
            .map_err(|e| IdleError::PlatformQuery(format!("QueryInfo request failed: {e}")))?
            .reply()
            .map_err(|e| IdleError::PlatformQuery(format!("QueryInfo reply failed: {e}")))?;

        Ok(InactivityDuration::from_millis(u64::from(
            reply.ms_since_user_input,
        )))
    }
}

#[async_trait]
impl InputMonitor for X11Monitor {
    async fn sample_inactivity(&mut self) -> Result<InactivityDuration, IdleError> {
        let display = self.display.take();
        let (display, idle) = run_blocking(QUERY_TIMEOUT, move || {
            let display = match display {
                Some(display) => display,
                None => Self::connect()?,
            };
            let idle = Self::query(&display)?;
            Ok((display, idle))
        })
        .await?;
        trace!("X11 ms since input: {:?}", idle.as_duration());

        self.display = Some(display);
        Ok(idle)
    }
}

/// Run a blocking X11 call off the runtime, giving up after `limit`.
async fn run_blocking<T, F>(limit: Duration, call: F) -> Result<T, IdleError>
where
    T: Send + 'static,
    F: FnOnce() -> Result<T, IdleError> + Send + 'static,
{
    match tokio::time::timeout(limit, tokio::task::spawn_blocking(call)).await {
        Ok(Ok(result)) => result,
        Ok(Err(e)) => Err(IdleError::PlatformQuery(format!("X11 query task failed: {e}"))),
        Err(_) => Err(IdleError::PlatformQuery(format!(
            "X11 query timed out after {limit:?}"
        ))),
    }
}
