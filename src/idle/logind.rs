//! Idle detection via systemd-logind `DBus` interface.
//!
//! Reads `IdleHint` and `IdleSinceHint` from the current session. Only useful
//! when the desktop environment reports idleness to logind.

use std::env;
use std::time::{Duration, SystemTime, UNIX_EPOCH};

use async_trait::async_trait;
use tracing::{debug, info, trace};
use zbus::Connection;

use super::{IdleError, InputMonitor};
use crate::domain::InactivityDuration;

/// `DBus` service and path for login1.
const LOGIND_SERVICE: &str = "org.freedesktop.login1";
const LOGIND_PATH: &str = "/org/freedesktop/login1";
const SESSION_INTERFACE: &str = "org.freedesktop.login1.Session";
const PROPERTIES_INTERFACE: &str = "org.freedesktop.DBus.Properties";

/// Input monitor that asks systemd-logind how long the session has been idle.
#[derive(Default)]
pub struct LogindMonitor {
    conn: Option<Connection>,

    /// Session object path in `DBus`, resolved on first use.
    session_path: Option<String>,
}

impl LogindMonitor {
    pub fn new() -> Self {
        Self::default()
    }

    /// Connect and resolve the session path if not done yet.
    async fn ensure_connected(&mut self) -> Result<(Connection, String), IdleError> {
        if let (Some(conn), Some(path)) = (&self.conn, &self.session_path) {
            return Ok((conn.clone(), path.clone()));
        }

        let conn = Connection::system()
            .await
            .map_err(|e| IdleError::PlatformQuery(format!("Failed to connect to system DBus: {e}")))?;

        let path = resolve_session_path(&conn).await?;
        info!("Resolved session path: {}", path);

        self.conn = Some(conn.clone());
        self.session_path = Some(path.clone());
        Ok((conn, path))
    }
}

#[async_trait]
impl InputMonitor for LogindMonitor {
    async fn sample_inactivity(&mut self) -> Result<InactivityDuration, IdleError> {
        let (conn, path) = self.ensure_connected().await?;

        let result = read_inactivity(&conn, &path).await;
        if result.is_err() {
            // Re-resolve on the next sample
            self.conn = None;
            self.session_path = None;
        }
        result
    }
}

/// Resolve the session object path for the current session.
async fn resolve_session_path(conn: &Connection) -> Result<String, IdleError> {
    // First try XDG_SESSION_ID if available
    if let Ok(session_id) = env::var("XDG_SESSION_ID") {
        debug!("Using XDG_SESSION_ID: {}", session_id);

        const MANAGER_INTERFACE: &str = "org.freedesktop.login1.Manager";

        let proxy = zbus::Proxy::new(conn, LOGIND_SERVICE, LOGIND_PATH, MANAGER_INTERFACE)
            .await
            .map_err(|e| IdleError::PlatformQuery(format!("Failed to create Manager proxy: {e}")))?;

        let path: zbus::zvariant::OwnedObjectPath = proxy
            .call("GetSession", &(&session_id,))
            .await
            .map_err(|e| IdleError::PlatformQuery(format!("GetSession call failed: {e}")))?;

        return Ok(path.to_string());
    }

    debug!("XDG_SESSION_ID not set, trying to find current session");

    for candidate in ["self", "auto"] {
        let path = format!("{LOGIND_PATH}/session/{candidate}");
        if get_property(conn, &path, "IdleHint").await.is_ok() {
            return Ok(path);
        }
    }

    Err(IdleError::PlatformQuery(
        "Could not resolve session path. Set XDG_SESSION_ID or ensure logind session is available."
            .to_string(),
    ))
}

/// Compute inactivity from the session's idle hints.
async fn read_inactivity(conn: &Connection, session_path: &str) -> Result<InactivityDuration, IdleError> {
    let hint = get_property(conn, session_path, "IdleHint").await?;
    let idle: bool = hint
        .downcast_ref::<bool>()
        .map_err(|_| IdleError::PlatformQuery("IdleHint is not a boolean".to_string()))?;

    if !idle {
        trace!("Session not idle");
        return Ok(InactivityDuration::ZERO);
    }

    let since = get_property(conn, session_path, "IdleSinceHint").await?;
    let since_usec: u64 = since
        .downcast_ref::<u64>()
        .map_err(|_| IdleError::PlatformQuery("IdleSinceHint is not a u64".to_string()))?;

    let now = SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .map_err(|e| IdleError::PlatformQuery(format!("System clock before epoch: {e}")))?;

    Ok(idle_since(now, since_usec))
}

/// Inactivity given the current wall clock and logind's idle-since timestamp.
fn idle_since(now: Duration, since_usec: u64) -> InactivityDuration {
    InactivityDuration::new(now.saturating_sub(Duration::from_micros(since_usec)))
}

/// Get a property from the login1 session interface.
async fn get_property(
    conn: &Connection,
    session_path: &str,
    name: &str,
) -> Result<zbus::zvariant::OwnedValue, IdleError> {
    let proxy = zbus::Proxy::new(conn, LOGIND_SERVICE, session_path, PROPERTIES_INTERFACE)
        .await
        .map_err(|e| IdleError::PlatformQuery(format!("Failed to create Properties proxy: {e}")))?;

    proxy
        .call("Get", &(SESSION_INTERFACE, name))
        .await
        .map_err(|e| IdleError::PlatformQuery(format!("Failed to get {name} property: {e}")))
}
