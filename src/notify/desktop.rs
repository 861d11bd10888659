//! Desktop notices via the freedesktop Notifications `DBus` service.

use std::collections::HashMap;

use async_trait::async_trait;
use tracing::{debug, info};
use zbus::Connection;
use zbus::zvariant::Value;

use super::{NoticeHandle, Notifier, NotifyError};

const NOTIFICATIONS_SERVICE: &str = "org.freedesktop.Notifications";
const NOTIFICATIONS_PATH: &str = "/org/freedesktop/Notifications";
const NOTIFICATIONS_INTERFACE: &str = "org.freedesktop.Notifications";

const APP_NAME: &str = "idle-shutdownd";
const SUMMARY: &str = "Idle shutdown";

/// Urgency hint value for "critical".
const URGENCY_CRITICAL: u8 = 2;

/// Expiry (ms) of a notice closed without discarding. Zero means never.
const FINAL_NOTICE_TIMEOUT_MS: i32 = 30_000;

/// Notifier backed by `org.freedesktop.Notifications` on the session bus.
pub struct DesktopNotifier {
    proxy: zbus::Proxy<'static>,
}

impl DesktopNotifier {
    /// Connect to the session bus notification service.
    pub async fn connect() -> Result<Self, NotifyError> {
        let conn = Connection::session()
            .await
            .map_err(|e| NotifyError::Unavailable(format!("Failed to connect to session DBus: {e}")))?;

        let proxy = zbus::Proxy::new(
            &conn,
            NOTIFICATIONS_SERVICE,
            NOTIFICATIONS_PATH,
            NOTIFICATIONS_INTERFACE,
        )
        .await
        .map_err(|e| NotifyError::Unavailable(format!("Failed to create Notifications proxy: {e}")))?;

        info!("Connected to desktop notification service");
        Ok(Self { proxy })
    }

    /// Post or replace a notification and return its id.
    async fn notify(&self, replaces_id: u32, body: &str, expire_timeout: i32) -> Result<u32, NotifyError> {
        let mut hints: HashMap<&str, Value<'_>> = HashMap::new();
        hints.insert("urgency", Value::from(URGENCY_CRITICAL));
        let actions: Vec<&str> = Vec::new();

        let id: u32 = self
            .proxy
            .call(
                "Notify",
                &(APP_NAME, replaces_id, "", SUMMARY, body, actions, hints, expire_timeout),
            )
            .await
            .map_err(|e| NotifyError::CallFailed(format!("Notify failed: {e}")))?;

        debug!("Posted notification {} (replaces {})", id, replaces_id);
        Ok(id)
    }
}

#[async_trait]
impl Notifier for DesktopNotifier {
    async fn show(&mut self, message: &str) -> Result<NoticeHandle, NotifyError> {
        let id = self.notify(0, message, 0).await?;
        Ok(NoticeHandle::new(id, message))
    }

    async fn append_line(&mut self, handle: &mut NoticeHandle, text: &str) -> Result<(), NotifyError> {
        handle.lines.push(text.to_string());
        handle.id = self.notify(handle.id, &handle.body(), 0).await?;
        Ok(())
    }

    async fn close(&mut self, handle: NoticeHandle, discard_changes: bool) -> Result<(), NotifyError> {
        if discard_changes {
            self.proxy
                .call_method("CloseNotification", &(handle.id,))
                .await
                .map_err(|e| NotifyError::CallFailed(format!("CloseNotification failed: {e}")))?;
            debug!("Closed notification {}", handle.id);
        } else {
            self.notify(handle.id, &handle.body(), FINAL_NOTICE_TIMEOUT_MS)
                .await?;
        }
        Ok(())
    }
}
