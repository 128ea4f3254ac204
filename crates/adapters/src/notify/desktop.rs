// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Desktop notification adapter using notify-rust.
//!
//! On macOS, `notify-rust` uses `mac-notification-sys` (Cocoa bindings) to
//! send notifications via the Notification Center. The first notification
//! triggers `ensure_application_set()` which runs an AppleScript to look
//! up a bundle identifier. In a daemon context without Automation
//! permissions, that AppleScript blocks forever. We pre-set the bundle
//! identifier at construction time to bypass the lookup entirely.

use super::{NotifyAdapter, NotifyError, ToastVariant};
use async_trait::async_trait;
use std::time::Duration;

#[derive(Clone, Copy, Debug, Default)]
pub struct DesktopNotifyAdapter;

impl DesktopNotifyAdapter {
    pub fn new() -> Self {
        #[cfg(target_os = "macos")]
        {
            // Pre-set the application bundle identifier so mac-notification-sys
            // skips its NSAppleScript lookup (which blocks forever in daemon
            // processes that lack Automation permissions).
            let _ = mac_notification_sys::set_application("com.apple.Terminal");
        }
        Self
    }

    fn show(title: String, message: String, timeout_ms: u32) {
        // notify_rust::Notification::show() is synchronous on macOS.
        // Fire-and-forget on tokio's bounded blocking thread pool to avoid
        // blocking the async runtime while capping OS thread count.
        tokio::task::spawn_blocking(move || {
            tracing::info!(%title, %message, "sending desktop notification");
            match notify_rust::Notification::new()
                .summary(&title)
                .body(&message)
                .timeout(notify_rust::Timeout::Milliseconds(timeout_ms))
                .show()
            {
                Ok(_) => {
                    tracing::info!(%title, "desktop notification sent");
                }
                Err(e) => {
                    tracing::warn!(%title, error = %e, "desktop notification failed");
                }
            }
        });
    }
}

#[async_trait]
impl NotifyAdapter for DesktopNotifyAdapter {
    async fn toast(
        &self,
        title: &str,
        message: &str,
        variant: ToastVariant,
        duration: Duration,
    ) -> Result<(), NotifyError> {
        let title = format!("[{}] {}", variant, title);
        Self::show(title, message.to_string(), duration.as_millis() as u32);
        Ok(())
    }

    async fn notify(&self, message: &str) -> Result<(), NotifyError> {
        Self::show(
            "Mission Control".to_string(),
            message.to_string(),
            ToastVariant::Info.duration().as_millis() as u32,
        );
        Ok(())
    }
}
