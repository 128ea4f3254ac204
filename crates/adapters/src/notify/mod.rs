// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Notification adapters

mod desktop;
mod noop;

pub use desktop::DesktopNotifyAdapter;
pub use noop::NoOpNotifyAdapter;

// Test support - only compiled for tests or when explicitly requested
#[cfg(any(test, feature = "test-support"))]
mod fake;
#[cfg(any(test, feature = "test-support"))]
pub use fake::{FakeNotifyAdapter, NotifyCall};

use async_trait::async_trait;
use std::fmt;
use std::time::Duration;
use thiserror::Error;

/// Errors from notify operations
#[derive(Debug, Error)]
pub enum NotifyError {
    #[error("send failed: {0}")]
    SendFailed(String),
}

/// Severity of a toast, with its display duration.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ToastVariant {
    Info,
    Success,
    Warning,
    Error,
}

impl ToastVariant {
    /// How long the toast stays on screen.
    pub fn duration(&self) -> Duration {
        match self {
            ToastVariant::Info => Duration::from_secs(5),
            ToastVariant::Success => Duration::from_secs(3),
            ToastVariant::Warning => Duration::from_secs(8),
            ToastVariant::Error => Duration::from_secs(8),
        }
    }
}

impl fmt::Display for ToastVariant {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ToastVariant::Info => write!(f, "info"),
            ToastVariant::Success => write!(f, "success"),
            ToastVariant::Warning => write!(f, "warning"),
            ToastVariant::Error => write!(f, "error"),
        }
    }
}

/// Adapter for surfacing notifications to the operator.
#[async_trait]
pub trait NotifyAdapter: Clone + Send + Sync + 'static {
    /// Show a transient toast.
    async fn toast(
        &self,
        title: &str,
        message: &str,
        variant: ToastVariant,
        duration: Duration,
    ) -> Result<(), NotifyError>;

    /// Send a plain structured notification.
    async fn notify(&self, message: &str) -> Result<(), NotifyError>;
}
