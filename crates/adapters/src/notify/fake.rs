// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Fake notification adapter for testing
#![cfg_attr(coverage_nightly, coverage(off))]

use super::{NotifyAdapter, NotifyError, ToastVariant};
use async_trait::async_trait;
use parking_lot::Mutex;
use std::sync::Arc;
use std::time::Duration;

/// Recorded notify call
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum NotifyCall {
    Toast {
        title: String,
        message: String,
        variant: String,
        duration: Duration,
    },
    Notify {
        message: String,
    },
}

/// Fake notification adapter for testing
#[derive(Clone, Default)]
pub struct FakeNotifyAdapter {
    calls: Arc<Mutex<Vec<NotifyCall>>>,
}

impl FakeNotifyAdapter {
    pub fn new() -> Self {
        Self::default()
    }

    /// Get all recorded calls
    pub fn calls(&self) -> Vec<NotifyCall> {
        self.calls.lock().clone()
    }

    /// Titles of recorded toasts, in order.
    pub fn toast_titles(&self) -> Vec<String> {
        self.calls
            .lock()
            .iter()
            .filter_map(|c| match c {
                NotifyCall::Toast { title, .. } => Some(title.clone()),
                NotifyCall::Notify { .. } => None,
            })
            .collect()
    }
}

#[async_trait]
impl NotifyAdapter for FakeNotifyAdapter {
    async fn toast(
        &self,
        title: &str,
        message: &str,
        variant: ToastVariant,
        duration: Duration,
    ) -> Result<(), NotifyError> {
        self.calls.lock().push(NotifyCall::Toast {
            title: title.to_string(),
            message: message.to_string(),
            variant: variant.to_string(),
            duration,
        });
        Ok(())
    }

    async fn notify(&self, message: &str) -> Result<(), NotifyError> {
        self.calls.lock().push(NotifyCall::Notify {
            message: message.to_string(),
        });
        Ok(())
    }
}

#[cfg(test)]
#[path = "fake_tests.rs"]
mod tests;
