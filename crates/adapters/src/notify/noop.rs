// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! No-op notification adapter.
//!
//! Used when no notification sink is configured; both calls succeed
//! without doing anything.

use super::{NotifyAdapter, NotifyError, ToastVariant};
use async_trait::async_trait;
use std::time::Duration;

#[derive(Clone, Copy, Debug, Default)]
pub struct NoOpNotifyAdapter;

impl NoOpNotifyAdapter {
    pub fn new() -> Self {
        Self
    }
}

#[async_trait]
impl NotifyAdapter for NoOpNotifyAdapter {
    async fn toast(
        &self,
        _title: &str,
        _message: &str,
        _variant: ToastVariant,
        _duration: Duration,
    ) -> Result<(), NotifyError> {
        Ok(())
    }

    async fn notify(&self, _message: &str) -> Result<(), NotifyError> {
        Ok(())
    }
}
