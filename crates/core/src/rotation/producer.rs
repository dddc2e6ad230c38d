// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

use super::info::RotationInfo;
use super::rule::RuleRegistry;
use crate::clock::SharedClock;
use crate::error::RotateError;
use crate::scheduling::{Listener, Producer};
use std::path::Path;
use std::time::Duration;

/// Emits the current [`RotationInfo`] and a fresh one on every interval boundary
#[derive(Clone)]
pub struct RotationProducer {
    inner: Producer<RotationInfo>,
}

impl RotationProducer {
    pub fn new(
        period: Duration,
        clock: SharedClock,
        info: impl Fn() -> RotationInfo + Send + Sync + 'static,
    ) -> Result<Self, RotateError> {
        Ok(Self {
            inner: Producer::new(period, clock, info)?,
        })
    }

    /// Producer for `prefix` rotated by the named rule from `registry`.
    ///
    /// Files are named `prefix + suffix` and `prefix` itself becomes the
    /// symlink to the active file.
    pub fn from_rule(
        registry: &RuleRegistry,
        rule: &str,
        prefix: impl AsRef<Path>,
        clock: SharedClock,
    ) -> Result<Self, RotateError> {
        let prefix = prefix.as_ref().to_path_buf();
        if prefix.as_os_str().is_empty() {
            return Err(RotateError::PrefixRequired);
        }
        let rule = registry
            .get(rule)
            .cloned()
            .ok_or_else(|| RotateError::RuleNotSupported(rule.to_string()))?;

        let period = rule.period();
        let now = clock.clone();
        Self::new(period, clock, move || {
            RotationInfo::with_suffix(&prefix, &rule.suffix(&now.now()))
        })
    }

    pub fn get(&self) -> RotationInfo {
        self.inner.get()
    }

    pub fn register(&self, listener: impl Listener<RotationInfo> + 'static) {
        self.inner.register(listener);
    }

    /// Recompute the info now and notify listeners
    pub fn refresh(&self) -> RotationInfo {
        self.inner.refresh()
    }

    pub fn stop(&self) {
        self.inner.stop();
    }

    pub fn period(&self) -> Duration {
        self.inner.period()
    }
}

#[cfg(test)]
#[path = "producer_tests.rs"]
mod tests;
