// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Named rotation rules
//!
//! Built-in suffixes are a single `.` followed by decimal digits. Retention
//! relies on that shape to recognise rotated files, so custom rules should
//! keep it (`.20200722` rather than `.abc.12345`).

use crate::error::RotateError;
use chrono::{DateTime, FixedOffset, Timelike};
use std::collections::BTreeMap;
use std::fmt;
use std::sync::Arc;
use std::time::Duration;

/// Computes the file suffix for the interval containing the given local time
pub type SuffixFn = Arc<dyn Fn(&DateTime<FixedOffset>) -> String + Send + Sync>;

/// A rotation period paired with the suffix naming each interval
#[derive(Clone)]
pub struct RotationRule {
    period: Duration,
    suffix: SuffixFn,
}

impl RotationRule {
    pub fn new(
        period: Duration,
        suffix: impl Fn(&DateTime<FixedOffset>) -> String + Send + Sync + 'static,
    ) -> Self {
        Self {
            period,
            suffix: Arc::new(suffix),
        }
    }

    pub fn period(&self) -> Duration {
        self.period
    }

    pub fn suffix(&self, now: &DateTime<FixedOffset>) -> String {
        (self.suffix)(now)
    }
}

impl fmt::Debug for RotationRule {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("RotationRule")
            .field("period", &self.period)
            .finish_non_exhaustive()
    }
}

fn hourly(now: &DateTime<FixedOffset>) -> String {
    format!(".{}", now.format("%Y%m%d%H"))
}

fn daily(now: &DateTime<FixedOffset>) -> String {
    format!(".{}", now.format("%Y%m%d"))
}

/// Rule with minute-granular suffixes truncated to `step` minutes
fn every_minutes(step: u32) -> RotationRule {
    RotationRule::new(Duration::from_secs(u64::from(step) * 60), move |now| {
        format!(
            ".{}{:02}",
            now.format("%Y%m%d%H"),
            now.minute() / step * step
        )
    })
}

/// Registry of rotation rules by name
///
/// Each producer factory receives its registry explicitly, so registrations in
/// one place never leak into another.
#[derive(Clone, Debug)]
pub struct RuleRegistry {
    rules: BTreeMap<String, RotationRule>,
}

impl RuleRegistry {
    /// A registry without any rules
    pub fn empty() -> Self {
        Self {
            rules: BTreeMap::new(),
        }
    }

    /// A registry holding the built-in rules:
    ///
    /// | name    | period | suffix example  |
    /// |---------|--------|-----------------|
    /// | `1hour` | 1h     | `.2020072217`   |
    /// | `1day`  | 24h    | `.20200722`     |
    /// | `no`    | none   | (no suffix)     |
    /// | `1min`  | 1m     | `.202007221734` |
    /// | `5min`  | 5m     | `.202007221730` |
    /// | `10min` | 10m    | `.202007221730` |
    /// | `15min` | 15m    | `.202007221730` |
    /// | `30min` | 30m    | `.202007221730` |
    pub fn with_builtins() -> Self {
        let mut rules = BTreeMap::new();
        rules.insert(
            "1hour".to_string(),
            RotationRule::new(Duration::from_secs(3600), hourly),
        );
        rules.insert(
            "1day".to_string(),
            RotationRule::new(Duration::from_secs(86_400), daily),
        );
        rules.insert(
            "no".to_string(),
            RotationRule::new(Duration::ZERO, |_| String::new()),
        );
        for step in [1, 5, 10, 15, 30] {
            rules.insert(format!("{}min", step), every_minutes(step));
        }
        Self { rules }
    }

    /// Add a rule; names are never overwritten
    pub fn register(
        &mut self,
        name: impl Into<String>,
        rule: RotationRule,
    ) -> Result<(), RotateError> {
        let name = name.into();
        if self.rules.contains_key(&name) {
            return Err(RotateError::RuleExists(name));
        }
        self.rules.insert(name, rule);
        Ok(())
    }

    pub fn get(&self, name: &str) -> Option<&RotationRule> {
        self.rules.get(name)
    }

    /// Rules sorted by name
    pub fn iter(&self) -> impl Iterator<Item = (&str, &RotationRule)> {
        self.rules.iter().map(|(name, rule)| (name.as_str(), rule))
    }
}

impl Default for RuleRegistry {
    fn default() -> Self {
        Self::with_builtins()
    }
}
