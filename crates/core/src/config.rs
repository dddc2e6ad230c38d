// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! TOML configuration for a rotating log writer
//!
//! ```toml
//! prefix = "logs/service.log"
//! rule = "1hour"
//! flush_interval = "1s"
//! check_interval = "10s"
//! max_files = 48
//!
//! [async]
//! capacity = 1024
//! timeout = "100ms"
//! ```

use crate::clock::{SharedClock, SystemClock};
use crate::error::RotateError;
use crate::rotation::{RotationProducer, RuleRegistry};
use crate::writer::{AsyncSink, RotateOptions, RotatingWriter, Sink};
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use std::time::Duration;

const DEFAULT_RULE: &str = "1hour";
const DEFAULT_CAPACITY: usize = 1024;

fn default_rule() -> String {
    DEFAULT_RULE.to_string()
}

fn default_capacity() -> usize {
    DEFAULT_CAPACITY
}

/// Settings for the optional asynchronous front end
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct AsyncConfig {
    #[serde(default = "default_capacity")]
    pub capacity: usize,
    /// Zero blocks writers while the queue is full
    #[serde(default, with = "humantime_serde")]
    pub timeout: Duration,
}

impl Default for AsyncConfig {
    fn default() -> Self {
        Self {
            capacity: DEFAULT_CAPACITY,
            timeout: Duration::ZERO,
        }
    }
}

/// Everything needed to build a writer for one log stream
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct WriterConfig {
    /// Path prefix of rotated files, also the symlink to the active one
    pub prefix: PathBuf,
    #[serde(default = "default_rule")]
    pub rule: String,
    #[serde(default, with = "humantime_serde")]
    pub flush_interval: Duration,
    #[serde(default, with = "humantime_serde")]
    pub check_interval: Duration,
    /// Rotated files to keep; zero keeps everything
    #[serde(default)]
    pub max_files: usize,
    #[serde(default, rename = "async", skip_serializing_if = "Option::is_none")]
    pub async_sink: Option<AsyncConfig>,
}

impl WriterConfig {
    pub fn new(prefix: impl Into<PathBuf>) -> Self {
        Self {
            prefix: prefix.into(),
            rule: default_rule(),
            flush_interval: Duration::ZERO,
            check_interval: Duration::ZERO,
            max_files: 0,
            async_sink: None,
        }
    }

    pub fn from_toml_str(text: &str) -> Result<Self, RotateError> {
        Ok(toml::from_str(text)?)
    }

    pub fn load(path: &Path) -> Result<Self, RotateError> {
        let text =
            std::fs::read_to_string(path).map_err(|e| RotateError::io("read config", path, e))?;
        Self::from_toml_str(&text)
    }

    /// Check values that parse but cannot work
    pub fn validate(&self, registry: &RuleRegistry) -> Result<(), RotateError> {
        if self.prefix.as_os_str().is_empty() {
            return Err(RotateError::PrefixRequired);
        }
        if registry.get(&self.rule).is_none() {
            return Err(RotateError::RuleNotSupported(self.rule.clone()));
        }
        if let Some(async_sink) = &self.async_sink {
            if async_sink.capacity == 0 {
                return Err(RotateError::InvalidConfig(
                    "async capacity must be at least 1".to_string(),
                ));
            }
        }
        Ok(())
    }

    /// Rotating writer options for this config, producer included
    pub fn rotate_options(
        &self,
        registry: &RuleRegistry,
        clock: SharedClock,
    ) -> Result<RotateOptions, RotateError> {
        self.validate(registry)?;
        let producer = RotationProducer::from_rule(registry, &self.rule, &self.prefix, clock)?;
        Ok(RotateOptions::new(producer)
            .with_flush_interval(self.flush_interval)
            .with_check_interval(self.check_interval)
            .with_max_files(self.max_files))
    }

    /// Build the writer on the system clock
    pub fn build(&self, registry: &RuleRegistry) -> Result<Box<dyn Sink>, RotateError> {
        self.build_with_clock(registry, SystemClock::shared())
    }

    pub fn build_with_clock(
        &self,
        registry: &RuleRegistry,
        clock: SharedClock,
    ) -> Result<Box<dyn Sink>, RotateError> {
        let writer = RotatingWriter::new(self.rotate_options(registry, clock)?)?;
        match &self.async_sink {
            Some(async_sink) => Ok(Box::new(AsyncSink::new(
                async_sink.capacity,
                async_sink.timeout,
                writer,
            )?)),
            None => Ok(Box::new(writer)),
        }
    }
}

#[cfg(test)]
#[path = "config_tests.rs"]
mod tests;
