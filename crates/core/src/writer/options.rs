// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

use crate::error::RotateError;
use crate::rotation::RotationProducer;
use rand::Rng;
use std::time::Duration;

/// How long retention waits after a rotation before deleting files.
///
/// The default jitter spreads cleanup of many processes on one host over a
/// minute instead of having them all hit the disk at the boundary.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CleanupDelay {
    /// Uniformly random delay in `min..max`
    Jitter { min: Duration, max: Duration },
    Fixed(Duration),
}

impl CleanupDelay {
    pub fn sample(&self) -> Duration {
        match *self {
            CleanupDelay::Jitter { min, max } if min < max => rand::rng().random_range(min..max),
            CleanupDelay::Jitter { min, .. } => min,
            CleanupDelay::Fixed(delay) => delay,
        }
    }
}

impl Default for CleanupDelay {
    fn default() -> Self {
        CleanupDelay::Jitter {
            min: Duration::from_secs(5),
            max: Duration::from_secs(65),
        }
    }
}

/// Options for [`RotatingWriter`](super::RotatingWriter)
#[derive(Clone, Default)]
pub struct RotateOptions {
    /// Decides which file receives writes; required
    pub producer: Option<RotationProducer>,
    /// Force a flush when nothing was flushed for this long (zero disables)
    pub flush_interval: Duration,
    /// Re-check that the open file still exists at this interval (zero disables)
    pub check_interval: Duration,
    /// Rotated files to keep (zero disables cleanup)
    pub max_files: usize,
    pub cleanup_delay: CleanupDelay,
}

impl RotateOptions {
    pub fn new(producer: RotationProducer) -> Self {
        Self {
            producer: Some(producer),
            ..Self::default()
        }
    }

    pub fn with_flush_interval(mut self, interval: Duration) -> Self {
        self.flush_interval = interval;
        self
    }

    pub fn with_check_interval(mut self, interval: Duration) -> Self {
        self.check_interval = interval;
        self
    }

    pub fn with_max_files(mut self, max_files: usize) -> Self {
        self.max_files = max_files;
        self
    }

    pub fn with_cleanup_delay(mut self, delay: CleanupDelay) -> Self {
        self.cleanup_delay = delay;
        self
    }

    /// Validate that a producer is present and names a file
    pub fn check(&self) -> Result<(), RotateError> {
        let producer = self.producer.as_ref().ok_or(RotateError::MissingProducer)?;
        if producer.get().file_path.as_os_str().is_empty() {
            return Err(RotateError::EmptyFilePath);
        }
        Ok(())
    }
}
