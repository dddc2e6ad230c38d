// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

// Allow panic!/unwrap/expect in test code
#![cfg_attr(test, allow(clippy::panic))]
#![cfg_attr(test, allow(clippy::unwrap_used))]
#![cfg_attr(test, allow(clippy::expect_used))]

//! logroll-core: time-based log file rotation
//!
//! This crate provides:
//! - A wall-clock aligned scheduler and a periodic value producer
//! - Rotation rules naming files per interval (`1hour`, `1day`, `5min`, ...)
//! - A rotating writer with symlink upkeep and retention of old files
//! - A bounded asynchronous sink to decouple callers from disk I/O

pub mod clock;
pub mod config;
pub mod error;
pub mod files;
pub mod retention;
pub mod rotation;
pub mod scheduling;
pub mod writer;

pub use clock::{Clock, FakeClock, SharedClock, SystemClock};
pub use config::{AsyncConfig, WriterConfig};
pub use error::RotateError;
pub use rotation::{RotationInfo, RotationProducer, RotationRule, RuleRegistry};
pub use scheduling::{Listener, Producer, Scheduler};
pub use writer::{AsyncSink, CleanupDelay, RotateOptions, RotatingWriter, Sink};
