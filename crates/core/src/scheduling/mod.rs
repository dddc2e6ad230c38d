// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Scheduling primitives for time-driven execution
//!
//! This module provides:
//! - **Scheduler**: fires jobs on local wall-clock boundaries, with drift detection
//! - **Producer**: recomputes and caches a value on every tick, notifying listeners

mod producer;
mod scheduler;

pub use producer::{Listener, Producer};
pub use scheduler::{delay_to_boundary, Job, Scheduler, HEARTBEAT};
