// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Writers persisting byte streams to rotated files
//!
//! ```text
//! bytes → [AsyncSink] → RotatingWriter → BufWriter<File> → disk
//!                              ↑
//!               RotationProducer (new file name per interval)
//! ```
//!
//! Both writers implement [`Sink`], so they stack on each other or stand in
//! for a plain file.

mod async_sink;
mod options;
mod rotating;
mod sink;

pub use async_sink::AsyncSink;
pub use options::{CleanupDelay, RotateOptions};
pub use rotating::RotatingWriter;
pub use sink::Sink;
