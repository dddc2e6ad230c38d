// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Time-based rotation naming
//!
//! A [`RotationRule`] turns local wall-clock time into a file suffix; a
//! [`RotationProducer`] recomputes the [`RotationInfo`] on every boundary of the
//! rule's period and notifies its listeners.

mod info;
mod producer;
mod rule;



pub use info::RotationInfo;
pub use producer::RotationProducer;
pub use rule::{RotationRule, RuleRegistry, SuffixFn};
