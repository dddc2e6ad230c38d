// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Retention scanning for rotated files
//!
//! Rotated files are `<prefix>.<digits>`. Anything else sharing the prefix
//! (`service.log.wf.2020072217`, `service.log.old.1`, directories) is ignored.

use crate::error::RotateError;
use crate::files::parent_dir;
use regex::Regex;
use std::fs::{self, Metadata};
use std::io;
use std::path::{Path, PathBuf};
use std::sync::LazyLock;
use std::time::SystemTime;
use tracing::warn;

// A single dot followed by digits only
#[allow(clippy::expect_used)]
static ROTATED_SUFFIX: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"^\.\d+$").expect("constant regex pattern is valid"));

/// Whether `name` is `prefix` followed by a single `.` and decimal digits
pub fn is_rotated_name(prefix: &str, name: &str) -> bool {
    match name.strip_prefix(prefix) {
        Some(suffix) => ROTATED_SUFFIX.is_match(suffix),
        None => false,
    }
}

/// Creation time where the platform records it, modification time otherwise
fn created_at(meta: &Metadata) -> SystemTime {
    meta.created()
        .or_else(|_| meta.modified())
        .unwrap_or(SystemTime::UNIX_EPOCH)
}

/// Rotated files of `prefix` beyond the newest `keep`, oldest first.
///
/// Returns nothing when at most `keep` entries share the prefix. Entries that
/// vanish or cannot be inspected while scanning are skipped.
pub fn find_expired(prefix: &Path, keep: usize) -> Result<Vec<PathBuf>, RotateError> {
    let Some(base) = prefix.file_name().and_then(|name| name.to_str()) else {
        return Ok(Vec::new());
    };
    let dir = parent_dir(prefix);
    let wanted = format!("{}.", base);

    let entries = match fs::read_dir(dir) {
        Ok(entries) => entries,
        Err(e) if e.kind() == io::ErrorKind::NotFound => return Ok(Vec::new()),
        Err(e) => return Err(RotateError::io("read dir", dir, e)),
    };

    let mut matches = Vec::new();
    for entry in entries {
        let entry = entry.map_err(|e| RotateError::io("read dir", dir, e))?;
        let name = entry.file_name();
        let Some(name) = name.to_str() else {
            continue;
        };
        if name.starts_with(&wanted) {
            matches.push((name.to_string(), entry.path()));
        }
    }
    if matches.len() <= keep {
        return Ok(Vec::new());
    }

    let mut rotated = Vec::with_capacity(matches.len());
    for (name, path) in matches {
        let meta = match fs::metadata(&path) {
            Ok(meta) => meta,
            Err(e) if e.kind() == io::ErrorKind::NotFound => continue,
            Err(e) => {
                warn!(path = %path.display(), error = %e, "cannot stat rotated file candidate");
                continue;
            }
        };
        if meta.is_dir() || !is_rotated_name(base, &name) {
            continue;
        }
        rotated.push((created_at(&meta), name, path));
    }

    // Name breaks ties between files created within the timestamp granularity
    rotated.sort_by(|a, b| a.0.cmp(&b.0).then_with(|| a.1.cmp(&b.1)));

    let expired = rotated.len().saturating_sub(keep);
    Ok(rotated
        .into_iter()
        .take(expired)
        .map(|(_, _, path)| path)
        .collect())
}

#[cfg(test)]
#[path = "retention_tests.rs"]
mod tests;
