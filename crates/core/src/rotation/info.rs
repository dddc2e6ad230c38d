// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

use std::path::{Path, PathBuf};

/// Where bytes go for the current rotation interval
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct RotationInfo {
    /// Name before any suffix is applied, e.g. `logs/service.log`
    pub raw_name: PathBuf,
    /// Stable alias pointing at `file_path`, e.g. `logs/service.log`
    pub symlink: Option<PathBuf>,
    /// File receiving writes, e.g. `logs/service.log.2020072215`
    pub file_path: PathBuf,
}

impl RotationInfo {
    /// Info for `prefix` with `suffix` appended verbatim, symlinked at `prefix`
    pub fn with_suffix(prefix: &Path, suffix: &str) -> Self {
        let mut file_path = prefix.as_os_str().to_owned();
        file_path.push(suffix);
        Self {
            raw_name: prefix.to_path_buf(),
            symlink: Some(prefix.to_path_buf()),
            file_path: PathBuf::from(file_path),
        }
    }

    pub fn needs_symlink(&self) -> bool {
        match &self.symlink {
            Some(symlink) => !symlink.as_os_str().is_empty() && *symlink != self.file_path,
            None => false,
        }
    }
}
