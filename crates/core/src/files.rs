// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Filesystem bookkeeping for rotated files
//!
//! Every operation here tolerates other processes racing on the same paths:
//! "already exists" and "already gone" count as success.

use crate::error::RotateError;
use crate::rotation::RotationInfo;
use chrono::Local;
use std::fs::{self, Metadata};
use std::io;
use std::path::{Component, Path, PathBuf};
use std::sync::LazyLock;
use std::time::{SystemTime, UNIX_EPOCH};
use tracing::{debug, info, trace};

/// Environment variable enabling verbose symlink logging when set to `debug`
pub const DEBUG_ENV: &str = "LOGROLL_WRITER_DEBUG";

static DEBUG: LazyLock<bool> =
    LazyLock::new(|| std::env::var(DEBUG_ENV).is_ok_and(|value| value == "debug"));

fn symlink_event(action: &str, link: &Path, target: &Path) {
    if *DEBUG {
        info!(link = %link.display(), target = %target.display(), "{}", action);
    } else {
        trace!(link = %link.display(), target = %target.display(), "{}", action);
    }
}

/// Identity of a file on disk, used to notice files replaced behind our back.
///
/// Unix compares device and inode. Elsewhere the path plus creation time is
/// used, which cannot tell a file from a same-named copy created in the same
/// instant.
#[cfg(unix)]
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FileIdentity {
    dev: u64,
    ino: u64,
}

#[cfg(unix)]
impl FileIdentity {
    pub fn from_metadata(_path: &Path, meta: &Metadata) -> Self {
        use std::os::unix::fs::MetadataExt;
        Self {
            dev: meta.dev(),
            ino: meta.ino(),
        }
    }
}

#[cfg(not(unix))]
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FileIdentity {
    path: PathBuf,
    created: Option<SystemTime>,
}

#[cfg(not(unix))]
impl FileIdentity {
    pub fn from_metadata(path: &Path, meta: &Metadata) -> Self {
        Self {
            path: path.canonicalize().unwrap_or_else(|_| path.to_path_buf()),
            created: meta.created().ok(),
        }
    }
}

impl FileIdentity {
    /// Identity of whatever `path` resolves to now
    pub fn of(path: &Path) -> io::Result<Self> {
        let meta = fs::metadata(path)?;
        Ok(Self::from_metadata(path, &meta))
    }
}

/// Whether both paths resolve to the same file
pub fn same_file(a: &Path, b: &Path) -> bool {
    match (FileIdentity::of(a), FileIdentity::of(b)) {
        (Ok(a), Ok(b)) => a == b,
        _ => false,
    }
}

/// Directory holding `path`, with `.` for bare file names
pub fn parent_dir(path: &Path) -> &Path {
    match path.parent() {
        Some(parent) if !parent.as_os_str().is_empty() => parent,
        _ => Path::new("."),
    }
}

fn unix_nanos() -> u128 {
    SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .map(|d| d.as_nanos())
        .unwrap_or_default()
}

fn with_suffix(path: &Path, suffix: &str) -> PathBuf {
    let mut name = path.as_os_str().to_owned();
    name.push(suffix);
    PathBuf::from(name)
}

/// Make sure `dir` exists as a directory.
///
/// A non-directory occupying the path is renamed to `<dir>_not_dir_<nanos>`
/// first, so no data is lost.
pub fn ensure_dir(dir: &Path) -> Result<(), RotateError> {
    match fs::metadata(dir) {
        Ok(meta) if meta.is_dir() => return Ok(()),
        Ok(_) => {
            let aside = with_suffix(dir, &format!("_not_dir_{}", unix_nanos()));
            match fs::rename(dir, &aside) {
                Ok(()) => info!(from = %dir.display(), to = %aside.display(), "moved file out of the way of log directory"),
                Err(e) if e.kind() == io::ErrorKind::NotFound => {}
                Err(e) => return Err(RotateError::io("rename", dir, e)),
            }
        }
        Err(_) => {}
    }

    match fs::create_dir_all(dir) {
        Ok(()) => Ok(()),
        Err(e) if e.kind() == io::ErrorKind::AlreadyExists => Ok(()),
        Err(e) => Err(RotateError::io("create dir", dir, e)),
    }
}

fn normalized(path: &Path) -> Vec<Component<'_>> {
    path.components()
        .filter(|c| !matches!(c, Component::CurDir))
        .collect()
}

/// Path of `target` relative to `base_dir`, when it can be derived lexically.
///
/// Both paths must be of the same kind (absolute or relative), and the part of
/// `base_dir` not shared with `target` must not climb with `..`.
pub fn relative_path(base_dir: &Path, target: &Path) -> Option<PathBuf> {
    if base_dir.is_absolute() != target.is_absolute() {
        return None;
    }
    let base = normalized(base_dir);
    let target = normalized(target);

    let common = base
        .iter()
        .zip(target.iter())
        .take_while(|(a, b)| a == b)
        .count();
    if base[common..]
        .iter()
        .any(|c| !matches!(c, Component::Normal(_)))
    {
        return None;
    }

    let mut relative = PathBuf::new();
    for _ in common..base.len() {
        relative.push("..");
    }
    for component in &target[common..] {
        relative.push(component.as_os_str());
    }
    if relative.as_os_str().is_empty() {
        return None;
    }
    Some(relative)
}

#[cfg(unix)]
fn create_symlink(target: &Path, link: &Path) -> io::Result<()> {
    std::os::unix::fs::symlink(target, link)
}

#[cfg(windows)]
fn create_symlink(target: &Path, link: &Path) -> io::Result<()> {
    std::os::windows::fs::symlink_file(target, link)
}

#[cfg(not(any(unix, windows)))]
fn create_symlink(_target: &Path, _link: &Path) -> io::Result<()> {
    Err(io::Error::new(
        io::ErrorKind::Unsupported,
        "symlinks are not supported on this platform",
    ))
}

/// Point `info.symlink` at `info.file_path`.
///
/// - a symlink already resolving to the file is left alone
/// - a symlink pointing elsewhere (or dangling) is replaced
/// - any other entry is renamed to `<symlink>.old.<YYYYmmddHHMMSS>`
///
/// The link target is relative to the link's directory when derivable.
pub fn update_symlink(info: &RotationInfo) -> Result<(), RotateError> {
    let Some(link) = info.symlink.as_deref().filter(|_| info.needs_symlink()) else {
        return Ok(());
    };
    let file = info.file_path.as_path();

    if let Err(e) = fs::metadata(file) {
        return Err(RotateError::io("stat", file, e));
    }

    let link_dir = parent_dir(link);
    match fs::create_dir_all(link_dir) {
        Ok(()) => {}
        Err(e) if e.kind() == io::ErrorKind::AlreadyExists => {}
        Err(e) => return Err(RotateError::io("create dir", link_dir, e)),
    }

    match fs::symlink_metadata(link) {
        Ok(meta) if meta.file_type().is_symlink() => {
            if same_file(link, file) {
                return Ok(());
            }
            symlink_event("remove symlink", link, file);
            match fs::remove_file(link) {
                Ok(()) => {}
                Err(e) if e.kind() == io::ErrorKind::NotFound => {}
                Err(e) => return Err(RotateError::io("remove symlink", link, e)),
            }
        }
        Ok(_) => {
            let stamp = Local::now().format("%Y%m%d%H%M%S");
            let aside = with_suffix(link, &format!(".old.{}", stamp));
            match fs::rename(link, &aside) {
                Ok(()) => info!(from = %link.display(), to = %aside.display(), "moved file out of the way of symlink"),
                Err(e) if e.kind() == io::ErrorKind::NotFound => {}
                Err(e) => return Err(RotateError::io("rename", link, e)),
            }
        }
        Err(e) if e.kind() == io::ErrorKind::NotFound => {}
        Err(e) => return Err(RotateError::io("stat", link, e)),
    }

    let target = relative_path(link_dir, file).unwrap_or_else(|| file.to_path_buf());
    symlink_event("create symlink", link, &target);
    link_to(&target, link)
}

/// Create `link`, tolerating a link created concurrently by another writer
fn link_to(target: &Path, link: &Path) -> Result<(), RotateError> {
    match create_symlink(target, link) {
        Ok(()) => Ok(()),
        Err(e) if e.kind() == io::ErrorKind::AlreadyExists => {
            debug!(link = %link.display(), "symlink appeared concurrently, keeping it");
            Ok(())
        }
        Err(e) => Err(RotateError::io("symlink", link, e)),
    }
}

#[cfg(test)]
#[path = "files_tests.rs"]
mod tests;
