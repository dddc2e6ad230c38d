// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Writer that follows a [`RotationProducer`] from file to file
//!
//! Writes land in a buffered handle on the producer's current file. On every
//! rotation the next file is opened before the previous one is flushed and
//! closed, so a failed open leaves the old file in use. Optional background
//! work:
//!
//! - flush: forces out buffered data that sat unflushed for too long
//! - check: reopens the file when it was deleted or replaced externally
//! - retention: after each rotation, deletes rotated files beyond `max_files`

use super::options::{CleanupDelay, RotateOptions};
use super::sink::Sink;
use crate::error::{closed_pipe, RotateError};
use crate::files::{ensure_dir, parent_dir, update_symlink, FileIdentity};
use crate::retention::find_expired;
use crate::rotation::{RotationInfo, RotationProducer};
use std::fs::{self, File, OpenOptions};
use std::io::{self, BufWriter, Write};
use std::path::{Path, PathBuf};
use crossbeam_channel::{bounded, select, tick, Receiver, RecvTimeoutError, Sender};
use std::sync::{Arc, Mutex, MutexGuard, Weak};
use std::thread::{self, JoinHandle};
use std::time::{Duration, Instant};
use tracing::{debug, info, warn};

/// The open file and its bookkeeping, guarded by one lock
#[derive(Default)]
struct Output {
    writer: Option<BufWriter<File>>,
    identity: Option<FileIdentity>,
    path: Option<PathBuf>,
    last_flush: Option<Instant>,
    closed: bool,
}

/// Close signal that background threads can sleep on.
///
/// Nothing is ever sent: dropping the sender disconnects every receiver.
struct Shutdown {
    trigger: Mutex<Option<Sender<()>>>,
    closed: Receiver<()>,
}

impl Default for Shutdown {
    fn default() -> Self {
        let (trigger, closed) = bounded(0);
        Self {
            trigger: Mutex::new(Some(trigger)),
            closed,
        }
    }
}

impl Shutdown {
    fn signal(&self) {
        drop(self.trigger.lock().unwrap_or_else(|e| e.into_inner()).take());
    }

    /// Sleep for `timeout` unless shut down first. Returns whether shut down.
    fn wait(&self, timeout: Duration) -> bool {
        !matches!(self.closed.recv_timeout(timeout), Err(RecvTimeoutError::Timeout))
    }

    fn receiver(&self) -> Receiver<()> {
        self.closed.clone()
    }
}

type CloseHook = Box<dyn FnOnce() + Send>;

struct Inner {
    producer: RotationProducer,
    flush_interval: Duration,
    check_interval: Duration,
    max_files: usize,
    cleanup_delay: CleanupDelay,
    output: Mutex<Output>,
    shutdown: Shutdown,
    on_close: Mutex<Vec<CloseHook>>,
}

impl Inner {
    fn lock(&self) -> MutexGuard<'_, Output> {
        self.output.lock().unwrap_or_else(|e| e.into_inner())
    }

    fn add_close_hook(&self, hook: impl FnOnce() + Send + 'static) {
        self.on_close
            .lock()
            .unwrap_or_else(|e| e.into_inner())
            .push(Box::new(hook));
    }

    /// Make sure the open handle refers to `info.file_path` as it exists on
    /// disk now, then refresh the symlink.
    fn check_opened(&self, info: &RotationInfo) -> Result<(), RotateError> {
        let mut output = self.lock();
        if output.closed {
            return Ok(());
        }

        let path = info.file_path.as_path();
        let current = output.writer.is_some()
            && output.path.as_deref() == Some(path)
            && output.identity.is_some()
            && FileIdentity::of(path).ok() == output.identity;

        if !current {
            let (file, identity) = open_append(path)?;
            if let Some(previous) = output.writer.take() {
                retire(previous, output.path.as_deref());
            }
            info!(path = %path.display(), "opened log file");
            output.writer = Some(BufWriter::new(file));
            output.identity = Some(identity);
            output.path = Some(path.to_path_buf());
            output.last_flush = Some(Instant::now());
        }

        update_symlink(info)
    }

    fn write(&self, buf: &[u8]) -> io::Result<usize> {
        let mut output = self.lock();
        let Some(writer) = output.writer.as_mut() else {
            return Err(closed_pipe());
        };
        let written = writer.write(buf)?;
        let flushed = writer.buffer().is_empty();
        if flushed {
            output.last_flush = Some(Instant::now());
        }
        Ok(written)
    }

    fn flush(&self) -> io::Result<()> {
        let mut output = self.lock();
        let Some(writer) = output.writer.as_mut() else {
            return Ok(());
        };
        writer.flush()?;
        output.last_flush = Some(Instant::now());
        Ok(())
    }

    /// Flush when nothing was flushed for a full interval
    fn flush_if_stale(&self) {
        let stale = self
            .lock()
            .last_flush
            .is_none_or(|at| at.elapsed() >= self.flush_interval);
        if stale {
            if let Err(e) = self.flush() {
                warn!(error = %e, "periodic flush failed");
            }
        }
    }

    fn verify_open(&self) {
        if let Err(e) = self.check_opened(&self.producer.get()) {
            warn!(error = %e, "log file check failed");
        }
    }

    /// Delete rotated files beyond `max_files`
    fn clean(&self) {
        let prefix = self.producer.get().raw_name;
        let expired = match find_expired(&prefix, self.max_files) {
            Ok(expired) => expired,
            Err(e) => {
                warn!(prefix = %prefix.display(), error = %e, "retention scan failed");
                return;
            }
        };
        for path in expired {
            match fs::remove_file(&path) {
                Ok(()) => info!(path = %path.display(), "removed expired log file"),
                Err(e) if e.kind() == io::ErrorKind::NotFound => {}
                Err(e) => warn!(path = %path.display(), error = %e, "failed to remove expired log file"),
            }
        }
    }

    fn close(&self) -> io::Result<()> {
        self.shutdown.signal();
        let hooks = std::mem::take(&mut *self.on_close.lock().unwrap_or_else(|e| e.into_inner()));
        for hook in hooks {
            hook();
        }

        let mut output = self.lock();
        output.closed = true;
        output.identity = None;
        let path = output.path.take();
        let Some(writer) = output.writer.take() else {
            return Ok(());
        };
        drop(output);

        writer.into_inner().map_err(|e| e.into_error())?;
        debug!(path = ?path, "closed log file");
        Ok(())
    }
}

fn open_append(path: &Path) -> Result<(File, FileIdentity), RotateError> {
    ensure_dir(parent_dir(path))?;
    let file = OpenOptions::new()
        .create(true)
        .append(true)
        .open(path)
        .map_err(|e| RotateError::io("open", path, e))?;
    let meta = file
        .metadata()
        .map_err(|e| RotateError::io("stat", path, e))?;
    let identity = FileIdentity::from_metadata(path, &meta);
    Ok((file, identity))
}

/// Flush and close a handle that is no longer current
fn retire(writer: BufWriter<File>, path: Option<&Path>) {
    if let Err(e) = writer.into_inner() {
        warn!(path = ?path, error = %e.error(), "failed to flush previous log file");
    }
}

fn spawn_ticker(
    inner: &Arc<Inner>,
    name: &'static str,
    interval: Duration,
    on_tick: fn(&Inner),
) -> Result<JoinHandle<()>, RotateError> {
    let inner = Arc::clone(inner);
    let closed = inner.shutdown.receiver();
    let ticker = tick(interval);
    thread::Builder::new()
        .name(format!("logroll-{}", name))
        .spawn(move || loop {
            select! {
                recv(closed) -> _ => break,
                recv(ticker) -> _ => on_tick(&inner),
            }
        })
        .map_err(|source| RotateError::Spawn { name, source })
}

fn join_on_close(inner: &Inner, handle: JoinHandle<()>) {
    inner.add_close_hook(move || {
        let _ = handle.join();
    });
}

/// Appends to the file named by a [`RotationProducer`], switching files on
/// every rotation.
///
/// Writes are serialized by an internal lock, so `&RotatingWriter` is a
/// writer too and the value can be shared across threads. Dropping the
/// writer closes it.
pub struct RotatingWriter {
    inner: Arc<Inner>,
}

impl RotatingWriter {
    /// Open the producer's current file and start background work.
    ///
    /// On failure everything started so far is shut down again.
    pub fn new(options: RotateOptions) -> Result<Self, RotateError> {
        options.check()?;
        let RotateOptions {
            producer,
            flush_interval,
            check_interval,
            max_files,
            cleanup_delay,
        } = options;
        let producer = producer.ok_or(RotateError::MissingProducer)?;

        let writer = Self {
            inner: Arc::new(Inner {
                producer,
                flush_interval,
                check_interval,
                max_files,
                cleanup_delay,
                output: Mutex::new(Output::default()),
                shutdown: Shutdown::default(),
                on_close: Mutex::new(Vec::new()),
            }),
        };
        if let Err(e) = writer.start() {
            let _ = writer.inner.close();
            return Err(e);
        }
        Ok(writer)
    }

    fn start(&self) -> Result<(), RotateError> {
        let inner = &self.inner;
        inner.check_opened(&inner.producer.get())?;

        let weak: Weak<Inner> = Arc::downgrade(inner);
        inner.producer.register(move |info: &RotationInfo| {
            let Some(inner) = weak.upgrade() else {
                return;
            };
            if let Err(e) = inner.check_opened(info) {
                warn!(path = %info.file_path.display(), error = %e, "failed to rotate log file");
            }
        });
        let producer = inner.producer.clone();
        inner.add_close_hook(move || producer.stop());

        if inner.max_files > 0 {
            let weak: Weak<Inner> = Arc::downgrade(inner);
            inner.producer.register(move |_: &RotationInfo| {
                let Some(inner) = weak.upgrade() else {
                    return;
                };
                if !inner.shutdown.wait(inner.cleanup_delay.sample()) {
                    inner.clean();
                }
            });
            inner.clean();
        }

        if !inner.flush_interval.is_zero() {
            let handle = spawn_ticker(inner, "flush", inner.flush_interval, Inner::flush_if_stale)?;
            join_on_close(inner, handle);
        }
        if !inner.check_interval.is_zero() {
            let handle = spawn_ticker(inner, "check", inner.check_interval, Inner::verify_open)?;
            join_on_close(inner, handle);
        }
        Ok(())
    }

    /// Path of the file currently receiving writes
    pub fn current_path(&self) -> Option<PathBuf> {
        self.inner.lock().path.clone()
    }

    pub fn producer(&self) -> &RotationProducer {
        &self.inner.producer
    }

    /// Write buffered data through to the current file
    pub fn flush(&self) -> io::Result<()> {
        self.inner.flush()
    }

    /// Stop background work, flush, and close the file.
    ///
    /// Later writes fail with a broken pipe; closing again is a no-op.
    pub fn close(&self) -> io::Result<()> {
        self.inner.close()
    }
}

impl Write for RotatingWriter {
    fn write(&mut self, buf: &[u8]) -> io::Result<usize> {
        self.inner.write(buf)
    }

    fn flush(&mut self) -> io::Result<()> {
        self.inner.flush()
    }
}

impl Write for &RotatingWriter {
    fn write(&mut self, buf: &[u8]) -> io::Result<usize> {
        self.inner.write(buf)
    }

    fn flush(&mut self) -> io::Result<()> {
        self.inner.flush()
    }
}

impl Sink for RotatingWriter {
    fn close(&mut self) -> io::Result<()> {
        self.inner.close()
    }
}

impl Drop for RotatingWriter {
    fn drop(&mut self) {
        if let Err(e) = self.inner.close() {
            warn!(error = %e, "failed to close log file on drop");
        }
    }
}

#[cfg(test)]
#[path = "rotating_tests.rs"]
mod tests;
