// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Bounded asynchronous front end for any [`Sink`]
//!
//! Writes copy the bytes into a bounded queue drained by one worker thread,
//! so callers never wait on disk I/O unless the queue is full.

use super::sink::Sink;
use crate::error::{closed_pipe, write_timeout, RotateError};
use crossbeam_channel::{bounded, Receiver, SendTimeoutError, Sender};
use std::io::{self, Write};
use std::sync::{Mutex, RwLock};
use std::thread::{self, JoinHandle};
use std::time::Duration;
use tracing::debug;

/// Queues writes for a background worker that forwards them to a sink.
///
/// With a zero `timeout`, a write blocks while the queue is full. Otherwise
/// it gives up after `timeout` with [`write_timeout`](crate::error::write_timeout)
/// and the bytes are dropped.
///
/// Closing drains everything already queued into the sink before closing it.
pub struct AsyncSink<S: Sink + 'static> {
    /// Writers share the read side; close takes the write side to drop the sender
    sender: RwLock<Option<Sender<Vec<u8>>>>,
    worker: Mutex<Option<JoinHandle<S>>>,
    timeout: Duration,
}

impl<S: Sink + 'static> AsyncSink<S> {
    pub fn new(capacity: usize, timeout: Duration, sink: S) -> Result<Self, RotateError> {
        let (sender, receiver) = bounded(capacity);
        let worker = thread::Builder::new()
            .name("logroll-async".to_string())
            .spawn(move || drain(receiver, sink))
            .map_err(|source| RotateError::Spawn {
                name: "async writer",
                source,
            })?;
        Ok(Self {
            sender: RwLock::new(Some(sender)),
            worker: Mutex::new(Some(worker)),
            timeout,
        })
    }

    /// Queue a copy of `buf`, reporting the full length on success
    pub fn write(&self, buf: &[u8]) -> io::Result<usize> {
        // Held across the send so close cannot slip in between check and enqueue
        let sender = self.sender.read().unwrap_or_else(|e| e.into_inner());
        let Some(sender) = sender.as_ref() else {
            return Err(closed_pipe());
        };

        let item = buf.to_vec();
        if self.timeout.is_zero() {
            sender.send(item).map_err(|_| closed_pipe())?;
        } else {
            match sender.send_timeout(item, self.timeout) {
                Ok(()) => {}
                Err(SendTimeoutError::Timeout(_)) => return Err(write_timeout()),
                Err(SendTimeoutError::Disconnected(_)) => return Err(closed_pipe()),
            }
        }
        Ok(buf.len())
    }

    /// Stop accepting writes, drain the queue, then close the sink.
    ///
    /// Closing again is a no-op.
    pub fn close(&self) -> io::Result<()> {
        let taken = self
            .sender
            .write()
            .unwrap_or_else(|e| e.into_inner())
            .take();
        let Some(sender) = taken else {
            return Ok(());
        };
        drop(sender);

        let worker = self.worker.lock().unwrap_or_else(|e| e.into_inner()).take();
        let Some(worker) = worker else {
            return Ok(());
        };
        match worker.join() {
            Ok(mut sink) => sink.close(),
            Err(_) => Err(io::Error::other("async writer thread panicked")),
        }
    }
}

fn drain<S: Sink>(receiver: Receiver<Vec<u8>>, mut sink: S) -> S {
    for item in receiver.iter() {
        // Nobody is left to report to; the caller already got its Ok
        if let Err(e) = sink.write_all(&item) {
            debug!(error = %e, bytes = item.len(), "async write dropped");
        }
    }
    sink
}

impl<S: Sink + 'static> Write for AsyncSink<S> {
    fn write(&mut self, buf: &[u8]) -> io::Result<usize> {
        AsyncSink::write(self, buf)
    }

    /// Queued data reaches the sink asynchronously; only close waits for it
    fn flush(&mut self) -> io::Result<()> {
        Ok(())
    }
}

impl<S: Sink + 'static> Write for &AsyncSink<S> {
    fn write(&mut self, buf: &[u8]) -> io::Result<usize> {
        AsyncSink::write(self, buf)
    }

    fn flush(&mut self) -> io::Result<()> {
        Ok(())
    }
}

impl<S: Sink + 'static> Sink for AsyncSink<S> {
    fn close(&mut self) -> io::Result<()> {
        AsyncSink::close(self)
    }
}

impl<S: Sink + 'static> Drop for AsyncSink<S> {
    fn drop(&mut self) {
        if let Err(e) = AsyncSink::close(self) {
            debug!(error = %e, "failed to close async writer on drop");
        }
    }
}

#[cfg(test)]
#[path = "async_sink_tests.rs"]
mod tests;
