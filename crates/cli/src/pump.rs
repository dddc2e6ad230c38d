// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Copies input lines into a sink until EOF or shutdown
//!
//! Reading happens on a plain thread: a blocking read on stdin cannot be
//! cancelled, so it must never sit on the runtime. On shutdown the reader
//! thread is abandoned and ends with the process.

use logroll_core::error::is_write_timeout;
use logroll_core::Sink;
use std::future::Future;
use std::io::{self, BufRead};
use std::thread;
use tokio::sync::mpsc;
use tracing::{debug, info, warn};

/// Lines read ahead of the sink
const READ_AHEAD: usize = 64;

pub type Lines = mpsc::Receiver<io::Result<Vec<u8>>>;

/// Read `input` line by line on a dedicated thread.
///
/// A trailing line without a newline is delivered at EOF. A read error is
/// delivered once and ends the stream.
pub fn spawn_reader<R>(mut input: R) -> io::Result<Lines>
where
    R: BufRead + Send + 'static,
{
    let (tx, rx) = mpsc::channel(READ_AHEAD);
    thread::Builder::new()
        .name("logroll-stdin".to_string())
        .spawn(move || loop {
            let mut line = Vec::new();
            let sent = match input.read_until(b'\n', &mut line) {
                Ok(0) => break, // EOF
                Ok(_) => tx.blocking_send(Ok(line)),
                Err(e) if e.kind() == io::ErrorKind::Interrupted => continue,
                Err(e) => {
                    let _ = tx.blocking_send(Err(e));
                    break;
                }
            };
            if sent.is_err() {
                debug!("line receiver gone, reader stopping");
                break;
            }
        })?;
    Ok(rx)
}

/// Forward `lines` into `sink`.
///
/// Stops at EOF or when `shutdown` resolves; lines already read at shutdown
/// are still written. Lines dropped by a write timeout are logged and
/// skipped. Returns the number of bytes accepted by the sink.
pub async fn pump<F>(mut lines: Lines, sink: &mut dyn Sink, shutdown: F) -> io::Result<u64>
where
    F: Future<Output = ()>,
{
    let mut total = 0u64;
    tokio::pin!(shutdown);

    loop {
        tokio::select! {
            line = lines.recv() => match line {
                Some(line) => total += forward(sink, &line?)?,
                None => return Ok(total),
            },
            _ = &mut shutdown => {
                info!("shutdown requested");
                break;
            }
        }
    }

    while let Ok(line) = lines.try_recv() {
        total += forward(sink, &line?)?;
    }
    Ok(total)
}

fn forward(sink: &mut dyn Sink, line: &[u8]) -> io::Result<u64> {
    match sink.write_all(line) {
        Ok(()) => Ok(line.len() as u64),
        Err(e) if is_write_timeout(&e) => {
            warn!(bytes = line.len(), "queue full, dropped line");
            Ok(0)
        }
        Err(e) => Err(e),
    }
}

#[cfg(test)]
#[path = "pump_tests.rs"]
mod tests;
