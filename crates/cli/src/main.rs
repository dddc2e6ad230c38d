// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! logroll - append stdin to time-rotated log files

// Allow panic!/unwrap/expect in test code
#![cfg_attr(test, allow(clippy::panic))]
#![cfg_attr(test, allow(clippy::unwrap_used))]
#![cfg_attr(test, allow(clippy::expect_used))]

mod args;
mod pump;

use anyhow::{Context, Result};
use clap::Parser;
use logroll_core::RuleRegistry;
use std::future::Future;
use std::io::BufReader;
use tracing::info;

use crate::args::Cli;

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();
    let _log_guard = setup_logging();
    let registry = RuleRegistry::with_builtins();

    if cli.list_rules {
        print_rules(&registry);
        return Ok(());
    }

    let config = cli.resolve()?;
    let shutdown = shutdown_signal().context("failed to install signal handlers")?;
    let mut sink = config
        .build(&registry)
        .with_context(|| format!("failed to open log {}", config.prefix.display()))?;
    info!(prefix = %config.prefix.display(), rule = %config.rule, "writing stdin to log");

    let lines = pump::spawn_reader(BufReader::new(std::io::stdin()))
        .context("failed to start stdin reader")?;
    let pumped = pump::pump(lines, sink.as_mut(), shutdown).await;
    // Close even when forwarding failed so queued data still lands
    let closed = sink.close();
    let bytes = pumped.context("failed to write log")?;
    closed.context("failed to close log")?;

    info!(bytes, "input finished");
    Ok(())
}

fn print_rules(registry: &RuleRegistry) {
    for (name, rule) in registry.iter() {
        let period = if rule.period().is_zero() {
            "never".to_string()
        } else {
            humantime::format_duration(rule.period()).to_string()
        };
        println!("{:<6} {}", name, period);
    }
}

/// Diagnostics go to stderr so stdout stays free for command output
fn setup_logging() -> tracing_appender::non_blocking::WorkerGuard {
    use tracing_subscriber::{fmt, prelude::*, EnvFilter};

    let (non_blocking, guard) = tracing_appender::non_blocking(std::io::stderr());
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));

    tracing_subscriber::registry()
        .with(filter)
        .with(fmt::layer().with_writer(non_blocking))
        .init();

    guard
}

#[cfg(unix)]
fn shutdown_signal() -> std::io::Result<impl Future<Output = ()>> {
    use tokio::signal::unix::{signal, SignalKind};

    let mut sigterm = signal(SignalKind::terminate())?;
    let mut sigint = signal(SignalKind::interrupt())?;
    Ok(async move {
        tokio::select! {
            _ = sigterm.recv() => {}
            _ = sigint.recv() => {}
        }
    })
}

#[cfg(not(unix))]
fn shutdown_signal() -> std::io::Result<impl Future<Output = ()>> {
    Ok(async {
        let _ = tokio::signal::ctrl_c().await;
    })
}
