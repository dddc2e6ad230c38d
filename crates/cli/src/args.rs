// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Command line arguments and their merge with the config file

use anyhow::{anyhow, Result};
use clap::Parser;
use logroll_core::{AsyncConfig, WriterConfig};
use std::path::PathBuf;
use std::time::Duration;

#[derive(Parser, Debug)]
#[command(
    name = "logroll",
    version,
    about = "Append stdin to time-rotated log files"
)]
pub struct Cli {
    /// Path prefix of the log files, kept as a symlink to the active file
    pub prefix: Option<PathBuf>,

    /// TOML writer config; flags override its values
    #[arg(long, value_name = "FILE")]
    pub config: Option<PathBuf>,

    /// Rotation rule (see --list-rules)
    #[arg(long, value_name = "NAME")]
    pub rule: Option<String>,

    /// Rotated files to keep (0 keeps everything)
    #[arg(long, value_name = "N")]
    pub max_files: Option<usize>,

    /// Flush buffered output at least this often
    #[arg(long, value_name = "DURATION", value_parser = humantime::parse_duration)]
    pub flush_interval: Option<Duration>,

    /// Reopen the log file if it disappears, checking this often
    #[arg(long, value_name = "DURATION", value_parser = humantime::parse_duration)]
    pub check_interval: Option<Duration>,

    /// Queue up to N writes in front of the file
    #[arg(long, value_name = "N")]
    pub queue_capacity: Option<usize>,

    /// Drop a write when the queue stays full this long
    #[arg(long, value_name = "DURATION", value_parser = humantime::parse_duration)]
    pub write_timeout: Option<Duration>,

    /// Print the available rotation rules and exit
    #[arg(long)]
    pub list_rules: bool,
}

impl Cli {
    /// Writer config from `--config` (if any) with flags applied on top
    pub fn resolve(&self) -> Result<WriterConfig> {
        let mut config = match (&self.config, &self.prefix) {
            (Some(path), _) => WriterConfig::load(path)?,
            (None, Some(prefix)) => WriterConfig::new(prefix.clone()),
            (None, None) => return Err(anyhow!("a PREFIX or --config is required")),
        };

        if let Some(prefix) = &self.prefix {
            config.prefix = prefix.clone();
        }
        if let Some(rule) = &self.rule {
            config.rule = rule.clone();
        }
        if let Some(max_files) = self.max_files {
            config.max_files = max_files;
        }
        if let Some(interval) = self.flush_interval {
            config.flush_interval = interval;
        }
        if let Some(interval) = self.check_interval {
            config.check_interval = interval;
        }
        // Either queue flag turns the asynchronous front end on
        if let Some(capacity) = self.queue_capacity {
            config.async_sink.get_or_insert_with(AsyncConfig::default).capacity = capacity;
        }
        if let Some(timeout) = self.write_timeout {
            config.async_sink.get_or_insert_with(AsyncConfig::default).timeout = timeout;
        }
        Ok(config)
    }
}

#[cfg(test)]
#[path = "args_tests.rs"]
mod tests;
