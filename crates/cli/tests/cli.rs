// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! CLI integration tests
//!
//! These tests run the `logroll` binary against temporary directories and
//! check the files it leaves behind.

#![allow(clippy::unwrap_used)]
#![allow(clippy::expect_used)]
#![allow(clippy::panic)]
#![allow(deprecated)]

use assert_cmd::Command;
use predicates::prelude::*;
use std::fs;
use std::path::Path;
use std::thread;
use std::time::Duration;
use tempfile::TempDir;

fn logroll() -> Command {
    Command::cargo_bin("logroll").unwrap()
}

/// Rotated files of `svc.log` in `dir`, sorted
fn rotated(dir: &Path) -> Vec<String> {
    let mut names: Vec<_> = fs::read_dir(dir)
        .unwrap()
        .map(|e| e.unwrap().file_name().to_string_lossy().into_owned())
        .filter(|name| name.starts_with("svc.log."))
        .collect();
    names.sort();
    names
}

#[test]
fn stdin_lands_in_rotated_file() {
    let temp = TempDir::new().unwrap();
    let prefix = temp.path().join("svc.log");

    logroll()
        .arg(&prefix)
        .args(["--rule", "1day"])
        .write_stdin("hello\nworld\n")
        .assert()
        .success();

    let files = rotated(temp.path());
    assert_eq!(files.len(), 1);
    assert_eq!(files[0].len(), "svc.log.".len() + 8);
    assert_eq!(
        fs::read_to_string(temp.path().join(&files[0])).unwrap(),
        "hello\nworld\n"
    );
    // The prefix is the symlink to the active file
    assert_eq!(fs::read_to_string(&prefix).unwrap(), "hello\nworld\n");
}

#[cfg(unix)]
#[test]
fn prefix_is_a_relative_symlink() {
    let temp = TempDir::new().unwrap();
    let prefix = temp.path().join("svc.log");

    logroll()
        .arg(&prefix)
        .write_stdin("line\n")
        .assert()
        .success();

    let target = fs::read_link(&prefix).unwrap();
    assert!(target.is_relative());
    assert!(target.to_string_lossy().starts_with("svc.log."));
}

#[test]
fn no_rule_writes_prefix_directly() {
    let temp = TempDir::new().unwrap();
    let prefix = temp.path().join("app.log");

    logroll()
        .arg(&prefix)
        .args(["--rule", "no"])
        .write_stdin("direct\n")
        .assert()
        .success();

    assert!(!fs::symlink_metadata(&prefix).unwrap().file_type().is_symlink());
    assert_eq!(fs::read_to_string(&prefix).unwrap(), "direct\n");
}

#[test]
fn async_queue_delivers_everything() {
    let temp = TempDir::new().unwrap();
    let prefix = temp.path().join("app.log");
    let input = "queued line\n".repeat(500);

    logroll()
        .arg(&prefix)
        .args(["--rule", "no", "--queue-capacity", "4"])
        .write_stdin(input.clone())
        .assert()
        .success();

    assert_eq!(fs::read_to_string(&prefix).unwrap(), input);
}

#[test]
fn config_file_is_honored() {
    let temp = TempDir::new().unwrap();
    let config = temp.path().join("writer.toml");
    fs::write(
        &config,
        format!(
            "prefix = {:?}\nrule = \"no\"\n\n[async]\ncapacity = 16\n",
            temp.path().join("from-config.log").to_string_lossy()
        ),
    )
    .unwrap();

    logroll()
        .arg("--config")
        .arg(&config)
        .write_stdin("configured\n")
        .assert()
        .success();

    assert_eq!(
        fs::read_to_string(temp.path().join("from-config.log")).unwrap(),
        "configured\n"
    );
}

#[test]
fn max_files_removes_old_rotations() {
    let temp = TempDir::new().unwrap();
    for name in ["svc.log.1", "svc.log.2", "svc.log.3"] {
        fs::write(temp.path().join(name), "old\n").unwrap();
        thread::sleep(Duration::from_millis(20));
    }

    logroll()
        .arg(temp.path().join("svc.log"))
        .args(["--rule", "1day", "--max-files", "1"])
        .write_stdin("new\n")
        .assert()
        .success()
        .stderr(predicate::str::contains("removed expired log file"));

    let files = rotated(temp.path());
    assert_eq!(files.len(), 1);
    assert_ne!(files[0], "svc.log.3");
}

#[test]
fn list_rules_prints_periods() {
    logroll()
        .arg("--list-rules")
        .assert()
        .success()
        .stdout(predicate::str::contains("1hour"))
        .stdout(predicate::str::contains("1h"))
        .stdout(predicate::str::contains("5min"))
        .stdout(predicate::str::contains("never"));
}

#[test]
fn unknown_rule_fails() {
    let temp = TempDir::new().unwrap();

    logroll()
        .arg(temp.path().join("svc.log"))
        .args(["--rule", "2hour"])
        .write_stdin("unused\n")
        .assert()
        .failure()
        .stderr(predicate::str::contains("rule \"2hour\" not supported"));

    assert!(rotated(temp.path()).is_empty());
}

#[test]
fn prefix_is_required() {
    logroll()
        .write_stdin("")
        .assert()
        .failure()
        .stderr(predicate::str::contains("PREFIX or --config"));
}

#[cfg(unix)]
#[test]
fn sigterm_flushes_and_exits_cleanly() {
    use std::io::Write;
    use std::process::{Command as StdCommand, Stdio};
    use std::time::Instant;

    let temp = TempDir::new().unwrap();
    let prefix = temp.path().join("app.log");
    let mut child = StdCommand::new(assert_cmd::cargo::cargo_bin("logroll"))
        .arg(&prefix)
        .args(["--rule", "no"])
        .stdin(Stdio::piped())
        .stderr(Stdio::null())
        .spawn()
        .unwrap();

    let mut stdin = child.stdin.take().unwrap();
    stdin.write_all(b"before signal\n").unwrap();
    stdin.flush().unwrap();
    thread::sleep(Duration::from_millis(500));

    let killed = StdCommand::new("kill")
        .args(["-TERM", &child.id().to_string()])
        .status()
        .unwrap();
    assert!(killed.success());

    // stdin stays open: the process must exit on the signal alone
    let deadline = Instant::now() + Duration::from_secs(10);
    let status = loop {
        if let Some(status) = child.try_wait().unwrap() {
            break status;
        }
        if Instant::now() >= deadline {
            let _ = child.kill();
            let _ = child.wait();
            panic!("logroll still running 10s after SIGTERM");
        }
        thread::sleep(Duration::from_millis(20));
    };
    drop(stdin);
    assert!(status.success());
    assert_eq!(fs::read_to_string(&prefix).unwrap(), "before signal\n");
}
