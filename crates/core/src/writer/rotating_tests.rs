// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

use super::*;
use crate::clock::FakeClock;
use crate::error::is_closed;
use crate::rotation::RuleRegistry;
use chrono::DateTime;
use tempfile::TempDir;

fn clock_at(rfc3339: &str) -> FakeClock {
    FakeClock::at(DateTime::parse_from_rfc3339(rfc3339).unwrap())
}

fn minute_producer(dir: &Path, clock: &FakeClock) -> RotationProducer {
    RotationProducer::from_rule(
        &RuleRegistry::with_builtins(),
        "1min",
        dir.join("svc.log"),
        clock.shared(),
    )
    .unwrap()
}

fn fixed_producer(path: PathBuf) -> RotationProducer {
    RotationProducer::new(Duration::ZERO, FakeClock::new().shared(), move || {
        RotationInfo {
            raw_name: path.clone(),
            symlink: None,
            file_path: path.clone(),
        }
    })
    .unwrap()
}

/// Poll until `cond` holds or two seconds pass
fn eventually(mut cond: impl FnMut() -> bool) -> bool {
    let deadline = Instant::now() + Duration::from_secs(2);
    while Instant::now() < deadline {
        if cond() {
            return true;
        }
        thread::sleep(Duration::from_millis(10));
    }
    cond()
}

#[test]
fn writes_land_in_current_file() {
    let tmp = TempDir::new().unwrap();
    let clock = clock_at("2020-07-22T17:05:10+08:00");
    let mut writer = RotatingWriter::new(RotateOptions::new(minute_producer(tmp.path(), &clock))).unwrap();

    writer.write_all(b"hello\n").unwrap();
    writer.flush().unwrap();

    let file = tmp.path().join("svc.log.202007221705");
    assert_eq!(fs::read(&file).unwrap(), b"hello\n");
    assert_eq!(writer.current_path(), Some(file));
    writer.close().unwrap();
}

#[cfg(unix)]
#[test]
fn symlink_follows_rotation() {
    let tmp = TempDir::new().unwrap();
    let clock = clock_at("2020-07-22T17:05:10+08:00");
    let writer = RotatingWriter::new(RotateOptions::new(minute_producer(tmp.path(), &clock))).unwrap();
    let link = tmp.path().join("svc.log");
    assert_eq!(fs::read_link(&link).unwrap(), PathBuf::from("svc.log.202007221705"));

    clock.advance(Duration::from_secs(50));
    writer.producer().refresh();

    assert_eq!(fs::read_link(&link).unwrap(), PathBuf::from("svc.log.202007221706"));
    writer.close().unwrap();
}

#[test]
fn rotation_switches_files() {
    let tmp = TempDir::new().unwrap();
    let clock = clock_at("2020-07-22T17:05:10+08:00");
    let writer = RotatingWriter::new(RotateOptions::new(minute_producer(tmp.path(), &clock))).unwrap();

    (&writer).write_all(b"first\n").unwrap();
    clock.advance(Duration::from_secs(50));
    writer.producer().refresh();
    (&writer).write_all(b"second\n").unwrap();
    writer.close().unwrap();

    assert_eq!(
        fs::read(tmp.path().join("svc.log.202007221705")).unwrap(),
        b"first\n"
    );
    assert_eq!(
        fs::read(tmp.path().join("svc.log.202007221706")).unwrap(),
        b"second\n"
    );
}

#[test]
fn same_interval_keeps_handle() {
    let tmp = TempDir::new().unwrap();
    let clock = clock_at("2020-07-22T17:05:10+08:00");
    let writer = RotatingWriter::new(RotateOptions::new(minute_producer(tmp.path(), &clock))).unwrap();
    (&writer).write_all(b"buffered").unwrap();

    // Refresh within the same minute must not reopen (which would flush)
    clock.advance(Duration::from_secs(5));
    writer.producer().refresh();

    assert_eq!(
        fs::read(tmp.path().join("svc.log.202007221705")).unwrap(),
        b""
    );
    writer.close().unwrap();
    assert_eq!(
        fs::read(tmp.path().join("svc.log.202007221705")).unwrap(),
        b"buffered"
    );
}

#[test]
fn close_is_idempotent_and_rejects_writes() {
    let tmp = TempDir::new().unwrap();
    let clock = clock_at("2020-07-22T17:05:10+08:00");
    let writer = RotatingWriter::new(RotateOptions::new(minute_producer(tmp.path(), &clock))).unwrap();
    (&writer).write_all(b"kept").unwrap();

    writer.close().unwrap();
    writer.close().unwrap();

    let err = (&writer).write(b"lost").unwrap_err();
    assert!(is_closed(&err));
    assert_eq!(
        fs::read(tmp.path().join("svc.log.202007221705")).unwrap(),
        b"kept"
    );
    assert_eq!(writer.current_path(), None);
}

#[test]
fn rotation_after_close_does_not_reopen() {
    let tmp = TempDir::new().unwrap();
    let clock = clock_at("2020-07-22T17:05:10+08:00");
    let writer = RotatingWriter::new(RotateOptions::new(minute_producer(tmp.path(), &clock))).unwrap();
    writer.close().unwrap();

    clock.advance(Duration::from_secs(50));
    writer.producer().refresh();

    assert!(!tmp.path().join("svc.log.202007221706").exists());
}

#[test]
fn drop_flushes_buffered_data() {
    let tmp = TempDir::new().unwrap();
    let path = tmp.path().join("plain.log");
    {
        let mut writer = RotatingWriter::new(RotateOptions::new(fixed_producer(path.clone()))).unwrap();
        writer.write_all(b"on drop").unwrap();
    }
    assert_eq!(fs::read(&path).unwrap(), b"on drop");
}

#[test]
fn appends_to_existing_file() {
    let tmp = TempDir::new().unwrap();
    let path = tmp.path().join("plain.log");
    fs::write(&path, b"before\n").unwrap();

    let writer = RotatingWriter::new(RotateOptions::new(fixed_producer(path.clone()))).unwrap();
    (&writer).write_all(b"after\n").unwrap();
    writer.close().unwrap();

    assert_eq!(fs::read(&path).unwrap(), b"before\nafter\n");
}

#[test]
fn no_rule_writes_prefix_without_symlink() {
    let tmp = TempDir::new().unwrap();
    let producer = RotationProducer::from_rule(
        &RuleRegistry::with_builtins(),
        "no",
        tmp.path().join("app.log"),
        FakeClock::new().shared(),
    )
    .unwrap();
    let writer = RotatingWriter::new(RotateOptions::new(producer)).unwrap();
    (&writer).write_all(b"direct").unwrap();
    writer.close().unwrap();

    let path = tmp.path().join("app.log");
    assert!(!fs::symlink_metadata(&path).unwrap().file_type().is_symlink());
    assert_eq!(fs::read(&path).unwrap(), b"direct");
}

#[test]
fn creates_missing_directories() {
    let tmp = TempDir::new().unwrap();
    let path = tmp.path().join("nested/deeper/app.log");
    let writer = RotatingWriter::new(RotateOptions::new(fixed_producer(path.clone()))).unwrap();
    writer.close().unwrap();
    assert!(path.is_file());
}

#[test]
fn missing_producer_is_rejected() {
    let err = RotatingWriter::new(RotateOptions::default()).err().unwrap();
    assert!(matches!(err, RotateError::MissingProducer));
}

#[test]
fn empty_file_path_is_rejected() {
    let err = RotatingWriter::new(RotateOptions::new(fixed_producer(PathBuf::new())))
        .err()
        .unwrap();
    assert!(matches!(err, RotateError::EmptyFilePath));
}

#[test]
fn unopenable_file_fails_construction() {
    let tmp = TempDir::new().unwrap();
    // A directory cannot be opened for appending
    let err = RotatingWriter::new(RotateOptions::new(fixed_producer(tmp.path().to_path_buf())))
        .err()
        .unwrap();
    assert!(matches!(err, RotateError::Io { op: "open", .. }));
}

#[test]
fn check_reopens_deleted_file() {
    let tmp = TempDir::new().unwrap();
    let path = tmp.path().join("plain.log");
    let writer = RotatingWriter::new(RotateOptions::new(fixed_producer(path.clone()))).unwrap();
    (&writer).write_all(b"gone").unwrap();
    writer.flush().unwrap();

    fs::remove_file(&path).unwrap();
    writer.inner.verify_open();
    (&writer).write_all(b"back").unwrap();
    writer.close().unwrap();

    assert_eq!(fs::read(&path).unwrap(), b"back");
}

#[test]
fn check_ticker_recreates_deleted_file() {
    let tmp = TempDir::new().unwrap();
    let path = tmp.path().join("plain.log");
    let options = RotateOptions::new(fixed_producer(path.clone()))
        .with_check_interval(Duration::from_millis(20));
    let writer = RotatingWriter::new(options).unwrap();

    fs::remove_file(&path).unwrap();

    assert!(eventually(|| path.exists()));
    writer.close().unwrap();
}

#[test]
fn flush_ticker_writes_out_buffer() {
    let tmp = TempDir::new().unwrap();
    let path = tmp.path().join("plain.log");
    let options = RotateOptions::new(fixed_producer(path.clone()))
        .with_flush_interval(Duration::from_millis(20));
    let writer = RotatingWriter::new(options).unwrap();

    (&writer).write_all(b"eventually visible").unwrap();

    assert!(eventually(|| fs::read(&path).unwrap() == b"eventually visible"));
    writer.close().unwrap();
}

#[test]
fn concurrent_writers_keep_lines_whole() {
    let tmp = TempDir::new().unwrap();
    let path = tmp.path().join("plain.log");
    let writer = RotatingWriter::new(RotateOptions::new(fixed_producer(path.clone()))).unwrap();

    thread::scope(|scope| {
        for id in 0..4 {
            let writer = &writer;
            scope.spawn(move || {
                for n in 0..100 {
                    let mut handle = writer;
                    handle
                        .write_all(format!("writer-{}-line-{}\n", id, n).as_bytes())
                        .unwrap();
                }
            });
        }
    });
    writer.close().unwrap();

    let content = fs::read_to_string(&path).unwrap();
    let lines: Vec<_> = content.lines().collect();
    assert_eq!(lines.len(), 400);
    assert!(lines.iter().all(|l| l.starts_with("writer-") && l.contains("-line-")));
}

mod retention {
    use super::*;

    fn rotated_files(dir: &Path) -> Vec<String> {
        let mut names: Vec<_> = fs::read_dir(dir)
            .unwrap()
            .map(|e| e.unwrap().file_name().to_string_lossy().into_owned())
            .filter(|name| name.starts_with("svc.log."))
            .collect();
        names.sort();
        names
    }

    #[test]
    fn startup_removes_stale_files() {
        let tmp = TempDir::new().unwrap();
        for name in ["svc.log.202007221600", "svc.log.202007221601"] {
            fs::write(tmp.path().join(name), b"old").unwrap();
            thread::sleep(Duration::from_millis(20));
        }
        let clock = clock_at("2020-07-22T17:05:10+08:00");
        let options = RotateOptions::new(minute_producer(tmp.path(), &clock))
            .with_max_files(2)
            .with_cleanup_delay(CleanupDelay::Fixed(Duration::ZERO));

        let writer = RotatingWriter::new(options).unwrap();

        assert_eq!(
            rotated_files(tmp.path()),
            vec!["svc.log.202007221601", "svc.log.202007221705"]
        );
        writer.close().unwrap();
    }

    #[test]
    fn rotation_triggers_cleanup() {
        let tmp = TempDir::new().unwrap();
        let clock = clock_at("2020-07-22T17:05:10+08:00");
        let options = RotateOptions::new(minute_producer(tmp.path(), &clock))
            .with_max_files(1)
            .with_cleanup_delay(CleanupDelay::Fixed(Duration::ZERO));
        let writer = RotatingWriter::new(options).unwrap();
        thread::sleep(Duration::from_millis(20));

        clock.advance(Duration::from_secs(50));
        writer.producer().refresh();

        assert_eq!(rotated_files(tmp.path()), vec!["svc.log.202007221706"]);
        writer.close().unwrap();
    }

    #[test]
    fn other_streams_survive() {
        let tmp = TempDir::new().unwrap();
        fs::write(tmp.path().join("svc.log.wf.202007221600"), b"warn").unwrap();
        fs::write(tmp.path().join("svc.log.old.20200722160000"), b"aside").unwrap();
        thread::sleep(Duration::from_millis(20));
        let clock = clock_at("2020-07-22T17:05:10+08:00");
        let options = RotateOptions::new(minute_producer(tmp.path(), &clock))
            .with_max_files(1)
            .with_cleanup_delay(CleanupDelay::Fixed(Duration::ZERO));

        let writer = RotatingWriter::new(options).unwrap();

        assert_eq!(
            rotated_files(tmp.path()),
            vec![
                "svc.log.202007221705",
                "svc.log.old.20200722160000",
                "svc.log.wf.202007221600"
            ]
        );
        writer.close().unwrap();
    }

    #[test]
    fn close_interrupts_pending_cleanup() {
        let tmp = TempDir::new().unwrap();
        let clock = clock_at("2020-07-22T17:05:10+08:00");
        let options = RotateOptions::new(minute_producer(tmp.path(), &clock))
            .with_max_files(1)
            .with_cleanup_delay(CleanupDelay::Fixed(Duration::from_secs(60)));
        let writer = Arc::new(RotatingWriter::new(options).unwrap());

        clock.advance(Duration::from_secs(50));
        let rotating = Arc::clone(&writer);
        let refresh = thread::spawn(move || {
            rotating.producer().refresh();
        });
        thread::sleep(Duration::from_millis(50));

        let started = Instant::now();
        writer.close().unwrap();
        refresh.join().unwrap();

        assert!(started.elapsed() < Duration::from_secs(10));
        // Cleanup was abandoned, both files remain
        assert_eq!(
            rotated_files(tmp.path()),
            vec!["svc.log.202007221705", "svc.log.202007221706"]
        );
    }
}

#[test]
fn jitter_stays_in_range() {
    let delay = CleanupDelay::default();
    for _ in 0..100 {
        let sample = delay.sample();
        assert!(sample >= Duration::from_secs(5) && sample < Duration::from_secs(65));
    }
    assert_eq!(
        CleanupDelay::Fixed(Duration::from_secs(3)).sample(),
        Duration::from_secs(3)
    );
}

#[test]
fn shutdown_wakes_all_sleepers_at_once() {
    let shutdown = Arc::new(Shutdown::default());
    assert!(!shutdown.wait(Duration::from_millis(20)));

    let sleepers: Vec<_> = (0..3)
        .map(|_| {
            let shutdown = Arc::clone(&shutdown);
            thread::spawn(move || shutdown.wait(Duration::from_secs(30)))
        })
        .collect();
    thread::sleep(Duration::from_millis(50));

    let started = Instant::now();
    shutdown.signal();
    shutdown.signal();
    for sleeper in sleepers {
        assert!(sleeper.join().unwrap());
    }
    assert!(started.elapsed() < Duration::from_secs(5));
    assert!(shutdown.wait(Duration::from_secs(30)));
}
