// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Wall-clock aligned scheduler
//!
//! Ticks land on boundaries of the local wall clock: a 5 minute period fires
//! at :00, :05, :10 and so on, not 5 minutes after start. A one second
//! heartbeat samples the wall clock and rearms the timer whenever the clock
//! jumps (NTP correction, suspend/resume, manual change).

use crate::clock::SharedClock;
use crate::error::RotateError;
use chrono::{DateTime, FixedOffset};
use crossbeam_channel::{after, bounded, select, tick, Receiver, Sender};
use std::sync::{Arc, Mutex, MutexGuard};
use std::thread::{self, JoinHandle};
use std::time::{Duration, Instant};
use tracing::{debug, warn};

/// Interval between wall-clock samples used for drift detection
pub const HEARTBEAT: Duration = Duration::from_secs(1);

/// A job run on every tick
pub type Job = Arc<dyn Fn() + Send + Sync>;

/// Time until the next local wall-clock boundary of `period`.
///
/// Always strictly positive: when `now` sits exactly on a boundary the
/// following boundary is returned.
pub fn delay_to_boundary(period: Duration, now: &DateTime<FixedOffset>) -> Duration {
    let period_nanos = period.as_nanos() as i128;
    if period_nanos == 0 {
        return Duration::ZERO;
    }
    let offset = i128::from(now.offset().local_minus_utc());
    let local_nanos = (i128::from(now.timestamp()) + offset) * 1_000_000_000
        + i128::from(now.timestamp_subsec_nanos());
    let next = period_nanos - local_nanos.rem_euclid(period_nanos);
    Duration::from_nanos(next as u64)
}

struct State {
    started: bool,
    running: bool,
    jobs: Vec<Job>,
    deadline: Option<Instant>,
    last_sample: i64,
}

impl State {
    /// Record a heartbeat sample (unix seconds).
    ///
    /// Returns true when the elapsed time since the previous sample shows the
    /// wall clock jumped.
    fn observe(&mut self, sample: i64) -> bool {
        let elapsed = sample - self.last_sample;
        self.last_sample = sample;
        !(elapsed == 1 || elapsed == 2)
    }

    /// Delay to the next boundary, recorded as the new deadline
    fn rearm(&mut self, period: Duration, wall: &DateTime<FixedOffset>) -> Duration {
        let delay = delay_to_boundary(period, wall);
        self.deadline = Some(Instant::now() + delay);
        delay
    }
}

struct Shared {
    period: Duration,
    clock: SharedClock,
    state: Mutex<State>,
}

impl Shared {
    fn lock(&self) -> MutexGuard<'_, State> {
        self.state.lock().unwrap_or_else(|e| e.into_inner())
    }

    /// Sample the wall clock; on a jump returns the delay to rearm with
    fn heartbeat(&self) -> Option<Duration> {
        let wall = self.clock.now();
        let mut state = self.lock();
        if !state.observe(wall.timestamp()) || !state.running {
            return None;
        }
        debug!(period = ?self.period, "wall clock jumped, rearming scheduler");
        Some(state.rearm(self.period, &wall))
    }

    /// Rearm for the following boundary and hand out the jobs to run now
    fn boundary(&self) -> Option<(Duration, Vec<Job>)> {
        let wall = self.clock.now();
        let mut state = self.lock();
        if !state.running {
            return None;
        }
        let delay = state.rearm(self.period, &wall);
        Some((delay, state.jobs.clone()))
    }
}

enum Wake {
    Stop,
    Heartbeat,
    Boundary,
}

/// Timer loop: one boundary timer plus the heartbeat, until `stop` disconnects
fn run(shared: Arc<Shared>, stop: Receiver<()>, first: Duration) {
    let heartbeat = tick(HEARTBEAT);
    let mut timer = after(first);

    loop {
        let wake = select! {
            recv(stop) -> _ => Wake::Stop,
            recv(heartbeat) -> _ => Wake::Heartbeat,
            recv(timer) -> _ => Wake::Boundary,
        };
        match wake {
            Wake::Stop => break,
            Wake::Heartbeat => {
                if let Some(delay) = shared.heartbeat() {
                    timer = after(delay);
                }
            }
            Wake::Boundary => {
                // Rearm before dispatch so job runtime never shifts the schedule
                let Some((delay, jobs)) = shared.boundary() else {
                    break;
                };
                timer = after(delay);
                dispatch(jobs);
            }
        }
    }
}

fn dispatch(jobs: Vec<Job>) {
    for job in jobs {
        let spawned = thread::Builder::new()
            .name("logroll-job".to_string())
            .spawn(move || job());
        if let Err(e) = spawned {
            warn!(error = %e, "failed to dispatch scheduled job");
        }
    }
}

/// Fires registered jobs on local wall-clock boundaries of a fixed period.
///
/// A zero period yields an inert scheduler that never ticks.
pub struct Scheduler {
    shared: Arc<Shared>,
    /// Dropping the sender stops the timer thread
    stop: Mutex<Option<Sender<()>>>,
    thread: Mutex<Option<JoinHandle<()>>>,
}

impl Scheduler {
    /// Create a scheduler and arm it immediately
    pub fn new(period: Duration, clock: SharedClock) -> Result<Self, RotateError> {
        let scheduler = Self::unstarted(period, clock);
        scheduler.start()?;
        Ok(scheduler)
    }

    pub(crate) fn unstarted(period: Duration, clock: SharedClock) -> Self {
        let last_sample = clock.now().timestamp();
        Self {
            shared: Arc::new(Shared {
                period,
                clock,
                state: Mutex::new(State {
                    started: false,
                    running: false,
                    jobs: Vec::new(),
                    deadline: None,
                    last_sample,
                }),
            }),
            stop: Mutex::new(None),
            thread: Mutex::new(None),
        }
    }

    /// Arm the timer and start the heartbeat.
    ///
    /// Fails with [`RotateError::AlreadyStarted`] when called twice; a zero
    /// period is accepted and does nothing.
    pub fn start(&self) -> Result<(), RotateError> {
        if self.shared.period.is_zero() {
            return Ok(());
        }

        let mut thread = self.thread.lock().unwrap_or_else(|e| e.into_inner());
        let first = {
            let mut state = self.shared.lock();
            if state.started {
                return Err(RotateError::AlreadyStarted);
            }
            let wall = self.shared.clock.now();
            state.started = true;
            state.running = true;
            state.last_sample = wall.timestamp();
            state.rearm(self.shared.period, &wall)
        };

        let (stop, stopped) = bounded(0);
        let shared = Arc::clone(&self.shared);
        let handle = thread::Builder::new()
            .name("logroll-scheduler".to_string())
            .spawn(move || run(shared, stopped, first))
            .map_err(|source| {
                let mut state = self.shared.lock();
                state.running = false;
                state.deadline = None;
                RotateError::Spawn {
                    name: "scheduler",
                    source,
                }
            })?;
        *thread = Some(handle);
        *self.stop.lock().unwrap_or_else(|e| e.into_inner()) = Some(stop);
        Ok(())
    }

    /// Register a job to run, on its own thread, at every future tick
    pub fn add_job(&self, job: impl Fn() + Send + Sync + 'static) {
        self.shared.lock().jobs.push(Arc::new(job));
    }

    /// Disarm the timer and heartbeat. Safe to call repeatedly.
    ///
    /// Jobs already dispatched keep running to completion.
    pub fn stop(&self) {
        {
            let mut state = self.shared.lock();
            state.running = false;
            state.deadline = None;
        }
        drop(self.stop.lock().unwrap_or_else(|e| e.into_inner()).take());

        let handle = self
            .thread
            .lock()
            .unwrap_or_else(|e| e.into_inner())
            .take();
        if let Some(handle) = handle {
            if handle.thread().id() != thread::current().id() {
                let _ = handle.join();
            }
        }
    }

    pub fn period(&self) -> Duration {
        self.shared.period
    }

    pub fn is_running(&self) -> bool {
        self.shared.lock().running
    }

    /// Time left until the next tick, if armed
    pub fn remaining(&self) -> Option<Duration> {
        self.shared
            .lock()
            .deadline
            .map(|deadline| deadline.saturating_duration_since(Instant::now()))
    }

    /// Feed one heartbeat sample taken from the clock, rearming on drift.
    ///
    /// Returns whether the timer was rearmed.
    #[cfg(test)]
    pub(crate) fn check_time_change(&self) -> bool {
        self.shared.heartbeat().is_some()
    }

    #[cfg(test)]
    fn force_running(&self) {
        let mut state = self.shared.lock();
        state.started = true;
        state.running = true;
    }
}

impl Drop for Scheduler {
    fn drop(&mut self) {
        self.stop();
    }
}

#[cfg(test)]
#[path = "scheduler_tests.rs"]
mod tests;
