// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Periodic value producer
//!
//! Recomputes a value on every scheduler tick, caches it, and notifies
//! listeners with the fresh value.

use super::scheduler::Scheduler;
use crate::clock::SharedClock;
use crate::error::RotateError;
use std::sync::{Arc, Mutex, MutexGuard, Weak};
use std::time::Duration;

/// Receives every newly produced value
pub trait Listener<T>: Send + Sync {
    fn on_value(&self, value: &T);
}

impl<T, F> Listener<T> for F
where
    F: Fn(&T) + Send + Sync,
{
    fn on_value(&self, value: &T) {
        self(value)
    }
}

type Generator<T> = Box<dyn Fn() -> T + Send + Sync>;

struct Cache<T> {
    latest: T,
    listeners: Vec<Arc<dyn Listener<T>>>,
}

struct Inner<T> {
    generate: Generator<T>,
    cache: Mutex<Cache<T>>,
    scheduler: Scheduler,
}

impl<T: Clone + Send + Sync + 'static> Inner<T> {
    fn lock(&self) -> MutexGuard<'_, Cache<T>> {
        self.cache.lock().unwrap_or_else(|e| e.into_inner())
    }

    fn produce(&self) -> T {
        let value = (self.generate)();
        self.lock().latest = value.clone();
        value
    }

    fn fire(&self, value: &T) {
        let listeners = self.lock().listeners.clone();
        for listener in listeners {
            listener.on_value(value);
        }
    }
}

/// Produces a new value on every tick of a wall-clock aligned scheduler.
///
/// The initial value is computed during construction, so [`Producer::get`]
/// is valid immediately. Cloning yields another handle to the same producer.
pub struct Producer<T> {
    inner: Arc<Inner<T>>,
}

impl<T> Clone for Producer<T> {
    fn clone(&self) -> Self {
        Self {
            inner: Arc::clone(&self.inner),
        }
    }
}

impl<T: Clone + Send + Sync + 'static> Producer<T> {
    pub fn new(
        period: Duration,
        clock: SharedClock,
        generate: impl Fn() -> T + Send + Sync + 'static,
    ) -> Result<Self, RotateError> {
        let latest = generate();
        let inner = Arc::new(Inner {
            generate: Box::new(generate),
            cache: Mutex::new(Cache {
                latest,
                listeners: Vec::new(),
            }),
            scheduler: Scheduler::unstarted(period, clock),
        });

        // Weak so the scheduler's job list does not keep the producer alive
        let weak: Weak<Inner<T>> = Arc::downgrade(&inner);
        inner.scheduler.add_job(move || {
            if let Some(inner) = weak.upgrade() {
                let value = inner.produce();
                inner.fire(&value);
            }
        });
        inner.scheduler.start()?;

        Ok(Self { inner })
    }

    /// Most recently produced value
    pub fn get(&self) -> T {
        self.inner.lock().latest.clone()
    }

    /// Subscribe to future values; listeners run in registration order
    pub fn register(&self, listener: impl Listener<T> + 'static) {
        self.inner.lock().listeners.push(Arc::new(listener));
    }

    /// Halt production; the cached value stays readable
    pub fn stop(&self) {
        self.inner.scheduler.stop();
    }

    pub fn period(&self) -> Duration {
        self.inner.scheduler.period()
    }

    /// Recompute the value now and notify listeners, as a tick would
    pub fn refresh(&self) -> T {
        let value = self.inner.produce();
        self.inner.fire(&value);
        value
    }
}

#[cfg(test)]
#[path = "producer_tests.rs"]
mod tests;
