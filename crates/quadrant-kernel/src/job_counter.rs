//! JobCounter: the completion-counting barrier that ends a turn.
//!
//! The count starts at the number of quadrants. Each forwarded placement adds
//! one before it is sent; each finished local pass and each applied placement
//! subtracts one. Work can be added while the count is draining, so this is
//! not a fixed-target latch: the turn is over only when the count is observed
//! at zero under the lock.

use std::sync::{Mutex, MutexGuard, PoisonError};

use tokio::sync::Notify;
use tracing::trace;

#[derive(Debug, Default)]
struct CounterState {
    count: i64,
    /// Lowest count observed since the last reset
    low_water: i64,
    /// Decrements applied since the last reset
    decrements: u64,
}

/// Shared outstanding-work counter with an async wake-up for the coordinator.
///
/// Owned by the coordinator and handed to workers behind an `Arc`. All reads
/// and writes go through one mutex; every mutation wakes the waiter.
#[derive(Debug, Default)]
pub struct JobCounter {
    state: Mutex<CounterState>,
    changed: Notify,
}

impl JobCounter {
    pub fn new() -> Self {
        Self::default()
    }

    fn lock(&self) -> MutexGuard<'_, CounterState> {
        // A panicking worker is reported through its join handle; the count
        // itself is still a plain integer and stays readable.
        self.state.lock().unwrap_or_else(PoisonError::into_inner)
    }

    fn adjust(&self, delta: i64) -> i64 {
        let count = {
            let mut state = self.lock();
            state.count += delta;
            state.low_water = state.low_water.min(state.count);
            if delta < 0 {
                state.decrements += 1;
            }
            state.count
        };
        trace!(count, delta, "Job count changed");
        self.changed.notify_waiters();
        count
    }

    /// Set the count for a new turn. Called before any worker starts.
    pub fn reset(&self, count: usize) {
        {
            let mut state = self.lock();
            state.count = count as i64;
            state.low_water = state.count;
            state.decrements = 0;
        }
        trace!(count, "Job count reset");
        self.changed.notify_waiters();
    }

    /// Register one more unit of outstanding work. Returns the new count.
    pub fn increment(&self) -> i64 {
        self.adjust(1)
    }

    /// Retire one unit of work. Returns the new count.
    pub fn decrement(&self) -> i64 {
        self.adjust(-1)
    }

    /// Current count.
    pub fn value(&self) -> i64 {
        self.lock().count
    }

    /// Lowest count seen since the last reset.
    pub fn low_water_mark(&self) -> i64 {
        self.lock().low_water
    }

    /// Decrements applied since the last reset.
    pub fn decrements_since_reset(&self) -> u64 {
        self.lock().decrements
    }

    /// Wait until no work is outstanding and return the final count.
    ///
    /// The waiter is registered before the count is checked, so a mutation
    /// landing between the check and the wait still wakes us. A negative
    /// return value means the accounting is broken; the caller decides how
    /// to fail.
    pub async fn await_zero(&self) -> i64 {
        loop {
            let notified = self.changed.notified();
            tokio::pin!(notified);
            notified.as_mut().enable();

            let count = self.value();
            if count <= 0 {
                return count;
            }
            notified.await;
        }
    }
}
