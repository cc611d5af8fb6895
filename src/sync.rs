// Copyright 2025 Au-Zone Technologies Inc.
// SPDX-License-Identifier: Apache-2.0

//! Condition primitives shared by the driver workers.
//!
//! [`EventGroup`] is a bitset guarded by a mutex with a condition variable,
//! waited on with an optional timeout. [`CountingSemaphore`] collects exit
//! acknowledgements from workers during teardown.

use parking_lot::{Condvar, Mutex};
use std::sync::atomic::{AtomicU64, Ordering};
use std::time::{Duration, Instant};

// Task lifecycle group
pub const TASKS_RUNNING: u32 = 1 << 0;
pub const HINT_ASSERTED: u32 = 1 << 1;
pub const RESET_OCCURRED: u32 = 1 << 2;
pub const DATA_AVAILABLE: u32 = 1 << 3;
pub const HOST_RESET_DONE: u32 = 1 << 4;

/// A set of condition bits that threads can set, clear and wait on.
#[derive(Debug, Default)]
pub struct EventGroup {
    bits: Mutex<u32>,
    cond: Condvar,
}

impl EventGroup {
    pub fn new() -> Self {
        Self::default()
    }

    /// Set `bits` and wake every waiter. Returns the resulting value.
    pub fn set_bits(&self, bits: u32) -> u32 {
        let mut guard = self.bits.lock();
        *guard |= bits;
        self.cond.notify_all();
        *guard
    }

    /// Clear `bits`. Returns the value before clearing.
    pub fn clear_bits(&self, bits: u32) -> u32 {
        let mut guard = self.bits.lock();
        let prev = *guard;
        *guard &= !bits;
        prev
    }

    pub fn get_bits(&self) -> u32 {
        *self.bits.lock()
    }

    /// Block until any bit in `mask` is set or `timeout` expires.
    ///
    /// `None` waits forever. Returns the group value observed when the wait
    /// ended, so callers test `result & mask` to tell success from timeout.
    /// With `clear_on_exit` the matched bits are cleared before returning.
    pub fn wait_bits(&self, mask: u32, clear_on_exit: bool, timeout: Option<Duration>) -> u32 {
        let deadline = timeout.map(|t| Instant::now() + t);
        let mut guard = self.bits.lock();
        while *guard & mask == 0 {
            match deadline {
                Some(deadline) => {
                    if self.cond.wait_until(&mut guard, deadline).timed_out() {
                        break;
                    }
                }
                None => self.cond.wait(&mut guard),
            }
        }
        let observed = *guard;
        if clear_on_exit {
            *guard &= !(observed & mask);
        }
        observed
    }
}

/// Counting semaphore with a bounded take
#[derive(Debug, Default)]
pub struct CountingSemaphore {
    count: Mutex<usize>,
    cond: Condvar,
}

impl CountingSemaphore {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn give(&self) {
        let mut count = self.count.lock();
        *count += 1;
        self.cond.notify_one();
    }

    /// Take one unit, waiting at most `timeout`. Returns false on timeout.
    pub fn take(&self, timeout: Duration) -> bool {
        let deadline = Instant::now() + timeout;
        let mut count = self.count.lock();
        while *count == 0 {
            if self.cond.wait_until(&mut count, deadline).timed_out() {
                break;
            }
        }
        if *count == 0 {
            return false;
        }
        *count -= 1;
        true
    }

    /// Drop any leftover units
    pub fn reset(&self) {
        *self.count.lock() = 0;
    }
}

/// Counters for conditions the driver recovers from silently
#[derive(Debug, Default)]
pub struct DriverStats {
    events_dropped: AtomicU64,
    callbacks_dropped: AtomicU64,
    replay_failures: AtomicU64,
    resets_detected: AtomicU64,
}

/// Point-in-time copy of [`DriverStats`]
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct StatsSnapshot {
    /// Sensor events dropped because the event channel was full
    pub events_dropped: u64,
    /// Callback triggers dropped because the callback channel was full
    pub callbacks_dropped: u64,
    /// Reports that failed to re-enable after a device reset
    pub replay_failures: u64,
    /// Device-initiated resets seen since construction
    pub resets_detected: u64,
}

impl DriverStats {
    pub(crate) fn event_dropped(&self) {
        self.events_dropped.fetch_add(1, Ordering::Relaxed);
    }

    pub(crate) fn callback_dropped(&self) {
        self.callbacks_dropped.fetch_add(1, Ordering::Relaxed);
    }

    pub(crate) fn replay_failed(&self) {
        self.replay_failures.fetch_add(1, Ordering::Relaxed);
    }

    pub(crate) fn reset_detected(&self) {
        self.resets_detected.fetch_add(1, Ordering::Relaxed);
    }

    pub fn snapshot(&self) -> StatsSnapshot {
        StatsSnapshot {
            events_dropped: self.events_dropped.load(Ordering::Relaxed),
            callbacks_dropped: self.callbacks_dropped.load(Ordering::Relaxed),
            replay_failures: self.replay_failures.load(Ordering::Relaxed),
            resets_detected: self.resets_detected.load(Ordering::Relaxed),
        }
    }
}
