// Copyright 2025 Au-Zone Technologies Inc.
// SPDX-License-Identifier: Apache-2.0

//! HINT interrupt bridge.
//!
//! The hub pulls HINT low when it has a packet for the host or is ready to
//! accept one. [`InterruptBridge::on_hint`] is the only code that runs in
//! "interrupt context": it masks itself and raises the `HINT_ASSERTED` bit in
//! the task event group. It never blocks and never touches driver data.
//!
//! The transport re-arms the bridge once a transfer completes. On Linux the
//! edge source is a [`HintWatcher`] thread that samples the line; since the
//! bridge is masked while a notification is outstanding, sampling the level
//! rather than the edge cannot flood the service worker.

use crate::{
    interface::gpio::InputPin,
    sync::{EventGroup, HINT_ASSERTED},
};
use log::{debug, warn};
use std::{
    io,
    sync::{
        atomic::{AtomicBool, Ordering},
        Arc,
    },
    thread::{self, JoinHandle},
    time::Duration,
};

/// Poll period of the HINT watcher thread
pub const HINT_POLL_INTERVAL: Duration = Duration::from_micros(250);

pub struct InterruptBridge {
    task_events: Arc<EventGroup>,
    armed: AtomicBool,
}

impl InterruptBridge {
    /// New bridge with its own task event group, initially masked
    pub fn new() -> Arc<Self> {
        Arc::new(Self {
            task_events: Arc::new(EventGroup::new()),
            armed: AtomicBool::new(false),
        })
    }

    /// HINT went low
    pub fn on_hint(&self) {
        if self.armed.swap(false, Ordering::AcqRel) {
            self.task_events.set_bits(HINT_ASSERTED);
        }
    }

    /// Unmask HINT notifications
    pub fn arm(&self) {
        self.armed.store(true, Ordering::Release);
    }

    /// Mask HINT notifications
    pub fn disarm(&self) {
        self.armed.store(false, Ordering::Release);
    }

    pub fn is_armed(&self) -> bool {
        self.armed.load(Ordering::Acquire)
    }

    /// Task lifecycle event group shared with the driver
    pub fn task_events(&self) -> &Arc<EventGroup> {
        &self.task_events
    }
}

/// Thread that forwards a low HINT line to an [`InterruptBridge`]
pub struct HintWatcher {
    stop: Arc<AtomicBool>,
    handle: Option<JoinHandle<()>>,
}

impl HintWatcher {
    pub fn spawn<P>(pin: Arc<P>, bridge: Arc<InterruptBridge>) -> io::Result<Self>
    where
        P: InputPin + Send + Sync + 'static,
        P::Error: core::fmt::Debug,
    {
        let stop = Arc::new(AtomicBool::new(false));
        let stop_flag = Arc::clone(&stop);

        let handle = thread::Builder::new()
            .name("bno08x_hint".to_string())
            .spawn(move || {
                debug!("HINT watcher started");
                let mut reported_error = false;
                while !stop_flag.load(Ordering::Acquire) {
                    match pin.is_low() {
                        Ok(true) => bridge.on_hint(),
                        Ok(false) => {}
                        Err(e) => {
                            if !reported_error {
                                warn!("Failed to sample HINT line: {:?}", e);
                                reported_error = true;
                            }
                        }
                    }
                    thread::sleep(HINT_POLL_INTERVAL);
                }
                debug!("HINT watcher stopped");
            })?;

        Ok(Self {
            stop,
            handle: Some(handle),
        })
    }

    pub fn stop(&mut self) {
        self.stop.store(true, Ordering::Release);
        if let Some(handle) = self.handle.take() {
            if handle.join().is_err() {
                warn!("HINT watcher panicked");
            }
        }
    }
}

impl Drop for HintWatcher {
    fn drop(&mut self) {
        self.stop();
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::sync::TASKS_RUNNING;
    use std::convert::Infallible;
    use std::time::Instant;

    struct Level(AtomicBool);

    impl InputPin for Level {
        type Error = Infallible;
        fn is_high(&self) -> Result<bool, Infallible> {
            Ok(!self.0.load(Ordering::Acquire))
        }
        fn is_low(&self) -> Result<bool, Infallible> {
            Ok(self.0.load(Ordering::Acquire))
        }
    }

    #[test]
    fn test_masked_bridge_ignores_hint() {
        let bridge = InterruptBridge::new();
        bridge.on_hint();
        assert_eq!(bridge.task_events().get_bits() & HINT_ASSERTED, 0);
    }

    #[test]
    fn test_hint_masks_until_rearmed() {
        let bridge = InterruptBridge::new();
        bridge.task_events().set_bits(TASKS_RUNNING);
        bridge.arm();
        bridge.on_hint();
        assert!(!bridge.is_armed());
        assert_ne!(bridge.task_events().get_bits() & HINT_ASSERTED, 0);

        bridge.task_events().clear_bits(HINT_ASSERTED);
        bridge.on_hint();
        assert_eq!(bridge.task_events().get_bits(), TASKS_RUNNING);
    }

    #[test]
    fn test_watcher_forwards_low_line() {
        let bridge = InterruptBridge::new();
        let pin = Arc::new(Level(AtomicBool::new(false)));
        let mut watcher = HintWatcher::spawn(Arc::clone(&pin), Arc::clone(&bridge)).unwrap();

        bridge.arm();
        pin.0.store(true, Ordering::Release);
        let bits = bridge.task_events().wait_bits(
            HINT_ASSERTED,
            true,
            Some(Duration::from_secs(2)),
        );
        assert_ne!(bits & HINT_ASSERTED, 0);

        let start = Instant::now();
        watcher.stop();
        assert!(start.elapsed() < Duration::from_secs(1));
    }
}
