// Copyright 2025 Au-Zone Technologies Inc.
// SPDX-License-Identifier: Apache-2.0

//! Driver worker threads and the hub listener.
//!
//! - `bno08x_sh2_service` is the only thread that calls
//!   [`SensorHub::service`]. It replays enabled reports after a device reset
//!   before it services new data.
//! - `bno08x_data_proc` decodes sensor events outside the hub lock and
//!   stores them in the registry.
//! - `bno08x_cb` runs user callbacks so slow callbacks never stall ingestion.
//!
//! Each worker gives the driver's kill semaphore once when it exits.

use crate::{
    driver::Shared,
    hub::{AsyncEvent, HubListener, SensorEvent, SensorHub},
    sync::{
        DriverStats, EventGroup, HINT_ASSERTED, HOST_RESET_DONE, RESET_OCCURRED, TASKS_RUNNING,
    },
};
use crossbeam::channel::{Sender, TrySendError};
use log::{debug, trace, warn};
use std::{
    io,
    sync::{
        atomic::{AtomicBool, Ordering},
        Arc,
    },
    thread::{self, JoinHandle},
};

pub const SERVICE_TASK_NAME: &str = "bno08x_sh2_service";
pub const DATA_PROC_TASK_NAME: &str = "bno08x_data_proc";
pub const CB_TASK_NAME: &str = "bno08x_cb";

/// Spawn a named worker running `body`
pub(crate) fn spawn<H: SensorHub>(
    name: &'static str,
    shared: Arc<Shared<H>>,
    body: fn(&Shared<H>),
) -> io::Result<JoinHandle<()>> {
    thread::Builder::new().name(name.to_string()).spawn(move || {
        debug!("{} started", name);
        body(&shared);
        debug!("{} exiting", name);
        shared.kill.give();
    })
}

pub(crate) fn service_task<H: SensorHub>(shared: &Shared<H>) {
    let events = shared.task_events();
    loop {
        let bits = events.get_bits();
        if bits & TASKS_RUNNING == 0 {
            break;
        }
        if bits & RESET_OCCURRED != 0 {
            let failed = shared.re_enable_reports();
            if failed > 0 {
                warn!("{} reports did not come back after sensor reset", failed);
            }
        }
        if bits & HINT_ASSERTED != 0 {
            shared.service_hub();
        }
        events.wait_bits(HINT_ASSERTED | RESET_OCCURRED, false, None);
    }
}

pub(crate) fn data_proc_task<H: SensorHub>(shared: &Shared<H>) {
    while let Ok(event) = shared.event_rx.recv() {
        if shared.task_events().get_bits() & TASKS_RUNNING == 0 {
            break;
        }
        match H::decode(&event) {
            Ok(value) => shared.handle_sensor_value(&value),
            Err(e) => debug!("Dropping report 0x{:02X}: {}", event.report_id, e),
        }
    }
}

pub(crate) fn cb_task<H: SensorHub>(shared: &Shared<H>) {
    while let Ok(report_id) = shared.cb_rx.recv() {
        if shared.task_events().get_bits() & TASKS_RUNNING == 0 {
            break;
        }
        // Run outside the lock so callbacks may register more callbacks
        let callbacks = shared.callbacks.lock().matching(report_id);
        for cb in callbacks {
            cb.invoke(report_id);
        }
    }
}

/// Listener handed to the hub on open. It holds only the pieces it
/// signals, never the driver itself.
pub(crate) struct HubEvents {
    task_events: Arc<EventGroup>,
    events: Sender<SensorEvent>,
    host_reset_pending: Arc<AtomicBool>,
    stats: Arc<DriverStats>,
}

impl HubEvents {
    pub fn new(
        task_events: Arc<EventGroup>,
        events: Sender<SensorEvent>,
        host_reset_pending: Arc<AtomicBool>,
        stats: Arc<DriverStats>,
    ) -> Self {
        Self {
            task_events,
            events,
            host_reset_pending,
            stats,
        }
    }
}

impl HubListener for HubEvents {
    fn on_async_event(&self, event: AsyncEvent) {
        match event {
            AsyncEvent::Reset => {
                if self.host_reset_pending.load(Ordering::Acquire) {
                    debug!("Sensor hub reset complete");
                    self.task_events.set_bits(HOST_RESET_DONE);
                } else {
                    warn!("Unexpected sensor hub reset, re-enabling reports");
                    self.stats.reset_detected();
                    self.task_events.set_bits(RESET_OCCURRED);
                }
            }
            AsyncEvent::ShtpError(code) => {
                debug!("SHTP error list received, last error {}", code);
            }
        }
    }

    fn on_sensor_event(&self, event: SensorEvent) {
        match self.events.try_send(event) {
            Ok(()) => trace!("queued report 0x{:02X}", event.report_id),
            Err(TrySendError::Full(_)) => {
                self.stats.event_dropped();
                warn!(
                    "Sensor event queue full, dropping report 0x{:02X}",
                    event.report_id
                );
            }
            Err(TrySendError::Disconnected(_)) => {}
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crossbeam::channel::bounded;

    fn listener(capacity: usize) -> (HubEvents, crossbeam::channel::Receiver<SensorEvent>) {
        let (tx, rx) = bounded(capacity);
        let events = HubEvents::new(
            Arc::new(EventGroup::new()),
            tx,
            Arc::new(AtomicBool::new(false)),
            Arc::new(DriverStats::default()),
        );
        (events, rx)
    }

    #[test]
    fn test_device_reset_sets_reset_occurred() {
        let (events, _rx) = listener(1);
        events.on_async_event(AsyncEvent::Reset);
        assert_ne!(events.task_events.get_bits() & RESET_OCCURRED, 0);
        assert_eq!(events.stats.snapshot().resets_detected, 1);
    }

    #[test]
    fn test_host_reset_is_not_replayed() {
        let (events, _rx) = listener(1);
        events.host_reset_pending.store(true, Ordering::Release);
        events.on_async_event(AsyncEvent::Reset);
        let bits = events.task_events.get_bits();
        assert_eq!(bits & RESET_OCCURRED, 0);
        assert_ne!(bits & HOST_RESET_DONE, 0);
        assert_eq!(events.stats.snapshot().resets_detected, 0);
    }

    #[test]
    fn test_full_event_queue_drops_and_counts() {
        let (events, rx) = listener(1);
        events.on_sensor_event(SensorEvent::new(1, 0, 0, &[1, 0, 0, 0]));
        events.on_sensor_event(SensorEvent::new(2, 0, 0, &[2, 0, 0, 0]));
        assert_eq!(rx.len(), 1);
        assert_eq!(rx.recv().unwrap().report_id, 1);
        assert_eq!(events.stats.snapshot().events_dropped, 1);
    }
}
