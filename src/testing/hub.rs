// Copyright 2025 Au-Zone Technologies Inc.
// SPDX-License-Identifier: Apache-2.0

use crate::{
    error::HubError,
    hub::{AsyncEvent, HubListener, SensorConfig, SensorEvent, SensorHub},
    interface::InterruptBridge,
    sync::HINT_ASSERTED,
    types::{MetaData, ProductId, SampleCounts},
};
use parking_lot::Mutex;
use std::{
    collections::{HashMap, HashSet, VecDeque},
    sync::Arc,
    thread,
    time::{Duration, Instant},
};

/// A call made on a [`MockHub`]
#[derive(Debug, Clone, PartialEq)]
pub enum HubCall {
    Open,
    Close,
    SetSensorConfig(u8, SensorConfig),
    GetSensorConfig(u8),
    Flush(u8),
    GetProdIds,
    HardReset,
    SoftReset,
    On,
    Sleep,
    SetCalConfig(u8),
    GetCalConfig,
    SaveDcd,
    SetDcdAutoSave(bool),
    ClearDcdAndReset,
    GetFrs(u16),
    SetFrs(u16, Vec<u32>),
    GetMetadata(u8),
    GetCounts(u8),
    ClearCounts(u8),
    TareNow(u8, u8),
    PersistTare,
    ClearTare,
}

enum Pending {
    Sensor(SensorEvent),
    Async(AsyncEvent),
}

struct HubState {
    listener: Option<Arc<dyn HubListener>>,
    open: bool,
    pending: VecDeque<Pending>,
    calls: Vec<HubCall>,
    configs: HashMap<u8, SensorConfig>,
    failing: HashSet<u8>,
    reset_on_config: Option<u8>,
    frs: HashMap<u16, Vec<u32>>,
    reset_cause: u8,
    announce_reset: bool,
    cal_sensors: u8,
    counts: SampleCounts,
    call_delay: Duration,
    in_flight: usize,
    max_in_flight: usize,
}

/// In-memory [`SensorHub`].
///
/// Records every call, keeps the last configuration per report and
/// delivers queued events one per [`service`](SensorHub::service) call,
/// raising HINT through the bridge like the real transport does.
#[derive(Clone)]
pub struct MockHub {
    state: Arc<Mutex<HubState>>,
    bridge: Arc<InterruptBridge>,
}

impl MockHub {
    pub fn new(bridge: Arc<InterruptBridge>) -> Self {
        Self {
            state: Arc::new(Mutex::new(HubState {
                listener: None,
                open: false,
                pending: VecDeque::new(),
                calls: Vec::new(),
                configs: HashMap::new(),
                failing: HashSet::new(),
                reset_on_config: None,
                frs: HashMap::new(),
                reset_cause: 4,
                announce_reset: true,
                cal_sensors: 0,
                counts: SampleCounts::default(),
                call_delay: Duration::ZERO,
                in_flight: 0,
                max_in_flight: 0,
            })),
            bridge,
        }
    }

    /// Queue a sensor event and raise HINT
    pub fn queue_event(&self, event: SensorEvent) {
        self.state.lock().pending.push_back(Pending::Sensor(event));
        self.raise_hint();
    }

    /// Simulate a reset the host did not ask for
    pub fn emit_reset(&self) {
        self.state
            .lock()
            .pending
            .push_back(Pending::Async(AsyncEvent::Reset));
        self.raise_hint();
    }

    /// Make set feature commands for `sensor_id` fail
    pub fn fail_sensor(&self, sensor_id: u8) {
        self.state.lock().failing.insert(sensor_id);
    }

    /// Report one more reset while the next set feature command for
    /// `sensor_id` is being answered
    pub fn reset_during_config(&self, sensor_id: u8) {
        self.state.lock().reset_on_config = Some(sensor_id);
    }

    pub fn heal_sensor(&self, sensor_id: u8) {
        self.state.lock().failing.remove(&sensor_id);
    }

    /// Reset cause reported in the product ids
    pub fn set_reset_cause(&self, cause: u8) {
        self.state.lock().reset_cause = cause;
    }

    /// Stop answering resets, as a hub that has gone away would
    pub fn set_announce_reset(&self, announce: bool) {
        self.state.lock().announce_reset = announce;
    }

    pub fn set_counts(&self, counts: SampleCounts) {
        self.state.lock().counts = counts;
    }

    /// Sleep inside every call, to widen race windows in tests
    pub fn set_call_delay(&self, delay: Duration) {
        self.state.lock().call_delay = delay;
    }

    pub fn calls(&self) -> Vec<HubCall> {
        self.state.lock().calls.clone()
    }

    pub fn clear_calls(&self) {
        self.state.lock().calls.clear();
    }

    /// Set feature commands issued for `sensor_id`, oldest first
    pub fn configs_for(&self, sensor_id: u8) -> Vec<SensorConfig> {
        self.state
            .lock()
            .calls
            .iter()
            .filter_map(|c| match c {
                HubCall::SetSensorConfig(id, cfg) if *id == sensor_id => Some(*cfg),
                _ => None,
            })
            .collect()
    }

    /// Most calls ever observed in progress at the same time
    pub fn max_in_flight(&self) -> usize {
        self.state.lock().max_in_flight
    }

    pub fn frs_record(&self, record: u16) -> Option<Vec<u32>> {
        self.state.lock().frs.get(&record).cloned()
    }

    pub fn is_open(&self) -> bool {
        self.state.lock().open
    }

    /// Poll `calls()` until `pred` holds or `timeout` expires
    pub fn wait_for_calls<F>(&self, timeout: Duration, pred: F) -> bool
    where
        F: Fn(&[HubCall]) -> bool,
    {
        let deadline = Instant::now() + timeout;
        loop {
            if pred(&self.state.lock().calls) {
                return true;
            }
            if Instant::now() >= deadline {
                return false;
            }
            thread::sleep(Duration::from_millis(2));
        }
    }

    fn raise_hint(&self) {
        self.bridge.arm();
        self.bridge.on_hint();
    }

    fn enter(&self, call: Option<HubCall>) {
        let delay = {
            let mut state = self.state.lock();
            state.calls.extend(call);
            state.in_flight += 1;
            state.max_in_flight = state.max_in_flight.max(state.in_flight);
            state.call_delay
        };
        if !delay.is_zero() {
            thread::sleep(delay);
        }
    }

    fn leave(&self) {
        self.state.lock().in_flight -= 1;
    }

    fn track<T>(&self, call: HubCall, f: impl FnOnce(&mut HubState) -> T) -> T {
        self.enter(Some(call));
        let out = f(&mut self.state.lock());
        self.leave();
        out
    }

    fn queue_reset(&self) {
        let announce = {
            let mut state = self.state.lock();
            if state.announce_reset {
                state.pending.clear();
                state.pending.push_back(Pending::Async(AsyncEvent::Reset));
            }
            state.announce_reset
        };
        if announce {
            self.raise_hint();
        }
    }

    fn require_open(&self) -> Result<(), HubError> {
        if self.state.lock().open {
            Ok(())
        } else {
            Err(HubError::NotOpen)
        }
    }
}

impl SensorHub for MockHub {
    fn open(&mut self, listener: Arc<dyn HubListener>) -> Result<(), HubError> {
        let announce = self.track(HubCall::Open, |s| {
            s.listener = Some(Arc::clone(&listener));
            s.open = true;
            s.announce_reset
        });
        if !announce {
            self.state.lock().open = false;
            return Err(HubError::Timeout("reset complete"));
        }
        listener.on_async_event(AsyncEvent::Reset);
        Ok(())
    }

    fn close(&mut self) {
        self.track(HubCall::Close, |s| {
            s.open = false;
            s.listener = None;
            s.pending.clear();
        });
    }

    fn service(&mut self) -> Result<(), HubError> {
        // Counted for max_in_flight, not recorded
        self.enter(None);
        self.bridge.task_events().clear_bits(HINT_ASSERTED);
        let (next, listener, more) = {
            let mut state = self.state.lock();
            let next = state.pending.pop_front();
            (next, state.listener.clone(), !state.pending.is_empty())
        };
        if let (Some(next), Some(listener)) = (next, listener) {
            match next {
                Pending::Sensor(event) => listener.on_sensor_event(event),
                Pending::Async(event) => listener.on_async_event(event),
            }
        }
        if more {
            self.raise_hint();
        }
        self.leave();
        Ok(())
    }

    fn set_sensor_config(&mut self, sensor_id: u8, config: &SensorConfig) -> Result<(), HubError> {
        self.require_open()?;
        let (res, listener) = self.track(HubCall::SetSensorConfig(sensor_id, *config), |s| {
            let listener = match s.reset_on_config {
                Some(id) if id == sensor_id => {
                    s.reset_on_config = None;
                    s.listener.clone()
                }
                _ => None,
            };
            if s.failing.contains(&sensor_id) {
                let err = HubError::Rejected {
                    op: "set feature",
                    status: 1,
                };
                return (Err(err), listener);
            }
            s.configs.insert(sensor_id, *config);
            (Ok(()), listener)
        });
        if let Some(listener) = listener {
            listener.on_async_event(AsyncEvent::Reset);
        }
        res
    }

    fn get_sensor_config(&mut self, sensor_id: u8) -> Result<SensorConfig, HubError> {
        self.track(HubCall::GetSensorConfig(sensor_id), |s| {
            Ok(s.configs.get(&sensor_id).copied().unwrap_or_default())
        })
    }

    fn flush(&mut self, sensor_id: u8) -> Result<(), HubError> {
        self.track(HubCall::Flush(sensor_id), |_| Ok(()))
    }

    fn get_prod_ids(&mut self) -> Result<Vec<ProductId>, HubError> {
        self.track(HubCall::GetProdIds, |s| {
            Ok(vec![ProductId {
                reset_cause: s.reset_cause,
                sw_version_major: 3,
                sw_version_minor: 2,
                sw_part_number: 10003606,
                sw_build_number: 500,
                sw_version_patch: 7,
            }])
        })
    }

    fn hard_reset(&mut self) -> Result<(), HubError> {
        self.track(HubCall::HardReset, |s| s.configs.clear());
        self.queue_reset();
        Ok(())
    }

    fn soft_reset(&mut self) -> Result<(), HubError> {
        self.track(HubCall::SoftReset, |s| s.configs.clear());
        self.queue_reset();
        Ok(())
    }

    fn on(&mut self) -> Result<(), HubError> {
        self.track(HubCall::On, |_| Ok(()))
    }

    fn sleep(&mut self) -> Result<(), HubError> {
        self.track(HubCall::Sleep, |_| Ok(()))
    }

    fn set_cal_config(&mut self, sensors: u8) -> Result<(), HubError> {
        self.track(HubCall::SetCalConfig(sensors), |s| {
            s.cal_sensors = sensors;
            Ok(())
        })
    }

    fn get_cal_config(&mut self) -> Result<u8, HubError> {
        self.track(HubCall::GetCalConfig, |s| Ok(s.cal_sensors))
    }

    fn save_dcd(&mut self) -> Result<(), HubError> {
        self.track(HubCall::SaveDcd, |_| Ok(()))
    }

    fn set_dcd_auto_save(&mut self, enabled: bool) -> Result<(), HubError> {
        self.track(HubCall::SetDcdAutoSave(enabled), |_| Ok(()))
    }

    fn clear_dcd_and_reset(&mut self) -> Result<(), HubError> {
        self.track(HubCall::ClearDcdAndReset, |s| s.configs.clear());
        self.queue_reset();
        Ok(())
    }

    fn get_frs(&mut self, record: u16) -> Result<Vec<u32>, HubError> {
        self.track(HubCall::GetFrs(record), |s| {
            Ok(s.frs.get(&record).cloned().unwrap_or_default())
        })
    }

    fn set_frs(&mut self, record: u16, words: &[u32]) -> Result<(), HubError> {
        self.track(HubCall::SetFrs(record, words.to_vec()), |s| {
            if words.is_empty() {
                s.frs.remove(&record);
            } else {
                s.frs.insert(record, words.to_vec());
            }
            Ok(())
        })
    }

    fn get_metadata(&mut self, sensor_id: u8) -> Result<MetaData, HubError> {
        self.track(HubCall::GetMetadata(sensor_id), |_| {
            Ok(MetaData {
                min_period_us: 2500,
                max_period_us: 1_000_000,
                vendor_id: "mock".to_string(),
                ..Default::default()
            })
        })
    }

    fn get_counts(&mut self, sensor_id: u8) -> Result<SampleCounts, HubError> {
        self.track(HubCall::GetCounts(sensor_id), |s| Ok(s.counts))
    }

    fn clear_counts(&mut self, sensor_id: u8) -> Result<(), HubError> {
        self.track(HubCall::ClearCounts(sensor_id), |s| {
            s.counts = SampleCounts::default();
            Ok(())
        })
    }

    fn tare_now(&mut self, axes: u8, basis: u8) -> Result<(), HubError> {
        self.track(HubCall::TareNow(axes, basis), |_| Ok(()))
    }

    fn persist_tare(&mut self) -> Result<(), HubError> {
        self.track(HubCall::PersistTare, |_| Ok(()))
    }

    fn clear_tare(&mut self) -> Result<(), HubError> {
        self.track(HubCall::ClearTare, |_| Ok(()))
    }
}
