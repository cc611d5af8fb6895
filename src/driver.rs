// Copyright 2025 Au-Zone Technologies Inc.
// SPDX-License-Identifier: Apache-2.0

//! BNO08x IMU driver.
//!
//! [`Bno08x`] owns the sensor hub engine, the report registry and three
//! worker threads. It is generic over the [`SensorHub`] so the whole driver
//! runs against [`MockHub`](crate::testing::MockHub) in tests; on Linux
//! [`Bno08x::new_spi`] wires up the SPI transport.
//!
//! Locking: the hub lock is held only around hub calls and never across a
//! condition wait. The data lock is held only to copy into or out of the
//! report slots and the enabled-report set. Code that needs both takes the
//! hub lock first and releases it before taking the data lock.

use crate::{
    callbacks::{CallbackFn, CallbackList, CallbackTarget},
    config::Bno08xConfig,
    constants::{CMD_EXECUTION_DELAY, HOST_RESET_TIMEOUT, TASK_DELETE_TIMEOUT},
    error::{Error, HubError, Result},
    frs::{circle_detector_config_words, quaternion_to_frs_words},
    hub::{HubListener, SensorConfig, SensorEvent, SensorHub, SensorValue, Sh2Hub},
    interface::{
        delay::delay,
        gpio::{GpiodIn, GpiodOut},
        spidev::SpiDevice,
        InterruptBridge, SpiControlLines, SpiHal,
    },
    reports::{self, descriptor, DataStore, Report, ReportDescriptor, ReportShape},
    sync::{
        CountingSemaphore, DriverStats, EventGroup, StatsSnapshot, DATA_AVAILABLE, HINT_ASSERTED,
        HOST_RESET_DONE, RESET_OCCURRED, TASKS_RUNNING,
    },
    tasks::{self, HubEvents},
    types::{
        ActivityClassifier, CalSel, CircleDetector, FrsId, GyroIntegratedRv, ProductId, Quat,
        RawMems, ResetReason, ShakeDetector, StabilityClassifier, StepCounter, TapDetector,
        UncalibratedVector, Vector3,
    },
};
use crossbeam::channel::{bounded, Receiver, Sender, TrySendError};
use log::{debug, error, trace, warn};
use parking_lot::Mutex;
use std::{
    sync::{
        atomic::{AtomicBool, Ordering},
        Arc,
    },
    thread::JoinHandle,
};

/// State shared between the public handle and the workers
pub(crate) struct Shared<H> {
    pub(crate) hub: Mutex<H>,
    pub(crate) data: Mutex<DataStore>,
    pub(crate) bridge: Arc<InterruptBridge>,
    /// One bit per enabled report
    pub(crate) rpt_en: EventGroup,
    /// One bit per report with data not yet seen by `has_new_data()`
    pub(crate) rpt_data: EventGroup,
    pub(crate) event_tx: Sender<SensorEvent>,
    pub(crate) event_rx: Receiver<SensorEvent>,
    pub(crate) cb_tx: Sender<u8>,
    pub(crate) cb_rx: Receiver<u8>,
    pub(crate) callbacks: Mutex<CallbackList>,
    pub(crate) kill: CountingSemaphore,
    pub(crate) stats: Arc<DriverStats>,
    host_reset_pending: Arc<AtomicBool>,
    circle_configured: AtomicBool,
    config: Bno08xConfig,
}

impl<H: SensorHub> Shared<H> {
    pub(crate) fn task_events(&self) -> &EventGroup {
        self.bridge.task_events()
    }

    /// Run `f` with the hub lock held
    pub(crate) fn with_hub<T>(
        &self,
        f: impl FnOnce(&mut H) -> std::result::Result<T, HubError>,
    ) -> Result<T> {
        let mut hub = self.hub.lock();
        Ok(f(&mut *hub)?)
    }

    fn listener(&self) -> Arc<dyn HubListener> {
        Arc::new(HubEvents::new(
            Arc::clone(self.bridge.task_events()),
            self.event_tx.clone(),
            Arc::clone(&self.host_reset_pending),
            Arc::clone(&self.stats),
        ))
    }

    pub(crate) fn is_report_enabled(&self, desc: &ReportDescriptor) -> bool {
        self.rpt_en.get_bits() & desc.bit != 0
    }

    pub(crate) fn take_new_data(&self, desc: &ReportDescriptor) -> bool {
        self.rpt_data.clear_bits(desc.bit) & desc.bit != 0
    }

    pub(crate) fn register_callback(&self, target: CallbackTarget, cb: CallbackFn) -> Result<()> {
        self.callbacks.lock().push(target, cb)
    }

    /// Configure the hub for `desc`, then record it as enabled.
    ///
    /// A period of 0 disables the report.
    pub(crate) fn enable_report(
        &self,
        desc: &'static ReportDescriptor,
        period_us: u32,
        mut config: SensorConfig,
    ) -> Result<()> {
        if period_us == 0 {
            return self.disable_report(desc);
        }
        desc.shape.adjust_config(&mut config);
        config.report_interval_us = period_us;

        if desc.shape == ReportShape::Circle {
            self.configure_circle_detector()?;
        }

        if let Err(e) = self.with_hub(|hub| hub.set_sensor_config(desc.id, &config)) {
            warn!("Failed to enable {}: {}", desc.name, e);
            return Err(e);
        }
        delay(CMD_EXECUTION_DELAY);
        if let Err(e) = self.with_hub(|hub| hub.flush(desc.id)) {
            warn!("Failed to flush {}: {}", desc.name, e);
        }

        {
            let mut data = self.data.lock();
            data.mark_enabled(desc, period_us, config);
            self.rpt_en.set_bits(desc.bit);
        }
        debug!("Enabled {} every {} us", desc.name, period_us);
        Ok(())
    }

    pub(crate) fn disable_report(&self, desc: &'static ReportDescriptor) -> Result<()> {
        if !self.is_report_enabled(desc) {
            return Ok(());
        }
        let mut config = self.data.lock().slot(desc).config;
        config.report_interval_us = 0;
        config.batch_interval_us = 0;

        if let Err(e) = self.with_hub(|hub| hub.set_sensor_config(desc.id, &config)) {
            warn!("Failed to disable {}: {}", desc.name, e);
            return Err(e);
        }
        delay(CMD_EXECUTION_DELAY);

        {
            let mut data = self.data.lock();
            self.rpt_en.clear_bits(desc.bit);
            data.mark_disabled(desc);
        }
        self.rpt_data.clear_bits(desc.bit);
        debug!("Disabled {}", desc.name);
        Ok(())
    }

    /// Write the circle detector thresholds once per driver
    fn configure_circle_detector(&self) -> Result<()> {
        if self.circle_configured.load(Ordering::Acquire) {
            return Ok(());
        }
        let words = circle_detector_config_words();
        self.with_hub(|hub| {
            hub.set_frs(FrsId::CIRCLE_DETECTOR_CONFIG, &[])?;
            hub.set_frs(FrsId::CIRCLE_DETECTOR_CONFIG, &words)
        })?;
        self.circle_configured.store(true, Ordering::Release);
        Ok(())
    }

    /// Replay every enabled report after an unsolicited reset. Returns the
    /// number of reports that failed to come back.
    ///
    /// A reset reported while the replay runs leaves [`RESET_OCCURRED`] set
    /// so the service task replays again.
    pub(crate) fn re_enable_reports(&self) -> usize {
        let seen = self.stats.snapshot().resets_detected;
        let snapshot = self.data.lock().enabled_snapshot();
        let mut failures = 0;
        for (desc, period_us, config) in snapshot {
            if let Err(e) = self.enable_report(desc, period_us, config) {
                error!("Failed to re-enable {} after reset: {}", desc.name, e);
                self.stats.replay_failed();
                failures += 1;
            }
        }
        self.task_events().clear_bits(RESET_OCCURRED);
        // The listener counts a reset before raising the bit
        if self.stats.snapshot().resets_detected != seen {
            debug!("Sensor reset again during replay");
            self.task_events().set_bits(RESET_OCCURRED);
        }
        debug!("Report replay finished, {} failed", failures);
        failures
    }

    /// Let the hub process one pending packet
    pub(crate) fn service_hub(&self) {
        let mut hub = self.hub.lock();
        // Another hub call may have consumed the notification while we
        // waited for the lock
        if self.task_events().get_bits() & HINT_ASSERTED == 0 {
            return;
        }
        if let Err(e) = hub.service() {
            warn!("Sensor hub service failed: {}", e);
            self.task_events().clear_bits(HINT_ASSERTED);
        }
    }

    pub(crate) fn handle_sensor_value(&self, value: &SensorValue) {
        let Some(desc) = descriptor(value.sensor_id) else {
            trace!("no registry entry for report 0x{:02X}", value.sensor_id);
            return;
        };
        let enabled = self.is_report_enabled(desc);
        {
            let mut data = self.data.lock();
            data.store(desc, value);
            if enabled {
                data.set_most_recent(desc.id);
            }
        }
        if !enabled {
            return;
        }
        self.rpt_data.set_bits(desc.bit);
        self.task_events().set_bits(DATA_AVAILABLE);

        if self.callbacks.lock().is_empty() {
            return;
        }
        if let Err(TrySendError::Full(_)) = self.cb_tx.try_send(desc.id) {
            self.stats.callback_dropped();
            warn!("Callback queue full, dropping callback for {}", desc.name);
        }
    }

    fn reset_reason(&self) -> Result<ResetReason> {
        let ids = self.with_hub(|hub| hub.get_prod_ids())?;
        ids.first()
            .map(|id| ResetReason::from(id.reset_cause))
            .ok_or_else(|| HubError::BadResponse("empty product id list".to_string()).into())
    }

    /// Reset requested by the host: forget every enabled report, issue
    /// `reset` and wait for the hub to come back.
    fn host_reset(
        &self,
        what: &'static str,
        reset: impl FnOnce(&mut H) -> std::result::Result<(), HubError>,
    ) -> Result<()> {
        {
            let mut data = self.data.lock();
            self.rpt_en.clear_bits(reports::ALL_REPORT_BITS);
            data.clear_enabled();
        }
        self.rpt_data.clear_bits(reports::ALL_REPORT_BITS);

        let events = self.task_events();
        events.clear_bits(HOST_RESET_DONE);
        self.host_reset_pending.store(true, Ordering::Release);
        if let Err(e) = self.with_hub(reset) {
            self.host_reset_pending.store(false, Ordering::Release);
            warn!("Failed to {}: {}", what, e);
            return Err(e);
        }
        let bits = events.wait_bits(HOST_RESET_DONE, true, Some(HOST_RESET_TIMEOUT));
        self.host_reset_pending.store(false, Ordering::Release);
        if bits & HOST_RESET_DONE == 0 {
            warn!("Sensor hub did not report back after {}", what);
            return Err(Error::Timeout("reset notification"));
        }

        let reason = self.reset_reason()?;
        if reason != ResetReason::ExtRst {
            warn!("{} finished with reset reason {:?}", what, reason);
            return Err(Error::UnexpectedResetReason(reason));
        }
        debug!("{} complete", what);
        Ok(())
    }
}

/// BNO08x driver over a [`SensorHub`]
pub struct Bno08x<H: SensorHub> {
    shared: Arc<Shared<H>>,
    workers: Vec<JoinHandle<()>>,
    initialized: bool,
}

/// Driver on a Linux spidev bus with gpiod control lines
pub type SpiBno08x = Bno08x<Sh2Hub<SpiHal<SpiDevice, GpiodIn, GpiodOut>>>;

impl SpiBno08x {
    /// Open the SPI device and GPIO lines named in `config`. Nothing is sent
    /// to the sensor until [`initialize`](Bno08x::initialize).
    pub fn new_spi(config: Bno08xConfig) -> Result<Self> {
        let config = config.validated()?;
        let hint_line = config
            .hint
            .as_ref()
            .ok_or_else(|| Error::Config("HINT line is not assigned".into()))?;
        let reset_line = config
            .reset
            .as_ref()
            .ok_or_else(|| Error::Config("RST line is not assigned".into()))?;

        let spi = SpiDevice::new(&config.spi_device, config.sclk_speed_hz)?;
        let hintn = GpiodIn::from_line(hint_line)?;
        let reset = GpiodOut::from_line(reset_line, true)?;
        let wake = config
            .wake
            .as_ref()
            .map(|line| GpiodOut::from_line(line, true))
            .transpose()?;
        debug!(
            "Opened {} at {} Hz",
            config.spi_device, config.sclk_speed_hz
        );

        let bridge = InterruptBridge::new();
        let hal = SpiHal::new(
            SpiControlLines {
                spi,
                hintn,
                reset,
                wake,
            },
            Arc::clone(&bridge),
            config.hint_timeout,
            config.install_isr_service,
        );
        Self::from_parts(config, Sh2Hub::new(hal), bridge)
    }
}

macro_rules! report_accessors {
    ($($(#[$doc:meta])* $fn:ident => $desc:ident: $ty:ty;)*) => {
        $(
            $(#[$doc])*
            pub fn $fn(&self) -> Report<'_, H, $ty> {
                Report::new(&self.shared, &reports::$desc)
            }
        )*
    };
}

impl<H: SensorHub> Bno08x<H> {
    /// Build a driver from an already constructed hub. `bridge` must be the
    /// bridge the hub's transport signals HINT through.
    pub fn from_parts(config: Bno08xConfig, hub: H, bridge: Arc<InterruptBridge>) -> Result<Self> {
        let config = config.validated()?;
        let (event_tx, event_rx) = bounded(config.event_queue_size);
        let (cb_tx, cb_rx) = bounded(config.callback_queue_size);
        let shared = Shared {
            hub: Mutex::new(hub),
            data: Mutex::new(DataStore::default()),
            bridge,
            rpt_en: EventGroup::new(),
            rpt_data: EventGroup::new(),
            event_tx,
            event_rx,
            cb_tx,
            cb_rx,
            callbacks: Mutex::new(CallbackList::new(config.callback_capacity)),
            kill: CountingSemaphore::new(),
            stats: Arc::new(DriverStats::default()),
            host_reset_pending: Arc::new(AtomicBool::new(false)),
            circle_configured: AtomicBool::new(false),
            config,
        };
        Ok(Self {
            shared: Arc::new(shared),
            workers: Vec::new(),
            initialized: false,
        })
    }

    /// Reset and open the sensor hub, then start the workers.
    pub fn initialize(&mut self) -> Result<()> {
        if self.initialized {
            return Err(Error::AlreadyInitialized);
        }
        let shared = Arc::clone(&self.shared);
        let events = shared.task_events();
        events.clear_bits(RESET_OCCURRED | DATA_AVAILABLE | HOST_RESET_DONE);
        shared.kill.reset();
        events.set_bits(TASKS_RUNNING);

        // The boot-time reset is ours, not one to replay
        shared.host_reset_pending.store(true, Ordering::Release);
        let listener = shared.listener();
        let opened = shared.with_hub(|hub| hub.open(listener));
        shared.host_reset_pending.store(false, Ordering::Release);
        events.clear_bits(HOST_RESET_DONE);
        if let Err(e) = opened {
            error!("Failed to open sensor hub: {}", e);
            events.clear_bits(TASKS_RUNNING);
            return Err(e);
        }

        match shared.with_hub(|hub| hub.get_prod_ids()) {
            Ok(ids) => {
                for id in &ids {
                    debug!(
                        "Product id: part {} version {}.{}.{} build {}, reset cause {:?}",
                        id.sw_part_number,
                        id.sw_version_major,
                        id.sw_version_minor,
                        id.sw_version_patch,
                        id.sw_build_number,
                        ResetReason::from(id.reset_cause)
                    );
                }
            }
            Err(e) => {
                error!("Failed to read product ids: {}", e);
                shared.hub.lock().close();
                events.clear_bits(TASKS_RUNNING);
                return Err(e);
            }
        }

        self.initialized = true;
        let workers: [(&'static str, fn(&Shared<H>)); 3] = [
            (tasks::SERVICE_TASK_NAME, tasks::service_task::<H>),
            (tasks::DATA_PROC_TASK_NAME, tasks::data_proc_task::<H>),
            (tasks::CB_TASK_NAME, tasks::cb_task::<H>),
        ];
        for (name, body) in workers {
            match tasks::spawn(name, Arc::clone(&shared), body) {
                Ok(handle) => self.workers.push(handle),
                Err(e) => {
                    error!("Failed to spawn {}: {}", name, e);
                    if let Err(e) = self.deinit() {
                        error!("Cleanup after failed initialization: {}", e);
                    }
                    return Err(Error::Io(e));
                }
            }
        }
        debug!("BNO08x initialized");
        Ok(())
    }

    /// Stop the workers and close the hub. Safe to call more than once.
    pub fn deinit(&mut self) -> Result<()> {
        if !self.initialized {
            return Ok(());
        }
        self.initialized = false;
        let shared = Arc::clone(&self.shared);
        let events = shared.task_events();

        shared.bridge.disarm();
        events.clear_bits(TASKS_RUNNING);

        // Wake every worker so it sees RUNNING cleared
        let _ = shared.event_tx.try_send(SensorEvent::default());
        events.set_bits(HINT_ASSERTED);
        let _ = shared.cb_tx.try_send(0);

        let expected = self.workers.len();
        let acked = (0..expected)
            .filter(|_| shared.kill.take(TASK_DELETE_TIMEOUT))
            .count();
        if acked != expected {
            error!(
                "Task deletion timed out: {} of {} workers stopped",
                acked, expected
            );
            // Detach whatever is still running
            self.workers.clear();
            return Err(Error::TeardownTimeout { acked, expected });
        }
        for handle in self.workers.drain(..) {
            if handle.join().is_err() {
                error!("Worker panicked");
            }
        }

        shared.hub.lock().close();
        {
            let mut data = shared.data.lock();
            shared.rpt_en.clear_bits(reports::ALL_REPORT_BITS);
            data.clear_enabled();
        }
        shared.rpt_data.clear_bits(reports::ALL_REPORT_BITS);
        shared.callbacks.lock().clear();
        events.clear_bits(HINT_ASSERTED | RESET_OCCURRED | DATA_AVAILABLE | HOST_RESET_DONE);
        while shared.event_rx.try_recv().is_ok() {}
        while shared.cb_rx.try_recv().is_ok() {}
        debug!("BNO08x deinitialized");
        Ok(())
    }

    pub fn is_initialized(&self) -> bool {
        self.initialized
    }

    fn ensure_initialized(&self) -> Result<()> {
        if self.initialized {
            Ok(())
        } else {
            Err(Error::NotInitialized)
        }
    }

    pub fn config(&self) -> &Bno08xConfig {
        &self.shared.config
    }

    /// Bridge to forward HINT edges to when the HINT watcher is not used
    pub fn bridge(&self) -> &Arc<InterruptBridge> {
        &self.shared.bridge
    }

    report_accessors! {
        rotation_vector => ROTATION_VECTOR: Quat;
        game_rotation_vector => GAME_ROTATION_VECTOR: Quat;
        arvr_stabilized_rv => ARVR_STABILIZED_RV: Quat;
        arvr_stabilized_game_rv => ARVR_STABILIZED_GAME_RV: Quat;
        gyro_integrated_rv => GYRO_INTEGRATED_RV: GyroIntegratedRv;
        geomagnetic_rv => GEOMAGNETIC_RV: Quat;
        accelerometer => ACCELEROMETER: Vector3;
        /// Acceleration with gravity removed
        linear_accelerometer => LINEAR_ACCELEROMETER: Vector3;
        gravity => GRAVITY: Vector3;
        cal_gyro => CAL_GYRO: Vector3;
        uncal_gyro => UNCAL_GYRO: UncalibratedVector;
        cal_magnetometer => CAL_MAGNETOMETER: Vector3;
        uncal_magnetometer => UNCAL_MAGNETOMETER: UncalibratedVector;
        tap_detector => TAP_DETECTOR: TapDetector;
        step_counter => STEP_COUNTER: StepCounter;
        stability_classifier => STABILITY_CLASSIFIER: StabilityClassifier;
        activity_classifier => ACTIVITY_CLASSIFIER: ActivityClassifier;
        shake_detector => SHAKE_DETECTOR: ShakeDetector;
        raw_accelerometer => RAW_ACCELEROMETER: RawMems;
        raw_gyro => RAW_GYRO: RawMems;
        raw_magnetometer => RAW_MAGNETOMETER: RawMems;
        /// Circles counted since the report was enabled
        circle_detector => CIRCLE_DETECTOR: CircleDetector;
    }

    /// Wait up to the configured timeout for a new sample of any enabled
    /// report.
    pub fn data_available(&self) -> bool {
        let bits = self.shared.task_events().wait_bits(
            DATA_AVAILABLE,
            true,
            Some(self.shared.config.data_available_timeout),
        );
        bits & DATA_AVAILABLE != 0
    }

    /// Like [`data_available`](Self::data_available), returning the id of
    /// the report that most recently produced data
    pub fn data_available_with_id(&self) -> Option<u8> {
        if self.data_available() {
            Some(self.shared.data.lock().most_recent())
        } else {
            None
        }
    }

    /// Run `cb` on the callback worker whenever any enabled report has new
    /// data
    pub fn register_cb<F>(&self, cb: F) -> Result<()>
    where
        F: Fn() + Send + Sync + 'static,
    {
        self.shared
            .register_callback(CallbackTarget::All, CallbackFn::Void(Arc::new(cb)))
    }

    pub fn register_cb_with_id<F>(&self, cb: F) -> Result<()>
    where
        F: Fn(u8) + Send + Sync + 'static,
    {
        self.shared
            .register_callback(CallbackTarget::All, CallbackFn::WithId(Arc::new(cb)))
    }

    /// Toggle the reset line. Every report is disabled afterwards.
    pub fn hard_reset(&self) -> Result<()> {
        self.ensure_initialized()?;
        self.shared.host_reset("hard reset", |hub| hub.hard_reset())
    }

    /// Reset through the executable channel. Every report is disabled
    /// afterwards.
    pub fn soft_reset(&self) -> Result<()> {
        self.ensure_initialized()?;
        self.shared.host_reset("soft reset", |hub| hub.soft_reset())
    }

    pub fn get_reset_reason(&self) -> Result<ResetReason> {
        self.shared.reset_reason()
    }

    /// Put the hub into sleep mode
    pub fn sleep(&self) -> Result<()> {
        self.shared.with_hub(|hub| hub.sleep())
    }

    /// Wake the hub from sleep mode
    pub fn on(&self) -> Result<()> {
        self.shared.with_hub(|hub| hub.on())
    }

    /// Disable every enabled report. Keeps going past failures and returns
    /// the first one.
    pub fn disable_all_reports(&self) -> Result<()> {
        let mut first_err = None;
        for id in self.enabled_reports() {
            let Some(desc) = descriptor(id) else { continue };
            if let Err(e) = self.shared.disable_report(desc) {
                first_err.get_or_insert(e);
            }
        }
        first_err.map_or(Ok(()), Err)
    }

    /// Turn on dynamic calibration for `sensor`, keeping the others as they are
    pub fn dynamic_calibration_enable(&self, sensor: CalSel) -> Result<()> {
        self.shared.with_hub(|hub| {
            let enabled = hub.get_cal_config()?;
            hub.set_cal_config(enabled | sensor.mask())
        })
    }

    pub fn dynamic_calibration_disable(&self, sensor: CalSel) -> Result<()> {
        self.shared.with_hub(|hub| {
            let enabled = hub.get_cal_config()?;
            hub.set_cal_config(enabled & !sensor.mask())
        })
    }

    /// Sensors with dynamic calibration on, as [`CalSel`] mask bits
    pub fn get_dynamic_calibration(&self) -> Result<u8> {
        self.shared.with_hub(|hub| hub.get_cal_config())
    }

    /// Save the dynamic calibration data to flash now
    pub fn save_dynamic_calibration(&self) -> Result<()> {
        self.shared.with_hub(|hub| hub.save_dcd())
    }

    pub fn dynamic_calibration_autosave_enable(&self) -> Result<()> {
        self.shared.with_hub(|hub| hub.set_dcd_auto_save(true))
    }

    pub fn dynamic_calibration_autosave_disable(&self) -> Result<()> {
        self.shared.with_hub(|hub| hub.set_dcd_auto_save(false))
    }

    /// Clear the dynamic calibration in RAM and reset the hub. Every report
    /// is disabled afterwards.
    pub fn clear_dynamic_calibration(&self) -> Result<()> {
        self.ensure_initialized()?;
        self.shared
            .host_reset("clear calibration and reset", |hub| hub.clear_dcd_and_reset())
    }

    /// Erase the dynamic calibration record from flash
    pub fn delete_dynamic_calibration(&self) -> Result<()> {
        self.set_frs(FrsId::DYNAMIC_CALIBRATION, &[])
    }

    /// Read FRS record `record`; empty when the record is not set
    pub fn get_frs(&self, record: u16) -> Result<Vec<u32>> {
        self.shared.with_hub(|hub| hub.get_frs(record))
    }

    /// Write `words` to FRS record `record`; an empty slice erases it
    pub fn set_frs(&self, record: u16, words: &[u32]) -> Result<()> {
        self.shared.with_hub(|hub| hub.set_frs(record, words))
    }

    /// Store the mounting orientation of the sensor. Applies after the next
    /// reset.
    pub fn set_system_orientation(&self, real: f32, i: f32, j: f32, k: f32) -> Result<()> {
        let words = quaternion_to_frs_words(real, i, j, k);
        self.set_frs(FrsId::SYSTEM_ORIENTATION, &words)
    }

    pub fn get_product_ids(&self) -> Result<Vec<ProductId>> {
        self.shared.with_hub(|hub| hub.get_prod_ids())
    }

    /// Ids of the enabled reports, in the order they were enabled
    pub fn enabled_reports(&self) -> Vec<u8> {
        self.shared.data.lock().enabled_ids()
    }

    pub fn stats(&self) -> StatsSnapshot {
        self.shared.stats.snapshot()
    }
}

impl<H: SensorHub> Drop for Bno08x<H> {
    fn drop(&mut self) {
        if let Err(e) = self.deinit() {
            error!("BNO08x teardown failed: {}", e);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{
        constants::{
            SENSOR_REPORTID_ACCELEROMETER, SENSOR_REPORTID_CIRCLE_DETECTOR,
            SENSOR_REPORTID_GYROSCOPE,
        },
        testing::{circle_event, vector_event, HubCall, MockHub},
    };
    use std::time::Duration;

    fn driver() -> (Bno08x<MockHub>, MockHub) {
        let bridge = InterruptBridge::new();
        let hub = MockHub::new(Arc::clone(&bridge));
        let cfg = Bno08xConfig::default().with_data_available_timeout(Duration::from_millis(500));
        let imu = Bno08x::from_parts(cfg, hub.clone(), bridge).unwrap();
        (imu, hub)
    }

    #[test]
    fn test_initialize_opens_hub_and_reads_ids() {
        let (mut imu, hub) = driver();
        imu.initialize().unwrap();
        assert!(imu.is_initialized());
        let calls = hub.calls();
        assert_eq!(&calls[..2], &[HubCall::Open, HubCall::GetProdIds]);
        // The boot reset is not a device reset
        assert_eq!(imu.stats().resets_detected, 0);
        assert!(matches!(imu.initialize(), Err(Error::AlreadyInitialized)));
        imu.deinit().unwrap();
        assert!(!hub.is_open());
    }

    #[test]
    fn test_initialize_fails_when_hub_stays_silent() {
        let (mut imu, hub) = driver();
        hub.set_announce_reset(false);
        assert!(imu.initialize().is_err());
        assert!(!imu.is_initialized());
        assert_eq!(imu.shared.task_events().get_bits() & TASKS_RUNNING, 0);
    }

    #[test]
    fn test_period_zero_disables() {
        let (mut imu, hub) = driver();
        imu.initialize().unwrap();
        let accel = imu.accelerometer();
        accel.enable(10_000).unwrap();
        assert!(accel.is_enabled());
        accel.enable(0).unwrap();
        assert!(!accel.is_enabled());
        let cfgs = hub.configs_for(SENSOR_REPORTID_ACCELEROMETER);
        assert_eq!(cfgs.last().unwrap().report_interval_us, 0);
    }

    #[test]
    fn test_replay_returns_failed_report_count() {
        let (mut imu, hub) = driver();
        imu.initialize().unwrap();
        imu.accelerometer().enable(10_000).unwrap();
        imu.cal_gyro().enable(10_000).unwrap();
        hub.fail_sensor(SENSOR_REPORTID_GYROSCOPE);

        assert_eq!(imu.shared.re_enable_reports(), 1);
        assert_eq!(imu.stats().replay_failures, 1);
        assert!(imu.cal_gyro().is_enabled());
        assert_eq!(imu.shared.task_events().get_bits() & RESET_OCCURRED, 0);

        hub.heal_sensor(SENSOR_REPORTID_GYROSCOPE);
        assert_eq!(imu.shared.re_enable_reports(), 0);
    }

    #[test]
    fn test_circle_detector_configures_frs_once() {
        let (mut imu, hub) = driver();
        imu.initialize().unwrap();
        let circle = imu.circle_detector();
        circle.enable(100_000).unwrap();
        circle.disable().unwrap();
        circle.enable(100_000).unwrap();
        let frs_writes = hub
            .calls()
            .iter()
            .filter(|c| matches!(c, HubCall::SetFrs(FrsId::CIRCLE_DETECTOR_CONFIG, _)))
            .count();
        assert_eq!(frs_writes, 2);
        assert_eq!(
            hub.frs_record(FrsId::CIRCLE_DETECTOR_CONFIG),
            Some(circle_detector_config_words().to_vec())
        );

        hub.queue_event(circle_event(1));
        hub.queue_event(circle_event(2));
        assert!(imu.data_available());
        let deadline = std::time::Instant::now() + Duration::from_secs(2);
        while circle.get().count < 3 && std::time::Instant::now() < deadline {
            std::thread::sleep(Duration::from_millis(5));
        }
        assert_eq!(circle.get().count, 3);
        assert_eq!(
            imu.shared.data.lock().most_recent(),
            SENSOR_REPORTID_CIRCLE_DETECTOR
        );
    }

    #[test]
    fn test_samples_of_disabled_reports_do_not_signal() {
        let (mut imu, hub) = driver();
        imu.initialize().unwrap();
        hub.queue_event(vector_event(SENSOR_REPORTID_ACCELEROMETER, 0.0, 0.0, 9.8));
        assert!(!imu.data_available());
        assert!(!imu.accelerometer().has_new_data());
    }

    #[test]
    fn test_calibration_mask_is_read_modify_write() {
        let (mut imu, hub) = driver();
        imu.initialize().unwrap();
        imu.dynamic_calibration_enable(CalSel::Accel).unwrap();
        imu.dynamic_calibration_enable(CalSel::Mag).unwrap();
        assert_eq!(imu.get_dynamic_calibration().unwrap(), 0x05);
        imu.dynamic_calibration_disable(CalSel::Accel).unwrap();
        assert_eq!(imu.get_dynamic_calibration().unwrap(), 0x04);
        assert!(hub.calls().contains(&HubCall::SetCalConfig(0x04)));
    }

    #[test]
    fn test_system_orientation_writes_frs() {
        let (mut imu, hub) = driver();
        imu.initialize().unwrap();
        imu.set_system_orientation(1.0, 0.0, 0.0, 0.0).unwrap();
        let words = hub.frs_record(FrsId::SYSTEM_ORIENTATION).unwrap();
        assert_eq!(words, quaternion_to_frs_words(1.0, 0.0, 0.0, 0.0).to_vec());
        imu.delete_dynamic_calibration().unwrap();
        assert!(hub
            .calls()
            .contains(&HubCall::SetFrs(FrsId::DYNAMIC_CALIBRATION, vec![])));
    }

    #[test]
    fn test_host_reset_requires_initialize() {
        let (imu, _hub) = driver();
        assert!(matches!(imu.hard_reset(), Err(Error::NotInitialized)));
    }
}
