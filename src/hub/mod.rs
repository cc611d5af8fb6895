// Copyright 2025 Au-Zone Technologies Inc.
// SPDX-License-Identifier: Apache-2.0

//! Sensor hub protocol boundary.
//!
//! [`SensorHub`] is everything the driver asks of the SH2 protocol engine.
//! The engine reports back through a [`HubListener`] handed over in
//! [`SensorHub::open`]. [`Sh2Hub`] is the engine shipped with this crate; it
//! speaks SHTP over any [`Hal`](crate::interface::Hal).
//!
//! Implementations are not thread safe. The driver serializes every call
//! behind its hub lock, and only the service worker calls
//! [`SensorHub::service`].

pub mod decode;
pub mod sh2;

pub use sh2::Sh2Hub;

use crate::{
    constants::{FEATURE_REPORT_LEN, SHUB_REPORT_SET_FEATURE_CMD},
    error::HubError,
    types::{MetaData, ProductId, Sample, SampleCounts},
};
use std::sync::Arc;

/// Largest sensor report the engine hands to the listener
pub const SENSOR_EVENT_MAX_LEN: usize = 16;

/// Asynchronous notifications from the hub
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AsyncEvent {
    /// The hub reset and lost its sensor configuration
    Reset,
    /// An SHTP error list arrived; carries the last error code
    ShtpError(u8),
}

/// One raw sensor input report as framed by the engine
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SensorEvent {
    /// Host time of the sample in microseconds
    pub timestamp_us: u64,
    /// Delay between sample and report, microseconds
    pub delay_us: u64,
    pub report_id: u8,
    pub len: usize,
    pub report: [u8; SENSOR_EVENT_MAX_LEN],
}

impl Default for SensorEvent {
    fn default() -> Self {
        Self {
            timestamp_us: 0,
            delay_us: 0,
            report_id: 0,
            len: 0,
            report: [0; SENSOR_EVENT_MAX_LEN],
        }
    }
}

impl SensorEvent {
    /// Event carrying `bytes`, truncated to [`SENSOR_EVENT_MAX_LEN`]
    pub fn new(report_id: u8, timestamp_us: u64, delay_us: u64, bytes: &[u8]) -> Self {
        let len = bytes.len().min(SENSOR_EVENT_MAX_LEN);
        let mut report = [0; SENSOR_EVENT_MAX_LEN];
        report[..len].copy_from_slice(&bytes[..len]);
        Self {
            timestamp_us,
            delay_us,
            report_id,
            len,
            report,
        }
    }

    pub fn bytes(&self) -> &[u8] {
        &self.report[..self.len]
    }
}

/// A decoded sensor event
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct SensorValue {
    pub sensor_id: u8,
    pub sequence: u8,
    pub status: u8,
    pub timestamp_us: u64,
    pub delay_us: u64,
    pub sample: Sample,
}

/// Feature settings for one sensor report
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct SensorConfig {
    pub change_sensitivity_enabled: bool,
    pub change_sensitivity_relative: bool,
    pub wakeup_enabled: bool,
    pub always_on_enabled: bool,
    pub sniff_enabled: bool,
    pub change_sensitivity: u16,
    pub report_interval_us: u32,
    pub batch_interval_us: u32,
    pub sensor_specific: u32,
}

impl SensorConfig {
    fn flags(&self) -> u8 {
        (self.change_sensitivity_relative as u8)
            | (self.change_sensitivity_enabled as u8) << 1
            | (self.wakeup_enabled as u8) << 2
            | (self.always_on_enabled as u8) << 3
            | (self.sniff_enabled as u8) << 4
    }

    /// Set feature command body for `sensor_id`
    pub fn to_set_feature(&self, sensor_id: u8) -> [u8; FEATURE_REPORT_LEN] {
        let mut body = [0u8; FEATURE_REPORT_LEN];
        body[0] = SHUB_REPORT_SET_FEATURE_CMD;
        body[1] = sensor_id;
        body[2] = self.flags();
        body[3..5].copy_from_slice(&self.change_sensitivity.to_le_bytes());
        body[5..9].copy_from_slice(&self.report_interval_us.to_le_bytes());
        body[9..13].copy_from_slice(&self.batch_interval_us.to_le_bytes());
        body[13..17].copy_from_slice(&self.sensor_specific.to_le_bytes());
        body
    }

    /// Parse a get feature response into `(sensor_id, config)`
    pub fn from_feature_report(msg: &[u8]) -> Option<(u8, SensorConfig)> {
        if msg.len() < FEATURE_REPORT_LEN {
            return None;
        }
        let flags = msg[2];
        let word = |at: usize| u32::from_le_bytes([msg[at], msg[at + 1], msg[at + 2], msg[at + 3]]);
        let cfg = SensorConfig {
            change_sensitivity_relative: flags & 0x01 != 0,
            change_sensitivity_enabled: flags & 0x02 != 0,
            wakeup_enabled: flags & 0x04 != 0,
            always_on_enabled: flags & 0x08 != 0,
            sniff_enabled: flags & 0x10 != 0,
            change_sensitivity: u16::from_le_bytes([msg[3], msg[4]]),
            report_interval_us: word(5),
            batch_interval_us: word(9),
            sensor_specific: word(13),
        };
        Some((msg[1], cfg))
    }
}

/// Receiver of hub notifications. Called from whichever thread is driving
/// the engine, with the hub lock held: implementations must not block.
pub trait HubListener: Send + Sync {
    fn on_async_event(&self, event: AsyncEvent);
    fn on_sensor_event(&self, event: SensorEvent);
}

/// Operations the driver needs from the sensor hub protocol engine
pub trait SensorHub: Send + 'static {
    /// Start talking to the hub. Notifications go to `listener` until
    /// [`close`](SensorHub::close).
    fn open(&mut self, listener: Arc<dyn HubListener>) -> Result<(), HubError>;
    fn close(&mut self);

    /// Process at most one pending packet from the hub
    fn service(&mut self) -> Result<(), HubError>;

    fn set_sensor_config(&mut self, sensor_id: u8, config: &SensorConfig) -> Result<(), HubError>;
    fn get_sensor_config(&mut self, sensor_id: u8) -> Result<SensorConfig, HubError>;
    /// Ask the hub to deliver any batched samples of `sensor_id`
    fn flush(&mut self, sensor_id: u8) -> Result<(), HubError>;

    fn get_prod_ids(&mut self) -> Result<Vec<ProductId>, HubError>;

    /// Toggle the reset line
    fn hard_reset(&mut self) -> Result<(), HubError>;
    /// Reset through the executable channel
    fn soft_reset(&mut self) -> Result<(), HubError>;
    fn on(&mut self) -> Result<(), HubError>;
    fn sleep(&mut self) -> Result<(), HubError>;

    /// Enable motion engine calibration for the sensors in `sensors`
    /// ([`CalSel`](crate::types::CalSel) mask bits)
    fn set_cal_config(&mut self, sensors: u8) -> Result<(), HubError>;
    fn get_cal_config(&mut self) -> Result<u8, HubError>;
    fn save_dcd(&mut self) -> Result<(), HubError>;
    fn set_dcd_auto_save(&mut self, enabled: bool) -> Result<(), HubError>;
    fn clear_dcd_and_reset(&mut self) -> Result<(), HubError>;

    fn get_frs(&mut self, record: u16) -> Result<Vec<u32>, HubError>;
    /// Write `words` to FRS `record`; an empty slice erases it
    fn set_frs(&mut self, record: u16, words: &[u32]) -> Result<(), HubError>;
    fn get_metadata(&mut self, sensor_id: u8) -> Result<MetaData, HubError>;

    fn get_counts(&mut self, sensor_id: u8) -> Result<SampleCounts, HubError>;
    fn clear_counts(&mut self, sensor_id: u8) -> Result<(), HubError>;

    fn tare_now(&mut self, axes: u8, basis: u8) -> Result<(), HubError>;
    fn persist_tare(&mut self) -> Result<(), HubError>;
    fn clear_tare(&mut self) -> Result<(), HubError>;

    /// Turn a raw event into a typed value. Runs on the ingestion worker
    /// without the hub lock.
    fn decode(event: &SensorEvent) -> Result<SensorValue, HubError>
    where
        Self: Sized,
    {
        decode::decode_sensor_event(event)
    }
}
