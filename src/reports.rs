// Copyright 2025 Au-Zone Technologies Inc.
// SPDX-License-Identifier: Apache-2.0

//! Report registry.
//!
//! Every sensor report the driver supports has one static
//! [`ReportDescriptor`]: its SH2 id, its bit in the report event groups and
//! the [`ReportShape`] that says how its samples are stored and how its
//! configuration is adjusted on enable. The table is immutable; per-report
//! state (period, last config, last sample) lives in the [`DataStore`]
//! behind the driver's data lock.
//!
//! Applications reach a report through a typed [`Report`] handle obtained
//! from [`Bno08x`](crate::Bno08x), e.g. `imu.rotation_vector().enable(10_000)`.

use crate::{
    callbacks::{CallbackFn, CallbackTarget},
    constants::*,
    driver::Shared,
    error::{Error, Result},
    hub::{SensorConfig, SensorHub, SensorValue},
    types::{
        tare_basis, ActivityClassifier, ActivityEnable, CircleDetector, Euler, GyroIntegratedRv,
        MetaData, Quat, RawMems, Sample, SampleCounts, ShakeDetector, StabilityClassifier,
        StepCounter, TapDetector, TareAxis, UncalibratedVector, Vector3,
    },
};
use std::{marker::PhantomData, sync::Arc};

/// Number of reports in the registry
pub const REPORT_COUNT: usize = 22;

/// Every report enable bit
pub const ALL_REPORT_BITS: u32 = (1 << REPORT_COUNT) - 1;

/// How samples of a report are stored and how its feature config is fixed
/// up before it is sent
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ReportShape {
    Vector,
    Uncalibrated,
    Rotation,
    GyroIntegrated,
    Tap,
    Steps,
    Stability,
    Activity,
    Shake,
    Circle,
    Raw,
}

impl ReportShape {
    /// Fold `sample` into the stored one. Circle counts accumulate, every
    /// other report keeps only its latest sample.
    pub(crate) fn store(self, slot: &mut Option<Sample>, sample: Sample) {
        if let (ReportShape::Circle, Some(Sample::Circle(prev)), Sample::Circle(new)) =
            (self, slot.as_mut(), &sample)
        {
            prev.count = prev.count.wrapping_add(new.count);
            prev.accuracy = new.accuracy;
            return;
        }
        *slot = Some(sample);
    }

    /// Settings the hub needs before it produces any report of this shape
    pub(crate) fn adjust_config(self, config: &mut SensorConfig) {
        match self {
            ReportShape::Tap | ReportShape::Shake => {
                config.change_sensitivity_enabled = true;
                config.change_sensitivity = 0;
            }
            ReportShape::Circle => {
                config.change_sensitivity_enabled = true;
                config.change_sensitivity_relative = true;
                config.change_sensitivity = 0;
            }
            ReportShape::Activity => {
                if config.sensor_specific == 0 {
                    config.sensor_specific = ActivityEnable::ALL;
                }
            }
            _ => {}
        }
    }
}

/// Static description of one report
#[derive(Debug)]
pub struct ReportDescriptor {
    pub id: u8,
    /// Bit in the report enable and report data event groups
    pub bit: u32,
    pub name: &'static str,
    pub shape: ReportShape,
}

impl ReportDescriptor {
    pub(crate) fn index(&self) -> usize {
        self.bit.trailing_zeros() as usize
    }
}

macro_rules! reports {
    ($($konst:ident = ($bit:expr, $id:expr, $name:expr, $shape:ident);)*) => {
        $(
            pub static $konst: ReportDescriptor = ReportDescriptor {
                id: $id,
                bit: 1 << $bit,
                name: $name,
                shape: ReportShape::$shape,
            };
        )*

        /// The registry, in enable-bit order
        pub static REPORTS: [&ReportDescriptor; REPORT_COUNT] = [$(&$konst),*];
    };
}

reports! {
    ROTATION_VECTOR = (0, SENSOR_REPORTID_ROTATION_VECTOR, "rotation vector", Rotation);
    GAME_ROTATION_VECTOR = (1, SENSOR_REPORTID_ROTATION_VECTOR_GAME, "game rotation vector", Rotation);
    ARVR_STABILIZED_RV = (2, SENSOR_REPORTID_ARVR_ROTATION_VECTOR, "ARVR stabilized rotation vector", Rotation);
    ARVR_STABILIZED_GAME_RV = (3, SENSOR_REPORTID_ARVR_ROTATION_VECTOR_GAME, "ARVR stabilized game rotation vector", Rotation);
    GYRO_INTEGRATED_RV = (4, SENSOR_REPORTID_GYRO_INTEGRATED_RV, "gyro integrated rotation vector", GyroIntegrated);
    GEOMAGNETIC_RV = (5, SENSOR_REPORTID_ROTATION_VECTOR_GEOMAGNETIC, "geomagnetic rotation vector", Rotation);
    ACCELEROMETER = (6, SENSOR_REPORTID_ACCELEROMETER, "accelerometer", Vector);
    LINEAR_ACCELEROMETER = (7, SENSOR_REPORTID_LINEAR_ACCEL, "linear accelerometer", Vector);
    GRAVITY = (8, SENSOR_REPORTID_GRAVITY, "gravity", Vector);
    CAL_GYRO = (9, SENSOR_REPORTID_GYROSCOPE, "calibrated gyroscope", Vector);
    UNCAL_GYRO = (10, SENSOR_REPORTID_GYROSCOPE_UNCALIB, "uncalibrated gyroscope", Uncalibrated);
    CAL_MAGNETOMETER = (11, SENSOR_REPORTID_MAGNETIC_FIELD, "calibrated magnetometer", Vector);
    UNCAL_MAGNETOMETER = (12, SENSOR_REPORTID_MAGNETIC_FIELD_UNCALIB, "uncalibrated magnetometer", Uncalibrated);
    TAP_DETECTOR = (13, SENSOR_REPORTID_TAP_DETECTOR, "tap detector", Tap);
    STEP_COUNTER = (14, SENSOR_REPORTID_STEP_COUNTER, "step counter", Steps);
    STABILITY_CLASSIFIER = (15, SENSOR_REPORTID_STABILITY_CLASSIFIER, "stability classifier", Stability);
    ACTIVITY_CLASSIFIER = (16, SENSOR_REPORTID_ACTIVITY_CLASSIFIER, "activity classifier", Activity);
    SHAKE_DETECTOR = (17, SENSOR_REPORTID_SHAKE_DETECTOR, "shake detector", Shake);
    RAW_ACCELEROMETER = (18, SENSOR_REPORTID_RAW_ACCELEROMETER, "raw accelerometer", Raw);
    RAW_GYRO = (19, SENSOR_REPORTID_RAW_GYROSCOPE, "raw gyroscope", Raw);
    RAW_MAGNETOMETER = (20, SENSOR_REPORTID_RAW_MAGNETOMETER, "raw magnetometer", Raw);
    CIRCLE_DETECTOR = (21, SENSOR_REPORTID_CIRCLE_DETECTOR, "circle detector", Circle);
}

/// Registry entry for `report_id`
pub fn descriptor(report_id: u8) -> Option<&'static ReportDescriptor> {
    REPORTS.iter().copied().find(|d| d.id == report_id)
}

/// Per-report state kept by the driver
#[derive(Debug, Clone, Copy, Default)]
pub(crate) struct ReportSlot {
    pub period_us: u32,
    pub config: SensorConfig,
    pub sample: Option<Sample>,
    pub timestamp_us: u64,
}

/// Report data and the enabled-report set, guarded by the data lock
#[derive(Debug)]
pub(crate) struct DataStore {
    slots: [ReportSlot; REPORT_COUNT],
    /// Enabled report ids in enable order, no duplicates
    enabled: Vec<u8>,
    most_recent: u8,
}

impl Default for DataStore {
    fn default() -> Self {
        Self {
            slots: [ReportSlot::default(); REPORT_COUNT],
            enabled: Vec::with_capacity(REPORT_COUNT),
            most_recent: 0,
        }
    }
}

impl DataStore {
    pub fn slot(&self, desc: &ReportDescriptor) -> &ReportSlot {
        &self.slots[desc.index()]
    }

    pub fn store(&mut self, desc: &ReportDescriptor, value: &SensorValue) {
        let slot = &mut self.slots[desc.index()];
        desc.shape.store(&mut slot.sample, value.sample);
        slot.timestamp_us = value.timestamp_us;
    }

    pub fn set_most_recent(&mut self, report_id: u8) {
        self.most_recent = report_id;
    }

    pub fn mark_enabled(&mut self, desc: &ReportDescriptor, period_us: u32, config: SensorConfig) {
        let newly_enabled = !self.enabled.contains(&desc.id);
        let slot = &mut self.slots[desc.index()];
        slot.period_us = period_us;
        slot.config = config;
        if newly_enabled {
            if desc.shape == ReportShape::Circle {
                slot.sample = None;
            }
            self.enabled.push(desc.id);
        }
    }

    pub fn mark_disabled(&mut self, desc: &ReportDescriptor) {
        self.slots[desc.index()].period_us = 0;
        self.enabled.retain(|&id| id != desc.id);
    }

    /// Forget every enabled report, as after a host reset
    pub fn clear_enabled(&mut self) {
        for id in self.enabled.drain(..) {
            if let Some(desc) = descriptor(id) {
                self.slots[desc.index()].period_us = 0;
            }
        }
    }

    pub fn enabled_ids(&self) -> Vec<u8> {
        self.enabled.clone()
    }

    /// Enabled reports with the period and config they were enabled with
    pub fn enabled_snapshot(&self) -> Vec<(&'static ReportDescriptor, u32, SensorConfig)> {
        self.enabled
            .iter()
            .filter_map(|&id| descriptor(id))
            .map(|desc| {
                let slot = &self.slots[desc.index()];
                (desc, slot.period_us, slot.config)
            })
            .collect()
    }

    pub fn most_recent(&self) -> u8 {
        self.most_recent
    }
}

/// Typed view of a stored [`Sample`]
pub trait SampleKind: Copy + Default + Send + 'static {
    fn from_sample(sample: &Sample) -> Option<Self>;
}

macro_rules! sample_kind {
    ($($ty:ty => $variant:ident),* $(,)?) => {
        $(
            impl SampleKind for $ty {
                fn from_sample(sample: &Sample) -> Option<Self> {
                    match sample {
                        Sample::$variant(v) => Some(*v),
                        _ => None,
                    }
                }
            }
        )*
    };
}

sample_kind! {
    Vector3 => Vector,
    UncalibratedVector => Uncalibrated,
    Quat => Rotation,
    GyroIntegratedRv => GyroIntegrated,
    TapDetector => Tap,
    StepCounter => Steps,
    StabilityClassifier => Stability,
    ActivityClassifier => Activity,
    ShakeDetector => Shake,
    CircleDetector => Circle,
    RawMems => Raw,
}

/// Handle to one report of a [`Bno08x`](crate::Bno08x)
pub struct Report<'a, H: SensorHub, T> {
    shared: &'a Shared<H>,
    desc: &'static ReportDescriptor,
    _kind: PhantomData<fn() -> T>,
}

impl<'a, H: SensorHub, T: SampleKind> Report<'a, H, T> {
    pub(crate) fn new(shared: &'a Shared<H>, desc: &'static ReportDescriptor) -> Self {
        Self {
            shared,
            desc,
            _kind: PhantomData,
        }
    }

    pub fn id(&self) -> u8 {
        self.desc.id
    }

    pub fn name(&self) -> &'static str {
        self.desc.name
    }

    /// Enable the report with a sample period of `period_us` microseconds
    pub fn enable(&self, period_us: u32) -> Result<()> {
        self.enable_with(period_us, SensorConfig::default())
    }

    /// Enable the report with a custom feature configuration. The report
    /// interval in `config` is replaced by `period_us`.
    pub fn enable_with(&self, period_us: u32, config: SensorConfig) -> Result<()> {
        self.shared.enable_report(self.desc, period_us, config)
    }

    /// Disable the report. Disabling a disabled report is a no-op.
    pub fn disable(&self) -> Result<()> {
        self.shared.disable_report(self.desc)
    }

    pub fn is_enabled(&self) -> bool {
        self.shared.is_report_enabled(self.desc)
    }

    /// Period the report was last enabled with, 0 while disabled
    pub fn period_us(&self) -> u32 {
        self.shared.data.lock().slot(self.desc).period_us
    }

    /// True once per new sample since the last call
    pub fn has_new_data(&self) -> bool {
        self.shared.take_new_data(self.desc)
    }

    /// Latest sample, or the default value before the first one arrives
    pub fn get(&self) -> T {
        self.shared
            .data
            .lock()
            .slot(self.desc)
            .sample
            .as_ref()
            .and_then(T::from_sample)
            .unwrap_or_default()
    }

    /// Host timestamp of the latest sample in microseconds
    pub fn timestamp_us(&self) -> u64 {
        self.shared.data.lock().slot(self.desc).timestamp_us
    }

    /// Run `cb` on the callback worker whenever this report has new data
    pub fn register_cb<F>(&self, cb: F) -> Result<()>
    where
        F: Fn() + Send + Sync + 'static,
    {
        self.shared.register_callback(
            CallbackTarget::Report(self.desc.id),
            CallbackFn::Void(Arc::new(cb)),
        )
    }

    /// Like [`register_cb`](Self::register_cb), with the report id passed in
    pub fn register_cb_with_id<F>(&self, cb: F) -> Result<()>
    where
        F: Fn(u8) + Send + Sync + 'static,
    {
        self.shared.register_callback(
            CallbackTarget::Report(self.desc.id),
            CallbackFn::WithId(Arc::new(cb)),
        )
    }

    /// Ask the hub to send any batched samples now
    pub fn flush(&self) -> Result<()> {
        let id = self.desc.id;
        self.shared.with_hub(|hub| hub.flush(id))
    }

    pub fn get_sample_counts(&self) -> Result<SampleCounts> {
        let id = self.desc.id;
        self.shared.with_hub(|hub| hub.get_counts(id))
    }

    pub fn clear_sample_counts(&self) -> Result<()> {
        let id = self.desc.id;
        self.shared.with_hub(|hub| hub.clear_counts(id))
    }

    /// Read the report's META record
    pub fn get_meta_data(&self) -> Result<MetaData> {
        let id = self.desc.id;
        self.shared.with_hub(|hub| hub.get_metadata(id))
    }

    fn tare_now(&self, axes: TareAxis) -> Result<()> {
        let basis = tare_basis(self.desc.id).ok_or(Error::Unsupported(self.desc.id))?;
        self.shared.with_hub(|hub| hub.tare_now(axes.mask(), basis))
    }
}

impl<'a, H: SensorHub> Report<'a, H, Quat> {
    /// Latest orientation as Euler angles
    pub fn euler(&self, in_degrees: bool) -> Euler {
        self.get().to_euler(in_degrees)
    }

    /// Zero `axes` using this rotation vector as the basis
    pub fn tare(&self, axes: TareAxis) -> Result<()> {
        self.tare_now(axes)
    }

    /// Store the current tare in flash
    pub fn tare_persist(&self) -> Result<()> {
        self.shared.with_hub(|hub| hub.persist_tare())
    }

    pub fn tare_clear(&self) -> Result<()> {
        self.shared.with_hub(|hub| hub.clear_tare())
    }
}

impl<'a, H: SensorHub> Report<'a, H, GyroIntegratedRv> {
    pub fn euler(&self, in_degrees: bool) -> Euler {
        self.get().quat.to_euler(in_degrees)
    }

    pub fn tare(&self, axes: TareAxis) -> Result<()> {
        self.tare_now(axes)
    }

    pub fn tare_persist(&self) -> Result<()> {
        self.shared.with_hub(|hub| hub.persist_tare())
    }

    pub fn tare_clear(&self) -> Result<()> {
        self.shared.with_hub(|hub| hub.clear_tare())
    }
}

impl<'a, H: SensorHub> Report<'a, H, ActivityClassifier> {
    /// Enable the classifier for the activities in `activities`
    /// ([`ActivityEnable`] bits)
    pub fn enable_activities(&self, period_us: u32, activities: u32) -> Result<()> {
        let config = SensorConfig {
            sensor_specific: activities,
            ..Default::default()
        };
        self.enable_with(period_us, config)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::Accuracy;
    use std::collections::HashSet;

    fn value(id: u8, sample: Sample) -> SensorValue {
        SensorValue {
            sensor_id: id,
            sequence: 0,
            status: 3,
            timestamp_us: 1234,
            delay_us: 0,
            sample,
        }
    }

    #[test]
    fn test_registry_ids_and_bits_are_unique() {
        let ids: HashSet<u8> = REPORTS.iter().map(|d| d.id).collect();
        assert_eq!(ids.len(), REPORT_COUNT);
        for (i, desc) in REPORTS.iter().enumerate() {
            assert_eq!(desc.bit, 1 << i, "{}", desc.name);
            assert_eq!(desc.index(), i);
            assert!(report_len(desc.id).is_some(), "{}", desc.name);
        }
        assert_eq!(
            REPORTS.iter().fold(0, |acc, d| acc | d.bit),
            ALL_REPORT_BITS
        );
    }

    #[test]
    fn test_descriptor_lookup() {
        let desc = descriptor(SENSOR_REPORTID_CIRCLE_DETECTOR).unwrap();
        assert_eq!(desc.shape, ReportShape::Circle);
        assert!(descriptor(0x7F).is_none());
    }

    #[test]
    fn test_circle_counts_accumulate() {
        let mut store = DataStore::default();
        let circle = |count| {
            value(
                SENSOR_REPORTID_CIRCLE_DETECTOR,
                Sample::Circle(CircleDetector {
                    count,
                    accuracy: Accuracy::High,
                }),
            )
        };
        store.store(&CIRCLE_DETECTOR, &circle(1));
        store.store(&CIRCLE_DETECTOR, &circle(2));
        let got = store
            .slot(&CIRCLE_DETECTOR)
            .sample
            .as_ref()
            .and_then(CircleDetector::from_sample)
            .unwrap();
        assert_eq!(got.count, 3);

        // Re-enabling starts a fresh count
        store.mark_enabled(&CIRCLE_DETECTOR, 100_000, SensorConfig::default());
        assert!(store.slot(&CIRCLE_DETECTOR).sample.is_none());
    }

    #[test]
    fn test_latest_sample_replaces_previous() {
        let mut store = DataStore::default();
        let accel = |x| {
            value(
                SENSOR_REPORTID_ACCELEROMETER,
                Sample::Vector(Vector3 {
                    x,
                    ..Default::default()
                }),
            )
        };
        store.store(&ACCELEROMETER, &accel(1.0));
        store.store(&ACCELEROMETER, &accel(2.0));
        let got = store
            .slot(&ACCELEROMETER)
            .sample
            .as_ref()
            .and_then(Vector3::from_sample)
            .unwrap();
        assert_eq!(got.x, 2.0);
        assert_eq!(store.most_recent(), 0);
        assert_eq!(store.slot(&ACCELEROMETER).timestamp_us, 1234);
    }

    #[test]
    fn test_enabled_set_has_no_duplicates() {
        let mut store = DataStore::default();
        store.mark_enabled(&GRAVITY, 10_000, SensorConfig::default());
        store.mark_enabled(&ACCELEROMETER, 5_000, SensorConfig::default());
        store.mark_enabled(&GRAVITY, 20_000, SensorConfig::default());
        assert_eq!(
            store.enabled_ids(),
            vec![SENSOR_REPORTID_GRAVITY, SENSOR_REPORTID_ACCELEROMETER]
        );
        assert_eq!(store.slot(&GRAVITY).period_us, 20_000);

        store.mark_disabled(&GRAVITY);
        assert_eq!(store.enabled_ids(), vec![SENSOR_REPORTID_ACCELEROMETER]);
        assert_eq!(store.slot(&GRAVITY).period_us, 0);

        store.clear_enabled();
        assert!(store.enabled_ids().is_empty());
        assert_eq!(store.slot(&ACCELEROMETER).period_us, 0);
    }

    #[test]
    fn test_snapshot_keeps_period_and_config() {
        let mut store = DataStore::default();
        let cfg = SensorConfig {
            batch_interval_us: 50,
            report_interval_us: 2500,
            ..Default::default()
        };
        store.mark_enabled(&ROTATION_VECTOR, 2500, cfg);
        let snap = store.enabled_snapshot();
        assert_eq!(snap.len(), 1);
        assert_eq!(snap[0].0.id, SENSOR_REPORTID_ROTATION_VECTOR);
        assert_eq!((snap[0].1, snap[0].2), (2500, cfg));
    }

    #[test]
    fn test_shape_adjusts_config() {
        let mut tap = SensorConfig {
            change_sensitivity: 7,
            ..Default::default()
        };
        ReportShape::Tap.adjust_config(&mut tap);
        assert!(tap.change_sensitivity_enabled);
        assert_eq!(tap.change_sensitivity, 0);

        let mut activity = SensorConfig::default();
        ReportShape::Activity.adjust_config(&mut activity);
        assert_eq!(activity.sensor_specific, ActivityEnable::ALL);

        let mut walking = SensorConfig {
            sensor_specific: ActivityEnable::WALKING,
            ..Default::default()
        };
        ReportShape::Activity.adjust_config(&mut walking);
        assert_eq!(walking.sensor_specific, ActivityEnable::WALKING);

        let mut circle = SensorConfig::default();
        ReportShape::Circle.adjust_config(&mut circle);
        assert!(circle.change_sensitivity_enabled && circle.change_sensitivity_relative);

        let mut accel = SensorConfig::default();
        ReportShape::Vector.adjust_config(&mut accel);
        assert_eq!(accel, SensorConfig::default());
    }

    #[test]
    fn test_sample_kind_rejects_other_variants() {
        let sample = Sample::Tap(TapDetector::default());
        assert!(Vector3::from_sample(&sample).is_none());
        assert!(TapDetector::from_sample(&sample).is_some());
    }
}
