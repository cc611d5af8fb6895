// Copyright 2025 Au-Zone Technologies Inc.
// SPDX-License-Identifier: Apache-2.0

//! Sample and device types returned by the driver.
//!
//! Every sample type is `Copy` and carries the accuracy the hub reported
//! with it where the report has one. Getters in [`crate::reports`] return
//! these by value.

/// Radians to degrees
pub const RAD_2_DEG: f32 = 180.0 / std::f32::consts::PI;

/// Accuracy status reported in the low two bits of every report status byte
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum Accuracy {
    Unreliable,
    Low,
    Med,
    High,
    #[default]
    Undefined,
}

impl Accuracy {
    pub fn from_status(status: u8) -> Self {
        match status & 0x03 {
            0 => Accuracy::Unreliable,
            1 => Accuracy::Low,
            2 => Accuracy::Med,
            _ => Accuracy::High,
        }
    }
}

/// Reason the hub gives for its most recent reset
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum ResetReason {
    #[default]
    Undefined,
    /// Power-on reset
    Por,
    /// Internal reset
    IntRst,
    /// Watchdog timeout
    Wtd,
    /// External reset (RST line or reset command)
    ExtRst,
    Other,
}

impl From<u8> for ResetReason {
    fn from(cause: u8) -> Self {
        match cause {
            1 => ResetReason::Por,
            2 => ResetReason::IntRst,
            3 => ResetReason::Wtd,
            4 => ResetReason::ExtRst,
            5 => ResetReason::Other,
            _ => ResetReason::Undefined,
        }
    }
}

/// Sensor selection for dynamic calibration commands
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CalSel {
    Accel,
    Gyro,
    Mag,
    Planar,
    All,
}

impl CalSel {
    /// Bitmask as used by the ME calibration command (accel, gyro, mag, planar)
    pub fn mask(self) -> u8 {
        match self {
            CalSel::Accel => 0x01,
            CalSel::Gyro => 0x02,
            CalSel::Mag => 0x04,
            CalSel::Planar => 0x08,
            CalSel::All => 0x0F,
        }
    }
}

/// Axes zeroed by a tare
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TareAxis {
    /// Tare all three axes
    All,
    /// Tare heading only
    Z,
}

impl TareAxis {
    pub fn mask(self) -> u8 {
        match self {
            TareAxis::All => 0x07,
            TareAxis::Z => 0x04,
        }
    }
}

/// Rotation vector a tare is computed from
pub(crate) fn tare_basis(report_id: u8) -> Option<u8> {
    use crate::constants::*;
    match report_id {
        SENSOR_REPORTID_ROTATION_VECTOR => Some(0),
        SENSOR_REPORTID_ROTATION_VECTOR_GAME => Some(1),
        SENSOR_REPORTID_ROTATION_VECTOR_GEOMAGNETIC => Some(2),
        SENSOR_REPORTID_GYRO_INTEGRATED_RV => Some(3),
        SENSOR_REPORTID_ARVR_ROTATION_VECTOR => Some(4),
        SENSOR_REPORTID_ARVR_ROTATION_VECTOR_GAME => Some(5),
        _ => None,
    }
}

/// Unit quaternion with optional heading accuracy estimate
#[derive(Debug, Clone, Copy, PartialEq, Default)]
pub struct Quat {
    pub real: f32,
    pub i: f32,
    pub j: f32,
    pub k: f32,
    /// Heading accuracy estimate in radians, zero when not reported
    pub rad_accuracy: f32,
    pub accuracy: Accuracy,
}

impl Quat {
    /// Convert to Euler angles (roll, pitch, yaw) in radians or degrees.
    pub fn to_euler(&self, in_degrees: bool) -> Euler {
        let (r, i, j, k) = (self.real, self.i, self.j, self.k);

        let x = (2.0 * (r * i + j * k)).atan2(1.0 - 2.0 * (i * i + j * j));
        let sinp = (2.0 * (r * j - k * i)).clamp(-1.0, 1.0);
        let y = sinp.asin();
        let z = (2.0 * (r * k + i * j)).atan2(1.0 - 2.0 * (j * j + k * k));

        let scale = if in_degrees { RAD_2_DEG } else { 1.0 };
        Euler {
            x: x * scale,
            y: y * scale,
            z: z * scale,
            rad_accuracy: self.rad_accuracy * scale,
            accuracy: self.accuracy,
        }
    }
}

/// Euler angles derived from a rotation vector
#[derive(Debug, Clone, Copy, PartialEq, Default)]
pub struct Euler {
    pub x: f32,
    pub y: f32,
    pub z: f32,
    pub rad_accuracy: f32,
    pub accuracy: Accuracy,
}

/// Three-axis reading: m/s^2, rad/s or uTesla depending on the report
#[derive(Debug, Clone, Copy, PartialEq, Default)]
pub struct Vector3 {
    pub x: f32,
    pub y: f32,
    pub z: f32,
    pub accuracy: Accuracy,
}

/// Plain three-axis value (bias, angular velocity)
#[derive(Debug, Clone, Copy, PartialEq, Default)]
pub struct Axes {
    pub x: f32,
    pub y: f32,
    pub z: f32,
}

/// Uncalibrated gyroscope or magnetometer reading with its bias estimate
#[derive(Debug, Clone, Copy, PartialEq, Default)]
pub struct UncalibratedVector {
    pub value: Vector3,
    pub bias: Axes,
}

/// Gyro-integrated rotation vector with angular velocity (rad/s)
#[derive(Debug, Clone, Copy, PartialEq, Default)]
pub struct GyroIntegratedRv {
    pub quat: Quat,
    pub ang_vel: Axes,
}

/// Tap detector flags
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct TapDetector {
    pub flags: u8,
    pub accuracy: Accuracy,
}

impl TapDetector {
    pub fn x(&self) -> bool {
        self.flags & (1 << 0) != 0
    }
    pub fn x_positive(&self) -> bool {
        self.flags & (1 << 1) != 0
    }
    pub fn y(&self) -> bool {
        self.flags & (1 << 2) != 0
    }
    pub fn y_positive(&self) -> bool {
        self.flags & (1 << 3) != 0
    }
    pub fn z(&self) -> bool {
        self.flags & (1 << 4) != 0
    }
    pub fn z_positive(&self) -> bool {
        self.flags & (1 << 5) != 0
    }
    pub fn double_tap(&self) -> bool {
        self.flags & (1 << 6) != 0
    }
}

/// Shake detector axis flags
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct ShakeDetector {
    pub flags: u16,
    pub accuracy: Accuracy,
}

impl ShakeDetector {
    pub fn x(&self) -> bool {
        self.flags & (1 << 0) != 0
    }
    pub fn y(&self) -> bool {
        self.flags & (1 << 1) != 0
    }
    pub fn z(&self) -> bool {
        self.flags & (1 << 2) != 0
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct StepCounter {
    /// Latency of the step detection in microseconds
    pub latency_us: u32,
    pub steps: u16,
    pub accuracy: Accuracy,
}

/// Raw ADC counts from one of the MEMS sensors
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct RawMems {
    pub x: i16,
    pub y: i16,
    pub z: i16,
    /// Raw gyroscope only
    pub temperature: i16,
    pub timestamp_us: u32,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum Stability {
    #[default]
    Unknown,
    OnTable,
    Stationary,
    Stable,
    Motion,
    Reserved,
    Undefined,
}

impl From<u8> for Stability {
    fn from(v: u8) -> Self {
        match v {
            0 => Stability::Unknown,
            1 => Stability::OnTable,
            2 => Stability::Stationary,
            3 => Stability::Stable,
            4 => Stability::Motion,
            5 => Stability::Reserved,
            _ => Stability::Undefined,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct StabilityClassifier {
    pub stability: Stability,
    pub accuracy: Accuracy,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum Activity {
    #[default]
    Unknown,
    InVehicle,
    OnBicycle,
    OnFoot,
    Still,
    Tilting,
    Walking,
    Running,
    OnStairs,
    Undefined,
}

impl From<u8> for Activity {
    fn from(v: u8) -> Self {
        match v {
            0 => Activity::Unknown,
            1 => Activity::InVehicle,
            2 => Activity::OnBicycle,
            3 => Activity::OnFoot,
            4 => Activity::Still,
            5 => Activity::Tilting,
            6 => Activity::Walking,
            7 => Activity::Running,
            8 => Activity::OnStairs,
            _ => Activity::Undefined,
        }
    }
}

/// Activity enable mask written to the classifier's sensor-specific config
pub struct ActivityEnable;

impl ActivityEnable {
    pub const UNKNOWN: u32 = 1 << 0;
    pub const IN_VEHICLE: u32 = 1 << 1;
    pub const ON_BICYCLE: u32 = 1 << 2;
    pub const ON_FOOT: u32 = 1 << 3;
    pub const STILL: u32 = 1 << 4;
    pub const TILTING: u32 = 1 << 5;
    pub const WALKING: u32 = 1 << 6;
    pub const RUNNING: u32 = 1 << 7;
    pub const ON_STAIRS: u32 = 1 << 8;
    pub const ALL: u32 = 0x1FF;
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct ActivityClassifier {
    pub page: u8,
    pub last_page: bool,
    pub most_likely: Activity,
    /// Confidence per activity, 0-100, indexed like [`Activity`]
    pub confidence: [u8; 10],
    pub accuracy: Accuracy,
}

/// Running count of circles detected since the report was enabled
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct CircleDetector {
    pub count: u16,
    pub accuracy: Accuracy,
}

/// Latest decoded value of any report
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum Sample {
    Vector(Vector3),
    Uncalibrated(UncalibratedVector),
    Rotation(Quat),
    GyroIntegrated(GyroIntegratedRv),
    Tap(TapDetector),
    Steps(StepCounter),
    Stability(StabilityClassifier),
    Activity(ActivityClassifier),
    Shake(ShakeDetector),
    Circle(CircleDetector),
    Raw(RawMems),
}

/// One product id record
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct ProductId {
    pub reset_cause: u8,
    pub sw_version_major: u8,
    pub sw_version_minor: u8,
    pub sw_part_number: u32,
    pub sw_build_number: u32,
    pub sw_version_patch: u16,
}

/// Sensor counters kept by the hub
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct SampleCounts {
    /// Samples offered by the physical sensor
    pub offered: u32,
    /// Samples offered while the report was on
    pub on: u32,
    /// Samples accepted by the hub
    pub accepted: u32,
    /// Samples the hub attempted to forward
    pub attempted: u32,
}

/// Contents of a sensor META record
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct MetaData {
    pub me_version: u8,
    pub mh_version: u8,
    pub sh_version: u8,
    pub range: u32,
    pub resolution: u32,
    pub revision: u16,
    /// Power in mA, Q point 10
    pub power_ma: u16,
    pub min_period_us: u32,
    pub max_period_us: u32,
    pub fifo_reserved: u32,
    pub fifo_max: u32,
    pub batch_buffer_bytes: u32,
    pub q_point_1: u16,
    pub q_point_2: u16,
    pub q_point_3: u16,
    pub vendor_id: String,
    pub sensor_specific: Vec<u8>,
}

/// Well-known FRS record ids
pub struct FrsId;

impl FrsId {
    pub const STATIC_CALIBRATION_AGM: u16 = 0x7979;
    pub const NOMINAL_CALIBRATION: u16 = 0x4D4D;
    pub const STATIC_CALIBRATION_SRA: u16 = 0x8A8A;
    pub const NOMINAL_CALIBRATION_SRA: u16 = 0x4E4E;
    pub const DYNAMIC_CALIBRATION: u16 = 0x1F1F;
    pub const ME_POWER_MGMT: u16 = 0xD3E2;
    pub const SYSTEM_ORIENTATION: u16 = 0x2D3E;
    pub const ACCEL_ORIENTATION: u16 = 0x2D41;
    pub const SCREEN_ACCEL_ORIENTATION: u16 = 0x2D43;
    pub const GYROSCOPE_ORIENTATION: u16 = 0x2D46;
    pub const MAGNETOMETER_ORIENTATION: u16 = 0x2D4C;
    pub const ARVR_STABILIZATION_RV: u16 = 0x3E2D;
    pub const ARVR_STABILIZATION_GRV: u16 = 0x3E2E;
    pub const TAP_DETECT_CONFIG: u16 = 0xC269;
    pub const SIG_MOTION_DETECT_CONFIG: u16 = 0xC274;
    pub const SHAKE_DETECT_CONFIG: u16 = 0x7D7D;
    pub const MAX_FUSION_PERIOD: u16 = 0xD7D7;
    pub const SERIAL_NUMBER: u16 = 0x4B4B;
    pub const ES_PRESSURE_CAL: u16 = 0x39AF;
    pub const ES_TEMPERATURE_CAL: u16 = 0x4D20;
    pub const ES_HUMIDITY_CAL: u16 = 0x1AC9;
    pub const ES_AMBIENT_LIGHT_CAL: u16 = 0x39B1;
    pub const ES_PROXIMITY_CAL: u16 = 0x4DA2;
    pub const ALS_CAL: u16 = 0xD401;
    pub const PROXIMITY_SENSOR_CAL: u16 = 0xD402;
    pub const PICKUP_DETECTOR_CONFIG: u16 = 0x1B2A;
    pub const FLIP_DETECTOR_CONFIG: u16 = 0xFC94;
    pub const STABILITY_DETECTOR_CONFIG: u16 = 0xED85;
    pub const ACTIVITY_TRACKER_CONFIG: u16 = 0xED88;
    pub const SLEEP_DETECTOR_CONFIG: u16 = 0xED87;
    pub const TILT_DETECTOR_CONFIG: u16 = 0xED89;
    pub const POCKET_DETECTOR_CONFIG: u16 = 0xEF27;
    pub const CIRCLE_DETECTOR_CONFIG: u16 = 0xEE51;
    pub const USER_RECORD: u16 = 0x74B4;
    pub const ME_TIME_SOURCE_SELECT: u16 = 0xD403;
    pub const UART_FORMAT: u16 = 0xA1A1;
    pub const GYRO_INTEGRATED_RV_CONFIG: u16 = 0xA1A2;
    pub const META_RAW_ACCELEROMETER: u16 = 0xE301;
    pub const META_ACCELEROMETER: u16 = 0xE302;
    pub const META_LINEAR_ACCELERATION: u16 = 0xE303;
    pub const META_GRAVITY: u16 = 0xE304;
    pub const META_RAW_GYROSCOPE: u16 = 0xE305;
    pub const META_GYROSCOPE_CALIBRATED: u16 = 0xE306;
    pub const META_GYROSCOPE_UNCALIBRATED: u16 = 0xE307;
    pub const META_RAW_MAGNETOMETER: u16 = 0xE308;
    pub const META_MAGNETIC_FIELD_CALIBRATED: u16 = 0xE309;
    pub const META_MAGNETIC_FIELD_UNCALIBRATED: u16 = 0xE30A;
    pub const META_ROTATION_VECTOR: u16 = 0xE30B;
    pub const META_GAME_ROTATION_VECTOR: u16 = 0xE30C;
    pub const META_GEOMAGNETIC_ROTATION_VECTOR: u16 = 0xE30D;
    pub const META_PRESSURE: u16 = 0xE30E;
    pub const META_AMBIENT_LIGHT: u16 = 0xE30F;
    pub const META_HUMIDITY: u16 = 0xE310;
    pub const META_PROXIMITY: u16 = 0xE311;
    pub const META_TEMPERATURE: u16 = 0xE312;
    pub const META_TAP_DETECTOR: u16 = 0xE313;
    pub const META_STEP_DETECTOR: u16 = 0xE314;
    pub const META_STEP_COUNTER: u16 = 0xE315;
    pub const META_SIGNIFICANT_MOTION: u16 = 0xE316;
    pub const META_STABILITY_CLASSIFIER: u16 = 0xE317;
    pub const META_SHAKE_DETECTOR: u16 = 0xE318;
    pub const META_FLIP_DETECTOR: u16 = 0xE319;
    pub const META_PICKUP_DETECTOR: u16 = 0xE31A;
    pub const META_STABILITY_DETECTOR: u16 = 0xE31B;
    pub const META_PERSONAL_ACTIVITY_CLASSIFIER: u16 = 0xE31C;
    pub const META_SLEEP_DETECTOR: u16 = 0xE31D;
    pub const META_TILT_DETECTOR: u16 = 0xE31E;
    pub const META_POCKET_DETECTOR: u16 = 0xE31F;
    pub const META_CIRCLE_DETECTOR: u16 = 0xE320;
    pub const META_HEART_RATE_MONITOR: u16 = 0xE321;
    pub const META_ARVR_STABILIZED_RV: u16 = 0xE322;
    pub const META_ARVR_STABILIZED_GRV: u16 = 0xE323;
    pub const META_GYRO_INTEGRATED_RV: u16 = 0xE324;
}

#[cfg(test)]
mod tests {
    use super::*;

    fn approx(a: f32, b: f32) -> bool {
        (a - b).abs() < 1e-3
    }

    #[test]
    fn test_identity_quat_to_euler() {
        let q = Quat {
            real: 1.0,
            ..Default::default()
        };
        let e = q.to_euler(true);
        assert!(approx(e.x, 0.0) && approx(e.y, 0.0) && approx(e.z, 0.0));
    }

    #[test]
    fn test_yaw_quat_to_euler() {
        // 90 degrees about Z
        let half = std::f32::consts::FRAC_PI_4;
        let q = Quat {
            real: half.cos(),
            k: half.sin(),
            rad_accuracy: 0.1,
            accuracy: Accuracy::High,
            ..Default::default()
        };
        let deg = q.to_euler(true);
        assert!(approx(deg.z, 90.0), "yaw was {}", deg.z);
        assert!(approx(deg.x, 0.0));
        assert!(approx(deg.rad_accuracy, 0.1 * RAD_2_DEG));
        assert_eq!(deg.accuracy, Accuracy::High);

        let rad = q.to_euler(false);
        assert!(approx(rad.z, std::f32::consts::FRAC_PI_2));
    }

    #[test]
    fn test_pitch_is_clamped_at_gimbal_lock() {
        // Slightly denormalized quaternion would push asin past 1.0
        let half = std::f32::consts::FRAC_PI_4;
        let q = Quat {
            real: half.cos() * 1.001,
            j: half.sin() * 1.001,
            ..Default::default()
        };
        assert!(!q.to_euler(false).y.is_nan());
    }

    #[test]
    fn test_status_bits_to_accuracy() {
        assert_eq!(Accuracy::from_status(0x00), Accuracy::Unreliable);
        assert_eq!(Accuracy::from_status(0xFD), Accuracy::Low);
        assert_eq!(Accuracy::from_status(0x03), Accuracy::High);
    }

    #[test]
    fn test_reset_reason_from_cause() {
        assert_eq!(ResetReason::from(4), ResetReason::ExtRst);
        assert_eq!(ResetReason::from(1), ResetReason::Por);
        assert_eq!(ResetReason::from(0), ResetReason::Undefined);
        assert_eq!(ResetReason::from(42), ResetReason::Undefined);
    }

    #[test]
    fn test_tap_flags() {
        let tap = TapDetector {
            flags: 0b0100_0011,
            accuracy: Accuracy::High,
        };
        assert!(tap.x() && tap.x_positive() && tap.double_tap());
        assert!(!tap.y() && !tap.z());
    }
}
