// Copyright 2025 Au-Zone Technologies Inc.
// SPDX-License-Identifier: Apache-2.0

//! Constants for the BNO08x sensor driver.
//!
//! Protocol constants (SHTP channels, SH2 control report ids, command ids),
//! sensor report ids with their wire lengths, FRS status codes, Q-point
//! values and the timing constants used by the driver.

use std::time::Duration;

/// Buffer sizes
pub const PACKET_SEND_BUF_LEN: usize = 256;
pub const PACKET_RECV_BUF_LEN: usize = 2048;
pub const NUM_CHANNELS: usize = 6;

// =============================================================================
// SHTP Communication Channels
// =============================================================================

/// SHTP command channel
pub const CHANNEL_COMMAND: u8 = 0;
/// Executable channel (reset, on, sleep)
pub const CHANNEL_EXECUTABLE: u8 = 1;
/// Sensor hub control channel
pub const CHANNEL_HUB_CONTROL: u8 = 2;
/// Input sensor reports (non-wake, not gyro-integrated RV)
pub const CHANNEL_SENSOR_REPORTS: u8 = 3;
/// Wake input sensor reports
pub const CHANNEL_WAKE_REPORTS: u8 = 4;
/// Gyro-integrated rotation vector, no common report header
pub const CHANNEL_GYRO_ROTATION: u8 = 5;

// =============================================================================
// Command Channel Responses
// =============================================================================

/// Advertisement response
pub const CMD_RESP_ADVERTISEMENT: u8 = 0;
/// Error list response
pub const CMD_RESP_ERROR_LIST: u8 = 1;

// =============================================================================
// Sensor Hub (SHUB) Protocol Constants
// =============================================================================

pub const SHUB_FLUSH_COMPLETED: u8 = 0xEF;
pub const SHUB_FORCE_FLUSH: u8 = 0xF0;
pub const SHUB_COMMAND_RESP: u8 = 0xF1;
pub const SHUB_COMMAND_REQ: u8 = 0xF2;
pub const SHUB_FRS_READ_RESP: u8 = 0xF3;
pub const SHUB_FRS_READ_REQ: u8 = 0xF4;
pub const SHUB_FRS_WRITE_RESP: u8 = 0xF5;
pub const SHUB_FRS_WRITE_DATA_REQ: u8 = 0xF6;
pub const SHUB_FRS_WRITE_REQ: u8 = 0xF7;
pub const SHUB_PROD_ID_RESP: u8 = 0xF8;
pub const SHUB_PROD_ID_REQ: u8 = 0xF9;
pub const SHUB_TIMESTAMP_REBASE: u8 = 0xFA;
pub const SHUB_BASE_TIMESTAMP: u8 = 0xFB;
pub const SHUB_GET_FEATURE_RESP: u8 = 0xFC;
pub const SHUB_REPORT_SET_FEATURE_CMD: u8 = 0xFD;
pub const SHUB_GET_FEATURE_REQ: u8 = 0xFE;

/// Length of a set/get feature body
pub const FEATURE_REPORT_LEN: usize = 17;
/// Length of a command request body
pub const COMMAND_REQ_LEN: usize = 12;
/// Length of a command response body
pub const COMMAND_RESP_LEN: usize = 16;
/// Length of a product id response
pub const PROD_ID_RESP_LEN: usize = 16;
/// Length of an FRS read response
pub const FRS_READ_RESP_LEN: usize = 16;

// =============================================================================
// Sensor Report IDs (from SH2 Reference Manual)
// =============================================================================

/// Accelerometer (m/s^2 including gravity): Q point 8
pub const SENSOR_REPORTID_ACCELEROMETER: u8 = 0x01;
/// Gyroscope calibrated (rad/s): Q point 9
pub const SENSOR_REPORTID_GYROSCOPE: u8 = 0x02;
/// Magnetic field calibrated (uTesla): Q point 4
pub const SENSOR_REPORTID_MAGNETIC_FIELD: u8 = 0x03;
/// Linear acceleration (m/s^2 minus gravity): Q point 8
pub const SENSOR_REPORTID_LINEAR_ACCEL: u8 = 0x04;
/// Unit quaternion rotation vector, Q point 14, with heading accuracy (radians)
/// Q point 12
pub const SENSOR_REPORTID_ROTATION_VECTOR: u8 = 0x05;
/// Gravity vector: Q point 8
pub const SENSOR_REPORTID_GRAVITY: u8 = 0x06;
/// Gyroscope uncalibrated (rad/s) with bias: Q point 9
pub const SENSOR_REPORTID_GYROSCOPE_UNCALIB: u8 = 0x07;
/// Game rotation vector: Q point 14
pub const SENSOR_REPORTID_ROTATION_VECTOR_GAME: u8 = 0x08;
/// Geomagnetic rotation vector: Q point 14 for quaternion, Q point 12 for
/// heading accuracy
pub const SENSOR_REPORTID_ROTATION_VECTOR_GEOMAGNETIC: u8 = 0x09;
/// Magnetic field uncalibrated (uTesla) with hard iron bias: Q point 4
pub const SENSOR_REPORTID_MAGNETIC_FIELD_UNCALIB: u8 = 0x0F;
pub const SENSOR_REPORTID_TAP_DETECTOR: u8 = 0x10;
pub const SENSOR_REPORTID_STEP_COUNTER: u8 = 0x11;
pub const SENSOR_REPORTID_STABILITY_CLASSIFIER: u8 = 0x13;
pub const SENSOR_REPORTID_RAW_ACCELEROMETER: u8 = 0x14;
pub const SENSOR_REPORTID_RAW_GYROSCOPE: u8 = 0x15;
pub const SENSOR_REPORTID_RAW_MAGNETOMETER: u8 = 0x16;
pub const SENSOR_REPORTID_SHAKE_DETECTOR: u8 = 0x19;
pub const SENSOR_REPORTID_ACTIVITY_CLASSIFIER: u8 = 0x1E;
pub const SENSOR_REPORTID_CIRCLE_DETECTOR: u8 = 0x22;
/// AR/VR stabilized rotation vector: Q point 14, accuracy Q point 12
pub const SENSOR_REPORTID_ARVR_ROTATION_VECTOR: u8 = 0x28;
/// AR/VR stabilized game rotation vector: Q point 14
pub const SENSOR_REPORTID_ARVR_ROTATION_VECTOR_GAME: u8 = 0x29;
/// Gyro-integrated rotation vector: Q point 14, angular velocity Q point 10
pub const SENSOR_REPORTID_GYRO_INTEGRATED_RV: u8 = 0x2A;

/// Length of the common header in front of every sensor report
pub const SENSOR_REPORT_HEADER_LEN: usize = 4;

/// Wire length of a sensor input report, header included.
///
/// Returns `None` for ids the driver does not know how to frame.
pub fn report_len(report_id: u8) -> Option<usize> {
    let len = match report_id {
        SHUB_BASE_TIMESTAMP | SHUB_TIMESTAMP_REBASE => 5,
        SHUB_FLUSH_COMPLETED => 2,
        SENSOR_REPORTID_TAP_DETECTOR => 5,
        SENSOR_REPORTID_STABILITY_CLASSIFIER
        | SENSOR_REPORTID_SHAKE_DETECTOR
        | SENSOR_REPORTID_CIRCLE_DETECTOR => 6,
        SENSOR_REPORTID_ACCELEROMETER
        | SENSOR_REPORTID_GYROSCOPE
        | SENSOR_REPORTID_MAGNETIC_FIELD
        | SENSOR_REPORTID_LINEAR_ACCEL
        | SENSOR_REPORTID_GRAVITY => 10,
        SENSOR_REPORTID_ROTATION_VECTOR_GAME
        | SENSOR_REPORTID_ARVR_ROTATION_VECTOR_GAME
        | SENSOR_REPORTID_STEP_COUNTER => 12,
        SENSOR_REPORTID_ROTATION_VECTOR
        | SENSOR_REPORTID_ROTATION_VECTOR_GEOMAGNETIC
        | SENSOR_REPORTID_ARVR_ROTATION_VECTOR
        | SENSOR_REPORTID_GYRO_INTEGRATED_RV => 14,
        SENSOR_REPORTID_GYROSCOPE_UNCALIB
        | SENSOR_REPORTID_MAGNETIC_FIELD_UNCALIB
        | SENSOR_REPORTID_RAW_ACCELEROMETER
        | SENSOR_REPORTID_RAW_GYROSCOPE
        | SENSOR_REPORTID_RAW_MAGNETOMETER
        | SENSOR_REPORTID_ACTIVITY_CLASSIFIER => 16,
        _ => return None,
    };
    Some(len)
}

// =============================================================================
// FRS (Flash Record System) Status Codes
// =============================================================================

/// Word(s) received
pub const FRS_STATUS_WORD_RECEIVED: u8 = 0;
/// Unrecognized FRS type
pub const FRS_STATUS_UNRECOGNIZED_FRS_TYPE: u8 = 1;
/// Busy
pub const FRS_STATUS_BUSY: u8 = 2;
/// Write completed
pub const FRS_STATUS_WRITE_COMPLETE: u8 = 3;
/// Write mode entered or ready
pub const FRS_STATUS_WRITE_READY: u8 = 4;
/// Write failed
pub const FRS_STATUS_WRITE_FAILED: u8 = 5;
/// Data received while not in write mode
pub const FRS_STATUS_DATA_RECV_NOT_IN_WRITE_MODE: u8 = 6;
/// Invalid length
pub const FRS_STATUS_INVALID_LENGTH: u8 = 7;
/// Record valid (passed internal validation)
pub const FRS_STATUS_RECORD_VALID: u8 = 8;
/// Record invalid (failed internal validation)
pub const FRS_STATUS_RECORD_INVALID: u8 = 9;
/// Device error (DFU flash memory device unavailable)
pub const FRS_STATUS_DEVICE_ERROR: u8 = 10;
/// Record is read only
pub const FRS_STATUS_READONLY: u8 = 11;

// FRS read response status (low nibble of byte 1)
pub const FRS_READ_STATUS_NO_ERROR: u8 = 0;
pub const FRS_READ_STATUS_UNRECOGNIZED: u8 = 1;
pub const FRS_READ_STATUS_BUSY: u8 = 2;
pub const FRS_READ_STATUS_RECORD_COMPLETE: u8 = 3;
pub const FRS_READ_STATUS_OUT_OF_RANGE: u8 = 4;
pub const FRS_READ_STATUS_EMPTY: u8 = 5;
pub const FRS_READ_STATUS_BLOCK_COMPLETE: u8 = 6;
pub const FRS_READ_STATUS_BLOCK_RECORD_COMPLETE: u8 = 7;
pub const FRS_READ_STATUS_DEVICE_ERROR: u8 = 8;

// =============================================================================
// Q-Point Values for Fixed-Point Conversion
// =============================================================================

pub const Q_ACCELEROMETER: usize = 8;
pub const Q_GYROSCOPE: usize = 9;
pub const Q_MAGNETIC_FIELD: usize = 4;
pub const Q_ROTATION_VECTOR: usize = 14;
pub const Q_ROTATION_ACCURACY: usize = 12;
pub const Q_ANGULAR_VELOCITY: usize = 10;
/// System orientation FRS record quaternion
pub const Q_ORIENTATION: usize = 30;

// =============================================================================
// Executable/Device Channel Commands
// =============================================================================

/// Reset command
pub const EXECUTABLE_DEVICE_CMD_RESET: u8 = 1;
/// Power on command
pub const EXECUTABLE_DEVICE_CMD_ON: u8 = 2;
/// Sleep command
pub const EXECUTABLE_DEVICE_CMD_SLEEP: u8 = 3;
/// Reset complete response
pub const EXECUTABLE_DEVICE_RESP_RESET_COMPLETE: u8 = 1;

// =============================================================================
// Sensor Hub Commands (0xF2 requests)
// =============================================================================

pub const SH2_CMD_ERRORS: u8 = 1;
pub const SH2_CMD_COUNTS: u8 = 2;
pub const SH2_CMD_TARE: u8 = 3;
/// Initialize command
pub const SH2_CMD_INITIALIZE: u8 = 4;
pub const SH2_CMD_DCD: u8 = 6;
pub const SH2_CMD_ME_CAL: u8 = 7;
pub const SH2_CMD_DCD_PERIOD_SAVE: u8 = 9;
pub const SH2_CMD_CLEAR_DCD_RESET: u8 = 11;

pub const SH2_COUNTS_GET_COUNTS: u8 = 0;
pub const SH2_COUNTS_CLEAR_COUNTS: u8 = 1;

pub const SH2_TARE_TARE_NOW: u8 = 0;
pub const SH2_TARE_PERSIST_TARE: u8 = 1;
pub const SH2_TARE_SET_REORIENTATION: u8 = 2;

pub const SH2_ME_CAL_CONFIG: u8 = 0;
pub const SH2_ME_CAL_GET: u8 = 1;

/// Unsolicited flag
pub const SH2_INIT_UNSOLICITED: u8 = 0x80;
/// System initialization
pub const SH2_INIT_SYSTEM: u8 = 1;
/// Startup initialization (unsolicited)
pub const SH2_STARTUP_INIT_UNSOLICITED: u8 = SH2_CMD_INITIALIZE | SH2_INIT_UNSOLICITED;

// =============================================================================
// Timing
// =============================================================================

/// Default bound on a HINT wait inside the transport
pub const HOST_INT_TIMEOUT_DEFAULT: Duration = Duration::from_millis(300);
/// RST held low during a hard reset
pub const HARD_RESET_DELAY: Duration = Duration::from_millis(200);
/// Pause after a configuration command before the next one
pub const CMD_EXECUTION_DELAY: Duration = Duration::from_millis(10);
/// Bound on each worker exit acknowledgement during teardown
pub const TASK_DELETE_TIMEOUT: Duration = Duration::from_millis(100);
/// Bound on the wait for a reset notification after a host reset
pub const HOST_RESET_TIMEOUT: Duration = Duration::from_millis(1500);
/// Bound on a request/response exchange with the hub
pub const HUB_RESPONSE_TIMEOUT: Duration = Duration::from_millis(2000);

/// Default and maximum SCLK frequency
pub const SCLK_DEFAULT_SPEED_HZ: u32 = 2_000_000;
pub const SCLK_MAX_SPEED_HZ: u32 = 3_000_000;

// =============================================================================
// Helper Functions
// =============================================================================

/// Convert Q-point fixed-point value to f32
#[inline]
pub fn q_to_f32(q_val: i16, q_point: usize) -> f32 {
    use std::ops::Shl;
    (q_val as f32) / (1.shl(q_point) as f32)
}

/// Convert f32 to a Q-point fixed-point word
#[inline]
pub fn f32_to_q(f32_val: f32, q_point: usize) -> i32 {
    use std::ops::Shl;
    (f32_val as f64 * (1u64.shl(q_point) as f64)) as i32
}

/// Get FRS write status description string
pub fn frs_status_to_str(status: u8) -> &'static str {
    match status {
        FRS_STATUS_WORD_RECEIVED => "word(s) received",
        FRS_STATUS_UNRECOGNIZED_FRS_TYPE => "unrecognized FRS type",
        FRS_STATUS_BUSY => "busy",
        FRS_STATUS_WRITE_COMPLETE => "write completed",
        FRS_STATUS_WRITE_READY => "write mode entered or ready",
        FRS_STATUS_WRITE_FAILED => "write failed",
        FRS_STATUS_DATA_RECV_NOT_IN_WRITE_MODE => "data received while not in write mode",
        FRS_STATUS_INVALID_LENGTH => "invalid length",
        FRS_STATUS_RECORD_VALID => "record valid (passed internal validation)",
        FRS_STATUS_RECORD_INVALID => "record invalid (failed internal validation)",
        FRS_STATUS_DEVICE_ERROR => "device error (DFU flash unavailable)",
        FRS_STATUS_READONLY => "record is read only",
        _ => "reserved",
    }
}
