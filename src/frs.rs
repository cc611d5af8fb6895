// Copyright 2025 Au-Zone Technologies Inc.
// SPDX-License-Identifier: Apache-2.0

//! Flash Record System (FRS) helpers.
//!
//! FRS records are arrays of 32-bit words. This module builds the FRS
//! request bodies sent on the hub control channel and decodes the records
//! the driver understands: sensor META records, the system orientation and
//! the circle detector configuration.

use crate::{
    constants::{
        f32_to_q, SHUB_FRS_READ_REQ, SHUB_FRS_WRITE_DATA_REQ, SHUB_FRS_WRITE_REQ, Q_ORIENTATION,
        SENSOR_REPORTID_ACCELEROMETER, SENSOR_REPORTID_ACTIVITY_CLASSIFIER,
        SENSOR_REPORTID_ARVR_ROTATION_VECTOR, SENSOR_REPORTID_ARVR_ROTATION_VECTOR_GAME,
        SENSOR_REPORTID_CIRCLE_DETECTOR, SENSOR_REPORTID_GRAVITY, SENSOR_REPORTID_GYROSCOPE,
        SENSOR_REPORTID_GYROSCOPE_UNCALIB, SENSOR_REPORTID_GYRO_INTEGRATED_RV,
        SENSOR_REPORTID_LINEAR_ACCEL, SENSOR_REPORTID_MAGNETIC_FIELD,
        SENSOR_REPORTID_MAGNETIC_FIELD_UNCALIB, SENSOR_REPORTID_RAW_ACCELEROMETER,
        SENSOR_REPORTID_RAW_GYROSCOPE, SENSOR_REPORTID_RAW_MAGNETOMETER,
        SENSOR_REPORTID_ROTATION_VECTOR, SENSOR_REPORTID_ROTATION_VECTOR_GAME,
        SENSOR_REPORTID_ROTATION_VECTOR_GEOMAGNETIC, SENSOR_REPORTID_SHAKE_DETECTOR,
        SENSOR_REPORTID_STABILITY_CLASSIFIER, SENSOR_REPORTID_STEP_COUNTER,
        SENSOR_REPORTID_TAP_DETECTOR,
    },
    error::HubError,
    types::{FrsId, MetaData},
};

/// Words carried by one FRS write data request
pub const FRS_WORDS_PER_WRITE: usize = 2;

/// FRS read request for a whole record
pub fn build_frs_read_request(record: u16) -> [u8; 8] {
    let [type_lo, type_hi] = record.to_le_bytes();
    [SHUB_FRS_READ_REQ, 0, 0, 0, type_lo, type_hi, 0, 0]
}

/// FRS write request announcing `length` words for `record`
pub fn build_frs_write_request(length: u16, record: u16) -> [u8; 6] {
    let [len_lo, len_hi] = length.to_le_bytes();
    let [type_lo, type_hi] = record.to_le_bytes();
    [SHUB_FRS_WRITE_REQ, 0, len_lo, len_hi, type_lo, type_hi]
}

/// FRS write data request carrying two words starting at word `offset`
pub fn build_frs_write_data(offset: u16, word0: u32, word1: u32) -> [u8; 12] {
    let mut body = [0u8; 12];
    body[0] = SHUB_FRS_WRITE_DATA_REQ;
    body[2..4].copy_from_slice(&offset.to_le_bytes());
    body[4..8].copy_from_slice(&word0.to_le_bytes());
    body[8..12].copy_from_slice(&word1.to_le_bytes());
    body
}

/// Orientation quaternion as the four Q30 words of the orientation records
/// (X, Y, Z, W order)
pub fn quaternion_to_frs_words(real: f32, i: f32, j: f32, k: f32) -> [u32; 4] {
    [
        f32_to_q(i, Q_ORIENTATION) as u32,
        f32_to_q(j, Q_ORIENTATION) as u32,
        f32_to_q(k, Q_ORIENTATION) as u32,
        f32_to_q(real, Q_ORIENTATION) as u32,
    ]
}

/// Circle detector configuration written on first enable
pub fn circle_detector_config_words() -> [u32; 3] {
    [
        // acceleration threshold, Q24
        (4.0f64 * (1u64 << 24) as f64) as u32,
        // minimum time between circles, seconds, Q30
        (0.1f64 * (1u64 << 30) as f64) as u32,
        // minimum swept angle, radians, Q25
        (3.0 * std::f64::consts::PI * (1u64 << 25) as f64) as u32,
    ]
}

/// META record describing `sensor_id`
pub fn meta_record_for(sensor_id: u8) -> Option<u16> {
    let record = match sensor_id {
        SENSOR_REPORTID_RAW_ACCELEROMETER => FrsId::META_RAW_ACCELEROMETER,
        SENSOR_REPORTID_ACCELEROMETER => FrsId::META_ACCELEROMETER,
        SENSOR_REPORTID_LINEAR_ACCEL => FrsId::META_LINEAR_ACCELERATION,
        SENSOR_REPORTID_GRAVITY => FrsId::META_GRAVITY,
        SENSOR_REPORTID_RAW_GYROSCOPE => FrsId::META_RAW_GYROSCOPE,
        SENSOR_REPORTID_GYROSCOPE => FrsId::META_GYROSCOPE_CALIBRATED,
        SENSOR_REPORTID_GYROSCOPE_UNCALIB => FrsId::META_GYROSCOPE_UNCALIBRATED,
        SENSOR_REPORTID_RAW_MAGNETOMETER => FrsId::META_RAW_MAGNETOMETER,
        SENSOR_REPORTID_MAGNETIC_FIELD => FrsId::META_MAGNETIC_FIELD_CALIBRATED,
        SENSOR_REPORTID_MAGNETIC_FIELD_UNCALIB => FrsId::META_MAGNETIC_FIELD_UNCALIBRATED,
        SENSOR_REPORTID_ROTATION_VECTOR => FrsId::META_ROTATION_VECTOR,
        SENSOR_REPORTID_ROTATION_VECTOR_GAME => FrsId::META_GAME_ROTATION_VECTOR,
        SENSOR_REPORTID_ROTATION_VECTOR_GEOMAGNETIC => FrsId::META_GEOMAGNETIC_ROTATION_VECTOR,
        SENSOR_REPORTID_TAP_DETECTOR => FrsId::META_TAP_DETECTOR,
        SENSOR_REPORTID_STEP_COUNTER => FrsId::META_STEP_COUNTER,
        SENSOR_REPORTID_STABILITY_CLASSIFIER => FrsId::META_STABILITY_CLASSIFIER,
        SENSOR_REPORTID_SHAKE_DETECTOR => FrsId::META_SHAKE_DETECTOR,
        SENSOR_REPORTID_ACTIVITY_CLASSIFIER => FrsId::META_PERSONAL_ACTIVITY_CLASSIFIER,
        SENSOR_REPORTID_CIRCLE_DETECTOR => FrsId::META_CIRCLE_DETECTOR,
        SENSOR_REPORTID_ARVR_ROTATION_VECTOR => FrsId::META_ARVR_STABILIZED_RV,
        SENSOR_REPORTID_ARVR_ROTATION_VECTOR_GAME => FrsId::META_ARVR_STABILIZED_GRV,
        SENSOR_REPORTID_GYRO_INTEGRATED_RV => FrsId::META_GYRO_INTEGRATED_RV,
        _ => return None,
    };
    Some(record)
}

fn words_to_bytes(words: &[u32]) -> Vec<u8> {
    words.iter().flat_map(|w| w.to_le_bytes()).collect()
}

fn word(words: &[u32], index: usize) -> Result<u32, HubError> {
    words.get(index).copied().ok_or_else(|| {
        HubError::BadResponse(format!(
            "META record of {} words is missing word {}",
            words.len(),
            index
        ))
    })
}

/// Decode a sensor META record.
///
/// The layout after word 6 depends on the record revision: revision 1 adds
/// two Q points and a sensor specific block, revision 2 adds a third Q point
/// and the maximum period.
pub fn parse_metadata(words: &[u32]) -> Result<MetaData, HubError> {
    let w0 = word(words, 0)?;
    let w3 = word(words, 3)?;
    let w5 = word(words, 5)?;
    let w6 = word(words, 6)?;

    let mut meta = MetaData {
        me_version: (w0 & 0xFF) as u8,
        mh_version: ((w0 >> 8) & 0xFF) as u8,
        sh_version: ((w0 >> 16) & 0xFF) as u8,
        range: word(words, 1)?,
        resolution: word(words, 2)?,
        power_ma: (w3 & 0xFFFF) as u16,
        revision: (w3 >> 16) as u16,
        min_period_us: word(words, 4)?,
        fifo_max: w5 & 0xFFFF,
        fifo_reserved: w5 >> 16,
        batch_buffer_bytes: w6 & 0xFFFF,
        ..Default::default()
    };
    let vendor_id_len = (w6 >> 16) as usize;

    let vendor_id_word = match meta.revision {
        0 => 7,
        rev => {
            let w7 = word(words, 7)?;
            let w8 = word(words, 8)?;
            meta.q_point_1 = (w7 & 0xFFFF) as u16;
            meta.q_point_2 = (w7 >> 16) as u16;
            let specific_len = (w8 & 0xFFFF) as usize;
            let specific_start = if rev == 1 {
                9
            } else {
                meta.q_point_3 = (w8 >> 16) as u16;
                meta.max_period_us = word(words, 9)?;
                10
            };
            let specific_words = specific_len.div_ceil(4);
            let end = (specific_start + specific_words).min(words.len());
            let mut specific = words_to_bytes(&words[specific_start.min(end)..end]);
            specific.truncate(specific_len);
            meta.sensor_specific = specific;
            specific_start + specific_words
        }
    };

    let vendor = words_to_bytes(&words[vendor_id_word.min(words.len())..]);
    let vendor = &vendor[..vendor_id_len.min(vendor.len())];
    let vendor = vendor.split(|b| *b == 0).next().unwrap_or_default();
    meta.vendor_id = String::from_utf8_lossy(vendor).into_owned();

    Ok(meta)
}
