// Copyright 2025 Au-Zone Technologies Inc.
// SPDX-License-Identifier: Apache-2.0

//! Test doubles for running the driver without hardware.
//!
//! [`MockHal`] stands in for the SPI transport underneath
//! [`Sh2Hub`](crate::hub::Sh2Hub). [`MockHub`] replaces the protocol engine
//! as a whole so the driver's workers, registry and teardown can be
//! exercised on any host.

mod hal;
mod hub;

pub use hal::MockHal;
pub use hub::{HubCall, MockHub};

use crate::{constants::*, hub::SensorEvent};

/// Event for `report_id` with the common four byte header followed by `body`
pub fn sensor_event(report_id: u8, body: &[u8]) -> SensorEvent {
    let mut raw = vec![report_id, 0, 0x03, 0];
    raw.extend_from_slice(body);
    SensorEvent::new(report_id, 0, 0, &raw)
}

fn q16(value: f32, q_point: usize) -> [u8; 2] {
    (f32_to_q(value, q_point) as i16).to_le_bytes()
}

/// Three-axis event for the accelerometer family (Q8)
pub fn vector_event(report_id: u8, x: f32, y: f32, z: f32) -> SensorEvent {
    let q = match report_id {
        SENSOR_REPORTID_GYROSCOPE => Q_GYROSCOPE,
        SENSOR_REPORTID_MAGNETIC_FIELD => Q_MAGNETIC_FIELD,
        _ => Q_ACCELEROMETER,
    };
    let mut body = Vec::with_capacity(6);
    for v in [x, y, z] {
        body.extend_from_slice(&q16(v, q));
    }
    sensor_event(report_id, &body)
}

/// Rotation vector event with heading accuracy
pub fn rotation_event(report_id: u8, real: f32, i: f32, j: f32, k: f32) -> SensorEvent {
    let mut body = Vec::with_capacity(10);
    for v in [i, j, k, real] {
        body.extend_from_slice(&q16(v, Q_ROTATION_VECTOR));
    }
    body.extend_from_slice(&q16(0.1, Q_ROTATION_ACCURACY));
    sensor_event(report_id, &body)
}

/// Circle detector event reporting `count` new circles
pub fn circle_event(count: u16) -> SensorEvent {
    sensor_event(SENSOR_REPORTID_CIRCLE_DETECTOR, &count.to_le_bytes())
}
