// Copyright 2025 Au-Zone Technologies Inc.
// SPDX-License-Identifier: Apache-2.0

//! Sensor event decoding.
//!
//! Turns the raw bytes of a [`SensorEvent`] into a typed [`SensorValue`]
//! using the Q points from the SH2 reference manual.

use super::{SensorEvent, SensorValue};
use crate::{
    constants::*,
    error::HubError,
    types::{
        Accuracy, ActivityClassifier, Axes, CircleDetector, GyroIntegratedRv, Quat, RawMems,
        Sample, ShakeDetector, StabilityClassifier, StepCounter, TapDetector, UncalibratedVector,
        Vector3,
    },
};

/// Helper for reading little-endian fields out of a report
pub struct ReportParser<'a> {
    msg: &'a [u8],
    cursor: usize,
}

impl<'a> ReportParser<'a> {
    pub fn new(msg: &'a [u8]) -> Self {
        Self { msg, cursor: 0 }
    }

    pub fn at(msg: &'a [u8], cursor: usize) -> Self {
        Self { msg, cursor }
    }

    fn need(&self, n: usize) -> Result<(), HubError> {
        if self.msg.len() < self.cursor + n {
            return Err(HubError::BadResponse(format!(
                "report of {} bytes truncated at offset {}",
                self.msg.len(),
                self.cursor
            )));
        }
        Ok(())
    }

    #[inline]
    pub fn read_u8(&mut self) -> Result<u8, HubError> {
        self.need(1)?;
        let val = self.msg[self.cursor];
        self.cursor += 1;
        Ok(val)
    }

    #[inline]
    pub fn read_i16(&mut self) -> Result<i16, HubError> {
        self.need(2)?;
        let val = i16::from_le_bytes([self.msg[self.cursor], self.msg[self.cursor + 1]]);
        self.cursor += 2;
        Ok(val)
    }

    #[inline]
    pub fn read_u16(&mut self) -> Result<u16, HubError> {
        Ok(self.read_i16()? as u16)
    }

    #[inline]
    pub fn read_u32(&mut self) -> Result<u32, HubError> {
        self.need(4)?;
        let b = &self.msg[self.cursor..self.cursor + 4];
        let val = u32::from_le_bytes([b[0], b[1], b[2], b[3]]);
        self.cursor += 4;
        Ok(val)
    }

    pub fn skip(&mut self, n: usize) -> Result<(), HubError> {
        self.need(n)?;
        self.cursor += n;
        Ok(())
    }

    fn read_vector(&mut self, q: usize, accuracy: Accuracy) -> Result<Vector3, HubError> {
        Ok(Vector3 {
            x: q_to_f32(self.read_i16()?, q),
            y: q_to_f32(self.read_i16()?, q),
            z: q_to_f32(self.read_i16()?, q),
            accuracy,
        })
    }

    fn read_axes(&mut self, q: usize) -> Result<Axes, HubError> {
        Ok(Axes {
            x: q_to_f32(self.read_i16()?, q),
            y: q_to_f32(self.read_i16()?, q),
            z: q_to_f32(self.read_i16()?, q),
        })
    }

    /// i, j, k, real and, when `with_accuracy`, the heading accuracy
    fn read_quat(&mut self, with_accuracy: bool, accuracy: Accuracy) -> Result<Quat, HubError> {
        let q = Q_ROTATION_VECTOR;
        let i = q_to_f32(self.read_i16()?, q);
        let j = q_to_f32(self.read_i16()?, q);
        let k = q_to_f32(self.read_i16()?, q);
        let real = q_to_f32(self.read_i16()?, q);
        let rad_accuracy = if with_accuracy {
            q_to_f32(self.read_i16()?, Q_ROTATION_ACCURACY)
        } else {
            0.0
        };
        Ok(Quat {
            real,
            i,
            j,
            k,
            rad_accuracy,
            accuracy,
        })
    }
}

/// Decode one sensor event
pub fn decode_sensor_event(event: &SensorEvent) -> Result<SensorValue, HubError> {
    let msg = event.bytes();

    // Gyro-integrated RV arrives on its own channel without the common header
    if event.report_id == SENSOR_REPORTID_GYRO_INTEGRATED_RV {
        let mut p = ReportParser::new(msg);
        let quat = p.read_quat(false, Accuracy::Undefined)?;
        let ang_vel = p.read_axes(Q_ANGULAR_VELOCITY)?;
        return Ok(SensorValue {
            sensor_id: event.report_id,
            sequence: 0,
            status: 0,
            timestamp_us: event.timestamp_us,
            delay_us: event.delay_us,
            sample: Sample::GyroIntegrated(GyroIntegratedRv { quat, ang_vel }),
        });
    }

    let mut p = ReportParser::new(msg);
    let sensor_id = p.read_u8()?;
    let sequence = p.read_u8()?;
    let status = p.read_u8()?;
    let _delay = p.read_u8()?;
    let accuracy = Accuracy::from_status(status);

    let sample = match sensor_id {
        SENSOR_REPORTID_ACCELEROMETER
        | SENSOR_REPORTID_LINEAR_ACCEL
        | SENSOR_REPORTID_GRAVITY => Sample::Vector(p.read_vector(Q_ACCELEROMETER, accuracy)?),
        SENSOR_REPORTID_GYROSCOPE => Sample::Vector(p.read_vector(Q_GYROSCOPE, accuracy)?),
        SENSOR_REPORTID_MAGNETIC_FIELD => {
            Sample::Vector(p.read_vector(Q_MAGNETIC_FIELD, accuracy)?)
        }
        SENSOR_REPORTID_GYROSCOPE_UNCALIB => Sample::Uncalibrated(UncalibratedVector {
            value: p.read_vector(Q_GYROSCOPE, accuracy)?,
            bias: p.read_axes(Q_GYROSCOPE)?,
        }),
        SENSOR_REPORTID_MAGNETIC_FIELD_UNCALIB => Sample::Uncalibrated(UncalibratedVector {
            value: p.read_vector(Q_MAGNETIC_FIELD, accuracy)?,
            bias: p.read_axes(Q_MAGNETIC_FIELD)?,
        }),
        SENSOR_REPORTID_ROTATION_VECTOR
        | SENSOR_REPORTID_ROTATION_VECTOR_GEOMAGNETIC
        | SENSOR_REPORTID_ARVR_ROTATION_VECTOR => Sample::Rotation(p.read_quat(true, accuracy)?),
        SENSOR_REPORTID_ROTATION_VECTOR_GAME | SENSOR_REPORTID_ARVR_ROTATION_VECTOR_GAME => {
            Sample::Rotation(p.read_quat(false, accuracy)?)
        }
        SENSOR_REPORTID_TAP_DETECTOR => Sample::Tap(TapDetector {
            flags: p.read_u8()?,
            accuracy,
        }),
        SENSOR_REPORTID_STEP_COUNTER => {
            let latency_us = p.read_u32()?;
            let steps = p.read_u16()?;
            Sample::Steps(StepCounter {
                latency_us,
                steps,
                accuracy,
            })
        }
        SENSOR_REPORTID_STABILITY_CLASSIFIER => Sample::Stability(StabilityClassifier {
            stability: p.read_u8()?.into(),
            accuracy,
        }),
        SENSOR_REPORTID_SHAKE_DETECTOR => Sample::Shake(ShakeDetector {
            flags: p.read_u16()?,
            accuracy,
        }),
        SENSOR_REPORTID_CIRCLE_DETECTOR => Sample::Circle(CircleDetector {
            count: p.read_u16()?,
            accuracy,
        }),
        SENSOR_REPORTID_ACTIVITY_CLASSIFIER => {
            let page = p.read_u8()?;
            let most_likely = p.read_u8()?;
            let mut confidence = [0u8; 10];
            for c in confidence.iter_mut() {
                *c = p.read_u8()?;
            }
            Sample::Activity(ActivityClassifier {
                page: page & 0x7F,
                last_page: page & 0x80 != 0,
                most_likely: most_likely.into(),
                confidence,
                accuracy,
            })
        }
        SENSOR_REPORTID_RAW_ACCELEROMETER
        | SENSOR_REPORTID_RAW_GYROSCOPE
        | SENSOR_REPORTID_RAW_MAGNETOMETER => {
            let x = p.read_i16()?;
            let y = p.read_i16()?;
            let z = p.read_i16()?;
            // temperature on the gyro, reserved on the others
            let temperature = p.read_i16()?;
            let timestamp_us = p.read_u32()?;
            Sample::Raw(RawMems {
                x,
                y,
                z,
                temperature: if sensor_id == SENSOR_REPORTID_RAW_GYROSCOPE {
                    temperature
                } else {
                    0
                },
                timestamp_us,
            })
        }
        other => {
            return Err(HubError::BadResponse(format!(
                "no decoder for report 0x{:02X}",
                other
            )))
        }
    };

    Ok(SensorValue {
        sensor_id,
        sequence,
        status,
        timestamp_us: event.timestamp_us,
        delay_us: event.delay_us,
        sample,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::{Activity, Stability};

    fn event(bytes: &[u8]) -> SensorEvent {
        SensorEvent::new(bytes[0], 1_000, 0, bytes)
    }

    #[test]
    fn test_accelerometer() {
        // 1.0, -2.0, 9.5 m/s^2 in Q8, accuracy high
        let mut raw = vec![SENSOR_REPORTID_ACCELEROMETER, 7, 0x03, 0];
        for v in [256i16, -512, 2432] {
            raw.extend_from_slice(&v.to_le_bytes());
        }
        let value = decode_sensor_event(&event(&raw)).unwrap();
        assert_eq!(value.sensor_id, SENSOR_REPORTID_ACCELEROMETER);
        assert_eq!(value.sequence, 7);
        match value.sample {
            Sample::Vector(v) => {
                assert!((v.x - 1.0).abs() < 1e-4);
                assert!((v.y + 2.0).abs() < 1e-4);
                assert!((v.z - 9.5).abs() < 1e-4);
                assert_eq!(v.accuracy, Accuracy::High);
            }
            other => panic!("unexpected sample {:?}", other),
        }
    }

    #[test]
    fn test_rotation_vector_with_accuracy() {
        let mut raw = vec![SENSOR_REPORTID_ROTATION_VECTOR, 0, 0x02, 0];
        // i, j, k, real, accuracy
        for v in [0i16, 0, 8192, 14189, 4096] {
            raw.extend_from_slice(&v.to_le_bytes());
        }
        let value = decode_sensor_event(&event(&raw)).unwrap();
        let Sample::Rotation(q) = value.sample else {
            panic!("not a rotation");
        };
        assert!((q.k - 0.5).abs() < 1e-3);
        assert!((q.real - 0.866).abs() < 1e-3);
        assert!((q.rad_accuracy - 1.0).abs() < 1e-3);
        assert_eq!(q.accuracy, Accuracy::Med);
    }

    #[test]
    fn test_gyro_integrated_rv_has_no_header() {
        let mut raw = Vec::new();
        for v in [0i16, 0, 0, 16384, 1024, -1024, 0] {
            raw.extend_from_slice(&v.to_le_bytes());
        }
        let ev = SensorEvent::new(SENSOR_REPORTID_GYRO_INTEGRATED_RV, 5, 0, &raw);
        let value = decode_sensor_event(&ev).unwrap();
        let Sample::GyroIntegrated(g) = value.sample else {
            panic!("not gyro integrated");
        };
        assert!((g.quat.real - 1.0).abs() < 1e-4);
        assert!((g.ang_vel.x - 1.0).abs() < 1e-4);
        assert!((g.ang_vel.y + 1.0).abs() < 1e-4);
    }

    #[test]
    fn test_classifiers() {
        let stab = [SENSOR_REPORTID_STABILITY_CLASSIFIER, 0, 3, 0, 4, 0];
        let Sample::Stability(s) = decode_sensor_event(&event(&stab)).unwrap().sample else {
            panic!("not stability");
        };
        assert_eq!(s.stability, Stability::Motion);

        let mut pac = vec![SENSOR_REPORTID_ACTIVITY_CLASSIFIER, 0, 3, 0, 0x80, 6];
        pac.extend_from_slice(&[0, 0, 0, 0, 5, 0, 95, 0, 0, 0]);
        let Sample::Activity(a) = decode_sensor_event(&event(&pac)).unwrap().sample else {
            panic!("not activity");
        };
        assert!(a.last_page);
        assert_eq!(a.most_likely, Activity::Walking);
        assert_eq!(a.confidence[6], 95);
    }

    #[test]
    fn test_truncated_report_is_an_error() {
        let raw = [SENSOR_REPORTID_GYROSCOPE, 0, 0, 0, 1, 0];
        assert!(decode_sensor_event(&event(&raw)).is_err());
    }

    #[test]
    fn test_unknown_report_is_an_error() {
        let raw = [0x7E, 0, 0, 0, 1, 0];
        assert!(decode_sensor_event(&event(&raw)).is_err());
    }
}
