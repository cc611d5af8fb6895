// Copyright 2025 Au-Zone Technologies Inc.
// SPDX-License-Identifier: Apache-2.0

//! Hardware integration tests for the BNO08x driver
//!
//! These tests require real hardware and are marked with #[ignore].
//! Run with: RUST_LOG=debug cargo test -- --ignored --test-threads=1

use bno08x_rs::{types::ResetReason, Bno08xConfig, GpioLine, SpiBno08x};
use std::{
    sync::{
        atomic::{AtomicU32, Ordering},
        Arc, Once,
    },
    thread::sleep,
    time::Duration,
};

static INIT: Once = Once::new();

/// Initialize logger for tests (only once)
fn init_logger() {
    INIT.call_once(|| {
        env_logger::init();
    });
}

const TEST_SPI_DEVICE: &str = "/dev/spidev1.0";
const TEST_INT_GPIO: &str = "IMU_INT";
const TEST_RST_GPIO: &str = "IMU_RST";
const REPORT_PERIOD_US: u32 = 100_000;
const SENSOR_WARMUP_MS: u64 = 500;

fn open_imu() -> SpiBno08x {
    init_logger();
    let config = Bno08xConfig::new(TEST_SPI_DEVICE)
        .with_hint(GpioLine::named(TEST_INT_GPIO))
        .with_reset(GpioLine::named(TEST_RST_GPIO));
    let mut imu = SpiBno08x::new_spi(config).expect("Failed to create IMU driver");
    imu.initialize().expect("Failed to initialize IMU");
    imu
}

/// Wait for `n` samples of any enabled report
fn wait_samples(imu: &SpiBno08x, n: usize) {
    for _ in 0..n {
        assert!(imu.data_available(), "no data within timeout");
    }
}

// =============================================================================
// Lifecycle
// =============================================================================

#[test]
#[ignore]
fn test_imu_initialization() {
    let imu = open_imu();
    let ids = imu.get_product_ids().expect("Failed to read product ids");
    assert!(!ids.is_empty());
    println!("✓ IMU initialized, part {}", ids[0].sw_part_number);
}

#[test]
#[ignore]
fn test_deinit_and_reinitialize() {
    let mut imu = open_imu();
    imu.deinit().expect("Failed to deinit");
    assert!(!imu.is_initialized());
    imu.initialize().expect("Failed to re-initialize");
    println!("✓ Re-initialized after deinit");
}

#[test]
#[ignore]
fn test_soft_reset() {
    let imu = open_imu();
    imu.accelerometer().enable(REPORT_PERIOD_US).unwrap();

    imu.soft_reset().expect("Failed to perform soft reset");
    assert!(imu.enabled_reports().is_empty());
    assert!(!imu.accelerometer().is_enabled());
    println!("✓ Soft reset successful");
}

#[test]
#[ignore]
fn test_hard_reset_reason() {
    let imu = open_imu();
    imu.hard_reset().expect("Failed to perform hard reset");
    assert_eq!(imu.get_reset_reason().unwrap(), ResetReason::ExtRst);
    println!("✓ Hard reset reason is external reset");
}

// =============================================================================
// Sensor readings
// =============================================================================

#[test]
#[ignore]
fn test_accelerometer() {
    let imu = open_imu();
    let accel = imu.accelerometer();
    accel
        .enable(REPORT_PERIOD_US)
        .expect("Failed to enable accelerometer");
    sleep(Duration::from_millis(SENSOR_WARMUP_MS));
    wait_samples(&imu, 5);

    let a = accel.get();
    let magnitude = (a.x.powi(2) + a.y.powi(2) + a.z.powi(2)).sqrt();
    assert!(
        magnitude > 8.0 && magnitude < 12.0,
        "Accelerometer magnitude {} outside expected range",
        magnitude
    );
    println!("✓ Accelerometer: {:?}, |a| = {:.2} m/s²", a, magnitude);
}

#[test]
#[ignore]
fn test_gyroscope() {
    let imu = open_imu();
    let gyro = imu.cal_gyro();
    gyro.enable(REPORT_PERIOD_US)
        .expect("Failed to enable gyroscope");
    sleep(Duration::from_millis(SENSOR_WARMUP_MS));
    wait_samples(&imu, 5);

    let g = gyro.get();
    // Stationary board
    assert!(g.x.abs() < 0.5 && g.y.abs() < 0.5 && g.z.abs() < 0.5);
    println!("✓ Gyroscope: {:?}", g);
}

#[test]
#[ignore]
fn test_magnetometer() {
    let imu = open_imu();
    let mag = imu.cal_magnetometer();
    mag.enable(REPORT_PERIOD_US)
        .expect("Failed to enable magnetometer");
    sleep(Duration::from_millis(SENSOR_WARMUP_MS));
    wait_samples(&imu, 5);

    let m = mag.get();
    let magnitude = (m.x.powi(2) + m.y.powi(2) + m.z.powi(2)).sqrt();
    assert!(magnitude > 1.0 && magnitude < 200.0, "|m| = {}", magnitude);
    println!("✓ Magnetometer: {:?}, |m| = {:.2} uT", m, magnitude);
}

#[test]
#[ignore]
fn test_rotation_vector() {
    let imu = open_imu();
    let rv = imu.rotation_vector();
    rv.enable(REPORT_PERIOD_US)
        .expect("Failed to enable rotation vector");
    sleep(Duration::from_millis(SENSOR_WARMUP_MS));
    wait_samples(&imu, 5);

    let q = rv.get();
    let norm = (q.real.powi(2) + q.i.powi(2) + q.j.powi(2) + q.k.powi(2)).sqrt();
    assert!((norm - 1.0).abs() < 0.05, "quaternion norm {}", norm);
    println!("✓ Rotation: {:?} euler {:?}", q, rv.euler(true));
}

#[test]
#[ignore]
fn test_linear_acceleration_and_gravity() {
    let imu = open_imu();
    imu.linear_accelerometer().enable(REPORT_PERIOD_US).unwrap();
    imu.gravity().enable(REPORT_PERIOD_US).unwrap();
    sleep(Duration::from_millis(SENSOR_WARMUP_MS));
    wait_samples(&imu, 10);

    let g = imu.gravity().get();
    let magnitude = (g.x.powi(2) + g.y.powi(2) + g.z.powi(2)).sqrt();
    assert!(magnitude > 9.0 && magnitude < 10.5, "|g| = {}", magnitude);
    let la = imu.linear_accelerometer().get();
    assert!(la.x.abs() < 1.0 && la.y.abs() < 1.0 && la.z.abs() < 1.0);
    println!("✓ Gravity {:?}, linear {:?}", g, la);
}

// =============================================================================
// Callbacks and report state
// =============================================================================

#[test]
#[ignore]
fn test_sensor_report_callback() {
    let imu = open_imu();
    let count = Arc::new(AtomicU32::new(0));
    let c = Arc::clone(&count);
    let accel = imu.accelerometer();
    accel
        .register_cb(move || {
            c.fetch_add(1, Ordering::SeqCst);
        })
        .unwrap();
    accel.enable(REPORT_PERIOD_US).unwrap();
    sleep(Duration::from_millis(SENSOR_WARMUP_MS * 4));

    assert!(count.load(Ordering::SeqCst) > 0, "callback never ran");
    println!("✓ Callback ran {} times", count.load(Ordering::SeqCst));
}

#[test]
#[ignore]
fn test_report_status_queries() {
    let imu = open_imu();
    let accel = imu.accelerometer();
    assert!(!accel.is_enabled());
    accel.enable(REPORT_PERIOD_US).unwrap();
    assert!(accel.is_enabled());
    assert_eq!(accel.period_us(), REPORT_PERIOD_US);

    let meta = accel.get_meta_data().expect("Failed to read metadata");
    assert!(meta.min_period_us > 0);

    accel.disable().unwrap();
    assert!(!accel.is_enabled());
    println!("✓ Report status queries, min period {} us", meta.min_period_us);
}

#[test]
#[ignore]
fn test_multiple_sensors() {
    let imu = open_imu();
    imu.accelerometer().enable(REPORT_PERIOD_US).unwrap();
    imu.cal_gyro().enable(REPORT_PERIOD_US).unwrap();
    imu.game_rotation_vector().enable(REPORT_PERIOD_US).unwrap();
    sleep(Duration::from_millis(SENSOR_WARMUP_MS));
    wait_samples(&imu, 15);

    assert_eq!(imu.enabled_reports().len(), 3);
    assert!(imu.accelerometer().timestamp_us() > 0);
    assert!(imu.cal_gyro().timestamp_us() > 0);
    assert!(imu.game_rotation_vector().timestamp_us() > 0);

    imu.disable_all_reports().unwrap();
    assert!(imu.enabled_reports().is_empty());
    println!("✓ Multiple sensors, stats {:?}", imu.stats());
}
