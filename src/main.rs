// Copyright 2025 Au-Zone Technologies Inc.
// SPDX-License-Identifier: Apache-2.0

use bno08x_rs::{Bno08xConfig, GpioLine, SpiBno08x};
use std::env;

const REPORT_PERIOD_US: u32 = 50_000;

fn main() -> bno08x_rs::Result<()> {
    let spi_device = env::args()
        .nth(1)
        .unwrap_or_else(|| "/dev/spidev1.0".to_string());
    let config = Bno08xConfig::new(spi_device)
        .with_hint(GpioLine::named("IMU_INT"))
        .with_reset(GpioLine::named("IMU_RST"));

    let mut imu = SpiBno08x::new_spi(config)?;
    imu.initialize()?;

    let rv = imu.rotation_vector();
    let gravity = imu.gravity();
    rv.enable(REPORT_PERIOD_US)?;
    gravity.enable(REPORT_PERIOD_US)?;

    loop {
        if !imu.data_available() {
            println!("No data from IMU");
            continue;
        }
        if rv.has_new_data() {
            println!("Current rotation: {:?}", rv.euler(true));
        }
        if gravity.has_new_data() {
            let g = gravity.get();
            println!("Gravity: {} {} {}", g.x, g.y, g.z);
        }
    }
}
