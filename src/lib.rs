// Copyright 2025 Au-Zone Technologies Inc.
// SPDX-License-Identifier: Apache-2.0

//! Threaded driver for the Hillcrest/CEVA BNO08x IMU family over SPI.
//!
//! The driver is serviced from the HINT line: a service worker runs the
//! sensor hub engine whenever the hub asserts HINT, an ingestion worker
//! decodes and stores samples, and a callback worker runs user callbacks.
//! Reports that were enabled before an unexpected hub reset are enabled
//! again automatically.
//!
//! ```no_run
//! use bno08x_rs::{Bno08xConfig, GpioLine, SpiBno08x};
//!
//! # fn main() -> bno08x_rs::Result<()> {
//! let config = Bno08xConfig::new("/dev/spidev1.0")
//!     .with_hint(GpioLine::named("IMU_INT"))
//!     .with_reset(GpioLine::named("IMU_RST"));
//! let mut imu = SpiBno08x::new_spi(config)?;
//! imu.initialize()?;
//!
//! let rv = imu.rotation_vector();
//! rv.enable(10_000)?;
//! while imu.data_available() {
//!     let q = rv.get();
//!     println!("{:.3} {:.3} {:.3} {:.3}", q.real, q.i, q.j, q.k);
//! }
//! # Ok(())
//! # }
//! ```

pub mod callbacks;
pub mod config;
pub mod constants;
mod driver;
pub mod error;
pub mod frs;
pub mod hub;
pub mod interface;
pub mod reports;
pub mod sync;
mod tasks;
pub mod testing;
pub mod types;

pub use config::{Bno08xConfig, GpioLine};
pub use driver::{Bno08x, SpiBno08x};
pub use error::{Error, HubError, Result};
pub use reports::Report;
pub use sync::StatsSnapshot;
