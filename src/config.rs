// Copyright 2025 Au-Zone Technologies Inc.
// SPDX-License-Identifier: Apache-2.0

//! Device configuration.
//!
//! A [`Bno08xConfig`] is validated once when the driver is constructed and
//! is never changed afterwards.

use crate::{
    constants::{HOST_INT_TIMEOUT_DEFAULT, SCLK_DEFAULT_SPEED_HZ, SCLK_MAX_SPEED_HZ},
    error::{Error, Result},
};
use log::warn;
use std::time::Duration;

pub const DEFAULT_SPI_DEVICE: &str = "/dev/spidev1.0";
pub const DEFAULT_HINT_LINE: &str = "IMU_INT";
pub const DEFAULT_RESET_LINE: &str = "IMU_RST";

/// Location of a GPIO line
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum GpioLine {
    /// Line `line` on character device `chip` (e.g. `/dev/gpiochip3`)
    Offset { chip: String, line: u32 },
    /// Line looked up by its symbolic name across all GPIO chips
    Named(String),
}

impl GpioLine {
    pub fn offset(chip: impl Into<String>, line: u32) -> Self {
        GpioLine::Offset {
            chip: chip.into(),
            line,
        }
    }

    pub fn named(name: impl Into<String>) -> Self {
        GpioLine::Named(name.into())
    }
}

/// Wiring and tuning for one BNO08x on a spidev bus
#[derive(Debug, Clone)]
pub struct Bno08xConfig {
    /// spidev node; selects both the bus and the chip select
    pub spi_device: String,
    /// Host interrupt line (HINT), active low
    pub hint: Option<GpioLine>,
    /// Reset line (RST), active low
    pub reset: Option<GpioLine>,
    /// Optional WAKE/PS0 line, pulsed before each write
    pub wake: Option<GpioLine>,
    pub sclk_speed_hz: u32,
    /// Spawn a HINT watcher thread. When false the application must call
    /// [`InterruptBridge::on_hint`](crate::interface::InterruptBridge::on_hint).
    pub install_isr_service: bool,
    /// Maximum number of registered callbacks
    pub callback_capacity: usize,
    pub callback_queue_size: usize,
    pub event_queue_size: usize,
    /// Bound on `data_available()`
    pub data_available_timeout: Duration,
    /// Bound on a HINT wait inside the transport
    pub hint_timeout: Duration,
}

impl Default for Bno08xConfig {
    fn default() -> Self {
        Self {
            spi_device: DEFAULT_SPI_DEVICE.to_string(),
            hint: Some(GpioLine::named(DEFAULT_HINT_LINE)),
            reset: Some(GpioLine::named(DEFAULT_RESET_LINE)),
            wake: None,
            sclk_speed_hz: SCLK_DEFAULT_SPEED_HZ,
            install_isr_service: true,
            callback_capacity: 10,
            callback_queue_size: 5,
            event_queue_size: 10,
            data_available_timeout: Duration::from_millis(3000),
            hint_timeout: HOST_INT_TIMEOUT_DEFAULT,
        }
    }
}

impl Bno08xConfig {
    pub fn new(spi_device: impl Into<String>) -> Self {
        Self {
            spi_device: spi_device.into(),
            ..Default::default()
        }
    }

    pub fn with_hint(mut self, line: GpioLine) -> Self {
        self.hint = Some(line);
        self
    }

    pub fn with_reset(mut self, line: GpioLine) -> Self {
        self.reset = Some(line);
        self
    }

    pub fn with_wake(mut self, line: GpioLine) -> Self {
        self.wake = Some(line);
        self
    }

    pub fn with_sclk_speed(mut self, hz: u32) -> Self {
        self.sclk_speed_hz = hz;
        self
    }

    pub fn with_isr_service(mut self, install: bool) -> Self {
        self.install_isr_service = install;
        self
    }

    pub fn with_callback_capacity(mut self, capacity: usize) -> Self {
        self.callback_capacity = capacity;
        self
    }

    pub fn with_callback_queue_size(mut self, size: usize) -> Self {
        self.callback_queue_size = size;
        self
    }

    pub fn with_event_queue_size(mut self, size: usize) -> Self {
        self.event_queue_size = size;
        self
    }

    pub fn with_data_available_timeout(mut self, timeout: Duration) -> Self {
        self.data_available_timeout = timeout;
        self
    }

    pub fn with_hint_timeout(mut self, timeout: Duration) -> Self {
        self.hint_timeout = timeout;
        self
    }

    /// Check required lines and clamp out-of-range values.
    pub fn validated(mut self) -> Result<Self> {
        if self.spi_device.is_empty() {
            return Err(Error::Config("SPI device path is empty".into()));
        }
        if self.hint.is_none() {
            return Err(Error::Config("HINT line is not assigned".into()));
        }
        if self.reset.is_none() {
            return Err(Error::Config("RST line is not assigned".into()));
        }
        if self.sclk_speed_hz > SCLK_MAX_SPEED_HZ {
            warn!(
                "Max SPI clock speed exceeded, {} Hz overwritten with {} Hz",
                self.sclk_speed_hz, SCLK_MAX_SPEED_HZ
            );
            self.sclk_speed_hz = SCLK_MAX_SPEED_HZ;
        }
        if self.sclk_speed_hz == 0 {
            warn!("SPI clock speed of 0 Hz, using {} Hz", SCLK_DEFAULT_SPEED_HZ);
            self.sclk_speed_hz = SCLK_DEFAULT_SPEED_HZ;
        }
        if self.event_queue_size == 0 || self.callback_queue_size == 0 {
            return Err(Error::Config("queue sizes must be non-zero".into()));
        }
        Ok(self)
    }
}
