// Copyright 2025 Au-Zone Technologies Inc.
// SPDX-License-Identifier: Apache-2.0

//! Host transport for the sensor hub.
//!
//! The [`Hal`] trait is the boundary the SH2 engine talks through. It is the
//! only code that touches the bus or the reset line.

pub mod delay;
pub mod gpio;
pub mod interrupt;
pub mod spi;
pub mod spidev;

pub use interrupt::{HintWatcher, InterruptBridge};
pub use spi::{SpiControlLines, SpiHal};

use std::io;

/// Length of the SHTP header in front of every packet
pub const PACKET_HEADER_LENGTH: usize = 4;

/// Bus primitives used by the SH2 engine.
pub trait Hal: Send {
    /// Prepare the bus and bring the hub up. Called once by the engine.
    fn open(&mut self) -> io::Result<()>;

    fn close(&mut self);

    /// Read one packet into `buf`. Returns its length, or 0 when nothing
    /// was read (HINT never asserted, or the packet did not fit).
    fn read(&mut self, buf: &mut [u8]) -> io::Result<usize>;

    /// Write one packet. Returns the bytes written, or 0 when the hub never
    /// signalled it was ready.
    fn write(&mut self, buf: &[u8]) -> io::Result<usize>;

    /// Free-running microsecond clock, wraps at `u32::MAX`
    fn get_time_us(&self) -> u32;

    /// Pulse the reset line
    fn hard_reset(&mut self) -> io::Result<()>;
}

/// Total packet length from an SHTP header, continuation bit cleared
pub fn parse_packet_header(packet: &[u8]) -> usize {
    if packet.len() < PACKET_HEADER_LENGTH {
        return 0;
    }
    // Bit 15 marks a continuation of a previous cargo
    (u16::from_le_bytes([packet[0], packet[1]]) & 0x7FFF) as usize
}
