// Copyright 2025 Au-Zone Technologies Inc.
// SPDX-License-Identifier: Apache-2.0

//! SPI transport gated by the HINT line.

use super::{
    delay::delay,
    gpio::{InputPin, OutputPin},
    interrupt::{HintWatcher, InterruptBridge},
    parse_packet_header,
    spidev::{Transfer, Write},
    Hal, PACKET_HEADER_LENGTH,
};
use crate::{constants::HARD_RESET_DELAY, sync::HINT_ASSERTED};
use log::{debug, trace, warn};
use std::{
    fmt::Debug,
    io::{self, ErrorKind},
    sync::Arc,
    time::{Duration, Instant},
};

/// Encapsulates all the lines required to operate this sensor
/// - SPI: spidev node; the kernel drives SCK, MISO, MOSI and CS
/// - HINTN: Hardware interrupt. Sensor pulls it low when it needs attention
/// - RSTN: Reset the device
/// - WAKE: optional PS0/WAKE line, pulsed low before writes
pub struct SpiControlLines<SPI, IN, OUT> {
    pub spi: SPI,
    pub hintn: IN,
    pub reset: OUT,
    pub wake: Option<OUT>,
}

/// [`Hal`] over SPI with HINT, RST and optional WAKE lines
pub struct SpiHal<SPI, IN, OUT> {
    spi: SPI,
    hintn: Arc<IN>,
    reset: OUT,
    wake: Option<OUT>,
    bridge: Arc<InterruptBridge>,
    watcher: Option<HintWatcher>,
    install_watcher: bool,
    hint_timeout: Duration,
    epoch: Instant,
    received_packet_count: usize,
}

fn comm_err<E: Debug>(e: E) -> io::Error {
    io::Error::new(ErrorKind::Other, format!("SPI: {:?}", e))
}

fn pin_err<E: Debug>(e: E) -> io::Error {
    io::Error::new(ErrorKind::Other, format!("GPIO: {:?}", e))
}

impl<SPI, IN, OUT, CommE, PinE> SpiHal<SPI, IN, OUT>
where
    SPI: Write<Error = CommE> + Transfer<Error = CommE> + Send,
    IN: InputPin<Error = PinE> + Send + Sync + 'static,
    OUT: OutputPin<Error = PinE> + Send,
    CommE: Debug,
    PinE: Debug,
{
    /// `install_watcher` spawns a [`HintWatcher`] on `open()`. Without it the
    /// application forwards HINT edges through the bridge.
    pub fn new(
        lines: SpiControlLines<SPI, IN, OUT>,
        bridge: Arc<InterruptBridge>,
        hint_timeout: Duration,
        install_watcher: bool,
    ) -> Self {
        Self {
            spi: lines.spi,
            hintn: Arc::new(lines.hintn),
            reset: lines.reset,
            wake: lines.wake,
            bridge,
            watcher: None,
            install_watcher,
            hint_timeout,
            epoch: Instant::now(),
            received_packet_count: 0,
        }
    }

    /// Is the sensor indicating it needs attention
    fn hintn_signaled(&self) -> bool {
        self.hintn.is_low().unwrap_or(false)
    }

    pub fn received_packet_count(&self) -> usize {
        self.received_packet_count
    }

    /// Unmask HINT and wait for the hub to assert it, consuming the
    /// notification. A line that is already low counts as asserted.
    fn wait_for_hint(&mut self) -> bool {
        let events = Arc::clone(self.bridge.task_events());
        if self.hintn_signaled() {
            self.bridge.disarm();
            events.clear_bits(HINT_ASSERTED);
            return true;
        }
        self.bridge.arm();
        let bits = events.wait_bits(HINT_ASSERTED, true, Some(self.hint_timeout));
        bits & HINT_ASSERTED != 0
    }

    /// Reset the hub and wait for it to boot
    fn bring_up(&mut self) -> io::Result<()> {
        if let Some(wake) = self.wake.as_mut() {
            wake.set_high().map_err(pin_err)?;
        }
        self.hard_reset()?;
        // The hub asserts HINT once it has booted
        if !self.wait_for_hint() {
            return Err(io::Error::new(
                ErrorKind::TimedOut,
                "sensor did not assert HINT after reset",
            ));
        }
        // Leave the notification pending for the first read
        self.bridge.task_events().set_bits(HINT_ASSERTED);
        debug!("SPI HAL open");
        Ok(())
    }

    /// HINT wait that hard-resets the hub when it stays silent
    fn wait_for_int(&mut self) -> io::Result<bool> {
        if self.wait_for_hint() {
            return Ok(true);
        }
        warn!(
            "HINT not asserted within {} ms, resetting sensor",
            self.hint_timeout.as_millis()
        );
        self.hard_reset()?;
        Ok(false)
    }
}

impl<SPI, IN, OUT, CommE, PinE> Hal for SpiHal<SPI, IN, OUT>
where
    SPI: Write<Error = CommE> + Transfer<Error = CommE> + Send,
    IN: InputPin<Error = PinE> + Send + Sync + 'static,
    OUT: OutputPin<Error = PinE> + Send,
    CommE: Debug,
    PinE: Debug,
{
    fn open(&mut self) -> io::Result<()> {
        if self.install_watcher && self.watcher.is_none() {
            self.watcher = Some(HintWatcher::spawn(
                Arc::clone(&self.hintn),
                Arc::clone(&self.bridge),
            )?);
        }
        let res = self.bring_up();
        if res.is_err() {
            self.close();
        }
        res
    }

    fn close(&mut self) {
        self.bridge.disarm();
        if let Some(mut watcher) = self.watcher.take() {
            watcher.stop();
        }
        debug!("SPI HAL closed");
    }

    fn read(&mut self, recv_buf: &mut [u8]) -> io::Result<usize> {
        if !self.wait_for_int()? {
            return Ok(0);
        }

        // check how long the message to read is
        let mut header = [0u8; PACKET_HEADER_LENGTH];
        self.spi.transfer(&mut header).map_err(comm_err)?;
        let packet_len = parse_packet_header(&header);
        if packet_len == 0 || packet_len > recv_buf.len() {
            if packet_len > recv_buf.len() {
                warn!(
                    "Packet length of {} exceeded the buffer length of {}",
                    packet_len,
                    recv_buf.len()
                );
            }
            self.bridge.arm();
            return Ok(0);
        }

        // The hub restarts the packet on the next chip select
        recv_buf[..packet_len].fill(0);
        self.spi
            .transfer(&mut recv_buf[..packet_len])
            .map_err(comm_err)?;
        self.bridge.arm();

        self.received_packet_count += 1;
        trace!("read {} bytes on channel {}", packet_len, recv_buf[2]);
        Ok(packet_len)
    }

    fn write(&mut self, packet: &[u8]) -> io::Result<usize> {
        if let Some(wake) = self.wake.as_mut() {
            wake.set_low().map_err(pin_err)?;
        }
        let ready = self.wait_for_int();
        if let Some(wake) = self.wake.as_mut() {
            wake.set_high().map_err(pin_err)?;
        }
        if !ready? {
            return Ok(0);
        }

        self.spi.write(packet).map_err(comm_err)?;
        self.bridge.arm();
        trace!("wrote {} bytes", packet.len());
        Ok(packet.len())
    }

    fn get_time_us(&self) -> u32 {
        self.epoch.elapsed().as_micros() as u32
    }

    fn hard_reset(&mut self) -> io::Result<()> {
        debug!("hard reset");
        self.bridge.disarm();
        if let Some(wake) = self.wake.as_mut() {
            wake.set_high().map_err(pin_err)?;
        }
        self.reset.set_low().map_err(pin_err)?;
        self.bridge.task_events().clear_bits(HINT_ASSERTED);
        self.bridge.arm();
        delay(HARD_RESET_DELAY);
        self.reset.set_high().map_err(pin_err)?;
        Ok(())
    }
}

impl<SPI, IN, OUT> Drop for SpiHal<SPI, IN, OUT> {
    fn drop(&mut self) {
        if let Some(mut watcher) = self.watcher.take() {
            watcher.stop();
        }
    }
}
