// Copyright 2025 Au-Zone Technologies Inc.
// SPDX-License-Identifier: Apache-2.0

//! GPIO lines through the Linux character device (gpiod).

use crate::config::GpioLine;
use gpiod::{Chip, Input, Lines, Options, Output};
use log::trace;
use std::io::{self, Error, ErrorKind};

const CONSUMER: &str = "bno08x-rs";

pub trait OutputPin {
    /// Error type
    type Error;

    /// Drives the pin low
    fn set_low(&mut self) -> Result<(), Self::Error>;

    /// Drives the pin high
    fn set_high(&mut self) -> Result<(), Self::Error>;
}

pub trait InputPin {
    /// Error type
    type Error;

    /// Is the input pin high?
    fn is_high(&self) -> Result<bool, Self::Error>;

    /// Is the input pin low?
    fn is_low(&self) -> Result<bool, Self::Error>;
}

pub struct GpiodOut {
    output: Lines<Output>,
}

impl GpiodOut {
    /// Request `pin` as an output, initially driven `initial`
    pub fn new(chip: &Chip, pin: u32, initial: bool) -> io::Result<GpiodOut> {
        let opts = Options::output([pin]).values([initial]).consumer(CONSUMER);

        Ok(GpiodOut {
            output: chip.request_lines(opts)?,
        })
    }

    pub fn from_line(line: &GpioLine, initial: bool) -> io::Result<GpiodOut> {
        let (chip, offset) = resolve_line(line)?;
        GpiodOut::new(&Chip::new(chip)?, offset, initial)
    }
}

impl OutputPin for GpiodOut {
    type Error = io::Error;

    fn set_low(&mut self) -> Result<(), Self::Error> {
        self.output.set_values([false])?;
        Ok(())
    }
    fn set_high(&mut self) -> Result<(), Self::Error> {
        self.output.set_values([true])?;
        Ok(())
    }
}

pub struct GpiodIn {
    input: Lines<Input>,
}

impl GpiodIn {
    pub fn new(chip: &Chip, pin: u32) -> io::Result<GpiodIn> {
        let opts = Options::input([pin]).consumer(CONSUMER);

        Ok(GpiodIn {
            input: chip.request_lines(opts)?,
        })
    }

    pub fn from_line(line: &GpioLine) -> io::Result<GpiodIn> {
        let (chip, offset) = resolve_line(line)?;
        GpiodIn::new(&Chip::new(chip)?, offset)
    }
}

impl InputPin for GpiodIn {
    type Error = io::Error;

    fn is_high(&self) -> Result<bool, Self::Error> {
        let values = self.input.get_values([false])?;
        Ok(values[0])
    }

    fn is_low(&self) -> Result<bool, Self::Error> {
        let values = self.input.get_values([false])?;
        Ok(!values[0])
    }
}

/// Resolve a configured line to a chip path and line offset.
///
/// Named lines are searched for across every GPIO chip on the system.
pub fn resolve_line(line: &GpioLine) -> io::Result<(String, u32)> {
    match line {
        GpioLine::Offset { chip, line } => Ok((chip.clone(), *line)),
        GpioLine::Named(name) => {
            for entry in Chip::list_devices()? {
                let chip = Chip::new(&entry)?;
                for i in 0..chip.num_lines() {
                    let info = chip.line_info(i)?;
                    trace!("--- {} ---", info.name);
                    if info.name == *name {
                        return Ok((entry.display().to_string(), i));
                    }
                }
            }
            Err(Error::new(
                ErrorKind::AddrNotAvailable,
                format!("Did not find GPIO line \"{}\"", name),
            ))
        }
    }
}
