// Copyright 2025 Au-Zone Technologies Inc.
// SPDX-License-Identifier: Apache-2.0

//! Error types for the driver and the sensor hub layer.

use crate::types::ResetReason;
use std::io;
use thiserror::Error;

/// Failures reported by a [`SensorHub`](crate::hub::SensorHub) implementation.
#[derive(Debug, Error)]
pub enum HubError {
    /// The hub did not answer within the operation timeout
    #[error("timed out waiting for {0}")]
    Timeout(&'static str),
    /// The hub answered with a non-zero status
    #[error("{op} rejected by sensor hub (status {status})")]
    Rejected { op: &'static str, status: u8 },
    /// A response could not be parsed
    #[error("malformed response: {0}")]
    BadResponse(String),
    /// A request argument is out of range for the protocol
    #[error("invalid parameter: {0}")]
    InvalidParam(String),
    /// The hub has not been opened yet, or was closed
    #[error("sensor hub is not open")]
    NotOpen,
    /// Bus or GPIO failure from the transport
    #[error("transport error: {0}")]
    Io(#[from] io::Error),
}

/// Errors in this crate
#[derive(Debug, Error)]
pub enum Error {
    /// The device configuration is unusable
    #[error("invalid configuration: {0}")]
    Config(String),
    /// A bounded wait expired
    #[error("timed out waiting for {0}")]
    Timeout(&'static str),
    /// The sensor hub failed or rejected a request
    #[error(transparent)]
    Hub(#[from] HubError),
    /// Opening SPI or GPIO resources failed
    #[error("I/O error: {0}")]
    Io(#[from] io::Error),
    /// Operation requires `initialize()` first
    #[error("driver is not initialized")]
    NotInitialized,
    #[error("driver is already initialized")]
    AlreadyInitialized,
    /// All callback slots are in use
    #[error("callback list is full ({0} entries)")]
    CallbackListFull(usize),
    /// The device came back from a host reset for the wrong reason
    #[error("unexpected reset reason {0:?}")]
    UnexpectedResetReason(ResetReason),
    /// Some workers never acknowledged shutdown
    #[error("{acked} of {expected} workers acknowledged shutdown")]
    TeardownTimeout { acked: usize, expected: usize },
    /// The report does not support the requested operation
    #[error("operation not supported for report 0x{0:02X}")]
    Unsupported(u8),
}

pub type Result<T, E = Error> = std::result::Result<T, E>;
