// Copyright 2025 Au-Zone Technologies Inc.
// SPDX-License-Identifier: Apache-2.0

//! Registered user callbacks.

use crate::error::{Error, Result};
use std::{fmt, sync::Arc};

/// A user callback, with or without the report id argument
#[derive(Clone)]
pub enum CallbackFn {
    Void(Arc<dyn Fn() + Send + Sync>),
    WithId(Arc<dyn Fn(u8) + Send + Sync>),
}

impl CallbackFn {
    pub fn invoke(&self, report_id: u8) {
        match self {
            CallbackFn::Void(cb) => cb(),
            CallbackFn::WithId(cb) => cb(report_id),
        }
    }
}

impl fmt::Debug for CallbackFn {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            CallbackFn::Void(_) => f.write_str("CallbackFn::Void"),
            CallbackFn::WithId(_) => f.write_str("CallbackFn::WithId"),
        }
    }
}

/// Which reports a callback fires for
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CallbackTarget {
    All,
    Report(u8),
}

impl CallbackTarget {
    fn matches(self, report_id: u8) -> bool {
        match self {
            CallbackTarget::All => true,
            CallbackTarget::Report(id) => id == report_id,
        }
    }
}

#[derive(Debug, Clone)]
struct CallbackEntry {
    target: CallbackTarget,
    cb: CallbackFn,
}

/// Bounded list of callbacks in registration order
#[derive(Debug)]
pub(crate) struct CallbackList {
    entries: Vec<CallbackEntry>,
    capacity: usize,
}

impl CallbackList {
    pub fn new(capacity: usize) -> Self {
        Self {
            entries: Vec::with_capacity(capacity),
            capacity,
        }
    }

    pub fn push(&mut self, target: CallbackTarget, cb: CallbackFn) -> Result<()> {
        if self.entries.len() >= self.capacity {
            return Err(Error::CallbackListFull(self.capacity));
        }
        self.entries.push(CallbackEntry { target, cb });
        Ok(())
    }

    /// Callbacks to run for `report_id`, in registration order
    pub fn matching(&self, report_id: u8) -> Vec<CallbackFn> {
        self.entries
            .iter()
            .filter(|e| e.target.matches(report_id))
            .map(|e| e.cb.clone())
            .collect()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn clear(&mut self) {
        self.entries.clear();
    }
}
