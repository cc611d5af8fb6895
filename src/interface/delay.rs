// Copyright 2025 Au-Zone Technologies Inc.
// SPDX-License-Identifier: Apache-2.0

use std::{thread, time::Duration};

/// Block the calling thread for `ms` milliseconds
pub fn delay_ms(ms: u64) {
    thread::sleep(Duration::from_millis(ms));
}

/// Block the calling thread for `d`
pub fn delay(d: Duration) {
    if !d.is_zero() {
        thread::sleep(d);
    }
}
