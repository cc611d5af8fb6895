// Copyright 2025 Au-Zone Technologies Inc.
// SPDX-License-Identifier: Apache-2.0

use crate::{
    constants::{
        CHANNEL_EXECUTABLE, CHANNEL_HUB_CONTROL, EXECUTABLE_DEVICE_CMD_RESET,
        EXECUTABLE_DEVICE_RESP_RESET_COMPLETE, NUM_CHANNELS,
    },
    interface::{Hal, PACKET_HEADER_LENGTH},
};
use parking_lot::Mutex;
use std::{collections::HashMap, collections::VecDeque, io, sync::Arc, thread, time::Duration};

type Responder = Box<dyn FnMut(&[u8]) -> Vec<(u8, Vec<u8>)> + Send>;

struct HalState {
    inbound: VecDeque<Vec<u8>>,
    written: Vec<Vec<u8>>,
    responders: HashMap<u8, Responder>,
    seq: [u8; NUM_CHANNELS],
    time_us: u32,
    hard_resets: usize,
    announce_reset: bool,
    open: bool,
}

impl HalState {
    fn queue(&mut self, channel: u8, payload: &[u8]) {
        let len = (payload.len() + PACKET_HEADER_LENGTH) as u16;
        let seq = &mut self.seq[channel as usize % NUM_CHANNELS];
        let mut packet = Vec::with_capacity(len as usize);
        packet.extend_from_slice(&len.to_le_bytes());
        packet.push(channel);
        packet.push(*seq);
        packet.extend_from_slice(payload);
        *seq = seq.wrapping_add(1);
        self.inbound.push_back(packet);
    }

    fn reboot(&mut self) {
        self.inbound.clear();
        if self.announce_reset {
            self.queue(CHANNEL_EXECUTABLE, &[EXECUTABLE_DEVICE_RESP_RESET_COMPLETE]);
        }
    }
}

/// Scripted [`Hal`]: packets pushed by the test are read back by the engine,
/// and control requests can be answered by per-report responders.
#[derive(Clone)]
pub struct MockHal {
    state: Arc<Mutex<HalState>>,
}

impl Default for MockHal {
    fn default() -> Self {
        Self::new()
    }
}

impl MockHal {
    /// Hub that announces reset complete after every reset
    pub fn new() -> Self {
        Self::with_announce(true)
    }

    /// Hub that never answers
    pub fn silent() -> Self {
        Self::with_announce(false)
    }

    fn with_announce(announce_reset: bool) -> Self {
        Self {
            state: Arc::new(Mutex::new(HalState {
                inbound: VecDeque::new(),
                written: Vec::new(),
                responders: HashMap::new(),
                seq: [0; NUM_CHANNELS],
                time_us: 0,
                hard_resets: 0,
                announce_reset,
                open: false,
            })),
        }
    }

    /// Queue a packet for the engine to read
    pub fn push_packet(&self, channel: u8, payload: &[u8]) {
        self.state.lock().queue(channel, payload);
    }

    /// Answer every hub control request whose first byte is `report_id`.
    /// `f` gets the request body and returns `(channel, payload)` packets.
    pub fn respond_to<F>(&self, report_id: u8, f: F)
    where
        F: FnMut(&[u8]) -> Vec<(u8, Vec<u8>)> + Send + 'static,
    {
        self.state.lock().responders.insert(report_id, Box::new(f));
    }

    /// Every packet the engine has written, headers included
    pub fn written(&self) -> Vec<Vec<u8>> {
        self.state.lock().written.clone()
    }

    pub fn hard_resets(&self) -> usize {
        self.state.lock().hard_resets
    }

    pub fn set_time_us(&self, time_us: u32) {
        self.state.lock().time_us = time_us;
    }

    pub fn is_open(&self) -> bool {
        self.state.lock().open
    }
}

impl Hal for MockHal {
    fn open(&mut self) -> io::Result<()> {
        let mut state = self.state.lock();
        state.open = true;
        state.hard_resets += 1;
        state.reboot();
        Ok(())
    }

    fn close(&mut self) {
        self.state.lock().open = false;
    }

    fn read(&mut self, buf: &mut [u8]) -> io::Result<usize> {
        let packet = self.state.lock().inbound.pop_front();
        match packet {
            Some(packet) if packet.len() <= buf.len() => {
                buf[..packet.len()].copy_from_slice(&packet);
                Ok(packet.len())
            }
            Some(_) => Ok(0),
            None => {
                thread::sleep(Duration::from_millis(1));
                Ok(0)
            }
        }
    }

    fn write(&mut self, packet: &[u8]) -> io::Result<usize> {
        let mut state = self.state.lock();
        state.written.push(packet.to_vec());
        if packet.len() <= PACKET_HEADER_LENGTH {
            return Ok(packet.len());
        }
        let channel = packet[2];
        let body = &packet[PACKET_HEADER_LENGTH..];

        if channel == CHANNEL_EXECUTABLE && body[0] == EXECUTABLE_DEVICE_CMD_RESET {
            state.reboot();
        } else if channel == CHANNEL_HUB_CONTROL {
            if let Some(mut responder) = state.responders.remove(&body[0]) {
                for (ch, payload) in responder(body) {
                    state.queue(ch, &payload);
                }
                state.responders.insert(body[0], responder);
            }
        }
        Ok(packet.len())
    }

    fn get_time_us(&self) -> u32 {
        self.state.lock().time_us
    }

    fn hard_reset(&mut self) -> io::Result<()> {
        let mut state = self.state.lock();
        state.hard_resets += 1;
        state.reboot();
        Ok(())
    }
}
