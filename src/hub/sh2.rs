// Copyright 2025 Au-Zone Technologies Inc.
// SPDX-License-Identifier: Apache-2.0

//! SH2 protocol engine over SHTP.
//!
//! [`Sh2Hub`] frames requests for the hub, parses every packet the [`Hal`]
//! hands back, and turns the ones that matter to the driver into listener
//! notifications. Requests that expect an answer pump the receive path
//! themselves until the answer arrives or [`HUB_RESPONSE_TIMEOUT`] expires.

use super::{AsyncEvent, HubListener, SensorConfig, SensorEvent, SensorHub};
use crate::{
    constants::*,
    error::HubError,
    frs::{
        build_frs_read_request, build_frs_write_data, build_frs_write_request, meta_record_for,
        parse_metadata, FRS_WORDS_PER_WRITE,
    },
    interface::{Hal, PACKET_HEADER_LENGTH},
    types::{MetaData, ProductId, SampleCounts},
};
use log::{debug, trace, warn};
use std::{
    collections::VecDeque,
    sync::Arc,
    time::{Duration, Instant},
};

/// Hub control reports that can share a packet, with their lengths
fn control_report_len(report_id: u8) -> Option<usize> {
    let len = match report_id {
        SHUB_PROD_ID_RESP => PROD_ID_RESP_LEN,
        SHUB_GET_FEATURE_RESP => FEATURE_REPORT_LEN,
        SHUB_COMMAND_RESP => COMMAND_RESP_LEN,
        SHUB_FRS_READ_RESP => FRS_READ_RESP_LEN,
        SHUB_FRS_WRITE_RESP => 4,
        SHUB_FLUSH_COMPLETED => 2,
        _ => return None,
    };
    Some(len)
}

/// Progress of an FRS read
#[derive(Debug, Default)]
struct FrsRead {
    record: u16,
    words: Vec<u32>,
    status: Option<u8>,
}

/// SH2 engine bound to a transport
pub struct Sh2Hub<H: Hal> {
    hal: H,
    listener: Option<Arc<dyn HubListener>>,
    is_open: bool,
    response_timeout: Duration,

    sequence_numbers: [u8; NUM_CHANNELS],
    cmd_seq: u8,
    packet_send_buf: [u8; PACKET_SEND_BUF_LEN],
    packet_recv_buf: Vec<u8>,

    // host clock extension
    last_time_us: u32,
    time_wraps: u64,
    // hub timebase reference, in 100 us ticks
    reference_delta: i64,

    // responses collected for the request in flight
    reset_complete: bool,
    feature: Option<(u8, SensorConfig)>,
    prod_ids: Vec<ProductId>,
    cmd_responses: VecDeque<[u8; COMMAND_RESP_LEN]>,
    frs_write_status: Option<u8>,
    frs_read: FrsRead,
    flush_completed: Option<u8>,
    last_error_received: u8,
}

impl<H: Hal> Sh2Hub<H> {
    pub fn new(hal: H) -> Self {
        Self {
            hal,
            listener: None,
            is_open: false,
            response_timeout: HUB_RESPONSE_TIMEOUT,
            sequence_numbers: [0; NUM_CHANNELS],
            cmd_seq: 0,
            packet_send_buf: [0; PACKET_SEND_BUF_LEN],
            packet_recv_buf: vec![0; PACKET_RECV_BUF_LEN],
            last_time_us: 0,
            time_wraps: 0,
            reference_delta: 0,
            reset_complete: false,
            feature: None,
            prod_ids: Vec::new(),
            cmd_responses: VecDeque::new(),
            frs_write_status: None,
            frs_read: FrsRead::default(),
            flush_completed: None,
            last_error_received: 0,
        }
    }

    /// Bound on each request/response exchange
    pub fn with_response_timeout(mut self, timeout: Duration) -> Self {
        self.response_timeout = timeout;
        self
    }

    pub fn hal(&self) -> &H {
        &self.hal
    }

    pub fn is_open(&self) -> bool {
        self.is_open
    }

    /// Last code from an SHTP error list
    pub fn last_error_received(&self) -> u8 {
        self.last_error_received
    }

    /// Report id of the last flush the hub acknowledged since `flush()`
    pub fn flush_completed(&self) -> Option<u8> {
        self.flush_completed
    }

    // =========================================================================
    // Transmit path
    // =========================================================================

    /// Prepare a packet for sending, in our send buffer
    fn prep_send_packet(&mut self, channel: u8, body_data: &[u8]) -> usize {
        let packet_length = body_data.len() + PACKET_HEADER_LENGTH;
        let packet_header = [
            (packet_length & 0xFF) as u8,
            (packet_length >> 8) as u8,
            channel,
            self.sequence_numbers[channel as usize],
        ];
        self.sequence_numbers[channel as usize] =
            self.sequence_numbers[channel as usize].wrapping_add(1);

        self.packet_send_buf[..PACKET_HEADER_LENGTH].copy_from_slice(&packet_header);
        self.packet_send_buf[PACKET_HEADER_LENGTH..packet_length].copy_from_slice(body_data);
        packet_length
    }

    fn send_packet(&mut self, channel: u8, body_data: &[u8]) -> Result<usize, HubError> {
        if !self.is_open {
            return Err(HubError::NotOpen);
        }
        let packet_length = self.prep_send_packet(channel, body_data);
        let written = self.hal.write(&self.packet_send_buf[..packet_length])?;
        if written == 0 {
            return Err(HubError::Timeout("hub ready for write"));
        }
        trace!("sent {} bytes on channel {}", packet_length, channel);
        Ok(written)
    }

    /// Send a command request. Returns the command sequence number used.
    fn send_command(&mut self, command: u8, params: &[u8]) -> Result<u8, HubError> {
        let mut body = [0u8; COMMAND_REQ_LEN];
        let seq = self.cmd_seq;
        body[0] = SHUB_COMMAND_REQ;
        body[1] = seq;
        body[2] = command;
        let n = params.len().min(COMMAND_REQ_LEN - 3);
        body[3..3 + n].copy_from_slice(&params[..n]);
        self.cmd_seq = self.cmd_seq.wrapping_add(1);
        self.send_packet(CHANNEL_HUB_CONTROL, &body)?;
        Ok(seq)
    }

    // =========================================================================
    // Receive path
    // =========================================================================

    /// Read and dispatch at most one packet
    fn service_once(&mut self) -> Result<(), HubError> {
        let mut buf = std::mem::take(&mut self.packet_recv_buf);
        let res = self.hal.read(&mut buf);
        let res = match res {
            Ok(0) => Ok(()),
            Ok(len) => {
                let len = len.min(buf.len());
                let timestamp_us = self.host_time_us();
                self.handle_received_packet(&buf[..len], timestamp_us);
                Ok(())
            }
            Err(e) => Err(HubError::Io(e)),
        };
        self.packet_recv_buf = buf;
        res
    }

    /// Pump the receive path until `done` holds
    fn wait_for<F>(&mut self, what: &'static str, mut done: F) -> Result<(), HubError>
    where
        F: FnMut(&mut Self) -> bool,
    {
        let start = Instant::now();
        loop {
            if done(self) {
                return Ok(());
            }
            if start.elapsed() >= self.response_timeout {
                warn!("No {} within {} ms", what, self.response_timeout.as_millis());
                return Err(HubError::Timeout(what));
            }
            self.service_once()?;
        }
    }

    /// Host clock widened to 64 bits
    fn host_time_us(&mut self) -> u64 {
        let now = self.hal.get_time_us();
        if now < self.last_time_us {
            self.time_wraps += 1;
        }
        self.last_time_us = now;
        (self.time_wraps << 32) | now as u64
    }

    fn handle_received_packet(&mut self, msg: &[u8], timestamp_us: u64) {
        if msg.len() < PACKET_HEADER_LENGTH {
            warn!(
                "Packet length of {} was ignored. Shorter than header length of {}",
                msg.len(),
                PACKET_HEADER_LENGTH
            );
            return;
        }
        let chan_num = msg[2];
        let payload = &msg[PACKET_HEADER_LENGTH..];
        if payload.is_empty() {
            return;
        }
        match chan_num {
            CHANNEL_COMMAND => match payload[0] {
                CMD_RESP_ADVERTISEMENT => trace!("advertisement, {} bytes", payload.len()),
                CMD_RESP_ERROR_LIST => self.handle_cmd_resp_error_list(payload),
                other => warn!("unknown cmd: {}", other),
            },
            CHANNEL_EXECUTABLE => match payload[0] {
                EXECUTABLE_DEVICE_RESP_RESET_COMPLETE => {
                    debug!("reset complete");
                    self.reset_complete = true;
                    self.reference_delta = 0;
                    if let Some(listener) = &self.listener {
                        listener.on_async_event(AsyncEvent::Reset);
                    }
                }
                other => warn!("unknown exe: {}", other),
            },
            CHANNEL_HUB_CONTROL => self.handle_control_reports(payload),
            CHANNEL_SENSOR_REPORTS | CHANNEL_WAKE_REPORTS => {
                self.handle_sensor_reports(payload, timestamp_us)
            }
            CHANNEL_GYRO_ROTATION => self.handle_gyro_rotation(payload, timestamp_us),
            _ => warn!("unknown chan 0x{:X}", chan_num),
        }
    }

    /// Handle one or more errors sent in response to a command
    fn handle_cmd_resp_error_list(&mut self, payload: &[u8]) {
        for &err in payload.iter().skip(1) {
            self.last_error_received = err;
            match err {
                0 => {}
                1 => warn!("Hub application attempted to exceed maximum read cargo length: Error code {}", err),
                2 => warn!("Host write was too short (need at least a 4-byte header): Error code {}", err),
                3 => warn!("Host wrote a header with length greater than maximum write cargo length: Error code {}", err),
                4 => warn!("Host wrote a header with length less than or equal to header length: Error code {}", err),
                5 => warn!("Host wrote beginning of fragmented cargo, fragmentation not supported: Error code {}", err),
                6 => warn!("Host wrote continuation of fragmented cargo, fragmentation not supported: Error code {}", err),
                7 => warn!("Unrecognized command on control channel: Error code {}", err),
                8 => warn!("Unrecognized parameter to get-advertisement command: Error code {}", err),
                9 => warn!("Host wrote to unrecognized channel: Error code {}", err),
                10 => warn!("Advertisement request received while Advertisement Response was pending: Error code {}", err),
                11 => warn!("Host performed a write operation before the hub had finished sending its advertisement response: Error code {}", err),
                12 => warn!("Error list too long to send, truncated: Error code {}", err),
                _ => debug!("Unknown error code {}", err),
            }
        }
        if let Some(listener) = &self.listener {
            listener.on_async_event(AsyncEvent::ShtpError(self.last_error_received));
        }
    }

    fn handle_control_reports(&mut self, payload: &[u8]) {
        let mut cursor = 0;
        while cursor < payload.len() {
            let report_id = payload[cursor];
            let Some(len) = control_report_len(report_id) else {
                warn!("unknown hbc: 0x{:X}", report_id);
                return;
            };
            if cursor + len > payload.len() {
                warn!("truncated hbc: 0x{:X}", report_id);
                return;
            }
            self.handle_control_report(&payload[cursor..cursor + len]);
            cursor += len;
        }
    }

    fn handle_control_report(&mut self, msg: &[u8]) {
        let u32_at = |at: usize| u32::from_le_bytes([msg[at], msg[at + 1], msg[at + 2], msg[at + 3]]);
        match msg[0] {
            SHUB_PROD_ID_RESP => {
                let pid = ProductId {
                    reset_cause: msg[1],
                    sw_version_major: msg[2],
                    sw_version_minor: msg[3],
                    sw_part_number: u32_at(4),
                    sw_build_number: u32_at(8),
                    sw_version_patch: u16::from_le_bytes([msg[12], msg[13]]),
                };
                trace!("PID_RESP {}.{}", pid.sw_version_major, pid.sw_version_minor);
                self.prod_ids.push(pid);
            }
            SHUB_GET_FEATURE_RESP => {
                trace!("feat resp: {}", msg[1]);
                self.feature = SensorConfig::from_feature_report(msg);
            }
            SHUB_COMMAND_RESP => {
                let mut resp = [0u8; COMMAND_RESP_LEN];
                resp.copy_from_slice(msg);
                let command = resp[2] & 0x7F;
                if command == SH2_CMD_INITIALIZE && resp[2] & SH2_INIT_UNSOLICITED != 0 {
                    trace!("unsolicited init response");
                    return;
                }
                trace!("CMD_RESP: 0x{:X}", command);
                self.cmd_responses.push_back(resp);
            }
            SHUB_FRS_READ_RESP => self.handle_frs_read_resp(msg),
            SHUB_FRS_WRITE_RESP => {
                trace!("write resp: {}", frs_status_to_str(msg[1]));
                self.frs_write_status = Some(msg[1]);
            }
            SHUB_FLUSH_COMPLETED => {
                trace!("flush completed: 0x{:X}", msg[1]);
                self.flush_completed = Some(msg[1]);
            }
            _ => {}
        }
    }

    fn handle_frs_read_resp(&mut self, msg: &[u8]) {
        let data_len = (msg[1] >> 4) as usize;
        let status = msg[1] & 0x0F;
        let offset = u16::from_le_bytes([msg[2], msg[3]]) as usize;
        let record = u16::from_le_bytes([msg[12], msg[13]]);
        if record != self.frs_read.record && status != FRS_READ_STATUS_UNRECOGNIZED {
            trace!("FRS read response for 0x{:X} ignored", record);
            return;
        }
        for n in 0..data_len.min(2) {
            let at = 4 + n * 4;
            let word = u32::from_le_bytes([msg[at], msg[at + 1], msg[at + 2], msg[at + 3]]);
            let index = offset + n;
            if self.frs_read.words.len() <= index {
                self.frs_read.words.resize(index + 1, 0);
            }
            self.frs_read.words[index] = word;
        }
        if status != FRS_READ_STATUS_NO_ERROR {
            self.frs_read.status = Some(status);
        }
    }

    fn handle_sensor_reports(&mut self, payload: &[u8], timestamp_us: u64) {
        let mut cursor = 0;
        while cursor < payload.len() {
            let report_id = payload[cursor];
            let Some(len) = report_len(report_id) else {
                warn!("Unknown report id 0x{:X}, dropping rest of packet", report_id);
                return;
            };
            if cursor + len > payload.len() {
                warn!("Report 0x{:X} truncated", report_id);
                return;
            }
            let msg = &payload[cursor..cursor + len];
            cursor += len;

            let word = || i64::from(u32::from_le_bytes([msg[1], msg[2], msg[3], msg[4]]) as i32);
            match report_id {
                SHUB_BASE_TIMESTAMP => self.reference_delta = -word(),
                SHUB_TIMESTAMP_REBASE => self.reference_delta -= word(),
                SHUB_FLUSH_COMPLETED => self.flush_completed = Some(msg[1]),
                _ => {
                    let delay_ticks = (((msg[2] & 0xFC) as i64) << 6) | msg[3] as i64;
                    let ts = timestamp_us as i64 + (self.reference_delta + delay_ticks) * 100;
                    let event = SensorEvent::new(
                        report_id,
                        ts.max(0) as u64,
                        (delay_ticks * 100) as u64,
                        msg,
                    );
                    if let Some(listener) = &self.listener {
                        listener.on_sensor_event(event);
                    }
                }
            }
        }
    }

    /// Gyro-integrated rotation vector reports carry no header
    fn handle_gyro_rotation(&mut self, payload: &[u8], timestamp_us: u64) {
        const CHUNK: usize = 14;
        for msg in payload.chunks_exact(CHUNK) {
            let event =
                SensorEvent::new(SENSOR_REPORTID_GYRO_INTEGRATED_RV, timestamp_us, 0, msg);
            if let Some(listener) = &self.listener {
                listener.on_sensor_event(event);
            }
        }
    }

    // =========================================================================
    // Request helpers
    // =========================================================================

    /// Wait for `count` responses to command `command` sent with `seq`
    fn wait_command_responses(
        &mut self,
        what: &'static str,
        command: u8,
        seq: u8,
        count: usize,
    ) -> Result<Vec<[u8; COMMAND_RESP_LEN]>, HubError> {
        let matches = |r: &[u8; COMMAND_RESP_LEN]| r[2] & 0x7F == command && r[3] == seq;
        self.wait_for(what, |hub| {
            hub.cmd_responses.iter().filter(|r| matches(r)).count() >= count
        })?;
        let mut found = Vec::with_capacity(count);
        self.cmd_responses.retain(|r| {
            if found.len() < count && matches(r) {
                found.push(*r);
                false
            } else {
                true
            }
        });
        Ok(found)
    }

    fn command_with_status(
        &mut self,
        what: &'static str,
        command: u8,
        params: &[u8],
    ) -> Result<[u8; COMMAND_RESP_LEN], HubError> {
        self.cmd_responses.clear();
        let seq = self.send_command(command, params)?;
        let resp = self
            .wait_command_responses(what, command, seq, 1)?
            .into_iter()
            .next()
            .ok_or(HubError::Timeout(what))?;
        if resp[5] != 0 {
            return Err(HubError::Rejected {
                op: what,
                status: resp[5],
            });
        }
        Ok(resp)
    }

    fn next_frs_write_status(&mut self) -> Result<u8, HubError> {
        self.wait_for("FRS write response", |hub| hub.frs_write_status.is_some())?;
        self.frs_write_status
            .take()
            .ok_or(HubError::Timeout("FRS write response"))
    }
}

impl<H: Hal + 'static> SensorHub for Sh2Hub<H> {
    fn open(&mut self, listener: Arc<dyn HubListener>) -> Result<(), HubError> {
        self.listener = Some(listener);
        self.reset_complete = false;
        self.sequence_numbers = [0; NUM_CHANNELS];
        self.cmd_seq = 0;
        self.hal.open()?;
        self.is_open = true;
        if let Err(e) = self.wait_for("reset complete", |hub| hub.reset_complete) {
            self.close();
            return Err(e);
        }
        debug!("sensor hub open");
        Ok(())
    }

    fn close(&mut self) {
        self.hal.close();
        self.is_open = false;
        self.listener = None;
        debug!("sensor hub closed");
    }

    fn service(&mut self) -> Result<(), HubError> {
        if !self.is_open {
            return Err(HubError::NotOpen);
        }
        self.service_once()
    }

    fn set_sensor_config(&mut self, sensor_id: u8, config: &SensorConfig) -> Result<(), HubError> {
        trace!(
            "set feature 0x{:X}, interval {} us",
            sensor_id,
            config.report_interval_us
        );
        let body = config.to_set_feature(sensor_id);
        self.send_packet(CHANNEL_HUB_CONTROL, &body)?;
        Ok(())
    }

    fn get_sensor_config(&mut self, sensor_id: u8) -> Result<SensorConfig, HubError> {
        self.feature = None;
        self.send_packet(CHANNEL_HUB_CONTROL, &[SHUB_GET_FEATURE_REQ, sensor_id])?;
        self.wait_for("get feature response", |hub| {
            matches!(hub.feature, Some((id, _)) if id == sensor_id)
        })?;
        self.feature
            .take()
            .map(|(_, cfg)| cfg)
            .ok_or(HubError::Timeout("get feature response"))
    }

    fn flush(&mut self, sensor_id: u8) -> Result<(), HubError> {
        self.flush_completed = None;
        self.send_packet(CHANNEL_HUB_CONTROL, &[SHUB_FORCE_FLUSH, sensor_id])?;
        Ok(())
    }

    fn get_prod_ids(&mut self) -> Result<Vec<ProductId>, HubError> {
        self.prod_ids.clear();
        self.send_packet(CHANNEL_HUB_CONTROL, &[SHUB_PROD_ID_REQ, 0])?;
        self.wait_for("product id response", |hub| !hub.prod_ids.is_empty())?;
        Ok(std::mem::take(&mut self.prod_ids))
    }

    fn hard_reset(&mut self) -> Result<(), HubError> {
        self.reset_complete = false;
        self.hal.hard_reset()?;
        Ok(())
    }

    fn soft_reset(&mut self) -> Result<(), HubError> {
        self.reset_complete = false;
        self.send_packet(CHANNEL_EXECUTABLE, &[EXECUTABLE_DEVICE_CMD_RESET])?;
        Ok(())
    }

    fn on(&mut self) -> Result<(), HubError> {
        self.send_packet(CHANNEL_EXECUTABLE, &[EXECUTABLE_DEVICE_CMD_ON])?;
        Ok(())
    }

    fn sleep(&mut self) -> Result<(), HubError> {
        self.send_packet(CHANNEL_EXECUTABLE, &[EXECUTABLE_DEVICE_CMD_SLEEP])?;
        Ok(())
    }

    fn set_cal_config(&mut self, sensors: u8) -> Result<(), HubError> {
        let params = [
            (sensors & 0x01 != 0) as u8,
            (sensors & 0x02 != 0) as u8,
            (sensors & 0x04 != 0) as u8,
            SH2_ME_CAL_CONFIG,
            (sensors & 0x08 != 0) as u8,
        ];
        self.command_with_status("calibration config", SH2_CMD_ME_CAL, &params)?;
        Ok(())
    }

    fn get_cal_config(&mut self) -> Result<u8, HubError> {
        let params = [0, 0, 0, SH2_ME_CAL_GET];
        let resp = self.command_with_status("calibration query", SH2_CMD_ME_CAL, &params)?;
        let mut sensors = 0;
        for (bit, enabled) in resp[6..10].iter().enumerate() {
            if *enabled != 0 {
                sensors |= 1 << bit;
            }
        }
        Ok(sensors)
    }

    fn save_dcd(&mut self) -> Result<(), HubError> {
        self.command_with_status("DCD save", SH2_CMD_DCD, &[])?;
        Ok(())
    }

    fn set_dcd_auto_save(&mut self, enabled: bool) -> Result<(), HubError> {
        // 0 enables periodic saves, 1 disables them
        self.send_command(SH2_CMD_DCD_PERIOD_SAVE, &[u8::from(!enabled)])?;
        Ok(())
    }

    fn clear_dcd_and_reset(&mut self) -> Result<(), HubError> {
        self.reset_complete = false;
        self.send_command(SH2_CMD_CLEAR_DCD_RESET, &[])?;
        Ok(())
    }

    fn get_frs(&mut self, record: u16) -> Result<Vec<u32>, HubError> {
        self.frs_read = FrsRead {
            record,
            ..Default::default()
        };
        self.send_packet(CHANNEL_HUB_CONTROL, &build_frs_read_request(record))?;
        self.wait_for("FRS read response", |hub| hub.frs_read.status.is_some())?;
        let read = std::mem::take(&mut self.frs_read);
        match read.status {
            Some(FRS_READ_STATUS_RECORD_COMPLETE)
            | Some(FRS_READ_STATUS_BLOCK_COMPLETE)
            | Some(FRS_READ_STATUS_BLOCK_RECORD_COMPLETE) => Ok(read.words),
            Some(FRS_READ_STATUS_EMPTY) => Ok(Vec::new()),
            Some(status) => Err(HubError::Rejected {
                op: "FRS read",
                status,
            }),
            None => Err(HubError::Timeout("FRS read response")),
        }
    }

    fn set_frs(&mut self, record: u16, words: &[u32]) -> Result<(), HubError> {
        let length = u16::try_from(words.len())
            .map_err(|_| HubError::InvalidParam(format!("{} words", words.len())))?;
        self.frs_write_status = None;
        self.send_packet(
            CHANNEL_HUB_CONTROL,
            &build_frs_write_request(length, record),
        )?;

        let mut offset = 0;
        loop {
            match self.next_frs_write_status()? {
                FRS_STATUS_WRITE_COMPLETE => return Ok(()),
                FRS_STATUS_RECORD_VALID => {}
                FRS_STATUS_WRITE_READY | FRS_STATUS_WORD_RECEIVED => {
                    if offset < words.len() {
                        let word0 = words[offset];
                        let word1 = words.get(offset + 1).copied().unwrap_or(0);
                        let body = build_frs_write_data(offset as u16, word0, word1);
                        self.send_packet(CHANNEL_HUB_CONTROL, &body)?;
                        offset += FRS_WORDS_PER_WRITE;
                    }
                }
                status => {
                    warn!("FRS write of 0x{:X}: {}", record, frs_status_to_str(status));
                    return Err(HubError::Rejected {
                        op: "FRS write",
                        status,
                    });
                }
            }
        }
    }

    fn get_metadata(&mut self, sensor_id: u8) -> Result<MetaData, HubError> {
        let record = meta_record_for(sensor_id).ok_or_else(|| {
            HubError::InvalidParam(format!("no META record for report 0x{:X}", sensor_id))
        })?;
        let words = self.get_frs(record)?;
        parse_metadata(&words)
    }

    fn get_counts(&mut self, sensor_id: u8) -> Result<SampleCounts, HubError> {
        self.cmd_responses.clear();
        let seq = self.send_command(SH2_CMD_COUNTS, &[SH2_COUNTS_GET_COUNTS, sensor_id])?;
        let resps = self.wait_command_responses("sample counts", SH2_CMD_COUNTS, seq, 2)?;
        let word = |r: &[u8; COMMAND_RESP_LEN], at: usize| {
            u32::from_le_bytes([r[at], r[at + 1], r[at + 2], r[at + 3]])
        };
        let mut counts = SampleCounts::default();
        for resp in &resps {
            if resp[4] == 0 {
                counts.offered = word(resp, 8);
                counts.accepted = word(resp, 12);
            } else {
                counts.on = word(resp, 8);
                counts.attempted = word(resp, 12);
            }
        }
        Ok(counts)
    }

    fn clear_counts(&mut self, sensor_id: u8) -> Result<(), HubError> {
        self.send_command(SH2_CMD_COUNTS, &[SH2_COUNTS_CLEAR_COUNTS, sensor_id])?;
        Ok(())
    }

    fn tare_now(&mut self, axes: u8, basis: u8) -> Result<(), HubError> {
        self.send_command(SH2_CMD_TARE, &[SH2_TARE_TARE_NOW, axes, basis])?;
        Ok(())
    }

    fn persist_tare(&mut self) -> Result<(), HubError> {
        self.send_command(SH2_CMD_TARE, &[SH2_TARE_PERSIST_TARE])?;
        Ok(())
    }

    fn clear_tare(&mut self) -> Result<(), HubError> {
        // zero reorientation quaternion
        self.send_command(SH2_CMD_TARE, &[SH2_TARE_SET_REORIENTATION])?;
        Ok(())
    }
}
