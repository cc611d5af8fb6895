// Copyright 2025 Au-Zone Technologies Inc.
// SPDX-License-Identifier: Apache-2.0

//! Driver behaviour against the in-memory sensor hub.

use bno08x_rs::{
    constants::{
        SENSOR_REPORTID_ACCELEROMETER, SENSOR_REPORTID_GRAVITY, SENSOR_REPORTID_GYROSCOPE,
        SENSOR_REPORTID_ROTATION_VECTOR,
    },
    interface::InterruptBridge,
    sync::RESET_OCCURRED,
    testing::{rotation_event, vector_event, HubCall, MockHub},
    types::ResetReason,
    Bno08x, Bno08xConfig, Error, StatsSnapshot,
};
use crossbeam::channel::bounded;
use std::{
    sync::{
        atomic::{AtomicU32, Ordering},
        Arc, Mutex, Once,
    },
    thread,
    time::{Duration, Instant},
};

static INIT: Once = Once::new();

fn init_logger() {
    INIT.call_once(|| {
        let _ = env_logger::builder().is_test(true).try_init();
    });
}

fn config() -> Bno08xConfig {
    Bno08xConfig::default().with_data_available_timeout(Duration::from_millis(500))
}

fn start(config: Bno08xConfig) -> (Bno08x<MockHub>, MockHub) {
    init_logger();
    let bridge = InterruptBridge::new();
    let hub = MockHub::new(Arc::clone(&bridge));
    let mut imu = Bno08x::from_parts(config, hub.clone(), bridge).unwrap();
    imu.initialize().unwrap();
    hub.clear_calls();
    (imu, hub)
}

/// Poll the driver counters until `pred` holds
fn wait_stats<H>(imu: &Bno08x<H>, pred: impl Fn(&StatsSnapshot) -> bool) -> StatsSnapshot
where
    H: bno08x_rs::hub::SensorHub,
{
    let deadline = Instant::now() + Duration::from_secs(2);
    loop {
        let stats = imu.stats();
        if pred(&stats) || Instant::now() >= deadline {
            return stats;
        }
        thread::sleep(Duration::from_millis(2));
    }
}

/// Poll the task bits until the reset flag is cleared and return them
fn wait_replay_done<H>(imu: &Bno08x<H>) -> u32
where
    H: bno08x_rs::hub::SensorHub,
{
    let events = imu.bridge().task_events();
    let deadline = Instant::now() + Duration::from_secs(2);
    loop {
        let bits = events.get_bits();
        if bits & RESET_OCCURRED == 0 || Instant::now() >= deadline {
            return bits;
        }
        thread::sleep(Duration::from_millis(2));
    }
}

fn set_configs(calls: &[HubCall], id: u8) -> usize {
    calls
        .iter()
        .filter(|c| matches!(c, HubCall::SetSensorConfig(sid, _) if *sid == id))
        .count()
}

#[test]
fn test_enable_read_disable() {
    let (imu, hub) = start(config());
    let accel = imu.accelerometer();
    accel.enable(20_000).unwrap();
    assert!(accel.is_enabled());
    assert_eq!(accel.period_us(), 20_000);
    assert_eq!(imu.enabled_reports(), vec![SENSOR_REPORTID_ACCELEROMETER]);
    assert!(hub
        .calls()
        .contains(&HubCall::Flush(SENSOR_REPORTID_ACCELEROMETER)));

    hub.queue_event(vector_event(SENSOR_REPORTID_ACCELEROMETER, 0.5, -1.0, 9.75));
    assert_eq!(imu.data_available_with_id(), Some(SENSOR_REPORTID_ACCELEROMETER));
    let a = accel.get();
    assert!((a.x - 0.5).abs() < 0.01);
    assert!((a.y + 1.0).abs() < 0.01);
    assert!((a.z - 9.75).abs() < 0.01);
    assert!(accel.has_new_data());
    assert!(!accel.has_new_data());

    accel.disable().unwrap();
    assert!(!accel.is_enabled());
    assert_eq!(accel.period_us(), 0);
    assert!(imu.enabled_reports().is_empty());
    let last = *hub
        .configs_for(SENSOR_REPORTID_ACCELEROMETER)
        .last()
        .unwrap();
    assert_eq!(last.report_interval_us, 0);
    assert_eq!(last.batch_interval_us, 0);
}

#[test]
fn test_disable_of_disabled_report_sends_nothing() {
    let (imu, hub) = start(config());
    imu.gravity().disable().unwrap();
    assert!(hub.calls().is_empty());
}

#[test]
fn test_repeated_enable_keeps_one_entry() {
    let (imu, hub) = start(config());
    let rv = imu.rotation_vector();
    rv.enable(10_000).unwrap();
    rv.enable(5_000).unwrap();
    imu.gravity().enable(10_000).unwrap();
    rv.enable(2_500).unwrap();

    assert_eq!(
        imu.enabled_reports(),
        vec![SENSOR_REPORTID_ROTATION_VECTOR, SENSOR_REPORTID_GRAVITY]
    );
    assert_eq!(rv.period_us(), 2_500);
    assert_eq!(set_configs(&hub.calls(), SENSOR_REPORTID_ROTATION_VECTOR), 3);
}

#[test]
fn test_failed_enable_leaves_report_disabled() {
    let (imu, hub) = start(config());
    hub.fail_sensor(SENSOR_REPORTID_GRAVITY);
    assert!(matches!(imu.gravity().enable(10_000), Err(Error::Hub(_))));
    assert!(!imu.gravity().is_enabled());
    assert!(imu.enabled_reports().is_empty());
}

#[test]
fn test_data_available_is_bounded() {
    let cfg = config().with_data_available_timeout(Duration::from_millis(150));
    let (imu, _hub) = start(cfg);
    imu.accelerometer().enable(10_000).unwrap();

    let started = Instant::now();
    assert!(!imu.data_available());
    let waited = started.elapsed();
    assert!(waited >= Duration::from_millis(140), "{:?}", waited);
    assert!(waited < Duration::from_secs(2), "{:?}", waited);
    assert_eq!(imu.data_available_with_id(), None);
}

#[test]
fn test_hub_calls_never_overlap() {
    let (imu, hub) = start(config());
    hub.set_call_delay(Duration::from_millis(1));

    thread::scope(|s| {
        s.spawn(|| {
            for _ in 0..5 {
                imu.accelerometer().enable(10_000).unwrap();
                imu.accelerometer().disable().unwrap();
            }
        });
        s.spawn(|| {
            for _ in 0..5 {
                imu.cal_gyro().enable(10_000).unwrap();
                imu.get_dynamic_calibration().unwrap();
            }
        });
        s.spawn(|| {
            for _ in 0..20 {
                hub.queue_event(rotation_event(
                    SENSOR_REPORTID_ROTATION_VECTOR,
                    1.0,
                    0.0,
                    0.0,
                    0.0,
                ));
                thread::sleep(Duration::from_millis(1));
            }
        });
    });

    assert_eq!(hub.max_in_flight(), 1);
}

#[test]
fn test_reset_replays_enabled_reports() {
    let (imu, hub) = start(config());
    imu.accelerometer().enable(10_000).unwrap();
    imu.rotation_vector().enable(20_000).unwrap();
    imu.gravity().enable(40_000).unwrap();
    hub.clear_calls();

    hub.emit_reset();
    assert!(hub.wait_for_calls(Duration::from_secs(2), |calls| {
        [
            SENSOR_REPORTID_ACCELEROMETER,
            SENSOR_REPORTID_ROTATION_VECTOR,
            SENSOR_REPORTID_GRAVITY,
        ]
        .iter()
        .all(|&id| set_configs(calls, id) == 1)
    }));

    assert_eq!(
        hub.configs_for(SENSOR_REPORTID_ROTATION_VECTOR)[0].report_interval_us,
        20_000
    );
    assert_eq!(
        hub.configs_for(SENSOR_REPORTID_GRAVITY)[0].report_interval_us,
        40_000
    );
    let stats = wait_stats(&imu, |s| s.resets_detected == 1);
    assert_eq!(stats.resets_detected, 1);
    assert_eq!(stats.replay_failures, 0);
    assert_eq!(wait_replay_done(&imu) & RESET_OCCURRED, 0);
    assert_eq!(imu.enabled_reports().len(), 3);
}

#[test]
fn test_replay_continues_past_a_failing_report() {
    let (imu, hub) = start(config());
    imu.accelerometer().enable(10_000).unwrap();
    imu.cal_gyro().enable(10_000).unwrap();
    imu.gravity().enable(10_000).unwrap();
    hub.fail_sensor(SENSOR_REPORTID_GYROSCOPE);
    hub.clear_calls();

    hub.emit_reset();
    assert!(hub.wait_for_calls(Duration::from_secs(2), |calls| {
        set_configs(calls, SENSOR_REPORTID_GRAVITY) == 1
    }));
    let stats = wait_stats(&imu, |s| s.replay_failures == 1);
    assert_eq!(stats.replay_failures, 1);
    assert_eq!(wait_replay_done(&imu) & RESET_OCCURRED, 0);

    let calls = hub.calls();
    assert_eq!(set_configs(&calls, SENSOR_REPORTID_ACCELEROMETER), 1);
    assert_eq!(set_configs(&calls, SENSOR_REPORTID_GYROSCOPE), 1);
    assert_eq!(set_configs(&calls, SENSOR_REPORTID_GRAVITY), 1);
}

#[test]
fn test_reset_during_replay_triggers_another_replay() {
    let (imu, hub) = start(config());
    imu.accelerometer().enable(10_000).unwrap();
    imu.gravity().enable(10_000).unwrap();
    hub.clear_calls();
    hub.reset_during_config(SENSOR_REPORTID_GRAVITY);

    hub.emit_reset();
    assert!(hub.wait_for_calls(Duration::from_secs(2), |calls| {
        set_configs(calls, SENSOR_REPORTID_ACCELEROMETER) == 2
            && set_configs(calls, SENSOR_REPORTID_GRAVITY) == 2
    }));
    let stats = wait_stats(&imu, |s| s.resets_detected == 2);
    assert_eq!(stats.resets_detected, 2);
    assert_eq!(wait_replay_done(&imu) & RESET_OCCURRED, 0);

    let calls = hub.calls();
    assert_eq!(set_configs(&calls, SENSOR_REPORTID_ACCELEROMETER), 2);
    assert_eq!(set_configs(&calls, SENSOR_REPORTID_GRAVITY), 2);
    assert_eq!(imu.enabled_reports().len(), 2);
}

#[test]
fn test_reset_during_streaming_keeps_data_flowing() {
    let (imu, hub) = start(config());
    let accel = imu.accelerometer();
    accel.enable(10_000).unwrap();
    hub.queue_event(vector_event(SENSOR_REPORTID_ACCELEROMETER, 0.0, 0.0, 1.0));
    assert!(imu.data_available());

    hub.emit_reset();
    wait_stats(&imu, |s| s.resets_detected == 1);
    assert!(hub.wait_for_calls(Duration::from_secs(2), |calls| {
        set_configs(calls, SENSOR_REPORTID_ACCELEROMETER) == 2
    }));
    assert!(accel.is_enabled());

    hub.queue_event(vector_event(SENSOR_REPORTID_ACCELEROMETER, 0.0, 0.0, 2.0));
    let deadline = Instant::now() + Duration::from_secs(2);
    while (accel.get().z - 2.0).abs() > 0.01 && Instant::now() < deadline {
        thread::sleep(Duration::from_millis(2));
    }
    assert!((accel.get().z - 2.0).abs() < 0.01);
}

#[test]
fn test_hard_reset_disables_everything_without_replay() {
    let (imu, hub) = start(config());
    imu.accelerometer().enable(10_000).unwrap();
    imu.rotation_vector().enable(10_000).unwrap();
    hub.clear_calls();

    imu.hard_reset().unwrap();
    assert!(imu.enabled_reports().is_empty());
    assert!(!imu.accelerometer().is_enabled());

    // Give the service worker a chance to misbehave
    thread::sleep(Duration::from_millis(50));
    let calls = hub.calls();
    assert!(calls.contains(&HubCall::HardReset));
    assert_eq!(set_configs(&calls, SENSOR_REPORTID_ACCELEROMETER), 0);
    assert_eq!(imu.stats().resets_detected, 0);
    assert_eq!(imu.get_reset_reason().unwrap(), ResetReason::ExtRst);
}

#[test]
fn test_host_reset_rejects_wrong_reason() {
    let (imu, hub) = start(config());
    hub.set_reset_cause(1);
    assert!(matches!(
        imu.soft_reset(),
        Err(Error::UnexpectedResetReason(ResetReason::Por))
    ));
}

#[test]
fn test_host_reset_times_out_when_hub_is_silent() {
    let (imu, hub) = start(config());
    hub.set_announce_reset(false);
    assert!(matches!(imu.hard_reset(), Err(Error::Timeout(_))));
}

#[test]
fn test_callbacks_run_for_matching_reports() {
    let (imu, hub) = start(config());
    let any = Arc::new(Mutex::new(Vec::new()));
    let rv_only = Arc::new(AtomicU32::new(0));

    // Registration order is run order
    let count = Arc::clone(&rv_only);
    imu.rotation_vector()
        .register_cb(move || {
            count.fetch_add(1, Ordering::SeqCst);
        })
        .unwrap();
    let seen = Arc::clone(&any);
    imu.register_cb_with_id(move |id| seen.lock().unwrap().push(id))
        .unwrap();

    imu.accelerometer().enable(10_000).unwrap();
    imu.rotation_vector().enable(10_000).unwrap();
    hub.queue_event(vector_event(SENSOR_REPORTID_ACCELEROMETER, 0.0, 0.0, 9.8));
    hub.queue_event(rotation_event(SENSOR_REPORTID_ROTATION_VECTOR, 1.0, 0.0, 0.0, 0.0));

    let deadline = Instant::now() + Duration::from_secs(2);
    while any.lock().unwrap().len() < 2 && Instant::now() < deadline {
        thread::sleep(Duration::from_millis(2));
    }
    assert_eq!(
        *any.lock().unwrap(),
        vec![SENSOR_REPORTID_ACCELEROMETER, SENSOR_REPORTID_ROTATION_VECTOR]
    );
    assert_eq!(rv_only.load(Ordering::SeqCst), 1);
}

#[test]
fn test_callback_list_capacity() {
    let (imu, _hub) = start(config().with_callback_capacity(1));
    imu.register_cb(|| {}).unwrap();
    assert!(matches!(
        imu.accelerometer().register_cb(|| {}),
        Err(Error::CallbackListFull(1))
    ));
}

#[test]
fn test_slow_callback_drops_notifications() {
    let (imu, hub) = start(config().with_callback_queue_size(1));
    let (release_tx, release_rx) = bounded::<()>(0);
    imu.register_cb(move || {
        let _ = release_rx.recv();
    })
    .unwrap();
    imu.accelerometer().enable(10_000).unwrap();

    for z in 0..6 {
        hub.queue_event(vector_event(SENSOR_REPORTID_ACCELEROMETER, 0.0, 0.0, z as f32));
    }
    let stats = wait_stats(&imu, |s| s.callbacks_dropped >= 1);
    assert!(stats.callbacks_dropped >= 1);

    // Samples keep landing in the store while callbacks are stuck
    let deadline = Instant::now() + Duration::from_secs(2);
    while (imu.accelerometer().get().z - 5.0).abs() > 0.01 && Instant::now() < deadline {
        thread::sleep(Duration::from_millis(2));
    }
    assert!((imu.accelerometer().get().z - 5.0).abs() < 0.01);
    drop(release_tx);
}

#[test]
fn test_deinit_stops_workers_and_closes_hub() {
    let (mut imu, hub) = start(config().with_callback_capacity(1));
    imu.accelerometer().enable(10_000).unwrap();
    imu.register_cb(|| {}).unwrap();

    imu.deinit().unwrap();
    assert!(!imu.is_initialized());
    assert!(!hub.is_open());
    assert!(hub.calls().contains(&HubCall::Close));
    assert!(imu.enabled_reports().is_empty());
    // Second call is a no-op
    imu.deinit().unwrap();

    imu.initialize().unwrap();
    // The only callback slot was freed by deinit
    imu.register_cb(|| {}).unwrap();
    assert!(hub.is_open());
}

#[test]
fn test_deinit_reports_stuck_worker() {
    let (mut imu, hub) = start(config());
    let (release_tx, release_rx) = bounded::<()>(0);
    let (entered_tx, entered_rx) = bounded::<()>(1);
    imu.register_cb(move || {
        let _ = entered_tx.try_send(());
        let _ = release_rx.recv();
    })
    .unwrap();
    imu.accelerometer().enable(10_000).unwrap();
    hub.queue_event(vector_event(SENSOR_REPORTID_ACCELEROMETER, 0.0, 0.0, 1.0));
    entered_rx.recv_timeout(Duration::from_secs(2)).unwrap();

    match imu.deinit() {
        Err(Error::TeardownTimeout { acked, expected }) => {
            assert_eq!(expected, 3);
            assert_eq!(acked, 2);
        }
        other => panic!("unexpected teardown result {:?}", other),
    }
    assert!(!imu.is_initialized());
    drop(release_tx);
}

#[test]
fn test_calibration_and_frs_operations() {
    let (imu, hub) = start(config());
    imu.save_dynamic_calibration().unwrap();
    imu.dynamic_calibration_autosave_enable().unwrap();
    imu.dynamic_calibration_autosave_disable().unwrap();
    imu.set_frs(0x1234, &[1, 2, 3]).unwrap();
    assert_eq!(imu.get_frs(0x1234).unwrap(), vec![1, 2, 3]);
    imu.sleep().unwrap();
    imu.on().unwrap();

    assert_eq!(
        &hub.calls()[..4],
        &[
            HubCall::SaveDcd,
            HubCall::SetDcdAutoSave(true),
            HubCall::SetDcdAutoSave(false),
            HubCall::SetFrs(0x1234, vec![1, 2, 3]),
        ]
    );

    imu.accelerometer().enable(10_000).unwrap();
    imu.clear_dynamic_calibration().unwrap();
    assert!(imu.enabled_reports().is_empty());
    assert!(hub.calls().contains(&HubCall::ClearDcdAndReset));
}

#[test]
fn test_report_level_hub_operations() {
    let (imu, hub) = start(config());
    let rv = imu.game_rotation_vector();
    rv.tare(bno08x_rs::types::TareAxis::All).unwrap();
    rv.tare_persist().unwrap();
    rv.tare_clear().unwrap();
    assert!(hub.calls().iter().any(|c| matches!(c, HubCall::TareNow(_, 1))));

    let meta = imu.accelerometer().get_meta_data().unwrap();
    assert_eq!(meta.min_period_us, 2500);
    imu.accelerometer().clear_sample_counts().unwrap();
    assert!(hub
        .calls()
        .contains(&HubCall::ClearCounts(SENSOR_REPORTID_ACCELEROMETER)));
}

#[test]
fn test_disable_all_reports() {
    let (imu, _hub) = start(config());
    imu.accelerometer().enable(10_000).unwrap();
    imu.gravity().enable(10_000).unwrap();
    imu.tap_detector().enable(10_000).unwrap();
    imu.disable_all_reports().unwrap();
    assert!(imu.enabled_reports().is_empty());
    assert!(!imu.tap_detector().is_enabled());
}
