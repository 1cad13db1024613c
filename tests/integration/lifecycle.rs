//! Stream lifecycle integration tests
//!
//! Start, stop, reconfiguration and shutdown as seen through the backend's
//! call journal.

use crate::helpers::*;
use audiodev::core::{BackendError, NativeErrorCode};
use audiodev::offline::{BackendCall, OfflineBackend};
use audiodev::prelude::*;
use audiodev::StreamState;
use std::sync::Arc;

const FULL_CYCLE: [BackendCall; 4] = [
    BackendCall::Stop,
    BackendCall::Close,
    BackendCall::Open,
    BackendCall::Start,
];

#[test]
fn test_start_then_stop() {
    let mut manager = test_manager();
    let (_log, callback) = recording_callback();

    manager.start(stereo_output(TEST_BLOCK_SIZE), callback).unwrap();
    assert_eq!(manager.state(), StreamState::Running);
    assert!(manager.is_open());
    assert_eq!(manager.stream_sample_rate(), TEST_SAMPLE_RATE);

    manager.stop().unwrap();
    assert_eq!(manager.state(), StreamState::Closed);
    assert!(manager.config().is_none());
    assert_eq!(manager.stream_sample_rate(), 0);
    assert_eq!(manager.stream_latency(), 0);
}

#[test]
fn test_stop_is_idempotent() {
    let mut manager = test_manager();
    manager.stop().unwrap();

    let (_log, callback) = recording_callback();
    manager.start(stereo_output(TEST_BLOCK_SIZE), callback).unwrap();
    manager.stop().unwrap();
    manager.stop().unwrap();

    assert_eq!(
        manager.backend().calls(),
        &[
            BackendCall::Open,
            BackendCall::Start,
            BackendCall::Stop,
            BackendCall::Close
        ]
    );
}

/// Shrinking the block size of a running stream is exactly one full cycle,
/// and the callback sees the block size the backend actually chose.
#[test]
fn test_set_config_block_size_cycle() {
    let mut manager = test_manager_with(OfflineBackend::new().with_block_granularity(96));
    let (log, callback) = recording_callback();

    // 512 is not a multiple of 96
    manager.start(stereo_output(512), callback).unwrap();
    assert_eq!(manager.config().unwrap().max_block_size, 576);
    manager.backend_mut().run_period();
    manager.backend_mut().clear_calls();

    manager.set_config(stereo_output(256)).unwrap();
    assert_eq!(manager.backend().calls(), &FULL_CYCLE);
    assert_eq!(manager.config().unwrap().max_block_size, 288);

    manager.backend_mut().run_period();
    let last = log.lock().last().cloned().unwrap();
    assert!(last.dirty);
    assert_eq!(last.max_block_size, 288);
    assert_eq!(last.num_frames, 288);
}

#[test]
fn test_set_config_same_config_twice() {
    let mut manager = test_manager();
    let (log, callback) = recording_callback();
    manager.start(stereo_output(128), callback).unwrap();
    manager.backend_mut().run_period();

    for _ in 0..2 {
        manager.backend_mut().clear_calls();
        manager.set_config(stereo_output(128)).unwrap();
        assert_eq!(manager.backend().calls(), &FULL_CYCLE);
        manager.backend_mut().run_periods(2);
    }

    // One dirty period per open, even with an unchanged shape
    assert_eq!(dirty_count(&log), 3);
    assert_eq!(log.lock().len(), 5);
}

#[test]
fn test_set_config_before_start_is_invalid_use() {
    let mut manager = test_manager();
    let err = manager.set_config(stereo_output(128)).unwrap_err();
    assert_eq!(err.code(), ErrorCode::InvalidUse);
    assert!(manager.backend().calls().is_empty());
}

#[test]
fn test_open_failure_leaves_stream_closed() {
    let mut manager = test_manager();
    let (_log, callback) = recording_callback();
    manager.start(stereo_output(128), callback).unwrap();

    manager
        .backend_mut()
        .fail_next_open(BackendError::new(NativeErrorCode::DRIVER_ERROR, "device busy"));
    let err = manager.set_config(stereo_output(256)).unwrap_err();

    assert_eq!(err.code(), ErrorCode::DriverError);
    assert!(err.to_string().contains("device busy"));
    assert_eq!(manager.state(), StreamState::Closed);
    assert!(!manager.backend().is_stream_open());

    // Retrying with the registered callback works
    manager.set_config(stereo_output(256)).unwrap();
    assert!(manager.is_running());
}

#[test]
fn test_backend_rejection_translated() {
    let mut manager = test_manager();
    let (_log, callback) = recording_callback();

    // Default device has two output channels
    let config = StreamConfig::output_only(StreamParameters::new(0, 4), TEST_SAMPLE_RATE, 128);
    let err = manager.start(config, callback).unwrap_err();
    assert_eq!(err.code(), ErrorCode::InvalidParameter);

    let config = StreamConfig::output_only(StreamParameters::new(42, 2), TEST_SAMPLE_RATE, 128);
    let err = manager.set_config(config).unwrap_err();
    assert_eq!(err.code(), ErrorCode::InvalidDevice);
    assert_eq!(manager.state(), StreamState::Closed);
}

#[test]
fn test_fatal_errors_polled_on_control_thread() {
    let mut manager = test_manager();
    let (_log, callback) = recording_callback();
    manager.start(stereo_output(128), callback).unwrap();

    manager.backend().report_error(BackendError::new(
        NativeErrorCode::THREAD_ERROR,
        "audio thread died",
    ));
    manager.backend().report_error(BackendError::new(
        NativeErrorCode::DEVICE_DISCONNECT,
        "unplugged",
    ));

    let errors = manager.drain_errors();
    assert_eq!(errors.len(), 2);
    assert!(errors.iter().all(|e| e.is_fatal()));
    assert_eq!(errors[1].code(), ErrorCode::DeviceDisconnect);
    assert!(manager.poll_error().is_none());
}

#[test]
fn test_reconfigure_discards_stale_errors() {
    let mut manager = test_manager();
    let (_log, callback) = recording_callback();
    manager.start(stereo_output(128), callback).unwrap();

    manager.backend().report_error(BackendError::new(
        NativeErrorCode::DRIVER_ERROR,
        "old stream",
    ));
    manager.set_config(stereo_output(256)).unwrap();
    assert!(manager.poll_error().is_none());
}

#[test]
fn test_drop_releases_stream_and_callback() {
    let token = Arc::new(());
    let held = token.clone();

    {
        let mut manager = test_manager();
        manager
            .start(stereo_output(128), move |_info| {
                assert!(Arc::strong_count(&held) >= 2);
            })
            .unwrap();
        manager.backend_mut().run_period();
        assert_eq!(Arc::strong_count(&token), 2);
    }

    assert_eq!(Arc::strong_count(&token), 1);
}

#[test]
fn test_stream_time_tracks_processed_frames() {
    let mut manager = test_manager();
    let (log, callback) = recording_callback();
    manager.start(stereo_output(480), callback).unwrap();

    manager.backend_mut().run_periods(5);
    assert!((manager.stream_time() - 0.05).abs() < 1e-9);

    let times: Vec<f64> = log.lock().iter().map(|o| o.stream_time).collect();
    assert_eq!(times[0], 0.0);
    assert!((times[4] - 0.04).abs() < 1e-9);
}

#[test]
fn test_latency_reported_while_open() {
    let mut manager = test_manager();
    manager.backend_mut().set_latency(256);
    assert_eq!(manager.stream_latency(), 0);

    manager.start(stereo_output(128), |_| {}).unwrap();
    assert_eq!(manager.stream_latency(), 256);
}
