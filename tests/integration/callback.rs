//! Callback integration tests
//!
//! Dirty signaling, typed buffer access, xrun status and stream control.

use crate::helpers::*;
use audiodev::core::NativeStreamStatus;
use audiodev::offline::OfflineBackend;
use audiodev::prelude::*;
use audiodev::I24;

#[test]
fn test_dirty_only_on_first_period() {
    let mut manager = test_manager();
    let (log, callback) = recording_callback();
    manager.start(stereo_output(64), callback).unwrap();

    manager.backend_mut().run_periods(4);

    let dirty: Vec<bool> = log.lock().iter().map(|o| o.dirty).collect();
    assert_eq!(dirty, vec![true, false, false, false]);
}

#[test]
fn test_dirty_after_each_reconfiguration() {
    let mut manager = test_manager();
    let (log, callback) = recording_callback();
    manager.start(stereo_output(64), callback).unwrap();
    manager.backend_mut().run_periods(3);

    manager
        .set_config(stereo_output(64).with_sample_rate(44100))
        .unwrap();
    manager.backend_mut().run_periods(3);

    manager.set_config(stereo_duplex(64)).unwrap();
    manager.backend_mut().run_periods(3);

    let log = log.lock();
    let dirty: Vec<bool> = log.iter().map(|o| o.dirty).collect();
    assert_eq!(
        dirty,
        vec![true, false, false, true, false, false, true, false, false]
    );
    assert_eq!(log[3].sample_rate, 44100);
    assert_eq!(log[6].num_inputs, 2);
    assert_eq!(log[6].num_outputs, 2);
}

#[test]
fn test_info_reflects_config() {
    let mut manager = test_manager();
    let (log, callback) = recording_callback();
    let config = StreamConfig::input_only(StreamParameters::new(0, 1), 96000, 32);
    manager.start(config, callback).unwrap();
    manager.backend_mut().run_period();

    let first = log.lock()[0].clone();
    assert_eq!(first.num_inputs, 1);
    assert_eq!(first.num_outputs, 0);
    assert_eq!(first.num_frames, 32);
    assert_eq!(first.sample_rate, 96000);
    assert_eq!(first.max_block_size, 32);
    assert_eq!(first.status, CallbackStatus::Ok);
}

#[test]
fn test_duplex_input_scaled_to_outputs() {
    let mut manager = test_manager();
    let config = StreamConfig::output_only(StreamParameters::new(0, 2), TEST_SAMPLE_RATE, 4)
        .with_input(Some(StreamParameters::new(0, 1).with_first_channel(1)));

    manager
        .start(config, |info| {
            let Some(input) = info.input::<f32>(0).map(|s| s.to_vec()) else {
                return;
            };
            if let Some(channels) = info.outputs_mut::<f32>() {
                for (ch, out) in channels.enumerate() {
                    for (o, i) in out.iter_mut().zip(&input) {
                        *o = i * (ch + 1) as f32;
                    }
                }
            }
        })
        .unwrap();

    assert!(manager.backend_mut().write_input(0, &[0.1f32, 0.2, 0.3, 0.4]));
    manager.backend_mut().run_period();

    assert_eq!(
        manager.backend().output::<f32>(0).unwrap(),
        &[0.1, 0.2, 0.3, 0.4]
    );
    assert_eq!(
        manager.backend().output::<f32>(1).unwrap(),
        &[0.2, 0.4, 0.6, 0.8]
    );
}

#[test]
fn test_typed_access_checks_format() {
    let mut manager = test_manager();
    let config = stereo_output(8).with_format(Format::Int16);

    manager
        .start(config, |info| {
            assert!(info.output_mut::<f32>(0).is_none());
            assert!(info.output_mut::<i16>(2).is_none());
            info.output_mut::<i16>(0).unwrap().fill(i16::MAX);
            info.output_mut::<i16>(1).unwrap().fill(i16::MIN);
        })
        .unwrap();
    manager.backend_mut().run_period();

    assert!(manager.backend().output::<i16>(0).unwrap().iter().all(|&s| s == i16::MAX));
    assert!(manager.backend().output::<i16>(1).unwrap().iter().all(|&s| s == i16::MIN));
}

#[test]
fn test_packed_24_bit_samples() {
    let mut manager = test_manager();
    let config = stereo_output(4).with_format(Format::Int24);

    manager
        .start(config, |info| {
            for channel in info.outputs_mut::<I24>().into_iter().flatten() {
                channel.fill(I24::from_i32(-1000));
            }
        })
        .unwrap();
    manager.backend_mut().run_period();

    let out = manager.backend().output::<I24>(1).unwrap();
    assert!(out.iter().all(|s| s.to_i32() == -1000));
}

#[test]
fn test_xrun_status_delivered_once() {
    let mut manager = test_manager();
    let (log, callback) = recording_callback();
    manager.start(stereo_duplex(64), callback).unwrap();

    manager
        .backend_mut()
        .set_next_status(NativeStreamStatus::OUTPUT_UNDERFLOW);
    manager.backend_mut().run_period();
    manager
        .backend_mut()
        .set_next_status(NativeStreamStatus::INPUT_OVERFLOW | NativeStreamStatus::OUTPUT_UNDERFLOW);
    manager.backend_mut().run_periods(2);

    let statuses: Vec<CallbackStatus> = log.lock().iter().map(|o| o.status).collect();
    assert_eq!(
        statuses,
        vec![
            CallbackStatus::OutputUnderflow,
            CallbackStatus::InputOverflow,
            CallbackStatus::Ok
        ]
    );
}

#[test]
fn test_drain_stops_periods_until_reconfigured() {
    let mut manager = test_manager();
    let mut periods = 0;
    manager
        .start(stereo_output(16), move |info| {
            periods += 1;
            if periods == 2 {
                info.control = StreamControl::Drain;
            }
        })
        .unwrap();

    assert_eq!(manager.backend_mut().run_periods(10), 2);
    assert_eq!(manager.backend_mut().run_period(), None);
    assert!(manager.is_running());

    // A fresh stream gets periods again
    manager.set_config(stereo_output(16)).unwrap();
    assert_eq!(
        manager.backend_mut().run_period(),
        Some(StreamControl::Continue)
    );
}

#[test]
fn test_panicking_callback_aborts_with_silence() {
    let mut manager = test_manager();
    manager
        .start(stereo_output(8), |info| {
            if let Some(out) = info.output_mut::<f32>(0) {
                out.fill(1.0);
            }
            panic!("callback bug");
        })
        .unwrap();

    assert_eq!(
        manager.backend_mut().run_period(),
        Some(StreamControl::Abort)
    );
    assert!(manager.backend().output::<f32>(0).unwrap().iter().all(|&s| s == 0.0));
}

#[test]
fn test_callback_state_survives_reconfiguration() {
    let mut manager = test_manager_with(OfflineBackend::new());
    let mut counter = 0u32;
    manager
        .start(StreamConfig::input_only(StreamParameters::new(0, 1), 48000, 8), move |info| {
            counter += 1;
            if info.dirty {
                info.control = if counter > 1 {
                    StreamControl::Abort
                } else {
                    StreamControl::Continue
                };
            }
        })
        .unwrap();

    assert_eq!(manager.backend_mut().run_periods(3), 3);

    // Same closure instance: its counter carries over, so the dirty period aborts
    manager
        .set_config(StreamConfig::input_only(StreamParameters::new(0, 1), 44100, 8))
        .unwrap();
    assert_eq!(
        manager.backend_mut().run_period(),
        Some(StreamControl::Abort)
    );
}
