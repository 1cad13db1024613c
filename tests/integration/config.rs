//! Configuration and negotiation tests

use crate::helpers::*;
use audiodev::core::{negotiate, NativeFormats, NativeStreamFlags};
use audiodev::prelude::*;
use proptest::prelude::*;

#[test]
fn test_zero_channel_side_treated_as_absent() {
    let mut manager = test_manager();
    let (log, callback) = recording_callback();

    let config = stereo_output(64).with_input(Some(StreamParameters::new(0, 0)));
    manager.start(config, callback).unwrap();
    manager.backend_mut().run_period();

    assert_eq!(log.lock()[0].num_inputs, 0);
}

#[test]
fn test_zero_sample_rate_rejected() {
    let mut manager = test_manager();
    let err = manager
        .start(stereo_output(64).with_sample_rate(0), |_| {})
        .unwrap_err();
    assert_eq!(err.code(), ErrorCode::InvalidParameter);
    assert!(manager.backend().calls().is_empty());
}

#[test]
fn test_overflowing_channel_window_rejected() {
    let mut manager = test_manager();
    let config = StreamConfig::output_only(
        StreamParameters::new(0, 2).with_first_channel(u32::MAX),
        TEST_SAMPLE_RATE,
        64,
    );

    let err = manager.start(config, |_| {}).unwrap_err();
    assert_eq!(err.code(), ErrorCode::InvalidParameter);
    assert!(manager.backend().calls().is_empty());
    assert!(!manager.is_open());
}

#[test]
fn test_options_reach_backend_with_planar_layout() {
    let config = stereo_output(64)
        .with_format(Format::Float64)
        .with_options(Some(StreamOptions {
            flags: Flags::realtime(),
            number_of_buffers: 2,
            stream_name: "monitor".into(),
            priority: 80,
        }));

    let params = negotiate(&config).unwrap();
    assert_eq!(params.format, NativeFormats::FLOAT64);
    assert!(params
        .options
        .flags
        .contains(NativeStreamFlags::NONINTERLEAVED | NativeStreamFlags::SCHEDULE_REALTIME));
    assert_eq!(params.options.stream_name, "monitor");
    assert_eq!(params.options.priority, 80);
}

#[test]
fn test_stream_config_json_shape() {
    let config = stereo_output(256).with_options(Some(StreamOptions::default()));
    let json = serde_json::to_value(&config).unwrap();

    assert_eq!(json["format"], "Float32");
    assert_eq!(json["input"], serde_json::Value::Null);
    assert_eq!(json["output"]["nChannels"], 2);
    assert_eq!(json["sampleRate"], TEST_SAMPLE_RATE);
    assert_eq!(json["maxBlockSize"], 256);
    assert_eq!(json["options"]["flags"]["hogDevice"], false);

    let decoded: StreamConfig = serde_json::from_value(json).unwrap();
    assert_eq!(decoded, config);
}

#[test]
fn test_error_code_names() {
    let json = serde_json::to_string(&ErrorCode::DeviceDisconnect).unwrap();
    assert_eq!(json, "\"DEVICE_DISCONNECT\"");
    assert_eq!(ErrorCode::InvalidUse.to_string(), "INVALID_USE");
}

#[cfg(feature = "json")]
#[test]
fn test_json_helpers() {
    let config = stereo_duplex(128).with_format(Format::Int32);
    let text = config.to_json_pretty().unwrap();
    assert_eq!(StreamConfig::from_json(&text).unwrap(), config);

    let err = StreamConfig::from_json("{ not json").unwrap_err();
    assert!(matches!(err, Error::Json(_)));
}

fn arb_side() -> impl Strategy<Value = Option<StreamParameters>> {
    prop::option::of((0u32..4, 0u32..3).prop_map(|(id, ch)| StreamParameters::new(id, ch)))
}

proptest! {
    /// Invalid configurations never reach the backend.
    #[test]
    fn prop_rejected_configs_never_open(
        input in arb_side(),
        output in arb_side(),
        sample_rate in prop::sample::select(vec![0u32, 44100, 48000]),
    ) {
        let mut manager = test_manager();
        let config = StreamConfig::default()
            .with_input(input)
            .with_output(output)
            .with_sample_rate(sample_rate);

        let valid = config.validate().is_ok();
        let result = manager.start(config, |_| {});

        if !valid {
            prop_assert_eq!(result.unwrap_err().code(), ErrorCode::InvalidParameter);
            prop_assert!(manager.backend().calls().is_empty());
        } else {
            prop_assert!(!manager.backend().calls().is_empty());
        }
    }
}
