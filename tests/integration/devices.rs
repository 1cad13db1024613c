//! Device enumeration and default configuration tests

use crate::helpers::*;
use audiodev::core::NativeDeviceInfo;
use audiodev::offline::OfflineBackend;
use audiodev::prelude::*;

#[test]
fn test_list_devices_translates_records() {
    let manager = test_manager_with(
        OfflineBackend::empty()
            .with_device(interface_device(0, 8, 8))
            .with_device(interface_device(1, 0, 2)),
    );

    let devices = manager.list_devices().unwrap();
    assert_eq!(devices.len(), 2);

    let interface = &devices[0];
    assert_eq!(interface.name, "Interface 0");
    assert_eq!(interface.max_channels(Direction::Input), 8);
    assert_eq!(
        interface.native_formats,
        vec![Format::Int16, Format::Int32, Format::Float32]
    );
    assert!(interface.supports_sample_rate(96000));
    assert!(!interface.supports_format(Format::Float64));

    assert_eq!(devices[1].input_channels, 0);
}

#[test]
fn test_default_config_clamps_to_stereo() {
    let manager = test_manager_with(OfflineBackend::empty().with_device(interface_device(3, 8, 6)));

    let config = manager.default_config().unwrap();
    assert_eq!(config.input, Some(StreamParameters::new(3, 2)));
    assert_eq!(config.output, Some(StreamParameters::new(3, 2)));
    assert_eq!(config.sample_rate, 44100);
    assert_eq!(config.max_block_size, 512);
    assert_eq!(config.format, Format::Float32);
    assert!(config.options.is_none());
}

#[test]
fn test_default_config_mono_device() {
    let manager = test_manager_with(OfflineBackend::empty().with_device(interface_device(0, 1, 1)));
    let config = manager.default_config().unwrap();
    assert_eq!(config.input_channels(), 1);
    assert_eq!(config.output_channels(), 1);
}

#[test]
fn test_default_config_uses_each_sides_default_device() {
    let mic = NativeDeviceInfo {
        is_default_output: false,
        ..interface_device(0, 1, 0)
    };
    let speakers = NativeDeviceInfo {
        is_default_input: false,
        ..interface_device(1, 0, 2)
    };
    let manager = test_manager_with(OfflineBackend::empty().with_device(mic).with_device(speakers));

    let config = manager.default_config().unwrap();
    assert_eq!(config.input, Some(StreamParameters::new(0, 1)));
    assert_eq!(config.output, Some(StreamParameters::new(1, 2)));
}

#[test]
fn test_default_config_starts() {
    let mut manager = test_manager();
    let (log, callback) = recording_callback();

    let config = manager.default_config().unwrap();
    manager.start(config, callback).unwrap();
    manager.backend_mut().run_period();

    let first = log.lock()[0].clone();
    assert_eq!(first.num_inputs, 2);
    assert_eq!(first.num_outputs, 2);
    assert_eq!(first.sample_rate, 44100);
    assert_eq!(first.max_block_size, 512);
}

#[test]
fn test_no_devices() {
    let mut manager = test_manager_with(OfflineBackend::empty());
    assert!(manager.list_devices().unwrap().is_empty());
    assert_eq!(
        manager.default_output_device().unwrap_err().code(),
        ErrorCode::NoDevicesFound
    );

    let config = manager.default_config().unwrap();
    assert!(config.input.is_none());
    assert!(config.output.is_none());

    // Nothing to open: rejected before the backend is involved
    let err = manager.start(config, |_| {}).unwrap_err();
    assert_eq!(err.code(), ErrorCode::InvalidParameter);
    assert!(manager.backend().calls().is_empty());
}

#[test]
fn test_find_device() {
    let manager = test_manager_with(
        OfflineBackend::new().with_device(interface_device(7, 4, 4)),
    );
    assert_eq!(manager.find_device(7).unwrap().name, "Interface 7");
    assert_eq!(
        manager.find_device(8).unwrap_err().code(),
        ErrorCode::InvalidDevice
    );
}

#[test]
fn test_default_devices() {
    let manager = test_manager();
    let input = manager.default_input_device().unwrap();
    let output = manager.default_output_device().unwrap();
    assert!(input.is_default_input);
    assert!(output.is_default_output);
    assert_eq!(input.id, output.id);
}
