//! Test helpers and fixtures for audiodev integration tests
//!
//! Streams run on the offline backend with manual period control
//! (`run_period`), so every test is deterministic and needs no hardware.

#![allow(dead_code)]

use audiodev::core::{NativeDeviceInfo, NativeFormats};
use audiodev::offline::OfflineBackend;
use audiodev::prelude::*;
use parking_lot::Mutex;
use std::sync::Arc;

/// Sample rate used by most fixtures
pub const TEST_SAMPLE_RATE: u32 = 48000;

/// Block size used by most fixtures
pub const TEST_BLOCK_SIZE: u32 = 512;

/// Route `tracing` output through the test harness. Safe to call repeatedly.
pub fn init_tracing() {
    let _ = tracing_subscriber::fmt()
        .with_test_writer()
        .with_max_level(tracing_subscriber::filter::LevelFilter::DEBUG)
        .try_init();
}

/// Manager over the default offline backend (one stereo duplex device, id 0).
pub fn test_manager() -> DeviceManager<OfflineBackend> {
    init_tracing();
    DeviceManager::new(OfflineBackend::new())
}

pub fn test_manager_with(backend: OfflineBackend) -> DeviceManager<OfflineBackend> {
    init_tracing();
    DeviceManager::new(backend)
}

/// Stereo output on device 0.
pub fn stereo_output(max_block_size: u32) -> StreamConfig {
    StreamConfig::output_only(
        StreamParameters::new(0, 2),
        TEST_SAMPLE_RATE,
        max_block_size,
    )
}

/// Stereo in, stereo out on device 0.
pub fn stereo_duplex(max_block_size: u32) -> StreamConfig {
    stereo_output(max_block_size).with_input(Some(StreamParameters::new(0, 2)))
}

/// Multichannel interface record.
pub fn interface_device(id: u32, inputs: u32, outputs: u32) -> NativeDeviceInfo {
    NativeDeviceInfo {
        id,
        name: format!("Interface {id}"),
        output_channels: outputs,
        input_channels: inputs,
        duplex_channels: inputs.min(outputs),
        is_default_output: outputs > 0,
        is_default_input: inputs > 0,
        sample_rates: vec![44100, 48000, 96000],
        current_sample_rate: 48000,
        preferred_sample_rate: 48000,
        native_formats: NativeFormats::SINT16 | NativeFormats::SINT32 | NativeFormats::FLOAT32,
    }
}

/// What the callback saw on one period.
#[derive(Debug, Clone, PartialEq)]
pub struct Observed {
    pub dirty: bool,
    pub num_inputs: u32,
    pub num_outputs: u32,
    pub num_frames: u32,
    pub sample_rate: u32,
    pub max_block_size: u32,
    pub status: CallbackStatus,
    pub stream_time: f64,
}

pub type Observations = Arc<Mutex<Vec<Observed>>>;

/// Callback that records every period's metadata and writes silence.
pub fn recording_callback() -> (
    Observations,
    impl FnMut(&mut AudioCallbackInfo<'_>) + Send + 'static,
) {
    let log: Observations = Arc::default();
    let sink = log.clone();
    let callback = move |info: &mut AudioCallbackInfo<'_>| {
        sink.lock().push(Observed {
            dirty: info.dirty,
            num_inputs: info.num_inputs,
            num_outputs: info.num_outputs,
            num_frames: info.num_frames,
            sample_rate: info.sample_rate,
            max_block_size: info.max_block_size,
            status: info.status,
            stream_time: info.stream_time,
        });
        info.silence_output();
    };
    (log, callback)
}

/// Number of periods that reported `dirty`.
pub fn dirty_count(log: &Observations) -> usize {
    log.lock().iter().filter(|o| o.dirty).count()
}
