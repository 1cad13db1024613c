//! Deterministic in-process backend.
//!
//! No threads and no hardware: periods run only when [`OfflineBackend::run_period`]
//! is called. Used for offline rendering and as the test double for
//! [`crate::DeviceManager`].
//!
//! ```
//! use audiodev_core::offline::OfflineBackend;
//! use audiodev_core::{DeviceManager, StreamConfig, StreamParameters};
//!
//! let mut manager = DeviceManager::new(OfflineBackend::new());
//! let config = StreamConfig::output_only(StreamParameters::new(0, 2), 48000, 64);
//! manager
//!     .start(config, |info| {
//!         for channel in info.outputs_mut::<f32>().into_iter().flatten() {
//!             channel.fill(0.25);
//!         }
//!     })
//!     .unwrap();
//!
//! manager.backend_mut().run_period();
//! assert_eq!(manager.backend().output::<f32>(1).unwrap()[0], 0.25);
//! ```

use crate::backend::{Backend, ErrorSink};
use crate::buffer::{PlanarBuffer, Sample};
use crate::callback::{CallbackBridge, Period, StreamControl};
use crate::native::{
    BackendError, NativeDeviceInfo, NativeErrorCode, NativeFormats, NativeStreamParameters,
    NativeStreamStatus,
};
use crate::negotiate::OpenParameters;
use crate::taxonomy::{formats_from_native, Format};

/// Frames per period when the stream is opened with a block size of 0.
pub const OFFLINE_DEFAULT_FRAMES: u32 = 512;

/// Backend entry points, recorded in call order.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum BackendCall {
    Open,
    Start,
    Stop,
    Close,
}

struct OfflineStream {
    bridge: CallbackBridge,
    format: Format,
    sample_rate: u32,
    frames: u32,
    input: PlanarBuffer,
    output: PlanarBuffer,
    frames_processed: u64,
    /// Set once the callback asks to drain or abort.
    finished: bool,
}

pub struct OfflineBackend {
    devices: Vec<NativeDeviceInfo>,
    block_granularity: u32,
    latency: u64,
    pending_open_error: Option<BackendError>,
    pending_status: NativeStreamStatus,
    stream: Option<OfflineStream>,
    running: bool,
    calls: Vec<BackendCall>,
}

impl Default for OfflineBackend {
    fn default() -> Self {
        Self::new()
    }
}

impl OfflineBackend {
    /// Backend with one stereo duplex device (id 0), default for both sides.
    pub fn new() -> Self {
        Self::empty().with_device(Self::stereo_device(0, "Offline Stereo"))
    }

    /// Backend with no devices.
    pub fn empty() -> Self {
        Self {
            devices: Vec::new(),
            block_granularity: 1,
            latency: 0,
            pending_open_error: None,
            pending_status: NativeStreamStatus::empty(),
            stream: None,
            running: false,
            calls: Vec::new(),
        }
    }

    /// Stereo in/out device record supporting every format.
    pub fn stereo_device(id: u32, name: &str) -> NativeDeviceInfo {
        NativeDeviceInfo {
            id,
            name: name.to_string(),
            output_channels: 2,
            input_channels: 2,
            duplex_channels: 2,
            is_default_output: true,
            is_default_input: true,
            sample_rates: vec![44100, 48000, 88200, 96000],
            current_sample_rate: 48000,
            preferred_sample_rate: 48000,
            native_formats: NativeFormats::all(),
        }
    }

    pub fn with_device(mut self, device: NativeDeviceInfo) -> Self {
        self.devices.push(device);
        self
    }

    /// Round requested block sizes up to a multiple of `frames`.
    pub fn with_block_granularity(mut self, frames: u32) -> Self {
        self.block_granularity = frames.max(1);
        self
    }

    pub fn set_latency(&mut self, frames: u64) {
        self.latency = frames;
    }

    /// Make the next `open_stream` fail with `error`.
    pub fn fail_next_open(&mut self, error: BackendError) {
        self.pending_open_error = Some(error);
    }

    /// Xrun status delivered with the next period only.
    pub fn set_next_status(&mut self, status: NativeStreamStatus) {
        self.pending_status = status;
    }

    /// Push an error into the open stream's error queue, as a driver thread would.
    ///
    /// Returns `false` if no stream is open or the queue is full.
    pub fn report_error(&self, error: BackendError) -> bool {
        self.error_sink().is_some_and(|sink| sink.report(error))
    }

    fn error_sink(&self) -> Option<ErrorSink> {
        self.stream.as_ref().map(|s| s.bridge.error_sink())
    }

    pub fn calls(&self) -> &[BackendCall] {
        &self.calls
    }

    pub fn clear_calls(&mut self) {
        self.calls.clear();
    }

    pub fn is_stream_open(&self) -> bool {
        self.stream.is_some()
    }

    pub fn is_stream_running(&self) -> bool {
        self.running
    }

    /// Frames per period of the open stream.
    pub fn stream_frames(&self) -> Option<u32> {
        self.stream.as_ref().map(|s| s.frames)
    }

    /// Fill one input channel for subsequent periods. Samples beyond the
    /// period length are ignored; missing ones are left untouched.
    ///
    /// Returns `false` if no stream is open, `T` is not the stream format or
    /// the channel does not exist.
    pub fn write_input<T: Sample>(&mut self, channel: usize, samples: &[T]) -> bool {
        let Some(stream) = self.stream.as_mut() else {
            return false;
        };
        if T::FORMAT != stream.format || channel >= stream.input.channels() {
            return false;
        }

        let frames = stream.frames as usize;
        let Ok(plane) = bytemuck::try_cast_slice_mut::<u8, T>(stream.input.period_mut(frames))
        else {
            return false;
        };
        let dst = &mut plane[channel * frames..(channel + 1) * frames];
        let n = samples.len().min(frames);
        dst[..n].copy_from_slice(&samples[..n]);
        true
    }

    /// One output channel of the last period.
    pub fn output<T: Sample>(&self, channel: usize) -> Option<&[T]> {
        let stream = self.stream.as_ref()?;
        if T::FORMAT != stream.format || channel >= stream.output.channels() {
            return None;
        }

        let frames = stream.frames as usize;
        let plane: &[T] = bytemuck::try_cast_slice(stream.output.period(frames)).ok()?;
        plane.get(channel * frames..(channel + 1) * frames)
    }

    /// Run one period through the callback.
    ///
    /// Returns `None` if the stream is not running or the callback already
    /// requested drain/abort.
    pub fn run_period(&mut self) -> Option<StreamControl> {
        if !self.running {
            return None;
        }
        let status = std::mem::take(&mut self.pending_status);
        let latency = self.latency;
        let stream = self.stream.as_mut()?;
        if stream.finished {
            return None;
        }

        let frames = stream.frames;
        let period = Period {
            input: stream.input.period(frames as usize),
            output: stream.output.period_mut(frames as usize),
            frames,
            stream_time: stream.frames_processed as f64 / stream.sample_rate as f64,
            status,
            sample_rate: stream.sample_rate,
            latency,
        };

        let control = stream.bridge.process(period);
        stream.frames_processed += u64::from(frames);
        if control != StreamControl::Continue {
            stream.finished = true;
            stream.output.clear();
        }
        Some(control)
    }

    /// Run up to `count` periods, stopping early once the callback finishes
    /// the stream. Returns the number of periods run.
    pub fn run_periods(&mut self, count: usize) -> usize {
        let mut run = 0;
        while run < count {
            match self.run_period() {
                Some(StreamControl::Continue) => run += 1,
                Some(_) => return run + 1,
                None => break,
            }
        }
        run
    }

    fn device(&self, side: &NativeStreamParameters) -> Result<&NativeDeviceInfo, BackendError> {
        self.devices
            .iter()
            .find(|d| d.id == side.device_id)
            .ok_or_else(|| {
                BackendError::new(
                    NativeErrorCode::INVALID_DEVICE,
                    format!("no device with id {}", side.device_id),
                )
            })
    }

    fn check_side(
        &self,
        side: Option<&NativeStreamParameters>,
        available: impl Fn(&NativeDeviceInfo) -> u32,
        params: &OpenParameters,
    ) -> Result<(), BackendError> {
        let Some(side) = side else {
            return Ok(());
        };
        let device = self.device(side)?;
        let fits = side
            .first_channel
            .checked_add(side.channels)
            .is_some_and(|last| last <= available(device));
        if !fits {
            return Err(BackendError::new(
                NativeErrorCode::INVALID_PARAMETER,
                format!(
                    "{} channels from {} exceed the {} available on '{}'",
                    side.channels,
                    side.first_channel,
                    available(device),
                    device.name
                ),
            ));
        }
        if !device.sample_rates.contains(&params.sample_rate) {
            return Err(BackendError::new(
                NativeErrorCode::INVALID_PARAMETER,
                format!("'{}' does not support {} Hz", device.name, params.sample_rate),
            ));
        }
        if !device.native_formats.contains(params.format) {
            return Err(BackendError::new(
                NativeErrorCode::INVALID_PARAMETER,
                format!("'{}' does not support format {:?}", device.name, params.format),
            ));
        }
        Ok(())
    }

    fn round_frames(&self, requested: u32) -> u32 {
        let frames = if requested == 0 {
            OFFLINE_DEFAULT_FRAMES
        } else {
            requested
        };
        frames.div_ceil(self.block_granularity) * self.block_granularity
    }
}

impl Backend for OfflineBackend {
    fn name(&self) -> &'static str {
        "offline"
    }

    fn list_devices(&self) -> Result<Vec<NativeDeviceInfo>, BackendError> {
        Ok(self.devices.clone())
    }

    fn default_input_device(&self) -> Result<NativeDeviceInfo, BackendError> {
        self.devices
            .iter()
            .find(|d| d.is_default_input)
            .cloned()
            .ok_or_else(|| {
                BackendError::new(NativeErrorCode::NO_DEVICES_FOUND, "no default input device")
            })
    }

    fn default_output_device(&self) -> Result<NativeDeviceInfo, BackendError> {
        self.devices
            .iter()
            .find(|d| d.is_default_output)
            .cloned()
            .ok_or_else(|| {
                BackendError::new(NativeErrorCode::NO_DEVICES_FOUND, "no default output device")
            })
    }

    fn open_stream(
        &mut self,
        params: &OpenParameters,
        bridge: CallbackBridge,
    ) -> Result<u32, BackendError> {
        self.calls.push(BackendCall::Open);

        if let Some(error) = self.pending_open_error.take() {
            return Err(error);
        }
        if self.stream.is_some() {
            return Err(BackendError::new(
                NativeErrorCode::INVALID_USE,
                "a stream is already open",
            ));
        }

        let format = match formats_from_native(params.format).as_slice() {
            [format] => *format,
            _ => {
                return Err(BackendError::new(
                    NativeErrorCode::INVALID_PARAMETER,
                    format!("expected exactly one sample format, got {:?}", params.format),
                ))
            }
        };
        self.check_side(params.input.as_ref(), |d| d.input_channels, params)?;
        self.check_side(params.output.as_ref(), |d| d.output_channels, params)?;

        let frames = self.round_frames(params.frames);
        self.stream = Some(OfflineStream {
            bridge,
            format,
            sample_rate: params.sample_rate,
            frames,
            input: PlanarBuffer::new(format, params.input_channels(), frames),
            output: PlanarBuffer::new(format, params.output_channels(), frames),
            frames_processed: 0,
            finished: false,
        });
        Ok(frames)
    }

    fn start_stream(&mut self) -> Result<(), BackendError> {
        self.calls.push(BackendCall::Start);
        if self.stream.is_none() {
            return Err(BackendError::new(
                NativeErrorCode::INVALID_USE,
                "no stream is open",
            ));
        }
        self.running = true;
        Ok(())
    }

    fn stop_stream(&mut self) -> Result<(), BackendError> {
        self.calls.push(BackendCall::Stop);
        self.running = false;
        Ok(())
    }

    fn close_stream(&mut self) {
        self.calls.push(BackendCall::Close);
        self.running = false;
        self.stream = None;
    }

    fn stream_latency(&self) -> u64 {
        if self.stream.is_some() {
            self.latency
        } else {
            0
        }
    }

    fn stream_sample_rate(&self) -> u32 {
        self.stream.as_ref().map_or(0, |s| s.sample_rate)
    }

    fn stream_time(&self) -> f64 {
        self.stream
            .as_ref()
            .map_or(0.0, |s| s.frames_processed as f64 / s.sample_rate as f64)
    }
}
