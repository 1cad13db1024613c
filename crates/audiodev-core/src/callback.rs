//! Real-time callback bridge.
//!
//! Backends hand each period's raw planar buffers to a [`CallbackBridge`],
//! which wraps them in an [`AudioCallbackInfo`], runs change detection against
//! the previous period and invokes the application callback in place.

use crate::backend::ErrorSink;
use crate::buffer::Sample;
use crate::config::StreamConfig;
use crate::manager::DEFAULT_ERROR_QUEUE_CAPACITY;
use crate::native::{BackendError, NativeStreamStatus};
use crate::taxonomy::{CallbackStatus, Format};
use arc_swap::ArcSwapOption;
use parking_lot::Mutex;
use std::panic::{catch_unwind, AssertUnwindSafe};
use std::sync::Arc;

/// Application callback, invoked once per period on the audio thread.
///
/// Must not block or allocate.
pub type Callback = Box<dyn FnMut(&mut AudioCallbackInfo<'_>) + Send>;

pub(crate) type SharedCallback = Arc<Mutex<Callback>>;

/// What the application asks the backend to do after this period.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum StreamControl {
    #[default]
    Continue,
    /// Play out queued output, then stop delivering periods.
    Drain,
    /// Stop delivering periods immediately.
    Abort,
}

/// The part of the callback metadata that defines a configuration change.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub struct CallbackShape {
    pub num_inputs: u32,
    pub num_outputs: u32,
    pub sample_rate: u32,
    pub max_block_size: u32,
}

/// Raw buffers and timing for one period, as delivered by a backend.
///
/// Buffers are planar: channel `c` occupies `frames` samples starting at
/// sample `c * frames`.
pub struct Period<'a> {
    pub input: &'a [u8],
    pub output: &'a mut [u8],
    pub frames: u32,
    /// Seconds since the stream started.
    pub stream_time: f64,
    pub status: NativeStreamStatus,
    pub sample_rate: u32,
    /// Stream latency in frames.
    pub latency: u64,
}

/// View over one period's buffers. Valid only for the duration of the callback.
///
/// Two infos compare equal when their channel counts, sample rate and max
/// block size match; buffer contents and timing are ignored.
pub struct AudioCallbackInfo<'a> {
    pub num_inputs: u32,
    pub num_outputs: u32,
    pub num_frames: u32,
    pub stream_time: f64,
    pub status: CallbackStatus,
    pub sample_rate: u32,
    pub max_block_size: u32,
    pub latency: u64,
    /// Set on the first period after any configuration change.
    pub dirty: bool,
    pub control: StreamControl,
    config: &'a StreamConfig,
    input: &'a [u8],
    output: &'a mut [u8],
}

impl<'a> AudioCallbackInfo<'a> {
    pub fn new(config: &'a StreamConfig, period: Period<'a>) -> Self {
        Self {
            num_inputs: config.input_channels(),
            num_outputs: config.output_channels(),
            num_frames: period.frames,
            stream_time: period.stream_time,
            status: CallbackStatus::from_native(period.status),
            sample_rate: period.sample_rate,
            max_block_size: config.max_block_size,
            latency: period.latency,
            dirty: false,
            control: StreamControl::Continue,
            config,
            input: period.input,
            output: period.output,
        }
    }

    pub fn shape(&self) -> CallbackShape {
        CallbackShape {
            num_inputs: self.num_inputs,
            num_outputs: self.num_outputs,
            sample_rate: self.sample_rate,
            max_block_size: self.max_block_size,
        }
    }

    /// The active stream configuration.
    pub fn config(&self) -> &StreamConfig {
        self.config
    }

    pub fn format(&self) -> Format {
        self.config.format
    }

    /// Samples of one input channel, or `None` if `T` is not the stream
    /// format or the channel does not exist.
    pub fn input<T: Sample>(&self, channel: usize) -> Option<&[T]> {
        if T::FORMAT != self.format() || channel >= self.num_inputs as usize {
            return None;
        }
        let len = self.plane_len::<T>();
        let bytes = self.input.get(channel * len..(channel + 1) * len)?;
        bytemuck::try_cast_slice(bytes).ok()
    }

    /// Samples of one output channel, to be written before returning.
    pub fn output_mut<T: Sample>(&mut self, channel: usize) -> Option<&mut [T]> {
        if T::FORMAT != self.format() || channel >= self.num_outputs as usize {
            return None;
        }
        let len = self.plane_len::<T>();
        let bytes = self.output.get_mut(channel * len..(channel + 1) * len)?;
        bytemuck::try_cast_slice_mut(bytes).ok()
    }

    /// Iterate input channels in order. Empty if `T` is not the stream format.
    pub fn inputs<T: Sample>(&self) -> impl Iterator<Item = &[T]> + '_ {
        (0..self.num_inputs as usize).filter_map(move |ch| self.input::<T>(ch))
    }

    /// All output channels at once, one mutable slice per channel.
    pub fn outputs_mut<T: Sample>(&mut self) -> Option<core::slice::ChunksExactMut<'_, T>> {
        let frames = self.num_frames as usize;
        if T::FORMAT != self.format() || frames == 0 {
            return None;
        }
        let len = self.num_outputs as usize * self.plane_len::<T>();
        let bytes = self.output.get_mut(..len)?;
        let samples: &mut [T] = bytemuck::try_cast_slice_mut(bytes).ok()?;
        Some(samples.chunks_exact_mut(frames))
    }

    pub fn input_bytes(&self) -> &[u8] {
        self.input
    }

    pub fn output_bytes_mut(&mut self) -> &mut [u8] {
        self.output
    }

    pub fn silence_output(&mut self) {
        self.output.fill(0);
    }

    fn plane_len<T: Sample>(&self) -> usize {
        self.num_frames as usize * core::mem::size_of::<T>()
    }
}

impl PartialEq for AudioCallbackInfo<'_> {
    fn eq(&self, other: &Self) -> bool {
        self.shape() == other.shape()
    }
}

impl core::fmt::Debug for AudioCallbackInfo<'_> {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        f.debug_struct("AudioCallbackInfo")
            .field("num_inputs", &self.num_inputs)
            .field("num_outputs", &self.num_outputs)
            .field("num_frames", &self.num_frames)
            .field("stream_time", &self.stream_time)
            .field("status", &self.status)
            .field("sample_rate", &self.sample_rate)
            .field("max_block_size", &self.max_block_size)
            .field("latency", &self.latency)
            .field("dirty", &self.dirty)
            .field("control", &self.control)
            .finish_non_exhaustive()
    }
}

/// Per-stream bridge between a backend and the application callback.
///
/// One bridge exists per open stream; reopening creates a fresh one, so the
/// first period after any reconfiguration is always reported dirty. Periods
/// that arrive before the stream's config is published are silenced without
/// reaching the callback.
pub struct CallbackBridge {
    callback: SharedCallback,
    config: Arc<ArcSwapOption<StreamConfig>>,
    previous: Option<CallbackShape>,
    errors: ErrorSink,
}

impl CallbackBridge {
    pub(crate) fn new(
        callback: SharedCallback,
        config: Arc<ArcSwapOption<StreamConfig>>,
        errors: ErrorSink,
    ) -> Self {
        Self {
            callback,
            config,
            previous: None,
            errors,
        }
    }

    /// Bridge for a backend driven without a [`DeviceManager`](crate::DeviceManager).
    ///
    /// The config is fixed for the bridge's lifetime. Errors reported through
    /// [`error_sink`](Self::error_sink) arrive on the returned receiver.
    pub fn standalone<F>(
        config: StreamConfig,
        callback: F,
    ) -> (Self, crossbeam_channel::Receiver<BackendError>)
    where
        F: FnMut(&mut AudioCallbackInfo<'_>) + Send + 'static,
    {
        let (tx, rx) = crossbeam_channel::bounded(DEFAULT_ERROR_QUEUE_CAPACITY);
        let callback: Callback = Box::new(callback);
        let bridge = Self::new(
            Arc::new(Mutex::new(callback)),
            Arc::new(ArcSwapOption::from_pointee(config)),
            ErrorSink::new(tx),
        );
        (bridge, rx)
    }

    /// Queue for fatal errors detected outside the period callback.
    pub fn error_sink(&self) -> ErrorSink {
        self.errors.clone()
    }

    /// Run one period. RT-safe: no locks are waited on and nothing is allocated.
    ///
    /// A panicking callback silences the period and aborts the stream.
    pub fn process(&mut self, period: Period<'_>) -> StreamControl {
        let published = self.config.load();
        let Some(config) = published.as_deref() else {
            // Opened but the negotiated config is not published yet
            period.output.fill(0);
            return StreamControl::Continue;
        };

        // Only contended if a previous stream's period is still in flight
        let Some(mut guard) = self.callback.try_lock() else {
            period.output.fill(0);
            return StreamControl::Continue;
        };
        let callback: &mut Callback = &mut guard;

        let mut info = AudioCallbackInfo::new(config, period);
        let shape = info.shape();
        if self.previous != Some(shape) {
            self.previous = Some(shape);
            info.dirty = true;
        }

        let result = catch_unwind(AssertUnwindSafe(|| callback(&mut info)));
        match result {
            Ok(()) => info.control,
            Err(_) => {
                info.silence_output();
                StreamControl::Abort
            }
        }
    }
}
