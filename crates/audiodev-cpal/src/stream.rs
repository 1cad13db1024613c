//! cpal stream construction and the per-period processing loop.

use crate::error::{CpalError, Result};
use audiodev_core::{
    BackendError, CallbackBridge, ErrorSink, Format, NativeStreamStatus, Period, PlanarBuffer,
    StreamControl,
};
use cpal::traits::{DeviceTrait, StreamTrait};
use cpal::{BufferSize, SampleFormat, SupportedBufferSize};
use ringbuf::traits::{Consumer, Observer, Producer, Split};
use ringbuf::{HeapCons, HeapProd, HeapRb};
use std::sync::atomic::{AtomicBool, AtomicU64, Ordering};
use std::sync::Arc;

/// Frames per period when the caller leaves the block size to the backend.
pub const DEFAULT_FRAMES: u32 = 512;

/// Periods of captured input buffered between the input and output callbacks.
const DUPLEX_QUEUE_PERIODS: usize = 4;

/// Wrapper to hold a `cpal::Stream` in a `Send` context.
///
/// `cpal::Stream` is `!Send` on some platforms. The backend owning it is only
/// driven through `&mut` by a single `DeviceManager`, and the stream is dropped
/// with the backend's stream slot.
pub(crate) struct StreamHandle(cpal::Stream);

// SAFETY: never accessed concurrently; see the type docs.
unsafe impl Send for StreamHandle {}

impl StreamHandle {
    pub(crate) fn play(&self) -> Result<()> {
        Ok(self.0.play()?)
    }

    pub(crate) fn pause(&self) -> Result<()> {
        Ok(self.0.pause()?)
    }
}

/// Counters shared between the audio callbacks and the control thread.
pub(crate) struct StreamShared {
    pub(crate) sample_rate: u32,
    frames_processed: AtomicU64,
    latency: AtomicU64,
    input_overflow: AtomicBool,
}

impl StreamShared {
    pub(crate) fn new(sample_rate: u32) -> Self {
        Self {
            sample_rate,
            frames_processed: AtomicU64::new(0),
            latency: AtomicU64::new(0),
            input_overflow: AtomicBool::new(false),
        }
    }

    pub(crate) fn time(&self) -> f64 {
        self.frames_processed.load(Ordering::Relaxed) as f64 / self.sample_rate as f64
    }

    pub(crate) fn latency(&self) -> u64 {
        self.latency.load(Ordering::Relaxed)
    }

    fn store_latency(&self, delay: Option<std::time::Duration>) {
        if let Some(delay) = delay {
            let frames = (delay.as_secs_f64() * self.sample_rate as f64).round() as u64;
            self.latency.store(frames, Ordering::Relaxed);
        }
    }
}

/// Channel window of one stream side on its device.
#[derive(Debug, Clone, Copy)]
pub(crate) struct Window {
    pub(crate) device_channels: usize,
    pub(crate) first_channel: usize,
    pub(crate) channels: usize,
}

/// One side of a stream, resolved against a concrete device config.
pub(crate) struct Side {
    pub(crate) device: cpal::Device,
    pub(crate) config: cpal::StreamConfig,
    pub(crate) window: Window,
}

/// Frames per period for a device, and the cpal buffer size that requests it.
pub(crate) fn block_size(
    requested: u32,
    supported: &SupportedBufferSize,
    minimize_latency: bool,
) -> (u32, BufferSize) {
    match *supported {
        SupportedBufferSize::Range { min, max } => {
            let wanted = match requested {
                0 if minimize_latency => min,
                0 => DEFAULT_FRAMES,
                n => n,
            };
            let frames = wanted.max(min).min(max).max(1);
            (frames, BufferSize::Fixed(frames))
        }
        // Device picks; oversized periods are split into blocks of `frames`
        SupportedBufferSize::Unknown => {
            let frames = if requested == 0 { DEFAULT_FRAMES } else { requested };
            (frames, BufferSize::Default)
        }
    }
}

struct DuplexInput {
    consumer: HeapCons<u8>,
    window: Window,
    scratch: Vec<u8>,
}

/// Runs the bridge over whatever buffer sizes cpal delivers.
struct Processor {
    bridge: CallbackBridge,
    sample_size: usize,
    block: usize,
    input_planar: PlanarBuffer,
    output_planar: PlanarBuffer,
    input_window: Option<Window>,
    output_window: Option<Window>,
    duplex: Option<DuplexInput>,
    shared: Arc<StreamShared>,
    finished: bool,
}

impl Processor {
    fn new(
        bridge: CallbackBridge,
        format: Format,
        frames: u32,
        input_window: Option<Window>,
        output_window: Option<Window>,
        shared: Arc<StreamShared>,
    ) -> Self {
        let max_frames = frames.max(1);
        let planar = |window: Option<Window>| {
            PlanarBuffer::new(format, window.map_or(0, |w| w.channels as u32), max_frames)
        };

        Self {
            bridge,
            sample_size: format.sample_size(),
            block: max_frames as usize,
            input_planar: planar(input_window),
            output_planar: planar(output_window),
            input_window,
            output_window,
            duplex: None,
            shared,
            finished: false,
        }
    }

    /// Take input from a byte queue filled by a separate capture stream.
    fn attach_duplex(&mut self, window: Window) -> HeapProd<u8> {
        let period_bytes = self.block * window.device_channels * self.sample_size;
        let (producer, consumer) =
            HeapRb::<u8>::new(period_bytes * DUPLEX_QUEUE_PERIODS).split();
        self.duplex = Some(DuplexInput {
            consumer,
            window,
            scratch: vec![0; period_bytes],
        });
        producer
    }

    fn run(&mut self, frames: usize) -> StreamControl {
        let status = if self.shared.input_overflow.swap(false, Ordering::Relaxed) {
            NativeStreamStatus::INPUT_OVERFLOW
        } else {
            NativeStreamStatus::empty()
        };

        let period = Period {
            input: self.input_planar.period(frames),
            output: self.output_planar.period_mut(frames),
            frames: frames as u32,
            stream_time: self.shared.time(),
            status,
            sample_rate: self.shared.sample_rate,
            latency: self.shared.latency(),
        };
        let control = self.bridge.process(period);

        self.shared
            .frames_processed
            .fetch_add(frames as u64, Ordering::Relaxed);
        if control != StreamControl::Continue {
            self.finished = true;
        }
        control
    }

    fn process_output(&mut self, data: &mut [u8]) {
        let Some(out) = self.output_window else {
            return;
        };
        let stride = out.device_channels * self.sample_size;
        if stride == 0 {
            return;
        }

        for chunk in data.chunks_mut(self.block * stride) {
            if self.finished {
                chunk.fill(0);
                continue;
            }
            let frames = chunk.len() / stride;

            if let Some(duplex) = self.duplex.as_mut() {
                let in_stride = duplex.window.device_channels * self.sample_size;
                let wanted = (frames * in_stride).min(duplex.scratch.len());
                let buf = &mut duplex.scratch[..wanted];
                let got = duplex.consumer.pop_slice(buf);
                buf[got..].fill(0);
                self.input_planar.deinterleave_from(
                    buf,
                    duplex.window.device_channels,
                    duplex.window.first_channel,
                    frames,
                );
            }

            self.run(frames);
            self.output_planar
                .interleave_into(chunk, out.device_channels, out.first_channel, frames);
        }
    }

    fn process_input(&mut self, data: &[u8]) {
        let Some(input) = self.input_window else {
            return;
        };
        let stride = input.device_channels * self.sample_size;
        if stride == 0 {
            return;
        }

        for chunk in data.chunks(self.block * stride) {
            if self.finished {
                return;
            }
            let frames = chunk.len() / stride;
            self.input_planar.deinterleave_from(
                chunk,
                input.device_channels,
                input.first_channel,
                frames,
            );
            self.run(frames);
        }
    }
}

/// Queue one capture callback for the output side, or flag an overflow.
fn push_captured(producer: &mut HeapProd<u8>, bytes: &[u8], shared: &StreamShared) {
    // Whole callbacks only, so the queue never holds a partial frame
    if producer.vacant_len() >= bytes.len() {
        producer.push_slice(bytes);
    } else {
        shared.input_overflow.store(true, Ordering::Relaxed);
    }
}

/// Streams built for one open call. Not started.
pub(crate) struct BuiltStreams {
    pub(crate) output: Option<StreamHandle>,
    pub(crate) input: Option<StreamHandle>,
    pub(crate) shared: Arc<StreamShared>,
}

fn error_callback(sink: ErrorSink) -> impl FnMut(cpal::StreamError) + Send + 'static {
    move |err| {
        // Stream errors are terminal for the stream; the owner decides what to do
        sink.report(BackendError::from(CpalError::from(err)));
    }
}

/// Build the cpal streams for an output, input or duplex configuration.
///
/// With both sides present the bridge runs on the output stream, and captured
/// input is handed over through a lock-free byte queue.
pub(crate) fn build(
    format: Format,
    sample_format: SampleFormat,
    sample_rate: u32,
    frames: u32,
    input: Option<Side>,
    output: Option<Side>,
    bridge: CallbackBridge,
) -> Result<BuiltStreams> {
    let shared = Arc::new(StreamShared::new(sample_rate));
    let sink = bridge.error_sink();

    let mut processor = Processor::new(
        bridge,
        format,
        frames,
        input.as_ref().map(|s| s.window),
        output.as_ref().map(|s| s.window),
        shared.clone(),
    );

    match (input, output) {
        (None, Some(out)) => {
            let stream = build_output(&out, sample_format, processor, sink)?;
            Ok(BuiltStreams {
                output: Some(stream),
                input: None,
                shared,
            })
        }
        (Some(inp), None) => {
            let stream = build_input(&inp, sample_format, processor, sink)?;
            Ok(BuiltStreams {
                output: None,
                input: Some(stream),
                shared,
            })
        }
        (Some(inp), Some(out)) => {
            let mut producer = processor.attach_duplex(inp.window);
            let output_stream = build_output(&out, sample_format, processor, sink.clone())?;

            let overflow = shared.clone();
            let input_stream = inp.device.build_input_stream_raw(
                &inp.config,
                sample_format,
                move |data: &cpal::Data, _: &cpal::InputCallbackInfo| {
                    push_captured(&mut producer, data.bytes(), &overflow);
                },
                error_callback(sink),
                None,
            )?;

            Ok(BuiltStreams {
                output: Some(output_stream),
                input: Some(StreamHandle(input_stream)),
                shared,
            })
        }
        (None, None) => Err(CpalError::Unsupported(
            "stream has neither input nor output".into(),
        )),
    }
}

fn build_output(
    side: &Side,
    sample_format: SampleFormat,
    mut processor: Processor,
    sink: ErrorSink,
) -> Result<StreamHandle> {
    let stream = side.device.build_output_stream_raw(
        &side.config,
        sample_format,
        move |data: &mut cpal::Data, info: &cpal::OutputCallbackInfo| {
            let ts = info.timestamp();
            processor
                .shared
                .store_latency(ts.playback.duration_since(&ts.callback));
            processor.process_output(data.bytes_mut());
        },
        error_callback(sink),
        None,
    )?;
    Ok(StreamHandle(stream))
}

fn build_input(
    side: &Side,
    sample_format: SampleFormat,
    mut processor: Processor,
    sink: ErrorSink,
) -> Result<StreamHandle> {
    let stream = side.device.build_input_stream_raw(
        &side.config,
        sample_format,
        move |data: &cpal::Data, info: &cpal::InputCallbackInfo| {
            let ts = info.timestamp();
            processor
                .shared
                .store_latency(ts.callback.duration_since(&ts.capture));
            processor.process_input(data.bytes());
        },
        error_callback(sink),
        None,
    )?;
    Ok(StreamHandle(stream))
}
