//! Typed samples and planar (per-channel contiguous) period buffers.

use crate::taxonomy::Format;
use bytemuck::{Pod, Zeroable};

/// A sample type that maps to exactly one [`Format`].
pub trait Sample: Pod + Send + Sync + 'static {
    const FORMAT: Format;
}

impl Sample for i8 {
    const FORMAT: Format = Format::Int8;
}

impl Sample for i16 {
    const FORMAT: Format = Format::Int16;
}

impl Sample for I24 {
    const FORMAT: Format = Format::Int24;
}

impl Sample for i32 {
    const FORMAT: Format = Format::Int32;
}

impl Sample for f32 {
    const FORMAT: Format = Format::Float32;
}

impl Sample for f64 {
    const FORMAT: Format = Format::Float64;
}

/// Packed little-endian signed 24-bit sample.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Pod, Zeroable)]
#[repr(transparent)]
pub struct I24(pub [u8; 3]);

impl I24 {
    pub const MIN: i32 = -(1 << 23);
    pub const MAX: i32 = (1 << 23) - 1;

    /// Saturates values outside the 24-bit range.
    pub fn from_i32(value: i32) -> Self {
        let [b0, b1, b2, _] = value.clamp(Self::MIN, Self::MAX).to_le_bytes();
        Self([b0, b1, b2])
    }

    pub fn to_i32(self) -> i32 {
        let [b0, b1, b2] = self.0;
        // Sign-extend from bit 23
        i32::from_le_bytes([0, b0, b1, b2]) >> 8
    }
}

/// Preallocated planar buffer for one side of a stream.
///
/// A period of `n` frames is laid out channel after channel: channel `c`
/// occupies samples `c * n .. (c + 1) * n`. Storage is 8-byte aligned so any
/// [`Sample`] type can be viewed in place.
#[derive(Debug, Clone)]
pub struct PlanarBuffer {
    storage: Vec<u64>,
    sample_size: usize,
    channels: usize,
    max_frames: usize,
}

impl PlanarBuffer {
    pub fn new(format: Format, channels: u32, max_frames: u32) -> Self {
        let sample_size = format.sample_size();
        let channels = channels as usize;
        let max_frames = max_frames as usize;
        let bytes = channels * max_frames * sample_size;

        Self {
            storage: vec![0; bytes.div_ceil(8)],
            sample_size,
            channels,
            max_frames,
        }
    }

    pub fn channels(&self) -> usize {
        self.channels
    }

    pub fn max_frames(&self) -> usize {
        self.max_frames
    }

    pub fn sample_size(&self) -> usize {
        self.sample_size
    }

    fn period_len(&self, frames: usize) -> usize {
        self.channels * frames.min(self.max_frames) * self.sample_size
    }

    /// Planar bytes for a period of `frames` frames (clamped to capacity).
    pub fn period(&self, frames: usize) -> &[u8] {
        let len = self.period_len(frames);
        &bytemuck::cast_slice(&self.storage)[..len]
    }

    pub fn period_mut(&mut self, frames: usize) -> &mut [u8] {
        let len = self.period_len(frames);
        &mut bytemuck::cast_slice_mut(&mut self.storage)[..len]
    }

    pub fn clear(&mut self) {
        self.storage.fill(0);
    }

    /// Copy interleaved device frames into this buffer's planar layout.
    ///
    /// Channel `c` is read from device channel `first_channel + c`. Frames or
    /// channels missing from `src` are zero-filled.
    pub fn deinterleave_from(
        &mut self,
        src: &[u8],
        device_channels: usize,
        first_channel: usize,
        frames: usize,
    ) {
        let size = self.sample_size;
        let channels = self.channels;
        let frames = frames.min(self.max_frames);
        let stride = device_channels * size;
        let available = if stride == 0 {
            0
        } else {
            (src.len() / stride).min(frames)
        };

        let dst = self.period_mut(frames);
        for ch in 0..channels {
            let plane = &mut dst[ch * frames * size..(ch + 1) * frames * size];
            let device_ch = first_channel + ch;
            if device_ch >= device_channels {
                plane.fill(0);
                continue;
            }
            for frame in 0..available {
                let from = frame * stride + device_ch * size;
                plane[frame * size..(frame + 1) * size].copy_from_slice(&src[from..from + size]);
            }
            plane[available * size..].fill(0);
        }
    }

    /// Write this buffer's planar period into interleaved device frames.
    ///
    /// Device channels outside `first_channel .. first_channel + channels` are zeroed.
    pub fn interleave_into(
        &self,
        dst: &mut [u8],
        device_channels: usize,
        first_channel: usize,
        frames: usize,
    ) {
        dst.fill(0);
        let size = self.sample_size;
        let stride = device_channels * size;
        if stride == 0 {
            return;
        }

        let frames = frames.min(self.max_frames).min(dst.len() / stride);
        let src = self.period(frames);
        for ch in 0..self.channels {
            let device_ch = first_channel + ch;
            if device_ch >= device_channels {
                continue;
            }
            for frame in 0..frames {
                let from = (ch * frames + frame) * size;
                let to = frame * stride + device_ch * size;
                dst[to..to + size].copy_from_slice(&src[from..from + size]);
            }
        }
    }
}
