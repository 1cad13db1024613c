//! Backend-native vocabulary.
//!
//! These are the shapes a driver API speaks: bit masks for sample formats,
//! stream flags and xrun status, integer error codes, and flat parameter
//! records. Values follow the RtAudio layout so a C driver binding can pass
//! its own constants straight through.
//!
//! Portable types never cast to or from these; every crossing goes through the
//! explicit tables in [`crate::taxonomy`].

use bitflags::bitflags;

bitflags! {
    /// Sample formats a device or stream speaks natively.
    #[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
    pub struct NativeFormats: u64 {
        const SINT8 = 0x1;
        const SINT16 = 0x2;
        const SINT24 = 0x4;
        const SINT32 = 0x8;
        const FLOAT32 = 0x10;
        const FLOAT64 = 0x20;
    }
}

bitflags! {
    /// Stream-open flags.
    #[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
    pub struct NativeStreamFlags: u32 {
        /// Per-channel contiguous buffers instead of interleaved frames.
        const NONINTERLEAVED = 0x1;
        const MINIMIZE_LATENCY = 0x2;
        /// Exclusive device access.
        const HOG_DEVICE = 0x4;
        const SCHEDULE_REALTIME = 0x8;
        const ALSA_USE_DEFAULT = 0x10;
        /// Do not auto-connect JACK ports.
        const JACK_DONT_CONNECT = 0x20;
    }
}

bitflags! {
    /// Per-period xrun status reported by the driver.
    #[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
    pub struct NativeStreamStatus: u32 {
        const INPUT_OVERFLOW = 0x1;
        const OUTPUT_UNDERFLOW = 0x2;
    }
}

/// Raw driver error code.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub struct NativeErrorCode(pub i32);

impl NativeErrorCode {
    pub const NO_ERROR: Self = Self(0);
    pub const WARNING: Self = Self(1);
    pub const UNKNOWN_ERROR: Self = Self(2);
    pub const NO_DEVICES_FOUND: Self = Self(3);
    pub const INVALID_DEVICE: Self = Self(4);
    pub const DEVICE_DISCONNECT: Self = Self(5);
    pub const MEMORY_ERROR: Self = Self(6);
    pub const INVALID_PARAMETER: Self = Self(7);
    pub const INVALID_USE: Self = Self(8);
    pub const DRIVER_ERROR: Self = Self(9);
    pub const SYSTEM_ERROR: Self = Self(10);
    pub const THREAD_ERROR: Self = Self(11);
}

/// Failure reported by a backend: a native code plus the driver's diagnostic text.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct BackendError {
    pub code: NativeErrorCode,
    pub message: String,
}

impl BackendError {
    pub fn new(code: NativeErrorCode, message: impl Into<String>) -> Self {
        Self {
            code,
            message: message.into(),
        }
    }
}

impl core::fmt::Display for BackendError {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        write!(f, "backend error {}: {}", self.code.0, self.message)
    }
}

impl std::error::Error for BackendError {}

/// One side (input or output) of a stream as the driver sees it.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct NativeStreamParameters {
    pub device_id: u32,
    pub channels: u32,
    pub first_channel: u32,
}

/// Driver-level stream options. Zero / empty fields mean "driver default".
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct NativeStreamOptions {
    pub flags: NativeStreamFlags,
    pub number_of_buffers: u32,
    pub stream_name: String,
    pub priority: i32,
}

/// Device record as enumerated by a driver.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct NativeDeviceInfo {
    pub id: u32,
    pub name: String,
    pub output_channels: u32,
    pub input_channels: u32,
    pub duplex_channels: u32,
    pub is_default_output: bool,
    pub is_default_input: bool,
    pub sample_rates: Vec<u32>,
    pub current_sample_rate: u32,
    pub preferred_sample_rate: u32,
    pub native_formats: NativeFormats,
}
