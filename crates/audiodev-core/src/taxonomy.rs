//! Portable enums and their translation to and from the native vocabulary.
//!
//! Stateless. Every mapping is an explicit table; ordinals are never cast.

use crate::native::{NativeErrorCode, NativeFormats, NativeStreamFlags, NativeStreamStatus};
use serde::{Deserialize, Serialize};

/// Portable sample format.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
pub enum Format {
    Int8,
    Int16,
    Int24,
    Int32,
    #[default]
    Float32,
    Float64,
}

impl Format {
    /// Canonical order used when expanding a native format mask.
    pub const ALL: [Format; 6] = [
        Format::Int8,
        Format::Int16,
        Format::Int24,
        Format::Int32,
        Format::Float32,
        Format::Float64,
    ];

    pub fn to_native(self) -> NativeFormats {
        match self {
            Format::Int8 => NativeFormats::SINT8,
            Format::Int16 => NativeFormats::SINT16,
            Format::Int24 => NativeFormats::SINT24,
            Format::Int32 => NativeFormats::SINT32,
            Format::Float32 => NativeFormats::FLOAT32,
            Format::Float64 => NativeFormats::FLOAT64,
        }
    }

    /// Bytes per sample. `Int24` is packed (3 bytes).
    pub const fn sample_size(self) -> usize {
        match self {
            Format::Int8 => 1,
            Format::Int16 => 2,
            Format::Int24 => 3,
            Format::Int32 | Format::Float32 => 4,
            Format::Float64 => 8,
        }
    }
}

/// Expand a native format mask into portable formats, in canonical order.
///
/// Unknown bits are ignored.
pub fn formats_from_native(formats: NativeFormats) -> Vec<Format> {
    Format::ALL
        .into_iter()
        .filter(|format| formats.contains(format.to_native()))
        .collect()
}

/// Stream flags as named booleans. Each maps to exactly one native bit.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(default, rename_all = "camelCase")]
pub struct Flags {
    pub non_interleaved: bool,
    pub minimize_latency: bool,
    pub hog_device: bool,
    pub schedule_real_time: bool,
    pub alsa_use_default: bool,
    pub jack_dont_connect: bool,
}

impl Flags {
    /// Low-latency preset: planar buffers, minimal latency, realtime scheduling.
    pub fn realtime() -> Self {
        Self {
            non_interleaved: true,
            minimize_latency: true,
            schedule_real_time: true,
            ..Self::default()
        }
    }

    pub fn to_native(self) -> NativeStreamFlags {
        let table = [
            (self.non_interleaved, NativeStreamFlags::NONINTERLEAVED),
            (self.minimize_latency, NativeStreamFlags::MINIMIZE_LATENCY),
            (self.hog_device, NativeStreamFlags::HOG_DEVICE),
            (self.schedule_real_time, NativeStreamFlags::SCHEDULE_REALTIME),
            (self.alsa_use_default, NativeStreamFlags::ALSA_USE_DEFAULT),
            (self.jack_dont_connect, NativeStreamFlags::JACK_DONT_CONNECT),
        ];

        table
            .into_iter()
            .filter(|(set, _)| *set)
            .fold(NativeStreamFlags::empty(), |acc, (_, bit)| acc | bit)
    }
}

/// Portable error code, translated 1:1 from driver codes.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum ErrorCode {
    NoError,
    Warning,
    UnknownError,
    NoDevicesFound,
    InvalidDevice,
    DeviceDisconnect,
    MemoryError,
    InvalidParameter,
    InvalidUse,
    DriverError,
    SystemError,
    ThreadError,
}

impl ErrorCode {
    /// Codes outside the known table map to [`ErrorCode::UnknownError`].
    pub fn from_native(code: NativeErrorCode) -> Self {
        match code {
            NativeErrorCode::NO_ERROR => ErrorCode::NoError,
            NativeErrorCode::WARNING => ErrorCode::Warning,
            NativeErrorCode::UNKNOWN_ERROR => ErrorCode::UnknownError,
            NativeErrorCode::NO_DEVICES_FOUND => ErrorCode::NoDevicesFound,
            NativeErrorCode::INVALID_DEVICE => ErrorCode::InvalidDevice,
            NativeErrorCode::DEVICE_DISCONNECT => ErrorCode::DeviceDisconnect,
            NativeErrorCode::MEMORY_ERROR => ErrorCode::MemoryError,
            NativeErrorCode::INVALID_PARAMETER => ErrorCode::InvalidParameter,
            NativeErrorCode::INVALID_USE => ErrorCode::InvalidUse,
            NativeErrorCode::DRIVER_ERROR => ErrorCode::DriverError,
            NativeErrorCode::SYSTEM_ERROR => ErrorCode::SystemError,
            NativeErrorCode::THREAD_ERROR => ErrorCode::ThreadError,
            _ => ErrorCode::UnknownError,
        }
    }

    pub fn to_native(self) -> NativeErrorCode {
        match self {
            ErrorCode::NoError => NativeErrorCode::NO_ERROR,
            ErrorCode::Warning => NativeErrorCode::WARNING,
            ErrorCode::UnknownError => NativeErrorCode::UNKNOWN_ERROR,
            ErrorCode::NoDevicesFound => NativeErrorCode::NO_DEVICES_FOUND,
            ErrorCode::InvalidDevice => NativeErrorCode::INVALID_DEVICE,
            ErrorCode::DeviceDisconnect => NativeErrorCode::DEVICE_DISCONNECT,
            ErrorCode::MemoryError => NativeErrorCode::MEMORY_ERROR,
            ErrorCode::InvalidParameter => NativeErrorCode::INVALID_PARAMETER,
            ErrorCode::InvalidUse => NativeErrorCode::INVALID_USE,
            ErrorCode::DriverError => NativeErrorCode::DRIVER_ERROR,
            ErrorCode::SystemError => NativeErrorCode::SYSTEM_ERROR,
            ErrorCode::ThreadError => NativeErrorCode::THREAD_ERROR,
        }
    }

    /// Stream is dead and must be reopened.
    pub fn is_fatal(self) -> bool {
        matches!(self, ErrorCode::DeviceDisconnect | ErrorCode::ThreadError)
    }
}

impl core::fmt::Display for ErrorCode {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        let name = match self {
            ErrorCode::NoError => "NO_ERROR",
            ErrorCode::Warning => "WARNING",
            ErrorCode::UnknownError => "UNKNOWN_ERROR",
            ErrorCode::NoDevicesFound => "NO_DEVICES_FOUND",
            ErrorCode::InvalidDevice => "INVALID_DEVICE",
            ErrorCode::DeviceDisconnect => "DEVICE_DISCONNECT",
            ErrorCode::MemoryError => "MEMORY_ERROR",
            ErrorCode::InvalidParameter => "INVALID_PARAMETER",
            ErrorCode::InvalidUse => "INVALID_USE",
            ErrorCode::DriverError => "DRIVER_ERROR",
            ErrorCode::SystemError => "SYSTEM_ERROR",
            ErrorCode::ThreadError => "THREAD_ERROR",
        };
        f.write_str(name)
    }
}

/// Per-period xrun status delivered to the application.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
pub enum CallbackStatus {
    #[default]
    Ok,
    InputOverflow,
    OutputUnderflow,
}

impl CallbackStatus {
    /// Input overflow wins when the driver reports both.
    pub fn from_native(status: NativeStreamStatus) -> Self {
        if status.contains(NativeStreamStatus::INPUT_OVERFLOW) {
            CallbackStatus::InputOverflow
        } else if status.contains(NativeStreamStatus::OUTPUT_UNDERFLOW) {
            CallbackStatus::OutputUnderflow
        } else {
            CallbackStatus::Ok
        }
    }
}
