//! Portable device capability records.

use crate::native::NativeDeviceInfo;
use crate::taxonomy::{formats_from_native, Format};
use serde::{Deserialize, Serialize};

/// Channel count used for default stream parameters, per side.
pub const DEFAULT_CHANNEL_LIMIT: u32 = 2;

/// Stream side selector.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Direction {
    Input,
    Output,
}

/// Snapshot of a device's capabilities.
///
/// Built fresh on every enumeration. `id` is backend-scoped and may change
/// across backend restarts.
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct DeviceInfo {
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
    pub native_formats: Vec<Format>,
}

impl DeviceInfo {
    pub fn max_channels(&self, direction: Direction) -> u32 {
        match direction {
            Direction::Input => self.input_channels,
            Direction::Output => self.output_channels,
        }
    }

    /// Channel count for default stream parameters: `min(2, channels on that side)`.
    pub fn default_channels(&self, direction: Direction) -> u32 {
        self.max_channels(direction).min(DEFAULT_CHANNEL_LIMIT)
    }

    pub fn supports_sample_rate(&self, rate: u32) -> bool {
        self.sample_rates.contains(&rate)
    }

    pub fn supports_format(&self, format: Format) -> bool {
        self.native_formats.contains(&format)
    }
}

impl From<NativeDeviceInfo> for DeviceInfo {
    fn from(info: NativeDeviceInfo) -> Self {
        Self {
            id: info.id,
            name: info.name,
            output_channels: info.output_channels,
            input_channels: info.input_channels,
            duplex_channels: info.duplex_channels,
            is_default_output: info.is_default_output,
            is_default_input: info.is_default_input,
            sample_rates: info.sample_rates,
            current_sample_rate: info.current_sample_rate,
            preferred_sample_rate: info.preferred_sample_rate,
            native_formats: formats_from_native(info.native_formats),
        }
    }
}
