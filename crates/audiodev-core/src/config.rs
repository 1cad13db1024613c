//! Stream configuration.

use crate::device::{DeviceInfo, Direction};
use crate::taxonomy::{Flags, Format};
use crate::{Error, Result};
use serde::{Deserialize, Serialize};

/// Sample rate used by [`crate::DeviceManager::default_config`].
pub const DEFAULT_SAMPLE_RATE: u32 = 44100;

/// Block size used by [`crate::DeviceManager::default_config`].
pub const DEFAULT_MAX_BLOCK_SIZE: u32 = 512;

/// One side of a stream. Zero channels means "no stream on this side".
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct StreamParameters {
    pub device_id: u32,
    #[serde(rename = "nChannels")]
    pub channels: u32,
    pub first_channel: u32,
}

impl StreamParameters {
    pub fn new(device_id: u32, channels: u32) -> Self {
        Self {
            device_id,
            channels,
            first_channel: 0,
        }
    }

    /// Default parameters for one side of `device`, clamped to at most two channels.
    pub fn from_device(device: &DeviceInfo, direction: Direction) -> Self {
        Self::new(device.id, device.default_channels(direction))
    }

    pub fn with_first_channel(mut self, first_channel: u32) -> Self {
        self.first_channel = first_channel;
        self
    }

    /// One past the last device channel used, or `None` if that overflows.
    pub fn last_channel(&self) -> Option<u32> {
        self.first_channel.checked_add(self.channels)
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct StreamOptions {
    pub flags: Flags,
    /// 0 = backend default.
    pub number_of_buffers: u32,
    pub stream_name: String,
    pub priority: i32,
}

/// Requested stream configuration.
///
/// At least one of `input`/`output` must carry channels; that is checked when
/// the stream is opened, not here.
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct StreamConfig {
    pub input: Option<StreamParameters>,
    pub output: Option<StreamParameters>,
    pub format: Format,
    pub sample_rate: u32,
    /// Frames per period. The backend may adjust it; 0 lets the backend choose.
    pub max_block_size: u32,
    pub options: Option<StreamOptions>,
}

impl StreamConfig {
    pub fn input_channels(&self) -> u32 {
        channel_count(self.input.as_ref())
    }

    pub fn output_channels(&self) -> u32 {
        channel_count(self.output.as_ref())
    }

    /// Output-only configuration.
    pub fn output_only(output: StreamParameters, sample_rate: u32, max_block_size: u32) -> Self {
        Self {
            output: Some(output),
            sample_rate,
            max_block_size,
            ..Self::default()
        }
    }

    /// Input-only configuration.
    pub fn input_only(input: StreamParameters, sample_rate: u32, max_block_size: u32) -> Self {
        Self {
            input: Some(input),
            sample_rate,
            max_block_size,
            ..Self::default()
        }
    }

    pub fn with_input(mut self, input: Option<StreamParameters>) -> Self {
        self.input = input;
        self
    }

    pub fn with_output(mut self, output: Option<StreamParameters>) -> Self {
        self.output = output;
        self
    }

    pub fn with_format(mut self, format: Format) -> Self {
        self.format = format;
        self
    }

    pub fn with_sample_rate(mut self, sample_rate: u32) -> Self {
        self.sample_rate = sample_rate;
        self
    }

    pub fn with_max_block_size(mut self, max_block_size: u32) -> Self {
        self.max_block_size = max_block_size;
        self
    }

    pub fn with_options(mut self, options: Option<StreamOptions>) -> Self {
        self.options = options;
        self
    }

    /// Check the configuration can be negotiated.
    pub fn validate(&self) -> Result<()> {
        if self.input_channels() == 0 && self.output_channels() == 0 {
            return Err(Error::InvalidParameter(
                "stream needs at least one input or output channel".into(),
            ));
        }
        if self.sample_rate == 0 {
            return Err(Error::InvalidParameter("sample_rate must be non-zero".into()));
        }
        for side in [self.input.as_ref(), self.output.as_ref()].into_iter().flatten() {
            if side.last_channel().is_none() {
                return Err(Error::InvalidParameter(format!(
                    "{} channels from channel {} overflow the channel range",
                    side.channels, side.first_channel
                )));
            }
        }
        Ok(())
    }

    #[cfg(feature = "json")]
    pub fn to_json(&self) -> Result<String> {
        Ok(serde_json::to_string(self)?)
    }

    #[cfg(feature = "json")]
    pub fn to_json_pretty(&self) -> Result<String> {
        Ok(serde_json::to_string_pretty(self)?)
    }

    #[cfg(feature = "json")]
    pub fn from_json(json: &str) -> Result<Self> {
        Ok(serde_json::from_str(json)?)
    }
}

#[cfg(feature = "json")]
impl DeviceInfo {
    pub fn to_json(&self) -> Result<String> {
        Ok(serde_json::to_string(self)?)
    }

    pub fn from_json(json: &str) -> Result<Self> {
        Ok(serde_json::from_str(json)?)
    }
}

fn channel_count(params: Option<&StreamParameters>) -> u32 {
    params.map_or(0, |p| p.channels)
}
