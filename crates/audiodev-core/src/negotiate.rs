//! Translation of a portable [`StreamConfig`] into backend open-parameters.

use crate::config::{StreamConfig, StreamOptions, StreamParameters};
use crate::native::{NativeFormats, NativeStreamFlags, NativeStreamOptions, NativeStreamParameters};
use crate::Result;

/// Everything a backend needs to open a stream.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct OpenParameters {
    /// `None` for an output-only stream.
    pub input: Option<NativeStreamParameters>,
    /// `None` for an input-only stream.
    pub output: Option<NativeStreamParameters>,
    pub format: NativeFormats,
    pub sample_rate: u32,
    /// Requested frames per period. Backends report the value they actually use.
    pub frames: u32,
    pub options: NativeStreamOptions,
}

impl OpenParameters {
    pub fn input_channels(&self) -> u32 {
        self.input.map_or(0, |p| p.channels)
    }

    pub fn output_channels(&self) -> u32 {
        self.output.map_or(0, |p| p.channels)
    }
}

/// Validate `config` and build the backend open-parameters.
///
/// Sides with zero channels are dropped. The non-interleaved layout is always
/// requested: channel accessors on the callback info assume planar buffers.
pub fn negotiate(config: &StreamConfig) -> Result<OpenParameters> {
    config.validate()?;

    let params = OpenParameters {
        input: native_side(config.input.as_ref()),
        output: native_side(config.output.as_ref()),
        format: config.format.to_native(),
        sample_rate: config.sample_rate,
        frames: config.max_block_size,
        options: native_options(config.options.as_ref()),
    };

    tracing::debug!(
        "Negotiated stream: {} in / {} out, {:?}, {} Hz, {} frames, flags {:?}",
        params.input_channels(),
        params.output_channels(),
        config.format,
        params.sample_rate,
        params.frames,
        params.options.flags
    );

    Ok(params)
}

fn native_side(params: Option<&StreamParameters>) -> Option<NativeStreamParameters> {
    params
        .filter(|p| p.channels > 0)
        .map(|p| NativeStreamParameters {
            device_id: p.device_id,
            channels: p.channels,
            first_channel: p.first_channel,
        })
}

fn native_options(options: Option<&StreamOptions>) -> NativeStreamOptions {
    let mut native = options.map_or_else(NativeStreamOptions::default, |o| NativeStreamOptions {
        flags: o.flags.to_native(),
        number_of_buffers: o.number_of_buffers,
        stream_name: o.stream_name.clone(),
        priority: o.priority,
    });
    native.flags |= NativeStreamFlags::NONINTERLEAVED;
    native
}
