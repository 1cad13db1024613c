//! Device enumeration and capability probing.

use crate::error::{CpalError, Result};
use audiodev_core::{Format, NativeDeviceInfo, NativeFormats};
use cpal::traits::{DeviceTrait, HostTrait};
use cpal::{SampleFormat, SupportedStreamConfigRange};

/// Rates probed against each device's supported ranges.
pub const STANDARD_SAMPLE_RATES: [u32; 14] = [
    4000, 5512, 8000, 9600, 11025, 16000, 22050, 32000, 44100, 48000, 88200, 96000, 176400,
    192000,
];

pub(crate) fn format_to_cpal(format: Format) -> Option<SampleFormat> {
    match format {
        Format::Int8 => Some(SampleFormat::I8),
        Format::Int16 => Some(SampleFormat::I16),
        Format::Int32 => Some(SampleFormat::I32),
        Format::Float32 => Some(SampleFormat::F32),
        Format::Float64 => Some(SampleFormat::F64),
        // cpal has no packed 24-bit format
        Format::Int24 => None,
    }
}

pub(crate) fn native_from_cpal(format: SampleFormat) -> NativeFormats {
    match format {
        SampleFormat::I8 => NativeFormats::SINT8,
        SampleFormat::I16 => NativeFormats::SINT16,
        SampleFormat::I32 => NativeFormats::SINT32,
        SampleFormat::F32 => NativeFormats::FLOAT32,
        SampleFormat::F64 => NativeFormats::FLOAT64,
        _ => NativeFormats::empty(),
    }
}

/// Devices in host enumeration order. The index is the device id.
pub(crate) fn enumerate(host: &cpal::Host) -> Result<Vec<cpal::Device>> {
    Ok(host.devices()?.collect())
}

pub(crate) fn device_by_id(host: &cpal::Host, id: u32) -> Result<cpal::Device> {
    host.devices()?
        .nth(id as usize)
        .ok_or(CpalError::InvalidDevice(id))
}

fn input_ranges(device: &cpal::Device) -> Vec<SupportedStreamConfigRange> {
    match device.supported_input_configs() {
        Ok(configs) => configs.collect(),
        Err(e) => {
            tracing::debug!("No input configs: {}", e);
            Vec::new()
        }
    }
}

fn output_ranges(device: &cpal::Device) -> Vec<SupportedStreamConfigRange> {
    match device.supported_output_configs() {
        Ok(configs) => configs.collect(),
        Err(e) => {
            tracing::debug!("No output configs: {}", e);
            Vec::new()
        }
    }
}

fn covers(range: &SupportedStreamConfigRange, rate: u32) -> bool {
    range.min_sample_rate().0 <= rate && rate <= range.max_sample_rate().0
}

/// Highest supported standard rate at or below 48 kHz, else the lowest supported.
fn preferred_rate(rates: &[u32]) -> u32 {
    rates
        .iter()
        .copied()
        .filter(|&r| r <= 48000)
        .max()
        .or_else(|| rates.first().copied())
        .unwrap_or(0)
}

pub(crate) fn probe(
    id: u32,
    device: &cpal::Device,
    default_input: Option<&str>,
    default_output: Option<&str>,
) -> Result<NativeDeviceInfo> {
    let name = device.name()?;
    let inputs = input_ranges(device);
    let outputs = output_ranges(device);

    let input_channels = inputs.iter().map(|r| r.channels() as u32).max().unwrap_or(0);
    let output_channels = outputs.iter().map(|r| r.channels() as u32).max().unwrap_or(0);

    let sample_rates: Vec<u32> = STANDARD_SAMPLE_RATES
        .into_iter()
        .filter(|&rate| inputs.iter().chain(&outputs).any(|r| covers(r, rate)))
        .collect();

    let native_formats = inputs
        .iter()
        .chain(&outputs)
        .fold(NativeFormats::empty(), |acc, r| {
            acc | native_from_cpal(r.sample_format())
        });

    let current_sample_rate = device
        .default_output_config()
        .or_else(|_| device.default_input_config())
        .map_or(0, |c| c.sample_rate().0);

    Ok(NativeDeviceInfo {
        id,
        output_channels,
        input_channels,
        duplex_channels: input_channels.min(output_channels),
        is_default_output: output_channels > 0 && default_output == Some(name.as_str()),
        is_default_input: input_channels > 0 && default_input == Some(name.as_str()),
        preferred_sample_rate: preferred_rate(&sample_rates),
        sample_rates,
        current_sample_rate,
        native_formats,
        name,
    })
}

/// Probe every device on `host`.
pub(crate) fn list(host: &cpal::Host) -> Result<Vec<NativeDeviceInfo>> {
    let default_input = host.default_input_device().and_then(|d| d.name().ok());
    let default_output = host.default_output_device().and_then(|d| d.name().ok());

    let mut infos = Vec::new();
    for (index, device) in enumerate(host)?.iter().enumerate() {
        match probe(
            index as u32,
            device,
            default_input.as_deref(),
            default_output.as_deref(),
        ) {
            Ok(info) => infos.push(info),
            Err(e) => tracing::warn!("Skipping device {}: {}", index, e),
        }
    }
    Ok(infos)
}

/// Narrowest config range on one side that can carry `channels` at `rate` in `format`.
pub(crate) fn select_range(
    ranges: impl Iterator<Item = SupportedStreamConfigRange>,
    channels: u32,
    rate: u32,
    format: SampleFormat,
) -> Option<SupportedStreamConfigRange> {
    ranges
        .filter(|r| r.sample_format() == format)
        .filter(|r| r.channels() as u32 >= channels)
        .filter(|r| covers(r, rate))
        .min_by_key(|r| r.channels())
}
