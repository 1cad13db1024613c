//! [`Backend`] implementation over a cpal host.

use crate::device::{self, format_to_cpal};
use crate::error::{CpalError, Result};
use crate::stream::{self, BuiltStreams, Side, Window};
use audiodev_core::{
    formats_from_native, Backend, BackendError, CallbackBridge, NativeDeviceInfo,
    NativeStreamFlags, NativeStreamOptions, NativeStreamParameters, OpenParameters,
};
use cpal::traits::DeviceTrait;
use std::sync::Arc;
use tracing::{debug, warn};

/// Flags cpal gives no control over.
const IGNORED_FLAGS: NativeStreamFlags = NativeStreamFlags::HOG_DEVICE
    .union(NativeStreamFlags::SCHEDULE_REALTIME)
    .union(NativeStreamFlags::ALSA_USE_DEFAULT)
    .union(NativeStreamFlags::JACK_DONT_CONNECT);

/// System audio through cpal.
///
/// Device ids are indices into the host's device enumeration, so they can
/// change when devices are added or removed.
pub struct CpalBackend {
    host_id: cpal::HostId,
    stream: Option<BuiltStreams>,
    running: bool,
}

impl Default for CpalBackend {
    fn default() -> Self {
        Self::new()
    }
}

impl CpalBackend {
    /// Backend on the platform's default host.
    pub fn new() -> Self {
        Self::with_host(cpal::default_host().id())
    }

    pub fn with_host(host_id: cpal::HostId) -> Self {
        Self {
            host_id,
            stream: None,
            running: false,
        }
    }

    /// Hosts compiled in and usable on this system.
    pub fn available_hosts() -> Vec<cpal::HostId> {
        cpal::available_hosts()
    }

    pub fn host_id(&self) -> cpal::HostId {
        self.host_id
    }

    pub fn is_running(&self) -> bool {
        self.running
    }

    fn host(&self) -> Result<cpal::Host> {
        Ok(cpal::host_from_id(self.host_id)?)
    }

    fn resolve_side(
        &self,
        host: &cpal::Host,
        params: &NativeStreamParameters,
        is_input: bool,
        sample_rate: u32,
        sample_format: cpal::SampleFormat,
    ) -> Result<(Side, cpal::SupportedBufferSize)> {
        let device = device::device_by_id(host, params.device_id)?;
        let needed = params
            .first_channel
            .checked_add(params.channels)
            .ok_or_else(|| {
                CpalError::Unsupported(format!(
                    "{} channels from channel {} overflow the channel range",
                    params.channels, params.first_channel
                ))
            })?;

        let ranges: Vec<_> = if is_input {
            device.supported_input_configs()?.collect()
        } else {
            device.supported_output_configs()?.collect()
        };
        let range = device::select_range(ranges.into_iter(), needed, sample_rate, sample_format)
            .ok_or_else(|| {
                CpalError::Unsupported(format!(
                    "device {} has no {} config for {} channels at {} Hz as {:?}",
                    params.device_id,
                    if is_input { "input" } else { "output" },
                    needed,
                    sample_rate,
                    sample_format
                ))
            })?;

        let side = Side {
            device,
            config: cpal::StreamConfig {
                channels: range.channels(),
                sample_rate: cpal::SampleRate(sample_rate),
                buffer_size: cpal::BufferSize::Default,
            },
            window: Window {
                device_channels: range.channels() as usize,
                first_channel: params.first_channel as usize,
                channels: params.channels as usize,
            },
        };
        Ok((side, *range.buffer_size()))
    }

    fn open(&mut self, params: &OpenParameters, bridge: CallbackBridge) -> Result<u32> {
        if self.stream.is_some() {
            return Err(CpalError::InvalidUse("a stream is already open"));
        }

        let format = match formats_from_native(params.format).as_slice() {
            [format] => *format,
            _ => {
                return Err(CpalError::Unsupported(format!(
                    "expected exactly one sample format, got {:?}",
                    params.format
                )))
            }
        };
        let sample_format = format_to_cpal(format).ok_or_else(|| {
            CpalError::Unsupported(format!("{:?} samples are not available through cpal", format))
        })?;
        log_ignored_options(&params.options);

        let host = self.host()?;
        let mut input = params
            .input
            .as_ref()
            .map(|p| self.resolve_side(&host, p, true, params.sample_rate, sample_format))
            .transpose()?;
        let mut output = params
            .output
            .as_ref()
            .map(|p| self.resolve_side(&host, p, false, params.sample_rate, sample_format))
            .transpose()?;

        // The output side sets the period size when present
        let minimize = params
            .options
            .flags
            .contains(NativeStreamFlags::MINIMIZE_LATENCY);
        let supported = output
            .as_ref()
            .or(input.as_ref())
            .map(|(_, supported)| *supported)
            .unwrap_or(cpal::SupportedBufferSize::Unknown);
        let (frames, buffer_size) = stream::block_size(params.frames, &supported, minimize);

        if let Some((side, _)) = output.as_mut() {
            side.config.buffer_size = buffer_size;
        }
        if let Some((side, supported)) = input.as_mut() {
            side.config.buffer_size = match *supported {
                cpal::SupportedBufferSize::Range { min, max } if (min..=max).contains(&frames) => {
                    cpal::BufferSize::Fixed(frames)
                }
                _ => cpal::BufferSize::Default,
            };
        }

        let built = stream::build(
            format,
            sample_format,
            params.sample_rate,
            frames,
            input.map(|(side, _)| side),
            output.map(|(side, _)| side),
            bridge,
        )?;

        debug!(
            "cpal {:?}: opened {} in / {} out at {} Hz, {} frames (requested {})",
            self.host_id,
            params.input_channels(),
            params.output_channels(),
            params.sample_rate,
            frames,
            params.frames
        );
        self.stream = Some(built);
        Ok(frames)
    }

    fn start(&mut self) -> Result<()> {
        let streams = self
            .stream
            .as_ref()
            .ok_or(CpalError::InvalidUse("no stream is open"))?;
        // Input first so the duplex queue is filling before output pulls from it
        if let Some(input) = &streams.input {
            input.play()?;
        }
        if let Some(output) = &streams.output {
            output.play()?;
        }
        self.running = true;
        Ok(())
    }

    fn stop(&mut self) -> Result<()> {
        let Some(streams) = self.stream.as_ref() else {
            return Ok(());
        };
        self.running = false;
        if let Some(output) = &streams.output {
            output.pause()?;
        }
        if let Some(input) = &streams.input {
            input.pause()?;
        }
        Ok(())
    }

    fn shared(&self) -> Option<&Arc<stream::StreamShared>> {
        self.stream.as_ref().map(|s| &s.shared)
    }
}

fn log_ignored_options(options: &NativeStreamOptions) {
    let ignored = options.flags & IGNORED_FLAGS;
    if !ignored.is_empty() {
        debug!("cpal ignores stream flags {:?}", ignored);
    }
    if options.number_of_buffers > 0 || options.priority != 0 || !options.stream_name.is_empty() {
        debug!(
            "cpal ignores buffer count {}, priority {} and stream name '{}'",
            options.number_of_buffers, options.priority, options.stream_name
        );
    }
}

impl Backend for CpalBackend {
    fn name(&self) -> &'static str {
        "cpal"
    }

    fn list_devices(&self) -> core::result::Result<Vec<NativeDeviceInfo>, BackendError> {
        let host = self.host()?;
        Ok(device::list(&host)?)
    }

    fn default_input_device(&self) -> core::result::Result<NativeDeviceInfo, BackendError> {
        let devices = self.list_devices()?;
        devices
            .into_iter()
            .find(|d| d.is_default_input)
            .ok_or_else(|| CpalError::NoDevice("input").into())
    }

    fn default_output_device(&self) -> core::result::Result<NativeDeviceInfo, BackendError> {
        let devices = self.list_devices()?;
        devices
            .into_iter()
            .find(|d| d.is_default_output)
            .ok_or_else(|| CpalError::NoDevice("output").into())
    }

    fn open_stream(
        &mut self,
        params: &OpenParameters,
        bridge: CallbackBridge,
    ) -> core::result::Result<u32, BackendError> {
        self.open(params, bridge).map_err(|e| {
            warn!("cpal open failed: {}", e);
            e.into()
        })
    }

    fn start_stream(&mut self) -> core::result::Result<(), BackendError> {
        Ok(self.start()?)
    }

    fn stop_stream(&mut self) -> core::result::Result<(), BackendError> {
        Ok(self.stop()?)
    }

    fn close_stream(&mut self) {
        self.running = false;
        // Dropping the streams joins their callback threads
        self.stream = None;
    }

    fn stream_latency(&self) -> u64 {
        self.shared().map_or(0, |s| s.latency())
    }

    fn stream_sample_rate(&self) -> u32 {
        self.shared().map_or(0, |s| s.sample_rate)
    }

    fn stream_time(&self) -> f64 {
        self.shared().map_or(0.0, |s| s.time())
    }
}
