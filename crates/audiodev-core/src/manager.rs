//! Device and stream facade.

use crate::backend::{Backend, ErrorSink};
use crate::callback::{AudioCallbackInfo, Callback, CallbackBridge, SharedCallback};
use crate::config::{StreamConfig, StreamParameters, DEFAULT_MAX_BLOCK_SIZE, DEFAULT_SAMPLE_RATE};
use crate::device::{DeviceInfo, Direction};
use crate::lifecycle::{StreamLifecycle, StreamState};
use crate::native::BackendError;
use crate::negotiate::negotiate;
use crate::taxonomy::ErrorCode;
use crate::{Error, Result};
use arc_swap::ArcSwapOption;
use crossbeam_channel::{Receiver, Sender};
use parking_lot::Mutex;
use std::sync::Arc;
use tracing::{debug, info, warn};

/// Capacity of the fatal-error queue between backend threads and the owner.
pub const DEFAULT_ERROR_QUEUE_CAPACITY: usize = 64;

/// Owns one backend, the active configuration and the registered callback.
///
/// Control-thread only. Reconfiguration is always a full stop, close, open
/// and start; the callback sees `dirty` on the first period afterwards.
///
/// # Example
///
/// ```
/// use audiodev_core::offline::OfflineBackend;
/// use audiodev_core::DeviceManager;
///
/// let mut manager = DeviceManager::new(OfflineBackend::new());
/// let config = manager.default_config().unwrap();
/// assert_eq!(config.sample_rate, 44100);
///
/// manager.start(config, |info| info.silence_output()).unwrap();
/// assert!(manager.is_running());
/// manager.stop().unwrap();
/// ```
pub struct DeviceManager<B: Backend> {
    lifecycle: StreamLifecycle<B>,
    callback: Option<SharedCallback>,
    config: Option<StreamConfig>,
    error_tx: Sender<BackendError>,
    error_rx: Receiver<BackendError>,
}

impl<B: Backend> DeviceManager<B> {
    pub fn new(backend: B) -> Self {
        Self::with_error_capacity(backend, DEFAULT_ERROR_QUEUE_CAPACITY)
    }

    pub fn with_error_capacity(backend: B, capacity: usize) -> Self {
        let (error_tx, error_rx) = crossbeam_channel::bounded(capacity.max(1));
        Self {
            lifecycle: StreamLifecycle::new(backend),
            callback: None,
            config: None,
            error_tx,
            error_rx,
        }
    }

    pub fn list_devices(&self) -> Result<Vec<DeviceInfo>> {
        let devices = self.lifecycle.backend().list_devices()?;
        debug!(
            "{} reported {} devices",
            self.lifecycle.backend().name(),
            devices.len()
        );
        Ok(devices.into_iter().map(DeviceInfo::from).collect())
    }

    pub fn default_input_device(&self) -> Result<DeviceInfo> {
        Ok(self.lifecycle.backend().default_input_device()?.into())
    }

    pub fn default_output_device(&self) -> Result<DeviceInfo> {
        Ok(self.lifecycle.backend().default_output_device()?.into())
    }

    /// Look up a device by id.
    pub fn find_device(&self, id: u32) -> Result<DeviceInfo> {
        self.list_devices()?
            .into_iter()
            .find(|d| d.id == id)
            .ok_or_else(|| Error::Backend {
                code: ErrorCode::InvalidDevice,
                message: format!("no device with id {id}"),
            })
    }

    /// Default input and output devices, at most two channels each, 44100 Hz,
    /// 512 frames. A side with no default device is left absent.
    pub fn default_config(&self) -> Result<StreamConfig> {
        Ok(StreamConfig {
            input: self.default_side(Direction::Input)?,
            output: self.default_side(Direction::Output)?,
            sample_rate: DEFAULT_SAMPLE_RATE,
            max_block_size: DEFAULT_MAX_BLOCK_SIZE,
            ..StreamConfig::default()
        })
    }

    fn default_side(&self, direction: Direction) -> Result<Option<StreamParameters>> {
        let device = match direction {
            Direction::Input => self.default_input_device(),
            Direction::Output => self.default_output_device(),
        };

        match device {
            Ok(device) => Ok(Some(StreamParameters::from_device(&device, direction))),
            Err(e) if matches!(e.code(), ErrorCode::NoDevicesFound | ErrorCode::InvalidDevice) => {
                debug!("No default {:?} device: {}", direction, e);
                Ok(None)
            }
            Err(e) => Err(e),
        }
    }

    /// Register `callback` and open a stream with `config`.
    ///
    /// Replaces any previously registered callback.
    pub fn start<F>(&mut self, config: StreamConfig, callback: F) -> Result<()>
    where
        F: FnMut(&mut AudioCallbackInfo<'_>) + Send + 'static,
    {
        // Validate before tearing anything down
        negotiate(&config)?;
        self.stop()?;

        let callback: Callback = Box::new(callback);
        self.callback = Some(Arc::new(Mutex::new(callback)));
        self.set_config(config)
    }

    /// Stop, close, reopen with `config`, and start again.
    ///
    /// Requires a callback registered by [`DeviceManager::start`]. If opening
    /// fails the stream stays closed; if starting fails the stream is closed.
    pub fn set_config(&mut self, config: StreamConfig) -> Result<()> {
        let callback = self.callback.clone().ok_or_else(|| {
            Error::InvalidUse("set_config called before a callback was registered".into())
        })?;
        let params = negotiate(&config)?;

        self.stop()?;
        self.discard_stale_errors();

        // Periods are silenced until the adjusted config is published below
        let shared = Arc::new(ArcSwapOption::empty());
        let bridge = CallbackBridge::new(
            callback,
            shared.clone(),
            ErrorSink::new(self.error_tx.clone()),
        );

        let frames = self.lifecycle.open(&params, bridge)?;
        let mut active = config;
        active.max_block_size = frames;
        shared.store(Some(Arc::new(active.clone())));

        if let Err(e) = self.lifecycle.start() {
            warn!("Stream failed to start, closing: {}", e);
            if let Err(close_err) = self.lifecycle.close() {
                warn!("Failed to close stream after start failure: {}", close_err);
            }
            return Err(e);
        }

        info!(
            "Stream started on {}: {} in / {} out, {:?}, {} Hz, {} frames",
            self.lifecycle.backend().name(),
            active.input_channels(),
            active.output_channels(),
            active.format,
            active.sample_rate,
            active.max_block_size
        );
        self.config = Some(active);
        Ok(())
    }

    /// Stop and close the stream. Safe to call in any state.
    pub fn stop(&mut self) -> Result<()> {
        if self.lifecycle.state() == StreamState::Closed {
            return Ok(());
        }
        self.config = None;
        self.lifecycle.shutdown()
    }

    fn discard_stale_errors(&self) {
        let stale = self.error_rx.try_iter().count();
        if stale > 0 {
            debug!("Discarded {} errors from the previous stream", stale);
        }
    }

    /// Latency in frames, 0 when no stream is open.
    pub fn stream_latency(&self) -> u64 {
        self.lifecycle.latency()
    }

    /// Actual sample rate, 0 when no stream is open.
    pub fn stream_sample_rate(&self) -> u32 {
        self.lifecycle.sample_rate()
    }

    /// Seconds since the stream started, 0 when no stream is open.
    pub fn stream_time(&self) -> f64 {
        self.lifecycle.time()
    }

    pub fn state(&self) -> StreamState {
        self.lifecycle.state()
    }

    pub fn is_open(&self) -> bool {
        self.state() != StreamState::Closed
    }

    pub fn is_running(&self) -> bool {
        self.state() == StreamState::Running
    }

    /// The running configuration, with the block size the backend settled on.
    pub fn config(&self) -> Option<&StreamConfig> {
        self.config.as_ref()
    }

    pub fn backend(&self) -> &B {
        self.lifecycle.backend()
    }

    pub fn backend_mut(&mut self) -> &mut B {
        self.lifecycle.backend_mut()
    }

    /// Next error reported by the backend since the stream was opened.
    pub fn poll_error(&self) -> Option<Error> {
        self.error_rx.try_recv().ok().map(Error::from)
    }

    pub fn drain_errors(&self) -> Vec<Error> {
        self.error_rx.try_iter().map(Error::from).collect()
    }
}

impl<B: Backend + Default> Default for DeviceManager<B> {
    fn default() -> Self {
        Self::new(B::default())
    }
}

impl<B: Backend> Drop for DeviceManager<B> {
    fn drop(&mut self) {
        if let Err(e) = self.stop() {
            warn!("Error stopping stream on drop: {}", e);
        }
    }
}
