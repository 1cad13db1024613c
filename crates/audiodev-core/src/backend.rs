//! The native backend seam.
//!
//! A [`Backend`] speaks the native vocabulary from [`crate::native`]: raw
//! format and flag bits, numeric error codes, planar byte buffers. The
//! [`crate::DeviceManager`] owns exactly one backend and is the only caller.

use crate::callback::CallbackBridge;
use crate::native::{BackendError, NativeDeviceInfo};
use crate::negotiate::OpenParameters;
use crossbeam_channel::Sender;

/// Native audio API.
///
/// Calls are serialized by the owner. The backend drives
/// [`CallbackBridge::process`] from its own audio thread once per period
/// between `start_stream` and `stop_stream`.
pub trait Backend: Send {
    fn name(&self) -> &'static str;

    fn list_devices(&self) -> Result<Vec<NativeDeviceInfo>, BackendError>;

    fn default_input_device(&self) -> Result<NativeDeviceInfo, BackendError>;

    fn default_output_device(&self) -> Result<NativeDeviceInfo, BackendError>;

    /// Open a stream and take ownership of `bridge` until `close_stream`.
    ///
    /// Returns the frames per period actually used, which may differ from
    /// `params.frames`.
    fn open_stream(
        &mut self,
        params: &OpenParameters,
        bridge: CallbackBridge,
    ) -> Result<u32, BackendError>;

    fn start_stream(&mut self) -> Result<(), BackendError>;

    /// Stop requesting periods. A period already in flight may still
    /// complete after this returns.
    fn stop_stream(&mut self) -> Result<(), BackendError>;

    /// Release the stream and drop its bridge. No-op if nothing is open.
    ///
    /// Must not return while a period is still being processed; once it
    /// returns, the bridge and the callback it holds are no longer in use.
    fn close_stream(&mut self);

    /// Total stream latency in frames.
    fn stream_latency(&self) -> u64;

    /// Sample rate the device actually runs at.
    fn stream_sample_rate(&self) -> u32;

    /// Seconds of audio processed since the stream started.
    fn stream_time(&self) -> f64;
}

impl<B: Backend + ?Sized> Backend for Box<B> {
    fn name(&self) -> &'static str {
        (**self).name()
    }

    fn list_devices(&self) -> Result<Vec<NativeDeviceInfo>, BackendError> {
        (**self).list_devices()
    }

    fn default_input_device(&self) -> Result<NativeDeviceInfo, BackendError> {
        (**self).default_input_device()
    }

    fn default_output_device(&self) -> Result<NativeDeviceInfo, BackendError> {
        (**self).default_output_device()
    }

    fn open_stream(
        &mut self,
        params: &OpenParameters,
        bridge: CallbackBridge,
    ) -> Result<u32, BackendError> {
        (**self).open_stream(params, bridge)
    }

    fn start_stream(&mut self) -> Result<(), BackendError> {
        (**self).start_stream()
    }

    fn stop_stream(&mut self) -> Result<(), BackendError> {
        (**self).stop_stream()
    }

    fn close_stream(&mut self) {
        (**self).close_stream()
    }

    fn stream_latency(&self) -> u64 {
        (**self).stream_latency()
    }

    fn stream_sample_rate(&self) -> u32 {
        (**self).stream_sample_rate()
    }

    fn stream_time(&self) -> f64 {
        (**self).stream_time()
    }
}

/// Reporting end of the manager's error queue.
///
/// Backends push stream errors here from whatever thread detects them; the
/// application drains them with [`crate::DeviceManager::poll_error`].
#[derive(Debug, Clone)]
pub struct ErrorSink {
    sender: Sender<BackendError>,
}

impl ErrorSink {
    pub(crate) fn new(sender: Sender<BackendError>) -> Self {
        Self { sender }
    }

    /// Queue an error without blocking. Returns `false` if the queue is full
    /// or the manager is gone; the report is dropped in that case.
    pub fn report(&self, error: BackendError) -> bool {
        self.sender.try_send(error).is_ok()
    }
}
