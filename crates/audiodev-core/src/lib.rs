//! Portable audio device I/O: device model, stream negotiation, backend
//! lifecycle and the real-time callback bridge.
//!
//! # Primary API
//!
//! - [`DeviceManager`]: Main entry point (enumerate, start, reconfigure, stop)
//! - [`StreamConfig`] / [`StreamParameters`] / [`StreamOptions`]: What to open
//! - [`AudioCallbackInfo`]: Per-period view handed to the application callback
//! - [`Backend`]: Seam for native audio APIs
//! - [`offline::OfflineBackend`]: Deterministic backend with manual period control
//!
//! # Feature-gated APIs
//!
//! - `"json"`: JSON encode/decode for [`StreamConfig`] and [`DeviceInfo`]
//!
//! # Example
//!
//! ```
//! use audiodev_core::offline::OfflineBackend;
//! use audiodev_core::prelude::*;
//!
//! let mut manager = DeviceManager::new(OfflineBackend::new());
//! let config = StreamConfig::output_only(StreamParameters::new(0, 2), 48000, 256);
//!
//! let mut phase = 0.0f32;
//! manager
//!     .start(config, move |info| {
//!         if info.dirty {
//!             phase = 0.0;
//!         }
//!         let step = 440.0 / info.sample_rate as f32;
//!         if let Some(mut channels) = info.outputs_mut::<f32>() {
//!             let left = channels.next().unwrap_or_default();
//!             for sample in left.iter_mut() {
//!                 *sample = (phase * core::f32::consts::TAU).sin();
//!                 phase = (phase + step).fract();
//!             }
//!         }
//!     })
//!     .unwrap();
//!
//! manager.backend_mut().run_period();
//! ```

pub mod error;
pub use error::{Error, Result};

pub mod native;
pub use native::{
    BackendError, NativeDeviceInfo, NativeErrorCode, NativeFormats, NativeStreamFlags,
    NativeStreamOptions, NativeStreamParameters, NativeStreamStatus,
};

pub mod taxonomy;
pub use taxonomy::{formats_from_native, CallbackStatus, ErrorCode, Flags, Format};

mod device;
pub use device::{DeviceInfo, Direction, DEFAULT_CHANNEL_LIMIT};

mod config;
pub use config::{
    StreamConfig, StreamOptions, StreamParameters, DEFAULT_MAX_BLOCK_SIZE, DEFAULT_SAMPLE_RATE,
};

mod negotiate;
pub use negotiate::{negotiate, OpenParameters};

pub mod buffer;
pub use buffer::{PlanarBuffer, Sample, I24};

mod callback;
pub use callback::{
    AudioCallbackInfo, Callback, CallbackBridge, CallbackShape, Period, StreamControl,
};

mod backend;
pub use backend::{Backend, ErrorSink};

mod lifecycle;
pub use lifecycle::{StreamLifecycle, StreamState};

mod manager;
pub use manager::{DeviceManager, DEFAULT_ERROR_QUEUE_CAPACITY};

pub mod offline;

pub mod prelude {
    //! Common imports for applications.
    pub use crate::{
        AudioCallbackInfo, CallbackStatus, DeviceInfo, DeviceManager, Direction, Error,
        ErrorCode, Flags, Format, Result, StreamConfig, StreamControl, StreamOptions,
        StreamParameters,
    };
}
