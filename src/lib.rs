//! # audiodev - Backend-agnostic audio device I/O
//!
//! Enumerate audio devices, open input, output or duplex streams with a
//! portable configuration, and receive one real-time callback per period.
//!
//! ## Architecture
//!
//! audiodev is an umbrella crate over:
//! - **audiodev-core** - Device model, stream negotiation, stream lifecycle,
//!   real-time callback bridge, offline backend
//! - **audiodev-cpal** - System audio through cpal (ALSA, CoreAudio, WASAPI, JACK)
//!
//! ## Quick Start
//!
//! ```ignore
//! use audiodev::prelude::*;
//!
//! let mut manager = audiodev::system_device_manager();
//! let config = manager.default_config()?;
//!
//! manager.start(config, |info| {
//!     if info.dirty {
//!         // Reallocate per-stream state for the new channel count / rate
//!     }
//!     if let Some(channels) = info.outputs_mut::<f32>() {
//!         for channel in channels {
//!             channel.fill(0.0);
//!         }
//!     }
//! })?;
//!
//! // Reconfigure: stop, close, reopen, start. The next period is dirty.
//! let config = manager.config().cloned().unwrap_or_default().with_max_block_size(256);
//! manager.set_config(config)?;
//! ```
//!
//! ## Feature Flags
//!
//! - `cpal` (default) - System audio backend
//! - `json` - JSON helpers for [`StreamConfig`] and [`DeviceInfo`]

/// Re-export of audiodev-core for direct access
pub use audiodev_core as core;

pub use audiodev_core::{
    // Facade
    DeviceManager,
    StreamState,

    // Configuration
    StreamConfig,
    StreamOptions,
    StreamParameters,
    DEFAULT_MAX_BLOCK_SIZE,
    DEFAULT_SAMPLE_RATE,

    // Devices
    DeviceInfo,
    Direction,

    // Taxonomy
    CallbackStatus,
    ErrorCode,
    Flags,
    Format,

    // Callback
    AudioCallbackInfo,
    StreamControl,
    Sample,
    I24,

    // Backends
    Backend,

    // Error
    Error,
    Result,
};

pub use audiodev_core::offline;

#[cfg(feature = "cpal")]
pub use audiodev_cpal as cpal_backend;

#[cfg(feature = "cpal")]
pub use audiodev_cpal::CpalBackend;

/// Device manager over the platform's default audio host.
#[cfg(feature = "cpal")]
pub type SystemDeviceManager = DeviceManager<CpalBackend>;

/// Create a [`SystemDeviceManager`] on the default cpal host.
#[cfg(feature = "cpal")]
pub fn system_device_manager() -> SystemDeviceManager {
    DeviceManager::new(CpalBackend::new())
}

/// Convenience prelude for common imports
pub mod prelude {
    pub use audiodev_core::prelude::*;

    pub use crate::offline::OfflineBackend;

    #[cfg(feature = "cpal")]
    pub use crate::{system_device_manager, CpalBackend, SystemDeviceManager};
}
