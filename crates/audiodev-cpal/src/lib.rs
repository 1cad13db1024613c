//! cpal backend for audiodev.
//!
//! [`CpalBackend`] implements [`audiodev_core::Backend`] over any cpal host
//! (ALSA, CoreAudio, WASAPI, and JACK with the `"jack"` feature).
//!
//! - Device ids are indices into the host's device list.
//! - Capabilities come from each device's supported config ranges, probed
//!   against [`STANDARD_SAMPLE_RATES`].
//! - The requested block size is clamped into the device's supported range;
//!   the clamped value is what the callback sees as `max_block_size`.
//! - Duplex streams run the callback on the output stream and receive
//!   captured input through a lock-free queue. Dropped input is reported as
//!   an input overflow.
//!
//! # Example
//!
//! ```ignore
//! use audiodev_core::DeviceManager;
//! use audiodev_cpal::CpalBackend;
//!
//! let mut manager = DeviceManager::new(CpalBackend::new());
//! let config = manager.default_config()?;
//! manager.start(config, |info| info.silence_output())?;
//! ```

mod backend;
mod device;
pub mod error;
mod stream;

pub use backend::CpalBackend;
pub use device::STANDARD_SAMPLE_RATES;
pub use error::CpalError;
pub use stream::DEFAULT_FRAMES;

/// Re-export of cpal host identifiers for [`CpalBackend::with_host`].
pub use cpal::HostId;
