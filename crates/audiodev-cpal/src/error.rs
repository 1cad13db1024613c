//! Error types for audiodev-cpal.

use audiodev_core::{BackendError, NativeErrorCode};
use thiserror::Error;

/// cpal failures, before translation to native error codes.
#[derive(Error, Debug)]
pub enum CpalError {
    #[error("Audio host unavailable")]
    HostUnavailable(#[from] cpal::HostUnavailable),

    #[error("Failed to enumerate devices: {0}")]
    Devices(#[from] cpal::DevicesError),

    #[error("Failed to get device name: {0}")]
    DeviceName(#[from] cpal::DeviceNameError),

    #[error("Failed to query supported configs: {0}")]
    SupportedConfigs(#[from] cpal::SupportedStreamConfigsError),

    #[error("Failed to build audio stream: {0}")]
    BuildStream(#[from] cpal::BuildStreamError),

    #[error("Failed to play audio stream: {0}")]
    PlayStream(#[from] cpal::PlayStreamError),

    #[error("Failed to pause audio stream: {0}")]
    PauseStream(#[from] cpal::PauseStreamError),

    #[error("Stream error: {0}")]
    Stream(#[from] cpal::StreamError),

    #[error("No {0} device available")]
    NoDevice(&'static str),

    #[error("Device index {0} out of range")]
    InvalidDevice(u32),

    #[error("Unsupported: {0}")]
    Unsupported(String),

    #[error("Invalid use: {0}")]
    InvalidUse(&'static str),
}

impl CpalError {
    pub fn native_code(&self) -> NativeErrorCode {
        use cpal::{BuildStreamError as Build, SupportedStreamConfigsError as Configs};

        match self {
            CpalError::HostUnavailable(_) => NativeErrorCode::SYSTEM_ERROR,
            CpalError::Devices(_) | CpalError::DeviceName(_) => NativeErrorCode::DRIVER_ERROR,
            CpalError::SupportedConfigs(Configs::DeviceNotAvailable) => {
                NativeErrorCode::INVALID_DEVICE
            }
            CpalError::SupportedConfigs(Configs::InvalidArgument) => {
                NativeErrorCode::INVALID_PARAMETER
            }
            CpalError::SupportedConfigs(_) => NativeErrorCode::DRIVER_ERROR,
            CpalError::BuildStream(Build::DeviceNotAvailable) => NativeErrorCode::INVALID_DEVICE,
            CpalError::BuildStream(Build::StreamConfigNotSupported | Build::InvalidArgument) => {
                NativeErrorCode::INVALID_PARAMETER
            }
            CpalError::BuildStream(Build::StreamIdOverflow) => NativeErrorCode::SYSTEM_ERROR,
            CpalError::BuildStream(_) => NativeErrorCode::DRIVER_ERROR,
            CpalError::PlayStream(cpal::PlayStreamError::DeviceNotAvailable)
            | CpalError::PauseStream(cpal::PauseStreamError::DeviceNotAvailable)
            | CpalError::Stream(cpal::StreamError::DeviceNotAvailable) => {
                NativeErrorCode::DEVICE_DISCONNECT
            }
            CpalError::PlayStream(_) | CpalError::PauseStream(_) | CpalError::Stream(_) => {
                NativeErrorCode::DRIVER_ERROR
            }
            CpalError::NoDevice(_) => NativeErrorCode::NO_DEVICES_FOUND,
            CpalError::InvalidDevice(_) => NativeErrorCode::INVALID_DEVICE,
            CpalError::Unsupported(_) => NativeErrorCode::INVALID_PARAMETER,
            CpalError::InvalidUse(_) => NativeErrorCode::INVALID_USE,
        }
    }
}

impl From<CpalError> for BackendError {
    fn from(e: CpalError) -> Self {
        BackendError::new(e.native_code(), e.to_string())
    }
}

pub type Result<T> = core::result::Result<T, CpalError>;
