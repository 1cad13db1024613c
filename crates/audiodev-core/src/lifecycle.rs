//! Stream state machine over a [`Backend`].

use crate::backend::Backend;
use crate::callback::CallbackBridge;
use crate::negotiate::OpenParameters;
use crate::{Error, Result};
use tracing::{debug, warn};

/// Closed → Open → Running. Opening is only legal from Closed, starting only
/// from Open, closing only from Open.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub enum StreamState {
    #[default]
    Closed,
    Open,
    Running,
}

/// Owns the backend and enforces legal stream transitions.
pub struct StreamLifecycle<B: Backend> {
    backend: B,
    state: StreamState,
}

impl<B: Backend> StreamLifecycle<B> {
    pub fn new(backend: B) -> Self {
        Self {
            backend,
            state: StreamState::Closed,
        }
    }

    pub fn state(&self) -> StreamState {
        self.state
    }

    pub fn backend(&self) -> &B {
        &self.backend
    }

    pub fn backend_mut(&mut self) -> &mut B {
        &mut self.backend
    }

    /// Open a stream. On failure the state stays Closed.
    ///
    /// Returns the frames per period the backend settled on.
    pub fn open(&mut self, params: &OpenParameters, bridge: CallbackBridge) -> Result<u32> {
        if self.state != StreamState::Closed {
            return Err(Error::InvalidUse(format!(
                "cannot open a stream while {:?}",
                self.state
            )));
        }

        match self.backend.open_stream(params, bridge) {
            Ok(frames) => {
                self.state = StreamState::Open;
                debug!(
                    "{} stream open: requested {} frames, got {}",
                    self.backend.name(),
                    params.frames,
                    frames
                );
                Ok(frames)
            }
            Err(e) => {
                warn!("{} failed to open stream: {}", self.backend.name(), e);
                Err(e.into())
            }
        }
    }

    pub fn start(&mut self) -> Result<()> {
        if self.state != StreamState::Open {
            return Err(Error::InvalidUse(format!(
                "cannot start a stream while {:?}",
                self.state
            )));
        }

        self.backend.start_stream()?;
        self.state = StreamState::Running;
        debug!("{} stream running", self.backend.name());
        Ok(())
    }

    /// No-op unless Running.
    pub fn stop(&mut self) -> Result<()> {
        if self.state != StreamState::Running {
            return Ok(());
        }

        self.backend.stop_stream()?;
        self.state = StreamState::Open;
        debug!("{} stream stopped", self.backend.name());
        Ok(())
    }

    /// No-op when Closed. Closing a running stream is an error; stop it first.
    pub fn close(&mut self) -> Result<()> {
        match self.state {
            StreamState::Closed => Ok(()),
            StreamState::Running => Err(Error::InvalidUse(
                "cannot close a running stream".into(),
            )),
            StreamState::Open => {
                self.backend.close_stream();
                self.state = StreamState::Closed;
                debug!("{} stream closed", self.backend.name());
                Ok(())
            }
        }
    }

    /// Stop and close, ending in Closed even if the backend fails to stop.
    ///
    /// The stop error, if any, is still returned.
    pub fn shutdown(&mut self) -> Result<()> {
        let stopped = if self.state == StreamState::Running {
            let result = self.backend.stop_stream();
            if let Err(e) = &result {
                warn!("{} failed to stop stream: {}", self.backend.name(), e);
            }
            self.state = StreamState::Open;
            result.map_err(Error::from)
        } else {
            Ok(())
        };

        self.close()?;
        stopped
    }

    pub fn latency(&self) -> u64 {
        if self.state == StreamState::Closed {
            0
        } else {
            self.backend.stream_latency()
        }
    }

    pub fn sample_rate(&self) -> u32 {
        if self.state == StreamState::Closed {
            0
        } else {
            self.backend.stream_sample_rate()
        }
    }

    pub fn time(&self) -> f64 {
        if self.state == StreamState::Closed {
            0.0
        } else {
            self.backend.stream_time()
        }
    }
}
