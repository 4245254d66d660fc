//! Rendering engine error types

use thiserror::Error;

#[derive(Debug, Error)]
pub enum EngineError {
    /// The browser process could not be started
    #[error("Failed to launch browser: {0}")]
    Launch(String),

    /// A DevTools protocol command failed
    #[error("Browser protocol error: {0}")]
    Protocol(String),

    /// An inspection script threw or returned an unexpected shape
    #[error("Script evaluation failed: {0}")]
    Script(String),

    /// An operation exceeded its time bound
    #[error("Operation timed out after {0} ms")]
    Timeout(u64),
}

impl From<chromiumoxide::error::CdpError> for EngineError {
    fn from(err: chromiumoxide::error::CdpError) -> Self {
        EngineError::Protocol(err.to_string())
    }
}

impl From<serde_json::Error> for EngineError {
    fn from(err: serde_json::Error) -> Self {
        EngineError::Script(err.to_string())
    }
}
