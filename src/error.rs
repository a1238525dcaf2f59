use std::io;

use thiserror::Error;

/// Errors surfaced by the StatsD client.
#[derive(Debug, Error)]
pub enum StatsdError {
    /// The client's socket was never opened or has been closed.
    #[error("cannot send stats, not connected to StatsD server")]
    NotConnected,
    /// A counter magnitude was zero or negative.
    #[error("count must be greater than 0, got {0}")]
    InvalidCount(i64),
    /// A sample rate fell outside of `[0, 1]`.
    #[error("sample rate must be between 0 and 1, got {0}")]
    InvalidSampleRate(f32),
    /// The collector address did not resolve to any socket address.
    #[error("could not resolve StatsD address '{0}'")]
    UnresolvedAddress(String),
    /// The underlying socket failed.
    #[error(transparent)]
    IoError(#[from] io::Error),
}

/// A type alias for returning a unit type or an error
pub type StatsdResult = Result<(), StatsdError>;
