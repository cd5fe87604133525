use crate::origin::Origin;

/// Errors that can occur on the pipe channels between hlerr and its child.
#[derive(Debug, thiserror::Error)]
pub enum TransportError {
    /// Failed to create a pipe.
    #[error("failed to create {origin} pipe: {source}")]
    Pipe {
        origin: Origin,
        source: std::io::Error,
    },

    /// The readiness wait itself failed.
    #[error("poll failed: {0}")]
    Poll(std::io::Error),

    /// Reading from a channel failed.
    #[error("read from {origin} pipe failed: {source}")]
    Read {
        origin: Origin,
        source: std::io::Error,
    },

    /// The kernel reported an error condition on a channel.
    #[error("stream error on {origin} pipe")]
    StreamFailed { origin: Origin },
}

pub type Result<T> = std::result::Result<T, TransportError>;
