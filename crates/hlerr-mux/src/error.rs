/// Errors that can occur while multiplexing the child's output.
#[derive(Debug, thiserror::Error)]
pub enum MuxError {
    /// Waiting on or reading from a channel failed.
    #[error(transparent)]
    Transport(#[from] hlerr_transport::TransportError),

    /// Writing to the combined output stream failed.
    #[error("output write failed: {0}")]
    Output(#[source] std::io::Error),
}

pub type Result<T> = std::result::Result<T, MuxError>;
