use std::ffi::OsString;

/// Errors that can occur while launching or reaping the child.
#[derive(Debug, thiserror::Error)]
pub enum ProcessError {
    /// Creating the stdout/stderr pipes failed.
    #[error("transport error: {0}")]
    Transport(#[from] hlerr_transport::TransportError),

    /// A program name or argument cannot be passed to `exec`.
    #[error("argument contains an interior NUL byte: {0:?}")]
    InvalidArgument(OsString),

    /// `fork()` failed.
    #[error("fork failed: {0}")]
    Fork(std::io::Error),

    /// Waiting for the child failed.
    #[error("waitpid for pid {pid} failed: {source}")]
    Wait { pid: u32, source: std::io::Error },
}

pub type Result<T> = std::result::Result<T, ProcessError>;
