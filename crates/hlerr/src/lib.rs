//! Run a command and show its stderr highlighted inline with its stdout.
//!
//! hlerr starts one child with its stdout and stderr on separate pipes, reads
//! both a byte at a time, and writes them to a single stream where stderr
//! spans are colored. When the child ends, a summary line reports its exit
//! status or terminating signal.
//!
//! # Crate Structure
//!
//! - [`transport`]: Pipe channels and readiness polling
//! - [`mux`]: Output renderer and stream multiplexer
//! - [`process`]: Child launch, reaping, and termination outcomes

/// Re-export transport types.
pub mod transport {
    pub use hlerr_transport::*;
}

/// Re-export multiplexer types.
pub mod mux {
    pub use hlerr_mux::*;
}

/// Re-export process types.
pub mod process {
    pub use hlerr_process::*;
}
