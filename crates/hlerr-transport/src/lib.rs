//! Pipe channels between hlerr and the command it runs.
//!
//! Provides the parent-side plumbing for one child process:
//! - A close-on-exec pipe per captured stream, tagged with its [`Origin`]
//! - Blocking single-byte reads that distinguish a real byte from end-of-stream
//! - A readiness wait over several channels at once (`poll(2)`)
//!
//! This is the lowest layer of hlerr. The multiplexer and launcher build on
//! the [`Channel`] and [`PipeWriter`] types provided here.

pub mod error;
pub mod origin;

#[cfg(unix)]
pub mod pipe;
#[cfg(unix)]
pub mod poll;

pub use error::{Result, TransportError};
pub use origin::Origin;

#[cfg(unix)]
pub use pipe::{pipe, Channel, PipeWriter};
#[cfg(unix)]
pub use poll::{wait_readable, Readiness};
