//! Stdout/stderr multiplexing for hlerr.
//!
//! This is the core of hlerr. Bytes from the child's two pipes are read one
//! at a time, in arrival order, and rendered into a single stream:
//! - stderr bytes are written immediately inside a red highlight span
//! - stdout bytes are line-buffered and written unmarked
//! - highlight begin/end markers are always balanced

#[cfg(unix)]
pub mod multiplexer;

pub mod error;
pub mod renderer;

pub use error::{MuxError, Result};
#[cfg(unix)]
pub use multiplexer::{Multiplexer, MuxStats};
pub use renderer::{
    OutputMode, OutputRenderer, LINE_CAPACITY, STDERR_BEGIN, STDERR_END, SUMMARY_BEGIN,
};
