//! Child process lifecycle for hlerr.
//!
//! Launches the single command of a run with its stdout and stderr bound to
//! two pipes, then reaps it and classifies how it ended:
//! - [`launch`] forks, rebinds fds 1 and 2, and execs the command
//! - [`reap`] waits for the child and returns a [`TerminationOutcome`]
//! - [`signal_name`] maps signal numbers to their `SIG*` names

pub mod error;
pub mod outcome;

#[cfg(unix)]
pub mod launcher;
#[cfg(unix)]
pub mod reaper;
#[cfg(unix)]
pub mod signal;

pub use error::{ProcessError, Result};
pub use outcome::TerminationOutcome;

#[cfg(unix)]
pub use launcher::{launch, ChildHandle, Launched, CHILD_SETUP_FAILURE};
#[cfg(unix)]
pub use reaper::{classify, reap};
#[cfg(unix)]
pub use signal::signal_name;
