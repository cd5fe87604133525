use std::ffi::OsString;

use crate::exit::CliResult;
#[cfg(unix)]
use crate::exit::{mux_error, process_error, CliError, FAILURE, USAGE};

/// Run `command`, stream its output, and return the exit code hlerr should use.
///
/// A multiplexing failure still reaps and summarizes the child before it is
/// reported; the run then fails even if the child itself succeeded.
#[cfg(unix)]
pub fn run(command: &[OsString]) -> CliResult<i32> {
    use hlerr_mux::{Multiplexer, OutputRenderer};
    use hlerr_process::{launch, reap, Launched};
    use tracing::{debug, warn};

    let (program, args) = command
        .split_first()
        .ok_or_else(|| CliError::new(USAGE, "missing command"))?;

    let Launched {
        child,
        stdout,
        stderr,
    } = launch(program, args).map_err(|err| {
        process_error(&format!("launch {}", program.to_string_lossy()), err)
    })?;
    let pid = child.pid();

    let mut renderer = OutputRenderer::new(std::io::stdout().lock());
    let drained = Multiplexer::new(stdout, stderr).run(&mut renderer);
    if let Err(err) = &drained {
        warn!(pid, error = %err, "output multiplexing aborted");
    }

    let outcome = reap(child).map_err(|err| process_error("reap", err))?;
    debug!(pid, %outcome, "child finished");
    renderer
        .render_summary(&outcome)
        .map_err(|err| mux_error("write summary", err))?;

    drained.map_err(|err| mux_error("multiplex", err))?;
    Ok(outcome.exit_code().unwrap_or(FAILURE))
}

#[cfg(not(unix))]
pub fn run(_command: &[OsString]) -> CliResult<i32> {
    Err(crate::exit::CliError::new(
        crate::exit::FAILURE,
        "hlerr needs fork/exec and poll, which this platform does not provide",
    ))
}
