use std::io;

use tracing::debug;

use crate::error::{ProcessError, Result};
use crate::launcher::ChildHandle;
use crate::outcome::TerminationOutcome;
use crate::signal::signal_name;

/// Block until the child terminates and classify how it ended.
///
/// Interrupted waits are retried.
pub fn reap(child: ChildHandle) -> Result<TerminationOutcome> {
    let pid = child.raw_pid();
    let mut status: libc::c_int = 0;

    loop {
        // SAFETY: `status` is a valid writable int and `pid` is our own child,
        // which has not been reaped yet because `ChildHandle` is consumed here.
        let rc = unsafe { libc::waitpid(pid, &mut status, 0) };
        if rc != -1 {
            break;
        }
        let err = io::Error::last_os_error();
        if err.kind() != io::ErrorKind::Interrupted {
            return Err(ProcessError::Wait {
                pid: child.pid(),
                source: err,
            });
        }
    }

    let outcome = classify(child.pid(), status);
    debug!(pid, status, %outcome, "reaped child");
    Ok(outcome)
}

/// Interpret a raw `waitpid` status word.
pub fn classify(pid: u32, status: libc::c_int) -> TerminationOutcome {
    if libc::WIFEXITED(status) {
        TerminationOutcome::Exited {
            code: libc::WEXITSTATUS(status),
        }
    } else if libc::WIFSIGNALED(status) {
        let signal = libc::WTERMSIG(status);
        TerminationOutcome::Signaled {
            signal,
            name: signal_name(signal),
        }
    } else {
        TerminationOutcome::Unrecognized {
            raw_status: status,
            pid,
        }
    }
}
