use std::fmt;

/// How the child process ended.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum TerminationOutcome {
    /// Normal exit with a status code (0-255).
    Exited { code: i32 },
    /// Terminated by a signal; `name` is `None` for signals outside the table.
    Signaled {
        signal: i32,
        name: Option<&'static str>,
    },
    /// `waitpid` returned a status that is neither of the above.
    Unrecognized { raw_status: i32, pid: u32 },
}

impl TerminationOutcome {
    /// The child's own exit code, if it exited normally.
    pub fn exit_code(&self) -> Option<i32> {
        match self {
            TerminationOutcome::Exited { code } => Some(*code),
            _ => None,
        }
    }

    pub fn success(&self) -> bool {
        self.exit_code() == Some(0)
    }
}

/// One-line summary, without color.
impl fmt::Display for TerminationOutcome {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            TerminationOutcome::Exited { code } => write!(f, "Exited with status {code}"),
            TerminationOutcome::Signaled {
                signal,
                name: Some(name),
            } => write!(f, "Killed by signal {signal} ({name})"),
            TerminationOutcome::Signaled { signal, name: None } => {
                write!(f, "Killed by signal {signal}")
            }
            TerminationOutcome::Unrecognized { raw_status, pid } => write!(
                f,
                "Unknown status {raw_status} returned from waitpid for pid {pid}"
            ),
        }
    }
}
