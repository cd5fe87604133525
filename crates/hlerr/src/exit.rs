use std::fmt;

use hlerr_mux::MuxError;
use hlerr_process::ProcessError;

// Exit codes of hlerr itself. A child that exits normally passes its own
// code through instead.
#[allow(dead_code)]
pub const SUCCESS: i32 = 0;
pub const FAILURE: i32 = 1;
pub const USAGE: i32 = 2;

pub type CliResult<T> = Result<T, CliError>;

#[derive(Debug)]
pub struct CliError {
    pub code: i32,
    pub message: String,
}

impl CliError {
    pub fn new(code: i32, message: impl Into<String>) -> Self {
        Self {
            code,
            message: message.into(),
        }
    }
}

impl fmt::Display for CliError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.message)
    }
}

impl std::error::Error for CliError {}

pub fn process_error(context: &str, err: ProcessError) -> CliError {
    CliError::new(FAILURE, format!("{context}: {err}"))
}

pub fn mux_error(context: &str, err: MuxError) -> CliError {
    CliError::new(FAILURE, format!("{context}: {err}"))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn errors_name_the_failing_operation() {
        let err = process_error(
            "launch ls",
            ProcessError::Fork(std::io::Error::from_raw_os_error(11)),
        );
        assert_eq!(err.code, FAILURE);
        assert!(err.to_string().starts_with("launch ls: fork failed: "));

        let err = mux_error(
            "multiplex",
            MuxError::Output(std::io::Error::from(std::io::ErrorKind::BrokenPipe)),
        );
        assert_eq!(err.code, FAILURE);
        assert!(err.to_string().starts_with("multiplex: output write failed: "));
    }
}
