mod exit;
mod logging;
mod run;

use std::ffi::OsString;

use clap::Parser;

use crate::logging::{init_logging, LogFormat, LogLevel};

#[derive(Parser, Debug)]
#[command(
    name = "hlerr",
    version,
    about = "Run a command and show its stderr highlighted inline with its stdout"
)]
struct Cli {
    /// Log output format (stderr).
    #[arg(long, value_name = "FORMAT", default_value = "text")]
    log_format: LogFormat,

    /// Minimum log level (stderr).
    #[arg(long, value_name = "LEVEL", default_value = "warn")]
    log_level: LogLevel,

    /// Command to run, followed by its arguments.
    #[arg(
        value_name = "COMMAND",
        required = true,
        num_args = 1..,
        trailing_var_arg = true,
        allow_hyphen_values = true
    )]
    command: Vec<OsString>,
}

fn main() {
    let cli = Cli::parse();
    init_logging(cli.log_format, cli.log_level);

    match run::run(&cli.command) {
        Ok(code) => std::process::exit(code),
        Err(err) => {
            eprintln!("error: {err}");
            std::process::exit(err.code);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parses_command_and_arguments() {
        let cli = Cli::try_parse_from(["hlerr", "ls", "-la", "/tmp"])
            .expect("command args should parse");

        assert_eq!(cli.command, vec!["ls", "-la", "/tmp"]);
        assert_eq!(cli.log_level, LogLevel::Warn);
    }

    #[test]
    fn options_after_the_command_belong_to_it() {
        let cli = Cli::try_parse_from([
            "hlerr",
            "--log-level",
            "debug",
            "make",
            "--log-level",
            "error",
        ])
        .expect("args should parse");

        assert_eq!(cli.log_level, LogLevel::Debug);
        assert_eq!(cli.command, vec!["make", "--log-level", "error"]);
    }

    #[test]
    fn rejects_missing_command() {
        let err = Cli::try_parse_from(["hlerr"]).expect_err("missing command should fail");
        assert_eq!(err.kind(), clap::error::ErrorKind::MissingRequiredArgument);
        assert!(err.use_stderr());
        assert_eq!(err.exit_code(), exit::USAGE);
    }

    #[test]
    fn double_dash_separates_the_command() {
        let cli = Cli::try_parse_from(["hlerr", "--", "--weird-name", "x"])
            .expect("args should parse");
        assert_eq!(cli.command, vec!["--weird-name", "x"]);
    }

    #[test]
    fn help_is_not_a_usage_error() {
        let err = Cli::try_parse_from(["hlerr", "--help"]).expect_err("help short-circuits");
        assert_eq!(err.kind(), clap::error::ErrorKind::DisplayHelp);
        assert_eq!(err.exit_code(), exit::SUCCESS);
    }
}
