//! Error types for the interpreter.

use crate::command::ExitCode;
use std::io;
use std::path::PathBuf;
use thiserror::Error;

/// Result type alias for interpreter operations.
pub type ShellResult<T> = Result<T, ShellError>;

/// Everything that can go wrong while running one input line.
///
/// None of these are fatal to the interpreter: the failing stage is reported
/// on the error stream and the loop carries on with the next line.
#[derive(Error, Debug)]
pub enum ShellError {
    /// A built-in was called with the wrong number of arguments.
    #[error("{0}")]
    Usage(String),

    /// A redirection target or directory could not be used.
    #[error("{}: {source}", .path.display())]
    Resource {
        path: PathBuf,
        #[source]
        source: io::Error,
    },

    /// The program could not be found in the search path.
    #[error("{0}: command not found")]
    CommandNotFound(String),

    /// The program was found but could not be started.
    #[error("{program}: {source}")]
    Launch {
        program: String,
        #[source]
        source: io::Error,
    },

    /// Variable substitution did not reach a fixed point within the limits.
    #[error("expansion overflow: more than {limit} {what}")]
    ExpansionOverflow { limit: usize, what: &'static str },

    /// The input line is longer than the configured maximum.
    #[error("line too long: {len} bytes (max {max})")]
    LineTooLong { len: usize, max: usize },

    /// A stage has more arguments than the configured maximum.
    #[error("too many arguments: {count} (max {max})")]
    TooManyArguments { count: usize, max: usize },

    /// A `<` or `>` marker with nothing after it.
    #[error("missing file name after `{0}`")]
    MissingRedirectTarget(char),

    #[error(transparent)]
    Io(#[from] io::Error),

    #[error("{0:#}")]
    Other(anyhow::Error),
}

impl ShellError {
    /// Status reported for a stage that failed with this error.
    pub fn exit_code(&self) -> ExitCode {
        match self {
            ShellError::Usage(_) => 2,
            ShellError::CommandNotFound(_) => 127,
            ShellError::Launch { .. } => 126,
            _ => 1,
        }
    }
}

impl From<anyhow::Error> for ShellError {
    fn from(err: anyhow::Error) -> Self {
        match err.downcast::<ShellError>() {
            Ok(shell_err) => shell_err,
            Err(err) => ShellError::Other(err),
        }
    }
}
