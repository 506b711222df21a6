//! xsh: a small line-oriented command interpreter.
//!
//! A line is split into `|`-separated stages. Each stage has its `$name`
//! variables substituted, is parsed into an argument vector with optional
//! `< in`, `> out` and `&` annotations, and then runs either as a built-in
//! (`cd`, `pwd`, `set`, `unset`) inside the interpreter or as a child process.
//!
//! The main entry point is [`Interpreter`]. The public modules expose the
//! individual steps so they can be used and tested on their own.

mod builtin;
pub mod command;
pub mod config;
pub mod env;
pub mod error;
pub mod expand;
mod external;
mod interpreter;
pub mod io_adapters;
pub mod parser;
pub mod pipeline;

pub use config::Limits;
pub use error::{ShellError, ShellResult};
pub use external::find_command_path;
/// Just a convenient re-export of the interactive command runner.
///
/// See [`Interpreter`] for the high-level API and examples.
pub use interpreter::{Interpreter, is_exit_command};
