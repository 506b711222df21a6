use crate::env::Environment;
use anyhow::Result;
use std::io::{Read, Write};
use std::process::{Child, Stdio};

/// Conventional process exit code type used by this crate.
///
/// A value of 0 indicates success; any non-zero value indicates failure.
pub type ExitCode = i32;

/// Abstraction over a readable input stream that can also be converted into
/// a [`Stdio`] handle for spawning external processes.
///
/// Implementors wrap the interpreter's standard input, the read end of a
/// pipeline pipe or a redirection file. A blanket implementation exists for
/// any type that implements `Read` and `Into<Stdio>`.
pub trait Stdin: Read {
    /// Convert this input into a [`Stdio`] handle suitable for `std::process::Command`.
    fn stdio(self: Box<Self>) -> Stdio;
}

impl<T: Read + Into<Stdio>> Stdin for T {
    fn stdio(self: Box<Self>) -> Stdio {
        (*self).into()
    }
}

/// Abstraction over a writable output stream that can also be converted into
/// a [`Stdio`] handle for spawning external processes.
///
/// A blanket implementation exists for any type that implements `Write` and `Into<Stdio>`.
pub trait Stdout: Write {
    /// Convert this output into a [`Stdio`] handle suitable for `std::process::Command`.
    fn stdio(self: Box<Self>) -> Stdio;
}

impl<T: Write + Into<Stdio>> Stdout for T {
    fn stdio(self: Box<Self>) -> Stdio {
        (*self).into()
    }
}

/// What became of a started command.
#[derive(Debug)]
pub enum Outcome {
    /// Ran to completion in-process.
    Finished(ExitCode),
    /// A child process was spawned; the caller decides whether to wait for it.
    Running(Child),
}

/// Object-safe trait for any command that can be started by the shell.
///
/// Implemented by built-ins via a blanket impl and by external commands.
/// The streams are consumed: once `start` returns, the caller holds no copy
/// of them, so pipe ends handed to a child are closed in the interpreter.
pub trait ExecutableCommand {
    /// Starts the command. Diagnostics go to `stderr`.
    fn start(
        self: Box<Self>,
        stdin: Box<dyn Stdin>,
        stdout: Box<dyn Stdout>,
        stderr: &mut dyn Write,
        env: &mut Environment,
    ) -> Result<Outcome>;
}

/// Factory that tries to create a command from a name and its arguments.
///
/// Returns `None` when the factory doesn't recognize the `name`.
pub trait CommandFactory {
    /// Attempt to create a command instance for the provided name and arguments.
    fn try_create(
        &self,
        env: &Environment,
        name: &str,
        args: &[&str],
    ) -> Option<Box<dyn ExecutableCommand>>;
}
