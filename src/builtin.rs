use crate::command::{CommandFactory, ExecutableCommand, ExitCode, Outcome, Stdin, Stdout};
use crate::env::Environment;
use crate::error::ShellError;
use crate::interpreter::Factory;
use anyhow::Result;
use argh::{EarlyExit, FromArgs};
use std::env;
use std::fs;
use std::io::{Read, Write};
use std::path::PathBuf;

/// Built-in commands known to the shell at compile time.
///
/// Builtins are parsed using the [`argh`] crate (`FromArgs`), which enforces
/// their exact arity, and run in the interpreter's own process so that their
/// effects on the working directory and the variable store persist.
pub(crate) trait BuiltinCommand: Sized + FromArgs {
    /// Canonical name of the command, e.g. "cd" or "set".
    fn name() -> &'static str;

    /// One-line usage shown on an arity mismatch.
    fn usage() -> &'static str;

    /// Executes the command using provided IO streams and environment.
    ///
    /// Return value should follow shell conventions: 0 for success, non-zero for error.
    fn execute(
        self,
        stdin: &mut dyn Read,
        stdout: &mut dyn Write,
        env: &mut Environment,
    ) -> Result<ExitCode>;
}

impl<T: BuiltinCommand> ExecutableCommand for T {
    fn start(
        self: Box<Self>,
        mut stdin: Box<dyn Stdin>,
        mut stdout: Box<dyn Stdout>,
        stderr: &mut dyn Write,
        env: &mut Environment,
    ) -> Result<Outcome> {
        let code = match T::execute(*self, &mut stdin, &mut stdout, env) {
            Ok(code) => code,
            Err(e) => {
                writeln!(stderr, "xsh: {e}")?;
                1
            }
        };
        stdout.flush()?;
        Ok(Outcome::Finished(code))
    }
}

/// Stands in for a builtin whose arguments did not parse.
struct InvalidArgs {
    name: &'static str,
    output: String,
    usage: &'static str,
}

impl ExecutableCommand for InvalidArgs {
    fn start(
        self: Box<Self>,
        _stdin: Box<dyn Stdin>,
        _stdout: Box<dyn Stdout>,
        stderr: &mut dyn Write,
        _env: &mut Environment,
    ) -> Result<Outcome> {
        let err = ShellError::Usage(format!("usage: {}", self.usage));
        tracing::debug!(builtin = self.name, output = %self.output.trim_end(), "rejected arguments");
        writeln!(stderr, "xsh: {}: {}", self.name, self.output.trim_end())?;
        writeln!(stderr, "{err}")?;
        Ok(Outcome::Finished(err.exit_code()))
    }
}

impl<T: BuiltinCommand + 'static> CommandFactory for Factory<T> {
    fn try_create(
        &self,
        _env: &Environment,
        name: &str,
        args: &[&str],
    ) -> Option<Box<dyn ExecutableCommand>> {
        if name != T::name() {
            return None;
        }
        // Operands are never options: `set X -1` must bind "-1".
        let operands: Vec<&str> = std::iter::once("--").chain(args.iter().copied()).collect();
        Some(match T::from_args(&[name], &operands) {
            Ok(cmd) => Box::new(cmd),
            Err(EarlyExit { output, .. }) => Box::new(InvalidArgs {
                name: T::name(),
                output,
                usage: T::usage(),
            }),
        })
    }
}

#[derive(FromArgs)]
/// Print the current working directory to standard output.
pub struct Pwd {}

impl BuiltinCommand for Pwd {
    fn name() -> &'static str {
        "pwd"
    }

    fn usage() -> &'static str {
        "pwd"
    }

    fn execute(
        self,
        _stdin: &mut dyn Read,
        stdout: &mut dyn Write,
        env: &mut Environment,
    ) -> Result<ExitCode> {
        writeln!(stdout, "{}", env.current_dir.to_string_lossy())?;
        Ok(0)
    }
}

#[derive(FromArgs)]
/// Change the current working directory.
pub struct Cd {
    #[argh(positional)]
    /// directory to switch to; absolute or relative to the current directory.
    pub target: String,
}

impl BuiltinCommand for Cd {
    fn name() -> &'static str {
        "cd"
    }

    fn usage() -> &'static str {
        "cd PATH"
    }

    fn execute(
        self,
        _stdin: &mut dyn Read,
        _stdout: &mut dyn Write,
        env: &mut Environment,
    ) -> Result<ExitCode> {
        let target = PathBuf::from(&self.target);
        let new_dir = if target.is_absolute() {
            target
        } else {
            env.current_dir.join(target)
        };

        let canonical = fs::canonicalize(&new_dir).map_err(|source| ShellError::Resource {
            path: new_dir.clone(),
            source,
        })?;
        env::set_current_dir(&canonical).map_err(|source| ShellError::Resource {
            path: canonical.clone(),
            source,
        })?;
        env.current_dir = canonical;
        Ok(0)
    }
}

#[derive(FromArgs)]
/// Bind a shell variable.
pub struct Set {
    #[argh(positional)]
    /// variable name.
    pub name: String,

    #[argh(positional)]
    /// value to bind.
    pub value: String,
}

impl BuiltinCommand for Set {
    fn name() -> &'static str {
        "set"
    }

    fn usage() -> &'static str {
        "set NAME VALUE"
    }

    fn execute(
        self,
        _stdin: &mut dyn Read,
        _stdout: &mut dyn Write,
        env: &mut Environment,
    ) -> Result<ExitCode> {
        env.vars.set(self.name, self.value);
        Ok(0)
    }
}

#[derive(FromArgs)]
/// Remove a shell variable.
pub struct Unset {
    #[argh(positional)]
    /// variable name.
    pub name: String,
}

impl BuiltinCommand for Unset {
    fn name() -> &'static str {
        "unset"
    }

    fn usage() -> &'static str {
        "unset NAME"
    }

    fn execute(
        self,
        _stdin: &mut dyn Read,
        _stdout: &mut dyn Write,
        env: &mut Environment,
    ) -> Result<ExitCode> {
        env.vars.unset(&self.name);
        Ok(0)
    }
}
