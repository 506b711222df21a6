use crate::command::{CommandFactory, ExitCode, Outcome, Stdin, Stdout};
use crate::config::Limits;
use crate::env::Environment;
use crate::error::{ShellError, ShellResult};
use crate::expand::expand;
use crate::external::{self, bind_streams, wait_for};
use crate::parser::parse_stage;
use crate::pipeline::{Placement, StageRunner, run_pipeline};
use rustyline::DefaultEditor;
use rustyline::error::ReadlineError;
use std::io::{self, BufRead, Write};
use std::process::Child;
use tracing::{debug, warn};

/// Factory allows creating instances of ExecutableCommand.
///
/// Only supports commands defined in this crate: the built-ins and ExternalCommand.
pub(crate) struct Factory<T> {
    _phantom: std::marker::PhantomData<T>,
}

impl<T> Default for Factory<T> {
    fn default() -> Self {
        Self {
            _phantom: std::marker::PhantomData,
        }
    }
}

/// `exit` and `quit` end the interactive loop.
pub fn is_exit_command(line: &str) -> bool {
    matches!(line.trim(), "exit" | "quit")
}

/// A line-oriented command interpreter.
///
/// Each line is split into pipeline stages; every stage is expanded, parsed
/// and handed to the first [`CommandFactory`] that recognises its name.
/// See [`Default`] for the factories included out of the box.
///
/// Example
/// ```
/// use xsh::Interpreter;
/// let mut sh = Interpreter::default();
/// assert_eq!(sh.execute_line("set GREETING hello"), 0);
/// assert_eq!(sh.env().vars.get("GREETING"), Some("hello"));
/// ```
pub struct Interpreter {
    env: Environment,
    commands: Vec<Box<dyn CommandFactory>>,
    limits: Limits,
    stderr: Box<dyn Write>,
    background: Vec<Child>,
    last_status: ExitCode,
}

impl Interpreter {
    /// Create a new interpreter with a custom set of command factories.
    pub fn new(commands: Vec<Box<dyn CommandFactory>>) -> Self {
        Self {
            env: Environment::new(),
            commands,
            limits: Limits::default(),
            stderr: Box::new(io::stderr()),
            background: Vec::new(),
            last_status: 0,
        }
    }

    pub fn with_limits(mut self, limits: Limits) -> Self {
        self.limits = limits;
        self
    }

    /// Send diagnostics somewhere other than the process' standard error.
    pub fn with_error_stream(mut self, stderr: impl Write + 'static) -> Self {
        self.stderr = Box::new(stderr);
        self
    }

    pub fn env(&self) -> &Environment {
        &self.env
    }

    pub fn env_mut(&mut self) -> &mut Environment {
        &mut self.env
    }

    /// Status of the last line run: the status of its last stage.
    pub fn last_status(&self) -> ExitCode {
        self.last_status
    }

    /// Number of background children not reaped yet.
    pub fn background_jobs(&self) -> usize {
        self.background.len()
    }

    /// Run one input line and return its status.
    ///
    /// Finished background children are reaped first. Errors are reported on
    /// the error stream; they never escape this call.
    pub fn execute_line(&mut self, line: &str) -> ExitCode {
        self.reap_background();
        let status = match self.try_execute_line(line) {
            Ok(status) => status,
            Err(e) => self.report(&e),
        };
        self.last_status = status;
        status
    }

    fn try_execute_line(&mut self, line: &str) -> ShellResult<ExitCode> {
        if line.len() > self.limits.max_line_len {
            return Err(ShellError::LineTooLong {
                len: line.len(),
                max: self.limits.max_line_len,
            });
        }
        run_pipeline(self, line)
    }

    fn try_run_stage(
        &mut self,
        text: &str,
        stdin: Box<dyn Stdin>,
        stdout: Box<dyn Stdout>,
        placement: Placement,
    ) -> ShellResult<ExitCode> {
        let expanded = expand(text, &self.env.vars, &self.limits)?;
        let parsed = parse_stage(&expanded, &self.limits)?;
        debug!(?parsed, "parsed stage");

        let Some((name, args)) = parsed.argv.split_first() else {
            return Ok(0);
        };
        let (stdin, stdout) = bind_streams(&parsed, stdin, stdout, &self.env)?;

        let args: Vec<&str> = args.iter().map(String::as_str).collect();
        let command = self
            .commands
            .iter()
            .find_map(|factory| factory.try_create(&self.env, name, &args))
            .ok_or_else(|| ShellError::CommandNotFound(name.clone()))?;

        match command.start(stdin, stdout, &mut *self.stderr, &mut self.env)? {
            Outcome::Finished(code) => Ok(code),
            Outcome::Running(child) if parsed.background && placement == Placement::Alone => {
                debug!(pid = child.id(), "left running in background");
                self.background.push(child);
                Ok(0)
            }
            Outcome::Running(child) => {
                if parsed.background {
                    debug!("`&` ignored inside a pipeline");
                }
                wait_for(child)
            }
        }
    }

    /// Collect background children that have exited, without blocking.
    fn reap_background(&mut self) {
        self.background.retain_mut(|child| match child.try_wait() {
            Ok(Some(status)) => {
                debug!(pid = child.id(), code = external::exit_code(status), "background job done");
                false
            }
            Ok(None) => true,
            Err(e) => {
                warn!(pid = child.id(), error = %e, "cannot poll background job");
                false
            }
        });
    }

    fn report(&mut self, err: &ShellError) -> ExitCode {
        debug!(error = %err, "stage failed");
        if let Err(e) = writeln!(self.stderr, "xsh: {err}") {
            warn!(error = %e, "cannot write to error stream");
        }
        err.exit_code()
    }

    /// Interactive read-eval loop on the terminal.
    ///
    /// Ends on `exit`, `quit` or end of input; Ctrl-C discards the current line.
    pub fn repl(&mut self, prompt: &str) -> rustyline::Result<()> {
        let mut rl = DefaultEditor::new()?;

        loop {
            match rl.readline(prompt) {
                Ok(line) => {
                    if is_exit_command(&line) {
                        break;
                    }
                    if !line.trim().is_empty() {
                        rl.add_history_entry(line.as_str())?;
                    }
                    self.execute_line(&line);
                }
                Err(ReadlineError::Interrupted) => continue,
                Err(ReadlineError::Eof) => break,
                Err(err) => return Err(err),
            }
        }

        Ok(())
    }

    /// Non-interactive loop: one command per line of `input`, no prompt.
    pub fn run_script(&mut self, input: impl BufRead) -> io::Result<()> {
        for line in input.lines() {
            let line = line?;
            if is_exit_command(&line) {
                break;
            }
            self.execute_line(&line);
        }
        Ok(())
    }
}

impl StageRunner for Interpreter {
    fn run_stage(
        &mut self,
        text: &str,
        stdin: Box<dyn Stdin>,
        stdout: Box<dyn Stdout>,
        placement: Placement,
    ) -> ExitCode {
        match self.try_run_stage(text, stdin, stdout, placement) {
            Ok(code) => code,
            Err(e) => self.report(&e),
        }
    }
}

impl Default for Interpreter {
    /// Create an interpreter with the default set of commands:
    /// - built-ins: `cd`, `pwd`, `set`, `unset`
    /// - external command launcher
    fn default() -> Self {
        use crate::builtin::*;
        use crate::external::ExternalCommand;
        Self::new(vec![
            Box::new(Factory::<Cd>::default()),
            Box::new(Factory::<Pwd>::default()),
            Box::new(Factory::<Set>::default()),
            Box::new(Factory::<Unset>::default()),
            Box::new(Factory::<ExternalCommand>::default()),
        ])
    }
}
