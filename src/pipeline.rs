//! Splitting a line into stages and threading standard streams through them.

use crate::command::{ExitCode, Stdin, Stdout};
use crate::error::ShellResult;
use crate::io_adapters::InheritedStdin;
use std::io;
use tracing::debug;

/// Where a stage sits in its pipeline.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Placement {
    /// The only stage on the line. Only here may a stage run in the background.
    Alone,
    /// One of several connected stages.
    Connected,
}

/// Something that can run one stage with the streams it is handed.
///
/// The runner owns the streams once called. It must drop them (closing any
/// pipe end they hold) before returning, and it must not return before a
/// foreground stage has finished.
pub trait StageRunner {
    /// Runs one stage. Failures are reported by the runner and folded into
    /// the returned status.
    fn run_stage(
        &mut self,
        text: &str,
        stdin: Box<dyn Stdin>,
        stdout: Box<dyn Stdout>,
        placement: Placement,
    ) -> ExitCode;

    /// Input of the first stage.
    fn terminal_stdin(&mut self) -> Box<dyn Stdin> {
        Box::new(InheritedStdin::new())
    }

    /// Output of the last stage.
    fn terminal_stdout(&mut self) -> Box<dyn Stdout> {
        Box::new(io::stdout())
    }
}

/// Split a line on `|` into stage texts, left to right.
///
/// `|` is always a separator. Segments that are empty or blank are dropped,
/// so `a || b` is the two-stage pipeline `a | b`.
pub fn split_stages(line: &str) -> Vec<&str> {
    line.split('|')
        .filter(|stage| !stage.trim().is_empty())
        .collect()
}

/// Run every stage of `line` and return the status of the last one.
///
/// Stages run strictly one after the other: stage *i* is finished before
/// stage *i + 1* is spawned. Between two stages the orchestrator creates one
/// anonymous pipe, passes its write end to stage *i* and keeps only the read
/// end, which becomes the input of stage *i + 1*. At any time there is a
/// single live "current input" in the interpreter.
///
/// Stage *i*'s output has to fit in the pipe buffer, because nothing drains
/// the pipe until stage *i + 1* starts.
pub fn run_pipeline<R: StageRunner + ?Sized>(runner: &mut R, line: &str) -> ShellResult<ExitCode> {
    let stages = split_stages(line);
    debug!(stages = stages.len(), "running pipeline");

    match stages.as_slice() {
        [] => Ok(0),
        [single] => {
            let stdin = runner.terminal_stdin();
            let stdout = runner.terminal_stdout();
            Ok(runner.run_stage(single, stdin, stdout, Placement::Alone))
        }
        [init @ .., last] => {
            let mut input = runner.terminal_stdin();
            for stage in init {
                let (reader, writer) = io::pipe()?;
                let status = runner.run_stage(stage, input, Box::new(writer), Placement::Connected);
                debug!(stage, status, "stage finished");
                input = Box::new(reader);
            }
            let stdout = runner.terminal_stdout();
            Ok(runner.run_stage(last, input, stdout, Placement::Connected))
        }
    }
}
