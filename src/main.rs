use argh::FromArgs;
use std::io::{self, IsTerminal};
use tracing_subscriber::EnvFilter;
use xsh::{Interpreter, Limits, is_exit_command};

#[derive(FromArgs)]
/// A small line-oriented command interpreter with pipes, redirection and variables.
struct Options {
    #[argh(option, short = 'c')]
    /// run a single command line and exit with its status
    command: Option<String>,

    #[argh(option, default = "String::from(\"xsh# \")")]
    /// prompt shown before each interactive line
    prompt: String,

    #[argh(option, default = "String::from(\"warn\")")]
    /// log filter used when RUST_LOG is not set (e.g. "debug")
    log_level: String,

    #[argh(option, default = "Limits::default().max_line_len")]
    /// maximum length of a line, before and after variable expansion
    max_line: usize,

    #[argh(option, default = "Limits::default().max_args")]
    /// maximum number of arguments in one stage
    max_args: usize,

    #[argh(option, default = "Limits::default().max_expansions")]
    /// maximum number of variable substitutions in one stage
    max_expansions: usize,
}

fn init_tracing(level: &str) {
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(level)),
        )
        .with_writer(io::stderr)
        .with_target(false)
        .init();
}

fn main() -> anyhow::Result<()> {
    let options: Options = argh::from_env();
    init_tracing(&options.log_level);

    let limits = Limits {
        max_line_len: options.max_line,
        max_args: options.max_args,
        max_expansions: options.max_expansions,
    };
    let mut shell = Interpreter::default().with_limits(limits);

    if let Some(line) = options.command {
        if is_exit_command(&line) {
            return Ok(());
        }
        let status = shell.execute_line(&line);
        std::process::exit(status);
    }

    if io::stdin().is_terminal() {
        shell.repl(&options.prompt)?;
    } else {
        shell.run_script(io::stdin().lock())?;
    }
    std::process::exit(shell.last_status());
}
