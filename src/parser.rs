//! Turns one expanded pipeline stage into an argument vector plus its
//! redirection and background annotations.

use crate::config::Limits;
use crate::error::{ShellError, ShellResult};
use std::path::PathBuf;

/// A stage after parsing.
///
/// Redirection targets and the background marker are annotations: they never
/// show up in `argv`.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ParsedCommand {
    /// Program or built-in name followed by its arguments. Empty for a blank stage.
    pub argv: Vec<String>,
    /// File bound to standard input (`< path`).
    pub input: Option<PathBuf>,
    /// File bound to standard output (`> path`), created or truncated.
    pub output: Option<PathBuf>,
    /// `&` was present: the stage is not waited for.
    pub background: bool,
}

impl ParsedCommand {
    pub fn is_empty(&self) -> bool {
        self.argv.is_empty()
    }
}

/// Parse one stage of an input line.
///
/// Markers are found by first occurrence only and cannot be escaped. Each of
/// the first `<`, `>` and `&` ends whatever region it falls in:
///
/// * everything before the earliest marker is split on spaces into `argv`;
/// * the first `<` starts the input path, which runs to the next marker or
///   the end of the stage;
/// * the first `>` starts the output path, bounded the same way;
/// * the first `&` sets [`ParsedCommand::background`]. Text between it and
///   the next marker is dropped.
///
/// Paths are trimmed; a redirection marker with nothing after it is an error.
pub fn parse_stage(text: &str, limits: &Limits) -> ShellResult<ParsedCommand> {
    let input_at = text.find('<');
    let output_at = text.find('>');
    let background_at = text.find('&');
    let markers = [input_at, output_at, background_at];

    let input = input_at
        .map(|at| redirect_target(text, at, &markers, '<'))
        .transpose()?;
    let output = output_at
        .map(|at| redirect_target(text, at, &markers, '>'))
        .transpose()?;

    let command_end = markers
        .into_iter()
        .flatten()
        .min()
        .unwrap_or(text.len());

    let argv: Vec<String> = text[..command_end]
        .split(' ')
        .filter(|word| !word.is_empty())
        .map(str::to_owned)
        .collect();
    if argv.len() > limits.max_args {
        return Err(ShellError::TooManyArguments {
            count: argv.len(),
            max: limits.max_args,
        });
    }

    Ok(ParsedCommand {
        argv,
        input,
        output,
        background: background_at.is_some(),
    })
}

/// Path following the marker at `at`, ending at the nearest later marker.
fn redirect_target(
    text: &str,
    at: usize,
    markers: &[Option<usize>],
    marker: char,
) -> ShellResult<PathBuf> {
    let start = at + marker.len_utf8();
    let end = markers
        .iter()
        .flatten()
        .copied()
        .filter(|&other| other > at)
        .min()
        .unwrap_or(text.len());
    let path = text[start..end].trim();
    if path.is_empty() {
        return Err(ShellError::MissingRedirectTarget(marker));
    }
    Ok(PathBuf::from(path))
}

#[cfg(test)]
mod tests {
    use super::*;

    fn parse(text: &str) -> ParsedCommand {
        parse_stage(text, &Limits::default()).unwrap()
    }

    fn argv(cmd: &ParsedCommand) -> Vec<&str> {
        cmd.argv.iter().map(String::as_str).collect()
    }

    #[test]
    fn test_plain_command() {
        let cmd = parse("ls  -l   /tmp ");
        assert_eq!(argv(&cmd), ["ls", "-l", "/tmp"]);
        assert_eq!(cmd.input, None);
        assert_eq!(cmd.output, None);
        assert!(!cmd.background);
    }

    #[test]
    fn test_blank_stage_is_empty_not_error() {
        assert!(parse("").is_empty());
        assert!(parse("    ").is_empty());
    }

    #[test]
    fn test_output_redirection_is_not_an_argument() {
        let cmd = parse("prog arg1 arg2 > out.txt");
        assert_eq!(argv(&cmd), ["prog", "arg1", "arg2"]);
        assert_eq!(cmd.output, Some(PathBuf::from("out.txt")));
        assert_eq!(cmd.input, None);
    }

    #[test]
    fn test_input_redirection_without_spaces() {
        let cmd = parse("sort<data.txt");
        assert_eq!(argv(&cmd), ["sort"]);
        assert_eq!(cmd.input, Some(PathBuf::from("data.txt")));
    }

    #[test]
    fn test_both_redirections_in_either_order() {
        let a = parse("tr a b < in.txt > out.txt");
        let b = parse("tr a b > out.txt < in.txt");
        for cmd in [a, b] {
            assert_eq!(argv(&cmd), ["tr", "a", "b"]);
            assert_eq!(cmd.input, Some(PathBuf::from("in.txt")));
            assert_eq!(cmd.output, Some(PathBuf::from("out.txt")));
        }
    }

    #[test]
    fn test_background_marker() {
        let cmd = parse("sleep 10 &");
        assert_eq!(argv(&cmd), ["sleep", "10"]);
        assert!(cmd.background);
    }

    #[test]
    fn test_background_marker_after_redirection() {
        let cmd = parse("cat < in.txt &");
        assert_eq!(argv(&cmd), ["cat"]);
        assert_eq!(cmd.input, Some(PathBuf::from("in.txt")));
        assert!(cmd.background);
    }

    #[test]
    fn test_background_marker_ends_argv() {
        let cmd = parse("echo a & b");
        assert_eq!(argv(&cmd), ["echo", "a"]);
        assert!(cmd.background);
    }

    #[test]
    fn test_background_marker_ends_redirect_path() {
        let cmd = parse("cat > a&b");
        assert_eq!(argv(&cmd), ["cat"]);
        assert_eq!(cmd.output, Some(PathBuf::from("a")));
        assert!(cmd.background);

        let cmd = parse("cat < x&y > z");
        assert_eq!(cmd.input, Some(PathBuf::from("x")));
        assert_eq!(cmd.output, Some(PathBuf::from("z")));
        assert!(cmd.background);
    }

    #[test]
    fn test_only_first_output_marker_counts() {
        // no escaping: the second `>` stays in the path
        let cmd = parse("echo a > b>c");
        assert_eq!(argv(&cmd), ["echo", "a"]);
        assert_eq!(cmd.output, Some(PathBuf::from("b>c")));
    }

    #[test]
    fn test_missing_redirect_target() {
        let err = parse_stage("cat <", &Limits::default()).unwrap_err();
        assert!(matches!(err, ShellError::MissingRedirectTarget('<')));

        let err = parse_stage("cat >   ", &Limits::default()).unwrap_err();
        assert!(matches!(err, ShellError::MissingRedirectTarget('>')));
    }

    #[test]
    fn test_argument_limit_is_checked() {
        let limits = Limits {
            max_args: 3,
            ..Limits::default()
        };
        assert!(parse_stage("a b c", &limits).is_ok());
        let err = parse_stage("a b c d", &limits).unwrap_err();
        assert!(matches!(
            err,
            ShellError::TooManyArguments { count: 4, max: 3 }
        ));
    }
}
