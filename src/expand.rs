//! `$name` substitution over a single stage of an input line.

use crate::config::Limits;
use crate::env::VariableStore;
use crate::error::{ShellError, ShellResult};
use regex::Regex;
use std::sync::LazyLock;

/// A `$` followed by the run of non-whitespace characters naming the variable.
static VARIABLE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"\$(\S*)").expect("variable pattern is valid"));

/// Substitute every `$name` in `text` with its value from `vars`.
///
/// Unbound names are deleted together with their `$`. After each substitution
/// the scan restarts from the beginning, so a value that itself contains
/// `$other` is expanded as well. The loop is bounded by
/// [`Limits::max_expansions`] substitutions and by [`Limits::max_line_len`]
/// bytes of output; crossing either bound yields
/// [`ShellError::ExpansionOverflow`].
///
/// Text without a `$` is returned unchanged.
pub fn expand(text: &str, vars: &VariableStore, limits: &Limits) -> ShellResult<String> {
    let mut current = text.to_owned();
    let mut substitutions = 0;

    loop {
        let Some(caps) = VARIABLE.captures(&current) else {
            return Ok(current);
        };
        let (Some(whole), Some(name)) = (caps.get(0), caps.get(1)) else {
            return Ok(current);
        };

        if substitutions == limits.max_expansions {
            return Err(ShellError::ExpansionOverflow {
                limit: limits.max_expansions,
                what: "substitutions",
            });
        }

        let value = vars.get(name.as_str()).unwrap_or("");
        let mut next = String::with_capacity(current.len() - whole.len() + value.len());
        next.push_str(&current[..whole.start()]);
        next.push_str(value);
        next.push_str(&current[whole.end()..]);

        if next.len() > limits.max_line_len {
            return Err(ShellError::ExpansionOverflow {
                limit: limits.max_line_len,
                what: "bytes",
            });
        }

        substitutions += 1;
        current = next;
    }
}
