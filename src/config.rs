//! Checked limits applied to every input line.

/// Upper bounds on input size and variable expansion.
///
/// The defaults match the fixed buffers of the classic C shell this
/// interpreter descends from: 1024 bytes per line and 128 arguments per stage.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Limits {
    /// Maximum length of an input line, and of a stage after expansion.
    pub max_line_len: usize,
    /// Maximum number of arguments (including the program name) in one stage.
    pub max_args: usize,
    /// Maximum number of `$name` substitutions performed on one stage.
    pub max_expansions: usize,
}

impl Default for Limits {
    fn default() -> Self {
        Self {
            max_line_len: 1024,
            max_args: 128,
            max_expansions: 128,
        }
    }
}
