use std::collections::HashMap;
use std::env as stdenv;
use std::path::PathBuf;

/// Shell variables defined with `set` and removed with `unset`.
///
/// The store is private to the interpreter: it is never exported into the
/// environment of spawned programs, and it does not fall back to the process
/// environment on lookup.
#[derive(Debug, Clone, Default)]
pub struct VariableStore {
    vars: HashMap<String, String>,
}

impl VariableStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Value bound to `name`, if any.
    pub fn get(&self, name: &str) -> Option<&str> {
        self.vars.get(name).map(String::as_str)
    }

    /// Bind `name` to `value`, overwriting a previous binding.
    pub fn set(&mut self, name: impl Into<String>, value: impl Into<String>) {
        self.vars.insert(name.into(), value.into());
    }

    /// Remove `name`. Returns the old value; removing an unbound name is a no-op.
    pub fn unset(&mut self, name: &str) -> Option<String> {
        self.vars.remove(name)
    }

    pub fn len(&self) -> usize {
        self.vars.len()
    }

    pub fn is_empty(&self) -> bool {
        self.vars.is_empty()
    }
}

/// Mutable state shared by the built-ins and the launcher.
///
/// `current_dir` mirrors the process working directory; `cd` updates both so
/// that spawned programs and relative redirection paths agree.
#[derive(Debug, Clone)]
pub struct Environment {
    /// Shell variables visible to `$name` expansion.
    pub vars: VariableStore,
    /// The working directory for command execution.
    pub current_dir: PathBuf,
}

impl Environment {
    /// Capture the current working directory with an empty variable store.
    pub fn new() -> Self {
        let current_dir = stdenv::current_dir().unwrap_or_else(|_| PathBuf::from("."));
        Self {
            vars: VariableStore::new(),
            current_dir,
        }
    }
}

impl Default for Environment {
    fn default() -> Self {
        Self::new()
    }
}
