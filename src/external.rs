//! Launching programs that are not built-ins.

use crate::command::{CommandFactory, ExecutableCommand, ExitCode, Outcome, Stdin, Stdout};
use crate::env::Environment;
use crate::error::{ShellError, ShellResult};
use crate::interpreter::Factory;
use crate::parser::ParsedCommand;
use anyhow::Result;
use std::ffi::{OsStr, OsString};
use std::fs::{File, OpenOptions};
use std::io::Write;
use std::path::{Path, PathBuf};
use std::process::{Child, ExitStatus};
use tracing::debug;

/// Command that is not a builtin, resolved to an executable on disk.
pub struct ExternalCommand {
    /// Name as typed; becomes the child's argv[0].
    name: OsString,
    program: PathBuf,
    args: Vec<OsString>,
}

impl ExternalCommand {
    pub fn new(name: OsString, program: PathBuf, args: Vec<OsString>) -> Self {
        Self {
            name,
            program,
            args,
        }
    }
}

impl CommandFactory for Factory<ExternalCommand> {
    fn try_create(
        &self,
        env: &Environment,
        name: &str,
        args: &[&str],
    ) -> Option<Box<dyn ExecutableCommand>> {
        let search_paths = std::env::var_os("PATH").unwrap_or_default();
        let program = find_command_path(&search_paths, &env.current_dir, Path::new(name))?;
        Some(Box::new(ExternalCommand::new(
            OsString::from(name),
            program,
            args.iter().map(OsString::from).collect(),
        )))
    }
}

impl ExecutableCommand for ExternalCommand {
    /// Spawns the program and returns without waiting for it.
    fn start(
        self: Box<Self>,
        stdin: Box<dyn Stdin>,
        stdout: Box<dyn Stdout>,
        _stderr: &mut dyn Write,
        env: &mut Environment,
    ) -> Result<Outcome> {
        let mut command = std::process::Command::new(&self.program);
        #[cfg(unix)]
        {
            use std::os::unix::process::CommandExt;
            command.arg0(&self.name);
        }
        // `command` holds the parent's copy of each stream; it is dropped on
        // return, before the caller waits on the child.
        let child = command
            .args(&self.args)
            .stdin(stdin.stdio())
            .stdout(stdout.stdio())
            .current_dir(&env.current_dir)
            .spawn()
            .map_err(|source| ShellError::Launch {
                program: self.program.display().to_string(),
                source,
            })?;
        debug!(pid = child.id(), program = %self.program.display(), "spawned");
        Ok(Outcome::Running(child))
    }
}

/// Apply a stage's explicit redirections on top of the streams supplied by
/// the pipeline.
///
/// An input file replaces `stdin` and an output file (created or truncated,
/// mode 0644) replaces `stdout`; the replaced stream is dropped, which closes
/// any pipe end it held. Relative paths resolve against the shell's working
/// directory.
pub(crate) fn bind_streams(
    cmd: &ParsedCommand,
    stdin: Box<dyn Stdin>,
    stdout: Box<dyn Stdout>,
    env: &Environment,
) -> ShellResult<(Box<dyn Stdin>, Box<dyn Stdout>)> {
    let stdin: Box<dyn Stdin> = match &cmd.input {
        Some(path) => {
            let path = env.current_dir.join(path);
            let file = File::open(&path).map_err(|source| ShellError::Resource { path, source })?;
            Box::new(file)
        }
        None => stdin,
    };

    let stdout: Box<dyn Stdout> = match &cmd.output {
        Some(path) => {
            let path = env.current_dir.join(path);
            let mut options = OpenOptions::new();
            options.write(true).create(true).truncate(true);
            #[cfg(unix)]
            {
                use std::os::unix::fs::OpenOptionsExt;
                options.mode(0o644);
            }
            let file = options
                .open(&path)
                .map_err(|source| ShellError::Resource { path, source })?;
            Box::new(file)
        }
        None => stdout,
    };

    Ok((stdin, stdout))
}

/// Block until `child` exits and translate its status into an exit code.
pub(crate) fn wait_for(mut child: Child) -> ShellResult<ExitCode> {
    let pid = child.id();
    let status = child.wait()?;
    let code = exit_code(status);
    debug!(pid, code, "reaped");
    Ok(code)
}

pub(crate) fn exit_code(exit_status: ExitStatus) -> ExitCode {
    match exit_status.code() {
        Some(x) => x,
        None => terminated_by_signal(exit_status),
    }
}

#[cfg(unix)]
fn terminated_by_signal(exit_status: ExitStatus) -> i32 {
    use std::os::unix::process::ExitStatusExt;
    if let Some(signal) = ExitStatusExt::signal(&exit_status) {
        128 + signal
    } else if ExitStatusExt::core_dumped(&exit_status) {
        255
    } else {
        -1
    }
}

#[cfg(not(unix))]
fn terminated_by_signal(_exit_status: ExitStatus) -> i32 {
    -1
}

/// Resolve a command path the way a typical shell would.
///
/// Behavior:
/// - Absolute path: returns it if it names a file.
/// - Path with more than one component (`./foo`, `bin/sh`): resolved against `cwd`.
/// - Single component: search each directory in `search_paths` (PATH) and
///   return the first file found.
/// - Empty path: returns `None`.
pub fn find_command_path(search_paths: &OsStr, cwd: &Path, path: &Path) -> Option<PathBuf> {
    if path.is_absolute() {
        return find_by_path(path);
    }

    let mut components = path.components();
    match (components.next(), components.next()) {
        (None, _) => None,
        (Some(x), None) => find_in_path(search_paths, x.as_os_str()),
        _ => find_by_path(&cwd.join(path)),
    }
}

fn find_in_path(search_paths: &OsStr, cmd: &OsStr) -> Option<PathBuf> {
    std::env::split_paths(search_paths).find_map(|dir| find_by_path(&dir.join(cmd)))
}

fn find_by_path(path: &Path) -> Option<PathBuf> {
    path.is_file().then(|| path.to_path_buf())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::io_adapters::MemReader;
    use std::fs;
    use std::io::Read;

    #[cfg(unix)]
    fn osstr(s: &str) -> &OsStr {
        OsStr::new(s)
    }

    fn spawn(env: &mut Environment, name: &str, args: &[&str], stdout: Box<dyn Stdout>) -> Child {
        let cmd = Factory::<ExternalCommand>::default()
            .try_create(env, name, args)
            .expect("program should be on PATH");
        let outcome = cmd
            .start(
                Box::new(MemReader::new(Vec::<u8>::new())),
                stdout,
                &mut Vec::<u8>::new(),
                env,
            )
            .unwrap();
        match outcome {
            Outcome::Running(child) => child,
            Outcome::Finished(_) => panic!("external commands always spawn"),
        }
    }

    #[test]
    #[cfg(unix)]
    fn absolute_existing() {
        let res = find_command_path(osstr("/bin"), Path::new("/"), Path::new("/bin/sh"));
        assert_eq!(res.as_deref(), Some(Path::new("/bin/sh")));
    }

    #[test]
    #[cfg(unix)]
    fn absolute_nonexisting() {
        let res = find_command_path(osstr("/bin"), Path::new("/"), Path::new("/bin/nonexisting"));
        assert!(res.is_none());
    }

    #[test]
    #[cfg(unix)]
    fn single_component_found_in_path() {
        let found = find_command_path(osstr("/nowhere:/bin"), Path::new("/"), Path::new("sh"))
            .expect("Expected to find 'sh' in /bin via PATH search");
        assert_eq!(found, Path::new("/bin/sh"));
    }

    #[test]
    #[cfg(unix)]
    fn single_component_not_found_in_path() {
        let res = find_command_path(osstr("/bin"), Path::new("/"), Path::new("nonexisting"));
        assert!(res.is_none());
    }

    #[test]
    #[cfg(unix)]
    fn directories_are_not_programs() {
        let res = find_command_path(osstr("/"), Path::new("/"), Path::new("bin"));
        assert!(res.is_none());
    }

    #[test]
    #[cfg(unix)]
    fn multiple_components_resolved_against_cwd() {
        let tmp = tempfile::tempdir().unwrap();
        fs::create_dir_all(tmp.path().join("bin")).unwrap();
        File::create(tmp.path().join("bin").join("tool")).unwrap();

        let found = find_command_path(osstr("/does/not/matter"), tmp.path(), Path::new("bin/tool"))
            .expect("Expected to find relative 'bin/tool'");
        assert_eq!(found, tmp.path().join("bin/tool"));

        let found = find_command_path(osstr("/bin"), tmp.path(), Path::new("./bin/tool"));
        assert!(found.is_some());
    }

    #[test]
    fn empty_path_is_none() {
        let res = find_command_path(OsStr::new("/bin"), Path::new("/"), Path::new(""));
        assert!(res.is_none());
    }

    #[test]
    fn explicit_redirection_wins_over_supplied_streams() {
        let tmp = tempfile::tempdir().unwrap();
        fs::write(tmp.path().join("in.txt"), "from file").unwrap();
        let env = Environment {
            current_dir: tmp.path().to_path_buf(),
            ..Environment::new()
        };
        let cmd = ParsedCommand {
            argv: vec!["cat".into()],
            input: Some("in.txt".into()),
            output: Some("out.txt".into()),
            background: false,
        };
        let supplied_out = crate::io_adapters::MemWriter::new();

        let (mut stdin, mut stdout) = bind_streams(
            &cmd,
            Box::new(MemReader::new("from pipe")),
            Box::new(supplied_out.clone()),
            &env,
        )
        .unwrap();
        let mut text = String::new();
        stdin.read_to_string(&mut text).unwrap();
        stdout.write_all(b"to file").unwrap();
        drop(stdout);

        assert_eq!(text, "from file");
        assert_eq!(fs::read_to_string(tmp.path().join("out.txt")).unwrap(), "to file");
        assert!(supplied_out.contents().is_empty());
    }

    #[test]
    fn output_redirection_truncates() {
        let tmp = tempfile::tempdir().unwrap();
        let target = tmp.path().join("out.txt");
        fs::write(&target, "old contents that are long").unwrap();
        let env = Environment::new();
        let cmd = ParsedCommand {
            argv: vec!["x".into()],
            output: Some(target.clone()),
            ..ParsedCommand::default()
        };

        let (_, mut stdout) = bind_streams(
            &cmd,
            Box::new(MemReader::new(Vec::<u8>::new())),
            Box::new(crate::io_adapters::MemWriter::new()),
            &env,
        )
        .unwrap();
        stdout.write_all(b"new").unwrap();
        drop(stdout);

        assert_eq!(fs::read_to_string(&target).unwrap(), "new");
    }

    #[test]
    fn missing_input_file_is_a_resource_error() {
        let tmp = tempfile::tempdir().unwrap();
        let env = Environment {
            current_dir: tmp.path().to_path_buf(),
            ..Environment::new()
        };
        let cmd = ParsedCommand {
            argv: vec!["cat".into()],
            input: Some("absent.txt".into()),
            ..ParsedCommand::default()
        };

        let err = bind_streams(
            &cmd,
            Box::new(MemReader::new(Vec::<u8>::new())),
            Box::new(crate::io_adapters::MemWriter::new()),
            &env,
        )
        .err()
        .expect("opening a missing file must fail");
        assert!(matches!(err, ShellError::Resource { .. }));
        assert!(err.to_string().contains("absent.txt"));
    }

    #[test]
    #[cfg(unix)]
    fn spawned_child_writes_to_redirected_stdout() {
        let tmp = tempfile::tempdir().unwrap();
        let target = tmp.path().join("greeting.txt");
        let mut env = Environment {
            current_dir: tmp.path().to_path_buf(),
            ..Environment::new()
        };

        let child = spawn(
            &mut env,
            "echo",
            &["hello", "world"],
            Box::new(File::create(&target).unwrap()),
        );
        assert_eq!(wait_for(child).unwrap(), 0);
        assert_eq!(fs::read_to_string(&target).unwrap(), "hello world\n");
    }

    #[test]
    #[cfg(unix)]
    fn exit_status_is_propagated() {
        let mut env = Environment::new();
        let child = spawn(
            &mut env,
            "sh",
            &["-c", "exit 3"],
            Box::new(crate::io_adapters::MemWriter::new()),
        );
        assert_eq!(wait_for(child).unwrap(), 3);
    }

    #[test]
    #[cfg(unix)]
    fn signal_death_maps_above_128() {
        let mut env = Environment::new();
        let child = spawn(
            &mut env,
            "sh",
            &["-c", "kill -9 $$"],
            Box::new(crate::io_adapters::MemWriter::new()),
        );
        assert_eq!(wait_for(child).unwrap(), 128 + 9);
    }

    #[test]
    #[cfg(unix)]
    fn child_sees_typed_name_as_argv0() {
        let tmp = tempfile::tempdir().unwrap();
        let target = tmp.path().join("argv0.txt");
        let mut env = Environment {
            current_dir: tmp.path().to_path_buf(),
            ..Environment::new()
        };

        let child = spawn(
            &mut env,
            "sh",
            &["-c", "echo $0"],
            Box::new(File::create(&target).unwrap()),
        );
        assert_eq!(wait_for(child).unwrap(), 0);
        assert_eq!(fs::read_to_string(&target).unwrap(), "sh\n");
    }

    #[test]
    fn unknown_program_is_not_created() {
        let env = Environment::new();
        let cmd = Factory::<ExternalCommand>::default().try_create(&env, "xsh-no-such-program", &[]);
        assert!(cmd.is_none());
    }
}
