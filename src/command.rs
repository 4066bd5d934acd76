use crate::error::ShellError;
use log::debug;
use std::process::{Command, Stdio};

/// Captured outcome of one external process.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct ExecutionResult {
    pub stdout: String,
    pub stderr: String,
    pub exit_code: i32,
}

impl ExecutionResult {
    pub fn success(&self) -> bool {
        self.exit_code == 0
    }
}

pub trait CommandRunner: Send + Sync {
    fn run(&self, program: &str, args: &[&str]) -> Result<ExecutionResult, ShellError>;
}

pub struct SystemCommandRunner;

#[cfg(windows)]
fn hide_window(cmd: &mut Command) {
    use std::os::windows::process::CommandExt;
    const CREATE_NO_WINDOW: u32 = 0x0800_0000;
    cmd.creation_flags(CREATE_NO_WINDOW);
}

#[cfg(not(windows))]
fn hide_window(_cmd: &mut Command) {}

impl CommandRunner for SystemCommandRunner {
    // Blocks until the child exits. There is no timeout.
    fn run(&self, program: &str, args: &[&str]) -> Result<ExecutionResult, ShellError> {
        let mut cmd = Command::new(program);
        cmd.args(args)
            .stdin(Stdio::null())
            .stdout(Stdio::piped())
            .stderr(Stdio::piped());
        hide_window(&mut cmd);

        let output = cmd.output().map_err(|e| ShellError::Launch {
            program: program.to_string(),
            source: e,
        })?;

        // A child killed by a signal has no exit code.
        let exit_code = output.status.code().unwrap_or(-1);
        debug!("'{}' exited with {}", program, exit_code);

        Ok(ExecutionResult {
            stdout: String::from_utf8_lossy(&output.stdout).into_owned(),
            stderr: String::from_utf8_lossy(&output.stderr).into_owned(),
            exit_code,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_missing_program_is_launch_error() {
        let result = SystemCommandRunner.run("pshvtools-shell-no-such-program", &["-NoProfile"]);
        assert!(matches!(result, Err(ShellError::Launch { .. })));
    }

    #[cfg(unix)]
    #[test]
    fn test_captures_streams_and_exit_code() {
        let result = SystemCommandRunner
            .run("sh", &["-c", "echo out; echo err >&2; exit 3"])
            .unwrap();
        assert_eq!(result.stdout, "out\n");
        assert_eq!(result.stderr, "err\n");
        assert_eq!(result.exit_code, 3);
        assert!(!result.success());
    }
}
