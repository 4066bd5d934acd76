use crate::action::{Action, DEFAULT_MODULE};
use crate::command::{CommandRunner, ExecutionResult};
use crate::error::ShellError;
use crate::output::LogSink;
use log::{debug, info, warn};
use std::sync::Arc;

/// Runs command strings through a PowerShell interpreter and renders the
/// captured result into a [`LogSink`].
#[derive(Clone)]
pub struct PowerShell {
    interpreter: String,
    module: String,
    runner: Arc<dyn CommandRunner>,
}

impl PowerShell {
    pub fn new(interpreter: impl Into<String>, runner: Arc<dyn CommandRunner>) -> Self {
        Self {
            interpreter: interpreter.into(),
            module: DEFAULT_MODULE.to_string(),
            runner,
        }
    }

    pub fn with_module(mut self, module: impl Into<String>) -> Self {
        self.module = module.into();
        self
    }

    /// No profile, no execution policy checks, one command.
    pub fn invocation_args(command: &str) -> [&str; 5] {
        ["-NoProfile", "-ExecutionPolicy", "Bypass", "-Command", command]
    }

    pub fn invoke(&self, command: &str) -> Result<ExecutionResult, ShellError> {
        debug!("Invoking {} with: {}", self.interpreter, command);
        self.runner
            .run(&self.interpreter, &Self::invocation_args(command))
    }

    /// Runs `command` and renders its output. Never returns an error: launch
    /// failures are rendered as an `Exception:` line and yield `None`.
    pub fn run_and_report(&self, command: &str, sink: &dyn LogSink) -> Option<i32> {
        match self.invoke(command) {
            Ok(result) => {
                render(&result, sink);
                if result.success() {
                    info!("Command succeeded");
                } else {
                    warn!("Command exited with code {}", result.exit_code);
                }
                Some(result.exit_code)
            }
            Err(e) => {
                warn!("Command could not be run: {}", e);
                sink.append(&format!("Exception: {}", e));
                None
            }
        }
    }

    /// Echoes the command line, then runs it.
    pub fn execute(&self, action: &Action, sink: &dyn LogSink) -> Option<i32> {
        let command = action.command_line_for(&self.module);
        info!("Running {} action", action.kind());
        sink.append(&format!("> {}", command));
        self.run_and_report(&command, sink)
    }
}

fn render(result: &ExecutionResult, sink: &dyn LogSink) {
    sink.append(result.stdout.trim_end_matches(['\r', '\n']));
    if !result.stderr.trim().is_empty() {
        sink.append(&format!(
            "ERROR: {}",
            result.stderr.trim_end_matches(['\r', '\n'])
        ));
    }
    if result.success() {
        sink.append("Command completed successfully.");
    } else {
        sink.append(&format!(
            "Command failed with exit code {}.",
            result.exit_code
        ));
    }
}
