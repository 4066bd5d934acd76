//! Moves command execution off the front-end thread.
//!
//! A single worker runs queued actions one after another. Everything it
//! wants to show is posted back as [`UiEvent`]s, so only the thread that
//! owns the receiver ever touches the real output log.

use crate::action::{Action, ActionKind};
use crate::error::ShellError;
use crate::output::LogSink;
use crate::runner::PowerShell;
use log::debug;
use std::sync::mpsc::{self, Receiver, Sender};
use std::thread::{self, JoinHandle};

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum UiEvent {
    Line(String),
    Finished {
        kind: ActionKind,
        exit_code: Option<i32>,
    },
}

/// Posts appended text to the UI thread instead of writing it directly.
pub struct ChannelSink {
    tx: Sender<UiEvent>,
}

impl ChannelSink {
    pub fn new(tx: Sender<UiEvent>) -> Self {
        Self { tx }
    }
}

impl LogSink for ChannelSink {
    fn append(&self, text: &str) {
        if text.is_empty() {
            return;
        }
        // Dropped if the receiver is gone.
        let _ = self.tx.send(UiEvent::Line(text.to_string()));
    }
}

pub struct Dispatcher {
    queue: Option<Sender<Action>>,
    worker: Option<JoinHandle<()>>,
}

impl Dispatcher {
    pub fn spawn(powershell: PowerShell) -> (Self, Receiver<UiEvent>) {
        let (queue_tx, queue_rx) = mpsc::channel::<Action>();
        let (ui_tx, ui_rx) = mpsc::channel();

        let worker = thread::spawn(move || {
            let sink = ChannelSink::new(ui_tx.clone());
            for action in queue_rx {
                let kind = action.kind();
                debug!("Worker picked up {} action", kind);
                let exit_code = powershell.execute(&action, &sink);
                if ui_tx.send(UiEvent::Finished { kind, exit_code }).is_err() {
                    break;
                }
            }
            debug!("Command worker stopped");
        });

        (
            Self {
                queue: Some(queue_tx),
                worker: Some(worker),
            },
            ui_rx,
        )
    }

    /// Queues an action. Actions submitted while another one runs wait
    /// their turn.
    pub fn submit(&self, action: Action) -> Result<(), ShellError> {
        self.queue
            .as_ref()
            .ok_or(ShellError::WorkerGone)?
            .send(action)
            .map_err(|_| ShellError::WorkerGone)
    }
}

impl Drop for Dispatcher {
    fn drop(&mut self) {
        self.queue.take();
        if let Some(worker) = self.worker.take() {
            let _ = worker.join();
        }
    }
}

/// Copies lines into `sink` until the next action finishes. Returns its exit
/// code, or `WorkerGone` if the channel closed first.
pub fn drain_until_finished(
    rx: &Receiver<UiEvent>,
    sink: &dyn LogSink,
) -> Result<Option<i32>, ShellError> {
    for event in rx.iter() {
        match event {
            UiEvent::Line(text) => sink.append(&text),
            UiEvent::Finished { exit_code, .. } => return Ok(exit_code),
        }
    }
    Err(ShellError::WorkerGone)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::command::{CommandRunner, ExecutionResult};
    use crate::output::OutputLog;
    use std::sync::Arc;

    struct EchoRunner;

    impl CommandRunner for EchoRunner {
        fn run(&self, _program: &str, args: &[&str]) -> Result<ExecutionResult, ShellError> {
            let command = args.last().copied().unwrap_or_default();
            Ok(ExecutionResult {
                stdout: format!("ran {}", command),
                stderr: String::new(),
                exit_code: if command.contains("Restore") { 2 } else { 0 },
            })
        }
    }

    fn powershell() -> PowerShell {
        PowerShell::new("pwsh", Arc::new(EchoRunner))
    }

    #[test]
    fn test_actions_run_in_submission_order() {
        let (dispatcher, rx) = Dispatcher::spawn(powershell());
        dispatcher.submit(Action::HealthCheck).unwrap();
        dispatcher.submit(Action::RestoreOrphans).unwrap();

        let log = OutputLog::new();
        assert_eq!(drain_until_finished(&rx, &log).unwrap(), Some(0));
        assert_eq!(drain_until_finished(&rx, &log).unwrap(), Some(2));

        let health = Action::HealthCheck.command_line();
        let restore = Action::RestoreOrphans.command_line();
        assert_eq!(
            log.lines(),
            vec![
                format!("> {}", health),
                format!("ran {}", health),
                "Command completed successfully.".to_string(),
                format!("> {}", restore),
                format!("ran {}", restore),
                "Command failed with exit code 2.".to_string(),
            ]
        );
    }

    #[test]
    fn test_finished_event_carries_kind() {
        let (dispatcher, rx) = Dispatcher::spawn(powershell());
        dispatcher.submit(Action::ShowConfig).unwrap();
        let finished = rx
            .iter()
            .find(|e| matches!(e, UiEvent::Finished { .. }))
            .unwrap();
        assert_eq!(
            finished,
            UiEvent::Finished {
                kind: ActionKind::ShowConfig,
                exit_code: Some(0)
            }
        );
    }

    #[test]
    fn test_drain_reports_closed_channel() {
        let (tx, rx) = mpsc::channel();
        tx.send(UiEvent::Line("partial".to_string())).unwrap();
        drop(tx);
        let log = OutputLog::new();
        assert!(matches!(
            drain_until_finished(&rx, &log),
            Err(ShellError::WorkerGone)
        ));
        assert_eq!(log.lines(), vec!["partial"]);
    }
}
