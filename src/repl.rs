use crate::action::{ActionKind, Form};
use crate::config::parse_bool;
use crate::dispatch::{drain_until_finished, Dispatcher, UiEvent};
use crate::error::ShellError;
use crate::output::{LogSink, WriterSink};
use log::debug;
use std::io::{BufRead, Write};
use std::sync::mpsc::Receiver;

const HELP: &str = "\
Commands:
  set pattern|dest|keep|compression <value>   change a form field
  whatif on|off                               toggle dry-run
  backup | compact | health | config | restore
  show                                        print the form
  help                                        this text
  exit                                        leave the shell";

/// Interactive stand-in for the form window: field edits, action triggers
/// and an output pane written to `out`.
pub struct Repl<W: Write> {
    form: Form,
    dispatcher: Dispatcher,
    events: Receiver<UiEvent>,
    sink: WriterSink<W>,
}

impl<W: Write> Repl<W> {
    pub fn new(form: Form, dispatcher: Dispatcher, events: Receiver<UiEvent>, out: W) -> Self {
        Self {
            form,
            dispatcher,
            events,
            sink: WriterSink::new(out),
        }
    }

    pub fn form(&self) -> &Form {
        &self.form
    }

    pub fn into_output(self) -> W {
        self.sink.into_inner()
    }

    pub fn run<R: BufRead>(&mut self, input: R) -> Result<(), ShellError> {
        self.sink.append("pshvtools shell. Type 'help' for commands.");
        for line in input.lines() {
            let line = line?;
            let line = line.trim();
            if line.is_empty() {
                continue;
            }
            debug!("repl input: {}", line);
            match self.handle(line) {
                Ok(true) => {}
                Ok(false) => break,
                Err(ShellError::WorkerGone) => return Err(ShellError::WorkerGone),
                Err(e) => self.sink.append(&format!("error: {}", e)),
            }
        }
        Ok(())
    }

    /// Returns `Ok(false)` when the shell should close.
    fn handle(&mut self, line: &str) -> Result<bool, ShellError> {
        let (word, rest) = match line.split_once(char::is_whitespace) {
            Some((w, r)) => (w, r.trim()),
            None => (line, ""),
        };

        match word.to_ascii_lowercase().as_str() {
            "exit" | "quit" => return Ok(false),
            "help" => self.sink.append(HELP),
            "show" => self.show(),
            "set" => self.set(rest)?,
            "whatif" => {
                self.form.what_if = parse_bool(rest)
                    .ok_or_else(|| ShellError::UnknownCommand(line.to_string()))?;
            }
            other => {
                let kind: ActionKind = other.parse()?;
                self.dispatcher.submit(self.form.action(kind))?;
                drain_until_finished(&self.events, &self.sink)?;
            }
        }
        Ok(true)
    }

    fn set(&mut self, rest: &str) -> Result<(), ShellError> {
        let (field, value) = rest.split_once(char::is_whitespace).unwrap_or((rest, ""));
        let value = value.trim().to_string();
        match field.to_ascii_lowercase().as_str() {
            "pattern" => self.form.name_pattern = value,
            "dest" => self.form.destination_path = value,
            "keep" => self.form.keep = value,
            "compression" => self.form.compression_level = value,
            _ => return Err(ShellError::UnknownCommand(format!("set {}", rest))),
        }
        Ok(())
    }

    fn show(&self) {
        self.sink.append(&format!("NamePattern:      {}", self.form.name_pattern));
        self.sink.append(&format!("DestinationPath:  {}", self.form.destination_path));
        self.sink.append(&format!("Keep:             {}", self.form.keep));
        self.sink.append(&format!("CompressionLevel: {}", self.form.compression_level));
        self.sink.append(&format!("WhatIf:           {}", self.form.what_if));
    }
}
