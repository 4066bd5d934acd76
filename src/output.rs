use std::io::Write;
use std::sync::Mutex;

/// Destination for user-facing output lines.
pub trait LogSink {
    fn append(&self, text: &str);
}

/// Append-only in-memory log. Lines are never removed or rewritten.
#[derive(Debug, Default)]
pub struct OutputLog {
    lines: Mutex<Vec<String>>,
}

impl OutputLog {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn lines(&self) -> Vec<String> {
        self.lines.lock().map(|l| l.clone()).unwrap_or_default()
    }

    pub fn len(&self) -> usize {
        self.lines.lock().map(|l| l.len()).unwrap_or(0)
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

impl LogSink for OutputLog {
    fn append(&self, text: &str) {
        if text.is_empty() {
            return;
        }
        if let Ok(mut lines) = self.lines.lock() {
            lines.push(text.to_string());
        }
    }
}

/// Writes each appended text followed by a newline.
pub struct WriterSink<W: Write> {
    out: Mutex<W>,
}

impl<W: Write> WriterSink<W> {
    pub fn new(out: W) -> Self {
        Self {
            out: Mutex::new(out),
        }
    }

    pub fn into_inner(self) -> W {
        match self.out.into_inner() {
            Ok(w) => w,
            Err(poisoned) => poisoned.into_inner(),
        }
    }
}

impl<W: Write> LogSink for WriterSink<W> {
    fn append(&self, text: &str) {
        if text.is_empty() {
            return;
        }
        if let Ok(mut out) = self.out.lock() {
            // Write errors are ignored.
            let _ = writeln!(out, "{}", text);
            let _ = out.flush();
        }
    }
}
