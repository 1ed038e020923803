//! User-facing terminal output.
//!
//! Everything the user is meant to read goes through [`Output`]; diagnostics
//! go through `tracing`. Output can be captured for tests.

use std::io::{self, Write};
use std::sync::{Arc, Mutex};

use console::style;

type Sink = Arc<Mutex<Box<dyn Write + Send>>>;

/// Cloneable handle to stdout/stderr.
#[derive(Clone)]
pub struct Output {
    stdout: Sink,
    stderr: Sink,
}

impl Output {
    /// Output bound to the process's stdout and stderr.
    pub fn stdio() -> Self {
        Self {
            stdout: Arc::new(Mutex::new(Box::new(io::stdout()))),
            stderr: Arc::new(Mutex::new(Box::new(io::stderr()))),
        }
    }

    /// Output written into memory buffers.
    pub fn captured() -> (Self, CapturedOutput) {
        let captured = CapturedOutput::default();
        let output = Self {
            stdout: Arc::new(Mutex::new(Box::new(SharedBuffer(captured.stdout.clone())))),
            stderr: Arc::new(Mutex::new(Box::new(SharedBuffer(captured.stderr.clone())))),
        };
        (output, captured)
    }

    /// Plain line on stdout.
    pub fn log(&self, message: &str) {
        write_line(&self.stdout, message);
    }

    /// Plain line on stderr.
    pub fn error_plain(&self, message: &str) {
        write_line(&self.stderr, message);
    }

    /// `✘ [ERROR]` message on stderr.
    pub fn error(&self, message: &str) {
        write_line(
            &self.stderr,
            &format!("{} {}", style("✘ [ERROR]").red().bold(), message),
        );
    }

    /// `▲ [WARNING]` message on stderr.
    pub fn warn(&self, message: &str) {
        write_line(
            &self.stderr,
            &format!("{} {}", style("▲ [WARNING]").yellow().bold(), message),
        );
    }

    /// Green checkmark on stdout.
    pub fn success(&self, message: &str) {
        write_line(&self.stdout, &format!("{} {}", style("✓").green().bold(), message));
    }

    /// Yellow hint on stdout.
    pub fn hint(&self, message: &str) {
        write_line(&self.stdout, &style(message).yellow().to_string());
    }
}

fn write_line(sink: &Sink, message: &str) {
    if let Ok(mut writer) = sink.lock() {
        // Output is best-effort: a closed pipe must not fail the command.
        let _ = writeln!(writer, "{message}");
        let _ = writer.flush();
    }
}

/// Buffers behind [`Output::captured`].
#[derive(Clone, Default)]
pub struct CapturedOutput {
    stdout: Arc<Mutex<Vec<u8>>>,
    stderr: Arc<Mutex<Vec<u8>>>,
}

impl CapturedOutput {
    pub fn stdout(&self) -> String {
        read(&self.stdout)
    }

    pub fn stderr(&self) -> String {
        read(&self.stderr)
    }
}

fn read(buffer: &Arc<Mutex<Vec<u8>>>) -> String {
    buffer
        .lock()
        .map(|bytes| console::strip_ansi_codes(&String::from_utf8_lossy(&bytes)).into_owned())
        .unwrap_or_default()
}

struct SharedBuffer(Arc<Mutex<Vec<u8>>>);

impl Write for SharedBuffer {
    fn write(&mut self, buf: &[u8]) -> io::Result<usize> {
        self.0
            .lock()
            .map_err(|_| io::Error::other("output buffer poisoned"))?
            .extend_from_slice(buf);
        Ok(buf.len())
    }

    fn flush(&mut self) -> io::Result<()> {
        Ok(())
    }
}
