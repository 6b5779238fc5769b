//! Bordered, colour-coded console blocks.

use std::fmt::Write as _;
use std::io::{self, Write};
use std::sync::Mutex;

use colored::{ColoredString, Colorize};

use super::CapturedPayload;

/// Writes whole blocks under one lock so concurrent calls never interleave.
pub struct ConsoleSink {
    out: Mutex<Box<dyn Write + Send>>,
}

impl ConsoleSink {
    pub fn stdout() -> Self {
        Self::with_writer(io::stdout())
    }

    pub fn with_writer(writer: impl Write + Send + 'static) -> Self {
        Self {
            out: Mutex::new(Box::new(writer)),
        }
    }

    pub fn write_block(&self, payload: &CapturedPayload<'_>, raw: bool, canonical: bool) -> io::Result<()> {
        self.emit(&render_block(payload, raw, canonical))
    }

    pub fn notice(&self, text: &str) -> io::Result<()> {
        self.emit(&format!("\n{}\n\n", text.yellow()))
    }

    fn emit(&self, text: &str) -> io::Result<()> {
        let mut out = self
            .out
            .lock()
            .map_err(|_| io::Error::new(io::ErrorKind::Other, "console writer lock poisoned"))?;
        out.write_all(text.as_bytes())?;
        out.flush()
    }
}

fn render_block(p: &CapturedPayload<'_>, raw: bool, canonical: bool) -> String {
    let styled = |s: &str| -> ColoredString {
        if p.direction.is_request() {
            s.green()
        } else {
            s.blue()
        }
    };

    let mut out = String::new();
    let label = p.direction.label();
    let _ = writeln!(out);
    let _ = writeln!(out, "{}", styled(&format!("========== {} ==========", label.to_uppercase())));
    let _ = writeln!(out, "{}", styled(&format!("Operation: {}", p.operation)));
    let _ = writeln!(out, "{}", styled(&format!("Correlation ID: {}", p.correlation_id)));

    if p.direction.is_request() {
        let ts = p.captured_at.format("%Y-%m-%d %H:%M:%S%.3f");
        let _ = writeln!(out, "{}", styled(&format!("Timestamp: {ts}")));
        let _ = writeln!(out, "{}", styled(&format!("Endpoint: {}", p.endpoint)));
    }

    if raw {
        let _ = writeln!(out, "{}", styled(&format!("{label} XML (raw):")).bold());
        let _ = writeln!(out, "{}", styled(p.raw));
    }

    if let (true, Some(doc)) = (canonical, p.canonical) {
        let _ = writeln!(out, "{}", "Canonical XML:".yellow().bold());
        let _ = writeln!(out, "{}", doc.yellow());
    }

    let _ = writeln!(out, "{}", styled("================================"));
    out
}
