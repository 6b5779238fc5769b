//! Diagnostic channel for the interceptor's own failures and progress.
//!
//! The pipeline never reports its problems to the intercepted call; it
//! reports them here. `TracingDiagnostics` writes through `tracing`;
//! `ConsoleDiagnostics` writes straight to stderr for hosts that never
//! install a subscriber. [`default_sink`] picks between the two.

use std::error::Error;
use std::io::Write;
use std::sync::{Arc, Mutex, PoisonError};

use chrono::Local;
use colored::Colorize;

pub trait DiagnosticSink: Send + Sync {
    fn error(&self, message: &str, cause: Option<&(dyn Error + 'static)>);
    fn warn(&self, message: &str);
    fn info(&self, message: &str);
    fn debug(&self, message: &str);
}

/// Default sink: forwards to `tracing` under the `soaptap` target.
#[derive(Debug, Default, Clone, Copy)]
pub struct TracingDiagnostics;

impl DiagnosticSink for TracingDiagnostics {
    fn error(&self, message: &str, cause: Option<&(dyn Error + 'static)>) {
        match cause {
            Some(err) => tracing::error!(target: "soaptap", error = %err, "{message}"),
            None => tracing::error!(target: "soaptap", "{message}"),
        }
    }

    fn warn(&self, message: &str) {
        tracing::warn!(target: "soaptap", "{message}");
    }

    fn info(&self, message: &str) {
        tracing::info!(target: "soaptap", "{message}");
    }

    fn debug(&self, message: &str) {
        tracing::debug!(target: "soaptap", "{message}");
    }
}

/// Timestamped, level-coloured lines on stderr.
#[derive(Debug, Default, Clone, Copy)]
pub struct ConsoleDiagnostics;

impl ConsoleDiagnostics {
    fn line(&self, level: DiagLevel, message: &str) {
        let tag = match level {
            DiagLevel::Error => "ERROR".red(),
            DiagLevel::Warn => "WARN ".yellow(),
            DiagLevel::Info => "INFO ".green(),
            DiagLevel::Debug => "DEBUG".normal(),
        };
        let ts = Local::now().format("%Y-%m-%d %H:%M:%S%.3f");
        // stderr is the last resort; nowhere left to report a failure.
        let _ = writeln!(std::io::stderr().lock(), "[{ts}] {tag} soaptap: {message}");
    }
}

impl DiagnosticSink for ConsoleDiagnostics {
    fn error(&self, message: &str, cause: Option<&(dyn Error + 'static)>) {
        match cause {
            Some(err) => self.line(DiagLevel::Error, &format!("{message}: {err}")),
            None => self.line(DiagLevel::Error, message),
        }
    }

    fn warn(&self, message: &str) {
        self.line(DiagLevel::Warn, message);
    }

    fn info(&self, message: &str) {
        self.line(DiagLevel::Info, message);
    }

    fn debug(&self, message: &str) {
        if cfg!(debug_assertions) {
            self.line(DiagLevel::Debug, message);
        }
    }
}

/// `tracing` when the host installed a global subscriber, stderr otherwise.
pub fn default_sink() -> Arc<dyn DiagnosticSink> {
    if tracing::dispatcher::has_been_set() {
        Arc::new(TracingDiagnostics)
    } else {
        Arc::new(ConsoleDiagnostics)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DiagLevel {
    Error,
    Warn,
    Info,
    Debug,
}

#[derive(Debug, Clone)]
pub struct DiagEntry {
    pub level: DiagLevel,
    pub message: String,
}

/// Keeps every entry in memory. Useful for hosts that surface diagnostics
/// elsewhere, and for tests.
#[derive(Debug, Default)]
pub struct MemoryDiagnostics {
    entries: Mutex<Vec<DiagEntry>>,
}

impl MemoryDiagnostics {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn entries(&self) -> Vec<DiagEntry> {
        self.entries.lock().unwrap_or_else(PoisonError::into_inner).clone()
    }

    pub fn count(&self, level: DiagLevel) -> usize {
        self.entries().iter().filter(|e| e.level == level).count()
    }

    pub fn contains(&self, level: DiagLevel, needle: &str) -> bool {
        self.entries()
            .iter()
            .any(|e| e.level == level && e.message.contains(needle))
    }

    fn push(&self, level: DiagLevel, message: String) {
        self.entries
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .push(DiagEntry { level, message });
    }
}

impl DiagnosticSink for MemoryDiagnostics {
    fn error(&self, message: &str, cause: Option<&(dyn Error + 'static)>) {
        let message = match cause {
            Some(err) => format!("{message}: {err}"),
            None => message.to_string(),
        };
        self.push(DiagLevel::Error, message);
    }

    fn warn(&self, message: &str) {
        self.push(DiagLevel::Warn, message.to_string());
    }

    fn info(&self, message: &str) {
        self.push(DiagLevel::Info, message.to_string());
    }

    fn debug(&self, message: &str) {
        self.push(DiagLevel::Debug, message.to_string());
    }
}
