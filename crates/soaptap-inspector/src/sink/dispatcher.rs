use std::sync::Arc;

use super::{CapturedPayload, ConsoleSink, FileSink, LogDirectory, Variant};
use crate::config::SinkToggles;
use crate::diag::DiagnosticSink;
use crate::obs::InterceptorMetrics;

/// Fans one captured payload out to every enabled destination.
///
/// Each output is attempted independently: a failing file write does not
/// stop the console block, and nothing is propagated to the caller.
pub struct SinkDispatcher {
    toggles: SinkToggles,
    console: ConsoleSink,
    files: FileSink,
    diag: Arc<dyn DiagnosticSink>,
    metrics: Arc<InterceptorMetrics>,
}

impl SinkDispatcher {
    pub fn new(
        toggles: SinkToggles,
        console: ConsoleSink,
        directory: LogDirectory,
        diag: Arc<dyn DiagnosticSink>,
        metrics: Arc<InterceptorMetrics>,
    ) -> Self {
        Self {
            toggles,
            console,
            files: FileSink::new(directory),
            diag,
            metrics,
        }
    }

    pub fn toggles(&self) -> SinkToggles {
        self.toggles
    }

    pub fn directory(&self) -> &LogDirectory {
        self.files.directory()
    }

    /// Create the log directory up front when files are enabled. Announces a
    /// newly created directory on the console when console output is on.
    pub fn prepare(&self) {
        if !self.toggles.any_file() {
            return;
        }
        let Some(ensured) = self.files.directory().ensure(self.diag.as_ref()) else {
            return;
        };
        if ensured.created && self.toggles.any_console() {
            let text = format!("Message log directory created: {}", ensured.path.display());
            if let Err(e) = self.console.notice(&text) {
                self.diag.error("failed to write console notice", Some(&e));
            }
        }
    }

    pub fn dispatch(&self, payload: &CapturedPayload<'_>) {
        if self.toggles.raw_file {
            self.write_file(Variant::Raw, payload, payload.raw);
        }
        if self.toggles.canonical_file {
            match payload.canonical {
                Some(doc) => self.write_file(Variant::Canonical, payload, doc),
                None => self.diag.warn(&format!(
                    "canonical output missing for {} {}",
                    payload.operation,
                    payload.direction.as_str()
                )),
            }
        }

        if self.toggles.any_console() {
            let canonical = self.toggles.canonical_console && payload.canonical.is_some();
            match self.console.write_block(payload, self.toggles.raw_console, canonical) {
                Ok(()) => {
                    if self.toggles.raw_console {
                        self.record_write("console", Variant::Raw);
                    }
                    if canonical {
                        self.record_write("console", Variant::Canonical);
                    }
                }
                Err(e) => {
                    self.diag.error("failed to write console block", Some(&e));
                    if self.toggles.raw_console {
                        self.record_failure("console", Variant::Raw);
                    }
                    if self.toggles.canonical_console {
                        self.record_failure("console", Variant::Canonical);
                    }
                }
            }
        }
    }

    fn write_file(&self, variant: Variant, payload: &CapturedPayload<'_>, content: &str) {
        match self.files.write(variant, payload, content, self.diag.as_ref()) {
            Ok(written) => {
                self.diag.debug(&format!(
                    "{} {} {} written to {}",
                    variant.as_str(),
                    payload.direction.as_str(),
                    payload.operation,
                    written.path.display()
                ));
                if written.created_dir && self.toggles.any_console() {
                    let text = format!(
                        "Message log directory created: {}",
                        written.path.parent().unwrap_or(written.path.as_path()).display()
                    );
                    if let Err(e) = self.console.notice(&text) {
                        self.diag.error("failed to write console notice", Some(&e));
                    }
                }
                self.record_write("file", variant);
            }
            Err(e) => {
                self.diag.error(
                    &format!(
                        "failed to write {} {} log for {}",
                        variant.as_str(),
                        payload.direction.as_str(),
                        payload.operation
                    ),
                    Some(&e),
                );
                self.record_failure("file", variant);
            }
        }
    }

    fn record_write(&self, destination: &str, variant: Variant) {
        self.metrics
            .sink_writes
            .inc(&[("destination", destination), ("variant", variant.as_str())]);
    }

    fn record_failure(&self, destination: &str, variant: Variant) {
        self.metrics
            .sink_failures
            .inc(&[("destination", destination), ("variant", variant.as_str())]);
    }
}
