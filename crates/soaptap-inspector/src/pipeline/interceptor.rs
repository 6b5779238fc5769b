use std::io::Write;
use std::sync::Arc;

use chrono::Local;

use soaptap_core::error::{Result, TapError};
use soaptap_core::{canonical, extract, BufferedCopy, Direction, Message};

use super::correlation::{Correlation, CorrelationState};
use super::gate::{AttachedDebugger, InspectionSignal};
use crate::config::Settings;
use crate::diag::{self, DiagnosticSink};
use crate::host::{CallState, HostDescriptor, MessageInspector};
use crate::obs::InterceptorMetrics;
use crate::sink::{CapturedPayload, ConsoleSink, LogDirectory, SinkDispatcher};

/// Captures request/reply pairs and hands them to the configured sinks.
///
/// Nothing here can fail the intercepted call: every internal error is
/// reported to the diagnostic sink and the message is left deliverable.
pub struct Interceptor {
    settings: Arc<Settings>,
    diag: Arc<dyn DiagnosticSink>,
    sinks: SinkDispatcher,
    inspection: Box<dyn InspectionSignal>,
    metrics: Arc<InterceptorMetrics>,
}

pub struct InterceptorBuilder {
    settings: Settings,
    diag: Option<Arc<dyn DiagnosticSink>>,
    console: Option<ConsoleSink>,
    inspection: Option<Box<dyn InspectionSignal>>,
    metrics: Option<Arc<InterceptorMetrics>>,
}

impl InterceptorBuilder {
    pub fn diagnostics(mut self, diag: Arc<dyn DiagnosticSink>) -> Self {
        self.diag = Some(diag);
        self
    }

    /// Console blocks go to `writer` instead of stdout.
    pub fn console_writer(mut self, writer: impl Write + Send + 'static) -> Self {
        self.console = Some(ConsoleSink::with_writer(writer));
        self
    }

    pub fn inspection(mut self, signal: impl InspectionSignal + 'static) -> Self {
        self.inspection = Some(Box::new(signal));
        self
    }

    pub fn metrics(mut self, metrics: Arc<InterceptorMetrics>) -> Self {
        self.metrics = Some(metrics);
        self
    }

    pub fn build(self) -> Interceptor {
        let diag = self.diag.unwrap_or_else(diag::default_sink);
        let metrics = self.metrics.unwrap_or_default();
        let directory = LogDirectory::new(
            self.settings.log_directory.clone(),
            self.settings.fallback_directory.clone(),
        );
        let sinks = SinkDispatcher::new(
            self.settings.sinks,
            self.console.unwrap_or_else(ConsoleSink::stdout),
            directory,
            Arc::clone(&diag),
            Arc::clone(&metrics),
        );

        Interceptor {
            settings: Arc::new(self.settings),
            diag,
            sinks,
            inspection: self.inspection.unwrap_or_else(|| Box::new(AttachedDebugger::new())),
            metrics,
        }
    }
}

impl Interceptor {
    pub fn builder(settings: Settings) -> InterceptorBuilder {
        InterceptorBuilder {
            settings,
            diag: None,
            console: None,
            inspection: None,
            metrics: None,
        }
    }

    /// Defaults: [`diag::default_sink`], stdout console, attached-debugger check.
    pub fn new(settings: Settings) -> Self {
        Self::builder(settings).build()
    }

    pub fn settings(&self) -> &Settings {
        &self.settings
    }

    pub fn metrics(&self) -> Arc<InterceptorMetrics> {
        Arc::clone(&self.metrics)
    }

    pub fn is_logging_enabled(&self) -> bool {
        self.settings.logging_enabled || self.inspection.is_active()
    }

    /// Request phase. `message` is always left readable; on success it is
    /// replaced by a replay of the captured content.
    pub fn on_request_received(&self, message: &mut Message) -> Correlation {
        if !self.is_logging_enabled() {
            return Correlation::Untracked;
        }

        let buffer = match BufferedCopy::capture(message, self.settings.max_buffer_bytes) {
            Ok(buffer) => buffer,
            Err(e) => {
                self.capture_failed(Direction::Request, &e);
                return Correlation::Untracked;
            }
        };

        let outcome = self.log_request(&buffer);
        *message = buffer.replay();

        match outcome {
            Ok(state) => Correlation::Captured(state),
            Err(e) => {
                self.capture_failed(Direction::Request, &e);
                Correlation::Untracked
            }
        }
    }

    /// Reply phase. A no-op for `Untracked` or when logging is off.
    pub fn on_reply_about_to_send(&self, message: &mut Message, correlation: Correlation) {
        if !self.is_logging_enabled() {
            return;
        }
        let Some(state) = correlation.into_state() else {
            return;
        };

        let buffer = match BufferedCopy::capture(message, self.settings.max_buffer_bytes) {
            Ok(buffer) => buffer,
            Err(e) => {
                self.capture_failed(Direction::Response, &e);
                return;
            }
        };

        let outcome = self.log_response(&buffer, &state);
        *message = buffer.replay();

        if let Err(e) = outcome {
            self.capture_failed(Direction::Response, &e);
        }
    }

    /// Register on every endpoint of `host`. Returns how many registrations
    /// succeeded; failures are reported and skipped.
    pub fn attach(self: &Arc<Self>, host: &mut HostDescriptor) -> usize {
        if host.endpoints().is_empty() {
            self.diag.warn("host exposes no endpoints; message logging not attached");
        }

        let mut registered = 0;
        for endpoint in host.endpoints_mut() {
            let inspector: Arc<dyn MessageInspector> = Arc::<Interceptor>::clone(self);
            match endpoint.add_inspector(inspector) {
                Ok(()) => {
                    registered += 1;
                    self.diag
                        .info(&format!("message logging attached to endpoint {}", endpoint.address()));
                }
                Err(e) => {
                    self.diag.error(
                        &format!("failed to attach message logging to endpoint {}", endpoint.address()),
                        Some(&e),
                    );
                    self.metrics
                        .registration_failures
                        .inc(&[("kind", e.kind().as_str())]);
                }
            }
        }

        self.sinks.prepare();
        registered
    }

    fn log_request(&self, buffer: &BufferedCopy) -> Result<CorrelationState> {
        let mut copy = buffer.replay();
        let operation = extract::operation_name(&copy);
        let endpoint = extract::endpoint_url(&copy);
        let raw = copy.read_text()?;

        let state = CorrelationState::new(operation, endpoint, raw);
        self.metrics.captures.inc(&[("direction", Direction::Request.as_str())]);

        let canonical = self.settings.sinks.wants_canonical().then(|| {
            canonical::transcode(
                state.raw_content(),
                state.operation_name(),
                state.endpoint_url(),
                Direction::Request,
            )
        });

        self.sinks.dispatch(&CapturedPayload {
            direction: Direction::Request,
            operation: state.operation_name(),
            correlation_id: state.correlation_id(),
            endpoint: state.endpoint_url(),
            captured_at: state.captured_at().with_timezone(&Local),
            raw: state.raw_content(),
            canonical: canonical.as_deref(),
        });

        Ok(state)
    }

    fn log_response(&self, buffer: &BufferedCopy, state: &CorrelationState) -> Result<()> {
        let raw = buffer.replay().read_text()?;
        self.metrics.captures.inc(&[("direction", Direction::Response.as_str())]);

        let canonical = self.settings.sinks.wants_canonical().then(|| {
            canonical::transcode(&raw, state.operation_name(), state.endpoint_url(), Direction::Response)
        });

        self.sinks.dispatch(&CapturedPayload {
            direction: Direction::Response,
            operation: state.operation_name(),
            correlation_id: state.correlation_id(),
            endpoint: state.endpoint_url(),
            captured_at: Local::now(),
            raw: &raw,
            canonical: canonical.as_deref(),
        });

        let elapsed = state.elapsed();
        self.diag.debug(&format!(
            "operation {} completed in {} ms (correlation {})",
            state.operation_name(),
            elapsed.as_millis(),
            state.correlation_id()
        ));
        self.metrics.round_trip.observe(&[], elapsed);
        Ok(())
    }

    fn capture_failed(&self, direction: Direction, err: &TapError) {
        self.diag.error(
            &format!("failed to capture {} for logging", direction.as_str()),
            Some(err),
        );
        self.metrics
            .capture_failures
            .inc(&[("direction", direction.as_str()), ("kind", err.kind().as_str())]);
    }
}

impl MessageInspector for Interceptor {
    fn after_receive_request(&self, request: &mut Message) -> Option<CallState> {
        match self.on_request_received(request) {
            Correlation::Captured(state) => Some(Box::new(state)),
            Correlation::Untracked => None,
        }
    }

    fn before_send_reply(&self, reply: &mut Message, state: Option<CallState>) {
        let correlation = state
            .and_then(|s| s.downcast::<CorrelationState>().ok())
            .map(|s| Correlation::Captured(*s))
            .unwrap_or_default();
        self.on_reply_about_to_send(reply, correlation);
    }
}
