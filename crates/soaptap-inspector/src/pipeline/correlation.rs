use std::time::{Duration, Instant};

use chrono::{DateTime, Utc};
use uuid::Uuid;

/// What the request phase learned about one call, handed back at the reply
/// phase. Immutable once created.
#[derive(Debug, Clone)]
pub struct CorrelationState {
    correlation_id: String,
    operation_name: String,
    endpoint_url: String,
    captured_at: DateTime<Utc>,
    started: Instant,
    raw_content: String,
}

impl CorrelationState {
    pub(crate) fn new(operation_name: String, endpoint_url: String, raw_content: String) -> Self {
        Self {
            correlation_id: Uuid::new_v4().to_string(),
            operation_name,
            endpoint_url,
            captured_at: Utc::now(),
            started: Instant::now(),
            raw_content,
        }
    }

    pub fn correlation_id(&self) -> &str {
        &self.correlation_id
    }

    pub fn operation_name(&self) -> &str {
        &self.operation_name
    }

    pub fn endpoint_url(&self) -> &str {
        &self.endpoint_url
    }

    pub fn captured_at(&self) -> DateTime<Utc> {
        self.captured_at
    }

    pub fn raw_content(&self) -> &str {
        &self.raw_content
    }

    /// Monotonic time since the request was captured.
    pub fn elapsed(&self) -> Duration {
        self.started.elapsed()
    }
}

/// Result of the request phase.
///
/// `Untracked` covers a closed logging gate and any internal failure; the
/// reply phase treats it as a no-op.
#[derive(Debug, Clone, Default)]
pub enum Correlation {
    #[default]
    Untracked,
    Captured(CorrelationState),
}

impl Correlation {
    pub fn is_tracked(&self) -> bool {
        matches!(self, Correlation::Captured(_))
    }

    pub fn state(&self) -> Option<&CorrelationState> {
        match self {
            Correlation::Captured(state) => Some(state),
            Correlation::Untracked => None,
        }
    }

    pub fn into_state(self) -> Option<CorrelationState> {
        match self {
            Correlation::Captured(state) => Some(state),
            Correlation::Untracked => None,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn ids_are_unique_per_call() {
        let a = CorrelationState::new("Add".into(), "http://h/s".into(), "<a/>".into());
        let b = CorrelationState::new("Add".into(), "http://h/s".into(), "<a/>".into());
        assert_ne!(a.correlation_id(), b.correlation_id());
        assert_eq!(a.correlation_id().len(), 36);
    }

    #[test]
    fn untracked_has_no_state() {
        assert!(!Correlation::default().is_tracked());
        assert!(Correlation::Untracked.into_state().is_none());
    }
}
