//! Output destinations for captured payloads.
//!
//! Two payload variants (raw, canonical) can each go to two destinations
//! (console, file). Every combination is gated by its own toggle and fails
//! independently.

pub mod console;
pub mod dispatcher;
pub mod file;

use chrono::{DateTime, Local};
use soaptap_core::Direction;

pub use console::ConsoleSink;
pub use dispatcher::SinkDispatcher;
pub use file::{FileSink, LogDirectory};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Variant {
    Raw,
    Canonical,
}

impl Variant {
    pub fn as_str(self) -> &'static str {
        match self {
            Variant::Raw => "raw",
            Variant::Canonical => "canonical",
        }
    }
}

/// Short tag used in file names, e.g. `canonical-request`.
pub fn type_tag(variant: Variant, direction: Direction) -> String {
    format!("{}-{}", variant.as_str(), direction.as_str())
}

/// One captured message, ready for the sinks.
#[derive(Debug, Clone, Copy)]
pub struct CapturedPayload<'a> {
    pub direction: Direction,
    pub operation: &'a str,
    pub correlation_id: &'a str,
    pub endpoint: &'a str,
    pub captured_at: DateTime<Local>,
    pub raw: &'a str,
    /// Present only when a canonical output is enabled.
    pub canonical: Option<&'a str>,
}
