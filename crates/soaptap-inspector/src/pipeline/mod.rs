//! Request/reply interception.
//!
//! The request phase buffers the inbound message, logs it and returns a
//! `Correlation`; the reply phase consumes that correlation, logs the reply
//! and reports the round trip. Both phases swap in a replay of what they
//! read so the host always delivers the original content.

pub mod correlation;
pub mod gate;
pub mod interceptor;

pub use correlation::{Correlation, CorrelationState};
pub use gate::{AttachedDebugger, ForcedInspection, InspectionSignal, NoInspection, DEBUGGER_RECHECK};
pub use interceptor::{Interceptor, InterceptorBuilder};
