//! soaptap inspector.
//!
//! Message-inspection layer for SOAP hosts: the interception pipeline, its
//! sinks and configuration, plus a small axum host used by the binary and
//! the integration tests.

pub mod app_state;
pub mod config;
pub mod diag;
pub mod dispatch;
pub mod host;
pub mod obs;
pub mod pipeline;
pub mod router;
pub mod services;
pub mod sink;
pub mod transport;

pub use pipeline::{Correlation, CorrelationState, Interceptor};
