//! soaptap core: transport-agnostic message primitives, error types, and the
//! canonical envelope transcoder.
//!
//! This crate defines the message abstraction the interception pipeline works
//! against (single-consumption bodies plus bounded buffered replay), the safe
//! label extractors, and the SOAP rewriting algorithm. It carries no runtime,
//! filesystem, or console dependencies so hosts can embed it directly.
//!
//! # Defensive guarantees
//! Panics, `unwrap`, and `expect` are compile-denied here
//! (`#![deny(clippy::panic, clippy::unwrap_used, clippy::expect_used)]`).
//! Every fallible path surfaces as `TapError`/`Result`; callers decide how to
//! fail open.

#![deny(clippy::unwrap_used)]
#![deny(clippy::expect_used)]
#![deny(clippy::panic)]

pub mod canonical;
pub mod error;
pub mod extract;
pub mod message;

/// Shared result type.
pub use error::{ErrorKind, Result, TapError};
pub use message::{BufferedCopy, Direction, Headers, Message};
