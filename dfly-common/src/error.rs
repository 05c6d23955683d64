//! Shared error model for cross-crate APIs.

use std::io;

use thiserror::Error;

/// Unified result type used by all public interfaces in `dragonfly-rs`.
pub type DflyResult<T> = Result<T, DflyError>;

/// High-level error categories surfaced by the facade crates.
///
/// Reply encoders never return these from `send_*` calls. Transport failures are kept as a
/// sticky code on the encoder and only turn into [`DflyError::SinkWrite`] when the connection
/// layer asks for it.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum DflyError {
    /// Configuration is invalid for the requested operation.
    #[error("invalid configuration: {0}")]
    InvalidConfig(&'static str),

    /// A reply sink write failed earlier; the peer connection should be treated as dead.
    #[error("reply sink write failed: {0}")]
    SinkWrite(io::ErrorKind),
}
