//! # Error Types: Primitive Construction Failures
//!
//! Errors raised while building core primitives from untrusted input.
//! Protocol-level failures live in the crates that own the protocol state.

use thiserror::Error;

/// Error constructing a core primitive.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum CoreError {
    /// An identifier string was empty or contained forbidden characters.
    #[error("invalid {kind} identifier {value:?}: {reason}")]
    InvalidIdentifier {
        /// Identifier namespace, e.g. `participant`.
        kind: &'static str,
        /// The rejected input.
        value: String,
        /// Why it was rejected.
        reason: String,
    },

    /// A timestamp could not be parsed or was out of range.
    #[error("invalid timestamp: {0}")]
    InvalidTimestamp(String),

    /// Adding a period to a timestamp overflowed the representable range.
    #[error("time overflow adding {secs}s to {base}")]
    TimeOverflow {
        /// Base instant, ISO8601.
        base: String,
        /// Seconds being added.
        secs: u64,
    },
}
