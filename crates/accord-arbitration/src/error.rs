//! # Arbitration Error Types
//!
//! Failures reported by the external arbitration service. Each variant names
//! the operation that failed so operators can tell a fee quote failure from
//! an evidence forwarding failure without reading logs.

use accord_core::DisputeId;
use thiserror::Error;

/// Errors arising from calls to the arbitration service.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum ArbitrationError {
    /// The service could not be reached or refused the call.
    #[error("arbitration service unavailable during {operation}: {reason}")]
    Unavailable {
        /// The call that failed, e.g. `open_dispute`.
        operation: &'static str,
        /// Service-supplied reason.
        reason: String,
    },

    /// The service does not know this dispute.
    #[error("arbitration service has no record of {dispute_id}")]
    UnknownDispute {
        /// The dispute id.
        dispute_id: DisputeId,
    },

    /// The service handed out a dispute id it had already issued.
    #[error("arbitration service reissued {dispute_id}")]
    DuplicateDispute {
        /// The reissued id.
        dispute_id: DisputeId,
    },

    /// The dispute no longer accepts evidence.
    #[error("{dispute_id} is closed to evidence")]
    DisputeClosed {
        /// The dispute id.
        dispute_id: DisputeId,
    },
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn unavailable_names_operation() {
        let err = ArbitrationError::Unavailable {
            operation: "open_dispute",
            reason: "timeout".into(),
        };
        let msg = format!("{err}");
        assert!(msg.contains("open_dispute"));
        assert!(msg.contains("timeout"));
    }

    #[test]
    fn unknown_dispute_display() {
        let err = ArbitrationError::UnknownDispute {
            dispute_id: DisputeId(4),
        };
        assert!(format!("{err}").contains("dispute:4"));
    }
}
