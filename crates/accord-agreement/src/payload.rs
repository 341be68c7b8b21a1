//! Payload collaborator: whatever an approved action ultimately runs.

use std::collections::BTreeSet;

use parking_lot::Mutex;
use thiserror::Error;

/// Failure reported by a payload runner.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum PayloadError {
    /// The payload ran and failed.
    #[error("payload {payload_ref} failed: {reason}")]
    Failed {
        /// Payload reference.
        payload_ref: String,
        /// Runner-supplied reason.
        reason: String,
    },
}

/// Runs the payload of an executed action.
pub trait PayloadRunner: Send + Sync {
    /// Run `payload_ref`. Invoked only from `execute`.
    fn run(&self, payload_ref: &str) -> Result<(), PayloadError>;
}

/// Records every payload it runs; configured references fail.
#[derive(Debug, Default)]
pub struct RecordingPayloadRunner {
    executed: Mutex<Vec<String>>,
    failing: Mutex<BTreeSet<String>>,
}

impl RecordingPayloadRunner {
    /// Runner that succeeds on everything.
    pub fn new() -> Self {
        Self::default()
    }

    /// Make `payload_ref` fail from now on.
    pub fn fail_on(&self, payload_ref: impl Into<String>) {
        self.failing.lock().insert(payload_ref.into());
    }

    /// Let `payload_ref` succeed again.
    pub fn clear_failure(&self, payload_ref: &str) {
        self.failing.lock().remove(payload_ref);
    }

    /// Payloads run successfully, in order.
    pub fn executed(&self) -> Vec<String> {
        self.executed.lock().clone()
    }
}

impl PayloadRunner for RecordingPayloadRunner {
    fn run(&self, payload_ref: &str) -> Result<(), PayloadError> {
        if self.failing.lock().contains(payload_ref) {
            return Err(PayloadError::Failed {
                payload_ref: payload_ref.to_string(),
                reason: "configured to fail".into(),
            });
        }
        self.executed.lock().push(payload_ref.to_string());
        Ok(())
    }
}
