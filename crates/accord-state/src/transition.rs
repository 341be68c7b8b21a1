//! Audit records shared by every state machine in this crate.

use accord_core::Timestamp;
use serde::{Deserialize, Serialize};

/// Record of one state transition.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TransitionRecord<S> {
    /// State before the transition.
    pub from_state: S,
    /// State after the transition.
    pub to_state: S,
    /// When the transition occurred.
    pub timestamp: Timestamp,
    /// Why it occurred.
    pub reason: String,
}
