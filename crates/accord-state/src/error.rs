//! State machine errors.

use accord_core::SettingId;
use thiserror::Error;

use crate::dispute::Party;

/// Errors raised by the settings registry and the action, challenge and
/// dispute state machines.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum StateError {
    /// Attempted transition is not valid from the current state.
    #[error("invalid {machine} transition: {from} -> {to}")]
    InvalidTransition {
        /// Which machine: `action`, `challenge` or `dispute`.
        machine: &'static str,
        /// Current state.
        from: String,
        /// Attempted target state.
        to: String,
    },

    /// The machine is in a terminal state.
    #[error("{machine} is in terminal state {state}")]
    TerminalState {
        /// Which machine.
        machine: &'static str,
        /// The terminal state.
        state: String,
    },

    /// The action has not been challenged.
    #[error("action has no challenge")]
    NoChallenge,

    /// The challenge has not been disputed.
    #[error("challenge has no dispute")]
    NoDispute,

    /// No setting with this id.
    #[error("{id} does not exist")]
    SettingNotFound {
        /// Requested id.
        id: SettingId,
    },

    /// Setting parameters failed validation.
    #[error("invalid setting: {reason}")]
    InvalidSetting {
        /// What was wrong.
        reason: String,
    },

    /// The party already declared its evidence finished.
    #[error("{party} has finished submitting evidence")]
    EvidenceFinished {
        /// Party that tried to submit.
        party: Party,
    },

    /// A ruling code outside the defined set, or `Missing` delivered as a
    /// final ruling.
    #[error("invalid ruling code {code}")]
    InvalidRuling {
        /// The rejected code.
        code: u8,
    },
}
