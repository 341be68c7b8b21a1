//! # Agreement Error Types
//!
//! Every rejected operation surfaces synchronously as an [`AgreementError`]
//! with no state change. Errors fall into the classes reported by
//! [`AgreementError::kind`]:
//!
//! | Kind | Meaning |
//! |------|---------|
//! | `Authorization` | caller is not the party the operation requires |
//! | `NotFound` | unknown action, dispute or setting |
//! | `State` | operation not legal in the current composite state |
//! | `Balance` | insufficient funds, zero amount, collateral floor |
//! | `External` | value transfer, arbitration or payload call failed |
//! | `Validation` | malformed input such as an undefined ruling code |
//!
//! Nothing is retried by the protocol.

use accord_arbitration::ArbitrationError;
use accord_core::{ActionId, DisputeId, ParticipantId, SettingId};
use accord_staking::LedgerError;
use accord_state::StateError;
use serde::Serialize;
use thiserror::Error;

use crate::payload::PayloadError;
use crate::permissions::Role;

/// Error class, used by callers to map failures onto their own surface.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum ErrorKind {
    /// Wrong caller.
    Authorization,
    /// Unknown identifier.
    NotFound,
    /// Illegal in the current state.
    State,
    /// Balance rule violated.
    Balance,
    /// Collaborator failure.
    External,
    /// Malformed input.
    Validation,
}

impl ErrorKind {
    /// Canonical string name.
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Authorization => "AUTHORIZATION",
            Self::NotFound => "NOT_FOUND",
            Self::State => "STATE",
            Self::Balance => "BALANCE",
            Self::External => "EXTERNAL",
            Self::Validation => "VALIDATION",
        }
    }
}

/// Errors returned by agreement operations.
#[derive(Error, Debug)]
pub enum AgreementError {
    // ── Authorization ───────────────────────────────────────────────
    /// The caller is not the party this operation requires.
    #[error("{sender} is not allowed to {operation}")]
    SenderNotAllowed {
        /// Operation attempted.
        operation: &'static str,
        /// Caller.
        sender: ParticipantId,
    },

    /// The caller lacks a role.
    #[error("{participant} lacks the {role} permission")]
    MissingPermission {
        /// Role required.
        role: Role,
        /// Caller.
        participant: ParticipantId,
    },

    // ── Not found ───────────────────────────────────────────────────
    /// No action with this id.
    #[error("{action_id} does not exist")]
    ActionNotFound {
        /// Requested id.
        action_id: ActionId,
    },

    /// No action is associated with this dispute.
    #[error("{dispute_id} does not exist")]
    DisputeNotFound {
        /// Requested id.
        dispute_id: DisputeId,
    },

    /// No setting with this id.
    #[error("{setting_id} does not exist")]
    SettingNotFound {
        /// Requested id.
        setting_id: SettingId,
    },

    /// The action was never challenged.
    #[error("{action_id} has not been challenged")]
    NoChallenge {
        /// Action.
        action_id: ActionId,
    },

    /// The action's challenge was never disputed.
    #[error("{action_id} has not been disputed")]
    NoDispute {
        /// Action.
        action_id: ActionId,
    },

    // ── State ───────────────────────────────────────────────────────
    /// Cancel is not legal now.
    #[error("cannot cancel {action_id} in state {state}")]
    CannotCancel {
        /// Action.
        action_id: ActionId,
        /// Composite state.
        state: String,
    },

    /// Challenge is not legal now.
    #[error("cannot challenge {action_id} in state {state}")]
    CannotChallenge {
        /// Action.
        action_id: ActionId,
        /// Composite state.
        state: String,
    },

    /// Settle is not legal now.
    #[error("cannot settle {action_id} in state {state}")]
    CannotSettle {
        /// Action.
        action_id: ActionId,
        /// Composite state.
        state: String,
    },

    /// Dispute is not legal now.
    #[error("cannot dispute {action_id} in state {state}")]
    CannotDispute {
        /// Action.
        action_id: ActionId,
        /// Composite state.
        state: String,
    },

    /// Rule is not legal now.
    #[error("cannot rule on {action_id} in state {state}")]
    CannotRule {
        /// Action.
        action_id: ActionId,
        /// Composite state.
        state: String,
    },

    /// Evidence submission is not legal now.
    #[error("cannot submit evidence for {action_id} in state {state}")]
    CannotSubmitEvidence {
        /// Action.
        action_id: ActionId,
        /// Composite state.
        state: String,
    },

    /// Execute is not legal now.
    #[error("cannot execute {action_id} in state {state}")]
    CannotExecute {
        /// Action.
        action_id: ActionId,
        /// Composite state.
        state: String,
    },

    /// The submitter already declared its evidence finished.
    #[error("submitter has finished submitting evidence for {action_id}")]
    SubmitterFinishedEvidence {
        /// Action.
        action_id: ActionId,
    },

    /// The challenger already declared its evidence finished.
    #[error("challenger has finished submitting evidence for {action_id}")]
    ChallengerFinishedEvidence {
        /// Action.
        action_id: ActionId,
    },

    /// The signer already signed the current setting.
    #[error("{participant} already signed {setting_id}")]
    AlreadySigned {
        /// Signer.
        participant: ParticipantId,
        /// Current setting.
        setting_id: SettingId,
    },

    // ── Validation ──────────────────────────────────────────────────
    /// Undefined ruling code, or `Missing` delivered as a final ruling.
    #[error("invalid ruling code {code}")]
    InvalidRuling {
        /// Rejected code.
        code: u8,
    },

    /// Any other state machine rejection.
    #[error("state error: {0}")]
    State(StateError),

    // ── Balance / external ──────────────────────────────────────────
    /// Ledger rejection or value-transfer failure.
    #[error("ledger error: {0}")]
    Ledger(#[from] LedgerError),

    /// Arbitration service failure.
    #[error("arbitration error: {0}")]
    Arbitration(#[from] ArbitrationError),

    /// Payload failure.
    #[error("payload error: {0}")]
    Payload(#[from] PayloadError),
}

impl From<StateError> for AgreementError {
    fn from(err: StateError) -> Self {
        match err {
            StateError::SettingNotFound { id } => Self::SettingNotFound { setting_id: id },
            StateError::InvalidRuling { code } => Self::InvalidRuling { code },
            other => Self::State(other),
        }
    }
}

impl AgreementError {
    /// The error's class.
    pub fn kind(&self) -> ErrorKind {
        match self {
            Self::SenderNotAllowed { .. } | Self::MissingPermission { .. } => {
                ErrorKind::Authorization
            }
            Self::ActionNotFound { .. }
            | Self::DisputeNotFound { .. }
            | Self::SettingNotFound { .. }
            | Self::NoChallenge { .. }
            | Self::NoDispute { .. } => ErrorKind::NotFound,
            Self::CannotCancel { .. }
            | Self::CannotChallenge { .. }
            | Self::CannotSettle { .. }
            | Self::CannotDispute { .. }
            | Self::CannotRule { .. }
            | Self::CannotSubmitEvidence { .. }
            | Self::CannotExecute { .. }
            | Self::SubmitterFinishedEvidence { .. }
            | Self::ChallengerFinishedEvidence { .. }
            | Self::AlreadySigned { .. } => ErrorKind::State,
            Self::InvalidRuling { .. } => ErrorKind::Validation,
            Self::State(StateError::InvalidSetting { .. }) => ErrorKind::Validation,
            Self::State(_) => ErrorKind::State,
            Self::Ledger(e) if e.is_external() => ErrorKind::External,
            Self::Ledger(_) => ErrorKind::Balance,
            Self::Arbitration(_) | Self::Payload(_) => ErrorKind::External,
        }
    }

    /// Stable machine-readable code for this variant.
    pub fn code(&self) -> &'static str {
        match self {
            Self::SenderNotAllowed { .. } => "SENDER_NOT_ALLOWED",
            Self::MissingPermission { .. } => "MISSING_PERMISSION",
            Self::ActionNotFound { .. } => "ACTION_DOES_NOT_EXIST",
            Self::DisputeNotFound { .. } => "DISPUTE_DOES_NOT_EXIST",
            Self::SettingNotFound { .. } => "SETTING_DOES_NOT_EXIST",
            Self::NoChallenge { .. } => "CHALLENGE_DOES_NOT_EXIST",
            Self::NoDispute { .. } => "DISPUTE_NOT_OPENED",
            Self::CannotCancel { .. } => "CANNOT_CANCEL_ACTION",
            Self::CannotChallenge { .. } => "CANNOT_CHALLENGE_ACTION",
            Self::CannotSettle { .. } => "CANNOT_SETTLE_ACTION",
            Self::CannotDispute { .. } => "CANNOT_DISPUTE_ACTION",
            Self::CannotRule { .. } => "CANNOT_RULE_ACTION",
            Self::CannotSubmitEvidence { .. } => "CANNOT_SUBMIT_EVIDENCE",
            Self::CannotExecute { .. } => "CANNOT_EXECUTE_ACTION",
            Self::SubmitterFinishedEvidence { .. } => "SUBMITTER_FINISHED_EVIDENCE",
            Self::ChallengerFinishedEvidence { .. } => "CHALLENGER_FINISHED_EVIDENCE",
            Self::AlreadySigned { .. } => "SIGNER_ALREADY_SIGNED",
            Self::InvalidRuling { .. } => "INVALID_RULING",
            Self::State(_) => "INVALID_STATE",
            Self::Ledger(LedgerError::ZeroAmount { .. }) => "INVALID_AMOUNT",
            Self::Ledger(LedgerError::InsufficientAvailable { .. }) => "NOT_ENOUGH_AVAILABLE_BALANCE",
            Self::Ledger(LedgerError::BelowCollateralFloor { .. }) => "BELOW_COLLATERAL_AMOUNT",
            Self::Ledger(LedgerError::Transfer(_)) => "VALUE_TRANSFER_FAILED",
            Self::Ledger(_) => "LEDGER_ERROR",
            Self::Arbitration(_) => "ARBITRATION_FAILED",
            Self::Payload(_) => "PAYLOAD_FAILED",
        }
    }
}
