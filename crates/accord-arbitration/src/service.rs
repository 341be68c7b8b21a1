//! # Arbitration Service Interface
//!
//! The protocol's view of the external arbitration service: quote fees, open
//! a dispute, forward evidence. Rulings flow the other way, through the
//! agreement's `rule` callback, and only [`Arbitrator::account`] may deliver
//! them.

use std::sync::Arc;

use accord_core::{ActionId, Amount, AssetId, DisputeId, ParticipantId};
use serde::{Deserialize, Serialize};

use crate::error::ArbitrationError;

/// Number of non-refusal rulings a dispute may end with.
pub const POSSIBLE_RULINGS: u8 = 2;

/// Current fee for one dispute.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DisputeFees {
    /// Asset the fee is paid in.
    pub asset: AssetId,
    /// Total fee for one dispute.
    pub amount: Amount,
}

impl DisputeFees {
    /// The half escrowed by a challenger at challenge time.
    pub fn half(&self) -> Amount {
        self.amount / 2
    }
}

/// What the service is told when a dispute is opened.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DisputeMetadata {
    /// Action under dispute.
    pub action_id: ActionId,
    /// Participant who scheduled it.
    pub submitter: ParticipantId,
    /// Participant who challenged it.
    pub challenger: ParticipantId,
    /// Arbitration content reference of the action's setting.
    pub content: String,
    /// Rulings other than refusal the service may return.
    pub possible_rulings: u8,
}

/// An external arbitration service.
pub trait Arbitrator: Send + Sync {
    /// Participant id the service delivers rulings as.
    fn account(&self) -> &ParticipantId;

    /// Fee currently charged per dispute.
    fn dispute_fees(&self) -> Result<DisputeFees, ArbitrationError>;

    /// Open a dispute and return its id. Fees have already been paid to
    /// [`Arbitrator::account`] by the time this is called.
    fn open_dispute(&self, metadata: &DisputeMetadata) -> Result<DisputeId, ArbitrationError>;

    /// Forward one piece of evidence from `party`.
    fn submit_evidence(
        &self,
        dispute_id: DisputeId,
        party: &ParticipantId,
        evidence: &str,
        finished: bool,
    ) -> Result<(), ArbitrationError>;
}

impl<T: Arbitrator + ?Sized> Arbitrator for Arc<T> {
    fn account(&self) -> &ParticipantId {
        (**self).account()
    }

    fn dispute_fees(&self) -> Result<DisputeFees, ArbitrationError> {
        (**self).dispute_fees()
    }

    fn open_dispute(&self, metadata: &DisputeMetadata) -> Result<DisputeId, ArbitrationError> {
        (**self).open_dispute(metadata)
    }

    fn submit_evidence(
        &self,
        dispute_id: DisputeId,
        party: &ParticipantId,
        evidence: &str,
        finished: bool,
    ) -> Result<(), ArbitrationError> {
        (**self).submit_evidence(dispute_id, party, evidence, finished)
    }
}
