//! Ledger and value-transfer errors.

use accord_core::{Amount, AssetId, ParticipantId};
use thiserror::Error;

/// Failure reported by the external value-transfer collaborator.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum TransferError {
    /// The holder does not have enough of the asset.
    #[error("holder {holder} has {held} {asset}, needs {needed}")]
    InsufficientFunds {
        /// Holder being debited.
        holder: ParticipantId,
        /// Asset being moved.
        asset: AssetId,
        /// Amount required.
        needed: Amount,
        /// Amount the holder has.
        held: Amount,
    },

    /// The collaborator refused the transfer.
    #[error("transfer rejected: {reason}")]
    Rejected {
        /// Collaborator-supplied reason.
        reason: String,
    },
}

/// Balance errors raised by the staking ledger.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum LedgerError {
    /// A zero amount was passed to an operation that requires value.
    #[error("{operation}: amount must be greater than zero")]
    ZeroAmount {
        /// Operation that rejected the amount.
        operation: &'static str,
    },

    /// Not enough available balance.
    #[error("{participant} has {available} {asset} available, needs {requested}")]
    InsufficientAvailable {
        /// Participant being debited.
        participant: ParticipantId,
        /// Asset.
        asset: AssetId,
        /// Amount requested.
        requested: Amount,
        /// Amount available.
        available: Amount,
    },

    /// A partition move found less than expected in its source partition.
    #[error("{participant} has {held} {asset} {partition}, needs {requested}")]
    InsufficientPartition {
        /// Participant being debited.
        participant: ParticipantId,
        /// Asset.
        asset: AssetId,
        /// Source partition name.
        partition: &'static str,
        /// Amount requested.
        requested: Amount,
        /// Amount held in the partition.
        held: Amount,
    },

    /// Protocol escrow does not hold enough of the asset.
    #[error("escrow holds {held} {asset}, needs {requested}")]
    InsufficientEscrow {
        /// Asset.
        asset: AssetId,
        /// Amount requested.
        requested: Amount,
        /// Amount held in escrow.
        held: Amount,
    },

    /// The resulting available balance would be strictly between zero and
    /// the collateral floor.
    #[error("{participant} would keep {remaining} {asset} available, below the collateral floor of {floor}")]
    BelowCollateralFloor {
        /// Participant.
        participant: ParticipantId,
        /// Asset.
        asset: AssetId,
        /// Available balance the operation would leave.
        remaining: Amount,
        /// Current collateral floor.
        floor: Amount,
    },

    /// Checked arithmetic overflowed.
    #[error("{operation}: arithmetic overflow")]
    Overflow {
        /// Operation that overflowed.
        operation: &'static str,
    },

    /// The value-transfer collaborator failed.
    #[error("value transfer failed: {0}")]
    Transfer(#[from] TransferError),
}

impl LedgerError {
    /// Whether the failure came from the external collaborator rather than
    /// from the ledger's own balance rules.
    pub fn is_external(&self) -> bool {
        matches!(self, LedgerError::Transfer(_))
    }
}
