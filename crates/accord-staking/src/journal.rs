//! # Transfer Journal: Compensation for Aborted Operations
//!
//! A protocol operation may perform several external transfers before one of
//! its later steps fails. The journal records each transfer that succeeded so
//! that an abort can run the inverse transfers in reverse order.
//!
//! Compensation outcomes are kept as [`CompensationRecord`]s. A failed
//! compensation keeps its error detail; it is reported, never swallowed.

use accord_core::{Amount, AssetId, ParticipantId};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::transfer::ValueTransfer;

/// Direction of an external transfer relative to protocol custody.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum TransferDirection {
    /// Holder to custody.
    In,
    /// Custody to holder.
    Out,
}

impl TransferDirection {
    /// The inverse direction.
    pub fn inverse(self) -> Self {
        match self {
            Self::In => Self::Out,
            Self::Out => Self::In,
        }
    }

    /// `"IN"` or `"OUT"`.
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::In => "IN",
            Self::Out => "OUT",
        }
    }
}

/// An external transfer that completed.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TransferRecord {
    /// Direction.
    pub direction: TransferDirection,
    /// External holder on the other side of the transfer.
    pub party: ParticipantId,
    /// Asset moved.
    pub asset: AssetId,
    /// Amount moved.
    pub amount: Amount,
}

impl TransferRecord {
    fn apply(&self, transfer: &dyn ValueTransfer, direction: TransferDirection) -> Result<(), String> {
        let result = match direction {
            TransferDirection::In => transfer.transfer_in(&self.party, &self.asset, self.amount),
            TransferDirection::Out => transfer.transfer_out(&self.party, &self.asset, self.amount),
        };
        result.map_err(|e| e.to_string())
    }
}

impl std::fmt::Display for TransferRecord {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(
            f,
            "{} {} {} ({})",
            self.direction.as_str(),
            self.amount,
            self.asset,
            self.party
        )
    }
}

/// Outcome of undoing one journaled transfer.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CompensationRecord {
    /// The transfer being undone.
    pub original: TransferRecord,
    /// Whether the inverse transfer succeeded.
    pub succeeded: bool,
    /// Collaborator error if it did not.
    pub error_detail: Option<String>,
    /// When the compensation ran.
    pub timestamp: DateTime<Utc>,
}

/// Ordered log of completed external transfers within one operation.
#[derive(Debug, Default)]
pub struct TransferJournal {
    entries: Vec<TransferRecord>,
}

impl TransferJournal {
    /// Empty journal.
    pub fn new() -> Self {
        Self::default()
    }

    /// Record a completed transfer.
    pub fn record(&mut self, record: TransferRecord) {
        self.entries.push(record);
    }

    /// Completed transfers, oldest first.
    pub fn entries(&self) -> &[TransferRecord] {
        &self.entries
    }

    /// Whether nothing was transferred.
    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Forget every entry without compensating. Called on commit.
    pub fn clear(&mut self) {
        self.entries.clear();
    }

    /// Run the inverse of every entry, newest first, and drain the journal.
    pub fn compensate(&mut self, transfer: &dyn ValueTransfer) -> Vec<CompensationRecord> {
        let mut log = Vec::with_capacity(self.entries.len());
        while let Some(original) = self.entries.pop() {
            let outcome = original.apply(transfer, original.direction.inverse());
            match &outcome {
                Ok(()) => tracing::warn!(transfer = %original, "compensated external transfer"),
                Err(detail) => tracing::error!(
                    transfer = %original,
                    error = %detail,
                    "compensation of external transfer failed"
                ),
            }
            log.push(CompensationRecord {
                original,
                succeeded: outcome.is_ok(),
                error_detail: outcome.err(),
                timestamp: Utc::now(),
            });
        }
        log
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::transfer::InMemoryTransfer;

    fn p(s: &str) -> ParticipantId {
        ParticipantId::new(s).unwrap()
    }

    fn dai() -> AssetId {
        AssetId::new("DAI").unwrap()
    }

    #[test]
    fn compensation_runs_in_reverse_and_restores_wallets() {
        let t = InMemoryTransfer::new();
        t.credit(&p("alice"), &dai(), 100);
        let mut journal = TransferJournal::new();

        t.transfer_in(&p("alice"), &dai(), 70).unwrap();
        journal.record(TransferRecord {
            direction: TransferDirection::In,
            party: p("alice"),
            asset: dai(),
            amount: 70,
        });
        t.transfer_out(&p("bob"), &dai(), 20).unwrap();
        journal.record(TransferRecord {
            direction: TransferDirection::Out,
            party: p("bob"),
            asset: dai(),
            amount: 20,
        });

        let log = journal.compensate(&t);
        assert_eq!(log.len(), 2);
        assert_eq!(log[0].original.party, p("bob"));
        assert!(log.iter().all(|r| r.succeeded));
        assert!(journal.is_empty());
        assert_eq!(t.balance_of(&p("alice"), &dai()), 100);
        assert_eq!(t.balance_of(&p("bob"), &dai()), 0);
        assert_eq!(t.custody(&dai()), 0);
    }

    #[test]
    fn failed_compensation_keeps_error_detail() {
        let t = InMemoryTransfer::new();
        let mut journal = TransferJournal::new();
        // Nothing in custody, so undoing an inbound transfer cannot pay out.
        journal.record(TransferRecord {
            direction: TransferDirection::In,
            party: p("alice"),
            asset: dai(),
            amount: 5,
        });
        let log = journal.compensate(&t);
        assert_eq!(log.len(), 1);
        assert!(!log[0].succeeded);
        assert!(log[0].error_detail.as_deref().unwrap_or("").contains("custody"));
    }

    #[test]
    fn direction_inverse() {
        assert_eq!(TransferDirection::In.inverse(), TransferDirection::Out);
        assert_eq!(TransferDirection::Out.inverse(), TransferDirection::In);
    }
}
