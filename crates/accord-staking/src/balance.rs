//! Per-participant, per-asset balance partitions.

use accord_core::{Amount, AssetId, ParticipantId};
use serde::{Deserialize, Serialize};

/// The three partitions of a participant's stake in one asset.
///
/// - `available`: free to lock or unstake.
/// - `locked`: collateral backing scheduled actions.
/// - `challenged`: collateral backing actions under challenge.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Balance {
    /// Free balance.
    pub available: Amount,
    /// Collateral of scheduled actions.
    pub locked: Amount,
    /// Collateral of challenged actions.
    pub challenged: Amount,
}

impl Balance {
    /// Sum of all partitions, `None` on overflow.
    pub fn total(&self) -> Option<Amount> {
        self.available
            .checked_add(self.locked)?
            .checked_add(self.challenged)
    }

    /// True when every partition is zero.
    pub fn is_empty(&self) -> bool {
        self.available == 0 && self.locked == 0 && self.challenged == 0
    }
}

/// Running totals of value that entered and left the protocol for one asset.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct FlowTotals {
    /// Value ever staked or escrowed in.
    pub total_in: Amount,
    /// Value ever unstaked, paid out or slashed out.
    pub total_out: Amount,
}

impl FlowTotals {
    /// Net value the protocol should be holding.
    pub fn net(&self) -> Option<Amount> {
        self.total_in.checked_sub(self.total_out)
    }
}

/// A flattened balance row, used for reports and snapshots.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct BalanceEntry {
    /// Owner.
    pub participant: ParticipantId,
    /// Asset.
    pub asset: AssetId,
    /// Partitions.
    #[serde(flatten)]
    pub balance: Balance,
}

/// Result of reconciling one asset's balances against its flow totals.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ConservationReport {
    /// Asset audited.
    pub asset: AssetId,
    /// Sum of every participant's partitions.
    pub participant_total: Amount,
    /// Protocol-held escrow.
    pub escrow: Amount,
    /// Flow totals.
    pub flows: FlowTotals,
}

impl ConservationReport {
    /// `participant_total + escrow == total_in - total_out`.
    pub fn holds(&self) -> bool {
        match (self.participant_total.checked_add(self.escrow), self.flows.net()) {
            (Some(held), Some(net)) => held == net,
            _ => false,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn total_sums_partitions() {
        let b = Balance {
            available: 10,
            locked: 20,
            challenged: 30,
        };
        assert_eq!(b.total(), Some(60));
        assert!(!b.is_empty());
        assert!(Balance::default().is_empty());
    }

    #[test]
    fn total_overflow_is_none() {
        let b = Balance {
            available: Amount::MAX,
            locked: 1,
            challenged: 0,
        };
        assert_eq!(b.total(), None);
    }

    #[test]
    fn conservation_report_holds() {
        let report = ConservationReport {
            asset: AssetId::new("DAI").unwrap(),
            participant_total: 70,
            escrow: 30,
            flows: FlowTotals {
                total_in: 150,
                total_out: 50,
            },
        };
        assert!(report.holds());
        let broken = ConservationReport {
            escrow: 31,
            ..report
        };
        assert!(!broken.holds());
    }

    #[test]
    fn balance_entry_flattens() {
        let entry = BalanceEntry {
            participant: ParticipantId::new("alice").unwrap(),
            asset: AssetId::new("DAI").unwrap(),
            balance: Balance {
                available: 1,
                locked: 2,
                challenged: 3,
            },
        };
        let json = serde_json::to_value(&entry).unwrap();
        assert_eq!(json["available"], 1);
        assert_eq!(json["participant"], "alice");
    }
}
