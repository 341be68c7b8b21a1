//! # In-Memory Arbitration Service
//!
//! A deterministic stand-in for the external arbitration service. It
//! allocates sequential dispute ids from 0, records metadata and every
//! forwarded evidence item, lets tests change the quoted fee, and can be told
//! to fail individual calls.
//!
//! It never rules on its own. Whoever drives it (a test, the HTTP callback
//! route, the scenario simulator) delivers rulings to the agreement as
//! [`Arbitrator::account`].

use std::collections::BTreeMap;

use accord_core::{DisputeId, ParticipantId};
use parking_lot::Mutex;
use serde::{Deserialize, Serialize};

use crate::error::ArbitrationError;
use crate::service::{Arbitrator, DisputeFees, DisputeMetadata};

/// Evidence as received by the service.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ReceivedEvidence {
    /// Submitting participant.
    pub party: ParticipantId,
    /// Payload.
    pub evidence: String,
    /// Whether the party declared itself finished.
    pub finished: bool,
}

/// One dispute as the service sees it.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DisputeRecord {
    /// Metadata supplied on open.
    pub metadata: DisputeMetadata,
    /// Fee quoted when the dispute was opened.
    pub fees: DisputeFees,
    /// Evidence received, oldest first.
    pub evidence: Vec<ReceivedEvidence>,
}

/// Which calls to fail.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct FailurePlan {
    /// Fail `dispute_fees`.
    pub quote: bool,
    /// Fail `open_dispute`.
    pub open: bool,
    /// Fail `submit_evidence`.
    pub evidence: bool,
    /// Have `open_dispute` return the previously issued id again.
    pub reissue_ids: bool,
}

#[derive(Debug)]
struct Court {
    fees: DisputeFees,
    next_id: u64,
    disputes: BTreeMap<DisputeId, DisputeRecord>,
    failures: FailurePlan,
}

/// In-memory arbitration service.
#[derive(Debug)]
pub struct InMemoryArbitrator {
    account: ParticipantId,
    court: Mutex<Court>,
}

impl InMemoryArbitrator {
    /// A service that rules as `account` and charges `fees` per dispute.
    pub fn new(account: ParticipantId, fees: DisputeFees) -> Self {
        Self {
            account,
            court: Mutex::new(Court {
                fees,
                next_id: 0,
                disputes: BTreeMap::new(),
                failures: FailurePlan::default(),
            }),
        }
    }

    /// Change the fee quoted for future disputes.
    pub fn set_fees(&self, fees: DisputeFees) {
        tracing::debug!(asset = %fees.asset, amount = fees.amount, "arbitration fees changed");
        self.court.lock().fees = fees;
    }

    /// Replace the failure plan.
    pub fn set_failures(&self, failures: FailurePlan) {
        self.court.lock().failures = failures;
    }

    /// A recorded dispute.
    pub fn dispute(&self, id: DisputeId) -> Option<DisputeRecord> {
        self.court.lock().disputes.get(&id).cloned()
    }

    /// Number of disputes opened.
    pub fn dispute_count(&self) -> usize {
        self.court.lock().disputes.len()
    }
}

impl Arbitrator for InMemoryArbitrator {
    fn account(&self) -> &ParticipantId {
        &self.account
    }

    fn dispute_fees(&self) -> Result<DisputeFees, ArbitrationError> {
        let court = self.court.lock();
        if court.failures.quote {
            return Err(ArbitrationError::Unavailable {
                operation: "dispute_fees",
                reason: "injected failure".into(),
            });
        }
        Ok(court.fees.clone())
    }

    fn open_dispute(&self, metadata: &DisputeMetadata) -> Result<DisputeId, ArbitrationError> {
        let mut court = self.court.lock();
        if court.failures.open {
            return Err(ArbitrationError::Unavailable {
                operation: "open_dispute",
                reason: "injected failure".into(),
            });
        }
        let id = match court.next_id.checked_sub(1) {
            Some(last) if court.failures.reissue_ids => DisputeId(last),
            _ => {
                let id = DisputeId(court.next_id);
                court.next_id = court.next_id.saturating_add(1);
                id
            }
        };
        let fees = court.fees.clone();
        court.disputes.insert(
            id,
            DisputeRecord {
                metadata: metadata.clone(),
                fees,
                evidence: Vec::new(),
            },
        );
        tracing::debug!(dispute_id = %id, action_id = %metadata.action_id, "dispute opened");
        Ok(id)
    }

    fn submit_evidence(
        &self,
        dispute_id: DisputeId,
        party: &ParticipantId,
        evidence: &str,
        finished: bool,
    ) -> Result<(), ArbitrationError> {
        let mut court = self.court.lock();
        if court.failures.evidence {
            return Err(ArbitrationError::Unavailable {
                operation: "submit_evidence",
                reason: "injected failure".into(),
            });
        }
        let record = court
            .disputes
            .get_mut(&dispute_id)
            .ok_or(ArbitrationError::UnknownDispute { dispute_id })?;
        record.evidence.push(ReceivedEvidence {
            party: party.clone(),
            evidence: evidence.to_string(),
            finished,
        });
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::service::POSSIBLE_RULINGS;
    use accord_core::{ActionId, AssetId};

    fn p(s: &str) -> ParticipantId {
        ParticipantId::new(s).unwrap()
    }

    fn court() -> InMemoryArbitrator {
        InMemoryArbitrator::new(
            p("court"),
            DisputeFees {
                asset: AssetId::new("FEE").unwrap(),
                amount: 10,
            },
        )
    }

    fn metadata() -> DisputeMetadata {
        DisputeMetadata {
            action_id: ActionId(1),
            submitter: p("alice"),
            challenger: p("bob"),
            content: "ipfs:agreement".into(),
            possible_rulings: POSSIBLE_RULINGS,
        }
    }

    #[test]
    fn dispute_ids_are_sequential_from_zero() {
        let c = court();
        assert_eq!(c.open_dispute(&metadata()).unwrap(), DisputeId(0));
        assert_eq!(c.open_dispute(&metadata()).unwrap(), DisputeId(1));
        assert_eq!(c.dispute_count(), 2);
    }

    #[test]
    fn evidence_is_recorded_in_order() {
        let c = court();
        let id = c.open_dispute(&metadata()).unwrap();
        c.submit_evidence(id, &p("alice"), "first", false).unwrap();
        c.submit_evidence(id, &p("bob"), "second", true).unwrap();
        let record = c.dispute(id).unwrap();
        assert_eq!(record.evidence.len(), 2);
        assert_eq!(record.evidence[1].party, p("bob"));
        assert!(record.evidence[1].finished);
    }

    #[test]
    fn evidence_for_unknown_dispute_fails() {
        let c = court();
        assert_eq!(
            c.submit_evidence(DisputeId(7), &p("alice"), "x", false),
            Err(ArbitrationError::UnknownDispute {
                dispute_id: DisputeId(7)
            })
        );
    }

    #[test]
    fn fee_changes_apply_to_new_quotes() {
        let c = court();
        c.set_fees(DisputeFees {
            asset: AssetId::new("NEW").unwrap(),
            amount: 99,
        });
        let fees = c.dispute_fees().unwrap();
        assert_eq!(fees.amount, 99);
        assert_eq!(fees.asset.as_str(), "NEW");
    }

    #[test]
    fn injected_failures() {
        let c = court();
        c.set_failures(FailurePlan {
            open: true,
            ..FailurePlan::default()
        });
        assert!(c.open_dispute(&metadata()).is_err());
        assert!(c.dispute_fees().is_ok());
        c.set_failures(FailurePlan {
            quote: true,
            ..FailurePlan::default()
        });
        assert!(c.dispute_fees().is_err());
    }

    #[test]
    fn reissue_injection_repeats_the_last_id() {
        let c = court();
        c.set_failures(FailurePlan {
            reissue_ids: true,
            ..FailurePlan::default()
        });
        assert_eq!(c.open_dispute(&metadata()).unwrap(), DisputeId(0));
        assert_eq!(c.open_dispute(&metadata()).unwrap(), DisputeId(0));
        c.set_failures(FailurePlan::default());
        assert_eq!(c.open_dispute(&metadata()).unwrap(), DisputeId(1));
    }

    #[test]
    fn dispute_record_json_shape() {
        let c = court();
        let id = c.open_dispute(&metadata()).unwrap();
        c.submit_evidence(id, &p("bob"), "reply", true).unwrap();
        let json = serde_json::to_value(c.dispute(id).unwrap()).unwrap();
        assert_eq!(json["fees"], serde_json::json!({"asset": "FEE", "amount": 10}));
        assert_eq!(json["metadata"]["action_id"], 1);
        assert_eq!(json["metadata"]["submitter"], "alice");
        assert_eq!(json["evidence"][0]["party"], "bob");
        assert_eq!(json["evidence"][0]["finished"], true);
    }
}
