//! # Challenge State Machine
//!
//! ## States
//!
//! ```text
//! Waiting ──settle──▶ Settled (terminal)
//!    │
//!    └──dispute──▶ Disputed ──rule(InFavorOfSubmitter)──▶ Rejected
//!                     │
//!                     ├──rule(InFavorOfChallenger)──▶ Accepted (terminal)
//!                     │
//!                     └──rule(Refused)──▶ Voided (terminal)
//! ```
//!
//! `Rejected` ends the challenge but not the action: the submitter was
//! vindicated and may still cancel or execute. The other three end states
//! close the action for good.
//!
//! Time and caller guards live in the agreement layer. This machine only
//! enforces which transitions exist.

use accord_core::{Amount, AssetId, DisputeId, EvidenceId, ParticipantId, Timestamp};
use serde::{Deserialize, Serialize};

use crate::dispute::{Dispute, Party, Ruling};
use crate::error::StateError;
use crate::transition::TransitionRecord;

// ─── Challenge State ─────────────────────────────────────────────────

/// The lifecycle state of a challenge.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum ChallengeState {
    /// Awaiting the submitter's answer.
    Waiting,
    /// Resolved by settlement (terminal).
    Settled,
    /// Escalated to the arbitration service.
    Disputed,
    /// Ruled for the submitter.
    Rejected,
    /// Ruled for the challenger (terminal).
    Accepted,
    /// Arbitrator refused to rule (terminal).
    Voided,
}

impl ChallengeState {
    /// Whether no further operation is possible on the challenged action.
    pub fn is_terminal(&self) -> bool {
        matches!(self, Self::Settled | Self::Accepted | Self::Voided)
    }

    /// Whether the challenge itself has been resolved, including `Rejected`.
    pub fn is_resolved(&self) -> bool {
        !matches!(self, Self::Waiting | Self::Disputed)
    }

    /// Canonical string name.
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Waiting => "WAITING",
            Self::Settled => "SETTLED",
            Self::Disputed => "DISPUTED",
            Self::Rejected => "REJECTED",
            Self::Accepted => "ACCEPTED",
            Self::Voided => "VOIDED",
        }
    }

    /// States reachable in one step.
    pub fn valid_transitions(&self) -> &'static [ChallengeState] {
        match self {
            Self::Waiting => &[Self::Settled, Self::Disputed],
            Self::Disputed => &[Self::Rejected, Self::Accepted, Self::Voided],
            Self::Settled | Self::Rejected | Self::Accepted | Self::Voided => &[],
        }
    }

    /// The resolution a final ruling produces. `None` for `Missing`.
    pub fn for_ruling(ruling: Ruling) -> Option<ChallengeState> {
        match ruling {
            Ruling::Missing => None,
            Ruling::InFavorOfSubmitter => Some(Self::Rejected),
            Ruling::InFavorOfChallenger => Some(Self::Accepted),
            Ruling::Refused => Some(Self::Voided),
        }
    }
}

impl std::fmt::Display for ChallengeState {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

// ─── Challenge ───────────────────────────────────────────────────────

/// A challenge against one action.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Challenge {
    /// Participant who raised it.
    pub challenger: ParticipantId,
    /// Challenger's stated reason, forwarded as evidence on dispute.
    pub context: String,
    /// When it was raised.
    pub created_at: Timestamp,
    /// Portion of the collateral the challenger accepts to settle.
    pub settlement_offer: Amount,
    /// Asset of the challenger's escrowed fee half.
    pub arbitrator_fee_asset: AssetId,
    /// The challenger's escrowed fee half.
    pub arbitrator_fee_amount: Amount,
    /// Set once disputed.
    pub dispute_id: Option<DisputeId>,
    /// Current state.
    pub state: ChallengeState,
    /// Set once disputed.
    pub dispute: Option<Dispute>,
    /// Ordered log of state transitions.
    pub transitions: Vec<TransitionRecord<ChallengeState>>,
}

impl Challenge {
    /// A new challenge in `Waiting`.
    pub fn new(
        challenger: ParticipantId,
        context: String,
        settlement_offer: Amount,
        arbitrator_fee_asset: AssetId,
        arbitrator_fee_amount: Amount,
        at: Timestamp,
    ) -> Self {
        Self {
            challenger,
            context,
            created_at: at,
            settlement_offer,
            arbitrator_fee_asset,
            arbitrator_fee_amount,
            dispute_id: None,
            state: ChallengeState::Waiting,
            dispute: None,
            transitions: Vec::new(),
        }
    }

    /// Waiting → Settled.
    pub fn settle(&mut self, at: Timestamp, reason: &str) -> Result<(), StateError> {
        self.require_state(ChallengeState::Waiting, ChallengeState::Settled)?;
        self.do_transition(ChallengeState::Settled, at, reason);
        Ok(())
    }

    /// Waiting → Disputed, attaching a fresh [`Dispute`].
    pub fn open_dispute(&mut self, dispute_id: DisputeId, at: Timestamp) -> Result<(), StateError> {
        self.require_state(ChallengeState::Waiting, ChallengeState::Disputed)?;
        self.dispute_id = Some(dispute_id);
        self.dispute = Some(Dispute::open());
        self.do_transition(ChallengeState::Disputed, at, &format!("opened {dispute_id}"));
        Ok(())
    }

    /// Record evidence from `party` on the open dispute.
    pub fn submit_evidence(
        &mut self,
        party: Party,
        author: ParticipantId,
        evidence: String,
        finished: bool,
        at: Timestamp,
    ) -> Result<EvidenceId, StateError> {
        self.dispute_for_evidence(party)?;
        let dispute = self.dispute.as_mut().ok_or(StateError::NoDispute)?;
        dispute.record_evidence(party, author, evidence, finished, at)
    }

    /// Check that `party` could submit evidence now.
    pub fn dispute_for_evidence(&self, party: Party) -> Result<&Dispute, StateError> {
        if self.state != ChallengeState::Disputed {
            return Err(StateError::InvalidTransition {
                machine: "challenge",
                from: self.state.to_string(),
                to: "EVIDENCE".into(),
            });
        }
        let dispute = self.dispute.as_ref().ok_or(StateError::NoDispute)?;
        dispute.check_can_submit(party)?;
        Ok(dispute)
    }

    /// Disputed → Rejected / Accepted / Voided, per `ruling`.
    ///
    /// A second call fails because the challenge is no longer `Disputed`.
    pub fn rule(&mut self, ruling: Ruling, at: Timestamp) -> Result<ChallengeState, StateError> {
        let to = ChallengeState::for_ruling(ruling).ok_or(StateError::InvalidRuling {
            code: ruling.code(),
        })?;
        self.require_state(ChallengeState::Disputed, to)?;
        let dispute = self.dispute.as_mut().ok_or(StateError::NoDispute)?;
        dispute.ruling = ruling;
        self.do_transition(to, at, &format!("ruled {ruling}"));
        Ok(to)
    }

    fn require_state(&self, expected: ChallengeState, target: ChallengeState) -> Result<(), StateError> {
        if self.state.is_terminal() {
            return Err(StateError::TerminalState {
                machine: "challenge",
                state: self.state.to_string(),
            });
        }
        if self.state != expected || !self.state.valid_transitions().contains(&target) {
            return Err(StateError::InvalidTransition {
                machine: "challenge",
                from: self.state.to_string(),
                to: target.to_string(),
            });
        }
        Ok(())
    }

    fn do_transition(&mut self, to: ChallengeState, at: Timestamp, reason: &str) {
        self.transitions.push(TransitionRecord {
            from_state: self.state,
            to_state: to,
            timestamp: at,
            reason: reason.to_string(),
        });
        self.state = to;
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn at(secs: i64) -> Timestamp {
        Timestamp::from_epoch_secs(secs).unwrap()
    }

    fn p(s: &str) -> ParticipantId {
        ParticipantId::new(s).unwrap()
    }

    fn waiting() -> Challenge {
        Challenge::new(
            p("bob"),
            "breaks the rules".into(),
            40,
            AssetId::new("FEE").unwrap(),
            5,
            at(100),
        )
    }

    fn disputed() -> Challenge {
        let mut c = waiting();
        c.open_dispute(DisputeId(9), at(110)).unwrap();
        c
    }

    #[test]
    fn new_challenge_waits() {
        let c = waiting();
        assert_eq!(c.state, ChallengeState::Waiting);
        assert!(c.dispute.is_none());
        assert!(!c.state.is_resolved());
    }

    #[test]
    fn settle_from_waiting_only() {
        let mut c = waiting();
        c.settle(at(120), "settled by submitter").unwrap();
        assert_eq!(c.state, ChallengeState::Settled);
        assert!(c.state.is_terminal());
        assert!(matches!(
            c.settle(at(121), "again"),
            Err(StateError::TerminalState { .. })
        ));
        assert!(disputed().settle(at(120), "late").is_err());
    }

    #[test]
    fn dispute_attaches_missing_ruling() {
        let c = disputed();
        assert_eq!(c.state, ChallengeState::Disputed);
        assert_eq!(c.dispute_id, Some(DisputeId(9)));
        let d = c.dispute.as_ref().unwrap();
        assert_eq!(d.ruling, Ruling::Missing);
        assert!(!d.submitter_finished_evidence);
        assert!(!d.challenger_finished_evidence);
    }

    #[test]
    fn rulings_map_to_outcomes() {
        let cases = [
            (Ruling::InFavorOfSubmitter, ChallengeState::Rejected, false),
            (Ruling::InFavorOfChallenger, ChallengeState::Accepted, true),
            (Ruling::Refused, ChallengeState::Voided, true),
        ];
        for (ruling, outcome, terminal) in cases {
            let mut c = disputed();
            assert_eq!(c.rule(ruling, at(200)).unwrap(), outcome);
            assert_eq!(c.state.is_terminal(), terminal);
            assert!(c.state.is_resolved());
            assert_eq!(c.dispute.as_ref().unwrap().ruling, ruling);
        }
    }

    #[test]
    fn second_ruling_fails() {
        let mut c = disputed();
        c.rule(Ruling::InFavorOfSubmitter, at(200)).unwrap();
        assert!(c.rule(Ruling::InFavorOfSubmitter, at(201)).is_err());
        assert!(c.rule(Ruling::Refused, at(201)).is_err());
        assert_eq!(c.state, ChallengeState::Rejected);
    }

    #[test]
    fn missing_is_not_a_final_ruling() {
        let mut c = disputed();
        assert!(matches!(
            c.rule(Ruling::Missing, at(200)),
            Err(StateError::InvalidRuling { code: 0 })
        ));
        assert_eq!(c.state, ChallengeState::Disputed);
    }

    #[test]
    fn ruling_requires_dispute() {
        let mut c = waiting();
        assert!(c.rule(Ruling::Refused, at(200)).is_err());
    }

    #[test]
    fn evidence_only_while_disputed() {
        let mut c = waiting();
        assert!(c
            .submit_evidence(Party::Submitter, p("alice"), "x".into(), false, at(101))
            .is_err());
        let mut c = disputed();
        c.submit_evidence(Party::Submitter, p("alice"), "x".into(), true, at(111))
            .unwrap();
        assert!(c.dispute_for_evidence(Party::Submitter).is_err());
        assert!(c.dispute_for_evidence(Party::Challenger).is_ok());
        c.rule(Ruling::Refused, at(200)).unwrap();
        assert!(c.dispute_for_evidence(Party::Challenger).is_err());
    }

    #[test]
    fn transitions_are_logged() {
        let mut c = disputed();
        c.rule(Ruling::InFavorOfChallenger, at(300)).unwrap();
        assert_eq!(c.transitions.len(), 2);
        assert_eq!(c.transitions[1].from_state, ChallengeState::Disputed);
        assert_eq!(c.transitions[1].to_state, ChallengeState::Accepted);
        assert_eq!(c.transitions[1].timestamp, at(300));
    }

    #[test]
    fn state_serializes_screaming_case() {
        assert_eq!(
            serde_json::to_string(&ChallengeState::Voided).unwrap(),
            "\"VOIDED\""
        );
    }
}
