//! # Dispute: Rulings and Evidence
//!
//! A dispute exists once a challenge has been escalated to the arbitration
//! service. It tracks the ruling (initially `Missing`), each party's
//! "finished submitting evidence" flag, and the evidence forwarded so far.
//!
//! ## Ruling Codes
//!
//! | Code | Ruling |
//! |------|--------|
//! | 0 | Missing |
//! | 2 | Refused |
//! | 3 | InFavorOfSubmitter |
//! | 4 | InFavorOfChallenger |
//!
//! Code 1 and anything above 4 are invalid.

use accord_core::{ContentDigest, EvidenceId, ParticipantId, Timestamp};
use serde::{Deserialize, Serialize};

use crate::error::StateError;

/// Which side of a challenge a participant is on.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Party {
    /// The participant who scheduled the action.
    Submitter,
    /// The participant who challenged it.
    Challenger,
}

impl std::fmt::Display for Party {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(match self {
            Self::Submitter => "submitter",
            Self::Challenger => "challenger",
        })
    }
}

/// The arbitration service's verdict.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum Ruling {
    /// No ruling yet.
    Missing,
    /// The arbitrator declined to decide.
    Refused,
    /// The action stands.
    InFavorOfSubmitter,
    /// The challenge stands.
    InFavorOfChallenger,
}

impl Ruling {
    /// Numeric code used on the callback surface.
    pub fn code(&self) -> u8 {
        match self {
            Self::Missing => 0,
            Self::Refused => 2,
            Self::InFavorOfSubmitter => 3,
            Self::InFavorOfChallenger => 4,
        }
    }

    /// Decode a callback ruling code.
    pub fn from_code(code: u8) -> Result<Self, StateError> {
        match code {
            0 => Ok(Self::Missing),
            2 => Ok(Self::Refused),
            3 => Ok(Self::InFavorOfSubmitter),
            4 => Ok(Self::InFavorOfChallenger),
            _ => Err(StateError::InvalidRuling { code }),
        }
    }

    /// Canonical string name.
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Missing => "MISSING",
            Self::Refused => "REFUSED",
            Self::InFavorOfSubmitter => "IN_FAVOR_OF_SUBMITTER",
            Self::InFavorOfChallenger => "IN_FAVOR_OF_CHALLENGER",
        }
    }
}

impl std::fmt::Display for Ruling {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// One piece of evidence forwarded to the arbitration service.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct EvidenceRecord {
    /// Record id.
    pub id: EvidenceId,
    /// Side that submitted it.
    pub party: Party,
    /// Participant that submitted it.
    pub author: ParticipantId,
    /// Evidence payload as forwarded.
    pub evidence: String,
    /// SHA-256 of the payload.
    pub digest: ContentDigest,
    /// Whether the party declared itself finished with this record.
    pub finished: bool,
    /// When it was recorded.
    pub submitted_at: Timestamp,
}

/// Dispute state attached to a disputed challenge.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Dispute {
    /// Current ruling.
    pub ruling: Ruling,
    /// Submitter declared evidence finished.
    pub submitter_finished_evidence: bool,
    /// Challenger declared evidence finished.
    pub challenger_finished_evidence: bool,
    /// Evidence forwarded so far, oldest first.
    pub evidence: Vec<EvidenceRecord>,
}

impl Dispute {
    /// A fresh dispute: no ruling, nobody finished, no evidence.
    pub fn open() -> Self {
        Self {
            ruling: Ruling::Missing,
            submitter_finished_evidence: false,
            challenger_finished_evidence: false,
            evidence: Vec::new(),
        }
    }

    /// Whether `party` has declared its evidence finished.
    pub fn has_finished(&self, party: Party) -> bool {
        match party {
            Party::Submitter => self.submitter_finished_evidence,
            Party::Challenger => self.challenger_finished_evidence,
        }
    }

    /// Whether both parties have declared their evidence finished.
    pub fn evidence_closed(&self) -> bool {
        self.submitter_finished_evidence && self.challenger_finished_evidence
    }

    /// Check that `party` may still submit, without recording anything.
    pub fn check_can_submit(&self, party: Party) -> Result<(), StateError> {
        if self.ruling != Ruling::Missing {
            return Err(StateError::TerminalState {
                machine: "dispute",
                state: self.ruling.to_string(),
            });
        }
        if self.has_finished(party) {
            return Err(StateError::EvidenceFinished { party });
        }
        Ok(())
    }

    /// Append an evidence record. Setting `finished` flips the party's flag;
    /// it never forces a ruling.
    pub fn record_evidence(
        &mut self,
        party: Party,
        author: ParticipantId,
        evidence: String,
        finished: bool,
        at: Timestamp,
    ) -> Result<EvidenceId, StateError> {
        self.check_can_submit(party)?;
        let id = EvidenceId::new();
        self.evidence.push(EvidenceRecord {
            id,
            party,
            author,
            digest: ContentDigest::of(evidence.as_bytes()),
            evidence,
            finished,
            submitted_at: at,
        });
        if finished {
            match party {
                Party::Submitter => self.submitter_finished_evidence = true,
                Party::Challenger => self.challenger_finished_evidence = true,
            }
        }
        Ok(id)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn at(secs: i64) -> Timestamp {
        Timestamp::from_epoch_secs(secs).unwrap()
    }

    fn alice() -> ParticipantId {
        ParticipantId::new("alice").unwrap()
    }

    #[test]
    fn ruling_codes_round_trip() {
        for ruling in [
            Ruling::Missing,
            Ruling::Refused,
            Ruling::InFavorOfSubmitter,
            Ruling::InFavorOfChallenger,
        ] {
            assert_eq!(Ruling::from_code(ruling.code()).unwrap(), ruling);
        }
    }

    #[test]
    fn undefined_codes_rejected() {
        assert!(matches!(
            Ruling::from_code(1),
            Err(StateError::InvalidRuling { code: 1 })
        ));
        assert!(Ruling::from_code(5).is_err());
    }

    #[test]
    fn evidence_digest_and_finish_flag() {
        let mut d = Dispute::open();
        d.record_evidence(Party::Submitter, alice(), "abc".into(), false, at(1))
            .unwrap();
        assert!(!d.submitter_finished_evidence);
        assert_eq!(
            d.evidence[0].digest.as_hex(),
            "ba7816bf8f01cfea414140de5dae2223b00361a396177a9cb410ff61f20015ad"
        );
        d.record_evidence(Party::Submitter, alice(), "done".into(), true, at(2))
            .unwrap();
        assert!(d.has_finished(Party::Submitter));
        assert!(!d.evidence_closed());
        assert_eq!(d.ruling, Ruling::Missing);
    }

    #[test]
    fn finished_party_cannot_submit_again() {
        let mut d = Dispute::open();
        d.record_evidence(Party::Challenger, alice(), "x".into(), true, at(1))
            .unwrap();
        let err = d
            .record_evidence(Party::Challenger, alice(), "y".into(), false, at(2))
            .unwrap_err();
        assert_eq!(
            err,
            StateError::EvidenceFinished {
                party: Party::Challenger
            }
        );
        assert!(d
            .record_evidence(Party::Submitter, alice(), "z".into(), false, at(3))
            .is_ok());
    }

    #[test]
    fn ruled_dispute_rejects_evidence() {
        let mut d = Dispute::open();
        d.ruling = Ruling::Refused;
        assert!(d.check_can_submit(Party::Submitter).is_err());
    }
}
