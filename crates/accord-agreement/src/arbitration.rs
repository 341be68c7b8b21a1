//! Escalation to the arbitration service: dispute, evidence, ruling.

use accord_arbitration::{ArbitrationError, DisputeMetadata, FeePlan, POSSIBLE_RULINGS};
use accord_core::{ActionId, DisputeId, EvidenceId, ParticipantId};
use accord_state::{ChallengeState, Party, Ruling, StateError};
use dashmap::mapref::entry::Entry;

use crate::agreement::{describe, Agreement};
use crate::error::AgreementError;
use crate::oracle;

impl Agreement {
    /// Escalate a waiting challenge to arbitration. Submitter only, inside
    /// the answer window.
    ///
    /// The fee is re-quoted and split per [`FeePlan`]; the arbitrator
    /// account is paid before the dispute is opened. Both parties' context
    /// strings are then forwarded as evidence, submitter first.
    pub fn dispute(&self, action_id: ActionId, by: &ParticipantId) -> Result<DisputeId, AgreementError> {
        let handle = self.action_handle(action_id)?;
        let mut action = handle.lock();
        let setting = self.setting_for(&action)?;
        let now = self.now();
        if !oracle::can_dispute(&action, &setting, now) {
            tracing::debug!(action_id = %action_id, state = %describe(&action), "dispute rejected");
            return Err(AgreementError::CannotDispute {
                action_id,
                state: describe(&action),
            });
        }
        if *by != action.submitter {
            return Err(AgreementError::SenderNotAllowed {
                operation: "dispute",
                sender: by.clone(),
            });
        }
        let challenge = action
            .challenge
            .clone()
            .ok_or(AgreementError::NoChallenge { action_id })?;

        let arbitrator = self.collaborators.arbitrator.as_ref();
        let fees = arbitrator.dispute_fees()?;
        let plan = FeePlan::for_dispute(
            &challenge.arbitrator_fee_asset,
            challenge.arbitrator_fee_amount,
            &fees,
        );

        let mut next = action.clone();
        let mut ledger = self.ledger.lock();
        let mut tx = ledger.begin(self.collaborators.transfer.as_ref());
        tx.escrow_in(&action.submitter, &plan.asset, plan.submitter_share)?;
        tx.escrow_pay(arbitrator.account(), &plan.asset, plan.total)?;
        if let Some((asset, amount)) = &plan.challenger_refund {
            tx.escrow_pay(&challenge.challenger, asset, *amount)?;
        }

        let dispute_id = arbitrator.open_dispute(&DisputeMetadata {
            action_id,
            submitter: action.submitter.clone(),
            challenger: challenge.challenger.clone(),
            content: setting.content.clone(),
            possible_rulings: POSSIBLE_RULINGS,
        })?;
        self.ensure_fresh_dispute(dispute_id, action_id)?;
        let forwarded = arbitrator
            .submit_evidence(dispute_id, &action.submitter, &action.context, false)
            .and_then(|()| {
                arbitrator.submit_evidence(dispute_id, &challenge.challenger, &challenge.context, false)
            });
        if let Err(e) = forwarded {
            tracing::warn!(
                action_id = %action_id,
                dispute_id = %dispute_id,
                error = %e,
                "evidence forwarding failed, dispute abandoned"
            );
            return Err(e.into());
        }

        let opened = next
            .challenge
            .as_mut()
            .ok_or(AgreementError::NoChallenge { action_id })?;
        opened.open_dispute(dispute_id, now)?;
        opened.submit_evidence(
            Party::Submitter,
            action.submitter.clone(),
            action.context.clone(),
            false,
            now,
        )?;
        opened.submit_evidence(
            Party::Challenger,
            challenge.challenger.clone(),
            challenge.context.clone(),
            false,
            now,
        )?;
        let slot = match self.disputes.entry(dispute_id) {
            Entry::Vacant(slot) => slot,
            Entry::Occupied(_) => {
                return Err(ArbitrationError::DuplicateDispute { dispute_id }.into());
            }
        };
        tx.commit();
        *action = next;
        slot.insert(action_id);

        tracing::info!(
            action_id = %action_id,
            dispute_id = %dispute_id,
            submitter = %action.submitter,
            challenger = %challenge.challenger,
            fee_asset = %plan.asset,
            fee_total = plan.total,
            submitter_share = plan.submitter_share,
            "challenge disputed"
        );
        Ok(dispute_id)
    }

    /// Reject a dispute id the service already issued for another action.
    fn ensure_fresh_dispute(
        &self,
        dispute_id: DisputeId,
        action_id: ActionId,
    ) -> Result<(), AgreementError> {
        if let Some(holder) = self.disputes.get(&dispute_id) {
            tracing::error!(
                dispute_id = %dispute_id,
                action_id = %action_id,
                held_by = %*holder,
                "arbitration service reissued a dispute id"
            );
            return Err(ArbitrationError::DuplicateDispute { dispute_id }.into());
        }
        Ok(())
    }

    /// Forward evidence from one of the parties to an open dispute.
    ///
    /// `finished` closes that party's evidence; it never forces a ruling.
    pub fn submit_evidence(
        &self,
        action_id: ActionId,
        by: &ParticipantId,
        evidence: impl Into<String>,
        finished: bool,
    ) -> Result<EvidenceId, AgreementError> {
        let handle = self.action_handle(action_id)?;
        let mut action = handle.lock();
        if !oracle::can_submit_evidence(&action) {
            return Err(AgreementError::CannotSubmitEvidence {
                action_id,
                state: describe(&action),
            });
        }
        let challenge = action
            .challenge
            .as_ref()
            .ok_or(AgreementError::NoChallenge { action_id })?;
        let party = if *by == action.submitter {
            Party::Submitter
        } else if *by == challenge.challenger {
            Party::Challenger
        } else {
            return Err(AgreementError::SenderNotAllowed {
                operation: "submit_evidence",
                sender: by.clone(),
            });
        };
        let dispute_id = challenge
            .dispute_id
            .ok_or(AgreementError::NoDispute { action_id })?;
        challenge
            .dispute_for_evidence(party)
            .map_err(|e| finished_error(e, action_id))?;

        let evidence = evidence.into();
        self.collaborators
            .arbitrator
            .submit_evidence(dispute_id, by, &evidence, finished)?;

        let now = self.now();
        let mut next = action.clone();
        let id = next
            .challenge
            .as_mut()
            .ok_or(AgreementError::NoChallenge { action_id })?
            .submit_evidence(party, by.clone(), evidence, finished, now)
            .map_err(|e| finished_error(e, action_id))?;
        *action = next;

        tracing::info!(
            action_id = %action_id,
            dispute_id = %dispute_id,
            party = %party,
            finished,
            evidence_id = %id,
            "evidence submitted"
        );
        Ok(id)
    }

    /// Deliver the arbitration service's final ruling. Only the service
    /// account may call this, and only once per dispute.
    pub fn rule(
        &self,
        dispute_id: DisputeId,
        ruling: Ruling,
        by: &ParticipantId,
    ) -> Result<ChallengeState, AgreementError> {
        if by != self.collaborators.arbitrator.account() {
            return Err(AgreementError::SenderNotAllowed {
                operation: "rule",
                sender: by.clone(),
            });
        }
        let target = ChallengeState::for_ruling(ruling).ok_or(AgreementError::InvalidRuling {
            code: ruling.code(),
        })?;
        let action_id = self.action_for_dispute(dispute_id)?;
        let handle = self.action_handle(action_id)?;
        let mut action = handle.lock();
        if !oracle::can_rule(&action) {
            tracing::warn!(
                dispute_id = %dispute_id,
                action_id = %action_id,
                state = %describe(&action),
                "ruling rejected"
            );
            return Err(AgreementError::CannotRule {
                action_id,
                state: describe(&action),
            });
        }
        let setting = self.setting_for(&action)?;
        let challenger = action
            .challenge
            .as_ref()
            .map(|c| c.challenger.clone())
            .ok_or(AgreementError::NoChallenge { action_id })?;
        let submitter = action.submitter.clone();
        let asset = &setting.collateral_asset;
        let now = self.now();

        let mut next = action.clone();
        let mut ledger = self.ledger.lock();
        let mut tx = ledger.begin(self.collaborators.transfer.as_ref());
        match target {
            ChallengeState::Rejected => {
                tx.unchallenge_balance(&submitter, asset, setting.collateral_amount)?;
                tx.escrow_pay(&submitter, asset, setting.challenge_stake)?;
            }
            ChallengeState::Accepted => {
                tx.slash_to(&submitter, asset, setting.collateral_amount, &challenger)?;
                tx.escrow_pay(&challenger, asset, setting.challenge_stake)?;
            }
            ChallengeState::Voided => {
                tx.unchallenge_balance(&submitter, asset, setting.collateral_amount)?;
                tx.escrow_pay(&challenger, asset, setting.challenge_stake)?;
            }
            other => {
                return Err(AgreementError::State(StateError::InvalidTransition {
                    machine: "challenge",
                    from: ChallengeState::Disputed.to_string(),
                    to: other.to_string(),
                }));
            }
        }
        let outcome = next
            .challenge
            .as_mut()
            .ok_or(AgreementError::NoChallenge { action_id })?
            .rule(ruling, now)?;
        tx.commit();
        *action = next;

        tracing::info!(
            action_id = %action_id,
            dispute_id = %dispute_id,
            ruling = %ruling,
            outcome = %outcome,
            submitter = %submitter,
            challenger = %challenger,
            "ruling applied"
        );
        Ok(outcome)
    }

    /// [`Agreement::rule`] taking the numeric ruling code used on the
    /// callback surface.
    pub fn rule_code(
        &self,
        dispute_id: DisputeId,
        code: u8,
        by: &ParticipantId,
    ) -> Result<ChallengeState, AgreementError> {
        let ruling = Ruling::from_code(code)?;
        self.rule(dispute_id, ruling, by)
    }
}

fn finished_error(err: StateError, action_id: ActionId) -> AgreementError {
    match err {
        StateError::EvidenceFinished {
            party: Party::Submitter,
        } => AgreementError::SubmitterFinishedEvidence { action_id },
        StateError::EvidenceFinished {
            party: Party::Challenger,
        } => AgreementError::ChallengerFinishedEvidence { action_id },
        StateError::TerminalState { state, .. } | StateError::InvalidTransition { from: state, .. } => {
            AgreementError::CannotSubmitEvidence { action_id, state }
        }
        other => other.into(),
    }
}

#[cfg(test)]
mod tests {
    use crate::testing::{ant, dai, p, Fixture};
    use crate::{AgreementError, ErrorKind};
    use accord_arbitration::{ArbitrationError, FailurePlan};
    use accord_core::DisputeId;
    use accord_state::{ChallengeState, Ruling};

    #[test]
    fn dispute_pays_arbitrator_and_forwards_context() {
        let fx = Fixture::new();
        let id = fx.challenged_action(40);
        let dispute_id = fx.agreement.dispute(id, &p("alice")).unwrap();
        assert_eq!(fx.transfer.balance_of(&p("court"), &dai()), 20);
        assert_eq!(fx.agreement.escrow(&dai()), 0);
        let record = fx.arbitrator.dispute(dispute_id).unwrap();
        assert_eq!(record.evidence.len(), 2);
        assert_eq!(record.evidence[0].party, p("alice"));
        assert_eq!(record.evidence[1].party, p("bob"));
        let dispute = fx.agreement.dispute_of(id).unwrap();
        assert_eq!(dispute.ruling, Ruling::Missing);
        assert_eq!(dispute.evidence.len(), 2);
    }

    #[test]
    fn only_submitter_disputes() {
        let fx = Fixture::new();
        let id = fx.challenged_action(40);
        let err = fx.agreement.dispute(id, &p("bob")).unwrap_err();
        assert!(matches!(err, AgreementError::SenderNotAllowed { .. }));
    }

    #[test]
    fn evidence_closes_per_party() {
        let fx = Fixture::new();
        let id = fx.challenged_action(40);
        fx.agreement.dispute(id, &p("alice")).unwrap();
        fx.agreement.submit_evidence(id, &p("alice"), "more", true).unwrap();
        let err = fx.agreement.submit_evidence(id, &p("alice"), "late", false).unwrap_err();
        assert!(matches!(err, AgreementError::SubmitterFinishedEvidence { .. }));
        fx.agreement.submit_evidence(id, &p("bob"), "reply", false).unwrap();
        let err = fx.agreement.submit_evidence(id, &p("carol"), "x", false).unwrap_err();
        assert!(matches!(err, AgreementError::SenderNotAllowed { .. }));
        assert_eq!(
            fx.agreement.challenge_of(id).unwrap().state,
            ChallengeState::Disputed
        );
    }

    #[test]
    fn reissued_dispute_id_is_rejected() {
        let fx = Fixture::new();
        let first = fx.challenged_action(40);
        assert_eq!(fx.agreement.dispute(first, &p("alice")).unwrap(), DisputeId(0));

        fx.agreement.stake(&p("alice"), 100).unwrap();
        let second = fx.agreement.schedule(&p("alice"), "pay again", "second").unwrap();
        fx.agreement.challenge(second, &p("bob"), 10, "also bad").unwrap();
        let court_before = fx.transfer.balance_of(&p("court"), &dai());
        fx.arbitrator.set_failures(FailurePlan {
            reissue_ids: true,
            ..FailurePlan::default()
        });

        let err = fx.agreement.dispute(second, &p("alice")).unwrap_err();
        assert!(matches!(
            err,
            AgreementError::Arbitration(ArbitrationError::DuplicateDispute {
                dispute_id: DisputeId(0)
            })
        ));
        assert_eq!(err.kind(), ErrorKind::External);
        assert_eq!(fx.agreement.action_for_dispute(DisputeId(0)).unwrap(), first);
        assert_eq!(
            fx.agreement.challenge_of(second).unwrap().state,
            ChallengeState::Waiting
        );
        assert_eq!(fx.transfer.balance_of(&p("court"), &dai()), court_before);
        assert!(fx.agreement.unreconciled_transfers().is_empty());

        let outcome = fx.agreement.rule(DisputeId(0), Ruling::Refused, &p("court")).unwrap();
        assert_eq!(outcome, ChallengeState::Voided);
    }

    #[test]
    fn rule_requires_arbitrator_and_valid_code() {
        let fx = Fixture::new();
        let id = fx.challenged_action(40);
        let dispute_id = fx.agreement.dispute(id, &p("alice")).unwrap();
        let err = fx.agreement.rule(dispute_id, Ruling::Refused, &p("alice")).unwrap_err();
        assert!(matches!(err, AgreementError::SenderNotAllowed { .. }));
        for code in [0, 1, 5] {
            let err = fx.agreement.rule_code(dispute_id, code, &p("court")).unwrap_err();
            assert!(matches!(err, AgreementError::InvalidRuling { .. }), "code {code}");
        }
        let outcome = fx.agreement.rule_code(dispute_id, 3, &p("court")).unwrap();
        assert_eq!(outcome, ChallengeState::Rejected);
        assert_eq!(fx.collateral_balance("alice").available, 100);
        assert_eq!(fx.agreement.escrow(&ant()), 0);
    }
}
