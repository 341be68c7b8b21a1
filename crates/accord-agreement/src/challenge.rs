//! Challenging an action and settling the challenge.

use accord_core::{ActionId, Amount, ParticipantId};
use accord_state::Challenge;

use crate::agreement::{describe, Agreement};
use crate::error::AgreementError;
use crate::oracle;
use crate::permissions::Role;

impl Agreement {
    /// Challenge a scheduled action inside its challenge window.
    ///
    /// The challenger escrows the setting's challenge stake and half the
    /// current arbitration fee. The submitter's collateral moves from
    /// locked to challenged. An offer above the collateral is clamped.
    pub fn challenge(
        &self,
        action_id: ActionId,
        challenger: &ParticipantId,
        settlement_offer: Amount,
        context: impl Into<String>,
    ) -> Result<(), AgreementError> {
        self.require_role(Role::Challenge, challenger)?;
        let handle = self.action_handle(action_id)?;
        let mut action = handle.lock();
        let setting = self.setting_for(&action)?;
        let now = self.now();
        if !oracle::can_challenge(&action, &setting, now) {
            tracing::debug!(action_id = %action_id, state = %describe(&action), "challenge rejected");
            return Err(AgreementError::CannotChallenge {
                action_id,
                state: describe(&action),
            });
        }
        if *challenger == action.submitter {
            return Err(AgreementError::SenderNotAllowed {
                operation: "challenge",
                sender: challenger.clone(),
            });
        }

        let fees = self.collaborators.arbitrator.dispute_fees()?;
        let fee_half = fees.half();
        let offer = settlement_offer.min(setting.collateral_amount);

        let mut next = action.clone();
        let mut ledger = self.ledger.lock();
        let mut tx = ledger.begin(self.collaborators.transfer.as_ref());
        tx.escrow_in(challenger, &setting.collateral_asset, setting.challenge_stake)?;
        tx.escrow_in(challenger, &fees.asset, fee_half)?;
        tx.challenge_balance(&action.submitter, &setting.collateral_asset, setting.collateral_amount)?;
        next.open_challenge(
            Challenge::new(challenger.clone(), context.into(), offer, fees.asset.clone(), fee_half, now),
            now,
        )?;
        tx.commit();
        *action = next;

        tracing::info!(
            action_id = %action_id,
            submitter = %action.submitter,
            challenger = %challenger,
            settlement_offer = offer,
            challenge_stake = setting.challenge_stake,
            fee_asset = %fees.asset,
            fee_half,
            "action challenged"
        );
        Ok(())
    }

    /// Accept the challenger's settlement offer.
    ///
    /// Inside the answer window only the submitter may settle; once it has
    /// closed anyone may claim the settlement. The offer goes to the
    /// challenger out of the challenged collateral, the remainder returns to
    /// the submitter's available balance, and the challenger gets back both
    /// the challenge stake and the escrowed fee half.
    pub fn settle(&self, action_id: ActionId, by: &ParticipantId) -> Result<(), AgreementError> {
        let handle = self.action_handle(action_id)?;
        let mut action = handle.lock();
        let setting = self.setting_for(&action)?;
        let now = self.now();
        let challenge = match action.challenge.as_ref() {
            Some(c) if oracle::can_settle(&action) => c.clone(),
            _ => {
                tracing::debug!(action_id = %action_id, state = %describe(&action), "settle rejected");
                return Err(AgreementError::CannotSettle {
                    action_id,
                    state: describe(&action),
                });
            }
        };
        let claimed = !oracle::within_settlement(&action, &setting, now);
        if !claimed && *by != action.submitter {
            return Err(AgreementError::SenderNotAllowed {
                operation: "settle",
                sender: by.clone(),
            });
        }

        let asset = &setting.collateral_asset;
        let offer = challenge.settlement_offer.min(setting.collateral_amount);
        let mut next = action.clone();
        let mut ledger = self.ledger.lock();
        let mut tx = ledger.begin(self.collaborators.transfer.as_ref());
        tx.unchallenge_balance(&action.submitter, asset, setting.collateral_amount - offer)?;
        tx.slash_to(&action.submitter, asset, offer, &challenge.challenger)?;
        tx.escrow_pay(&challenge.challenger, asset, setting.challenge_stake)?;
        tx.escrow_pay(
            &challenge.challenger,
            &challenge.arbitrator_fee_asset,
            challenge.arbitrator_fee_amount,
        )?;
        let reason = if claimed {
            format!("settlement claimed by {by}")
        } else {
            "settled by submitter".to_string()
        };
        next.challenge
            .as_mut()
            .ok_or(AgreementError::NoChallenge { action_id })?
            .settle(now, &reason)?;
        tx.commit();
        *action = next;

        tracing::info!(
            action_id = %action_id,
            submitter = %action.submitter,
            challenger = %challenge.challenger,
            settlement_offer = offer,
            claimed,
            "challenge settled"
        );
        Ok(())
    }
}
