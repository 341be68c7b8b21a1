//! Action lifecycle: schedule, cancel, execute.

use std::sync::Arc;

use accord_core::{ActionId, ParticipantId};
use accord_state::{Action, ActionState};
use parking_lot::Mutex;

use crate::agreement::{describe, Agreement};
use crate::error::AgreementError;
use crate::oracle;
use crate::permissions::Role;

impl Agreement {
    /// Schedule an action under the current setting, locking its collateral
    /// from the submitter's available balance. Requires `Sign`.
    pub fn schedule(
        &self,
        submitter: &ParticipantId,
        payload_ref: impl Into<String>,
        context: impl Into<String>,
    ) -> Result<ActionId, AgreementError> {
        self.require_role(Role::Sign, submitter)?;
        let setting = self.current_setting();
        let now = self.now();

        let id = {
            let mut ledger = self.ledger.lock();
            let mut tx = ledger.begin(self.collaborators.transfer.as_ref());
            tx.lock(submitter, &setting.collateral_asset, setting.collateral_amount)?;
            let id = self.allocate_action_id();
            let action = Action::schedule(
                id,
                submitter.clone(),
                setting.id,
                payload_ref.into(),
                context.into(),
                now,
            );
            self.actions.insert(id, Arc::new(Mutex::new(action)));
            tx.commit();
            id
        };

        self.signers.write().mark_signed(submitter, setting.id);
        tracing::info!(
            action_id = %id,
            submitter = %submitter,
            setting_id = %setting.id,
            collateral = setting.collateral_amount,
            "action scheduled"
        );
        Ok(id)
    }

    /// Cancel an action. Only its submitter may, and only while it is
    /// scheduled or its challenge was rejected.
    pub fn cancel(&self, action_id: ActionId, by: &ParticipantId) -> Result<(), AgreementError> {
        let handle = self.action_handle(action_id)?;
        let mut action = handle.lock();
        if *by != action.submitter {
            return Err(AgreementError::SenderNotAllowed {
                operation: "cancel",
                sender: by.clone(),
            });
        }
        if !oracle::can_cancel(&action) {
            tracing::debug!(action_id = %action_id, state = %describe(&action), "cancel rejected");
            return Err(AgreementError::CannotCancel {
                action_id,
                state: describe(&action),
            });
        }
        let setting = self.setting_for(&action)?;
        let now = self.now();

        let mut next = action.clone();
        let mut ledger = self.ledger.lock();
        let mut tx = ledger.begin(self.collaborators.transfer.as_ref());
        if action.state == ActionState::Scheduled {
            tx.unlock(&action.submitter, &setting.collateral_asset, setting.collateral_amount)?;
        }
        next.cancel(now)?;
        tx.commit();
        *action = next;

        tracing::info!(action_id = %action_id, submitter = %by, "action cancelled");
        Ok(())
    }

    /// Execute an action once its challenge window closed unchallenged, or
    /// once its challenge was rejected. Runs the payload; a payload failure
    /// leaves everything unchanged.
    pub fn execute(&self, action_id: ActionId) -> Result<(), AgreementError> {
        let handle = self.action_handle(action_id)?;
        let mut action = handle.lock();
        let setting = self.setting_for(&action)?;
        let now = self.now();
        if !oracle::can_execute(&action, &setting, now) {
            tracing::debug!(action_id = %action_id, state = %describe(&action), "execute rejected");
            return Err(AgreementError::CannotExecute {
                action_id,
                state: describe(&action),
            });
        }

        let mut next = action.clone();
        let mut ledger = self.ledger.lock();
        let mut tx = ledger.begin(self.collaborators.transfer.as_ref());
        if action.state == ActionState::Scheduled {
            tx.unlock(&action.submitter, &setting.collateral_asset, setting.collateral_amount)?;
        }
        next.execute(now)?;
        if let Err(e) = self.collaborators.payloads.run(&action.payload_ref) {
            tracing::warn!(action_id = %action_id, error = %e, "payload failed, execute aborted");
            return Err(e.into());
        }
        tx.commit();
        *action = next;

        tracing::info!(
            action_id = %action_id,
            payload = %action.payload_ref,
            "action executed"
        );
        Ok(())
    }
}
