//! # The Agreement
//!
//! [`Agreement`] owns the settings registry, permission table, signer
//! registry, staking ledger and action table, and drives them through the
//! external collaborators bundled in [`Collaborators`].
//!
//! ## Locking
//!
//! Each action sits behind its own mutex inside a concurrent map. A mutating
//! operation holds that mutex for its whole read-check-write. The ledger sits
//! behind one mutex, always taken after the action's. Settings, permissions
//! and signers are read-mostly and only ever held briefly, never while
//! acquiring an action or the ledger.
//!
//! ## Atomicity
//!
//! Every operation works on a copy of the action and a ledger transaction.
//! External calls happen while both are staged. Only when every step has
//! succeeded is the ledger committed and the copy swapped in. Dropping the
//! transaction on any error compensates external transfers already made.

use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;

use accord_arbitration::{Arbitrator, FeePlan};
use accord_core::{
    ActionId, Amount, AssetId, Clock, DisputeId, ParticipantId, SettingId, Timestamp,
};
use accord_staking::{
    Balance, BalanceEntry, CompensationRecord, ConservationReport, StakingLedger, ValueTransfer,
};
use accord_state::{Action, Challenge, Dispute, Setting, SettingParams, SettingsRegistry};
use dashmap::DashMap;
use parking_lot::{Mutex, RwLock};

use crate::error::AgreementError;
use crate::oracle::{self, AllowedPaths};
use crate::payload::PayloadRunner;
use crate::permissions::{Permissions, Role};
use crate::signer::{SignerInfo, SignerRegistry};

/// The external collaborators an agreement drives.
#[derive(Clone)]
pub struct Collaborators {
    /// Moves value into and out of the protocol.
    pub transfer: Arc<dyn ValueTransfer>,
    /// Arbitration service.
    pub arbitrator: Arc<dyn Arbitrator>,
    /// Runs executed payloads.
    pub payloads: Arc<dyn PayloadRunner>,
    /// Time source.
    pub clock: Arc<dyn Clock>,
}

impl std::fmt::Debug for Collaborators {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Collaborators")
            .field("arbitrator", self.arbitrator.account())
            .field("now", &self.clock.now())
            .finish_non_exhaustive()
    }
}

/// One agreement instance.
pub struct Agreement {
    pub(crate) settings: RwLock<SettingsRegistry>,
    pub(crate) permissions: RwLock<Permissions>,
    pub(crate) signers: RwLock<SignerRegistry>,
    pub(crate) ledger: Mutex<StakingLedger>,
    pub(crate) actions: DashMap<ActionId, Arc<Mutex<Action>>>,
    pub(crate) disputes: DashMap<DisputeId, ActionId>,
    pub(crate) next_action: AtomicU64,
    pub(crate) collaborators: Collaborators,
}

impl std::fmt::Debug for Agreement {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Agreement")
            .field("current_setting", &self.settings.read().current().id)
            .field("actions", &self.actions.len())
            .field("disputes", &self.disputes.len())
            .field("collaborators", &self.collaborators)
            .finish_non_exhaustive()
    }
}

impl Agreement {
    /// Install `initial` as setting 0.
    pub fn new(
        initial: SettingParams,
        permissions: Permissions,
        collaborators: Collaborators,
    ) -> Result<Self, AgreementError> {
        let now = collaborators.clock.now();
        let settings = SettingsRegistry::new(initial, now)?;
        tracing::info!(
            content = %settings.current().content,
            collateral_asset = %settings.current().collateral_asset,
            collateral_amount = settings.current().collateral_amount,
            arbitrator = %collaborators.arbitrator.account(),
            "agreement initialized"
        );
        Ok(Self {
            settings: RwLock::new(settings),
            permissions: RwLock::new(permissions),
            signers: RwLock::new(SignerRegistry::new()),
            ledger: Mutex::new(StakingLedger::new()),
            actions: DashMap::new(),
            disputes: DashMap::new(),
            next_action: AtomicU64::new(ActionId::FIRST.get()),
            collaborators,
        })
    }

    pub(crate) fn now(&self) -> Timestamp {
        self.collaborators.clock.now()
    }

    pub(crate) fn require_role(
        &self,
        role: Role,
        participant: &ParticipantId,
    ) -> Result<(), AgreementError> {
        self.permissions.read().require(role, participant)
    }

    pub(crate) fn action_handle(&self, id: ActionId) -> Result<Arc<Mutex<Action>>, AgreementError> {
        self.actions
            .get(&id)
            .map(|entry| Arc::clone(entry.value()))
            .ok_or(AgreementError::ActionNotFound { action_id: id })
    }

    pub(crate) fn setting_for(&self, action: &Action) -> Result<Setting, AgreementError> {
        Ok(self.settings.read().get(action.setting_id)?.clone())
    }

    pub(crate) fn allocate_action_id(&self) -> ActionId {
        ActionId(self.next_action.fetch_add(1, Ordering::SeqCst))
    }

    // ── Settings ────────────────────────────────────────────────────

    /// Append a new setting. Requires `ManageSettings`. Every signer must
    /// review again afterwards.
    pub fn change_setting(
        &self,
        by: &ParticipantId,
        params: SettingParams,
    ) -> Result<SettingId, AgreementError> {
        self.require_role(Role::ManageSettings, by)?;
        let id = self.settings.write().append(params, self.now())?;
        tracing::info!(setting_id = %id, by = %by, "setting changed");
        Ok(id)
    }

    /// Mark `participant` as having reviewed the current setting. Requires
    /// `Sign`; fails if already signed.
    pub fn sign(&self, participant: &ParticipantId) -> Result<SettingId, AgreementError> {
        self.require_role(Role::Sign, participant)?;
        let current = self.settings.read().current().id;
        if !self.signers.write().mark_signed(participant, current) {
            return Err(AgreementError::AlreadySigned {
                participant: participant.clone(),
                setting_id: current,
            });
        }
        tracing::info!(participant = %participant, setting_id = %current, "signed");
        Ok(current)
    }

    // ── Permissions ─────────────────────────────────────────────────

    /// Add `participant` to a restricted role. Requires `ManageSettings`.
    pub fn grant(
        &self,
        by: &ParticipantId,
        role: Role,
        participant: ParticipantId,
    ) -> Result<bool, AgreementError> {
        self.require_role(Role::ManageSettings, by)?;
        let changed = self.permissions.write().grant(role, participant.clone());
        tracing::info!(role = %role, participant = %participant, changed, "role granted");
        Ok(changed)
    }

    /// Remove `participant` from a restricted role. Requires
    /// `ManageSettings`.
    pub fn revoke(
        &self,
        by: &ParticipantId,
        role: Role,
        participant: &ParticipantId,
    ) -> Result<bool, AgreementError> {
        self.require_role(Role::ManageSettings, by)?;
        let changed = self.permissions.write().revoke(role, participant);
        tracing::info!(role = %role, participant = %participant, changed, "role revoked");
        Ok(changed)
    }

    // ── Staking ─────────────────────────────────────────────────────

    /// Stake `amount` of the current collateral asset from the participant's
    /// own holdings. Requires `Sign`.
    pub fn stake(&self, participant: &ParticipantId, amount: Amount) -> Result<Balance, AgreementError> {
        self.stake_for(participant, participant, amount)
    }

    /// Stake on behalf of `participant`, pulling the value from `payer`.
    /// `participant` must hold `Sign`.
    pub fn stake_for(
        &self,
        payer: &ParticipantId,
        participant: &ParticipantId,
        amount: Amount,
    ) -> Result<Balance, AgreementError> {
        self.require_role(Role::Sign, participant)?;
        let setting = self.current_setting();
        let mut ledger = self.ledger.lock();
        let mut tx = ledger.begin(self.collaborators.transfer.as_ref());
        let balance = tx.stake_from(
            payer,
            participant,
            &setting.collateral_asset,
            amount,
            setting.collateral_amount,
        )?;
        tx.commit();
        tracing::info!(
            payer = %payer,
            participant = %participant,
            asset = %setting.collateral_asset,
            amount,
            available = balance.available,
            "staked"
        );
        Ok(balance)
    }

    /// Withdraw available collateral of the current collateral asset. Needs
    /// no role.
    pub fn unstake(&self, participant: &ParticipantId, amount: Amount) -> Result<Balance, AgreementError> {
        let asset = self.current_setting().collateral_asset;
        self.unstake_asset(participant, &asset, amount)
    }

    /// Withdraw available balance of any asset, such as collateral staked
    /// under an earlier setting. The floor applies only to the current
    /// collateral asset.
    pub fn unstake_asset(
        &self,
        participant: &ParticipantId,
        asset: &AssetId,
        amount: Amount,
    ) -> Result<Balance, AgreementError> {
        let setting = self.current_setting();
        let floor = if *asset == setting.collateral_asset {
            setting.collateral_amount
        } else {
            0
        };
        let mut ledger = self.ledger.lock();
        let mut tx = ledger.begin(self.collaborators.transfer.as_ref());
        let balance = tx.unstake(participant, asset, amount, floor)?;
        tx.commit();
        tracing::info!(
            participant = %participant,
            asset = %asset,
            amount,
            available = balance.available,
            "unstaked"
        );
        Ok(balance)
    }

    // ── Queries ─────────────────────────────────────────────────────

    /// A setting by id.
    pub fn setting(&self, id: SettingId) -> Result<Setting, AgreementError> {
        Ok(self.settings.read().get(id)?.clone())
    }

    /// The setting new actions bind to.
    pub fn current_setting(&self) -> Setting {
        self.settings.read().current().clone()
    }

    /// Every setting, oldest first.
    pub fn settings(&self) -> Vec<Setting> {
        self.settings.read().iter().cloned().collect()
    }

    /// Snapshot of an action.
    pub fn action(&self, id: ActionId) -> Result<Action, AgreementError> {
        Ok(self.action_handle(id)?.lock().clone())
    }

    /// Ids of every action, ascending.
    pub fn action_ids(&self) -> Vec<ActionId> {
        let mut ids: Vec<ActionId> = self.actions.iter().map(|e| *e.key()).collect();
        ids.sort();
        ids
    }

    /// Snapshot of an action's challenge.
    pub fn challenge_of(&self, action_id: ActionId) -> Result<Challenge, AgreementError> {
        self.action(action_id)?
            .challenge
            .ok_or(AgreementError::NoChallenge { action_id })
    }

    /// Snapshot of an action's dispute.
    pub fn dispute_of(&self, action_id: ActionId) -> Result<Dispute, AgreementError> {
        self.challenge_of(action_id)?
            .dispute
            .ok_or(AgreementError::NoDispute { action_id })
    }

    /// Action a dispute belongs to.
    pub fn action_for_dispute(&self, dispute_id: DisputeId) -> Result<ActionId, AgreementError> {
        self.disputes
            .get(&dispute_id)
            .map(|e| *e.value())
            .ok_or(AgreementError::DisputeNotFound { dispute_id })
    }

    /// Ledger balance.
    pub fn balance(&self, participant: &ParticipantId, asset: &AssetId) -> Balance {
        self.ledger.lock().balance(participant, asset)
    }

    /// Every non-empty ledger balance.
    pub fn balances(&self) -> Vec<BalanceEntry> {
        self.ledger.lock().entries()
    }

    /// Protocol-held escrow of `asset`.
    pub fn escrow(&self, asset: &AssetId) -> Amount {
        self.ledger.lock().escrow(asset)
    }

    /// Review status of a signer against the current setting.
    pub fn signer(&self, participant: &ParticipantId) -> SignerInfo {
        let current = self.settings.read().current().id;
        self.signers.read().info(participant, current)
    }

    /// Operations legal for an action right now.
    pub fn allowed_paths(&self, action_id: ActionId) -> Result<AllowedPaths, AgreementError> {
        let action = self.action(action_id)?;
        let setting = self.setting_for(&action)?;
        Ok(oracle::allowed_paths(&action, &setting, self.now()))
    }

    /// Arbitration fee the submitter would have to add to dispute now.
    pub fn missing_arbitration_fees(
        &self,
        action_id: ActionId,
    ) -> Result<(AssetId, Amount), AgreementError> {
        let challenge = self.challenge_of(action_id)?;
        let fees = self.collaborators.arbitrator.dispute_fees()?;
        let plan = FeePlan::for_dispute(
            &challenge.arbitrator_fee_asset,
            challenge.arbitrator_fee_amount,
            &fees,
        );
        Ok((plan.asset.clone(), plan.missing_fees()))
    }

    /// Conservation audit of one asset.
    pub fn ledger_totals(&self, asset: &AssetId) -> ConservationReport {
        self.ledger.lock().audit(asset)
    }

    /// Conservation audit of every asset the ledger has seen.
    pub fn audit_all(&self) -> Vec<ConservationReport> {
        let ledger = self.ledger.lock();
        ledger.assets().iter().map(|a| ledger.audit(a)).collect()
    }

    /// External transfers that an aborted operation could not undo.
    pub fn unreconciled_transfers(&self) -> Vec<CompensationRecord> {
        self.ledger.lock().unreconciled().to_vec()
    }

    /// Account rulings must come from.
    pub fn arbitrator_account(&self) -> ParticipantId {
        self.collaborators.arbitrator.account().clone()
    }
}

/// Composite state label such as `CHALLENGED/WAITING`.
pub(crate) fn describe(action: &Action) -> String {
    match action.challenge_state() {
        Some(challenge) => format!("{}/{}", action.state, challenge),
        None => action.state.to_string(),
    }
}
