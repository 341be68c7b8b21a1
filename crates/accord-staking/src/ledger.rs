//! # Staking Ledger
//!
//! Holds every participant's stake per asset in three partitions
//! (`available`, `locked`, `challenged`), the protocol's own escrow per
//! asset, and running in/out flow totals used for conservation audits.
//!
//! ## Atomicity
//!
//! The ledger is never mutated directly. Callers open a [`LedgerTx`], stage
//! a sequence of moves against it, and either [`LedgerTx::commit`] or let it
//! drop. Until commit, staged values live in an overlay and the underlying
//! ledger is untouched. External transfers cannot be staged, so each one is
//! journaled as it happens and undone in reverse order if the transaction is
//! abandoned.
//!
//! Every validation runs before the external call it guards, and a balance
//! is only staged once its external transfer has succeeded.

use std::collections::{BTreeMap, BTreeSet};

use accord_core::{Amount, AssetId, ParticipantId};

use crate::balance::{Balance, BalanceEntry, ConservationReport, FlowTotals};
use crate::error::LedgerError;
use crate::journal::{CompensationRecord, TransferDirection, TransferJournal, TransferRecord};
use crate::transfer::ValueTransfer;

type Key = (ParticipantId, AssetId);

fn key(participant: &ParticipantId, asset: &AssetId) -> Key {
    (participant.clone(), asset.clone())
}

/// Committed ledger state.
#[derive(Debug, Clone, Default)]
pub struct StakingLedger {
    balances: BTreeMap<Key, Balance>,
    escrow: BTreeMap<AssetId, Amount>,
    flows: BTreeMap<AssetId, FlowTotals>,
    unreconciled: Vec<CompensationRecord>,
}

impl StakingLedger {
    /// Empty ledger.
    pub fn new() -> Self {
        Self::default()
    }

    /// A participant's committed balance. Unknown participants read as zero.
    pub fn balance(&self, participant: &ParticipantId, asset: &AssetId) -> Balance {
        self.balances
            .get(&key(participant, asset))
            .copied()
            .unwrap_or_default()
    }

    /// Protocol-held escrow for an asset.
    pub fn escrow(&self, asset: &AssetId) -> Amount {
        self.escrow.get(asset).copied().unwrap_or(0)
    }

    /// In/out flow totals for an asset.
    pub fn flows(&self, asset: &AssetId) -> FlowTotals {
        self.flows.get(asset).copied().unwrap_or_default()
    }

    /// Every asset the ledger has ever seen.
    pub fn assets(&self) -> BTreeSet<AssetId> {
        self.balances
            .keys()
            .map(|(_, a)| a.clone())
            .chain(self.escrow.keys().cloned())
            .chain(self.flows.keys().cloned())
            .collect()
    }

    /// All non-empty balances, ordered by participant then asset.
    pub fn entries(&self) -> Vec<BalanceEntry> {
        self.balances
            .iter()
            .filter(|(_, b)| !b.is_empty())
            .map(|((participant, asset), balance)| BalanceEntry {
                participant: participant.clone(),
                asset: asset.clone(),
                balance: *balance,
            })
            .collect()
    }

    /// Reconcile one asset's balances and escrow against its flow totals.
    pub fn audit(&self, asset: &AssetId) -> ConservationReport {
        let participant_total = self
            .balances
            .iter()
            .filter(|((_, a), _)| a == asset)
            .map(|(_, b)| b.total().unwrap_or(Amount::MAX))
            .fold(0u64, |acc, t| acc.saturating_add(t));
        ConservationReport {
            asset: asset.clone(),
            participant_total,
            escrow: self.escrow(asset),
            flows: self.flows(asset),
        }
    }

    /// Undo steps of abandoned transactions that the collaborator refused.
    /// Each one leaves external holdings out of step with the ledger.
    pub fn unreconciled(&self) -> &[CompensationRecord] {
        &self.unreconciled
    }

    /// Open a transaction that routes external transfers through `transfer`.
    pub fn begin<'a>(&'a mut self, transfer: &'a dyn ValueTransfer) -> LedgerTx<'a> {
        LedgerTx {
            ledger: self,
            transfer,
            balances: BTreeMap::new(),
            escrow: BTreeMap::new(),
            flows: BTreeMap::new(),
            journal: TransferJournal::new(),
            finished: false,
        }
    }
}

// ── Transaction overlay ─────────────────────────────────────────────

#[derive(Debug, Clone, Copy)]
enum Partition {
    Available,
    Locked,
    Challenged,
}

impl Partition {
    fn name(self) -> &'static str {
        match self {
            Self::Available => "available",
            Self::Locked => "locked",
            Self::Challenged => "challenged",
        }
    }

    fn slot(self, balance: &mut Balance) -> &mut Amount {
        match self {
            Self::Available => &mut balance.available,
            Self::Locked => &mut balance.locked,
            Self::Challenged => &mut balance.challenged,
        }
    }
}

/// A staged set of ledger moves. Dropping it without commit discards the
/// overlay and compensates any external transfers already made.
pub struct LedgerTx<'a> {
    ledger: &'a mut StakingLedger,
    transfer: &'a dyn ValueTransfer,
    balances: BTreeMap<Key, Balance>,
    escrow: BTreeMap<AssetId, Amount>,
    flows: BTreeMap<AssetId, FlowTotals>,
    journal: TransferJournal,
    finished: bool,
}

impl<'a> LedgerTx<'a> {
    /// Balance as seen through the overlay.
    pub fn balance(&self, participant: &ParticipantId, asset: &AssetId) -> Balance {
        self.balances
            .get(&key(participant, asset))
            .copied()
            .unwrap_or_else(|| self.ledger.balance(participant, asset))
    }

    /// Escrow as seen through the overlay.
    pub fn escrow(&self, asset: &AssetId) -> Amount {
        self.escrow
            .get(asset)
            .copied()
            .unwrap_or_else(|| self.ledger.escrow(asset))
    }

    /// External transfers performed so far.
    pub fn transfers(&self) -> &[TransferRecord] {
        self.journal.entries()
    }

    fn flows(&self, asset: &AssetId) -> FlowTotals {
        self.flows
            .get(asset)
            .copied()
            .unwrap_or_else(|| self.ledger.flows(asset))
    }

    fn stage(&mut self, participant: &ParticipantId, asset: &AssetId, balance: Balance) {
        self.balances.insert(key(participant, asset), balance);
    }

    fn flows_with_in(&self, asset: &AssetId, amount: Amount) -> Result<FlowTotals, LedgerError> {
        let mut flows = self.flows(asset);
        flows.total_in = flows
            .total_in
            .checked_add(amount)
            .ok_or(LedgerError::Overflow { operation: "total_in" })?;
        Ok(flows)
    }

    fn flows_with_out(&self, asset: &AssetId, amount: Amount) -> Result<FlowTotals, LedgerError> {
        let mut flows = self.flows(asset);
        flows.total_out = flows
            .total_out
            .checked_add(amount)
            .ok_or(LedgerError::Overflow { operation: "total_out" })?;
        Ok(flows)
    }

    fn pull(&mut self, from: &ParticipantId, asset: &AssetId, amount: Amount) -> Result<(), LedgerError> {
        self.transfer.transfer_in(from, asset, amount)?;
        self.journal.record(TransferRecord {
            direction: TransferDirection::In,
            party: from.clone(),
            asset: asset.clone(),
            amount,
        });
        Ok(())
    }

    fn push(&mut self, to: &ParticipantId, asset: &AssetId, amount: Amount) -> Result<(), LedgerError> {
        self.transfer.transfer_out(to, asset, amount)?;
        self.journal.record(TransferRecord {
            direction: TransferDirection::Out,
            party: to.clone(),
            asset: asset.clone(),
            amount,
        });
        Ok(())
    }

    fn check_floor(
        participant: &ParticipantId,
        asset: &AssetId,
        remaining: Amount,
        floor: Amount,
    ) -> Result<(), LedgerError> {
        if remaining > 0 && remaining < floor {
            return Err(LedgerError::BelowCollateralFloor {
                participant: participant.clone(),
                asset: asset.clone(),
                remaining,
                floor,
            });
        }
        Ok(())
    }

    fn move_partition(
        &mut self,
        participant: &ParticipantId,
        asset: &AssetId,
        amount: Amount,
        from: Partition,
        to: Partition,
    ) -> Result<Balance, LedgerError> {
        let mut balance = self.balance(participant, asset);
        if amount == 0 {
            return Ok(balance);
        }
        let held = *from.slot(&mut balance);
        if held < amount {
            return Err(match from {
                Partition::Available => LedgerError::InsufficientAvailable {
                    participant: participant.clone(),
                    asset: asset.clone(),
                    requested: amount,
                    available: held,
                },
                _ => LedgerError::InsufficientPartition {
                    participant: participant.clone(),
                    asset: asset.clone(),
                    partition: from.name(),
                    requested: amount,
                    held,
                },
            });
        }
        *from.slot(&mut balance) = held - amount;
        let dest = to.slot(&mut balance);
        *dest = dest
            .checked_add(amount)
            .ok_or(LedgerError::Overflow { operation: to.name() })?;
        self.stage(participant, asset, balance);
        Ok(balance)
    }

    // ── Participant-facing moves ────────────────────────────────────

    /// Pull `amount` from `payer` and credit it to `participant`'s available
    /// balance. The result may not sit strictly between zero and `floor`.
    pub fn stake_from(
        &mut self,
        payer: &ParticipantId,
        participant: &ParticipantId,
        asset: &AssetId,
        amount: Amount,
        floor: Amount,
    ) -> Result<Balance, LedgerError> {
        if amount == 0 {
            return Err(LedgerError::ZeroAmount { operation: "stake" });
        }
        let mut balance = self.balance(participant, asset);
        balance.available = balance
            .available
            .checked_add(amount)
            .ok_or(LedgerError::Overflow { operation: "stake" })?;
        Self::check_floor(participant, asset, balance.available, floor)?;
        let flows = self.flows_with_in(asset, amount)?;
        self.pull(payer, asset, amount)?;
        self.stage(participant, asset, balance);
        self.flows.insert(asset.clone(), flows);
        Ok(balance)
    }

    /// Stake from the participant's own holdings.
    pub fn stake(
        &mut self,
        participant: &ParticipantId,
        asset: &AssetId,
        amount: Amount,
        floor: Amount,
    ) -> Result<Balance, LedgerError> {
        self.stake_from(participant, participant, asset, amount, floor)
    }

    /// Release `amount` of available balance back to the participant.
    ///
    /// Leaving exactly zero or at least `floor` is permitted; anything in
    /// between is rejected.
    pub fn unstake(
        &mut self,
        participant: &ParticipantId,
        asset: &AssetId,
        amount: Amount,
        floor: Amount,
    ) -> Result<Balance, LedgerError> {
        if amount == 0 {
            return Err(LedgerError::ZeroAmount { operation: "unstake" });
        }
        let mut balance = self.balance(participant, asset);
        if amount > balance.available {
            return Err(LedgerError::InsufficientAvailable {
                participant: participant.clone(),
                asset: asset.clone(),
                requested: amount,
                available: balance.available,
            });
        }
        balance.available -= amount;
        Self::check_floor(participant, asset, balance.available, floor)?;
        let flows = self.flows_with_out(asset, amount)?;
        self.push(participant, asset, amount)?;
        self.stage(participant, asset, balance);
        self.flows.insert(asset.clone(), flows);
        Ok(balance)
    }

    // ── Protocol-internal moves ─────────────────────────────────────

    /// available → locked. Zero is rejected.
    pub fn lock(
        &mut self,
        participant: &ParticipantId,
        asset: &AssetId,
        amount: Amount,
    ) -> Result<Balance, LedgerError> {
        if amount == 0 {
            return Err(LedgerError::ZeroAmount { operation: "lock" });
        }
        self.move_partition(participant, asset, amount, Partition::Available, Partition::Locked)
    }

    /// locked → available.
    pub fn unlock(
        &mut self,
        participant: &ParticipantId,
        asset: &AssetId,
        amount: Amount,
    ) -> Result<Balance, LedgerError> {
        self.move_partition(participant, asset, amount, Partition::Locked, Partition::Available)
    }

    /// locked → challenged.
    pub fn challenge_balance(
        &mut self,
        participant: &ParticipantId,
        asset: &AssetId,
        amount: Amount,
    ) -> Result<Balance, LedgerError> {
        self.move_partition(participant, asset, amount, Partition::Locked, Partition::Challenged)
    }

    /// challenged → available.
    pub fn unchallenge_balance(
        &mut self,
        participant: &ParticipantId,
        asset: &AssetId,
        amount: Amount,
    ) -> Result<Balance, LedgerError> {
        self.move_partition(participant, asset, amount, Partition::Challenged, Partition::Available)
    }

    /// Remove `amount` from `participant`'s challenged partition and pay it
    /// out of the protocol to `recipient`.
    pub fn slash_to(
        &mut self,
        participant: &ParticipantId,
        asset: &AssetId,
        amount: Amount,
        recipient: &ParticipantId,
    ) -> Result<Balance, LedgerError> {
        let mut balance = self.balance(participant, asset);
        if amount == 0 {
            return Ok(balance);
        }
        if balance.challenged < amount {
            return Err(LedgerError::InsufficientPartition {
                participant: participant.clone(),
                asset: asset.clone(),
                partition: Partition::Challenged.name(),
                requested: amount,
                held: balance.challenged,
            });
        }
        balance.challenged -= amount;
        let flows = self.flows_with_out(asset, amount)?;
        self.push(recipient, asset, amount)?;
        self.stage(participant, asset, balance);
        self.flows.insert(asset.clone(), flows);
        Ok(balance)
    }

    /// Pull value from `from` into protocol escrow. Zero is a no-op.
    pub fn escrow_in(
        &mut self,
        from: &ParticipantId,
        asset: &AssetId,
        amount: Amount,
    ) -> Result<Amount, LedgerError> {
        let held = self.escrow(asset);
        if amount == 0 {
            return Ok(held);
        }
        let next = held
            .checked_add(amount)
            .ok_or(LedgerError::Overflow { operation: "escrow_in" })?;
        let flows = self.flows_with_in(asset, amount)?;
        self.pull(from, asset, amount)?;
        self.escrow.insert(asset.clone(), next);
        self.flows.insert(asset.clone(), flows);
        Ok(next)
    }

    /// Pay value out of protocol escrow to `to`. Zero is a no-op.
    pub fn escrow_pay(
        &mut self,
        to: &ParticipantId,
        asset: &AssetId,
        amount: Amount,
    ) -> Result<Amount, LedgerError> {
        let held = self.escrow(asset);
        if amount == 0 {
            return Ok(held);
        }
        if held < amount {
            return Err(LedgerError::InsufficientEscrow {
                asset: asset.clone(),
                requested: amount,
                held,
            });
        }
        let flows = self.flows_with_out(asset, amount)?;
        self.push(to, asset, amount)?;
        self.escrow.insert(asset.clone(), held - amount);
        self.flows.insert(asset.clone(), flows);
        Ok(held - amount)
    }

    // ── Completion ──────────────────────────────────────────────────

    /// Write the overlay into the ledger.
    pub fn commit(mut self) {
        let balances = std::mem::take(&mut self.balances);
        let escrow = std::mem::take(&mut self.escrow);
        let flows = std::mem::take(&mut self.flows);
        self.ledger.balances.extend(balances);
        self.ledger.escrow.extend(escrow);
        self.ledger.flows.extend(flows);
        tracing::trace!(transfers = self.journal.entries().len(), "ledger transaction committed");
        self.journal.clear();
        self.finished = true;
    }

    /// Discard the overlay and undo external transfers, returning what the
    /// compensation did.
    pub fn rollback(mut self) -> Vec<CompensationRecord> {
        self.abandon()
    }

    fn abandon(&mut self) -> Vec<CompensationRecord> {
        self.finished = true;
        if self.journal.is_empty() {
            return Vec::new();
        }
        let log = self.journal.compensate(self.transfer);
        let failed: Vec<CompensationRecord> =
            log.iter().filter(|r| !r.succeeded).cloned().collect();
        if failed.is_empty() {
            tracing::warn!(compensated = log.len(), "ledger transaction abandoned");
        } else {
            for record in &failed {
                tracing::error!(
                    transfer = %record.original,
                    error = record.error_detail.as_deref().unwrap_or(""),
                    "external holdings no longer match the ledger"
                );
            }
            tracing::error!(
                compensated = log.len(),
                failed = failed.len(),
                "ledger transaction abandoned with unreconciled transfers"
            );
            self.ledger.unreconciled.extend(failed);
        }
        log
    }
}

impl Drop for LedgerTx<'_> {
    fn drop(&mut self) {
        if !self.finished {
            self.abandon();
        }
    }
}
