//! # Value Transfer: External Collaborator Interface
//!
//! The ledger never holds tokens itself. Every movement of value across the
//! protocol boundary goes through [`ValueTransfer`]:
//!
//! - `transfer_in` pulls value from an external holder into protocol custody.
//! - `transfer_out` releases value from protocol custody to a holder.
//!
//! Any error aborts the calling protocol operation as a whole.
//!
//! [`InMemoryTransfer`] is the reference implementation used by tests, the
//! HTTP service and the scenario simulator. It keeps holder wallets and a
//! custody balance per asset, and supports failure injection.

use std::collections::{BTreeMap, BTreeSet};
use std::sync::Arc;

use accord_core::{Amount, AssetId, ParticipantId};
use parking_lot::Mutex;

use crate::error::TransferError;

/// Moves fungible value between external holders and protocol custody.
pub trait ValueTransfer: Send + Sync {
    /// Pull `amount` of `asset` from `from` into protocol custody.
    fn transfer_in(
        &self,
        from: &ParticipantId,
        asset: &AssetId,
        amount: Amount,
    ) -> Result<(), TransferError>;

    /// Release `amount` of `asset` from protocol custody to `to`.
    fn transfer_out(
        &self,
        to: &ParticipantId,
        asset: &AssetId,
        amount: Amount,
    ) -> Result<(), TransferError>;
}

impl<T: ValueTransfer + ?Sized> ValueTransfer for Arc<T> {
    fn transfer_in(
        &self,
        from: &ParticipantId,
        asset: &AssetId,
        amount: Amount,
    ) -> Result<(), TransferError> {
        (**self).transfer_in(from, asset, amount)
    }

    fn transfer_out(
        &self,
        to: &ParticipantId,
        asset: &AssetId,
        amount: Amount,
    ) -> Result<(), TransferError> {
        (**self).transfer_out(to, asset, amount)
    }
}

// ── In-memory implementation ────────────────────────────────────────

#[derive(Debug, Default)]
struct TransferBook {
    wallets: BTreeMap<(ParticipantId, AssetId), Amount>,
    custody: BTreeMap<AssetId, Amount>,
    blocked: BTreeSet<ParticipantId>,
    halted: bool,
}

/// Wallet-backed transfer collaborator with failure injection.
#[derive(Debug, Default)]
pub struct InMemoryTransfer {
    book: Mutex<TransferBook>,
}

impl InMemoryTransfer {
    /// Empty wallets, no custody.
    pub fn new() -> Self {
        Self::default()
    }

    /// Mint `amount` into a holder's wallet.
    pub fn credit(&self, holder: &ParticipantId, asset: &AssetId, amount: Amount) {
        let mut book = self.book.lock();
        let slot = book
            .wallets
            .entry((holder.clone(), asset.clone()))
            .or_default();
        *slot = slot.saturating_add(amount);
    }

    /// A holder's wallet balance.
    pub fn balance_of(&self, holder: &ParticipantId, asset: &AssetId) -> Amount {
        self.book
            .lock()
            .wallets
            .get(&(holder.clone(), asset.clone()))
            .copied()
            .unwrap_or(0)
    }

    /// Value currently in protocol custody.
    pub fn custody(&self, asset: &AssetId) -> Amount {
        self.book.lock().custody.get(asset).copied().unwrap_or(0)
    }

    /// Reject every transfer to or from `holder` until unblocked.
    pub fn block(&self, holder: &ParticipantId) {
        self.book.lock().blocked.insert(holder.clone());
    }

    /// Lift a block set by [`InMemoryTransfer::block`].
    pub fn unblock(&self, holder: &ParticipantId) {
        self.book.lock().blocked.remove(holder);
    }

    /// Reject every transfer while `halted` is true.
    pub fn set_halted(&self, halted: bool) {
        self.book.lock().halted = halted;
    }

    fn check_open(book: &TransferBook, holder: &ParticipantId) -> Result<(), TransferError> {
        if book.halted {
            return Err(TransferError::Rejected {
                reason: "transfers halted".into(),
            });
        }
        if book.blocked.contains(holder) {
            return Err(TransferError::Rejected {
                reason: format!("holder {holder} is blocked"),
            });
        }
        Ok(())
    }
}

impl ValueTransfer for InMemoryTransfer {
    fn transfer_in(
        &self,
        from: &ParticipantId,
        asset: &AssetId,
        amount: Amount,
    ) -> Result<(), TransferError> {
        let mut book = self.book.lock();
        Self::check_open(&book, from)?;
        let key = (from.clone(), asset.clone());
        let held = book.wallets.get(&key).copied().unwrap_or(0);
        if held < amount {
            return Err(TransferError::InsufficientFunds {
                holder: from.clone(),
                asset: asset.clone(),
                needed: amount,
                held,
            });
        }
        book.wallets.insert(key, held - amount);
        let custody = book.custody.entry(asset.clone()).or_default();
        *custody = custody.saturating_add(amount);
        Ok(())
    }

    fn transfer_out(
        &self,
        to: &ParticipantId,
        asset: &AssetId,
        amount: Amount,
    ) -> Result<(), TransferError> {
        let mut book = self.book.lock();
        Self::check_open(&book, to)?;
        let custody = book.custody.get(asset).copied().unwrap_or(0);
        if custody < amount {
            return Err(TransferError::Rejected {
                reason: format!("custody holds {custody} {asset}, cannot release {amount}"),
            });
        }
        book.custody.insert(asset.clone(), custody - amount);
        let wallet = book.wallets.entry((to.clone(), asset.clone())).or_default();
        *wallet = wallet.saturating_add(amount);
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn p(s: &str) -> ParticipantId {
        ParticipantId::new(s).unwrap()
    }

    fn dai() -> AssetId {
        AssetId::new("DAI").unwrap()
    }

    #[test]
    fn transfer_in_moves_wallet_to_custody() {
        let t = InMemoryTransfer::new();
        t.credit(&p("alice"), &dai(), 100);
        t.transfer_in(&p("alice"), &dai(), 60).unwrap();
        assert_eq!(t.balance_of(&p("alice"), &dai()), 40);
        assert_eq!(t.custody(&dai()), 60);
    }

    #[test]
    fn transfer_in_rejects_overdraw() {
        let t = InMemoryTransfer::new();
        t.credit(&p("alice"), &dai(), 10);
        let err = t.transfer_in(&p("alice"), &dai(), 11).unwrap_err();
        assert!(matches!(err, TransferError::InsufficientFunds { held: 10, .. }));
        assert_eq!(t.custody(&dai()), 0);
    }

    #[test]
    fn transfer_out_requires_custody() {
        let t = InMemoryTransfer::new();
        assert!(t.transfer_out(&p("bob"), &dai(), 1).is_err());
        t.credit(&p("alice"), &dai(), 5);
        t.transfer_in(&p("alice"), &dai(), 5).unwrap();
        t.transfer_out(&p("bob"), &dai(), 5).unwrap();
        assert_eq!(t.balance_of(&p("bob"), &dai()), 5);
        assert_eq!(t.custody(&dai()), 0);
    }

    #[test]
    fn blocked_and_halted_reject() {
        let t = InMemoryTransfer::new();
        t.credit(&p("alice"), &dai(), 5);
        t.block(&p("alice"));
        assert!(t.transfer_in(&p("alice"), &dai(), 1).is_err());
        t.unblock(&p("alice"));
        t.set_halted(true);
        assert!(t.transfer_in(&p("alice"), &dai(), 1).is_err());
        t.set_halted(false);
        assert!(t.transfer_in(&p("alice"), &dai(), 1).is_ok());
    }

    #[test]
    fn arc_forwards() {
        let t = Arc::new(InMemoryTransfer::new());
        t.credit(&p("alice"), &dai(), 3);
        let dynamic: Arc<dyn ValueTransfer> = t.clone();
        dynamic.transfer_in(&p("alice"), &dai(), 3).unwrap();
        assert_eq!(t.custody(&dai()), 3);
    }
}
