//! # accord-staking: Staking Ledger
//!
//! Per-participant, per-asset stake in three partitions, plus the protocol's
//! own escrow. Value crosses the protocol boundary only through the
//! [`ValueTransfer`] collaborator.
//!
//! ## Partitions
//!
//! ```text
//!   stake ──► available ──lock──► locked ──challenge──► challenged ──slash──► (out)
//!     ▲           │  ▲              │                      │
//!     │           │  └───unlock─────┘                      │
//!   unstake ◄─────┘  ◄──────────────unchallenge────────────┘
//! ```
//!
//! ## Conservation
//!
//! For every asset, the sum of all partitions plus escrow equals the value
//! that ever entered minus the value that ever left. [`StakingLedger::audit`]
//! checks this.
//!
//! ## Atomicity
//!
//! All moves go through a [`LedgerTx`]. See [`ledger`] for the commit and
//! compensation rules.

pub mod balance;
pub mod error;
pub mod journal;
pub mod ledger;
pub mod transfer;

pub use balance::{Balance, BalanceEntry, ConservationReport, FlowTotals};
pub use error::{LedgerError, TransferError};
pub use journal::{CompensationRecord, TransferDirection, TransferJournal, TransferRecord};
pub use ledger::{LedgerTx, StakingLedger};
pub use transfer::{InMemoryTransfer, ValueTransfer};
