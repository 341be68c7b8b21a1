//! # API Route Modules
//!
//! - `settings`: settings registry, signing, signer status.
//! - `staking`: stake, stake-for, unstake, balance queries.
//! - `actions`: schedule, cancel, execute, action and allowed-path queries.
//! - `challenges`: challenge and settle.
//! - `disputes`: dispute, evidence, and the arbitrator's ruling callback.

pub mod actions;
pub mod challenges;
pub mod disputes;
pub mod settings;
pub mod staking;
