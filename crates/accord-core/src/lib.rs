//! # accord-core: Foundational Types for the Accord Protocol
//!
//! This crate is the leaf of the Accord workspace. It defines the primitives
//! every other crate builds on: identifier newtypes, the integer `Amount`
//! type, UTC-only timestamps with an injectable clock, and SHA-256 content
//! digests used to fingerprint evidence.
//!
//! ## Key Design Principles
//!
//! 1. **Newtype wrappers for identifiers.** `ActionId`, `SettingId`,
//!    `DisputeId`, `ParticipantId`, `AssetId`. No bare integers or strings
//!    cross a crate boundary where an identifier is meant.
//!
//! 2. **Integer amounts only.** `Amount` is `u64`. Balances never go
//!    negative and arithmetic is checked at every call site that can
//!    overflow.
//!
//! 3. **Time is injected.** Protocol guards read time through the [`Clock`]
//!    trait so windows can be exercised deterministically with
//!    [`ManualClock`].
//!
//! ## Crate Policy
//!
//! - No dependencies on other `accord-*` crates.
//! - No `unsafe` code.
//! - No `panic!()` or `.unwrap()` outside tests.

pub mod digest;
pub mod error;
pub mod identity;
pub mod temporal;

pub use digest::{sha256_hex, ContentDigest};
pub use error::CoreError;
pub use identity::{ActionId, AssetId, DisputeId, EvidenceId, ParticipantId, SettingId};
pub use temporal::{Clock, ManualClock, SystemClock, Timestamp};

/// Quantity of a fungible asset, in its smallest unit.
pub type Amount = u64;
