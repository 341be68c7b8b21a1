//! # accord-state: Protocol State Machines
//!
//! The composite state of one agreement action, modeled as nested owned
//! options rather than separate tables:
//!
//! ```text
//! Action { state, challenge: Option<Challenge { state, dispute: Option<Dispute> }> }
//! ```
//!
//! ## State Machines
//!
//! - **Settings** (`setting.rs`): append-only, versioned parameter table.
//!   Actions keep a copy of the id they were created under.
//!
//! - **Action** (`action.rs`): `Scheduled → Cancelled | Executed | Challenged`.
//!
//! - **Challenge** (`challenge.rs`): `Waiting → Settled | Disputed`,
//!   `Disputed → Rejected | Accepted | Voided`.
//!
//! - **Dispute** (`dispute.rs`): ruling, per-party evidence flags and the
//!   forwarded evidence log.
//!
//! ## Design
//!
//! Each level is a validated enum with `valid_transitions()` and
//! `is_terminal()`, and every transition is appended to a per-object log.
//! These machines enforce structure only. Time windows, caller identity and
//! balance effects belong to `accord-agreement`.

pub mod action;
pub mod challenge;
pub mod dispute;
pub mod error;
pub mod setting;
pub mod transition;

pub use action::{Action, ActionState};
pub use challenge::{Challenge, ChallengeState};
pub use dispute::{Dispute, EvidenceRecord, Party, Ruling};
pub use error::StateError;
pub use setting::{Setting, SettingParams, SettingsRegistry};
pub use transition::TransitionRecord;
