//! # accord-agreement: The Agreement Protocol
//!
//! A participant stakes collateral, signs the agreement content and
//! schedules actions. Each action locks collateral for a delay window during
//! which anyone holding the challenge role may contest it. A challenge is
//! either settled on the challenger's offer or escalated to an external
//! arbitration service, whose ruling decides who keeps the collateral and
//! the challenge stake. Unchallenged actions, and actions whose challenge
//! was rejected, may be executed.
//!
//! ## Module Overview
//!
//! | Module | Purpose |
//! |--------|---------|
//! | [`agreement`] | The [`Agreement`] aggregate: settings, staking, permissions, queries |
//! | `lifecycle` | `schedule`, `cancel`, `execute` |
//! | `challenge` | `challenge`, `settle` |
//! | `arbitration` | `dispute`, `submit_evidence`, `rule` |
//! | [`oracle`] | Which operations are legal right now |
//! | [`config`] | YAML deployment configuration |
//! | [`memory`] | In-memory collaborators wired from a config |
//! | [`permissions`] | Role table |
//! | [`signer`] | Signer review tracking |
//! | [`payload`] | The payload collaborator |
//! | [`error`] | [`AgreementError`] and its [`ErrorKind`] classes |
//!
//! ## Balance Effects
//!
//! | Operation | Submitter | Challenger |
//! |-----------|-----------|------------|
//! | schedule | available → locked | |
//! | challenge | locked → challenged | escrows stake + fee half |
//! | settle | challenged → available (minus offer) | offer + stake + fee half |
//! | dispute | pays missing fee | |
//! | ruling for submitter | challenged → available, receives stake | |
//! | ruling for challenger | loses collateral | collateral + stake |
//! | refusal | challenged → available | stake back |
//! | cancel / execute | locked → available (if still locked) | |

pub mod agreement;
mod arbitration;
mod challenge;
pub mod config;
pub mod error;
mod lifecycle;
pub mod memory;
pub mod oracle;
pub mod payload;
pub mod permissions;
pub mod signer;

#[cfg(test)]
pub(crate) mod testing;

pub use agreement::{Agreement, Collaborators};
pub use config::{AgreementConfig, ConfigError, DEFAULT_CONFIG_YAML};
pub use error::{AgreementError, ErrorKind};
pub use memory::{CustodyCheck, InMemoryDeployment};
pub use oracle::{allowed_paths, AllowedPaths};
pub use payload::{PayloadError, PayloadRunner, RecordingPayloadRunner};
pub use permissions::{Permissions, Role};
pub use signer::{SignerInfo, SignerRegistry};
