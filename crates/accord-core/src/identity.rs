//! # Identifier Newtypes
//!
//! Newtype wrappers for every identifier namespace in the protocol. You
//! cannot pass a `SettingId` where an `ActionId` is expected, nor a
//! `ParticipantId` where an `AssetId` is.
//!
//! ## Numbering
//!
//! - `SettingId` is sequential from 0. The initial setting is id 0.
//! - `ActionId` is sequential from 1.
//! - `DisputeId` is allocated by the arbitration service.
//! - `EvidenceId` is a random UUID assigned when evidence is recorded.

use std::str::FromStr;

use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::error::CoreError;

// ── Sequential identifiers ──────────────────────────────────────────

/// Identifier of a scheduled action.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct ActionId(pub u64);

/// Identifier of an entry in the settings registry.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct SettingId(pub u64);

/// Identifier of a dispute, as allocated by the arbitration service.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct DisputeId(pub u64);

/// Identifier of a single evidence record.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct EvidenceId(pub Uuid);

impl ActionId {
    /// The first id handed out by the action registry.
    pub const FIRST: ActionId = ActionId(1);

    /// Raw numeric value.
    pub fn get(&self) -> u64 {
        self.0
    }
}

impl SettingId {
    /// Id of the setting installed at construction.
    pub const INITIAL: SettingId = SettingId(0);

    /// Raw numeric value.
    pub fn get(&self) -> u64 {
        self.0
    }

    /// The id that follows this one.
    pub fn next(&self) -> SettingId {
        SettingId(self.0.saturating_add(1))
    }
}

impl DisputeId {
    /// Raw numeric value.
    pub fn get(&self) -> u64 {
        self.0
    }
}

impl EvidenceId {
    /// Generate a new random evidence identifier.
    pub fn new() -> Self {
        Self(Uuid::new_v4())
    }

    /// Access the inner UUID.
    pub fn as_uuid(&self) -> &Uuid {
        &self.0
    }
}

impl Default for EvidenceId {
    fn default() -> Self {
        Self::new()
    }
}

impl std::fmt::Display for ActionId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "action:{}", self.0)
    }
}

impl std::fmt::Display for SettingId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "setting:{}", self.0)
    }
}

impl std::fmt::Display for DisputeId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "dispute:{}", self.0)
    }
}

impl std::fmt::Display for EvidenceId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "evidence:{}", self.0)
    }
}

// ── Named identifiers ───────────────────────────────────────────────

const MAX_NAME_LEN: usize = 128;

fn validate_name(kind: &'static str, value: &str) -> Result<(), CoreError> {
    let reject = |reason: &str| CoreError::InvalidIdentifier {
        kind,
        value: value.to_string(),
        reason: reason.to_string(),
    };
    if value.is_empty() {
        return Err(reject("must not be empty"));
    }
    if value.len() > MAX_NAME_LEN {
        return Err(reject("longer than 128 bytes"));
    }
    if value.chars().any(|c| c.is_whitespace() || c.is_control()) {
        return Err(reject("contains whitespace or control characters"));
    }
    if value.contains('/') {
        return Err(reject("contains '/'"));
    }
    Ok(())
}

/// A protocol participant: submitter, challenger, arbitrator or holder.
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub struct ParticipantId(String);

/// A fungible asset the ledger can hold.
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub struct AssetId(String);

impl ParticipantId {
    /// Validate and wrap a participant name.
    pub fn new(value: impl Into<String>) -> Result<Self, CoreError> {
        let value = value.into();
        validate_name("participant", &value)?;
        Ok(Self(value))
    }

    /// The participant name.
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl AssetId {
    /// Validate and wrap an asset symbol.
    pub fn new(value: impl Into<String>) -> Result<Self, CoreError> {
        let value = value.into();
        validate_name("asset", &value)?;
        Ok(Self(value))
    }

    /// The asset symbol.
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl TryFrom<String> for ParticipantId {
    type Error = CoreError;
    fn try_from(value: String) -> Result<Self, Self::Error> {
        Self::new(value)
    }
}

impl TryFrom<String> for AssetId {
    type Error = CoreError;
    fn try_from(value: String) -> Result<Self, Self::Error> {
        Self::new(value)
    }
}

impl From<ParticipantId> for String {
    fn from(id: ParticipantId) -> Self {
        id.0
    }
}

impl From<AssetId> for String {
    fn from(id: AssetId) -> Self {
        id.0
    }
}

impl FromStr for ParticipantId {
    type Err = CoreError;
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::new(s)
    }
}

impl FromStr for AssetId {
    type Err = CoreError;
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::new(s)
    }
}

impl std::fmt::Display for ParticipantId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(&self.0)
    }
}

impl std::fmt::Display for AssetId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(&self.0)
    }
}
