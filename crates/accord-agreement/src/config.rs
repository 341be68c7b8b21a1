//! # Agreement Configuration
//!
//! An [`AgreementConfig`] describes one deployment: the initial setting, who
//! holds which role, the arbitration service and the external balances the
//! in-memory value-transfer collaborator starts with.
//!
//! ```yaml
//! setting:
//!   content: "ipfs:QmAgreementText"
//!   collateral_asset: ANT
//!   collateral_amount: 100
//!   challenge_stake: 50
//!   delay_period_secs: 86400
//!   settlement_period_secs: 3600
//! permissions:
//!   manage_settings: [council]
//! arbitrator:
//!   account: court
//!   fee_asset: DAI
//!   fee_amount: 20
//! genesis:
//!   - { holder: alice, asset: ANT, amount: 1000 }
//! ```
//!
//! A role missing from `permissions` is open to everyone.

use std::collections::BTreeSet;
use std::path::Path;

use accord_arbitration::DisputeFees;
use accord_core::{Amount, AssetId, ParticipantId};
use accord_state::SettingParams;
use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::permissions::Permissions;

/// Errors loading or validating a configuration.
#[derive(Error, Debug)]
pub enum ConfigError {
    /// The file could not be read.
    #[error("failed to read {path}: {source}")]
    Io {
        /// File path.
        path: String,
        /// Underlying error.
        source: std::io::Error,
    },

    /// The YAML did not match the schema.
    #[error("failed to parse agreement config: {0}")]
    Parse(#[from] serde_yaml::Error),

    /// The configuration parsed but is not usable.
    #[error("invalid agreement config: {}", errors.join("; "))]
    Invalid {
        /// Every problem found.
        errors: Vec<String>,
    },
}

/// The initial setting.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SettingConfig {
    /// Arbitration content reference.
    pub content: String,
    /// Collateral asset.
    pub collateral_asset: AssetId,
    /// Collateral per action.
    pub collateral_amount: Amount,
    /// Challenger stake.
    pub challenge_stake: Amount,
    /// Challenge window.
    pub delay_period_secs: u64,
    /// Answer window.
    pub settlement_period_secs: u64,
}

impl SettingConfig {
    /// As registry parameters.
    pub fn to_params(&self) -> SettingParams {
        SettingParams {
            content: self.content.clone(),
            collateral_asset: self.collateral_asset.clone(),
            collateral_amount: self.collateral_amount,
            challenge_stake: self.challenge_stake,
            delay_period: self.delay_period_secs,
            settlement_period: self.settlement_period_secs,
        }
    }
}

/// Role lists. `None` leaves the role open.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct PermissionsConfig {
    /// Sign role.
    #[serde(default)]
    pub sign: Option<Vec<ParticipantId>>,
    /// Challenge role.
    #[serde(default)]
    pub challenge: Option<Vec<ParticipantId>>,
    /// Settings administrators.
    #[serde(default)]
    pub manage_settings: Option<Vec<ParticipantId>>,
}

impl PermissionsConfig {
    /// As a permission table.
    pub fn to_permissions(&self) -> Permissions {
        fn set(list: &Option<Vec<ParticipantId>>) -> Option<BTreeSet<ParticipantId>> {
            list.as_ref().map(|l| l.iter().cloned().collect())
        }
        Permissions {
            sign: set(&self.sign),
            challenge: set(&self.challenge),
            manage_settings: set(&self.manage_settings),
        }
    }
}

/// The arbitration service.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ArbitratorConfig {
    /// Account rulings arrive from and fees are paid to.
    pub account: ParticipantId,
    /// Fee asset.
    pub fee_asset: AssetId,
    /// Fee per dispute.
    pub fee_amount: Amount,
}

impl ArbitratorConfig {
    /// As a fee quote.
    pub fn fees(&self) -> DisputeFees {
        DisputeFees {
            asset: self.fee_asset.clone(),
            amount: self.fee_amount,
        }
    }
}

/// An external balance the in-memory transfer collaborator starts with.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct GenesisBalance {
    /// Holder.
    pub holder: ParticipantId,
    /// Asset.
    pub asset: AssetId,
    /// Amount.
    pub amount: Amount,
}

/// A complete deployment description.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AgreementConfig {
    /// Setting 0.
    pub setting: SettingConfig,
    /// Role lists.
    #[serde(default)]
    pub permissions: PermissionsConfig,
    /// Arbitration service.
    pub arbitrator: ArbitratorConfig,
    /// Starting external balances.
    #[serde(default)]
    pub genesis: Vec<GenesisBalance>,
}

impl AgreementConfig {
    /// Parse YAML. Does not validate.
    pub fn from_yaml_str(yaml: &str) -> Result<Self, ConfigError> {
        Ok(serde_yaml::from_str(yaml)?)
    }

    /// Read and parse a YAML file. Does not validate.
    pub fn from_path(path: &Path) -> Result<Self, ConfigError> {
        let text = std::fs::read_to_string(path).map_err(|source| ConfigError::Io {
            path: path.display().to_string(),
            source,
        })?;
        Self::from_yaml_str(&text)
    }

    /// Collect every problem with the configuration.
    pub fn validate(&self) -> Result<(), ConfigError> {
        let mut errors = Vec::new();

        if let Err(e) = self.setting.to_params().validate() {
            errors.push(format!("setting: {e}"));
        }
        if self.setting.content.trim().is_empty() {
            errors.push("setting: content must not be empty".to_string());
        }
        if let Some(challengers) = &self.permissions.challenge {
            if challengers.contains(&self.arbitrator.account) {
                errors.push(format!(
                    "permissions: arbitrator {} may not hold the challenge role",
                    self.arbitrator.account
                ));
            }
        }
        for (i, entry) in self.genesis.iter().enumerate() {
            if entry.amount == 0 {
                errors.push(format!(
                    "genesis[{i}]: amount for {} in {} must be greater than zero",
                    entry.holder, entry.asset
                ));
            }
        }

        if errors.is_empty() {
            Ok(())
        } else {
            Err(ConfigError::Invalid { errors })
        }
    }
}

/// Configuration used when no file is supplied: every role open, short
/// periods, and a handful of funded demo participants.
pub const DEFAULT_CONFIG_YAML: &str = r#"
setting:
  content: "ipfs:accord-default-agreement"
  collateral_asset: ANT
  collateral_amount: 100
  challenge_stake: 50
  delay_period_secs: 3600
  settlement_period_secs: 600
arbitrator:
  account: arbitrator
  fee_asset: DAI
  fee_amount: 20
genesis:
  - { holder: alice, asset: ANT, amount: 10000 }
  - { holder: alice, asset: DAI, amount: 1000 }
  - { holder: bob, asset: ANT, amount: 10000 }
  - { holder: bob, asset: DAI, amount: 1000 }
"#;
