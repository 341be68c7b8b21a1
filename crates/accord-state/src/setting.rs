//! # Settings Registry
//!
//! Append-only, versioned protocol parameters. Setting 0 is installed at
//! construction; every change appends a new entry with the next id. Entries
//! are never mutated, so an action that recorded setting `n` can always be
//! interpreted against the exact parameters it was created under.

use accord_core::{Amount, AssetId, SettingId, Timestamp};
use serde::{Deserialize, Serialize};

use crate::error::StateError;

/// Parameters for a new setting.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SettingParams {
    /// Arbitration content reference (e.g. an IPFS hash of the agreement text).
    pub content: String,
    /// Asset collateral and challenge stakes are denominated in.
    pub collateral_asset: AssetId,
    /// Collateral locked per scheduled action. Also the unstake floor.
    pub collateral_amount: Amount,
    /// Stake a challenger escrows per challenge.
    pub challenge_stake: Amount,
    /// Seconds after scheduling during which an action may be challenged.
    pub delay_period: u64,
    /// Seconds after a challenge during which the submitter must answer.
    pub settlement_period: u64,
}

impl SettingParams {
    /// Reject parameter sets the protocol cannot operate under.
    pub fn validate(&self) -> Result<(), StateError> {
        if self.collateral_amount == 0 {
            return Err(StateError::InvalidSetting {
                reason: "collateral amount must be greater than zero".into(),
            });
        }
        Ok(())
    }
}

/// An immutable registry entry.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Setting {
    /// Registry id.
    pub id: SettingId,
    /// Arbitration content reference.
    pub content: String,
    /// Collateral asset.
    pub collateral_asset: AssetId,
    /// Collateral per action.
    pub collateral_amount: Amount,
    /// Challenger stake.
    pub challenge_stake: Amount,
    /// Challenge window, seconds.
    pub delay_period: u64,
    /// Answer window, seconds.
    pub settlement_period: u64,
    /// When the entry was appended.
    pub created_at: Timestamp,
}

impl Setting {
    fn from_params(id: SettingId, params: SettingParams, created_at: Timestamp) -> Self {
        Self {
            id,
            content: params.content,
            collateral_asset: params.collateral_asset,
            collateral_amount: params.collateral_amount,
            challenge_stake: params.challenge_stake,
            delay_period: params.delay_period,
            settlement_period: params.settlement_period,
            created_at,
        }
    }
}

/// Append-only table of settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SettingsRegistry {
    initial: Setting,
    later: Vec<Setting>,
}

impl SettingsRegistry {
    /// Install `params` as setting 0.
    pub fn new(params: SettingParams, at: Timestamp) -> Result<Self, StateError> {
        params.validate()?;
        Ok(Self {
            initial: Setting::from_params(SettingId::INITIAL, params, at),
            later: Vec::new(),
        })
    }

    /// Append a new setting and make it current.
    pub fn append(&mut self, params: SettingParams, at: Timestamp) -> Result<SettingId, StateError> {
        params.validate()?;
        let id = self.current().id.next();
        self.later.push(Setting::from_params(id, params, at));
        Ok(id)
    }

    /// The setting new actions bind to.
    pub fn current(&self) -> &Setting {
        self.later.last().unwrap_or(&self.initial)
    }

    /// Look up any historical setting.
    pub fn get(&self, id: SettingId) -> Result<&Setting, StateError> {
        let found = match id.get() {
            0 => Some(&self.initial),
            n => usize::try_from(n - 1).ok().and_then(|i| self.later.get(i)),
        };
        found.ok_or(StateError::SettingNotFound { id })
    }

    /// Number of settings ever installed.
    pub fn len(&self) -> usize {
        self.later.len() + 1
    }

    /// Always false; the registry holds at least the initial setting.
    pub fn is_empty(&self) -> bool {
        false
    }

    /// All settings, oldest first.
    pub fn iter(&self) -> impl Iterator<Item = &Setting> {
        std::iter::once(&self.initial).chain(self.later.iter())
    }
}
