//! Signer review tracking.
//!
//! A signer is marked as having reviewed the agreement content when they
//! sign it explicitly or schedule an action under it. Appending a new setting
//! makes every signer's review stale again.

use std::collections::BTreeMap;

use accord_core::{ParticipantId, SettingId};
use serde::{Deserialize, Serialize};

/// Review status of one signer.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SignerInfo {
    /// The signer.
    pub participant: ParticipantId,
    /// Last setting the signer reviewed.
    pub last_setting_signed: Option<SettingId>,
    /// Whether the current setting is unreviewed by this signer.
    pub must_review: bool,
}

/// Last setting each signer reviewed.
#[derive(Debug, Clone, Default)]
pub struct SignerRegistry {
    signed: BTreeMap<ParticipantId, SettingId>,
}

impl SignerRegistry {
    /// Nobody has signed.
    pub fn new() -> Self {
        Self::default()
    }

    /// Record that `participant` reviewed `setting`. Returns false if that
    /// was already recorded.
    pub fn mark_signed(&mut self, participant: &ParticipantId, setting: SettingId) -> bool {
        self.signed.insert(participant.clone(), setting) != Some(setting)
    }

    /// Review status against `current`.
    pub fn info(&self, participant: &ParticipantId, current: SettingId) -> SignerInfo {
        let last = self.signed.get(participant).copied();
        SignerInfo {
            participant: participant.clone(),
            last_setting_signed: last,
            must_review: last != Some(current),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn alice() -> ParticipantId {
        ParticipantId::new("alice").unwrap()
    }

    #[test]
    fn unsigned_must_review() {
        let reg = SignerRegistry::new();
        let info = reg.info(&alice(), SettingId(0));
        assert!(info.must_review);
        assert_eq!(info.last_setting_signed, None);
    }

    #[test]
    fn signing_current_clears_review_until_setting_changes() {
        let mut reg = SignerRegistry::new();
        assert!(reg.mark_signed(&alice(), SettingId(0)));
        assert!(!reg.mark_signed(&alice(), SettingId(0)));
        assert!(!reg.info(&alice(), SettingId(0)).must_review);
        assert!(reg.info(&alice(), SettingId(1)).must_review);
        assert!(reg.mark_signed(&alice(), SettingId(1)));
        assert_eq!(
            reg.info(&alice(), SettingId(1)).last_setting_signed,
            Some(SettingId(1))
        );
    }
}
