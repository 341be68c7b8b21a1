//! Role-based permissions.
//!
//! A role with no member list is open to every participant. A role with a
//! list admits only its members. Granting on an open role is a no-op;
//! revoking from an open role closes nothing and reports no change.

use std::collections::BTreeSet;

use accord_core::ParticipantId;
use serde::{Deserialize, Serialize};

use crate::error::AgreementError;

/// Protocol roles.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Role {
    /// Stake, sign and schedule actions.
    Sign,
    /// Challenge actions.
    Challenge,
    /// Change settings and permissions.
    ManageSettings,
}

impl Role {
    /// Canonical string name.
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Sign => "sign",
            Self::Challenge => "challenge",
            Self::ManageSettings => "manage_settings",
        }
    }
}

impl std::fmt::Display for Role {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Members of each role. `None` means open.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Permissions {
    /// Sign role members.
    pub sign: Option<BTreeSet<ParticipantId>>,
    /// Challenge role members.
    pub challenge: Option<BTreeSet<ParticipantId>>,
    /// Settings administrators.
    pub manage_settings: Option<BTreeSet<ParticipantId>>,
}

impl Permissions {
    /// Every role open.
    pub fn open() -> Self {
        Self::default()
    }

    fn members(&self, role: Role) -> &Option<BTreeSet<ParticipantId>> {
        match role {
            Role::Sign => &self.sign,
            Role::Challenge => &self.challenge,
            Role::ManageSettings => &self.manage_settings,
        }
    }

    fn members_mut(&mut self, role: Role) -> &mut Option<BTreeSet<ParticipantId>> {
        match role {
            Role::Sign => &mut self.sign,
            Role::Challenge => &mut self.challenge,
            Role::ManageSettings => &mut self.manage_settings,
        }
    }

    /// Whether `participant` holds `role`.
    pub fn allows(&self, role: Role, participant: &ParticipantId) -> bool {
        match self.members(role) {
            None => true,
            Some(set) => set.contains(participant),
        }
    }

    /// Fail with `MissingPermission` unless `participant` holds `role`.
    pub fn require(&self, role: Role, participant: &ParticipantId) -> Result<(), AgreementError> {
        if self.allows(role, participant) {
            Ok(())
        } else {
            Err(AgreementError::MissingPermission {
                role,
                participant: participant.clone(),
            })
        }
    }

    /// Add a member to a restricted role. Returns whether membership changed.
    pub fn grant(&mut self, role: Role, participant: ParticipantId) -> bool {
        match self.members_mut(role) {
            None => false,
            Some(set) => set.insert(participant),
        }
    }

    /// Remove a member from a restricted role. Returns whether membership
    /// changed.
    pub fn revoke(&mut self, role: Role, participant: &ParticipantId) -> bool {
        match self.members_mut(role) {
            None => false,
            Some(set) => set.remove(participant),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn p(s: &str) -> ParticipantId {
        ParticipantId::new(s).unwrap()
    }

    fn restricted() -> Permissions {
        Permissions {
            sign: Some([p("alice")].into_iter().collect()),
            challenge: None,
            manage_settings: Some(BTreeSet::new()),
        }
    }

    #[test]
    fn open_role_admits_everyone() {
        let perms = restricted();
        assert!(perms.allows(Role::Challenge, &p("anyone")));
        assert!(Permissions::open().allows(Role::ManageSettings, &p("x")));
    }

    #[test]
    fn restricted_role_admits_members_only() {
        let perms = restricted();
        assert!(perms.require(Role::Sign, &p("alice")).is_ok());
        let err = perms.require(Role::Sign, &p("bob")).unwrap_err();
        assert!(matches!(
            err,
            AgreementError::MissingPermission { role: Role::Sign, .. }
        ));
        assert!(!perms.allows(Role::ManageSettings, &p("alice")));
    }

    #[test]
    fn grant_and_revoke() {
        let mut perms = restricted();
        assert!(perms.grant(Role::Sign, p("bob")));
        assert!(perms.allows(Role::Sign, &p("bob")));
        assert!(perms.revoke(Role::Sign, &p("alice")));
        assert!(!perms.allows(Role::Sign, &p("alice")));
        assert!(!perms.grant(Role::Challenge, p("carol")));
        assert!(!perms.revoke(Role::Challenge, &p("carol")));
    }
}
