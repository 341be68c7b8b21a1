//! # Action State Machine
//!
//! ## States
//!
//! ```text
//! Scheduled ──cancel──▶ Cancelled (terminal)
//!    │
//!    ├──execute──▶ Executed (terminal)
//!    │
//!    └──challenge──▶ Challenged ──(challenge Rejected)──▶ cancel / execute
//! ```
//!
//! Once `Challenged`, the action never returns to `Scheduled`. Resolution is
//! tracked in the nested [`Challenge`]; only a `Rejected` challenge reopens
//! the cancel and execute paths.

use accord_core::{ActionId, ParticipantId, SettingId, Timestamp};
use serde::{Deserialize, Serialize};

use crate::challenge::{Challenge, ChallengeState};
use crate::dispute::Dispute;
use crate::error::StateError;
use crate::transition::TransitionRecord;

// ─── Action State ────────────────────────────────────────────────────

/// The lifecycle state of an action.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum ActionState {
    /// Collateral locked, challenge window open or elapsed.
    Scheduled,
    /// Withdrawn by the submitter (terminal).
    Cancelled,
    /// Payload ran (terminal).
    Executed,
    /// Under challenge; see the nested challenge state.
    Challenged,
}

impl ActionState {
    /// Whether this state is terminal.
    pub fn is_terminal(&self) -> bool {
        matches!(self, Self::Cancelled | Self::Executed)
    }

    /// Canonical string name.
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Scheduled => "SCHEDULED",
            Self::Cancelled => "CANCELLED",
            Self::Executed => "EXECUTED",
            Self::Challenged => "CHALLENGED",
        }
    }

    /// States reachable in one step, ignoring the nested challenge guard.
    pub fn valid_transitions(&self) -> &'static [ActionState] {
        match self {
            Self::Scheduled => &[Self::Cancelled, Self::Executed, Self::Challenged],
            Self::Challenged => &[Self::Cancelled, Self::Executed],
            Self::Cancelled | Self::Executed => &[],
        }
    }
}

impl std::fmt::Display for ActionState {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

// ─── Action ──────────────────────────────────────────────────────────

/// A proposed action with its collateral-backed lifecycle.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Action {
    /// Action id.
    pub id: ActionId,
    /// Participant who scheduled it.
    pub submitter: ParticipantId,
    /// When it was scheduled.
    pub created_at: Timestamp,
    /// Setting the action is bound to for its whole life.
    pub setting_id: SettingId,
    /// Reference handed to the payload runner on execute.
    pub payload_ref: String,
    /// Submitter's description, forwarded as evidence on dispute.
    pub context: String,
    /// Current state.
    pub state: ActionState,
    /// Set once challenged.
    pub challenge: Option<Challenge>,
    /// Ordered log of state transitions.
    pub transitions: Vec<TransitionRecord<ActionState>>,
}

impl Action {
    /// A new action in `Scheduled`.
    pub fn schedule(
        id: ActionId,
        submitter: ParticipantId,
        setting_id: SettingId,
        payload_ref: String,
        context: String,
        at: Timestamp,
    ) -> Self {
        Self {
            id,
            submitter,
            created_at: at,
            setting_id,
            payload_ref,
            context,
            state: ActionState::Scheduled,
            challenge: None,
            transitions: Vec::new(),
        }
    }

    /// The challenge state, if challenged.
    pub fn challenge_state(&self) -> Option<ChallengeState> {
        self.challenge.as_ref().map(|c| c.state)
    }

    /// The dispute, if the challenge was escalated.
    pub fn dispute(&self) -> Option<&Dispute> {
        self.challenge.as_ref().and_then(|c| c.dispute.as_ref())
    }

    /// Whether the action can take no further operation of any kind.
    pub fn is_closed(&self) -> bool {
        self.state.is_terminal() || self.challenge_state().is_some_and(|s| s.is_terminal())
    }

    /// Whether cancel or execute is structurally reachable: `Scheduled`, or
    /// `Challenged` with the challenge ruled `Rejected`.
    pub fn is_reopened_or_scheduled(&self) -> bool {
        match self.state {
            ActionState::Scheduled => true,
            ActionState::Challenged => self.challenge_state() == Some(ChallengeState::Rejected),
            ActionState::Cancelled | ActionState::Executed => false,
        }
    }

    /// Scheduled → Challenged, attaching `challenge`.
    pub fn open_challenge(&mut self, challenge: Challenge, at: Timestamp) -> Result<(), StateError> {
        self.require(ActionState::Challenged, self.state == ActionState::Scheduled)?;
        let reason = format!("challenged by {}", challenge.challenger);
        self.challenge = Some(challenge);
        self.do_transition(ActionState::Challenged, at, &reason);
        Ok(())
    }

    /// → Cancelled. Allowed from `Scheduled`, or from `Challenged` once the
    /// challenge was ruled `Rejected`.
    pub fn cancel(&mut self, at: Timestamp) -> Result<(), StateError> {
        self.require(ActionState::Cancelled, self.is_reopened_or_scheduled())?;
        self.do_transition(ActionState::Cancelled, at, "cancelled by submitter");
        Ok(())
    }

    /// → Executed. Same structural guard as [`Action::cancel`].
    pub fn execute(&mut self, at: Timestamp) -> Result<(), StateError> {
        self.require(ActionState::Executed, self.is_reopened_or_scheduled())?;
        self.do_transition(ActionState::Executed, at, "executed");
        Ok(())
    }

    fn require(&self, target: ActionState, guard: bool) -> Result<(), StateError> {
        if self.state.is_terminal() {
            return Err(StateError::TerminalState {
                machine: "action",
                state: self.state.to_string(),
            });
        }
        if !guard || !self.state.valid_transitions().contains(&target) {
            let from = match self.challenge_state() {
                Some(c) => format!("{}/{}", self.state, c),
                None => self.state.to_string(),
            };
            return Err(StateError::InvalidTransition {
                machine: "action",
                from,
                to: target.to_string(),
            });
        }
        Ok(())
    }

    fn do_transition(&mut self, to: ActionState, at: Timestamp, reason: &str) {
        self.transitions.push(TransitionRecord {
            from_state: self.state,
            to_state: to,
            timestamp: at,
            reason: reason.to_string(),
        });
        self.state = to;
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::dispute::Ruling;
    use accord_core::{AssetId, DisputeId};

    fn at(secs: i64) -> Timestamp {
        Timestamp::from_epoch_secs(secs).unwrap()
    }

    fn p(s: &str) -> ParticipantId {
        ParticipantId::new(s).unwrap()
    }

    fn scheduled() -> Action {
        Action::schedule(
            ActionId(1),
            p("alice"),
            SettingId(0),
            "payload:transfer".into(),
            "pay the contractor".into(),
            at(0),
        )
    }

    fn challenged() -> Action {
        let mut a = scheduled();
        let c = Challenge::new(
            p("bob"),
            "not approved".into(),
            10,
            AssetId::new("FEE").unwrap(),
            5,
            at(5),
        );
        a.open_challenge(c, at(5)).unwrap();
        a
    }

    #[test]
    fn scheduled_can_cancel_or_execute() {
        let mut a = scheduled();
        a.cancel(at(1)).unwrap();
        assert_eq!(a.state, ActionState::Cancelled);
        assert!(a.is_closed());

        let mut a = scheduled();
        a.execute(at(1)).unwrap();
        assert_eq!(a.state, ActionState::Executed);
        assert!(matches!(
            a.cancel(at(2)),
            Err(StateError::TerminalState { .. })
        ));
    }

    #[test]
    fn challenge_only_from_scheduled() {
        let mut a = challenged();
        assert_eq!(a.state, ActionState::Challenged);
        assert_eq!(a.challenge_state(), Some(ChallengeState::Waiting));
        let again = Challenge::new(
            p("carol"),
            String::new(),
            0,
            AssetId::new("FEE").unwrap(),
            0,
            at(6),
        );
        assert!(a.open_challenge(again, at(6)).is_err());
        assert_eq!(a.challenge.as_ref().unwrap().challenger, p("bob"));
    }

    #[test]
    fn waiting_challenge_blocks_cancel_and_execute() {
        let mut a = challenged();
        let err = a.cancel(at(6)).unwrap_err();
        assert!(format!("{err}").contains("CHALLENGED/WAITING"));
        assert!(a.execute(at(6)).is_err());
    }

    #[test]
    fn rejected_challenge_reopens_paths() {
        let mut a = challenged();
        let c = a.challenge.as_mut().unwrap();
        c.open_dispute(DisputeId(1), at(7)).unwrap();
        c.rule(Ruling::InFavorOfSubmitter, at(8)).unwrap();
        assert!(!a.is_closed());
        a.execute(at(9)).unwrap();
        assert_eq!(a.state, ActionState::Executed);
    }

    #[test]
    fn voided_challenge_closes_action() {
        let mut a = challenged();
        let c = a.challenge.as_mut().unwrap();
        c.open_dispute(DisputeId(1), at(7)).unwrap();
        c.rule(Ruling::Refused, at(8)).unwrap();
        assert!(a.is_closed());
        assert!(a.cancel(at(9)).is_err());
        assert!(a.execute(at(9)).is_err());
    }

    #[test]
    fn dispute_accessor_follows_nesting() {
        let mut a = challenged();
        assert!(a.dispute().is_none());
        a.challenge
            .as_mut()
            .unwrap()
            .open_dispute(DisputeId(2), at(7))
            .unwrap();
        assert_eq!(a.dispute().unwrap().ruling, Ruling::Missing);
    }

    #[test]
    fn transitions_are_logged() {
        let mut a = scheduled();
        a.cancel(at(3)).unwrap();
        assert_eq!(a.transitions.len(), 1);
        assert_eq!(a.transitions[0].from_state, ActionState::Scheduled);
        assert_eq!(a.transitions[0].to_state, ActionState::Cancelled);
    }
}
