//! # Transition Oracle
//!
//! Reports which operations are currently legal for an action. The guards
//! here are the same functions the operations themselves consult, so the
//! oracle and the operations cannot disagree.
//!
//! Caller identity is not an input: each flag says whether the operation is
//! legal for the party entitled to perform it.

use accord_core::Timestamp;
use accord_state::{Action, ActionState, ChallengeState, Ruling, Setting};
use serde::{Deserialize, Serialize};

/// Operations legal for one action at one instant.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct AllowedPaths {
    /// Submitter may cancel.
    pub can_cancel: bool,
    /// A challenger may challenge.
    pub can_challenge: bool,
    /// The submitter may settle.
    pub can_settle: bool,
    /// The submitter may escalate to arbitration.
    pub can_dispute: bool,
    /// Anyone may settle because the answer window closed.
    pub can_claim_settlement: bool,
    /// The arbitration service may rule.
    pub can_rule: bool,
    /// Either party may submit evidence.
    pub can_submit_evidence: bool,
    /// Anyone may execute.
    pub can_execute: bool,
}

impl AllowedPaths {
    /// Whether every flag is false.
    pub fn is_closed(&self) -> bool {
        *self == Self::default()
    }
}

/// Compute [`AllowedPaths`] for `action` bound to `setting` at `now`.
pub fn allowed_paths(action: &Action, setting: &Setting, now: Timestamp) -> AllowedPaths {
    if action.is_closed() {
        return AllowedPaths::default();
    }
    let settle = can_settle(action);
    AllowedPaths {
        can_cancel: can_cancel(action),
        can_challenge: can_challenge(action, setting, now),
        can_settle: settle,
        can_dispute: can_dispute(action, setting, now),
        can_claim_settlement: settle && !within_settlement(action, setting, now),
        can_rule: can_rule(action),
        can_submit_evidence: can_submit_evidence(action),
        can_execute: can_execute(action, setting, now),
    }
}

fn challenge_is(action: &Action, state: ChallengeState) -> bool {
    action.challenge_state() == Some(state)
}

/// Scheduled, or reopened by a `Rejected` challenge.
pub(crate) fn can_cancel(action: &Action) -> bool {
    action.is_reopened_or_scheduled()
}

/// Scheduled and still inside the challenge window.
pub(crate) fn can_challenge(action: &Action, setting: &Setting, now: Timestamp) -> bool {
    action.state == ActionState::Scheduled && now.within(action.created_at, setting.delay_period)
}

/// Unchallenged past the window, or reopened by a `Rejected` challenge.
pub(crate) fn can_execute(action: &Action, setting: &Setting, now: Timestamp) -> bool {
    match action.state {
        ActionState::Scheduled => now.is_after(action.created_at, setting.delay_period),
        ActionState::Challenged => challenge_is(action, ChallengeState::Rejected),
        ActionState::Cancelled | ActionState::Executed => false,
    }
}

/// Challenge awaiting an answer.
pub(crate) fn can_settle(action: &Action) -> bool {
    action.state == ActionState::Challenged && challenge_is(action, ChallengeState::Waiting)
}

/// Whether the answer window of the action's challenge is still open.
pub(crate) fn within_settlement(action: &Action, setting: &Setting, now: Timestamp) -> bool {
    action
        .challenge
        .as_ref()
        .is_some_and(|c| now.within(c.created_at, setting.settlement_period))
}

/// Challenge awaiting an answer, inside the answer window.
pub(crate) fn can_dispute(action: &Action, setting: &Setting, now: Timestamp) -> bool {
    can_settle(action) && within_settlement(action, setting, now)
}

/// Challenge escalated and not yet ruled.
pub(crate) fn can_rule(action: &Action) -> bool {
    action.state == ActionState::Challenged && challenge_is(action, ChallengeState::Disputed)
}

/// Dispute open and not yet ruled.
pub(crate) fn can_submit_evidence(action: &Action) -> bool {
    action.state == ActionState::Challenged
        && challenge_is(action, ChallengeState::Disputed)
        && action
            .challenge
            .as_ref()
            .and_then(|c| c.dispute.as_ref())
            .is_some_and(|d| d.ruling == Ruling::Missing)
}
