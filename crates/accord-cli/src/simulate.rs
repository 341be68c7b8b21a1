//! # Simulate Subcommand
//!
//! Runs a scripted scenario against an in-memory deployment on a manual
//! clock. Every step either must succeed or, when it names an
//! `expect_error` code, must fail with exactly that code. The report lists
//! each step's outcome, the final staked balances, and a custody
//! reconciliation per asset.
//!
//! ```yaml
//! config: { ... agreement config ... }
//! steps:
//!   - stake: { who: alice, amount: 100 }
//!   - schedule: { who: alice, payload: "vote:7", context: "enact vote 7" }
//!   - challenge: { action: 1, who: bob, offer: 40, context: "malicious" }
//!   - advance: { secs: 3601 }
//!   - settle: { action: 1, who: alice }
//!     expect_error: SENDER_NOT_ALLOWED
//! ```

use std::path::{Path, PathBuf};
use std::sync::Arc;

use accord_agreement::{AgreementConfig, AgreementError, CustodyCheck, InMemoryDeployment};
use accord_core::{ActionId, DisputeId, ManualClock, ParticipantId};
use accord_staking::BalanceEntry;
use anyhow::{Context, Result};
use clap::Args;
use serde::{Deserialize, Serialize};

/// Clock start when a scenario does not set one.
pub const DEFAULT_START_EPOCH: i64 = 1_700_000_000;

/// Arguments for the `accord simulate` subcommand.
#[derive(Args, Debug)]
pub struct SimulateArgs {
    /// Scenario file (YAML).
    #[arg(value_name = "SCENARIO")]
    pub scenario: PathBuf,

    /// Write the JSON report here instead of stdout.
    #[arg(long, short)]
    pub output: Option<PathBuf>,
}

/// A scripted run.
#[derive(Debug, Clone, Deserialize)]
pub struct Scenario {
    /// Agreement to run against.
    pub config: AgreementConfig,
    /// Clock start, seconds since the epoch.
    #[serde(default)]
    pub start_epoch: Option<i64>,
    /// Steps, in order.
    pub steps: Vec<Step>,
}

impl Scenario {
    /// Read and parse a scenario file.
    pub fn from_path(path: &Path) -> Result<Self> {
        let text = std::fs::read_to_string(path)
            .with_context(|| format!("failed to read {}", path.display()))?;
        serde_yaml::from_str(&text).with_context(|| format!("failed to parse {}", path.display()))
    }
}

/// One step and its expectation.
#[derive(Debug, Clone, Deserialize)]
pub struct Step {
    #[serde(flatten)]
    pub op: Op,
    /// Error code the step must fail with. Absent means it must succeed.
    #[serde(default)]
    pub expect_error: Option<String>,
}

/// Operations a scenario can perform.
#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Op {
    Sign {
        who: ParticipantId,
    },
    Stake {
        who: ParticipantId,
        amount: u64,
    },
    StakeFor {
        payer: ParticipantId,
        who: ParticipantId,
        amount: u64,
    },
    Unstake {
        who: ParticipantId,
        amount: u64,
    },
    Schedule {
        who: ParticipantId,
        payload: String,
        #[serde(default)]
        context: String,
    },
    Challenge {
        action: u64,
        who: ParticipantId,
        offer: u64,
        #[serde(default)]
        context: String,
    },
    Advance {
        secs: u64,
    },
    Settle {
        action: u64,
        who: ParticipantId,
    },
    Dispute {
        action: u64,
        who: ParticipantId,
    },
    Evidence {
        action: u64,
        who: ParticipantId,
        evidence: String,
        #[serde(default)]
        finished: bool,
    },
    /// `who` defaults to the arbitrator account.
    Rule {
        dispute: u64,
        ruling: u8,
        #[serde(default)]
        who: Option<ParticipantId>,
    },
    Execute {
        action: u64,
    },
    Cancel {
        action: u64,
        who: ParticipantId,
    },
}

impl Op {
    fn name(&self) -> &'static str {
        match self {
            Self::Sign { .. } => "sign",
            Self::Stake { .. } => "stake",
            Self::StakeFor { .. } => "stake_for",
            Self::Unstake { .. } => "unstake",
            Self::Schedule { .. } => "schedule",
            Self::Challenge { .. } => "challenge",
            Self::Advance { .. } => "advance",
            Self::Settle { .. } => "settle",
            Self::Dispute { .. } => "dispute",
            Self::Evidence { .. } => "evidence",
            Self::Rule { .. } => "rule",
            Self::Execute { .. } => "execute",
            Self::Cancel { .. } => "cancel",
        }
    }
}

/// Outcome of one step.
#[derive(Debug, Clone, Serialize)]
pub struct StepReport {
    pub index: usize,
    pub op: &'static str,
    /// What a successful step produced, such as a new action id.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub result: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error_code: Option<&'static str>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub expected_error: Option<String>,
    /// Outcome matched the expectation.
    pub as_expected: bool,
}

/// Full simulation report.
#[derive(Debug, Clone, Serialize)]
pub struct SimulationReport {
    pub steps: Vec<StepReport>,
    pub balances: Vec<BalanceEntry>,
    pub custody: Vec<CustodyCheck>,
    pub conserved: bool,
    pub passed: bool,
}

/// Run `scenario` from a fresh deployment.
pub fn simulate(scenario: &Scenario) -> Result<SimulationReport> {
    let clock = Arc::new(ManualClock::at_epoch(
        scenario.start_epoch.unwrap_or(DEFAULT_START_EPOCH),
    ));
    let env = InMemoryDeployment::from_config(&scenario.config, clock.clone())
        .context("scenario config is invalid")?;

    let mut steps = Vec::with_capacity(scenario.steps.len());
    for (index, step) in scenario.steps.iter().enumerate() {
        let outcome = apply(&env, &clock, &step.op);
        let report = match outcome {
            Ok(result) => StepReport {
                index,
                op: step.op.name(),
                result,
                error_code: None,
                error: None,
                expected_error: step.expect_error.clone(),
                as_expected: step.expect_error.is_none(),
            },
            Err(e) => StepReport {
                index,
                op: step.op.name(),
                result: None,
                error_code: Some(e.code()),
                error: Some(e.to_string()),
                as_expected: step.expect_error.as_deref() == Some(e.code()),
                expected_error: step.expect_error.clone(),
            },
        };
        if report.as_expected {
            tracing::debug!(index, op = report.op, "step ok");
        } else {
            tracing::warn!(
                index,
                op = report.op,
                error_code = report.error_code,
                expected = report.expected_error.as_deref(),
                "step did not match expectation"
            );
        }
        steps.push(report);
    }

    let custody = env.custody_checks();
    let conserved = custody.iter().all(CustodyCheck::holds);
    let passed = conserved && steps.iter().all(|s| s.as_expected);
    tracing::info!(steps = steps.len(), conserved, passed, "simulation finished");
    Ok(SimulationReport {
        steps,
        balances: env.agreement.balances(),
        custody,
        conserved,
        passed,
    })
}

fn apply(
    env: &InMemoryDeployment,
    clock: &ManualClock,
    op: &Op,
) -> Result<Option<String>, AgreementError> {
    let a = &env.agreement;
    match op {
        Op::Sign { who } => a.sign(who).map(|id| Some(id.to_string())),
        Op::Stake { who, amount } => a.stake(who, *amount).map(|_| None),
        Op::StakeFor { payer, who, amount } => a.stake_for(payer, who, *amount).map(|_| None),
        Op::Unstake { who, amount } => a.unstake(who, *amount).map(|_| None),
        Op::Schedule {
            who,
            payload,
            context,
        } => a
            .schedule(who, payload.clone(), context.clone())
            .map(|id| Some(id.to_string())),
        Op::Challenge {
            action,
            who,
            offer,
            context,
        } => a
            .challenge(ActionId(*action), who, *offer, context.clone())
            .map(|()| None),
        Op::Advance { secs } => {
            clock.advance(*secs);
            Ok(None)
        }
        Op::Settle { action, who } => a.settle(ActionId(*action), who).map(|()| None),
        Op::Dispute { action, who } => a
            .dispute(ActionId(*action), who)
            .map(|id| Some(id.to_string())),
        Op::Evidence {
            action,
            who,
            evidence,
            finished,
        } => a
            .submit_evidence(ActionId(*action), who, evidence.clone(), *finished)
            .map(|id| Some(id.to_string())),
        Op::Rule {
            dispute,
            ruling,
            who,
        } => {
            let by = who.clone().unwrap_or_else(|| a.arbitrator_account());
            a.rule_code(DisputeId(*dispute), *ruling, &by)
                .map(|state| Some(state.to_string()))
        }
        Op::Execute { action } => a.execute(ActionId(*action)).map(|()| None),
        Op::Cancel { action, who } => a.cancel(ActionId(*action), who).map(|()| None),
    }
}

/// Execute the simulate subcommand.
///
/// Returns exit code: 0 when every step matched its expectation and value
/// was conserved, 1 otherwise.
pub fn run_simulate(args: &SimulateArgs) -> Result<u8> {
    let scenario = Scenario::from_path(&args.scenario)?;
    let report = simulate(&scenario)?;
    let json = serde_json::to_string_pretty(&report).context("failed to encode report")?;

    match &args.output {
        Some(path) => {
            std::fs::write(path, &json)
                .with_context(|| format!("failed to write {}", path.display()))?;
            tracing::info!(path = %path.display(), "report written");
        }
        None => println!("{json}"),
    }

    if !report.conserved {
        tracing::error!("value conservation violated");
    }
    Ok(if report.passed { 0 } else { 1 })
}

#[cfg(test)]
mod tests {
    use super::*;

    const CONFIG: &str = r#"
setting:
  content: "ipfs:sim"
  collateral_asset: ANT
  collateral_amount: 100
  challenge_stake: 50
  delay_period_secs: 100
  settlement_period_secs: 10
arbitrator:
  account: court
  fee_asset: DAI
  fee_amount: 20
genesis:
  - { holder: alice, asset: ANT, amount: 1000 }
  - { holder: alice, asset: DAI, amount: 100 }
  - { holder: bob, asset: ANT, amount: 1000 }
  - { holder: bob, asset: DAI, amount: 100 }
"#;

    fn scenario(steps: &str) -> Scenario {
        let yaml = format!(
            "config:\n{}\nsteps:\n{steps}",
            CONFIG
                .lines()
                .map(|l| format!("  {l}"))
                .collect::<Vec<_>>()
                .join("\n")
        );
        serde_yaml::from_str(&yaml).unwrap()
    }

    #[test]
    fn parses_steps_with_expectations() {
        let s = scenario(
            "  - stake: { who: alice, amount: 100 }\n  - unstake: { who: alice, amount: 1 }\n    expect_error: BELOW_COLLATERAL_AMOUNT\n",
        );
        assert_eq!(s.steps.len(), 2);
        assert!(matches!(s.steps[0].op, Op::Stake { amount: 100, .. }));
        assert_eq!(s.steps[1].expect_error.as_deref(), Some("BELOW_COLLATERAL_AMOUNT"));
    }

    #[test]
    fn disputed_action_rejected_then_executed() {
        let s = scenario(
            r#"  - stake: { who: alice, amount: 100 }
  - schedule: { who: alice, payload: "vote:1", context: "ok" }
  - challenge: { action: 1, who: bob, offer: 30, context: "bad" }
  - dispute: { action: 1, who: alice }
  - rule: { dispute: 0, ruling: 3 }
  - rule: { dispute: 0, ruling: 4 }
    expect_error: CANNOT_RULE_ACTION
  - execute: { action: 1 }
"#,
        );
        let report = simulate(&s).unwrap();
        assert!(report.passed, "{report:#?}");
        assert_eq!(report.steps[4].result.as_deref(), Some("REJECTED"));
        assert!(report.conserved);
    }

    #[test]
    fn unmet_expectation_fails_the_run() {
        let s = scenario(
            "  - stake: { who: alice, amount: 100 }\n    expect_error: INVALID_AMOUNT\n",
        );
        let report = simulate(&s).unwrap();
        assert!(!report.passed);
        assert!(report.conserved);
        assert!(!report.steps[0].as_expected);
    }

    #[test]
    fn wrong_error_code_is_not_a_match() {
        let s = scenario(
            "  - stake: { who: alice, amount: 0 }\n    expect_error: BELOW_COLLATERAL_AMOUNT\n",
        );
        let report = simulate(&s).unwrap();
        assert_eq!(report.steps[0].error_code, Some("INVALID_AMOUNT"));
        assert!(!report.passed);
    }
}
