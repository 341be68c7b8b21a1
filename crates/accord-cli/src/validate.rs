//! # Validate Subcommand
//!
//! Parses an agreement config and reports every problem `validate()` finds.

use std::path::PathBuf;

use accord_agreement::{AgreementConfig, ConfigError};
use anyhow::{Context, Result};
use clap::Args;

/// Arguments for the `accord validate` subcommand.
#[derive(Args, Debug)]
pub struct ValidateArgs {
    /// Agreement config file (YAML).
    #[arg(value_name = "CONFIG")]
    pub config: PathBuf,
}

/// Execute the validate subcommand.
///
/// Returns exit code: 0 when valid, 1 when the config parses but is invalid.
/// Unreadable or unparseable files are errors.
pub fn run_validate(args: &ValidateArgs) -> Result<u8> {
    let config = AgreementConfig::from_path(&args.config)
        .with_context(|| format!("failed to load {}", args.config.display()))?;

    match config.validate() {
        Ok(()) => {
            println!(
                "OK: {} (collateral {} {}, arbitrator {}, {} genesis balance(s))",
                args.config.display(),
                config.setting.collateral_amount,
                config.setting.collateral_asset,
                config.arbitrator.account,
                config.genesis.len()
            );
            Ok(0)
        }
        Err(ConfigError::Invalid { errors }) => {
            println!("FAIL: {}", args.config.display());
            for error in &errors {
                println!("  {error}");
            }
            tracing::info!(errors = errors.len(), "config rejected");
            Ok(1)
        }
        Err(other) => Err(other.into()),
    }
}
