//! # accord-cli: CLI Tool for the Accord Protocol
//!
//! Provides the `accord` command-line interface.
//!
//! ## Subcommands
//!
//! - `accord validate`: Parse and validate an agreement config.
//! - `accord simulate`: Run a scripted scenario against in-memory
//!   collaborators on a manual clock and report the outcome.
//!
//! ```bash
//! accord validate agreement.yaml
//! accord -v simulate scenario.yaml --output report.json
//! ```
//!
//! Exit codes: 0 on success, 1 when validation fails, a scenario
//! expectation is violated, or an operational error occurs.

pub mod simulate;
pub mod validate;
