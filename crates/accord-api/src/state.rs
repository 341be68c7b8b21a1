//! # Application State
//!
//! Shared state for the Axum application, passed to all route handlers
//! via the `State` extractor. It wraps one in-memory agreement deployment.
//! The agreement serializes its own operations with `parking_lot` locks that
//! are never held across `.await` points, so handlers call it directly.

use std::sync::Arc;

use accord_agreement::{Agreement, AgreementConfig, ConfigError, InMemoryDeployment};
use accord_core::Clock;

/// Shared application state.
#[derive(Debug, Clone)]
pub struct AppState {
    /// The agreement and its collaborators.
    pub deployment: InMemoryDeployment,
}

impl AppState {
    /// Wrap an existing deployment.
    pub fn new(deployment: InMemoryDeployment) -> Self {
        Self { deployment }
    }

    /// Build a deployment from `config` on `clock`.
    pub fn from_config(config: &AgreementConfig, clock: Arc<dyn Clock>) -> Result<Self, ConfigError> {
        InMemoryDeployment::from_config(config, clock).map(Self::new)
    }

    /// The agreement.
    pub fn agreement(&self) -> &Agreement {
        &self.deployment.agreement
    }
}

/// State over the built-in default config, with a clock the test drives.
#[cfg(test)]
pub(crate) fn test_state() -> (AppState, Arc<accord_core::ManualClock>) {
    let config = AgreementConfig::from_yaml_str(accord_agreement::DEFAULT_CONFIG_YAML).unwrap();
    let clock = Arc::new(accord_core::ManualClock::at_epoch(1_700_000_000));
    (AppState::from_config(&config, clock.clone()).unwrap(), clock)
}
