//! # In-Memory Deployment
//!
//! Wires an [`Agreement`] to in-memory collaborators built from an
//! [`AgreementConfig`]: a wallet-backed value transfer seeded with the
//! genesis balances, an in-memory arbitration service and a recording
//! payload runner. The HTTP service, the scenario simulator and the
//! integration tests all run on this.

use std::sync::Arc;

use accord_arbitration::InMemoryArbitrator;
use accord_core::{AssetId, Clock};
use accord_staking::{ConservationReport, InMemoryTransfer};
use serde::Serialize;

use crate::agreement::{Agreement, Collaborators};
use crate::config::{AgreementConfig, ConfigError};
use crate::payload::RecordingPayloadRunner;

/// Custody reconciliation for one asset.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct CustodyCheck {
    /// Ledger-side audit.
    pub ledger: ConservationReport,
    /// What the transfer collaborator actually holds for the protocol.
    pub custody: u64,
}

impl CustodyCheck {
    /// Ledger conserves value and custody matches it.
    pub fn holds(&self) -> bool {
        self.ledger.holds()
            && self
                .ledger
                .participant_total
                .checked_add(self.ledger.escrow)
                .is_some_and(|held| held == self.custody)
    }
}

/// An agreement and handles to its in-memory collaborators.
#[derive(Debug, Clone)]
pub struct InMemoryDeployment {
    /// The agreement.
    pub agreement: Arc<Agreement>,
    /// Value transfer collaborator.
    pub transfer: Arc<InMemoryTransfer>,
    /// Arbitration service.
    pub arbitrator: Arc<InMemoryArbitrator>,
    /// Payload runner.
    pub payloads: Arc<RecordingPayloadRunner>,
}

impl InMemoryDeployment {
    /// Validate `config` and build the deployment on `clock`.
    pub fn from_config(config: &AgreementConfig, clock: Arc<dyn Clock>) -> Result<Self, ConfigError> {
        config.validate()?;

        let transfer = Arc::new(InMemoryTransfer::new());
        for entry in &config.genesis {
            transfer.credit(&entry.holder, &entry.asset, entry.amount);
        }
        let arbitrator = Arc::new(InMemoryArbitrator::new(
            config.arbitrator.account.clone(),
            config.arbitrator.fees(),
        ));
        let payloads = Arc::new(RecordingPayloadRunner::new());

        let collaborators = Collaborators {
            transfer: transfer.clone(),
            arbitrator: arbitrator.clone(),
            payloads: payloads.clone(),
            clock,
        };
        let agreement = Agreement::new(
            config.setting.to_params(),
            config.permissions.to_permissions(),
            collaborators,
        )
        .map_err(|e| ConfigError::Invalid {
            errors: vec![e.to_string()],
        })?;

        tracing::debug!(genesis = config.genesis.len(), "in-memory deployment ready");
        Ok(Self {
            agreement: Arc::new(agreement),
            transfer,
            arbitrator,
            payloads,
        })
    }

    /// Reconcile one asset between the ledger and the transfer custody.
    pub fn custody_check(&self, asset: &AssetId) -> CustodyCheck {
        CustodyCheck {
            ledger: self.agreement.ledger_totals(asset),
            custody: self.transfer.custody(asset),
        }
    }

    /// Reconcile every asset the ledger has seen.
    pub fn custody_checks(&self) -> Vec<CustodyCheck> {
        self.agreement
            .audit_all()
            .into_iter()
            .map(|ledger| CustodyCheck {
                custody: self.transfer.custody(&ledger.asset),
                ledger,
            })
            .collect()
    }
}
