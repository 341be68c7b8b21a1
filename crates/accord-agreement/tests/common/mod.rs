//! Shared harness for agreement integration tests.

#![allow(dead_code)]

use std::sync::Arc;

use accord_agreement::{AgreementConfig, InMemoryDeployment};
use accord_core::{ActionId, Amount, AssetId, ManualClock, ParticipantId};
use accord_staking::Balance;

pub const COLLATERAL: Amount = 100;
pub const CHALLENGE_STAKE: Amount = 50;
pub const DELAY: u64 = 86_400;
pub const SETTLEMENT: u64 = 3_600;
pub const FEE: Amount = 20;
pub const GENESIS: Amount = 10_000;

pub fn config_yaml() -> String {
    format!(
        r#"
setting:
  content: "ipfs:QmAgreement"
  collateral_asset: ANT
  collateral_amount: {COLLATERAL}
  challenge_stake: {CHALLENGE_STAKE}
  delay_period_secs: {DELAY}
  settlement_period_secs: {SETTLEMENT}
arbitrator:
  account: court
  fee_asset: DAI
  fee_amount: {FEE}
genesis:
  - {{ holder: alice, asset: ANT, amount: {GENESIS} }}
  - {{ holder: alice, asset: DAI, amount: {GENESIS} }}
  - {{ holder: bob, asset: ANT, amount: {GENESIS} }}
  - {{ holder: bob, asset: DAI, amount: {GENESIS} }}
  - {{ holder: carol, asset: ANT, amount: {GENESIS} }}
  - {{ holder: carol, asset: DAI, amount: {GENESIS} }}
"#
    )
}

pub fn p(s: &str) -> ParticipantId {
    ParticipantId::new(s).unwrap()
}

pub fn ant() -> AssetId {
    AssetId::new("ANT").unwrap()
}

pub fn dai() -> AssetId {
    AssetId::new("DAI").unwrap()
}

pub struct Harness {
    pub env: InMemoryDeployment,
    pub clock: Arc<ManualClock>,
}

impl Harness {
    pub fn new() -> Self {
        Self::from_yaml(&config_yaml())
    }

    pub fn from_yaml(yaml: &str) -> Self {
        let config = AgreementConfig::from_yaml_str(yaml).unwrap();
        let clock = Arc::new(ManualClock::at_epoch(1_700_000_000));
        let env = InMemoryDeployment::from_config(&config, clock.clone()).unwrap();
        Self { env, clock }
    }

    pub fn ant(&self, who: &str) -> Balance {
        self.env.agreement.balance(&p(who), &ant())
    }

    pub fn wallet(&self, who: &str, asset: &AssetId) -> Amount {
        self.env.transfer.balance_of(&p(who), asset)
    }

    /// alice stakes `stake` and schedules one action.
    pub fn scheduled(&self, stake: Amount) -> ActionId {
        self.env.agreement.stake(&p("alice"), stake).unwrap();
        self.env
            .agreement
            .schedule(&p("alice"), "transfer:42", "pay the vendor")
            .unwrap()
    }

    /// alice schedules, bob challenges with `offer`.
    pub fn challenged(&self, offer: Amount) -> ActionId {
        let id = self.scheduled(COLLATERAL);
        self.env
            .agreement
            .challenge(id, &p("bob"), offer, "vendor is fake")
            .unwrap();
        id
    }

    pub fn assert_conserved(&self) {
        for check in self.env.custody_checks() {
            assert!(check.holds(), "conservation violated: {check:?}");
        }
    }
}
