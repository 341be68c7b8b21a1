//! Shared fixture for unit tests.

use std::sync::Arc;

use accord_arbitration::InMemoryArbitrator;
use accord_core::{ActionId, Amount, AssetId, ManualClock, ParticipantId};
use accord_staking::{Balance, InMemoryTransfer};

use crate::config::AgreementConfig;
use crate::memory::InMemoryDeployment;
use crate::payload::RecordingPayloadRunner;
use crate::Agreement;

const CONFIG: &str = r#"
setting:
  content: "ipfs:QmTest"
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
  - { holder: alice, asset: DAI, amount: 1000 }
  - { holder: bob, asset: ANT, amount: 1000 }
  - { holder: bob, asset: DAI, amount: 1000 }
"#;

pub(crate) fn p(s: &str) -> ParticipantId {
    ParticipantId::new(s).unwrap()
}

pub(crate) fn ant() -> AssetId {
    AssetId::new("ANT").unwrap()
}

pub(crate) fn dai() -> AssetId {
    AssetId::new("DAI").unwrap()
}

pub(crate) struct Fixture {
    pub agreement: Arc<Agreement>,
    pub clock: Arc<ManualClock>,
    pub transfer: Arc<InMemoryTransfer>,
    pub arbitrator: Arc<InMemoryArbitrator>,
    pub payloads: Arc<RecordingPayloadRunner>,
}

impl Fixture {
    pub fn new() -> Self {
        let config = AgreementConfig::from_yaml_str(CONFIG).unwrap();
        let clock = Arc::new(ManualClock::at_epoch(1_700_000_000));
        let deployment = InMemoryDeployment::from_config(&config, clock.clone()).unwrap();
        Self {
            agreement: deployment.agreement,
            clock,
            transfer: deployment.transfer,
            arbitrator: deployment.arbitrator,
            payloads: deployment.payloads,
        }
    }

    pub fn delay(&self) -> u64 {
        self.agreement.current_setting().delay_period
    }

    pub fn settlement(&self) -> u64 {
        self.agreement.current_setting().settlement_period
    }

    pub fn fund_and_stake(&self, who: &str, amount: Amount) {
        self.agreement.stake(&p(who), amount).unwrap();
    }

    pub fn collateral_balance(&self, who: &str) -> Balance {
        self.agreement.balance(&p(who), &ant())
    }

    /// alice stakes and schedules; bob challenges with `offer`.
    pub fn challenged_action(&self, offer: Amount) -> ActionId {
        self.fund_and_stake("alice", 100);
        let id = self.agreement.schedule(&p("alice"), "pay", "alice context").unwrap();
        self.agreement
            .challenge(id, &p("bob"), offer, "bob context")
            .unwrap();
        id
    }
}
