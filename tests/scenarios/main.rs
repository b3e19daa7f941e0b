//! Behavior scenarios for topics and tokens, run by cucumber against a
//! fresh local ledger per scenario.

use std::sync::OnceLock;

use cucumber::World;
use futures::FutureExt;
use ledger_scenarios::{
    client::{Client, TransactionResponse},
    config::ScenarioConfig,
    fixture::{LocalLedger, LocalMirror, Party},
    id::{TokenId, TopicId},
    key::KeyList,
    mirror::MirrorClient,
    transaction::FrozenTransaction,
};

mod steps;

const DEFAULT_CONFIG: &str = concat!(env!("CARGO_MANIFEST_DIR"), "/tests/fixtures/ledger.toml");
const FEATURES: &str = concat!(env!("CARGO_MANIFEST_DIR"), "/tests/features");

fn config() -> &'static ScenarioConfig {
    static CONFIG: OnceLock<ScenarioConfig> = OnceLock::new();
    CONFIG.get_or_init(|| ScenarioConfig::load(DEFAULT_CONFIG).expect("scenario config loads"))
}

/// State shared by the steps of one scenario.
#[derive(Debug, World)]
#[world(init = Self::new)]
pub struct LedgerWorld {
    pub scenario: String,
    pub ledger: LocalLedger,
    pub client: Client,
    /// Configured account 0, treasury and default operator.
    pub treasury: Party,
    /// First through fourth account, as the scenario introduces them.
    pub parties: [Option<Party>; 4],
    pub threshold_key: Option<KeyList>,
    pub topic_id: Option<TopicId>,
    pub token_id: Option<TokenId>,
    pub pending_transfer: Option<FrozenTransaction>,
    pub submitted: Option<TransactionResponse>,
    mirror: Option<LocalMirror>,
}

impl LedgerWorld {
    fn new() -> Self {
        let ledger = LocalLedger::boot(config()).expect("local ledger boots");
        Self {
            scenario: String::new(),
            client: ledger.client(),
            treasury: ledger.treasury().clone(),
            ledger,
            parties: Default::default(),
            threshold_key: None,
            topic_id: None,
            token_id: None,
            pending_transfer: None,
            submitted: None,
            mirror: None,
        }
    }

    pub fn party(&self, index: usize) -> &Party {
        self.parties[index]
            .as_ref()
            .unwrap_or_else(|| panic!("the {} account is not set", steps::ORDINALS[index]))
    }

    pub fn token_id(&self) -> TokenId {
        self.token_id.expect("no token has been created")
    }

    pub fn topic_id(&self) -> TopicId {
        self.topic_id.expect("no topic has been created")
    }

    /// Makes `party` the operator that pays for and signs transactions.
    pub fn operate_as(&mut self, party: &Party) {
        self.client
            .set_operator(party.account_id, party.private_key.clone());
    }

    /// Mirror node client, starting the local mirror node on first use.
    pub async fn mirror(&mut self) -> &MirrorClient {
        let mirror = match self.mirror.take() {
            Some(mirror) => mirror,
            None => self
                .ledger
                .spawn_mirror()
                .await
                .expect("mirror node starts"),
        };
        &self.mirror.insert(mirror).client
    }
}

#[tokio::main]
async fn main() {
    ledger_scenarios::logging::init();

    LedgerWorld::cucumber()
        .before(|_feature, _rule, scenario, world| {
            async move {
                world.scenario = scenario.name.clone();
                let treasury = world.treasury.clone();
                world.operate_as(&treasury);
            }
            .boxed_local()
        })
        .run_and_exit(FEATURES)
        .await;
}
