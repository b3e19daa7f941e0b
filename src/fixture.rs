//! Bootstraps a local ledger from a [`ScenarioConfig`]: the in-memory network
//! seeded with the configured accounts, a client operated by the first
//! account, and a mirror node on demand.

use std::sync::Arc;

use anyhow::{Context, Result};

use crate::{
    client::Client,
    config::{ConfiguredAccount, ScenarioConfig},
    id::AccountId,
    key::PrivateKey,
    mirror::{
        MirrorClient,
        server::{self, MirrorServer},
    },
    network::{LedgerNetwork, in_memory::InMemoryNetwork},
};

/// Configured account the scenarios can act as.
#[derive(Debug, Clone)]
pub struct Party {
    pub account_id: AccountId,
    pub private_key: PrivateKey,
}

impl From<ConfiguredAccount> for Party {
    fn from(account: ConfiguredAccount) -> Self {
        Self {
            account_id: account.account_id,
            private_key: account.private_key,
        }
    }
}

/// Mirror node server together with a client pointed at it.
#[derive(Debug)]
pub struct LocalMirror {
    pub server: MirrorServer,
    pub client: MirrorClient,
}

#[derive(Debug, Clone)]
pub struct LocalLedger {
    config: ScenarioConfig,
    network: Arc<InMemoryNetwork>,
    parties: Vec<Party>,
}

impl LocalLedger {
    pub fn boot(config: &ScenarioConfig) -> Result<Self> {
        let genesis = config
            .genesis()
            .context("Failed to build genesis accounts")?;
        let parties = config
            .accounts()
            .context("Failed to read configured accounts")?
            .into_iter()
            .map(Party::from)
            .collect();
        Ok(Self {
            config: config.clone(),
            network: Arc::new(InMemoryNetwork::new(genesis, config.fees)),
            parties,
        })
    }

    pub fn config(&self) -> &ScenarioConfig {
        &self.config
    }

    pub fn network(&self) -> Arc<dyn LedgerNetwork> {
        self.network.clone()
    }

    /// The treasury, always present since a config without accounts is rejected.
    pub fn treasury(&self) -> &Party {
        &self.parties[0]
    }

    /// Configured account by position, `0` being the treasury.
    pub fn party(&self, index: usize) -> Result<&Party> {
        self.parties
            .get(index)
            .with_context(|| format!("No account configured at position {index}"))
    }

    /// Client with the treasury as operator.
    pub fn client(&self) -> Client {
        let treasury = self.treasury();
        let mut client = Client::for_network(self.network());
        client.set_operator(treasury.account_id, treasury.private_key.clone());
        client
    }

    pub async fn spawn_mirror(&self) -> Result<LocalMirror> {
        let server = server::spawn(self.network(), self.config.mirror.ingest_delay())
            .await
            .context("Failed to start mirror node")?;
        let client = MirrorClient::new(server.base_url(), self.config.mirror.request_timeout())
            .context("Failed to build mirror node client")?;
        Ok(LocalMirror { server, client })
    }
}
