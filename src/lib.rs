/// Entity ids, timestamps and transaction ids.
pub mod id;

/// Native currency amounts.
pub mod hbar;

/// ED25519 keys and key lists.
pub mod key;

/// Status codes, receipts and records returned for every transaction.
pub mod receipt;

/// Account balances and token relationships.
/// State is modified using events, which are created by handling requests
pub mod account;

pub mod token;

pub mod topic;

/// Transaction builders, stateless validation and signing.
pub mod transaction;

/// Ledger network interface, plus "in memory" implementation.
///
/// NOTE: the client only talks to the ledger through [`network::LedgerNetwork`],
/// so the in memory ledger could be swapped for a remote one.
pub mod network;

/// Client that signs and submits transactions and runs queries.
pub mod client;

/// Mirror node REST client and a local server serving the same API.
pub mod mirror;

pub mod config;

pub mod logging;

/// Bootstraps a local ledger from configuration, used by the scenario runner
/// and the integration tests.
pub mod fixture;
