use std::fmt;

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::{
    account::AccountBalance,
    hbar::Hbar,
    id::{AccountId, TokenId, TopicId, TransactionId},
    receipt::{Status, TransactionReceipt, TransactionRecord},
    token::TokenInfo,
    topic::{TopicInfo, TopicMessage},
    transaction::{FrozenTransaction, TransactionKind},
};

pub mod in_memory;

#[derive(Debug, Error, PartialEq, Eq)]
pub enum NetworkError {
    #[error("Transaction rejected at precheck with status {0}")]
    Precheck(Status),
    #[error("Request failed with status {0}")]
    Status(Status),
    #[error("Ledger state is unavailable")]
    Unavailable,
}

impl NetworkError {
    pub fn status(&self) -> Option<Status> {
        match self {
            NetworkError::Precheck(status) | NetworkError::Status(status) => Some(*status),
            NetworkError::Unavailable => None,
        }
    }
}

/// The ledger as seen by a client. Transactions are handled on submit,
/// their outcome is read back through [`LedgerNetwork::receipt`].
///
/// NOTE: the in-memory network is the only implementation, the trait is the
/// seam where a remote ledger would plug in.
#[async_trait]
pub trait LedgerNetwork: fmt::Debug + Send + Sync {
    async fn submit(&self, transaction: FrozenTransaction) -> Result<(), NetworkError>;

    async fn receipt(&self, transaction_id: &TransactionId)
    -> Result<TransactionReceipt, NetworkError>;

    async fn record(&self, transaction_id: &TransactionId)
    -> Result<TransactionRecord, NetworkError>;

    async fn account_balance(&self, account_id: AccountId) -> Result<AccountBalance, NetworkError>;

    async fn token_info(&self, token_id: TokenId) -> Result<TokenInfo, NetworkError>;

    async fn topic_info(&self, topic_id: TopicId) -> Result<TopicInfo, NetworkError>;

    /// Every message of the topic in consensus order.
    async fn topic_messages(&self, topic_id: TopicId) -> Result<Vec<TopicMessage>, NetworkError>;
}

/// Fixed fee charged to the payer per transaction kind.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct FeeSchedule {
    pub account_create: Hbar,
    pub token_create: Hbar,
    pub token_associate: Hbar,
    pub token_mint: Hbar,
    pub transfer: Hbar,
    pub topic_create: Hbar,
    pub topic_message_submit: Hbar,
}

impl Default for FeeSchedule {
    fn default() -> Self {
        Self {
            account_create: Hbar::from_tinybars(5_000_000),
            token_create: Hbar::new(1),
            token_associate: Hbar::from_tinybars(5_000_000),
            token_mint: Hbar::from_tinybars(100_000),
            transfer: Hbar::from_tinybars(100_000),
            topic_create: Hbar::from_tinybars(1_000_000),
            topic_message_submit: Hbar::from_tinybars(10_000),
        }
    }
}

impl FeeSchedule {
    pub fn fee_for(&self, kind: TransactionKind) -> Hbar {
        match kind {
            TransactionKind::AccountCreate => self.account_create,
            TransactionKind::TokenCreate => self.token_create,
            TransactionKind::TokenAssociate => self.token_associate,
            TransactionKind::TokenMint => self.token_mint,
            TransactionKind::Transfer => self.transfer,
            TransactionKind::TopicCreate => self.topic_create,
            TransactionKind::TopicMessageSubmit => self.topic_message_submit,
        }
    }
}
