use std::sync::Arc;

use thiserror::Error;
use tracing::debug;

use crate::{
    account::AccountBalance,
    id::{AccountId, TokenId, TopicId, TransactionId},
    key::PrivateKey,
    network::{LedgerNetwork, NetworkError},
    receipt::{Status, TransactionReceipt, TransactionRecord},
    token::TokenInfo,
    topic::TopicInfo,
    transaction::{FrozenTransaction, TransactionBody},
};

#[derive(Debug, Error)]
pub enum ClientError {
    #[error("Client has no operator to pay for and sign transactions")]
    NoOperator,
    #[error("Transaction {transaction_id} failed precheck with status {status}")]
    Precheck {
        transaction_id: TransactionId,
        status: Status,
    },
    #[error("Receipt for transaction {transaction_id} contained error status {status}")]
    ReceiptStatus {
        transaction_id: TransactionId,
        status: Status,
    },
    #[error("Query failed with status {0}")]
    Query(Status),
    #[error("Failed to encode transaction body: {0}")]
    Encode(#[from] serde_json::Error),
    #[error(transparent)]
    Network(NetworkError),
}

impl ClientError {
    /// Ledger status behind the error, if the ledger reported one.
    pub fn status(&self) -> Option<Status> {
        match self {
            ClientError::Precheck { status, .. } | ClientError::ReceiptStatus { status, .. } => {
                Some(*status)
            }
            ClientError::Query(status) => Some(*status),
            ClientError::Network(err) => err.status(),
            ClientError::NoOperator | ClientError::Encode(_) => None,
        }
    }
}

impl From<NetworkError> for ClientError {
    fn from(err: NetworkError) -> Self {
        match err {
            NetworkError::Status(status) => ClientError::Query(status),
            err => ClientError::Network(err),
        }
    }
}

#[derive(Debug, Clone)]
struct Operator {
    account_id: AccountId,
    private_key: PrivateKey,
}

/// Entry point for talking to a ledger. The operator pays for and signs
/// every transaction the client executes.
#[derive(Debug, Clone)]
pub struct Client {
    network: Arc<dyn LedgerNetwork>,
    operator: Option<Operator>,
}

impl Client {
    pub fn for_network(network: Arc<dyn LedgerNetwork>) -> Self {
        Self {
            network,
            operator: None,
        }
    }

    pub fn set_operator(&mut self, account_id: AccountId, private_key: PrivateKey) -> &mut Self {
        self.operator = Some(Operator {
            account_id,
            private_key,
        });
        self
    }

    pub fn operator_account_id(&self) -> Option<AccountId> {
        self.operator.as_ref().map(|operator| operator.account_id)
    }

    pub fn network(&self) -> &Arc<dyn LedgerNetwork> {
        &self.network
    }

    pub(crate) fn freeze(&self, body: TransactionBody) -> Result<FrozenTransaction, ClientError> {
        let payer = self.operator_account_id().ok_or(ClientError::NoOperator)?;
        Ok(FrozenTransaction::new(TransactionId::generate(payer), body)?)
    }

    /// Signs with the operator key and submits.
    pub async fn execute(
        &self,
        transaction: FrozenTransaction,
    ) -> Result<TransactionResponse, ClientError> {
        let operator = self.operator.as_ref().ok_or(ClientError::NoOperator)?;
        let transaction = transaction.sign(&operator.private_key);
        let transaction_id = transaction.transaction_id();
        debug!(%transaction_id, "execute");
        self.network
            .submit(transaction)
            .await
            .map_err(|err| match err {
                NetworkError::Precheck(status) => ClientError::Precheck {
                    transaction_id,
                    status,
                },
                err => err.into(),
            })?;
        Ok(TransactionResponse { transaction_id })
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct TransactionResponse {
    pub transaction_id: TransactionId,
}

impl TransactionResponse {
    /// Fails with [`ClientError::ReceiptStatus`] unless the transaction succeeded.
    pub async fn get_receipt(&self, client: &Client) -> Result<TransactionReceipt, ClientError> {
        let receipt = client.network.receipt(&self.transaction_id).await?;
        self.ensure_success(receipt.status)?;
        Ok(receipt)
    }

    /// Fails with [`ClientError::ReceiptStatus`] unless the transaction succeeded.
    pub async fn get_record(&self, client: &Client) -> Result<TransactionRecord, ClientError> {
        let record = client.network.record(&self.transaction_id).await?;
        self.ensure_success(record.receipt.status)?;
        Ok(record)
    }

    fn ensure_success(&self, status: Status) -> Result<(), ClientError> {
        if status.is_success() {
            Ok(())
        } else {
            Err(ClientError::ReceiptStatus {
                transaction_id: self.transaction_id,
                status,
            })
        }
    }
}

#[derive(Debug, Clone, Default)]
pub struct AccountBalanceQuery {
    account_id: Option<AccountId>,
}

impl AccountBalanceQuery {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn account_id(mut self, account_id: AccountId) -> Self {
        self.account_id = Some(account_id);
        self
    }

    pub async fn execute(&self, client: &Client) -> Result<AccountBalance, ClientError> {
        let account_id = self
            .account_id
            .ok_or(ClientError::Query(Status::InvalidAccountId))?;
        Ok(client.network.account_balance(account_id).await?)
    }
}

#[derive(Debug, Clone, Default)]
pub struct TokenInfoQuery {
    token_id: Option<TokenId>,
}

impl TokenInfoQuery {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn token_id(mut self, token_id: TokenId) -> Self {
        self.token_id = Some(token_id);
        self
    }

    pub async fn execute(&self, client: &Client) -> Result<TokenInfo, ClientError> {
        let token_id = self
            .token_id
            .ok_or(ClientError::Query(Status::InvalidTokenId))?;
        Ok(client.network.token_info(token_id).await?)
    }
}

#[derive(Debug, Clone, Default)]
pub struct TopicInfoQuery {
    topic_id: Option<TopicId>,
}

impl TopicInfoQuery {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn topic_id(mut self, topic_id: TopicId) -> Self {
        self.topic_id = Some(topic_id);
        self
    }

    pub async fn execute(&self, client: &Client) -> Result<TopicInfo, ClientError> {
        let topic_id = self
            .topic_id
            .ok_or(ClientError::Query(Status::InvalidTopicId))?;
        Ok(client.network.topic_info(topic_id).await?)
    }
}

#[cfg(test)]
mod tests {
    use crate::{
        hbar::Hbar,
        key::Key,
        network::{
            FeeSchedule,
            in_memory::{GenesisAccount, InMemoryNetwork},
        },
        transaction::{
            AccountCreateTransaction, TokenCreateTransaction, TokenMintTransaction,
            TopicCreateTransaction,
        },
    };

    use super::*;

    const OPERATOR: AccountId = AccountId::new(0, 0, 1001);

    fn client() -> (Client, PrivateKey) {
        let key = PrivateKey::generate_ed25519();
        let network = InMemoryNetwork::new(
            [GenesisAccount {
                account_id: OPERATOR,
                key: Key::from(&key),
                balance: Hbar::new(100),
            }],
            FeeSchedule::default(),
        );
        let mut client = Client::for_network(Arc::new(network));
        client.set_operator(OPERATOR, key.clone());
        (client, key)
    }

    #[tokio::test]
    async fn execute_requires_operator() {
        let (client, _) = client();
        let anonymous = Client::for_network(client.network().clone());
        let err = TopicCreateTransaction::new()
            .execute(&anonymous)
            .await
            .unwrap_err();
        assert!(matches!(err, ClientError::NoOperator));
    }

    #[tokio::test]
    async fn operator_signs_and_pays() {
        let (client, _) = client();
        let response = AccountCreateTransaction::new()
            .key(PrivateKey::generate_ed25519().public_key())
            .initial_balance(Hbar::new(2))
            .execute(&client)
            .await
            .unwrap();
        assert_eq!(response.transaction_id.account_id, OPERATOR);

        let record = response.get_record(&client).await.unwrap();
        assert_eq!(record.transaction_id.account_id, OPERATOR);
        let account_id = record.receipt.account_id.unwrap();

        let balance = AccountBalanceQuery::new()
            .account_id(account_id)
            .execute(&client)
            .await
            .unwrap();
        assert_eq!(balance.hbars, Hbar::new(2));
    }

    #[tokio::test]
    async fn failed_receipt_is_an_error() {
        let (client, _) = client();
        let receipt = TokenCreateTransaction::new()
            .name("Test Token")
            .symbol("HTT")
            .treasury_account_id(OPERATOR)
            .initial_supply(10)
            .execute(&client)
            .await
            .unwrap()
            .get_receipt(&client)
            .await
            .unwrap();
        let token_id = receipt.token_id.unwrap();

        let err = TokenMintTransaction::new()
            .token_id(token_id)
            .amount(10)
            .execute(&client)
            .await
            .unwrap()
            .get_receipt(&client)
            .await
            .unwrap_err();
        assert!(matches!(err, ClientError::ReceiptStatus { .. }));
        assert_eq!(err.status(), Some(Status::TokenHasNoSupplyKey));

        let info = TokenInfoQuery::new()
            .token_id(token_id)
            .execute(&client)
            .await
            .unwrap();
        assert_eq!(info.total_supply, 10);
        assert_eq!(info.treasury_account_id, OPERATOR);
    }

    #[tokio::test]
    async fn precheck_failures_carry_transaction_id() {
        let (client, _) = client();
        let err = TokenMintTransaction::new()
            .token_id(TokenId::new(0, 0, 5))
            .execute(&client)
            .await
            .unwrap_err();
        assert!(matches!(
            err,
            ClientError::Precheck {
                status: Status::InvalidTokenMintAmount,
                ..
            }
        ));

        let err = TopicInfoQuery::new().execute(&client).await.unwrap_err();
        assert_eq!(err.status(), Some(Status::InvalidTopicId));
    }
}
