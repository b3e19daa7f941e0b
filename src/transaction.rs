use std::collections::{BTreeMap, BTreeSet};

use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::{
    client::{Client, ClientError, TransactionResponse},
    hbar::Hbar,
    id::{AccountId, TokenId, TopicId, TransactionId},
    key::{Key, PrivateKey, PublicKey},
    receipt::Status,
    token::TokenSupplyType,
};

pub const MAX_MEMO_BYTES: usize = 100;
pub const MAX_MESSAGE_BYTES: usize = 1024;
pub const MAX_TOKEN_DECIMALS: u32 = 18;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum TransactionKind {
    AccountCreate,
    TokenCreate,
    TokenAssociate,
    TokenMint,
    Transfer,
    TopicCreate,
    TopicMessageSubmit,
}

/// Problems detectable from the transaction alone, before any state is read.
#[derive(Debug, Error, PartialEq, Eq)]
pub enum ValidationError {
    #[error("Token name is required")]
    MissingTokenName,
    #[error("Token symbol is required")]
    MissingTokenSymbol,
    #[error("Token treasury is required")]
    MissingTreasury,
    #[error("Token decimals must not exceed {MAX_TOKEN_DECIMALS}, got {0}")]
    InvalidDecimals(u32),
    #[error("Max supply {max_supply} is not valid for {supply_type:?} supply")]
    InvalidMaxSupply {
        supply_type: TokenSupplyType,
        max_supply: u64,
    },
    #[error("Initial supply {initial_supply} exceeds max supply {max_supply}")]
    InitialSupplyAboveMax { initial_supply: u64, max_supply: u64 },
    #[error("Memo must not exceed {MAX_MEMO_BYTES} bytes, got {0}")]
    MemoTooLong(usize),
    #[error("Message must not be empty")]
    EmptyMessage,
    #[error("Message must not exceed {MAX_MESSAGE_BYTES} bytes, got {0}")]
    MessageTooLarge(usize),
    #[error("Mint amount must be positive")]
    ZeroMintAmount,
    #[error("Initial balance must not be negative")]
    NegativeInitialBalance,
    #[error("At least one token is required")]
    EmptyTokenList,
    #[error("Token {0} is listed more than once")]
    RepeatedToken(TokenId),
    #[error("Transfer list is empty")]
    EmptyTransfer,
    #[error("Hbar transfer amounts must be non-zero, negatable and sum to zero")]
    HbarAmounts,
    #[error("Transfer amounts of token {0} must be non-zero, negatable and sum to zero")]
    TokenAmounts(TokenId),
}

impl ValidationError {
    pub fn status(&self) -> Status {
        match self {
            ValidationError::MissingTokenName => Status::MissingTokenName,
            ValidationError::MissingTokenSymbol => Status::MissingTokenSymbol,
            ValidationError::MissingTreasury => Status::InvalidTreasuryAccountForToken,
            ValidationError::InvalidDecimals(_) => Status::InvalidTokenDecimals,
            ValidationError::InvalidMaxSupply { .. } => Status::InvalidTokenMaxSupply,
            ValidationError::InitialSupplyAboveMax { .. } => Status::InvalidTokenInitialSupply,
            ValidationError::MemoTooLong(_) => Status::MemoTooLong,
            ValidationError::EmptyMessage => Status::InvalidTopicMessage,
            ValidationError::MessageTooLarge(_) => Status::MessageSizeTooLarge,
            ValidationError::ZeroMintAmount => Status::InvalidTokenMintAmount,
            ValidationError::NegativeInitialBalance => Status::InvalidTransactionBody,
            ValidationError::EmptyTokenList => Status::EmptyTokenList,
            ValidationError::RepeatedToken(_) => Status::TokenIdRepeatedInTokenList,
            ValidationError::EmptyTransfer | ValidationError::HbarAmounts => {
                Status::InvalidAccountAmounts
            }
            ValidationError::TokenAmounts(_) => Status::TransfersNotZeroSumForToken,
        }
    }
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct AccountCreateTransaction {
    pub key: Option<Key>,
    pub initial_balance: Hbar,
}

impl AccountCreateTransaction {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn key(mut self, key: impl Into<Key>) -> Self {
        self.key = Some(key.into());
        self
    }

    pub fn initial_balance(mut self, balance: Hbar) -> Self {
        self.initial_balance = balance;
        self
    }
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct TokenCreateTransaction {
    pub name: String,
    pub symbol: String,
    pub decimals: u32,
    pub initial_supply: u64,
    pub treasury_account_id: Option<AccountId>,
    pub admin_key: Option<Key>,
    pub supply_key: Option<Key>,
    pub supply_type: TokenSupplyType,
    pub max_supply: u64,
}

impl TokenCreateTransaction {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn name(mut self, name: impl Into<String>) -> Self {
        self.name = name.into();
        self
    }

    pub fn symbol(mut self, symbol: impl Into<String>) -> Self {
        self.symbol = symbol.into();
        self
    }

    pub fn decimals(mut self, decimals: u32) -> Self {
        self.decimals = decimals;
        self
    }

    pub fn initial_supply(mut self, initial_supply: u64) -> Self {
        self.initial_supply = initial_supply;
        self
    }

    pub fn treasury_account_id(mut self, account_id: AccountId) -> Self {
        self.treasury_account_id = Some(account_id);
        self
    }

    pub fn admin_key(mut self, key: impl Into<Key>) -> Self {
        self.admin_key = Some(key.into());
        self
    }

    pub fn supply_key(mut self, key: impl Into<Key>) -> Self {
        self.supply_key = Some(key.into());
        self
    }

    pub fn supply_type(mut self, supply_type: TokenSupplyType) -> Self {
        self.supply_type = supply_type;
        self
    }

    pub fn max_supply(mut self, max_supply: u64) -> Self {
        self.max_supply = max_supply;
        self
    }
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct TokenAssociateTransaction {
    pub account_id: Option<AccountId>,
    pub token_ids: Vec<TokenId>,
}

impl TokenAssociateTransaction {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn account_id(mut self, account_id: AccountId) -> Self {
        self.account_id = Some(account_id);
        self
    }

    pub fn token_ids(mut self, token_ids: impl IntoIterator<Item = TokenId>) -> Self {
        self.token_ids = token_ids.into_iter().collect();
        self
    }
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct TokenMintTransaction {
    pub token_id: Option<TokenId>,
    pub amount: u64,
}

impl TokenMintTransaction {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn token_id(mut self, token_id: TokenId) -> Self {
        self.token_id = Some(token_id);
        self
    }

    pub fn amount(mut self, amount: u64) -> Self {
        self.amount = amount;
        self
    }
}

/// Hbar and token movements. Entries for the same account are merged, so
/// each account appears at most once per currency.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct TransferTransaction {
    pub hbar_transfers: BTreeMap<AccountId, Hbar>,
    pub token_transfers: BTreeMap<TokenId, BTreeMap<AccountId, i64>>,
}

impl TransferTransaction {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn hbar_transfer(mut self, account_id: AccountId, amount: Hbar) -> Self {
        let entry = self.hbar_transfers.entry(account_id).or_default();
        *entry = Hbar::from_tinybars(entry.to_tinybars().saturating_add(amount.to_tinybars()));
        self
    }

    pub fn token_transfer(mut self, token_id: TokenId, account_id: AccountId, amount: i64) -> Self {
        let entry = self
            .token_transfers
            .entry(token_id)
            .or_default()
            .entry(account_id)
            .or_default();
        *entry = entry.saturating_add(amount);
        self
    }
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct TopicCreateTransaction {
    pub memo: String,
    pub admin_key: Option<Key>,
    pub submit_key: Option<Key>,
}

impl TopicCreateTransaction {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn topic_memo(mut self, memo: impl Into<String>) -> Self {
        self.memo = memo.into();
        self
    }

    pub fn admin_key(mut self, key: impl Into<Key>) -> Self {
        self.admin_key = Some(key.into());
        self
    }

    pub fn submit_key(mut self, key: impl Into<Key>) -> Self {
        self.submit_key = Some(key.into());
        self
    }
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct TopicMessageSubmitTransaction {
    pub topic_id: Option<TopicId>,
    pub message: Vec<u8>,
}

impl TopicMessageSubmitTransaction {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn topic_id(mut self, topic_id: TopicId) -> Self {
        self.topic_id = Some(topic_id);
        self
    }

    pub fn message(mut self, message: impl Into<Vec<u8>>) -> Self {
        self.message = message.into();
        self
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum TransactionBody {
    AccountCreate(AccountCreateTransaction),
    TokenCreate(TokenCreateTransaction),
    TokenAssociate(TokenAssociateTransaction),
    TokenMint(TokenMintTransaction),
    Transfer(TransferTransaction),
    TopicCreate(TopicCreateTransaction),
    TopicMessageSubmit(TopicMessageSubmitTransaction),
}

impl TransactionBody {
    pub fn kind(&self) -> TransactionKind {
        match self {
            TransactionBody::AccountCreate(_) => TransactionKind::AccountCreate,
            TransactionBody::TokenCreate(_) => TransactionKind::TokenCreate,
            TransactionBody::TokenAssociate(_) => TransactionKind::TokenAssociate,
            TransactionBody::TokenMint(_) => TransactionKind::TokenMint,
            TransactionBody::Transfer(_) => TransactionKind::Transfer,
            TransactionBody::TopicCreate(_) => TransactionKind::TopicCreate,
            TransactionBody::TopicMessageSubmit(_) => TransactionKind::TopicMessageSubmit,
        }
    }

    /// Checks that do not need ledger state. Missing entity ids are left for
    /// the ledger to report as invalid ids.
    pub fn validate(&self) -> Result<(), ValidationError> {
        match self {
            TransactionBody::AccountCreate(tx) => {
                if tx.initial_balance.is_negative() {
                    return Err(ValidationError::NegativeInitialBalance);
                }
            }
            TransactionBody::TokenCreate(tx) => validate_token_create(tx)?,
            TransactionBody::TokenAssociate(tx) => {
                if tx.token_ids.is_empty() {
                    return Err(ValidationError::EmptyTokenList);
                }
                let mut seen = BTreeSet::new();
                if let Some(repeated) = tx.token_ids.iter().find(|id| !seen.insert(**id)) {
                    return Err(ValidationError::RepeatedToken(*repeated));
                }
            }
            TransactionBody::TokenMint(tx) => {
                if tx.amount == 0 {
                    return Err(ValidationError::ZeroMintAmount);
                }
            }
            TransactionBody::Transfer(tx) => validate_transfer(tx)?,
            TransactionBody::TopicCreate(tx) => {
                if tx.memo.len() > MAX_MEMO_BYTES {
                    return Err(ValidationError::MemoTooLong(tx.memo.len()));
                }
            }
            TransactionBody::TopicMessageSubmit(tx) => {
                if tx.message.is_empty() {
                    return Err(ValidationError::EmptyMessage);
                }
                if tx.message.len() > MAX_MESSAGE_BYTES {
                    return Err(ValidationError::MessageTooLarge(tx.message.len()));
                }
            }
        }
        Ok(())
    }
}

fn validate_token_create(tx: &TokenCreateTransaction) -> Result<(), ValidationError> {
    if tx.name.trim().is_empty() {
        return Err(ValidationError::MissingTokenName);
    }
    if tx.symbol.trim().is_empty() {
        return Err(ValidationError::MissingTokenSymbol);
    }
    if tx.treasury_account_id.is_none() {
        return Err(ValidationError::MissingTreasury);
    }
    if tx.decimals > MAX_TOKEN_DECIMALS {
        return Err(ValidationError::InvalidDecimals(tx.decimals));
    }
    let max_supply_valid = match tx.supply_type {
        TokenSupplyType::Infinite => tx.max_supply == 0,
        TokenSupplyType::Finite => tx.max_supply > 0,
    };
    if !max_supply_valid {
        return Err(ValidationError::InvalidMaxSupply {
            supply_type: tx.supply_type,
            max_supply: tx.max_supply,
        });
    }
    if tx.supply_type == TokenSupplyType::Finite && tx.initial_supply > tx.max_supply {
        return Err(ValidationError::InitialSupplyAboveMax {
            initial_supply: tx.initial_supply,
            max_supply: tx.max_supply,
        });
    }
    Ok(())
}

fn validate_transfer(tx: &TransferTransaction) -> Result<(), ValidationError> {
    if tx.hbar_transfers.is_empty() && tx.token_transfers.is_empty() {
        return Err(ValidationError::EmptyTransfer);
    }
    if !tx.hbar_transfers.is_empty() {
        let amounts = tx.hbar_transfers.values().map(|hbar| hbar.to_tinybars());
        if !nets_to_zero(amounts) {
            return Err(ValidationError::HbarAmounts);
        }
    }
    for (token_id, transfers) in &tx.token_transfers {
        if !nets_to_zero(transfers.values().copied()) {
            return Err(ValidationError::TokenAmounts(*token_id));
        }
    }
    Ok(())
}

fn nets_to_zero(amounts: impl Iterator<Item = i64>) -> bool {
    let mut sum: i128 = 0;
    for amount in amounts {
        // a leg of i64::MIN has no opposite leg
        if amount == 0 || amount == i64::MIN {
            return false;
        }
        sum += i128::from(amount);
    }
    sum == 0
}

#[derive(Serialize)]
struct SignedBody<'a> {
    transaction_id: &'a TransactionId,
    body: &'a TransactionBody,
}

/// Canonical bytes that signatures cover.
pub fn body_bytes(
    transaction_id: &TransactionId,
    body: &TransactionBody,
) -> Result<Vec<u8>, serde_json::Error> {
    serde_json::to_vec(&SignedBody {
        transaction_id,
        body,
    })
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SignaturePair {
    pub public_key: PublicKey,
    pub signature: [u8; 64],
}

/// Transaction with a fixed id and body, ready to collect signatures.
#[derive(Debug, Clone)]
pub struct FrozenTransaction {
    transaction_id: TransactionId,
    body: TransactionBody,
    body_bytes: Vec<u8>,
    signatures: Vec<SignaturePair>,
}

impl FrozenTransaction {
    pub fn new(
        transaction_id: TransactionId,
        body: TransactionBody,
    ) -> Result<Self, serde_json::Error> {
        let body_bytes = body_bytes(&transaction_id, &body)?;
        Ok(Self {
            transaction_id,
            body,
            body_bytes,
            signatures: Vec::new(),
        })
    }

    pub fn transaction_id(&self) -> TransactionId {
        self.transaction_id
    }

    pub fn body(&self) -> &TransactionBody {
        &self.body
    }

    pub fn body_bytes(&self) -> &[u8] {
        &self.body_bytes
    }

    pub fn signatures(&self) -> &[SignaturePair] {
        &self.signatures
    }

    pub fn signers(&self) -> Vec<PublicKey> {
        self.signatures.iter().map(|pair| pair.public_key).collect()
    }

    /// Adds a signature, signing twice with the same key is a no-op.
    pub fn sign(mut self, key: &PrivateKey) -> Self {
        let public_key = key.public_key();
        if !self.signers().contains(&public_key) {
            let signature = key.sign(&self.body_bytes);
            self.signatures.push(SignaturePair {
                public_key,
                signature,
            });
        }
        self
    }

    pub async fn execute(self, client: &Client) -> Result<TransactionResponse, ClientError> {
        client.execute(self).await
    }
}

macro_rules! transaction_builder {
    ($($builder:ident => $variant:ident),* $(,)?) => {
        $(
            impl From<$builder> for TransactionBody {
                fn from(tx: $builder) -> Self {
                    TransactionBody::$variant(tx)
                }
            }

            impl $builder {
                /// Fixes the transaction id with the client's operator as payer.
                pub fn freeze_with(self, client: &Client) -> Result<FrozenTransaction, ClientError> {
                    client.freeze(self.into())
                }

                pub async fn execute(self, client: &Client) -> Result<TransactionResponse, ClientError> {
                    self.freeze_with(client)?.execute(client).await
                }
            }
        )*
    };
}

transaction_builder!(
    AccountCreateTransaction => AccountCreate,
    TokenCreateTransaction => TokenCreate,
    TokenAssociateTransaction => TokenAssociate,
    TokenMintTransaction => TokenMint,
    TransferTransaction => Transfer,
    TopicCreateTransaction => TopicCreate,
    TopicMessageSubmitTransaction => TopicMessageSubmit,
);
