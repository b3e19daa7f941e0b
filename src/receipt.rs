use std::fmt;

use serde::Serialize;

use crate::{
    hbar::Hbar,
    id::{AccountId, Timestamp, TokenId, TopicId, TransactionId},
};

/// Response codes reported by the ledger, either at precheck or in a receipt.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum Status {
    Success,
    InvalidSignature,
    InvalidTransactionBody,
    DuplicateTransaction,
    PayerAccountNotFound,
    InsufficientPayerBalance,
    InsufficientAccountBalance,
    InvalidAccountId,
    KeyRequired,
    InvalidAccountAmounts,
    InvalidTokenId,
    InvalidTopicId,
    InvalidTopicMessage,
    MessageSizeTooLarge,
    MemoTooLong,
    MissingTokenName,
    MissingTokenSymbol,
    InvalidTokenDecimals,
    InvalidTokenInitialSupply,
    InvalidTokenMaxSupply,
    InvalidTokenMintAmount,
    InvalidTreasuryAccountForToken,
    TokenHasNoSupplyKey,
    TokenMaxSupplyReached,
    TokenNotAssociatedToAccount,
    TokenAlreadyAssociatedToAccount,
    InsufficientTokenBalance,
    TransfersNotZeroSumForToken,
    EmptyTokenList,
    TokenIdRepeatedInTokenList,
    ReceiptNotFound,
    RecordNotFound,
}

impl Status {
    pub fn is_success(self) -> bool {
        self == Status::Success
    }
}

impl fmt::Display for Status {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        // serde already knows the wire name of every variant
        match serde_json::to_value(self) {
            Ok(serde_json::Value::String(name)) => f.write_str(&name),
            _ => write!(f, "{self:?}"),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct TransactionReceipt {
    pub status: Status,
    pub account_id: Option<AccountId>,
    pub token_id: Option<TokenId>,
    pub topic_id: Option<TopicId>,
    pub topic_sequence_number: Option<u64>,
    /// Total supply after a successful mint.
    pub total_supply: Option<u64>,
}

impl TransactionReceipt {
    pub fn with_status(status: Status) -> Self {
        Self {
            status,
            account_id: None,
            token_id: None,
            topic_id: None,
            topic_sequence_number: None,
            total_supply: None,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct TransactionRecord {
    pub transaction_id: TransactionId,
    pub receipt: TransactionReceipt,
    pub transaction_fee: Hbar,
    pub consensus_timestamp: Timestamp,
}
