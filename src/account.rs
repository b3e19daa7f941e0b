use std::collections::BTreeMap;

use serde::Serialize;
use thiserror::Error;

use crate::{
    hbar::Hbar,
    id::{AccountId, TokenId},
    key::Key,
    receipt::Status,
};

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum AccountEventKind {
    HbarCredited(Hbar),
    HbarDebited(Hbar),
    TokenAssociated(TokenId),
    TokenCredited { token_id: TokenId, amount: u64 },
    TokenDebited { token_id: TokenId, amount: u64 },
}

#[derive(Debug, Clone)]
pub struct AccountEvent {
    pub account_id: AccountId,
    pub kind: AccountEventKind,
}

#[derive(Debug, Error, PartialEq, Eq)]
pub enum AccountError {
    #[error("Payer balance cannot cover the transaction fee of {fee}")]
    InsufficientPayerBalance { fee: Hbar },
    #[error("Insufficient hbar balance")]
    InsufficientAccountBalance,
    #[error("Amount {0} does not fit into the account balance")]
    AmountOverflow(Hbar),
    #[error("Insufficient balance of token {0}")]
    InsufficientTokenBalance(TokenId),
    #[error("Token {0} is not associated to the account")]
    TokenNotAssociated(TokenId),
    #[error("Token {0} is already associated to the account")]
    TokenAlreadyAssociated(TokenId),
}

impl AccountError {
    pub fn status(&self) -> Status {
        match self {
            AccountError::InsufficientPayerBalance { .. } => Status::InsufficientPayerBalance,
            AccountError::InsufficientAccountBalance => Status::InsufficientAccountBalance,
            AccountError::AmountOverflow(_) => Status::InvalidAccountAmounts,
            AccountError::InsufficientTokenBalance(_) => Status::InsufficientTokenBalance,
            AccountError::TokenNotAssociated(_) => Status::TokenNotAssociatedToAccount,
            AccountError::TokenAlreadyAssociated(_) => Status::TokenAlreadyAssociatedToAccount,
        }
    }
}

/// Ledger account. State only changes through [`Account::apply`], the
/// `handle_*` methods validate a request and describe the change as an event.
#[derive(Debug, Clone)]
pub struct Account {
    key: Key,
    hbars: Hbar,
    // token relationships, an entry exists once the token is associated
    tokens: BTreeMap<TokenId, u64>,
}

impl Account {
    pub fn new(key: Key, hbars: Hbar) -> Self {
        Self {
            key,
            hbars,
            tokens: BTreeMap::new(),
        }
    }

    pub fn key(&self) -> &Key {
        &self.key
    }

    pub fn hbars(&self) -> Hbar {
        self.hbars
    }

    pub fn token_balance(&self, token_id: &TokenId) -> Option<u64> {
        self.tokens.get(token_id).copied()
    }

    pub fn balance(&self, account_id: AccountId) -> AccountBalance {
        AccountBalance {
            account_id,
            hbars: self.hbars,
            tokens: self.tokens.clone(),
        }
    }

    pub fn apply(&mut self, event: &AccountEvent) {
        match event.kind {
            // handlers only emit amounts the balance can absorb
            AccountEventKind::HbarCredited(amount) => {
                if let Some(hbars) = self.hbars.checked_add(amount) {
                    self.hbars = hbars;
                }
            }
            AccountEventKind::HbarDebited(amount) => {
                if let Some(hbars) = self.hbars.checked_sub(amount) {
                    self.hbars = hbars;
                }
            }
            AccountEventKind::TokenAssociated(token_id) => {
                self.tokens.entry(token_id).or_insert(0);
            }
            AccountEventKind::TokenCredited { token_id, amount } => {
                *self.tokens.entry(token_id).or_insert(0) += amount;
            }
            AccountEventKind::TokenDebited { token_id, amount } => {
                if let Some(balance) = self.tokens.get_mut(&token_id) {
                    *balance -= amount;
                }
            }
        }
    }

    pub fn handle_fee(&self, account_id: AccountId, fee: Hbar) -> Result<AccountEvent, AccountError> {
        if self.hbars < fee {
            return Err(AccountError::InsufficientPayerBalance { fee });
        }
        Ok(AccountEvent {
            account_id,
            kind: AccountEventKind::HbarDebited(fee),
        })
    }

    /// Positive amounts credit the account, negative ones debit it.
    pub fn handle_hbar_transfer(
        &self,
        account_id: AccountId,
        amount: Hbar,
    ) -> Result<AccountEvent, AccountError> {
        if !amount.is_negative() {
            self.hbars
                .checked_add(amount)
                .ok_or(AccountError::AmountOverflow(amount))?;
            return Ok(AccountEvent {
                account_id,
                kind: AccountEventKind::HbarCredited(amount),
            });
        }
        let debit = amount
            .checked_neg()
            .ok_or(AccountError::AmountOverflow(amount))?;
        if self.hbars < debit {
            return Err(AccountError::InsufficientAccountBalance);
        }
        Ok(AccountEvent {
            account_id,
            kind: AccountEventKind::HbarDebited(debit),
        })
    }

    /// Positive amounts credit the account, negative ones debit it.
    pub fn handle_token_transfer(
        &self,
        account_id: AccountId,
        token_id: TokenId,
        amount: i64,
    ) -> Result<AccountEvent, AccountError> {
        let balance = self
            .token_balance(&token_id)
            .ok_or(AccountError::TokenNotAssociated(token_id))?;
        let kind = if amount >= 0 {
            AccountEventKind::TokenCredited {
                token_id,
                amount: amount.unsigned_abs(),
            }
        } else if balance >= amount.unsigned_abs() {
            AccountEventKind::TokenDebited {
                token_id,
                amount: amount.unsigned_abs(),
            }
        } else {
            return Err(AccountError::InsufficientTokenBalance(token_id));
        };
        Ok(AccountEvent { account_id, kind })
    }

    pub fn handle_associate(
        &self,
        account_id: AccountId,
        token_id: TokenId,
    ) -> Result<AccountEvent, AccountError> {
        if self.tokens.contains_key(&token_id) {
            return Err(AccountError::TokenAlreadyAssociated(token_id));
        }
        Ok(AccountEvent {
            account_id,
            kind: AccountEventKind::TokenAssociated(token_id),
        })
    }
}

/// Answer to an account balance query.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct AccountBalance {
    pub account_id: AccountId,
    pub hbars: Hbar,
    pub tokens: BTreeMap<TokenId, u64>,
}

impl AccountBalance {
    /// Balance of `token_id`, zero when the account has no relationship with it.
    pub fn token_balance(&self, token_id: &TokenId) -> u64 {
        self.tokens.get(token_id).copied().unwrap_or_default()
    }
}
