use serde::Serialize;
use thiserror::Error;

use crate::{
    id::{AccountId, TokenId},
    key::Key,
    receipt::Status,
};

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum TokenSupplyType {
    #[default]
    Infinite,
    Finite,
}

#[derive(Debug, Error, PartialEq, Eq)]
pub enum TokenError {
    #[error("Token has no supply key, its supply cannot change")]
    NoSupplyKey,
    #[error("Minting {amount} would exceed the max supply of {max_supply}")]
    MaxSupplyReached { amount: u64, max_supply: u64 },
}

impl TokenError {
    pub fn status(&self) -> Status {
        match self {
            TokenError::NoSupplyKey => Status::TokenHasNoSupplyKey,
            TokenError::MaxSupplyReached { .. } => Status::TokenMaxSupplyReached,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum TokenEvent {
    Minted(u64),
}

/// Fungible token. Amounts are in the token's smallest unit.
#[derive(Debug, Clone)]
pub struct Token {
    pub name: String,
    pub symbol: String,
    pub decimals: u32,
    pub treasury_account_id: AccountId,
    pub admin_key: Option<Key>,
    pub supply_key: Option<Key>,
    pub supply_type: TokenSupplyType,
    pub max_supply: u64,
    pub total_supply: u64,
}

impl Token {
    pub fn apply(&mut self, event: &TokenEvent) {
        match event {
            TokenEvent::Minted(amount) => self.total_supply += amount,
        }
    }

    pub fn handle_mint(&self, amount: u64) -> Result<TokenEvent, TokenError> {
        if self.supply_key.is_none() {
            return Err(TokenError::NoSupplyKey);
        }
        let exceeds_max = match self.total_supply.checked_add(amount) {
            Some(total) => self.supply_type == TokenSupplyType::Finite && total > self.max_supply,
            None => true,
        };
        if exceeds_max {
            return Err(TokenError::MaxSupplyReached {
                amount,
                max_supply: self.max_supply,
            });
        }
        Ok(TokenEvent::Minted(amount))
    }

    pub fn info(&self, token_id: TokenId) -> TokenInfo {
        TokenInfo {
            token_id,
            name: self.name.clone(),
            symbol: self.symbol.clone(),
            decimals: self.decimals,
            total_supply: self.total_supply,
            max_supply: self.max_supply,
            supply_type: self.supply_type,
            treasury_account_id: self.treasury_account_id,
            admin_key: self.admin_key.clone(),
            supply_key: self.supply_key.clone(),
        }
    }
}

/// Answer to a token info query.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct TokenInfo {
    pub token_id: TokenId,
    pub name: String,
    pub symbol: String,
    pub decimals: u32,
    pub total_supply: u64,
    pub max_supply: u64,
    pub supply_type: TokenSupplyType,
    pub treasury_account_id: AccountId,
    pub admin_key: Option<Key>,
    pub supply_key: Option<Key>,
}
