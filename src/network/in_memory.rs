use std::{
    collections::HashMap,
    sync::{Mutex, MutexGuard},
};

use async_trait::async_trait;
use tracing::{debug, info, warn};

use crate::{
    account::{Account, AccountBalance, AccountError, AccountEvent, AccountEventKind},
    hbar::Hbar,
    id::{AccountId, EntityId, Timestamp, TokenId, TopicId, TransactionId},
    key::{Key, PublicKey},
    receipt::{Status, TransactionReceipt, TransactionRecord},
    token::{Token, TokenEvent, TokenInfo},
    topic::{Topic, TopicEvent, TopicInfo, TopicMessage},
    transaction::{
        self, AccountCreateTransaction, FrozenTransaction, TokenAssociateTransaction,
        TokenCreateTransaction, TokenMintTransaction, TopicCreateTransaction,
        TopicMessageSubmitTransaction, TransactionBody, TransferTransaction,
    },
};

use super::{FeeSchedule, LedgerNetwork, NetworkError};

/// First entity number handed out when genesis accounts sit below it.
const FIRST_ENTITY_NUM: u64 = 1001;

#[derive(Debug, Clone)]
pub struct GenesisAccount {
    pub account_id: AccountId,
    pub key: Key,
    pub balance: Hbar,
}

/// Single node ledger kept in memory. Every submitted transaction reaches
/// consensus immediately, in submission order.
#[derive(Debug)]
pub struct InMemoryNetwork {
    state: Mutex<LedgerState>,
    fees: FeeSchedule,
}

impl InMemoryNetwork {
    pub fn new(genesis: impl IntoIterator<Item = GenesisAccount>, fees: FeeSchedule) -> Self {
        let mut state = LedgerState {
            next_num: FIRST_ENTITY_NUM,
            ..Default::default()
        };
        for account in genesis {
            state.next_num = state.next_num.max(account.account_id.num() + 1);
            state.accounts.insert(
                account.account_id,
                Account::new(account.key, account.balance),
            );
        }
        Self {
            state: Mutex::new(state),
            fees,
        }
    }

    pub fn fees(&self) -> &FeeSchedule {
        &self.fees
    }

    fn lock(&self) -> Result<MutexGuard<'_, LedgerState>, NetworkError> {
        self.state.lock().map_err(|_| NetworkError::Unavailable)
    }

    fn precheck(
        &self,
        state: &LedgerState,
        transaction: &FrozenTransaction,
    ) -> Result<AccountEvent, Status> {
        let transaction_id = transaction.transaction_id();
        let body = transaction.body();
        body.validate().map_err(|err| err.status())?;

        let expected = transaction::body_bytes(&transaction_id, body)
            .map_err(|_| Status::InvalidTransactionBody)?;
        if expected != transaction.body_bytes() {
            return Err(Status::InvalidTransactionBody);
        }
        let forged = transaction
            .signatures()
            .iter()
            .any(|pair| !pair.public_key.verify(transaction.body_bytes(), &pair.signature));
        if forged {
            return Err(Status::InvalidSignature);
        }
        if state.records.contains_key(&transaction_id) {
            return Err(Status::DuplicateTransaction);
        }

        let payer = state
            .accounts
            .get(&transaction_id.account_id)
            .ok_or(Status::PayerAccountNotFound)?;
        if !payer.key().is_satisfied_by(&transaction.signers()) {
            return Err(Status::InvalidSignature);
        }
        payer
            .handle_fee(transaction_id.account_id, self.fees.fee_for(body.kind()))
            .map_err(|err| err.status())
    }
}

#[derive(Debug)]
enum LedgerEvent {
    AccountCreated(AccountId, Account),
    TokenCreated(TokenId, Token),
    TopicCreated(TopicId, Topic),
    Account(AccountEvent),
    Token(TokenId, TokenEvent),
    Topic(TopicId, TopicEvent),
}

#[derive(Debug, Default)]
struct LedgerState {
    accounts: HashMap<AccountId, Account>,
    tokens: HashMap<TokenId, Token>,
    topics: HashMap<TopicId, Topic>,
    records: HashMap<TransactionId, TransactionRecord>,
    next_num: u64,
    last_consensus_nanos: u64,
}

impl LedgerState {
    fn next_entity_id(&self) -> EntityId {
        EntityId::new(0, 0, self.next_num)
    }

    fn next_consensus_timestamp(&mut self) -> Timestamp {
        let now = Timestamp::now().as_nanos();
        self.last_consensus_nanos = now.max(self.last_consensus_nanos + 1);
        Timestamp::from_nanos(self.last_consensus_nanos)
    }

    fn account(&self, account_id: &AccountId) -> Result<&Account, Status> {
        self.accounts.get(account_id).ok_or(Status::InvalidAccountId)
    }

    fn token(&self, token_id: &TokenId) -> Result<&Token, Status> {
        self.tokens.get(token_id).ok_or(Status::InvalidTokenId)
    }

    fn topic(&self, topic_id: &TopicId) -> Result<&Topic, Status> {
        self.topics.get(topic_id).ok_or(Status::InvalidTopicId)
    }

    fn apply(&mut self, event: LedgerEvent) {
        match event {
            LedgerEvent::AccountCreated(account_id, account) => {
                self.next_num = self.next_num.max(account_id.num() + 1);
                self.accounts.insert(account_id, account);
            }
            LedgerEvent::TokenCreated(token_id, token) => {
                self.next_num = self.next_num.max(token_id.num() + 1);
                self.tokens.insert(token_id, token);
            }
            LedgerEvent::TopicCreated(topic_id, topic) => {
                self.next_num = self.next_num.max(topic_id.num() + 1);
                self.topics.insert(topic_id, topic);
            }
            LedgerEvent::Account(event) => {
                if let Some(account) = self.accounts.get_mut(&event.account_id) {
                    account.apply(&event);
                }
            }
            LedgerEvent::Token(token_id, event) => {
                if let Some(token) = self.tokens.get_mut(&token_id) {
                    token.apply(&event);
                }
            }
            LedgerEvent::Topic(topic_id, event) => {
                if let Some(topic) = self.topics.get_mut(&topic_id) {
                    topic.apply(&event);
                }
            }
        }
    }

    /// Validates the body against current state and returns the events to
    /// apply together with the receipt. Nothing is applied on error.
    fn handle(
        &self,
        transaction_id: &TransactionId,
        body: &TransactionBody,
        signers: &[PublicKey],
        consensus_timestamp: Timestamp,
    ) -> Result<(Vec<LedgerEvent>, TransactionReceipt), Status> {
        let payer_id = transaction_id.account_id;
        match body {
            TransactionBody::AccountCreate(tx) => self.handle_account_create(payer_id, tx),
            TransactionBody::TokenCreate(tx) => self.handle_token_create(tx, signers),
            TransactionBody::TokenAssociate(tx) => self.handle_token_associate(tx, signers),
            TransactionBody::TokenMint(tx) => self.handle_token_mint(tx, signers),
            TransactionBody::Transfer(tx) => self.handle_transfer(tx, signers),
            TransactionBody::TopicCreate(tx) => self.handle_topic_create(tx, signers),
            TransactionBody::TopicMessageSubmit(tx) => {
                self.handle_topic_message(payer_id, tx, signers, consensus_timestamp)
            }
        }
    }

    fn handle_account_create(
        &self,
        payer_id: AccountId,
        tx: &AccountCreateTransaction,
    ) -> Result<(Vec<LedgerEvent>, TransactionReceipt), Status> {
        let key = tx.key.clone().ok_or(Status::KeyRequired)?;
        let funding = self
            .account(&payer_id)?
            .handle_hbar_transfer(payer_id, -tx.initial_balance)
            .map_err(|_| Status::InsufficientPayerBalance)?;
        let account_id = AccountId(self.next_entity_id());
        let events = vec![
            LedgerEvent::AccountCreated(account_id, Account::new(key, Hbar::ZERO)),
            LedgerEvent::Account(funding),
            LedgerEvent::Account(AccountEvent {
                account_id,
                kind: AccountEventKind::HbarCredited(tx.initial_balance),
            }),
        ];
        Ok((
            events,
            TransactionReceipt {
                account_id: Some(account_id),
                ..TransactionReceipt::with_status(Status::Success)
            },
        ))
    }

    fn handle_token_create(
        &self,
        tx: &TokenCreateTransaction,
        signers: &[PublicKey],
    ) -> Result<(Vec<LedgerEvent>, TransactionReceipt), Status> {
        let treasury_id = tx
            .treasury_account_id
            .ok_or(Status::InvalidTreasuryAccountForToken)?;
        let treasury = self
            .accounts
            .get(&treasury_id)
            .ok_or(Status::InvalidTreasuryAccountForToken)?;
        require_signature(treasury.key(), signers)?;
        if let Some(admin_key) = &tx.admin_key {
            require_signature(admin_key, signers)?;
        }

        let token_id = TokenId(self.next_entity_id());
        let token = Token {
            name: tx.name.clone(),
            symbol: tx.symbol.clone(),
            decimals: tx.decimals,
            treasury_account_id: treasury_id,
            admin_key: tx.admin_key.clone(),
            supply_key: tx.supply_key.clone(),
            supply_type: tx.supply_type,
            max_supply: tx.max_supply,
            total_supply: tx.initial_supply,
        };
        let mut events = vec![
            LedgerEvent::TokenCreated(token_id, token),
            LedgerEvent::Account(AccountEvent {
                account_id: treasury_id,
                kind: AccountEventKind::TokenAssociated(token_id),
            }),
        ];
        if tx.initial_supply > 0 {
            events.push(LedgerEvent::Account(AccountEvent {
                account_id: treasury_id,
                kind: AccountEventKind::TokenCredited {
                    token_id,
                    amount: tx.initial_supply,
                },
            }));
        }
        Ok((
            events,
            TransactionReceipt {
                token_id: Some(token_id),
                total_supply: Some(tx.initial_supply),
                ..TransactionReceipt::with_status(Status::Success)
            },
        ))
    }

    fn handle_token_associate(
        &self,
        tx: &TokenAssociateTransaction,
        signers: &[PublicKey],
    ) -> Result<(Vec<LedgerEvent>, TransactionReceipt), Status> {
        let account_id = tx.account_id.ok_or(Status::InvalidAccountId)?;
        let account = self.account(&account_id)?;
        require_signature(account.key(), signers)?;

        let mut events = Vec::with_capacity(tx.token_ids.len());
        for token_id in &tx.token_ids {
            self.token(token_id)?;
            let event = account
                .handle_associate(account_id, *token_id)
                .map_err(|err| err.status())?;
            events.push(LedgerEvent::Account(event));
        }
        Ok((events, TransactionReceipt::with_status(Status::Success)))
    }

    fn handle_token_mint(
        &self,
        tx: &TokenMintTransaction,
        signers: &[PublicKey],
    ) -> Result<(Vec<LedgerEvent>, TransactionReceipt), Status> {
        let token_id = tx.token_id.ok_or(Status::InvalidTokenId)?;
        let token = self.token(&token_id)?;
        if let Some(supply_key) = &token.supply_key {
            require_signature(supply_key, signers)?;
        }
        let minted = token.handle_mint(tx.amount).map_err(|err| err.status())?;
        let treasury_id = token.treasury_account_id;
        let credit = self
            .account(&treasury_id)?
            .handle_token_transfer(treasury_id, token_id, token_amount(tx.amount)?)
            .map_err(|err| err.status())?;
        Ok((
            vec![
                LedgerEvent::Token(token_id, minted),
                LedgerEvent::Account(credit),
            ],
            TransactionReceipt {
                total_supply: Some(token.total_supply + tx.amount),
                ..TransactionReceipt::with_status(Status::Success)
            },
        ))
    }

    fn handle_transfer(
        &self,
        tx: &TransferTransaction,
        signers: &[PublicKey],
    ) -> Result<(Vec<LedgerEvent>, TransactionReceipt), Status> {
        let mut events = Vec::new();
        for (account_id, amount) in &tx.hbar_transfers {
            let account = self.account(account_id)?;
            if amount.is_negative() {
                require_signature(account.key(), signers)?;
            }
            let event = account
                .handle_hbar_transfer(*account_id, *amount)
                .map_err(|err| err.status())?;
            events.push(LedgerEvent::Account(event));
        }
        for (token_id, transfers) in &tx.token_transfers {
            self.token(token_id)?;
            for (account_id, amount) in transfers {
                let account = self.account(account_id)?;
                if *amount < 0 {
                    require_signature(account.key(), signers)?;
                }
                let event = account
                    .handle_token_transfer(*account_id, *token_id, *amount)
                    .map_err(|err: AccountError| err.status())?;
                events.push(LedgerEvent::Account(event));
            }
        }
        Ok((events, TransactionReceipt::with_status(Status::Success)))
    }

    fn handle_topic_create(
        &self,
        tx: &TopicCreateTransaction,
        signers: &[PublicKey],
    ) -> Result<(Vec<LedgerEvent>, TransactionReceipt), Status> {
        if let Some(admin_key) = &tx.admin_key {
            require_signature(admin_key, signers)?;
        }
        let topic_id = TopicId(self.next_entity_id());
        let topic = Topic::new(tx.memo.clone(), tx.admin_key.clone(), tx.submit_key.clone());
        Ok((
            vec![LedgerEvent::TopicCreated(topic_id, topic)],
            TransactionReceipt {
                topic_id: Some(topic_id),
                ..TransactionReceipt::with_status(Status::Success)
            },
        ))
    }

    fn handle_topic_message(
        &self,
        payer_id: AccountId,
        tx: &TopicMessageSubmitTransaction,
        signers: &[PublicKey],
        consensus_timestamp: Timestamp,
    ) -> Result<(Vec<LedgerEvent>, TransactionReceipt), Status> {
        let topic_id = tx.topic_id.ok_or(Status::InvalidTopicId)?;
        let topic = self.topic(&topic_id)?;
        if let Some(submit_key) = &topic.submit_key {
            require_signature(submit_key, signers)?;
        }
        let event = topic.handle_submit(topic_id, payer_id, consensus_timestamp, tx.message.clone());
        Ok((
            vec![LedgerEvent::Topic(topic_id, event)],
            TransactionReceipt {
                topic_sequence_number: Some(topic.sequence_number() + 1),
                ..TransactionReceipt::with_status(Status::Success)
            },
        ))
    }
}

fn require_signature(key: &Key, signers: &[PublicKey]) -> Result<(), Status> {
    if key.is_satisfied_by(signers) {
        Ok(())
    } else {
        Err(Status::InvalidSignature)
    }
}

fn token_amount(amount: u64) -> Result<i64, Status> {
    i64::try_from(amount).map_err(|_| Status::InvalidTokenMintAmount)
}

#[async_trait]
impl LedgerNetwork for InMemoryNetwork {
    async fn submit(&self, transaction: FrozenTransaction) -> Result<(), NetworkError> {
        let transaction_id = transaction.transaction_id();
        let kind = transaction.body().kind();
        debug!(%transaction_id, ?kind, "submit");

        let mut state = self.lock()?;
        let fee_event = self.precheck(&state, &transaction).map_err(|status| {
            debug!(%transaction_id, %status, "precheck failed");
            NetworkError::Precheck(status)
        })?;
        let fee = match fee_event.kind {
            AccountEventKind::HbarDebited(fee) => fee,
            _ => Hbar::ZERO,
        };
        // the payer is charged even if handling fails below
        state.apply(LedgerEvent::Account(fee_event));

        let consensus_timestamp = state.next_consensus_timestamp();
        let handled = state.handle(
            &transaction_id,
            transaction.body(),
            &transaction.signers(),
            consensus_timestamp,
        );
        let receipt = match handled {
            Ok((events, receipt)) => {
                for event in events {
                    state.apply(event);
                }
                if let Some(account_id) = receipt.account_id {
                    info!(%transaction_id, %account_id, "account created");
                }
                if let Some(token_id) = receipt.token_id {
                    info!(%transaction_id, %token_id, "token created");
                }
                if let Some(topic_id) = receipt.topic_id {
                    info!(%transaction_id, %topic_id, "topic created");
                }
                receipt
            }
            Err(status) => {
                warn!(%transaction_id, ?kind, %status, "transaction failed");
                TransactionReceipt::with_status(status)
            }
        };

        state.records.insert(
            transaction_id,
            TransactionRecord {
                transaction_id,
                receipt,
                transaction_fee: fee,
                consensus_timestamp,
            },
        );
        Ok(())
    }

    async fn receipt(
        &self,
        transaction_id: &TransactionId,
    ) -> Result<TransactionReceipt, NetworkError> {
        let state = self.lock()?;
        state
            .records
            .get(transaction_id)
            .map(|record| record.receipt.clone())
            .ok_or(NetworkError::Status(Status::ReceiptNotFound))
    }

    async fn record(
        &self,
        transaction_id: &TransactionId,
    ) -> Result<TransactionRecord, NetworkError> {
        let state = self.lock()?;
        state
            .records
            .get(transaction_id)
            .cloned()
            .ok_or(NetworkError::Status(Status::RecordNotFound))
    }

    async fn account_balance(&self, account_id: AccountId) -> Result<AccountBalance, NetworkError> {
        debug!(%account_id, "account balance query");
        let state = self.lock()?;
        state
            .account(&account_id)
            .map(|account| account.balance(account_id))
            .map_err(NetworkError::Status)
    }

    async fn token_info(&self, token_id: TokenId) -> Result<TokenInfo, NetworkError> {
        debug!(%token_id, "token info query");
        let state = self.lock()?;
        state
            .token(&token_id)
            .map(|token| token.info(token_id))
            .map_err(NetworkError::Status)
    }

    async fn topic_info(&self, topic_id: TopicId) -> Result<TopicInfo, NetworkError> {
        debug!(%topic_id, "topic info query");
        let state = self.lock()?;
        state
            .topic(&topic_id)
            .map(|topic| topic.info(topic_id))
            .map_err(NetworkError::Status)
    }

    async fn topic_messages(&self, topic_id: TopicId) -> Result<Vec<TopicMessage>, NetworkError> {
        let state = self.lock()?;
        state
            .topic(&topic_id)
            .map(|topic| topic.messages().to_vec())
            .map_err(NetworkError::Status)
    }
}
