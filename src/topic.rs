use serde::Serialize;

use crate::{
    id::{AccountId, Timestamp, TopicId},
    key::Key,
};

/// Message as ordered by consensus.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct TopicMessage {
    pub topic_id: TopicId,
    pub sequence_number: u64,
    pub consensus_timestamp: Timestamp,
    pub payer_account_id: AccountId,
    pub contents: Vec<u8>,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum TopicEvent {
    MessageSubmitted(TopicMessage),
}

#[derive(Debug, Clone)]
pub struct Topic {
    pub memo: String,
    pub admin_key: Option<Key>,
    pub submit_key: Option<Key>,
    messages: Vec<TopicMessage>,
}

impl Topic {
    pub fn new(memo: String, admin_key: Option<Key>, submit_key: Option<Key>) -> Self {
        Self {
            memo,
            admin_key,
            submit_key,
            messages: Vec::new(),
        }
    }

    pub fn sequence_number(&self) -> u64 {
        self.messages.len() as u64
    }

    pub fn messages(&self) -> &[TopicMessage] {
        &self.messages
    }

    pub fn apply(&mut self, event: &TopicEvent) {
        match event {
            TopicEvent::MessageSubmitted(message) => self.messages.push(message.clone()),
        }
    }

    pub fn handle_submit(
        &self,
        topic_id: TopicId,
        payer_account_id: AccountId,
        consensus_timestamp: Timestamp,
        contents: Vec<u8>,
    ) -> TopicEvent {
        TopicEvent::MessageSubmitted(TopicMessage {
            topic_id,
            sequence_number: self.sequence_number() + 1,
            consensus_timestamp,
            payer_account_id,
            contents,
        })
    }

    pub fn info(&self, topic_id: TopicId) -> TopicInfo {
        TopicInfo {
            topic_id,
            topic_memo: self.memo.clone(),
            admin_key: self.admin_key.clone(),
            submit_key: self.submit_key.clone(),
            sequence_number: self.sequence_number(),
        }
    }
}

/// Answer to a topic info query.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct TopicInfo {
    pub topic_id: TopicId,
    pub topic_memo: String,
    pub admin_key: Option<Key>,
    pub submit_key: Option<Key>,
    pub sequence_number: u64,
}
