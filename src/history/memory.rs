use async_trait::async_trait;
use std::collections::BTreeMap;
use std::error::Error;
use tokio::sync::Mutex;
use crate::history::{ HistoryStore, TimestampKeys };
use crate::models::chat::ConversationMessage;

/// Process-local history, ordered by timestamp key.
#[derive(Default)]
pub struct MemoryHistoryStore {
    keys: TimestampKeys,
    messages: Mutex<BTreeMap<i64, ConversationMessage>>,
    responses: Mutex<BTreeMap<i64, ConversationMessage>>,
}

impl MemoryHistoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_messages(messages: Vec<ConversationMessage>) -> Self {
        let keys = TimestampKeys::default();
        let map = messages
            .into_iter()
            .map(|message| (keys.next(), message))
            .collect();
        Self {
            keys,
            messages: Mutex::new(map),
            responses: Mutex::default(),
        }
    }
}

#[async_trait]
impl HistoryStore for MemoryHistoryStore {
    async fn append(&self, message: &ConversationMessage) -> Result<(), Box<dyn Error + Send + Sync>> {
        self.messages.lock().await.insert(self.keys.next(), message.clone());
        Ok(())
    }

    async fn list_all(&self) -> Result<Vec<ConversationMessage>, Box<dyn Error + Send + Sync>> {
        Ok(self.messages.lock().await.values().cloned().collect())
    }

    async fn list_recent(
        &self,
        limit: usize
    ) -> Result<Vec<ConversationMessage>, Box<dyn Error + Send + Sync>> {
        let messages = self.messages.lock().await;
        let skip = messages.len().saturating_sub(limit);
        Ok(messages.values().skip(skip).cloned().collect())
    }

    async fn record_response(
        &self,
        message: &ConversationMessage
    ) -> Result<(), Box<dyn Error + Send + Sync>> {
        self.responses.lock().await.insert(self.keys.next(), message.clone());
        Ok(())
    }

    async fn latest_response(
        &self
    ) -> Result<Option<ConversationMessage>, Box<dyn Error + Send + Sync>> {
        Ok(self.responses.lock().await.values().next_back().cloned())
    }
}
