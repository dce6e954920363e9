use async_trait::async_trait;
use crate::models::chat::{ ConversationMessage, StoredMessage };
use crate::history::{ HistoryStore, TimestampKeys };
use std::error::Error;
use log::error;
use redis::{ Client, AsyncCommands };

/// Sorted sets scored by the insertion timestamp: `<prefix>messages` for the
/// conversation and `<prefix>responses` for raw model replies.
pub struct RedisHistoryStore {
    client: Client,
    key_prefix: String,
    keys: TimestampKeys,
}

impl RedisHistoryStore {
    pub fn new(host: &str, key_prefix: &str) -> Result<Self, Box<dyn Error + Send + Sync>> {
        Ok(Self {
            client: Client::open(host)?,
            key_prefix: key_prefix.to_string(),
            keys: TimestampKeys::default(),
        })
    }

    async fn get_connection(&self) -> Result<redis::aio::MultiplexedConnection, redis::RedisError> {
        self.client.get_multiplexed_async_connection().await
    }

    fn key(&self, log: &str) -> String {
        format!("{}{}", self.key_prefix, log)
    }

    async fn push(
        &self,
        log: &str,
        message: &ConversationMessage
    ) -> Result<(), Box<dyn Error + Send + Sync>> {
        let mut conn = self.get_connection().await?;
        let timestamp = self.keys.next();
        let stored = StoredMessage {
            role: message.role,
            content: message.content.clone(),
            timestamp,
        };

        let json_msg = serde_json::to_string(&stored)?;
        let _: i64 = conn.zadd(self.key(log), json_msg, timestamp).await?;
        Ok(())
    }

    fn decode(entries: Vec<String>) -> Vec<ConversationMessage> {
        let mut messages = Vec::with_capacity(entries.len());
        for json_entry in &entries {
            match serde_json::from_str::<StoredMessage>(json_entry) {
                Ok(msg) => messages.push(msg.into()),
                Err(e) => {
                    error!("Error parsing history entry: {}", e);
                }
            }
        }
        messages
    }
}

#[async_trait]
impl HistoryStore for RedisHistoryStore {
    async fn append(&self, message: &ConversationMessage) -> Result<(), Box<dyn Error + Send + Sync>> {
        self.push("messages", message).await
    }

    async fn list_all(&self) -> Result<Vec<ConversationMessage>, Box<dyn Error + Send + Sync>> {
        let mut conn = self.get_connection().await?;
        let json_entries: Vec<String> = conn.zrange(self.key("messages"), 0, -1).await?;
        Ok(Self::decode(json_entries))
    }

    async fn list_recent(
        &self,
        limit: usize
    ) -> Result<Vec<ConversationMessage>, Box<dyn Error + Send + Sync>> {
        if limit == 0 {
            return Ok(Vec::new());
        }
        let mut conn = self.get_connection().await?;
        let start = -(limit.min(isize::MAX as usize) as isize);
        let json_entries: Vec<String> = conn.zrange(self.key("messages"), start, -1).await?;
        Ok(Self::decode(json_entries))
    }

    async fn record_response(
        &self,
        message: &ConversationMessage
    ) -> Result<(), Box<dyn Error + Send + Sync>> {
        self.push("responses", message).await
    }

    async fn latest_response(
        &self
    ) -> Result<Option<ConversationMessage>, Box<dyn Error + Send + Sync>> {
        let mut conn = self.get_connection().await?;
        let json_entries: Vec<String> = conn.zrevrange(self.key("responses"), 0, 0).await?;
        Ok(Self::decode(json_entries).into_iter().next())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::chat::Role;

    #[test]
    fn decode_skips_corrupt_entries() {
        let entries = vec![
            r#"{"role":"user","content":"hi","timestamp":1}"#.to_string(),
            "not json".to_string(),
            r#"{"role":"assistant","content":"hello","timestamp":2}"#.to_string(),
        ];

        let messages = RedisHistoryStore::decode(entries);
        assert_eq!(messages.len(), 2);
        assert_eq!(messages[1].role, Role::Assistant);
    }
}
