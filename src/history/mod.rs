mod memory;
mod redis;
use async_trait::async_trait;
use chrono::Utc;
use log::info;
use std::error::Error;
use std::sync::atomic::{ AtomicI64, Ordering };
use std::sync::Arc;
use crate::cli::Args;
use crate::models::chat::ConversationMessage;

pub use self::memory::MemoryHistoryStore;
pub use self::redis::RedisHistoryStore;

/// Conversation log the model sees on every invocation, plus a log of raw replies.
#[async_trait]
pub trait HistoryStore: Send + Sync {
    async fn append(&self, message: &ConversationMessage) -> Result<(), Box<dyn Error + Send + Sync>>;

    async fn list_all(&self) -> Result<Vec<ConversationMessage>, Box<dyn Error + Send + Sync>>;

    /// The newest `limit` messages, oldest first.
    async fn list_recent(
        &self,
        limit: usize
    ) -> Result<Vec<ConversationMessage>, Box<dyn Error + Send + Sync>>;

    async fn record_response(
        &self,
        message: &ConversationMessage
    ) -> Result<(), Box<dyn Error + Send + Sync>>;

    async fn latest_response(
        &self
    ) -> Result<Option<ConversationMessage>, Box<dyn Error + Send + Sync>>;
}

/// Millisecond timestamps that never repeat or go backwards within one process.
#[derive(Debug, Default)]
pub struct TimestampKeys {
    last: AtomicI64,
}

impl TimestampKeys {
    pub fn next(&self) -> i64 {
        let now = Utc::now().timestamp_millis();
        let mut prev = self.last.load(Ordering::Relaxed);
        loop {
            let candidate = now.max(prev + 1);
            match self.last.compare_exchange_weak(prev, candidate, Ordering::AcqRel, Ordering::Relaxed) {
                Ok(_) => return candidate,
                Err(actual) => prev = actual,
            }
        }
    }
}

pub fn create_history_store(
    args: &Args
) -> Result<Arc<dyn HistoryStore>, Box<dyn Error + Send + Sync>> {
    match args.history_type.to_lowercase().as_str() {
        "redis" => {
            let store = RedisHistoryStore::new(&args.history_host, &args.history_redis_prefix)?;
            Ok(Arc::new(store))
        }
        "memory" => Ok(Arc::new(MemoryHistoryStore::new())),
        _ =>
            Err(
                Box::new(
                    std::io::Error::new(
                        std::io::ErrorKind::InvalidInput,
                        format!("Unsupported history store type: {}", args.history_type)
                    )
                )
            ),
    }
}

pub fn initialize_history_store(
    args: &Args
) -> Result<Arc<dyn HistoryStore>, Box<dyn Error + Send + Sync>> {
    info!("Chat history will be stored in: {} at {}", args.history_type, args.history_host);
    create_history_store(args)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn timestamp_keys_are_strictly_increasing() {
        let keys = TimestampKeys::default();
        let mut last = keys.next();
        for _ in 0..1000 {
            let next = keys.next();
            assert!(next > last);
            last = next;
        }
    }
}
