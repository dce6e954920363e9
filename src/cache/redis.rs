use async_trait::async_trait;
use redis::{ Client, AsyncCommands };
use redis::aio::MultiplexedConnection;
use std::error::Error;
use std::sync::Arc;
use tokio::sync::Mutex;
use crate::cache::ImageCache;
use crate::models::post::CachedImage;

/// One hash per post (`<prefix><post title>`), one field per image title.
pub struct RedisImageCache {
    conn: Arc<Mutex<MultiplexedConnection>>,
    prefix: String,
}

impl RedisImageCache {
    pub async fn connect(url: &str, prefix: &str) -> Result<Self, Box<dyn Error + Send + Sync>> {
        let client = Client::open(url)?;
        let conn = client.get_multiplexed_async_connection().await?;
        Ok(Self {
            conn: Arc::new(Mutex::new(conn)),
            prefix: prefix.to_string(),
        })
    }

    fn key(&self, post_title: &str) -> String {
        format!("{}{}", self.prefix, post_title)
    }
}

#[async_trait]
impl ImageCache for RedisImageCache {
    async fn get(
        &self,
        post_title: &str,
        image_title: &str
    ) -> Result<Option<CachedImage>, Box<dyn Error + Send + Sync>> {
        let mut guard = self.conn.lock().await;
        let raw: Option<String> = guard.hget(self.key(post_title), image_title).await?;
        match raw {
            Some(json) => Ok(Some(serde_json::from_str(&json)?)),
            None => Ok(None),
        }
    }

    async fn put(
        &self,
        post_title: &str,
        entry: &CachedImage
    ) -> Result<(), Box<dyn Error + Send + Sync>> {
        let json = serde_json::to_string(entry)?;
        let mut guard = self.conn.lock().await;
        guard.hset::<_, _, _, ()>(self.key(post_title), &entry.title, json).await?;
        Ok(())
    }
}
