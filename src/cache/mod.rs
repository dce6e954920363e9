pub mod memory;
pub mod redis;

use async_trait::async_trait;
use log::info;
use std::error::Error;
use std::sync::Arc;
use crate::cli::Args;
use crate::models::post::CachedImage;

pub use self::memory::MemoryImageCache;
pub use self::redis::RedisImageCache;

/// Rendered images per post, keyed by post title and image title.
#[async_trait]
pub trait ImageCache: Send + Sync {
    async fn get(
        &self,
        post_title: &str,
        image_title: &str
    ) -> Result<Option<CachedImage>, Box<dyn Error + Send + Sync>>;

    async fn put(
        &self,
        post_title: &str,
        entry: &CachedImage
    ) -> Result<(), Box<dyn Error + Send + Sync>>;
}

pub async fn init(args: &Args) -> Result<Arc<dyn ImageCache>, Box<dyn Error + Send + Sync>> {
    match args.cache_type.to_lowercase().as_str() {
        "redis" => {
            info!("Image cache: redis at {}", args.cache_redis_url);
            Ok(Arc::new(RedisImageCache::connect(&args.cache_redis_url, &args.cache_redis_prefix).await?))
        }
        "memory" => {
            info!("Image cache: in-memory");
            Ok(Arc::new(MemoryImageCache::default()))
        }
        other => Err(format!("Unsupported image cache type: {}", other).into()),
    }
}
