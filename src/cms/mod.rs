pub mod wordpress;

use async_trait::async_trait;
use serde_json::Value;
use std::error::Error;
use crate::models::post::{ MediaRecord, PostPayload, TagOutcome };

pub use self::wordpress::WordPressClient;

#[async_trait]
pub trait Cms: Send + Sync {
    /// Published posts whose slug equals `slug`.
    async fn posts_by_slug(&self, slug: &str) -> Result<Vec<Value>, Box<dyn Error + Send + Sync>>;

    async fn create_tag(
        &self,
        name: &str,
        slug: &str,
        owner_id: u64
    ) -> Result<TagOutcome, Box<dyn Error + Send + Sync>>;

    async fn create_post(
        &self,
        post: &PostPayload
    ) -> Result<Option<u64>, Box<dyn Error + Send + Sync>>;
}

#[async_trait]
pub trait MediaUploader: Send + Sync {
    /// Downloads the image at `url` and stores it as a media item owned by `owner_id`.
    async fn upload(
        &self,
        url: &str,
        title: &str,
        owner_id: u64
    ) -> Result<MediaRecord, Box<dyn Error + Send + Sync>>;
}
