use async_trait::async_trait;
use std::collections::HashMap;
use std::error::Error;
use tokio::sync::Mutex;
use crate::cache::ImageCache;
use crate::models::post::CachedImage;

#[derive(Default)]
pub struct MemoryImageCache {
    entries: Mutex<HashMap<(String, String), CachedImage>>,
}

impl MemoryImageCache {
    pub async fn entry_count(&self) -> usize {
        self.entries.lock().await.len()
    }
}

#[async_trait]
impl ImageCache for MemoryImageCache {
    async fn get(
        &self,
        post_title: &str,
        image_title: &str
    ) -> Result<Option<CachedImage>, Box<dyn Error + Send + Sync>> {
        let entries = self.entries.lock().await;
        Ok(entries.get(&(post_title.to_string(), image_title.to_string())).cloned())
    }

    async fn put(
        &self,
        post_title: &str,
        entry: &CachedImage
    ) -> Result<(), Box<dyn Error + Send + Sync>> {
        self.entries
            .lock().await
            .insert((post_title.to_string(), entry.title.clone()), entry.clone());
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::post::MediaRecord;

    #[tokio::test]
    async fn entries_are_scoped_per_post() {
        let cache = MemoryImageCache::default();
        let entry = CachedImage {
            title: "Capa".into(),
            url: "https://img/1.png".into(),
            media: None,
        };
        cache.put("Post A", &entry).await.unwrap();

        assert_eq!(cache.get("Post A", "Capa").await.unwrap(), Some(entry.clone()));
        assert!(cache.get("Post B", "Capa").await.unwrap().is_none());
    }

    #[tokio::test]
    async fn put_overwrites_with_uploaded_media() {
        let cache = MemoryImageCache::default();
        let mut entry = CachedImage {
            title: "Capa".into(),
            url: "https://img/1.png".into(),
            media: None,
        };
        cache.put("Post", &entry).await.unwrap();
        entry.media = Some(MediaRecord { id: 9, rendered: "<img />".into() });
        cache.put("Post", &entry).await.unwrap();

        assert_eq!(cache.entry_count().await, 1);
        assert_eq!(cache.get("Post", "Capa").await.unwrap().unwrap().media.unwrap().id, 9);
    }
}
