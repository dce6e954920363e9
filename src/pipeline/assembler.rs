use chrono::{ DateTime, Duration, SecondsFormat, Utc };
use log::{ info, warn };
use std::sync::Arc;
use crate::cms::Cms;
use crate::models::post::{ PostDraft, PostPayload, TagOutcome };
use crate::pipeline::slug::canonicalize;

pub const DEFAULT_UTC_OFFSET_HOURS: i64 = 3;

/// Draft fields the CMS rejects or misreads, plus the ones the assembler sets itself.
const TRANSIENT_FIELDS: &[&str] = &["template", "date", "date_gmt"];

/// `date` is the instant in UTC; `date_gmt` is the same instant shifted by the site offset.
pub fn publish_dates(now: DateTime<Utc>, utc_offset_hours: i64) -> (String, String) {
    let date = now.to_rfc3339_opts(SecondsFormat::Millis, true);
    let date_gmt = (now + Duration::hours(utc_offset_hours)).to_rfc3339_opts(SecondsFormat::Millis, true);
    (date, date_gmt)
}

pub struct PostAssembler {
    cms: Arc<dyn Cms>,
    utc_offset_hours: i64,
}

impl PostAssembler {
    pub fn new(cms: Arc<dyn Cms>) -> Self {
        Self { cms, utc_offset_hours: DEFAULT_UTC_OFFSET_HOURS }
    }

    pub fn with_utc_offset_hours(mut self, hours: i64) -> Self {
        self.utc_offset_hours = hours;
        self
    }

    pub async fn finalize(&self, post: PostDraft, now: DateTime<Utc>) -> PostPayload {
        let author = post.author_or_default();
        let (date, date_gmt) = publish_dates(now, self.utc_offset_hours);
        let tags = self.resolve_tags(&post.tags, author).await;

        let mut extra = post.extra;
        for field in TRANSIENT_FIELDS {
            extra.remove(*field);
        }

        PostPayload {
            title: post.title,
            content: post.content,
            tags,
            author,
            featured_media: post.featured_media,
            date,
            date_gmt,
            extra,
        }
    }

    /// Creates every tag by name. Names that already exist resolve to the existing id;
    /// tags that fail for any other reason are skipped.
    pub async fn resolve_tags(&self, names: &[String], owner_id: u64) -> Vec<u64> {
        info!("WP: creating {} tag(s)", names.len());
        let mut ids = Vec::with_capacity(names.len());
        for name in names.iter().map(|n| n.trim()).filter(|n| !n.is_empty()) {
            match self.cms.create_tag(name, &canonicalize(name), owner_id).await {
                Ok(outcome) => {
                    if let TagOutcome::Exists(id) = outcome {
                        info!("WP: tag '{}' already exists as {}", name, id);
                    }
                    if !ids.contains(&outcome.id()) {
                        ids.push(outcome.id());
                    }
                }
                Err(e) => warn!("WP: skipping tag '{}': {}", name, e),
            }
        }
        ids
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use async_trait::async_trait;
    use chrono::TimeZone;
    use serde_json::{ json, Value };
    use std::error::Error;
    use std::sync::Mutex;

    #[derive(Default)]
    struct TagRegistry {
        tags: Mutex<Vec<String>>,
    }

    #[async_trait]
    impl Cms for TagRegistry {
        async fn posts_by_slug(&self, _slug: &str) -> Result<Vec<Value>, Box<dyn Error + Send + Sync>> {
            Ok(Vec::new())
        }

        async fn create_tag(
            &self,
            _name: &str,
            slug: &str,
            _owner_id: u64
        ) -> Result<TagOutcome, Box<dyn Error + Send + Sync>> {
            let mut tags = self.tags.lock().unwrap();
            match tags.iter().position(|t| t == slug) {
                Some(i) => Ok(TagOutcome::Exists((i as u64) + 1)),
                None => {
                    tags.push(slug.to_string());
                    Ok(TagOutcome::Created(tags.len() as u64))
                }
            }
        }

        async fn create_post(
            &self,
            _post: &PostPayload
        ) -> Result<Option<u64>, Box<dyn Error + Send + Sync>> {
            Ok(None)
        }
    }

    #[tokio::test]
    async fn drafted_dates_never_override_assembled_ones() {
        let assembler = PostAssembler::new(Arc::new(TagRegistry::default()));
        let draft: PostDraft = serde_json
            ::from_value(
                json!({
                "title": "T",
                "content": "c",
                "date": "2001-01-01T00:00:00",
                "date_gmt": "2001-01-01T00:00:00",
                "status": "publish"
            })
            )
            .unwrap();
        let now = Utc.with_ymd_and_hms(2024, 5, 1, 12, 30, 0).unwrap();

        let payload = assembler.finalize(draft, now).await;
        let body = serde_json::to_string(&payload).unwrap();

        assert_eq!(body.matches("\"date\":").count(), 1);
        assert_eq!(body.matches("\"date_gmt\":").count(), 1);
        assert!(body.contains("\"date\":\"2024-05-01T12:30:00.000Z\""));
        assert_eq!(payload.extra.get("status"), Some(&json!("publish")));
    }

    #[tokio::test]
    async fn repeated_tag_names_resolve_to_one_id() {
        let assembler = PostAssembler::new(Arc::new(TagRegistry::default()));
        let names: Vec<String> = ["Rust", "rust", " Rust ", "", "Blog"]
            .iter()
            .map(|n| n.to_string())
            .collect();

        assert_eq!(assembler.resolve_tags(&names, 1).await, vec![1, 2]);
    }

    #[test]
    fn dates_are_iso_with_millis() {
        let now = Utc.with_ymd_and_hms(2024, 5, 1, 12, 30, 0).unwrap();
        let (date, date_gmt) = publish_dates(now, 3);
        assert_eq!(date, "2024-05-01T12:30:00.000Z");
        assert_eq!(date_gmt, "2024-05-01T15:30:00.000Z");
    }

    #[test]
    fn negative_offset_moves_back() {
        let now = Utc.with_ymd_and_hms(2024, 1, 1, 1, 0, 0).unwrap();
        let (_, date_gmt) = publish_dates(now, -3);
        assert_eq!(date_gmt, "2023-12-31T22:00:00.000Z");
    }
}
