#![allow(dead_code)]

use async_trait::async_trait;
use autopost::cache::{ ImageCache, MemoryImageCache };
use autopost::cms::{ Cms, MediaUploader };
use autopost::config::prompt::PromptConfig;
use autopost::history::{ HistoryStore, MemoryHistoryStore };
use autopost::llm::chat::ChatClient;
use autopost::llm::image::ImageGenerator;
use autopost::models::chat::ConversationMessage;
use autopost::models::post::{ CachedImage, MediaRecord, PostPayload, TagOutcome };
use autopost::pipeline::slug::canonicalize;
use autopost::pipeline::{ Collaborators, PipelineOptions, PostPipeline };
use serde_json::{ json, Value };
use std::collections::HashMap;
use std::error::Error;
use std::sync::atomic::{ AtomicU64, AtomicUsize, Ordering };
use std::sync::{ Arc, Mutex };
use std::time::Duration;

pub type BoxError = Box<dyn Error + Send + Sync>;

pub const POST_JSON: &str = r#"{
  "title": "Hello World",
  "content": "<h2>Intro</h2><img title=\"Capa\" /><p>Texto longo.</p><h2>Topico</h2><img title='Topico1' /><p>Mais texto.</p>",
  "tags": ["Rust", "Blog"],
  "author": 2,
  "status": "publish",
  "template": ""
}"#;

pub const TWO_DIRECTIVES: &str = r#"[
  {"title": "Capa", "prompt": "A bright cover about hello world"},
  {"title": "Topico1", "prompt": "An illustration of the first topic"}
]"#;

pub fn reply_with(post_json: &str, directives_json: &str) -> String {
    format!(
        "Claro! Segue o post:\n\n```json\n{}\n```\n\nPrompts para as imagens:\n\n```shell\n{}\n```\n",
        post_json,
        directives_json
    )
}

pub fn canned_reply() -> String {
    reply_with(POST_JSON, TWO_DIRECTIVES)
}

/// A post with one placeholder per title, and the matching directive list.
pub fn reply_for_titles(titles: &[&str]) -> String {
    let content: String = titles
        .iter()
        .map(|t| format!("<p>{}</p><img title=\"{}\" />", t, t))
        .collect();
    let post = json!({ "title": "Many Images", "content": content, "tags": [], "author": 2 });
    let directives: Vec<Value> = titles
        .iter()
        .map(|t| json!({ "title": t, "prompt": format!("prompt for {}", t) }))
        .collect();
    reply_with(&post.to_string(), &serde_json::to_string_pretty(&directives).unwrap())
}

pub struct ScriptedChat {
    reply: Mutex<Result<String, String>>,
    pub calls: AtomicUsize,
    pub seen: Mutex<Vec<Vec<ConversationMessage>>>,
    delay: Option<Duration>,
}

impl ScriptedChat {
    pub fn replying(reply: impl Into<String>) -> Self {
        Self {
            reply: Mutex::new(Ok(reply.into())),
            calls: AtomicUsize::new(0),
            seen: Mutex::new(Vec::new()),
            delay: None,
        }
    }

    pub fn failing(message: &str) -> Self {
        let chat = Self::replying("");
        *chat.reply.lock().unwrap() = Err(message.to_string());
        chat
    }

    pub fn with_delay(mut self, delay: Duration) -> Self {
        self.delay = Some(delay);
        self
    }

    pub fn calls(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl ChatClient for ScriptedChat {
    async fn complete(&self, messages: &[ConversationMessage]) -> Result<ConversationMessage, BoxError> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        self.seen.lock().unwrap().push(messages.to_vec());
        if let Some(delay) = self.delay {
            tokio::time::sleep(delay).await;
        }
        let reply = self.reply.lock().unwrap().clone();
        reply.map(ConversationMessage::assistant).map_err(|e| e.into())
    }

    fn get_model(&self) -> String {
        "scripted".to_string()
    }

    fn get_base_url(&self) -> Option<String> {
        None
    }
}

#[derive(Default)]
pub struct FakeImages {
    pub calls: AtomicUsize,
    pub failing_prompts: Vec<String>,
}

impl FakeImages {
    pub fn failing_for(prompt: &str) -> Self {
        Self { failing_prompts: vec![prompt.to_string()], ..Default::default() }
    }

    pub fn calls(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl ImageGenerator for FakeImages {
    async fn generate(&self, prompt: &str) -> Result<String, BoxError> {
        let n = self.calls.fetch_add(1, Ordering::SeqCst);
        if self.failing_prompts.iter().any(|p| p == prompt) {
            return Err("content policy violation".into());
        }
        Ok(format!("https://images.test/{}.png", n))
    }
}

pub struct FakeMedia {
    next_id: AtomicU64,
    pub calls: AtomicUsize,
    pub fail: bool,
    pub failing_url_prefix: Option<String>,
    pub owners: Mutex<Vec<u64>>,
}

impl Default for FakeMedia {
    fn default() -> Self {
        Self {
            next_id: AtomicU64::new(100),
            calls: AtomicUsize::new(0),
            fail: false,
            failing_url_prefix: None,
            owners: Mutex::new(Vec::new()),
        }
    }
}

impl FakeMedia {
    pub fn failing() -> Self {
        Self { fail: true, ..Default::default() }
    }

    /// Rejects downloads of URLs starting with `prefix`, like an expired image link.
    pub fn rejecting(prefix: &str) -> Self {
        Self { failing_url_prefix: Some(prefix.to_string()), ..Default::default() }
    }

    pub fn calls(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl MediaUploader for FakeMedia {
    async fn upload(&self, url: &str, _title: &str, owner_id: u64) -> Result<MediaRecord, BoxError> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        self.owners.lock().unwrap().push(owner_id);
        if self.fail {
            return Err("413 payload too large".into());
        }
        if self.failing_url_prefix.as_deref().is_some_and(|prefix| url.starts_with(prefix)) {
            return Err("403 signature expired".into());
        }
        let id = self.next_id.fetch_add(1, Ordering::SeqCst);
        Ok(MediaRecord {
            id,
            rendered: format!(
                "<p class=\"attachment\"><img class=\"attachment-medium size-medium\" src=\"{}\" /></p>",
                url
            ),
        })
    }
}

pub struct FakeCms {
    pub existing_slugs: Vec<String>,
    tags: Mutex<HashMap<String, u64>>,
    next_tag: AtomicU64,
    pub posts: Mutex<Vec<PostPayload>>,
    pub slug_queries: AtomicUsize,
    pub fail_publish: Mutex<bool>,
}

impl Default for FakeCms {
    fn default() -> Self {
        Self {
            existing_slugs: Vec::new(),
            tags: Mutex::new(HashMap::new()),
            next_tag: AtomicU64::new(1),
            posts: Mutex::new(Vec::new()),
            slug_queries: AtomicUsize::new(0),
            fail_publish: Mutex::new(false),
        }
    }
}

impl FakeCms {
    pub fn with_existing(slug: &str) -> Self {
        Self { existing_slugs: vec![slug.to_string()], ..Default::default() }
    }

    pub fn with_tag(self, name: &str, id: u64) -> Self {
        self.tags.lock().unwrap().insert(canonicalize(name), id);
        self
    }

    pub fn set_fail_publish(&self, fail: bool) {
        *self.fail_publish.lock().unwrap() = fail;
    }

    pub fn published(&self) -> Vec<PostPayload> {
        self.posts.lock().unwrap().clone()
    }
}

#[async_trait]
impl Cms for FakeCms {
    async fn posts_by_slug(&self, slug: &str) -> Result<Vec<Value>, BoxError> {
        self.slug_queries.fetch_add(1, Ordering::SeqCst);
        let mut found: Vec<Value> = self.existing_slugs
            .iter()
            .filter(|s| s.as_str() == slug)
            .map(|s| json!({ "slug": s }))
            .collect();
        found.extend(
            self.posts
                .lock()
                .unwrap()
                .iter()
                .filter(|p| canonicalize(&p.title) == slug)
                .map(|p| json!({ "slug": canonicalize(&p.title) }))
        );
        Ok(found)
    }

    async fn create_tag(&self, _name: &str, slug: &str, _owner_id: u64) -> Result<TagOutcome, BoxError> {
        let mut tags = self.tags.lock().unwrap();
        if let Some(id) = tags.get(slug) {
            return Ok(TagOutcome::Exists(*id));
        }
        let id = self.next_tag.fetch_add(1, Ordering::SeqCst);
        tags.insert(slug.to_string(), id);
        Ok(TagOutcome::Created(id))
    }

    async fn create_post(&self, post: &PostPayload) -> Result<Option<u64>, BoxError> {
        if *self.fail_publish.lock().unwrap() {
            return Err("502 bad gateway".into());
        }
        let mut posts = self.posts.lock().unwrap();
        posts.push(post.clone());
        Ok(Some(1000 + posts.len() as u64))
    }
}

/// A cache whose backend is unreachable.
#[derive(Default)]
pub struct UnreachableCache {
    pub reads: AtomicUsize,
    pub writes: AtomicUsize,
}

#[async_trait]
impl ImageCache for UnreachableCache {
    async fn get(&self, _post_title: &str, _image_title: &str) -> Result<Option<CachedImage>, BoxError> {
        self.reads.fetch_add(1, Ordering::SeqCst);
        Err("connection refused".into())
    }

    async fn put(&self, _post_title: &str, _entry: &CachedImage) -> Result<(), BoxError> {
        self.writes.fetch_add(1, Ordering::SeqCst);
        Err("connection refused".into())
    }
}

/// Every collaborator of one pipeline, kept around so tests can inspect them.
pub struct Harness {
    pub history: Arc<MemoryHistoryStore>,
    pub chat: Arc<ScriptedChat>,
    pub images: Arc<FakeImages>,
    pub media: Arc<FakeMedia>,
    pub cms: Arc<FakeCms>,
    pub cache: Arc<dyn ImageCache>,
    pub memory_cache: Arc<MemoryImageCache>,
    pub options: PipelineOptions,
}

impl Harness {
    pub fn new(reply: impl Into<String>) -> Self {
        let memory_cache = Arc::new(MemoryImageCache::default());
        Self {
            history: Arc::new(MemoryHistoryStore::new()),
            chat: Arc::new(ScriptedChat::replying(reply)),
            images: Arc::new(FakeImages::default()),
            media: Arc::new(FakeMedia::default()),
            cms: Arc::new(FakeCms::default()),
            cache: memory_cache.clone(),
            memory_cache,
            options: PipelineOptions { featured_media_seed: Some(7), ..PipelineOptions::default() },
        }
    }

    pub fn pipeline(&self) -> PostPipeline {
        let collaborators = Collaborators {
            history: self.history.clone() as Arc<dyn HistoryStore>,
            chat: self.chat.clone(),
            images: self.images.clone(),
            media: self.media.clone(),
            cms: self.cms.clone(),
            cache: self.cache.clone(),
        };
        PostPipeline::new(collaborators, Arc::new(PromptConfig::default()), self.options.clone())
    }
}
