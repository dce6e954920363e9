pub mod assembler;
pub mod extractor;
pub mod images;
pub mod slug;

use chrono::Utc;
use log::{ info, warn, error };
use rand::rngs::StdRng;
use rand::SeedableRng;
use serde::{ Deserialize, Serialize };
use serde_json::{ json, Value };
use std::sync::Arc;

use crate::cache::ImageCache;
use crate::cms::{ Cms, MediaUploader };
use crate::config::prompt::PromptConfig;
use crate::error::PipelineError;
use crate::history::HistoryStore;
use crate::llm::chat::ChatClient;
use crate::llm::image::ImageGenerator;
use crate::models::chat::ConversationMessage;
use crate::models::post::PublishedPost;
use self::assembler::{ PostAssembler, DEFAULT_UTC_OFFSET_HOURS };
use self::images::{ ImagePipeline, DEFAULT_COVER_MARKER, DEFAULT_MAX_IMAGES };

pub const DEFAULT_HISTORY_LIMIT: usize = 20;

/// Handles to every external service the pipeline talks to.
#[derive(Clone)]
pub struct Collaborators {
    pub history: Arc<dyn HistoryStore>,
    pub chat: Arc<dyn ChatClient>,
    pub images: Arc<dyn ImageGenerator>,
    pub media: Arc<dyn MediaUploader>,
    pub cms: Arc<dyn Cms>,
    pub cache: Arc<dyn ImageCache>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ReplySource {
    /// Ask the chat model for a new post.
    Model,
    /// Re-run the most recently recorded model reply.
    LastRecorded,
}

#[derive(Debug, Clone)]
pub struct PipelineOptions {
    pub cover_marker: String,
    pub max_images: usize,
    pub utc_offset_hours: i64,
    pub featured_media_seed: Option<u64>,
    pub reply_source: ReplySource,
    /// Prior conversation messages sent with each request.
    pub history_limit: usize,
}

impl Default for PipelineOptions {
    fn default() -> Self {
        Self {
            cover_marker: DEFAULT_COVER_MARKER.to_string(),
            max_images: DEFAULT_MAX_IMAGES,
            utc_offset_hours: DEFAULT_UTC_OFFSET_HOURS,
            featured_media_seed: None,
            reply_source: ReplySource::Model,
            history_limit: DEFAULT_HISTORY_LIMIT,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum PipelineOutcome {
    Created(PublishedPost),
    /// A post with the same slug is already published; nothing was rendered or created.
    Duplicate {
        slug: String,
    },
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct PostRequest {
    #[serde(rename = "categoryId")]
    pub category_id: u64,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct PipelineResponse {
    #[serde(rename = "statusCode")]
    pub status_code: u16,
    pub body: Value,
}

impl PipelineResponse {
    pub fn from_result(result: &Result<PipelineOutcome, PipelineError>) -> Self {
        match result {
            Ok(PipelineOutcome::Created(post)) =>
                Self {
                    status_code: 200,
                    body: json!({ "message": "Post created.", "slug": post.slug, "id": post.id }),
                },
            Ok(PipelineOutcome::Duplicate { slug }) =>
                Self {
                    status_code: 200,
                    body: json!({ "message": "Post already exists.", "slug": slug }),
                },
            Err(_) =>
                Self {
                    status_code: 500,
                    body: json!({ "error": "Failed to generate post." }),
                },
        }
    }

    pub fn is_success(&self) -> bool {
        self.status_code == 200
    }
}

pub struct PostPipeline {
    history: Arc<dyn HistoryStore>,
    chat: Arc<dyn ChatClient>,
    cms: Arc<dyn Cms>,
    prompts: Arc<PromptConfig>,
    images: ImagePipeline,
    assembler: PostAssembler,
    reply_source: ReplySource,
    featured_media_seed: Option<u64>,
    history_limit: usize,
}

impl PostPipeline {
    pub fn new(
        collaborators: Collaborators,
        prompts: Arc<PromptConfig>,
        options: PipelineOptions
    ) -> Self {
        let images = ImagePipeline::new(
            collaborators.images,
            collaborators.media,
            collaborators.cache
        )
            .with_cover_marker(options.cover_marker)
            .with_max_images(options.max_images);
        let assembler = PostAssembler::new(Arc::clone(&collaborators.cms)).with_utc_offset_hours(
            options.utc_offset_hours
        );

        Self {
            history: collaborators.history,
            chat: collaborators.chat,
            cms: collaborators.cms,
            prompts,
            images,
            assembler,
            reply_source: options.reply_source,
            featured_media_seed: options.featured_media_seed,
            history_limit: options.history_limit,
        }
    }

    /// Entry point: runs the pipeline and maps the outcome to a status code and body.
    pub async fn handle(&self, request: PostRequest) -> PipelineResponse {
        let result = self.run(request.category_id).await;
        if let Err(e) = &result {
            error!("Post for category {} failed: {}", request.category_id, e);
        }
        PipelineResponse::from_result(&result)
    }

    pub async fn run(&self, category_id: u64) -> Result<PipelineOutcome, PipelineError> {
        info!("Starting post for category {}...", category_id);

        let reply = self.fetch_reply(category_id).await?;

        let draft = extractor::extract_post(&reply.content).ok_or(PipelineError::MalformedPost)?;
        let post_slug = slug::canonicalize(&draft.title);
        if post_slug.is_empty() {
            return Err(PipelineError::MalformedPost);
        }
        let duplicate = slug
            ::exists(self.cms.as_ref(), &post_slug).await
            .map_err(|source| PipelineError::DuplicateCheck { slug: post_slug.clone(), source })?;
        if duplicate {
            return Ok(PipelineOutcome::Duplicate { slug: post_slug });
        }

        let directives = extractor
            ::extract_directives(&reply.content)
            .ok_or(PipelineError::MalformedDirectives)?;
        info!("'{}': {} image prompt(s)", draft.title, directives.len());

        let mut rng = match self.featured_media_seed {
            Some(seed) => StdRng::seed_from_u64(seed),
            None => StdRng::from_entropy(),
        };
        let (post, report) = self.images.process(draft, &directives, &mut rng).await;
        info!(
            "'{}': {} image(s) embedded, featured media {:?}",
            post.title,
            report.media_ids.len(),
            post.featured_media
        );

        let payload = self.assembler.finalize(post, Utc::now()).await;
        let id = self.cms.create_post(&payload).await.map_err(PipelineError::Publish)?;

        info!("Post for category {} created!", category_id);
        Ok(PipelineOutcome::Created(PublishedPost { id, slug: post_slug }))
    }

    async fn fetch_reply(&self, category_id: u64) -> Result<ConversationMessage, PipelineError> {
        if self.reply_source == ReplySource::LastRecorded {
            info!("Replaying the last recorded model response");
            return self.history
                .latest_response().await
                .map_err(PipelineError::History)?
                .ok_or(PipelineError::NothingToReplay);
        }

        let mut messages = self.history
            .list_recent(self.history_limit).await
            .map_err(PipelineError::History)?;
        let request = ConversationMessage::user(self.prompts.post_request(category_id));
        self.history.append(&request).await.map_err(PipelineError::History)?;
        messages.push(request);

        let reply = self.chat.complete(&messages).await.map_err(PipelineError::Model)?;
        if reply.content.trim().is_empty() {
            return Err(PipelineError::EmptyReply);
        }

        if let Err(e) = self.history.record_response(&reply).await {
            warn!("Recording model response failed: {}", e);
        }
        if let Err(e) = self.history.append(&reply).await {
            warn!("History write (assistant) failed: {}", e);
        }
        Ok(reply)
    }
}
