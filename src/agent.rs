use crate::cache;
use crate::cli::Args;
use crate::cms::WordPressClient;
use crate::config::prompt;
use crate::history::initialize_history_store;
use crate::llm::chat::{ ChatClient, new_client as new_chat_client };
use crate::llm::image::{ ImageGenerator, ImageOptions, OpenAIImageClient };
use crate::llm::{ LlmConfig, LlmType };
use crate::pipeline::{
    Collaborators,
    PipelineOptions,
    PipelineResponse,
    PostPipeline,
    PostRequest,
    ReplySource,
};

use log::{ info, debug };
use std::collections::HashMap;
use std::error::Error;
use std::sync::Arc;
use tokio::sync::Mutex;

/// Owns the pipeline and serializes invocations per category, so two requests for the
/// same category cannot both pass the duplicate check before either publishes.
pub struct PostAgent {
    pipeline: PostPipeline,
    in_flight: Mutex<HashMap<u64, Arc<Mutex<()>>>>,
}

impl PostAgent {
    fn initialize_chat_client(args: &Args) -> Result<Arc<dyn ChatClient>, Box<dyn Error + Send + Sync>> {
        let chat_llm_type: LlmType = args.chat_llm_type
            .parse()
            .map_err(|e| format!("Invalid chat LLM type: {}", e))?;
        let chat_api_key = if !args.chat_api_key.is_empty() {
            Some(args.chat_api_key.clone())
        } else {
            None
        };
        let chat_config = LlmConfig {
            llm_type: chat_llm_type,
            base_url: args.chat_base_url.clone(),
            api_key: chat_api_key,
            completion_model: args.chat_model.clone(),
        };
        let chat_client = new_chat_client(&chat_config)?;
        info!(
            "Chat client configured: Type={}, Model={}, BaseURL={:?}",
            args.chat_llm_type,
            chat_client.get_model(),
            chat_client.get_base_url()
        );
        Ok(chat_client)
    }

    fn initialize_image_client(
        args: &Args
    ) -> Result<Arc<dyn ImageGenerator>, Box<dyn Error + Send + Sync>> {
        let options = ImageOptions {
            model: args.image_model.clone(),
            quality: args.image_quality.clone(),
            size: args.image_size.clone(),
            style: args.image_style.clone(),
        };
        info!("Image client configured: {:?}", options);
        let client = OpenAIImageClient::new(
            &args.image_api_key(),
            args.image_base_url.clone(),
            options
        )?;
        Ok(Arc::new(client))
    }

    pub async fn new(args: Args) -> Result<Self, Box<dyn Error + Send + Sync>> {
        let chat = Self::initialize_chat_client(&args)?;
        let images = Self::initialize_image_client(&args)?;
        let history = initialize_history_store(&args)?;
        let image_cache = cache::init(&args).await?;
        let wordpress = Arc::new(WordPressClient::from_env(&args.blogger_uri));
        let prompts = prompt::load_prompts(&args.prompts_path)?;

        let collaborators = Collaborators {
            history,
            chat,
            images,
            media: wordpress.clone(),
            cms: wordpress,
            cache: image_cache,
        };
        let options = PipelineOptions {
            cover_marker: args.cover_marker.clone(),
            max_images: args.max_images,
            utc_offset_hours: args.site_utc_offset_hours,
            featured_media_seed: args.featured_media_seed,
            history_limit: args.history_limit,
            reply_source: if args.replay_last_response {
                ReplySource::LastRecorded
            } else {
                ReplySource::Model
            },
        };

        Ok(Self::from_pipeline(PostPipeline::new(collaborators, prompts, options)))
    }

    pub fn from_pipeline(pipeline: PostPipeline) -> Self {
        Self {
            pipeline,
            in_flight: Mutex::new(HashMap::new()),
        }
    }

    async fn category_lock(&self, category_id: u64) -> Arc<Mutex<()>> {
        let mut locks = self.in_flight.lock().await;
        Arc::clone(locks.entry(category_id).or_default())
    }

    /// Drops the category's lock once no other invocation holds or waits on it.
    async fn release_category(&self, category_id: u64, lock: Arc<Mutex<()>>) {
        let mut locks = self.in_flight.lock().await;
        if Arc::strong_count(&lock) == 2 {
            locks.remove(&category_id);
        }
    }

    pub async fn tracked_categories(&self) -> usize {
        self.in_flight.lock().await.len()
    }

    pub async fn generate(&self, request: PostRequest) -> PipelineResponse {
        let lock = self.category_lock(request.category_id).await;
        let response = {
            let _guard = match lock.try_lock() {
                Ok(guard) => guard,
                Err(_) => {
                    debug!("Category {} is already running, waiting", request.category_id);
                    lock.lock().await
                }
            };
            self.pipeline.handle(request).await
        };
        self.release_category(request.category_id, lock).await;
        response
    }
}
