use clap::Parser;

#[derive(Parser, Debug, Clone)]
#[command(author, version, about, long_about = None)]
pub struct Args {
    // --- History Store Args ---
    /// Conversation history store type (redis, memory)
    #[arg(long, env = "HISTORY_TYPE", default_value = "redis")]
    pub history_type: String,

    /// Conversation history store host endpoint (e.g., redis://127.0.0.1:6379)
    #[arg(long, env = "HISTORY_HOST", default_value = "redis://127.0.0.1:6379")]
    pub history_host: String,

    /// Prefix for Redis history keys.
    #[arg(long, env = "HISTORY_REDIS_PREFIX", default_value = "autopost:")]
    pub history_redis_prefix: String,

    /// Number of most recent conversation messages sent along with each post request.
    #[arg(long, env = "HISTORY_LIMIT", default_value = "20")]
    pub history_limit: usize,

    // --- Chat LLM Provider Args ---
    /// Type of LLM provider for drafting posts (openai, ollama)
    #[arg(long, env = "CHAT_LLM_TYPE", default_value = "openai")]
    pub chat_llm_type: String,

    /// Base URL for the Chat LLM provider API (e.g., https://api.openai.com)
    #[arg(long, env = "CHAT_BASE_URL")] // No default, let adapters handle defaults if None
    pub chat_base_url: Option<String>,

    /// API Key for the Chat LLM provider
    #[arg(long, env = "OPENAI_API_KEY", default_value = "")]
    pub chat_api_key: String,

    /// Model name for chat completion (e.g., gpt-4o, llama3)
    #[arg(long, env = "CHAT_MODEL")] // No default, rely on adapter defaults if None
    pub chat_model: Option<String>,

    // --- Image Provider Args ---
    /// Base URL for the image generation API. Defaults to the OpenAI API.
    #[arg(long, env = "IMAGE_BASE_URL")]
    pub image_base_url: Option<String>,

    /// API Key for the image generation API. Defaults to the chat API key if not set.
    #[arg(long, env = "IMAGE_API_KEY")]
    pub image_api_key: Option<String>,

    /// Image model name.
    #[arg(long, env = "IMAGE_MODEL", default_value = "dall-e-3")]
    pub image_model: String,

    /// Image quality requested from the image model.
    #[arg(long, env = "IMAGE_QUALITY", default_value = "hd")]
    pub image_quality: String,

    /// Image size requested from the image model.
    #[arg(long, env = "IMAGE_SIZE", default_value = "1024x1024")]
    pub image_size: String,

    /// Image style requested from the image model.
    #[arg(long, env = "IMAGE_STYLE", default_value = "vivid")]
    pub image_style: String,

    // --- Image Cache Args ---
    /// Image cache type (redis, memory)
    #[arg(long, env = "CACHE_TYPE", default_value = "redis")]
    pub cache_type: String,

    /// Redis URL for the image cache.
    #[arg(long, env = "CACHE_REDIS_URL", default_value = "redis://127.0.0.1:6379")]
    pub cache_redis_url: String,

    /// Prefix for Redis image cache keys.
    #[arg(long, env = "CACHE_REDIS_PREFIX", default_value = "autopost:dalle:")]
    pub cache_redis_prefix: String,

    // --- CMS Args ---
    /// Base URI of the WordPress REST API (e.g., https://blog.example.com/wp-json/wp/v2)
    #[arg(long, env = "BLOGGER_URI", default_value = "http://localhost/wp-json/wp/v2")]
    pub blogger_uri: String,

    // --- Pipeline Args ---
    /// Image titles containing this marker become the featured media.
    #[arg(long, env = "COVER_MARKER", default_value = "Capa")]
    pub cover_marker: String,

    /// Maximum number of images rendered per post. Placeholders beyond it are removed.
    #[arg(long, env = "MAX_IMAGES", default_value = "6")]
    pub max_images: usize,

    /// Hours added to the publish time to produce `date_gmt`.
    #[arg(long, env = "SITE_UTC_OFFSET_HOURS", default_value = "3")]
    pub site_utc_offset_hours: i64,

    /// Seed for the featured media pick when no image is marked as cover.
    #[arg(long, env = "FEATURED_MEDIA_SEED")]
    pub featured_media_seed: Option<u64>,

    /// Path to the prompt configuration file. The built-in prompt is used if it does not exist.
    #[arg(long, env = "PROMPTS_PATH", default_value = "json/prompts.json")]
    pub prompts_path: String,

    /// Reuse the most recently recorded model response instead of calling the model.
    #[arg(long, env = "REPLAY_LAST_RESPONSE", default_value = "false")]
    pub replay_last_response: bool,

    // --- General App Args ---
    /// Run the pipeline once for this category, print the response and exit.
    #[arg(long, env = "CATEGORY_ID")]
    pub category_id: Option<u64>,

    /// Enable debug logging/output
    #[arg(long, env = "DEBUG", default_value = "false")]
    pub debug: bool,

    /// Host address and port for the HTTP server to listen on.
    #[arg(long, env = "SERVER_ADDR", default_value = "127.0.0.1:4000")]
    pub server_addr: String,

    /// Optional API Key required in the `x-api-key` header of HTTP requests.
    #[arg(long, env = "SERVER_API_KEY")]
    pub server_api_key: Option<String>,

    /// Optional path to the TLS certificate file (PEM format) for enabling HTTPS. Requires --tls-key.
    #[arg(long, env = "TLS_CERT_PATH")]
    pub tls_cert_path: Option<String>,

    /// Optional path to the TLS private key file (PEM format) for enabling HTTPS. Requires --tls-cert.
    #[arg(long, env = "TLS_KEY_PATH")]
    pub tls_key_path: Option<String>,

    #[arg(long, env = "ENABLE_TLS", default_value = "false")]
    pub enable_tls: bool,
}

impl Args {
    pub fn image_api_key(&self) -> String {
        match &self.image_api_key {
            Some(key) if !key.is_empty() => key.clone(),
            _ => self.chat_api_key.clone(),
        }
    }
}
