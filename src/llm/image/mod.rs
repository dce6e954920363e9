pub mod openai;

use async_trait::async_trait;
use std::error::Error as StdError;

pub use self::openai::{ OpenAIImageClient, ImageOptions };

#[async_trait]
pub trait ImageGenerator: Send + Sync {
    /// Renders one image for `prompt` and returns a URL it can be downloaded from.
    async fn generate(&self, prompt: &str) -> Result<String, Box<dyn StdError + Send + Sync>>;
}
