use async_trait::async_trait;
use log::{ info, error };
use reqwest::{ Client as HttpClient, header::{ HeaderMap, HeaderValue, CONTENT_TYPE, AUTHORIZATION } };
use serde::{ Deserialize, Serialize };
use std::error::Error as StdError;

use super::ImageGenerator;
use crate::llm::chat::openai::DEFAULT_OPENAI_BASE_URL;

#[derive(Debug, Clone)]
pub struct ImageOptions {
    pub model: String,
    pub quality: String,
    pub size: String,
    pub style: String,
}

impl Default for ImageOptions {
    fn default() -> Self {
        Self {
            model: "dall-e-3".to_string(),
            quality: "hd".to_string(),
            size: "1024x1024".to_string(),
            style: "vivid".to_string(),
        }
    }
}

pub struct OpenAIImageClient {
    http: HttpClient,
    base_url: String,
    options: ImageOptions,
}

#[derive(Serialize)]
struct ImageRequest<'a> {
    model: &'a str,
    prompt: &'a str,
    n: u32,
    quality: &'a str,
    response_format: &'a str,
    size: &'a str,
    style: &'a str,
}

#[derive(Deserialize)]
struct ImageResponse {
    data: Vec<ImageData>,
}

#[derive(Deserialize)]
struct ImageData {
    url: Option<String>,
}

impl OpenAIImageClient {
    pub fn new(
        api_key: &str,
        base_url: Option<String>,
        options: ImageOptions
    ) -> Result<Self, Box<dyn StdError + Send + Sync>> {
        if api_key.is_empty() {
            return Err("OpenAI API key is required for image generation".into());
        }
        let mut headers = HeaderMap::new();
        headers.insert(CONTENT_TYPE, HeaderValue::from_static("application/json"));
        headers.insert(
            AUTHORIZATION,
            HeaderValue::from_str(&format!("Bearer {}", api_key))
                .map_err(|e| format!("Invalid API key format: {}", e))?
        );
        let http = HttpClient::builder().default_headers(headers).build()?;

        Ok(Self {
            http,
            base_url: base_url.unwrap_or_else(|| DEFAULT_OPENAI_BASE_URL.to_string()),
            options,
        })
    }

    fn build_request<'a>(&'a self, prompt: &'a str) -> ImageRequest<'a> {
        ImageRequest {
            model: &self.options.model,
            prompt,
            n: 1,
            quality: &self.options.quality,
            response_format: "url",
            size: &self.options.size,
            style: &self.options.style,
        }
    }

    async fn request_image(
        &self,
        url: &str,
        prompt: &str
    ) -> Result<String, Box<dyn StdError + Send + Sync>> {
        let resp = self.http
            .post(url)
            .json(&self.build_request(prompt))
            .send().await?
            .error_for_status()?
            .json::<ImageResponse>().await?;
        first_url(resp)
    }
}

fn first_url(resp: ImageResponse) -> Result<String, Box<dyn StdError + Send + Sync>> {
    resp.data
        .into_iter()
        .find_map(|d| d.url)
        .ok_or_else(|| "Image response contained no URL".into())
}

#[async_trait]
impl ImageGenerator for OpenAIImageClient {
    async fn generate(&self, prompt: &str) -> Result<String, Box<dyn StdError + Send + Sync>> {
        let url = format!("{}/v1/images/generations", self.base_url.trim_end_matches('/'));
        info!("Image: generating with {}", self.options.model);

        let result = self.request_image(&url, prompt).await;
        match &result {
            Ok(_) => info!("Image: generated"),
            Err(e) => error!("Image: generation failed for prompt '{}': {}", prompt, e),
        }
        result
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn request_uses_configured_options() {
        let client = OpenAIImageClient::new("sk-test", None, ImageOptions::default()).unwrap();
        let value = serde_json::to_value(client.build_request("a cat")).unwrap();
        assert_eq!(
            value,
            json!({
                "model": "dall-e-3",
                "prompt": "a cat",
                "n": 1,
                "quality": "hd",
                "response_format": "url",
                "size": "1024x1024",
                "style": "vivid"
            })
        );
    }

    #[test]
    fn missing_url_is_an_error() {
        let resp: ImageResponse = serde_json
            ::from_value(json!({ "data": [{ "b64_json": "AAAA" }] }))
            .unwrap();
        assert!(first_url(resp).is_err());
    }

    #[test]
    fn empty_key_is_rejected() {
        assert!(OpenAIImageClient::new("", None, ImageOptions::default()).is_err());
    }
}
