use async_trait::async_trait;
use base64::{ engine::general_purpose::STANDARD as BASE64, Engine as _ };
use log::{ info, error, debug };
use reqwest::{ Client as HttpClient, StatusCode, header::AUTHORIZATION, multipart };
use serde::Deserialize;
use serde_json::Value;
use std::collections::BTreeMap;
use std::error::Error;
use url::Url;

use super::{ Cms, MediaUploader };
use crate::models::post::{ MediaRecord, PostPayload, TagOutcome };
use crate::pipeline::slug::canonicalize;

const CREDENTIAL_ENV_PREFIX: &str = "BLOGGER_USER_";
const READER_ID: u64 = 1;

/// WordPress REST client. Each CMS user id maps to a `user:application-password`
/// secret; writes authenticate as the owner of the resource being created.
pub struct WordPressClient {
    http: HttpClient,
    base_uri: String,
    credentials: BTreeMap<u64, String>,
}

#[derive(Deserialize)]
struct MediaResponse {
    id: u64,
    description: Rendered,
}

#[derive(Deserialize)]
struct Rendered {
    rendered: String,
}

impl WordPressClient {
    pub fn new(base_uri: &str, credentials: BTreeMap<u64, String>) -> Self {
        Self {
            http: HttpClient::new(),
            base_uri: base_uri.trim_end_matches('/').to_string(),
            credentials,
        }
    }

    /// Reads every `BLOGGER_USER_<id>` variable from the environment.
    pub fn from_env(base_uri: &str) -> Self {
        let credentials = credentials_from_vars(std::env::vars());
        info!("WP: {} user credential(s) configured for {}", credentials.len(), base_uri);
        Self::new(base_uri, credentials)
    }

    fn endpoint(&self, route: &str) -> String {
        format!("{}/{}", self.base_uri, route)
    }

    fn auth_header(&self, user_id: u64) -> Result<String, Box<dyn Error + Send + Sync>> {
        let secret = self.credentials
            .get(&user_id)
            .ok_or_else(|| format!("No CMS credentials for user {}", user_id))?;
        Ok(format!("Basic {}", BASE64.encode(secret)))
    }

    fn reader_auth_header(&self) -> Result<String, Box<dyn Error + Send + Sync>> {
        let reader = if self.credentials.contains_key(&READER_ID) {
            READER_ID
        } else {
            *self.credentials
                .keys()
                .next()
                .ok_or_else(|| "No CMS credentials configured".to_string())?
        };
        self.auth_header(reader)
    }

    /// Downloads the rendered image and re-uploads it as a multipart media item.
    async fn send_media(
        &self,
        url: &str,
        title: &str,
        owner_id: u64
    ) -> Result<MediaRecord, Box<dyn Error + Send + Sync>> {
        let image = self.http.get(url).send().await?.error_for_status()?.bytes().await?;
        let file = multipart::Part
            ::bytes(image.to_vec())
            .file_name(format!("{}.png", canonicalize(title)))
            .mime_str("image/png")?;
        let form = multipart::Form
            ::new()
            .part("file", file)
            .text("title", title.to_string())
            .text("userId", owner_id.to_string());

        let media = self.http
            .post(self.endpoint("media"))
            .header(AUTHORIZATION, self.auth_header(owner_id)?)
            .multipart(form)
            .send().await?
            .error_for_status()?
            .json::<MediaResponse>().await?;
        Ok(MediaRecord { id: media.id, rendered: media.description.rendered })
    }
}

pub fn credentials_from_vars<I>(vars: I) -> BTreeMap<u64, String>
    where I: IntoIterator<Item = (String, String)>
{
    vars.into_iter()
        .filter_map(|(key, value)| {
            let id = key.strip_prefix(CREDENTIAL_ENV_PREFIX)?.parse::<u64>().ok()?;
            if value.is_empty() { None } else { Some((id, value)) }
        })
        .collect()
}

/// 201 carries the new tag; 400 `term_exists` carries the id of the tag that already has this name.
pub fn parse_tag_response(
    status: StatusCode,
    body: &Value
) -> Result<TagOutcome, Box<dyn Error + Send + Sync>> {
    match status {
        StatusCode::CREATED =>
            body["id"]
                .as_u64()
                .map(TagOutcome::Created)
                .ok_or_else(|| "Tag response has no id".into()),
        StatusCode::BAD_REQUEST =>
            body["data"]["term_id"]
                .as_u64()
                .map(TagOutcome::Exists)
                .ok_or_else(|| format!("Tag creation rejected: {}", body).into()),
        other => Err(format!("Unexpected tag response {}: {}", other, body).into()),
    }
}

#[async_trait]
impl Cms for WordPressClient {
    async fn posts_by_slug(&self, slug: &str) -> Result<Vec<Value>, Box<dyn Error + Send + Sync>> {
        info!("WP: checking if post '{}' exists", slug);
        let url = Url::parse_with_params(&self.endpoint("posts"), &[("slug", slug)])?;
        let posts = self.http
            .get(url)
            .header(AUTHORIZATION, self.reader_auth_header()?)
            .send().await?
            .error_for_status()?
            .json::<Vec<Value>>().await?;
        Ok(posts)
    }

    async fn create_tag(
        &self,
        name: &str,
        slug: &str,
        owner_id: u64
    ) -> Result<TagOutcome, Box<dyn Error + Send + Sync>> {
        debug!("WP: creating tag '{}'", name);
        let resp = self.http
            .post(self.endpoint("tags"))
            .header(AUTHORIZATION, self.auth_header(owner_id)?)
            .json(&serde_json::json!({ "name": name, "slug": slug }))
            .send().await?;
        let status = resp.status();
        let body = resp.json::<Value>().await?;
        parse_tag_response(status, &body)
    }

    async fn create_post(
        &self,
        post: &PostPayload
    ) -> Result<Option<u64>, Box<dyn Error + Send + Sync>> {
        info!("WP: creating post '{}'", post.title);
        let body = self.http
            .post(self.endpoint("posts"))
            .header(AUTHORIZATION, self.auth_header(post.author)?)
            .json(post)
            .send().await?
            .error_for_status()?
            .json::<Value>().await?;
        info!("WP: post created");
        Ok(body["id"].as_u64())
    }
}

#[async_trait]
impl MediaUploader for WordPressClient {
    async fn upload(
        &self,
        url: &str,
        title: &str,
        owner_id: u64
    ) -> Result<MediaRecord, Box<dyn Error + Send + Sync>> {
        info!("WP: creating media '{}'", title);
        let result = self.send_media(url, title, owner_id).await;
        match &result {
            Ok(media) => info!("WP: media {} created", media.id),
            Err(e) => error!("WP: error creating media '{}': {}", title, e),
        }
        result
    }
}
