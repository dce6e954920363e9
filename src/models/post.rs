use serde::{ Deserialize, Deserializer, Serialize };
use serde_json::{ Map, Value };

/// Post fields as drafted by the model. Fields the pipeline does not know about are
/// kept in `extra` and passed through to the CMS.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct PostDraft {
    pub title: String,
    pub content: String,
    #[serde(default)]
    pub tags: Vec<String>,
    #[serde(default, deserialize_with = "de_opt_id")]
    pub author: Option<u64>,
    #[serde(default, deserialize_with = "de_opt_id", skip_serializing_if = "Option::is_none")]
    pub featured_media: Option<u64>,
    #[serde(flatten)]
    pub extra: Map<String, Value>,
}

pub const DEFAULT_AUTHOR_ID: u64 = 1;

impl PostDraft {
    pub fn author_or_default(&self) -> u64 {
        self.author.unwrap_or(DEFAULT_AUTHOR_ID)
    }
}

/// The finalized post body sent to the CMS.
#[derive(Clone, Debug, PartialEq, Serialize)]
pub struct PostPayload {
    pub title: String,
    pub content: String,
    pub tags: Vec<u64>,
    pub author: u64,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub featured_media: Option<u64>,
    pub date: String,
    pub date_gmt: String,
    #[serde(flatten)]
    pub extra: Map<String, Value>,
}

#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct ImageDirective {
    pub title: String,
    pub prompt: String,
}

#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct MediaRecord {
    pub id: u64,
    pub rendered: String,
}

/// Memoized render (and upload, once it happened) for one image of one post.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct CachedImage {
    pub title: String,
    pub url: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub media: Option<MediaRecord>,
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum TagOutcome {
    Created(u64),
    Exists(u64),
}

impl TagOutcome {
    pub fn id(&self) -> u64 {
        match self {
            TagOutcome::Created(id) | TagOutcome::Exists(id) => *id,
        }
    }
}

#[derive(Clone, Debug, PartialEq, Eq)]
pub struct PublishedPost {
    pub id: Option<u64>,
    pub slug: String,
}

// Models write ids as numbers, numeric strings, null or 0 ("none" in WordPress terms).
fn de_opt_id<'de, D>(deserializer: D) -> Result<Option<u64>, D::Error> where D: Deserializer<'de> {
    let value = Option::<Value>::deserialize(deserializer)?;
    let id = match value {
        None | Some(Value::Null) => None,
        Some(Value::Number(n)) =>
            Some(n.as_u64().ok_or_else(|| serde::de::Error::custom(format!("invalid id {}", n)))?),
        Some(Value::String(s)) if s.trim().is_empty() => None,
        Some(Value::String(s)) =>
            Some(
                s
                    .trim()
                    .parse::<u64>()
                    .map_err(|_| serde::de::Error::custom(format!("invalid id '{}'", s)))?
            ),
        Some(other) => {
            return Err(serde::de::Error::custom(format!("invalid id {}", other)));
        }
    };
    Ok(id.filter(|id| *id != 0))
}
