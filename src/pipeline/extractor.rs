//! Pulls the post JSON and the image prompt list out of a model reply.
//!
//! The reply is free text with two fenced blocks: a ```` ```json ```` block holding the
//! post object and a ```` ```shell ```` block holding `[{title, prompt}, ...]`. Models
//! reorder the blocks, nest fences inside HTML content, and break long strings across
//! lines, so every candidate span is schema-validated and the first one that parses wins.

use log::{ debug, warn };
use serde::de::DeserializeOwned;
use crate::models::post::{ ImageDirective, PostDraft };

const FENCE: &str = "```";
const JSON_TAGS: &[&str] = &["json"];
const SHELL_TAGS: &[&str] = &["shell", "sh", "bash", "zsh", "console"];

#[derive(Debug, Clone, PartialEq)]
pub struct Extraction {
    pub post: Option<PostDraft>,
    pub directives: Option<Vec<ImageDirective>>,
}

pub fn extract(reply: &str) -> Extraction {
    Extraction {
        post: extract_post(reply),
        directives: extract_directives(reply),
    }
}

pub fn extract_post(reply: &str) -> Option<PostDraft> {
    let fences = fences(reply);
    let candidates = trailing_json_span(reply)
        .into_iter()
        .chain(tagged_spans(reply, &fences, JSON_TAGS));
    let post: Option<PostDraft> = first_parse(candidates, |span| span.to_string());
    if post.is_none() {
        warn!("Extractor: no parseable post JSON block in model reply");
    }
    post
}

pub fn extract_directives(reply: &str) -> Option<Vec<ImageDirective>> {
    let fences = fences(reply);
    let candidates = trailing_shell_span(reply)
        .into_iter()
        .chain(tagged_spans(reply, &fences, SHELL_TAGS))
        .chain(tagged_spans(reply, &fences, JSON_TAGS));
    let directives: Option<Vec<ImageDirective>> = first_parse(candidates, |span| {
        span.replace(['\n', '\r'], "")
    });
    if directives.is_none() {
        warn!("Extractor: no parseable image prompt block in model reply");
    }
    directives
}

fn first_parse<'a, T, I, F>(candidates: I, prepare: F) -> Option<T>
    where T: DeserializeOwned, I: Iterator<Item = &'a str>, F: Fn(&str) -> String
{
    for (i, span) in candidates.enumerate() {
        match serde_json::from_str::<T>(&prepare(span)) {
            Ok(value) => {
                debug!("Extractor: candidate #{} parsed", i);
                return Some(value);
            }
            Err(e) => debug!("Extractor: candidate #{} rejected: {}", i, e),
        }
    }
    None
}

/// A fence marker and the language hint written right after it (empty for closing fences).
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
struct Fence<'a> {
    at: usize,
    hint: &'a str,
}

impl Fence<'_> {
    fn body_start(&self) -> usize {
        self.at + FENCE.len() + self.hint.len()
    }
}

fn fences(text: &str) -> Vec<Fence<'_>> {
    let mut out = Vec::new();
    let mut from = 0;
    while let Some(offset) = text[from..].find(FENCE) {
        let at = from + offset;
        let rest = &text[at + FENCE.len()..];
        let hint_len = rest
            .find(|c: char| !(c.is_ascii_alphanumeric() || c == '-' || c == '_' || c == '+'))
            .unwrap_or(rest.len());
        out.push(Fence { at, hint: &rest[..hint_len] });
        from = at + FENCE.len() + hint_len;
    }
    out
}

/// Every span from a fence tagged with one of `tags` to any later fence, nearest first.
fn tagged_spans<'a>(
    text: &'a str,
    fences: &'a [Fence<'a>],
    tags: &'a [&'a str]
) -> impl Iterator<Item = &'a str> + 'a {
    fences
        .iter()
        .enumerate()
        .filter(move |(_, open)| tags.iter().any(|tag| open.hint.eq_ignore_ascii_case(tag)))
        .flat_map(move |(i, open)| {
            fences[i + 1..].iter().map(move |close| text[open.body_start()..close.at].trim())
        })
}

/// Start of the last `FENCE` that begins at or before `before`, like JS `lastIndexOf`.
fn last_fence_at_or_before(text: &str, before: usize) -> Option<usize> {
    let limit = (before + FENCE.len()).min(text.len());
    text.get(..limit)?.rfind(FENCE)
}

/// The JSON body ends at the fence preceding the second-to-last fence of the reply,
/// which tolerates a shell block following the JSON block.
fn trailing_json_span(text: &str) -> Option<&str> {
    let start = text.find("```json")? + "```json".len();
    let last = text.rfind(FENCE)?;
    let second_to_last = last_fence_at_or_before(text, last.checked_sub(1)?)?;
    let end = last_fence_at_or_before(text, second_to_last.checked_sub(1)?)?;
    if end < start {
        return None;
    }
    Some(text[start..end].trim())
}

/// The shell body runs to the last fence of the reply.
fn trailing_shell_span(text: &str) -> Option<&str> {
    let start = text.find("```shell")? + "```shell".len();
    let end = text.rfind(FENCE)?;
    if end < start {
        return None;
    }
    Some(text[start..end].trim())
}
