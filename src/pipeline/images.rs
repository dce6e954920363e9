use log::{ info, warn, error };
use rand::seq::SliceRandom;
use rand::Rng;
use std::error::Error;
use std::sync::Arc;
use crate::cache::ImageCache;
use crate::cms::MediaUploader;
use crate::llm::image::ImageGenerator;
use crate::models::post::{ CachedImage, ImageDirective, MediaRecord, PostDraft };

pub const DEFAULT_MAX_IMAGES: usize = 6;
pub const DEFAULT_COVER_MARKER: &str = "Capa";

const MEDIUM_CLASS: &str = "class=\"attachment-medium size-medium\"";
const MEDIUM_CENTERED_CLASS: &str = "class=\"attachment-medium size-medium aligncenter\"";

/// What happened to one image directive.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum DirectiveOutcome {
    /// The embed replaced the placeholder. `cached` is set when no render or upload was needed.
    Embedded {
        media_id: u64,
        cached: bool,
    },
    /// Past the image cap; the placeholder was removed.
    Dropped,
    /// The image could not be rendered; the placeholder was removed.
    RenderFailed(String),
    /// The image rendered but could not be uploaded; the placeholder is left in place.
    UploadFailed(String),
}

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ImageReport {
    pub outcomes: Vec<(String, DirectiveOutcome)>,
    pub media_ids: Vec<u64>,
}

impl ImageReport {
    pub fn failures(&self) -> usize {
        self.outcomes
            .iter()
            .filter(|(_, outcome)| {
                matches!(outcome, DirectiveOutcome::RenderFailed(_) | DirectiveOutcome::UploadFailed(_))
            })
            .count()
    }
}

/// Replaces the first `<img title="..." />` placeholder for `title`, in both quoting styles.
pub fn replace_placeholder(content: &str, title: &str, replacement: &str) -> String {
    content
        .replacen(&format!("<img title=\"{}\" />", title), replacement, 1)
        .replacen(&format!("<img title='{}' />", title), replacement, 1)
}

pub fn center_embed(rendered: &str) -> String {
    rendered.replacen(MEDIUM_CLASS, MEDIUM_CENTERED_CLASS, 1)
}

pub struct ImagePipeline {
    generator: Arc<dyn ImageGenerator>,
    uploader: Arc<dyn MediaUploader>,
    cache: Arc<dyn ImageCache>,
    cover_marker: String,
    max_images: usize,
}

impl ImagePipeline {
    pub fn new(
        generator: Arc<dyn ImageGenerator>,
        uploader: Arc<dyn MediaUploader>,
        cache: Arc<dyn ImageCache>
    ) -> Self {
        Self {
            generator,
            uploader,
            cache,
            cover_marker: DEFAULT_COVER_MARKER.to_string(),
            max_images: DEFAULT_MAX_IMAGES,
        }
    }

    pub fn with_cover_marker(mut self, marker: impl Into<String>) -> Self {
        self.cover_marker = marker.into();
        self
    }

    pub fn with_max_images(mut self, max_images: usize) -> Self {
        self.max_images = max_images;
        self
    }

    /// Renders, uploads and embeds each directive in order, then picks the featured media:
    /// the last image whose title carries the cover marker, else a random embedded image.
    pub async fn process<R: Rng + ?Sized>(
        &self,
        mut post: PostDraft,
        directives: &[ImageDirective],
        rng: &mut R
    ) -> (PostDraft, ImageReport) {
        let mut report = ImageReport::default();
        let mut cover = None;
        post.featured_media = None;

        for (index, directive) in directives.iter().enumerate() {
            if index >= self.max_images {
                info!("Image '{}' is past the cap of {}, dropping it", directive.title, self.max_images);
                post.content = replace_placeholder(&post.content, &directive.title, "");
                report.outcomes.push((directive.title.clone(), DirectiveOutcome::Dropped));
                continue;
            }

            let outcome = self.resolve(&mut post, directive).await;
            if let DirectiveOutcome::Embedded { media_id, .. } = outcome {
                report.media_ids.push(media_id);
                if directive.title.contains(&self.cover_marker) {
                    cover = Some(media_id);
                }
            }
            report.outcomes.push((directive.title.clone(), outcome));
        }

        post.featured_media = cover.or_else(|| report.media_ids.choose(rng).copied());
        if report.failures() > 0 {
            warn!("{} of {} images failed for '{}'", report.failures(), directives.len(), post.title);
        }
        (post, report)
    }

    async fn resolve(&self, post: &mut PostDraft, directive: &ImageDirective) -> DirectiveOutcome {
        let cached = match self.cache.get(&post.title, &directive.title).await {
            Ok(entry) => entry,
            Err(e) => {
                warn!("Image cache read failed for '{}': {}", directive.title, e);
                None
            }
        };

        if let Some(CachedImage { media: Some(media), .. }) = &cached {
            info!("Reusing uploaded media {} for '{}'", media.id, directive.title);
            return self.embed(post, directive, media, true);
        }

        let (url, reused) = match cached {
            Some(entry) => {
                info!("Reusing rendered image for '{}'", directive.title);
                (entry.url, true)
            }
            None =>
                match self.render(post, directive).await {
                    Ok(url) => (url, false),
                    Err(outcome) => {
                        return outcome;
                    }
                }
        };

        let (url, media) = match self.upload(post, directive, &url).await {
            Ok(media) => (url, media),
            // Cached URLs can expire: render once more.
            Err(e) if reused => {
                warn!("Upload of cached image '{}' failed, rendering it again: {}", directive.title, e);
                let url = match self.render(post, directive).await {
                    Ok(url) => url,
                    Err(outcome) => {
                        return outcome;
                    }
                };
                match self.upload(post, directive, &url).await {
                    Ok(media) => (url, media),
                    Err(e) => {
                        return Self::upload_failed(directive, e.to_string());
                    }
                }
            }
            Err(e) => {
                return Self::upload_failed(directive, e.to_string());
            }
        };
        self.remember(&post.title, CachedImage {
            title: directive.title.clone(),
            url,
            media: Some(media.clone()),
        }).await;

        self.embed(post, directive, &media, false)
    }

    /// Renders the directive and caches the URL. On failure the placeholder is removed.
    async fn render(
        &self,
        post: &mut PostDraft,
        directive: &ImageDirective
    ) -> Result<String, DirectiveOutcome> {
        match self.generator.generate(&directive.prompt).await {
            Ok(url) => {
                self.remember(&post.title, CachedImage {
                    title: directive.title.clone(),
                    url: url.clone(),
                    media: None,
                }).await;
                Ok(url)
            }
            Err(e) => {
                error!("Rendering '{}' failed, removing its placeholder: {}", directive.title, e);
                post.content = replace_placeholder(&post.content, &directive.title, "");
                Err(DirectiveOutcome::RenderFailed(e.to_string()))
            }
        }
    }

    async fn upload(
        &self,
        post: &PostDraft,
        directive: &ImageDirective,
        url: &str
    ) -> Result<MediaRecord, Box<dyn Error + Send + Sync>> {
        let media_title = format!("{} - {}", post.title, directive.title);
        self.uploader.upload(url, &media_title, post.author_or_default()).await
    }

    fn upload_failed(directive: &ImageDirective, reason: String) -> DirectiveOutcome {
        error!("Uploading '{}' failed, leaving its placeholder: {}", directive.title, reason);
        DirectiveOutcome::UploadFailed(reason)
    }

    fn embed(
        &self,
        post: &mut PostDraft,
        directive: &ImageDirective,
        media: &MediaRecord,
        cached: bool
    ) -> DirectiveOutcome {
        post.content = replace_placeholder(&post.content, &directive.title, &center_embed(&media.rendered));
        DirectiveOutcome::Embedded { media_id: media.id, cached }
    }

    async fn remember(&self, post_title: &str, entry: CachedImage) {
        if let Err(e) = self.cache.put(post_title, &entry).await {
            warn!("Image cache write failed for '{}': {}", entry.title, e);
        }
    }
}
