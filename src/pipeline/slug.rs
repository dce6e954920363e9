use log::{ info, warn };
use std::error::Error;
use crate::cms::Cms;

fn transliterate(c: char) -> char {
    match c {
        'á' | 'à' | 'â' | 'ã' | 'ä' | 'å' => 'a',
        'é' | 'è' | 'ê' | 'ë' => 'e',
        'í' | 'ì' | 'î' | 'ï' => 'i',
        'ó' | 'ò' | 'ô' | 'õ' | 'ö' => 'o',
        'ú' | 'ù' | 'û' | 'ü' => 'u',
        'ç' => 'c',
        'ñ' => 'n',
        other => other,
    }
}

/// URL-safe identifier for a title: lowercase ASCII letters, digits and single hyphens.
pub fn canonicalize(title: &str) -> String {
    let mut slug = String::with_capacity(title.len());
    for c in title.trim().to_lowercase().chars() {
        let c = if c.is_whitespace() { '-' } else { transliterate(c) };
        match c {
            '-' if slug.is_empty() || slug.ends_with('-') => {}
            'a'..='z' | '0'..='9' | '-' => slug.push(c),
            _ => {}
        }
    }
    while slug.ends_with('-') {
        slug.pop();
    }
    slug
}

/// Whether a post with `slug` is already published.
pub async fn exists(cms: &dyn Cms, slug: &str) -> Result<bool, Box<dyn Error + Send + Sync>> {
    let found = !cms.posts_by_slug(slug).await?.is_empty();
    if found {
        warn!("WP: post '{}' already exists", slug);
    } else {
        info!("WP: post '{}' is new", slug);
    }
    Ok(found)
}
