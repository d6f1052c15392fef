//! Creative media classification: which label a creative gets on its card
//! and which media the detail view should show.

use once_cell::sync::Lazy;
use percent_encoding::percent_decode_str;
use regex::Regex;
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum MediaType {
    Image,
    Video,
    Mixed,
    #[serde(other)]
    Other,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum CreativeMode {
    Static,
    StaticCarousel,
    DynamicAssetFeed,
    DynamicCatalog,
    #[serde(other)]
    Other,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Creative {
    #[serde(default)]
    pub id: Option<String>,
    #[serde(default)]
    pub name: Option<String>,
    #[serde(default)]
    pub media_type: Option<MediaType>,
    #[serde(default)]
    pub creative_mode: Option<CreativeMode>,
    #[serde(default)]
    pub thumbnail_url: Option<String>,
    #[serde(default)]
    pub image_urls: Vec<String>,
    #[serde(default)]
    pub video_urls: Vec<String>,
    /// Platform-rendered preview snippets (HTML-escaped `<iframe>` markup).
    #[serde(default)]
    pub preview_iframe: Vec<String>,
    #[serde(default, alias = "primary_text")]
    pub primary_text: Option<String>,
    #[serde(default)]
    pub headline: Option<String>,
}

/// What the detail view should render for a creative.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "lowercase")]
pub enum ModalMedia {
    Image {
        urls: Vec<String>,
    },
    Video {
        urls: Vec<String>,
    },
    Iframe {
        html: String,
        src: Option<String>,
        width: Option<String>,
        height: Option<String>,
    },
    None,
}

pub fn media_type_label(creative: Option<&Creative>) -> &'static str {
    match creative.and_then(|c| c.media_type) {
        None => "No Creative",
        Some(MediaType::Image) => "Image",
        Some(MediaType::Video) => "Video",
        Some(MediaType::Mixed) => "Mixed",
        Some(MediaType::Other) => "Other",
    }
}

/// Card thumbnail: first image URL, else the thumbnail.
pub fn card_image_url(creative: Option<&Creative>) -> Option<&str> {
    let creative = creative?;
    creative
        .image_urls
        .first()
        .or(creative.thumbnail_url.as_ref())
        .map(String::as_str)
}

pub fn modal_media(creative: Option<&Creative>) -> ModalMedia {
    let Some(creative) = creative else {
        return ModalMedia::None;
    };

    match creative.media_type {
        Some(MediaType::Image) => {
            if !creative.image_urls.is_empty() {
                return ModalMedia::Image {
                    urls: creative.image_urls.clone(),
                };
            }
            return preview_iframe(creative).unwrap_or(ModalMedia::None);
        }
        Some(MediaType::Video) => {
            if !creative.video_urls.is_empty() {
                return ModalMedia::Video {
                    urls: creative.video_urls.clone(),
                };
            }
            return preview_iframe(creative).unwrap_or(ModalMedia::None);
        }
        Some(MediaType::Mixed) => {
            // Images win when both are present.
            if !creative.image_urls.is_empty() {
                return ModalMedia::Image {
                    urls: creative.image_urls.clone(),
                };
            }
            if !creative.video_urls.is_empty() {
                return ModalMedia::Video {
                    urls: creative.video_urls.clone(),
                };
            }
        }
        _ => {}
    }

    if let Some(iframe) = preview_iframe(creative) {
        return iframe;
    }
    match &creative.thumbnail_url {
        Some(url) => ModalMedia::Image {
            urls: vec![url.clone()],
        },
        None => ModalMedia::None,
    }
}

// Attribute patterns for platform preview markup. Names must start the
// attribute, so `data-src=` does not count as `src=`.
static SRC_ATTR: Lazy<Regex> =
    Lazy::new(|| Regex::new(r#"(?:^|[\s<])src=["']([^"']+)["']"#).expect("valid regex"));
static WIDTH_ATTR: Lazy<Regex> =
    Lazy::new(|| Regex::new(r#"(?:^|[\s<])width=["']?(\d+)"#).expect("valid regex"));
static HEIGHT_ATTR: Lazy<Regex> =
    Lazy::new(|| Regex::new(r#"(?:^|[\s<])height=["']?(\d+)"#).expect("valid regex"));

fn preview_iframe(creative: &Creative) -> Option<ModalMedia> {
    let html = creative.preview_iframe.first()?;
    let decoded = html_escape::decode_html_entities(html).into_owned();
    Some(ModalMedia::Iframe {
        src: capture(&SRC_ATTR, &decoded).and_then(decode_src),
        width: capture(&WIDTH_ATTR, &decoded).map(str::to_string),
        height: capture(&HEIGHT_ATTR, &decoded).map(str::to_string),
        html: decoded,
    })
}

fn capture<'a>(pattern: &Regex, html: &'a str) -> Option<&'a str> {
    pattern
        .captures(html)
        .and_then(|caps| caps.get(1))
        .map(|m| m.as_str())
}

/// Percent-decode the iframe URL. A src that does not decode to UTF-8 is
/// dropped.
fn decode_src(src: &str) -> Option<String> {
    match percent_decode_str(src).decode_utf8() {
        Ok(decoded) => Some(decoded.into_owned()),
        Err(e) => {
            tracing::debug!(error = %e, "Preview iframe src is not valid UTF-8");
            None
        }
    }
}
