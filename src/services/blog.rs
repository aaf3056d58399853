//! Blog presentation
//!
//! Dates, content blocks and excerpts for the blog pages, plus the date
//! format used on the admin enquiry table.

use chrono::{DateTime, FixedOffset, NaiveDateTime, Offset, Utc};
use serde::Serialize;

use crate::models::{id_timestamp, BlogPost};
use crate::services::carousel::GalleryView;

/// Shown when a post carries no usable date
pub const RECENT: &str = "Recent";

const EXCERPT_CHARS: usize = 150;
const UNTITLED: &str = "Untitled Blog";

/// Site time zone from an offset in minutes east of UTC
pub fn site_offset(minutes: i32) -> FixedOffset {
    FixedOffset::east_opt(minutes.saturating_mul(60)).unwrap_or_else(|| Utc.fix())
}

/// `2023-11-15T03:43:00Z`, `2023-11-15T03:43:00+05:30` or a naive timestamp
/// taken as UTC
pub fn parse_timestamp(value: &str) -> Option<DateTime<Utc>> {
    let value = value.trim();
    if let Ok(dt) = DateTime::parse_from_rfc3339(value) {
        return Some(dt.with_timezone(&Utc));
    }
    ["%Y-%m-%dT%H:%M:%S%.f", "%Y-%m-%d %H:%M:%S%.f"]
        .iter()
        .find_map(|fmt| NaiveDateTime::parse_from_str(value, fmt).ok())
        .map(|naive| naive.and_utc())
}

/// When a record was created: the explicit timestamp if there is one,
/// otherwise the time embedded in its identifier
pub fn created_instant(created_at: Option<&str>, id: &str) -> Option<DateTime<Utc>> {
    match created_at.filter(|s| !s.trim().is_empty()) {
        Some(value) => parse_timestamp(value),
        None => id_timestamp(id),
    }
}

/// Long date shown on blog pages, e.g. `17 October 2012`
pub fn display_date(post: &BlogPost, offset: FixedOffset) -> String {
    created_instant(post.created_at.as_deref(), &post.id)
        .map(|dt| dt.with_timezone(&offset).format("%-d %B %Y").to_string())
        .unwrap_or_else(|| RECENT.to_string())
}

/// Admin table date, e.g. `15 Nov 2023 • 03:43 AM`, or `N/A`
pub fn enquiry_date(created_at: Option<&str>, id: &str, offset: FixedOffset) -> String {
    created_instant(created_at, id)
        .map(|dt| dt.with_timezone(&offset).format("%d %b %Y • %I:%M %p").to_string())
        .unwrap_or_else(|| "N/A".to_string())
}

/// One line of post content
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "kind", content = "text", rename_all = "lowercase")]
pub enum ContentBlock {
    H2(String),
    H3(String),
    Text(String),
}

/// Split content into heading and text lines
pub fn content_blocks(content: &str) -> Vec<ContentBlock> {
    content
        .lines()
        .map(|line| {
            if let Some(rest) = line.strip_prefix("### ") {
                ContentBlock::H3(rest.to_string())
            } else if let Some(rest) = line.strip_prefix("## ") {
                ContentBlock::H2(rest.to_string())
            } else {
                ContentBlock::Text(line.to_string())
            }
        })
        .collect()
}

/// Plain-text preview of at most 150 characters
pub fn excerpt(content: &str) -> String {
    let plain = content
        .lines()
        .map(|line| {
            line.strip_prefix("### ")
                .or_else(|| line.strip_prefix("## "))
                .unwrap_or(line)
                .trim()
        })
        .filter(|line| !line.is_empty())
        .collect::<Vec<_>>()
        .join(" ");

    if plain.chars().count() <= EXCERPT_CHARS {
        plain
    } else {
        let cut: String = plain.chars().take(EXCERPT_CHARS).collect();
        format!("{}...", cut.trim_end())
    }
}

/// Blog card on the listing and related-posts sections
#[derive(Debug, Clone, Serialize)]
pub struct BlogCard {
    pub id: String,
    pub title: String,
    pub author: String,
    pub date: String,
    pub excerpt: String,
    pub gallery: GalleryView,
}

impl BlogCard {
    pub fn new(post: &BlogPost, offset: FixedOffset) -> Self {
        Self {
            id: post.id.clone(),
            title: title_or_default(&post.title),
            author: post.author.clone(),
            date: display_date(post, offset),
            excerpt: excerpt(&post.content),
            gallery: GalleryView::new(post.image_urls(), None),
        }
    }
}

/// Full post page
#[derive(Debug, Clone, Serialize)]
pub struct BlogDetail {
    pub id: String,
    pub title: String,
    pub author: String,
    pub date: String,
    pub blocks: Vec<ContentBlock>,
    pub gallery: GalleryView,
    /// Images after the cover, listed under "Image Gallery"
    pub extra_images: Vec<String>,
    pub related: Vec<BlogCard>,
}

impl BlogDetail {
    pub fn new(
        post: &BlogPost,
        related: &[BlogPost],
        image: Option<usize>,
        offset: FixedOffset,
    ) -> Self {
        let images = post.image_urls();
        let extra_images = images.iter().skip(1).cloned().collect();
        Self {
            id: post.id.clone(),
            title: title_or_default(&post.title),
            author: post.author.clone(),
            date: display_date(post, offset),
            blocks: content_blocks(&post.content),
            gallery: GalleryView::new(images, image),
            extra_images,
            related: related.iter().map(|p| BlogCard::new(p, offset)).collect(),
        }
    }
}

fn title_or_default(title: &str) -> String {
    if title.trim().is_empty() {
        UNTITLED.to_string()
    } else {
        title.to_string()
    }
}
