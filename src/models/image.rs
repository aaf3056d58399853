//! Image references and URL normalization
//!
//! Listings written over the years store images in several shapes: a bare URL,
//! an upload result object (`secure_url` + `public_id`), a staged browser blob
//! (`blobUrl`), a list of any of these, or a legacy single `image` field.
//! [`normalize_images`] flattens all of them into plain URL strings.

use serde::{Deserialize, Serialize};

/// Shown when a listing has no usable image
pub const PLACEHOLDER_IMAGE: &str = "https://via.placeholder.com/800x600?text=No+Image";

/// Small placeholder used in admin tables
pub const PLACEHOLDER_THUMBNAIL: &str = "https://via.placeholder.com/60x40?text=No+Image";

/// Value produced when an object was stringified upstream
const STRINGIFIED_OBJECT: &str = "[object Object]";

/// Structured image reference
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ImageObject {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub url: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub secure_url: Option<String>,
    #[serde(rename = "blobUrl", default, skip_serializing_if = "Option::is_none")]
    pub blob_url: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub public_id: Option<String>,
}

/// A single image reference as stored by the backend
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum ImageRef {
    Url(String),
    Object(ImageObject),
    /// Anything else; kept so records round-trip, dropped by normalization
    Other(serde_json::Value),
}

impl ImageRef {
    /// Upload result returned by the image host
    pub fn uploaded(secure_url: impl Into<String>, public_id: impl Into<String>) -> Self {
        Self::Object(ImageObject {
            secure_url: Some(secure_url.into()),
            public_id: Some(public_id.into()),
            ..ImageObject::default()
        })
    }

    /// The usable URL of this reference, if any
    pub fn resolve(&self) -> Option<&str> {
        let url = match self {
            Self::Url(url) if url != STRINGIFIED_OBJECT => Some(url.as_str()),
            Self::Url(_) => None,
            Self::Object(obj) => [&obj.url, &obj.secure_url, &obj.blob_url]
                .into_iter()
                .flatten()
                .map(String::as_str)
                .find(|url| !url.is_empty()),
            Self::Other(_) => None,
        };
        url.filter(|url| !url.is_empty())
    }

    /// Storage identifier of an uploaded image
    pub fn public_id(&self) -> Option<&str> {
        match self {
            Self::Object(obj) => obj.public_id.as_deref(),
            _ => None,
        }
    }
}

impl From<&str> for ImageRef {
    fn from(url: &str) -> Self {
        Self::Url(url.to_string())
    }
}

impl From<String> for ImageRef {
    fn from(url: String) -> Self {
        Self::Url(url)
    }
}

/// Where an entity keeps its images
///
/// `null` or a missing field is `None`, an array is `List`, anything else is a
/// `Single` reference.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum ImageSource {
    #[default]
    None,
    List(Vec<ImageRef>),
    Single(ImageRef),
}

impl ImageSource {
    pub fn is_none(&self) -> bool {
        matches!(self, Self::None)
    }

    /// True when the source holds no references at all
    pub fn is_empty(&self) -> bool {
        match self {
            Self::None => true,
            Self::List(refs) => refs.is_empty(),
            Self::Single(_) => false,
        }
    }

    /// References in stored order
    pub fn refs(&self) -> &[ImageRef] {
        match self {
            Self::None => &[],
            Self::List(refs) => refs,
            Self::Single(r) => std::slice::from_ref(r),
        }
    }
}

impl From<Vec<ImageRef>> for ImageSource {
    fn from(refs: Vec<ImageRef>) -> Self {
        Self::List(refs)
    }
}

impl From<Vec<String>> for ImageSource {
    fn from(urls: Vec<String>) -> Self {
        Self::List(urls.into_iter().map(ImageRef::Url).collect())
    }
}

/// Resolve any image source to an ordered list of non-empty URLs
pub fn normalize_images(source: &ImageSource) -> Vec<String> {
    source
        .refs()
        .iter()
        .filter_map(ImageRef::resolve)
        .map(str::to_string)
        .collect()
}

/// First usable URL, or `fallback`
pub fn first_image_url(source: &ImageSource, fallback: &str) -> String {
    source
        .refs()
        .iter()
        .find_map(ImageRef::resolve)
        .unwrap_or(fallback)
        .to_string()
}
