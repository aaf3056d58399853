//! Used spare part model

use serde::{Deserialize, Serialize};

use super::image::{first_image_url, normalize_images, ImageRef, ImageSource, PLACEHOLDER_IMAGE};

/// Spare part listing
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Part {
    #[serde(rename = "_id", default, skip_serializing_if = "String::is_empty")]
    pub id: String,
    #[serde(default)]
    pub name: String,
    /// Machines the part fits
    #[serde(default)]
    pub compatibility: String,
    #[serde(default)]
    pub condition: String,
    #[serde(default, skip_serializing_if = "ImageSource::is_none")]
    pub images: ImageSource,
}

impl Part {
    pub fn image_urls(&self) -> Vec<String> {
        normalize_images(&self.images)
    }

    pub fn cover_image(&self) -> String {
        first_image_url(&self.images, PLACEHOLDER_IMAGE)
    }
}

/// Input for creating a part
#[derive(Debug, Clone, Serialize)]
pub struct CreatePartInput {
    pub name: String,
    pub compatibility: String,
    pub condition: String,
    pub images: Vec<ImageRef>,
}
