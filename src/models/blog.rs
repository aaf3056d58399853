//! Blog post model

use serde::{Deserialize, Serialize};

use super::image::{normalize_images, ImageRef, ImageSource};

fn default_author() -> String {
    "Admin".to_string()
}

/// Blog post as stored by the backend
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct BlogPost {
    #[serde(rename = "_id", default, skip_serializing_if = "String::is_empty")]
    pub id: String,
    #[serde(default)]
    pub title: String,
    /// Plain text with `##` / `###` heading lines
    #[serde(default)]
    pub content: String,
    #[serde(default = "default_author")]
    pub author: String,
    #[serde(default, skip_serializing_if = "ImageSource::is_none")]
    pub images: ImageSource,
    /// Cover image kept for older readers
    #[serde(default, skip_serializing_if = "ImageSource::is_none")]
    pub featured_image: ImageSource,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub created_at: Option<String>,
}

impl Default for BlogPost {
    fn default() -> Self {
        Self {
            id: String::new(),
            title: String::new(),
            content: String::new(),
            author: default_author(),
            images: ImageSource::None,
            featured_image: ImageSource::None,
            created_at: None,
        }
    }
}

impl BlogPost {
    /// `images` when non-empty, otherwise the featured image
    pub fn image_source(&self) -> &ImageSource {
        if self.images.is_empty() {
            &self.featured_image
        } else {
            &self.images
        }
    }

    pub fn image_urls(&self) -> Vec<String> {
        normalize_images(self.image_source())
    }
}

/// Input for creating a blog post
#[derive(Debug, Clone, Serialize)]
pub struct CreateBlogInput {
    pub title: String,
    pub content: String,
    pub author: String,
    pub images: Vec<ImageRef>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub featured_image: Option<String>,
}

impl CreateBlogInput {
    pub fn new(title: String, content: String, author: String, images: Vec<ImageRef>) -> Self {
        let featured_image = images.iter().find_map(ImageRef::resolve).map(str::to_string);
        let author = if author.trim().is_empty() {
            default_author()
        } else {
            author
        };
        Self {
            title,
            content,
            author,
            images,
            featured_image,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_images_preferred_over_featured() {
        let post: BlogPost = serde_json::from_value(json!({
            "_id": "1", "title": "t",
            "images": [{"secure_url": "https://x/a.jpg"}],
            "featured_image": "https://x/f.jpg"
        }))
        .unwrap();
        assert_eq!(post.image_urls(), vec!["https://x/a.jpg"]);
        assert_eq!(post.author, "Admin");
    }

    #[test]
    fn test_featured_used_when_images_empty() {
        let post: BlogPost = serde_json::from_value(json!({
            "images": [], "featured_image": "https://x/f.jpg"
        }))
        .unwrap();
        assert_eq!(post.image_urls(), vec!["https://x/f.jpg"]);

        let bare: BlogPost = serde_json::from_value(json!({"title": "no pictures"})).unwrap();
        assert!(bare.image_urls().is_empty());
    }

    #[test]
    fn test_create_input_sets_featured_image_and_author() {
        let input = CreateBlogInput::new(
            "Title".to_string(),
            "Body".to_string(),
            "  ".to_string(),
            vec![ImageRef::uploaded("https://cdn/one.jpg", "p1"), ImageRef::from("https://cdn/two.jpg")],
        );
        assert_eq!(input.featured_image.as_deref(), Some("https://cdn/one.jpg"));
        assert_eq!(input.author, "Admin");
    }
}
