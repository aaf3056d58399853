//! Catalog and detail pages
//!
//! Every call is a fresh round trip to the backend. A failed listing degrades
//! to an empty page with a notice; a failed detail fetch reads as not found.

use chrono::FixedOffset;
use serde::Serialize;
use std::sync::Arc;

use crate::backend::{Backend, BackendResult, MachineFilter};
use crate::models::{first_image_url, BlogPost, Machine, MachineCategory, Part, Purpose};
use crate::models::image::PLACEHOLDER_IMAGE;
use crate::services::blog::{BlogCard, BlogDetail};
use crate::services::carousel::GalleryView;
use crate::services::whatsapp;

/// Number of related posts shown under a blog post
const RELATED_POSTS: usize = 2;

/// One of the three equipment categories, as shown on the site
#[derive(Debug, Clone, Copy, Serialize)]
pub struct CategoryInfo {
    pub slug: &'static str,
    #[serde(skip)]
    pub category: MachineCategory,
    pub title: &'static str,
    /// Text on the section index cards
    pub summary: &'static str,
    pub rental_description: &'static str,
    pub sales_description: &'static str,
    pub header_image: Option<&'static str>,
}

impl CategoryInfo {
    pub fn description(&self, purpose: Purpose) -> &'static str {
        match purpose {
            Purpose::Rental => self.rental_description,
            Purpose::Sales => self.sales_description,
        }
    }

    pub fn path(&self, purpose: Purpose) -> String {
        format!("{}/{}", purpose.section_path(), self.slug)
    }
}

pub const CATEGORIES: [CategoryInfo; 3] = [
    CategoryInfo {
        slug: "backhoe-loaders",
        category: MachineCategory::BackhoeLoader,
        title: "Backhoe Loaders",
        summary: "Powerful and versatile machines ideal for excavation, loading, trenching, and earthwork operations.",
        rental_description: "Versatile machines for digging, loading, and material handling on construction sites.",
        sales_description: "Quality backhoe loaders available for purchase.",
        header_image: None,
    },
    CategoryInfo {
        slug: "excavators",
        category: MachineCategory::Excavator,
        title: "Excavators",
        summary: "Heavy-duty excavators suitable for large-scale digging, demolition, and infrastructure projects.",
        rental_description: "Powerful excavators for heavy-duty digging, trenching, and earthmoving projects.",
        sales_description: "Premium excavators for sale with inspection reports.",
        header_image: None,
    },
    CategoryInfo {
        slug: "backhoe-breakers",
        category: MachineCategory::BackhoeBreaker,
        title: "Backhoe Loaders with Breakers",
        summary: "Backhoe loaders equipped with hydraulic breakers for rock breaking and hard surface demolition.",
        rental_description: "Backhoe loaders equipped with hydraulic breakers for rock breaking and hard surface demolition.",
        sales_description: "Backhoe loaders with hydraulic breakers for specialized work.",
        header_image: Some(
            "https://res.cloudinary.com/dgchj39y2/image/upload/v1737471649/heavy_horizon/categories/backhoe-breaker-category.jpg",
        ),
    },
];

pub fn category_info(slug: &str) -> Option<&'static CategoryInfo> {
    CATEGORIES.iter().find(|c| c.slug == slug)
}

/// "3 machines available", or the empty-category text
pub fn count_label(count: usize) -> String {
    match count {
        0 => "No machines available in this category".to_string(),
        1 => "1 machine available".to_string(),
        n => format!("{} machines available", n),
    }
}

/// Result of a listing fetch
#[derive(Debug, Clone, Serialize)]
pub struct Listing<T> {
    pub items: Vec<T>,
    /// The backend could not be reached; `items` is empty
    pub failed: bool,
}

impl<T> Listing<T> {
    fn ready(items: Vec<T>) -> Self {
        Self {
            items,
            failed: false,
        }
    }

    fn failed() -> Self {
        Self {
            items: Vec::new(),
            failed: true,
        }
    }

    pub fn is_empty(&self) -> bool {
        self.items.is_empty()
    }
}

/// Machine card on a category grid
#[derive(Debug, Clone, Serialize)]
pub struct MachineCard {
    pub id: String,
    pub title: String,
    pub category: String,
    pub model: String,
    pub year: u32,
    pub hours: u32,
    /// Description HTML from the admin editor
    pub condition: String,
    pub location: String,
    pub code: String,
    pub status: String,
    pub detail_url: String,
    pub enquiry_url: String,
    pub gallery: GalleryView,
}

impl MachineCard {
    pub fn new(machine: &Machine, purpose: Purpose) -> Self {
        let detail_url = format!(
            "{}/{}/{}",
            purpose.section_path(),
            machine.category.slug(),
            urlencoding::encode(&machine.id)
        );
        let enquiry_url = format!(
            "/enquiry?type={}&machine={}",
            purpose,
            urlencoding::encode(&machine.id)
        );
        Self {
            id: machine.id.clone(),
            title: machine.title.clone(),
            category: machine.category.label().to_string(),
            model: machine.model.clone(),
            year: machine.year,
            hours: machine.hours,
            condition: machine.condition.clone(),
            location: machine.location.clone(),
            code: machine.code().to_string(),
            status: machine.status.to_string(),
            detail_url,
            enquiry_url,
            gallery: GalleryView::new(machine.image_urls(), None),
        }
    }
}

/// Category grid page
#[derive(Debug, Clone, Serialize)]
pub struct CategoryPage {
    pub info: CategoryInfo,
    pub purpose: Purpose,
    pub description: &'static str,
    pub count_label: String,
    pub machines: Listing<MachineCard>,
}

/// Machine detail page, with the lightbox when `full_view` is set
#[derive(Debug, Clone, Serialize)]
pub struct MachineDetail {
    pub machine: MachineCard,
    pub purpose: Purpose,
    pub gallery: GalleryView,
    pub full_view: bool,
    pub cover_image: String,
    pub interest_url: String,
    pub page_url: String,
}

/// Page reached through an unknown id; carries its way back
#[derive(Debug, Clone, Serialize)]
pub struct BackLink {
    pub url: &'static str,
    pub label: &'static str,
}

impl BackLink {
    pub fn section(purpose: Purpose) -> Self {
        Self {
            url: purpose.section_path(),
            label: purpose.section_label(),
        }
    }
}

#[derive(Debug, Clone, Serialize)]
pub struct PartCard {
    pub id: String,
    pub name: String,
    pub compatibility: String,
    pub condition: String,
    pub cover_image: String,
    pub enquiry_url: String,
    pub gallery: GalleryView,
}

impl PartCard {
    pub fn new(part: &Part) -> Self {
        Self {
            id: part.id.clone(),
            name: part.name.clone(),
            compatibility: part.compatibility.clone(),
            condition: part.condition.clone(),
            cover_image: part.cover_image(),
            enquiry_url: format!("/enquiry?type=Part&part={}", urlencoding::encode(&part.name)),
            gallery: GalleryView::new(part.image_urls(), None),
        }
    }
}

pub struct CatalogService {
    backend: Arc<dyn Backend>,
    public_url: String,
    admin_phone: String,
    offset: FixedOffset,
}

impl CatalogService {
    pub fn new(
        backend: Arc<dyn Backend>,
        public_url: &str,
        admin_phone: impl Into<String>,
        offset: FixedOffset,
    ) -> Self {
        Self {
            backend,
            public_url: public_url.trim_end_matches('/').to_string(),
            admin_phone: admin_phone.into(),
            offset,
        }
    }

    /// Absolute URL of a site path
    pub fn absolute_url(&self, path: &str) -> String {
        format!("{}{}", self.public_url, path)
    }

    /// Machines listed under a category of a section
    ///
    /// Rental listings are filtered by the backend. Sales listings fetch the
    /// whole category and keep machines where `type` or the legacy `purpose`
    /// field is Sales.
    pub async fn category_page(&self, purpose: Purpose, info: &CategoryInfo) -> CategoryPage {
        let filter = match purpose {
            Purpose::Rental => MachineFilter::all()
                .with_purpose(Purpose::Rental)
                .with_category(info.category),
            Purpose::Sales => MachineFilter::all().with_category(info.category),
        };

        let machines = match self.backend.list_machines(&filter).await {
            Ok(machines) => Listing::ready(
                machines
                    .iter()
                    .filter(|m| purpose == Purpose::Rental || m.for_sale())
                    .map(|m| MachineCard::new(m, purpose))
                    .collect(),
            ),
            Err(e) => {
                tracing::warn!("Failed to load {} machines for {}: {}", purpose, info.slug, e);
                Listing::failed()
            }
        };

        CategoryPage {
            info: *info,
            purpose,
            description: info.description(purpose),
            count_label: count_label(machines.items.len()),
            machines,
        }
    }

    /// Detail page for one machine; `None` when it cannot be shown
    pub async fn machine_detail(
        &self,
        purpose: Purpose,
        path: &str,
        id: &str,
        image: Option<usize>,
        full_view: bool,
    ) -> Option<MachineDetail> {
        let machine = match self.backend.get_machine(id).await {
            Ok(found) => found?,
            Err(e) => {
                tracing::warn!("Failed to load machine {}: {}", id, e);
                return None;
            }
        };

        let page_url = self.absolute_url(path);
        let interest_url = whatsapp::chat_link(
            &self.admin_phone,
            &whatsapp::interest_message(&machine, purpose, &page_url),
        );
        Some(MachineDetail {
            cover_image: first_image_url(machine.image_source(), PLACEHOLDER_IMAGE),
            gallery: GalleryView::new(machine.image_urls(), image),
            machine: MachineCard::new(&machine, purpose),
            purpose,
            full_view,
            interest_url,
            page_url,
        })
    }

    /// Machine by id, for building enquiry context
    ///
    /// `Ok(None)` only when the backend does not know the machine.
    pub async fn machine(&self, id: &str) -> BackendResult<Option<Machine>> {
        self.backend.get_machine(id).await.inspect_err(|e| {
            tracing::warn!("Failed to load machine {}: {}", id, e);
        })
    }

    pub async fn parts(&self) -> Listing<PartCard> {
        match self.backend.list_parts().await {
            Ok(parts) => Listing::ready(parts.iter().map(PartCard::new).collect()),
            Err(e) => {
                tracing::warn!("Failed to load parts: {}", e);
                Listing::failed()
            }
        }
    }

    pub async fn blogs(&self) -> Listing<BlogCard> {
        match self.backend.list_blogs().await {
            Ok(posts) => Listing::ready(posts.iter().map(|p| BlogCard::new(p, self.offset)).collect()),
            Err(e) => {
                tracing::warn!("Failed to load blogs: {}", e);
                Listing::failed()
            }
        }
    }

    /// A post with up to two other posts as related reading
    pub async fn blog_detail(&self, id: &str, image: Option<usize>) -> Option<BlogDetail> {
        let post = match self.backend.get_blog(id).await {
            Ok(found) => found?,
            Err(e) => {
                tracing::warn!("Failed to load blog {}: {}", id, e);
                return None;
            }
        };

        let related: Vec<BlogPost> = match self.backend.list_blogs().await {
            Ok(posts) => posts
                .into_iter()
                .filter(|p| p.id != post.id)
                .take(RELATED_POSTS)
                .collect(),
            Err(e) => {
                tracing::warn!("Failed to load related blogs: {}", e);
                Vec::new()
            }
        };

        Some(BlogDetail::new(&post, &related, image, self.offset))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::backend::MemoryBackend;
    use crate::services::blog::site_offset;

    fn service(backend: Arc<MemoryBackend>) -> CatalogService {
        CatalogService::new(backend, "http://localhost:8080/", "916379432565", site_offset(330))
    }

    #[test]
    fn test_category_table() {
        assert_eq!(category_info("excavators").map(|c| c.category), Some(MachineCategory::Excavator));
        assert!(category_info("cranes").is_none());
        assert!(category_info("backhoe-breakers").unwrap().header_image.is_some());
        assert_eq!(
            category_info("excavators").unwrap().path(Purpose::Sales),
            "/sales/excavators"
        );
    }

    #[test]
    fn test_count_label() {
        assert_eq!(count_label(0), "No machines available in this category");
        assert_eq!(count_label(1), "1 machine available");
        assert_eq!(count_label(4), "4 machines available");
    }

    #[tokio::test]
    async fn test_rental_listing_filters_by_purpose() {
        let catalog = service(Arc::new(MemoryBackend::with_sample_data()));
        let info = category_info("excavators").unwrap();
        let page = catalog.category_page(Purpose::Rental, info).await;
        let titles: Vec<_> = page.machines.items.iter().map(|m| m.title.as_str()).collect();
        assert_eq!(titles, vec!["CAT 320D"]);
        assert_eq!(page.count_label, "1 machine available");
        assert!(!page.machines.failed);
    }

    #[tokio::test]
    async fn test_sales_listing_keeps_legacy_purpose_records() {
        let backend = Arc::new(MemoryBackend::with_sample_data());
        backend
            .insert_machine(Machine {
                title: "Tata Hitachi EX200".to_string(),
                category: MachineCategory::Excavator,
                legacy_purpose: Some(Purpose::Sales),
                ..Machine::default()
            })
            .await;
        backend
            .insert_machine(Machine {
                title: "Hyundai R215".to_string(),
                category: MachineCategory::Excavator,
                kind: Some(Purpose::Rental),
                legacy_purpose: Some(Purpose::Sales),
                ..Machine::default()
            })
            .await;
        let catalog = service(backend);

        let page = catalog
            .category_page(Purpose::Sales, category_info("excavators").unwrap())
            .await;
        let titles: Vec<_> = page.machines.items.iter().map(|m| m.title.as_str()).collect();
        assert_eq!(titles, vec!["Komatsu PC210", "Tata Hitachi EX200", "Hyundai R215"]);
        assert!(page.machines.items[0].detail_url.starts_with("/sales/excavators/"));
    }

    #[tokio::test]
    async fn test_failed_listing_degrades_to_empty() {
        let backend = Arc::new(MemoryBackend::with_sample_data());
        backend.set_fail_reads(true);
        let catalog = service(backend);

        let page = catalog
            .category_page(Purpose::Rental, category_info("excavators").unwrap())
            .await;
        assert!(page.machines.failed);
        assert!(page.machines.is_empty());
        assert_eq!(page.count_label, count_label(0));
        assert!(catalog.parts().await.failed);
        assert!(catalog.blogs().await.failed);
    }

    #[tokio::test]
    async fn test_machine_detail() {
        let catalog = service(Arc::new(MemoryBackend::with_sample_data()));
        let path = "/services/backhoe-loaders/65a1c2d3e4f5a6b7c8d9e001";
        let detail = catalog
            .machine_detail(Purpose::Rental, path, "65a1c2d3e4f5a6b7c8d9e001", Some(5), false)
            .await
            .unwrap();

        assert_eq!(detail.machine.code, "BL-0001");
        assert_eq!(detail.page_url, format!("http://localhost:8080{}", path));
        assert!(detail.interest_url.starts_with("https://wa.me/916379432565?text=Hi%2C%20I%27m%20interested"));
        assert_eq!(detail.gallery.index, 0);
        assert_eq!(detail.cover_image, PLACEHOLDER_IMAGE);

        assert!(catalog
            .machine_detail(Purpose::Rental, path, "missing", None, false)
            .await
            .is_none());
    }

    #[tokio::test]
    async fn test_blog_detail_with_related() {
        let backend = Arc::new(MemoryBackend::with_sample_data());
        for title in ["Second", "Third", "Fourth"] {
            backend
                .insert_blog(BlogPost {
                    title: title.to_string(),
                    ..BlogPost::default()
                })
                .await;
        }
        let catalog = service(backend);

        let detail = catalog
            .blog_detail("65a1c2d3e4f5a6b7c8d9e0f2", None)
            .await
            .unwrap();
        let related: Vec<_> = detail.related.iter().map(|c| c.title.as_str()).collect();
        assert_eq!(related, vec!["Second", "Third"]);
        assert!(catalog.blog_detail("nope", None).await.is_none());
    }

    #[tokio::test]
    async fn test_part_cards_link_to_enquiry() {
        let catalog = service(Arc::new(MemoryBackend::with_sample_data()));
        let parts = catalog.parts().await;
        assert_eq!(parts.items.len(), 1);
        assert_eq!(parts.items[0].enquiry_url, "/enquiry?type=Part&part=Bucket%20Teeth%20Set");
        assert_eq!(parts.items[0].cover_image, PLACEHOLDER_IMAGE);
    }
}
