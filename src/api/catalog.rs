//! Category grids and machine detail pages for both sections

use axum::{
    extract::{Path, Query, State},
    response::Html,
    routing::get,
    Router,
};
use serde::Deserialize;
use tera::Context as TeraContext;

use crate::api::middleware::{AppState, PageError};
use crate::models::Purpose;
use crate::services::catalog::{category_info, BackLink};

pub fn router() -> Router<AppState> {
    Router::new()
        .route("/services/{category}", get(rental_category))
        .route("/services/{category}/{id}", get(rental_detail))
        .route("/sales/{category}", get(sales_category))
        .route("/sales/{category}/{id}", get(sales_detail))
}

/// Gallery position and lightbox toggle
#[derive(Debug, Default, Deserialize)]
pub struct GalleryQuery {
    /// Requested image index; anything unparsable falls back to the first
    pub image: Option<String>,
    /// `full` opens the full-screen viewer
    pub view: Option<String>,
}

impl GalleryQuery {
    pub fn image(&self) -> Option<usize> {
        self.image.as_deref().and_then(|s| s.trim().parse().ok())
    }

    pub fn full_view(&self) -> bool {
        self.view.as_deref() == Some("full")
    }
}

async fn category(state: &AppState, purpose: Purpose, slug: &str) -> Result<Html<String>, PageError> {
    let path = format!("{}/{}", purpose.section_path(), slug);
    let Some(info) = category_info(slug) else {
        return Err(state.not_found(
            "Category Not Found",
            "The category you're looking for doesn't exist.",
            BackLink::section(purpose),
            &path,
        ));
    };

    let page = state.catalog.category_page(purpose, info).await;
    let mut context = TeraContext::new();
    context.insert("page", &page);
    context.insert("back", &BackLink::section(purpose));
    state.render("category.html", &context, &path)
}

async fn detail(
    state: &AppState,
    purpose: Purpose,
    slug: &str,
    id: &str,
    query: &GalleryQuery,
) -> Result<Html<String>, PageError> {
    let path = format!("{}/{}/{}", purpose.section_path(), slug, urlencoding::encode(id));
    let Some(detail) = state
        .catalog
        .machine_detail(purpose, &path, id, query.image(), query.full_view())
        .await
    else {
        return Err(state.not_found(
            "Machine Not Found",
            "The machine you're looking for doesn't exist.",
            BackLink::section(purpose),
            &path,
        ));
    };

    let mut context = TeraContext::new();
    context.insert("detail", &detail);
    context.insert("back", &BackLink::section(purpose));
    context.insert("category_path", &format!("{}/{}", purpose.section_path(), slug));
    context.insert("detail_path", &path);
    state.render("machine.html", &context, &path)
}

/// GET /services/{category}
async fn rental_category(
    State(state): State<AppState>,
    Path(slug): Path<String>,
) -> Result<Html<String>, PageError> {
    category(&state, Purpose::Rental, &slug).await
}

/// GET /sales/{category}
async fn sales_category(
    State(state): State<AppState>,
    Path(slug): Path<String>,
) -> Result<Html<String>, PageError> {
    category(&state, Purpose::Sales, &slug).await
}

/// GET /services/{category}/{id}
async fn rental_detail(
    State(state): State<AppState>,
    Path((slug, id)): Path<(String, String)>,
    Query(query): Query<GalleryQuery>,
) -> Result<Html<String>, PageError> {
    detail(&state, Purpose::Rental, &slug, &id, &query).await
}

/// GET /sales/{category}/{id}
async fn sales_detail(
    State(state): State<AppState>,
    Path((slug, id)): Path<(String, String)>,
    Query(query): Query<GalleryQuery>,
) -> Result<Html<String>, PageError> {
    detail(&state, Purpose::Sales, &slug, &id, &query).await
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_gallery_query_parsing() {
        let query = GalleryQuery {
            image: Some("2".to_string()),
            view: Some("full".to_string()),
        };
        assert_eq!(query.image(), Some(2));
        assert!(query.full_view());

        let query = GalleryQuery {
            image: Some("abc".to_string()),
            view: Some("grid".to_string()),
        };
        assert_eq!(query.image(), None);
        assert!(!query.full_view());
    }
}
