//! Home page and the two section indexes

use axum::{extract::State, response::Html, routing::get, Router};
use serde::Serialize;
use tera::Context as TeraContext;

use crate::api::middleware::{AppState, PageError};
use crate::models::Purpose;
use crate::services::catalog::CATEGORIES;

pub fn router() -> Router<AppState> {
    Router::new()
        .route("/", get(home))
        .route("/services", get(services_index))
        .route("/sales", get(sales_index))
}

/// Category card on the home page and section indexes
#[derive(Debug, Serialize)]
struct CategoryCard {
    slug: &'static str,
    title: &'static str,
    summary: &'static str,
    header_image: Option<&'static str>,
    path: String,
}

fn category_cards(purpose: Purpose) -> Vec<CategoryCard> {
    CATEGORIES
        .iter()
        .map(|info| CategoryCard {
            slug: info.slug,
            title: info.title,
            summary: info.summary,
            header_image: info.header_image,
            path: info.path(purpose),
        })
        .collect()
}

/// Heading text of a section index
#[derive(Debug, Serialize)]
struct Section {
    purpose: Purpose,
    label: &'static str,
    heading: &'static str,
    intro: &'static str,
    path: &'static str,
}

impl Section {
    fn of(purpose: Purpose) -> Self {
        match purpose {
            Purpose::Rental => Self {
                purpose,
                label: purpose.section_label(),
                heading: "Equipment Rental Services",
                intro: "Well-maintained machines with experienced operators, available for short and long term hire.",
                path: purpose.section_path(),
            },
            Purpose::Sales => Self {
                purpose,
                label: purpose.section_label(),
                heading: "Equipment for Sale",
                intro: "Inspected machines ready for purchase, with honest condition reports.",
                path: purpose.section_path(),
            },
        }
    }
}

/// GET /
async fn home(State(state): State<AppState>) -> Result<Html<String>, PageError> {
    let mut context = TeraContext::new();
    context.insert("rental_categories", &category_cards(Purpose::Rental));
    context.insert("sales_categories", &category_cards(Purpose::Sales));
    state.render("index.html", &context, "/")
}

async fn section_index(state: &AppState, purpose: Purpose) -> Result<Html<String>, PageError> {
    let mut context = TeraContext::new();
    context.insert("section", &Section::of(purpose));
    context.insert("categories", &category_cards(purpose));
    state.render("section.html", &context, purpose.section_path())
}

/// GET /services
async fn services_index(State(state): State<AppState>) -> Result<Html<String>, PageError> {
    section_index(&state, Purpose::Rental).await
}

/// GET /sales
async fn sales_index(State(state): State<AppState>) -> Result<Html<String>, PageError> {
    section_index(&state, Purpose::Sales).await
}
