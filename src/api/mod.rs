//! HTTP layer - page handlers and routing
//!
//! Contains:
//! - Public pages: home, services and sales sections, spare parts, blogs
//! - Enquiry and contact forms
//! - Admin CMS behind the session cookie
//! - Embedded assets

pub mod admin;
pub mod assets;
pub mod blogs;
pub mod catalog;
pub mod enquiry;
pub mod middleware;
pub mod parts;
pub mod site;

use axum::{
    extract::State,
    http::Uri,
    response::{IntoResponse, Response},
    routing::get,
    Router,
};
use tower::ServiceBuilder;
use tower_http::{compression::CompressionLayer, trace::TraceLayer};

pub use middleware::{AppState, PageError, SESSION_COOKIE};

use crate::services::catalog::BackLink;

/// Build the application router
pub fn build_router(state: AppState) -> Router {
    Router::new()
        .merge(site::router())
        .merge(catalog::router())
        .merge(parts::router())
        .merge(blogs::router())
        .merge(enquiry::router())
        .merge(admin::public_router())
        .merge(admin::protected_router(&state))
        .route("/assets/{*path}", get(assets::serve_asset))
        .fallback(page_not_found)
        .layer(
            ServiceBuilder::new()
                .layer(TraceLayer::new_for_http())
                .layer(CompressionLayer::new()),
        )
        .with_state(state)
}

/// Any path no route matched
async fn page_not_found(State(state): State<AppState>, uri: Uri) -> Response {
    state
        .not_found(
            "Page Not Found",
            "The page you're looking for doesn't exist.",
            BackLink {
                url: "/",
                label: "Home",
            },
            uri.path(),
        )
        .into_response()
}
