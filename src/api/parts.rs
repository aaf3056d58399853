//! Spare parts listing

use axum::{extract::State, response::Html, routing::get, Router};
use tera::Context as TeraContext;

use crate::api::middleware::{AppState, PageError};

pub fn router() -> Router<AppState> {
    Router::new().route("/spare-parts", get(list_parts))
}

/// GET /spare-parts
async fn list_parts(State(state): State<AppState>) -> Result<Html<String>, PageError> {
    let parts = state.catalog.parts().await;
    let mut context = TeraContext::new();
    context.insert("parts", &parts);
    state.render("spare_parts.html", &context, "/spare-parts")
}
