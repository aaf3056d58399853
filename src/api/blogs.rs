//! Blog listing and post pages

use axum::{
    extract::{Path, Query, State},
    response::Html,
    routing::get,
    Router,
};
use tera::Context as TeraContext;

use crate::api::catalog::GalleryQuery;
use crate::api::middleware::{AppState, PageError};
use crate::services::catalog::BackLink;

pub fn router() -> Router<AppState> {
    Router::new()
        .route("/blogs", get(list_blogs))
        .route("/blogs/{id}", get(show_blog))
}

/// GET /blogs
async fn list_blogs(State(state): State<AppState>) -> Result<Html<String>, PageError> {
    let blogs = state.catalog.blogs().await;
    let mut context = TeraContext::new();
    context.insert("blogs", &blogs);
    state.render("blogs.html", &context, "/blogs")
}

/// GET /blogs/{id}
async fn show_blog(
    State(state): State<AppState>,
    Path(id): Path<String>,
    Query(query): Query<GalleryQuery>,
) -> Result<Html<String>, PageError> {
    let path = format!("/blogs/{}", urlencoding::encode(&id));
    let Some(post) = state.catalog.blog_detail(&id, query.image()).await else {
        return Err(state.not_found(
            "Blog Not Found",
            "The blog post you're looking for doesn't exist.",
            BackLink {
                url: "/blogs",
                label: "Blogs",
            },
            &path,
        ));
    };

    let mut context = TeraContext::new();
    context.insert("post", &post);
    context.insert("detail_path", &path);
    state.render("blog.html", &context, &path)
}
