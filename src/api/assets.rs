//! Embedded stylesheet, scripts and images under `/assets`

use axum::{
    extract::Path,
    http::{header, StatusCode},
    response::{IntoResponse, Response},
};
use rust_embed::RustEmbed;

#[derive(RustEmbed)]
#[folder = "assets/"]
struct SiteAssets;

/// Serve `/assets/{*path}`
pub async fn serve_asset(Path(path): Path<String>) -> Response {
    let decoded = urlencoding::decode(&path).map(|p| p.into_owned()).unwrap_or(path);
    if decoded.contains("..") {
        return not_found();
    }

    match SiteAssets::get(&decoded) {
        Some(file) => build_response(&decoded, file.data.into_owned()),
        None => not_found(),
    }
}

fn build_response(path: &str, data: Vec<u8>) -> Response {
    (
        [
            (header::CONTENT_TYPE, get_content_type(path)),
            (header::CACHE_CONTROL, "public, max-age=3600"),
        ],
        data,
    )
        .into_response()
}

fn not_found() -> Response {
    (
        StatusCode::NOT_FOUND,
        [(header::CONTENT_TYPE, "text/plain; charset=utf-8")],
        "Not Found",
    )
        .into_response()
}

fn get_content_type(path: &str) -> &'static str {
    match path.rsplit('.').next().unwrap_or("") {
        "css" => "text/css; charset=utf-8",
        "js" => "application/javascript",
        "png" => "image/png",
        "jpg" | "jpeg" => "image/jpeg",
        "svg" => "image/svg+xml",
        "ico" => "image/x-icon",
        "webp" => "image/webp",
        "woff2" => "font/woff2",
        _ => "application/octet-stream",
    }
}
