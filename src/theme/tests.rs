//! Tests for the template engine

use super::*;
use std::fs;
use tempfile::TempDir;
use tera::Context as TeraContext;

fn standard_vars(path: &str) -> StandardTemplateVars {
    StandardTemplateVars::new(&SiteConfig::default(), "916379432565", path)
}

#[test]
fn test_embedded_templates_loaded() {
    let engine = ThemeEngine::embedded().unwrap();
    for name in [
        "base.html",
        "index.html",
        "category.html",
        "machine.html",
        "enquiry.html",
        "not_found.html",
        "error.html",
        "admin/base.html",
        "admin/dashboard.html",
    ] {
        assert!(engine.has_template(name), "missing template {}", name);
    }
    assert!(engine.override_path().is_none());
}

#[test]
fn test_missing_override_dir_uses_embedded() {
    let temp_dir = TempDir::new().unwrap();
    let engine = ThemeEngine::new(&temp_dir.path().join("absent")).unwrap();
    assert!(engine.override_path().is_none());
    assert!(engine.has_template("index.html"));
}

#[test]
fn test_override_replaces_template_by_name() {
    let temp_dir = TempDir::new().unwrap();
    fs::create_dir_all(temp_dir.path().join("admin")).unwrap();
    fs::write(
        temp_dir.path().join("error.html"),
        "<p>custom error: {{ error_message }}</p>",
    )
    .unwrap();
    fs::write(temp_dir.path().join("admin/extra.html"), "<p>{{ site.name }}</p>").unwrap();

    let engine = ThemeEngine::new(temp_dir.path()).unwrap();
    assert_eq!(engine.override_path(), Some(temp_dir.path()));
    assert!(engine.has_template("admin/extra.html"));

    let mut context = TeraContext::new();
    context.insert("error_message", "boom");
    let html = engine.render("error.html", &context).unwrap();
    assert_eq!(html, "<p>custom error: boom</p>");
}

#[test]
fn test_standard_vars_injected() {
    let temp_dir = TempDir::new().unwrap();
    fs::write(
        temp_dir.path().join("probe.html"),
        "{{ site.name }}|{{ request_path | safe }}|{{ site.whatsapp_url | safe }}|{{ year }}|{{ request_path }}",
    )
    .unwrap();
    let engine = ThemeEngine::new(temp_dir.path()).unwrap();

    let html = engine
        .render_with_standard_vars("probe.html", &TeraContext::new(), &standard_vars("/sales"))
        .unwrap();
    let parts: Vec<&str> = html.split('|').collect();
    assert_eq!(parts[0], "Heavy Horizon");
    assert_eq!(parts[1], "/sales");
    assert_eq!(parts[2], "https://wa.me/916379432565");
    assert!(parts[3].parse::<i32>().unwrap() >= 2024);
    // html templates escape the slash unless marked safe
    assert_eq!(parts[4], "&#x2F;sales");
}

#[test]
fn test_autoescape_on_html() {
    let temp_dir = TempDir::new().unwrap();
    fs::write(temp_dir.path().join("probe.html"), "{{ value }}").unwrap();
    let engine = ThemeEngine::new(temp_dir.path()).unwrap();

    let mut context = TeraContext::new();
    context.insert("value", "<script>");
    assert_eq!(engine.render("probe.html", &context).unwrap(), "&lt;script&gt;");
}

#[test]
fn test_render_unknown_template_fails() {
    let engine = ThemeEngine::embedded().unwrap();
    let err = engine.render("nope.html", &TeraContext::new()).unwrap_err();
    assert!(err.to_string().contains("nope.html"));
}

#[test]
fn test_fallback_to_error_template() {
    let temp_dir = TempDir::new().unwrap();
    fs::write(temp_dir.path().join("broken.html"), "{{ missing.field }}").unwrap();
    fs::write(
        temp_dir.path().join("error.html"),
        "error page for {{ requested_template }}",
    )
    .unwrap();
    let engine = ThemeEngine::new(temp_dir.path()).unwrap();

    let html = engine.render_with_fallback("broken.html", &TeraContext::new());
    assert_eq!(html, "error page for broken.html");
}

#[test]
fn test_fallback_to_simple_page() {
    let temp_dir = TempDir::new().unwrap();
    fs::write(temp_dir.path().join("broken.html"), "{{ missing.field }}").unwrap();
    fs::write(temp_dir.path().join("error.html"), "{{ also.missing }}").unwrap();
    let engine = ThemeEngine::new(temp_dir.path()).unwrap();

    let html = engine.render_with_fallback("broken.html", &TeraContext::new());
    assert!(html.contains("Something went wrong"));
    assert!(html.contains("Back to Home"));
}

#[test]
fn test_simple_error_page_escapes_message() {
    let html = ThemeEngine::simple_error_page("<b>bad</b>");
    assert!(html.contains("&lt;b&gt;bad&lt;&#x2F;b&gt;"));
    assert!(!html.contains("<b>bad</b>"));
}

#[test]
fn test_bad_override_template_is_an_error() {
    let temp_dir = TempDir::new().unwrap();
    fs::write(temp_dir.path().join("index.html"), "{% if %}").unwrap();
    assert!(ThemeEngine::new(temp_dir.path()).is_err());
}
