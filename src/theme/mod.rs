//! Template engine
//!
//! Pages are rendered with Tera. The templates under `templates/` are embedded
//! in the binary; a directory on disk can replace any of them by name.
//! Features:
//! - Embedded templates with on-disk overrides
//! - Standard template variables (site details, request path, year)
//! - Fallback to the error template, then to a plain HTML page

use anyhow::{Context, Result};
use chrono::Datelike;
use rust_embed::RustEmbed;
use serde::Serialize;
use std::collections::BTreeMap;
use std::error::Error as StdError;
use std::fs;
use std::path::{Path, PathBuf};
use tera::{Context as TeraContext, Tera};

use crate::config::SiteConfig;

mod error;

pub use error::ThemeError;

/// Templates compiled into the binary
#[derive(RustEmbed)]
#[folder = "templates/"]
#[include = "*.html"]
struct EmbeddedTemplates;

/// Template engine for the site and the admin area
pub struct ThemeEngine {
    tera: Tera,
    /// Directory whose templates replaced embedded ones, when it existed
    override_path: Option<PathBuf>,
}

impl ThemeEngine {
    /// Engine with the embedded templates only
    pub fn embedded() -> Result<Self> {
        let templates = Self::collect_embedded()?;
        Ok(Self {
            tera: Self::build(templates)?,
            override_path: None,
        })
    }

    /// Engine with the embedded templates, overridden by those in
    /// `override_dir` when the directory exists
    pub fn new(override_dir: &Path) -> Result<Self> {
        let mut templates = Self::collect_embedded()?;

        let override_path = if override_dir.is_dir() {
            let mut overrides = BTreeMap::new();
            Self::collect_templates_from_dir(override_dir, override_dir, &mut overrides)?;
            tracing::info!(
                "Loaded {} template override(s) from {:?}",
                overrides.len(),
                override_dir
            );
            templates.extend(overrides);
            Some(override_dir.to_path_buf())
        } else {
            None
        };

        Ok(Self {
            tera: Self::build(templates)?,
            override_path,
        })
    }

    fn collect_embedded() -> Result<BTreeMap<String, String>> {
        let mut templates = BTreeMap::new();
        for name in EmbeddedTemplates::iter() {
            let file = EmbeddedTemplates::get(&name)
                .ok_or_else(|| ThemeError::NotFound(name.to_string()))?;
            let content = String::from_utf8(file.data.into_owned())
                .map_err(|e| ThemeError::TemplateError(format!("{} is not UTF-8: {}", name, e)))?;
            templates.insert(name.replace('\\', "/"), content);
        }
        Ok(templates)
    }

    /// Collect `.html` files below `current_path`, named relative to `base_path`
    fn collect_templates_from_dir(
        base_path: &Path,
        current_path: &Path,
        templates: &mut BTreeMap<String, String>,
    ) -> Result<()> {
        for entry in fs::read_dir(current_path)
            .with_context(|| format!("Failed to read template directory: {:?}", current_path))?
        {
            let path = entry.map_err(ThemeError::IoError)?.path();

            if path.is_dir() {
                Self::collect_templates_from_dir(base_path, &path, templates)?;
            } else if path.extension().is_some_and(|ext| ext == "html") {
                let relative_path = path
                    .strip_prefix(base_path)
                    .map_err(|_| ThemeError::TemplateError("Failed to get relative path".to_string()))?;
                let template_name = relative_path.to_string_lossy().replace('\\', "/");
                let content = fs::read_to_string(&path)
                    .with_context(|| format!("Failed to read template: {:?}", path))?;
                templates.insert(template_name, content);
            }
        }
        Ok(())
    }

    fn build(templates: BTreeMap<String, String>) -> Result<Tera> {
        let mut tera = Tera::default();
        tera.add_raw_templates(templates)
            .map_err(|e| ThemeError::TemplateError(format!("Failed to load templates: {}", describe(&e))))?;
        Ok(tera)
    }

    /// Render a template with the given context
    pub fn render(&self, template: &str, context: &TeraContext) -> Result<String> {
        self.tera.render(template, context).map_err(|e| {
            ThemeError::TemplateError(format!("Failed to render '{}': {}", template, describe(&e))).into()
        })
    }

    /// Render a template with the standard variables added to `context`
    pub fn render_with_standard_vars(
        &self,
        template: &str,
        context: &TeraContext,
        standard_vars: &StandardTemplateVars,
    ) -> Result<String> {
        let mut full_context = context.clone();
        full_context.insert("site", &standard_vars.site);
        full_context.insert("request_path", &standard_vars.request_path);
        full_context.insert("year", &standard_vars.year);
        self.render(template, &full_context)
    }

    /// Render a template, falling back to `error.html` and then to a plain
    /// HTML page. Always produces markup.
    pub fn render_with_fallback(&self, template: &str, context: &TeraContext) -> String {
        match self.render(template, context) {
            Ok(html) => html,
            Err(e) => {
                tracing::error!("Failed to render template '{}': {}", template, e);

                let mut error_context = context.clone();
                error_context.insert("error_message", "The page could not be displayed.");
                error_context.insert("requested_template", template);

                match self.render("error.html", &error_context) {
                    Ok(html) => html,
                    Err(error_template_err) => {
                        tracing::error!("Failed to render error template: {}", error_template_err);
                        Self::simple_error_page("The page could not be displayed.")
                    }
                }
            }
        }
    }

    /// Last-resort page when no template can be rendered
    pub fn simple_error_page(message: &str) -> String {
        format!(
            r#"<!DOCTYPE html>
<html lang="en">
<head>
    <meta charset="UTF-8">
    <meta name="viewport" content="width=device-width, initial-scale=1.0">
    <title>Error</title>
    <style>
        body {{ font-family: -apple-system, BlinkMacSystemFont, 'Segoe UI', Roboto, sans-serif; max-width: 600px; margin: 50px auto; padding: 20px; background: #f5f5f5; }}
        .error-box {{ background: white; border-left: 4px solid #e07a18; padding: 20px; border-radius: 4px; }}
        h1 {{ color: #1c1c1c; margin-top: 0; }}
    </style>
</head>
<body>
    <div class="error-box">
        <h1>Something went wrong</h1>
        <p>{}</p>
        <p><a href="/">Back to Home</a></p>
    </div>
</body>
</html>"#,
            tera::escape_html(message)
        )
    }

    pub fn has_template(&self, name: &str) -> bool {
        self.tera.get_template_names().any(|t| t == name)
    }

    pub fn override_path(&self) -> Option<&Path> {
        self.override_path.as_deref()
    }
}

/// Error message with its whole source chain
fn describe(e: &tera::Error) -> String {
    let mut message = e.to_string();
    let mut source = e.source();
    while let Some(s) = source {
        message.push_str(&format!("\n  Caused by: {}", s));
        source = s.source();
    }
    message
}

/// Site details every page shows in its header and footer
#[derive(Debug, Clone, Serialize)]
pub struct SiteVars {
    pub name: String,
    pub tagline: String,
    pub phone_display: String,
    pub email: String,
    pub address: String,
    /// Chat link without prefilled text
    pub whatsapp_url: String,
}

/// Variables injected into every template
#[derive(Debug, Clone, Serialize)]
pub struct StandardTemplateVars {
    pub site: SiteVars,
    pub request_path: String,
    pub year: i32,
}

impl StandardTemplateVars {
    pub fn new(site: &SiteConfig, whatsapp_phone: &str, request_path: &str) -> Self {
        Self {
            site: SiteVars {
                name: site.name.clone(),
                tagline: site.tagline.clone(),
                phone_display: site.phone_display.clone(),
                email: site.email.clone(),
                address: site.address.clone(),
                whatsapp_url: format!("https://wa.me/{}", whatsapp_phone),
            },
            request_path: request_path.to_string(),
            year: chrono::Utc::now().year(),
        }
    }
}

#[cfg(test)]
mod tests;
