//! Shared request plumbing
//!
//! Contains:
//! - Application state
//! - Page rendering and the page error type
//! - Admin session cookie handling and the admin guard

use axum::{
    extract::Request,
    http::{header, header::InvalidHeaderValue, HeaderMap, HeaderValue, StatusCode},
    middleware::Next,
    response::{Html, IntoResponse, Redirect, Response},
};
use std::sync::Arc;
use tera::Context as TeraContext;

use crate::backend::{AuthSession, Backend};
use crate::config::Config;
use crate::services::admin::{AdminError, AdminService};
use crate::services::blog::site_offset;
use crate::services::catalog::{BackLink, CatalogService};
use crate::services::enquiry::EnquiryService;
use crate::theme::{StandardTemplateVars, ThemeEngine};

/// Cookie carrying the admin bearer token
pub const SESSION_COOKIE: &str = "hh_admin";

pub const LOGIN_PATH: &str = "/admin/login";

/// Application state shared by all handlers
#[derive(Clone)]
pub struct AppState {
    pub config: Arc<Config>,
    pub backend: Arc<dyn Backend>,
    pub theme_engine: Arc<ThemeEngine>,
    pub catalog: Arc<CatalogService>,
    pub enquiries: Arc<EnquiryService>,
    pub admin: Arc<AdminService>,
}

impl AppState {
    pub fn new(config: Config, backend: Arc<dyn Backend>, theme_engine: ThemeEngine) -> Self {
        let offset = site_offset(config.site.utc_offset_minutes);
        let catalog = CatalogService::new(
            backend.clone(),
            &config.site.public_url,
            config.whatsapp.admin_phone.clone(),
            offset,
        );
        let enquiries = EnquiryService::new(
            backend.clone(),
            config.whatsapp.admin_phone.clone(),
            config.enquiry.require_message,
        );
        let admin = AdminService::new(backend.clone(), config.upload.clone(), offset);

        Self {
            config: Arc::new(config),
            backend,
            theme_engine: Arc::new(theme_engine),
            catalog: Arc::new(catalog),
            enquiries: Arc::new(enquiries),
            admin: Arc::new(admin),
        }
    }

    fn standard_vars(&self, request_path: &str) -> StandardTemplateVars {
        StandardTemplateVars::new(&self.config.site, &self.config.whatsapp.admin_phone, request_path)
    }

    /// Render `template` with the standard variables
    pub fn render(
        &self,
        template: &str,
        context: &TeraContext,
        request_path: &str,
    ) -> Result<Html<String>, PageError> {
        let vars = self.standard_vars(request_path);
        self.theme_engine
            .render_with_standard_vars(template, context, &vars)
            .map(Html)
            .map_err(|e| {
                tracing::error!("{}", e);
                PageError::Internal(self.error_page(request_path))
            })
    }

    fn error_page(&self, request_path: &str) -> String {
        self.error_page_with(request_path, "The page could not be displayed.")
    }

    fn error_page_with(&self, request_path: &str, message: &str) -> String {
        let vars = self.standard_vars(request_path);
        let mut context = TeraContext::new();
        context.insert("site", &vars.site);
        context.insert("request_path", &vars.request_path);
        context.insert("year", &vars.year);
        context.insert("error_message", message);
        self.theme_engine.render_with_fallback("error.html", &context)
    }

    /// Error page for a backend failure
    pub fn unavailable(&self, message: &str, request_path: &str) -> PageError {
        PageError::Unavailable(self.error_page_with(request_path, message))
    }

    /// Not-found page with a way back
    pub fn not_found(&self, title: &str, message: &str, back: BackLink, request_path: &str) -> PageError {
        let mut context = TeraContext::new();
        context.insert("title", title);
        context.insert("message", message);
        context.insert("back", &back);
        match self.render("not_found.html", &context, request_path) {
            Ok(Html(html)) => PageError::NotFound(html),
            Err(e) => e,
        }
    }
}

/// Error outcome of a page handler
#[derive(Debug)]
pub enum PageError {
    /// Rendered not-found page
    NotFound(String),
    /// The backend rejected the admin token
    SessionExpired,
    /// Rendered error page
    Internal(String),
    /// Rendered error page for a backend that could not answer
    Unavailable(String),
}

impl IntoResponse for PageError {
    fn into_response(self) -> Response {
        match self {
            Self::NotFound(html) => (StatusCode::NOT_FOUND, Html(html)).into_response(),
            Self::SessionExpired => {
                tracing::info!("Admin session expired, clearing cookie");
                (
                    [(header::SET_COOKIE, clear_session_cookie())],
                    Redirect::to(LOGIN_PATH),
                )
                    .into_response()
            }
            Self::Internal(html) => (StatusCode::INTERNAL_SERVER_ERROR, Html(html)).into_response(),
            Self::Unavailable(html) => (StatusCode::BAD_GATEWAY, Html(html)).into_response(),
        }
    }
}

impl PageError {
    /// Map an unauthorized admin failure to a session reset
    pub fn from_admin(error: &AdminError) -> Option<Self> {
        error.is_unauthorized().then_some(Self::SessionExpired)
    }
}

/// Admin session from the `hh_admin` cookie
pub fn extract_session(headers: &HeaderMap) -> AuthSession {
    for value in headers.get_all(header::COOKIE) {
        let Ok(cookie_str) = value.to_str() else {
            continue;
        };
        for cookie in cookie_str.split(';') {
            if let Some(token) = cookie.trim().strip_prefix("hh_admin=") {
                if !token.is_empty() {
                    return AuthSession::with_token(token);
                }
            }
        }
    }
    AuthSession::new()
}

/// `Set-Cookie` value storing the token for `hours`
///
/// Fails when the token holds bytes a header cannot carry.
pub fn session_cookie(token: &str, hours: u64) -> Result<HeaderValue, InvalidHeaderValue> {
    let value = format!(
        "{}={}; HttpOnly; SameSite=Lax; Path=/; Max-Age={}",
        SESSION_COOKIE,
        token,
        hours.saturating_mul(3600)
    );
    HeaderValue::from_str(&value)
}

/// `Set-Cookie` value removing the session
pub fn clear_session_cookie() -> HeaderValue {
    HeaderValue::from_static("hh_admin=; HttpOnly; SameSite=Lax; Path=/; Max-Age=0")
}

/// Admin guard: requests without a session cookie go to the login page
pub async fn require_admin(request: Request, next: Next) -> Response {
    if extract_session(request.headers()).is_authenticated() {
        next.run(request).await
    } else {
        Redirect::to(LOGIN_PATH).into_response()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn headers_with_cookie(cookie: &str) -> HeaderMap {
        let mut headers = HeaderMap::new();
        headers.insert(header::COOKIE, HeaderValue::from_str(cookie).unwrap());
        headers
    }

    #[test]
    fn test_extract_session_from_cookie() {
        let session = extract_session(&headers_with_cookie("theme=dark; hh_admin=abc123; x=1"));
        assert_eq!(session.token(), Some("abc123"));
    }

    #[test]
    fn test_extract_session_none() {
        assert!(!extract_session(&HeaderMap::new()).is_authenticated());
        assert!(!extract_session(&headers_with_cookie("hh_admin=")).is_authenticated());
        assert!(!extract_session(&headers_with_cookie("session=abc")).is_authenticated());
    }

    #[test]
    fn test_session_cookie_attributes() {
        let cookie = session_cookie("tok", 8).unwrap();
        assert_eq!(
            cookie.to_str().unwrap(),
            "hh_admin=tok; HttpOnly; SameSite=Lax; Path=/; Max-Age=28800"
        );
        assert!(clear_session_cookie().to_str().unwrap().contains("Max-Age=0"));
    }

    #[test]
    fn test_session_cookie_rejects_unencodable_token() {
        assert!(session_cookie("tok\r\nSet-Cookie: x=1", 8).is_err());
    }
}
