//! Backend REST API client
//!
//! The site keeps no data of its own. Every listing, enquiry and admin change
//! goes through a [`Backend`]:
//! - [`HttpBackend`] talks to the REST API over HTTP
//! - [`MemoryBackend`] keeps records in process (previews and tests)
//!
//! Authenticated calls take an explicit [`AuthSession`].

mod error;
mod http;
mod memory;

pub use error::{BackendError, BackendResult};
pub use http::HttpBackend;
pub use memory::{MemoryBackend, DEFAULT_ADMIN_EMAIL, DEFAULT_ADMIN_PASSWORD};

use async_trait::async_trait;
use std::sync::Arc;

use crate::config::{BackendConfig, BackendDriver};
use crate::models::{
    BlogPost, CreateBlogInput, CreatePartInput, DashboardCounts, Enquiry, ImageRef, Machine,
    MachineCategory, Part, Purpose,
};

/// Admin bearer token for one browser
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct AuthSession {
    token: Option<String>,
}

impl AuthSession {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_token(token: impl Into<String>) -> Self {
        Self {
            token: Some(token.into()),
        }
    }

    pub fn set(&mut self, token: impl Into<String>) {
        self.token = Some(token.into());
    }

    pub fn clear(&mut self) {
        self.token = None;
    }

    pub fn token(&self) -> Option<&str> {
        self.token.as_deref()
    }

    pub fn is_authenticated(&self) -> bool {
        self.token.as_deref().is_some_and(|t| !t.is_empty())
    }
}

/// Query for machine listings
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct MachineFilter {
    pub purpose: Option<Purpose>,
    pub category: Option<MachineCategory>,
}

impl MachineFilter {
    pub fn all() -> Self {
        Self::default()
    }

    pub fn with_purpose(mut self, purpose: Purpose) -> Self {
        self.purpose = Some(purpose);
        self
    }

    pub fn with_category(mut self, category: MachineCategory) -> Self {
        self.category = Some(category);
        self
    }

    pub fn matches(&self, machine: &Machine) -> bool {
        self.purpose.map_or(true, |p| machine.purpose() == Some(p))
            && self.category.map_or(true, |c| machine.category == c)
    }
}

/// File staged for upload
#[derive(Debug, Clone)]
pub struct UploadFile {
    pub file_name: String,
    pub content_type: String,
    pub data: Vec<u8>,
}

#[async_trait]
pub trait Backend: Send + Sync {
    /// Exchange admin credentials for a bearer token
    async fn login(&self, email: &str, password: &str) -> BackendResult<String>;

    async fn list_machines(&self, filter: &MachineFilter) -> BackendResult<Vec<Machine>>;
    async fn get_machine(&self, id: &str) -> BackendResult<Option<Machine>>;
    async fn create_machine(&self, session: &AuthSession, machine: &Machine) -> BackendResult<()>;
    async fn update_machine(
        &self,
        session: &AuthSession,
        id: &str,
        machine: &Machine,
    ) -> BackendResult<()>;
    async fn delete_machine(&self, session: &AuthSession, id: &str) -> BackendResult<()>;

    async fn list_parts(&self) -> BackendResult<Vec<Part>>;
    async fn create_part(&self, session: &AuthSession, part: &CreatePartInput) -> BackendResult<()>;
    async fn delete_part(&self, session: &AuthSession, id: &str) -> BackendResult<()>;

    async fn list_blogs(&self) -> BackendResult<Vec<BlogPost>>;
    async fn get_blog(&self, id: &str) -> BackendResult<Option<BlogPost>>;
    async fn create_blog(&self, session: &AuthSession, blog: &CreateBlogInput) -> BackendResult<()>;
    async fn delete_blog(&self, session: &AuthSession, id: &str) -> BackendResult<()>;

    /// Persist a visitor enquiry (public)
    async fn submit_enquiry(&self, enquiry: &Enquiry) -> BackendResult<()>;
    async fn list_enquiries(&self, session: &AuthSession) -> BackendResult<Vec<Enquiry>>;
    async fn mark_enquiries_read(&self, session: &AuthSession) -> BackendResult<()>;

    async fn dashboard_counts(&self, session: &AuthSession) -> BackendResult<DashboardCounts>;

    /// Upload a batch of images, returning references in the same order
    async fn upload_images(
        &self,
        session: &AuthSession,
        files: Vec<UploadFile>,
    ) -> BackendResult<Vec<ImageRef>>;
}

/// Build the backend selected in configuration
pub fn create_backend(config: &BackendConfig) -> anyhow::Result<Arc<dyn Backend>> {
    match config.driver {
        BackendDriver::Http => Ok(HttpBackend::boxed(config)?),
        BackendDriver::Memory => Ok(Arc::new(MemoryBackend::with_sample_data())),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_auth_session_lifecycle() {
        let mut session = AuthSession::new();
        assert!(!session.is_authenticated());
        assert_eq!(session.token(), None);

        session.set("abc");
        assert!(session.is_authenticated());
        assert_eq!(session.token(), Some("abc"));

        session.clear();
        assert!(!session.is_authenticated());

        assert!(!AuthSession::with_token("").is_authenticated());
    }

    #[test]
    fn test_machine_filter_matches() {
        let machine = Machine {
            category: MachineCategory::Excavator,
            legacy_purpose: Some(Purpose::Sales),
            ..Machine::default()
        };
        assert!(MachineFilter::all().matches(&machine));
        assert!(MachineFilter::all().with_purpose(Purpose::Sales).matches(&machine));
        assert!(!MachineFilter::all().with_purpose(Purpose::Rental).matches(&machine));
        assert!(!MachineFilter::all()
            .with_category(MachineCategory::BackhoeLoader)
            .matches(&machine));
    }
}
