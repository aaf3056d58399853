//! Enquiry validation and submission
//!
//! An enquiry is stored by the backend before the visitor is handed over to
//! WhatsApp. If storing fails no link is produced.

use chrono::{SecondsFormat, Utc};
use once_cell::sync::Lazy;
use regex::Regex;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::sync::Arc;

use crate::backend::{Backend, BackendError};
use crate::models::{Enquiry, EnquiryType, MachineSnapshot};
use crate::services::whatsapp;

static MOBILE_PATTERN: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"^[0-9]{10}$").expect("mobile regex should compile"));

static EMAIL_PATTERN: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"^[^\s@]+@[^\s@]+\.[^\s@]+$").expect("email regex should compile"));

/// Values typed into an enquiry form
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct EnquiryForm {
    #[serde(default)]
    pub name: String,
    #[serde(default)]
    pub mobile: String,
    #[serde(default)]
    pub email: String,
    #[serde(default)]
    pub message: String,
}

/// Field name to message, for every rule the form breaks
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
#[serde(transparent)]
pub struct FieldErrors(BTreeMap<&'static str, String>);

impl FieldErrors {
    pub fn insert(&mut self, field: &'static str, message: impl Into<String>) {
        self.0.insert(field, message.into());
    }

    pub fn get(&self, field: &str) -> Option<&str> {
        self.0.get(field).map(String::as_str)
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }
}

/// Check every field and collect all violations
pub fn validate(form: &EnquiryForm, require_message: bool) -> FieldErrors {
    let mut errors = FieldErrors::default();

    if form.name.trim().is_empty() {
        errors.insert("name", "Please enter your name");
    }

    if require_message && form.message.trim().is_empty() {
        errors.insert("message", "Please enter your requirement");
    }

    let mobile = form.mobile.trim();
    if mobile.is_empty() {
        errors.insert("mobile", "Mobile number is required");
    } else if !MOBILE_PATTERN.is_match(mobile) {
        errors.insert("mobile", "Please enter a valid 10-digit mobile number");
    }

    let email = form.email.trim();
    if !email.is_empty() && !EMAIL_PATTERN.is_match(email) {
        errors.insert("email", "Please enter a valid email address");
    }

    errors
}

/// What the enquiry is about, supplied by the page it was sent from
#[derive(Debug, Clone, Default)]
pub struct EnquiryContext {
    pub kind: EnquiryType,
    pub machine: Option<MachineSnapshot>,
    pub part: Option<String>,
    /// Absolute URL of the page the visitor was on
    pub source: Option<String>,
}

impl EnquiryContext {
    pub fn contact() -> Self {
        Self::default()
    }
}

#[derive(Debug, thiserror::Error)]
pub enum SubmitError {
    #[error("Enquiry form has {} invalid field(s)", .0.len())]
    Invalid(FieldErrors),
    #[error("Failed to store enquiry: {0}")]
    Backend(#[from] BackendError),
}

/// A stored enquiry and the link that hands it to WhatsApp
#[derive(Debug, Clone)]
pub struct Submission {
    pub enquiry: Enquiry,
    pub whatsapp_url: String,
}

pub struct EnquiryService {
    backend: Arc<dyn Backend>,
    admin_phone: String,
    require_message: bool,
}

impl EnquiryService {
    pub fn new(backend: Arc<dyn Backend>, admin_phone: impl Into<String>, require_message: bool) -> Self {
        Self {
            backend,
            admin_phone: admin_phone.into(),
            require_message,
        }
    }

    pub fn require_message(&self) -> bool {
        self.require_message
    }

    pub fn validate(&self, form: &EnquiryForm) -> FieldErrors {
        validate(form, self.require_message)
    }

    /// Validate, persist, then build the WhatsApp link
    pub async fn submit(
        &self,
        form: &EnquiryForm,
        context: EnquiryContext,
    ) -> Result<Submission, SubmitError> {
        let errors = self.validate(form);
        if !errors.is_empty() {
            return Err(SubmitError::Invalid(errors));
        }

        let enquiry = build_enquiry(form, context);
        self.backend.submit_enquiry(&enquiry).await?;

        tracing::info!("Enquiry stored: type={}", enquiry.kind);
        let whatsapp_url = whatsapp::chat_link(&self.admin_phone, &whatsapp::enquiry_message(&enquiry));
        Ok(Submission {
            enquiry,
            whatsapp_url,
        })
    }
}

/// Payload sent to the backend: trimmed form fields plus page context
fn build_enquiry(form: &EnquiryForm, context: EnquiryContext) -> Enquiry {
    let email = form.email.trim();
    Enquiry {
        id: String::new(),
        kind: context.kind,
        name: form.name.trim().to_string(),
        mobile: form.mobile.trim().to_string(),
        email: (!email.is_empty()).then(|| email.to_string()),
        message: form.message.trim().to_string(),
        machine: context.machine.unwrap_or_default(),
        part: context.part,
        source: context.source,
        created_at: Some(Utc::now().to_rfc3339_opts(SecondsFormat::Secs, true)),
        read: false,
    }
}
