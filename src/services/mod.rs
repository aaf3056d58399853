//! Services layer - site behavior over the backend
//!
//! Services are responsible for:
//! - Shaping backend records into page views
//! - Validating enquiry and admin forms
//! - Building WhatsApp hand-off links

pub mod admin;
pub mod blog;
pub mod carousel;
pub mod catalog;
pub mod enquiry;
pub mod whatsapp;

pub use admin::{AdminError, AdminResult, AdminService};
pub use catalog::{category_info, CatalogService, CategoryInfo, CATEGORIES};
pub use enquiry::{EnquiryContext, EnquiryForm, EnquiryService, FieldErrors, SubmitError};
