//! Template engine error types

use thiserror::Error;

#[derive(Debug, Error)]
pub enum ThemeError {
    /// Template missing from the embedded set
    #[error("Template not found: {0}")]
    NotFound(String),

    /// Template failed to parse or render
    #[error("Template error: {0}")]
    TemplateError(String),

    #[error("IO error: {0}")]
    IoError(#[from] std::io::Error),
}
