//! Configuration management
//!
//! This module handles loading and parsing configuration for the Heavy Horizon site.
//! Configuration can be loaded from:
//! - config.yml file
//! - Environment variables (override file settings)
//!
//! Missing optional values are filled with sensible defaults.

use serde::{Deserialize, Serialize};
use std::path::PathBuf;

/// Main configuration structure
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct Config {
    /// Server configuration
    #[serde(default)]
    pub server: ServerConfig,
    /// Backend REST API configuration
    #[serde(default)]
    pub backend: BackendConfig,
    /// Public site details
    #[serde(default)]
    pub site: SiteConfig,
    /// WhatsApp hand-off configuration
    #[serde(default)]
    pub whatsapp: WhatsAppConfig,
    /// Enquiry form rules
    #[serde(default)]
    pub enquiry: EnquiryConfig,
    /// Admin session settings
    #[serde(default)]
    pub admin: AdminConfig,
    /// Template override configuration
    #[serde(default)]
    pub theme: ThemeConfig,
    /// Upload configuration
    #[serde(default)]
    pub upload: UploadConfig,
}

/// Server configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ServerConfig {
    /// Host address to bind to
    #[serde(default = "default_host")]
    pub host: String,
    /// Port to listen on
    #[serde(default = "default_port")]
    pub port: u16,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            host: default_host(),
            port: default_port(),
        }
    }
}

fn default_host() -> String {
    "0.0.0.0".to_string()
}

fn default_port() -> u16 {
    8080
}

/// Backend configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct BackendConfig {
    /// Backend driver (http or memory)
    #[serde(default)]
    pub driver: BackendDriver,
    /// Base URL of the REST API
    #[serde(default = "default_base_url")]
    pub base_url: String,
    /// Request timeout in seconds
    #[serde(default = "default_timeout_secs")]
    pub timeout_secs: u64,
}

impl Default for BackendConfig {
    fn default() -> Self {
        Self {
            driver: BackendDriver::default(),
            base_url: default_base_url(),
            timeout_secs: default_timeout_secs(),
        }
    }
}

fn default_base_url() -> String {
    "http://127.0.0.1:5000".to_string()
}

fn default_timeout_secs() -> u64 {
    30
}

/// Backend driver type
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
#[serde(rename_all = "lowercase")]
pub enum BackendDriver {
    /// Remote REST API (default)
    #[default]
    Http,
    /// In-process store seeded with sample listings
    Memory,
}

/// Public site details shown in page chrome
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SiteConfig {
    #[serde(default = "default_site_name")]
    pub name: String,
    #[serde(default = "default_tagline")]
    pub tagline: String,
    #[serde(default = "default_phone_display")]
    pub phone_display: String,
    #[serde(default = "default_email")]
    pub email: String,
    #[serde(default = "default_address")]
    pub address: String,
    /// Absolute origin used when building source links for enquiries
    #[serde(default = "default_public_url")]
    pub public_url: String,
    /// Offset from UTC used to display dates (minutes, +330 is IST)
    #[serde(default = "default_utc_offset_minutes")]
    pub utc_offset_minutes: i32,
}

impl Default for SiteConfig {
    fn default() -> Self {
        Self {
            name: default_site_name(),
            tagline: default_tagline(),
            phone_display: default_phone_display(),
            email: default_email(),
            address: default_address(),
            public_url: default_public_url(),
            utc_offset_minutes: default_utc_offset_minutes(),
        }
    }
}

fn default_site_name() -> String {
    "Heavy Horizon".to_string()
}

fn default_tagline() -> String {
    "Earthmoving equipment for rent and sale".to_string()
}

fn default_phone_display() -> String {
    "+91 63794 32565".to_string()
}

fn default_email() -> String {
    "info@heavyhorizon.in".to_string()
}

fn default_address() -> String {
    "Chennai, Tamil Nadu".to_string()
}

fn default_public_url() -> String {
    "http://localhost:8080".to_string()
}

fn default_utc_offset_minutes() -> i32 {
    330
}

/// WhatsApp configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct WhatsAppConfig {
    /// Admin phone in international format without the plus sign
    #[serde(default = "default_admin_phone")]
    pub admin_phone: String,
}

impl Default for WhatsAppConfig {
    fn default() -> Self {
        Self {
            admin_phone: default_admin_phone(),
        }
    }
}

fn default_admin_phone() -> String {
    "916379432565".to_string()
}

/// Enquiry form configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct EnquiryConfig {
    /// Whether the message field must be filled in
    #[serde(default = "default_true")]
    pub require_message: bool,
}

impl Default for EnquiryConfig {
    fn default() -> Self {
        Self {
            require_message: true,
        }
    }
}

fn default_true() -> bool {
    true
}

/// Admin configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AdminConfig {
    /// Lifetime of the admin session cookie
    #[serde(default = "default_session_hours")]
    pub session_hours: u64,
}

impl Default for AdminConfig {
    fn default() -> Self {
        Self {
            session_hours: default_session_hours(),
        }
    }
}

fn default_session_hours() -> u64 {
    8
}

/// Theme configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ThemeConfig {
    /// Directory whose templates override the embedded ones (ignored when missing)
    #[serde(default = "default_theme_path")]
    pub path: PathBuf,
}

impl Default for ThemeConfig {
    fn default() -> Self {
        Self {
            path: default_theme_path(),
        }
    }
}

fn default_theme_path() -> PathBuf {
    PathBuf::from("themes/active")
}

/// Upload configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct UploadConfig {
    /// Maximum images attached to one listing
    #[serde(default = "default_max_images")]
    pub max_images: usize,
    /// Maximum file size in bytes (default: 10MB)
    #[serde(default = "default_max_file_size")]
    pub max_file_size: u64,
    /// Maximum admin form body in bytes (default: 60MB)
    #[serde(default = "default_max_request_size")]
    pub max_request_size: usize,
    /// Allowed image MIME types
    #[serde(default = "default_allowed_types")]
    pub allowed_types: Vec<String>,
}

impl Default for UploadConfig {
    fn default() -> Self {
        Self {
            max_images: default_max_images(),
            max_file_size: default_max_file_size(),
            max_request_size: default_max_request_size(),
            allowed_types: default_allowed_types(),
        }
    }
}

fn default_max_images() -> usize {
    10
}

fn default_max_file_size() -> u64 {
    10 * 1024 * 1024 // 10MB
}

fn default_max_request_size() -> usize {
    60 * 1024 * 1024 // 60MB
}

fn default_allowed_types() -> Vec<String> {
    vec![
        "image/jpeg".to_string(),
        "image/png".to_string(),
        "image/gif".to_string(),
        "image/webp".to_string(),
    ]
}

impl UploadConfig {
    /// Check if a MIME type is allowed
    pub fn is_type_allowed(&self, mime_type: &str) -> bool {
        self.allowed_types.iter().any(|t| t == mime_type)
    }
}

/// Error type for configuration parsing
#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("Failed to read config file '{path}': {source}")]
    FileRead {
        path: String,
        source: std::io::Error,
    },
    #[error("Failed to parse config file '{path}': {message}")]
    ParseError {
        path: String,
        message: String,
    },
    #[error("Invalid configuration: {0}")]
    ValidationError(String),
}

impl Config {
    /// Load configuration from file
    ///
    /// If the file doesn't exist, returns default configuration.
    /// If the file exists but is invalid YAML, returns an error with details.
    pub fn load(path: &std::path::Path) -> anyhow::Result<Self> {
        if !path.exists() {
            return Ok(Self::default());
        }

        let content = std::fs::read_to_string(path).map_err(|e| ConfigError::FileRead {
            path: path.display().to_string(),
            source: e,
        })?;

        if content.trim().is_empty() {
            return Ok(Self::default());
        }

        let config: Config = serde_yaml::from_str(&content).map_err(|e| {
            ConfigError::ParseError {
                path: path.display().to_string(),
                message: format_yaml_error(&e),
            }
        })?;

        Ok(config)
    }

    /// Load configuration from file with environment variable overrides
    ///
    /// Environment variables follow the pattern:
    /// - HEAVY_HORIZON_SERVER_HOST
    /// - HEAVY_HORIZON_SERVER_PORT
    /// - HEAVY_HORIZON_BACKEND_DRIVER
    /// - HEAVY_HORIZON_BACKEND_BASE_URL
    /// - HEAVY_HORIZON_BACKEND_TIMEOUT_SECS
    /// - HEAVY_HORIZON_SITE_PUBLIC_URL
    /// - HEAVY_HORIZON_WHATSAPP_ADMIN_PHONE
    /// - HEAVY_HORIZON_ENQUIRY_REQUIRE_MESSAGE
    /// - HEAVY_HORIZON_THEME_PATH
    ///
    /// The result is validated before it is returned.
    pub fn load_with_env(path: &std::path::Path) -> anyhow::Result<Self> {
        let mut config = Self::load(path)?;
        config.apply_env_overrides();
        config.validate()?;
        Ok(config)
    }

    /// Apply environment variable overrides to the configuration
    fn apply_env_overrides(&mut self) {
        // Server configuration
        if let Ok(host) = std::env::var("HEAVY_HORIZON_SERVER_HOST") {
            self.server.host = host;
        }
        if let Ok(port) = std::env::var("HEAVY_HORIZON_SERVER_PORT") {
            if let Ok(port) = port.parse::<u16>() {
                self.server.port = port;
            }
        }

        // Backend configuration
        if let Ok(driver) = std::env::var("HEAVY_HORIZON_BACKEND_DRIVER") {
            match driver.to_lowercase().as_str() {
                "http" => self.backend.driver = BackendDriver::Http,
                "memory" => self.backend.driver = BackendDriver::Memory,
                _ => {} // Ignore invalid values
            }
        }
        if let Ok(url) = std::env::var("HEAVY_HORIZON_BACKEND_BASE_URL") {
            self.backend.base_url = url;
        }
        if let Ok(timeout) = std::env::var("HEAVY_HORIZON_BACKEND_TIMEOUT_SECS") {
            if let Ok(timeout) = timeout.parse::<u64>() {
                self.backend.timeout_secs = timeout;
            }
        }

        // Site configuration
        if let Ok(url) = std::env::var("HEAVY_HORIZON_SITE_PUBLIC_URL") {
            self.site.public_url = url;
        }

        // WhatsApp configuration
        if let Ok(phone) = std::env::var("HEAVY_HORIZON_WHATSAPP_ADMIN_PHONE") {
            self.whatsapp.admin_phone = phone;
        }

        // Enquiry configuration
        if let Ok(required) = std::env::var("HEAVY_HORIZON_ENQUIRY_REQUIRE_MESSAGE") {
            if let Ok(required) = required.parse::<bool>() {
                self.enquiry.require_message = required;
            }
        }

        // Theme configuration
        if let Ok(path) = std::env::var("HEAVY_HORIZON_THEME_PATH") {
            self.theme.path = PathBuf::from(path);
        }
    }

    /// Reject values the site cannot run with
    pub fn validate(&self) -> Result<(), ConfigError> {
        let phone = &self.whatsapp.admin_phone;
        if phone.is_empty() || !phone.chars().all(|c| c.is_ascii_digit()) {
            return Err(ConfigError::ValidationError(format!(
                "whatsapp.admin_phone must contain only digits, got '{}'",
                phone
            )));
        }

        if self.backend.driver == BackendDriver::Http
            && !(self.backend.base_url.starts_with("http://")
                || self.backend.base_url.starts_with("https://"))
        {
            return Err(ConfigError::ValidationError(format!(
                "backend.base_url must be an http(s) URL, got '{}'",
                self.backend.base_url
            )));
        }

        if self.upload.max_images == 0 {
            return Err(ConfigError::ValidationError(
                "upload.max_images must be at least 1".to_string(),
            ));
        }

        Ok(())
    }
}

/// Format YAML parsing error with location and context
fn format_yaml_error(e: &serde_yaml::Error) -> String {
    if let Some(location) = e.location() {
        format!(
            "at line {}, column {}: {}",
            location.line(),
            location.column(),
            e
        )
    } else {
        e.to_string()
    }
}

// Shared mutex for all config tests that modify environment variables.
#[cfg(test)]
static CONFIG_ENV_MUTEX: std::sync::Mutex<()> = std::sync::Mutex::new(());

#[cfg(test)]
const ENV_VARS: &[&str] = &[
    "HEAVY_HORIZON_SERVER_HOST",
    "HEAVY_HORIZON_SERVER_PORT",
    "HEAVY_HORIZON_BACKEND_DRIVER",
    "HEAVY_HORIZON_BACKEND_BASE_URL",
    "HEAVY_HORIZON_BACKEND_TIMEOUT_SECS",
    "HEAVY_HORIZON_SITE_PUBLIC_URL",
    "HEAVY_HORIZON_WHATSAPP_ADMIN_PHONE",
    "HEAVY_HORIZON_ENQUIRY_REQUIRE_MESSAGE",
    "HEAVY_HORIZON_THEME_PATH",
];

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;
    use tempfile::NamedTempFile;

    fn lock_env() -> std::sync::MutexGuard<'static, ()> {
        let guard = super::CONFIG_ENV_MUTEX.lock().unwrap_or_else(|e| e.into_inner());
        for var in super::ENV_VARS {
            std::env::remove_var(var);
        }
        guard
    }

    #[test]
    fn test_load_missing_file_returns_defaults() {
        let path = std::path::Path::new("nonexistent_config.yml");
        let config = Config::load(path).unwrap();

        assert_eq!(config.server.host, "0.0.0.0");
        assert_eq!(config.server.port, 8080);
        assert_eq!(config.backend.driver, BackendDriver::Http);
        assert_eq!(config.backend.base_url, "http://127.0.0.1:5000");
        assert_eq!(config.whatsapp.admin_phone, "916379432565");
        assert_eq!(config.site.utc_offset_minutes, 330);
        assert!(config.enquiry.require_message);
        assert_eq!(config.upload.max_images, 10);
    }

    #[test]
    fn test_load_empty_file_returns_defaults() {
        let mut file = NamedTempFile::new().unwrap();
        write!(file, "   \n").unwrap();

        let config = Config::load(file.path()).unwrap();
        assert_eq!(config.server.port, 8080);
        assert_eq!(config.site.name, "Heavy Horizon");
    }

    #[test]
    fn test_load_partial_config_fills_defaults() {
        let mut file = NamedTempFile::new().unwrap();
        write!(file, "server:\n  port: 3000\nbackend:\n  driver: memory\n").unwrap();

        let config = Config::load(file.path()).unwrap();
        assert_eq!(config.server.port, 3000);
        assert_eq!(config.server.host, "0.0.0.0");
        assert_eq!(config.backend.driver, BackendDriver::Memory);
        assert_eq!(config.backend.timeout_secs, 30);
        assert_eq!(config.admin.session_hours, 8);
    }

    #[test]
    fn test_load_full_config() {
        let mut file = NamedTempFile::new().unwrap();
        write!(
            file,
            r#"
server:
  host: 127.0.0.1
  port: 9000
backend:
  driver: http
  base_url: https://api.example.com
  timeout_secs: 5
site:
  name: Test Works
  public_url: https://example.com
  utc_offset_minutes: 0
whatsapp:
  admin_phone: "15550001111"
enquiry:
  require_message: false
upload:
  max_images: 4
  allowed_types: [image/png]
"#
        )
        .unwrap();

        let config = Config::load(file.path()).unwrap();
        assert_eq!(config.server.host, "127.0.0.1");
        assert_eq!(config.server.port, 9000);
        assert_eq!(config.backend.base_url, "https://api.example.com");
        assert_eq!(config.backend.timeout_secs, 5);
        assert_eq!(config.site.name, "Test Works");
        assert_eq!(config.site.utc_offset_minutes, 0);
        assert_eq!(config.whatsapp.admin_phone, "15550001111");
        assert!(!config.enquiry.require_message);
        assert_eq!(config.upload.max_images, 4);
        assert!(config.upload.is_type_allowed("image/png"));
        assert!(!config.upload.is_type_allowed("image/jpeg"));
    }

    #[test]
    fn test_load_invalid_yaml_returns_error() {
        let mut file = NamedTempFile::new().unwrap();
        write!(file, "server:\n  port: not_a_port\n").unwrap();

        let err = Config::load(file.path()).unwrap_err();
        let message = err.to_string();
        assert!(message.contains("Failed to parse config file"));
        assert!(message.contains("line"));
    }

    #[test]
    fn test_env_override_server_and_backend() {
        let _guard = lock_env();

        let mut file = NamedTempFile::new().unwrap();
        write!(file, "server:\n  port: 8080\n").unwrap();

        std::env::set_var("HEAVY_HORIZON_SERVER_HOST", "10.0.0.1");
        std::env::set_var("HEAVY_HORIZON_SERVER_PORT", "9999");
        std::env::set_var("HEAVY_HORIZON_BACKEND_DRIVER", "MEMORY");
        std::env::set_var("HEAVY_HORIZON_BACKEND_BASE_URL", "https://api.test");
        std::env::set_var("HEAVY_HORIZON_WHATSAPP_ADMIN_PHONE", "919999999999");
        std::env::set_var("HEAVY_HORIZON_ENQUIRY_REQUIRE_MESSAGE", "false");

        let config = Config::load_with_env(file.path()).unwrap();

        assert_eq!(config.server.host, "10.0.0.1");
        assert_eq!(config.server.port, 9999);
        assert_eq!(config.backend.driver, BackendDriver::Memory);
        assert_eq!(config.backend.base_url, "https://api.test");
        assert_eq!(config.whatsapp.admin_phone, "919999999999");
        assert!(!config.enquiry.require_message);

        for var in super::ENV_VARS {
            std::env::remove_var(var);
        }
    }

    #[test]
    fn test_env_override_invalid_values_ignored() {
        let _guard = lock_env();

        let mut file = NamedTempFile::new().unwrap();
        write!(file, "server:\n  port: 8080\nbackend:\n  driver: http\n").unwrap();

        std::env::set_var("HEAVY_HORIZON_SERVER_PORT", "not_a_number");
        std::env::set_var("HEAVY_HORIZON_BACKEND_DRIVER", "carrier_pigeon");
        std::env::set_var("HEAVY_HORIZON_ENQUIRY_REQUIRE_MESSAGE", "maybe");

        let config = Config::load_with_env(file.path()).unwrap();

        assert_eq!(config.server.port, 8080);
        assert_eq!(config.backend.driver, BackendDriver::Http);
        assert!(config.enquiry.require_message);

        for var in super::ENV_VARS {
            std::env::remove_var(var);
        }
    }

    #[test]
    fn test_validate_rejects_bad_phone() {
        let mut config = Config::default();
        config.whatsapp.admin_phone = "+91 63794".to_string();
        assert!(matches!(config.validate(), Err(ConfigError::ValidationError(_))));

        config.whatsapp.admin_phone = String::new();
        assert!(config.validate().is_err());
    }

    #[test]
    fn test_validate_rejects_bad_base_url_for_http_only() {
        let mut config = Config::default();
        config.backend.base_url = "ftp://api".to_string();
        assert!(config.validate().is_err());

        config.backend.driver = BackendDriver::Memory;
        assert!(config.validate().is_ok());
    }

    #[test]
    fn test_validate_rejects_zero_image_limit() {
        let mut config = Config::default();
        config.upload.max_images = 0;
        assert!(config.validate().is_err());
    }
}

/// Property-based tests for configuration parsing
#[cfg(test)]
mod property_tests {
    use super::*;
    use proptest::prelude::*;
    use std::io::Write;
    use tempfile::NamedTempFile;

    fn lock_env() -> std::sync::MutexGuard<'static, ()> {
        super::CONFIG_ENV_MUTEX.lock().unwrap_or_else(|e| e.into_inner())
    }

    fn valid_host_strategy() -> impl Strategy<Value = String> {
        prop_oneof![
            (0u8..=255, 0u8..=255, 0u8..=255, 0u8..=255)
                .prop_map(|(a, b, c, d)| format!("{}.{}.{}.{}", a, b, c, d)),
            Just("localhost".to_string()),
            Just("0.0.0.0".to_string()),
            "[a-z][a-z0-9]{0,10}".prop_map(|s| s),
        ]
    }

    fn valid_config_strategy() -> impl Strategy<Value = Config> {
        (
            valid_host_strategy(),
            1u16..=65535,
            prop_oneof![Just(BackendDriver::Http), Just(BackendDriver::Memory)],
            "https?://[a-z]{1,10}(\\.[a-z]{2,3})?(:[0-9]{2,4})?",
            "[0-9]{8,13}",
            any::<bool>(),
            1usize..=20,
        )
            .prop_map(|(host, port, driver, base_url, phone, require_message, max_images)| {
                let mut config = Config::default();
                config.server.host = host;
                config.server.port = port;
                config.backend.driver = driver;
                config.backend.base_url = base_url;
                config.whatsapp.admin_phone = phone;
                config.enquiry.require_message = require_message;
                config.upload.max_images = max_images;
                config
            })
    }

    fn partial_config_yaml_strategy() -> impl Strategy<Value = String> {
        prop_oneof![
            (1u16..=65535).prop_map(|p| format!("server:\n  port: {}\n", p)),
            Just("backend:\n  driver: memory\n".to_string()),
            Just("site:\n  name: Demo\n".to_string()),
            Just("upload:\n  max_images: 3\n".to_string()),
            Just("whatsapp: {}\n".to_string()),
        ]
    }

    proptest! {
        #![proptest_config(ProptestConfig::with_cases(20))]

        /// Serializing a valid config and parsing it back yields the same values.
        #[test]
        fn config_yaml_roundtrip(config in valid_config_strategy()) {
            let yaml = serde_yaml::to_string(&config).expect("Failed to serialize config");

            let mut file = NamedTempFile::new().expect("Failed to create temp file");
            write!(file, "{}", yaml).expect("Failed to write config");

            let parsed = Config::load(file.path()).expect("Failed to parse config");

            prop_assert_eq!(&config.server.host, &parsed.server.host);
            prop_assert_eq!(config.server.port, parsed.server.port);
            prop_assert_eq!(config.backend.driver, parsed.backend.driver);
            prop_assert_eq!(&config.backend.base_url, &parsed.backend.base_url);
            prop_assert_eq!(&config.whatsapp.admin_phone, &parsed.whatsapp.admin_phone);
            prop_assert_eq!(config.enquiry.require_message, parsed.enquiry.require_message);
            prop_assert_eq!(config.upload.max_images, parsed.upload.max_images);
            prop_assert!(parsed.validate().is_ok());
        }

        /// Files missing sections are completed with defaults.
        #[test]
        fn config_default_filling(yaml in partial_config_yaml_strategy()) {
            let mut file = NamedTempFile::new().expect("Failed to create temp file");
            write!(file, "{}", yaml).expect("Failed to write config");

            let config = Config::load(file.path()).expect("Failed to parse config");

            prop_assert!(!config.server.host.is_empty());
            prop_assert!(config.server.port > 0);
            prop_assert!(!config.backend.base_url.is_empty());
            prop_assert!(!config.whatsapp.admin_phone.is_empty());
            prop_assert!(config.upload.max_images > 0);
        }

        /// Any numeric port override replaces the file value.
        #[test]
        fn env_port_override_wins(port in 1u16..=65535) {
            let _guard = lock_env();
            for var in super::ENV_VARS {
                std::env::remove_var(var);
            }

            let mut file = NamedTempFile::new().expect("Failed to create temp file");
            write!(file, "server:\n  port: 8080\n").expect("Failed to write config");

            std::env::set_var("HEAVY_HORIZON_SERVER_PORT", port.to_string());
            let config = Config::load_with_env(file.path()).expect("Failed to load config");
            std::env::remove_var("HEAVY_HORIZON_SERVER_PORT");

            prop_assert_eq!(config.server.port, port);
        }
    }
}
