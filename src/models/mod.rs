//! Data models
//!
//! This module contains the records exchanged with the backend REST API:
//! - Catalog entities (Machine, Part, BlogPost)
//! - Enquiries and dashboard counters
//! - Image references and their normalization

pub mod image;
mod blog;
mod enquiry;
mod machine;
mod part;

pub use blog::{BlogPost, CreateBlogInput};
pub use enquiry::{DashboardCounts, Enquiry, EnquiryType, MachineSnapshot};
pub use image::{first_image_url, normalize_images, ImageObject, ImageRef, ImageSource};
pub use machine::{next_machine_code, Machine, MachineCategory, MachineStatus, Purpose};
pub use part::{CreatePartInput, Part};

use chrono::{DateTime, Utc};

/// Creation time embedded in a document identifier
///
/// Identifiers issued by the backend start with eight hex digits holding the
/// creation time in Unix seconds.
pub fn id_timestamp(id: &str) -> Option<DateTime<Utc>> {
    let head = id.get(..8)?;
    if !head.chars().all(|c| c.is_ascii_hexdigit()) {
        return None;
    }
    let secs = u32::from_str_radix(head, 16).ok()?;
    DateTime::from_timestamp(i64::from(secs), 0)
}

/// Deserializers that tolerate loosely typed backend fields
pub(crate) mod lenient {
    use serde::{Deserialize, Deserializer};
    use serde_json::Value;
    use std::str::FromStr;

    /// String field parsed with `FromStr`; anything unparsable is `None`
    pub fn parsed<'de, D, T>(deserializer: D) -> Result<Option<T>, D::Error>
    where
        D: Deserializer<'de>,
        T: FromStr,
    {
        Ok(match Value::deserialize(deserializer)? {
            Value::String(s) => s.parse().ok(),
            _ => None,
        })
    }

    pub fn parsed_or_default<'de, D, T>(deserializer: D) -> Result<T, D::Error>
    where
        D: Deserializer<'de>,
        T: FromStr + Default,
    {
        Ok(parsed(deserializer)?.unwrap_or_default())
    }

    /// Whole number sent as a JSON number or a numeric string; 0 otherwise
    pub fn number<'de, D>(deserializer: D) -> Result<u32, D::Error>
    where
        D: Deserializer<'de>,
    {
        let value = match Value::deserialize(deserializer)? {
            Value::Number(n) => n.as_f64(),
            Value::String(s) => s.trim().parse::<f64>().ok(),
            _ => None,
        };
        Ok(value
            .filter(|v| v.is_finite() && *v >= 0.0)
            .map(|v| v.min(f64::from(u32::MAX)) as u32)
            .unwrap_or(0))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_id_timestamp_from_object_id() {
        let ts = id_timestamp("507f1f77bcf86cd799439011").unwrap();
        assert_eq!(ts.timestamp(), 0x507f1f77);
        assert_eq!(ts.to_rfc3339(), "2012-10-17T21:13:27+00:00");
    }

    #[test]
    fn test_id_timestamp_rejects_non_hex_and_short_ids() {
        assert!(id_timestamp("zzzzzzzz1234").is_none());
        assert!(id_timestamp("abc").is_none());
        assert!(id_timestamp("").is_none());
    }
}
