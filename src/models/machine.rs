//! Machine listing model

use serde::{Deserialize, Serialize};

use super::image::{normalize_images, ImageSource};
use super::lenient;

/// Equipment category
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, Default)]
pub enum MachineCategory {
    #[serde(rename = "Backhoe Loader")]
    BackhoeLoader,
    #[serde(rename = "Excavator")]
    Excavator,
    #[serde(rename = "Backhoe Loader with Breaker")]
    BackhoeBreaker,
    /// Category text this site does not know about
    #[default]
    #[serde(other)]
    Unknown,
}

impl MachineCategory {
    pub const ALL: [MachineCategory; 3] = [
        MachineCategory::BackhoeLoader,
        MachineCategory::Excavator,
        MachineCategory::BackhoeBreaker,
    ];

    /// Name stored by the backend and shown to visitors
    pub fn label(&self) -> &'static str {
        match self {
            Self::BackhoeLoader => "Backhoe Loader",
            Self::Excavator => "Excavator",
            Self::BackhoeBreaker => "Backhoe Loader with Breaker",
            Self::Unknown => "Other",
        }
    }

    /// URL segment used by the catalog routes
    pub fn slug(&self) -> &'static str {
        match self {
            Self::BackhoeLoader => "backhoe-loaders",
            Self::Excavator => "excavators",
            Self::BackhoeBreaker => "backhoe-breakers",
            Self::Unknown => "other",
        }
    }

    pub fn from_slug(slug: &str) -> Option<Self> {
        Self::ALL.into_iter().find(|c| c.slug() == slug)
    }

    /// Prefix of generated machine codes
    pub fn code_prefix(&self) -> Option<&'static str> {
        match self {
            Self::BackhoeLoader => Some("BL"),
            Self::Excavator => Some("EXE"),
            Self::BackhoeBreaker => Some("BLB"),
            Self::Unknown => None,
        }
    }
}

impl std::fmt::Display for MachineCategory {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.label())
    }
}

impl std::str::FromStr for MachineCategory {
    type Err = anyhow::Error;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let s = s.trim();
        Self::ALL
            .into_iter()
            .find(|c| c.label().eq_ignore_ascii_case(s) || c.slug() == s)
            .ok_or_else(|| anyhow::anyhow!("Invalid machine category: {}", s))
    }
}

/// Whether a listing is for hire or for sale
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Purpose {
    Rental,
    Sales,
}

impl Purpose {
    /// Section of the site listing this purpose
    pub fn section_path(&self) -> &'static str {
        match self {
            Self::Rental => "/services",
            Self::Sales => "/sales",
        }
    }

    /// Label of the section this purpose lives in
    pub fn section_label(&self) -> &'static str {
        match self {
            Self::Rental => "Our Services",
            Self::Sales => "Sales",
        }
    }
}

impl std::fmt::Display for Purpose {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Rental => write!(f, "Rental"),
            Self::Sales => write!(f, "Sales"),
        }
    }
}

impl std::str::FromStr for Purpose {
    type Err = anyhow::Error;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_lowercase().as_str() {
            "rental" | "rent" => Ok(Self::Rental),
            "sales" | "sale" => Ok(Self::Sales),
            _ => Err(anyhow::anyhow!("Invalid purpose: {}", s)),
        }
    }
}

/// Stock status
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
pub enum MachineStatus {
    #[default]
    Available,
    Sold,
    Unavailable,
}

impl std::fmt::Display for MachineStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Available => write!(f, "Available"),
            Self::Sold => write!(f, "Sold"),
            Self::Unavailable => write!(f, "Unavailable"),
        }
    }
}

impl std::str::FromStr for MachineStatus {
    type Err = anyhow::Error;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_lowercase().as_str() {
            "available" => Ok(Self::Available),
            "sold" => Ok(Self::Sold),
            "unavailable" => Ok(Self::Unavailable),
            _ => Err(anyhow::anyhow!("Invalid machine status: {}", s)),
        }
    }
}

/// Machine listing as stored by the backend
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Machine {
    #[serde(rename = "_id", default, skip_serializing_if = "String::is_empty")]
    pub id: String,
    /// Brand and name, e.g. "JCB 3DX"
    #[serde(default)]
    pub title: String,
    #[serde(default)]
    pub category: MachineCategory,
    #[serde(
        rename = "type",
        default,
        skip_serializing_if = "Option::is_none",
        deserialize_with = "lenient::parsed"
    )]
    pub kind: Option<Purpose>,
    /// Older records carry the purpose under this name
    #[serde(
        rename = "purpose",
        default,
        skip_serializing_if = "Option::is_none",
        deserialize_with = "lenient::parsed"
    )]
    pub legacy_purpose: Option<Purpose>,
    #[serde(default)]
    pub model: String,
    #[serde(default, deserialize_with = "lenient::number")]
    pub year: u32,
    #[serde(default, deserialize_with = "lenient::number")]
    pub hours: u32,
    /// Rich-text description written in the admin editor
    #[serde(default)]
    pub condition: String,
    #[serde(default)]
    pub location: String,
    #[serde(rename = "machineCode", default, skip_serializing_if = "Option::is_none")]
    pub machine_code: Option<String>,
    #[serde(default, deserialize_with = "lenient::parsed_or_default")]
    pub status: MachineStatus,
    #[serde(default, skip_serializing_if = "ImageSource::is_none")]
    pub images: ImageSource,
    /// Legacy single image
    #[serde(default, skip_serializing_if = "ImageSource::is_none")]
    pub image: ImageSource,
}

impl Machine {
    /// Purpose from `type`, falling back to the legacy field
    pub fn purpose(&self) -> Option<Purpose> {
        self.kind.or(self.legacy_purpose)
    }

    /// Listed in the sales section when either purpose field says Sales
    pub fn for_sale(&self) -> bool {
        self.kind == Some(Purpose::Sales) || self.legacy_purpose == Some(Purpose::Sales)
    }

    /// `images` when present, otherwise the legacy `image`
    pub fn image_source(&self) -> &ImageSource {
        if self.images.is_none() {
            &self.image
        } else {
            &self.images
        }
    }

    pub fn image_urls(&self) -> Vec<String> {
        normalize_images(self.image_source())
    }

    /// Human-facing code, empty when none was assigned
    pub fn code(&self) -> &str {
        self.machine_code.as_deref().unwrap_or("")
    }
}

/// Parse a code of the form `PREFIX-NNNN`
///
/// Legacy `EX-` codes are read as excavator codes.
fn parse_machine_code(code: &str) -> Option<(&str, u32)> {
    let (prefix, number) = code.trim().split_once('-')?;
    let prefix = if prefix == "EX" { "EXE" } else { prefix };
    Some((prefix, number.parse().ok()?))
}

/// Next free code for `category` given the codes already in use
///
/// `None` when the category has no prefix or the counter is exhausted.
pub fn next_machine_code<'a>(
    category: MachineCategory,
    existing: impl IntoIterator<Item = &'a str>,
) -> Option<String> {
    let prefix = category.code_prefix()?;
    let highest = existing
        .into_iter()
        .filter_map(parse_machine_code)
        .filter(|(p, _)| *p == prefix)
        .map(|(_, n)| n)
        .max()
        .unwrap_or(0);
    let next = highest.checked_add(1)?;
    Some(format!("{}-{:04}", prefix, next))
}
