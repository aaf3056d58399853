//! Enquiry (lead) model

use serde::{Deserialize, Serialize};

use super::lenient;
use super::machine::Machine;

/// What an enquiry is about
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, Default)]
pub enum EnquiryType {
    Rental,
    Sales,
    Part,
    #[default]
    Contact,
}

impl EnquiryType {
    pub const ALL: [EnquiryType; 4] = [
        EnquiryType::Rental,
        EnquiryType::Sales,
        EnquiryType::Part,
        EnquiryType::Contact,
    ];

    /// Key of the admin filter tab showing this type
    pub fn filter_key(&self) -> &'static str {
        match self {
            Self::Rental => "rental",
            Self::Sales => "sales",
            Self::Part => "parts",
            Self::Contact => "contact",
        }
    }
}

impl std::fmt::Display for EnquiryType {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Rental => write!(f, "Rental"),
            Self::Sales => write!(f, "Sales"),
            Self::Part => write!(f, "Part"),
            Self::Contact => write!(f, "Contact"),
        }
    }
}

impl std::str::FromStr for EnquiryType {
    type Err = anyhow::Error;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_lowercase().as_str() {
            "rental" | "rent" => Ok(Self::Rental),
            "sales" | "sale" => Ok(Self::Sales),
            "part" | "parts" => Ok(Self::Part),
            "contact" => Ok(Self::Contact),
            _ => Err(anyhow::anyhow!("Invalid enquiry type: {}", s)),
        }
    }
}

/// Machine details copied into an enquiry at submission time
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct MachineSnapshot {
    #[serde(rename = "machine", default, skip_serializing_if = "Option::is_none")]
    pub title: Option<String>,
    #[serde(rename = "machineCode", default, skip_serializing_if = "Option::is_none")]
    pub machine_code: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub brand: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub category: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub model: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub location: Option<String>,
}

fn non_empty(value: &str) -> Option<String> {
    let value = value.trim();
    (!value.is_empty()).then(|| value.to_string())
}

impl From<&Machine> for MachineSnapshot {
    fn from(machine: &Machine) -> Self {
        Self {
            title: non_empty(&machine.title),
            machine_code: machine.machine_code.as_deref().and_then(non_empty),
            brand: non_empty(&machine.title),
            category: non_empty(machine.category.label()),
            model: non_empty(&machine.model),
            location: non_empty(&machine.location),
        }
    }
}

/// Enquiry record
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Enquiry {
    #[serde(rename = "_id", default, skip_serializing_if = "String::is_empty")]
    pub id: String,
    #[serde(rename = "type", default, deserialize_with = "lenient::parsed_or_default")]
    pub kind: EnquiryType,
    #[serde(default)]
    pub name: String,
    #[serde(default)]
    pub mobile: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub email: Option<String>,
    #[serde(default)]
    pub message: String,
    #[serde(flatten)]
    pub machine: MachineSnapshot,
    /// Part name for spare part enquiries
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub part: Option<String>,
    /// Page the enquiry was sent from
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub source: Option<String>,
    #[serde(rename = "createdAt", default, skip_serializing_if = "Option::is_none")]
    pub created_at: Option<String>,
    #[serde(default, skip_serializing_if = "std::ops::Not::not")]
    pub read: bool,
}

impl Enquiry {
    /// Machine title or part name
    pub fn item(&self) -> Option<&str> {
        self.machine.title.as_deref().or(self.part.as_deref())
    }
}

/// Totals shown on the admin dashboard
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct DashboardCounts {
    #[serde(default)]
    pub machines: u64,
    #[serde(default)]
    pub parts: u64,
    #[serde(default)]
    pub blogs: u64,
    #[serde(default)]
    pub enquiries: u64,
    #[serde(rename = "totalEnquiries", default, skip_serializing_if = "Option::is_none")]
    pub total_enquiries: Option<u64>,
}

impl DashboardCounts {
    pub fn enquiry_total(&self) -> u64 {
        self.total_enquiries.unwrap_or(self.enquiries)
    }
}
