//! WhatsApp deep links
//!
//! Links have the form `https://wa.me/<digits>?text=<percent-encoded UTF-8>`.
//! Only unreserved characters (`A-Z a-z 0-9 - _ . ~`) survive unencoded.

use crate::models::{Enquiry, EnquiryType, Machine, Purpose};

const WA_ME: &str = "https://wa.me/";

/// Link opening a chat with `phone`, prefilled with `message`
pub fn chat_link(phone: &str, message: &str) -> String {
    format!("{}{}?text={}", WA_ME, phone, urlencoding::encode(message))
}

/// Link for replying to a visitor, without prefilled text
///
/// Returns `None` when the mobile number has no digits.
pub fn reply_link(mobile: &str) -> Option<String> {
    let digits: String = mobile.chars().filter(char::is_ascii_digit).collect();
    (!digits.is_empty()).then(|| format!("{}{}", WA_ME, digits))
}

/// Text sent to the admin after an enquiry was stored
pub fn enquiry_message(enquiry: &Enquiry) -> String {
    let email = enquiry.email.as_deref().filter(|e| !e.is_empty()).unwrap_or("N/A");

    if enquiry.kind == EnquiryType::Contact {
        return format!(
            "New Enquiry from Website:\n\nName: {}\nMessage: {}\nMobile: {}\nEmail: {}",
            enquiry.name, enquiry.message, enquiry.mobile, email
        );
    }

    let mut text = format!("New {} Enquiry from Website:\n\n", enquiry.kind);
    let snapshot = &enquiry.machine;
    match enquiry.kind {
        EnquiryType::Part => {
            if let Some(part) = &enquiry.part {
                text.push_str(&format!("Part: {}\n", part));
            }
        }
        _ => {
            if let Some(title) = &snapshot.title {
                match &snapshot.category {
                    Some(category) => text.push_str(&format!("Machine: {} ({})\n", title, category)),
                    None => text.push_str(&format!("Machine: {}\n", title)),
                }
            }
            if let Some(model) = &snapshot.model {
                text.push_str(&format!("Model: {}\n", model));
            }
            if let Some(code) = &snapshot.machine_code {
                text.push_str(&format!("Code: {}\n", code));
            }
            if let Some(location) = &snapshot.location {
                text.push_str(&format!("Location: {}\n", location));
            }
        }
    }

    text.push_str(&format!(
        "\nName: {}\nMessage: {}\nMobile: {}\nEmail: {}",
        enquiry.name, enquiry.message, enquiry.mobile, email
    ));
    if let Some(source) = enquiry.source.as_deref().filter(|s| !s.is_empty()) {
        text.push_str(&format!("\n\nSource: {}", source));
    }
    text
}

/// Text of the one-tap "interested" link on a machine page
pub fn interest_message(machine: &Machine, purpose: Purpose, source_url: &str) -> String {
    format!(
        "Hi, I'm interested in the {} ({}) - {}.\n\nSource: {}\n\nPlease provide more information.",
        machine.title, machine.category, purpose, source_url
    )
}
