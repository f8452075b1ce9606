//! Field normalization shared by contact creation, updates and imports.

use once_cell::sync::Lazy;
use regex::Regex;

use crate::errors::{ContactError, ContactResult};

static E164: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"^\+[1-9]\d{1,14}$").expect("valid E.164 pattern"));

static EMAIL: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"^[a-zA-Z0-9._%+-]+@[a-zA-Z0-9.-]+\.[a-zA-Z]{2,}$").expect("valid email pattern")
});

/// Strips formatting characters and returns the number in E.164 form.
/// A leading `00` international prefix becomes `+`.
pub fn normalize_phone(raw: &str) -> ContactResult<String> {
    let stripped: String = raw
        .trim()
        .chars()
        .filter(|c| !matches!(c, ' ' | '-' | '.' | '(' | ')'))
        .collect();

    let normalized = match stripped.strip_prefix("00") {
        Some(rest) => format!("+{}", rest),
        None => stripped,
    };

    if E164.is_match(&normalized) {
        Ok(normalized)
    } else {
        Err(ContactError::Validation(format!(
            "Invalid phone number format: {}",
            raw.trim()
        )))
    }
}

pub fn validate_email(email: &str) -> ContactResult<()> {
    if EMAIL.is_match(email) {
        Ok(())
    } else {
        Err(ContactError::Validation(format!("Invalid email format: {}", email)))
    }
}

/// Empty strings mean "no email"
pub fn normalize_email(email: Option<String>) -> ContactResult<Option<String>> {
    match email.map(|e| e.trim().to_string()).filter(|e| !e.is_empty()) {
        Some(email) => {
            validate_email(&email)?;
            Ok(Some(email))
        }
        None => Ok(None),
    }
}

/// Trims tags, drops empties and duplicates while keeping first-seen order
pub fn normalize_tags(tags: Vec<String>) -> Vec<String> {
    let mut out: Vec<String> = Vec::with_capacity(tags.len());
    for tag in tags {
        let tag = tag.trim();
        if !tag.is_empty() && !out.iter().any(|t| t == tag) {
            out.push(tag.to_string());
        }
    }
    out
}

/// Splits an imported tags cell on `;` or `,`
pub fn split_tags(cell: &str) -> Vec<String> {
    normalize_tags(cell.split([';', ',']).map(str::to_string).collect())
}
