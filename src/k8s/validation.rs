// Copyright 2024-2026 Devbox Contributors
// SPDX-License-Identifier: Apache-2.0

//! Validation functions for environment spec fields.
//!
//! Rejects names the API server would refuse and image references carrying
//! shell metacharacters, before anything touches the cluster.

use std::sync::OnceLock;

use regex::Regex;

/// Maximum allowed length for free-form string fields.
pub const MAX_FIELD_LENGTH: usize = 256;

/// DNS-1123 label: lowercase alphanumerics, interior hyphens only.
const DNS1123_LABEL: &str = r"^[a-z0-9]([-a-z0-9]*[a-z0-9])?$";

/// Validation error types.
#[derive(Debug, Clone, PartialEq)]
pub enum ValidationError {
    /// Field does not match the DNS-1123 label grammar.
    InvalidLabel { field: String, value: String },
    /// Image reference is invalid.
    InvalidImage(String),
    /// Resource quantity is malformed.
    InvalidQuantity { field: String, value: String },
    /// Field exceeds maximum length.
    MaxLengthExceeded { field: String, max: usize },
    /// Field is empty but required.
    EmptyField(String),
}

impl std::fmt::Display for ValidationError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::InvalidLabel { field, value } => {
                write!(f, "Field '{}' must be DNS-1123 compatible: {:?}", field, value)
            }
            Self::InvalidImage(img) => write!(f, "Invalid image reference: {}", img),
            Self::InvalidQuantity { field, value } => {
                write!(f, "Field '{}' is not a resource quantity: {:?}", field, value)
            }
            Self::MaxLengthExceeded { field, max } => {
                write!(f, "Field '{}' exceeds maximum length of {}", field, max)
            }
            Self::EmptyField(field) => write!(f, "Field '{}' cannot be empty", field),
        }
    }
}

impl std::error::Error for ValidationError {}

fn dns1123_regex() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| Regex::new(DNS1123_LABEL).expect("DNS-1123 pattern is valid"))
}

/// Check a value against the DNS-1123 label grammar.
pub fn is_dns1123_label(value: &str) -> bool {
    dns1123_regex().is_match(value)
}

/// Validate a DNS-1123 label field, after lowercasing.
///
/// Returns the lowercased value on success.
pub fn validate_dns1123_label(value: &str, field_name: &str) -> Result<String, ValidationError> {
    if value.is_empty() {
        return Err(ValidationError::EmptyField(field_name.to_string()));
    }

    let lowered = value.to_lowercase();
    if !is_dns1123_label(&lowered) {
        return Err(ValidationError::InvalidLabel {
            field: field_name.to_string(),
            value: value.to_string(),
        });
    }

    Ok(lowered)
}

/// Validate a container image reference.
///
/// Rejects shell metacharacters and invalid name formats.
pub fn validate_image(image: &str) -> Result<(), ValidationError> {
    if image.is_empty() {
        return Err(ValidationError::EmptyField("base_image".to_string()));
    }

    if image.len() > MAX_FIELD_LENGTH {
        return Err(ValidationError::MaxLengthExceeded {
            field: "base_image".to_string(),
            max: MAX_FIELD_LENGTH,
        });
    }

    let forbidden_chars = [
        ';', '&', '|', '`', '$', '(', ')', '{', '}', '<', '>', ' ', '\n', '\r', '\0',
    ];
    for ch in forbidden_chars {
        if image.contains(ch) {
            return Err(ValidationError::InvalidImage(format!(
                "contains forbidden character: {:?}",
                ch
            )));
        }
    }

    if image.starts_with('-') || image.starts_with('.') {
        return Err(ValidationError::InvalidImage(
            "name cannot start with dash or dot".to_string(),
        ));
    }

    Ok(())
}

/// Validate a resource quantity such as `500m`, `1.5`, or `2Gi`.
///
/// Only the shape is checked; the API server owns the exact grammar.
pub fn validate_quantity(value: &str, field_name: &str) -> Result<(), ValidationError> {
    let invalid = || ValidationError::InvalidQuantity {
        field: field_name.to_string(),
        value: value.to_string(),
    };

    if value.is_empty() {
        return Err(ValidationError::EmptyField(field_name.to_string()));
    }

    let digits_end = value
        .find(|c: char| !(c.is_ascii_digit() || c == '.'))
        .unwrap_or(value.len());
    let (number, suffix) = value.split_at(digits_end);
    if number.is_empty() || number.parse::<f64>().is_err() {
        return Err(invalid());
    }
    if !suffix.chars().all(|c| c.is_ascii_alphabetic()) || suffix.len() > 2 {
        return Err(invalid());
    }

    Ok(())
}
