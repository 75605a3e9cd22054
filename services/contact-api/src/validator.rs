// SPDX-FileCopyrightText: 2025 Hyperpolymath
// SPDX-License-Identifier: PMPL-1.0-or-later

//! Contact form validator.
//!
//! Checks run in a fixed order (email, name, contact, message) and stop at
//! the first failure, so a client only ever sees one message at a time.

use lettre::Address;
use regex::Regex;
use serde::Serialize;
use serde_json::{Map, Value};
use std::sync::LazyLock;
use thiserror::Error;
use tracing::debug;

/// Shape check only: `local@domain.tld` with no whitespace.
static EMAIL_SHAPE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"^[^\s@]+@[^\s@]+\.[^\s@]+$").expect("email pattern is valid")
});

const MIN_NAME_LEN: usize = 2;
const MIN_CONTACT_LEN: usize = 5;
const MIN_MESSAGE_LEN: usize = 2;

/// Validation error types. The display text is sent to the client verbatim.
#[derive(Debug, Error, Clone, Copy, PartialEq, Eq)]
pub enum ValidationError {
    #[error("Invalid email.")]
    InvalidEmail,

    #[error("Name is required.")]
    NameRequired,

    #[error("Contact is required.")]
    ContactRequired,

    #[error("Message is required.")]
    MessageRequired,
}

impl ValidationError {
    /// Form field the error refers to.
    pub fn field(&self) -> &'static str {
        match self {
            Self::InvalidEmail => "email",
            Self::NameRequired => "name",
            Self::ContactRequired => "contact",
            Self::MessageRequired => "message",
        }
    }
}

/// A contact form submission that passed every check. All fields are trimmed.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Submission {
    pub email: String,
    pub name: String,
    pub contact: String,
    pub message: String,
}

/// Decode a request body into a field bag.
///
/// Anything that is not a JSON object becomes an empty bag, which then fails
/// the first check like a form with no fields.
pub fn parse_fields(body: &[u8]) -> Map<String, Value> {
    match serde_json::from_slice::<Value>(body) {
        Ok(Value::Object(fields)) => fields,
        Ok(other) => {
            debug!(kind = json_kind(&other), "Request body is not a JSON object");
            Map::new()
        }
        Err(err) => {
            debug!(error = %err, "Request body is not valid JSON");
            Map::new()
        }
    }
}

/// Validate a raw field bag into a [`Submission`].
pub fn validate(fields: &Map<String, Value>) -> Result<Submission, ValidationError> {
    let email = match fields.get("email") {
        Some(Value::String(e)) if is_deliverable_shape(e.trim()) => e.trim().to_string(),
        other => {
            debug!(present = other.is_some(), "Email failed shape check");
            return Err(ValidationError::InvalidEmail);
        }
    };

    let name = required_text(fields, "name", MIN_NAME_LEN).ok_or(ValidationError::NameRequired)?;
    let contact = required_text(fields, "contact", MIN_CONTACT_LEN)
        .ok_or(ValidationError::ContactRequired)?;
    let message = required_text(fields, "message", MIN_MESSAGE_LEN)
        .ok_or(ValidationError::MessageRequired)?;

    Ok(Submission {
        email,
        name,
        contact,
        message,
    })
}

/// The form's shape check plus whatever the mail transport refuses to
/// address, so an accepted email can always be used as the reply-to.
fn is_deliverable_shape(email: &str) -> bool {
    EMAIL_SHAPE.is_match(email) && email.parse::<Address>().is_ok()
}

/// Trimmed text of a field if it is present, truthy, and long enough.
///
/// Numbers and booleans are accepted in their textual form; `false`, `0`,
/// `null`, empty strings, arrays and objects count as absent.
fn required_text(fields: &Map<String, Value>, key: &'static str, min_len: usize) -> Option<String> {
    let raw = match fields.get(key)? {
        Value::String(s) if !s.is_empty() => s.clone(),
        Value::Number(n) if n.as_f64() != Some(0.0) => n.to_string(),
        Value::Bool(true) => "true".to_string(),
        _ => {
            debug!(field = key, "Field missing or empty");
            return None;
        }
    };

    let trimmed = raw.trim();
    if trimmed.chars().count() < min_len {
        debug!(field = key, min_len, "Field too short");
        return None;
    }
    Some(trimmed.to_string())
}

fn json_kind(value: &Value) -> &'static str {
    match value {
        Value::Null => "null",
        Value::Bool(_) => "bool",
        Value::Number(_) => "number",
        Value::String(_) => "string",
        Value::Array(_) => "array",
        Value::Object(_) => "object",
    }
}
