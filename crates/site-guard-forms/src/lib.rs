#![warn(missing_docs)]
//! # site-guard-forms
//!
//! ## Purpose
//! Validates and sanitizes contact/booking form fields against explicit
//! per-form schemas.
//!
//! ## Responsibilities
//! - Enforce trimming, length envelopes, and per-kind formats.
//! - Run the security scanner over every non-empty value, regardless of format.
//! - Produce sanitized values (lower-cased email, digits-only phone, escaped
//!   text) or typed [`FieldError`]s.
//! - Aggregate per-field outcomes into a [`FormValidation`].
//!
//! ## Data flow
//! Raw JSON field values + [`FormSchema`] -> [`validate_form`] ->
//! [`validate_field`] per rule -> scanner -> [`FormValidation`] returned to the
//! caller, which persists `data` and renders `errors`.
//!
//! ## Ownership and lifetimes
//! Validators borrow raw input and return owned sanitized strings.
//!
//! ## Error model
//! Errors are returned, never panicked. Each [`FieldError`] maps to an
//! [`ErrorClass`]. Security rejections carry one fixed message that never
//! names the matched pattern.
//!
//! ## Security and privacy notes
//! Over-length input is rejected, not truncated. Logs name the field and the
//! error class only.
//!
//! ## Example
//! ```rust
//! use site_guard_forms::validate_email;
//!
//! let result = validate_email("  Jane@Example.COM ");
//! assert_eq!(result.value.as_deref(), Some("jane@example.com"));
//! ```

pub mod rules;

use std::collections::BTreeMap;

use serde_json::Value;
use site_guard_core::{ErrorClass, FormValidation, ValidationResult};
use site_guard_scanner::patterns::{EMAIL, HEX_COLOR, NAME, PHONE, STRICT_TEXT, URL_SCHEME};
use thiserror::Error;
use url::Url;

pub use crate::rules::{FieldKind, FormSchema, ValidationRule};

/// Message shown for every security rejection.
pub const SECURITY_REJECTION_MESSAGE: &str =
    "This field contains characters or patterns that are not allowed. Please rephrase and try again.";

/// Message shown when the consent/age gate is not satisfied.
pub const CONSENT_REQUIRED_MESSAGE: &str =
    "You must confirm you are at least 18 years old and accept the terms to continue.";

const PHONE_MIN_DIGITS: usize = 10;
const PHONE_MAX_DIGITS: usize = 15;

/// Validates one email with the default required rule.
pub fn validate_email(raw: &str) -> ValidationResult {
    check_string(&ValidationRule::email(), raw).into()
}

/// Validates one personal name with the default required rule.
pub fn validate_name(raw: &str) -> ValidationResult {
    check_string(&ValidationRule::name(), raw).into()
}

/// Validates one phone number with the default required rule.
pub fn validate_phone(raw: &str) -> ValidationResult {
    check_string(&ValidationRule::phone(), raw).into()
}

/// Validates one `http`/`https` URL with the default required rule.
pub fn validate_url(raw: &str) -> ValidationResult {
    check_string(&ValidationRule::url(), raw).into()
}

/// Validates free text against `rule` (which should be a text rule).
pub fn validate_text(raw: &str, rule: &ValidationRule) -> ValidationResult {
    check_string(rule, raw).into()
}

/// Validates one hex color with the default required rule.
pub fn validate_hex_color(raw: &str) -> ValidationResult {
    check_string(&ValidationRule::color(), raw).into()
}

/// Consent/age gate: any falsy value is a hard rejection.
pub fn validate_consent(raw: &Value) -> ValidationResult {
    check_consent(raw).into()
}

/// Validates one raw JSON value against `rule`.
pub fn validate_field(rule: &ValidationRule, raw: &Value) -> ValidationResult {
    check_field(rule, raw).into()
}

/// Typed form of [`validate_field`].
///
/// # Errors
/// Returns the first [`FieldError`] produced by the rule's pipeline.
pub fn check_field(rule: &ValidationRule, raw: &Value) -> Result<String, FieldError> {
    if rule.kind == FieldKind::Consent {
        return check_consent(raw);
    }

    let text = match raw {
        Value::Null => String::new(),
        Value::String(value) => value.clone(),
        Value::Number(number) => number.to_string(),
        Value::Bool(_) | Value::Array(_) | Value::Object(_) => {
            return Err(FieldError::InvalidFormat(
                "please enter a text value".to_string(),
            ));
        }
    };

    check_string(rule, &text)
}

/// Validates every schema field and aggregates the outcome.
///
/// Fields absent from `input` are validated as empty. Input fields without a
/// rule are dropped.
pub fn validate_form(schema: &FormSchema, input: &BTreeMap<String, Value>) -> FormValidation {
    let mut form = FormValidation::new();

    for (field, rule) in &schema.fields {
        let raw = input.get(field).unwrap_or(&Value::Null);
        match check_field(rule, raw) {
            Ok(value) => form.record(field.clone(), ValidationResult::valid(value)),
            Err(error) => {
                let class = error.class();
                if class == ErrorClass::SecurityRejection {
                    tracing::warn!(field = %field, "form field rejected by security scan");
                } else {
                    tracing::debug!(field = %field, ?class, "form field rejected");
                }
                form.record(field.clone(), ValidationResult::invalid(error.to_string()));
            }
        }
    }

    let unknown = input
        .keys()
        .filter(|field| !schema.fields.contains_key(*field))
        .count();
    if unknown > 0 {
        tracing::debug!(unknown, "dropped form fields without a rule");
    }

    form
}

fn check_string(rule: &ValidationRule, raw: &str) -> Result<String, FieldError> {
    let trimmed = raw.trim();

    if trimmed.is_empty() {
        if rule.required {
            return Err(FieldError::Required);
        }
        return Ok(String::new());
    }

    let (min, max) = rule.length_bounds();
    let actual = trimmed.chars().count();
    if actual > max {
        return Err(FieldError::TooLong { max, actual });
    }
    if actual < min {
        return Err(FieldError::TooShort { min, actual });
    }

    // Security runs before format so a payload that also breaks the format
    // still gets the generic security message.
    if !site_guard_scanner::scan(trimmed).is_safe {
        return Err(FieldError::SecurityRejected);
    }

    match rule.kind {
        FieldKind::Email => normalize_email(trimmed),
        FieldKind::Name => normalize_name(trimmed),
        FieldKind::Phone => normalize_phone(trimmed),
        FieldKind::Url => normalize_url(trimmed),
        FieldKind::Text => sanitize_text(trimmed, rule),
        FieldKind::Color => normalize_color(trimmed),
        FieldKind::Consent => check_consent(&Value::String(trimmed.to_string())),
    }
}

fn normalize_email(trimmed: &str) -> Result<String, FieldError> {
    let lowered = trimmed.to_lowercase();
    if lowered.contains("..") || !EMAIL.is_match(&lowered) {
        return Err(FieldError::InvalidFormat(
            "please enter a valid email address".to_string(),
        ));
    }
    Ok(lowered)
}

fn normalize_name(trimmed: &str) -> Result<String, FieldError> {
    let collapsed = trimmed.split_whitespace().collect::<Vec<_>>().join(" ");
    if !NAME.is_match(&collapsed) {
        return Err(FieldError::InvalidFormat(
            "names may only contain letters, spaces, hyphens, and apostrophes".to_string(),
        ));
    }
    Ok(collapsed)
}

fn normalize_phone(trimmed: &str) -> Result<String, FieldError> {
    if !PHONE.is_match(trimmed) {
        return Err(FieldError::InvalidFormat(
            "phone numbers may only contain digits, spaces, and - . ( ) +".to_string(),
        ));
    }

    let digits: String = trimmed.chars().filter(char::is_ascii_digit).collect();
    if !(PHONE_MIN_DIGITS..=PHONE_MAX_DIGITS).contains(&digits.len()) {
        return Err(FieldError::InvalidFormat(format!(
            "phone number must contain {PHONE_MIN_DIGITS} to {PHONE_MAX_DIGITS} digits"
        )));
    }

    if trimmed.starts_with('+') {
        Ok(format!("+{digits}"))
    } else {
        Ok(digits)
    }
}

fn normalize_url(trimmed: &str) -> Result<String, FieldError> {
    let invalid = || FieldError::InvalidFormat("please enter a valid http or https URL".to_string());

    if !URL_SCHEME.is_match(trimmed) {
        return Err(invalid());
    }

    let parsed = Url::parse(trimmed).map_err(|_| invalid())?;
    if !matches!(parsed.scheme(), "http" | "https") || parsed.host_str().is_none() {
        return Err(invalid());
    }
    if !parsed.username().is_empty() || parsed.password().is_some() {
        return Err(invalid());
    }

    Ok(parsed.to_string())
}

fn normalize_color(trimmed: &str) -> Result<String, FieldError> {
    let lowered = trimmed.to_ascii_lowercase();
    if !HEX_COLOR.is_match(&lowered) {
        return Err(FieldError::InvalidFormat(
            "please enter a color like #1a2b3c".to_string(),
        ));
    }
    Ok(lowered)
}

fn sanitize_text(trimmed: &str, rule: &ValidationRule) -> Result<String, FieldError> {
    if rule.strict && !STRICT_TEXT.is_match(trimmed) {
        return Err(FieldError::InvalidFormat(
            "only letters, numbers, spaces, and basic punctuation are allowed".to_string(),
        ));
    }

    let mut value = trimmed.to_string();
    // The scanner already rejected every strip pattern; stripping backs it up
    // if the two libraries ever diverge.
    if rule.strip_xss {
        value = site_guard_scanner::strip_xss(&value);
    }
    if rule.escape_html {
        value = escape_html(&value);
    }
    Ok(value)
}

fn check_consent(raw: &Value) -> Result<String, FieldError> {
    if is_truthy(raw) {
        Ok("true".to_string())
    } else {
        Err(FieldError::ConsentRequired)
    }
}

fn is_truthy(raw: &Value) -> bool {
    match raw {
        Value::Null => false,
        Value::Bool(value) => *value,
        Value::Number(number) => number.as_f64().is_some_and(|value| value != 0.0),
        Value::String(value) => {
            let normalized = value.trim().to_ascii_lowercase();
            !matches!(normalized.as_str(), "" | "false" | "off" | "0" | "no")
        }
        Value::Array(_) | Value::Object(_) => false,
    }
}

/// Entity-encodes `& < > " ' /`.
pub fn escape_html(input: &str) -> String {
    let mut escaped = String::with_capacity(input.len());
    for character in input.chars() {
        match character {
            '&' => escaped.push_str("&amp;"),
            '<' => escaped.push_str("&lt;"),
            '>' => escaped.push_str("&gt;"),
            '"' => escaped.push_str("&quot;"),
            '\'' => escaped.push_str("&#x27;"),
            '/' => escaped.push_str("&#x2F;"),
            other => escaped.push(other),
        }
    }
    escaped
}

/// Field validation failures.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum FieldError {
    /// Required field is empty.
    #[error("this field is required")]
    Required,
    /// Value is shorter than the envelope.
    #[error("must be at least {min} characters (got {actual})")]
    TooShort {
        /// Minimum characters.
        min: usize,
        /// Actual characters.
        actual: usize,
    },
    /// Value is longer than the envelope.
    #[error("must be at most {max} characters (got {actual})")]
    TooLong {
        /// Maximum characters.
        max: usize,
        /// Actual characters.
        actual: usize,
    },
    /// Value does not match the expected shape.
    #[error("{0}")]
    InvalidFormat(String),
    /// The scanner flagged the value.
    #[error("{}", SECURITY_REJECTION_MESSAGE)]
    SecurityRejected,
    /// Consent/age gate not satisfied.
    #[error("{}", CONSENT_REQUIRED_MESSAGE)]
    ConsentRequired,
}

impl FieldError {
    /// Error taxonomy class.
    pub fn class(&self) -> ErrorClass {
        match self {
            Self::Required | Self::InvalidFormat(_) => ErrorClass::Format,
            Self::TooShort { .. } | Self::TooLong { .. } | Self::ConsentRequired => {
                ErrorClass::PolicyRejection
            }
            Self::SecurityRejected => ErrorClass::SecurityRejection,
        }
    }
}
