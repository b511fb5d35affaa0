#![warn(missing_docs)]
//! # site-guard-core
//!
//! ## Purpose
//! Defines the pure value types shared across the `site-guard` workspace.
//!
//! ## Responsibilities
//! - Represent scanner output ([`ThreatReport`]) and its threat categories.
//! - Represent per-field and per-form validation outcomes.
//! - Define the error taxonomy ([`ErrorClass`]) every subsystem maps into.
//! - Define the ordered [`PerformanceTier`] used by adaptive delivery.
//!
//! ## Data flow
//! The scanner emits [`ThreatReport`] values; field validators turn their
//! outcomes into [`ValidationResult`]s which form validation aggregates into a
//! [`FormValidation`] that callers forward to persistence.
//!
//! ## Ownership and lifetimes
//! Every type here is an owned value recomputed per operation. Nothing holds
//! borrowed input, so results can outlive the request buffers they came from.
//!
//! ## Error model
//! Codec failures return [`CoreError`]. Validation outcomes are data, not
//! errors: a rejected field is a normal [`ValidationResult`].
//!
//! ## Security and privacy notes
//! Threat reports carry categories only, never the matched text, so they are
//! safe to log.
//!
//! ## Example
//! ```rust
//! use site_guard_core::{PerformanceTier, ThreatCategory, ThreatReport};
//!
//! let report = ThreatReport::from_categories([ThreatCategory::Xss]);
//! assert!(!report.is_safe);
//! assert!(PerformanceTier::Low < PerformanceTier::High);
//! ```

use std::collections::BTreeMap;
use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Category of dangerous input detected by the security scanner.
///
/// Declaration order is the reporting order.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ThreatCategory {
    /// Markup or URI that can execute script in a browser.
    Xss,
    /// SQL keyword/operator combinations, quote escapes, comment truncation.
    SqlInjection,
    /// Directory traversal sequences, including percent-encoded forms.
    PathTraversal,
    /// Shell metacharacters and command/process substitution.
    CommandInjection,
}

impl ThreatCategory {
    /// All categories in reporting order.
    pub const ALL: [ThreatCategory; 4] = [
        ThreatCategory::Xss,
        ThreatCategory::SqlInjection,
        ThreatCategory::PathTraversal,
        ThreatCategory::CommandInjection,
    ];

    /// Stable identifier used in logs and JSON.
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Xss => "xss",
            Self::SqlInjection => "sql_injection",
            Self::PathTraversal => "path_traversal",
            Self::CommandInjection => "command_injection",
        }
    }
}

impl fmt::Display for ThreatCategory {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Result of one security scan.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ThreatReport {
    /// `true` when no threat category matched.
    pub is_safe: bool,
    /// Matched categories, deduplicated, in [`ThreatCategory::ALL`] order.
    pub threats: Vec<ThreatCategory>,
}

impl ThreatReport {
    /// Report for input with no findings.
    pub fn safe() -> Self {
        Self {
            is_safe: true,
            threats: Vec::new(),
        }
    }

    /// Builds a normalized report from matched categories in any order.
    pub fn from_categories(categories: impl IntoIterator<Item = ThreatCategory>) -> Self {
        let mut threats: Vec<ThreatCategory> = categories.into_iter().collect();
        threats.sort_unstable();
        threats.dedup();

        Self {
            is_safe: threats.is_empty(),
            threats,
        }
    }

    /// Returns `true` when `category` was detected.
    pub fn contains(&self, category: ThreatCategory) -> bool {
        self.threats.contains(&category)
    }
}

/// Coarse classification of every recoverable failure in the workspace.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ErrorClass {
    /// Input does not match the expected shape; the user corrects it.
    Format,
    /// The scanner found a dangerous pattern. Messages stay generic.
    SecurityRejection,
    /// An allowlist or bound was violated; the message explains the bound.
    PolicyRejection,
    /// Network or CORS failure while loading a resolved resource.
    TransportFailure,
}

/// Outcome of validating a single field.
///
/// Invariant: `is_valid` iff `error.is_none()`, and a valid result carries the
/// sanitized value, never the raw input.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ValidationResult {
    /// Whether the field passed every check.
    pub is_valid: bool,
    /// Sanitized value when valid.
    pub value: Option<String>,
    /// User-facing message when invalid.
    pub error: Option<String>,
}

impl ValidationResult {
    /// Accepted field with its sanitized value.
    pub fn valid(value: impl Into<String>) -> Self {
        Self {
            is_valid: true,
            value: Some(value.into()),
            error: None,
        }
    }

    /// Rejected field with a user-facing message.
    pub fn invalid(error: impl Into<String>) -> Self {
        Self {
            is_valid: false,
            value: None,
            error: Some(error.into()),
        }
    }
}

impl<E: fmt::Display> From<Result<String, E>> for ValidationResult {
    fn from(result: Result<String, E>) -> Self {
        match result {
            Ok(value) => Self::valid(value),
            Err(error) => Self::invalid(error.to_string()),
        }
    }
}

/// Aggregate outcome of validating a whole form against its schema.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct FormValidation {
    /// `true` iff `errors` is empty.
    pub is_valid: bool,
    /// Per-field user-facing messages.
    pub errors: BTreeMap<String, String>,
    /// Per-field sanitized values for accepted fields.
    pub data: BTreeMap<String, String>,
}

impl FormValidation {
    /// Starts an empty aggregate that is valid until a field fails.
    pub fn new() -> Self {
        Self {
            is_valid: true,
            errors: BTreeMap::new(),
            data: BTreeMap::new(),
        }
    }

    /// Folds one field outcome into the aggregate.
    pub fn record(&mut self, field: impl Into<String>, result: ValidationResult) {
        let field = field.into();
        match (result.is_valid, result.value, result.error) {
            (true, Some(value), _) => {
                self.data.insert(field, value);
            }
            (_, _, error) => {
                self.errors.insert(
                    field,
                    error.unwrap_or_else(|| "invalid value".to_string()),
                );
                self.is_valid = false;
            }
        }
    }

    /// Serializes the aggregate to compact JSON bytes for forwarding.
    ///
    /// # Errors
    /// Returns [`CoreError::Codec`] when JSON serialization fails.
    pub fn to_json_bytes(&self) -> Result<Vec<u8>, CoreError> {
        serde_json::to_vec(self).map_err(CoreError::Codec)
    }

    /// Deserializes an aggregate from JSON bytes.
    ///
    /// # Errors
    /// Returns [`CoreError::Codec`] when JSON decoding fails.
    pub fn from_json_bytes(raw: &[u8]) -> Result<Self, CoreError> {
        serde_json::from_slice(raw).map_err(CoreError::Codec)
    }
}

/// Coarse device/browser capacity class driving load tuning.
///
/// Ordered so that `Low < Medium < High`; downgrades are `min` merges.
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Default, Serialize, Deserialize,
)]
#[serde(rename_all = "lowercase")]
pub enum PerformanceTier {
    /// Constrained device, slow network, or reduced-motion/data preference.
    Low,
    /// Conservative default when signals are missing.
    #[default]
    Medium,
    /// Capable device on a fast network.
    High,
}

impl PerformanceTier {
    /// Stable lowercase identifier.
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Low => "low",
            Self::Medium => "medium",
            Self::High => "high",
        }
    }

    /// Compact numeric encoding used by atomic caches.
    pub fn to_u8(self) -> u8 {
        match self {
            Self::Low => 0,
            Self::Medium => 1,
            Self::High => 2,
        }
    }

    /// Inverse of [`PerformanceTier::to_u8`].
    pub fn from_u8(raw: u8) -> Option<Self> {
        match raw {
            0 => Some(Self::Low),
            1 => Some(Self::Medium),
            2 => Some(Self::High),
            _ => None,
        }
    }
}

impl fmt::Display for PerformanceTier {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for PerformanceTier {
    type Err = CoreError;

    fn from_str(raw: &str) -> Result<Self, Self::Err> {
        match raw.trim().to_ascii_lowercase().as_str() {
            "low" => Ok(Self::Low),
            "medium" => Ok(Self::Medium),
            "high" => Ok(Self::High),
            _ => Err(CoreError::UnknownTier(raw.to_string())),
        }
    }
}

/// Error type for core codec and parsing failures.
#[derive(Debug, Error)]
pub enum CoreError {
    /// Tier label is not one of `low|medium|high`.
    #[error("unknown performance tier: {0}")]
    UnknownTier(String),
    /// JSON encoding/decoding error.
    #[error("codec failure: {0}")]
    Codec(#[from] serde_json::Error),
}

#[cfg(test)]
mod tests {
    //! Unit tests for report normalization and aggregate invariants.

    use super::*;

    #[test]
    fn report_deduplicates_and_orders_categories() {
        let report = ThreatReport::from_categories([
            ThreatCategory::CommandInjection,
            ThreatCategory::Xss,
            ThreatCategory::CommandInjection,
        ]);
        assert!(!report.is_safe);
        assert_eq!(
            report.threats,
            vec![ThreatCategory::Xss, ThreatCategory::CommandInjection]
        );
    }

    #[test]
    fn form_aggregate_is_invalid_after_any_failure() {
        let mut form = FormValidation::new();
        form.record("email", ValidationResult::valid("a@b.co"));
        assert!(form.is_valid);

        form.record("name", ValidationResult::invalid("name is required"));
        assert!(!form.is_valid);
        assert_eq!(form.data.len(), 1);
        assert_eq!(form.errors["name"], "name is required");
    }

    #[test]
    fn tier_parses_case_insensitively_and_rejects_unknown() {
        assert_eq!("HIGH".parse::<PerformanceTier>().ok(), Some(PerformanceTier::High));
        assert!("turbo".parse::<PerformanceTier>().is_err());
        assert_eq!(PerformanceTier::from_u8(PerformanceTier::Low.to_u8()), Some(PerformanceTier::Low));
    }
}
