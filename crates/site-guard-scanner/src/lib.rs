#![warn(missing_docs)]
//! # site-guard-scanner
//!
//! ## Purpose
//! Detects injection and script payloads in untrusted text.
//!
//! ## Responsibilities
//! - Hold the static pattern library (see [`patterns`]).
//! - Run text against every threat category and report what matched.
//! - Strip script-capable markup for text fields that keep user formatting.
//!
//! ## Data flow
//! Field and file validators pass raw text to [`scan`] (or bytes to
//! [`scan_bytes`]) and reject on any finding.
//!
//! ## Ownership and lifetimes
//! Scanning borrows input and returns an owned [`ThreatReport`]; compiled
//! patterns are process-wide statics shared read-only by every caller.
//!
//! ## Error model
//! Scanning never fails. Malformed bytes are scanned through a lossy UTF-8 view.
//!
//! ## Security and privacy notes
//! Reports and log events carry categories and input length only, never the
//! input itself. False positives are acceptable; false negatives are not.
//!
//! ## Example
//! ```rust
//! use site_guard_core::ThreatCategory;
//! use site_guard_scanner::scan;
//!
//! let report = scan("<script>alert(1)</script>");
//! assert!(report.contains(ThreatCategory::Xss));
//! assert!(scan("Hello, I would like a quote.").is_safe);
//! ```

pub mod patterns;

use site_guard_core::{ThreatCategory, ThreatReport};

use crate::patterns::{THREAT_LIBRARY, XSS_STRIP_LIBRARY};

/// Scans text against every threat category.
///
/// Pure: the same input always yields the same report.
pub fn scan(input: &str) -> ThreatReport {
    if input.is_empty() {
        return ThreatReport::safe();
    }

    let matched: Vec<ThreatCategory> = THREAT_LIBRARY
        .iter()
        .filter(|compiled| compiled.matches(input))
        .map(|compiled| compiled.category)
        .collect();

    let report = ThreatReport::from_categories(matched);
    if !report.is_safe {
        tracing::debug!(
            threats = ?report.threats,
            input_len = input.len(),
            "security scan flagged input"
        );
    }
    report
}

/// Scans raw bytes through a lossy UTF-8 view.
pub fn scan_bytes(input: &[u8]) -> ThreatReport {
    scan(&String::from_utf8_lossy(input))
}

/// Returns `true` when `input` matches the given category.
pub fn matches_category(input: &str, category: ThreatCategory) -> bool {
    THREAT_LIBRARY
        .iter()
        .find(|compiled| compiled.category == category)
        .is_some_and(|compiled| compiled.matches(input))
}

/// Removes script-capable markup, URIs, and inline handlers.
///
/// Whole `<script>…</script>`-style elements go first, then inline handler
/// attributes, then any remaining XSS token. The result is not guaranteed to be
/// free of `<`/`>`; callers still escape before rendering.
pub fn strip_xss(input: &str) -> String {
    let mut output = input.to_string();
    for pattern in XSS_STRIP_LIBRARY.iter() {
        if pattern.is_match(&output) {
            output = pattern.replace_all(&output, "").into_owned();
        }
    }
    output
}
