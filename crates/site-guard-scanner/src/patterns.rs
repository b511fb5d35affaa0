//! Static pattern library.
//!
//! Threat patterns are grouped per [`ThreatCategory`] and compiled once on
//! first use. Field-format patterns are exposed as [`FormatPattern`] statics.
//!
//! A pattern that fails to compile never weakens detection: its category is
//! marked degraded and treats every non-empty input as a match, and a format
//! pattern that fails to compile matches nothing.

use std::sync::LazyLock;

use regex::Regex;
use site_guard_core::ThreatCategory;

/// Script-capable markup, URIs, handlers, and CSS expressions.
pub const XSS_PATTERNS: &[&str] = &[
    r"(?i)<\s*/?\s*(script|style|iframe|frame|frameset|object|embed|applet|meta|link|base|svg|form)\b",
    r"(?i)(javascript|vbscript|livescript)\s*:",
    r"(?i)data\s*:\s*(text/html|text/javascript|application/(x-)?javascript|image/svg\+xml)",
    r"(?i)\bon[a-z]+\s*=",
    r"(?i)expression\s*\(",
    r#"(?i)url\s*\(\s*['"]?\s*(javascript|vbscript)\s*:"#,
];

/// Keyword/operator combinations, quote escapes, and comment truncation.
pub const SQL_INJECTION_PATTERNS: &[&str] = &[
    r"(?i);\s*(drop|delete|insert|update|select|alter|create|truncate|exec|execute|union|shutdown)\b",
    r"(?i)\bunion\s+(all\s+)?select\b",
    r"(?i)\bdrop\s+(table|database|schema|view)\b",
    r"(?i)\binsert\s+into\b",
    r"(?i)\bdelete\s+from\b",
    r"(?i)\bselect\s+\*\s+from\b",
    r"(?i)\bselect\b.+\bfrom\b.+\bwhere\b",
    r"(?i)\b(or|and)\s+['\x22]?\d+['\x22]?\s*=\s*['\x22]?\d+",
    r"(?i)['\x22`]\s*(;|\)|--|#|/\*)",
    r"(?i)['\x22]\s*\b(or|and)\b\s+['\x22\d]",
    r"--",
    r"/\*",
    r"(?i)\b(exec|execute)\s*(\(|\s+(xp_|sp_))",
    r"(?i)\bxp_\w+",
    r"(?i)\b(waitfor\s+delay|benchmark\s*\(|sleep\s*\()",
];

/// Directory traversal, including percent-encoded and overlong variants.
pub const PATH_TRAVERSAL_PATTERNS: &[&str] = &[
    r"\.\.[/\\]",
    r"[/\\]\.\.",
    r"(?i)(%2e|\.){2}(%2f|%5c|/|\\)",
    r"(?i)%25(2e|2f|5c)",
    r"(?i)%c0%ae|%c0%af|%c1%9c",
    r"(?i)%00",
    r"\x00",
];

/// Shell metacharacters and command/process substitution.
pub const COMMAND_INJECTION_PATTERNS: &[&str] = &[
    r"[;&|`]",
    r"\$\(",
    r"\$\{",
    r"[<>]\(",
];

/// Whole-element forms removed by [`crate::strip_xss`] before the
/// per-token XSS patterns.
pub(crate) const XSS_ELEMENT_PATTERNS: &[&str] = &[
    r"(?is)<\s*(script|style|iframe|object|embed|applet)\b[^>]*>.*?<\s*/\s*(script|style|iframe|object|embed|applet)\s*>",
    r#"(?i)\bon[a-z]+\s*=\s*("[^"]*"|'[^']*'|[^\s>]+)"#,
];

/// Source patterns for one threat category.
pub fn category_sources(category: ThreatCategory) -> &'static [&'static str] {
    match category {
        ThreatCategory::Xss => XSS_PATTERNS,
        ThreatCategory::SqlInjection => SQL_INJECTION_PATTERNS,
        ThreatCategory::PathTraversal => PATH_TRAVERSAL_PATTERNS,
        ThreatCategory::CommandInjection => COMMAND_INJECTION_PATTERNS,
    }
}

/// Compiled pattern group for one category.
pub(crate) struct CompiledCategory {
    pub(crate) category: ThreatCategory,
    pub(crate) patterns: Vec<Regex>,
    pub(crate) degraded: bool,
}

impl CompiledCategory {
    pub(crate) fn matches(&self, input: &str) -> bool {
        if self.degraded && !input.is_empty() {
            return true;
        }
        self.patterns.iter().any(|pattern| pattern.is_match(input))
    }
}

pub(crate) static THREAT_LIBRARY: LazyLock<Vec<CompiledCategory>> = LazyLock::new(|| {
    ThreatCategory::ALL
        .iter()
        .map(|&category| {
            let (patterns, degraded) = compile_all(category.as_str(), category_sources(category));
            CompiledCategory {
                category,
                patterns,
                degraded,
            }
        })
        .collect()
});

pub(crate) static XSS_STRIP_LIBRARY: LazyLock<Vec<Regex>> = LazyLock::new(|| {
    let (mut patterns, _) = compile_all("xss_elements", XSS_ELEMENT_PATTERNS);
    let (tokens, _) = compile_all("xss", XSS_PATTERNS);
    patterns.extend(tokens);
    patterns
});

fn compile_all(group: &str, sources: &[&str]) -> (Vec<Regex>, bool) {
    let mut degraded = false;
    let mut compiled = Vec::with_capacity(sources.len());
    for source in sources {
        match Regex::new(source) {
            Ok(regex) => compiled.push(regex),
            Err(error) => {
                tracing::error!(group, %error, "threat pattern failed to compile");
                degraded = true;
            }
        }
    }
    (compiled, degraded)
}

/// Returns `true` when every threat pattern compiled.
pub fn library_is_intact() -> bool {
    THREAT_LIBRARY.iter().all(|category| !category.degraded)
}

/// Named field-format regex compiled on first use.
pub struct FormatPattern {
    name: &'static str,
    regex: LazyLock<Option<Regex>>,
}

impl FormatPattern {
    /// Pattern name used in logs.
    pub fn name(&self) -> &'static str {
        self.name
    }

    /// Returns `true` when the pattern compiled and matches `input`.
    pub fn is_match(&self, input: &str) -> bool {
        self.regex
            .as_ref()
            .is_some_and(|regex| regex.is_match(input))
    }

    /// Returns `true` when the pattern compiled.
    pub fn is_compiled(&self) -> bool {
        self.regex.is_some()
    }
}

fn compile_format(name: &str, source: &str) -> Option<Regex> {
    match Regex::new(source) {
        Ok(regex) => Some(regex),
        Err(error) => {
            tracing::error!(name, %error, "format pattern failed to compile");
            None
        }
    }
}

/// Lower-cased RFC-lite address: `local@label(.label)*.tld`.
pub static EMAIL: FormatPattern = FormatPattern {
    name: "email",
    regex: LazyLock::new(|| {
        compile_format(
            "email",
            r"^[a-z0-9._%+\-]+@[a-z0-9](?:[a-z0-9\-]*[a-z0-9])?(?:\.[a-z0-9](?:[a-z0-9\-]*[a-z0-9])?)*\.[a-z]{2,}$",
        )
    }),
};

/// Letters of any script, spaces, hyphens, and apostrophes.
pub static NAME: FormatPattern = FormatPattern {
    name: "name",
    regex: LazyLock::new(|| compile_format("name", r"^[\p{L}\p{M}][\p{L}\p{M}' \-]*$")),
};

/// Digits with common separators and an optional leading `+`.
pub static PHONE: FormatPattern = FormatPattern {
    name: "phone",
    regex: LazyLock::new(|| compile_format("phone", r"^\+?[0-9\s().\-]+$")),
};

/// `http`/`https` scheme prefix; full parsing is done with the `url` crate.
pub static URL_SCHEME: FormatPattern = FormatPattern {
    name: "url_scheme",
    regex: LazyLock::new(|| compile_format("url_scheme", r"(?i)^https?://")),
};

/// Lower-cased `#rgb` or `#rrggbb`.
pub static HEX_COLOR: FormatPattern = FormatPattern {
    name: "hex_color",
    regex: LazyLock::new(|| compile_format("hex_color", r"^#(?:[0-9a-f]{3}|[0-9a-f]{6})$")),
};

/// Narrow character set for strict free-text fields.
pub static STRICT_TEXT: FormatPattern = FormatPattern {
    name: "strict_text",
    regex: LazyLock::new(|| compile_format("strict_text", r#"^[\p{L}\p{N}\s.,!?'"():\-]*$"#)),
};
