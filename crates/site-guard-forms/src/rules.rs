//! Validation rules and form schemas.

use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};

/// Field kind selecting the validator pipeline.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum FieldKind {
    /// Lower-cased RFC-lite email address.
    Email,
    /// Personal name: letters, spaces, hyphens, apostrophes.
    Name,
    /// Phone number with 10 to 15 digits.
    Phone,
    /// Absolute `http`/`https` URL.
    Url,
    /// Free text, escaped for HTML by default.
    Text,
    /// Consent/age-verification checkbox.
    Consent,
    /// `#rgb` / `#rrggbb` color.
    Color,
}

impl FieldKind {
    /// Default inclusive character envelope for this kind.
    pub fn default_length_bounds(self) -> (usize, usize) {
        match self {
            Self::Email => (3, 254),
            Self::Name => (2, 50),
            Self::Phone => (10, 32),
            Self::Url => (8, 2048),
            Self::Text => (0, 5000),
            Self::Consent => (0, 0),
            Self::Color => (4, 7),
        }
    }
}

/// How to validate one field.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ValidationRule {
    /// Validator pipeline.
    pub kind: FieldKind,
    /// Whether an empty value is rejected.
    #[serde(default)]
    pub required: bool,
    /// Minimum characters after trimming; kind default when absent.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub min_length: Option<usize>,
    /// Maximum characters after trimming; kind default when absent.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub max_length: Option<usize>,
    /// Text only: restrict to a narrow safe character set.
    #[serde(default)]
    pub strict: bool,
    /// Text only: entity-encode `& < > " ' /`.
    #[serde(default = "enabled")]
    pub escape_html: bool,
    /// Text only: strip script-capable markup before escaping. Runs behind
    /// the scanner, which already rejects such markup.
    #[serde(default = "enabled")]
    pub strip_xss: bool,
}

fn enabled() -> bool {
    true
}

impl ValidationRule {
    /// Required rule of `kind` with kind defaults and safe-by-default text options.
    pub fn new(kind: FieldKind) -> Self {
        Self {
            kind,
            required: true,
            min_length: None,
            max_length: None,
            strict: false,
            escape_html: true,
            strip_xss: true,
        }
    }

    /// Required email rule.
    pub fn email() -> Self {
        Self::new(FieldKind::Email)
    }

    /// Required name rule.
    pub fn name() -> Self {
        Self::new(FieldKind::Name)
    }

    /// Required phone rule.
    pub fn phone() -> Self {
        Self::new(FieldKind::Phone)
    }

    /// Required URL rule.
    pub fn url() -> Self {
        Self::new(FieldKind::Url)
    }

    /// Required free-text rule with the given envelope.
    pub fn text(min_length: usize, max_length: usize) -> Self {
        Self::new(FieldKind::Text).with_length(min_length, max_length)
    }

    /// Consent gate.
    pub fn consent() -> Self {
        Self::new(FieldKind::Consent)
    }

    /// Required color rule.
    pub fn color() -> Self {
        Self::new(FieldKind::Color)
    }

    /// Marks the field optional.
    pub fn optional(mut self) -> Self {
        self.required = false;
        self
    }

    /// Overrides the character envelope.
    pub fn with_length(mut self, min_length: usize, max_length: usize) -> Self {
        self.min_length = Some(min_length);
        self.max_length = Some(max_length);
        self
    }

    /// Restricts text to the strict character set.
    pub fn strict(mut self) -> Self {
        self.strict = true;
        self
    }

    /// Keeps text unescaped. Only for values never rendered as HTML.
    pub fn without_html_escape(mut self) -> Self {
        self.escape_html = false;
        self
    }

    /// Skips markup stripping for text.
    pub fn without_xss_strip(mut self) -> Self {
        self.strip_xss = false;
        self
    }

    /// Effective inclusive envelope.
    pub fn length_bounds(&self) -> (usize, usize) {
        let (default_min, default_max) = self.kind.default_length_bounds();
        (
            self.min_length.unwrap_or(default_min),
            self.max_length.unwrap_or(default_max),
        )
    }
}

/// Explicit per-form contract: field name to rule.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct FormSchema {
    /// Rules keyed by field name.
    pub fields: BTreeMap<String, ValidationRule>,
}

impl FormSchema {
    /// Empty schema.
    pub fn new() -> Self {
        Self::default()
    }

    /// Adds or replaces one field rule.
    pub fn field(mut self, name: impl Into<String>, rule: ValidationRule) -> Self {
        self.fields.insert(name.into(), rule);
        self
    }

    /// Contact form: name, email, optional phone, message, consent.
    pub fn contact() -> Self {
        Self::new()
            .field("name", ValidationRule::name())
            .field("email", ValidationRule::email())
            .field("phone", ValidationRule::phone().optional())
            .field("message", ValidationRule::text(10, 2000))
            .field("consent", ValidationRule::consent())
    }

    /// Booking form: contact details, requested service, notes, age check.
    pub fn booking() -> Self {
        Self::new()
            .field("name", ValidationRule::name())
            .field("email", ValidationRule::email())
            .field("phone", ValidationRule::phone())
            .field("service", ValidationRule::text(2, 100).strict())
            .field("preferred_date", ValidationRule::text(0, 40).strict().optional())
            .field("notes", ValidationRule::text(0, 1000).optional())
            .field("age_verified", ValidationRule::consent())
    }
}
