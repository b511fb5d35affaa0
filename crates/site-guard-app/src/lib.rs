#![warn(missing_docs)]
//! # site-guard-app
//!
//! ## Purpose
//! Wires the scanner, field and file validators, media resolver, and adaptive
//! delivery into one facade the website calls at its boundaries.
//!
//! ## Responsibilities
//! - Load [`SiteGuardConfig`] from JSON and environment overrides.
//! - Expose the form boundary ([`SiteGuard::validate_submission`]) and the
//!   upload boundary ([`SiteGuard::validate_upload`]).
//! - Build delivery controllers and gallery loaders that share one tier cache.
//! - Install the `tracing` subscriber.
//!
//! ## Data flow
//! Env/config file -> [`SiteGuardConfig`] -> [`SiteGuard`] -> per-request
//! validation results, resolved media URLs, and delivery tuning.
//!
//! ## Ownership and lifetimes
//! [`SiteGuard`] owns its policies and hands out owned results. The delivery
//! context is shared through `Arc`, so controllers and galleries built from the
//! same facade observe the same tier.
//!
//! ## Error model
//! Subsystem failures are wrapped in [`AppError`]. Rejected input is not an
//! error: it comes back as an invalid result value.
//!
//! ## Security and privacy notes
//! - Log events carry field names, categories, and counts, never raw values.
//! - `SITE_GUARD_ADAPTIVE_DELIVERY=0|false|off` pins every session to the low
//!   tier without a deploy.

use std::collections::BTreeMap;
use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};
use serde_json::Value;
use site_guard_core::{CoreError, FormValidation, ThreatReport};
use site_guard_delivery::{
    AdaptiveDeliveryController, DeliveryContext, EnvironmentSignals, FileTierStore,
    GuardedTierStore,
};
use site_guard_forms::{FormSchema, validate_form};
use site_guard_gallery::GalleryLoader;
use site_guard_media::{MediaError, MediaResolver, MediaUrlPolicy, ResolvedMediaRef};
use site_guard_upload::{FilePolicy, FileUpload, FileValidationResult, FileValidator};
use thiserror::Error;

/// Build-time application version loaded from root `VERSION` file.
pub const APP_VERSION: &str = env!("SITE_GUARD_VERSION");

/// Path of a JSON config file.
pub const CONFIG_ENV: &str = "SITE_GUARD_CONFIG";
/// Comma-separated trusted media hosts, replacing the configured list.
pub const TRUSTED_HOSTS_ENV: &str = "SITE_GUARD_TRUSTED_HOSTS";
/// Same-origin image proxy path.
pub const PROXY_ENDPOINT_ENV: &str = "SITE_GUARD_PROXY_ENDPOINT";
/// Adaptive delivery kill-switch.
pub const ADAPTIVE_DELIVERY_ENV: &str = "SITE_GUARD_ADAPTIVE_DELIVERY";
/// `tracing` filter directives.
pub const LOG_ENV: &str = "SITE_GUARD_LOG";

/// Returns the app version sourced from root `VERSION`.
pub fn app_version() -> &'static str {
    APP_VERSION
}

/// Delivery settings.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct DeliverySettings {
    /// When `false`, every session uses the low tier.
    pub adaptive: bool,
    /// JSON file holding the last-known-good tier; memory-only when absent.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub tier_store_path: Option<PathBuf>,
}

impl Default for DeliverySettings {
    fn default() -> Self {
        Self {
            adaptive: true,
            tier_store_path: None,
        }
    }
}

/// Complete runtime configuration. Every section has defaults.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct SiteGuardConfig {
    /// Media host allowlists and proxy path.
    pub media: MediaUrlPolicy,
    /// Upload policy.
    pub upload: FilePolicy,
    /// Form schemas keyed by form name.
    pub forms: BTreeMap<String, FormSchema>,
    /// Adaptive delivery settings.
    pub delivery: DeliverySettings,
}

impl Default for SiteGuardConfig {
    fn default() -> Self {
        let forms = BTreeMap::from([
            ("booking".to_string(), FormSchema::booking()),
            ("contact".to_string(), FormSchema::contact()),
        ]);
        Self {
            media: MediaUrlPolicy::default(),
            upload: FilePolicy::default(),
            forms,
            delivery: DeliverySettings::default(),
        }
    }
}

impl SiteGuardConfig {
    /// Parses a JSON config; missing sections take defaults.
    ///
    /// # Errors
    /// Returns [`ConfigError::Parse`] for malformed JSON.
    pub fn from_json_str(raw: &str) -> Result<Self, ConfigError> {
        Ok(serde_json::from_str(raw)?)
    }

    /// Reads and parses a JSON config file.
    ///
    /// # Errors
    /// Returns [`ConfigError::Read`] or [`ConfigError::Parse`].
    pub fn load_from_path(path: &Path) -> Result<Self, ConfigError> {
        let raw = std::fs::read_to_string(path).map_err(|source| ConfigError::Read {
            path: path.to_path_buf(),
            source,
        })?;
        Self::from_json_str(&raw)
    }

    /// Loads config from `SITE_GUARD_CONFIG` (or defaults), applies env
    /// overrides, and validates the result.
    ///
    /// # Errors
    /// Returns [`ConfigError`] when the file cannot be read or parsed, or the
    /// resulting policy is invalid.
    pub fn from_env() -> Result<Self, ConfigError> {
        let base = match std::env::var_os(CONFIG_ENV) {
            Some(path) if !path.is_empty() => Self::load_from_path(Path::new(&path))?,
            _ => Self::default(),
        };
        let config = base.with_overrides(
            std::env::var(TRUSTED_HOSTS_ENV).ok().as_deref(),
            std::env::var(PROXY_ENDPOINT_ENV).ok().as_deref(),
            adaptive_delivery_enabled_from_env(),
        );
        config.validate()?;
        Ok(config)
    }

    /// Applies override values. Blank overrides are ignored, and a disabled
    /// kill-switch always wins over the file setting.
    pub fn with_overrides(
        mut self,
        trusted_hosts: Option<&str>,
        proxy_endpoint: Option<&str>,
        adaptive_enabled: bool,
    ) -> Self {
        if let Some(hosts) = trusted_hosts.filter(|hosts| !hosts.trim().is_empty()) {
            self.media = self.media.with_trusted_hosts(hosts.split(','));
        }
        if let Some(endpoint) = proxy_endpoint.map(str::trim).filter(|value| !value.is_empty()) {
            self.media = self.media.with_proxy_endpoint(endpoint);
        }
        self.delivery.adaptive = self.delivery.adaptive && adaptive_enabled;
        self
    }

    /// Checks cross-field constraints.
    ///
    /// # Errors
    /// Returns [`ConfigError::Invalid`] for an invalid media policy and
    /// [`ConfigError::Bounds`] for inverted upload bounds.
    pub fn validate(&self) -> Result<(), ConfigError> {
        self.media.validate()?;
        let upload = &self.upload;
        if upload.min_bytes > upload.max_bytes
            || upload.min_width > upload.max_width
            || upload.min_height > upload.max_height
        {
            return Err(ConfigError::Bounds(
                "upload minimums must not exceed maximums".to_string(),
            ));
        }
        Ok(())
    }
}

/// Checks the adaptive delivery kill-switch env var.
///
/// Semantics:
/// - Unset => adaptive delivery enabled.
/// - `0`, `false`, `off` (case-insensitive) => pinned to the low tier.
/// - Any other value => enabled.
pub fn adaptive_delivery_enabled_from_env() -> bool {
    match std::env::var(ADAPTIVE_DELIVERY_ENV) {
        Ok(value) => {
            let normalized = value.trim().to_ascii_lowercase();
            !(normalized == "0" || normalized == "false" || normalized == "off")
        }
        Err(_) => true,
    }
}

/// Installs the global `fmt` subscriber filtered by `SITE_GUARD_LOG`
/// (default `info`). Returns `false` when a subscriber was already set.
pub fn init_tracing() -> bool {
    let filter = tracing_subscriber::EnvFilter::try_from_env(LOG_ENV)
        .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("info"));
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .try_init()
        .is_ok()
}

/// Boundary facade.
#[derive(Debug)]
pub struct SiteGuard {
    config: SiteGuardConfig,
    resolver: MediaResolver,
    uploads: FileValidator,
    delivery: DeliveryContext,
}

impl SiteGuard {
    /// Builds the facade for a validated config.
    ///
    /// # Errors
    /// Returns [`AppError::Config`] when `config` is invalid.
    pub fn new(config: SiteGuardConfig) -> Result<Self, AppError> {
        config.validate()?;
        let resolver = MediaResolver::new(config.media.clone());
        let uploads = FileValidator::new(config.upload.clone());
        let store = match &config.delivery.tier_store_path {
            Some(path) => GuardedTierStore::new(FileTierStore::new(path)),
            None => GuardedTierStore::in_memory(),
        };
        let delivery = DeliveryContext::new(false)
            .with_store(store)
            .with_adaptive_delivery(config.delivery.adaptive);

        Ok(Self {
            config,
            resolver,
            uploads,
            delivery,
        })
    }

    /// Builds the facade from `SITE_GUARD_*` environment variables.
    ///
    /// # Errors
    /// Returns [`AppError::Config`] when the environment config is invalid.
    pub fn from_env() -> Result<Self, AppError> {
        Self::new(SiteGuardConfig::from_env()?)
    }

    /// Active configuration.
    pub fn config(&self) -> &SiteGuardConfig {
        &self.config
    }

    /// Scans free text.
    pub fn scan(&self, input: &str) -> ThreatReport {
        site_guard_scanner::scan(input)
    }

    /// Validates a submission against the named form schema.
    ///
    /// # Errors
    /// Returns [`AppError::UnknownForm`] when no schema has that name.
    pub fn validate_submission(
        &self,
        form: &str,
        fields: &BTreeMap<String, Value>,
    ) -> Result<FormValidation, AppError> {
        let schema = self
            .config
            .forms
            .get(form)
            .ok_or_else(|| AppError::UnknownForm(form.to_string()))?;
        let validation = validate_form(schema, fields);
        tracing::info!(
            form,
            is_valid = validation.is_valid,
            rejected_fields = validation.errors.len(),
            "form submission validated"
        );
        Ok(validation)
    }

    /// Validates a JSON-object submission body.
    ///
    /// # Errors
    /// Returns [`AppError::Codec`] for malformed JSON,
    /// [`AppError::InvalidSubmission`] when the body is not an object, and
    /// [`AppError::UnknownForm`] for an unknown form.
    pub fn validate_submission_json(&self, form: &str, body: &[u8]) -> Result<FormValidation, AppError> {
        let parsed: Value = serde_json::from_slice(body)?;
        let Value::Object(object) = parsed else {
            return Err(AppError::InvalidSubmission(
                "submission body must be a JSON object".to_string(),
            ));
        };
        let fields: BTreeMap<String, Value> = object.into_iter().collect();
        self.validate_submission(form, &fields)
    }

    /// Validates an upload.
    pub fn validate_upload(&self, upload: Option<&FileUpload>) -> FileValidationResult {
        self.uploads.validate(upload)
    }

    /// Resolves an image reference.
    pub fn resolve_media(&self, raw: &str) -> ResolvedMediaRef {
        self.resolver.resolve(raw)
    }

    /// Resolves an image reference, returning the typed error.
    ///
    /// # Errors
    /// Returns [`AppError::Media`] when the reference cannot be resolved.
    pub fn try_resolve_media(&self, raw: &str) -> Result<String, AppError> {
        Ok(self.resolver.try_resolve(raw)?.url)
    }

    /// Media resolver.
    pub fn resolver(&self) -> &MediaResolver {
        &self.resolver
    }

    /// Builds the session's delivery controller and evaluates `signals`.
    ///
    /// The facade models one session: every controller it builds shares one
    /// tier cache, so only the first evaluation classifies.
    pub fn delivery_controller(&self, signals: &EnvironmentSignals) -> AdaptiveDeliveryController {
        let engine = DeliveryContext::from_signals(signals).is_low_power_engine();
        let controller =
            AdaptiveDeliveryController::new(self.delivery.clone().with_low_power_engine(engine));
        let tier = controller.evaluate(signals);
        tracing::debug!(tier = %tier, low_power_engine = engine, "session delivery tier ready");
        controller
    }

    /// Mounts a gallery that follows `controller`'s tier.
    pub fn mount_gallery(
        &self,
        references: Vec<String>,
        controller: &AdaptiveDeliveryController,
    ) -> GalleryLoader {
        GalleryLoader::new(references, &self.resolver, controller.context().clone())
    }
}

/// Configuration load failures.
#[derive(Debug, Error)]
pub enum ConfigError {
    /// Config file could not be read.
    #[error("failed to read config file `{}`: {source}", path.display())]
    Read {
        /// File path.
        path: PathBuf,
        /// Underlying IO error.
        source: std::io::Error,
    },
    /// Config JSON is malformed.
    #[error("failed to parse config: {0}")]
    Parse(#[from] serde_json::Error),
    /// Media policy is invalid.
    #[error("invalid media policy: {0}")]
    Invalid(#[from] MediaError),
    /// Upload bounds are inconsistent.
    #[error("invalid upload policy: {0}")]
    Bounds(String),
}

/// App integration error type.
#[derive(Debug, Error)]
pub enum AppError {
    /// Configuration error.
    #[error("config error: {0}")]
    Config(#[from] ConfigError),
    /// No form schema with this name.
    #[error("unknown form: {0}")]
    UnknownForm(String),
    /// Submission body has the wrong shape.
    #[error("invalid submission: {0}")]
    InvalidSubmission(String),
    /// JSON decoding error.
    #[error("codec error: {0}")]
    Codec(#[from] serde_json::Error),
    /// Media resolution error.
    #[error("media error: {0}")]
    Media(#[from] MediaError),
    /// Core model error.
    #[error("core error: {0}")]
    Core(#[from] CoreError),
    /// File access error.
    #[error("io error: {0}")]
    Io(#[from] std::io::Error),
}
