#![warn(missing_docs)]
//! # site-guard-media
//!
//! ## Purpose
//! Turns image references from mixed-trust origins into URLs the page can load
//! without mixed content or direct hotlinks to unknown hosts.
//!
//! ## Responsibilities
//! - Pass same-origin paths, `data:` URIs, and dev-host URLs through unchanged.
//! - Upgrade `http` to `https` for every non-dev host.
//! - Load allowlisted hosts directly and route everything else through the
//!   same-origin image proxy.
//! - Retry a failed direct load once through the proxy (see [`loader`]).
//!
//! ## Data flow
//! Gallery item reference -> [`MediaResolver::resolve`] -> [`ResolvedMediaRef`]
//! -> caller requests `secure_url` (or hands it to [`loader::MediaLoader`]).
//!
//! ## Ownership and lifetimes
//! The resolver owns its [`MediaUrlPolicy`]; every resolution returns owned
//! strings so callers can keep them past the input's lifetime.
//!
//! ## Error model
//! [`MediaResolver::try_resolve`] reports a typed [`MediaError`];
//! [`MediaResolver::resolve`] folds it into an invalid [`ResolvedMediaRef`] and
//! never panics.
//!
//! ## Security and privacy notes
//! A valid resolution never carries an `http:` URL to a non-dev host, nor an
//! absolute URL to a host outside the allowlist. Log events carry the route
//! only, never the reference itself.
//!
//! ## Example
//! ```rust
//! use site_guard_media::{MediaResolver, MediaRoute};
//!
//! let resolver = MediaResolver::default();
//! let resolved = resolver.resolve("http://example.com/a.jpg");
//! assert_eq!(resolved.secure_url, "https://example.com/a.jpg");
//! assert_eq!(resolved.route, MediaRoute::Upgraded);
//!
//! let proxied = resolver.resolve("https://other.test/b.png");
//! assert_eq!(
//!     proxied.secure_url,
//!     "/api/image-proxy?url=https%3A%2F%2Fother.test%2Fb.png"
//! );
//! ```

pub mod loader;

use serde::{Deserialize, Serialize};
use site_guard_core::ErrorClass;
use thiserror::Error;
use url::{Url, form_urlencoded};

pub use loader::{LoadFailure, LoadedMedia, MediaFallback, MediaFetcher, MediaLoader};

/// Default same-origin proxy path.
pub const DEFAULT_PROXY_ENDPOINT: &str = "/api/image-proxy";

/// Host allowlists and proxy location.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct MediaUrlPolicy {
    /// Own domain and CDN hosts; subdomains match too.
    pub trusted_hosts: Vec<String>,
    /// Local development hosts exempt from the `https` upgrade.
    pub dev_hosts: Vec<String>,
    /// Same-origin path of the image proxy.
    pub proxy_endpoint: String,
}

impl Default for MediaUrlPolicy {
    fn default() -> Self {
        Self {
            trusted_hosts: vec!["example.com".to_string(), "res.cloudinary.com".to_string()],
            dev_hosts: ["localhost", "127.0.0.1", "0.0.0.0", "[::1]"]
                .into_iter()
                .map(str::to_string)
                .collect(),
            proxy_endpoint: DEFAULT_PROXY_ENDPOINT.to_string(),
        }
    }
}

impl MediaUrlPolicy {
    /// Replaces the trusted host list, normalizing case and blanks.
    pub fn with_trusted_hosts<I, S>(mut self, hosts: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: AsRef<str>,
    {
        self.trusted_hosts = hosts
            .into_iter()
            .map(|host| host.as_ref().trim().trim_end_matches('.').to_ascii_lowercase())
            .filter(|host| !host.is_empty())
            .collect();
        self
    }

    /// Replaces the proxy endpoint.
    pub fn with_proxy_endpoint(mut self, endpoint: impl Into<String>) -> Self {
        self.proxy_endpoint = endpoint.into();
        self
    }

    /// Checks that the proxy endpoint is a same-origin path.
    ///
    /// # Errors
    /// Returns [`MediaError::InvalidProxyEndpoint`] for absolute,
    /// protocol-relative, or query-carrying endpoints.
    pub fn validate(&self) -> Result<(), MediaError> {
        let endpoint = self.proxy_endpoint.as_str();
        if !endpoint.starts_with('/') || endpoint.starts_with("//") || endpoint.contains('?') {
            return Err(MediaError::InvalidProxyEndpoint(endpoint.to_string()));
        }
        Ok(())
    }

    /// Returns `true` when `host` equals a trusted host or is a subdomain of one.
    pub fn is_trusted_host(&self, host: &str) -> bool {
        let host = host.trim_end_matches('.').to_ascii_lowercase();
        self.trusted_hosts.iter().any(|trusted| {
            let trusted = trusted.to_ascii_lowercase();
            host == trusted
                || host
                    .strip_suffix(trusted.as_str())
                    .is_some_and(|prefix| prefix.ends_with('.'))
        })
    }

    /// Returns `true` when `host` is a local development host.
    pub fn is_dev_host(&self, host: &str) -> bool {
        self.dev_hosts
            .iter()
            .any(|dev| dev.eq_ignore_ascii_case(host))
    }

    /// Builds the proxy URL for an absolute `https` target.
    pub fn proxy_url(&self, target: &str) -> String {
        let encoded: String = form_urlencoded::byte_serialize(target.as_bytes()).collect();
        format!("{}?url={encoded}", self.proxy_endpoint)
    }
}

/// How a reference was routed.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum MediaRoute {
    /// Same-origin path, `data:` URI, or dev host; returned unchanged.
    PassThrough,
    /// `https` URL on a trusted host.
    Direct,
    /// `http` URL on a trusted host, rewritten to `https`.
    Upgraded,
    /// Untrusted host, routed through the image proxy.
    Proxied,
    /// Reference could not be resolved.
    Rejected,
}

/// Successful resolution.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Resolution {
    /// URL safe to request.
    pub url: String,
    /// Route that produced `url`.
    pub route: MediaRoute,
}

/// Resolver outcome in value form.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ResolvedMediaRef {
    /// `true` iff `error` is `None`.
    pub is_valid: bool,
    /// Loadable URL, or the trimmed input when invalid.
    pub secure_url: String,
    /// Reason the reference was rejected.
    pub error: Option<String>,
    /// Route taken.
    pub route: MediaRoute,
}

impl From<Resolution> for ResolvedMediaRef {
    fn from(resolution: Resolution) -> Self {
        Self {
            is_valid: true,
            secure_url: resolution.url,
            error: None,
            route: resolution.route,
        }
    }
}

/// Pure reference resolver bound to one policy.
#[derive(Debug, Clone, Default)]
pub struct MediaResolver {
    policy: MediaUrlPolicy,
}

impl MediaResolver {
    /// Creates a resolver for `policy`.
    pub fn new(policy: MediaUrlPolicy) -> Self {
        Self { policy }
    }

    /// Returns the active policy.
    pub fn policy(&self) -> &MediaUrlPolicy {
        &self.policy
    }

    /// Resolves `raw`, folding failures into an invalid result.
    pub fn resolve(&self, raw: &str) -> ResolvedMediaRef {
        match self.try_resolve(raw) {
            Ok(resolution) => resolution.into(),
            Err(error) => ResolvedMediaRef {
                is_valid: false,
                secure_url: raw.trim().to_string(),
                error: Some(error.to_string()),
                route: MediaRoute::Rejected,
            },
        }
    }

    /// Resolves `raw` into a loadable URL.
    ///
    /// Stable under re-application: resolving a resolved URL returns it
    /// unchanged.
    ///
    /// # Errors
    /// Returns [`MediaError`] for empty, unparseable, host-less, or
    /// non-`http(s)` references.
    pub fn try_resolve(&self, raw: &str) -> Result<Resolution, MediaError> {
        let outcome = self.route(raw.trim());
        match &outcome {
            Ok(resolution) => tracing::debug!(route = ?resolution.route, "media reference resolved"),
            Err(error) => tracing::debug!(class = ?error.class(), "media reference rejected"),
        }
        outcome
    }

    fn route(&self, raw: &str) -> Result<Resolution, MediaError> {
        let normalized = normalize_reference(raw);
        let trimmed = normalized.as_str();
        if trimmed.is_empty() {
            return Err(MediaError::Empty);
        }

        if is_same_origin_path(trimmed) || has_data_scheme(trimmed) {
            return Ok(pass_through(trimmed));
        }

        let candidate = match trimmed.strip_prefix("//") {
            Some(rest) => format!("https://{rest}"),
            None => trimmed.to_string(),
        };
        let mut parsed =
            Url::parse(&candidate).map_err(|error| MediaError::Unparseable(error.to_string()))?;

        let scheme = parsed.scheme().to_string();
        if scheme != "http" && scheme != "https" {
            return Err(MediaError::UnsupportedScheme(scheme));
        }

        let host = match parsed.host_str() {
            Some(host) if !host.is_empty() => host.to_string(),
            _ => return Err(MediaError::MissingHost),
        };

        if self.policy.is_dev_host(&host) {
            return Ok(pass_through(trimmed));
        }

        let upgraded = scheme == "http";
        if upgraded && parsed.set_scheme("https").is_err() {
            return Err(MediaError::UnsupportedScheme(scheme));
        }

        if self.policy.is_trusted_host(&host) {
            let route = if upgraded {
                MediaRoute::Upgraded
            } else {
                MediaRoute::Direct
            };
            return Ok(Resolution {
                url: parsed.to_string(),
                route,
            });
        }

        Ok(Resolution {
            url: self.policy.proxy_url(parsed.as_str()),
            route: MediaRoute::Proxied,
        })
    }
}

/// Reads a reference the way a browser does before resolving it: tab and
/// newline characters vanish, and any two leading slashes or backslashes
/// start a protocol-relative URL.
fn normalize_reference(raw: &str) -> String {
    let cleaned: String = raw
        .chars()
        .filter(|character| !matches!(character, '\t' | '\n' | '\r'))
        .collect();
    let protocol_relative = matches!(cleaned.as_bytes(), [b'/' | b'\\', b'/' | b'\\', ..]);
    if protocol_relative {
        format!("//{}", &cleaned[2..])
    } else {
        cleaned
    }
}

fn is_same_origin_path(reference: &str) -> bool {
    reference.starts_with('/') && !reference.starts_with("//")
}

fn has_data_scheme(reference: &str) -> bool {
    reference
        .get(..5)
        .is_some_and(|prefix| prefix.eq_ignore_ascii_case("data:"))
}

fn pass_through(reference: &str) -> Resolution {
    Resolution {
        url: reference.to_string(),
        route: MediaRoute::PassThrough,
    }
}

/// Media resolution and load errors.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum MediaError {
    /// Reference was blank.
    #[error("image reference is empty")]
    Empty,
    /// Reference is not a URL or a same-origin path.
    #[error("image reference is not a valid URL: {0}")]
    Unparseable(String),
    /// Absolute URL without a host.
    #[error("image URL has no host")]
    MissingHost,
    /// Scheme other than `http`/`https`.
    #[error("image URL scheme {0:?} is not allowed")]
    UnsupportedScheme(String),
    /// Configured proxy endpoint is not a same-origin path.
    #[error("proxy endpoint must be a same-origin path: {0:?}")]
    InvalidProxyEndpoint(String),
    /// Network or CORS failure while fetching a resolved URL.
    #[error("image transport failure: {0}")]
    Transport(String),
}

impl MediaError {
    /// Error taxonomy class.
    pub fn class(&self) -> ErrorClass {
        match self {
            Self::Transport(_) => ErrorClass::TransportFailure,
            Self::UnsupportedScheme(_) | Self::InvalidProxyEndpoint(_) => {
                ErrorClass::PolicyRejection
            }
            Self::Empty | Self::Unparseable(_) | Self::MissingHost => ErrorClass::Format,
        }
    }
}
