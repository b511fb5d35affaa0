//! Single-retry media loading.
//!
//! A transport failure on a [`MediaRoute::Direct`] or [`MediaRoute::Upgraded`]
//! route is retried exactly once through the image proxy. Every other failure
//! is terminal and tells the caller to show a placeholder.

use std::sync::Arc;

use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::{MediaError, MediaResolver, MediaRoute};

/// Transport used to fetch resolved URLs.
pub trait MediaFetcher: Send + Sync {
    /// Fetches `url` and returns the payload.
    ///
    /// # Errors
    /// Returns [`MediaError::Transport`] for network or CORS failures.
    fn fetch(&self, url: &str) -> Result<Vec<u8>, MediaError>;
}

impl<T: MediaFetcher + ?Sized> MediaFetcher for &T {
    fn fetch(&self, url: &str) -> Result<Vec<u8>, MediaError> {
        (**self).fetch(url)
    }
}

impl<T: MediaFetcher + ?Sized> MediaFetcher for Arc<T> {
    fn fetch(&self, url: &str) -> Result<Vec<u8>, MediaError> {
        (**self).fetch(url)
    }
}

/// What the caller should render after a terminal failure.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum MediaFallback {
    /// Placeholder image, optionally with a retry affordance.
    Placeholder {
        /// Whether a manual retry may succeed.
        retry: bool,
    },
}

/// Successfully fetched media.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LoadedMedia {
    /// URL that produced the payload.
    pub url: String,
    /// Route of the successful attempt.
    pub route: MediaRoute,
    /// Fetched bytes.
    pub bytes: Vec<u8>,
    /// Fetch attempts made, including the successful one.
    pub attempts: u32,
}

/// Terminal load failure.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("image load failed after {attempts} attempt(s): {reason}")]
pub struct LoadFailure {
    /// Last error observed.
    pub reason: MediaError,
    /// Fetch attempts made.
    pub attempts: u32,
    /// Rendering fallback.
    pub fallback: MediaFallback,
}

/// Resolver plus fetcher with the proxy-retry rule applied.
#[derive(Debug, Clone)]
pub struct MediaLoader<F> {
    resolver: MediaResolver,
    fetcher: F,
}

impl<F: MediaFetcher> MediaLoader<F> {
    /// Creates a loader.
    pub fn new(resolver: MediaResolver, fetcher: F) -> Self {
        Self { resolver, fetcher }
    }

    /// Returns the resolver.
    pub fn resolver(&self) -> &MediaResolver {
        &self.resolver
    }

    /// Resolves and fetches `raw`.
    ///
    /// # Errors
    /// Returns [`LoadFailure`] when the reference is invalid (no fetch is made
    /// and no retry is offered) or when every allowed attempt failed.
    pub fn load(&self, raw: &str) -> Result<LoadedMedia, LoadFailure> {
        let resolution = self.resolver.try_resolve(raw).map_err(|reason| LoadFailure {
            reason,
            attempts: 0,
            fallback: MediaFallback::Placeholder { retry: false },
        })?;

        let first_error = match self.fetcher.fetch(&resolution.url) {
            Ok(bytes) => {
                return Ok(LoadedMedia {
                    url: resolution.url,
                    route: resolution.route,
                    bytes,
                    attempts: 1,
                });
            }
            Err(error) => error,
        };

        if !matches!(resolution.route, MediaRoute::Direct | MediaRoute::Upgraded) {
            tracing::warn!(route = ?resolution.route, "image load failed");
            return Err(terminal(first_error, 1));
        }

        tracing::debug!(route = ?resolution.route, "direct image load failed; retrying through proxy");
        let proxied = self.resolver.policy().proxy_url(&resolution.url);
        match self.fetcher.fetch(&proxied) {
            Ok(bytes) => Ok(LoadedMedia {
                url: proxied,
                route: MediaRoute::Proxied,
                bytes,
                attempts: 2,
            }),
            Err(error) => {
                tracing::warn!("image load failed through proxy retry");
                Err(terminal(error, 2))
            }
        }
    }
}

fn terminal(reason: MediaError, attempts: u32) -> LoadFailure {
    LoadFailure {
        reason,
        attempts,
        fallback: MediaFallback::Placeholder { retry: true },
    }
}
