//! Shared fixtures for media integration tests.

use std::sync::Mutex;

use site_guard_media::{MediaError, MediaFetcher};

/// Fetcher that fails for URLs containing any listed marker and records every
/// requested URL.
#[derive(Debug, Default)]
pub struct ScriptedFetcher {
    failing_markers: Vec<String>,
    requests: Mutex<Vec<String>>,
}

#[allow(dead_code)]
impl ScriptedFetcher {
    /// Fetcher that fails for URLs containing any of `markers`.
    pub fn failing_on(markers: &[&str]) -> Self {
        Self {
            failing_markers: markers.iter().map(|marker| marker.to_string()).collect(),
            requests: Mutex::new(Vec::new()),
        }
    }

    /// URLs requested so far, in order.
    pub fn requests(&self) -> Vec<String> {
        self.requests.lock().expect("request log lock").clone()
    }
}

impl MediaFetcher for ScriptedFetcher {
    fn fetch(&self, url: &str) -> Result<Vec<u8>, MediaError> {
        self.requests
            .lock()
            .expect("request log lock")
            .push(url.to_string());
        if self
            .failing_markers
            .iter()
            .any(|marker| url.contains(marker.as_str()))
        {
            return Err(MediaError::Transport("connection reset".to_string()));
        }
        Ok(url.as_bytes().to_vec())
    }
}
