//! Shared fixtures for delivery integration tests.

use std::path::PathBuf;
use std::time::{SystemTime, UNIX_EPOCH};

use site_guard_delivery::EnvironmentSignals;

/// iPhone Safari user agent.
#[allow(dead_code)]
pub const IPHONE_SAFARI: &str = "Mozilla/5.0 (iPhone; CPU iPhone OS 17_4 like Mac OS X) AppleWebKit/605.1.15 (KHTML, like Gecko) Version/17.4 Mobile/15E148 Safari/604.1";

/// Unique scratch path under the system temp directory.
#[allow(dead_code)]
pub fn temp_store_path(label: &str) -> PathBuf {
    let stamp = SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .map(|value| value.as_nanos())
        .unwrap_or_default();
    std::env::temp_dir()
        .join(format!("site-guard-delivery-{label}-{}-{stamp}", std::process::id()))
        .join("tier.json")
}

/// Two cores, 2 GB, data saver on.
#[allow(dead_code)]
pub fn constrained_signals() -> EnvironmentSignals {
    EnvironmentSignals {
        hardware_concurrency: Some(2),
        device_memory_gb: Some(2.0),
        save_data: Some(true),
        ..EnvironmentSignals::default()
    }
}

/// Eight cores, 8 GB, 4g, wide viewport.
#[allow(dead_code)]
pub fn capable_signals() -> EnvironmentSignals {
    EnvironmentSignals {
        hardware_concurrency: Some(8),
        device_memory_gb: Some(8.0),
        effective_type: Some("4g".to_string()),
        viewport_width: Some(1440),
        ..EnvironmentSignals::default()
    }
}
