//! Shared fixtures for app integration tests.

use std::collections::BTreeMap;
use std::io::Cursor;

use image::{ImageFormat, RgbImage};
use serde_json::{Value, json};
use site_guard_app::{SiteGuard, SiteGuardConfig};

/// Facade over the default config trusting the site domain and one CDN host.
#[allow(dead_code)]
pub fn guard() -> SiteGuard {
    let config = SiteGuardConfig::default().with_overrides(Some("example.com, cdn.example.net"), None, true);
    SiteGuard::new(config).expect("default config should be valid")
}

/// Builds a submission map from literal pairs.
#[allow(dead_code)]
pub fn submission(pairs: &[(&str, Value)]) -> BTreeMap<String, Value> {
    pairs
        .iter()
        .map(|(key, value)| ((*key).to_string(), value.clone()))
        .collect()
}

/// A contact submission every default rule accepts.
#[allow(dead_code)]
pub fn clean_contact() -> BTreeMap<String, Value> {
    submission(&[
        ("name", json!("Mary-Jane O'Neil")),
        ("email", json!("Mary@Example.com")),
        ("phone", json!("(555) 123-4567")),
        ("message", json!("Please call me about a weekly booking.")),
        ("consent", json!(true)),
    ])
}

/// Encodes a deterministic noise PNG large enough to clear the size floor.
#[allow(dead_code)]
pub fn noisy_png(width: u32, height: u32) -> Vec<u8> {
    let mut state: u64 = 0x2545_f491_4f6c_dd1d;
    let image = RgbImage::from_fn(width, height, |_, _| {
        let mut channel = || {
            state ^= state << 13;
            state ^= state >> 7;
            state ^= state << 17;
            (state >> 24) as u8
        };
        image::Rgb([channel(), channel(), channel()])
    });

    let mut encoded = Cursor::new(Vec::new());
    image
        .write_to(&mut encoded, ImageFormat::Png)
        .expect("fixture image should encode");
    encoded.into_inner()
}
