//! Tests form aggregate serialization for forwarding to persistence.

use site_guard_core::{FormValidation, ValidationResult};

#[test]
fn form_codec_tests_preserve_errors_and_sanitized_data() {
    let mut form = FormValidation::new();
    form.record("email", ValidationResult::valid("jane@example.com"));
    form.record("phone", ValidationResult::invalid("phone number must contain 10 to 15 digits"));

    let encoded = form.to_json_bytes().expect("encoding should succeed");
    let decoded = FormValidation::from_json_bytes(&encoded).expect("decoding should succeed");

    assert_eq!(decoded, form);
    assert!(!decoded.is_valid);
    assert_eq!(decoded.data["email"], "jane@example.com");
}
