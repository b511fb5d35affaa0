//! Integration tests for upload rejection classes at the app boundary.

mod common;

use site_guard_core::ErrorClass;
use site_guard_upload::{FileUpload, SignatureKind, UploadError};

#[test]
fn upload_error_classification_tests_maps_each_failure_to_its_class() {
    let cases = [
        (UploadError::Missing, ErrorClass::Format),
        (UploadError::Undecodable, ErrorClass::Format),
        (
            UploadError::ContentTypeMismatch("image/png".to_string()),
            ErrorClass::Format,
        ),
        (
            UploadError::TooLarge {
                max: 10,
                actual: 11,
            },
            ErrorClass::PolicyRejection,
        ),
        (
            UploadError::MimeNotAllowed("image/svg+xml".to_string()),
            ErrorClass::PolicyRejection,
        ),
        (
            UploadError::MaliciousSignature(SignatureKind::Elf),
            ErrorClass::SecurityRejection,
        ),
    ];

    for (error, class) in cases {
        assert_eq!(error.class(), class, "{error}");
    }
}

#[test]
fn upload_error_classification_tests_facade_accepts_clean_image() {
    let guard = common::guard();
    let upload = FileUpload::new("Garden.PNG", "image/png", common::noisy_png(160, 120));

    let result = guard.validate_upload(Some(&upload));

    assert!(result.is_valid, "{:?}", result.errors);
    assert_eq!(result.sanitized_name, "garden.png");
    let accepted = result.file.expect("accepted file should be present");
    assert_eq!(accepted.dimensions.width, 160);
    assert_eq!(accepted.dimensions.height, 120);
}

#[test]
fn upload_error_classification_tests_missing_upload_is_rejected() {
    let guard = common::guard();
    let result = guard.validate_upload(None);

    assert!(!result.is_valid);
    assert_eq!(result.errors, vec!["no file was provided".to_string()]);
    assert!(result.file.is_none());
}

#[test]
fn upload_error_classification_tests_svg_is_not_an_allowed_type() {
    let guard = common::guard();
    let svg = format!(
        "<svg xmlns=\"http://www.w3.org/2000/svg\">{}</svg>",
        " ".repeat(2048)
    );
    let upload = FileUpload::new("logo.svg", "image/svg+xml", svg.into_bytes());

    let result = guard.validate_upload(Some(&upload));

    assert!(!result.is_valid);
    assert!(result.errors.iter().any(|error| error.contains("not allowed")));
}
