//! Integration tests asserting resolved media never downgrades transport.

mod common;

use site_guard_app::AppError;
use site_guard_media::{MediaError, MediaRoute};

#[test]
fn transport_security_tests_never_emits_plain_http_for_remote_hosts() {
    let guard = common::guard();
    let references = [
        "http://example.com/hero.jpg",
        "http://static.example.com/hero.jpg",
        "https://cdn.example.net/a.webp",
        "http://tracker.example.org/pixel.gif",
        "//images.example.org/b.png",
        "HTTP://EXAMPLE.COM/c.jpg",
    ];

    for reference in references {
        let resolved = guard.resolve_media(reference);
        assert!(resolved.is_valid, "{reference}: {:?}", resolved.error);
        assert!(
            resolved.secure_url.starts_with("https://") || resolved.secure_url.starts_with("/api/"),
            "{reference} resolved to {}",
            resolved.secure_url
        );
    }
}

#[test]
fn transport_security_tests_untrusted_hosts_go_through_the_proxy() {
    let guard = common::guard();
    let resolved = guard.resolve_media("http://tracker.example.org/pixel.gif");

    assert_eq!(resolved.route, MediaRoute::Proxied);
    assert_eq!(
        resolved.secure_url,
        "/api/image-proxy?url=https%3A%2F%2Ftracker.example.org%2Fpixel.gif"
    );
}

#[test]
fn transport_security_tests_dev_hosts_keep_their_scheme() {
    let guard = common::guard();
    let resolved = guard.resolve_media("http://localhost:3000/uploads/a.png");

    assert_eq!(resolved.route, MediaRoute::PassThrough);
    assert_eq!(resolved.secure_url, "http://localhost:3000/uploads/a.png");
}

#[test]
fn transport_security_tests_rejects_script_and_file_schemes() {
    let guard = common::guard();

    for reference in ["javascript:alert(1)", "file:///etc/passwd", "ftp://example.com/a.jpg"] {
        let resolved = guard.resolve_media(reference);
        assert!(!resolved.is_valid, "{reference}");
        assert_eq!(resolved.route, MediaRoute::Rejected);
        assert!(matches!(
            guard.try_resolve_media(reference),
            Err(AppError::Media(MediaError::UnsupportedScheme(_)))
        ));
    }
}
