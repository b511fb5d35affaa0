//! Integration tests for media reference routing.

use proptest::prelude::*;
use site_guard_media::{MediaResolver, MediaRoute, MediaUrlPolicy};
use url::Url;

fn resolver() -> MediaResolver {
    MediaResolver::default()
}

#[test]
fn media_resolution_tests_upgrades_trusted_http_to_https() {
    let resolved = resolver().resolve("http://example.com/a.jpg");

    assert!(resolved.is_valid);
    assert_eq!(resolved.secure_url, "https://example.com/a.jpg");
    assert_eq!(resolved.route, MediaRoute::Upgraded);
}

#[test]
fn media_resolution_tests_proxies_untrusted_https() {
    let resolved = resolver().resolve("https://untrusted.example.org/b.png");

    assert!(resolved.is_valid);
    assert_eq!(
        resolved.secure_url,
        "/api/image-proxy?url=https%3A%2F%2Funtrusted.example.org%2Fb.png"
    );
    assert_eq!(resolved.route, MediaRoute::Proxied);
}

#[test]
fn media_resolution_tests_upgrades_untrusted_http_before_proxying() {
    let resolved = resolver().resolve("http://photos.other.test/c d.jpg?w=300");

    assert_eq!(resolved.route, MediaRoute::Proxied);
    assert!(resolved.secure_url.starts_with("/api/image-proxy?url=https%3A%2F%2F"));
    assert!(!resolved.secure_url.contains("http%3A"));
}

#[test]
fn media_resolution_tests_passes_through_local_and_inline_references() {
    for reference in [
        "/images/gallery/1.webp",
        "data:image/png;base64,iVBORw0KGgo=",
        "DATA:image/gif;base64,R0lGOD",
        "http://localhost:3000/a.jpg",
        "http://127.0.0.1/a.jpg",
        "http://[::1]:8080/a.jpg",
        "https://0.0.0.0/a.jpg",
    ] {
        let resolved = resolver().resolve(reference);
        assert!(resolved.is_valid, "{reference}");
        assert_eq!(resolved.secure_url, reference);
        assert_eq!(resolved.route, MediaRoute::PassThrough, "{reference}");
    }
}

#[test]
fn media_resolution_tests_rejects_unloadable_references() {
    for reference in ["", "  ", "not a url", "javascript:alert(1)", "https://", "mailto:a@b.test"] {
        let resolved = resolver().resolve(reference);
        assert!(!resolved.is_valid, "{reference}");
        assert!(resolved.error.is_some());
        assert_eq!(resolved.route, MediaRoute::Rejected);
    }
}

#[test]
fn media_resolution_tests_backslash_and_control_variants_are_protocol_relative() {
    let proxied = "/api/image-proxy?url=https%3A%2F%2Fevil.test%2Fx.jpg";
    for reference in [
        "/\\evil.test/x.jpg",
        "\\\\evil.test/x.jpg",
        "\\/evil.test/x.jpg",
        "/\t/evil.test/x.jpg",
        "/\n/evil.test/x.jpg",
        "\r//evil.test/x.jpg",
    ] {
        let resolved = resolver().resolve(reference);
        assert!(resolved.is_valid, "{reference:?}");
        assert_eq!(resolved.route, MediaRoute::Proxied, "{reference:?}");
        assert_eq!(resolved.secure_url, proxied);
    }

    let trusted = resolver().resolve("/\\example.com/a.jpg");
    assert_eq!(trusted.route, MediaRoute::Direct);
    assert_eq!(trusted.secure_url, "https://example.com/a.jpg");

    let local = resolver().resolve("/images/\tgallery/1.webp");
    assert_eq!(local.route, MediaRoute::PassThrough);
    assert_eq!(local.secure_url, "/images/gallery/1.webp");
}

#[test]
fn media_resolution_tests_valid_results_never_load_from_untrusted_hosts() {
    let resolver = resolver();
    let page = Url::parse("https://site.test/gallery/").expect("page url");
    for reference in [
        "/images/a.jpg",
        "/\\evil.test/x.jpg",
        "/\t/evil.test/x.jpg",
        "//evil.test/x.jpg",
        "http://evil.test/x.jpg",
        "https://example.com/ok.jpg",
        "/api/image-proxy?url=https%3A%2F%2Fevil.test%2Fx.jpg",
    ] {
        let resolved = resolver.resolve(reference);
        assert!(resolved.is_valid, "{reference:?}");
        let target = page.join(&resolved.secure_url).expect("joined url");
        let host = target.host_str().expect("host");
        assert!(
            host == "site.test" || resolver.policy().is_trusted_host(host),
            "{reference:?} loads from {target}"
        );
    }
}

#[test]
fn media_resolution_tests_honors_custom_trusted_hosts() {
    let policy = MediaUrlPolicy::default().with_trusted_hosts([" Cdn.Cleaning.Test ", ""]);
    let resolver = MediaResolver::new(policy);

    assert_eq!(
        resolver.resolve("https://img.cdn.cleaning.test/a.jpg").route,
        MediaRoute::Direct
    );
    assert_eq!(
        resolver.resolve("https://example.com/a.jpg").route,
        MediaRoute::Proxied
    );
}

#[test]
fn media_resolution_tests_policy_deserializes_with_defaults() {
    let policy: MediaUrlPolicy =
        serde_json::from_str(r#"{"trusted_hosts":["cdn.test"]}"#).expect("policy json");

    assert_eq!(policy.trusted_hosts, vec!["cdn.test".to_string()]);
    assert_eq!(policy.proxy_endpoint, "/api/image-proxy");
    assert!(policy.is_dev_host("localhost"));
}

fn reference_strategy() -> impl Strategy<Value = String> {
    let prefix = prop_oneof![
        Just("http://"),
        Just("https://"),
        Just("//"),
        Just("HTTPS://"),
        Just("/"),
        Just("/\\"),
        Just("\\\\"),
        Just("/\t/"),
        Just("data:image/png;base64,"),
        Just("ftp://"),
    ];
    let host = prop_oneof![
        Just("example.com"),
        Just("cdn.example.com"),
        Just("res.cloudinary.com"),
        Just("photos.untrusted.test"),
        Just("localhost:3000"),
        Just("127.0.0.1"),
        Just("notexample.com"),
    ];
    (prefix, host, "[a-z0-9/_.-]{0,24}", prop::option::of("[a-z0-9=&]{1,12}")).prop_map(
        |(prefix, host, path, query)| {
            let mut reference = format!("{prefix}{host}/{path}");
            if let Some(query) = query {
                reference.push('?');
                reference.push_str(&query);
            }
            reference
        },
    )
}

proptest! {
    #[test]
    fn media_resolution_tests_resolution_is_stable(reference in reference_strategy()) {
        let resolver = resolver();
        let first = resolver.resolve(&reference);
        if first.is_valid {
            let second = resolver.resolve(&first.secure_url);
            prop_assert!(second.is_valid);
            prop_assert_eq!(&second.secure_url, &first.secure_url);
        }
    }

    #[test]
    fn media_resolution_tests_valid_absolute_urls_are_encrypted_and_trusted(
        reference in reference_strategy()
    ) {
        let resolver = resolver();
        let resolved = resolver.resolve(&reference);
        if resolved.is_valid && resolved.route != MediaRoute::PassThrough {
            let absolute = resolved.secure_url.starts_with("https://");
            prop_assert!(absolute || resolved.secure_url.starts_with("/api/image-proxy?url="));
            if absolute {
                let parsed = Url::parse(&resolved.secure_url).expect("absolute url");
                let host = parsed.host_str().expect("host");
                prop_assert!(resolver.policy().is_trusted_host(host));
            }
        }
    }

    #[test]
    fn media_resolution_tests_pass_through_stays_on_the_page_or_a_dev_host(
        reference in reference_strategy()
    ) {
        let resolver = resolver();
        let resolved = resolver.resolve(&reference);
        if resolved.route == MediaRoute::PassThrough && !resolved.secure_url.starts_with("data:") {
            let page = Url::parse("https://site.test/gallery/").expect("page url");
            let target = page.join(&resolved.secure_url).expect("joined url");
            let host = target.host_str().expect("host");
            prop_assert!(host == "site.test" || resolver.policy().is_dev_host(host));
        }
    }
}
