//! Integration tests for the single proxy-retry rule.

mod common;

use common::ScriptedFetcher;
use site_guard_core::ErrorClass;
use site_guard_media::{MediaFallback, MediaLoader, MediaResolver, MediaRoute};

fn loader(fetcher: ScriptedFetcher) -> MediaLoader<ScriptedFetcher> {
    MediaLoader::new(MediaResolver::default(), fetcher)
}

#[test]
fn proxy_retry_tests_direct_success_uses_one_attempt() {
    let loader = loader(ScriptedFetcher::default());

    let loaded = loader
        .load("https://example.com/a.jpg")
        .expect("direct load should succeed");

    assert_eq!(loaded.attempts, 1);
    assert_eq!(loaded.route, MediaRoute::Direct);
}

#[test]
fn proxy_retry_tests_direct_failure_retries_once_through_proxy() {
    let loader = loader(ScriptedFetcher::failing_on(&["https://example.com/"]));

    let loaded = loader
        .load("http://example.com/a.jpg")
        .expect("proxy retry should succeed");

    assert_eq!(loaded.attempts, 2);
    assert_eq!(loaded.route, MediaRoute::Proxied);
    assert_eq!(
        loaded.url,
        "/api/image-proxy?url=https%3A%2F%2Fexample.com%2Fa.jpg"
    );
}

#[test]
fn proxy_retry_tests_second_failure_is_terminal_with_retry_placeholder() {
    let fetcher = ScriptedFetcher::failing_on(&["example.com"]);
    let loader = loader(fetcher);

    let failure = loader
        .load("https://example.com/a.jpg")
        .expect_err("both attempts should fail");

    assert_eq!(failure.attempts, 2);
    assert_eq!(failure.fallback, MediaFallback::Placeholder { retry: true });
    assert_eq!(failure.reason.class(), ErrorClass::TransportFailure);
}

#[test]
fn proxy_retry_tests_proxied_failure_is_not_retried() {
    let fetcher = ScriptedFetcher::failing_on(&["/api/image-proxy"]);
    let loader = loader(fetcher);

    let failure = loader
        .load("https://elsewhere.test/a.jpg")
        .expect_err("proxied load should fail");

    assert_eq!(failure.attempts, 1);
    assert_eq!(failure.fallback, MediaFallback::Placeholder { retry: true });
}

#[test]
fn proxy_retry_tests_invalid_reference_never_fetches() {
    let loader = loader(ScriptedFetcher::default());

    let failure = loader
        .load("javascript:alert(1)")
        .expect_err("script reference should be rejected");

    assert_eq!(failure.attempts, 0);
    assert_eq!(failure.fallback, MediaFallback::Placeholder { retry: false });
}

#[test]
fn proxy_retry_tests_records_request_order() {
    let fetcher = ScriptedFetcher::failing_on(&["https://res.cloudinary.com/"]);
    let loader = MediaLoader::new(MediaResolver::default(), &fetcher);

    loader
        .load("//res.cloudinary.com/demo/x.png")
        .expect("proxy retry should succeed");

    assert_eq!(
        fetcher.requests(),
        vec![
            "https://res.cloudinary.com/demo/x.png".to_string(),
            "/api/image-proxy?url=https%3A%2F%2Fres.cloudinary.com%2Fdemo%2Fx.png".to_string(),
        ]
    );
}
