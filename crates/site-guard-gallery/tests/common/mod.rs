//! Shared fixtures for gallery integration tests.

use site_guard_delivery::{DeliveryContext, PerformanceTier};
use site_guard_gallery::{GalleryLoader, LoadOutcome, LoadTicket};
use site_guard_media::MediaResolver;

/// Context already evaluated at `tier` on a non-WebKit engine.
#[allow(dead_code)]
pub fn context_at(tier: PerformanceTier) -> DeliveryContext {
    let context = DeliveryContext::new(false);
    context.cache().initialize(tier);
    context
}

/// Gallery of `count` same-origin images at `tier`.
#[allow(dead_code)]
pub fn gallery(count: usize, tier: PerformanceTier) -> GalleryLoader {
    let refs = (0..count).map(|index| format!("/gallery/{index}.webp")).collect();
    GalleryLoader::new(refs, &MediaResolver::default(), context_at(tier))
}

/// Settles every ticket as loaded.
#[allow(dead_code)]
pub fn settle_all(gallery: &mut GalleryLoader, tickets: &[LoadTicket]) {
    for ticket in tickets {
        assert!(gallery.on_settled(ticket, LoadOutcome::Loaded));
    }
}
