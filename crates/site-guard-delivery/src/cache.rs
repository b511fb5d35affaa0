//! Session-wide tier cache.

use std::sync::atomic::{AtomicU8, Ordering};

use site_guard_core::PerformanceTier;

const UNSET: u8 = u8::MAX;

/// Lock-free, downgrade-only tier cell.
///
/// The first [`TierCache::initialize`] wins; afterwards the tier can only move
/// down through [`TierCache::downgrade`].
#[derive(Debug)]
pub struct TierCache {
    tier: AtomicU8,
}

impl TierCache {
    /// Empty cache.
    pub const fn new() -> Self {
        Self {
            tier: AtomicU8::new(UNSET),
        }
    }

    /// Cache already holding `tier`.
    pub fn with_tier(tier: PerformanceTier) -> Self {
        Self {
            tier: AtomicU8::new(tier.to_u8()),
        }
    }

    /// Current tier, or `None` before initialization.
    pub fn get(&self) -> Option<PerformanceTier> {
        PerformanceTier::from_u8(self.tier.load(Ordering::Acquire))
    }

    /// Stores `tier` if the cache is empty and returns the effective tier.
    pub fn initialize(&self, tier: PerformanceTier) -> PerformanceTier {
        match self
            .tier
            .compare_exchange(UNSET, tier.to_u8(), Ordering::AcqRel, Ordering::Acquire)
        {
            Ok(_) => tier,
            Err(existing) => PerformanceTier::from_u8(existing).unwrap_or(tier),
        }
    }

    /// Lowers the cached tier to at most `tier`.
    ///
    /// Returns `Some(previous)` when the tier actually dropped.
    pub fn downgrade(&self, tier: PerformanceTier) -> Option<PerformanceTier> {
        let previous = self.tier.fetch_min(tier.to_u8(), Ordering::AcqRel);
        if previous > tier.to_u8() {
            // An empty cache reports the tier it was lowered to.
            Some(PerformanceTier::from_u8(previous).unwrap_or(tier))
        } else {
            None
        }
    }
}

impl Default for TierCache {
    fn default() -> Self {
        Self::new()
    }
}
