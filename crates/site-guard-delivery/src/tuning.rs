//! Tier scoring and the delivery tuning table.

use serde::Serialize;
use site_guard_core::PerformanceTier;

use crate::signals::{DeviceProfile, EffectiveType};

/// Minimum score for [`PerformanceTier::High`].
pub const HIGH_TIER_SCORE: i32 = 7;
/// Minimum score for [`PerformanceTier::Medium`].
pub const MEDIUM_TIER_SCORE: i32 = 4;
/// Viewport width earning the wide-screen bonus.
pub const WIDE_VIEWPORT_PX: u32 = 1440;

/// Per-tier gallery loading parameters.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct DeliveryTuning {
    /// Items eligible for loading at mount.
    pub initial_count: usize,
    /// Admissions per batch.
    pub batch_size: usize,
    /// Pause between batches.
    pub inter_batch_delay_ms: u64,
    /// Upper bound on in-flight loads.
    pub max_concurrent_loads: usize,
    /// Look-ahead past the furthest visible item.
    pub preload_count: usize,
    /// Visibility observer margin (CSS syntax).
    pub observer_root_margin: &'static str,
}

/// Looks up tuning for `(tier, engine)`.
///
/// This is the only place that branches on the engine flag.
pub fn tuning_for(tier: PerformanceTier, is_low_power_engine: bool) -> DeliveryTuning {
    let row = match (tier, is_low_power_engine) {
        (PerformanceTier::High, false) => (24, 12, 50, 6, 8, "400px 0px"),
        (PerformanceTier::High, true) => (16, 8, 100, 4, 4, "300px 0px"),
        (PerformanceTier::Medium, false) => (12, 8, 100, 4, 4, "300px 0px"),
        (PerformanceTier::Medium, true) => (9, 6, 150, 3, 2, "200px 0px"),
        (PerformanceTier::Low, false) => (6, 4, 200, 2, 2, "150px 0px"),
        (PerformanceTier::Low, true) => (4, 3, 300, 2, 1, "100px 0px"),
    };

    DeliveryTuning {
        initial_count: row.0,
        batch_size: row.1,
        inter_batch_delay_ms: row.2,
        max_concurrent_loads: row.3,
        preload_count: row.4,
        observer_root_margin: row.5,
    }
}

/// Additive capacity score; see [`classify`] for thresholds.
pub fn score(profile: &DeviceProfile) -> i32 {
    let cpu = match profile.concurrency_hint {
        None => 2,
        Some(cores) if cores >= 8 => 3,
        Some(cores) if cores >= 4 => 2,
        Some(_) => 1,
    };

    let memory = match profile.memory_hint_gb {
        None => 2,
        Some(gb) if gb >= 8.0 => 3,
        Some(gb) if gb >= 4.0 => 2,
        Some(_) => 1,
    };

    let network = if profile.save_data {
        -2
    } else {
        match profile.effective_type {
            EffectiveType::FourG => 2,
            EffectiveType::ThreeG => 1,
            EffectiveType::TwoG | EffectiveType::SlowTwoG => 0,
            EffectiveType::Unknown => 1,
        }
    };

    let viewport = match profile.viewport_width {
        Some(width) if width >= WIDE_VIEWPORT_PX => 1,
        _ => 0,
    };

    cpu + memory + network + viewport
}

/// Classifies a profile into a tier.
///
/// Reduced motion or data preferences and a low unplugged battery force
/// [`PerformanceTier::Low`] regardless of score.
pub fn classify(profile: &DeviceProfile) -> PerformanceTier {
    if profile.reduced_motion || profile.reduced_data || profile.battery_low {
        return PerformanceTier::Low;
    }

    match score(profile) {
        points if points >= HIGH_TIER_SCORE => PerformanceTier::High,
        points if points >= MEDIUM_TIER_SCORE => PerformanceTier::Medium,
        _ => PerformanceTier::Low,
    }
}
