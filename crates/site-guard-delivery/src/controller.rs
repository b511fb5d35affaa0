//! Tier evaluation and runtime downgrades.

use std::collections::VecDeque;
use std::sync::Arc;

use site_guard_core::PerformanceTier;

use crate::cache::TierCache;
use crate::signals::{BatteryStatus, DeviceProfile, EffectiveType, EnvironmentSignals};
use crate::store::GuardedTierStore;
use crate::tuning::{DeliveryTuning, classify, tuning_for};

/// Frame rate below which the tier drops to low.
pub const LOW_FPS_THRESHOLD: usize = 30;
/// Frame rate below which the tier drops to medium.
pub const MEDIUM_FPS_THRESHOLD: usize = 45;
/// Rolling frame-rate window.
pub const FRAME_WINDOW_MS: u64 = 1_000;

/// Shared, injectable delivery environment.
///
/// Clones share the same cache and store, so a downgrade observed by one
/// holder is visible to every other.
#[derive(Debug, Clone)]
pub struct DeliveryContext {
    cache: Arc<TierCache>,
    store: Arc<GuardedTierStore>,
    is_low_power_engine: bool,
    adaptive_enabled: bool,
}

impl DeliveryContext {
    /// Fresh context with an empty cache and a memory-only store.
    pub fn new(is_low_power_engine: bool) -> Self {
        Self {
            cache: Arc::new(TierCache::new()),
            store: Arc::new(GuardedTierStore::in_memory()),
            is_low_power_engine,
            adaptive_enabled: true,
        }
    }

    /// Context whose engine flag is detected from `signals`.
    pub fn from_signals(signals: &EnvironmentSignals) -> Self {
        Self::new(DeviceProfile::from_signals(signals).is_low_power_engine)
    }

    /// Uses `store` for last-known-good persistence.
    pub fn with_store(mut self, store: GuardedTierStore) -> Self {
        self.store = Arc::new(store);
        self
    }

    /// Shares an existing session cache.
    pub fn with_cache(mut self, cache: Arc<TierCache>) -> Self {
        self.cache = cache;
        self
    }

    /// Overrides the engine flag, keeping the shared cache and store.
    pub fn with_low_power_engine(mut self, is_low_power_engine: bool) -> Self {
        self.is_low_power_engine = is_low_power_engine;
        self
    }

    /// When disabled, evaluation always yields the low tier.
    pub fn with_adaptive_delivery(mut self, enabled: bool) -> Self {
        self.adaptive_enabled = enabled;
        self
    }

    /// Session tier cache.
    pub fn cache(&self) -> &Arc<TierCache> {
        &self.cache
    }

    /// Guarded tier store.
    pub fn store(&self) -> &GuardedTierStore {
        &self.store
    }

    /// WebKit engine flag.
    pub fn is_low_power_engine(&self) -> bool {
        self.is_low_power_engine
    }

    /// Whether adaptive delivery is enabled.
    pub fn adaptive_enabled(&self) -> bool {
        self.adaptive_enabled
    }

    /// Current tier; medium before evaluation.
    pub fn tier(&self) -> PerformanceTier {
        self.cache.get().unwrap_or_default()
    }

    /// Tuning for the current tier and engine.
    pub fn tuning(&self) -> DeliveryTuning {
        tuning_for(self.tier(), self.is_low_power_engine)
    }
}

/// Rolling one-second frame counter.
#[derive(Debug, Clone, Default)]
pub struct FrameRateMonitor {
    frames: VecDeque<u64>,
    started_at_ms: Option<u64>,
}

impl FrameRateMonitor {
    /// Empty monitor.
    pub fn new() -> Self {
        Self::default()
    }

    /// Records a frame at `now_ms` and returns the frames seen in the last
    /// second once a full window has elapsed.
    ///
    /// A gap of a full window or more between frames (a hidden tab) restarts
    /// the window, so the first frame after it never reads as a stall.
    pub fn record(&mut self, now_ms: u64) -> Option<usize> {
        if let Some(&last) = self.frames.back()
            && now_ms.saturating_sub(last) >= FRAME_WINDOW_MS
        {
            self.frames.clear();
            self.started_at_ms = None;
        }

        let started_at = *self.started_at_ms.get_or_insert(now_ms);
        self.frames.push_back(now_ms);
        while let Some(&oldest) = self.frames.front() {
            if now_ms.saturating_sub(oldest) >= FRAME_WINDOW_MS {
                self.frames.pop_front();
            } else {
                break;
            }
        }

        (now_ms.saturating_sub(started_at) >= FRAME_WINDOW_MS).then_some(self.frames.len())
    }
}

/// Evaluates the tier once and then only ever lowers it.
#[derive(Debug)]
pub struct AdaptiveDeliveryController {
    context: DeliveryContext,
    frames: FrameRateMonitor,
}

impl AdaptiveDeliveryController {
    /// Controller over `context`.
    pub fn new(context: DeliveryContext) -> Self {
        Self {
            context,
            frames: FrameRateMonitor::new(),
        }
    }

    /// Shared context, for consumers that re-read tuning.
    pub fn context(&self) -> &DeliveryContext {
        &self.context
    }

    /// Classifies `signals`, caps the result by the stored tier, and seeds the
    /// session cache. Later calls return the cached tier unchanged.
    ///
    /// The fresh classification replaces the stored record, so a weak
    /// measurement caps at most the next session. Runtime downgrades stay in
    /// the session cache and are never stored.
    pub fn evaluate(&self, signals: &EnvironmentSignals) -> PerformanceTier {
        if let Some(tier) = self.context.cache.get() {
            return tier;
        }

        let profile = DeviceProfile::from_signals(signals);
        let measured = if self.context.adaptive_enabled {
            classify(&profile)
        } else {
            PerformanceTier::Low
        };
        let stored = self.context.store.load();
        let capped = stored.map_or(measured, |stored| measured.min(stored));

        let tier = self.context.cache.initialize(capped);
        // A forced low tier is not a measurement.
        let persisted = self.context.adaptive_enabled && self.context.store.save(measured);
        tracing::debug!(
            measured = %measured,
            stored = ?stored,
            tier = %tier,
            persisted,
            low_power_engine = self.context.is_low_power_engine,
            "delivery tier evaluated"
        );
        tier
    }

    /// Current tier.
    pub fn tier(&self) -> PerformanceTier {
        self.context.tier()
    }

    /// Tuning for the current tier.
    pub fn tuning(&self) -> DeliveryTuning {
        self.context.tuning()
    }

    /// Battery change; a low unplugged battery forces the low tier.
    pub fn on_battery(&self, status: BatteryStatus) -> Option<PerformanceTier> {
        if status.is_low() {
            return self.downgrade(PerformanceTier::Low, "battery_low");
        }
        None
    }

    /// Network change; data saver or `2g` forces low, `3g` caps at medium.
    pub fn on_network(&self, effective_type: EffectiveType, save_data: bool) -> Option<PerformanceTier> {
        if save_data || effective_type.is_very_slow() {
            return self.downgrade(PerformanceTier::Low, "network_constrained");
        }
        if effective_type == EffectiveType::ThreeG {
            return self.downgrade(PerformanceTier::Medium, "network_3g");
        }
        None
    }

    /// Animation frame; sustained low frame rates lower the tier.
    pub fn on_frame(&mut self, now_ms: u64) -> Option<PerformanceTier> {
        let fps = self.frames.record(now_ms)?;
        if fps < LOW_FPS_THRESHOLD {
            return self.downgrade(PerformanceTier::Low, "frame_rate");
        }
        if fps < MEDIUM_FPS_THRESHOLD {
            return self.downgrade(PerformanceTier::Medium, "frame_rate");
        }
        None
    }

    /// Lowers the session tier to at most `tier`.
    ///
    /// Returns the new tier when it actually dropped.
    pub fn downgrade(&self, tier: PerformanceTier, reason: &'static str) -> Option<PerformanceTier> {
        let previous = self.context.cache.downgrade(tier)?;
        let current = self.context.tier();
        tracing::info!(
            from = %previous,
            to = %current,
            reason,
            "delivery tier downgraded"
        );
        Some(current)
    }
}
