#![warn(missing_docs)]
//! # site-guard-delivery
//!
//! ## Purpose
//! Picks how aggressively image-heavy pages load resources, based on device,
//! network, user preferences, and browser engine.
//!
//! ## Responsibilities
//! - Normalize optional environment signals into a [`DeviceProfile`].
//! - Classify the profile into a [`PerformanceTier`] and look up the matching
//!   [`DeliveryTuning`].
//! - Keep one session-wide tier that only ever moves down.
//! - React to battery, network, and frame-rate events.
//! - Persist the last-known-good tier without ever failing the page.
//!
//! ## Data flow
//! Host signals -> [`AdaptiveDeliveryController::evaluate`] -> [`TierCache`]
//! (measured tier also saved to [`GuardedTierStore`]) ->
//! [`DeliveryContext::tuning`] read by the gallery loader at each batch.
//! Runtime events -> controller downgrade -> session cache only.
//!
//! ## Ownership and lifetimes
//! [`DeliveryContext`] is cheap to clone; clones share the cache and store
//! through `Arc`, so the controller and every consumer see the same tier.
//!
//! ## Error model
//! Missing signals are not errors; they fall back to neutral values. Storage
//! failures surface as [`StoreError`] from backends and are absorbed by
//! [`GuardedTierStore`].
//!
//! ## Security and privacy notes
//! Only the tier label is persisted. User agents and other signals are never
//! stored or logged.
//!
//! ## Example
//! ```rust
//! use site_guard_core::PerformanceTier;
//! use site_guard_delivery::{AdaptiveDeliveryController, DeliveryContext, EnvironmentSignals};
//!
//! let signals = EnvironmentSignals {
//!     hardware_concurrency: Some(2),
//!     device_memory_gb: Some(2.0),
//!     save_data: Some(true),
//!     ..EnvironmentSignals::default()
//! };
//! let controller = AdaptiveDeliveryController::new(DeliveryContext::from_signals(&signals));
//! assert_eq!(controller.evaluate(&signals), PerformanceTier::Low);
//! assert_eq!(controller.tuning().batch_size, 4);
//! ```

pub mod cache;
pub mod controller;
pub mod signals;
pub mod store;
pub mod tuning;

pub use cache::TierCache;
pub use controller::{AdaptiveDeliveryController, DeliveryContext, FrameRateMonitor};
pub use signals::{
    BatteryStatus, DeviceProfile, EffectiveType, EnvironmentSignals, is_webkit_user_agent,
};
pub use site_guard_core::PerformanceTier;
pub use store::{FileTierStore, GuardedTierStore, MemoryTierStore, StoreError, TierStore};
pub use tuning::{DeliveryTuning, classify, score, tuning_for};
