//! Raw environment signals and the normalized device profile.

use serde::{Deserialize, Serialize};

/// Battery level below which an unplugged device is treated as low power.
pub const LOW_BATTERY_THRESHOLD: f64 = 0.15;

/// Battery reading as reported by the host.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct BatteryStatus {
    /// Charge level in `[0, 1]`.
    pub level: f64,
    /// Whether the device is plugged in.
    pub charging: bool,
}

impl BatteryStatus {
    /// Returns `true` below 15 % and not charging.
    pub fn is_low(&self) -> bool {
        !self.charging && self.level < LOW_BATTERY_THRESHOLD
    }
}

/// Network effective connection type.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
pub enum EffectiveType {
    /// `slow-2g`.
    #[serde(rename = "slow-2g")]
    SlowTwoG,
    /// `2g`.
    #[serde(rename = "2g")]
    TwoG,
    /// `3g`.
    #[serde(rename = "3g")]
    ThreeG,
    /// `4g`.
    #[serde(rename = "4g")]
    FourG,
    /// Not reported or unrecognized.
    #[default]
    #[serde(other, rename = "unknown")]
    Unknown,
}

impl EffectiveType {
    /// Parses the host's connection label; unknown labels map to
    /// [`EffectiveType::Unknown`].
    pub fn parse(raw: &str) -> Self {
        match raw.trim().to_ascii_lowercase().as_str() {
            "slow-2g" => Self::SlowTwoG,
            "2g" => Self::TwoG,
            "3g" => Self::ThreeG,
            "4g" => Self::FourG,
            _ => Self::Unknown,
        }
    }

    /// Returns `true` for `2g` and `slow-2g`.
    pub fn is_very_slow(self) -> bool {
        matches!(self, Self::SlowTwoG | Self::TwoG)
    }
}

/// Raw, individually optional runtime signals.
///
/// Every field may be missing; the profile substitutes fallbacks.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct EnvironmentSignals {
    /// Logical processor count.
    pub hardware_concurrency: Option<u32>,
    /// Approximate device memory in GB.
    pub device_memory_gb: Option<f64>,
    /// Network connection label (`4g`, `3g`, ...).
    pub effective_type: Option<String>,
    /// Data-saver preference.
    pub save_data: Option<bool>,
    /// `prefers-reduced-motion: reduce`.
    pub prefers_reduced_motion: Option<bool>,
    /// `prefers-reduced-data: reduce`.
    pub prefers_reduced_data: Option<bool>,
    /// Viewport width in CSS pixels.
    pub viewport_width: Option<u32>,
    /// User-agent string.
    pub user_agent: Option<String>,
    /// Battery reading.
    pub battery: Option<BatteryStatus>,
}

/// Normalized snapshot used for tier classification.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DeviceProfile {
    /// Logical processor count, if reported.
    pub concurrency_hint: Option<u32>,
    /// Device memory in GB, if reported.
    pub memory_hint_gb: Option<f64>,
    /// Connection type.
    pub effective_type: EffectiveType,
    /// Data-saver preference.
    pub save_data: bool,
    /// Reduced-motion preference.
    pub reduced_motion: bool,
    /// Reduced-data preference.
    pub reduced_data: bool,
    /// Viewport width, if reported.
    pub viewport_width: Option<u32>,
    /// WebKit engine (iOS or desktop Safari).
    pub is_low_power_engine: bool,
    /// Battery under 15 % and unplugged.
    pub battery_low: bool,
}

impl DeviceProfile {
    /// Normalizes raw signals, substituting fallbacks for missing values.
    pub fn from_signals(signals: &EnvironmentSignals) -> Self {
        Self {
            concurrency_hint: signals.hardware_concurrency.filter(|count| *count > 0),
            memory_hint_gb: signals
                .device_memory_gb
                .filter(|memory| memory.is_finite() && *memory > 0.0),
            effective_type: signals
                .effective_type
                .as_deref()
                .map(EffectiveType::parse)
                .unwrap_or_default(),
            save_data: signals.save_data.unwrap_or(false),
            reduced_motion: signals.prefers_reduced_motion.unwrap_or(false),
            reduced_data: signals.prefers_reduced_data.unwrap_or(false),
            viewport_width: signals.viewport_width,
            is_low_power_engine: signals
                .user_agent
                .as_deref()
                .is_some_and(is_webkit_user_agent),
            battery_low: signals.battery.is_some_and(|battery| battery.is_low()),
        }
    }
}

/// Detects the WebKit engine: any iOS device, or Safari without Chrome,
/// Chromium, or Android markers.
pub fn is_webkit_user_agent(user_agent: &str) -> bool {
    let ua = user_agent.to_ascii_lowercase();
    let ios = ["iphone", "ipad", "ipod"]
        .iter()
        .any(|device| ua.contains(device));
    if ios {
        return true;
    }

    ua.contains("safari")
        && !["chrome", "chromium", "crios", "android"]
            .iter()
            .any(|marker| ua.contains(marker))
}
