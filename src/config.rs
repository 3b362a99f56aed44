//! TOML configuration.
//!
//! Every section has defaults, so an empty file (or no file at all) yields the
//! stock behaviour: Uberlândia as home, the navigation presets of the search
//! flow, a 150 px keyboard threshold and a 1 km flood alert.

use serde::{Deserialize, Serialize};
use std::fs;
use std::path::Path;

use crate::error::{MapError, Result};
use crate::geo::LngLat;

/// File looked up in the working directory when no `--config` is given
pub const DEFAULT_CONFIG_FILE: &str = "urbmind-map.toml";

#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct Config {
    pub map: MapConfig,
    pub navigation: NavigationConfig,
    pub viewport: ViewportConfig,
    pub overlay: OverlayConfig,
    pub geolocation: GeolocationConfig,
    pub logging: LoggingConfig,
}

impl Config {
    pub fn from_toml(content: &str) -> Result<Self> {
        let config: Config = toml::from_str(content)?;
        config.validate()?;
        Ok(config)
    }

    pub fn load(path: &Path) -> Result<Self> {
        let content = fs::read_to_string(path)?;
        Self::from_toml(&content)
    }

    /// Load `path` if given, else the default file if present, else defaults
    pub fn discover(path: Option<&Path>) -> Result<Self> {
        match path {
            Some(path) => Self::load(path),
            None => {
                let default = Path::new(DEFAULT_CONFIG_FILE);
                if default.exists() {
                    Self::load(default)
                } else {
                    Ok(Self::default())
                }
            }
        }
    }

    fn validate(&self) -> Result<()> {
        if self.overlay.circle_sides < 3 {
            return Err(MapError::Config(format!(
                "overlay.circle_sides must be at least 3 (got {})",
                self.overlay.circle_sides
            )));
        }
        if !(self.overlay.alert_radius_m > 0.0) {
            return Err(MapError::Config("overlay.alert_radius_m must be positive".into()));
        }
        if !(-90.0..=90.0).contains(&self.map.default_center.lat) {
            return Err(MapError::Config("map.default_center latitude out of range".into()));
        }
        Ok(())
    }
}

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct MapConfig {
    pub default_center: LngLat,
    pub default_zoom: f64,
    pub reset_duration_ms: u64,
    /// Pixels moved per arrow key press
    pub pan_step_px: f64,
    pub key_zoom_duration_ms: u64,
}

impl Default for MapConfig {
    fn default() -> Self {
        Self {
            default_center: LngLat::new(-48.2772, -18.9186),
            default_zoom: 12.0,
            reset_duration_ms: 1500,
            pan_step_px: 10.0,
            key_zoom_duration_ms: 300,
        }
    }
}

/// Camera target for one kind of navigation
#[derive(Clone, Copy, Debug, PartialEq, Serialize, Deserialize)]
pub struct NavigationPreset {
    pub zoom: f64,
    pub pitch: f64,
    #[serde(default)]
    pub bearing: f64,
    pub duration_ms: u64,
}

impl NavigationPreset {
    pub const fn new(zoom: f64, pitch: f64, duration_ms: u64) -> Self {
        Self {
            zoom,
            pitch,
            bearing: 0.0,
            duration_ms,
        }
    }
}

/// How the navigation lock is released
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum LockRelease {
    /// Fixed `duration + slack` timer
    #[default]
    Timer,
    /// First tick where the surface is idle; the timer stays as a backstop
    AnimationEnd,
}

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct NavigationConfig {
    pub address: NavigationPreset,
    pub poi: NavigationPreset,
    pub city: NavigationPreset,
    pub recenter: NavigationPreset,
    /// Added to the animation duration before the lock clears
    pub lock_slack_ms: u64,
    pub release: LockRelease,
}

impl Default for NavigationConfig {
    fn default() -> Self {
        Self {
            address: NavigationPreset::new(17.0, 45.0, 1800),
            poi: NavigationPreset::new(16.0, 50.0, 1600),
            city: NavigationPreset::new(12.0, 30.0, 2000),
            recenter: NavigationPreset::new(18.0, 60.0, 2000),
            lock_slack_ms: 100,
            release: LockRelease::Timer,
        }
    }
}

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ViewportConfig {
    /// Height change (logical px) that counts as a virtual keyboard
    pub height_threshold_px: f64,
    pub settle_ms: u64,
    pub remeasure_delay_ms: u64,
    pub replay_duration_ms: u64,
    pub visual_viewport: bool,
}

impl Default for ViewportConfig {
    fn default() -> Self {
        Self {
            height_threshold_px: 150.0,
            settle_ms: 150,
            remeasure_delay_ms: 100,
            replay_duration_ms: 400,
            visual_viewport: true,
        }
    }
}

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct OverlayConfig {
    pub alert_radius_m: f64,
    pub circle_sides: usize,
    /// Half-size in degrees of the square used for streets without a bbox
    pub street_pad_deg: f64,
    pub area_padding_px: f64,
    pub area_duration_ms: u64,
    pub streets_padding_px: f64,
    pub streets_duration_ms: u64,
    /// Number of concentric bands in the alert gradient
    pub gradient_bands: usize,
}

impl Default for OverlayConfig {
    fn default() -> Self {
        Self {
            alert_radius_m: 1000.0,
            circle_sides: 64,
            street_pad_deg: 0.0005,
            area_padding_px: 50.0,
            area_duration_ms: 1000,
            streets_padding_px: 100.0,
            streets_duration_ms: 1500,
            gradient_bands: 10,
        }
    }
}

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct GeolocationConfig {
    pub enable_high_accuracy: bool,
    pub timeout_ms: u64,
    pub maximum_age_ms: u64,
    /// Fixed device position for terminals without a location provider
    pub device_position: Option<LngLat>,
}

impl Default for GeolocationConfig {
    fn default() -> Self {
        Self {
            enable_high_accuracy: true,
            timeout_ms: 10_000,
            maximum_age_ms: 30_000,
            device_position: None,
        }
    }
}

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct LoggingConfig {
    /// `EnvFilter` directive, overridden by `RUST_LOG`
    pub level: String,
    pub file: String,
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            level: "info".to_string(),
            file: "urbmind-map.log".to_string(),
        }
    }
}
