//! Device position lookup with a cached fix and a default-city fallback.

use thiserror::Error;

use crate::config::GeolocationConfig;
use crate::geo::LngLat;

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct PositionOptions {
    pub enable_high_accuracy: bool,
    pub timeout_ms: u64,
    /// Cached fixes younger than this are reused
    pub maximum_age_ms: u64,
}

impl From<&GeolocationConfig> for PositionOptions {
    fn from(config: &GeolocationConfig) -> Self {
        Self {
            enable_high_accuracy: config.enable_high_accuracy,
            timeout_ms: config.timeout_ms,
            maximum_age_ms: config.maximum_age_ms,
        }
    }
}

#[derive(Error, Clone, Copy, Debug, PartialEq, Eq)]
pub enum PositionErrorCode {
    #[error("location permission denied")]
    PermissionDenied,
    #[error("position unavailable")]
    PositionUnavailable,
    #[error("position request timed out")]
    Timeout,
}

#[derive(Clone, Copy, Debug, PartialEq)]
pub struct Fix {
    pub at: LngLat,
    pub accuracy_m: f64,
    pub timestamp_ms: u64,
}

/// Where positions come from (GPS daemon, IP lookup, a fixed config value...)
pub trait PositionSource {
    fn current_position(&mut self, options: &PositionOptions, now_ms: u64) -> Result<Fix, PositionErrorCode>;
}

/// Position pinned in the config file; `None` behaves like a device without a fix
#[derive(Clone, Copy, Debug)]
pub struct FixedPosition(pub Option<LngLat>);

impl PositionSource for FixedPosition {
    fn current_position(&mut self, _options: &PositionOptions, now_ms: u64) -> Result<Fix, PositionErrorCode> {
        self.0
            .map(|at| Fix {
                at,
                accuracy_m: 0.0,
                timestamp_ms: now_ms,
            })
            .ok_or(PositionErrorCode::PositionUnavailable)
    }
}

#[derive(Clone, Copy, Debug, PartialEq)]
pub enum Located {
    Device(Fix),
    Cached(Fix),
    Fallback { reason: PositionErrorCode, at: LngLat },
}

impl Located {
    pub fn position(&self) -> LngLat {
        match self {
            Located::Device(fix) | Located::Cached(fix) => fix.at,
            Located::Fallback { at, .. } => *at,
        }
    }
}

pub struct Geolocator<P> {
    source: P,
    options: PositionOptions,
    fallback: LngLat,
    last_fix: Option<Fix>,
}

impl<P: PositionSource> Geolocator<P> {
    pub fn new(source: P, options: PositionOptions, fallback: LngLat) -> Self {
        Self {
            source,
            options,
            fallback,
            last_fix: None,
        }
    }

    pub fn last_fix(&self) -> Option<Fix> {
        self.last_fix
    }

    /// One lookup, no retries. Failures resolve to the fallback coordinate.
    pub fn locate(&mut self, now_ms: u64) -> Located {
        if let Some(fix) = self.last_fix {
            if now_ms.saturating_sub(fix.timestamp_ms) < self.options.maximum_age_ms {
                return Located::Cached(fix);
            }
        }

        match self.source.current_position(&self.options, now_ms) {
            Ok(fix) => {
                self.last_fix = Some(fix);
                tracing::debug!(lng = fix.at.lng, lat = fix.at.lat, accuracy_m = fix.accuracy_m, "device position");
                Located::Device(fix)
            }
            Err(reason) => {
                tracing::warn!(%reason, "geolocation failed, using default center");
                Located::Fallback {
                    reason,
                    at: self.fallback,
                }
            }
        }
    }
}
