use crate::geo::{wrap_lng, LngLat};

/// Minimum and maximum zoom levels accepted by the surfaces
pub const MIN_ZOOM: f64 = 0.0;
pub const MAX_ZOOM: f64 = 22.0;
pub const MAX_PITCH: f64 = 85.0;

/// The map's viewing transform. Copied by value whenever it is snapshotted.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct CameraState {
    pub center: LngLat,
    pub zoom: f64,
    pub pitch: f64,
    pub bearing: f64,
}

impl CameraState {
    pub fn new(center: LngLat, zoom: f64) -> Self {
        Self {
            center,
            zoom,
            pitch: 0.0,
            bearing: 0.0,
        }
    }

    /// Equality within `eps` on every component
    pub fn approx_eq(&self, other: &CameraState, eps: f64) -> bool {
        (self.center.lng - other.center.lng).abs() <= eps
            && (self.center.lat - other.center.lat).abs() <= eps
            && (self.zoom - other.zoom).abs() <= eps
            && (self.pitch - other.pitch).abs() <= eps
            && (self.bearing - other.bearing).abs() <= eps
    }

    /// Apply the fields set in `options`, clamping into valid ranges
    pub fn with(&self, options: &CameraOptions) -> CameraState {
        let center = options.center.unwrap_or(self.center);
        CameraState {
            center: LngLat::new(wrap_lng(center.lng), center.lat.clamp(-85.0, 85.0)),
            zoom: options.zoom.unwrap_or(self.zoom).clamp(MIN_ZOOM, MAX_ZOOM),
            pitch: options.pitch.unwrap_or(self.pitch).clamp(0.0, MAX_PITCH),
            bearing: options.bearing.unwrap_or(self.bearing).rem_euclid(360.0),
        }
    }
}

impl From<CameraState> for CameraOptions {
    fn from(state: CameraState) -> Self {
        CameraOptions {
            center: Some(state.center),
            zoom: Some(state.zoom),
            pitch: Some(state.pitch),
            bearing: Some(state.bearing),
        }
    }
}

/// Target of a camera transition; unset fields keep their current value
#[derive(Clone, Copy, Debug, Default, PartialEq)]
pub struct CameraOptions {
    pub center: Option<LngLat>,
    pub zoom: Option<f64>,
    pub pitch: Option<f64>,
    pub bearing: Option<f64>,
}

impl CameraOptions {
    pub fn centered(center: LngLat) -> Self {
        Self {
            center: Some(center),
            ..Self::default()
        }
    }

    pub fn zoom(mut self, zoom: f64) -> Self {
        self.zoom = Some(zoom);
        self
    }

    pub fn pitch(mut self, pitch: f64) -> Self {
        self.pitch = Some(pitch);
        self
    }

    pub fn bearing(mut self, bearing: f64) -> Self {
        self.bearing = Some(bearing);
        self
    }
}

/// Options for fitting the camera to a bounding box
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct FitOptions {
    /// Padding in screen pixels on every side
    pub padding: f64,
    pub duration_ms: u64,
    pub max_zoom: f64,
}

impl FitOptions {
    pub fn new(padding: f64, duration_ms: u64) -> Self {
        Self {
            padding,
            duration_ms,
            max_zoom: MAX_ZOOM,
        }
    }
}

/// Shape of a camera transition
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Motion {
    /// Straight interpolation of every component
    Ease,
    /// Zooms out mid-flight when the hop is long
    Fly,
}

/// An in-flight camera animation
#[derive(Clone, Debug)]
pub struct Transition {
    pub from: CameraState,
    pub to: CameraState,
    pub start_ms: u64,
    pub duration_ms: u64,
    pub motion: Motion,
}

impl Transition {
    pub fn end_ms(&self) -> u64 {
        self.start_ms + self.duration_ms
    }

    pub fn is_done(&self, now_ms: u64) -> bool {
        now_ms >= self.end_ms()
    }

    /// Camera at `now_ms`
    pub fn sample(&self, now_ms: u64) -> CameraState {
        if self.duration_ms == 0 || self.is_done(now_ms) {
            return self.to;
        }
        let t = now_ms.saturating_sub(self.start_ms) as f64 / self.duration_ms as f64;
        let k = ease_in_out_cubic(t);

        let lerp = |a: f64, b: f64| a + (b - a) * k;

        // Shortest way round for bearing and longitude
        let dlng = wrap_lng(self.to.center.lng - self.from.center.lng);
        let dbearing = (self.to.bearing - self.from.bearing + 540.0).rem_euclid(360.0) - 180.0;

        let mut zoom = lerp(self.from.zoom, self.to.zoom);
        if self.motion == Motion::Fly {
            zoom -= self.arc_depth() * (std::f64::consts::PI * t).sin();
        }

        CameraState {
            center: LngLat::new(
                wrap_lng(self.from.center.lng + dlng * k),
                lerp(self.from.center.lat, self.to.center.lat),
            ),
            zoom: zoom.clamp(MIN_ZOOM, MAX_ZOOM),
            pitch: lerp(self.from.pitch, self.to.pitch),
            bearing: (self.from.bearing + dbearing * k).rem_euclid(360.0),
        }
    }

    /// How many zoom levels a fly-to dips at mid-flight
    fn arc_depth(&self) -> f64 {
        let dx = wrap_lng(self.to.center.lng - self.from.center.lng).abs();
        let dy = (self.to.center.lat - self.from.center.lat).abs();
        let span = dx.max(dy);
        if span <= 0.0 {
            return 0.0;
        }
        // One zoom level per doubling of the hop relative to the visible span
        let visible = 360.0 / 2f64.powf(self.from.zoom.min(self.to.zoom));
        (span / visible).log2().clamp(0.0, 3.0)
    }
}

#[inline(always)]
pub fn ease_in_out_cubic(t: f64) -> f64 {
    let t = t.clamp(0.0, 1.0);
    if t < 0.5 {
        4.0 * t * t * t
    } else {
        1.0 - (-2.0 * t + 2.0).powi(3) / 2.0
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn state(lng: f64, lat: f64, zoom: f64) -> CameraState {
        CameraState::new(LngLat::new(lng, lat), zoom)
    }

    #[test]
    fn transition_hits_endpoints() {
        let tr = Transition {
            from: state(0.0, 0.0, 10.0),
            to: state(1.0, 1.0, 12.0),
            start_ms: 100,
            duration_ms: 400,
            motion: Motion::Ease,
        };
        assert!(tr.sample(100).approx_eq(&tr.from, 1e-9));
        assert!(tr.sample(500).approx_eq(&tr.to, 1e-9));
        let mid = tr.sample(300);
        assert!((mid.zoom - 11.0).abs() < 1e-9);
    }

    #[test]
    fn bearing_takes_shortest_path() {
        let mut from = state(0.0, 0.0, 5.0);
        from.bearing = 350.0;
        let mut to = from;
        to.bearing = 10.0;
        let tr = Transition {
            from,
            to,
            start_ms: 0,
            duration_ms: 100,
            motion: Motion::Ease,
        };
        let mid = tr.sample(50);
        assert!(mid.bearing < 1e-6 || mid.bearing > 359.999);
    }

    #[test]
    fn long_fly_dips_zoom() {
        let tr = Transition {
            from: state(-48.0, -18.0, 12.0),
            to: state(-43.0, -22.0, 12.0),
            start_ms: 0,
            duration_ms: 1000,
            motion: Motion::Fly,
        };
        assert!(tr.sample(500).zoom < 12.0);
        assert!((tr.sample(1000).zoom - 12.0).abs() < 1e-9);
    }

    #[test]
    fn options_clamp() {
        let s = state(0.0, 0.0, 5.0).with(&CameraOptions::centered(LngLat::new(190.0, 89.0)).zoom(40.0).pitch(120.0));
        assert!((s.center.lng + 170.0).abs() < 1e-9);
        assert_eq!(s.center.lat, 85.0);
        assert_eq!(s.zoom, MAX_ZOOM);
        assert_eq!(s.pitch, MAX_PITCH);
    }
}
