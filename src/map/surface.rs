use geojson::GeoJson;

use crate::error::Result;
use crate::geo::{BBox, LngLat};
use crate::map::camera::{CameraOptions, CameraState, FitOptions};
use crate::map::style::{LayerSpec, MarkerId};

/// Command surface of a map backend.
///
/// Camera transitions return immediately; the backend animates them on its own
/// clock (`advance`). Style operations follow the usual GeoJSON-map rules: ids
/// are unique, a layer needs its source, a source can only be removed once no
/// layer reads from it.
pub trait MapSurface {
    fn camera(&self) -> CameraState;

    /// Animated transition that may zoom out mid-flight
    fn fly_to(&mut self, options: CameraOptions, duration_ms: u64);

    /// Straight animated transition
    fn ease_to(&mut self, options: CameraOptions, duration_ms: u64);

    /// Jump without animation
    fn jump_to(&mut self, options: CameraOptions);

    fn fit_bounds(&mut self, bbox: BBox, options: FitOptions);

    /// Re-measure the canvas after its container changed size
    fn resize(&mut self);

    fn is_animating(&self) -> bool;

    /// Move the backend clock forward, finishing or sampling animations
    fn advance(&mut self, now_ms: u64);

    /// Disposed surfaces ignore every command
    fn is_disposed(&self) -> bool {
        false
    }

    fn add_source(&mut self, id: &str, data: GeoJson) -> Result<()>;
    fn has_source(&self, id: &str) -> bool;
    fn set_source_data(&mut self, id: &str, data: GeoJson) -> Result<()>;
    fn remove_source(&mut self, id: &str) -> Result<()>;

    fn add_layer(&mut self, layer: LayerSpec) -> Result<()>;
    fn has_layer(&self, id: &str) -> bool;
    fn remove_layer(&mut self, id: &str) -> Result<()>;

    /// Fails with `SdkUnavailable` while the marker primitive is not loaded
    fn add_marker(&mut self, at: LngLat, label: Option<&str>) -> Result<MarkerId>;
    fn remove_marker(&mut self, id: MarkerId) -> Result<()>;
}
