use geojson::GeoJson;

use crate::error::{MapError, Result};
use crate::geo::{BBox, LngLat};
use crate::map::camera::{CameraOptions, CameraState, FitOptions, MAX_ZOOM};
use crate::map::projection::Viewport;
use crate::map::style::{LayerSpec, MarkerId, StyleStore};
use crate::map::surface::MapSurface;

/// Camera commands received by a [`HeadlessMap`], in order
#[derive(Clone, Debug, PartialEq)]
pub enum CameraCall {
    FlyTo { target: CameraState, duration_ms: u64 },
    EaseTo { target: CameraState, duration_ms: u64 },
    JumpTo { target: CameraState },
    FitBounds { bbox: BBox, options: FitOptions },
    Resize,
}

/// Surface without a screen: camera moves land immediately and every camera
/// command is recorded. Used by tests, benches and batch tooling.
pub struct HeadlessMap {
    camera: CameraState,
    width: usize,
    height: usize,
    style: StyleStore,
    calls: Vec<CameraCall>,
    markers_ready: bool,
    disposed: bool,
}

impl HeadlessMap {
    pub fn new(camera: CameraState, width: usize, height: usize) -> Self {
        Self {
            camera,
            width,
            height,
            style: StyleStore::new(),
            calls: Vec::new(),
            markers_ready: true,
            disposed: false,
        }
    }

    /// Simulate the marker primitive not being loaded yet
    pub fn without_markers(mut self) -> Self {
        self.markers_ready = false;
        self
    }

    pub fn dispose(&mut self) {
        self.disposed = true;
    }

    pub fn set_size(&mut self, width: usize, height: usize) {
        self.width = width;
        self.height = height;
    }

    pub fn style(&self) -> &StyleStore {
        &self.style
    }

    pub fn calls(&self) -> &[CameraCall] {
        &self.calls
    }

    pub fn resize_count(&self) -> usize {
        self.calls.iter().filter(|c| matches!(c, CameraCall::Resize)).count()
    }

    fn live(&self) -> Result<()> {
        if self.disposed {
            Err(MapError::Disposed)
        } else {
            Ok(())
        }
    }
}

impl MapSurface for HeadlessMap {
    fn camera(&self) -> CameraState {
        self.camera
    }

    fn fly_to(&mut self, options: CameraOptions, duration_ms: u64) {
        if self.disposed {
            return;
        }
        self.camera = self.camera.with(&options);
        self.calls.push(CameraCall::FlyTo {
            target: self.camera,
            duration_ms,
        });
    }

    fn ease_to(&mut self, options: CameraOptions, duration_ms: u64) {
        if self.disposed {
            return;
        }
        self.camera = self.camera.with(&options);
        self.calls.push(CameraCall::EaseTo {
            target: self.camera,
            duration_ms,
        });
    }

    fn jump_to(&mut self, options: CameraOptions) {
        if self.disposed {
            return;
        }
        self.camera = self.camera.with(&options);
        self.calls.push(CameraCall::JumpTo { target: self.camera });
    }

    fn fit_bounds(&mut self, bbox: BBox, options: FitOptions) {
        if self.disposed {
            return;
        }
        let viewport = Viewport::from_camera(&self.camera, self.width, self.height);
        let zoom = viewport.fit_zoom(&bbox, options.padding).min(options.max_zoom.min(MAX_ZOOM));
        self.camera = self
            .camera
            .with(&CameraOptions::centered(bbox.center()).zoom(zoom).bearing(0.0));
        self.calls.push(CameraCall::FitBounds { bbox, options });
    }

    fn resize(&mut self) {
        if self.disposed {
            return;
        }
        self.calls.push(CameraCall::Resize);
    }

    fn is_animating(&self) -> bool {
        false
    }

    fn advance(&mut self, _now_ms: u64) {}

    fn is_disposed(&self) -> bool {
        self.disposed
    }

    fn add_source(&mut self, id: &str, data: GeoJson) -> Result<()> {
        self.live()?;
        self.style.add_source(id, data)
    }

    fn has_source(&self, id: &str) -> bool {
        self.style.has_source(id)
    }

    fn set_source_data(&mut self, id: &str, data: GeoJson) -> Result<()> {
        self.live()?;
        self.style.set_source_data(id, data)
    }

    fn remove_source(&mut self, id: &str) -> Result<()> {
        self.live()?;
        self.style.remove_source(id)
    }

    fn add_layer(&mut self, layer: LayerSpec) -> Result<()> {
        self.live()?;
        self.style.add_layer(layer)
    }

    fn has_layer(&self, id: &str) -> bool {
        self.style.has_layer(id)
    }

    fn remove_layer(&mut self, id: &str) -> Result<()> {
        self.live()?;
        self.style.remove_layer(id)
    }

    fn add_marker(&mut self, at: LngLat, label: Option<&str>) -> Result<MarkerId> {
        self.live()?;
        if !self.markers_ready {
            return Err(MapError::SdkUnavailable("marker"));
        }
        Ok(self.style.add_marker(at, label.map(str::to_string)))
    }

    fn remove_marker(&mut self, id: MarkerId) -> Result<()> {
        self.live()?;
        self.style.remove_marker(id)
    }
}
