use geojson::GeoJson;

use crate::error::{MapError, Result};
use crate::geo::{BBox, LngLat};
use crate::map::camera::{CameraOptions, CameraState, FitOptions, Motion, Transition};
use crate::map::projection::Viewport;
use crate::map::renderer::{MapLayers, MapRenderer};
use crate::map::style::{LayerSpec, MarkerId, StyleStore};
use crate::map::surface::MapSurface;

/// Map surface drawn into the terminal with Braille characters.
///
/// Camera moves are animated against the clock fed through `advance`. The
/// canvas keeps its measured size until `resize()` is called, mirroring a web
/// map whose canvas only re-measures its container on request.
pub struct TerminalMap {
    camera: CameraState,
    transition: Option<Transition>,
    now_ms: u64,
    /// Measured canvas size in character cells
    cells: (usize, usize),
    /// Latest container size reported by the terminal
    container: (usize, usize),
    style: StyleStore,
    pub renderer: MapRenderer,
    markers_ready: bool,
}

impl TerminalMap {
    pub fn new(camera: CameraState, cols: usize, rows: usize) -> Self {
        Self {
            camera,
            transition: None,
            now_ms: 0,
            cells: (cols, rows),
            container: (cols, rows),
            style: StyleStore::new(),
            renderer: MapRenderer::new(),
            markers_ready: false,
        }
    }

    /// Marker primitive becomes usable once basemap data is in place
    pub fn set_markers_ready(&mut self, ready: bool) {
        self.markers_ready = ready;
    }

    /// Record the container size; takes effect on the next `resize()`
    pub fn set_container_size(&mut self, cols: usize, rows: usize) {
        self.container = (cols, rows);
    }

    pub fn canvas_cells(&self) -> (usize, usize) {
        self.cells
    }

    pub fn viewport(&self) -> Viewport {
        Viewport::from_camera(&self.camera, self.cells.0 * 2, self.cells.1 * 4)
    }

    pub fn style(&self) -> &StyleStore {
        &self.style
    }

    /// Rasterize the current frame
    pub fn render(&self) -> MapLayers {
        self.renderer
            .render(self.cells.0, self.cells.1, &self.viewport(), &self.style)
    }

    fn start(&mut self, options: CameraOptions, duration_ms: u64, motion: Motion) {
        let to = self.camera.with(&options);
        if duration_ms == 0 {
            self.camera = to;
            self.transition = None;
            return;
        }
        self.transition = Some(Transition {
            from: self.camera,
            to,
            start_ms: self.now_ms,
            duration_ms,
            motion,
        });
    }
}

impl MapSurface for TerminalMap {
    fn camera(&self) -> CameraState {
        self.camera
    }

    fn fly_to(&mut self, options: CameraOptions, duration_ms: u64) {
        self.start(options, duration_ms, Motion::Fly);
    }

    fn ease_to(&mut self, options: CameraOptions, duration_ms: u64) {
        self.start(options, duration_ms, Motion::Ease);
    }

    fn jump_to(&mut self, options: CameraOptions) {
        self.start(options, 0, Motion::Ease);
    }

    fn fit_bounds(&mut self, bbox: BBox, options: FitOptions) {
        let zoom = self.viewport().fit_zoom(&bbox, options.padding).min(options.max_zoom);
        let target = CameraOptions::centered(bbox.center()).zoom(zoom).bearing(0.0);
        self.start(target, options.duration_ms, Motion::Ease);
    }

    fn resize(&mut self) {
        self.cells = self.container;
    }

    fn is_animating(&self) -> bool {
        self.transition.is_some()
    }

    fn advance(&mut self, now_ms: u64) {
        self.now_ms = now_ms;
        if let Some(transition) = &self.transition {
            self.camera = transition.sample(now_ms);
            if transition.is_done(now_ms) {
                self.transition = None;
            }
        }
    }

    fn add_source(&mut self, id: &str, data: GeoJson) -> Result<()> {
        self.style.add_source(id, data)
    }

    fn has_source(&self, id: &str) -> bool {
        self.style.has_source(id)
    }

    fn set_source_data(&mut self, id: &str, data: GeoJson) -> Result<()> {
        self.style.set_source_data(id, data)
    }

    fn remove_source(&mut self, id: &str) -> Result<()> {
        self.style.remove_source(id)
    }

    fn add_layer(&mut self, layer: LayerSpec) -> Result<()> {
        self.style.add_layer(layer)
    }

    fn has_layer(&self, id: &str) -> bool {
        self.style.has_layer(id)
    }

    fn remove_layer(&mut self, id: &str) -> Result<()> {
        self.style.remove_layer(id)
    }

    fn add_marker(&mut self, at: LngLat, label: Option<&str>) -> Result<MarkerId> {
        if !self.markers_ready {
            return Err(MapError::SdkUnavailable("marker"));
        }
        Ok(self.style.add_marker(at, label.map(str::to_string)))
    }

    fn remove_marker(&mut self, id: MarkerId) -> Result<()> {
        self.style.remove_marker(id)
    }
}
