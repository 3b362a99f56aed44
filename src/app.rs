use crossterm::event::{KeyCode, KeyEvent, KeyEventKind};
use std::path::Path;
use std::time::Instant;

use urbmind_map::config::Config;
use urbmind_map::coordinator::{
    command_for, DropReason, FocusTarget, MapSession, NavigationOutcome, NavigationReport, ResizeDecision,
    ViewportCapabilities, ViewportSignal,
};
use urbmind_map::data;
use urbmind_map::geo::BBox;
use urbmind_map::geolocation::{FixedPosition, Geolocator, Located, PositionOptions};
use urbmind_map::map::{CameraState, Lod, MapSurface, TerminalMap};
use urbmind_map::search::{GeocodeFeature, GeocodeResponse, PlaceKind};

/// Columns taken by the search panel when there are results to show
pub const PANEL_WIDTH: u16 = 34;

/// Half-size in degrees of the red area drawn around a result without a bbox
const AREA_PAD_DEG: f64 = 0.01;

/// Application state
pub struct App {
    pub session: MapSession<TerminalMap>,
    pub results: GeocodeResponse,
    pub selected: Option<usize>,
    pub input_focused: bool,
    pub status: String,
    pub should_quit: bool,
    geolocator: Geolocator<FixedPosition>,
    pan_step: f64,
    started: Instant,
}

impl App {
    pub fn new(config: &Config, width: u16, height: u16, data_dir: &Path, results: GeocodeResponse) -> Self {
        let (cols, rows) = map_cells(width, height, !results.features.is_empty());
        let camera = CameraState::new(config.map.default_center, config.map.default_zoom);
        let mut map = TerminalMap::new(camera, cols, rows);

        if data_dir.exists() {
            if let Err(e) = data::load_basemap(&mut map.renderer, data_dir) {
                tracing::warn!(error = %e, "basemap not loaded");
            }
        }
        if !map.renderer.has_data() {
            data::generate_fallback_basemap(&mut map.renderer);
        }
        map.set_markers_ready(true);

        let mut session = MapSession::new(map, config);
        session.observe_viewport(
            rows as f64 * 4.0,
            ViewportCapabilities {
                visual_viewport: config.viewport.visual_viewport,
            },
        );

        let geolocator = Geolocator::new(
            FixedPosition(config.geolocation.device_position),
            PositionOptions::from(&config.geolocation),
            config.map.default_center,
        );

        Self {
            session,
            results,
            selected: None,
            input_focused: false,
            status: String::from("ready"),
            should_quit: false,
            geolocator,
            pan_step: config.map.pan_step_px,
            started: Instant::now(),
        }
    }

    /// Feed the wall clock into the session
    pub fn tick(&mut self) {
        let now = self.started.elapsed().as_millis() as u64;
        self.session.tick(now);
    }

    /// Terminal resized: report the new container, let the stabilizer decide
    pub fn resize(&mut self, width: u16, height: u16) {
        let (cols, rows) = map_cells(width, height, self.has_panel());
        self.session.surface_mut().set_container_size(cols, rows);

        let signal = ViewportSignal::WindowResize {
            height: rows as f64 * 4.0,
        };
        match self.session.handle_viewport_signal(signal) {
            // The stabilizer re-measures: on its settle timer, or at once past that step
            Some(ResizeDecision::Stabilizing) | Some(ResizeDecision::AlreadyTransitioning) => {
                self.status = String::from("stabilizing viewport");
            }
            _ => self.session.surface_mut().resize(),
        }
    }

    pub fn handle_key(&mut self, key: KeyEvent) {
        if key.kind != KeyEventKind::Press {
            return;
        }
        if let Some(command) = command_for(&key, self.pan_step) {
            self.session.apply(command);
            return;
        }

        match key.code {
            KeyCode::Char('q') | KeyCode::Esc => self.should_quit = true,
            KeyCode::Char(c @ '1'..='9') => self.select((c as u8 - b'1') as usize),
            KeyCode::Char('a') => self.show_alert(),
            KeyCode::Char('b') => self.show_area(),
            KeyCode::Char('s') => self.show_streets(),
            KeyCode::Char('x') => {
                let removed = self.session.hide_all();
                self.status = format!("overlays hidden ({removed} removed)");
            }
            KeyCode::Char('g') => self.recenter(),
            KeyCode::Char('/') => self.toggle_input_focus(),
            KeyCode::Char('C') => self.session.surface_mut().renderer.toggle_cities(),
            KeyCode::Char('L') => self.session.surface_mut().renderer.toggle_labels(),
            KeyCode::Char('B') => self.session.surface_mut().renderer.toggle_borders(),
            _ => {}
        }
    }

    pub fn has_panel(&self) -> bool {
        !self.results.features.is_empty()
    }

    pub fn selected_feature(&self) -> Option<&GeocodeFeature> {
        self.selected.and_then(|i| self.results.features.get(i))
    }

    pub fn zoom_level(&self) -> String {
        format!("{:.1}", self.session.surface().camera().zoom)
    }

    pub fn lod_level(&self) -> &'static str {
        match Lod::from_zoom(self.session.surface().camera().zoom) {
            Lod::Low => "110m",
            Lod::Medium => "50m",
            Lod::High => "10m",
        }
    }

    pub fn center_coords(&self) -> String {
        let c = self.session.surface().camera().center;
        let lat_dir = if c.lat >= 0.0 { 'N' } else { 'S' };
        let lng_dir = if c.lng >= 0.0 { 'E' } else { 'W' };
        format!("{:.4}°{} {:.4}°{}", c.lat.abs(), lat_dir, c.lng.abs(), lng_dir)
    }

    fn select(&mut self, index: usize) {
        let Some(feature) = self.results.features.get(index).cloned() else {
            return;
        };
        self.selected = Some(index);
        let report = self.session.select_result(&feature);
        self.status = describe(&report, &feature.text, feature.kind());
    }

    /// Radial alert around the selected result, or the camera center
    fn show_alert(&mut self) {
        let center = self
            .selected_feature()
            .map(GeocodeFeature::center)
            .unwrap_or_else(|| self.session.surface().camera().center);
        self.status = match self.session.show_radial_alert(center, None) {
            Ok(family) => format!("{} shown", family.label()),
            Err(e) => format!("alert failed: {e}"),
        };
    }

    fn show_area(&mut self) {
        let (bbox, center) = match self.selected_feature() {
            Some(f) => (f.bbox().unwrap_or_else(|| BBox::around(f.center(), AREA_PAD_DEG)), f.center()),
            None => {
                let center = self.session.surface().camera().center;
                (BBox::around(center, AREA_PAD_DEG), center)
            }
        };
        self.status = match self.session.show_bounded_area(bbox, center) {
            Ok(family) => format!("{} shown", family.label()),
            Err(e) => format!("area failed: {e}"),
        };
    }

    /// Streets of the selected result's neighborhood, else of the first one found
    fn show_streets(&mut self) {
        let neighborhood = self
            .selected_feature()
            .and_then(GeocodeFeature::neighborhood)
            .or_else(|| self.results.features.iter().find_map(GeocodeFeature::neighborhood))
            .map(str::to_string);
        let Some(neighborhood) = neighborhood else {
            self.status = String::from("no neighborhood in results");
            return;
        };
        let streets = self.results.streets_in(&neighborhood);
        self.status = match self.session.show_street_collection(&streets, &neighborhood) {
            Ok(_) => format!("{} streets in {}", streets.len(), neighborhood),
            Err(e) => format!("streets failed: {e}"),
        };
    }

    fn recenter(&mut self) {
        let (located, report) = self.session.recenter(&mut self.geolocator);
        let source = match located {
            Located::Device(_) => String::from("device position"),
            Located::Cached(_) => String::from("cached position"),
            Located::Fallback { reason, .. } => format!("default center ({reason})"),
        };
        self.status = match report.outcome {
            NavigationOutcome::Started => format!("recentering on {source}"),
            NavigationOutcome::Dropped(reason) => dropped(reason),
        };
    }

    /// Stand-in for a search box gaining focus on a touch device
    fn toggle_input_focus(&mut self) {
        self.input_focused = !self.input_focused;
        let signal = if self.input_focused {
            ViewportSignal::FocusIn(FocusTarget::Input)
        } else {
            ViewportSignal::FocusOut(FocusTarget::Input)
        };
        self.session.handle_viewport_signal(signal);
    }
}

/// Map canvas size in character cells for a terminal of `width` x `height`.
/// Borders take two columns and two rows, the status bar one row.
pub fn map_cells(width: u16, height: u16, panel: bool) -> (usize, usize) {
    let panel = if panel { PANEL_WIDTH } else { 0 };
    let cols = width.saturating_sub(panel).saturating_sub(2);
    let rows = height.saturating_sub(3);
    (cols as usize, rows as usize)
}

fn describe(report: &NavigationReport, label: &str, kind: PlaceKind) -> String {
    match report.outcome {
        NavigationOutcome::Started => format!("flying to {} ({})", label, kind.label()),
        NavigationOutcome::Dropped(reason) => dropped(reason),
    }
}

fn dropped(reason: DropReason) -> String {
    match reason {
        DropReason::Locked => String::from("navigation dropped: flight in progress"),
        DropReason::Disposed => String::from("navigation dropped: map disposed"),
    }
}
