use crate::config::{Config, MapConfig};
use crate::coordinator::keyboard::MapCommand;
use crate::coordinator::navigation::{NavigationReport, NavigationRequest, NavigationSequencer};
use crate::coordinator::overlay::{OverlayFamily, OverlayLayerManager, StreetResult};
use crate::coordinator::stabilizer::{ResizeDecision, ViewportCapabilities, ViewportSignal, ViewportStabilizer};
use crate::coordinator::timer::{TimerQueue, TimerTask};
use crate::error::Result;
use crate::geo::{BBox, LngLat};
use crate::geolocation::{Geolocator, Located, PositionSource};
use crate::map::{CameraOptions, MapSurface, MarkerId, Viewport};
use crate::search::{GeocodeFeature, PlaceKind};

/// Single owner of a map surface. Every camera or style change goes through
/// here so the coordinators share one clock and one timer queue.
pub struct MapSession<S> {
    surface: S,
    timers: TimerQueue,
    navigation: NavigationSequencer,
    stabilizer: ViewportStabilizer,
    overlays: OverlayLayerManager,
    map: MapConfig,
    alert_radius_m: f64,
    now_ms: u64,
}

impl<S: MapSurface> MapSession<S> {
    pub fn new(surface: S, config: &Config) -> Self {
        let map = config.map.clone();
        Self {
            surface,
            timers: TimerQueue::new(),
            navigation: NavigationSequencer::new(
                config.navigation.clone(),
                map.default_center,
                map.default_zoom,
                map.reset_duration_ms,
            ),
            stabilizer: ViewportStabilizer::new(config.viewport.clone()),
            overlays: OverlayLayerManager::new(config.overlay.clone()),
            map,
            alert_radius_m: config.overlay.alert_radius_m,
            now_ms: 0,
        }
    }

    pub fn surface(&self) -> &S {
        &self.surface
    }

    pub fn surface_mut(&mut self) -> &mut S {
        &mut self.surface
    }

    pub fn navigation(&self) -> &NavigationSequencer {
        &self.navigation
    }

    pub fn stabilizer(&self) -> &ViewportStabilizer {
        &self.stabilizer
    }

    pub fn overlays(&self) -> &OverlayLayerManager {
        &self.overlays
    }

    pub fn pending_timers(&self) -> usize {
        self.timers.len()
    }

    pub fn now(&self) -> u64 {
        self.now_ms
    }

    pub fn is_locked(&self) -> bool {
        self.navigation.is_locked(self.now_ms)
    }

    /// Advance the clock: animate the surface, then fire due timers in order
    pub fn tick(&mut self, now_ms: u64) {
        self.now_ms = self.now_ms.max(now_ms);
        let now = self.now_ms;
        self.surface.advance(now);

        while let Some((due, task)) = self.timers.pop_due(now) {
            match task {
                TimerTask::NavigationUnlock { generation } => self.navigation.on_unlock_timer(generation),
                TimerTask::StabilizerSettle { generation } => {
                    self.stabilizer
                        .on_settle_timer(&mut self.surface, &mut self.timers, due, generation)
                }
                TimerTask::StabilizerReplay { generation } => {
                    self.stabilizer.on_replay_timer(&mut self.surface, generation)
                }
            }
        }

        self.navigation.on_tick(&self.surface, now);
    }

    pub fn navigate(&mut self, request: &NavigationRequest) -> NavigationReport {
        let _span = tracing::debug_span!("navigate", lng = request.target.lng, lat = request.target.lat).entered();
        self.navigation
            .navigate(&mut self.surface, &mut self.timers, self.now_ms, request)
    }

    pub fn navigate_to_address(&mut self, coords: LngLat, label: &str) -> NavigationReport {
        let _span = tracing::debug_span!("navigate_to_address", label).entered();
        self.navigation
            .navigate_to_address(&mut self.surface, &mut self.timers, self.now_ms, coords, label)
    }

    pub fn navigate_to_poi(&mut self, coords: LngLat, label: &str) -> NavigationReport {
        let _span = tracing::debug_span!("navigate_to_poi", label).entered();
        self.navigation
            .navigate_to_poi(&mut self.surface, &mut self.timers, self.now_ms, coords, label)
    }

    pub fn navigate_to_city(&mut self, coords: LngLat, label: &str) -> NavigationReport {
        let _span = tracing::debug_span!("navigate_to_city", label).entered();
        self.navigation
            .navigate_to_city(&mut self.surface, &mut self.timers, self.now_ms, coords, label)
    }

    /// Fly to a geocoding hit with the preset matching its kind
    pub fn select_result(&mut self, feature: &GeocodeFeature) -> NavigationReport {
        let coords = feature.center();
        let label = feature.text.as_str();
        match feature.kind() {
            PlaceKind::Address | PlaceKind::Street => self.navigate_to_address(coords, label),
            PlaceKind::Poi | PlaceKind::Neighborhood => self.navigate_to_poi(coords, label),
            PlaceKind::City | PlaceKind::Other => self.navigate_to_city(coords, label),
        }
    }

    /// Look up the device position and fly there with the recenter preset
    pub fn recenter<P: PositionSource>(&mut self, geolocator: &mut Geolocator<P>) -> (Located, NavigationReport) {
        let _span = tracing::debug_span!("recenter").entered();
        let located = geolocator.locate(self.now_ms);
        let request = NavigationRequest::from_preset(located.position(), &self.navigation.config().recenter);
        let report = self
            .navigation
            .navigate(&mut self.surface, &mut self.timers, self.now_ms, &request);
        (located, report)
    }

    pub fn add_search_marker(&mut self, coords: LngLat, label: &str) -> Result<MarkerId> {
        self.navigation.add_search_marker(&mut self.surface, coords, label)
    }

    pub fn remove_search_marker(&mut self) -> bool {
        self.navigation.remove_search_marker(&mut self.surface)
    }

    pub fn reset_view(&mut self) {
        self.navigation.reset_view(&mut self.surface);
    }

    pub fn show_bounded_area(&mut self, bbox: BBox, center: LngLat) -> Result<OverlayFamily> {
        let _span = tracing::debug_span!("show_bounded_area").entered();
        self.overlays.show_bounded_area(&mut self.surface, bbox, center)
    }

    pub fn show_street_collection(&mut self, streets: &[StreetResult], neighborhood: &str) -> Result<OverlayFamily> {
        let _span = tracing::debug_span!("show_street_collection", neighborhood).entered();
        self.overlays
            .show_street_collection(&mut self.surface, streets, neighborhood)
    }

    /// Radial alert; `None` uses the configured radius
    pub fn show_radial_alert(&mut self, center: LngLat, radius_m: Option<f64>) -> Result<OverlayFamily> {
        let radius_m = radius_m.unwrap_or(self.alert_radius_m);
        let _span = tracing::debug_span!("show_radial_alert", radius_m).entered();
        self.overlays.show_radial_alert(&mut self.surface, center, radius_m)
    }

    pub fn hide_all(&mut self) -> usize {
        self.overlays.hide_all(&mut self.surface)
    }

    pub fn observe_viewport(&mut self, initial_height: f64, caps: ViewportCapabilities) {
        self.stabilizer.observe_viewport(initial_height, caps);
    }

    pub fn unobserve_viewport(&mut self) {
        self.stabilizer.unobserve();
    }

    pub fn handle_viewport_signal(&mut self, signal: ViewportSignal) -> Option<ResizeDecision> {
        self.stabilizer
            .handle_signal(&mut self.surface, &mut self.timers, self.now_ms, signal)
    }

    /// Keyboard camera control. Bypasses the navigation lock.
    pub fn apply(&mut self, command: MapCommand) {
        if self.surface.is_disposed() {
            return;
        }
        let camera = self.surface.camera();
        match command {
            MapCommand::Pan { dx, dy } => {
                // A relative pan does not depend on the canvas size
                let center = Viewport::from_camera(&camera, 0, 0).panned_center(dx, dy);
                self.surface.jump_to(CameraOptions::centered(center));
            }
            MapCommand::ZoomIn => self
                .surface
                .ease_to(CameraOptions::default().zoom(camera.zoom + 1.0), self.map.key_zoom_duration_ms),
            MapCommand::ZoomOut => self
                .surface
                .ease_to(CameraOptions::default().zoom(camera.zoom - 1.0), self.map.key_zoom_duration_ms),
            MapCommand::Reset => self.reset_view(),
        }
    }
}
