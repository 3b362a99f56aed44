//! Navigation sequencing: one camera flight at a time, plus the search marker.
//!
//! A request that arrives while a flight holds the lock is dropped, not
//! queued. The lock clears `duration + slack` after it was taken (or, with
//! [`LockRelease::AnimationEnd`], as soon as the surface reports it is idle).

use crate::config::{LockRelease, NavigationConfig, NavigationPreset};
use crate::coordinator::timer::{TimerQueue, TimerTask};
use crate::error::Result;
use crate::geo::LngLat;
use crate::map::{CameraOptions, MapSurface, MarkerId};

/// One "go to location" intent
#[derive(Clone, Debug, PartialEq)]
pub struct NavigationRequest {
    pub target: LngLat,
    pub zoom: f64,
    pub pitch: f64,
    pub bearing: f64,
    pub duration_ms: u64,
    pub marker_label: Option<String>,
}

impl NavigationRequest {
    pub fn from_preset(target: LngLat, preset: &NavigationPreset) -> Self {
        Self {
            target,
            zoom: preset.zoom,
            pitch: preset.pitch,
            bearing: preset.bearing,
            duration_ms: preset.duration_ms,
            marker_label: None,
        }
    }

    pub fn with_marker(mut self, label: impl Into<String>) -> Self {
        self.marker_label = Some(label.into());
        self
    }

    fn camera_options(&self) -> CameraOptions {
        CameraOptions::centered(self.target)
            .zoom(self.zoom)
            .pitch(self.pitch)
            .bearing(self.bearing)
    }
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum DropReason {
    /// Another flight holds the lock
    Locked,
    /// The surface is gone
    Disposed,
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum NavigationOutcome {
    Started,
    Dropped(DropReason),
}

/// Result of a navigation wrapper: the flight outcome and what happened to the marker
#[derive(Debug)]
pub struct NavigationReport {
    pub outcome: NavigationOutcome,
    /// `None` when the request did not ask for a marker
    pub marker: Option<Result<MarkerId>>,
}

/// Advisory, self-expiring lock around camera flights
#[derive(Clone, Debug, Default)]
pub struct NavigationLock {
    held: bool,
    acquired_at: u64,
    expires_at: u64,
    generation: u64,
}

impl NavigationLock {
    /// Held until released or until its deadline passes
    pub fn is_held(&self, now_ms: u64) -> bool {
        self.held && now_ms < self.expires_at
    }

    fn acquire(&mut self, now_ms: u64, hold_ms: u64) -> u64 {
        self.generation += 1;
        self.held = true;
        self.acquired_at = now_ms;
        self.expires_at = now_ms + hold_ms;
        self.generation
    }

    /// Release if `generation` is still the current holder
    fn release(&mut self, generation: u64) -> bool {
        if self.held && self.generation == generation {
            self.held = false;
            true
        } else {
            false
        }
    }

    pub fn expires_at(&self) -> Option<u64> {
        self.held.then_some(self.expires_at)
    }
}

/// The single search marker currently on the map
#[derive(Clone, Debug, PartialEq)]
pub struct SearchMarker {
    pub id: MarkerId,
    pub at: LngLat,
    pub label: String,
}

pub struct NavigationSequencer {
    config: NavigationConfig,
    home: LngLat,
    home_zoom: f64,
    reset_duration_ms: u64,
    lock: NavigationLock,
    marker: Option<SearchMarker>,
}

impl NavigationSequencer {
    pub fn new(config: NavigationConfig, home: LngLat, home_zoom: f64, reset_duration_ms: u64) -> Self {
        Self {
            config,
            home,
            home_zoom,
            reset_duration_ms,
            lock: NavigationLock::default(),
            marker: None,
        }
    }

    pub fn config(&self) -> &NavigationConfig {
        &self.config
    }

    pub fn lock(&self) -> &NavigationLock {
        &self.lock
    }

    pub fn is_locked(&self, now_ms: u64) -> bool {
        self.lock.is_held(now_ms)
    }

    pub fn search_marker(&self) -> Option<&SearchMarker> {
        self.marker.as_ref()
    }

    /// Start one camera flight unless another one holds the lock
    pub fn navigate_to<S: MapSurface>(
        &mut self,
        surface: &mut S,
        timers: &mut TimerQueue,
        now_ms: u64,
        request: &NavigationRequest,
    ) -> NavigationOutcome {
        if surface.is_disposed() {
            return NavigationOutcome::Dropped(DropReason::Disposed);
        }
        if self.lock.is_held(now_ms) {
            tracing::debug!(
                lng = request.target.lng,
                lat = request.target.lat,
                expires_at = self.lock.expires_at,
                "navigation dropped, flight in progress"
            );
            return NavigationOutcome::Dropped(DropReason::Locked);
        }

        let hold_ms = request.duration_ms + self.config.lock_slack_ms;
        let generation = self.lock.acquire(now_ms, hold_ms);
        timers.schedule(now_ms + hold_ms, TimerTask::NavigationUnlock { generation });

        tracing::debug!(
            lng = request.target.lng,
            lat = request.target.lat,
            zoom = request.zoom,
            duration_ms = request.duration_ms,
            "flying to target"
        );
        surface.fly_to(request.camera_options(), request.duration_ms);
        NavigationOutcome::Started
    }

    /// Place the marker if the request asks for one, then navigate
    pub fn navigate<S: MapSurface>(
        &mut self,
        surface: &mut S,
        timers: &mut TimerQueue,
        now_ms: u64,
        request: &NavigationRequest,
    ) -> NavigationReport {
        let marker = request
            .marker_label
            .as_deref()
            .map(|label| self.add_search_marker(surface, request.target, label));
        let outcome = self.navigate_to(surface, timers, now_ms, request);
        NavigationReport { outcome, marker }
    }

    pub fn navigate_to_address<S: MapSurface>(
        &mut self,
        surface: &mut S,
        timers: &mut TimerQueue,
        now_ms: u64,
        coords: LngLat,
        label: &str,
    ) -> NavigationReport {
        let request = NavigationRequest::from_preset(coords, &self.config.address).with_marker(label);
        self.navigate(surface, timers, now_ms, &request)
    }

    pub fn navigate_to_poi<S: MapSurface>(
        &mut self,
        surface: &mut S,
        timers: &mut TimerQueue,
        now_ms: u64,
        coords: LngLat,
        label: &str,
    ) -> NavigationReport {
        let request = NavigationRequest::from_preset(coords, &self.config.poi).with_marker(label);
        self.navigate(surface, timers, now_ms, &request)
    }

    pub fn navigate_to_city<S: MapSurface>(
        &mut self,
        surface: &mut S,
        timers: &mut TimerQueue,
        now_ms: u64,
        coords: LngLat,
        label: &str,
    ) -> NavigationReport {
        let request = NavigationRequest::from_preset(coords, &self.config.city).with_marker(label);
        self.navigate(surface, timers, now_ms, &request)
    }

    /// Replace the search marker. On failure the previous marker is already gone.
    pub fn add_search_marker<S: MapSurface>(
        &mut self,
        surface: &mut S,
        coords: LngLat,
        label: &str,
    ) -> Result<MarkerId> {
        self.remove_search_marker(surface);

        match surface.add_marker(coords, Some(label)) {
            Ok(id) => {
                self.marker = Some(SearchMarker {
                    id,
                    at: coords,
                    label: label.to_string(),
                });
                Ok(id)
            }
            Err(e) => {
                tracing::warn!(error = %e, label, "search marker skipped");
                Err(e)
            }
        }
    }

    /// Remove the search marker; returns whether one was present
    pub fn remove_search_marker<S: MapSurface>(&mut self, surface: &mut S) -> bool {
        let Some(marker) = self.marker.take() else {
            return false;
        };
        if let Err(e) = surface.remove_marker(marker.id) {
            tracing::warn!(error = %e, marker = marker.id, "search marker already gone");
        }
        true
    }

    /// Fly home, regardless of the lock
    pub fn reset_view<S: MapSurface>(&mut self, surface: &mut S) {
        if surface.is_disposed() {
            return;
        }
        tracing::debug!("resetting view");
        let options = CameraOptions::centered(self.home)
            .zoom(self.home_zoom)
            .pitch(0.0)
            .bearing(0.0);
        surface.fly_to(options, self.reset_duration_ms);
    }

    /// Lock timer fired
    pub fn on_unlock_timer(&mut self, generation: u64) {
        if self.lock.release(generation) {
            tracing::trace!(generation, "navigation lock released by timer");
        }
    }

    /// Per-tick hook for the animation-end release policy
    pub fn on_tick<S: MapSurface>(&mut self, surface: &S, now_ms: u64) {
        if self.config.release != LockRelease::AnimationEnd || !self.lock.held {
            return;
        }
        if now_ms > self.lock.acquired_at && !surface.is_animating() {
            let generation = self.lock.generation;
            self.lock.release(generation);
            tracing::trace!(generation, "navigation lock released on animation end");
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::MapError;
    use crate::map::{CameraCall, CameraState, HeadlessMap};

    const HOME: LngLat = LngLat::new(-48.2772, -18.9186);

    fn setup() -> (NavigationSequencer, HeadlessMap, TimerQueue) {
        let seq = NavigationSequencer::new(NavigationConfig::default(), HOME, 12.0, 1500);
        let map = HeadlessMap::new(CameraState::new(HOME, 12.0), 400, 300);
        (seq, map, TimerQueue::new())
    }

    fn fire_due(seq: &mut NavigationSequencer, timers: &mut TimerQueue, now: u64) {
        while let Some((_, task)) = timers.pop_due(now) {
            if let TimerTask::NavigationUnlock { generation } = task {
                seq.on_unlock_timer(generation);
            }
        }
    }

    #[test]
    fn request_while_locked_leaves_camera_unchanged() {
        let (mut seq, mut map, mut timers) = setup();
        let first = NavigationRequest::from_preset(LngLat::new(-48.26, -18.91), &seq.config.address);
        assert_eq!(seq.navigate_to(&mut map, &mut timers, 0, &first), NavigationOutcome::Started);
        let before = map.camera();

        let second = NavigationRequest::from_preset(LngLat::new(-48.20, -18.80), &seq.config.city);
        let outcome = seq.navigate_to(&mut map, &mut timers, 500, &second);

        assert_eq!(outcome, NavigationOutcome::Dropped(DropReason::Locked));
        assert_eq!(map.camera(), before);
        assert_eq!(map.calls().len(), 1);
    }

    #[test]
    fn lock_clears_after_duration_plus_slack() {
        let (mut seq, mut map, mut timers) = setup();
        let req = NavigationRequest::from_preset(LngLat::new(-48.26, -18.91), &seq.config.address);
        seq.navigate_to(&mut map, &mut timers, 1000, &req);

        fire_due(&mut seq, &mut timers, 2899);
        assert!(seq.is_locked(2899));
        fire_due(&mut seq, &mut timers, 2900);
        assert!(!seq.is_locked(2900));

        let next = NavigationRequest::from_preset(LngLat::new(-48.20, -18.80), &seq.config.poi);
        assert_eq!(seq.navigate_to(&mut map, &mut timers, 2900, &next), NavigationOutcome::Started);
        assert_eq!(map.camera().zoom, 16.0);
        assert_eq!(map.camera().pitch, 50.0);
    }

    #[test]
    fn lock_expires_even_without_timer_dispatch() {
        let (mut seq, mut map, mut timers) = setup();
        let req = NavigationRequest::from_preset(LngLat::new(-48.26, -18.91), &seq.config.city);
        seq.navigate_to(&mut map, &mut timers, 0, &req);
        assert!(seq.is_locked(2099));
        assert!(!seq.is_locked(2100));
    }

    #[test]
    fn address_navigation_keeps_a_single_marker() {
        let (mut seq, mut map, mut timers) = setup();
        let a = LngLat::new(-48.26, -18.91);
        let b = LngLat::new(-48.28, -18.93);

        seq.navigate_to_address(&mut map, &mut timers, 0, a, "Av. Rondon Pacheco").marker.unwrap().unwrap();
        let report = seq.navigate_to_address(&mut map, &mut timers, 5000, b, "Praça Tubal Vilela");
        assert_eq!(report.outcome, NavigationOutcome::Started);
        report.marker.unwrap().unwrap();

        let markers = map.style().markers();
        assert_eq!(markers.len(), 1);
        assert_eq!(markers[0].at, b);
        assert_eq!(markers[0].label.as_deref(), Some("Praça Tubal Vilela"));
        assert_eq!(seq.search_marker().map(|m| m.at), Some(b));
    }

    #[test]
    fn dropped_navigation_still_moves_the_marker() {
        let (mut seq, mut map, mut timers) = setup();
        let a = LngLat::new(-48.26, -18.91);
        let b = LngLat::new(-48.28, -18.93);
        seq.navigate_to_poi(&mut map, &mut timers, 0, a, "Parque do Sabiá");
        let report = seq.navigate_to_poi(&mut map, &mut timers, 100, b, "Center Shopping");
        assert_eq!(report.outcome, NavigationOutcome::Dropped(DropReason::Locked));
        assert_eq!(map.style().markers().len(), 1);
        assert_eq!(map.style().markers()[0].at, b);
    }

    #[test]
    fn missing_marker_primitive_does_not_block_navigation() {
        let mut seq = NavigationSequencer::new(NavigationConfig::default(), HOME, 12.0, 1500);
        let mut map = HeadlessMap::new(CameraState::new(HOME, 12.0), 400, 300).without_markers();
        let mut timers = TimerQueue::new();

        let target = LngLat::new(-48.26, -18.91);
        let report = seq.navigate_to_city(&mut map, &mut timers, 0, target, "Uberlândia");
        assert!(matches!(report.marker, Some(Err(MapError::SdkUnavailable(_)))));
        assert_eq!(report.outcome, NavigationOutcome::Started);
        assert_eq!(map.camera().center, target);
        assert_eq!(map.camera().zoom, 12.0);
        assert!(seq.search_marker().is_none());
    }

    #[test]
    fn reset_ignores_the_lock() {
        let (mut seq, mut map, mut timers) = setup();
        let req = NavigationRequest::from_preset(LngLat::new(-48.0, -18.0), &seq.config.address);
        seq.navigate_to(&mut map, &mut timers, 0, &req);
        seq.reset_view(&mut map);

        assert_eq!(map.camera().center, HOME);
        assert_eq!(map.camera().zoom, 12.0);
        assert!(matches!(
            map.calls().last(),
            Some(CameraCall::FlyTo { duration_ms: 1500, .. })
        ));
        assert!(seq.is_locked(10));
    }

    #[test]
    fn animation_end_policy_releases_when_idle() {
        let config = NavigationConfig {
            release: LockRelease::AnimationEnd,
            ..NavigationConfig::default()
        };
        let mut seq = NavigationSequencer::new(config, HOME, 12.0, 1500);
        let mut map = HeadlessMap::new(CameraState::new(HOME, 12.0), 400, 300);
        let mut timers = TimerQueue::new();

        let req = NavigationRequest::from_preset(LngLat::new(-48.0, -18.0), &seq.config.address);
        seq.navigate_to(&mut map, &mut timers, 0, &req);
        seq.on_tick(&map, 0);
        assert!(seq.is_locked(0));
        seq.on_tick(&map, 16);
        assert!(!seq.is_locked(16));
    }

    #[test]
    fn stale_unlock_timer_does_not_release_newer_lock() {
        let (mut seq, mut map, mut timers) = setup();
        let req = NavigationRequest::from_preset(LngLat::new(-48.0, -18.0), &seq.config.address);
        seq.navigate_to(&mut map, &mut timers, 0, &req);
        // Lock lapses by deadline without the timer firing, then a new flight starts
        seq.navigate_to(&mut map, &mut timers, 5000, &req);
        seq.on_unlock_timer(1);
        assert!(seq.is_locked(5001));
    }
}
