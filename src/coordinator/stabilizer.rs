//! Keeps the camera still while a virtual keyboard (or any large container
//! change) resizes the map canvas.
//!
//! Cycle: snapshot camera → wait `settle_ms` → re-measure canvas → wait
//! `remeasure_delay_ms` → ease back to the snapshot over `replay_duration_ms`.
//! Resizes that arrive mid-cycle are ignored.

use crate::config::ViewportConfig;
use crate::coordinator::timer::{TimerQueue, TimerTask};
use crate::map::{CameraOptions, CameraState, MapSurface};

/// Element that gained or lost focus
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum FocusTarget {
    Input,
    TextArea,
    Other,
}

impl FocusTarget {
    fn is_text_entry(self) -> bool {
        matches!(self, FocusTarget::Input | FocusTarget::TextArea)
    }
}

/// Viewport events the stabilizer listens to
#[derive(Clone, Copy, Debug, PartialEq)]
pub enum ViewportSignal {
    WindowResize { height: f64 },
    OrientationChange { height: f64 },
    VisualViewportResize { height: f64 },
    FocusIn(FocusTarget),
    FocusOut(FocusTarget),
}

/// What the host environment can report
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct ViewportCapabilities {
    pub visual_viewport: bool,
}

/// Active listener set, present between `observe_viewport` and `unobserve`
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct Subscription {
    pub window_resize: bool,
    pub orientation_change: bool,
    pub visual_viewport: bool,
    pub focus: bool,
}

impl Subscription {
    fn accepts(&self, signal: &ViewportSignal) -> bool {
        match signal {
            ViewportSignal::WindowResize { .. } => self.window_resize,
            ViewportSignal::OrientationChange { .. } => self.orientation_change,
            ViewportSignal::VisualViewportResize { .. } => self.visual_viewport,
            ViewportSignal::FocusIn(_) | ViewportSignal::FocusOut(_) => self.focus,
        }
    }
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum ResizeDecision {
    /// First height seen, nothing to compare against
    Baseline,
    BelowThreshold,
    AlreadyTransitioning,
    /// A snapshot/replay cycle has started
    Stabilizing,
}

pub struct ViewportStabilizer {
    config: ViewportConfig,
    subscription: Option<Subscription>,
    last_height: Option<f64>,
    snapshot: Option<CameraState>,
    transitioning: bool,
    /// Settle step of the current cycle has re-measured the canvas
    settled: bool,
    generation: u64,
    completed_cycles: u64,
}

impl ViewportStabilizer {
    pub fn new(config: ViewportConfig) -> Self {
        Self {
            config,
            subscription: None,
            last_height: None,
            snapshot: None,
            transitioning: false,
            settled: false,
            generation: 0,
            completed_cycles: 0,
        }
    }

    /// Start listening. The visual-viewport listener is only installed when supported.
    pub fn observe_viewport(&mut self, initial_height: f64, caps: ViewportCapabilities) -> Subscription {
        let subscription = Subscription {
            window_resize: true,
            orientation_change: true,
            visual_viewport: caps.visual_viewport && self.config.visual_viewport,
            focus: true,
        };
        self.subscription = Some(subscription);
        self.last_height = Some(initial_height);
        tracing::debug!(initial_height, visual_viewport = subscription.visual_viewport, "observing viewport");
        subscription
    }

    /// Stop listening and abandon any cycle in flight
    pub fn unobserve(&mut self) {
        self.subscription = None;
        self.transitioning = false;
        self.settled = false;
        self.snapshot = None;
        self.generation += 1;
    }

    pub fn is_observing(&self) -> bool {
        self.subscription.is_some()
    }

    pub fn is_transitioning(&self) -> bool {
        self.transitioning
    }

    pub fn snapshot(&self) -> Option<CameraState> {
        self.snapshot
    }

    pub fn completed_cycles(&self) -> u64 {
        self.completed_cycles
    }

    /// Route a viewport event. Events without a listener are ignored (`None`).
    pub fn handle_signal<S: MapSurface>(
        &mut self,
        surface: &mut S,
        timers: &mut TimerQueue,
        now_ms: u64,
        signal: ViewportSignal,
    ) -> Option<ResizeDecision> {
        if !self.subscription.is_some_and(|s| s.accepts(&signal)) {
            return None;
        }
        match signal {
            ViewportSignal::WindowResize { height }
            | ViewportSignal::OrientationChange { height }
            | ViewportSignal::VisualViewportResize { height } => {
                Some(self.on_resize(surface, timers, now_ms, height))
            }
            ViewportSignal::FocusIn(target) if target.is_text_entry() => {
                self.on_input_focus(surface);
                None
            }
            ViewportSignal::FocusOut(target) if target.is_text_entry() => {
                self.on_input_blur();
                None
            }
            ViewportSignal::FocusIn(_) | ViewportSignal::FocusOut(_) => None,
        }
    }

    pub fn on_resize<S: MapSurface>(
        &mut self,
        surface: &mut S,
        timers: &mut TimerQueue,
        now_ms: u64,
        new_height: f64,
    ) -> ResizeDecision {
        let Some(previous) = self.last_height.replace(new_height) else {
            return ResizeDecision::Baseline;
        };

        let delta = (new_height - previous).abs();
        if delta <= self.config.height_threshold_px {
            return ResizeDecision::BelowThreshold;
        }
        if self.transitioning {
            // Past the settle step nothing else will re-measure this size
            if self.settled && !surface.is_disposed() {
                surface.resize();
            }
            tracing::trace!(delta, settled = self.settled, "resize ignored, stabilization in progress");
            return ResizeDecision::AlreadyTransitioning;
        }
        if surface.is_disposed() {
            return ResizeDecision::BelowThreshold;
        }

        // Prefer the snapshot taken on input focus, before the keyboard moved anything
        let snapshot = self.snapshot.unwrap_or_else(|| surface.camera());
        self.snapshot = Some(snapshot);
        self.transitioning = true;
        self.settled = false;
        self.generation += 1;
        timers.schedule(
            now_ms + self.config.settle_ms,
            TimerTask::StabilizerSettle { generation: self.generation },
        );

        tracing::debug!(previous, new_height, zoom = snapshot.zoom, "viewport jump, stabilizing camera");
        ResizeDecision::Stabilizing
    }

    /// Settle timer: re-measure the canvas, then schedule the replay
    pub fn on_settle_timer<S: MapSurface>(
        &mut self,
        surface: &mut S,
        timers: &mut TimerQueue,
        now_ms: u64,
        generation: u64,
    ) {
        if generation != self.generation || !self.transitioning {
            return;
        }
        if surface.is_disposed() {
            self.abandon();
            return;
        }
        surface.resize();
        self.settled = true;
        timers.schedule(
            now_ms + self.config.remeasure_delay_ms,
            TimerTask::StabilizerReplay { generation },
        );
    }

    /// Replay timer: ease back to the snapshot and end the cycle
    pub fn on_replay_timer<S: MapSurface>(&mut self, surface: &mut S, generation: u64) {
        if generation != self.generation || !self.transitioning {
            return;
        }
        let snapshot = self.snapshot.take();
        self.transitioning = false;
        self.settled = false;

        let Some(snapshot) = snapshot else {
            return;
        };
        if surface.is_disposed() {
            return;
        }
        surface.ease_to(CameraOptions::from(snapshot), self.config.replay_duration_ms);
        self.completed_cycles += 1;
        tracing::debug!(cycle = self.completed_cycles, "camera restored after viewport change");
    }

    pub fn on_input_focus<S: MapSurface>(&mut self, surface: &S) {
        if self.transitioning || surface.is_disposed() {
            return;
        }
        self.snapshot = Some(surface.camera());
        tracing::trace!("camera snapshot on input focus");
    }

    /// A focus snapshot only survives the blur if a cycle is already using it
    pub fn on_input_blur(&mut self) {
        if !self.transitioning {
            self.snapshot = None;
        }
        tracing::trace!(transitioning = self.transitioning, "input blur");
    }

    fn abandon(&mut self) {
        self.transitioning = false;
        self.settled = false;
        self.snapshot = None;
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::geo::LngLat;
    use crate::map::{CameraCall, HeadlessMap};

    fn camera() -> CameraState {
        CameraState {
            center: LngLat::new(-48.2772, -18.9186),
            zoom: 15.5,
            pitch: 45.0,
            bearing: 12.0,
        }
    }

    fn setup() -> (ViewportStabilizer, HeadlessMap, TimerQueue) {
        let mut stabilizer = ViewportStabilizer::new(ViewportConfig::default());
        stabilizer.observe_viewport(800.0, ViewportCapabilities { visual_viewport: true });
        (stabilizer, HeadlessMap::new(camera(), 400, 800), TimerQueue::new())
    }

    fn run_timers(s: &mut ViewportStabilizer, map: &mut HeadlessMap, timers: &mut TimerQueue, now: u64) {
        while let Some((due, task)) = timers.pop_due(now) {
            match task {
                TimerTask::StabilizerSettle { generation } => s.on_settle_timer(map, timers, due, generation),
                TimerTask::StabilizerReplay { generation } => s.on_replay_timer(map, generation),
                TimerTask::NavigationUnlock { .. } => {}
            }
        }
    }

    #[test]
    fn large_drop_runs_one_snapshot_replay_cycle() {
        let (mut s, mut map, mut timers) = setup();
        let before = map.camera();

        let decision = s.handle_signal(&mut map, &mut timers, 0, ViewportSignal::VisualViewportResize { height: 600.0 });
        assert_eq!(decision, Some(ResizeDecision::Stabilizing));
        assert!(s.is_transitioning());

        // Keyboard pushes the canvas around before the cycle settles
        map.jump_to(CameraOptions::centered(LngLat::new(-48.30, -18.95)).zoom(14.0));

        run_timers(&mut s, &mut map, &mut timers, 149);
        assert_eq!(map.resize_count(), 0);
        run_timers(&mut s, &mut map, &mut timers, 150);
        assert_eq!(map.resize_count(), 1);
        assert!(s.is_transitioning());
        run_timers(&mut s, &mut map, &mut timers, 250);

        assert!(!s.is_transitioning());
        assert_eq!(s.completed_cycles(), 1);
        assert!(map.camera().approx_eq(&before, 1e-9));
        assert!(matches!(
            map.calls().last(),
            Some(CameraCall::EaseTo { duration_ms: 400, .. })
        ));
    }

    #[test]
    fn small_change_does_nothing() {
        let (mut s, mut map, mut timers) = setup();
        let decision = s.handle_signal(&mut map, &mut timers, 0, ViewportSignal::WindowResize { height: 750.0 });
        assert_eq!(decision, Some(ResizeDecision::BelowThreshold));
        assert!(timers.is_empty());
        run_timers(&mut s, &mut map, &mut timers, 1000);
        assert_eq!(s.completed_cycles(), 0);
        assert!(map.calls().is_empty());
    }

    #[test]
    fn second_resize_during_cycle_is_ignored() {
        let (mut s, mut map, mut timers) = setup();
        s.on_resize(&mut map, &mut timers, 0, 600.0);
        let again = s.on_resize(&mut map, &mut timers, 50, 800.0);
        assert_eq!(again, ResizeDecision::AlreadyTransitioning);
        run_timers(&mut s, &mut map, &mut timers, 1000);
        assert_eq!(s.completed_cycles(), 1);
        assert_eq!(map.resize_count(), 1);
    }

    #[test]
    fn focus_snapshot_is_used_for_replay() {
        let (mut s, mut map, mut timers) = setup();
        let focused = map.camera();
        s.handle_signal(&mut map, &mut timers, 0, ViewportSignal::FocusIn(FocusTarget::Input));
        assert_eq!(s.snapshot(), Some(focused));

        // Camera drifts before the resize event reaches us
        map.jump_to(CameraOptions::default().zoom(13.0));
        s.on_resize(&mut map, &mut timers, 10, 500.0);
        run_timers(&mut s, &mut map, &mut timers, 1000);
        assert!(map.camera().approx_eq(&focused, 1e-9));
        assert_eq!(s.snapshot(), None);
    }

    #[test]
    fn blur_without_resize_drops_focus_snapshot() {
        let (mut s, mut map, mut timers) = setup();
        s.handle_signal(&mut map, &mut timers, 0, ViewportSignal::FocusIn(FocusTarget::Input));
        s.handle_signal(&mut map, &mut timers, 10, ViewportSignal::FocusOut(FocusTarget::Input));
        assert_eq!(s.snapshot(), None);

        map.jump_to(CameraOptions::centered(LngLat::new(-48.2350, -18.9090)).zoom(16.0).pitch(50.0));
        let before = map.camera();
        s.on_resize(&mut map, &mut timers, 5000, 600.0);
        run_timers(&mut s, &mut map, &mut timers, 6000);
        assert!(map.camera().approx_eq(&before, 1e-9));
    }

    #[test]
    fn blur_mid_cycle_keeps_snapshot() {
        let (mut s, mut map, mut timers) = setup();
        let focused = map.camera();
        s.handle_signal(&mut map, &mut timers, 0, ViewportSignal::FocusIn(FocusTarget::TextArea));
        s.on_resize(&mut map, &mut timers, 10, 500.0);
        s.handle_signal(&mut map, &mut timers, 20, ViewportSignal::FocusOut(FocusTarget::TextArea));
        assert_eq!(s.snapshot(), Some(focused));
        run_timers(&mut s, &mut map, &mut timers, 1000);
        assert!(map.camera().approx_eq(&focused, 1e-9));
    }

    #[test]
    fn resize_after_settle_remeasures_without_new_cycle() {
        let (mut s, mut map, mut timers) = setup();
        s.on_resize(&mut map, &mut timers, 0, 600.0);
        run_timers(&mut s, &mut map, &mut timers, 150);
        assert_eq!(map.resize_count(), 1);

        let again = s.on_resize(&mut map, &mut timers, 200, 800.0);
        assert_eq!(again, ResizeDecision::AlreadyTransitioning);
        assert_eq!(map.resize_count(), 2);

        run_timers(&mut s, &mut map, &mut timers, 1000);
        assert_eq!(s.completed_cycles(), 1);
        assert_eq!(map.resize_count(), 2);
    }

    #[test]
    fn focus_on_non_text_element_is_ignored() {
        let (mut s, mut map, mut timers) = setup();
        s.handle_signal(&mut map, &mut timers, 0, ViewportSignal::FocusIn(FocusTarget::Other));
        assert_eq!(s.snapshot(), None);
    }

    #[test]
    fn visual_viewport_listener_needs_support() {
        let mut s = ViewportStabilizer::new(ViewportConfig::default());
        let sub = s.observe_viewport(800.0, ViewportCapabilities { visual_viewport: false });
        assert!(!sub.visual_viewport);
        let mut map = HeadlessMap::new(camera(), 400, 800);
        let mut timers = TimerQueue::new();
        let decision = s.handle_signal(&mut map, &mut timers, 0, ViewportSignal::VisualViewportResize { height: 400.0 });
        assert_eq!(decision, None);
    }

    #[test]
    fn disposed_map_silently_ends_cycle() {
        let (mut s, mut map, mut timers) = setup();
        s.on_resize(&mut map, &mut timers, 0, 600.0);
        map.dispose();
        run_timers(&mut s, &mut map, &mut timers, 1000);
        assert!(!s.is_transitioning());
        assert_eq!(s.completed_cycles(), 0);
        assert!(map.calls().is_empty());
    }

    #[test]
    fn unobserve_stops_listening() {
        let (mut s, mut map, mut timers) = setup();
        s.on_resize(&mut map, &mut timers, 0, 600.0);
        s.unobserve();
        run_timers(&mut s, &mut map, &mut timers, 1000);
        assert_eq!(map.resize_count(), 0);
        assert_eq!(s.handle_signal(&mut map, &mut timers, 0, ViewportSignal::WindowResize { height: 100.0 }), None);
    }
}
