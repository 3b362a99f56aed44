//! Coordination between the application and the map surface: navigation
//! sequencing, viewport stabilization and overlay management, driven by one
//! clock through [`MapSession`].

mod keyboard;
mod navigation;
mod overlay;
mod session;
mod stabilizer;
mod timer;

pub use keyboard::{command_for, MapCommand};
pub use navigation::{
    DropReason, NavigationLock, NavigationOutcome, NavigationReport, NavigationRequest, NavigationSequencer,
    SearchMarker,
};
pub use overlay::{
    street_features, OverlayFamily, OverlayLayerManager, StreetResult, FLOOD_ALERT_BORDER, FLOOD_ALERT_FILL,
    FLOOD_ALERT_GRADIENT, FLOOD_ALERT_GRADIENT_SOURCE, FLOOD_ALERT_SOURCE, RED_AREA_BORDER, RED_AREA_FILL,
    RED_AREA_SOURCE, STREETS_BORDER, STREETS_FILL, STREETS_SOURCE,
};
pub use session::MapSession;
pub use stabilizer::{
    FocusTarget, ResizeDecision, Subscription, ViewportCapabilities, ViewportSignal, ViewportStabilizer,
};
pub use timer::{TimerQueue, TimerTask};
