pub mod camera;
mod engine;
mod geometry;
mod headless;
mod projection;
mod renderer;
pub mod style;
mod surface;

pub use camera::{CameraOptions, CameraState, FitOptions};
pub use engine::TerminalMap;
pub use headless::{CameraCall, HeadlessMap};
pub use projection::Viewport;
pub use renderer::{Lod, MapLayers, MapRenderer, OverlayRaster};
pub use style::{LayerKind, LayerSpec, MarkerId, Opacity};
pub use surface::MapSurface;
