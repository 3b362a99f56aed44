//! Map viewport and overlay coordination for the UrbMind risk map.
//!
//! A [`coordinator::MapSession`] owns one [`map::MapSurface`] and drives three
//! coordinators off a shared millisecond clock:
//!
//! - navigation sequencing: one camera flight at a time, plus the search marker
//! - viewport stabilization: keeps the camera put while the canvas is resized
//! - overlay management: red areas, neighborhood streets and radial flood alerts
//!
//! [`map::TerminalMap`] renders to a terminal with Braille characters;
//! [`map::HeadlessMap`] applies every command instantly and records it.

pub mod braille;
pub mod config;
pub mod coordinator;
pub mod data;
pub mod error;
pub mod geo;
pub mod geolocation;
pub mod map;
pub mod search;
pub mod telemetry;

pub use config::Config;
pub use coordinator::MapSession;
pub use error::{MapError, Result};
pub use geo::{BBox, LngLat};
