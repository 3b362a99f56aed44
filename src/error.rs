//! Error type shared by the map session, its coordinators and the surface implementations.

use thiserror::Error;

/// Everything that can go wrong while driving a map surface.
///
/// Most variants are recoverable: the coordinators log them and continue with a
/// fallback, but they are still returned so callers (and tests) can observe them.
#[derive(Debug, Error)]
pub enum MapError {
    /// A primitive of the map backend is not loaded yet (marker constructor, style, ...).
    #[error("map backend unavailable: {0}")]
    SdkUnavailable(&'static str),

    /// The surface was disposed; further commands are ignored.
    #[error("map surface has been disposed")]
    Disposed,

    #[error("source `{0}` already exists")]
    DuplicateSource(String),

    #[error("source `{0}` does not exist")]
    UnknownSource(String),

    #[error("layer `{0}` already exists")]
    DuplicateLayer(String),

    #[error("layer `{0}` does not exist")]
    UnknownLayer(String),

    /// A source cannot be removed while a layer still draws from it.
    #[error("source `{source_id}` is still used by layer `{layer_id}`")]
    SourceInUse { source_id: String, layer_id: String },

    #[error("marker {0} does not exist")]
    UnknownMarker(u64),

    #[error("street collection is empty")]
    EmptyStreetCollection,

    #[error("alert radius must be a positive number of metres, got {0}")]
    InvalidRadius(f64),

    #[error("invalid bounding box [{0}, {1}, {2}, {3}]")]
    InvalidBounds(f64, f64, f64, f64),

    #[error("configuration error: {0}")]
    Config(String),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("TOML error: {0}")]
    Toml(#[from] toml::de::Error),

    #[error("JSON error: {0}")]
    Json(#[from] simd_json::Error),
}

pub type Result<T> = std::result::Result<T, MapError>;
