use geojson::GeoJson;
use ratatui::style::Color;
use std::collections::HashMap;

use crate::error::{MapError, Result};
use crate::geo::LngLat;

/// Opacity of a layer, either fixed or interpolated from a numeric feature property
#[derive(Clone, Debug, PartialEq)]
pub enum Opacity {
    Constant(f64),
    /// Linear interpolation between `(input, opacity)` stops, sorted by input
    Interpolate { property: String, stops: Vec<(f64, f64)> },
}

impl Opacity {
    /// Opacity for a feature with the given property lookup
    pub fn evaluate(&self, lookup: impl Fn(&str) -> Option<f64>) -> f64 {
        match self {
            Opacity::Constant(v) => *v,
            Opacity::Interpolate { property, stops } => match lookup(property) {
                Some(x) => interpolate(stops, x),
                None => stops.first().map(|s| s.1).unwrap_or(1.0),
            },
        }
    }
}

fn interpolate(stops: &[(f64, f64)], x: f64) -> f64 {
    let Some(&(first_x, first_y)) = stops.first() else {
        return 1.0;
    };
    if x <= first_x {
        return first_y;
    }
    for pair in stops.windows(2) {
        let (x0, y0) = pair[0];
        let (x1, y1) = pair[1];
        if x <= x1 {
            let t = if x1 > x0 { (x - x0) / (x1 - x0) } else { 1.0 };
            return y0 + (y1 - y0) * t;
        }
    }
    stops.last().map(|s| s.1).unwrap_or(first_y)
}

#[derive(Clone, Debug, PartialEq)]
pub enum LayerKind {
    Fill { color: Color, opacity: Opacity },
    Line { color: Color, width: u8, opacity: f64 },
}

/// A drawable layer bound to a source
#[derive(Clone, Debug, PartialEq)]
pub struct LayerSpec {
    pub id: String,
    pub source: String,
    pub kind: LayerKind,
}

impl LayerSpec {
    pub fn fill(id: &str, source: &str, color: Color, opacity: Opacity) -> Self {
        Self {
            id: id.to_string(),
            source: source.to_string(),
            kind: LayerKind::Fill { color, opacity },
        }
    }

    pub fn line(id: &str, source: &str, color: Color, width: u8, opacity: f64) -> Self {
        Self {
            id: id.to_string(),
            source: source.to_string(),
            kind: LayerKind::Line { color, width, opacity },
        }
    }
}

pub type MarkerId = u64;

#[derive(Clone, Debug, PartialEq)]
pub struct Marker {
    pub id: MarkerId,
    pub at: LngLat,
    pub label: Option<String>,
}

/// Sources, layers and markers of one map, with the backend's consistency rules:
/// ids are unique, layers need their source, and sources in use cannot be removed.
#[derive(Default, Debug)]
pub struct StyleStore {
    sources: HashMap<String, GeoJson>,
    /// Draw order, bottom first
    layers: Vec<LayerSpec>,
    markers: Vec<Marker>,
    next_marker: MarkerId,
}

impl StyleStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn add_source(&mut self, id: &str, data: GeoJson) -> Result<()> {
        if self.sources.contains_key(id) {
            return Err(MapError::DuplicateSource(id.to_string()));
        }
        self.sources.insert(id.to_string(), data);
        Ok(())
    }

    pub fn has_source(&self, id: &str) -> bool {
        self.sources.contains_key(id)
    }

    pub fn source(&self, id: &str) -> Option<&GeoJson> {
        self.sources.get(id)
    }

    pub fn set_source_data(&mut self, id: &str, data: GeoJson) -> Result<()> {
        match self.sources.get_mut(id) {
            Some(slot) => {
                *slot = data;
                Ok(())
            }
            None => Err(MapError::UnknownSource(id.to_string())),
        }
    }

    pub fn remove_source(&mut self, id: &str) -> Result<()> {
        if let Some(layer) = self.layers.iter().find(|l| l.source == id) {
            return Err(MapError::SourceInUse {
                source_id: id.to_string(),
                layer_id: layer.id.clone(),
            });
        }
        self.sources
            .remove(id)
            .map(|_| ())
            .ok_or_else(|| MapError::UnknownSource(id.to_string()))
    }

    pub fn source_ids(&self) -> impl Iterator<Item = &str> {
        self.sources.keys().map(String::as_str)
    }

    pub fn add_layer(&mut self, layer: LayerSpec) -> Result<()> {
        if self.has_layer(&layer.id) {
            return Err(MapError::DuplicateLayer(layer.id));
        }
        if !self.sources.contains_key(&layer.source) {
            return Err(MapError::UnknownSource(layer.source));
        }
        self.layers.push(layer);
        Ok(())
    }

    pub fn has_layer(&self, id: &str) -> bool {
        self.layers.iter().any(|l| l.id == id)
    }

    pub fn remove_layer(&mut self, id: &str) -> Result<()> {
        let idx = self
            .layers
            .iter()
            .position(|l| l.id == id)
            .ok_or_else(|| MapError::UnknownLayer(id.to_string()))?;
        self.layers.remove(idx);
        Ok(())
    }

    pub fn layers(&self) -> &[LayerSpec] {
        &self.layers
    }

    pub fn add_marker(&mut self, at: LngLat, label: Option<String>) -> MarkerId {
        self.next_marker += 1;
        let id = self.next_marker;
        self.markers.push(Marker { id, at, label });
        id
    }

    pub fn remove_marker(&mut self, id: MarkerId) -> Result<()> {
        let idx = self
            .markers
            .iter()
            .position(|m| m.id == id)
            .ok_or(MapError::UnknownMarker(id))?;
        self.markers.remove(idx);
        Ok(())
    }

    pub fn markers(&self) -> &[Marker] {
        &self.markers
    }
}
