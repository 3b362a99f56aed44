use geojson::{Feature, GeoJson, Geometry, Value};
use glam::DVec2;
use ratatui::style::Color;
use rayon::prelude::*;

use crate::braille::BrailleCanvas;
use crate::map::geometry::{draw_line, draw_marker, draw_thick_line, fill_polygon};
use crate::map::projection::Viewport;
use crate::map::style::{LayerKind, LayerSpec, StyleStore};

/// A geographic line (sequence of lon/lat coordinates)
pub type LineString = Vec<(f64, f64)>;

/// Level of detail for basemap data
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Lod {
    Low,    // 110m - world view
    Medium, // 50m - continental
    High,   // 10m - regional and street level
}

impl Lod {
    /// Select LOD based on zoom level
    pub fn from_zoom(zoom: f64) -> Self {
        if zoom < 3.0 {
            Lod::Low
        } else if zoom < 6.0 {
            Lod::Medium
        } else {
            Lod::High
        }
    }
}

/// A city marker with position, name, and population
#[derive(Clone)]
pub struct City {
    pub lon: f64,
    pub lat: f64,
    pub name: String,
    pub population: u64,
}

/// Display settings for basemap layers
#[derive(Clone)]
pub struct DisplaySettings {
    pub show_coastlines: bool,
    pub show_borders: bool,
    pub show_cities: bool,
    pub show_labels: bool,
}

impl Default for DisplaySettings {
    fn default() -> Self {
        Self {
            show_coastlines: true,
            show_borders: true,
            show_cities: true,
            show_labels: true,
        }
    }
}

/// One rasterized overlay layer
pub struct OverlayRaster {
    pub id: String,
    pub color: Color,
    pub canvas: BrailleCanvas,
}

/// Everything the UI needs to paint one frame
pub struct MapLayers {
    pub coastlines: BrailleCanvas,
    pub borders: BrailleCanvas,
    /// Bottom first, in style order
    pub overlays: Vec<OverlayRaster>,
    pub markers: BrailleCanvas,
    /// (column, row, text) in character cells
    pub labels: Vec<(u16, u16, String)>,
}

/// Basemap data plus rasterization of style layers and markers
pub struct MapRenderer {
    pub coastlines_low: Vec<LineString>,
    pub coastlines_medium: Vec<LineString>,
    pub coastlines_high: Vec<LineString>,
    pub borders: Vec<LineString>,
    pub cities: Vec<City>,
    pub settings: DisplaySettings,
}

impl MapRenderer {
    pub fn new() -> Self {
        Self {
            coastlines_low: Vec::new(),
            coastlines_medium: Vec::new(),
            coastlines_high: Vec::new(),
            borders: Vec::new(),
            cities: Vec::new(),
            settings: DisplaySettings::default(),
        }
    }

    /// Coastlines for the given LOD, falling back to coarser data
    fn get_coastlines(&self, lod: Lod) -> &[LineString] {
        let candidates: &[&Vec<LineString>] = match lod {
            Lod::High => &[&self.coastlines_high, &self.coastlines_medium, &self.coastlines_low],
            Lod::Medium => &[&self.coastlines_medium, &self.coastlines_low],
            Lod::Low => &[&self.coastlines_low],
        };
        candidates
            .iter()
            .find(|c| !c.is_empty())
            .map(|c| c.as_slice())
            .unwrap_or(&[])
    }

    /// Cities worth a label at this zoom
    fn get_visible_cities(&self, zoom: f64) -> impl Iterator<Item = &City> {
        let min_pop = if zoom > 11.0 {
            0
        } else if zoom > 8.0 {
            100_000
        } else if zoom > 5.0 {
            1_000_000
        } else {
            5_000_000
        };
        self.cities.iter().filter(move |c| c.population >= min_pop)
    }

    /// Render basemap, style layers and markers for `viewport`
    pub fn render(&self, width: usize, height: usize, viewport: &Viewport, style: &StyleStore) -> MapLayers {
        let lod = Lod::from_zoom(viewport.zoom);
        let mut coastlines = BrailleCanvas::new(width, height);
        let mut borders = BrailleCanvas::new(width, height);
        let mut markers = BrailleCanvas::new(width, height);
        let mut labels = Vec::new();

        if self.settings.show_coastlines {
            for line in self.get_coastlines(lod) {
                draw_linestring(&mut coastlines, line, viewport);
            }
        }

        if self.settings.show_borders && lod != Lod::Low {
            for line in &self.borders {
                draw_linestring(&mut borders, line, viewport);
            }
        }

        if self.settings.show_cities {
            for city in self.get_visible_cities(viewport.zoom) {
                let (px, py) = viewport.project(city.lon, city.lat);
                if viewport.is_visible(px, py) && px >= 0 && py >= 0 {
                    draw_marker(&mut coastlines, px, py, 1);
                    if self.settings.show_labels {
                        labels.push(((px / 2) as u16 + 1, (py / 4) as u16, city.name.clone()));
                    }
                }
            }
        }

        let overlays = style
            .layers()
            .par_iter()
            .filter_map(|layer| {
                let data = style.source(&layer.source)?;
                Some(rasterize_layer(layer, data, width, height, viewport))
            })
            .collect();

        for marker in style.markers() {
            let (px, py) = viewport.project(marker.at.lng, marker.at.lat);
            if !viewport.is_visible(px, py) {
                continue;
            }
            draw_marker(&mut markers, px, py, 3);
            if let (Some(label), true) = (&marker.label, px >= 0 && py >= 0) {
                labels.push(((px / 2) as u16 + 2, (py / 4) as u16, label.clone()));
            }
        }

        MapLayers {
            coastlines,
            borders,
            overlays,
            markers,
            labels,
        }
    }

    /// Add coastline data at a specific LOD
    pub fn add_coastline(&mut self, line: LineString, lod: Lod) {
        match lod {
            Lod::Low => self.coastlines_low.push(line),
            Lod::Medium => self.coastlines_medium.push(line),
            Lod::High => self.coastlines_high.push(line),
        }
    }

    pub fn add_border(&mut self, line: LineString) {
        self.borders.push(line);
    }

    pub fn add_city(&mut self, lon: f64, lat: f64, name: &str, population: u64) {
        self.cities.push(City {
            lon,
            lat,
            name: name.to_string(),
            population,
        });
    }

    /// Check if any data is loaded
    pub fn has_data(&self) -> bool {
        !self.coastlines_low.is_empty() || !self.coastlines_medium.is_empty() || !self.coastlines_high.is_empty()
    }

    pub fn toggle_labels(&mut self) {
        self.settings.show_labels = !self.settings.show_labels;
    }

    pub fn toggle_borders(&mut self) {
        self.settings.show_borders = !self.settings.show_borders;
    }

    pub fn toggle_cities(&mut self) {
        self.settings.show_cities = !self.settings.show_cities;
    }
}

impl Default for MapRenderer {
    fn default() -> Self {
        Self::new()
    }
}

/// Draw a linestring with viewport culling
fn draw_linestring(canvas: &mut BrailleCanvas, line: &LineString, viewport: &Viewport) {
    if line.len() < 2 {
        return;
    }

    let mut prev: Option<(i32, i32)> = None;
    for &(lon, lat) in line {
        let (px, py) = viewport.project(lon, lat);
        if let Some((prev_x, prev_y)) = prev {
            // Skip segments that wrap around the antimeridian
            let dist = ((px - prev_x).abs() + (py - prev_y).abs()) as usize;
            if dist < viewport.width * 4 && viewport.line_might_be_visible((prev_x, prev_y), (px, py)) {
                draw_line(canvas, prev_x, prev_y, px, py);
            }
        }
        prev = Some((px, py));
    }
}

/// Rasterize one style layer into its own canvas
pub fn rasterize_layer(
    layer: &LayerSpec,
    data: &GeoJson,
    width: usize,
    height: usize,
    viewport: &Viewport,
) -> OverlayRaster {
    let mut canvas = BrailleCanvas::new(width, height);

    let color = match &layer.kind {
        LayerKind::Fill { color, .. } | LayerKind::Line { color, .. } => *color,
    };

    for_each_feature(data, &mut |feature, geometry| {
        for polygon in polygons(geometry) {
            let rings: Vec<Vec<DVec2>> = polygon
                .iter()
                .map(|ring| ring.iter().map(|p| viewport.project_f(p[0], p[1])).collect())
                .collect();

            match &layer.kind {
                LayerKind::Fill { opacity, .. } => {
                    let alpha = opacity.evaluate(|key| {
                        feature
                            .and_then(|f| f.properties.as_ref())
                            .and_then(|props| props.get(key))
                            .and_then(|v| v.as_f64())
                    });
                    fill_polygon(&mut canvas, &rings, alpha);
                }
                LayerKind::Line { width, opacity, .. } => {
                    if *opacity <= 0.0 {
                        continue;
                    }
                    for ring in &rings {
                        for seg in ring.windows(2) {
                            let (a, b) = (seg[0], seg[1]);
                            let (x0, y0, x1, y1) = (a.x as i32, a.y as i32, b.x as i32, b.y as i32);
                            if !viewport.line_might_be_visible((x0, y0), (x1, y1)) {
                                continue;
                            }
                            if *width > 1 {
                                draw_thick_line(&mut canvas, x0, y0, x1, y1);
                            } else {
                                draw_line(&mut canvas, x0, y0, x1, y1);
                            }
                        }
                    }
                }
            }
        }
    });

    OverlayRaster {
        id: layer.id.clone(),
        color,
        canvas,
    }
}

fn for_each_feature<F>(data: &GeoJson, f: &mut F)
where
    F: FnMut(Option<&Feature>, &Geometry),
{
    match data {
        GeoJson::FeatureCollection(fc) => {
            for feature in &fc.features {
                if let Some(geometry) = &feature.geometry {
                    f(Some(feature), geometry);
                }
            }
        }
        GeoJson::Feature(feature) => {
            if let Some(geometry) = &feature.geometry {
                f(Some(feature), geometry);
            }
        }
        GeoJson::Geometry(geometry) => f(None, geometry),
    }
}

/// Polygon rings of a geometry (Polygon and MultiPolygon only)
fn polygons(geometry: &Geometry) -> Vec<&Vec<Vec<Vec<f64>>>> {
    match &geometry.value {
        Value::Polygon(rings) => vec![rings],
        Value::MultiPolygon(polys) => polys.iter().collect(),
        Value::GeometryCollection(children) => children.iter().flat_map(polygons).collect(),
        _ => Vec::new(),
    }
}
