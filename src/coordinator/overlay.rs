//! Risk and highlight overlays drawn on top of the basemap.
//!
//! Three families share the map: a single red bounding area, a collection of
//! neighborhood street polygons, and a radial flood alert. Only one family is
//! visible at a time: every `show_*` starts with `hide_all`.

use geojson::{Feature, FeatureCollection, GeoJson, Geometry, JsonObject, Value};
use ratatui::style::Color;
use rayon::prelude::*;
use serde_json::json;

use crate::config::OverlayConfig;
use crate::error::{MapError, Result};
use crate::geo::{circle_ring, BBox, LngLat};
use crate::map::{FitOptions, LayerSpec, MapSurface, Opacity};

pub const RED_AREA_SOURCE: &str = "red-area";
pub const RED_AREA_FILL: &str = "red-area-fill";
pub const RED_AREA_BORDER: &str = "red-area-border";

pub const STREETS_SOURCE: &str = "neighborhood-streets";
pub const STREETS_FILL: &str = "neighborhood-streets-fill";
pub const STREETS_BORDER: &str = "neighborhood-streets-border";

pub const FLOOD_ALERT_SOURCE: &str = "flood-alert";
pub const FLOOD_ALERT_FILL: &str = "flood-alert-fill";
pub const FLOOD_ALERT_BORDER: &str = "flood-alert-border";
pub const FLOOD_ALERT_GRADIENT_SOURCE: &str = "flood-alert-gradient";
pub const FLOOD_ALERT_GRADIENT: &str = "flood-alert-gradient-fill";

const RED: Color = Color::Rgb(220, 38, 38);
const ORANGE: Color = Color::Rgb(249, 115, 22);
const BLUE: Color = Color::Rgb(37, 99, 235);

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum OverlayFamily {
    RedArea,
    NeighborhoodStreets,
    FloodAlert,
}

impl OverlayFamily {
    pub const ALL: [OverlayFamily; 3] = [
        OverlayFamily::FloodAlert,
        OverlayFamily::NeighborhoodStreets,
        OverlayFamily::RedArea,
    ];

    /// Layers in removal order, most specific first
    pub fn layer_ids(self) -> &'static [&'static str] {
        match self {
            OverlayFamily::RedArea => &[RED_AREA_BORDER, RED_AREA_FILL],
            OverlayFamily::NeighborhoodStreets => &[STREETS_BORDER, STREETS_FILL],
            OverlayFamily::FloodAlert => &[FLOOD_ALERT_GRADIENT, FLOOD_ALERT_BORDER, FLOOD_ALERT_FILL],
        }
    }

    /// Sources in removal order
    pub fn source_ids(self) -> &'static [&'static str] {
        match self {
            OverlayFamily::RedArea => &[RED_AREA_SOURCE],
            OverlayFamily::NeighborhoodStreets => &[STREETS_SOURCE],
            OverlayFamily::FloodAlert => &[FLOOD_ALERT_GRADIENT_SOURCE, FLOOD_ALERT_SOURCE],
        }
    }

    pub fn label(self) -> &'static str {
        match self {
            OverlayFamily::RedArea => "red area",
            OverlayFamily::NeighborhoodStreets => "streets",
            OverlayFamily::FloodAlert => "flood alert",
        }
    }
}

/// One street returned by the geocoder
#[derive(Clone, Debug, PartialEq)]
pub struct StreetResult {
    pub name: String,
    pub center: LngLat,
    pub bbox: Option<BBox>,
}

pub struct OverlayLayerManager {
    config: OverlayConfig,
    active: Option<OverlayFamily>,
}

impl OverlayLayerManager {
    pub fn new(config: OverlayConfig) -> Self {
        Self { config, active: None }
    }

    pub fn active(&self) -> Option<OverlayFamily> {
        self.active
    }

    /// Rectangle over `bbox`, camera fitted to it
    pub fn show_bounded_area<S: MapSurface>(&mut self, surface: &mut S, bbox: BBox, center: LngLat) -> Result<OverlayFamily> {
        self.hide_all(surface);

        let props = properties(json!({ "center": [center.lng, center.lat] }));
        let data = collection(vec![polygon_feature(vec![bbox.ring()], props)]);

        upsert_source(surface, RED_AREA_SOURCE, data)?;
        ensure_layer(
            surface,
            LayerSpec::fill(RED_AREA_FILL, RED_AREA_SOURCE, RED, Opacity::Constant(0.35)),
        )?;
        ensure_layer(surface, LayerSpec::line(RED_AREA_BORDER, RED_AREA_SOURCE, RED, 2, 1.0))?;

        surface.fit_bounds(
            bbox,
            FitOptions::new(self.config.area_padding_px, self.config.area_duration_ms),
        );
        tracing::debug!(?bbox, "red area shown");
        Ok(self.activate(OverlayFamily::RedArea))
    }

    /// One polygon per street, camera fitted to their union
    pub fn show_street_collection<S: MapSurface>(
        &mut self,
        surface: &mut S,
        streets: &[StreetResult],
        neighborhood_name: &str,
    ) -> Result<OverlayFamily> {
        let (features, union) = street_features(streets, neighborhood_name, self.config.street_pad_deg)?;

        self.hide_all(surface);
        upsert_source(surface, STREETS_SOURCE, collection(features))?;
        ensure_layer(
            surface,
            LayerSpec::fill(STREETS_FILL, STREETS_SOURCE, ORANGE, Opacity::Constant(0.4)),
        )?;
        ensure_layer(surface, LayerSpec::line(STREETS_BORDER, STREETS_SOURCE, ORANGE, 1, 0.9))?;

        surface.fit_bounds(
            union,
            FitOptions::new(self.config.streets_padding_px, self.config.streets_duration_ms),
        );
        tracing::debug!(streets = streets.len(), neighborhood = neighborhood_name, "street collection shown");
        Ok(self.activate(OverlayFamily::NeighborhoodStreets))
    }

    /// Circle of `radius_m` around `center` with a radial fade
    pub fn show_radial_alert<S: MapSurface>(&mut self, surface: &mut S, center: LngLat, radius_m: f64) -> Result<OverlayFamily> {
        if !(radius_m > 0.0 && radius_m.is_finite()) {
            return Err(MapError::InvalidRadius(radius_m));
        }
        self.hide_all(surface);

        let sides = self.config.circle_sides;
        let props = properties(json!({ "radius_m": radius_m }));
        let circle = collection(vec![polygon_feature(vec![circle_ring(center, radius_m, sides)], props)]);
        let bands = gradient_bands(center, radius_m, sides, self.config.gradient_bands);

        upsert_source(surface, FLOOD_ALERT_SOURCE, circle)?;
        upsert_source(surface, FLOOD_ALERT_GRADIENT_SOURCE, collection(bands))?;

        ensure_layer(
            surface,
            LayerSpec::fill(FLOOD_ALERT_FILL, FLOOD_ALERT_SOURCE, BLUE, Opacity::Constant(0.15)),
        )?;
        ensure_layer(surface, LayerSpec::line(FLOOD_ALERT_BORDER, FLOOD_ALERT_SOURCE, BLUE, 2, 1.0))?;
        ensure_layer(
            surface,
            LayerSpec::fill(
                FLOOD_ALERT_GRADIENT,
                FLOOD_ALERT_GRADIENT_SOURCE,
                BLUE,
                Opacity::Interpolate {
                    property: "distance".to_string(),
                    stops: vec![(0.0, 0.55), (0.7 * radius_m, 0.3), (radius_m, 0.05)],
                },
            ),
        )?;

        tracing::debug!(lng = center.lng, lat = center.lat, radius_m, "flood alert shown");
        Ok(self.activate(OverlayFamily::FloodAlert))
    }

    /// Remove every overlay layer and source this manager can create. Returns the
    /// number of artifacts removed.
    pub fn hide_all<S: MapSurface>(&mut self, surface: &mut S) -> usize {
        let mut removed = 0;
        for family in OverlayFamily::ALL {
            for id in family.layer_ids() {
                if surface.has_layer(id) {
                    match surface.remove_layer(id) {
                        Ok(()) => removed += 1,
                        Err(e) => tracing::warn!(layer = id, error = %e, "failed to remove overlay layer"),
                    }
                }
            }
            for id in family.source_ids() {
                if surface.has_source(id) {
                    match surface.remove_source(id) {
                        Ok(()) => removed += 1,
                        Err(e) => tracing::warn!(source = id, error = %e, "failed to remove overlay source"),
                    }
                }
            }
        }
        if removed > 0 {
            tracing::debug!(removed, "overlays hidden");
        }
        self.active = None;
        removed
    }

    fn activate(&mut self, family: OverlayFamily) -> OverlayFamily {
        self.active = Some(family);
        family
    }
}

/// Street polygons and the bbox covering all of them
pub fn street_features(streets: &[StreetResult], neighborhood: &str, pad_deg: f64) -> Result<(Vec<Feature>, BBox)> {
    if streets.is_empty() {
        return Err(MapError::EmptyStreetCollection);
    }

    let (features, boxes): (Vec<Feature>, Vec<BBox>) = streets
        .par_iter()
        .map(|street| {
            let bbox = street.bbox.unwrap_or_else(|| BBox::around(street.center, pad_deg));
            let props = properties(json!({ "name": street.name, "neighborhood": neighborhood }));
            (polygon_feature(vec![bbox.ring()], props), bbox)
        })
        .unzip();

    let union = boxes
        .into_par_iter()
        .reduce_with(BBox::union)
        .ok_or(MapError::EmptyStreetCollection)?;
    Ok((features, union))
}

/// Concentric annuli, each tagged with its mean distance from the center in metres
fn gradient_bands(center: LngLat, radius_m: f64, sides: usize, bands: usize) -> Vec<Feature> {
    let bands = bands.max(1);
    (0..bands)
        .map(|i| {
            let inner = radius_m * i as f64 / bands as f64;
            let outer = radius_m * (i + 1) as f64 / bands as f64;
            let mut rings = vec![circle_ring(center, outer, sides)];
            if inner > 0.0 {
                let mut hole = circle_ring(center, inner, sides);
                hole.reverse();
                rings.push(hole);
            }
            polygon_feature(rings, properties(json!({ "distance": (inner + outer) / 2.0 })))
        })
        .collect()
}

fn properties(value: serde_json::Value) -> JsonObject {
    match value {
        serde_json::Value::Object(map) => map,
        _ => JsonObject::new(),
    }
}

fn polygon_feature(rings: Vec<Vec<LngLat>>, properties: JsonObject) -> Feature {
    let rings = rings
        .into_iter()
        .map(|ring| ring.into_iter().map(LngLat::position).collect())
        .collect();
    Feature {
        bbox: None,
        geometry: Some(Geometry::new(Value::Polygon(rings))),
        id: None,
        properties: Some(properties),
        foreign_members: None,
    }
}

fn collection(features: Vec<Feature>) -> GeoJson {
    GeoJson::FeatureCollection(FeatureCollection {
        bbox: None,
        features,
        foreign_members: None,
    })
}

fn upsert_source<S: MapSurface>(surface: &mut S, id: &str, data: GeoJson) -> Result<()> {
    if surface.has_source(id) {
        surface.set_source_data(id, data)
    } else {
        surface.add_source(id, data)
    }
}

fn ensure_layer<S: MapSurface>(surface: &mut S, layer: LayerSpec) -> Result<()> {
    if surface.has_layer(&layer.id) {
        return Ok(());
    }
    surface.add_layer(layer)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::geo::haversine_m;
    use crate::map::{CameraCall, CameraState, HeadlessMap};

    const CENTER: LngLat = LngLat::new(-48.2772, -18.9186);

    fn setup() -> (OverlayLayerManager, HeadlessMap) {
        (
            OverlayLayerManager::new(OverlayConfig::default()),
            HeadlessMap::new(CameraState::new(CENTER, 12.0), 400, 300),
        )
    }

    fn ids_with_prefix(map: &HeadlessMap, prefix: &str) -> usize {
        let sources = map.style().source_ids().filter(|id| id.starts_with(prefix)).count();
        let layers = map.style().layers().iter().filter(|l| l.id.starts_with(prefix)).count();
        sources + layers
    }

    fn street(name: &str, lng: f64, lat: f64, bbox: Option<[f64; 4]>) -> StreetResult {
        StreetResult {
            name: name.to_string(),
            center: LngLat::new(lng, lat),
            bbox: bbox.map(|b| BBox::from_array(b).unwrap()),
        }
    }

    #[test]
    fn radial_alert_then_hide_leaves_nothing() {
        let (mut overlays, mut map) = setup();
        overlays.show_radial_alert(&mut map, CENTER, 1000.0).unwrap();
        assert_eq!(ids_with_prefix(&map, "flood-alert"), 5);

        assert_eq!(overlays.hide_all(&mut map), 5);
        assert_eq!(ids_with_prefix(&map, "flood-alert"), 0);
        assert_eq!(overlays.active(), None);
    }

    #[test]
    fn repeated_show_keeps_one_source_per_family() {
        let (mut overlays, mut map) = setup();
        let bbox = BBox::new(-48.30, -18.95, -48.25, -18.90).unwrap();

        overlays.show_bounded_area(&mut map, bbox, CENTER).unwrap();
        overlays.show_bounded_area(&mut map, bbox, CENTER).unwrap();
        assert_eq!(map.style().source_ids().count(), 1);
        assert_eq!(map.style().layers().len(), 2);

        overlays.show_radial_alert(&mut map, CENTER, 500.0).unwrap();
        overlays.show_radial_alert(&mut map, CENTER, 800.0).unwrap();
        assert_eq!(ids_with_prefix(&map, "red-area"), 0);
        assert_eq!(map.style().source_ids().count(), 2);
        assert_eq!(map.style().layers().len(), 3);

        let streets = [street("Rua Goiás", -48.28, -18.92, None)];
        overlays.show_street_collection(&mut map, &streets, "Centro").unwrap();
        overlays.show_street_collection(&mut map, &streets, "Centro").unwrap();
        assert_eq!(ids_with_prefix(&map, "flood-alert"), 0);
        assert_eq!(map.style().source_ids().collect::<Vec<_>>(), vec![STREETS_SOURCE]);
        assert_eq!(overlays.active(), Some(OverlayFamily::NeighborhoodStreets));
    }

    #[test]
    fn alert_circle_matches_radius_at_uberlandia() {
        let (mut overlays, mut map) = setup();
        overlays.show_radial_alert(&mut map, CENTER, 1000.0).unwrap();

        let Some(GeoJson::FeatureCollection(fc)) = map.style().source(FLOOD_ALERT_SOURCE) else {
            panic!("flood alert source missing");
        };
        let Some(Value::Polygon(rings)) = fc.features[0].geometry.as_ref().map(|g| &g.value) else {
            panic!("flood alert is not a polygon");
        };
        assert_eq!(rings[0].len(), 65);
        for p in &rings[0] {
            let d = haversine_m(CENTER, LngLat::new(p[0], p[1]));
            assert!((950.0..=1050.0).contains(&d), "vertex {d} m from center");
        }
    }

    #[test]
    fn bounded_area_fits_camera_with_padding() {
        let (mut overlays, mut map) = setup();
        let bbox = BBox::new(-48.30, -18.95, -48.25, -18.90).unwrap();
        overlays.show_bounded_area(&mut map, bbox, CENTER).unwrap();

        let Some(GeoJson::FeatureCollection(fc)) = map.style().source(RED_AREA_SOURCE) else {
            panic!("red area source missing");
        };
        let Some(Value::Polygon(rings)) = fc.features[0].geometry.as_ref().map(|g| &g.value) else {
            panic!("red area is not a polygon");
        };
        assert_eq!(rings[0].len(), 5);
        assert_eq!(rings[0][0], rings[0][4]);
        assert!(matches!(
            map.calls().last(),
            Some(CameraCall::FitBounds { options, .. }) if options.padding == 50.0 && options.duration_ms == 1000
        ));
    }

    #[test]
    fn streets_without_bbox_get_small_squares() {
        let streets = [
            street("Av. João Naves de Ávila", -48.26, -18.92, Some([-48.27, -18.93, -48.25, -18.91])),
            street("Rua Duque de Caxias", -48.28, -18.915, None),
        ];
        let (features, union) = street_features(&streets, "Centro", 0.0005).unwrap();
        assert_eq!(features.len(), 2);
        assert!((union.min_lng - -48.2805).abs() < 1e-9);
        assert_eq!((union.min_lat, union.max_lng, union.max_lat), (-18.93, -48.25, -18.91));

        let props = features[1].properties.as_ref().unwrap();
        assert_eq!(props.get("neighborhood").and_then(|v| v.as_str()), Some("Centro"));
    }

    #[test]
    fn street_collection_fits_union() {
        let (mut overlays, mut map) = setup();
        let streets = [
            street("A", -48.26, -18.92, None),
            street("B", -48.29, -18.94, None),
        ];
        overlays.show_street_collection(&mut map, &streets, "Fundinho").unwrap();
        let Some(CameraCall::FitBounds { bbox, options }) = map.calls().last() else {
            panic!("camera not fitted");
        };
        assert!(bbox.contains(LngLat::new(-48.2604, -18.9204)));
        assert!(bbox.contains(LngLat::new(-48.2904, -18.9404)));
        assert_eq!(options.padding, 100.0);
        assert_eq!(options.duration_ms, 1500);
    }

    #[test]
    fn empty_street_collection_leaves_map_untouched() {
        let (mut overlays, mut map) = setup();
        overlays.show_radial_alert(&mut map, CENTER, 1000.0).unwrap();
        let err = overlays.show_street_collection(&mut map, &[], "Centro").unwrap_err();
        assert!(matches!(err, MapError::EmptyStreetCollection));
        assert_eq!(overlays.active(), Some(OverlayFamily::FloodAlert));
        assert_eq!(ids_with_prefix(&map, "flood-alert"), 5);
    }

    #[test]
    fn non_positive_radius_is_rejected_before_touching_map() {
        let (mut overlays, mut map) = setup();
        overlays.show_radial_alert(&mut map, CENTER, 1000.0).unwrap();
        for radius in [0.0, -250.0, f64::NAN, f64::INFINITY] {
            let err = overlays.show_radial_alert(&mut map, CENTER, radius).unwrap_err();
            assert!(matches!(err, MapError::InvalidRadius(_)));
        }
        assert_eq!(overlays.active(), Some(OverlayFamily::FloodAlert));
        assert_eq!(ids_with_prefix(&map, "flood-alert"), 5);
    }

    #[test]
    fn hide_all_on_empty_map_is_a_no_op() {
        let (mut overlays, mut map) = setup();
        assert_eq!(overlays.hide_all(&mut map), 0);
    }

    #[test]
    fn gradient_bands_carry_distance() {
        let bands = gradient_bands(CENTER, 1000.0, 32, 4);
        assert_eq!(bands.len(), 4);
        let distances: Vec<f64> = bands
            .iter()
            .filter_map(|f| f.properties.as_ref()?.get("distance")?.as_f64())
            .collect();
        assert_eq!(distances, vec![125.0, 375.0, 625.0, 875.0]);
        let Some(Value::Polygon(first)) = bands[0].geometry.as_ref().map(|g| &g.value) else {
            panic!()
        };
        let Some(Value::Polygon(last)) = bands[3].geometry.as_ref().map(|g| &g.value) else {
            panic!()
        };
        assert_eq!(first.len(), 1);
        assert_eq!(last.len(), 2);
    }
}
