//! Geocoding results as returned by a Mapbox-style places endpoint.
//!
//! Only decoding and classification live here; fetching is up to the caller.

use serde::Deserialize;
use std::path::Path;

use crate::coordinator::StreetResult;
use crate::error::Result;
use crate::geo::{BBox, LngLat};

#[derive(Clone, Debug, Default, Deserialize)]
pub struct GeocodeResponse {
    #[serde(default)]
    pub features: Vec<GeocodeFeature>,
}

#[derive(Clone, Debug, Deserialize)]
pub struct GeocodeFeature {
    pub id: String,
    pub place_name: String,
    pub text: String,
    pub center: [f64; 2],
    #[serde(default)]
    pub bbox: Option<[f64; 4]>,
    #[serde(default)]
    pub place_type: Vec<String>,
    /// House number, present on address hits only
    #[serde(default)]
    pub address: Option<String>,
    #[serde(default)]
    pub context: Vec<ContextEntry>,
}

/// Parent region of a feature (`neighborhood.123`, `place.456`, ...)
#[derive(Clone, Debug, Deserialize)]
pub struct ContextEntry {
    pub id: String,
    pub text: String,
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum PlaceKind {
    Address,
    Street,
    Poi,
    Neighborhood,
    City,
    Other,
}

impl PlaceKind {
    pub fn label(self) -> &'static str {
        match self {
            PlaceKind::Address => "address",
            PlaceKind::Street => "street",
            PlaceKind::Poi => "poi",
            PlaceKind::Neighborhood => "neighborhood",
            PlaceKind::City => "city",
            PlaceKind::Other => "place",
        }
    }
}

/// Decode a response body in place
pub fn parse_response(body: &mut [u8]) -> Result<GeocodeResponse> {
    Ok(simd_json::serde::from_slice(body)?)
}

pub fn load_response(path: &Path) -> Result<GeocodeResponse> {
    let mut body = std::fs::read(path)?;
    parse_response(&mut body)
}

impl GeocodeFeature {
    pub fn center(&self) -> LngLat {
        LngLat::from(self.center)
    }

    /// Invalid bboxes are dropped rather than failing the whole result
    pub fn bbox(&self) -> Option<BBox> {
        self.bbox.and_then(|b| BBox::from_array(b).ok())
    }

    pub fn kind(&self) -> PlaceKind {
        let has = |tag: &str| self.place_type.iter().any(|t| t == tag);
        if has("address") {
            if self.address.is_some() {
                PlaceKind::Address
            } else {
                PlaceKind::Street
            }
        } else if has("street") {
            PlaceKind::Street
        } else if has("poi") {
            PlaceKind::Poi
        } else if has("neighborhood") {
            PlaceKind::Neighborhood
        } else if has("place") || has("locality") || has("district") {
            PlaceKind::City
        } else {
            PlaceKind::Other
        }
    }

    /// Neighborhood this feature belongs to, or its own name if it is one
    pub fn neighborhood(&self) -> Option<&str> {
        if self.kind() == PlaceKind::Neighborhood {
            return Some(&self.text);
        }
        self.context
            .iter()
            .find(|c| c.id.starts_with("neighborhood."))
            .map(|c| c.text.as_str())
    }

    pub fn to_street(&self) -> StreetResult {
        StreetResult {
            name: self.text.clone(),
            center: self.center(),
            bbox: self.bbox(),
        }
    }
}

impl GeocodeResponse {
    /// Street-like hits inside `neighborhood`
    pub fn streets_in(&self, neighborhood: &str) -> Vec<StreetResult> {
        self.features
            .iter()
            .filter(|f| matches!(f.kind(), PlaceKind::Street | PlaceKind::Address))
            .filter(|f| f.neighborhood().is_some_and(|n| n.eq_ignore_ascii_case(neighborhood)))
            .map(GeocodeFeature::to_street)
            .collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const BODY: &str = r#"{
        "type": "FeatureCollection",
        "features": [
            {
                "id": "address.1",
                "place_name": "Rua Goiás 120, Centro, Uberlândia",
                "text": "Rua Goiás",
                "address": "120",
                "center": [-48.2779, -18.9141],
                "place_type": ["address"],
                "context": [
                    {"id": "neighborhood.77", "text": "Centro"},
                    {"id": "place.9", "text": "Uberlândia"}
                ]
            },
            {
                "id": "address.2",
                "place_name": "Avenida Afonso Pena, Centro, Uberlândia",
                "text": "Avenida Afonso Pena",
                "center": [-48.2768, -18.9160],
                "bbox": [-48.2801, -18.9230, -48.2740, -18.9090],
                "place_type": ["address"],
                "context": [{"id": "neighborhood.77", "text": "Centro"}]
            },
            {
                "id": "poi.5",
                "place_name": "Parque do Sabiá, Uberlândia",
                "text": "Parque do Sabiá",
                "center": [-48.2350, -18.9090],
                "place_type": ["poi"]
            },
            {
                "id": "place.9",
                "place_name": "Uberlândia, Minas Gerais, Brasil",
                "text": "Uberlândia",
                "center": [-48.2772, -18.9186],
                "bbox": [-48.45, -19.10, -48.10, -18.75],
                "place_type": ["place"]
            }
        ]
    }"#;

    fn response() -> GeocodeResponse {
        let mut body = BODY.as_bytes().to_vec();
        parse_response(&mut body).unwrap()
    }

    #[test]
    fn classifies_features() {
        let kinds: Vec<PlaceKind> = response().features.iter().map(GeocodeFeature::kind).collect();
        assert_eq!(
            kinds,
            vec![PlaceKind::Address, PlaceKind::Street, PlaceKind::Poi, PlaceKind::City]
        );
    }

    #[test]
    fn neighborhood_comes_from_context() {
        let r = response();
        assert_eq!(r.features[0].neighborhood(), Some("Centro"));
        assert_eq!(r.features[2].neighborhood(), None);
    }

    #[test]
    fn streets_in_neighborhood_keep_bbox_when_present() {
        let streets = response().streets_in("centro");
        assert_eq!(streets.len(), 2);
        assert!(streets[0].bbox.is_none());
        assert_eq!(streets[1].bbox.map(|b| b.min_lng), Some(-48.2801));
    }

    #[test]
    fn sample_results_load_from_disk() {
        let path = Path::new(env!("CARGO_MANIFEST_DIR")).join("samples/search.json");
        let r = load_response(&path).unwrap();
        assert_eq!(r.features.len(), 6);
        assert_eq!(r.features[4].kind(), PlaceKind::Neighborhood);
        assert_eq!(r.features[4].neighborhood(), Some("Fundinho"));
        assert_eq!(r.streets_in("Centro").len(), 3);
    }

    #[test]
    fn rejects_malformed_body() {
        let mut body = b"{\"features\": 3}".to_vec();
        assert!(parse_response(&mut body).is_err());
    }

    #[test]
    fn missing_features_is_empty() {
        let mut body = b"{\"type\": \"FeatureCollection\"}".to_vec();
        assert!(parse_response(&mut body).unwrap().features.is_empty());
    }
}
