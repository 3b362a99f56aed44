use glam::DVec2;
use serde::{Deserialize, Serialize};
use std::f64::consts::TAU;

use crate::error::{MapError, Result};

/// Metres spanned by one degree of latitude (and of longitude at the equator)
pub const METERS_PER_DEGREE: f64 = 111_320.0;

/// Mean Earth radius in metres
pub const EARTH_RADIUS_M: f64 = 6_371_008.8;

/// A geographic coordinate, longitude first like GeoJSON
#[derive(Clone, Copy, Debug, PartialEq, Serialize, Deserialize)]
pub struct LngLat {
    pub lng: f64,
    pub lat: f64,
}

impl LngLat {
    pub const fn new(lng: f64, lat: f64) -> Self {
        Self { lng, lat }
    }

    /// GeoJSON position (`[lng, lat]`)
    pub fn position(self) -> Vec<f64> {
        vec![self.lng, self.lat]
    }

    #[inline(always)]
    pub fn as_dvec2(self) -> DVec2 {
        DVec2::new(self.lng, self.lat)
    }

    #[inline(always)]
    pub fn from_dvec2(v: DVec2) -> Self {
        Self::new(v.x, v.y)
    }
}

impl From<[f64; 2]> for LngLat {
    fn from([lng, lat]: [f64; 2]) -> Self {
        Self::new(lng, lat)
    }
}

/// Axis-aligned rectangle `[min_lng, min_lat, max_lng, max_lat]`
#[derive(Clone, Copy, Debug, PartialEq, Serialize, Deserialize)]
pub struct BBox {
    pub min_lng: f64,
    pub min_lat: f64,
    pub max_lng: f64,
    pub max_lat: f64,
}

impl BBox {
    /// Build a bbox, rejecting inverted or non-finite corners
    pub fn new(min_lng: f64, min_lat: f64, max_lng: f64, max_lat: f64) -> Result<Self> {
        let finite = [min_lng, min_lat, max_lng, max_lat].iter().all(|v| v.is_finite());
        if !finite || min_lng > max_lng || min_lat > max_lat {
            return Err(MapError::InvalidBounds(min_lng, min_lat, max_lng, max_lat));
        }
        Ok(Self {
            min_lng,
            min_lat,
            max_lng,
            max_lat,
        })
    }

    pub fn from_array(bbox: [f64; 4]) -> Result<Self> {
        Self::new(bbox[0], bbox[1], bbox[2], bbox[3])
    }

    /// Square of half-size `pad` degrees centred on `point`
    pub fn around(point: LngLat, pad: f64) -> Self {
        Self {
            min_lng: point.lng - pad,
            min_lat: point.lat - pad,
            max_lng: point.lng + pad,
            max_lat: point.lat + pad,
        }
    }

    pub fn union(self, other: BBox) -> BBox {
        BBox {
            min_lng: self.min_lng.min(other.min_lng),
            min_lat: self.min_lat.min(other.min_lat),
            max_lng: self.max_lng.max(other.max_lng),
            max_lat: self.max_lat.max(other.max_lat),
        }
    }

    pub fn center(&self) -> LngLat {
        LngLat::new(
            (self.min_lng + self.max_lng) * 0.5,
            (self.min_lat + self.max_lat) * 0.5,
        )
    }

    pub fn contains(&self, p: LngLat) -> bool {
        p.lng >= self.min_lng && p.lng <= self.max_lng && p.lat >= self.min_lat && p.lat <= self.max_lat
    }

    /// Closed five-point ring: SW, SE, NE, NW, SW
    pub fn ring(&self) -> Vec<LngLat> {
        vec![
            LngLat::new(self.min_lng, self.min_lat),
            LngLat::new(self.max_lng, self.min_lat),
            LngLat::new(self.max_lng, self.max_lat),
            LngLat::new(self.min_lng, self.max_lat),
            LngLat::new(self.min_lng, self.min_lat),
        ]
    }

    /// Bounding box of a set of points, `None` when empty
    pub fn of_points<'a>(points: impl IntoIterator<Item = &'a LngLat>) -> Option<BBox> {
        points.into_iter().fold(None, |acc: Option<BBox>, p| {
            let b = BBox::around(*p, 0.0);
            Some(match acc {
                Some(a) => a.union(b),
                None => b,
            })
        })
    }
}

/// Convert a metric radius into (longitude, latitude) degree radii at `lat`.
///
/// Longitude degrees shrink with `cos(lat)`; latitude degrees stay ~constant.
#[inline]
pub fn meters_to_degrees(radius_m: f64, lat: f64) -> (f64, f64) {
    let cos_lat = lat.to_radians().cos().abs().max(0.01);
    (radius_m / (METERS_PER_DEGREE * cos_lat), radius_m / METERS_PER_DEGREE)
}

/// Closed ring approximating a circle of `radius_m` metres with `sides` vertices
pub fn circle_ring(center: LngLat, radius_m: f64, sides: usize) -> Vec<LngLat> {
    let sides = sides.max(3);
    let (rx, ry) = meters_to_degrees(radius_m, center.lat);
    let radii = DVec2::new(rx, ry);
    let c = center.as_dvec2();

    let mut ring: Vec<LngLat> = (0..sides)
        .map(|i| {
            let angle = i as f64 / sides as f64 * TAU;
            LngLat::from_dvec2(c + DVec2::new(angle.cos(), angle.sin()) * radii)
        })
        .collect();
    ring.push(ring[0]);
    ring
}

/// Great-circle distance in metres
pub fn haversine_m(a: LngLat, b: LngLat) -> f64 {
    let dlat = (b.lat - a.lat).to_radians();
    let dlng = (b.lng - a.lng).to_radians();
    let lat1 = a.lat.to_radians();
    let lat2 = b.lat.to_radians();

    let h = (dlat / 2.0).sin().powi(2) + lat1.cos() * lat2.cos() * (dlng / 2.0).sin().powi(2);
    2.0 * EARTH_RADIUS_M * h.sqrt().asin()
}

/// Equirectangular distance in metres, good enough below a few hundred km
#[inline(always)]
pub fn fast_distance_m(a: LngLat, b: LngLat) -> f64 {
    let lat_avg = ((a.lat + b.lat) * 0.5).to_radians();
    let dx = (b.lng - a.lng).to_radians() * lat_avg.cos();
    let dy = (b.lat - a.lat).to_radians();
    EARTH_RADIUS_M * (dx * dx + dy * dy).sqrt()
}

/// Normalize longitude into [-180, 180)
#[inline(always)]
pub fn wrap_lng(lng: f64) -> f64 {
    if (-180.0..180.0).contains(&lng) {
        return lng;
    }
    (lng + 180.0).rem_euclid(360.0) - 180.0
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn circle_vertices_stay_near_radius() {
        let center = LngLat::new(-48.2772, -18.9186);
        let ring = circle_ring(center, 1000.0, 64);
        assert_eq!(ring.len(), 65);
        assert_eq!(ring.first(), ring.last());
        for p in &ring {
            let d = haversine_m(center, *p);
            assert!((d - 1000.0).abs() < 50.0, "vertex at {d} m");
        }
    }

    #[test]
    fn longitude_radius_grows_away_from_equator() {
        let (eq, _) = meters_to_degrees(1000.0, 0.0);
        let (north, lat_deg) = meters_to_degrees(1000.0, 60.0);
        assert!((north / eq - 2.0).abs() < 1e-9);
        assert!((lat_deg - 1000.0 / METERS_PER_DEGREE).abs() < 1e-12);
    }

    #[test]
    fn bbox_rejects_inverted_corners() {
        assert!(BBox::new(1.0, 0.0, 0.0, 1.0).is_err());
        assert!(BBox::new(0.0, 0.0, f64::NAN, 1.0).is_err());
        assert!(BBox::new(0.0, 0.0, 1.0, 1.0).is_ok());
    }

    #[test]
    fn rectangle_ring_is_closed() {
        let bbox = BBox::new(-48.3, -18.95, -48.25, -18.9).unwrap();
        let ring = bbox.ring();
        assert_eq!(ring.len(), 5);
        assert_eq!(ring[0], ring[4]);
        assert_eq!(ring[2], LngLat::new(-48.25, -18.9));
    }

    #[test]
    fn union_covers_both() {
        let a = BBox::around(LngLat::new(0.0, 0.0), 1.0);
        let b = BBox::around(LngLat::new(5.0, 5.0), 1.0);
        let u = a.union(b);
        assert_eq!(u, BBox::new(-1.0, -1.0, 6.0, 6.0).unwrap());
        assert!(u.contains(LngLat::new(3.0, 3.0)));
    }

    #[test]
    fn fast_distance_tracks_haversine_for_short_hops() {
        let a = LngLat::new(-48.2772, -18.9186);
        let b = LngLat::new(-48.2600, -18.9000);
        let h = haversine_m(a, b);
        assert!((fast_distance_m(a, b) - h).abs() / h < 0.01);
    }

    #[test]
    fn wraps_longitude() {
        assert!((wrap_lng(190.0) + 170.0).abs() < 1e-9);
        assert!((wrap_lng(-190.0) - 170.0).abs() < 1e-9);
    }
}
