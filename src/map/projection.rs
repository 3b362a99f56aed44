use glam::DVec2;
use std::f64::consts::PI;

use crate::geo::{BBox, LngLat};
use crate::map::camera::{CameraState, MAX_ZOOM, MIN_ZOOM};

/// World size in canvas pixels at zoom 0
pub const TILE_SIZE: f64 = 256.0;

/// Viewport representing the visible map area for one camera state
#[derive(Clone, Debug)]
pub struct Viewport {
    /// Center longitude (-180 to 180)
    pub center_lon: f64,
    /// Center latitude (-85 to 85)
    pub center_lat: f64,
    /// Web-map zoom level (world is `TILE_SIZE * 2^zoom` pixels wide)
    pub zoom: f64,
    /// Clockwise rotation in degrees
    pub bearing: f64,
    /// Canvas pixel width
    pub width: usize,
    /// Canvas pixel height
    pub height: usize,
}

impl Viewport {
    pub fn new(center_lon: f64, center_lat: f64, zoom: f64, width: usize, height: usize) -> Self {
        Self {
            center_lon,
            center_lat,
            zoom,
            bearing: 0.0,
            width,
            height,
        }
    }

    pub fn from_camera(camera: &CameraState, width: usize, height: usize) -> Self {
        Self {
            center_lon: camera.center.lng,
            center_lat: camera.center.lat,
            zoom: camera.zoom,
            bearing: camera.bearing,
            width,
            height,
        }
    }

    #[inline(always)]
    fn world_size(&self) -> f64 {
        TILE_SIZE * 2f64.powf(self.zoom)
    }

    #[inline(always)]
    fn half_size(&self) -> DVec2 {
        DVec2::new(self.width as f64 / 2.0, self.height as f64 / 2.0)
    }

    /// Rotation applied to screen offsets (bearing turns the map counter-clockwise)
    #[inline(always)]
    fn rotation(&self) -> DVec2 {
        DVec2::from_angle(-self.bearing.to_radians())
    }

    /// Project a geographic coordinate (lon, lat) to pixel coordinates
    pub fn project(&self, lon: f64, lat: f64) -> (i32, i32) {
        let p = self.project_f(lon, lat);
        (p.x as i32, p.y as i32)
    }

    /// Sub-pixel projection
    pub fn project_f(&self, lon: f64, lat: f64) -> DVec2 {
        let offset = (mercator(lon, lat) - mercator(self.center_lon, self.center_lat)) * self.world_size();
        self.rotation().rotate(offset) + self.half_size()
    }

    /// Unproject pixel coordinates back to geographic coordinates (lon, lat)
    pub fn unproject(&self, px: f64, py: f64) -> (f64, f64) {
        let offset = DVec2::new(px, py) - self.half_size();
        let unrotated = DVec2::from_angle(self.bearing.to_radians()).rotate(offset);
        let m = mercator(self.center_lon, self.center_lat) + unrotated / self.world_size();
        inverse_mercator(m)
    }

    /// Center after panning by a pixel delta
    pub fn panned_center(&self, dx: f64, dy: f64) -> LngLat {
        let half = self.half_size();
        let (lon, lat) = self.unproject(half.x + dx, half.y + dy);
        LngLat::new(lon, lat.clamp(-85.0, 85.0))
    }

    /// Largest zoom at which `bbox` fits inside the canvas minus `padding` on each side
    pub fn fit_zoom(&self, bbox: &BBox, padding: f64) -> f64 {
        let sw = mercator(bbox.min_lng, bbox.min_lat);
        let ne = mercator(bbox.max_lng, bbox.max_lat);
        let span = (ne - sw).abs();

        let avail_w = (self.width as f64 - 2.0 * padding).max(1.0);
        let avail_h = (self.height as f64 - 2.0 * padding).max(1.0);

        // A degenerate bbox fits at any zoom
        let zx = if span.x > 0.0 { (avail_w / (span.x * TILE_SIZE)).log2() } else { MAX_ZOOM };
        let zy = if span.y > 0.0 { (avail_h / (span.y * TILE_SIZE)).log2() } else { MAX_ZOOM };
        zx.min(zy).clamp(MIN_ZOOM, MAX_ZOOM)
    }

    /// Geographic bounds of the visible canvas (ignores bearing)
    pub fn visible_bounds(&self) -> BBox {
        let (w, n) = self.unproject(0.0, 0.0);
        let (e, s) = self.unproject(self.width as f64, self.height as f64);
        BBox {
            min_lng: w.min(e),
            min_lat: s.min(n),
            max_lng: w.max(e),
            max_lat: s.max(n),
        }
    }

    /// Check if a projected point is visible in the viewport
    pub fn is_visible(&self, px: i32, py: i32) -> bool {
        px >= -10 && px < self.width as i32 + 10 && py >= -10 && py < self.height as i32 + 10
    }

    /// Check if a line segment might be visible (rough bounding box check)
    pub fn line_might_be_visible(&self, p1: (i32, i32), p2: (i32, i32)) -> bool {
        let min_x = p1.0.min(p2.0);
        let max_x = p1.0.max(p2.0);
        let min_y = p1.1.min(p2.1);
        let max_y = p1.1.max(p2.1);

        max_x >= 0 && min_x < self.width as i32 && max_y >= 0 && min_y < self.height as i32
    }
}

/// Web Mercator, normalized to [0, 1] on both axes
#[inline(always)]
fn mercator(lon: f64, lat: f64) -> DVec2 {
    let lat_rad = lat.clamp(-85.051_128, 85.051_128).to_radians();
    DVec2::new(
        (lon + 180.0) / 360.0,
        (1.0 - (lat_rad.tan() + 1.0 / lat_rad.cos()).ln() / PI) / 2.0,
    )
}

#[inline(always)]
fn inverse_mercator(m: DVec2) -> (f64, f64) {
    let lon = m.x * 360.0 - 180.0;
    let lat = (PI * (1.0 - 2.0 * m.y)).sinh().atan().to_degrees();
    (lon, lat)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_project_center() {
        let vp = Viewport::new(0.0, 0.0, 1.0, 100, 100);
        let (x, y) = vp.project(0.0, 0.0);
        assert_eq!(x, 50);
        assert_eq!(y, 50);
    }

    #[test]
    fn test_pan() {
        let vp = Viewport::new(0.0, 0.0, 1.0, 100, 100);
        assert!(vp.panned_center(10.0, 0.0).lng > 0.0);
        assert!(vp.panned_center(0.0, 10.0).lat < 0.0);
    }

    #[test]
    fn unproject_inverts_project() {
        let mut vp = Viewport::new(-48.2772, -18.9186, 14.0, 300, 200);
        vp.bearing = 30.0;
        let p = vp.project_f(-48.27, -18.91);
        let (lon, lat) = vp.unproject(p.x, p.y);
        assert!((lon + 48.27).abs() < 1e-9);
        assert!((lat + 18.91).abs() < 1e-9);
    }

    #[test]
    fn fit_zoom_contains_bbox() {
        let vp = Viewport::new(0.0, 0.0, 3.0, 400, 200);
        let bbox = BBox::new(-48.30, -18.95, -48.25, -18.90).unwrap();
        let zoom = vp.fit_zoom(&bbox, 20.0);

        let fitted = Viewport::new(bbox.center().lng, bbox.center().lat, zoom, 400, 200);
        for corner in bbox.ring() {
            let (x, y) = fitted.project(corner.lng, corner.lat);
            assert!((19..=381).contains(&x), "x = {x}");
            assert!((19..=181).contains(&y), "y = {y}");
        }
    }
}
