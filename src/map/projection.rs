use std::f64::consts::PI;

use crate::model::MapFocus;

/// Latitude limit of the Web Mercator projection
const MAX_LAT: f64 = 85.0;

/// Visible map area: center, scale and canvas size in Braille pixels
#[derive(Clone, Debug)]
pub struct Viewport {
    /// Center longitude (-180 to 180)
    pub center_lon: f64,
    /// Center latitude (-85 to 85)
    pub center_lat: f64,
    /// Scale factor, 1.0 = world spans the canvas width once
    pub zoom: f64,
    /// Canvas pixel width
    pub width: usize,
    /// Canvas pixel height
    pub height: usize,
}

impl Viewport {
    pub fn new(center_lon: f64, center_lat: f64, zoom: f64, width: usize, height: usize) -> Self {
        Self {
            center_lon,
            center_lat: center_lat.clamp(-MAX_LAT, MAX_LAT),
            zoom,
            width,
            height,
        }
    }

    /// Viewport showing a map focus on a canvas of the given pixel size
    pub fn from_focus(focus: MapFocus, width: usize, height: usize) -> Self {
        let (lat, lon) = focus.center;
        Self::new(lon, lat, focus.viewport_scale(), width, height)
    }

    /// Normalized Web Mercator coordinates in [0, 1]
    fn mercator(lon: f64, lat: f64) -> (f64, f64) {
        let x = (lon + 180.0) / 360.0;
        let lat_rad = lat.clamp(-MAX_LAT, MAX_LAT) * PI / 180.0;
        let y = (1.0 - (lat_rad.tan() + 1.0 / lat_rad.cos()).ln() / PI) / 2.0;
        (x, y)
    }

    /// Project a geographic coordinate (lon, lat) to pixel coordinates
    pub fn project(&self, lon: f64, lat: f64) -> (i32, i32) {
        let (x, y) = Self::mercator(lon, lat);
        let (center_x, center_y) = Self::mercator(self.center_lon, self.center_lat);
        let scale = self.zoom * self.width as f64;

        let px = ((x - center_x) * scale + self.width as f64 / 2.0) as i32;
        let py = ((y - center_y) * scale + self.height as f64 / 2.0) as i32;
        (px, py)
    }

    /// Horizontal pixels per degree of longitude
    pub fn pixels_per_degree(&self) -> f64 {
        self.zoom * self.width as f64 / 360.0
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

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_project_center() {
        let vp = Viewport::new(0.0, 0.0, 1.0, 100, 100);
        assert_eq!(vp.project(0.0, 0.0), (50, 50));
    }

    #[test]
    fn test_focus_lands_in_middle() {
        let focus = MapFocus::region(10.0, 20.0);
        let vp = Viewport::from_focus(focus, 200, 100);
        assert_eq!(vp.project(20.0, 10.0), (100, 50));
        assert!(vp.zoom > 5.0);
    }

    #[test]
    fn test_worldwide_focus_keeps_world_scale() {
        let vp = Viewport::from_focus(MapFocus::worldwide(), 360, 180);
        assert_eq!(vp.zoom, 1.0);
        assert_eq!(vp.pixels_per_degree(), 1.0);
        assert_eq!((vp.center_lat, vp.center_lon), (29.0, 40.0));
    }

    #[test]
    fn test_visibility() {
        let vp = Viewport::new(0.0, 0.0, 1.0, 100, 100);
        assert!(vp.is_visible(0, 0));
        assert!(!vp.is_visible(200, 0));
        assert!(vp.line_might_be_visible((-50, 50), (150, 50)));
        assert!(!vp.line_might_be_visible((-50, -50), (-10, -10)));
    }
}
