use crate::braille::BrailleCanvas;
use crate::map::geometry::{draw_disc, draw_line, draw_ring};
use crate::map::projection::Viewport;
use crate::model::{Metric, RegionRecord};

/// A geographic line (sequence of lon/lat coordinates)
pub type LineString = Vec<(f64, f64)>;

/// Metres per degree of latitude
const METRES_PER_DEGREE: f64 = 111_000.0;
/// Largest marker radius in Braille pixels
const MAX_MARKER_RADIUS: i32 = 14;

/// Level of detail for basemap data
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Lod {
    Low,    // 110m - world view
    Medium, // 50m - continental
    High,   // 10m - regional
}

impl Lod {
    /// Select LOD based on viewport scale
    pub fn from_zoom(zoom: f64) -> Self {
        if zoom < 2.0 {
            Lod::Low
        } else if zoom < 8.0 {
            Lod::Medium
        } else {
            Lod::High
        }
    }
}

/// Region circle: centered on the region, radius grows with the metric value
#[derive(Clone, Debug, PartialEq)]
pub struct Marker {
    pub lon: f64,
    pub lat: f64,
    pub radius_deg: f64,
    pub label: String,
    pub selected: bool,
}

impl Marker {
    pub fn for_region(record: &RegionRecord, metric: Metric, selected: bool) -> Self {
        let radius_m = (record.value(metric) as f64).sqrt() * metric_multiplier(metric);
        Self {
            lon: record.country_info.long,
            lat: record.country_info.lat,
            radius_deg: radius_m / METRES_PER_DEGREE,
            label: record.country.clone(),
            selected,
        }
    }
}

/// Circle size multiplier per metric; rarer counters get bigger circles
fn metric_multiplier(metric: Metric) -> f64 {
    match metric {
        Metric::Cases => 800.0,
        Metric::Recovered => 1200.0,
        Metric::Deaths => 2000.0,
    }
}

/// Rendered map, one canvas per color layer plus text labels
pub struct MapLayers {
    pub coastlines: BrailleCanvas,
    pub borders: BrailleCanvas,
    pub markers: BrailleCanvas,
    pub highlight: BrailleCanvas,
    /// (col, row, text) in character cells
    pub labels: Vec<(u16, u16, String)>,
}

/// Basemap store with multi-resolution coastline and border data
#[derive(Default)]
pub struct MapRenderer {
    coastlines_low: Vec<LineString>,
    coastlines_medium: Vec<LineString>,
    coastlines_high: Vec<LineString>,
    borders_medium: Vec<LineString>,
    borders_high: Vec<LineString>,
}

impl MapRenderer {
    pub fn new() -> Self {
        Self::default()
    }

    /// Coastlines for the given LOD, falling back to coarser data
    fn coastlines(&self, lod: Lod) -> &[LineString] {
        let candidates = match lod {
            Lod::High => [&self.coastlines_high, &self.coastlines_medium, &self.coastlines_low],
            Lod::Medium => [&self.coastlines_medium, &self.coastlines_low, &self.coastlines_low],
            Lod::Low => [&self.coastlines_low, &self.coastlines_medium, &self.coastlines_high],
        };
        candidates
            .into_iter()
            .find(|lines| !lines.is_empty())
            .map(Vec::as_slice)
            .unwrap_or_default()
    }

    fn borders(&self, lod: Lod) -> &[LineString] {
        match lod {
            Lod::High if !self.borders_high.is_empty() => &self.borders_high,
            _ => &self.borders_medium,
        }
    }

    /// Render basemap and markers onto canvases of `width x height` characters
    pub fn render(
        &self,
        width: usize,
        height: usize,
        viewport: &Viewport,
        markers: &[Marker],
    ) -> MapLayers {
        let lod = Lod::from_zoom(viewport.zoom);
        let mut layers = MapLayers {
            coastlines: BrailleCanvas::new(width, height),
            borders: BrailleCanvas::new(width, height),
            markers: BrailleCanvas::new(width, height),
            highlight: BrailleCanvas::new(width, height),
            labels: Vec::new(),
        };

        for line in self.coastlines(lod) {
            draw_linestring(&mut layers.coastlines, line, viewport);
        }
        for line in self.borders(lod) {
            draw_linestring(&mut layers.borders, line, viewport);
        }

        let px_per_deg = viewport.pixels_per_degree();
        for marker in markers {
            let (px, py) = viewport.project(marker.lon, marker.lat);
            if !viewport.is_visible(px, py) {
                continue;
            }
            let radius =
                ((marker.radius_deg * px_per_deg).round() as i32).clamp(0, MAX_MARKER_RADIUS);
            let canvas = if marker.selected {
                &mut layers.highlight
            } else {
                &mut layers.markers
            };
            if radius > 3 {
                draw_ring(canvas, px, py, radius);
            } else {
                draw_disc(canvas, px, py, radius);
            }

            if marker.selected && px >= 0 && py >= 0 {
                let char_x = (px / 2) as u16;
                let char_y = (py / 4) as u16;
                if let Some(label_x) = char_x.checked_add(2) {
                    layers.labels.push((label_x, char_y, marker.label.clone()));
                }
            }
        }

        layers
    }

    /// Add coastline data at a specific LOD
    pub fn add_coastline(&mut self, line: LineString, lod: Lod) {
        match lod {
            Lod::Low => self.coastlines_low.push(line),
            Lod::Medium => self.coastlines_medium.push(line),
            Lod::High => self.coastlines_high.push(line),
        }
    }

    /// Add border data at a specific LOD (low detail shares the medium set)
    pub fn add_border(&mut self, line: LineString, lod: Lod) {
        match lod {
            Lod::High => self.borders_high.push(line),
            Lod::Low | Lod::Medium => self.borders_medium.push(line),
        }
    }

    /// Check if any coastline data is loaded
    pub fn has_data(&self) -> bool {
        !self.coastlines_low.is_empty()
            || !self.coastlines_medium.is_empty()
            || !self.coastlines_high.is_empty()
    }
}

/// Draw a linestring with viewport culling
fn draw_linestring(canvas: &mut BrailleCanvas, line: &LineString, viewport: &Viewport) {
    let mut prev: Option<(i32, i32)> = None;

    for &(lon, lat) in line {
        let (px, py) = viewport.project(lon, lat);
        if let Some((prev_x, prev_y)) = prev {
            // Skip segments that wrap around the antimeridian
            let dist = ((px - prev_x).abs() + (py - prev_y).abs()) as usize;
            if dist < viewport.width && viewport.line_might_be_visible((prev_x, prev_y), (px, py)) {
                draw_line(canvas, prev_x, prev_y, px, py);
            }
        }
        prev = Some((px, py));
    }
}
