//! Natural Earth GeoJSON basemap loading.
//!
//! Files are optional: whatever is present in the data directory is parsed in
//! parallel and fed into the [`MapRenderer`]; when nothing loads, a coarse
//! built-in outline keeps the map usable.

use std::fs;
use std::path::Path;

use anyhow::{Context, Result};
use geojson::{GeoJson, Geometry, Value};
use rayon::prelude::*;
use tracing::{info, warn};

use crate::map::{Lod, MapRenderer};

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
enum Layer {
    Coastline,
    Border,
}

const BASEMAP_FILES: [(&str, Layer, Lod); 6] = [
    ("ne_110m_coastline.json", Layer::Coastline, Lod::Low),
    ("ne_50m_coastline.json", Layer::Coastline, Lod::Medium),
    ("ne_10m_coastline.json", Layer::Coastline, Lod::High),
    ("ne_110m_borders.json", Layer::Border, Lod::Low),
    ("ne_50m_borders.json", Layer::Border, Lod::Medium),
    ("ne_10m_borders.json", Layer::Border, Lod::High),
];

/// Build a renderer from the GeoJSON files in `data_dir`, falling back to the
/// built-in outline when no coastline could be loaded.
pub fn load_basemap(data_dir: &Path) -> MapRenderer {
    let parsed: Vec<_> = BASEMAP_FILES
        .par_iter()
        .filter_map(|&(name, layer, lod)| {
            let path = data_dir.join(name);
            if !path.exists() {
                return None;
            }
            match read_lines(&path) {
                Ok(lines) => Some((layer, lod, lines)),
                Err(e) => {
                    warn!(file = name, error = %e, "failed to load basemap file");
                    None
                }
            }
        })
        .collect();

    let mut renderer = MapRenderer::new();
    for (layer, lod, lines) in parsed {
        info!(?layer, ?lod, lines = lines.len(), "basemap layer loaded");
        for line in lines {
            match layer {
                Layer::Coastline => renderer.add_coastline(line, lod),
                Layer::Border => renderer.add_border(line, lod),
            }
        }
    }

    if !renderer.has_data() {
        info!(dir = %data_dir.display(), "no basemap data found, using built-in outline");
        add_builtin_outline(&mut renderer);
    }
    renderer
}

fn read_lines(path: &Path) -> Result<Vec<Vec<(f64, f64)>>> {
    let content = fs::read_to_string(path).with_context(|| format!("reading {}", path.display()))?;
    let geojson: GeoJson = content
        .parse()
        .with_context(|| format!("parsing {}", path.display()))?;
    Ok(geojson_lines(&geojson))
}

/// Every line-like ring in a GeoJSON document (polygon exteriors included)
fn geojson_lines(geojson: &GeoJson) -> Vec<Vec<(f64, f64)>> {
    let mut lines = Vec::new();
    match geojson {
        GeoJson::FeatureCollection(fc) => {
            for geometry in fc.features.iter().filter_map(|f| f.geometry.as_ref()) {
                collect_lines(geometry, &mut lines);
            }
        }
        GeoJson::Feature(f) => {
            if let Some(geometry) = &f.geometry {
                collect_lines(geometry, &mut lines);
            }
        }
        GeoJson::Geometry(geometry) => collect_lines(geometry, &mut lines),
    }
    lines
}

fn collect_lines(geometry: &Geometry, out: &mut Vec<Vec<(f64, f64)>>) {
    let to_line = |coords: &Vec<Vec<f64>>| -> Vec<(f64, f64)> {
        coords
            .iter()
            .filter(|c| c.len() >= 2)
            .map(|c| (c[0], c[1]))
            .collect()
    };

    match &geometry.value {
        Value::LineString(coords) => out.push(to_line(coords)),
        Value::MultiLineString(lines) => out.extend(lines.iter().map(to_line)),
        Value::Polygon(rings) => out.extend(rings.first().map(to_line)),
        Value::MultiPolygon(polygons) => {
            out.extend(polygons.iter().filter_map(|rings| rings.first()).map(to_line));
        }
        Value::GeometryCollection(geometries) => {
            for g in geometries {
                collect_lines(g, out);
            }
        }
        _ => {}
    }
}

/// Very coarse continent outlines (lon, lat)
fn add_builtin_outline(renderer: &mut MapRenderer) {
    const OUTLINES: [&[(f64, f64)]; 6] = [
        // North America
        &[
            (-168.0, 65.0), (-141.0, 60.0), (-125.0, 48.0), (-117.0, 32.0), (-97.0, 25.0),
            (-82.0, 24.0), (-81.0, 31.0), (-70.0, 41.0), (-55.0, 47.0), (-64.0, 60.0),
            (-95.0, 62.0), (-130.0, 70.0), (-168.0, 65.0),
        ],
        // South America
        &[
            (-80.0, 10.0), (-60.0, 5.0), (-35.0, -5.0), (-40.0, -22.0), (-58.0, -38.0),
            (-68.0, -50.0), (-75.0, -52.0), (-72.0, -30.0), (-80.0, -5.0), (-80.0, 10.0),
        ],
        // Europe
        &[
            (-10.0, 36.0), (5.0, 43.0), (20.0, 40.0), (30.0, 40.0), (40.0, 43.0),
            (40.0, 55.0), (25.0, 65.0), (10.0, 71.0), (5.0, 58.0), (-10.0, 52.0),
            (-10.0, 36.0),
        ],
        // Africa
        &[
            (-17.0, 15.0), (-15.0, 28.0), (10.0, 37.0), (32.0, 31.0), (43.0, 12.0),
            (51.0, 11.0), (40.0, -15.0), (32.0, -28.0), (20.0, -35.0), (12.0, -17.0),
            (9.0, 4.0), (-8.0, 4.0), (-17.0, 15.0),
        ],
        // Asia
        &[
            (40.0, 43.0), (55.0, 37.0), (65.0, 25.0), (80.0, 8.0), (92.0, 22.0),
            (105.0, 10.0), (122.0, 25.0), (130.0, 35.0), (145.0, 45.0), (140.0, 55.0),
            (180.0, 68.0), (100.0, 77.0), (60.0, 70.0), (40.0, 55.0), (40.0, 43.0),
        ],
        // Australia
        &[
            (115.0, -20.0), (130.0, -12.0), (145.0, -15.0), (153.0, -30.0), (145.0, -38.0),
            (130.0, -32.0), (115.0, -35.0), (115.0, -20.0),
        ],
    ];

    for outline in OUTLINES {
        renderer.add_coastline(outline.to_vec(), Lod::Low);
    }
}
