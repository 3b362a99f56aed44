use crate::map::{Lod, MapRenderer};
use anyhow::{Context, Result};
use geojson::{GeoJson, Geometry, Value};
use std::fs;
use std::path::Path;

/// Load whatever Natural Earth basemap files exist in `data_dir`
pub fn load_basemap(renderer: &mut MapRenderer, data_dir: &Path) -> Result<()> {
    let coastline_files = [
        ("ne_110m_coastline.json", Lod::Low),
        ("ne_50m_coastline.json", Lod::Medium),
        ("ne_10m_coastline.json", Lod::High),
    ];

    for (filename, lod) in coastline_files {
        let path = data_dir.join(filename);
        if path.exists() {
            if let Err(e) = load_lines(&path, |line| renderer.add_coastline(line, lod)) {
                tracing::warn!(file = filename, error = %e, "failed to load coastlines");
            }
        }
    }

    for filename in ["ne_10m_admin_1_states_provinces_lines.json", "ne_50m_borders.json"] {
        let path = data_dir.join(filename);
        if path.exists() {
            if let Err(e) = load_lines(&path, |line| renderer.add_border(line)) {
                tracing::warn!(file = filename, error = %e, "failed to load borders");
            }
        }
    }

    let cities_path = data_dir.join("ne_10m_populated_places.json");
    if cities_path.exists() {
        if let Err(e) = load_cities(renderer, &cities_path) {
            tracing::warn!(error = %e, "failed to load cities");
        }
    }

    Ok(())
}

fn read_geojson(path: &Path) -> Result<GeoJson> {
    let content = fs::read_to_string(path).with_context(|| format!("reading {}", path.display()))?;
    let geojson: GeoJson = content.parse()?;
    Ok(geojson)
}

fn load_lines<F>(path: &Path, mut add_line: F) -> Result<()>
where
    F: FnMut(Vec<(f64, f64)>),
{
    let geojson = read_geojson(path)?;
    match geojson {
        GeoJson::FeatureCollection(fc) => {
            for feature in &fc.features {
                if let Some(geometry) = &feature.geometry {
                    geometry_lines(geometry, &mut add_line);
                }
            }
        }
        GeoJson::Feature(f) => {
            if let Some(geometry) = &f.geometry {
                geometry_lines(geometry, &mut add_line);
            }
        }
        GeoJson::Geometry(geometry) => geometry_lines(&geometry, &mut add_line),
    }
    Ok(())
}

fn geometry_lines<F>(geometry: &Geometry, add_line: &mut F)
where
    F: FnMut(Vec<(f64, f64)>),
{
    let to_line = |coords: &Vec<Vec<f64>>| coords.iter().map(|c| (c[0], c[1])).collect::<Vec<_>>();
    match &geometry.value {
        Value::LineString(coords) => add_line(to_line(coords)),
        Value::MultiLineString(lines) => lines.iter().for_each(|l| add_line(to_line(l))),
        Value::Polygon(rings) => rings.iter().take(1).for_each(|r| add_line(to_line(r))),
        Value::MultiPolygon(polys) => polys
            .iter()
            .filter_map(|rings| rings.first())
            .for_each(|r| add_line(to_line(r))),
        Value::GeometryCollection(children) => children.iter().for_each(|g| geometry_lines(g, add_line)),
        _ => {}
    }
}

fn load_cities(renderer: &mut MapRenderer, path: &Path) -> Result<()> {
    let GeoJson::FeatureCollection(fc) = read_geojson(path)? else {
        return Ok(());
    };

    for feature in fc.features {
        let props = feature.properties.as_ref();
        let name = props
            .and_then(|p| p.get("name"))
            .and_then(|v| v.as_str())
            .unwrap_or("Unknown")
            .to_string();
        let population = props
            .and_then(|p| p.get("pop_max").or_else(|| p.get("population")))
            .and_then(|v| v.as_f64())
            .map(|v| v as u64)
            .unwrap_or(0);

        if let Some(Geometry { value: Value::Point(coords), .. }) = feature.geometry {
            if coords.len() >= 2 {
                renderer.add_city(coords[0], coords[1], &name, population);
            }
        }
    }
    Ok(())
}

/// Coarse outline of South America and the Triângulo Mineiro region, used when
/// no basemap files are available
pub fn generate_fallback_basemap(renderer: &mut MapRenderer) {
    renderer.add_coastline(
        vec![
            (-77.3, 8.6), (-71.4, 12.4), (-63.0, 10.7), (-60.0, 8.5),
            (-52.0, 5.0), (-50.0, 0.0), (-44.3, -2.5), (-35.2, -5.5),
            (-37.0, -12.0), (-39.0, -17.5), (-41.0, -22.0), (-44.5, -23.3),
            (-48.6, -26.0), (-50.0, -30.0), (-53.4, -33.7), (-57.5, -38.0),
            (-62.2, -40.5), (-65.0, -45.0), (-67.5, -49.0), (-69.0, -52.0),
            (-74.0, -50.0), (-73.5, -42.0), (-71.5, -32.0), (-70.3, -18.5),
            (-76.2, -13.9), (-81.3, -4.6), (-80.0, 0.9), (-78.8, 1.6),
            (-77.3, 8.6),
        ],
        Lod::Low,
    );

    // Minas Gerais / Goiás / São Paulo meeting rivers around Uberlândia
    renderer.add_border(vec![
        (-50.9, -19.6), (-49.3, -20.0), (-48.2, -20.1), (-47.4, -20.6),
    ]);
    renderer.add_border(vec![
        (-50.9, -19.6), (-50.2, -18.7), (-49.2, -18.4), (-48.0, -18.2), (-47.2, -17.4),
    ]);

    renderer.add_city(-48.2772, -18.9186, "Uberlândia", 713_000);
    renderer.add_city(-47.9319, -19.7472, "Uberaba", 340_000);
    renderer.add_city(-49.2643, -16.6869, "Goiânia", 1_555_000);
    renderer.add_city(-47.8825, -15.7942, "Brasília", 2_817_000);
    renderer.add_city(-46.6333, -23.5505, "São Paulo", 12_325_000);
    renderer.add_city(-43.9378, -19.9208, "Belo Horizonte", 2_530_000);
    renderer.add_city(-43.1729, -22.9068, "Rio de Janeiro", 6_748_000);
    renderer.add_city(-47.9292, -18.6460, "Araguari", 117_000);
    renderer.add_city(-48.9500, -18.9700, "Monte Alegre de Minas", 21_000);
}
