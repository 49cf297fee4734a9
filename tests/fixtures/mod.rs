//! Shared test fixtures for integration and E2E CLI tests.
#![allow(dead_code)] // Not every test binary uses every fixture

use serde_json::json;
use sitelayers::config::{Config, LoadingConfig};
use std::fs;
use std::path::{Path, PathBuf};
use tempfile::TempDir;

/// Square polygon geometry around (`x`, `y`).
fn square(x: f64, y: f64) -> serde_json::Value {
    json!({
        "type": "Polygon",
        "coordinates": [[
            [x, y], [x + 0.01, y], [x + 0.01, y + 0.01], [x, y + 0.01], [x, y]
        ]]
    })
}

fn collection(features: Vec<serde_json::Value>) -> String {
    json!({ "type": "FeatureCollection", "features": features }).to_string()
}

/// The potential site parcel.
pub fn site_geojson() -> String {
    collection(vec![json!({
        "type": "Feature",
        "geometry": square(-82.0, 27.0),
        "properties": { "Name": "Parcel 12" }
    })])
}

/// Zoning polygons: three districts, one of them missing its description.
pub fn zoning_geojson() -> String {
    collection(vec![
        json!({
            "type": "Feature",
            "geometry": square(-82.01, 27.0),
            "properties": { "NZONE": "C-1", "NZONE_DESC": "Commercial" }
        }),
        json!({
            "type": "Feature",
            "geometry": square(-82.02, 27.0),
            "properties": { "NZONE": "A", "NZONE_DESC": "Agricultural/Rural Mixed Use" }
        }),
        json!({
            "type": "Feature",
            "geometry": square(-82.03, 27.0),
            "properties": { "NZONE": "PD", "NZONE_DESC": null }
        }),
    ])
}

/// FEMA flood zones, including an `X` zone that is filtered out.
pub fn fema_geojson() -> String {
    collection(vec![
        json!({
            "type": "Feature",
            "geometry": square(-82.0, 27.01),
            "properties": { "FLD_ZONE": "AE" }
        }),
        json!({
            "type": "Feature",
            "geometry": square(-82.0, 27.02),
            "properties": { "FLD_ZONE": "X" }
        }),
        json!({
            "type": "Feature",
            "geometry": square(-82.0, 27.03),
            "properties": { "FLD_ZONE": "VE" }
        }),
    ])
}

/// Writes `files` into a fresh temporary directory.
pub fn create_data_dir(files: &[(&str, String)]) -> TempDir {
    let temp_dir = TempDir::new().expect("Failed to create temp dir");
    for (name, content) in files {
        fs::write(temp_dir.path().join(name), content).expect("Failed to write dataset");
    }
    temp_dir
}

/// Data directory with the site, zoning and FEMA files; every other
/// default dataset is missing.
pub fn create_partial_data_dir() -> TempDir {
    create_data_dir(&[
        ("Potential_Site.json", site_geojson()),
        ("Project_Zoning.json", zoning_geojson()),
        ("FEMA.json", fema_geojson()),
    ])
}

/// Default configuration with fast, non-retrying loads.
pub fn test_config(data_dir: &Path) -> Config {
    let mut config = Config::new();
    config.paths.data_dir = data_dir.to_path_buf();
    config.loading = LoadingConfig {
        timeout_ms: 2_000,
        retries: 0,
        backoff_ms: 1,
    };
    config
}

/// Saves `config` into a fresh directory usable as `SITELAYERS_CONFIG_DIR`.
pub fn create_config_dir(config: &Config) -> (PathBuf, TempDir) {
    let temp_dir = TempDir::new().expect("Failed to create temp dir");
    let config_path = temp_dir.path().join("config.toml");
    config.save_to(&config_path).expect("Failed to write config");
    (config_path, temp_dir)
}
