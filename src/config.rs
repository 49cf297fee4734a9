//! Configuration management for the application.
//!
//! This module handles loading, validating, and saving the viewer
//! configuration in TOML format with platform-specific directory resolution.
//! The configuration lists the basemaps, the datasets and how they are
//! styled, and the loading policy.

use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};
use std::collections::HashSet;
use std::fs;
use std::path::{Path, PathBuf};

use crate::constants::{CONFIG_DIR_ENV, CONFIG_DIR_NAME};
use crate::services::loader::MAX_RETRIES;
use crate::models::{
    DatasetId, DatasetSpec, FeatureFilter, FitBounds, Interaction, LayerStyle, RgbColor,
};

/// Path configuration for file system locations.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct PathConfig {
    /// Directory holding the GeoJSON files
    pub data_dir: PathBuf,
}

impl Default for PathConfig {
    fn default() -> Self {
        Self {
            data_dir: PathBuf::from("data"),
        }
    }
}

/// Per-dataset loading limits.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct LoadingConfig {
    /// Timeout for one fetch attempt, in milliseconds
    pub timeout_ms: u64,
    /// Retries after a transient failure, at most 10
    pub retries: u32,
    /// Delay before the first retry, in milliseconds (doubles each retry)
    pub backoff_ms: u64,
}

impl Default for LoadingConfig {
    fn default() -> Self {
        Self {
            timeout_ms: 10_000,
            retries: 2,
            backoff_ms: 250,
        }
    }
}

/// A tile basemap offered in the layer control.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct BaseMapConfig {
    /// Display name
    pub name: String,
    /// Tile URL template
    pub url: String,
    /// Attribution text
    pub attribution: String,
    /// Maximum zoom level
    pub max_zoom: u8,
    /// Whether this basemap is active on startup
    #[serde(default)]
    pub default: bool,
}

/// Application configuration.
///
/// # File Location
///
/// - Linux: `~/.config/SiteLayers/config.toml`
/// - macOS: `~/Library/Application Support/SiteLayers/config.toml`
/// - Windows: `%APPDATA%\SiteLayers\config.toml`
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct Config {
    /// File system paths
    pub paths: PathConfig,
    /// Loading policy
    pub loading: LoadingConfig,
    /// Basemaps, in control order
    pub basemaps: Vec<BaseMapConfig>,
    /// Datasets, in render order
    pub datasets: Vec<DatasetSpec>,
}

impl Config {
    /// Creates a new Config describing the default site viewer.
    #[must_use]
    pub fn new() -> Self {
        Self {
            paths: PathConfig::default(),
            loading: LoadingConfig::default(),
            basemaps: default_basemaps(),
            datasets: default_datasets(),
        }
    }

    /// Checks if the config file exists on disk.
    #[must_use]
    pub fn exists() -> bool {
        Self::config_file_path()
            .map(|path| path.exists())
            .unwrap_or(false)
    }

    /// Gets the platform-specific config directory path.
    ///
    /// The directory can be overridden with the `SITELAYERS_CONFIG_DIR`
    /// environment variable.
    pub fn config_dir() -> Result<PathBuf> {
        if let Some(dir) = std::env::var_os(CONFIG_DIR_ENV).filter(|d| !d.is_empty()) {
            return Ok(PathBuf::from(dir));
        }

        let config_dir = dirs::config_dir()
            .context("Failed to determine config directory")?
            .join(CONFIG_DIR_NAME);

        Ok(config_dir)
    }

    /// Gets the full path to the config file.
    pub fn config_file_path() -> Result<PathBuf> {
        Ok(Self::config_dir()?.join("config.toml"))
    }

    /// Loads configuration from the platform config file.
    ///
    /// If the file doesn't exist, returns default configuration.
    pub fn load() -> Result<Self> {
        let config_path = Self::config_file_path()?;

        if !config_path.exists() {
            return Ok(Self::new());
        }

        Self::load_from(&config_path)
    }

    /// Loads and validates configuration from a specific file.
    pub fn load_from(path: &Path) -> Result<Self> {
        let content = fs::read_to_string(path)
            .context(format!("Failed to read config file: {}", path.display()))?;

        let config: Self = toml::from_str(&content)
            .context(format!("Failed to parse config file: {}", path.display()))?;

        config
            .validate()
            .context(format!("Invalid config file: {}", path.display()))?;

        Ok(config)
    }

    /// Saves configuration to `path` using atomic write.
    ///
    /// Uses temp file + rename pattern for atomic writes.
    pub fn save_to(&self, path: &Path) -> Result<()> {
        self.validate()?;

        if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
            fs::create_dir_all(parent).context(format!(
                "Failed to create config directory: {}",
                parent.display()
            ))?;
        }

        let content = toml::to_string_pretty(self).context("Failed to serialize configuration")?;
        let temp_path = path.with_extension("toml.tmp");

        fs::write(&temp_path, content).context(format!(
            "Failed to write temp config file: {}",
            temp_path.display()
        ))?;

        fs::rename(&temp_path, path).context(format!(
            "Failed to rename temp config file to: {}",
            path.display()
        ))?;

        Ok(())
    }

    /// Validates configuration values.
    ///
    /// Checks:
    /// - timeout is non-zero and retries stay within the retry cap
    /// - basemap names are unique and at most one is the default
    /// - dataset ids are unique and every dataset style is valid
    /// - at most one dataset requests fit-to-bounds
    pub fn validate(&self) -> Result<()> {
        if self.loading.timeout_ms == 0 {
            anyhow::bail!("loading.timeout_ms must be greater than zero");
        }
        if self.loading.retries > MAX_RETRIES {
            anyhow::bail!(
                "loading.retries must be at most {MAX_RETRIES} (got {})",
                self.loading.retries
            );
        }

        let mut names = HashSet::new();
        for basemap in &self.basemaps {
            if !names.insert(basemap.name.as_str()) {
                anyhow::bail!("Duplicate basemap name '{}'", basemap.name);
            }
        }
        if self.basemaps.iter().filter(|b| b.default).count() > 1 {
            anyhow::bail!("Only one basemap can be marked as default");
        }

        let mut ids = HashSet::new();
        for dataset in &self.datasets {
            if !ids.insert(&dataset.id) {
                anyhow::bail!("Duplicate dataset id '{}'", dataset.id);
            }
            dataset.validate()?;
        }

        let fits = self
            .datasets
            .iter()
            .filter(|d| d.fit_to_bounds.is_some())
            .count();
        if fits > 1 {
            anyhow::bail!("Only one dataset can request fit_to_bounds (found {fits})");
        }

        Ok(())
    }

    /// Looks up a dataset by id.
    pub fn dataset(&self, id: &DatasetId) -> Option<&DatasetSpec> {
        self.datasets.iter().find(|d| &d.id == id)
    }
}

impl Default for Config {
    fn default() -> Self {
        Self::new()
    }
}

fn default_basemaps() -> Vec<BaseMapConfig> {
    vec![
        BaseMapConfig {
            name: "Aerial (Esri)".to_string(),
            url: "https://server.arcgisonline.com/ArcGIS/rest/services/World_Imagery/MapServer/tile/{z}/{y}/{x}".to_string(),
            attribution: "Imagery © Esri".to_string(),
            max_zoom: 17,
            default: true,
        },
        BaseMapConfig {
            name: "Standard (OSM)".to_string(),
            url: "https://{s}.tile.openstreetmap.org/{z}/{x}/{y}.png".to_string(),
            attribution: "© OpenStreetMap contributors".to_string(),
            max_zoom: 17,
            default: false,
        },
    ]
}

fn builtin_id(id: &'static str) -> DatasetId {
    DatasetId::from_static(id)
}

fn popup(title: &str, property: &str, fallback: &str) -> Interaction {
    Interaction::Popup {
        title: title.to_string(),
        property: Some(property.to_string()),
        fallback: fallback.to_string(),
    }
}

fn detail(title: &str) -> Interaction {
    Interaction::Detail {
        title: title.to_string(),
    }
}

fn categorical(property: &str, saturation: u8) -> LayerStyle {
    LayerStyle::Categorical {
        property: property.to_string(),
        saturation,
        lightness: 60,
        weight: 1.0,
        fill_opacity: 0.3,
    }
}

fn default_datasets() -> Vec<DatasetSpec> {
    let mut site = DatasetSpec::new(
        builtin_id("site"),
        "Potential Site",
        "Potential_Site.json",
        LayerStyle::Fixed {
            color: RgbColor::new(255, 0, 0),
            weight: 2.0,
            fill_opacity: 0.0,
        },
    )
    .with_interaction(detail("Potential Site"))
    .shown();
    site.in_control = false;
    site.fit_to_bounds = Some(FitBounds::default());

    vec![
        site,
        DatasetSpec::new(
            builtin_id("publix"),
            "Publix",
            "FL_Publix.json",
            LayerStyle::Marker {
                icon: "assets/marker-publix.png".to_string(),
            },
        )
        .with_interaction(popup("Publix", "Name", "")),
        DatasetSpec::new(
            builtin_id("walmart"),
            "Walmart",
            "FL_Walmart.json",
            LayerStyle::Marker {
                icon: "assets/marker-walmart.png".to_string(),
            },
        )
        .with_interaction(popup("Walmart", "Name", "")),
        DatasetSpec::new(
            builtin_id("schools"),
            "Schools",
            "FL_Schools.json",
            LayerStyle::Circle {
                radius: 8.0,
                color: RgbColor::new(255, 255, 0),
                fill_opacity: 0.8,
            },
        )
        .with_interaction(popup("School", "Name", "")),
        DatasetSpec::new(
            builtin_id("fema"),
            "FEMA Zones",
            "FEMA.json",
            categorical("FLD_ZONE", 50),
        )
        .with_filter(FeatureFilter::new("FLD_ZONE", "X"))
        .with_interaction(popup("FEMA Zone", "FLD_ZONE", "N/A")),
        DatasetSpec::new(
            builtin_id("future-land-use"),
            "Future Land Use",
            "Project_FLU.json",
            categorical("FLU_DESC", 50),
        )
        .with_interaction(detail("Future Land Use")),
        DatasetSpec::new(
            builtin_id("soils"),
            "Soils",
            "Project_Soils.geojson",
            categorical("MUNAME", 50),
        )
        .with_interaction(popup("Soil Type", "MUNAME", "N/A")),
        DatasetSpec::new(
            builtin_id("zoning"),
            "Zoning",
            "Project_Zoning.json",
            categorical("NZONE_DESC", 60),
        )
        .with_interaction(detail("Zoning"))
        .with_labels("NZONE"),
        DatasetSpec::new(
            builtin_id("wetlands"),
            "Wetlands",
            "SWFWMD_Wetlands.json",
            LayerStyle::Fixed {
                color: RgbColor::new(39, 174, 96),
                weight: 1.0,
                fill_opacity: 0.3,
            },
        )
        .with_interaction(popup("Wetlands", "Type", "")),
        DatasetSpec::new(
            builtin_id("floodplain"),
            "Floodplain",
            "SWFWMD_Floodplain.json",
            LayerStyle::Fixed {
                color: RgbColor::new(255, 255, 0),
                weight: 1.0,
                fill_opacity: 0.3,
            },
        )
        .with_interaction(popup("Floodplain", "Type", "")),
    ]
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    #[test]
    fn test_config_new() {
        let config = Config::new();
        assert_eq!(config.paths.data_dir, PathBuf::from("data"));
        assert_eq!(config.loading.timeout_ms, 10_000);
        assert_eq!(config.basemaps.len(), 2);
        assert_eq!(config.datasets.len(), 10);
        assert!(config.validate().is_ok());
    }

    #[test]
    fn test_default_site_dataset() {
        let config = Config::new();
        let site = config.dataset(&builtin_id("site")).unwrap();
        assert!(site.visible);
        assert!(!site.in_control);
        assert_eq!(site.fit_to_bounds, Some(FitBounds::default()));

        let zoning = config.dataset(&builtin_id("zoning")).unwrap();
        assert_eq!(zoning.labels.as_ref().unwrap().property, "NZONE");
        assert!(!zoning.visible);
    }

    #[test]
    fn test_validate_duplicate_ids() {
        let mut config = Config::new();
        let dup = config.datasets[1].clone();
        config.datasets.push(dup);
        assert!(config.validate().is_err());
    }

    #[test]
    fn test_validate_single_fit_target() {
        let mut config = Config::new();
        config.datasets[1].fit_to_bounds = Some(FitBounds::default());
        assert!(config.validate().is_err());
    }

    #[test]
    fn test_validate_basemaps() {
        let mut config = Config::new();
        config.basemaps[1].default = true;
        assert!(config.validate().is_err());

        let mut config = Config::new();
        config.basemaps[1].name = config.basemaps[0].name.clone();
        assert!(config.validate().is_err());
    }

    #[test]
    fn test_validate_timeout() {
        let mut config = Config::new();
        config.loading.timeout_ms = 0;
        assert!(config.validate().is_err());
    }

    #[test]
    fn test_validate_retries_cap() {
        let mut config = Config::new();
        config.loading.retries = MAX_RETRIES;
        assert!(config.validate().is_ok());

        config.loading.retries = 30;
        let err = config.validate().unwrap_err();
        assert!(err.to_string().contains("loading.retries"));
    }

    #[test]
    fn test_config_save_and_load() {
        let temp_dir = TempDir::new().unwrap();
        let config_file = temp_dir.path().join("nested").join("config.toml");

        let mut config = Config::new();
        config.loading.retries = 5;
        config.save_to(&config_file).unwrap();

        let loaded = Config::load_from(&config_file).unwrap();
        assert_eq!(loaded, config);
        assert!(!config_file.with_extension("toml.tmp").exists());
    }

    #[test]
    fn test_partial_config_uses_defaults() {
        let temp_dir = TempDir::new().unwrap();
        let config_file = temp_dir.path().join("config.toml");
        fs::write(
            &config_file,
            r##"
[paths]
data_dir = "/srv/site-data"

[[datasets]]
id = "wetlands"
label = "Wetlands"
file = "SWFWMD_Wetlands.json"
style = { type = "fixed", color = "#27ae60" }
"##,
        )
        .unwrap();

        let config = Config::load_from(&config_file).unwrap();
        assert_eq!(config.paths.data_dir, PathBuf::from("/srv/site-data"));
        assert_eq!(config.loading, LoadingConfig::default());
        assert_eq!(config.datasets.len(), 1);
        assert_eq!(config.basemaps.len(), 2);
    }

    #[test]
    fn test_invalid_config_rejected() {
        let temp_dir = TempDir::new().unwrap();
        let config_file = temp_dir.path().join("config.toml");
        fs::write(
            &config_file,
            r##"
[[datasets]]
id = "Bad Id"
label = "Wetlands"
file = "SWFWMD_Wetlands.json"
style = { type = "fixed", color = "#27ae60" }
"##,
        )
        .unwrap();

        assert!(Config::load_from(&config_file).is_err());
    }
}
