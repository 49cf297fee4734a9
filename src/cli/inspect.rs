//! Inspect command: loads every dataset and reports the assembled map.
//!
//! The map is assembled headless with a [`SceneRecorder`], so the output
//! shows exactly what a frontend would be asked to draw.

use crate::cli::common::{load_config, print_json, CliError, CliResult};
use crate::models::DatasetId;
use crate::render::SceneRecorder;
use crate::services::{load_all, FileSource, LayerControl, LoadPolicy, SiteView};
use chrono::{DateTime, Utc};
use clap::Args;
use serde::Serialize;
use std::path::{Path, PathBuf};
use std::time::Duration;

/// Load all datasets and show layers, visibility and failures
#[derive(Debug, Clone, Args)]
pub struct InspectArgs {
    /// Directory holding the dataset files (overrides paths.data_dir)
    #[arg(short, long, value_name = "DIR")]
    pub data_dir: Option<PathBuf>,

    /// Turn a layer on after loading (repeatable)
    #[arg(long, value_name = "ID")]
    pub show: Vec<String>,

    /// Turn a layer off after loading (repeatable)
    #[arg(long, value_name = "ID")]
    pub hide: Vec<String>,

    /// Per-attempt timeout in milliseconds (overrides loading.timeout_ms)
    #[arg(long, value_name = "MS")]
    pub timeout_ms: Option<u64>,

    /// Exit with an error if any dataset failed to load
    #[arg(long)]
    pub strict: bool,

    /// Output results as JSON
    #[arg(long)]
    pub json: bool,
}

#[derive(Debug, Serialize)]
struct LayerItem {
    id: String,
    label: String,
    visible: bool,
    features: usize,
    labels: Option<usize>,
}

#[derive(Debug, Serialize)]
struct InspectResponse<'a> {
    data_dir: String,
    finished_at: DateTime<Utc>,
    layers: Vec<LayerItem>,
    control: &'a LayerControl,
    fit_to: Option<String>,
}

impl InspectArgs {
    /// Execute the inspect command
    pub async fn execute(&self, config_path: Option<&Path>) -> CliResult<()> {
        let config = load_config(config_path)?;

        let show = parse_ids(&self.show)?;
        let hide = parse_ids(&self.hide)?;

        let data_dir = self
            .data_dir
            .clone()
            .unwrap_or_else(|| config.paths.data_dir.clone());
        if !data_dir.is_dir() {
            return Err(CliError::io(format!(
                "Data directory not found: {}",
                data_dir.display()
            )));
        }

        let mut policy = LoadPolicy::from(&config.loading);
        if let Some(ms) = self.timeout_ms {
            if ms == 0 {
                return Err(CliError::validation("--timeout-ms must be greater than zero"));
            }
            policy.timeout = Duration::from_millis(ms);
        }

        let source = FileSource::new(&data_dir);
        let report = load_all(&source, &config.datasets, &policy).await;

        let mut scene = SceneRecorder::new();
        let mut view = SiteView::build(&config.basemaps, &config.datasets, report, &mut scene);

        for (ids, visible) in [(&show, true), (&hide, false)] {
            for id in ids {
                view.toggle(id, visible, &mut scene)
                    .map_err(|e| CliError::validation(format!("Cannot toggle '{id}': {e}")))?;
            }
        }

        let layers: Vec<LayerItem> = view
            .groups()
            .iter()
            .filter_map(|group| {
                let handles = view.layers(group.id())?;
                Some(LayerItem {
                    id: group.id().to_string(),
                    label: group.display_name().to_string(),
                    visible: group.is_visible(),
                    features: scene
                        .layer(handles.primary)
                        .map_or(0, |layer| layer.features.len()),
                    labels: handles
                        .labels
                        .and_then(|h| scene.layer(h))
                        .map(|layer| layer.features.len()),
                })
            })
            .collect();

        let fit_to = scene.fitted().and_then(|(handle, _)| {
            scene
                .layer(handle)
                .map(|layer| layer.dataset.to_string())
        });

        let response = InspectResponse {
            data_dir: data_dir.display().to_string(),
            finished_at: view.report().finished_at,
            layers,
            control: view.control(),
            fit_to,
        };

        if self.json {
            print_json(&response)?;
        } else {
            output_human_readable(&response);
        }

        let failed = view.report().failed.len();
        if self.strict && failed > 0 {
            return Err(CliError::validation(format!(
                "{failed} dataset(s) failed to load"
            )));
        }

        Ok(())
    }
}

fn parse_ids(values: &[String]) -> CliResult<Vec<DatasetId>> {
    values
        .iter()
        .map(|value| {
            DatasetId::new(value.as_str())
                .map_err(|e| CliError::validation(format!("Invalid layer id: {e}")))
        })
        .collect()
}

fn output_human_readable(response: &InspectResponse<'_>) {
    println!("Data directory: {}", response.data_dir);
    if let Some(base) = response.control.active_base() {
        println!("Basemap: {base}");
    }
    if let Some(fit) = &response.fit_to {
        println!("Fit to: {fit}");
    }
    println!();

    println!("Layers ({}):", response.layers.len());
    for layer in &response.layers {
        let state = if layer.visible { "on" } else { "off" };
        let labels = layer
            .labels
            .map(|n| format!(", {n} labels"))
            .unwrap_or_default();
        println!(
            "  [{state:<3}] {:<20} {:<20} {} features{labels}",
            layer.id, layer.label, layer.features
        );
    }

    let unavailable = response.control.unavailable();
    if !unavailable.is_empty() {
        println!();
        println!("Unavailable ({}):", unavailable.len());
        for entry in unavailable {
            println!("  {:<20} {:<20} {}", entry.id, entry.label, entry.reason);
        }
    }
}
