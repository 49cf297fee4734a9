//! Legend command for categorically styled datasets.

use crate::cli::common::{load_config, print_json, CliError, CliResult};
use crate::models::{DatasetId, StyleRule};
use crate::services::legend::{category_legend, render_markdown, LegendEntry};
use crate::services::{load_dataset, FileSource, LoadPolicy};
use clap::Args;
use serde::Serialize;
use std::path::{Path, PathBuf};

/// Print the category legend of a dataset
#[derive(Debug, Clone, Args)]
pub struct LegendArgs {
    /// Dataset id (e.g. zoning)
    #[arg(long, value_name = "ID")]
    pub dataset: String,

    /// Directory holding the dataset files (overrides paths.data_dir)
    #[arg(short, long, value_name = "DIR")]
    pub data_dir: Option<PathBuf>,

    /// Output results as JSON
    #[arg(long)]
    pub json: bool,
}

#[derive(Debug, Serialize)]
struct LegendResponse {
    dataset: String,
    property: String,
    entries: Vec<LegendEntry>,
}

impl LegendArgs {
    /// Execute the legend command
    pub async fn execute(&self, config_path: Option<&Path>) -> CliResult<()> {
        let config = load_config(config_path)?;

        let id = DatasetId::new(self.dataset.as_str())
            .map_err(|e| CliError::validation(format!("Invalid dataset id: {e}")))?;
        let spec = config
            .dataset(&id)
            .ok_or_else(|| CliError::validation(format!("Dataset '{id}' not found")))?;

        let rule = spec
            .style
            .rule()
            .map_err(|e| CliError::validation(format!("Invalid style: {e}")))?;
        let StyleRule::Categorical { property, assigner } = rule else {
            return Err(CliError::validation(format!(
                "Dataset '{id}' is not categorically styled"
            )));
        };

        let data_dir = self
            .data_dir
            .clone()
            .unwrap_or_else(|| config.paths.data_dir.clone());
        let source = FileSource::new(data_dir);
        let collection = load_dataset(&source, spec, &LoadPolicy::from(&config.loading))
            .await
            .map_err(|e| CliError::io(format!("Failed to load dataset '{id}': {e}")))?;

        let entries = category_legend(&collection, &property, &assigner, spec.filter.as_ref());

        if self.json {
            print_json(&LegendResponse {
                dataset: id.to_string(),
                property,
                entries,
            })?;
        } else {
            print!("{}", render_markdown(&spec.label, &property, &entries));
        }

        Ok(())
    }
}
