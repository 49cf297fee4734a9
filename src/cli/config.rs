//! Configuration management CLI commands.

use crate::cli::common::{load_config, print_json, CliError, CliResult};
use crate::config::Config;
use clap::{Args, Subcommand};
use serde::Serialize;
use std::path::{Path, PathBuf};

/// Configuration management commands
#[derive(Args, Debug)]
pub struct ConfigArgs {
    #[command(subcommand)]
    command: ConfigCommand,
}

#[derive(Subcommand, Debug)]
enum ConfigCommand {
    /// Display current configuration
    Show(ConfigShowArgs),
    /// Write the default configuration file
    Init(ConfigInitArgs),
    /// Set loading and path values
    Set(ConfigSetArgs),
    /// Check a configuration file without using it
    Validate(ConfigValidateArgs),
}

/// Display current configuration
#[derive(Args, Debug)]
pub struct ConfigShowArgs {
    /// Output as JSON
    #[arg(long)]
    json: bool,
}

/// Write the default configuration file
#[derive(Args, Debug)]
pub struct ConfigInitArgs {
    /// Overwrite an existing file
    #[arg(long)]
    force: bool,
}

/// Set configuration values
#[derive(Args, Debug)]
pub struct ConfigSetArgs {
    /// Directory holding the dataset files
    #[arg(long, value_name = "DIR")]
    data_dir: Option<PathBuf>,

    /// Per-attempt load timeout in milliseconds
    #[arg(long, value_name = "MS")]
    timeout_ms: Option<u64>,

    /// Retries after a transient load failure
    #[arg(long, value_name = "N")]
    retries: Option<u32>,

    /// Delay before the first retry in milliseconds
    #[arg(long, value_name = "MS")]
    backoff_ms: Option<u64>,
}

/// Check a configuration file
#[derive(Args, Debug)]
pub struct ConfigValidateArgs {
    /// File to check (defaults to the active configuration file)
    #[arg(value_name = "FILE")]
    file: Option<PathBuf>,

    /// Output as JSON
    #[arg(long)]
    json: bool,
}

#[derive(Serialize, Debug)]
struct ValidateOutput {
    file: String,
    valid: bool,
    datasets: usize,
    basemaps: usize,
    #[serde(skip_serializing_if = "Option::is_none")]
    error: Option<String>,
}

impl ConfigArgs {
    /// Execute config subcommand
    pub fn execute(&self, config_path: Option<&Path>) -> CliResult<()> {
        match &self.command {
            ConfigCommand::Show(args) => args.execute(config_path),
            ConfigCommand::Init(args) => args.execute(config_path),
            ConfigCommand::Set(args) => args.execute(config_path),
            ConfigCommand::Validate(args) => args.execute(config_path),
        }
    }
}

/// Resolves the file the config commands operate on.
fn target_path(config_path: Option<&Path>) -> CliResult<PathBuf> {
    match config_path {
        Some(path) => Ok(path.to_path_buf()),
        None => Config::config_file_path()
            .map_err(|e| CliError::io(format!("Failed to locate config file: {e}"))),
    }
}

impl ConfigShowArgs {
    /// Execute show command
    pub fn execute(&self, config_path: Option<&Path>) -> CliResult<()> {
        let config = load_config(config_path)?;

        if self.json {
            print_json(&config)?;
        } else {
            output_human_readable(&config);
        }

        Ok(())
    }
}

impl ConfigInitArgs {
    /// Execute init command
    pub fn execute(&self, config_path: Option<&Path>) -> CliResult<()> {
        let path = target_path(config_path)?;

        if path.exists() && !self.force {
            return Err(CliError::validation(format!(
                "Config file already exists: {} (use --force to overwrite)",
                path.display()
            )));
        }

        Config::new()
            .save_to(&path)
            .map_err(|e| CliError::io(format!("Failed to save configuration: {e:#}")))?;

        println!("Configuration written to {}", path.display());
        Ok(())
    }
}

impl ConfigSetArgs {
    /// Execute set command
    pub fn execute(&self, config_path: Option<&Path>) -> CliResult<()> {
        if self.data_dir.is_none()
            && self.timeout_ms.is_none()
            && self.retries.is_none()
            && self.backoff_ms.is_none()
        {
            return Err(CliError::validation(
                "At least one configuration option must be specified: --data-dir, --timeout-ms, --retries, or --backoff-ms",
            ));
        }

        let path = target_path(config_path)?;
        let mut config = if path.exists() {
            load_config(Some(&path))?
        } else {
            Config::new()
        };

        if let Some(dir) = &self.data_dir {
            config.paths.data_dir.clone_from(dir);
        }
        if let Some(ms) = self.timeout_ms {
            config.loading.timeout_ms = ms;
        }
        if let Some(retries) = self.retries {
            config.loading.retries = retries;
        }
        if let Some(ms) = self.backoff_ms {
            config.loading.backoff_ms = ms;
        }

        config
            .validate()
            .map_err(|e| CliError::validation(format!("Invalid configuration: {e}")))?;
        config
            .save_to(&path)
            .map_err(|e| CliError::io(format!("Failed to save configuration: {e:#}")))?;

        println!("Configuration updated successfully.");
        Ok(())
    }
}

impl ConfigValidateArgs {
    /// Execute validate command
    pub fn execute(&self, config_path: Option<&Path>) -> CliResult<()> {
        let path = match &self.file {
            Some(file) => file.clone(),
            None => target_path(config_path)?,
        };
        if !path.exists() {
            return Err(CliError::io(format!(
                "Config file not found: {}",
                path.display()
            )));
        }

        let result = Config::load_from(&path);
        let output = ValidateOutput {
            file: path.display().to_string(),
            valid: result.is_ok(),
            datasets: result.as_ref().map_or(0, |c| c.datasets.len()),
            basemaps: result.as_ref().map_or(0, |c| c.basemaps.len()),
            error: result.as_ref().err().map(|e| format!("{e:#}")),
        };

        if self.json {
            print_json(&output)?;
        } else if output.valid {
            println!(
                "✓ {} is valid ({} datasets, {} basemaps)",
                output.file, output.datasets, output.basemaps
            );
        }

        match output.error {
            Some(error) => Err(CliError::validation(error)),
            None => Ok(()),
        }
    }
}

/// Output configuration in human-readable format
fn output_human_readable(config: &Config) {
    println!("SiteLayers Configuration");
    println!("========================");
    println!();

    println!("Paths:");
    println!("  Data Directory: {}", config.paths.data_dir.display());
    println!();

    println!("Loading:");
    println!("  Timeout: {}ms", config.loading.timeout_ms);
    println!("  Retries: {}", config.loading.retries);
    println!("  Backoff: {}ms", config.loading.backoff_ms);
    println!();

    println!("Basemaps:");
    for basemap in &config.basemaps {
        let marker = if basemap.default { " (default)" } else { "" };
        println!("  {}{marker}", basemap.name);
    }
    println!();

    println!("Datasets:");
    for dataset in &config.datasets {
        let state = if dataset.visible { "on" } else { "off" };
        println!(
            "  [{state:<3}] {:<18} {:<20} {}",
            dataset.id,
            dataset.label,
            dataset.file.display()
        );
    }
    println!();
}
