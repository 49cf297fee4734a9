//! Style command: shows the categorical color of one or more values.

use crate::cli::common::{print_json, CliError, CliResult};
use crate::models::style::{category_hash, hue_for, normalize_category};
use crate::models::CategoricalStyleAssigner;
use clap::Args;
use serde::Serialize;

/// Show the categorical color assigned to attribute values
#[derive(Debug, Clone, Args)]
pub struct StyleArgs {
    /// Category values to color (an empty string is styled as "default")
    #[arg(value_name = "VALUE", required = true)]
    pub values: Vec<String>,

    /// Saturation percentage (0-100)
    #[arg(long, default_value_t = 50)]
    pub saturation: u8,

    /// Lightness percentage (0-100)
    #[arg(long, default_value_t = 60)]
    pub lightness: u8,

    /// Output results as JSON
    #[arg(long)]
    pub json: bool,
}

#[derive(Debug, Serialize)]
struct StyleItem {
    value: String,
    category: String,
    hash: i32,
    hue: u16,
    css: String,
    hex: String,
}

#[derive(Debug, Serialize)]
struct StyleResponse {
    styles: Vec<StyleItem>,
    count: usize,
}

impl StyleArgs {
    /// Execute the style command
    pub fn execute(&self) -> CliResult<()> {
        let assigner = CategoricalStyleAssigner::new(self.saturation, self.lightness, 1.0, 0.3)
            .map_err(|e| CliError::validation(format!("Invalid style: {e}")))?;

        let styles: Vec<StyleItem> = self
            .values
            .iter()
            .map(|value| {
                let category = normalize_category(value);
                let color = assigner.assign(value).color;
                StyleItem {
                    value: value.clone(),
                    category: category.to_string(),
                    hash: category_hash(category),
                    hue: hue_for(value),
                    css: color.to_css(),
                    hex: color.to_rgb().to_hex(),
                }
            })
            .collect();

        let response = StyleResponse {
            count: styles.len(),
            styles,
        };

        if self.json {
            print_json(&response)?;
        } else {
            for item in &response.styles {
                println!(
                    "  {:<30} {:<22} {}  (hash {})",
                    item.category, item.css, item.hex, item.hash
                );
            }
        }

        Ok(())
    }
}
