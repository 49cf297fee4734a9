//! Category legend for categorically styled datasets.
//!
//! Lists every distinct category value of a dataset together with the
//! color the assigner gives it, so a map reader can decode the fills.

use geojson::FeatureCollection;
use serde::Serialize;
use std::collections::BTreeMap;
use std::fmt::Write as _;

use crate::models::feature::category_value;
use crate::models::{CategoricalStyleAssigner, FeatureFilter};

/// One legend row.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct LegendEntry {
    /// Category value (already normalized)
    pub category: String,
    /// Number of drawn features in the category
    pub count: usize,
    /// CSS color
    pub css: String,
    /// Same color as `#RRGGBB`
    pub hex: String,
}

/// Builds the legend of a dataset, ordered by category value.
///
/// Features rejected by `filter` are not counted.
pub fn category_legend(
    collection: &FeatureCollection,
    property: &str,
    assigner: &CategoricalStyleAssigner,
    filter: Option<&FeatureFilter>,
) -> Vec<LegendEntry> {
    let mut counts: BTreeMap<String, usize> = BTreeMap::new();

    for feature in &collection.features {
        if filter.is_some_and(|f| !f.keep(feature)) {
            continue;
        }
        *counts
            .entry(category_value(feature, property).into_owned())
            .or_default() += 1;
    }

    counts
        .into_iter()
        .map(|(category, count)| {
            let color = assigner.assign(&category).color;
            LegendEntry {
                css: color.to_css(),
                hex: color.to_rgb().to_hex(),
                category,
                count,
            }
        })
        .collect()
}

/// Renders a legend as a markdown section.
pub fn render_markdown(title: &str, property: &str, entries: &[LegendEntry]) -> String {
    let mut output = String::new();

    let _ = writeln!(output, "## {title}\n");
    let _ = writeln!(output, "Colored by `{property}`.\n");

    if entries.is_empty() {
        output.push_str("_No features._\n");
        return output;
    }

    output.push_str("| Category | Features | Color |\n");
    output.push_str("|---|---:|---|\n");
    for entry in entries {
        let _ = writeln!(
            output,
            "| {} | {} | {} ({}) |",
            entry.category.replace('|', "\\|"),
            entry.count,
            entry.hex,
            entry.css
        );
    }

    output
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn collection() -> FeatureCollection {
        serde_json::from_value(json!({
            "type": "FeatureCollection",
            "features": [
                { "type": "Feature", "geometry": null, "properties": { "FLD_ZONE": "AE" } },
                { "type": "Feature", "geometry": null, "properties": { "FLD_ZONE": "X" } },
                { "type": "Feature", "geometry": null, "properties": { "FLD_ZONE": "AE" } },
                { "type": "Feature", "geometry": null, "properties": { "FLD_ZONE": "VE" } },
                { "type": "Feature", "geometry": null, "properties": {} }
            ]
        }))
        .unwrap()
    }

    #[test]
    fn test_category_legend_counts_and_colors() {
        let assigner = CategoricalStyleAssigner::default();
        let entries = category_legend(&collection(), "FLD_ZONE", &assigner, None);

        let categories: Vec<_> = entries.iter().map(|e| e.category.as_str()).collect();
        assert_eq!(categories, vec!["AE", "VE", "X", "default"]);
        assert_eq!(entries[0].count, 2);

        let ve = &entries[1];
        assert_eq!(ve.css, "hsl(215, 50%, 60%)");
        assert!(ve.hex.starts_with('#'));
        assert_eq!(ve.hex.len(), 7);
    }

    #[test]
    fn test_category_legend_skips_filtered_features() {
        let assigner = CategoricalStyleAssigner::default();
        let filter = FeatureFilter::new("FLD_ZONE", "X");
        let entries = category_legend(&collection(), "FLD_ZONE", &assigner, Some(&filter));

        assert!(entries.iter().all(|e| e.category != "X"));
        assert_eq!(entries.iter().map(|e| e.count).sum::<usize>(), 4);
    }

    #[test]
    fn test_render_markdown() {
        let assigner = CategoricalStyleAssigner::default();
        let entries = category_legend(&collection(), "FLD_ZONE", &assigner, None);
        let markdown = render_markdown("FEMA Zones", "FLD_ZONE", &entries);

        assert!(markdown.starts_with("## FEMA Zones\n"));
        assert!(markdown.contains("| AE | 2 |"));
        assert!(markdown.contains("hsl(88, 50%, 60%)"));

        let empty = render_markdown("Soils", "MUNAME", &[]);
        assert!(empty.contains("_No features._"));
    }
}
