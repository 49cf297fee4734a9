//! Dataset descriptions: where a layer comes from and how it is drawn.

use anyhow::Result;
use geojson::Feature;
use regex::Regex;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::path::PathBuf;
use std::sync::LazyLock;

use super::feature::{category_value, label_value, FeatureFilter};
use super::style::{
    validate_opacity, validate_weight, CategoricalStyleAssigner, StyleAssignment, StyleError,
};
use super::RgbColor;

static DATASET_ID_PATTERN: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"^[a-z0-9]+(?:-[a-z0-9]+)*$").expect("valid dataset id regex"));

/// Stable identifier of a dataset and of the layer group built from it.
///
/// Kebab-case (e.g. "fema-zones"). Control dispatch always goes through this
/// identifier; the human-readable label is presentation only.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub struct DatasetId(String);

impl DatasetId {
    /// Creates a validated identifier.
    pub fn new(id: impl Into<String>) -> Result<Self> {
        let id = id.into();
        if !DATASET_ID_PATTERN.is_match(&id) {
            anyhow::bail!(
                "Dataset ID '{id}' must be kebab-case (lowercase letters, digits and single hyphens)"
            );
        }
        Ok(Self(id))
    }

    /// Identifier from a literal known to be kebab-case.
    pub(crate) fn from_static(id: &'static str) -> Self {
        debug_assert!(DATASET_ID_PATTERN.is_match(id), "invalid builtin id {id}");
        Self(id.to_string())
    }

    /// The identifier as a string slice.
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for DatasetId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.pad(&self.0)
    }
}

impl TryFrom<String> for DatasetId {
    type Error = anyhow::Error;

    fn try_from(value: String) -> Result<Self> {
        Self::new(value)
    }
}

impl From<DatasetId> for String {
    fn from(id: DatasetId) -> Self {
        id.0
    }
}

const fn default_weight() -> f32 {
    1.0
}

const fn default_fill_opacity() -> f32 {
    0.3
}

const fn default_saturation() -> u8 {
    50
}

const fn default_lightness() -> u8 {
    60
}

/// How the features of a dataset are drawn.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum LayerStyle {
    /// One color for every feature.
    Fixed {
        /// Stroke/fill color
        color: RgbColor,
        /// Stroke weight
        #[serde(default = "default_weight")]
        weight: f32,
        /// Fill opacity
        #[serde(default = "default_fill_opacity")]
        fill_opacity: f32,
    },
    /// Hue derived from a property value of each feature.
    Categorical {
        /// Property holding the category value
        property: String,
        /// Saturation percentage
        #[serde(default = "default_saturation")]
        saturation: u8,
        /// Lightness percentage
        #[serde(default = "default_lightness")]
        lightness: u8,
        /// Stroke weight
        #[serde(default = "default_weight")]
        weight: f32,
        /// Fill opacity
        #[serde(default = "default_fill_opacity")]
        fill_opacity: f32,
    },
    /// Point features drawn as an icon marker.
    Marker {
        /// Icon image path, relative to the viewer assets
        icon: String,
    },
    /// Point features drawn as circles.
    Circle {
        /// Circle radius in pixels
        radius: f32,
        /// Stroke/fill color
        color: RgbColor,
        /// Fill opacity
        #[serde(default = "default_fill_opacity")]
        fill_opacity: f32,
    },
}

impl LayerStyle {
    /// Resolves the style into a per-feature rule, validating its constants.
    pub fn rule(&self) -> Result<StyleRule, StyleError> {
        match self {
            Self::Fixed {
                color,
                weight,
                fill_opacity,
            } => {
                validate_weight(*weight)?;
                validate_opacity(*fill_opacity)?;
                Ok(StyleRule::Fixed(StyleAssignment::fixed(
                    *color,
                    *weight,
                    *fill_opacity,
                )))
            }
            Self::Categorical {
                property,
                saturation,
                lightness,
                weight,
                fill_opacity,
            } => Ok(StyleRule::Categorical {
                property: property.clone(),
                assigner: CategoricalStyleAssigner::new(
                    *saturation,
                    *lightness,
                    *weight,
                    *fill_opacity,
                )?,
            }),
            Self::Marker { icon } => Ok(StyleRule::Icon { icon: icon.clone() }),
            Self::Circle {
                radius,
                color,
                fill_opacity,
            } => {
                validate_weight(*radius)?;
                validate_opacity(*fill_opacity)?;
                Ok(StyleRule::Circle {
                    radius: *radius,
                    style: StyleAssignment::fixed(*color, default_weight(), *fill_opacity),
                })
            }
        }
    }
}

/// Per-feature styling, ready to hand to a renderer.
#[derive(Debug, Clone, PartialEq)]
pub enum StyleRule {
    /// Same style for every feature
    Fixed(StyleAssignment),
    /// Style derived from a property value
    Categorical {
        /// Property holding the category value
        property: String,
        /// Assigner turning the value into a style
        assigner: CategoricalStyleAssigner,
    },
    /// Icon marker (no path style)
    Icon {
        /// Icon image path
        icon: String,
    },
    /// Circle marker with a fixed style
    Circle {
        /// Radius in pixels
        radius: f32,
        /// Circle style
        style: StyleAssignment,
    },
}

impl StyleRule {
    /// Style of one feature; `None` for icon markers.
    pub fn style_for(&self, feature: &Feature) -> Option<StyleAssignment> {
        match self {
            Self::Fixed(style) | Self::Circle { style, .. } => Some(*style),
            Self::Categorical { property, assigner } => {
                Some(assigner.assign(&category_value(feature, property)))
            }
            Self::Icon { .. } => None,
        }
    }
}

/// What happens when a feature is clicked.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum Interaction {
    /// Small popup showing a title and one property
    Popup {
        /// Bold popup title
        title: String,
        /// Property shown under the title
        #[serde(default)]
        property: Option<String>,
        /// Text shown when the property is missing
        #[serde(default)]
        fallback: String,
    },
    /// Full attribute list in the detail panel
    Detail {
        /// Panel title
        title: String,
    },
}

impl Interaction {
    /// Popup markup for a feature, or `None` for detail-panel interactions.
    pub fn popup_html(&self, feature: &Feature) -> Option<String> {
        match self {
            Self::Popup {
                title,
                property,
                fallback,
            } => {
                let value = property
                    .as_deref()
                    .map(|p| label_value(feature, p))
                    .filter(|v| !v.is_empty())
                    .unwrap_or_else(|| fallback.clone());
                Some(format!(
                    "<strong>{}</strong><br>{}",
                    escape_html(title),
                    escape_html(&value)
                ))
            }
            Self::Detail { .. } => None,
        }
    }
}

fn escape_html(text: &str) -> String {
    let mut out = String::with_capacity(text.len());
    for c in text.chars() {
        match c {
            '&' => out.push_str("&amp;"),
            '<' => out.push_str("&lt;"),
            '>' => out.push_str("&gt;"),
            '"' => out.push_str("&quot;"),
            _ => out.push(c),
        }
    }
    out
}

/// Always-on text labels drawn as a companion layer.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct LabelSpec {
    /// Property whose value is used as label text
    pub property: String,
}

/// Zoom-to-layer request applied once the layer is rendered.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct FitBounds {
    /// Padding around the layer bounds in pixels
    pub padding: u32,
    /// Maximum zoom level when fitting
    pub max_zoom: u8,
}

impl Default for FitBounds {
    fn default() -> Self {
        Self {
            padding: 30,
            max_zoom: 16,
        }
    }
}

const fn default_in_control() -> bool {
    true
}

/// A static GeoJSON dataset and its presentation.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DatasetSpec {
    /// Stable identifier
    pub id: DatasetId,
    /// Display name in the layer control
    pub label: String,
    /// File path, relative to the data directory
    pub file: PathBuf,
    /// Drawing style
    pub style: LayerStyle,
    /// Load-time feature filter
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub filter: Option<FeatureFilter>,
    /// Click behavior
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub interaction: Option<Interaction>,
    /// Companion label layer
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub labels: Option<LabelSpec>,
    /// Whether the layer is shown as soon as it is rendered
    #[serde(default)]
    pub visible: bool,
    /// Whether the layer gets an entry in the layer control
    #[serde(default = "default_in_control")]
    pub in_control: bool,
    /// Zoom the view to this layer once rendered
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub fit_to_bounds: Option<FitBounds>,
}

impl DatasetSpec {
    /// Creates a dataset with no filter, interaction or labels, hidden on load.
    pub fn new(
        id: DatasetId,
        label: impl Into<String>,
        file: impl Into<PathBuf>,
        style: LayerStyle,
    ) -> Self {
        Self {
            id,
            label: label.into(),
            file: file.into(),
            style,
            filter: None,
            interaction: None,
            labels: None,
            visible: false,
            in_control: true,
            fit_to_bounds: None,
        }
    }

    /// Sets the feature filter.
    pub fn with_filter(mut self, filter: FeatureFilter) -> Self {
        self.filter = Some(filter);
        self
    }

    /// Sets the click interaction.
    pub fn with_interaction(mut self, interaction: Interaction) -> Self {
        self.interaction = Some(interaction);
        self
    }

    /// Adds a label companion layer.
    pub fn with_labels(mut self, property: impl Into<String>) -> Self {
        self.labels = Some(LabelSpec {
            property: property.into(),
        });
        self
    }

    /// Shows the layer as soon as it is rendered.
    pub fn shown(mut self) -> Self {
        self.visible = true;
        self
    }

    /// Validates label, file and style constants.
    pub fn validate(&self) -> Result<()> {
        if self.label.trim().is_empty() {
            anyhow::bail!("Dataset '{}' has an empty label", self.id);
        }

        if self.file.as_os_str().is_empty() {
            anyhow::bail!("Dataset '{}' has no file", self.id);
        }

        self.style
            .rule()
            .map_err(|e| anyhow::anyhow!("Dataset '{}' has an invalid style: {e}", self.id))?;

        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn feature(properties: serde_json::Value) -> Feature {
        serde_json::from_value(json!({
            "type": "Feature",
            "geometry": null,
            "properties": properties
        }))
        .unwrap()
    }

    #[test]
    fn test_dataset_id_validation() {
        assert!(DatasetId::new("zoning").is_ok());
        assert!(DatasetId::new("fema-zones").is_ok());
        assert!(DatasetId::new("layer-1").is_ok());

        assert!(DatasetId::new("").is_err());
        assert!(DatasetId::new("Zoning").is_err());
        assert!(DatasetId::new("fema zones").is_err());
        assert!(DatasetId::new("fema_zones").is_err());
        assert!(DatasetId::new("-fema").is_err());
        assert!(DatasetId::new("fema-").is_err());
        assert!(DatasetId::new("fema--zones").is_err());
    }

    #[test]
    fn test_categorical_rule_styles_by_property() {
        let style = LayerStyle::Categorical {
            property: "NZONE_DESC".to_string(),
            saturation: 60,
            lightness: 60,
            weight: 1.0,
            fill_opacity: 0.3,
        };
        let rule = style.rule().unwrap();

        let a = rule.style_for(&feature(json!({ "NZONE_DESC": "A" }))).unwrap();
        assert_eq!(a.color.to_css(), "hsl(65, 60%, 60%)");

        let missing = rule.style_for(&feature(json!({}))).unwrap();
        let default = rule.style_for(&feature(json!({ "NZONE_DESC": "default" }))).unwrap();
        assert_eq!(missing, default);
    }

    #[test]
    fn test_fixed_and_icon_rules() {
        let fixed = LayerStyle::Fixed {
            color: RgbColor::new(39, 174, 96),
            weight: 1.0,
            fill_opacity: 0.3,
        }
        .rule()
        .unwrap();
        let style = fixed.style_for(&feature(json!({}))).unwrap();
        assert_eq!(style.color.to_css(), "#27AE60");

        let icon = LayerStyle::Marker {
            icon: "assets/marker-publix.png".to_string(),
        }
        .rule()
        .unwrap();
        assert!(icon.style_for(&feature(json!({}))).is_none());
    }

    #[test]
    fn test_invalid_style_rejected() {
        let style = LayerStyle::Fixed {
            color: RgbColor::new(255, 0, 0),
            weight: 1.0,
            fill_opacity: 2.0,
        };
        assert!(style.rule().is_err());

        let spec = DatasetSpec::new(DatasetId::new("site").unwrap(), "Site", "site.json", style);
        assert!(spec.validate().is_err());
    }

    #[test]
    fn test_popup_html() {
        let popup = Interaction::Popup {
            title: "FEMA Zone".to_string(),
            property: Some("FLD_ZONE".to_string()),
            fallback: "N/A".to_string(),
        };
        assert_eq!(
            popup.popup_html(&feature(json!({ "FLD_ZONE": "AE" }))).unwrap(),
            "<strong>FEMA Zone</strong><br>AE"
        );
        assert_eq!(
            popup.popup_html(&feature(json!({}))).unwrap(),
            "<strong>FEMA Zone</strong><br>N/A"
        );

        let escaped = Interaction::Popup {
            title: "Shops".to_string(),
            property: Some("Name".to_string()),
            fallback: String::new(),
        };
        assert_eq!(
            escaped.popup_html(&feature(json!({ "Name": "A&B <Market>" }))).unwrap(),
            "<strong>Shops</strong><br>A&amp;B &lt;Market&gt;"
        );

        let detail = Interaction::Detail {
            title: "Zoning".to_string(),
        };
        assert!(detail.popup_html(&feature(json!({}))).is_none());
    }

    #[test]
    fn test_spec_deserializes_from_toml() {
        let spec: DatasetSpec = toml::from_str(
            r##"
            id = "fema"
            label = "FEMA Zones"
            file = "FEMA.json"
            style = { type = "categorical", property = "FLD_ZONE" }
            filter = { property = "FLD_ZONE", excluded = "X" }
            interaction = { type = "popup", title = "FEMA Zone", property = "FLD_ZONE", fallback = "N/A" }
            "##,
        )
        .unwrap();

        assert_eq!(spec.id.as_str(), "fema");
        assert!(!spec.visible);
        assert!(spec.in_control);
        assert_eq!(spec.filter, Some(FeatureFilter::new("FLD_ZONE", "X")));
        match spec.style {
            LayerStyle::Categorical {
                saturation,
                lightness,
                ..
            } => {
                assert_eq!(saturation, 50);
                assert_eq!(lightness, 60);
            }
            other => panic!("unexpected style {other:?}"),
        }
    }
}
