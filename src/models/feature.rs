//! Feature property access and the load-time filtering predicate.

use geojson::Feature;
use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::borrow::Cow;
use std::collections::BTreeMap;

use super::style::DEFAULT_CATEGORY;

/// Display text for a property value. Null yields `None`.
fn value_text(value: &Value) -> Option<Cow<'_, str>> {
    match value {
        Value::Null => None,
        Value::String(s) => Some(Cow::Borrowed(s.as_str())),
        Value::Bool(b) => Some(Cow::Owned(b.to_string())),
        Value::Number(n) => Some(Cow::Owned(n.to_string())),
        other => Some(Cow::Owned(other.to_string())),
    }
}

/// Category value of `property`, or [`DEFAULT_CATEGORY`] when the property is
/// missing, null or empty.
///
/// # Examples
///
/// ```
/// use geojson::Feature;
/// use sitelayers::models::feature::category_value;
///
/// let feature: Feature = serde_json::from_value(serde_json::json!({
///     "type": "Feature",
///     "geometry": null,
///     "properties": { "FLD_ZONE": "AE" }
/// })).unwrap();
///
/// assert_eq!(category_value(&feature, "FLD_ZONE"), "AE");
/// assert_eq!(category_value(&feature, "MISSING"), "default");
/// ```
pub fn category_value<'a>(feature: &'a Feature, property: &str) -> Cow<'a, str> {
    feature
        .property(property)
        .and_then(value_text)
        .filter(|text| !text.is_empty())
        .unwrap_or(Cow::Borrowed(DEFAULT_CATEGORY))
}

/// Label text of `property`; empty when missing or null.
pub fn label_value(feature: &Feature, property: &str) -> String {
    feature
        .property(property)
        .and_then(value_text)
        .map(Cow::into_owned)
        .unwrap_or_default()
}

/// Every property of the feature as display strings, ordered by key.
pub fn attribute_map(feature: &Feature) -> BTreeMap<String, String> {
    feature
        .properties_iter()
        .map(|(key, value)| {
            let text = value_text(value).map(Cow::into_owned).unwrap_or_default();
            (key.clone(), text)
        })
        .collect()
}

/// Excludes features whose sentinel property equals a configured value.
///
/// Used for datasets such as FEMA flood zones where one code means "no
/// special flood hazard" and should not be drawn.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct FeatureFilter {
    /// Property holding the sentinel value
    pub property: String,
    /// Value that causes a feature to be dropped
    pub excluded: String,
}

impl FeatureFilter {
    /// Creates a new filter.
    pub fn new(property: impl Into<String>, excluded: impl Into<String>) -> Self {
        Self {
            property: property.into(),
            excluded: excluded.into(),
        }
    }

    /// Returns false only when the property is present and equals the
    /// excluded value. Features without the property are kept.
    pub fn keep(&self, feature: &Feature) -> bool {
        match feature.property(&self.property).and_then(value_text) {
            Some(text) => text != self.excluded.as_str(),
            None => true,
        }
    }
}
