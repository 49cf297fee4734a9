//! Data models for datasets, styles and layer groups.
//!
//! Models are independent of any rendering library and of the loading
//! machinery in [`crate::services`].

pub mod dataset;
pub mod feature;
pub mod layer_group;
pub mod rgb;
pub mod style;

// Re-export all model types
pub use dataset::{
    DatasetId, DatasetSpec, FitBounds, Interaction, LabelSpec, LayerStyle, StyleRule,
};
pub use feature::FeatureFilter;
pub use layer_group::{GroupError, GroupId, LayerGroups, LayerVisibilityGroup};
pub use rgb::RgbColor;
pub use style::{CategoricalStyleAssigner, HslColor, StyleAssignment, StyleColor, StyleError};
