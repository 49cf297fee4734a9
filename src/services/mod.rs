//! Service layer.
//!
//! Loading, view assembly and the layer control coordinate the models with
//! a [`crate::render::RenderTarget`].

pub mod control;
pub mod legend;
pub mod loader;
pub mod view;

// Re-export commonly used types and functions
pub use control::{ControlEntry, ControlError, LayerControl, UnavailableEntry};
pub use legend::{category_legend, LegendEntry};
pub use loader::{
    load_all, load_dataset, DatasetSource, FileSource, LoadBarrier, LoadError, LoadPolicy,
    LoadReport, MAX_BACKOFF, MAX_RETRIES,
};
pub use view::{DatasetLayers, SiteView, ViewError};
