//! Rendering collaborator interface.
//!
//! The core never draws anything itself. It describes what to draw through
//! [`GeometryRequest`] / [`LabelRequest`] and manipulates the resulting
//! layers through opaque [`LayerHandle`]s. A mapping frontend implements
//! [`RenderTarget`] and [`DetailPanel`]; [`SceneRecorder`] is the headless
//! implementation used by the CLI and the tests.

use geojson::{Feature, FeatureCollection};
use serde::Serialize;
use std::collections::{BTreeMap, BTreeSet};

use crate::models::dataset::{DatasetId, FitBounds, Interaction, StyleRule};
use crate::models::feature::{attribute_map, label_value, FeatureFilter};
use crate::models::StyleAssignment;

/// Opaque reference to a layer owned by the renderer.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize)]
pub struct LayerHandle(u64);

impl LayerHandle {
    /// Wraps a renderer-specific layer number.
    pub const fn new(raw: u64) -> Self {
        Self(raw)
    }

    /// Renderer-specific layer number.
    pub const fn raw(self) -> u64 {
        self.0
    }
}

/// Everything a renderer needs to draw one dataset.
#[derive(Debug, Clone, Copy)]
pub struct GeometryRequest<'a> {
    /// Dataset the layer belongs to
    pub dataset: &'a DatasetId,
    /// Source features
    pub data: &'a FeatureCollection,
    /// Per-feature styling
    pub style: &'a StyleRule,
    /// Load-time filter; rejected features must not be drawn
    pub filter: Option<&'a FeatureFilter>,
    /// Click behavior to bind on each feature
    pub binding: Option<&'a Interaction>,
}

impl<'a> GeometryRequest<'a> {
    /// Features that pass the filter, with their index in the source collection.
    pub fn kept_features(&self) -> impl Iterator<Item = (usize, &'a Feature)> + 'a {
        let filter = self.filter;
        self.data
            .features
            .iter()
            .enumerate()
            .filter(move |(_, feature)| filter.map_or(true, |f| f.keep(feature)))
    }
}

/// Text labels drawn on top of a dataset.
#[derive(Debug, Clone, Copy)]
pub struct LabelRequest<'a> {
    /// Dataset the labels decorate
    pub dataset: &'a DatasetId,
    /// Source features
    pub data: &'a FeatureCollection,
    /// Property used as label text
    pub property: &'a str,
    /// Same filter as the primary layer
    pub filter: Option<&'a FeatureFilter>,
}

/// Mapping library seen from the core.
pub trait RenderTarget {
    /// Builds a layer for a dataset. The layer starts outside the view.
    fn render_geometry(&mut self, request: &GeometryRequest<'_>) -> LayerHandle;

    /// Builds a decorative label layer. The layer starts outside the view.
    fn render_labels(&mut self, request: &LabelRequest<'_>) -> LayerHandle;

    /// Adds a layer to the active view.
    fn add_to_view(&mut self, handle: LayerHandle);

    /// Removes a layer from the active view.
    fn remove_from_view(&mut self, handle: LayerHandle);

    /// Whether a layer is currently part of the active view.
    fn is_in_view(&self, handle: LayerHandle) -> bool;

    /// Zooms the view to the extent of a layer.
    fn fit_bounds(&mut self, handle: LayerHandle, fit: FitBounds);
}

/// Sidebar showing every attribute of a clicked feature.
pub trait DetailPanel {
    /// Shows the panel with a title and attribute list.
    fn show_detail_panel(&mut self, title: &str, attributes: &BTreeMap<String, String>);
}

/// Result of clicking a feature.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum FeatureAction {
    /// A popup with the given markup opened on the feature
    Popup {
        /// Popup markup
        html: String,
    },
    /// The detail panel was opened
    Detail {
        /// Panel title
        title: String,
    },
    /// The dataset has no click behavior
    Ignored,
}

/// Runs the click behavior of `binding` for `feature`.
pub fn activate(
    binding: Option<&Interaction>,
    feature: &Feature,
    panel: &mut dyn DetailPanel,
) -> FeatureAction {
    match binding {
        Some(Interaction::Detail { title }) => {
            panel.show_detail_panel(title, &attribute_map(feature));
            FeatureAction::Detail {
                title: title.clone(),
            }
        }
        Some(popup @ Interaction::Popup { .. }) => FeatureAction::Popup {
            html: popup.popup_html(feature).unwrap_or_default(),
        },
        None => FeatureAction::Ignored,
    }
}

/// Kind of layer recorded by [`SceneRecorder`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum RecordedLayerKind {
    /// Styled geometry
    Geometry,
    /// Text labels
    Labels,
}

/// One drawn feature.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct RecordedFeature {
    /// Index in the source collection
    pub index: usize,
    /// Resolved style (absent for icon markers and labels)
    #[serde(skip_serializing_if = "Option::is_none")]
    pub style: Option<StyleAssignment>,
    /// CSS color of the resolved style
    #[serde(skip_serializing_if = "Option::is_none")]
    pub css: Option<String>,
    /// Label text for label layers
    #[serde(skip_serializing_if = "Option::is_none")]
    pub label: Option<String>,
    /// Bound popup markup
    #[serde(skip_serializing_if = "Option::is_none")]
    pub popup: Option<String>,
}

/// One layer built by [`SceneRecorder`].
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct RecordedLayer {
    /// Layer handle
    pub handle: LayerHandle,
    /// Owning dataset
    pub dataset: DatasetId,
    /// Geometry or labels
    pub kind: RecordedLayerKind,
    /// Drawn features
    pub features: Vec<RecordedFeature>,
}

/// Detail-panel invocation recorded by [`SceneRecorder`].
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct PanelEntry {
    /// Panel title
    pub title: String,
    /// Attributes shown
    pub attributes: BTreeMap<String, String>,
}

/// Headless renderer that records every call.
#[derive(Debug, Default, Clone, Serialize)]
pub struct SceneRecorder {
    layers: Vec<RecordedLayer>,
    in_view: BTreeSet<LayerHandle>,
    fitted: Option<(LayerHandle, FitBounds)>,
    panels: Vec<PanelEntry>,
    #[serde(skip)]
    next_handle: u64,
}

impl SceneRecorder {
    /// Creates an empty scene.
    pub fn new() -> Self {
        Self::default()
    }

    fn allocate(&mut self) -> LayerHandle {
        self.next_handle += 1;
        LayerHandle::new(self.next_handle)
    }

    /// All layers built so far, in creation order.
    pub fn layers(&self) -> &[RecordedLayer] {
        &self.layers
    }

    /// Looks up a layer by handle.
    pub fn layer(&self, handle: LayerHandle) -> Option<&RecordedLayer> {
        self.layers.iter().find(|layer| layer.handle == handle)
    }

    /// Handles currently in the view.
    pub fn visible_handles(&self) -> impl Iterator<Item = LayerHandle> + '_ {
        self.in_view.iter().copied()
    }

    /// Last fit-to-bounds request.
    pub fn fitted(&self) -> Option<(LayerHandle, FitBounds)> {
        self.fitted
    }

    /// Detail-panel invocations, oldest first.
    pub fn panels(&self) -> &[PanelEntry] {
        &self.panels
    }
}

impl RenderTarget for SceneRecorder {
    fn render_geometry(&mut self, request: &GeometryRequest<'_>) -> LayerHandle {
        let handle = self.allocate();
        let features = request
            .kept_features()
            .map(|(index, feature)| {
                let style = request.style.style_for(feature);
                RecordedFeature {
                    index,
                    css: style.map(|s| s.color.to_css()),
                    style,
                    label: None,
                    popup: request.binding.and_then(|b| b.popup_html(feature)),
                }
            })
            .collect();

        self.layers.push(RecordedLayer {
            handle,
            dataset: request.dataset.clone(),
            kind: RecordedLayerKind::Geometry,
            features,
        });
        handle
    }

    fn render_labels(&mut self, request: &LabelRequest<'_>) -> LayerHandle {
        let handle = self.allocate();
        let features = request
            .data
            .features
            .iter()
            .enumerate()
            .filter(|(_, feature)| request.filter.map_or(true, |f| f.keep(feature)))
            .map(|(index, feature)| RecordedFeature {
                index,
                style: None,
                css: None,
                label: Some(label_value(feature, request.property)),
                popup: None,
            })
            .collect();

        self.layers.push(RecordedLayer {
            handle,
            dataset: request.dataset.clone(),
            kind: RecordedLayerKind::Labels,
            features,
        });
        handle
    }

    fn add_to_view(&mut self, handle: LayerHandle) {
        self.in_view.insert(handle);
    }

    fn remove_from_view(&mut self, handle: LayerHandle) {
        self.in_view.remove(&handle);
    }

    fn is_in_view(&self, handle: LayerHandle) -> bool {
        self.in_view.contains(&handle)
    }

    fn fit_bounds(&mut self, handle: LayerHandle, fit: FitBounds) {
        self.fitted = Some((handle, fit));
    }
}

impl DetailPanel for SceneRecorder {
    fn show_detail_panel(&mut self, title: &str, attributes: &BTreeMap<String, String>) {
        self.panels.push(PanelEntry {
            title: title.to_string(),
            attributes: attributes.clone(),
        });
    }
}
