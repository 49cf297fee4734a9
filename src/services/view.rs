//! Map view assembly.
//!
//! [`SiteView::build`] runs once the load barrier has released a
//! [`LoadReport`]: it renders every loaded dataset, registers one visibility
//! group per dataset, applies the fit-to-bounds request and finally builds
//! the layer control. A dataset that cannot be assembled is listed as
//! unavailable instead of failing the view. Nothing here waits on timers;
//! ordering comes from the report alone.

use std::collections::BTreeMap;

use thiserror::Error;
use geojson::FeatureCollection;
use tracing::{debug, info, warn};

use crate::config::BaseMapConfig;
use crate::models::{DatasetId, DatasetSpec, GroupError, LayerGroups, StyleError};
use crate::render::{
    activate, DetailPanel, FeatureAction, GeometryRequest, LabelRequest, LayerHandle,
    RenderTarget,
};
use crate::services::control::{ControlError, LayerControl, UnavailableEntry};
use crate::services::loader::LoadReport;

/// Errors raised while assembling or driving the view.
#[derive(Debug, Error)]
pub enum ViewError {
    /// A dataset style could not be turned into a rule.
    #[error("dataset '{id}' has an invalid style: {source}")]
    Style {
        /// Dataset id
        id: DatasetId,
        /// Style problem
        #[source]
        source: StyleError,
    },
    /// Group registration failed.
    #[error(transparent)]
    Group(#[from] GroupError),
    /// Layer control operation failed.
    #[error(transparent)]
    Control(#[from] ControlError),
    /// The dataset was not loaded into the view.
    #[error("dataset '{0}' is not loaded")]
    NotLoaded(DatasetId),
    /// No drawn feature at this index.
    #[error("dataset '{id}' has no drawn feature at index {index}")]
    NoFeature {
        /// Dataset id
        id: DatasetId,
        /// Requested index in the source collection
        index: usize,
    },
}

/// Handles rendered for one dataset.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct DatasetLayers {
    /// Styled geometry
    pub primary: LayerHandle,
    /// Text label companion, when configured
    pub labels: Option<LayerHandle>,
}

/// A fully assembled site map.
#[derive(Debug)]
pub struct SiteView {
    specs: Vec<DatasetSpec>,
    report: LoadReport,
    layers: BTreeMap<DatasetId, DatasetLayers>,
    groups: LayerGroups,
    control: LayerControl,
}

impl SiteView {
    /// Renders every loaded dataset and builds the layer control.
    ///
    /// A dataset whose style is invalid or whose id is already taken is
    /// left out of the view and listed as unavailable; the remaining
    /// datasets are assembled as usual.
    pub fn build<T: RenderTarget + ?Sized>(
        base_maps: &[BaseMapConfig],
        specs: &[DatasetSpec],
        report: LoadReport,
        target: &mut T,
    ) -> Self {
        let mut layers = BTreeMap::new();
        let mut groups = LayerGroups::new();
        let mut rejected = Vec::new();

        for spec in specs {
            let Some(data) = report.collection(&spec.id) else {
                debug!(dataset = %spec.id, "skipping dataset that did not load");
                continue;
            };

            match assemble(spec, data, &mut groups, target) {
                Ok(handles) => {
                    layers.insert(spec.id.clone(), handles);
                }
                Err(err) => {
                    warn!(dataset = %spec.id, error = %err, "leaving dataset out of the view");
                    rejected.push(UnavailableEntry {
                        id: spec.id.clone(),
                        label: spec.label.clone(),
                        reason: err.to_string(),
                    });
                }
            }
        }

        let control = LayerControl::build(base_maps, specs, &report, &groups, rejected);

        info!(
            layers = layers.len(),
            failed = report.failed.len(),
            unavailable = control.unavailable().len(),
            "site view ready"
        );

        Self {
            specs: specs.to_vec(),
            report,
            layers,
            groups,
            control,
        }
    }

    /// Toggles a dataset through the layer control.
    pub fn toggle<T: RenderTarget + ?Sized>(
        &mut self,
        id: &DatasetId,
        visible: bool,
        target: &mut T,
    ) -> Result<(), ViewError> {
        self.control
            .toggle(id, visible, &mut self.groups, target)
            .map_err(ViewError::from)
    }

    /// Runs the click behavior of a drawn feature.
    pub fn click(
        &self,
        id: &DatasetId,
        index: usize,
        panel: &mut dyn DetailPanel,
    ) -> Result<FeatureAction, ViewError> {
        if !self.layers.contains_key(id) {
            return Err(ViewError::NotLoaded(id.clone()));
        }
        let spec = self
            .specs
            .iter()
            .find(|s| &s.id == id)
            .ok_or_else(|| ViewError::NotLoaded(id.clone()))?;
        let data = self
            .report
            .collection(id)
            .ok_or_else(|| ViewError::NotLoaded(id.clone()))?;

        let feature = data
            .features
            .get(index)
            .filter(|feature| spec.filter.as_ref().map_or(true, |f| f.keep(feature)))
            .ok_or_else(|| ViewError::NoFeature {
                id: id.clone(),
                index,
            })?;

        Ok(activate(spec.interaction.as_ref(), feature, panel))
    }

    /// Layers rendered for a dataset.
    pub fn layers(&self, id: &DatasetId) -> Option<DatasetLayers> {
        self.layers.get(id).copied()
    }

    /// Visibility groups.
    pub fn groups(&self) -> &LayerGroups {
        &self.groups
    }

    /// Layer control state.
    pub fn control(&self) -> &LayerControl {
        &self.control
    }

    /// Mutable layer control, for basemap switching.
    pub fn control_mut(&mut self) -> &mut LayerControl {
        &mut self.control
    }

    /// Load outcomes the view was built from.
    pub fn report(&self) -> &LoadReport {
        &self.report
    }
}

/// Renders one loaded dataset and registers its visibility group.
///
/// Nothing is left in the target when this fails.
fn assemble<T: RenderTarget + ?Sized>(
    spec: &DatasetSpec,
    data: &FeatureCollection,
    groups: &mut LayerGroups,
    target: &mut T,
) -> Result<DatasetLayers, ViewError> {
    if groups.get(&spec.id).is_some() {
        return Err(GroupError::Duplicate(spec.id.clone()).into());
    }

    let rule = spec.style.rule().map_err(|source| ViewError::Style {
        id: spec.id.clone(),
        source,
    })?;

    let primary = target.render_geometry(&GeometryRequest {
        dataset: &spec.id,
        data,
        style: &rule,
        filter: spec.filter.as_ref(),
        binding: spec.interaction.as_ref(),
    });

    let labels = spec.labels.as_ref().map(|labels| {
        target.render_labels(&LabelRequest {
            dataset: &spec.id,
            data,
            property: &labels.property,
            filter: spec.filter.as_ref(),
        })
    });

    if let Err(err) = groups.create(
        spec.id.clone(),
        spec.label.clone(),
        primary,
        labels.into_iter().collect(),
        spec.visible,
        target,
    ) {
        for handle in std::iter::once(primary).chain(labels) {
            if target.is_in_view(handle) {
                target.remove_from_view(handle);
            }
        }
        return Err(err.into());
    }

    if let Some(fit) = spec.fit_to_bounds {
        target.fit_bounds(primary, fit);
    }

    Ok(DatasetLayers { primary, labels })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::Config;
    use crate::models::LayerStyle;
    use crate::render::{RecordedLayerKind, SceneRecorder};
    use crate::services::loader::{parse_collection, LoadBarrier, LoadError};

    const ZONING: &str = r#"{
        "type": "FeatureCollection",
        "features": [
            { "type": "Feature", "geometry": null, "properties": { "NZONE_DESC": "Commercial", "NZONE": "C-1" } },
            { "type": "Feature", "geometry": null, "properties": { "NZONE_DESC": "Residential", "NZONE": "R-2" } }
        ]
    }"#;

    const FEMA: &str = r#"{
        "type": "FeatureCollection",
        "features": [
            { "type": "Feature", "geometry": null, "properties": { "FLD_ZONE": "X" } },
            { "type": "Feature", "geometry": null, "properties": { "FLD_ZONE": "AE" } }
        ]
    }"#;

    const SITE: &str = r#"{
        "type": "FeatureCollection",
        "features": [ { "type": "Feature", "geometry": null, "properties": {} } ]
    }"#;

    fn id(value: &str) -> DatasetId {
        DatasetId::new(value).unwrap()
    }

    /// Loads site, zoning and fema; every other default dataset fails.
    fn report(config: &Config) -> LoadReport {
        let mut barrier = LoadBarrier::new(config.datasets.iter().map(|d| d.id.clone()));
        barrier.complete(&id("zoning"), parse_collection(ZONING));
        barrier.complete(&id("fema"), parse_collection(FEMA));
        barrier.complete(&id("site"), parse_collection(SITE));
        for spec in &config.datasets {
            barrier.complete(&spec.id, Err(LoadError::Unavailable("offline".into())));
        }
        barrier.try_finish().unwrap()
    }

    fn build() -> (SiteView, SceneRecorder) {
        let config = Config::new();
        let mut scene = SceneRecorder::new();
        let view = SiteView::build(&config.basemaps, &config.datasets, report(&config), &mut scene);
        (view, scene)
    }

    #[test]
    fn test_build_renders_loaded_datasets_only() {
        let (view, scene) = build();

        assert_eq!(view.groups().len(), 3);
        // zoning has a label companion
        assert_eq!(scene.layers().len(), 4);

        let zoning = view.layers(&id("zoning")).unwrap();
        let labels = zoning.labels.unwrap();
        assert_eq!(scene.layer(labels).unwrap().kind, RecordedLayerKind::Labels);
        assert!(view.layers(&id("soils")).is_none());
    }

    #[test]
    fn test_initial_visibility() {
        let (view, scene) = build();

        let site = view.layers(&id("site")).unwrap();
        assert!(scene.is_in_view(site.primary));
        assert_eq!(scene.fitted().map(|(h, _)| h), Some(site.primary));

        let zoning = view.layers(&id("zoning")).unwrap();
        assert!(!scene.is_in_view(zoning.primary));
        assert!(!scene.is_in_view(zoning.labels.unwrap()));
        assert!(view.groups().is_consistent(&scene));
    }

    #[test]
    fn test_control_reflects_failures() {
        let (view, _) = build();
        let control = view.control();

        let overlays: Vec<_> = control.overlays().iter().map(|e| e.id.as_str()).collect();
        assert_eq!(overlays, vec!["fema", "zoning"]);
        assert_eq!(control.unavailable().len(), 7);
        assert!(control
            .unavailable()
            .iter()
            .all(|u| u.reason.contains("offline")));
    }

    #[test]
    fn test_toggle_moves_labels_with_polygons() {
        let (mut view, mut scene) = build();
        let zoning = view.layers(&id("zoning")).unwrap();

        view.toggle(&id("zoning"), true, &mut scene).unwrap();
        assert!(scene.is_in_view(zoning.primary));
        assert!(scene.is_in_view(zoning.labels.unwrap()));

        view.toggle(&id("zoning"), false, &mut scene).unwrap();
        assert!(!scene.is_in_view(zoning.primary));
        assert!(!scene.is_in_view(zoning.labels.unwrap()));

        assert!(matches!(
            view.toggle(&id("soils"), true, &mut scene),
            Err(ViewError::Control(ControlError::UnknownEntry(_)))
        ));
    }

    #[test]
    fn test_filtered_features_are_not_drawn_or_clickable() {
        let (view, mut scene) = build();
        let fema = view.layers(&id("fema")).unwrap();

        let drawn: Vec<_> = scene
            .layer(fema.primary)
            .unwrap()
            .features
            .iter()
            .map(|f| f.index)
            .collect();
        assert_eq!(drawn, vec![1]);

        assert!(matches!(
            view.click(&id("fema"), 0, &mut scene),
            Err(ViewError::NoFeature { index: 0, .. })
        ));
        assert!(matches!(
            view.click(&id("fema"), 1, &mut scene),
            Ok(FeatureAction::Popup { .. })
        ));
    }

    #[test]
    fn test_click_opens_detail_panel() {
        let (view, mut scene) = build();

        let action = view.click(&id("zoning"), 0, &mut scene).unwrap();
        assert!(matches!(action, FeatureAction::Detail { .. }));
        assert_eq!(scene.panels().len(), 1);
        assert_eq!(scene.panels()[0].attributes["NZONE"], "C-1");

        assert!(matches!(
            view.click(&id("soils"), 0, &mut scene),
            Err(ViewError::NotLoaded(_))
        ));
    }

    fn spec(config: &Config, value: &str) -> DatasetSpec {
        config.dataset(&id(value)).unwrap().clone()
    }

    fn loaded(specs: &[DatasetSpec], data: &[(&str, &str)]) -> LoadReport {
        let mut barrier = LoadBarrier::new(specs.iter().map(|s| s.id.clone()));
        for (name, text) in data {
            barrier.complete(&id(name), parse_collection(text));
        }
        barrier.try_finish().unwrap()
    }

    #[test]
    fn test_invalid_style_does_not_abort_the_view() {
        let config = Config::new();
        let mut zoning = spec(&config, "zoning");
        zoning.style = LayerStyle::Categorical {
            property: "NZONE_DESC".to_string(),
            saturation: 150,
            lightness: 60,
            weight: 1.0,
            fill_opacity: 0.3,
        };
        let specs = vec![spec(&config, "site"), zoning, spec(&config, "soils")];
        let report = loaded(&specs, &[("site", SITE), ("zoning", ZONING), ("soils", SITE)]);

        let mut scene = SceneRecorder::new();
        let view = SiteView::build(&config.basemaps, &specs, report, &mut scene);

        assert!(view.layers(&id("zoning")).is_none());
        assert!(view.groups().get(&id("zoning")).is_none());
        let soils = view.layers(&id("soils")).unwrap();
        assert_eq!(scene.layer(soils.primary).unwrap().dataset, id("soils"));

        // site and soils only, zoning drew nothing
        assert_eq!(scene.layers().len(), 2);
        let site = view.layers(&id("site")).unwrap();
        assert_eq!(scene.visible_handles().collect::<Vec<_>>(), vec![site.primary]);

        let control = view.control();
        let overlays: Vec<_> = control.overlays().iter().map(|e| e.id.as_str()).collect();
        assert_eq!(overlays, vec!["soils"]);
        assert_eq!(control.unavailable().len(), 1);
        assert_eq!(control.unavailable()[0].id, id("zoning"));
        assert!(control.unavailable()[0].reason.contains("saturation"));
        assert!(view.groups().is_consistent(&scene));
        assert!(matches!(
            view.click(&id("zoning"), 0, &mut scene),
            Err(ViewError::NotLoaded(_))
        ));
    }

    #[test]
    fn test_duplicate_dataset_id_is_listed_unavailable() {
        let config = Config::new();
        let specs = vec![spec(&config, "zoning"), spec(&config, "zoning")];
        let report = loaded(&specs, &[("zoning", ZONING)]);

        let mut scene = SceneRecorder::new();
        let view = SiteView::build(&config.basemaps, &specs, report, &mut scene);

        // polygons and labels of the first entry only
        assert_eq!(scene.layers().len(), 2);
        assert_eq!(view.groups().len(), 1);
        assert_eq!(view.control().overlays().len(), 1);
        assert_eq!(view.control().unavailable().len(), 1);
        assert!(view.control().unavailable()[0]
            .reason
            .contains("already exists"));
    }
}
