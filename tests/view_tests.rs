//! End-to-end assembly of the site view from files on disk.

use sitelayers::models::{CategoricalStyleAssigner, DatasetId};
use sitelayers::render::{FeatureAction, RecordedLayerKind, RenderTarget, SceneRecorder};
use sitelayers::services::{load_all, FileSource, LoadError, LoadPolicy, SiteView};

mod fixtures;
use fixtures::*;

fn id(value: &str) -> DatasetId {
    DatasetId::new(value).unwrap()
}

async fn build_view() -> (SiteView, SceneRecorder, tempfile::TempDir) {
    let data_dir = create_partial_data_dir();
    let config = test_config(data_dir.path());

    let source = FileSource::new(data_dir.path());
    let report = load_all(
        &source,
        &config.datasets,
        &LoadPolicy::from(&config.loading),
    )
    .await;

    let mut scene = SceneRecorder::new();
    let view = SiteView::build(&config.basemaps, &config.datasets, report, &mut scene);
    (view, scene, data_dir)
}

#[tokio::test]
async fn test_missing_files_become_unavailable_entries() {
    let (view, _scene, _dir) = build_view().await;

    assert_eq!(view.report().loaded.len(), 3);
    assert!(view
        .report()
        .failed
        .iter()
        .all(|f| matches!(f.error, LoadError::Io { .. })));

    let control = view.control();
    let overlays: Vec<_> = control.overlays().iter().map(|e| e.id.as_str()).collect();
    assert_eq!(overlays, vec!["fema", "zoning"]);
    assert_eq!(control.unavailable().len(), 7);
}

#[tokio::test]
async fn test_site_shown_and_fitted_overlays_hidden() {
    let (view, scene, _dir) = build_view().await;

    let site = view.layers(&id("site")).unwrap();
    assert!(scene.is_in_view(site.primary));
    assert_eq!(scene.fitted().map(|(handle, _)| handle), Some(site.primary));

    for overlay in ["fema", "zoning"] {
        let layers = view.layers(&id(overlay)).unwrap();
        assert!(!scene.is_in_view(layers.primary), "{overlay} should start hidden");
    }
    assert!(view.groups().is_consistent(&scene));
}

#[tokio::test]
async fn test_zoning_labels_follow_polygons() {
    let (mut view, mut scene, _dir) = build_view().await;
    let zoning = view.layers(&id("zoning")).unwrap();
    let labels = zoning.labels.unwrap();

    assert_eq!(scene.layer(labels).unwrap().kind, RecordedLayerKind::Labels);

    let before: Vec<_> = scene.visible_handles().collect();

    view.toggle(&id("zoning"), true, &mut scene).unwrap();
    assert!(scene.is_in_view(zoning.primary));
    assert!(scene.is_in_view(labels));
    assert!(view.control().entry(&id("zoning")).unwrap().checked);

    view.toggle(&id("zoning"), false, &mut scene).unwrap();
    assert!(!scene.is_in_view(labels));

    let after: Vec<_> = scene.visible_handles().collect();
    assert_eq!(before, after);
    assert!(view.groups().is_consistent(&scene));
}

#[tokio::test]
async fn test_zoning_colors_are_deterministic() {
    let (view, scene, _dir) = build_view().await;
    let zoning = view.layers(&id("zoning")).unwrap();
    let layer = scene.layer(zoning.primary).unwrap();

    let css: Vec<_> = layer
        .features
        .iter()
        .map(|f| f.css.clone().unwrap())
        .collect();
    assert_eq!(
        css,
        vec![
            "hsl(282, 60%, 60%)",
            "hsl(28, 60%, 60%)",
            "hsl(345, 60%, 60%)",
        ]
    );

    let assigner = CategoricalStyleAssigner::new(60, 60, 1.0, 0.3).unwrap();
    assert_eq!(layer.features[0].style, Some(assigner.assign("Commercial")));
}

#[tokio::test]
async fn test_fema_filter_and_popup() {
    let (view, mut scene, _dir) = build_view().await;
    let fema = view.layers(&id("fema")).unwrap();
    let layer = scene.layer(fema.primary).unwrap();

    let drawn: Vec<_> = layer.features.iter().map(|f| f.index).collect();
    assert_eq!(drawn, vec![0, 2]);

    let action = view.click(&id("fema"), 2, &mut scene).unwrap();
    assert_eq!(
        action,
        FeatureAction::Popup {
            html: "<strong>FEMA Zone</strong><br>VE".to_string()
        }
    );
    assert!(view.click(&id("fema"), 1, &mut scene).is_err());
}
