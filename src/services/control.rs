//! Layer control: basemap switcher plus one checkbox per overlay group.

use std::collections::BTreeSet;

use serde::Serialize;
use thiserror::Error;
use tracing::info;

use crate::config::BaseMapConfig;
use crate::models::{DatasetSpec, GroupError, GroupId, LayerGroups};
use crate::render::RenderTarget;
use crate::services::loader::LoadReport;

/// Errors raised while operating the control.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ControlError {
    /// No overlay entry with this id.
    #[error("no layer control entry for '{0}'")]
    UnknownEntry(GroupId),
    /// No basemap with this name.
    #[error("unknown basemap '{0}'")]
    UnknownBaseMap(String),
    /// Group dispatch failed.
    #[error(transparent)]
    Group(#[from] GroupError),
}

/// One overlay checkbox.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ControlEntry {
    /// Group the entry dispatches to
    pub id: GroupId,
    /// Checkbox label
    pub label: String,
    /// Checkbox state
    pub checked: bool,
}

/// A dataset that could not be loaded, shown greyed out in the control.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct UnavailableEntry {
    /// Dataset id
    pub id: GroupId,
    /// Label the entry would have had
    pub label: String,
    /// Why the dataset is missing
    pub reason: String,
}

/// The layer control widget state.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct LayerControl {
    base_maps: Vec<String>,
    active_base: Option<String>,
    overlays: Vec<ControlEntry>,
    unavailable: Vec<UnavailableEntry>,
}

impl LayerControl {
    /// Builds the control once every dataset has settled.
    ///
    /// Only datasets with a registered group get an entry. Datasets that
    /// failed to load are listed as unavailable with their error, followed
    /// by `rejected` entries for datasets that loaded but could not be
    /// assembled. Each id gets at most one overlay entry.
    pub fn build(
        base_maps: &[BaseMapConfig],
        specs: &[DatasetSpec],
        report: &LoadReport,
        groups: &LayerGroups,
        rejected: Vec<UnavailableEntry>,
    ) -> Self {
        let active_base = base_maps
            .iter()
            .find(|b| b.default)
            .or_else(|| base_maps.first())
            .map(|b| b.name.clone());

        let mut overlays = Vec::new();
        let mut unavailable = Vec::new();
        let mut seen = BTreeSet::new();

        for spec in specs.iter().filter(|s| s.in_control) {
            if !seen.insert(&spec.id) {
                continue;
            }
            if let Some(group) = groups.get(&spec.id) {
                overlays.push(ControlEntry {
                    id: spec.id.clone(),
                    label: spec.label.clone(),
                    checked: group.is_visible(),
                });
            } else if let Some(error) = report.failure(&spec.id) {
                unavailable.push(UnavailableEntry {
                    id: spec.id.clone(),
                    label: spec.label.clone(),
                    reason: error.to_string(),
                });
            }
        }
        unavailable.extend(rejected);

        info!(
            overlays = overlays.len(),
            unavailable = unavailable.len(),
            "layer control built"
        );

        Self {
            base_maps: base_maps.iter().map(|b| b.name.clone()).collect(),
            active_base,
            overlays,
            unavailable,
        }
    }

    /// Handles a checkbox change by dispatching to the group with that id.
    pub fn toggle<T: RenderTarget + ?Sized>(
        &mut self,
        id: &GroupId,
        visible: bool,
        groups: &mut LayerGroups,
        target: &mut T,
    ) -> Result<(), ControlError> {
        let entry = self
            .overlays
            .iter_mut()
            .find(|e| &e.id == id)
            .ok_or_else(|| ControlError::UnknownEntry(id.clone()))?;

        if visible {
            groups.on_show(id, target)?;
        } else {
            groups.on_hide(id, target)?;
        }
        entry.checked = visible;
        Ok(())
    }

    /// Switches the active basemap.
    pub fn select_base(&mut self, name: &str) -> Result<(), ControlError> {
        if !self.base_maps.iter().any(|b| b == name) {
            return Err(ControlError::UnknownBaseMap(name.to_string()));
        }
        self.active_base = Some(name.to_string());
        Ok(())
    }

    /// Overlay entries in configuration order.
    pub fn overlays(&self) -> &[ControlEntry] {
        &self.overlays
    }

    /// Entries for datasets that failed to load or could not be assembled.
    pub fn unavailable(&self) -> &[UnavailableEntry] {
        &self.unavailable
    }

    /// Basemap names.
    pub fn base_maps(&self) -> &[String] {
        &self.base_maps
    }

    /// Active basemap name.
    pub fn active_base(&self) -> Option<&str> {
        self.active_base.as_deref()
    }

    /// Looks up an overlay entry.
    pub fn entry(&self, id: &GroupId) -> Option<&ControlEntry> {
        self.overlays.iter().find(|e| &e.id == id)
    }
}
