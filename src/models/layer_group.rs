//! Layer visibility groups.
//!
//! A group ties a primary layer to companion layers (e.g. the zoning
//! polygons and their text labels). The renderer sees them as unrelated
//! layers; the group keeps them shown or hidden together.

use serde::Serialize;
use thiserror::Error;
use tracing::debug;

use super::dataset::DatasetId;
use crate::render::{LayerHandle, RenderTarget};

/// Groups are keyed by the identifier of the dataset they were built from.
pub type GroupId = DatasetId;

/// Errors raised by group registration and dispatch.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum GroupError {
    /// A group with this id is already registered.
    #[error("layer group '{0}' already exists")]
    Duplicate(GroupId),
    /// No group with this id is registered.
    #[error("unknown layer group '{0}'")]
    Unknown(GroupId),
}

/// A primary layer plus companions sharing one visibility toggle.
///
/// Companion visibility always equals the primary layer's visibility.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct LayerVisibilityGroup {
    id: GroupId,
    display_name: String,
    primary: LayerHandle,
    companions: Vec<LayerHandle>,
    visible: bool,
}

impl LayerVisibilityGroup {
    /// Stable identifier used for dispatch.
    pub fn id(&self) -> &GroupId {
        &self.id
    }

    /// Human-readable name, for presentation only.
    pub fn display_name(&self) -> &str {
        &self.display_name
    }

    /// Primary layer handle.
    pub fn primary(&self) -> LayerHandle {
        self.primary
    }

    /// Companion layer handles.
    pub fn companions(&self) -> &[LayerHandle] {
        &self.companions
    }

    /// Whether the group is currently shown.
    pub fn is_visible(&self) -> bool {
        self.visible
    }

    fn handles(&self) -> impl Iterator<Item = LayerHandle> + '_ {
        std::iter::once(self.primary).chain(self.companions.iter().copied())
    }

    fn apply<T: RenderTarget + ?Sized>(&mut self, visible: bool, target: &mut T) {
        for handle in self.handles() {
            match (visible, target.is_in_view(handle)) {
                (true, false) => target.add_to_view(handle),
                (false, true) => target.remove_from_view(handle),
                _ => {}
            }
        }
        self.visible = visible;
    }
}

/// Registry of every layer group in a map view.
///
/// Groups are created once their layers are rendered and live until the
/// registry is dropped with the view.
#[derive(Debug, Default, Clone, Serialize)]
pub struct LayerGroups {
    groups: Vec<LayerVisibilityGroup>,
}

impl LayerGroups {
    /// Creates an empty registry.
    pub fn new() -> Self {
        Self::default()
    }

    /// Registers a group and puts all of its layers in the requested state.
    ///
    /// Companions always start in the primary's state; there is no separate
    /// initial visibility for them.
    pub fn create<T: RenderTarget + ?Sized>(
        &mut self,
        id: GroupId,
        display_name: impl Into<String>,
        primary: LayerHandle,
        companions: Vec<LayerHandle>,
        initially_visible: bool,
        target: &mut T,
    ) -> Result<(), GroupError> {
        if self.get(&id).is_some() {
            return Err(GroupError::Duplicate(id));
        }

        let mut group = LayerVisibilityGroup {
            id,
            display_name: display_name.into(),
            primary,
            companions,
            visible: initially_visible,
        };
        group.apply(initially_visible, target);

        debug!(
            group = %group.id,
            companions = group.companions.len(),
            visible = initially_visible,
            "registered layer group"
        );
        self.groups.push(group);
        Ok(())
    }

    /// Shows the primary layer and every companion.
    pub fn on_show<T: RenderTarget + ?Sized>(
        &mut self,
        id: &GroupId,
        target: &mut T,
    ) -> Result<(), GroupError> {
        self.set_visible(id, true, target)
    }

    /// Hides the primary layer and every companion.
    pub fn on_hide<T: RenderTarget + ?Sized>(
        &mut self,
        id: &GroupId,
        target: &mut T,
    ) -> Result<(), GroupError> {
        self.set_visible(id, false, target)
    }

    /// Sets the visibility of a whole group. Repeating a state is a no-op.
    pub fn set_visible<T: RenderTarget + ?Sized>(
        &mut self,
        id: &GroupId,
        visible: bool,
        target: &mut T,
    ) -> Result<(), GroupError> {
        let group = self
            .groups
            .iter_mut()
            .find(|g| &g.id == id)
            .ok_or_else(|| GroupError::Unknown(id.clone()))?;

        group.apply(visible, target);
        debug!(group = %id, visible, "layer group toggled");
        Ok(())
    }

    /// Looks up a group.
    pub fn get(&self, id: &GroupId) -> Option<&LayerVisibilityGroup> {
        self.groups.iter().find(|g| &g.id == id)
    }

    /// Groups in creation order.
    pub fn iter(&self) -> impl Iterator<Item = &LayerVisibilityGroup> {
        self.groups.iter()
    }

    /// Number of registered groups.
    pub fn len(&self) -> usize {
        self.groups.len()
    }

    /// Whether no group is registered.
    pub fn is_empty(&self) -> bool {
        self.groups.is_empty()
    }

    /// Checks that every layer of every group matches its group's state.
    pub fn is_consistent<T: RenderTarget + ?Sized>(&self, target: &T) -> bool {
        self.groups
            .iter()
            .all(|g| g.handles().all(|h| target.is_in_view(h) == g.visible))
    }
}
