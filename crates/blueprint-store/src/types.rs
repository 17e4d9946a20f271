use blueprint_common::{Blueprint, ComponentRef, GeneratedFiles};
use serde::{Deserialize, Serialize};

pub const MIN_ZOOM: f64 = 0.1;
pub const MAX_ZOOM: f64 = 8.0;

/// Canvas offset of the preview.
#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize, Deserialize)]
pub struct Pan {
    pub x: f64,
    pub y: f64,
}

/// Presentational state of one page. Never sent to or received from a service.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct UiState {
    pub selection: Option<ComponentRef>,
    pub zoom: f64,
    pub pan: Pan,
}

impl Default for UiState {
    fn default() -> Self {
        Self {
            selection: None,
            zoom: 1.0,
            pan: Pan::default(),
        }
    }
}

/// Everything the studio knows about one page slot.
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct PageState {
    /// `None` until the first successful upload.
    pub blueprint: Option<Blueprint>,
    /// Pre-edit snapshots, oldest first.
    pub history: Vec<Blueprint>,
    pub ui_state: UiState,
    /// Result of the latest successful generation call.
    pub generated: Option<GeneratedFiles>,
    /// Bumped on every blueprint replacement.
    pub revision: u64,
}

impl PageState {
    pub fn selected_component(&self) -> Option<&blueprint_common::Component> {
        let selection = self.ui_state.selection.as_ref()?;
        self.blueprint.as_ref()?.resolve(selection)
    }

    /// Install a new document and drop a selection that no longer resolves.
    pub(crate) fn replace_blueprint(&mut self, blueprint: Blueprint) {
        if let Some(selection) = &self.ui_state.selection {
            if blueprint.resolve(selection).is_none() {
                self.ui_state.selection = None;
            }
        }
        self.blueprint = Some(blueprint);
        self.revision += 1;
    }
}
