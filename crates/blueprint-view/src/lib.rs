use blueprint_common::{Blueprint, BlueprintError, Component, ComponentRef, DesignTokens, Result};
use blueprint_store::{PageState, PageStore};
use serde::{Deserialize, Serialize};
use std::str::FromStr;

/// Which panel the user is looking at.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ViewMode {
    /// Follow the page: generated code once there is some, the preview before.
    #[default]
    Auto,
    Preview,
    Json,
    Properties,
    Code,
}

impl FromStr for ViewMode {
    type Err = BlueprintError;

    fn from_str(s: &str) -> Result<Self> {
        match s.trim().to_ascii_lowercase().as_str() {
            "" | "auto" => Ok(ViewMode::Auto),
            "preview" => Ok(ViewMode::Preview),
            "json" | "raw" => Ok(ViewMode::Json),
            "properties" | "props" => Ok(ViewMode::Properties),
            "code" => Ok(ViewMode::Code),
            other => Err(BlueprintError::Config(format!("unknown view mode '{}'", other))),
        }
    }
}

/// What a panel renders.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(tag = "view", rename_all = "snake_case")]
pub enum View {
    EmptyState,
    BlueprintPreview {
        name: String,
        tokens: DesignTokens,
        components: Vec<Component>,
    },
    RawJson {
        blueprint: Blueprint,
    },
    Properties {
        selection: Option<ComponentRef>,
        component: Option<Component>,
    },
    GeneratedSummary {
        file_names: Vec<String>,
    },
}

/// Derive the view for `mode` from the page's state as it is right now.
pub fn project(state: &PageState, mode: ViewMode) -> View {
    let Some(blueprint) = &state.blueprint else {
        return View::EmptyState;
    };

    let preview = || View::BlueprintPreview {
        name: blueprint.name.clone(),
        tokens: blueprint.tokens.clone(),
        components: blueprint.components.clone(),
    };
    let summary = || {
        state.generated.as_ref().map(|files| View::GeneratedSummary {
            file_names: files.file_names(),
        })
    };

    match mode {
        ViewMode::Auto | ViewMode::Code => summary().unwrap_or_else(preview),
        ViewMode::Preview => preview(),
        ViewMode::Json => View::RawJson {
            blueprint: blueprint.clone(),
        },
        ViewMode::Properties => View::Properties {
            selection: state.ui_state.selection.clone(),
            component: state.selected_component().cloned(),
        },
    }
}

/// Project a page straight out of the store, under the page's lock.
pub fn render_page(store: &PageStore, page: &str, mode: ViewMode) -> Result<View> {
    store.read(page, |state| project(state, mode))
}
