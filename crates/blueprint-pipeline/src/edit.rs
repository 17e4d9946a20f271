use blueprint_common::{Blueprint, BlueprintError, Result};
use blueprint_services::BlueprintService;
use blueprint_store::PageStore;
use std::sync::Arc;
use tracing::{debug, info, warn};

/// Result of a committed edit command.
#[derive(Debug, Clone, PartialEq)]
pub struct EditOutcome {
    pub blueprint: Blueprint,
    /// Service-provided description of what changed.
    pub summary: String,
    pub history_len: usize,
}

/// Applies natural-language edit commands through the enhance service.
///
/// The request is issued against a revision-tagged snapshot with no lock held;
/// the store only commits if the page has not moved on in the meantime.
pub struct EditPipeline {
    store: Arc<PageStore>,
    service: Arc<dyn BlueprintService>,
}

impl EditPipeline {
    pub fn new(store: Arc<PageStore>, service: Arc<dyn BlueprintService>) -> Self {
        Self { store, service }
    }

    pub async fn apply(&self, page: &str, command: &str) -> Result<EditOutcome> {
        let snapshot = self.store.snapshot(page)?;
        let current = snapshot
            .blueprint
            .ok_or_else(|| BlueprintError::NoActiveDocument(page.to_string()))?;

        let command = command.trim();
        if command.is_empty() {
            return Err(BlueprintError::EmptyCommand);
        }

        info!("✏️  Edit on '{}' at revision {}: {}", page, snapshot.revision, command);

        let enhancement = self.service.enhance(&current, command).await.map_err(|e| {
            warn!("Edit on '{}' failed: {}", page, e);
            BlueprintError::from(e)
        })?;

        if let Err(e) = enhancement.patched_blueprint.validate() {
            warn!("Edit on '{}' returned an unusable blueprint: {}", page, e);
            return Err(e);
        }

        debug!("Enhance summary for '{}': {}", page, enhancement.summary);
        let history_len = self
            .store
            .commit_edit(page, snapshot.revision, enhancement.patched_blueprint.clone())?;

        Ok(EditOutcome {
            blueprint: enhancement.patched_blueprint,
            summary: enhancement.summary,
            history_len,
        })
    }
}
