use blueprint_common::{Blueprint, BlueprintError, Result};
use blueprint_services::{BlueprintService, ImagePayload};
use blueprint_store::PageStore;
use std::sync::Arc;
use tracing::{info, warn};

/// Converts an uploaded sketch into the page's new baseline blueprint.
pub struct UploadPipeline {
    store: Arc<PageStore>,
    service: Arc<dyn BlueprintService>,
}

impl UploadPipeline {
    pub fn new(store: Arc<PageStore>, service: Arc<dyn BlueprintService>) -> Self {
        Self { store, service }
    }

    /// On success the page's history and generated files are cleared; the
    /// upload itself is not an undo step.
    pub async fn upload(&self, page: &str, image: &ImagePayload) -> Result<Blueprint> {
        let snapshot = self.store.snapshot(page)?;
        if image.is_empty() {
            return Err(BlueprintError::EmptyImage);
        }

        info!("📤 Uploading '{}' ({} bytes) for page '{}'", image.file_name, image.bytes.len(), page);

        let blueprint = self.service.convert(image).await.map_err(|e| {
            warn!("Conversion for '{}' failed: {}", page, e);
            BlueprintError::from(e)
        })?;

        self.store
            .reset_baseline(page, snapshot.revision, blueprint.clone())?;
        info!(
            "Page '{}' now holds '{}' with {} components",
            page,
            blueprint.name,
            blueprint.component_count()
        );
        Ok(blueprint)
    }
}
