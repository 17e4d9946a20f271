use blueprint_common::{BlueprintError, GeneratedFiles, Result};
use blueprint_services::BlueprintService;
use blueprint_store::PageStore;
use std::sync::Arc;
use tracing::{info, warn};

/// Produces source files from a page's current blueprint. Never modifies the blueprint.
pub struct GenerationPipeline {
    store: Arc<PageStore>,
    service: Arc<dyn BlueprintService>,
}

impl GenerationPipeline {
    pub fn new(store: Arc<PageStore>, service: Arc<dyn BlueprintService>) -> Self {
        Self { store, service }
    }

    /// Generate from whatever blueprint is current now. An edit that lands while
    /// the call is in flight shows up in the next generation, not this one.
    pub async fn generate(&self, page: &str) -> Result<GeneratedFiles> {
        let current = self
            .store
            .snapshot(page)?
            .blueprint
            .ok_or_else(|| BlueprintError::NoActiveDocument(page.to_string()))?;
        current.validate()?;

        let ticket = self.store.begin_generation(page)?;
        info!("⚙️  Generating code for '{}' ({} components)", page, current.component_count());

        let files = self.service.generate(&current).await.map_err(|e| {
            warn!("Generation for '{}' failed: {}", page, e);
            BlueprintError::from(e)
        })?;

        self.store.commit_generation(page, ticket, files.clone())?;
        info!("Generated {} file(s) for '{}'", files.len(), page);
        Ok(files)
    }
}
