use crate::{EditOutcome, EditPipeline, GenerationPipeline, UploadPipeline};
use blueprint_common::{Blueprint, GeneratedFiles, Result};
use blueprint_services::{BlueprintService, ImagePayload};
use blueprint_store::PageStore;
use std::sync::Arc;

/// Everything a front end needs: the page store plus the three pipelines
/// sharing one service handle.
pub struct Studio {
    store: Arc<PageStore>,
    upload: UploadPipeline,
    edit: EditPipeline,
    generation: GenerationPipeline,
}

impl Studio {
    pub fn new(store: Arc<PageStore>, service: Arc<dyn BlueprintService>) -> Self {
        Self {
            upload: UploadPipeline::new(store.clone(), service.clone()),
            edit: EditPipeline::new(store.clone(), service.clone()),
            generation: GenerationPipeline::new(store.clone(), service),
            store,
        }
    }

    pub fn store(&self) -> &Arc<PageStore> {
        &self.store
    }

    pub async fn upload(&self, page: &str, image: &ImagePayload) -> Result<Blueprint> {
        self.upload.upload(page, image).await
    }

    pub async fn edit(&self, page: &str, command: &str) -> Result<EditOutcome> {
        self.edit.apply(page, command).await
    }

    pub async fn generate(&self, page: &str) -> Result<GeneratedFiles> {
        self.generation.generate(page).await
    }

    pub fn undo(&self, page: &str) -> Result<Blueprint> {
        self.store.undo(page)
    }
}
