//! End-to-end flows through the studio with a scripted backend.

use async_trait::async_trait;
use blueprint_common::{BBox, Blueprint, BlueprintError, Component, GeneratedFiles};
use blueprint_pipeline::Studio;
use blueprint_services::{BlueprintService, Enhancement, ImagePayload, ServiceResult};
use blueprint_store::PageStore;
use blueprint_view::{render_page, View, ViewMode};
use serde_json::json;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;

/// Serves the sample "home" page and counts calls.
#[derive(Default)]
struct SampleBackend {
    calls: AtomicUsize,
}

impl SampleBackend {
    fn calls(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }
}

fn uploaded() -> Blueprint {
    serde_json::from_value(json!({
        "name": "home",
        "components": [
            { "type": "button", "text": "Buy", "bbox": { "x": 0, "y": 0, "width": 100, "height": 40 } }
        ]
    }))
    .unwrap()
}

#[async_trait]
impl BlueprintService for SampleBackend {
    async fn convert(&self, _image: &ImagePayload) -> ServiceResult<Blueprint> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        Ok(uploaded())
    }

    async fn generate(&self, _blueprint: &Blueprint) -> ServiceResult<GeneratedFiles> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        Ok([("App.tsx", "...")].into_iter().collect())
    }

    async fn enhance(&self, blueprint: &Blueprint, _command: &str) -> ServiceResult<Enhancement> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        let mut patched = blueprint.clone();
        if let Some(bbox) = patched.components[0].bbox.as_mut() {
            bbox.width = 150.0;
        }
        Ok(Enhancement {
            patched_blueprint: patched,
            summary: "Resized button".to_string(),
        })
    }
}

fn studio() -> (Studio, Arc<SampleBackend>) {
    let store = Arc::new(PageStore::new(["home", "about"]).unwrap());
    let backend = Arc::new(SampleBackend::default());
    (Studio::new(store, backend.clone()), backend)
}

#[tokio::test]
async fn upload_generate_edit() {
    let (studio, backend) = studio();

    studio
        .upload("home", &ImagePayload::new("home.png", vec![0xff; 32]))
        .await
        .unwrap();
    let state = studio.store().get("home").unwrap();
    assert_eq!(state.blueprint.as_ref().unwrap().components.len(), 1);

    studio.generate("home").await.unwrap();
    assert_eq!(
        render_page(studio.store(), "home", ViewMode::Auto).unwrap(),
        View::GeneratedSummary {
            file_names: vec!["App.tsx".to_string()]
        }
    );

    let outcome = studio.edit("home", "make button bigger").await.unwrap();
    assert_eq!(outcome.summary, "Resized button");

    let state = studio.store().get("home").unwrap();
    assert_eq!(state.history.len(), 1);
    assert_eq!(state.history[0], uploaded());
    assert_eq!(state.history[0].components[0].bbox, Some(BBox::new(0.0, 0.0, 100.0, 40.0)));
    assert_eq!(
        state.blueprint.unwrap().components[0].bbox.unwrap().width,
        150.0
    );
    assert_eq!(backend.calls(), 3);
}

#[tokio::test]
async fn edit_without_upload_is_local() {
    let (studio, backend) = studio();

    let err = studio.edit("home", "make button bigger").await.unwrap_err();

    assert!(matches!(err, BlueprintError::NoActiveDocument(_)));
    assert_eq!(backend.calls(), 0);
}

#[tokio::test]
async fn concurrent_pages_stay_independent() {
    let (studio, _backend) = studio();
    studio.store().set_blueprint("about", Blueprint::new("about").with_component(Component::new("text"))).unwrap();
    let about_before = studio.store().get("about").unwrap();

    let image = ImagePayload::new("home.png", vec![1; 8]);
    let (upload, generate) = futures::future::join(studio.upload("home", &image), studio.generate("about")).await;
    upload.unwrap();
    generate.unwrap();

    let about = studio.store().get("about").unwrap();
    assert_eq!(about.blueprint, about_before.blueprint);
    assert_eq!(about.history, about_before.history);
    assert!(studio.store().get("home").unwrap().generated.is_none());

    let ids: Vec<String> = studio.store().list_pages().map(|p| p.id).collect();
    assert_eq!(ids, vec!["home", "about"]);
}
