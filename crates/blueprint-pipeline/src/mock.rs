use async_trait::async_trait;
use blueprint_common::{BBox, Blueprint, Component, GeneratedFiles};
use blueprint_services::{BlueprintService, Enhancement, ImagePayload, ServiceError, ServiceResult};
use std::collections::VecDeque;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};
use tokio::sync::Barrier;

/// Scripted service that counts every call it receives.
#[derive(Default)]
pub(crate) struct MockService {
    convert_calls: AtomicUsize,
    generate_calls: AtomicUsize,
    enhance_calls: AtomicUsize,
    converts: Mutex<VecDeque<ServiceResult<Blueprint>>>,
    generations: Mutex<VecDeque<ServiceResult<GeneratedFiles>>>,
    enhancements: Mutex<VecDeque<ServiceResult<Enhancement>>>,
    convert_gate: Option<Arc<Barrier>>,
    enhance_gate: Option<Arc<Barrier>>,
    generate_gate: Option<Arc<Barrier>>,
}

impl MockService {
    pub fn new() -> Self {
        Self::default()
    }

    /// Every enhance call waits on `gate` after picking its response.
    pub fn with_enhance_gate(mut self, gate: Arc<Barrier>) -> Self {
        self.enhance_gate = Some(gate);
        self
    }

    pub fn with_convert_gate(mut self, gate: Arc<Barrier>) -> Self {
        self.convert_gate = Some(gate);
        self
    }

    pub fn with_generate_gate(mut self, gate: Arc<Barrier>) -> Self {
        self.generate_gate = Some(gate);
        self
    }

    pub fn push_convert(&self, result: ServiceResult<Blueprint>) {
        self.converts.lock().unwrap().push_back(result);
    }

    pub fn push_generate(&self, result: ServiceResult<GeneratedFiles>) {
        self.generations.lock().unwrap().push_back(result);
    }

    pub fn push_enhance(&self, result: ServiceResult<Enhancement>) {
        self.enhancements.lock().unwrap().push_back(result);
    }

    pub fn enhance_calls(&self) -> usize {
        self.enhance_calls.load(Ordering::SeqCst)
    }

    pub fn generate_calls(&self) -> usize {
        self.generate_calls.load(Ordering::SeqCst)
    }

    pub fn total_calls(&self) -> usize {
        self.convert_calls.load(Ordering::SeqCst) + self.generate_calls() + self.enhance_calls()
    }
}

fn next<T>(queue: &Mutex<VecDeque<ServiceResult<T>>>) -> ServiceResult<T> {
    queue
        .lock()
        .unwrap()
        .pop_front()
        .unwrap_or_else(|| Err(ServiceError::Rejected("no scripted response".to_string())))
}

#[async_trait]
impl BlueprintService for MockService {
    async fn convert(&self, _image: &ImagePayload) -> ServiceResult<Blueprint> {
        self.convert_calls.fetch_add(1, Ordering::SeqCst);
        let result = next(&self.converts);
        if let Some(gate) = &self.convert_gate {
            gate.wait().await;
        }
        result
    }

    async fn generate(&self, _blueprint: &Blueprint) -> ServiceResult<GeneratedFiles> {
        self.generate_calls.fetch_add(1, Ordering::SeqCst);
        let result = next(&self.generations);
        if let Some(gate) = &self.generate_gate {
            gate.wait().await;
        }
        result
    }

    async fn enhance(&self, _blueprint: &Blueprint, _command: &str) -> ServiceResult<Enhancement> {
        self.enhance_calls.fetch_add(1, Ordering::SeqCst);
        let result = next(&self.enhancements);
        if let Some(gate) = &self.enhance_gate {
            gate.wait().await;
        }
        result
    }
}

/// One-button page used across the pipeline tests.
pub(crate) fn button_page(width: f64) -> Blueprint {
    Blueprint::new("home").with_component(
        Component::new("button")
            .with_text("Buy")
            .with_bbox(BBox::new(0.0, 0.0, width, 40.0)),
    )
}

pub(crate) fn enhancement(blueprint: Blueprint, summary: &str) -> ServiceResult<Enhancement> {
    Ok(Enhancement {
        patched_blueprint: blueprint,
        summary: summary.to_string(),
    })
}
