//! Scripted provider for tests.
//!
//! Texts registered with [`StaticProvider::with`] return their fixed vector;
//! anything else gets a deterministic vector derived from its SHA-256.

use std::collections::HashMap;
use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};

use async_trait::async_trait;
use ndarray::Array1;
use parking_lot::Mutex;
use sha2::{Digest, Sha256};

use crate::embedder::EmbeddingProvider;
use supermatch_core::{Error, Result};

pub struct StaticProvider {
    dimension: usize,
    vectors: Mutex<HashMap<String, Array1<f32>>>,
    inputs: Mutex<Vec<String>>,
    calls: AtomicUsize,
    failing: AtomicBool,
}

impl StaticProvider {
    pub fn new(dimension: usize) -> Self {
        Self {
            dimension,
            vectors: Mutex::new(HashMap::new()),
            inputs: Mutex::new(Vec::new()),
            calls: AtomicUsize::new(0),
            failing: AtomicBool::new(false),
        }
    }

    /// Builder form of [`set`](Self::set).
    pub fn with(self, text: &str, vector: Array1<f32>) -> Self {
        self.set(text, vector);
        self
    }

    pub fn set(&self, text: &str, vector: Array1<f32>) {
        self.vectors.lock().insert(text.to_string(), vector);
    }

    /// While set, every call fails with an upstream error.
    pub fn set_failing(&self, failing: bool) {
        self.failing.store(failing, Ordering::SeqCst);
    }

    /// Number of `embed` calls so far, failed ones included.
    pub fn calls(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }

    /// Every text passed to `embed`, in call order.
    pub fn inputs(&self) -> Vec<String> {
        self.inputs.lock().clone()
    }

    fn hashed_vector(&self, text: &str) -> Array1<f32> {
        let digest = Sha256::digest(text.as_bytes());
        Array1::from_iter(
            (0..self.dimension).map(|i| digest[i % digest.len()] as f32 / 255.0 + 0.01),
        )
    }
}

#[async_trait]
impl EmbeddingProvider for StaticProvider {
    async fn embed(&self, text: &str) -> Result<Array1<f32>> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        self.inputs.lock().push(text.to_string());
        if self.failing.load(Ordering::SeqCst) {
            return Err(Error::Embedding("static provider set to fail".into()));
        }
        let scripted = self.vectors.lock().get(text).cloned();
        Ok(scripted.unwrap_or_else(|| self.hashed_vector(text)))
    }

    fn dimension(&self) -> usize {
        self.dimension
    }

    fn model(&self) -> &str {
        "static"
    }
}
