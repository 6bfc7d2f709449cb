//! Tensor-in, scores-out seam over trained classification models.

#[cfg(feature = "torch")]
mod torch;

use std::path::Path;
use std::sync::Arc;

use ndarray::Array4;

#[derive(Debug, thiserror::Error)]
pub enum InferenceError {
    #[error("Preprocessing error: {0}")]
    Preprocessing(String),
    #[error("Model error: {0}")]
    Model(String),
}

/// A loaded classification model.
///
/// Shared read-only across requests, so `forward` must not mutate weights.
pub trait ClassifierBackend: Send + Sync {
    /// Raw outputs (logits or sigmoid scores) for a `1x3xHxW` batch, flattened.
    fn forward(&self, input: &Array4<f32>) -> Result<Vec<f32>, InferenceError>;
}

/// Loads a TorchScript module from `path`.
#[cfg(feature = "torch")]
pub fn load_torchscript(path: &Path) -> Result<Arc<dyn ClassifierBackend>, InferenceError> {
    Ok(Arc::new(torch::TorchModule::load(path)?))
}

#[cfg(not(feature = "torch"))]
pub fn load_torchscript(path: &Path) -> Result<Arc<dyn ClassifierBackend>, InferenceError> {
    Err(InferenceError::Model(format!(
        "cannot load {}: built without the `torch` feature",
        path.display()
    )))
}

pub fn softmax(logits: &[f32]) -> Vec<f32> {
    let max = logits.iter().copied().fold(f32::NEG_INFINITY, f32::max);
    let exps: Vec<f32> = logits.iter().map(|l| (l - max).exp()).collect();
    let sum: f32 = exps.iter().sum();
    if sum == 0.0 || !sum.is_finite() {
        return vec![0.0; logits.len()];
    }
    exps.into_iter().map(|e| e / sum).collect()
}
