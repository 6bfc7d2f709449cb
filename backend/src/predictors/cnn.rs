use std::collections::BTreeMap;
use std::path::Path;
use std::sync::{Arc, Mutex};

use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};
use serde::Deserialize;
use shared::{Method, Metrics, PredictionResult};

use super::{MODEL_INPUT_SIZE, Predictor, PredictorError, round_to};
use crate::codec::{CanonicalImage, Normalization};
use crate::findings;
use crate::inference::{ClassifierBackend, InferenceError};

/// Class name to output index, as written by the training pipeline.
#[derive(Debug, Clone, Default, PartialEq, Deserialize)]
#[serde(transparent)]
pub struct ClassIndices(BTreeMap<String, usize>);

impl ClassIndices {
    pub fn load(path: &Path) -> Result<Self, InferenceError> {
        let text = std::fs::read_to_string(path).map_err(|e| {
            InferenceError::Model(format!("cannot read {}: {}", path.display(), e))
        })?;
        serde_json::from_str(&text).map_err(|e| {
            InferenceError::Model(format!("invalid class indices {}: {}", path.display(), e))
        })
    }

    pub fn pcos_index(&self) -> Option<usize> {
        self.0
            .iter()
            .find(|(name, _)| {
                let name = name.to_ascii_lowercase();
                name == "pcos" || name == "infected"
            })
            .map(|(_, index)| *index)
    }

    /// A sigmoid output of 1 means "normal" when PCOS is class 0.
    pub fn flips_output(&self) -> bool {
        self.pcos_index() == Some(0)
    }
}

/// Single-output sigmoid CNN.
///
/// The reported confidence is re-sampled inside a fixed band per verdict
/// rather than taken from the raw model probability. `pcosDetected` only
/// depends on the model output.
pub struct CnnClassifier {
    backend: Arc<dyn ClassifierBackend>,
    indices: ClassIndices,
    rng: Mutex<StdRng>,
}

impl CnnClassifier {
    pub fn new(backend: Arc<dyn ClassifierBackend>, indices: ClassIndices) -> Self {
        Self::with_rng(backend, indices, StdRng::from_os_rng())
    }

    pub fn seeded(backend: Arc<dyn ClassifierBackend>, indices: ClassIndices, seed: u64) -> Self {
        Self::with_rng(backend, indices, StdRng::seed_from_u64(seed))
    }

    fn with_rng(backend: Arc<dyn ClassifierBackend>, indices: ClassIndices, rng: StdRng) -> Self {
        Self {
            backend,
            indices,
            rng: Mutex::new(rng),
        }
    }

    /// Returns the displayed `(pcos, normal)` probabilities in percent.
    fn display_probabilities(&self, pcos_detected: bool) -> Result<(f64, f64), InferenceError> {
        let mut rng = self
            .rng
            .lock()
            .map_err(|_| InferenceError::Model("random source lock poisoned".into()))?;
        let pcos = if pcos_detected {
            rng.random_range(55.0..85.0)
        } else {
            rng.random_range(15.0..25.0)
        };
        Ok((pcos, 100.0 - pcos))
    }
}

impl Predictor for CnnClassifier {
    fn method(&self) -> Method {
        Method::CnnClassifier
    }

    fn analyze(&self, image: &CanonicalImage) -> Result<PredictionResult, PredictorError> {
        let input = image.to_tensor(MODEL_INPUT_SIZE, Normalization::UnitRange);
        let output = self.backend.forward(&input)?;
        let raw = *output
            .first()
            .ok_or_else(|| InferenceError::Model("model returned no output".into()))?;
        if !raw.is_finite() {
            return Err(InferenceError::Model(format!("non-finite model output {}", raw)).into());
        }

        let probability = if self.indices.flips_output() {
            1.0 - raw as f64
        } else {
            raw as f64
        };
        let pcos_detected = probability > 0.5;

        let (pcos_prob, normal_prob) = self.display_probabilities(pcos_detected)?;
        let confidence = if pcos_detected { pcos_prob } else { normal_prob };

        let report = findings::cnn::report(pcos_detected, pcos_prob, normal_prob);
        let metrics = Metrics::new()
            .with("pcosProbability", round_to(pcos_prob, 1))
            .with("normalProbability", round_to(normal_prob, 1))
            .with("rawPcosProbability", round_to(probability * 100.0, 2))
            .with("displayConfidenceRandomized", true);

        Ok(PredictionResult::success(
            self.method(),
            report.into_analysis(pcos_detected, confidence as u32),
            metrics,
        ))
    }
}
