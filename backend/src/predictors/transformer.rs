use std::collections::BTreeMap;
use std::path::Path;
use std::sync::Arc;

use serde::Deserialize;
use shared::{Method, Metrics, PredictionResult};

use super::{MODEL_INPUT_SIZE, Predictor, PredictorError, reject, round_to};
use crate::codec::{CanonicalImage, Normalization};
use crate::findings;
use crate::inference::{ClassifierBackend, InferenceError, softmax};
use crate::validation::{IntensityRangeValidator, UltrasoundValidator};

/// ViT image processors scale pixels to `[-1, 1]`.
const VIT_NORMALIZATION: Normalization = Normalization::MeanStd {
    mean: [0.5, 0.5, 0.5],
    std: [0.5, 0.5, 0.5],
};

/// Class index to label, as exported next to the model in `label_map.json`.
#[derive(Debug, Clone, Deserialize)]
pub struct LabelMap {
    id2label: BTreeMap<String, String>,
}

impl Default for LabelMap {
    fn default() -> Self {
        let id2label = [("0", "Normal"), ("1", "PCOS")]
            .into_iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect();
        Self { id2label }
    }
}

impl LabelMap {
    pub fn load(path: &Path) -> Result<Self, InferenceError> {
        let text = std::fs::read_to_string(path).map_err(|e| {
            InferenceError::Model(format!("cannot read {}: {}", path.display(), e))
        })?;
        serde_json::from_str(&text)
            .map_err(|e| InferenceError::Model(format!("invalid label map {}: {}", path.display(), e)))
    }

    pub fn label(&self, index: usize) -> Option<&str> {
        self.id2label.get(&index.to_string()).map(String::as_str)
    }
}

/// Widened before scaling so truncation matches a double-precision `int(p * 100)`.
fn percent(probability: f32) -> f64 {
    f64::from(probability) * 100.0
}

/// Two-class Normal/PCOS vision transformer.
pub struct TransformerClassifier {
    backend: Arc<dyn ClassifierBackend>,
    labels: LabelMap,
    validator: IntensityRangeValidator,
}

impl TransformerClassifier {
    pub fn new(backend: Arc<dyn ClassifierBackend>, labels: LabelMap) -> Self {
        Self {
            backend,
            labels,
            validator: IntensityRangeValidator::default(),
        }
    }
}

impl Predictor for TransformerClassifier {
    fn method(&self) -> Method {
        Method::TransformerClassifier
    }

    fn analyze(&self, image: &CanonicalImage) -> Result<PredictionResult, PredictorError> {
        let validation = self.validator.validate(image);
        if !validation.is_ultrasound {
            return Ok(reject(self.method(), &validation));
        }

        let input = image.to_tensor(MODEL_INPUT_SIZE, VIT_NORMALIZATION);
        let logits = self.backend.forward(&input)?;
        if logits.len() < 2 {
            return Err(InferenceError::Model(format!(
                "expected 2 class scores, got {}",
                logits.len()
            ))
            .into());
        }
        if logits.iter().any(|l| !l.is_finite()) {
            return Err(InferenceError::Model(format!("non-finite class scores {:?}", logits)).into());
        }
        let probs = softmax(&logits);
        // First maximum wins on ties.
        let predicted = (1..probs.len()).fold(0, |best, i| if probs[i] > probs[best] { i } else { best });
        let label = self
            .labels
            .label(predicted)
            .ok_or_else(|| InferenceError::Model(format!("no label for class {}", predicted)))?;

        let pcos_detected = label.eq_ignore_ascii_case("pcos");
        let confidence = percent(probs[predicted]);
        let normal_prob = percent(probs[0]);
        let pcos_prob = percent(probs[1]);

        let report = findings::transformer::report(pcos_detected, confidence, normal_prob, pcos_prob);
        let metrics = Metrics::new()
            .with("predictedClass", label)
            .with("normalProbability", round_to(normal_prob, 2))
            .with("pcosProbability", round_to(pcos_prob, 2))
            .with("modelType", "Vision Transformer (ViT)")
            .with("trainedOnRealData", true);

        Ok(PredictionResult::success(
            self.method(),
            report.into_analysis(pcos_detected, confidence as u32),
            metrics,
        ))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::validation::tests::{canonical, gray_gradient};
    use image::{Rgb, RgbImage};
    use ndarray::Array4;
    use std::sync::atomic::{AtomicUsize, Ordering};

    struct FixedLogits {
        logits: Vec<f32>,
        calls: AtomicUsize,
    }

    impl FixedLogits {
        fn new(logits: Vec<f32>) -> Arc<Self> {
            Arc::new(Self {
                logits,
                calls: AtomicUsize::new(0),
            })
        }
    }

    impl ClassifierBackend for FixedLogits {
        fn forward(&self, input: &Array4<f32>) -> Result<Vec<f32>, InferenceError> {
            assert_eq!(input.shape(), &[1, 3, 224, 224]);
            assert!(input.iter().all(|v| (-1.0..=1.0).contains(v)));
            self.calls.fetch_add(1, Ordering::SeqCst);
            Ok(self.logits.clone())
        }
    }

    #[test]
    fn pcos_logits_give_detection() {
        let backend = FixedLogits::new(vec![0.0, 3.0]);
        let classifier = TransformerClassifier::new(backend.clone(), LabelMap::default());
        let result = classifier.predict(&gray_gradient(64, 64));
        assert!(result.success);
        let analysis = result.analysis.as_ref().unwrap();
        assert!(analysis.pcos_detected);
        // softmax([0, 3])[1] = 0.9526
        assert_eq!(analysis.confidence, 95);
        assert!(analysis.findings[0].starts_with("Very high confidence PCOS detection"));
        let metrics = result.metrics.as_ref().unwrap();
        assert_eq!(metrics["predictedClass"], "PCOS");
        assert_eq!(metrics["pcosProbability"], 95.26);
        assert_eq!(backend.calls.load(Ordering::SeqCst), 1);
    }

    #[test]
    fn flat_image_is_rejected_before_inference() {
        let backend = FixedLogits::new(vec![0.0, 3.0]);
        let classifier = TransformerClassifier::new(backend.clone(), LabelMap::default());
        let flat = canonical(RgbImage::from_pixel(32, 32, Rgb([128, 128, 128])));
        let result = classifier.predict(&flat);
        assert!(!result.is_ultrasound);
        assert!(result.details.unwrap().starts_with("Image may not be an ultrasound"));
        assert_eq!(backend.calls.load(Ordering::SeqCst), 0);
    }

    #[test]
    fn single_score_output_is_a_soft_failure() {
        let classifier = TransformerClassifier::new(FixedLogits::new(vec![0.4]), LabelMap::default());
        let result = classifier.predict(&gray_gradient(64, 64));
        assert!(!result.success);
        assert!(result.is_ultrasound);
    }

    #[test]
    fn non_finite_scores_are_a_soft_failure() {
        for logits in [vec![f32::NAN, f32::NAN], vec![f32::INFINITY, 0.0]] {
            let classifier = TransformerClassifier::new(FixedLogits::new(logits), LabelMap::default());
            let result = classifier.predict(&gray_gradient(64, 64));
            assert!(!result.success);
            assert!(result.is_ultrasound);
            assert!(result.analysis.is_none());
            assert!(result.error.unwrap().contains("non-finite"));
        }
    }

    #[test]
    fn percent_is_scaled_in_double_precision() {
        // 0.29f32 is 0.2899999916..; scaling in f32 would round up to 29.0.
        assert_eq!(percent(0.29) as u32, 28);
        assert_eq!(percent(0.5), 50.0);
    }

    #[test]
    fn label_map_from_file() {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        std::io::Write::write_all(
            &mut file,
            br#"{"id2label": {"0": "PCOS", "1": "Normal"}, "label2id": {"PCOS": 0, "Normal": 1}}"#,
        )
        .unwrap();
        let labels = LabelMap::load(file.path()).unwrap();
        assert_eq!(labels.label(0), Some("PCOS"));
        assert_eq!(labels.label(2), None);
    }
}
