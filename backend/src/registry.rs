//! Startup construction of every predictor and the availability snapshot.

use std::path::Path;
use std::sync::Arc;

use chrono::Utc;
use shared::{AvailabilityMap, ModelAvailability};

use crate::caption::{CaptionService, HuggingFaceCaptioner};
use crate::cascade::{Cascade, CascadeOutcome};
use crate::codec::{CodecError, ImagePayload};
use crate::config::AppConfig;
use crate::inference::{self, ClassifierBackend};
use crate::predictors::{
    CaptionAnalyzer, ClassIndices, CnnClassifier, FollicleCounter, LabelMap, PretrainedHeuristic,
    TransformerClassifier,
};

const TRANSFORMER_MODEL_FILE: &str = "model.pt";
const LABEL_MAP_FILE: &str = "label_map.json";

/// Immutable after startup; shared by every request.
pub struct Registry {
    cascade: Cascade,
    availability: ModelAvailability,
}

impl Registry {
    /// Loads whatever artifacts exist. Never fails: missing pieces are
    /// logged and reported as unavailable.
    pub fn load(config: &AppConfig) -> Self {
        let captioner: Option<Arc<dyn CaptionService>> =
            match HuggingFaceCaptioner::new(&config.caption, config.caption.api_key()) {
                Ok(client) => {
                    log::info!("Caption service configured at {}", client.url());
                    Some(Arc::new(client))
                }
                Err(e) => {
                    log::warn!("Caption service not available: {}", e);
                    None
                }
            };
        Self::assemble(config, captioner)
    }

    /// Like `load`, with the caption service supplied by the caller.
    pub fn assemble(config: &AppConfig, captioner: Option<Arc<dyn CaptionService>>) -> Self {
        let models = &config.models;
        let mut cascade = Cascade::new();

        let transformer_dir = models.resolve(&models.transformer);
        if let Some(backend) = load_backend("Transformer", &transformer_dir.join(TRANSFORMER_MODEL_FILE)) {
            let labels = load_optional(&transformer_dir.join(LABEL_MAP_FILE), LabelMap::load);
            cascade.register(Box::new(TransformerClassifier::new(backend, labels)));
        }

        cascade.register(Box::new(PretrainedHeuristic::new()));

        if let Some(captioner) = captioner {
            cascade.register(Box::new(CaptionAnalyzer::new(captioner)));
        }

        if let Some(backend) = load_backend("CNN", &models.resolve(&models.cnn)) {
            let indices = load_optional(&models.resolve(&models.class_indices), ClassIndices::load);
            cascade.register(Box::new(CnnClassifier::new(backend, indices)));
        }

        cascade.register(Box::new(FollicleCounter::new(config.analysis.follicle_threshold)));

        Self::from_cascade(cascade)
    }

    pub fn from_cascade(cascade: Cascade) -> Self {
        let methods = cascade.availability();
        let availability = ModelAvailability {
            recommendation: recommendation(&methods).to_string(),
            methods,
            loaded_at: Utc::now(),
        };
        log::info!("Image analysis status: {}", availability.recommendation);
        Self {
            cascade,
            availability,
        }
    }

    pub fn availability(&self) -> &ModelAvailability {
        &self.availability
    }

    pub fn analyze_image(&self, payload: &ImagePayload) -> Result<CascadeOutcome, CodecError> {
        self.cascade.analyze_image(payload)
    }
}

fn load_backend(name: &str, path: &Path) -> Option<Arc<dyn ClassifierBackend>> {
    if !path.exists() {
        log::warn!("{} model not found at {}", name, path.display());
        return None;
    }
    match inference::load_torchscript(path) {
        Ok(backend) => {
            log::info!("{} model loaded from {}", name, path.display());
            Some(backend)
        }
        Err(e) => {
            log::warn!("{} model not available: {}", name, e);
            None
        }
    }
}

/// Reads an optional side file, falling back to the default when it is
/// absent or unreadable.
fn load_optional<T, E, F>(path: &Path, load: F) -> T
where
    T: Default,
    E: std::fmt::Display,
    F: FnOnce(&Path) -> Result<T, E>,
{
    if !path.exists() {
        return T::default();
    }
    load(path).unwrap_or_else(|e| {
        log::warn!("Ignoring {}: {}", path.display(), e);
        T::default()
    })
}

/// Status line for the best method that is up.
pub fn recommendation(methods: &AvailabilityMap) -> &'static str {
    if methods.transformer_classifier {
        "🎉 Vision Transformer PCOS model operational (trained on real data) - best accuracy"
    } else if methods.pretrained_heuristic {
        "✅ Pre-trained PCOS detector operational"
    } else if methods.caption_analyzer {
        "✅ Vision captioning AI operational"
    } else if methods.cnn_classifier {
        "✅ Local CNN model operational"
    } else if methods.follicle_counter {
        "⚠️ Only basic CV available"
    } else {
        "❌ No image analysis available. Add model artifacts and restart"
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn config_in(dir: &Path) -> AppConfig {
        let mut config = AppConfig::default();
        config.models.dir = dir.to_path_buf();
        config
    }

    #[test]
    fn missing_artifacts_leave_local_methods() {
        let dir = tempfile::tempdir().unwrap();
        let registry = Registry::assemble(&config_in(dir.path()), None);
        let status = registry.availability();
        assert!(!status.methods.transformer_classifier);
        assert!(!status.methods.cnn_classifier);
        assert!(!status.methods.caption_analyzer);
        assert!(status.methods.pretrained_heuristic);
        assert!(status.methods.follicle_counter);
        assert_eq!(status.recommendation, "✅ Pre-trained PCOS detector operational");
    }

    #[cfg(not(feature = "torch"))]
    #[test]
    fn present_artifact_without_torch_stays_unavailable() {
        let dir = tempfile::tempdir().unwrap();
        std::fs::write(dir.path().join("pcos_cnn_model.pt"), b"not a model").unwrap();
        let registry = Registry::assemble(&config_in(dir.path()), None);
        assert!(!registry.availability().methods.cnn_classifier);
    }

    #[test]
    fn recommendation_prefers_best_method() {
        let mut map = AvailabilityMap::default();
        assert!(recommendation(&map).starts_with("❌"));
        map.follicle_counter = true;
        assert_eq!(recommendation(&map), "⚠️ Only basic CV available");
        map.cnn_classifier = true;
        assert_eq!(recommendation(&map), "✅ Local CNN model operational");
    }

    #[test]
    fn malformed_side_file_falls_back_to_default() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("class_indices.json");
        std::fs::write(&path, b"{ not json").unwrap();
        let indices = load_optional(&path, ClassIndices::load);
        assert_eq!(indices, ClassIndices::default());
    }
}
