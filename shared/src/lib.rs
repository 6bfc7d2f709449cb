use std::collections::BTreeMap;

use chrono::{DateTime, Utc};
use derive_more::{Deref, DerefMut, From};
use serde::{Deserialize, Serialize};
use serde_json::Value;
use strum_macros::{AsRefStr, Display, EnumIter};

pub use strum::IntoEnumIterator;

/// Image-analysis methods, declared in cascade priority order.
#[derive(
    Debug,
    Clone,
    Copy,
    PartialEq,
    Eq,
    Hash,
    PartialOrd,
    Ord,
    Serialize,
    Deserialize,
    Display,
    AsRefStr,
    EnumIter,
)]
#[serde(rename_all = "camelCase")]
#[strum(serialize_all = "camelCase")]
pub enum Method {
    TransformerClassifier,
    PretrainedHeuristic,
    CaptionAnalyzer,
    CnnClassifier,
    FollicleCounter,
}

impl Method {
    pub fn label(&self) -> &'static str {
        match self {
            Method::TransformerClassifier => "Vision Transformer Classifier",
            Method::PretrainedHeuristic => "Pre-trained Medical AI Model",
            Method::CaptionAnalyzer => "Vision Captioning AI",
            Method::CnnClassifier => "CNN Deep Learning Model",
            Method::FollicleCounter => "Computer Vision Analysis",
        }
    }
}

#[derive(Serialize, Deserialize, Clone, Debug, Default)]
pub struct AnalyzeImageRequest {
    pub image: Option<String>,
}

/// Auxiliary diagnostics attached to a prediction.
#[derive(Serialize, Deserialize, Clone, Debug, Default, PartialEq, Deref, DerefMut, From)]
#[serde(transparent)]
pub struct Metrics(BTreeMap<String, Value>);

impl Metrics {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with(mut self, key: &str, value: impl Into<Value>) -> Self {
        self.0.insert(key.to_string(), value.into());
        self
    }
}

#[derive(Serialize, Deserialize, Clone, Debug, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct Analysis {
    pub pcos_detected: bool,
    pub confidence: u8,
    pub findings: Vec<String>,
    pub recommendations: Vec<String>,
    pub disclaimer: String,
}

impl Analysis {
    pub fn new(
        pcos_detected: bool,
        confidence: u32,
        findings: Vec<String>,
        recommendations: Vec<String>,
        disclaimer: impl Into<String>,
    ) -> Self {
        Self {
            pcos_detected,
            confidence: confidence.min(100) as u8,
            findings,
            recommendations,
            disclaimer: disclaimer.into(),
        }
    }
}

/// The result every predictor returns, successful or not.
#[derive(Serialize, Deserialize, Clone, Debug, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct PredictionResult {
    pub success: bool,
    pub is_ultrasound: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub details: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub analysis: Option<Analysis>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub metrics: Option<Metrics>,
    pub method: Method,
}

impl PredictionResult {
    pub fn success(method: Method, analysis: Analysis, metrics: Metrics) -> Self {
        Self {
            success: true,
            is_ultrasound: true,
            error: None,
            details: None,
            analysis: Some(analysis),
            metrics: Some(metrics),
            method,
        }
    }

    /// The image is not an ultrasound; nothing PCOS-specific was attempted.
    pub fn rejected(method: Method, reason: impl Into<String>, details: impl Into<String>) -> Self {
        Self {
            success: false,
            is_ultrasound: false,
            error: Some(reason.into()),
            details: Some(details.into()),
            analysis: None,
            metrics: None,
            method,
        }
    }

    /// A method-level failure on an image that was not ruled out as an ultrasound.
    pub fn failed(method: Method, error: impl Into<String>) -> Self {
        Self {
            success: false,
            is_ultrasound: true,
            error: Some(error.into()),
            details: None,
            analysis: None,
            metrics: None,
            method,
        }
    }

    pub fn is_consistent(&self) -> bool {
        match (&self.analysis, self.success) {
            (Some(analysis), true) => self.is_ultrasound && analysis.confidence <= 100,
            (None, false) => self.error.is_some(),
            _ => false,
        }
    }
}

#[derive(Serialize, Deserialize, Clone, Debug, PartialEq, Eq)]
#[serde(rename_all = "camelCase", tag = "status", content = "error")]
pub enum AttemptOutcome {
    Skipped,
    Succeeded,
    Rejected(String),
    Failed(String),
    Panicked(String),
}

impl AttemptOutcome {
    pub fn error(&self) -> Option<&str> {
        match self {
            AttemptOutcome::Rejected(e) | AttemptOutcome::Failed(e) | AttemptOutcome::Panicked(e) => {
                Some(e)
            }
            AttemptOutcome::Skipped | AttemptOutcome::Succeeded => None,
        }
    }
}

#[derive(Serialize, Deserialize, Clone, Debug, PartialEq, Eq)]
#[serde(rename_all = "camelCase")]
pub struct MethodAttempt {
    pub method: Method,
    pub outcome: AttemptOutcome,
}

/// Which methods initialized at startup, in cascade priority order.
#[derive(Serialize, Deserialize, Clone, Debug, PartialEq, Eq, Default)]
#[serde(rename_all = "camelCase")]
pub struct AvailabilityMap {
    pub transformer_classifier: bool,
    pub pretrained_heuristic: bool,
    pub caption_analyzer: bool,
    pub cnn_classifier: bool,
    pub follicle_counter: bool,
}

impl AvailabilityMap {
    pub fn get(&self, method: Method) -> bool {
        match method {
            Method::TransformerClassifier => self.transformer_classifier,
            Method::PretrainedHeuristic => self.pretrained_heuristic,
            Method::CaptionAnalyzer => self.caption_analyzer,
            Method::CnnClassifier => self.cnn_classifier,
            Method::FollicleCounter => self.follicle_counter,
        }
    }

    pub fn set(&mut self, method: Method, available: bool) {
        let slot = match method {
            Method::TransformerClassifier => &mut self.transformer_classifier,
            Method::PretrainedHeuristic => &mut self.pretrained_heuristic,
            Method::CaptionAnalyzer => &mut self.caption_analyzer,
            Method::CnnClassifier => &mut self.cnn_classifier,
            Method::FollicleCounter => &mut self.follicle_counter,
        };
        *slot = available;
    }
}

#[derive(Serialize, Deserialize, Clone, Debug, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct ModelAvailability {
    #[serde(flatten)]
    pub methods: AvailabilityMap,
    pub recommendation: String,
    pub loaded_at: DateTime<Utc>,
}

#[derive(Serialize, Deserialize, Clone, Debug, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct ExhaustionReport {
    pub success: bool,
    pub error: String,
    pub details: String,
    pub available_methods: AvailabilityMap,
    pub attempts: Vec<MethodAttempt>,
    pub help: String,
}

#[derive(Serialize, Deserialize, Clone, Debug)]
pub struct ErrorResponse {
    pub success: bool,
    pub error: String,
}

impl ErrorResponse {
    pub fn new(error: impl Into<String>) -> Self {
        Self {
            success: false,
            error: error.into(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn methods_iterate_in_priority_order() {
        let order: Vec<Method> = Method::iter().collect();
        assert_eq!(order.first(), Some(&Method::TransformerClassifier));
        assert_eq!(order.last(), Some(&Method::FollicleCounter));
        assert_eq!(Method::CnnClassifier.to_string(), "cnnClassifier");
    }

    #[test]
    fn constructors_keep_results_consistent() {
        let analysis = Analysis::new(true, 250, vec![], vec![], "d");
        assert_eq!(analysis.confidence, 100);
        let ok = PredictionResult::success(Method::FollicleCounter, analysis, Metrics::new());
        assert!(ok.is_consistent());
        assert!(PredictionResult::rejected(Method::FollicleCounter, "no", "why").is_consistent());
        assert!(PredictionResult::failed(Method::CnnClassifier, "boom").is_consistent());

        let mut broken = PredictionResult::failed(Method::CnnClassifier, "boom");
        broken.success = true;
        assert!(!broken.is_consistent());
    }

    #[test]
    fn wire_shape_is_camel_case() {
        let result = PredictionResult::rejected(Method::PretrainedHeuristic, "Not a valid ultrasound image", "grey please");
        let value = serde_json::to_value(&result).unwrap();
        assert_eq!(
            value,
            json!({
                "success": false,
                "isUltrasound": false,
                "error": "Not a valid ultrasound image",
                "details": "grey please",
                "method": "pretrainedHeuristic"
            })
        );
    }

    #[test]
    fn availability_flattens_methods() {
        let mut methods = AvailabilityMap::default();
        methods.set(Method::FollicleCounter, true);
        assert!(methods.get(Method::FollicleCounter));
        let status = ModelAvailability {
            methods,
            recommendation: "basic".into(),
            loaded_at: Utc::now(),
        };
        let value = serde_json::to_value(&status).unwrap();
        assert_eq!(value["follicleCounter"], true);
        assert_eq!(value["captionAnalyzer"], false);
        assert!(value["loadedAt"].is_string());
    }

    #[test]
    fn attempt_outcome_is_tagged() {
        let attempt = MethodAttempt {
            method: Method::CaptionAnalyzer,
            outcome: AttemptOutcome::Failed("timeout".into()),
        };
        assert_eq!(
            serde_json::to_value(&attempt).unwrap(),
            json!({ "method": "captionAnalyzer", "outcome": { "status": "failed", "error": "timeout" } })
        );
        assert_eq!(AttemptOutcome::Skipped.error(), None);
    }
}
