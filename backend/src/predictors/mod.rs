//! The five image-analysis methods behind one contract.

pub mod caption;
pub mod cnn;
pub mod follicle;
pub mod heuristic;
pub mod transformer;

pub use caption::CaptionAnalyzer;
pub use cnn::{ClassIndices, CnnClassifier};
pub use follicle::FollicleCounter;
pub use heuristic::PretrainedHeuristic;
pub use transformer::{LabelMap, TransformerClassifier};

use shared::{Method, PredictionResult};

use crate::caption::CaptionError;
use crate::codec::{CanonicalImage, CodecError};
use crate::inference::InferenceError;
use crate::validation::ValidationResult;
use crate::vision::HoughParams;

pub const MODEL_INPUT_SIZE: u32 = 224;

const VALID_IMAGE_HINT: &str =
    "Please upload a grayscale ultrasound image showing the ovarian region";

/// Circle detection used for follicle counting and structural checks.
pub const FOLLICLE_HOUGH: HoughParams = HoughParams {
    blur_sigma: 2.0,
    min_dist: 20.0,
    canny_high: 50.0,
    acc_threshold: 30,
    min_radius: 5,
    max_radius: 30,
};

#[derive(Debug, thiserror::Error)]
pub enum PredictorError {
    #[error(transparent)]
    Codec(#[from] CodecError),
    #[error(transparent)]
    Inference(#[from] InferenceError),
    #[error(transparent)]
    Caption(#[from] CaptionError),
}

pub trait Predictor: Send + Sync {
    fn method(&self) -> Method;

    /// Runs the method; `Err` is reserved for failures on a plausible ultrasound.
    fn analyze(&self, image: &CanonicalImage) -> Result<PredictionResult, PredictorError>;

    /// Like `analyze`, but folds errors into a failed result that lets the
    /// cascade move on.
    fn predict(&self, image: &CanonicalImage) -> PredictionResult {
        match self.analyze(image) {
            Ok(result) => result,
            Err(e) => {
                log::warn!("{} failed: {}", self.method(), e);
                PredictionResult::failed(
                    self.method(),
                    format!("{} failed: {}", self.method().label(), e),
                )
            }
        }
    }
}

pub(crate) fn reject(method: Method, validation: &ValidationResult) -> PredictionResult {
    PredictionResult::rejected(
        method,
        "Not a valid ultrasound image",
        format!("{}. {}", validation.reason, VALID_IMAGE_HINT),
    )
}

/// Rounds to `places` decimals for display in metrics.
pub(crate) fn round_to(value: f64, places: i32) -> f64 {
    let factor = 10f64.powi(places);
    (value * factor).round() / factor
}
