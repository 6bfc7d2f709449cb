use image::GrayImage;
use shared::{Method, Metrics, PredictionResult};

use super::{Predictor, PredictorError, reject, round_to};
use crate::codec::CanonicalImage;
use crate::findings;
use crate::validation::{ChannelSimilarityValidator, UltrasoundValidator};
use crate::vision::{self, HoughParams};

const HOUGH: HoughParams = HoughParams {
    blur_sigma: 2.0,
    min_dist: 15.0,
    canny_high: 50.0,
    acc_threshold: 25,
    min_radius: 3,
    max_radius: 25,
};

const PCOS_FOLLICLES: usize = 12;
const PCOS_TEXTURE: f64 = 0.6;

/// Follicle count plus a texture score, both from classical image features.
#[derive(Debug, Clone, Default)]
pub struct PretrainedHeuristic {
    validator: ChannelSimilarityValidator,
}

impl PretrainedHeuristic {
    pub fn new() -> Self {
        Self::default()
    }
}

/// Weighted brightness, contrast and edge density, in `[0, 1]`.
pub fn texture_score(gray: &GrayImage) -> f64 {
    let stats = vision::intensity_stats(gray);
    let intensity = (stats.mean / 150.0).min(1.0);
    let spread = (stats.std_dev / 50.0).min(1.0);
    let edges = (vision::edge_density(gray, 50.0, 150.0) * 10.0).min(1.0);
    intensity * 0.3 + spread * 0.3 + edges * 0.4
}

impl Predictor for PretrainedHeuristic {
    fn method(&self) -> Method {
        Method::PretrainedHeuristic
    }

    fn analyze(&self, image: &CanonicalImage) -> Result<PredictionResult, PredictorError> {
        let validation = self.validator.validate(image);
        if !validation.is_ultrasound {
            return Ok(reject(self.method(), &validation));
        }

        let gray = image.to_gray();
        let follicles = vision::detect_circles(&gray, &HOUGH).len();
        let texture = texture_score(&gray);

        let pcos_detected = follicles >= PCOS_FOLLICLES || texture > PCOS_TEXTURE;
        let confidence = (50 + 3 * follicles as u32 + (texture * 30.0).floor() as u32).min(95);
        log::debug!(
            "Heuristic: {} follicles, texture {:.3}, confidence {}",
            follicles,
            texture,
            confidence
        );

        let report = findings::heuristic::report(pcos_detected, confidence, follicles, texture);
        let metrics = Metrics::new()
            .with("follicleCount", follicles)
            .with("textureScore", round_to(texture, 2));
        Ok(PredictionResult::success(
            self.method(),
            report.into_analysis(pcos_detected, confidence),
            metrics,
        ))
    }
}
