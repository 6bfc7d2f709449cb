use std::sync::Arc;

use shared::{Method, Metrics, PredictionResult};

use super::{FOLLICLE_HOUGH, Predictor, PredictorError, reject};
use crate::caption::CaptionService;
use crate::codec::CanonicalImage;
use crate::findings;
use crate::findings::caption::CaptionTier;
use crate::validation::CaptionValidator;
use crate::vision;

const PCOS_KEYWORDS: &[&str] = &[
    "multiple",
    "cyst",
    "cysts",
    "follicle",
    "follicles",
    "polycystic",
    "enlarged",
    "ovary",
    "ovarian",
];

/// Circles needed before the image counts as showing multiple structures.
const STRUCTURAL_MIN_CIRCLES: usize = 8;

/// Interprets an image caption from a hosted vision model, backed by a
/// structural circle count.
pub struct CaptionAnalyzer {
    validator: CaptionValidator,
}

impl CaptionAnalyzer {
    pub fn new(captioner: Arc<dyn CaptionService>) -> Self {
        Self {
            validator: CaptionValidator::new(captioner),
        }
    }
}

pub fn keyword_hits(caption: &str) -> usize {
    let lowered = caption.to_lowercase();
    PCOS_KEYWORDS.iter().filter(|k| lowered.contains(*k)).count()
}

fn tier(hits: usize, structural: bool) -> (CaptionTier, u32) {
    if hits >= 2 || structural {
        let bonus = if structural { 20 } else { 0 };
        let confidence = (60 + 10 * hits as u32 + bonus).min(85);
        (CaptionTier::Indicated { keyword_hits: hits }, confidence)
    } else if hits == 1 {
        (CaptionTier::Borderline, 50)
    } else {
        (CaptionTier::Clear, 70)
    }
}

impl Predictor for CaptionAnalyzer {
    fn method(&self) -> Method {
        Method::CaptionAnalyzer
    }

    fn analyze(&self, image: &CanonicalImage) -> Result<PredictionResult, PredictorError> {
        // One caption serves both the gate and the interpretation.
        let lookup = self.validator.fetch_caption(image);
        let validation = self.validator.judge(image, &lookup);
        let caption = lookup.text();
        if !validation.is_ultrasound {
            return Ok(reject(self.method(), &validation));
        }

        let circles = vision::detect_circles(&image.to_gray(), &FOLLICLE_HOUGH).len();
        let structural = circles >= STRUCTURAL_MIN_CIRCLES;

        let (pcos_detected, confidence, report, hits) = match caption {
            Some(text) => {
                let hits = keyword_hits(text);
                let (tier, confidence) = tier(hits, structural);
                let detected = !matches!(tier, CaptionTier::Clear);
                (detected, confidence, findings::caption::caption_report(tier, confidence), hits)
            }
            None => {
                let confidence = if structural { 65 } else { 60 };
                (structural, confidence, findings::caption::structural_report(structural, confidence), 0)
            }
        };

        let metrics = Metrics::new()
            .with("imageDescription", caption.unwrap_or("Basic analysis performed"))
            .with("keywordHits", hits)
            .with("structuralMatch", structural)
            .with("captionAvailable", caption.is_some());

        Ok(PredictionResult::success(
            self.method(),
            report.into_analysis(pcos_detected, confidence),
            metrics,
        ))
    }
}
