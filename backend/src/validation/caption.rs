use std::sync::Arc;

use super::{GrayscaleSampleValidator, UltrasoundValidator, ValidationResult};
use crate::caption::{CaptionError, CaptionService};
use crate::codec::CanonicalImage;

const ULTRASOUND_KEYWORDS: &[&str] = &[
    "ultrasound",
    "sonogram",
    "medical",
    "scan",
    "imaging",
    "ovary",
    "ovarian",
    "uterus",
    "pelvic",
    "grayscale",
    "black and white",
    "medical image",
    "diagnostic",
];

/// What the caption service produced for one image.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum CaptionLookup {
    Caption(String),
    /// The service answered with a non-success status.
    Refused,
    /// The request could not be built, sent or parsed.
    Failed,
}

impl CaptionLookup {
    pub fn text(&self) -> Option<&str> {
        match self {
            CaptionLookup::Caption(text) => Some(text.as_str()),
            _ => None,
        }
    }
}

/// Caption keywords first, grayscale sampling second.
///
/// When the caption service is unreachable the decision falls back to the
/// grayscale sample alone.
pub struct CaptionValidator {
    captioner: Arc<dyn CaptionService>,
    grayscale: GrayscaleSampleValidator,
}

impl CaptionValidator {
    pub fn new(captioner: Arc<dyn CaptionService>) -> Self {
        Self {
            captioner,
            grayscale: GrayscaleSampleValidator::default(),
        }
    }

    /// Asks the caption service about `image`. Anything but a caption means
    /// the service is degraded.
    pub fn fetch_caption(&self, image: &CanonicalImage) -> CaptionLookup {
        let png = match image.encode_png() {
            Ok(png) => png,
            Err(e) => {
                log::warn!("Could not encode image for captioning: {}", e);
                return CaptionLookup::Failed;
            }
        };
        match self.captioner.caption(&png) {
            Ok(caption) => CaptionLookup::Caption(caption),
            Err(CaptionError::Status(status)) => {
                log::warn!("Caption service answered {}, using grayscale check", status);
                CaptionLookup::Refused
            }
            Err(e) => {
                log::warn!("Caption service degraded, using grayscale check: {}", e);
                CaptionLookup::Failed
            }
        }
    }

    pub fn judge(&self, image: &CanonicalImage, lookup: &CaptionLookup) -> ValidationResult {
        let grayscale = self.grayscale.validate(image);
        match lookup {
            CaptionLookup::Caption(text) => {
                let lowered = text.to_lowercase();
                let medical = ULTRASOUND_KEYWORDS.iter().any(|k| lowered.contains(k));
                if grayscale.is_ultrasound || medical {
                    let confidence = if medical { 0.9 } else { grayscale.confidence };
                    ValidationResult::new(true, confidence, "Image appears to be a medical ultrasound")
                } else {
                    ValidationResult::new(
                        false,
                        grayscale.confidence,
                        format!(
                            "Image does not appear to be an ultrasound. Detected: {}",
                            lowered
                        ),
                    )
                }
            }
            CaptionLookup::Refused => grayscale,
            CaptionLookup::Failed => {
                let reason = if grayscale.is_ultrasound {
                    "Image has ultrasound-like characteristics"
                } else {
                    "Could not validate image as ultrasound"
                };
                ValidationResult::new(grayscale.is_ultrasound, grayscale.confidence, reason)
            }
        }
    }
}

impl UltrasoundValidator for CaptionValidator {
    fn validate(&self, image: &CanonicalImage) -> ValidationResult {
        let lookup = self.fetch_caption(image);
        self.judge(image, &lookup)
    }
}
