use image::GrayImage;
use shared::{Method, Metrics, PredictionResult};

use super::{FOLLICLE_HOUGH, Predictor, PredictorError, reject};
use crate::codec::CanonicalImage;
use crate::findings;
use crate::validation::{HistogramBandValidator, UltrasoundValidator};
use crate::vision;

/// Largest bright region share above which the ovary counts as enlarged.
const ENLARGED_AREA_FRACTION: f64 = 0.15;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum OvarianVolume {
    Normal,
    Enlarged,
}

impl OvarianVolume {
    pub fn as_str(&self) -> &'static str {
        match self {
            OvarianVolume::Normal => "normal",
            OvarianVolume::Enlarged => "enlarged",
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Echogenicity {
    Increased,
    Normal,
    Decreased,
}

impl Echogenicity {
    pub fn as_str(&self) -> &'static str {
        match self {
            Echogenicity::Increased => "increased",
            Echogenicity::Normal => "normal",
            Echogenicity::Decreased => "decreased",
        }
    }
}

/// Local follicle counter. Needs no model artifacts and is always available.
#[derive(Debug, Clone)]
pub struct FollicleCounter {
    threshold: u32,
    validator: HistogramBandValidator,
}

impl Default for FollicleCounter {
    fn default() -> Self {
        Self::new(12)
    }
}

impl FollicleCounter {
    pub fn new(threshold: u32) -> Self {
        Self {
            threshold: threshold.max(1),
            validator: HistogramBandValidator::default(),
        }
    }

    pub fn threshold(&self) -> u32 {
        self.threshold
    }

    pub fn confidence(&self, follicles: usize, volume: OvarianVolume, echogenicity: Echogenicity) -> u32 {
        let threshold = self.threshold as usize;
        let mut confidence = if follicles >= threshold {
            (40 + 2 * (follicles - threshold)).min(60) as f64
        } else {
            40.0 * follicles as f64 / threshold as f64
        };
        if volume == OvarianVolume::Enlarged {
            confidence += 20.0;
        }
        if echogenicity == Echogenicity::Increased {
            confidence += 20.0;
        }
        (confidence as u32).min(100)
    }
}

pub fn count_follicles(gray: &GrayImage) -> usize {
    let (min, max) = (FOLLICLE_HOUGH.min_radius as f32, FOLLICLE_HOUGH.max_radius as f32);
    vision::detect_circles(gray, &FOLLICLE_HOUGH)
        .iter()
        .filter(|c| (min..=max).contains(&c.radius.round()))
        .count()
}

pub fn ovarian_volume(gray: &GrayImage) -> OvarianVolume {
    if vision::largest_region_fraction(gray) > ENLARGED_AREA_FRACTION {
        OvarianVolume::Enlarged
    } else {
        OvarianVolume::Normal
    }
}

pub fn stromal_echogenicity(gray: &GrayImage) -> Echogenicity {
    let mean = vision::central_mean(gray);
    if mean > 150.0 {
        Echogenicity::Increased
    } else if mean < 80.0 {
        Echogenicity::Decreased
    } else {
        Echogenicity::Normal
    }
}

impl Predictor for FollicleCounter {
    fn method(&self) -> Method {
        Method::FollicleCounter
    }

    fn analyze(&self, image: &CanonicalImage) -> Result<PredictionResult, PredictorError> {
        let validation = self.validator.validate(image);
        if !validation.is_ultrasound {
            return Ok(reject(self.method(), &validation));
        }

        let gray = image.to_gray();
        let follicles = count_follicles(&gray);
        let volume = ovarian_volume(&gray);
        let echogenicity = stromal_echogenicity(&gray);

        let pcos_detected = follicles >= self.threshold as usize;
        let confidence = self.confidence(follicles, volume, echogenicity);
        log::debug!(
            "Follicle counter: {} follicles, volume {}, echogenicity {}",
            follicles,
            volume.as_str(),
            echogenicity.as_str()
        );

        let report =
            findings::follicle::report(pcos_detected, follicles, self.threshold, volume, echogenicity);
        let metrics = Metrics::new()
            .with("follicleCount", follicles)
            .with("ovarianVolume", volume.as_str())
            .with("stromalEchogenicity", echogenicity.as_str());

        Ok(PredictionResult::success(
            self.method(),
            report.into_analysis(pcos_detected, confidence),
            metrics,
        ))
    }
}
