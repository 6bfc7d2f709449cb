//! Heuristic gates deciding whether an image is plausibly an ultrasound.

mod caption;

pub use caption::{CaptionLookup, CaptionValidator};

use serde::Serialize;

use crate::codec::CanonicalImage;
use crate::vision;

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ValidationResult {
    pub is_ultrasound: bool,
    pub confidence: f32,
    pub reason: String,
}

impl ValidationResult {
    pub fn new(is_ultrasound: bool, confidence: f32, reason: impl Into<String>) -> Self {
        Self {
            is_ultrasound,
            confidence: confidence.clamp(0.0, 1.0),
            reason: reason.into(),
        }
    }
}

pub trait UltrasoundValidator: Send + Sync {
    fn validate(&self, image: &CanonicalImage) -> ValidationResult;
}

/// Samples the first pixels in row-major order and counts the ones whose
/// channels are nearly equal.
#[derive(Debug, Clone)]
pub struct GrayscaleSampleValidator {
    pub sample_size: usize,
    pub tolerance: u8,
    pub min_ratio: f32,
}

impl Default for GrayscaleSampleValidator {
    fn default() -> Self {
        Self {
            sample_size: 1000,
            tolerance: 30,
            min_ratio: 0.7,
        }
    }
}

impl GrayscaleSampleValidator {
    pub fn gray_ratio(&self, image: &CanonicalImage) -> f32 {
        let tolerance = self.tolerance as i16;
        let mut sampled = 0usize;
        let mut gray_like = 0usize;
        for pixel in image.rgb().pixels().take(self.sample_size) {
            let [r, g, b] = pixel.0.map(i16::from);
            sampled += 1;
            if (r - g).abs() < tolerance && (g - b).abs() < tolerance && (r - b).abs() < tolerance {
                gray_like += 1;
            }
        }
        if sampled == 0 {
            return 0.0;
        }
        gray_like as f32 / sampled as f32
    }

    pub fn is_grayscale(&self, image: &CanonicalImage) -> bool {
        self.gray_ratio(image) > self.min_ratio
    }
}

impl UltrasoundValidator for GrayscaleSampleValidator {
    fn validate(&self, image: &CanonicalImage) -> ValidationResult {
        let ratio = self.gray_ratio(image);
        if ratio > self.min_ratio {
            ValidationResult::new(true, ratio, "Image has ultrasound-like characteristics (grayscale)")
        } else {
            ValidationResult::new(
                false,
                1.0 - ratio,
                "Image does not appear to be a grayscale ultrasound",
            )
        }
    }
}

/// Accepts when the mean absolute R-G and G-B differences stay small.
#[derive(Debug, Clone)]
pub struct ChannelSimilarityValidator {
    pub max_mean_diff: f64,
}

impl Default for ChannelSimilarityValidator {
    fn default() -> Self {
        Self { max_mean_diff: 30.0 }
    }
}

impl ChannelSimilarityValidator {
    pub fn mean_channel_diffs(&self, image: &CanonicalImage) -> (f64, f64) {
        let count = (image.width() as u64 * image.height() as u64).max(1) as f64;
        let (rg, gb) = image.rgb().pixels().fold((0u64, 0u64), |(rg, gb), p| {
            let [r, g, b] = p.0;
            (rg + r.abs_diff(g) as u64, gb + g.abs_diff(b) as u64)
        });
        (rg as f64 / count, gb as f64 / count)
    }
}

impl UltrasoundValidator for ChannelSimilarityValidator {
    fn validate(&self, image: &CanonicalImage) -> ValidationResult {
        let (rg, gb) = self.mean_channel_diffs(image);
        let worst = rg.max(gb);
        if rg < self.max_mean_diff && gb < self.max_mean_diff {
            let confidence = 1.0 - worst / self.max_mean_diff / 2.0;
            ValidationResult::new(true, confidence as f32, "Colour channels are consistent with a grayscale ultrasound")
        } else {
            let confidence = (worst / 255.0).max(0.5);
            ValidationResult::new(
                false,
                confidence as f32,
                format!(
                    "Image colours differ across channels (mean R-G {:.1}, G-B {:.1})",
                    rg, gb
                ),
            )
        }
    }
}

/// Accepts when mean and spread of the grayscale intensity sit inside the
/// ranges typical for ultrasound frames.
#[derive(Debug, Clone)]
pub struct IntensityRangeValidator {
    pub mean_bounds: (f64, f64),
    pub std_bounds: (f64, f64),
}

impl Default for IntensityRangeValidator {
    fn default() -> Self {
        Self {
            mean_bounds: (20.0, 220.0),
            std_bounds: (10.0, 100.0),
        }
    }
}

impl UltrasoundValidator for IntensityRangeValidator {
    fn validate(&self, image: &CanonicalImage) -> ValidationResult {
        let stats = vision::intensity_stats(&image.to_gray());
        let within = |v: f64, (lo, hi): (f64, f64)| lo < v && v < hi;
        if within(stats.mean, self.mean_bounds) && within(stats.std_dev, self.std_bounds) {
            ValidationResult::new(true, 0.8, "Image characteristics consistent with ultrasound")
        } else {
            ValidationResult::new(false, 0.3, "Image may not be an ultrasound")
        }
    }
}

/// Accepts when most of the intensity histogram lies in the mid band.
#[derive(Debug, Clone)]
pub struct HistogramBandValidator {
    pub band: (usize, usize),
    pub min_fraction: f64,
}

impl Default for HistogramBandValidator {
    fn default() -> Self {
        Self {
            band: (50, 200),
            min_fraction: 0.5,
        }
    }
}

impl UltrasoundValidator for HistogramBandValidator {
    fn validate(&self, image: &CanonicalImage) -> ValidationResult {
        let fraction = vision::band_fraction(&image.to_gray(), self.band.0, self.band.1);
        if fraction > self.min_fraction {
            ValidationResult::new(true, fraction as f32, "Intensity distribution consistent with ultrasound")
        } else {
            ValidationResult::new(
                false,
                (1.0 - fraction) as f32,
                "Image does not appear to be an ultrasound",
            )
        }
    }
}
