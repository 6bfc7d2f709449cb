//! Templated findings and recommendations, one generator per method.
//!
//! Every generator is a pure function of the verdict and the metrics that
//! led to it. Tiers and wording deliberately differ between methods.

pub mod caption;
pub mod cnn;
pub mod follicle;
pub mod heuristic;
pub mod transformer;

use shared::Analysis;

#[derive(Debug, Clone, PartialEq)]
pub struct Report {
    pub findings: Vec<String>,
    pub recommendations: Vec<String>,
    pub disclaimer: &'static str,
}

impl Report {
    pub fn into_analysis(self, pcos_detected: bool, confidence: u32) -> Analysis {
        Analysis::new(
            pcos_detected,
            confidence,
            self.findings,
            self.recommendations,
            self.disclaimer,
        )
    }
}

fn push_all(target: &mut Vec<String>, lines: &[&str]) {
    target.extend(lines.iter().map(|l| l.to_string()));
}
