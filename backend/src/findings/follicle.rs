use super::{Report, push_all};
use crate::predictors::follicle::{Echogenicity, OvarianVolume};

const DISCLAIMER: &str = "This is an automated analysis and should not replace professional medical diagnosis. Please consult with a healthcare provider for proper evaluation.";

pub fn report(
    pcos_detected: bool,
    follicles: usize,
    threshold: u32,
    volume: OvarianVolume,
    echogenicity: Echogenicity,
) -> Report {
    let mut findings = Vec::new();
    if follicles >= threshold as usize {
        findings.push(format!(
            "Polycystic ovarian morphology detected: {} follicles identified",
            follicles
        ));
        findings.push(format!(
            "Follicle count exceeds diagnostic threshold (≥{} follicles)",
            threshold
        ));
    } else if follicles >= 8 {
        findings.push(format!("Multiple follicles detected: {} follicles", follicles));
        findings.push("Follicle count approaching PCOS threshold".into());
    } else {
        findings.push(format!("Normal follicle count: {} follicles", follicles));
    }

    match volume {
        OvarianVolume::Enlarged => findings.push("Increased ovarian volume detected (>10ml)".into()),
        OvarianVolume::Normal => findings.push("Normal ovarian volume".into()),
    }

    match echogenicity {
        Echogenicity::Increased => findings.push("Increased stromal echogenicity observed".into()),
        Echogenicity::Normal => findings.push("Normal stromal echogenicity".into()),
        Echogenicity::Decreased => {}
    }

    let mut recs = Vec::new();
    if pcos_detected {
        push_all(
            &mut recs,
            &[
                "Consult with a gynecologist or endocrinologist for comprehensive evaluation",
                "Consider hormonal blood tests (LH, FSH, testosterone, insulin)",
                "Discuss lifestyle modifications and treatment options",
                "Regular monitoring and follow-up ultrasounds recommended",
            ],
        );
    } else {
        push_all(
            &mut recs,
            &[
                "Continue regular gynecological check-ups",
                "Maintain healthy lifestyle and monitor symptoms",
                "Consult healthcare provider if symptoms develop",
            ],
        );
    }
    push_all(
        &mut recs,
        &[
            "This automated analysis should be confirmed by a qualified radiologist",
            "Clinical correlation with symptoms and blood work is essential",
        ],
    );

    Report {
        findings,
        recommendations: recs,
        disclaimer: DISCLAIMER,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn decreased_echogenicity_adds_no_line() {
        let report = report(false, 3, 12, OvarianVolume::Normal, Echogenicity::Decreased);
        assert_eq!(
            report.findings,
            vec!["Normal follicle count: 3 follicles", "Normal ovarian volume"]
        );
    }

    #[test]
    fn threshold_appears_in_wording() {
        let report = report(true, 14, 12, OvarianVolume::Enlarged, Echogenicity::Increased);
        assert_eq!(report.findings[1], "Follicle count exceeds diagnostic threshold (≥12 follicles)");
        assert_eq!(report.findings.len(), 4);
        assert_eq!(report.recommendations.len(), 6);
    }
}
