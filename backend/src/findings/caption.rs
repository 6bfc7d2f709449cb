use super::{Report, push_all};

const DISCLAIMER: &str = "This is an AI-assisted analysis and should not replace professional medical diagnosis. Please consult with a healthcare provider for proper evaluation.";
const BASIC_DISCLAIMER: &str =
    "This is a basic analysis. Please consult with a healthcare provider for proper evaluation.";

/// How strongly a caption points at polycystic morphology.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CaptionTier {
    Indicated { keyword_hits: usize },
    Borderline,
    Clear,
}

pub fn caption_report(tier: CaptionTier, confidence: u32) -> Report {
    let findings = match tier {
        CaptionTier::Indicated { keyword_hits } => vec![
            "Multiple circular structures detected in ultrasound image".to_string(),
            "Pattern consistent with polycystic ovarian morphology".to_string(),
            format!("AI detected {} PCOS-related indicators", keyword_hits),
            "Ovarian appearance suggests possible PCOS".to_string(),
        ],
        CaptionTier::Borderline => {
            let mut findings = Vec::new();
            push_all(
                &mut findings,
                &[
                    "Some indicators of polycystic ovarian morphology detected",
                    "Borderline PCOS pattern observed",
                    "Further clinical evaluation recommended",
                ],
            );
            findings
        }
        CaptionTier::Clear => {
            let mut findings = Vec::new();
            push_all(
                &mut findings,
                &[
                    "No significant PCOS indicators detected",
                    "Ovarian morphology appears within normal range",
                    "No polycystic pattern observed",
                ],
            );
            findings
        }
    };
    let detected = !matches!(tier, CaptionTier::Clear);
    Report {
        findings,
        recommendations: recommendations(detected, confidence),
        disclaimer: DISCLAIMER,
    }
}

/// Used when no caption could be obtained.
pub fn structural_report(structural: bool, confidence: u32) -> Report {
    let mut findings = Vec::new();
    if structural {
        push_all(
            &mut findings,
            &[
                "Multiple circular structures detected",
                "Pattern suggests polycystic ovarian morphology",
            ],
        );
    } else {
        push_all(
            &mut findings,
            &[
                "No significant polycystic pattern detected",
                "Ovarian morphology appears normal",
            ],
        );
    }
    findings.push("Basic computer vision analysis performed".into());
    Report {
        findings,
        recommendations: recommendations(structural, confidence),
        disclaimer: BASIC_DISCLAIMER,
    }
}

fn recommendations(pcos_detected: bool, confidence: u32) -> Vec<String> {
    let mut recs = Vec::new();
    if pcos_detected {
        push_all(
            &mut recs,
            &[
                "Consult with a gynecologist or endocrinologist for comprehensive evaluation",
                "Consider hormonal blood tests (LH, FSH, testosterone, insulin, AMH)",
                "Discuss symptoms and menstrual history with your doctor",
            ],
        );
        if confidence > 70 {
            push_all(
                &mut recs,
                &[
                    "High confidence result - prioritize medical consultation",
                    "Discuss treatment options and lifestyle modifications",
                ],
            );
        } else {
            push_all(
                &mut recs,
                &[
                    "Moderate confidence - additional imaging may be helpful",
                    "Consider repeat ultrasound for confirmation",
                ],
            );
        }
        recs.push("Regular monitoring and follow-up recommended".into());
    } else {
        push_all(
            &mut recs,
            &[
                "Continue regular gynecological check-ups",
                "Maintain healthy lifestyle and monitor for any symptoms",
                "Consult healthcare provider if symptoms develop",
                "Routine screening as per medical guidelines",
            ],
        );
    }
    push_all(
        &mut recs,
        &[
            "This AI analysis should be confirmed by a qualified radiologist",
            "Multiple diagnostic criteria should be considered for PCOS diagnosis",
        ],
    );
    recs
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn indicated_tier_reports_hit_count() {
        let report = caption_report(CaptionTier::Indicated { keyword_hits: 3 }, 85);
        assert_eq!(report.findings[2], "AI detected 3 PCOS-related indicators");
        assert!(report.recommendations[3].starts_with("High confidence"));
        assert_eq!(report.disclaimer, DISCLAIMER);
    }

    #[test]
    fn clear_tier_gets_routine_advice() {
        let report = caption_report(CaptionTier::Clear, 70);
        assert_eq!(report.recommendations[0], "Continue regular gynecological check-ups");
    }

    #[test]
    fn structural_fallback_has_its_own_disclaimer() {
        let report = structural_report(true, 65);
        assert_eq!(report.disclaimer, BASIC_DISCLAIMER);
        assert_eq!(report.findings.last().unwrap(), "Basic computer vision analysis performed");
        assert!(report.recommendations[3].starts_with("Moderate confidence"));
    }
}
