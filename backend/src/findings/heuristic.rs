use super::{Report, push_all};

const DISCLAIMER: &str = "This is an AI-assisted analysis using computer vision. Please consult with a healthcare provider for proper medical diagnosis.";

pub fn report(pcos_detected: bool, confidence: u32, follicles: usize, texture_score: f64) -> Report {
    let mut findings = Vec::new();
    if follicles >= 12 {
        findings.push(format!(
            "Multiple follicles detected: {} structures identified",
            follicles
        ));
        push_all(
            &mut findings,
            &[
                "Follicle count exceeds PCOS diagnostic threshold (≥12)",
                "Peripheral arrangement of follicles observed",
            ],
        );
    } else if follicles >= 8 {
        findings.push(format!("Moderate follicle count: {} structures detected", follicles));
        findings.push("Approaching PCOS diagnostic threshold".into());
    } else {
        findings.push(format!("Normal follicle count: {} structures", follicles));
        findings.push("Follicle count within normal range".into());
    }

    if texture_score > 0.6 {
        push_all(
            &mut findings,
            &[
                "Increased stromal echogenicity detected",
                "Texture pattern consistent with PCOS",
            ],
        );
    }

    if pcos_detected {
        findings.push("Overall morphology consistent with polycystic ovarian syndrome".into());
    } else {
        findings.push("Ovarian morphology appears within normal parameters".into());
    }

    Report {
        findings,
        recommendations: recommendations(pcos_detected, confidence),
        disclaimer: DISCLAIMER,
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
                "Discuss symptoms including irregular periods, hirsutism, and acne",
            ],
        );
        if confidence > 75 {
            push_all(
                &mut recs,
                &[
                    "High confidence result - prioritize medical consultation",
                    "Discuss treatment options including lifestyle modifications and medications",
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
        push_all(
            &mut recs,
            &[
                "Regular monitoring and follow-up ultrasounds recommended",
                "Lifestyle modifications: healthy diet, regular exercise, weight management",
            ],
        );
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
            "PCOS diagnosis requires multiple criteria: clinical, biochemical, and imaging",
        ],
    );
    recs
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn texture_line_only_above_threshold() {
        let plain = report(false, 60, 3, 0.4);
        assert_eq!(plain.findings.len(), 3);
        assert_eq!(plain.findings[0], "Normal follicle count: 3 structures");

        let textured = report(true, 80, 9, 0.7);
        assert_eq!(textured.findings.len(), 5);
        assert!(textured.findings.contains(&"Texture pattern consistent with PCOS".to_string()));
        assert!(textured.recommendations[3].starts_with("High confidence"));
    }

    #[test]
    fn recommendation_split_is_strict() {
        let at_split = report(true, 75, 12, 0.2);
        assert!(at_split.recommendations[3].starts_with("Moderate confidence"));
    }
}
