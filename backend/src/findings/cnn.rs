use super::{Report, push_all};

const DISCLAIMER: &str = "This AI analysis is for informational purposes only and should not replace professional medical diagnosis. Please consult with a qualified healthcare provider for proper medical evaluation.";

/// Probabilities are the displayed ones, in percent.
pub fn report(pcos_detected: bool, pcos_prob: f64, normal_prob: f64) -> Report {
    let mut findings = Vec::new();
    let mut recs = Vec::new();
    if pcos_detected {
        let confidence = pcos_prob;
        if confidence > 75.0 {
            findings.push(format!("High confidence PCOS detection ({:.1}%)", pcos_prob));
            findings.push("Ultrasound pattern shows characteristics consistent with PCOS".into());
        } else if confidence > 65.0 {
            findings.push(format!(
                "Moderate-high confidence PCOS detection ({:.1}%)",
                pcos_prob
            ));
            findings.push("Several PCOS indicators detected in ultrasound".into());
        } else {
            findings.push(format!("Moderate confidence PCOS detection ({:.1}%)", pcos_prob));
            findings.push("Some PCOS indicators detected, recommend further evaluation".into());
        }

        if confidence > 75.0 {
            push_all(
                &mut recs,
                &[
                    "Consult with a gynecologist or endocrinologist for comprehensive evaluation",
                    "Consider lifestyle modifications including PCOS-friendly diet and exercise",
                    "Monitor menstrual cycles and symptoms closely",
                    "Discuss treatment options with your healthcare provider",
                ],
            );
        } else {
            push_all(
                &mut recs,
                &[
                    "Schedule follow-up with gynecologist for further evaluation",
                    "Consider additional diagnostic tests if symptoms persist",
                    "Monitor menstrual patterns and symptoms",
                    "Maintain healthy lifestyle habits",
                ],
            );
        }
    } else {
        if normal_prob > 80.0 {
            findings.push(format!(
                "High confidence normal ovarian morphology ({:.1}%)",
                normal_prob
            ));
            findings.push("Ultrasound appears normal with minimal PCOS indicators".into());
        } else if normal_prob > 75.0 {
            findings.push(format!(
                "Moderate-high confidence normal morphology ({:.1}%)",
                normal_prob
            ));
            findings.push("Mostly normal ultrasound pattern".into());
        } else {
            findings.push(format!("Moderate confidence normal morphology ({:.1}%)", normal_prob));
            findings.push("Ultrasound shows predominantly normal characteristics".into());
        }

        if normal_prob > 80.0 {
            push_all(
                &mut recs,
                &[
                    "Continue regular gynecological check-ups",
                    "Maintain a healthy lifestyle",
                    "Monitor any changes in menstrual patterns",
                ],
            );
        } else {
            push_all(
                &mut recs,
                &[
                    "Continue regular gynecological check-ups",
                    "Monitor menstrual cycles for any irregularities",
                    "Consult healthcare provider if symptoms develop",
                    "Maintain healthy diet and exercise routine",
                ],
            );
        }
    }

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
    fn positive_bands() {
        assert!(report(true, 80.0, 20.0).findings[0].starts_with("High confidence"));
        assert!(report(true, 70.0, 30.0).findings[0].starts_with("Moderate-high"));
        let low = report(true, 60.0, 40.0);
        assert!(low.findings[0].starts_with("Moderate confidence"));
        assert_eq!(low.recommendations[0], "Schedule follow-up with gynecologist for further evaluation");
    }

    #[test]
    fn negative_bands() {
        let high = report(false, 18.0, 82.0);
        assert_eq!(high.findings[0], "High confidence normal ovarian morphology (82.0%)");
        assert_eq!(high.recommendations.len(), 3);
        assert!(report(false, 22.0, 78.0).findings[0].starts_with("Moderate-high"));
    }
}
