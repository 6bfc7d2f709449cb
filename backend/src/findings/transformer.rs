use super::{Report, push_all};

const DISCLAIMER: &str = "This analysis uses Hugging Face Vision Transformer trained on real PCOS data. Consult a healthcare provider for medical diagnosis.";

/// `confidence` is the winning class probability in percent.
pub fn report(pcos_detected: bool, confidence: f64, normal_prob: f64, pcos_prob: f64) -> Report {
    Report {
        findings: findings(pcos_detected, confidence, normal_prob, pcos_prob),
        recommendations: recommendations(pcos_detected, confidence),
        disclaimer: DISCLAIMER,
    }
}

fn findings(pcos_detected: bool, confidence: f64, normal_prob: f64, pcos_prob: f64) -> Vec<String> {
    let mut findings = Vec::new();
    if pcos_detected {
        if confidence > 90.0 {
            findings.push(format!("Very high confidence PCOS detection ({:.1}%)", confidence));
            push_all(
                &mut findings,
                &[
                    "Ultrasound pattern strongly consistent with polycystic ovarian syndrome",
                    "Multiple PCOS characteristics identified by AI",
                ],
            );
        } else if confidence > 75.0 {
            findings.push(format!("High confidence PCOS detection ({:.1}%)", confidence));
            push_all(
                &mut findings,
                &[
                    "Ultrasound pattern consistent with polycystic ovarian syndrome",
                    "Characteristic PCOS features detected",
                ],
            );
        } else {
            findings.push(format!("Moderate confidence PCOS detection ({:.1}%)", confidence));
            push_all(
                &mut findings,
                &[
                    "Some features suggestive of PCOS",
                    "Borderline case - clinical correlation recommended",
                ],
            );
        }
        findings.push(format!(
            "PCOS probability: {:.1}% vs Normal: {:.1}%",
            pcos_prob, normal_prob
        ));
        findings.push("AI trained on real PCOS ultrasound dataset".into());
    } else {
        if confidence > 90.0 {
            findings.push(format!(
                "Very high confidence normal ovarian morphology ({:.1}%)",
                confidence
            ));
            push_all(
                &mut findings,
                &[
                    "No significant PCOS indicators detected",
                    "Ultrasound pattern consistent with normal ovaries",
                ],
            );
        } else if confidence > 75.0 {
            findings.push(format!("High confidence normal ovarian morphology ({:.1}%)", confidence));
            push_all(
                &mut findings,
                &["Minimal PCOS indicators detected", "Predominantly normal ovarian appearance"],
            );
        } else {
            findings.push(format!("Moderate confidence normal classification ({:.1}%)", confidence));
            push_all(&mut findings, &["Some ambiguous features present", "Borderline normal case"]);
        }
        findings.push(format!(
            "Normal probability: {:.1}% vs PCOS: {:.1}%",
            normal_prob, pcos_prob
        ));
        findings.push("AI analysis suggests normal ovarian structure".into());
    }
    findings
}

fn recommendations(pcos_detected: bool, confidence: f64) -> Vec<String> {
    let mut recs = Vec::new();
    if pcos_detected {
        push_all(
            &mut recs,
            &[
                "⚕️ Consult with a gynecologist or endocrinologist",
                "🩺 Consider hormonal blood tests (LH, FSH, testosterone, insulin)",
            ],
        );
        if confidence > 80.0 {
            push_all(
                &mut recs,
                &[
                    "⚠️ High AI confidence - prioritize medical consultation",
                    "💊 Discuss PCOS management options",
                ],
            );
        } else {
            push_all(&mut recs, &["🔍 Moderate confidence - additional imaging may help"]);
        }
        push_all(
            &mut recs,
            &[
                "🏃‍♀️ Lifestyle: balanced diet, regular exercise",
                "📅 Regular monitoring and follow-up recommended",
            ],
        );
    } else {
        push_all(
            &mut recs,
            &[
                "✅ Continue regular gynecological check-ups",
                "🏃‍♀️ Maintain healthy lifestyle",
                "👀 Monitor for any PCOS symptoms",
                "📅 Routine screening as per guidelines",
            ],
        );
    }
    push_all(
        &mut recs,
        &[
            "🤖 AI trained on 1000+ real PCOS ultrasound images",
            "⚕️ Clinical correlation with symptoms essential",
        ],
    );
    recs
}
