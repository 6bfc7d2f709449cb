//! Priority-ordered, first-success-wins execution of the predictors.

use std::any::Any;
use std::collections::BTreeMap;
use std::panic::{AssertUnwindSafe, catch_unwind};

use shared::{
    AttemptOutcome, AvailabilityMap, ExhaustionReport, IntoEnumIterator, Method, MethodAttempt,
    PredictionResult,
};

use crate::codec::{CanonicalImage, CodecError, ImagePayload};
use crate::predictors::Predictor;

pub const EXHAUSTED_ERROR: &str = "All image analysis methods failed";
pub const EXHAUSTED_DETAILS: &str =
    "Please ensure the image is a valid ultrasound image showing ovarian region";
pub const EXHAUSTED_HELP: &str = "Place the exported transformer model under the model directory \
     (huggingface_pcos/model.pt) or check the caption service configuration, then restart the service";

#[derive(Debug, Clone, PartialEq)]
pub enum CascadeOutcome {
    Resolved {
        result: PredictionResult,
        attempts: Vec<MethodAttempt>,
    },
    /// A method ruled the image out as an ultrasound; nothing after it ran.
    Rejected {
        result: PredictionResult,
        attempts: Vec<MethodAttempt>,
    },
    Exhausted(ExhaustionReport),
}

impl CascadeOutcome {
    pub fn attempts(&self) -> &[MethodAttempt] {
        match self {
            CascadeOutcome::Resolved { attempts, .. } | CascadeOutcome::Rejected { attempts, .. } => {
                attempts
            }
            CascadeOutcome::Exhausted(report) => &report.attempts,
        }
    }

    /// Methods that were actually invoked, in order.
    pub fn invoked(&self) -> Vec<Method> {
        self.attempts()
            .iter()
            .filter(|a| a.outcome != AttemptOutcome::Skipped)
            .map(|a| a.method)
            .collect()
    }
}

/// The set of initialized predictors. Methods without a predictor are
/// unavailable and get skipped.
#[derive(Default)]
pub struct Cascade {
    predictors: BTreeMap<Method, Box<dyn Predictor>>,
}

impl Cascade {
    pub fn new() -> Self {
        Self::default()
    }

    /// Adds `predictor`, replacing any earlier one for the same method.
    pub fn register(&mut self, predictor: Box<dyn Predictor>) {
        self.predictors.insert(predictor.method(), predictor);
    }

    pub fn with<P: Predictor + 'static>(mut self, predictor: P) -> Self {
        self.register(Box::new(predictor));
        self
    }

    pub fn availability(&self) -> AvailabilityMap {
        let mut map = AvailabilityMap::default();
        for method in Method::iter() {
            map.set(method, self.predictors.contains_key(&method));
        }
        map
    }

    /// Decodes the payload once, then runs the cascade on it.
    pub fn analyze_image(&self, payload: &ImagePayload) -> Result<CascadeOutcome, CodecError> {
        let image = payload.decode()?;
        log::debug!(
            "Decoded {}x{} image (sha256 {})",
            image.width(),
            image.height(),
            payload.digest()
        );
        Ok(self.run(&image))
    }

    pub fn run(&self, image: &CanonicalImage) -> CascadeOutcome {
        let mut attempts = Vec::new();

        for method in Method::iter() {
            let Some(predictor) = self.predictors.get(&method) else {
                log::debug!("{} unavailable, skipping", method);
                attempts.push(MethodAttempt {
                    method,
                    outcome: AttemptOutcome::Skipped,
                });
                continue;
            };

            log::debug!("Trying {}", method);
            let result = match catch_unwind(AssertUnwindSafe(|| predictor.predict(image))) {
                Ok(result) => result,
                Err(payload) => {
                    let message = panic_message(payload.as_ref());
                    log::error!("{} panicked: {}", method, message);
                    attempts.push(MethodAttempt {
                        method,
                        outcome: AttemptOutcome::Panicked(message),
                    });
                    continue;
                }
            };

            if result.success {
                log::info!("Image analysis resolved by {}", method.label());
                attempts.push(MethodAttempt {
                    method,
                    outcome: AttemptOutcome::Succeeded,
                });
                return CascadeOutcome::Resolved { result, attempts };
            }

            let error = result.error.clone().unwrap_or_else(|| "Unknown error".to_string());
            if !result.is_ultrasound {
                log::info!("{} rejected the image: {}", method, error);
                attempts.push(MethodAttempt {
                    method,
                    outcome: AttemptOutcome::Rejected(error),
                });
                return CascadeOutcome::Rejected { result, attempts };
            }

            log::warn!("{} failed: {}", method, error);
            attempts.push(MethodAttempt {
                method,
                outcome: AttemptOutcome::Failed(error),
            });
        }

        log::error!("{}", EXHAUSTED_ERROR);
        CascadeOutcome::Exhausted(ExhaustionReport {
            success: false,
            error: EXHAUSTED_ERROR.to_string(),
            details: EXHAUSTED_DETAILS.to_string(),
            available_methods: self.availability(),
            attempts,
            help: EXHAUSTED_HELP.to_string(),
        })
    }
}

fn panic_message(payload: &(dyn Any + Send)) -> String {
    if let Some(s) = payload.downcast_ref::<&str>() {
        s.to_string()
    } else if let Some(s) = payload.downcast_ref::<String>() {
        s.clone()
    } else {
        "predictor panicked".to_string()
    }
}
