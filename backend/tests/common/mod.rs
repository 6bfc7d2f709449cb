#![allow(dead_code)]

use std::io::Cursor;
use std::sync::Arc;
use std::sync::atomic::{AtomicUsize, Ordering};

use base64::Engine as _;
use base64::engine::general_purpose::STANDARD;
use image::{DynamicImage, ImageFormat, Rgb, RgbImage};
use imageproc::drawing::draw_filled_circle_mut;
use pcos_backend::CanonicalImage;
use pcos_backend::caption::{CaptionError, CaptionService};
use pcos_backend::predictors::{Predictor, PredictorError};
use shared::{Analysis, Method, Metrics, PredictionResult};

pub fn encode(img: &RgbImage, format: ImageFormat) -> Vec<u8> {
    let mut buffer = Cursor::new(Vec::new());
    DynamicImage::ImageRgb8(img.clone())
        .write_to(&mut buffer, format)
        .unwrap();
    buffer.into_inner()
}

pub fn png_data_url(img: &RgbImage) -> String {
    format!("data:image/png;base64,{}", STANDARD.encode(encode(img, ImageFormat::Png)))
}

/// Mid-gray 100x60 scan whose first 1000 pixels are 95% gray.
pub fn mostly_gray_scan() -> RgbImage {
    RgbImage::from_fn(100, 60, |x, y| {
        if y < 10 && x % 20 == 0 {
            Rgb([200, 60, 60])
        } else {
            let v = 70 + ((x + y) % 60) as u8;
            Rgb([v, v, v])
        }
    })
}

/// 14 dark follicles of radius 10 on a mid-gray 224x224 field.
pub fn polycystic_phantom() -> RgbImage {
    let mut img = RgbImage::from_pixel(224, 224, Rgb([120, 120, 120]));
    let grid = [28, 84, 140, 196];
    let centres = grid.iter().flat_map(|&y| grid.iter().map(move |&x| (x, y))).take(14);
    for (x, y) in centres {
        draw_filled_circle_mut(&mut img, (x, y), 10, Rgb([20, 20, 20]));
    }
    img
}

pub fn canonical(img: RgbImage) -> CanonicalImage {
    CanonicalImage::from_rgb(img).unwrap()
}

#[derive(Debug, Clone)]
pub enum Script {
    Succeed,
    SoftFail(&'static str),
    Reject,
}

/// Predictor that follows a script and counts its invocations.
pub struct Counting {
    method: Method,
    script: Script,
    calls: Arc<AtomicUsize>,
}

impl Counting {
    pub fn new(method: Method, script: Script) -> (Self, Arc<AtomicUsize>) {
        let calls = Arc::new(AtomicUsize::new(0));
        (
            Self {
                method,
                script,
                calls: calls.clone(),
            },
            calls,
        )
    }
}

impl Predictor for Counting {
    fn method(&self) -> Method {
        self.method
    }

    fn analyze(&self, _image: &CanonicalImage) -> Result<PredictionResult, PredictorError> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        Ok(match &self.script {
            Script::Succeed => PredictionResult::success(
                self.method,
                Analysis::new(true, 77, vec!["scripted".into()], vec![], "scripted"),
                Metrics::new(),
            ),
            Script::SoftFail(reason) => PredictionResult::failed(self.method, *reason),
            Script::Reject => PredictionResult::rejected(
                self.method,
                "Not a valid ultrasound image",
                "scripted rejection",
            ),
        })
    }
}

/// Caption service that is always down and counts how often it was asked.
#[derive(Default)]
pub struct DownCaptioner {
    pub calls: AtomicUsize,
}

impl CaptionService for DownCaptioner {
    fn caption(&self, _png: &[u8]) -> Result<String, CaptionError> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        Err(CaptionError::Status(503))
    }
}
