use std::io::Cursor;

use base64::Engine as _;
use base64::engine::general_purpose::STANDARD;
use image::imageops::FilterType;
use image::{DynamicImage, GrayImage, ImageFormat, Luma, RgbImage};
use ndarray::Array4;
use sha2::{Digest, Sha256};

#[derive(Debug, thiserror::Error)]
pub enum CodecError {
    #[error("Error decoding image: {0}")]
    Decode(String),
    #[error("Unsupported image format: {0}")]
    Format(String),
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PayloadSource {
    Base64,
    Binary,
}

/// Raw image bytes as received on the wire.
#[derive(Debug, Clone)]
pub struct ImagePayload {
    bytes: Vec<u8>,
    media_type: Option<String>,
    source: PayloadSource,
}

impl ImagePayload {
    /// Accepts plain base64 or a `data:image/...;base64,` URL.
    pub fn from_base64(input: &str) -> Result<Self, CodecError> {
        let (media_type, encoded) = split_data_url(input);
        let cleaned: String = encoded.chars().filter(|c| !c.is_ascii_whitespace()).collect();
        if cleaned.is_empty() {
            return Err(CodecError::Decode("empty image payload".into()));
        }
        let bytes = STANDARD
            .decode(cleaned.as_bytes())
            .map_err(|e| CodecError::Decode(format!("invalid base64: {}", e)))?;
        Ok(Self {
            bytes,
            media_type,
            source: PayloadSource::Base64,
        })
    }

    pub fn from_bytes(bytes: Vec<u8>, media_type: Option<String>) -> Self {
        Self {
            bytes,
            media_type,
            source: PayloadSource::Binary,
        }
    }

    pub fn bytes(&self) -> &[u8] {
        &self.bytes
    }

    pub fn media_type(&self) -> Option<&str> {
        self.media_type.as_deref()
    }

    pub fn source(&self) -> PayloadSource {
        self.source
    }

    pub fn digest(&self) -> String {
        let mut hasher = Sha256::new();
        hasher.update(&self.bytes);
        hex::encode(hasher.finalize())
    }

    pub fn decode(&self) -> Result<CanonicalImage, CodecError> {
        if self.bytes.is_empty() {
            return Err(CodecError::Decode("empty image payload".into()));
        }
        let format = image::guess_format(&self.bytes)
            .map_err(|e| CodecError::Format(e.to_string()))?;
        let decoded = image::load_from_memory_with_format(&self.bytes, format)
            .map_err(|e| CodecError::Decode(e.to_string()))?;
        CanonicalImage::from_dynamic(decoded)
    }
}

fn split_data_url(input: &str) -> (Option<String>, &str) {
    let trimmed = input.trim();
    if let Some((head, body)) = trimmed.split_once("base64,") {
        let media_type = head
            .strip_prefix("data:")
            .map(|m| m.trim_end_matches(';').to_string())
            .filter(|m| !m.is_empty());
        return (media_type, body);
    }
    if trimmed.starts_with("data:") {
        if let Some((head, body)) = trimmed.split_once(',') {
            let media_type = head.strip_prefix("data:").map(|m| m.to_string());
            return (media_type, body);
        }
    }
    (None, trimmed)
}

/// Pixel scaling applied when turning an image into a model tensor.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum Normalization {
    /// `x / 255`
    UnitRange,
    /// `(x / 255 - mean) / std`, per channel.
    MeanStd { mean: [f32; 3], std: [f32; 3] },
}

/// Decoded RGB8 image owned by a single request.
#[derive(Debug, Clone)]
pub struct CanonicalImage {
    rgb: RgbImage,
}

impl CanonicalImage {
    pub fn from_dynamic(image: DynamicImage) -> Result<Self, CodecError> {
        if image.width() == 0 || image.height() == 0 {
            return Err(CodecError::Format("image has zero width or height".into()));
        }
        Ok(Self {
            rgb: image.to_rgb8(),
        })
    }

    pub fn from_rgb(rgb: RgbImage) -> Result<Self, CodecError> {
        Self::from_dynamic(DynamicImage::ImageRgb8(rgb))
    }

    pub fn width(&self) -> u32 {
        self.rgb.width()
    }

    pub fn height(&self) -> u32 {
        self.rgb.height()
    }

    pub fn rgb(&self) -> &RgbImage {
        &self.rgb
    }

    pub fn resized(&self, width: u32, height: u32) -> RgbImage {
        if self.rgb.width() == width && self.rgb.height() == height {
            return self.rgb.clone();
        }
        image::imageops::resize(&self.rgb, width, height, FilterType::CatmullRom)
    }

    /// ITU-R BT.601 luma.
    pub fn to_gray(&self) -> GrayImage {
        GrayImage::from_fn(self.rgb.width(), self.rgb.height(), |x, y| {
            let [r, g, b] = self.rgb.get_pixel(x, y).0;
            let luma = 0.299 * r as f32 + 0.587 * g as f32 + 0.114 * b as f32;
            Luma([luma.round().clamp(0.0, 255.0) as u8])
        })
    }

    /// NCHW tensor with a batch dimension of one.
    pub fn to_tensor(&self, size: u32, normalization: Normalization) -> Array4<f32> {
        let resized = self.resized(size, size);
        let side = size as usize;
        let mut tensor = Array4::<f32>::zeros((1, 3, side, side));
        for (x, y, pixel) in resized.enumerate_pixels() {
            for channel in 0..3 {
                let unit = pixel.0[channel] as f32 / 255.0;
                let value = match normalization {
                    Normalization::UnitRange => unit,
                    Normalization::MeanStd { mean, std } => (unit - mean[channel]) / std[channel],
                };
                tensor[[0, channel, y as usize, x as usize]] = value;
            }
        }
        tensor
    }

    pub fn encode_png(&self) -> Result<Vec<u8>, CodecError> {
        let mut buffer = Cursor::new(Vec::new());
        self.rgb
            .write_to(&mut buffer, ImageFormat::Png)
            .map_err(|e| CodecError::Format(e.to_string()))?;
        Ok(buffer.into_inner())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use image::Rgb;

    fn png_base64(img: &RgbImage) -> String {
        let canonical = CanonicalImage::from_rgb(img.clone()).unwrap();
        STANDARD.encode(canonical.encode_png().unwrap())
    }

    #[test]
    fn strips_data_url_prefix() {
        let img = RgbImage::from_pixel(8, 4, Rgb([10, 20, 30]));
        let encoded = format!("data:image/png;base64,{}", png_base64(&img));
        let payload = ImagePayload::from_base64(&encoded).unwrap();
        assert_eq!(payload.media_type(), Some("image/png"));
        assert_eq!(payload.source(), PayloadSource::Base64);
        let decoded = payload.decode().unwrap();
        assert_eq!((decoded.width(), decoded.height()), (8, 4));
        assert_eq!(decoded.rgb().get_pixel(3, 2).0, [10, 20, 30]);
    }

    #[test]
    fn tolerates_line_breaks_in_base64() {
        let img = RgbImage::from_pixel(4, 4, Rgb([1, 2, 3]));
        let encoded = png_base64(&img);
        let (a, b) = encoded.split_at(encoded.len() / 2);
        let wrapped = format!("{}\n{}\r\n", a, b);
        assert!(ImagePayload::from_base64(&wrapped).unwrap().decode().is_ok());
    }

    #[test]
    fn rejects_invalid_base64() {
        let err = ImagePayload::from_base64("not*base64!").unwrap_err();
        assert!(matches!(err, CodecError::Decode(_)));
    }

    #[test]
    fn rejects_empty_payload() {
        assert!(matches!(
            ImagePayload::from_base64("data:image/png;base64,").unwrap_err(),
            CodecError::Decode(_)
        ));
        assert!(matches!(
            ImagePayload::from_bytes(Vec::new(), None).decode().unwrap_err(),
            CodecError::Decode(_)
        ));
    }

    #[test]
    fn unknown_bytes_are_a_format_error() {
        let payload = ImagePayload::from_bytes(b"hello world, not an image".to_vec(), None);
        assert!(matches!(payload.decode().unwrap_err(), CodecError::Format(_)));
    }

    #[test]
    fn tensor_scaling_modes() {
        let img = RgbImage::from_pixel(2, 2, Rgb([255, 0, 51]));
        let canonical = CanonicalImage::from_rgb(img).unwrap();

        assert_eq!(
            canonical.to_tensor(4, Normalization::UnitRange).shape(),
            &[1, 3, 4, 4]
        );

        let unit = canonical.to_tensor(2, Normalization::UnitRange);
        assert!((unit[[0, 0, 1, 1]] - 1.0).abs() < 1e-6);
        assert!(unit[[0, 1, 0, 1]].abs() < 1e-6);
        assert!((unit[[0, 2, 1, 0]] - 0.2).abs() < 1e-6);

        let vit = canonical.to_tensor(
            2,
            Normalization::MeanStd {
                mean: [0.5; 3],
                std: [0.5; 3],
            },
        );
        assert!((vit[[0, 0, 0, 0]] - 1.0).abs() < 1e-6);
        assert!((vit[[0, 1, 0, 0]] + 1.0).abs() < 1e-6);
    }

    #[test]
    fn gray_uses_luma_weights() {
        let img = RgbImage::from_pixel(1, 1, Rgb([255, 0, 0]));
        let gray = CanonicalImage::from_rgb(img).unwrap().to_gray();
        assert_eq!(gray.get_pixel(0, 0).0[0], 76);
    }

    #[test]
    fn digest_is_stable() {
        let a = ImagePayload::from_bytes(vec![1, 2, 3], None);
        let b = ImagePayload::from_bytes(vec![1, 2, 3], Some("image/png".into()));
        assert_eq!(a.digest(), b.digest());
        assert_eq!(a.digest().len(), 64);
    }
}
