//! Classical image measurements shared by the validators and the CV-based predictors.

pub mod hough;

use image::{GrayImage, Luma};
use imageproc::contours::find_contours;
use imageproc::contrast::otsu_level;
use imageproc::edges::canny;
use imageproc::geometry::contour_area;

pub use hough::{Circle, HoughParams, detect_circles};

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct IntensityStats {
    pub mean: f64,
    pub std_dev: f64,
}

/// Population mean and standard deviation of the pixel intensities.
pub fn intensity_stats(gray: &GrayImage) -> IntensityStats {
    let count = (gray.width() as u64 * gray.height() as u64).max(1) as f64;
    let (sum, sum_sq) = gray.pixels().fold((0.0f64, 0.0f64), |(s, sq), p| {
        let v = p.0[0] as f64;
        (s + v, sq + v * v)
    });
    let mean = sum / count;
    let variance = (sum_sq / count - mean * mean).max(0.0);
    IntensityStats {
        mean,
        std_dev: variance.sqrt(),
    }
}

pub fn histogram(gray: &GrayImage) -> [u64; 256] {
    let mut bins = [0u64; 256];
    for p in gray.pixels() {
        bins[p.0[0] as usize] += 1;
    }
    bins
}

/// Share of pixels whose intensity falls in `[low, high)`.
pub fn band_fraction(gray: &GrayImage, low: usize, high: usize) -> f64 {
    let bins = histogram(gray);
    let total: u64 = bins.iter().sum();
    if total == 0 {
        return 0.0;
    }
    let band: u64 = bins[low.min(256)..high.min(256)].iter().sum();
    band as f64 / total as f64
}

/// Share of pixels marked as edges by Canny.
pub fn edge_density(gray: &GrayImage, low: f32, high: f32) -> f64 {
    let total = gray.width() as u64 * gray.height() as u64;
    if total == 0 {
        return 0.0;
    }
    let edges = canny(gray, low, high);
    let marked = edges.pixels().filter(|p| p.0[0] > 0).count();
    marked as f64 / total as f64
}

/// Mean intensity of the central region spanning the middle half on both axes.
pub fn central_mean(gray: &GrayImage) -> f64 {
    let (w, h) = gray.dimensions();
    let (x0, x1) = (w / 4, (3 * w / 4).max(w / 4 + 1).min(w));
    let (y0, y1) = (h / 4, (3 * h / 4).max(h / 4 + 1).min(h));
    let mut sum = 0.0f64;
    let mut count = 0u64;
    for y in y0..y1 {
        for x in x0..x1 {
            sum += gray.get_pixel(x, y).0[0] as f64;
            count += 1;
        }
    }
    if count == 0 { 0.0 } else { sum / count as f64 }
}

/// Area of the largest external contour of the Otsu-binarized image,
/// relative to the image area.
pub fn largest_region_fraction(gray: &GrayImage) -> f64 {
    let (w, h) = gray.dimensions();
    let image_area = w as f64 * h as f64;
    if image_area == 0.0 {
        return 0.0;
    }
    let level = otsu_level(gray);
    let binary = GrayImage::from_fn(w, h, |x, y| {
        if gray.get_pixel(x, y).0[0] > level {
            Luma([255])
        } else {
            Luma([0])
        }
    });

    find_contours::<i32>(&binary)
        .iter()
        .filter(|c| c.parent.is_none())
        .map(|c| contour_area(&c.points))
        .fold(0.0f64, f64::max)
        / image_area
}

#[cfg(test)]
mod tests {
    use super::*;
    use imageproc::drawing::draw_filled_rect_mut;
    use imageproc::rect::Rect;

    #[test]
    fn stats_of_two_level_image() {
        let gray = GrayImage::from_fn(10, 10, |x, _| if x < 5 { Luma([50]) } else { Luma([150]) });
        let stats = intensity_stats(&gray);
        assert!((stats.mean - 100.0).abs() < 1e-9);
        assert!((stats.std_dev - 50.0).abs() < 1e-9);
    }

    #[test]
    fn band_fraction_is_half_open() {
        let gray = GrayImage::from_fn(4, 1, |x, _| Luma([[49, 50, 199, 200][x as usize]]));
        assert!((band_fraction(&gray, 50, 200) - 0.5).abs() < 1e-9);
    }

    #[test]
    fn flat_image_has_no_edges() {
        let gray = GrayImage::from_pixel(32, 32, Luma([90]));
        assert_eq!(edge_density(&gray, 50.0, 150.0), 0.0);
    }

    #[test]
    fn central_mean_ignores_border() {
        let mut gray = GrayImage::from_pixel(40, 40, Luma([0]));
        draw_filled_rect_mut(&mut gray, Rect::at(10, 10).of_size(20, 20), Luma([200]));
        assert!((central_mean(&gray) - 200.0).abs() < 1e-9);
    }

    #[test]
    fn largest_region_tracks_bright_blob() {
        let mut small = GrayImage::from_pixel(100, 100, Luma([10]));
        draw_filled_rect_mut(&mut small, Rect::at(40, 40).of_size(10, 10), Luma([240]));
        assert!(largest_region_fraction(&small) < 0.15);

        let mut large = GrayImage::from_pixel(100, 100, Luma([10]));
        draw_filled_rect_mut(&mut large, Rect::at(10, 10).of_size(60, 60), Luma([240]));
        assert!(largest_region_fraction(&large) > 0.15);
    }
}
