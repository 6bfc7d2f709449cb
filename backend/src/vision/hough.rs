use image::GrayImage;
use imageproc::edges::canny;
use imageproc::filter::gaussian_blur_f32;
use imageproc::gradients::{horizontal_sobel, vertical_sobel};

/// Parameters of the gradient Hough circle transform.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct HoughParams {
    pub blur_sigma: f32,
    /// Minimum distance between accepted circle centres, in pixels.
    pub min_dist: f32,
    /// Upper Canny threshold; the lower one is half of it.
    pub canny_high: f32,
    /// Pooled accumulator votes a centre needs before it is considered.
    pub acc_threshold: u32,
    pub min_radius: u32,
    pub max_radius: u32,
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Circle {
    pub x: f32,
    pub y: f32,
    pub radius: f32,
    pub votes: u32,
}

/// Fraction of the circumference that must be backed by edge pixels.
const MIN_COVERAGE: f32 = 0.4;

/// Detects circles by letting every edge pixel vote along its gradient
/// direction, then estimating a radius for each accepted centre.
///
/// Output order is deterministic: strongest centres first.
pub fn detect_circles(gray: &GrayImage, params: &HoughParams) -> Vec<Circle> {
    let (width, height) = gray.dimensions();
    if width == 0 || height == 0 || params.max_radius < params.min_radius {
        return Vec::new();
    }

    let blurred = gaussian_blur_f32(gray, params.blur_sigma);
    let edges = canny(&blurred, params.canny_high / 2.0, params.canny_high);
    let gx = horizontal_sobel(&blurred);
    let gy = vertical_sobel(&blurred);

    let (w, h) = (width as usize, height as usize);
    let mut accumulator = vec![0u32; w * h];
    let mut edge_points: Vec<(f32, f32)> = Vec::new();

    for (x, y, pixel) in edges.enumerate_pixels() {
        if pixel.0[0] == 0 {
            continue;
        }
        let dx = gx.get_pixel(x, y).0[0] as f32;
        let dy = gy.get_pixel(x, y).0[0] as f32;
        let magnitude = dx.hypot(dy);
        if magnitude < f32::EPSILON {
            continue;
        }
        edge_points.push((x as f32, y as f32));
        let (ux, uy) = (dx / magnitude, dy / magnitude);

        for sign in [-1.0f32, 1.0] {
            for r in params.min_radius..=params.max_radius {
                let cx = (x as f32 + sign * ux * r as f32).round();
                let cy = (y as f32 + sign * uy * r as f32).round();
                if cx < 0.0 || cy < 0.0 || cx >= width as f32 || cy >= height as f32 {
                    break;
                }
                accumulator[cy as usize * w + cx as usize] += 1;
            }
        }
    }

    let pooled = pool_3x3(&accumulator, w, h);
    let mut candidates: Vec<(usize, usize, u32)> = Vec::new();
    for y in 0..h {
        for x in 0..w {
            let votes = pooled[y * w + x];
            if votes > params.acc_threshold && is_local_max(&pooled, w, h, x, y) {
                candidates.push((x, y, votes));
            }
        }
    }
    candidates.sort_by(|a, b| b.2.cmp(&a.2).then(a.1.cmp(&b.1)).then(a.0.cmp(&b.0)));

    let min_dist_sq = params.min_dist * params.min_dist;
    let mut circles: Vec<Circle> = Vec::new();
    for (x, y, votes) in candidates {
        let (cx, cy) = (x as f32, y as f32);
        let too_close = circles.iter().any(|c| {
            let (ddx, ddy) = (c.x - cx, c.y - cy);
            ddx * ddx + ddy * ddy < min_dist_sq
        });
        if too_close {
            continue;
        }
        if let Some(radius) = estimate_radius(&edge_points, cx, cy, params) {
            circles.push(Circle {
                x: cx,
                y: cy,
                radius,
                votes,
            });
        }
    }
    circles
}

fn pool_3x3(values: &[u32], w: usize, h: usize) -> Vec<u32> {
    let mut pooled = vec![0u32; values.len()];
    for y in 0..h {
        for x in 0..w {
            let mut sum = 0;
            for ny in y.saturating_sub(1)..=(y + 1).min(h - 1) {
                for nx in x.saturating_sub(1)..=(x + 1).min(w - 1) {
                    sum += values[ny * w + nx];
                }
            }
            pooled[y * w + x] = sum;
        }
    }
    pooled
}

fn is_local_max(values: &[u32], w: usize, h: usize, x: usize, y: usize) -> bool {
    let centre = values[y * w + x];
    for ny in y.saturating_sub(1)..=(y + 1).min(h - 1) {
        for nx in x.saturating_sub(1)..=(x + 1).min(w - 1) {
            if values[ny * w + nx] > centre {
                return false;
            }
        }
    }
    true
}

/// Picks the radius whose ±1px band holds the best-covered ring of edge pixels.
fn estimate_radius(edge_points: &[(f32, f32)], cx: f32, cy: f32, params: &HoughParams) -> Option<f32> {
    let max_r = params.max_radius as usize;
    let mut histogram = vec![0u32; max_r + 2];
    for &(x, y) in edge_points {
        let d = (x - cx).hypot(y - cy).round();
        if d >= params.min_radius as f32 - 1.0 && d <= max_r as f32 + 1.0 {
            histogram[d as usize] += 1;
        }
    }

    let mut best: Option<(f32, f32)> = None;
    for r in params.min_radius.max(1) as usize..=max_r {
        let support = histogram[r - 1] + histogram[r] + histogram[r + 1];
        let coverage = support as f32 / (2.0 * std::f32::consts::PI * r as f32);
        if coverage >= MIN_COVERAGE && best.is_none_or(|(_, c)| coverage > c) {
            best = Some((r as f32, coverage));
        }
    }
    best.map(|(r, _)| r)
}
