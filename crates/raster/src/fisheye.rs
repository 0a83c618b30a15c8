//! Fisheye undistortion.
//!
//! The equidistant radial model: a pinhole ray at angle θ from the optical
//! axis lands at radius `θ_d = θ(1 + k1·θ² + k2·θ⁴ + k3·θ⁶ + k4·θ⁸)` on the
//! sensor. Undistortion inverse-maps every output pixel through the model
//! once per `(K, D, size)` and caches the map; per-frame work is a bilinear
//! remap.

use image::RgbaImage;

/// A 3×3 pinhole camera matrix. Skew is carried but fixed at zero by the
/// calibrator.
#[derive(Copy, Clone, Debug, PartialEq)]
pub struct CameraMatrix {
    pub fx: f64,
    pub fy: f64,
    pub cx: f64,
    pub cy: f64,
    pub skew: f64,
}

impl CameraMatrix {
    pub fn new(fx: f64, fy: f64, cx: f64, cy: f64) -> CameraMatrix {
        CameraMatrix {
            fx,
            fy,
            cx,
            cy,
            skew: 0.0,
        }
    }

    /// A focal guess for an uncalibrated sensor: focal = width, centered.
    pub fn initial_guess(width: u32, height: u32) -> CameraMatrix {
        CameraMatrix::new(
            width as f64,
            width as f64,
            width as f64 / 2.0,
            height as f64 / 2.0,
        )
    }
}

/// The four radial distortion coefficients `k1..k4`.
#[derive(Copy, Clone, Debug, Default, PartialEq)]
pub struct Distortion(pub [f64; 4]);

impl Distortion {
    /// `θ_d` for a ray angle `θ`.
    pub fn distort(&self, theta: f64) -> f64 {
        let t2 = theta * theta;
        theta
            * (1.0
                + self.0[0] * t2
                + self.0[1] * t2 * t2
                + self.0[2] * t2 * t2 * t2
                + self.0[3] * t2 * t2 * t2 * t2)
    }
}

/// A precomputed undistortion remap for one `(K, D, size)` triple.
#[derive(Clone, Debug)]
pub struct UndistortMap {
    k: CameraMatrix,
    d: Distortion,
    width: u32,
    height: u32,
    /// Source sample position per output pixel, row major.
    map: Vec<(f32, f32)>,
}

impl UndistortMap {
    pub fn new(k: CameraMatrix, d: Distortion, width: u32, height: u32) -> UndistortMap {
        let mut map = Vec::with_capacity(width as usize * height as usize);
        for v in 0..height {
            for u in 0..width {
                // Normalized undistorted ray for this output pixel.
                let x = (u as f64 - k.cx) / k.fx;
                let y = (v as f64 - k.cy) / k.fy;
                let r = (x * x + y * y).sqrt();
                let scale = if r > 1e-8 {
                    let theta = r.atan();
                    d.distort(theta) / r
                } else {
                    1.0
                };
                let xd = x * scale;
                let yd = y * scale;
                let src_u = k.fx * (xd + k.skew * yd) + k.cx;
                let src_v = k.fy * yd + k.cy;
                map.push((src_u as f32, src_v as f32));
            }
        }
        UndistortMap {
            k,
            d,
            width,
            height,
            map,
        }
    }

    pub fn matches(&self, k: &CameraMatrix, d: &Distortion, width: u32, height: u32) -> bool {
        self.k == *k && self.d == *d && self.width == width && self.height == height
    }

    /// Bilinear remap of a frame through the precomputed map.
    pub fn remap(&self, frame: &RgbaImage) -> RgbaImage {
        let mut out = RgbaImage::new(self.width, self.height);
        for v in 0..self.height {
            for u in 0..self.width {
                let (sx, sy) = self.map[(v * self.width + u) as usize];
                let pixel = sample_bilinear(frame, sx as f64, sy as f64);
                out.put_pixel(u, v, image::Rgba(pixel));
            }
        }
        out
    }
}

/// Keeps the last computed map and rebuilds only when the parameters change.
#[derive(Default)]
pub struct UndistortCache {
    map: Option<UndistortMap>,
}

impl UndistortCache {
    pub fn new() -> UndistortCache {
        UndistortCache { map: None }
    }

    pub fn map(&mut self, k: CameraMatrix, d: Distortion, width: u32, height: u32) -> &UndistortMap {
        let stale = match &self.map {
            Some(map) => !map.matches(&k, &d, width, height),
            None => true,
        };
        if stale {
            log::debug!("rebuilding undistort map for {}x{}", width, height);
            self.map = None;
        }
        self.map
            .get_or_insert_with(|| UndistortMap::new(k, d, width, height))
    }
}

fn sample_bilinear(image: &RgbaImage, x: f64, y: f64) -> [u8; 4] {
    let (w, h) = (image.width() as i64, image.height() as i64);
    if x < -1.0 || y < -1.0 || x > w as f64 || y > h as f64 {
        return [0, 0, 0, 0];
    }
    let x0 = x.floor() as i64;
    let y0 = y.floor() as i64;
    let fx = x - x0 as f64;
    let fy = y - y0 as f64;

    let fetch = |px: i64, py: i64| -> [u8; 4] {
        let cx = px.clamp(0, w - 1) as u32;
        let cy = py.clamp(0, h - 1) as u32;
        image.get_pixel(cx, cy).0
    };
    let p00 = fetch(x0, y0);
    let p10 = fetch(x0 + 1, y0);
    let p01 = fetch(x0, y0 + 1);
    let p11 = fetch(x0 + 1, y0 + 1);

    let mut out = [0u8; 4];
    for c in 0..4 {
        let top = p00[c] as f64 * (1.0 - fx) + p10[c] as f64 * fx;
        let bottom = p01[c] as f64 * (1.0 - fx) + p11[c] as f64 * fx;
        out[c] = (top * (1.0 - fy) + bottom * fy).round().clamp(0.0, 255.0) as u8;
    }
    out
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn center_is_fixed_and_small_angles_are_near_identity() {
        // With zero coefficients the model is pure equidistant projection:
        // identity at the center, θ/tan(θ) compression toward the edges.
        let k = CameraMatrix::new(1000.0, 1000.0, 32.0, 32.0);
        let map = UndistortMap::new(k, Distortion::default(), 64, 64);
        let (cx, cy) = map.map[32 * 64 + 32];
        assert!((cx - 32.0).abs() < 1e-6 && (cy - 32.0).abs() < 1e-6);
        for v in (0..64).step_by(7) {
            for u in (0..64).step_by(7) {
                let (sx, sy) = map.map[(v * 64 + u) as usize];
                // Angles here stay under 0.05 rad; drift under a hundredth
                // of a pixel.
                assert!((sx - u as f32).abs() < 1e-2, "{} vs {}", sx, u);
                assert!((sy - v as f32).abs() < 1e-2);
            }
        }
    }

    #[test]
    fn long_focal_remap_copies() {
        let frame = RgbaImage::from_fn(32, 32, |x, y| {
            image::Rgba([x as u8 * 8, y as u8 * 8, 0, 255])
        });
        let k = CameraMatrix::new(5000.0, 5000.0, 16.0, 16.0);
        let map = UndistortMap::new(k, Distortion::default(), 32, 32);
        let out = map.remap(&frame);
        for (x, y, pixel) in out.enumerate_pixels() {
            assert_eq!(pixel, frame.get_pixel(x, y), "({}, {})", x, y);
        }
    }

    #[test]
    fn barrel_distortion_pulls_corners_outward() {
        let k = CameraMatrix::new(100.0, 100.0, 50.0, 50.0);
        let d = Distortion([0.2, 0.0, 0.0, 0.0]);
        let map = UndistortMap::new(k, d, 100, 100);
        // At the corner the distorted sample sits farther from center than
        // the output pixel.
        let (sx, sy) = map.map[0];
        let out_r = ((0.0 - 50.0f64).powi(2) * 2.0).sqrt();
        let src_r = ((sx as f64 - 50.0).powi(2) + (sy as f64 - 50.0).powi(2)).sqrt();
        assert!(src_r > out_r * 0.9);
        // The center is a fixed point.
        let (cx, cy) = map.map[50 * 100 + 50];
        assert!((cx - 50.0).abs() < 0.5 && (cy - 50.0).abs() < 0.5);
    }

    #[test]
    fn cache_reuses_until_parameters_change() {
        let mut cache = UndistortCache::new();
        let k = CameraMatrix::new(10.0, 10.0, 4.0, 4.0);
        let d = Distortion::default();
        let first = cache.map(k, d, 8, 8) as *const UndistortMap;
        let second = cache.map(k, d, 8, 8) as *const UndistortMap;
        assert_eq!(first, second);
        cache.map(k, Distortion([0.1, 0.0, 0.0, 0.0]), 8, 8);
        assert!(cache.map.as_ref().unwrap().d != d);
    }
}
