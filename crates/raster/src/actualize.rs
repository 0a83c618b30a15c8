//! Raster actualization.
//!
//! Bakes an image's transform plus a raster step into the pixel data, so the
//! engrave planner can walk the result at exactly one pixel per step. The
//! output transform degenerates to `translate · scale(step)`, which is the
//! only form the device-side raster walk understands.

use image::RgbaImage;
use thiserror::Error;

use kerf_geom::{point, Matrix, Point};

#[derive(Error, Debug, Clone, PartialEq)]
pub enum ActualizeError {
    #[error("Image transform is singular; nothing to resample.")]
    SingularTransform,
    #[error("Actualized size {0}x{1} is degenerate.")]
    EmptyOutput(i64, i64),
}

/// The result of baking: resampled pixels and the residual transform.
#[derive(Debug, Clone)]
pub struct Actualized {
    pub image: RgbaImage,
    /// Always `translate(tx, ty) · scale(step, step)` composed with the
    /// bounding-box shift.
    pub transform: Matrix,
}

/// Resamples `image` so its transform reduces to a pure step scale.
///
/// The translation is lifted off the matrix, the device space is divided by
/// `step`, the image is inverse-mapped through the remaining linear part
/// with bicubic sampling, and the lifted translation comes back composed
/// with `scale(step)`.
pub fn actualize(image: &RgbaImage, transform: &Matrix, step: f64) -> Result<Actualized, ActualizeError> {
    let tx = transform.trans_x();
    let ty = transform.trans_y();
    let mut m = *transform;
    m.e = 0.0;
    m.f = 0.0;
    m.post_cat(&Matrix::scale(1.0 / step, 1.0 / step));

    let (w, h) = (image.width() as f64, image.height() as f64);
    let corners = [
        m.transform_point(point(0.0, 0.0)),
        m.transform_point(point(w, 0.0)),
        m.transform_point(point(0.0, h)),
        m.transform_point(point(w, h)),
    ];
    let min_x = corners.iter().fold(f64::MAX, |acc, p| acc.min(p.x));
    let min_y = corners.iter().fold(f64::MAX, |acc, p| acc.min(p.y));
    let max_x = corners.iter().fold(f64::MIN, |acc, p| acc.max(p.x));
    let max_y = corners.iter().fold(f64::MIN, |acc, p| acc.max(p.y));

    let out_w = (max_x - min_x).ceil() as i64;
    let out_h = (max_y - min_y).ceil() as i64;
    if out_w <= 0 || out_h <= 0 {
        return Err(ActualizeError::EmptyOutput(out_w, out_h));
    }

    m.post_cat(&Matrix::translate(-min_x, -min_y));
    let inverse = m
        .inverse()
        .map_err(|_| ActualizeError::SingularTransform)?;

    let mut out = RgbaImage::new(out_w as u32, out_h as u32);
    for oy in 0..out_h {
        for ox in 0..out_w {
            // Inverse-map the output pixel center into source space.
            let src = inverse.transform_point(point(ox as f64 + 0.5, oy as f64 + 0.5));
            let pixel = sample_bicubic(image, src);
            out.put_pixel(ox as u32, oy as u32, image::Rgba(pixel));
        }
    }

    let transform = Matrix::translate(tx, ty)
        * Matrix::scale(step, step)
        * Matrix::translate(min_x, min_y);

    Ok(Actualized {
        image: out,
        transform,
    })
}

/// Catmull-Rom bicubic sample at a fractional source position.
///
/// Samples fully outside the image are transparent; edge samples clamp.
fn sample_bicubic(image: &RgbaImage, p: Point) -> [u8; 4] {
    let (w, h) = (image.width() as i64, image.height() as i64);
    let x = p.x - 0.5;
    let y = p.y - 0.5;
    if x < -1.0 || y < -1.0 || x > w as f64 || y > h as f64 {
        return [0, 0, 0, 0];
    }

    let x0 = x.floor() as i64;
    let y0 = y.floor() as i64;
    let fx = x - x0 as f64;
    let fy = y - y0 as f64;

    let wx = kernel_weights(fx);
    let wy = kernel_weights(fy);

    let mut acc = [0.0f64; 4];
    for (j, wy_j) in wy.iter().enumerate() {
        let sy = (y0 - 1 + j as i64).clamp(0, h - 1);
        for (i, wx_i) in wx.iter().enumerate() {
            let sx = (x0 - 1 + i as i64).clamp(0, w - 1);
            let pixel = image.get_pixel(sx as u32, sy as u32).0;
            let weight = wx_i * wy_j;
            for c in 0..4 {
                acc[c] += pixel[c] as f64 * weight;
            }
        }
    }
    let mut out = [0u8; 4];
    for c in 0..4 {
        out[c] = acc[c].round().clamp(0.0, 255.0) as u8;
    }
    out
}

/// Cubic convolution weights for the four taps around a fraction.
fn kernel_weights(t: f64) -> [f64; 4] {
    const A: f64 = -0.5;
    let w = |d: f64| -> f64 {
        let d = d.abs();
        if d <= 1.0 {
            (A + 2.0) * d * d * d - (A + 3.0) * d * d + 1.0
        } else if d < 2.0 {
            A * (d * d * d - 5.0 * d * d + 8.0 * d - 4.0)
        } else {
            0.0
        }
    };
    [w(1.0 + t), w(t), w(1.0 - t), w(2.0 - t)]
}

#[cfg(test)]
mod tests {
    use super::*;

    fn checker(size: u32) -> RgbaImage {
        RgbaImage::from_fn(size, size, |x, y| {
            if (x / 4 + y / 4) % 2 == 0 {
                image::Rgba([0, 0, 0, 255])
            } else {
                image::Rgba([255, 255, 255, 255])
            }
        })
    }

    #[test]
    fn translation_only_is_lossless_at_step_one() {
        let img = checker(16);
        let m = Matrix::translate(40.0, 25.0);
        let result = actualize(&img, &m, 1.0).unwrap();
        assert_eq!(result.image.dimensions(), (16, 16));
        for (x, y, pixel) in result.image.enumerate_pixels() {
            assert_eq!(pixel, img.get_pixel(x, y), "pixel ({}, {})", x, y);
        }
        assert!(result
            .transform
            .approx_eq(&Matrix::translate(40.0, 25.0), 1e-9));
    }

    #[test]
    fn step_halves_resolution() {
        let img = checker(16);
        let m = Matrix::identity();
        let result = actualize(&img, &m, 2.0).unwrap();
        assert_eq!(result.image.dimensions(), (8, 8));
        assert!(result.transform.approx_eq(&Matrix::scale(2.0, 2.0), 1e-9));
    }

    #[test]
    fn scale_bakes_into_pixels() {
        let img = checker(8);
        let m = Matrix::scale(4.0, 4.0);
        let result = actualize(&img, &m, 1.0).unwrap();
        assert_eq!(result.image.dimensions(), (32, 32));
        // A black source cell stays black after upscaling.
        assert_eq!(result.image.get_pixel(1, 1).0[3], 255);
        assert_eq!(result.image.get_pixel(1, 1).0[0], 0);
    }

    #[test]
    fn rotation_shift_is_folded_into_transform() {
        let img = checker(10);
        let m = Matrix::rotate(kerf_geom::Angle::degrees(45.0));
        let result = actualize(&img, &m, 1.0).unwrap();
        // A rotated 10x10 box needs a diagonal-sized canvas.
        let (w, h) = result.image.dimensions();
        assert!(w >= 14 && h >= 14);
        // Reconstruction: transform maps the output origin back to the
        // rotated bbox corner.
        let origin = result.transform.transform_point(point(0.0, 0.0));
        assert!((origin.x - -(50.0f64.sqrt())).abs() < 1.0);
    }

    #[test]
    fn singular_matrix_is_an_error() {
        let img = checker(4);
        let m = Matrix::scale(0.0, 1.0);
        assert!(actualize(&img, &m, 1.0).is_err());
    }
}
