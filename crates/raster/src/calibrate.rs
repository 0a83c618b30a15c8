//! Fisheye camera calibration.
//!
//! Accumulates 6×9 checkerboard corner sets across snapshots and solves for
//! the camera matrix and distortion coefficients. Corner *detection* is the
//! camera interface's concern; this module consumes detected corners.
//!
//! The solver alternates: undistort the observed corners with the current
//! estimate, fit plane homographies, re-derive the camera matrix (Zhang's
//! closed form, skew fixed at zero), recompute the extrinsics per view and
//! refit the distortion polynomial linearly. Ill-conditioned input discards
//! the most recent frame so the operator can present another pose.

use nalgebra::{DMatrix, DVector, Matrix3, Vector3};
use thiserror::Error;

use kerf_geom::{point, Point};

use crate::fisheye::{CameraMatrix, Distortion};

/// Checkerboard inner-corner grid: 6 columns by 9 rows.
pub const CHECKERBOARD: (usize, usize) = (6, 9);

const MIN_FRAMES: usize = 3;
const ITERATIONS: usize = 8;

#[derive(Error, Debug, Clone, PartialEq)]
pub enum CalibrationError {
    #[error("Need at least {need} corner frames, have {have}.")]
    NeedMoreFrames { have: usize, need: usize },
    #[error("Expected {expected} corners, got {got}.")]
    WrongCornerCount { got: usize, expected: usize },
    #[error("Ill-conditioned input; the most recent frame was discarded.")]
    IllConditioned,
}

/// A calibration session for one camera.
pub struct CalibrationSession {
    image_size: (u32, u32),
    object_points: Vec<Point>,
    frames: Vec<Vec<Point>>,
}

impl CalibrationSession {
    pub fn new(width: u32, height: u32) -> CalibrationSession {
        let mut object_points = Vec::with_capacity(CHECKERBOARD.0 * CHECKERBOARD.1);
        for y in 0..CHECKERBOARD.1 {
            for x in 0..CHECKERBOARD.0 {
                object_points.push(point(x as f64, y as f64));
            }
        }
        CalibrationSession {
            image_size: (width, height),
            object_points,
            frames: Vec::new(),
        }
    }

    /// The planar object grid the corners must be ordered against.
    pub fn object_points(&self) -> &[Point] {
        &self.object_points
    }

    pub fn frame_count(&self) -> usize {
        self.frames.len()
    }

    /// Adds one snapshot's detected corners. Returns the frame count.
    pub fn add_frame(&mut self, corners: &[Point]) -> Result<usize, CalibrationError> {
        let expected = CHECKERBOARD.0 * CHECKERBOARD.1;
        if corners.len() != expected {
            return Err(CalibrationError::WrongCornerCount {
                got: corners.len(),
                expected,
            });
        }
        self.frames.push(corners.to_vec());
        Ok(self.frames.len())
    }

    /// Solves for `(K, D)`.
    ///
    /// On ill-conditioned input the most recent frame is dropped and the
    /// error asks the caller for another snapshot.
    pub fn solve(&mut self) -> Result<(CameraMatrix, Distortion), CalibrationError> {
        if self.frames.len() < MIN_FRAMES {
            return Err(CalibrationError::NeedMoreFrames {
                have: self.frames.len(),
                need: MIN_FRAMES,
            });
        }

        let (width, height) = self.image_size;
        let mut k = CameraMatrix::initial_guess(width, height);
        let mut d = Distortion::default();

        let result = (|| {
            for _ in 0..ITERATIONS {
                let ideal_frames: Vec<Vec<Point>> = self
                    .frames
                    .iter()
                    .map(|frame| frame.iter().map(|p| undistort_to_pixel(*p, &k, &d)).collect())
                    .collect();

                let mut homographies = Vec::with_capacity(ideal_frames.len());
                for frame in &ideal_frames {
                    homographies
                        .push(homography(&self.object_points, frame).ok_or(CalibrationError::IllConditioned)?);
                }

                k = zhang_intrinsics(&homographies)?;
                d = fit_distortion(&self.object_points, &self.frames, &homographies, &k)?;
            }
            Ok((k, d))
        })();

        if result.is_err() {
            // Ask for a fresh pose in place of the one that broke the solve.
            self.frames.pop();
        }
        result
    }
}

/// Moves an observed pixel onto the ideal pinhole image using the current
/// model estimate.
fn undistort_to_pixel(p: Point, k: &CameraMatrix, d: &Distortion) -> Point {
    let xd = (p.x - k.cx) / k.fx;
    let yd = (p.y - k.cy) / k.fy;
    let theta_d = (xd * xd + yd * yd).sqrt();
    if theta_d < 1e-9 {
        return p;
    }
    // Invert θ_d = θ(1 + k1θ² + …) by Newton from θ ≈ θ_d.
    let mut theta = theta_d;
    for _ in 0..10 {
        let f = d.distort(theta) - theta_d;
        let h = 1e-7;
        let df = (d.distort(theta + h) - d.distort(theta - h)) / (2.0 * h);
        if df.abs() < 1e-12 {
            break;
        }
        theta -= f / df;
    }
    let r = theta.tan();
    let scale = r / theta_d;
    point(k.fx * xd * scale + k.cx, k.fy * yd * scale + k.cy)
}

/// DLT plane homography with isotropic normalization.
fn homography(src: &[Point], dst: &[Point]) -> Option<Matrix3<f64>> {
    let t_src = normalization(src)?;
    let t_dst = normalization(dst)?;
    let norm = |t: &Matrix3<f64>, p: &Point| -> (f64, f64) {
        let v = t * Vector3::new(p.x, p.y, 1.0);
        (v.x / v.z, v.y / v.z)
    };

    let mut a = DMatrix::<f64>::zeros(2 * src.len(), 9);
    for (i, (s, t)) in src.iter().zip(dst.iter()).enumerate() {
        let (x, y) = norm(&t_src, s);
        let (u, v) = norm(&t_dst, t);
        let rows = [
            [-x, -y, -1.0, 0.0, 0.0, 0.0, u * x, u * y, u],
            [0.0, 0.0, 0.0, -x, -y, -1.0, v * x, v * y, v],
        ];
        for (j, row) in rows.iter().enumerate() {
            for (c, value) in row.iter().enumerate() {
                a[(i * 2 + j, c)] = *value;
            }
        }
    }

    let svd = a.svd(false, true);
    let v_t = svd.v_t?;
    let h = v_t.row(v_t.nrows() - 1);
    let hn = Matrix3::new(h[0], h[1], h[2], h[3], h[4], h[5], h[6], h[7], h[8]);

    let t_dst_inv = t_dst.try_inverse()?;
    let result = t_dst_inv * hn * t_src;
    if result[(2, 2)].abs() < 1e-15 {
        return None;
    }
    Some(result / result[(2, 2)])
}

/// Hartley normalization: centroid to origin, mean distance √2.
fn normalization(points: &[Point]) -> Option<Matrix3<f64>> {
    let n = points.len() as f64;
    let cx = points.iter().map(|p| p.x).sum::<f64>() / n;
    let cy = points.iter().map(|p| p.y).sum::<f64>() / n;
    let mean_dist = points
        .iter()
        .map(|p| ((p.x - cx).powi(2) + (p.y - cy).powi(2)).sqrt())
        .sum::<f64>()
        / n;
    if mean_dist < 1e-12 {
        return None;
    }
    let s = std::f64::consts::SQRT_2 / mean_dist;
    Some(Matrix3::new(s, 0.0, -s * cx, 0.0, s, -s * cy, 0.0, 0.0, 1.0))
}

/// Zhang's closed-form intrinsics with the skew fixed at zero.
///
/// `B = K⁻ᵀK⁻¹` is parameterized as `(B11, B22, B13, B23, B33)`; each view's
/// homography contributes the two orthogonality constraints.
fn zhang_intrinsics(homographies: &[Matrix3<f64>]) -> Result<CameraMatrix, CalibrationError> {
    let v = |h: &Matrix3<f64>, i: usize, j: usize| -> [f64; 5] {
        // h(row, col): column vectors h_i index the plane axes.
        [
            h[(0, i)] * h[(0, j)],
            h[(1, i)] * h[(1, j)],
            h[(2, i)] * h[(0, j)] + h[(0, i)] * h[(2, j)],
            h[(2, i)] * h[(1, j)] + h[(1, i)] * h[(2, j)],
            h[(2, i)] * h[(2, j)],
        ]
    };

    let mut a = DMatrix::<f64>::zeros(2 * homographies.len(), 5);
    for (idx, h) in homographies.iter().enumerate() {
        let v12 = v(h, 0, 1);
        let v11 = v(h, 0, 0);
        let v22 = v(h, 1, 1);
        for c in 0..5 {
            a[(idx * 2, c)] = v12[c];
            a[(idx * 2 + 1, c)] = v11[c] - v22[c];
        }
    }

    let svd = a.svd(false, true);
    let singular = &svd.singular_values;
    let largest = singular[0];
    // Two near-zero singular values mean the views do not constrain the
    // intrinsics (coincident or degenerate poses).
    if singular.len() < 5 || singular[3] / largest < 1e-10 {
        return Err(CalibrationError::IllConditioned);
    }
    let v_t = svd.v_t.ok_or(CalibrationError::IllConditioned)?;
    let b = v_t.row(v_t.nrows() - 1);
    let (b11, b22, b13, b23, b33) = (b[0], b[1], b[2], b[3], b[4]);
    let sign = if b11 < 0.0 { -1.0 } else { 1.0 };
    let (b11, b22, b13, b23, b33) = (sign * b11, sign * b22, sign * b13, sign * b23, sign * b33);

    if b11.abs() < 1e-15 || b22.abs() < 1e-15 {
        return Err(CalibrationError::IllConditioned);
    }
    let cy = -b23 / b22;
    let lambda = b33 - (b13 * b13) / b11 + cy * b23;
    let fx_sq = lambda / b11;
    let fy_sq = lambda / b22;
    if fx_sq <= 0.0 || fy_sq <= 0.0 || !fx_sq.is_finite() || !fy_sq.is_finite() {
        return Err(CalibrationError::IllConditioned);
    }
    let fx = fx_sq.sqrt();
    let fy = fy_sq.sqrt();
    let cx = -b13 * fx * fx / lambda;

    Ok(CameraMatrix::new(fx, fy, cx, cy))
}

/// Linear least-squares fit of `k1..k4` given the intrinsics and per-view
/// extrinsics recomputed from the homographies.
fn fit_distortion(
    object_points: &[Point],
    frames: &[Vec<Point>],
    homographies: &[Matrix3<f64>],
    k: &CameraMatrix,
) -> Result<Distortion, CalibrationError> {
    let k_inv = Matrix3::new(
        1.0 / k.fx,
        0.0,
        -k.cx / k.fx,
        0.0,
        1.0 / k.fy,
        -k.cy / k.fy,
        0.0,
        0.0,
        1.0,
    );

    let mut rows: Vec<[f64; 4]> = Vec::new();
    let mut rhs: Vec<f64> = Vec::new();

    for (frame, h) in frames.iter().zip(homographies.iter()) {
        let m = k_inv * h;
        let m1 = m.column(0).into_owned();
        let m2 = m.column(1).into_owned();
        let m3 = m.column(2).into_owned();
        let scale = 1.0 / m1.norm();
        if !scale.is_finite() {
            return Err(CalibrationError::IllConditioned);
        }
        let r1 = m1 * scale;
        let r2 = m2 * scale;
        let t = m3 * scale;

        for (object, observed) in object_points.iter().zip(frame.iter()) {
            let pc: Vector3<f64> = r1 * object.x + r2 * object.y + t;
            if pc.z.abs() < 1e-9 {
                continue;
            }
            let x = pc.x / pc.z;
            let y = pc.y / pc.z;
            let r = (x * x + y * y).sqrt();
            if r < 1e-9 {
                continue;
            }
            let theta = r.atan();

            let xd = (observed.x - k.cx) / k.fx;
            let yd = (observed.y - k.cy) / k.fy;
            let theta_d_obs = (xd * xd + yd * yd).sqrt();

            let t2 = theta * theta;
            rows.push([
                theta * t2,
                theta * t2 * t2,
                theta * t2 * t2 * t2,
                theta * t2 * t2 * t2 * t2,
            ]);
            rhs.push(theta_d_obs - theta);
        }
    }

    if rows.len() < 8 {
        return Err(CalibrationError::IllConditioned);
    }
    let a = DMatrix::<f64>::from_fn(rows.len(), 4, |r, c| rows[r][c]);
    let b = DVector::<f64>::from_vec(rhs);
    let solution = a
        .svd(true, true)
        .solve(&b, 1e-12)
        .map_err(|_| CalibrationError::IllConditioned)?;
    let coefficients = [solution[0], solution[1], solution[2], solution[3]];
    if coefficients.iter().any(|c| !c.is_finite()) {
        return Err(CalibrationError::IllConditioned);
    }
    Ok(Distortion(coefficients))
}

#[cfg(test)]
mod tests {
    use super::*;

    fn rotation(rx: f64, ry: f64) -> Matrix3<f64> {
        let (sx, cx) = rx.sin_cos();
        let (sy, cy) = ry.sin_cos();
        let rot_x = Matrix3::new(1.0, 0.0, 0.0, 0.0, cx, -sx, 0.0, sx, cx);
        let rot_y = Matrix3::new(cy, 0.0, sy, 0.0, 1.0, 0.0, -sy, 0.0, cy);
        rot_x * rot_y
    }

    fn project(
        object: &[Point],
        k: &CameraMatrix,
        d: &Distortion,
        r: &Matrix3<f64>,
        t: &Vector3<f64>,
    ) -> Vec<Point> {
        object
            .iter()
            .map(|p| {
                let pc = r * Vector3::new(p.x, p.y, 0.0) + t;
                let x = pc.x / pc.z;
                let y = pc.y / pc.z;
                let radius = (x * x + y * y).sqrt();
                if radius < 1e-12 {
                    return point(k.cx, k.cy);
                }
                let theta_d = d.distort(radius.atan());
                let scale = theta_d / radius;
                point(k.fx * x * scale + k.cx, k.fy * y * scale + k.cy)
            })
            .collect()
    }

    #[test]
    fn corner_count_enforced() {
        let mut session = CalibrationSession::new(640, 480);
        assert_eq!(
            session.add_frame(&[point(0.0, 0.0); 10]),
            Err(CalibrationError::WrongCornerCount {
                got: 10,
                expected: 54
            })
        );
        assert_eq!(session.add_frame(&[point(0.0, 0.0); 54]), Ok(1));
    }

    #[test]
    fn too_few_frames() {
        let mut session = CalibrationSession::new(640, 480);
        session.add_frame(&vec![point(0.0, 0.0); 54]).unwrap();
        match session.solve() {
            Err(CalibrationError::NeedMoreFrames { have: 1, need }) => assert_eq!(need, 3),
            other => panic!("{:?}", other),
        }
    }

    #[test]
    fn recovers_synthetic_camera() {
        let k_true = CameraMatrix::new(600.0, 600.0, 320.0, 240.0);
        let d_true = Distortion([0.08, 0.0, 0.0, 0.0]);
        let mut session = CalibrationSession::new(640, 480);
        let object: Vec<Point> = session.object_points().to_vec();

        let poses = [
            (0.25, 0.1, Vector3::new(-2.5, -4.0, 12.0)),
            (-0.2, 0.25, Vector3::new(-2.0, -4.5, 11.0)),
            (0.1, -0.3, Vector3::new(-3.0, -3.5, 13.0)),
            (-0.3, -0.15, Vector3::new(-2.5, -4.0, 12.5)),
        ];
        for (rx, ry, t) in poses {
            let corners = project(&object, &k_true, &d_true, &rotation(rx, ry), &t);
            session.add_frame(&corners).unwrap();
        }

        let (k, d) = session.solve().expect("calibration should converge");
        assert!((k.fx - 600.0).abs() / 600.0 < 0.1, "fx = {}", k.fx);
        assert!((k.fy - 600.0).abs() / 600.0 < 0.1, "fy = {}", k.fy);
        assert!((k.cx - 320.0).abs() < 25.0, "cx = {}", k.cx);
        assert!((k.cy - 240.0).abs() < 25.0, "cy = {}", k.cy);
        assert!((d.0[0] - 0.08).abs() < 0.05, "k1 = {}", d.0[0]);
    }

    #[test]
    fn degenerate_frames_discard_most_recent() {
        let k_true = CameraMatrix::new(600.0, 600.0, 320.0, 240.0);
        let mut session = CalibrationSession::new(640, 480);
        let object: Vec<Point> = session.object_points().to_vec();
        // The same pose three times constrains nothing.
        let corners = project(
            &object,
            &k_true,
            &Distortion::default(),
            &rotation(0.2, 0.1),
            &Vector3::new(-2.5, -4.0, 12.0),
        );
        for _ in 0..3 {
            session.add_frame(&corners).unwrap();
        }
        assert_eq!(session.solve(), Err(CalibrationError::IllConditioned));
        assert_eq!(session.frame_count(), 2);
    }
}
