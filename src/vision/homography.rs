//! Homography estimation and point projection.
//!
//! `H` maps source points to destination points, `x' ~ H x`. Estimation is the
//! Hartley-normalized DLT wrapped in RANSAC and refit on the final inlier set.

use nalgebra::{DMatrix, Vector3};
use rand::SeedableRng;
use rand_pcg::Pcg64;

use crate::foundation::core::{Homography, Point};
use crate::foundation::error::{StitchError, StitchResult};
use crate::foundation::math::{is_finite_homography, normalize_homography};
use crate::vision::{HomographyEstimate, PointPair};

const EPS: f64 = 1e-12;
const SAMPLE_SIZE: usize = 4;

/// RANSAC parameters.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct RansacOptions {
    /// Maximum reprojection error, in pixels, for a correspondence to count as inlier.
    pub reproj_threshold: f64,
    /// Hard cap on sampling iterations.
    pub max_iterations: usize,
    /// Target probability of having drawn one all-inlier sample.
    pub confidence: f64,
    /// Seed for the sampler; estimation is deterministic for a given seed.
    pub seed: u64,
}

impl Default for RansacOptions {
    fn default() -> Self {
        Self {
            reproj_threshold: 2.0,
            max_iterations: 2000,
            confidence: 0.995,
            seed: 0x5eed_0f_5717c4,
        }
    }
}

/// Project `pts` through `h`. Returns `None` if any point lands at infinity.
pub fn apply_homography_points(h: &Homography, pts: &[Point]) -> Option<Vec<Point>> {
    pts.iter().map(|p| apply_one(h, *p)).collect()
}

fn apply_one(h: &Homography, p: Point) -> Option<Point> {
    let v = h * Vector3::new(p.x, p.y, 1.0);
    let w = v.z;
    if !w.is_finite() || w.abs() <= EPS || !v.x.is_finite() || !v.y.is_finite() {
        return None;
    }
    Some(Point::new(v.x / w, v.y / w))
}

// Zero-mean, average distance sqrt(2).
fn normalize_points(pts: impl Iterator<Item = Point> + Clone) -> Option<(Vec<Point>, Homography)> {
    let n = pts.clone().count();
    if n == 0 {
        return None;
    }
    let (sx, sy) = pts.clone().fold((0.0, 0.0), |(sx, sy), p| (sx + p.x, sy + p.y));
    let (cx, cy) = (sx / n as f64, sy / n as f64);
    let mean_dist = pts
        .clone()
        .map(|p| ((p.x - cx).powi(2) + (p.y - cy).powi(2)).sqrt())
        .sum::<f64>()
        / n as f64;
    if mean_dist <= EPS {
        return None;
    }
    let s = std::f64::consts::SQRT_2 / mean_dist;
    let t = Homography::new(s, 0.0, -s * cx, 0.0, s, -s * cy, 0.0, 0.0, 1.0);
    let out = pts
        .map(|p| Point::new(s * (p.x - cx), s * (p.y - cy)))
        .collect();
    Some((out, t))
}

/// Normalized DLT over all given pairs (at least four).
pub(crate) fn dlt(pairs: &[PointPair]) -> Option<Homography> {
    let n = pairs.len();
    if n < SAMPLE_SIZE {
        return None;
    }
    let (src_n, t_src) = normalize_points(pairs.iter().map(|p| p.src))?;
    let (dst_n, t_dst) = normalize_points(pairs.iter().map(|p| p.dst))?;

    // Pad to at least 9 rows so the SVD exposes the full right null space.
    let rows = (2 * n).max(9);
    let mut a = DMatrix::<f64>::zeros(rows, 9);
    for (i, (s, d)) in src_n.iter().zip(&dst_n).enumerate() {
        let (x, y, u, v) = (s.x, s.y, d.x, d.y);
        let r0 = 2 * i;
        let r1 = r0 + 1;

        a[(r0, 0)] = -x;
        a[(r0, 1)] = -y;
        a[(r0, 2)] = -1.0;
        a[(r0, 6)] = u * x;
        a[(r0, 7)] = u * y;
        a[(r0, 8)] = u;

        a[(r1, 3)] = -x;
        a[(r1, 4)] = -y;
        a[(r1, 5)] = -1.0;
        a[(r1, 6)] = v * x;
        a[(r1, 7)] = v * y;
        a[(r1, 8)] = v;
    }

    let svd = a.svd(false, true);
    let v_t = svd.v_t?;
    let (min_idx, _) = svd
        .singular_values
        .iter()
        .enumerate()
        .min_by(|a, b| a.1.total_cmp(b.1))?;
    let h_vec = v_t.row(min_idx);
    let hn = Homography::from_fn(|r, c| h_vec[3 * r + c]);

    let h = t_dst.try_inverse()? * hn * t_src;
    let h = normalize_homography(h);
    is_finite_homography(&h).then_some(h)
}

fn reprojection_error(h: &Homography, pair: &PointPair) -> f64 {
    match apply_one(h, pair.src) {
        Some(p) => ((p.x - pair.dst.x).powi(2) + (p.y - pair.dst.y).powi(2)).sqrt(),
        None => f64::INFINITY,
    }
}

fn inliers_of(h: &Homography, pairs: &[PointPair], threshold: f64) -> Vec<usize> {
    pairs
        .iter()
        .enumerate()
        .filter(|(_, p)| reprojection_error(h, p) <= threshold)
        .map(|(i, _)| i)
        .collect()
}

fn collinear(a: Point, b: Point, c: Point) -> bool {
    let area = (b.x - a.x) * (c.y - a.y) - (b.y - a.y) * (c.x - a.x);
    area.abs() < 1e-9
}

fn is_degenerate_sample(sample: &[PointPair; SAMPLE_SIZE]) -> bool {
    let triples = [[0, 1, 2], [0, 1, 3], [0, 2, 3], [1, 2, 3]];
    triples.iter().any(|&[i, j, k]| {
        collinear(sample[i].src, sample[j].src, sample[k].src)
            || collinear(sample[i].dst, sample[j].dst, sample[k].dst)
    })
}

fn required_iterations(inlier_ratio: f64, confidence: f64, cap: usize) -> usize {
    if inlier_ratio >= 1.0 {
        return 1;
    }
    let p_good = inlier_ratio.powi(SAMPLE_SIZE as i32);
    if p_good <= f64::EPSILON {
        return cap;
    }
    let k = (1.0 - confidence).ln() / (1.0 - p_good).ln();
    if k.is_finite() {
        (k.ceil() as usize).clamp(1, cap)
    } else {
        cap
    }
}

/// Robustly estimate `H` with `dst ~ H src`.
///
/// Fewer than four pairs, or no non-degenerate sample, yields zero inliers.
pub(crate) fn estimate_ransac(
    pairs: &[PointPair],
    opts: &RansacOptions,
) -> StitchResult<HomographyEstimate> {
    if !opts.reproj_threshold.is_finite() || opts.reproj_threshold <= 0.0 {
        return Err(StitchError::configuration("reproj_threshold must be > 0"));
    }
    if !(0.0..1.0).contains(&opts.confidence) {
        return Err(StitchError::configuration("confidence must be in [0, 1)"));
    }

    let none = HomographyEstimate {
        matrix: Homography::identity(),
        inliers: 0,
    };
    let n = pairs.len();
    if n < SAMPLE_SIZE {
        return Ok(none);
    }

    let mut rng = Pcg64::seed_from_u64(opts.seed);
    let mut best: Option<(Homography, Vec<usize>)> = None;
    let mut budget = opts.max_iterations.max(1);
    let mut iteration = 0;
    while iteration < budget {
        iteration += 1;
        let idx = rand::seq::index::sample(&mut rng, n, SAMPLE_SIZE);
        let sample = [
            pairs[idx.index(0)],
            pairs[idx.index(1)],
            pairs[idx.index(2)],
            pairs[idx.index(3)],
        ];
        if is_degenerate_sample(&sample) {
            continue;
        }
        let Some(h) = dlt(&sample) else {
            continue;
        };
        let inliers = inliers_of(&h, pairs, opts.reproj_threshold);
        if best.as_ref().is_none_or(|(_, b)| inliers.len() > b.len()) {
            let ratio = inliers.len() as f64 / n as f64;
            budget = budget.min(required_iterations(
                ratio,
                opts.confidence,
                opts.max_iterations.max(1),
            ));
            best = Some((h, inliers));
        }
    }

    let Some((mut h, mut inliers)) = best else {
        return Ok(none);
    };
    if inliers.len() > SAMPLE_SIZE {
        let subset: Vec<PointPair> = inliers.iter().map(|&i| pairs[i]).collect();
        if let Some(refit) = dlt(&subset) {
            let refit_inliers = inliers_of(&refit, pairs, opts.reproj_threshold);
            if refit_inliers.len() >= inliers.len() {
                h = refit;
                inliers = refit_inliers;
            }
        }
    }

    tracing::debug!(
        iterations = iteration,
        inliers = inliers.len(),
        total = n,
        "ransac homography"
    );
    Ok(HomographyEstimate {
        matrix: h,
        inliers: inliers.len(),
    })
}

#[cfg(test)]
#[path = "../../tests/unit/vision/homography.rs"]
mod tests;
