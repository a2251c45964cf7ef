
use crate::foundation::core::{Point, RgbaFrame};
use crate::foundation::error::{StitchError, StitchResult};
use crate::vision::{CandidateMatch, Descriptors, Features, Keypoint};

/// Parameters of the built-in corner detector and patch descriptor.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct FeatureOptions {
    /// FAST-9 intensity threshold.
    pub fast_threshold: u8,
    /// Keep at most this many corners, strongest first.
    pub max_features: usize,
    /// Descriptor patch is `(2 * patch_radius + 1)^2` pixels.
    pub patch_radius: u32,
    /// Gaussian sigma applied before sampling patches.
    pub blur_sigma: f32,
}

impl Default for FeatureOptions {
    fn default() -> Self {
        Self {
            fast_threshold: 20,
            max_features: 1000,
            patch_radius: 5,
            blur_sigma: 1.2,
        }
    }
}

impl FeatureOptions {
    fn validate(&self) -> StitchResult<()> {
        if !self.blur_sigma.is_finite() || self.blur_sigma <= 0.0 {
            return Err(StitchError::configuration("blur_sigma must be > 0"));
        }
        if self.patch_radius == 0 {
            return Err(StitchError::configuration("patch_radius must be >= 1"));
        }
        Ok(())
    }
}

pub(crate) fn detect(frame: &RgbaFrame, opts: &FeatureOptions) -> StitchResult<Features> {
    opts.validate()?;
    let rgba = image::RgbaImage::from_raw(frame.width, frame.height, frame.data.clone())
        .ok_or_else(|| StitchError::image("rgba8 buffer does not match frame dimensions"))?;
    let gray = image::imageops::grayscale(&rgba);
    let blurred = imageproc::filter::gaussian_blur_f32(&gray, opts.blur_sigma);

    let r = opts.patch_radius;
    let mut corners: Vec<_> = imageproc::corners::corners_fast9(&gray, opts.fast_threshold)
        .into_iter()
        .filter(|c| c.x >= r && c.y >= r && c.x + r < frame.width && c.y + r < frame.height)
        .collect();
    corners.sort_by(|a, b| {
        b.score
            .total_cmp(&a.score)
            .then(a.y.cmp(&b.y))
            .then(a.x.cmp(&b.x))
    });

    let side = (2 * r + 1) as usize;
    let mut out = Features {
        keypoints: Vec::new(),
        descriptors: Descriptors {
            dim: side * side,
            data: Vec::new(),
        },
    };
    let mut patch = Vec::with_capacity(side * side);
    for c in corners {
        if out.keypoints.len() >= opts.max_features {
            break;
        }
        patch.clear();
        for y in (c.y - r)..=(c.y + r) {
            for x in (c.x - r)..=(c.x + r) {
                patch.push(f32::from(blurred.get_pixel(x, y)[0]));
            }
        }
        if !normalize_patch(&mut patch) {
            continue;
        }
        out.keypoints.push(Keypoint {
            pos: Point::new(f64::from(c.x), f64::from(c.y)),
            score: c.score,
        });
        out.descriptors.push(&patch);
    }
    Ok(out)
}

// Zero mean, unit norm; flat patches carry no information.
fn normalize_patch(patch: &mut [f32]) -> bool {
    let n = patch.len() as f32;
    let mean = patch.iter().sum::<f32>() / n;
    let mut norm = 0.0f32;
    for v in patch.iter_mut() {
        *v -= mean;
        norm += *v * *v;
    }
    let norm = norm.sqrt();
    if norm <= 1e-6 {
        return false;
    }
    for v in patch.iter_mut() {
        *v /= norm;
    }
    true
}

pub(crate) fn knn2(query: &Descriptors, train: &Descriptors) -> Vec<Vec<CandidateMatch>> {
    if query.dim != train.dim || train.is_empty() {
        return vec![Vec::new(); query.len()];
    }
    (0..query.len())
        .map(|q| {
            let qd = query.row(q);
            let mut best: [Option<CandidateMatch>; 2] = [None, None];
            for t in 0..train.len() {
                let distance = l2(qd, train.row(t));
                let cand = CandidateMatch {
                    query: q,
                    train: t,
                    distance,
                };
                match (best[0], best[1]) {
                    (None, _) => best[0] = Some(cand),
                    (Some(b0), _) if distance < b0.distance => {
                        best[1] = best[0];
                        best[0] = Some(cand);
                    }
                    (_, None) => best[1] = Some(cand),
                    (_, Some(b1)) if distance < b1.distance => best[1] = Some(cand),
                    _ => {}
                }
            }
            best.into_iter().flatten().collect()
        })
        .collect()
}

fn l2(a: &[f32], b: &[f32]) -> f32 {
    a.iter()
        .zip(b)
        .map(|(x, y)| (x - y) * (x - y))
        .sum::<f32>()
        .sqrt()
}

#[cfg(test)]
#[path = "../../tests/unit/vision/features.rs"]
mod tests;
