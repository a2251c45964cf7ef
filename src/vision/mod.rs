//! Vision primitives consumed by the stitching core.
//!
//! The core never detects, matches, estimates or resamples on its own: it calls a
//! [`VisionPrimitives`] implementation. [`NativeVision`] is the built-in one.

pub(crate) mod features;
pub(crate) mod homography;
pub(crate) mod warp;

use crate::foundation::core::{Homography, Point, RgbaFrame};
use crate::foundation::error::StitchResult;

pub use features::FeatureOptions;
pub use homography::RansacOptions;

/// A detected interest point in `(x, y)` pixel coordinates.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct Keypoint {
    /// Position in the image's pixel frame.
    pub pos: Point,
    /// Detector response; larger is stronger.
    pub score: f32,
}

/// Row-major descriptor matrix, one row of `dim` floats per keypoint.
#[derive(Clone, Debug, Default, PartialEq)]
pub struct Descriptors {
    /// Length of a single descriptor.
    pub dim: usize,
    /// `len() * dim` values.
    pub data: Vec<f32>,
}

impl Descriptors {
    /// Number of descriptors.
    pub fn len(&self) -> usize {
        if self.dim == 0 {
            0
        } else {
            self.data.len() / self.dim
        }
    }

    /// Whether there are no descriptors.
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Descriptor `i`.
    pub fn row(&self, i: usize) -> &[f32] {
        &self.data[i * self.dim..(i + 1) * self.dim]
    }

    /// Append one descriptor; its length must equal `dim`.
    pub fn push(&mut self, row: &[f32]) {
        debug_assert_eq!(row.len(), self.dim);
        self.data.extend_from_slice(row);
    }
}

/// Keypoints and their descriptors; `keypoints[i]` pairs with `descriptors.row(i)`.
#[derive(Clone, Debug, Default, PartialEq)]
pub struct Features {
    /// Detected keypoints.
    pub keypoints: Vec<Keypoint>,
    /// One descriptor per keypoint.
    pub descriptors: Descriptors,
}

/// One nearest-neighbour candidate for a query descriptor.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct CandidateMatch {
    /// Index into the query descriptor set.
    pub query: usize,
    /// Index into the train descriptor set.
    pub train: usize,
    /// Descriptor distance.
    pub distance: f32,
}

/// A correspondence expressed as points: `src` in one image, `dst` in the other.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct PointPair {
    /// Point in the source image.
    pub src: Point,
    /// Point in the destination image.
    pub dst: Point,
}

/// Result of robust two-view homography estimation.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct HomographyEstimate {
    /// Transform mapping source points onto destination points.
    pub matrix: Homography,
    /// Number of correspondences consistent with `matrix`.
    pub inliers: usize,
}

/// The capability set the stitching core needs from a vision backend.
pub trait VisionPrimitives: Send + Sync {
    /// Detect keypoints and compute descriptors for one image.
    fn detect_features(&self, frame: &RgbaFrame) -> StitchResult<Features>;

    /// For every query descriptor, its two nearest train descriptors in ascending distance.
    fn match_descriptors(&self, query: &Descriptors, train: &Descriptors)
    -> Vec<Vec<CandidateMatch>>;

    /// Estimate the homography mapping `src` onto `dst` for each pair.
    fn estimate_homography(&self, pairs: &[PointPair]) -> StitchResult<HomographyEstimate>;

    /// Project points through `h`; `None` if any point maps to infinity.
    fn transform_points(&self, points: &[Point], h: &Homography) -> Option<Vec<Point>>;

    /// Resample `frame` through `h` into a new `size.0 x size.1` frame.
    fn warp_image(
        &self,
        frame: &RgbaFrame,
        h: &Homography,
        size: (u32, u32),
    ) -> StitchResult<RgbaFrame>;
}

/// Built-in CPU implementation: FAST corners + patch descriptors, brute-force 2-NN,
/// normalized DLT in RANSAC, bilinear perspective warp.
#[derive(Clone, Debug, Default)]
pub struct NativeVision {
    /// Detector and descriptor parameters.
    pub features: FeatureOptions,
    /// Robust estimation parameters.
    pub ransac: RansacOptions,
}

impl VisionPrimitives for NativeVision {
    fn detect_features(&self, frame: &RgbaFrame) -> StitchResult<Features> {
        features::detect(frame, &self.features)
    }

    fn match_descriptors(
        &self,
        query: &Descriptors,
        train: &Descriptors,
    ) -> Vec<Vec<CandidateMatch>> {
        features::knn2(query, train)
    }

    fn estimate_homography(&self, pairs: &[PointPair]) -> StitchResult<HomographyEstimate> {
        homography::estimate_ransac(pairs, &self.ransac)
    }

    fn transform_points(&self, points: &[Point], h: &Homography) -> Option<Vec<Point>> {
        homography::apply_homography_points(h, points)
    }

    fn warp_image(
        &self,
        frame: &RgbaFrame,
        h: &Homography,
        size: (u32, u32),
    ) -> StitchResult<RgbaFrame> {
        warp::warp_perspective(frame, h, size)
    }
}
