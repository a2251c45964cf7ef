//! Panostitch assembles overlapping photographs into a single panorama.
//!
//! Images are added to a [`Stitcher`] one at a time. Each new image is matched against
//! every image already in the session and pairs with enough correspondences become edges of
//! a weighted match graph. Stitching then runs:
//!
//! 1. **Validate**: the match graph must be connected; otherwise every image outside the
//!    largest component is reported.
//! 2. **Center**: the image with the smallest worst-case shortest-path distance to all
//!    others becomes the reference frame.
//! 3. **Compose**: pairwise homographies are estimated along the shortest-path tree rooted
//!    at the center and chained so every image maps into the center's frame.
//! 4. **Plan**: projected corners give each image's placement and the canvas bounds; the
//!    draw order paints far images first and the center last.
//! 5. **Composite**: every image is warped into its placement and blended source-over onto
//!    the canvas.
//!
//! Pixels are premultiplied RGBA8 throughout. Feature detection, matching, estimation and
//! warping go through the [`VisionPrimitives`] trait; [`NativeVision`] is the built-in
//! CPU implementation.
#![forbid(unsafe_code)]
#![deny(missing_docs)]
#![allow(missing_docs_in_private_items)]

mod compose;
mod config;
mod foundation;
mod graph;
mod matches;
mod render;
mod session;
mod vision;

pub use compose::planner::{ImagePlacement, StitchPlan};
pub use config::{MIN_HOMOGRAPHY_CORRESPONDENCES, StitchThreading, StitcherConfig};
pub use foundation::core::{FittingRect, Homography, Point, Rect, RgbaFrame, fitting_rectangle};
pub use foundation::error::{StitchError, StitchResult};
pub use foundation::math::translation;
pub use graph::center::{eccentricities, select_center};
pub use graph::match_graph::MatchGraph;
pub use graph::tree::SpanningTree;
pub use matches::store::{
    Correspondence, CorrespondenceStore, MatchRecord, PairKey, ratio_filter,
};
pub use render::compositor::{PremulRgba8, over, paste_over};
pub use session::Stitcher;
pub use vision::{
    CandidateMatch, Descriptors, FeatureOptions, Features, HomographyEstimate, Keypoint,
    NativeVision, PointPair, RansacOptions, VisionPrimitives,
};
