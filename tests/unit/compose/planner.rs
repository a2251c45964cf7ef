use super::*;
use crate::foundation::math::translation;
use crate::vision::{
    CandidateMatch, Descriptors, Features, HomographyEstimate, NativeVision, PointPair,
};

fn frame(w: u32, h: u32) -> RgbaFrame {
    RgbaFrame::from_premul(w, h, vec![255; (w * h * 4) as usize]).unwrap()
}

fn names(n: usize) -> Vec<String> {
    (0..n).map(|i| format!("img{i}")).collect()
}

#[test]
fn single_image_plan_covers_the_image() {
    let f = frame(40, 30);
    let tree = SpanningTree::new(0, vec![None]).unwrap();
    let plan = plan_layout(
        &tree,
        &[Homography::identity()],
        &[&f],
        &names(1),
        &NativeVision::default(),
    )
    .unwrap();
    assert_eq!(plan.center, 0);
    assert_eq!(plan.draw_order, vec![0]);
    assert_eq!(
        plan.bounds,
        FittingRect {
            left: 0,
            top: 0,
            width: 40,
            height: 30,
        }
    );
    assert_eq!(plan.canvas_size(), (40, 30));
    assert_eq!(plan.canvas_offset(0), Some((0, 0)));
    assert_eq!(
        plan.images[0].corners,
        [
            Point::new(0.0, 0.0),
            Point::new(40.0, 0.0),
            Point::new(40.0, 30.0),
            Point::new(0.0, 30.0),
        ]
    );
}

#[test]
fn fractional_offsets_round_outward() {
    let a = frame(40, 30);
    let b = frame(40, 30);
    let tree = SpanningTree::new(1, vec![Some(1), None]).unwrap();
    let plan = plan_layout(
        &tree,
        &[translation(-12.5, 3.25), Homography::identity()],
        &[&a, &b],
        &names(2),
        &NativeVision::default(),
    )
    .unwrap();
    assert_eq!(
        plan.images[0].rect,
        FittingRect {
            left: -13,
            top: 3,
            width: 41,
            height: 31,
        }
    );
    assert_eq!(
        plan.bounds,
        FittingRect {
            left: -13,
            top: 0,
            width: 53,
            height: 34,
        }
    );
    assert!(plan.images.iter().all(|p| plan.bounds.contains_rect(p.rect)));
    assert_eq!(plan.canvas_offset(0), Some((0, 3)));
    assert_eq!(plan.canvas_offset(1), Some((13, 0)));
    assert_eq!(plan.draw_order, vec![0, 1]);
}

#[test]
fn non_square_images_keep_their_orientation() {
    let wide = frame(64, 8);
    let tree = SpanningTree::new(0, vec![None]).unwrap();
    let plan = plan_layout(
        &tree,
        &[Homography::identity()],
        &[&wide],
        &names(1),
        &NativeVision::default(),
    )
    .unwrap();
    assert_eq!(plan.canvas_size(), (64, 8));
}

#[test]
fn center_is_drawn_last_in_a_star() {
    let frames: Vec<RgbaFrame> = (0..3).map(|_| frame(10, 10)).collect();
    let refs: Vec<&RgbaFrame> = frames.iter().collect();
    let tree = SpanningTree::new(1, vec![Some(1), None, Some(1)]).unwrap();
    let plan = plan_layout(
        &tree,
        &[
            translation(-8.0, 0.0),
            Homography::identity(),
            translation(8.0, 0.0),
        ],
        &refs,
        &names(3),
        &NativeVision::default(),
    )
    .unwrap();
    assert_eq!(plan.draw_order, vec![2, 0, 1]);
    assert_eq!(plan.parents, vec![Some(1), None, Some(1)]);
    assert_eq!(plan.canvas_size(), (26, 10));
}

struct ThreeCorners;

impl VisionPrimitives for ThreeCorners {
    fn detect_features(&self, _frame: &RgbaFrame) -> StitchResult<Features> {
        Ok(Features::default())
    }

    fn match_descriptors(
        &self,
        _query: &Descriptors,
        _train: &Descriptors,
    ) -> Vec<Vec<CandidateMatch>> {
        Vec::new()
    }

    fn estimate_homography(&self, _pairs: &[PointPair]) -> StitchResult<HomographyEstimate> {
        Ok(HomographyEstimate {
            matrix: Homography::identity(),
            inliers: 4,
        })
    }

    fn transform_points(&self, points: &[Point], _h: &Homography) -> Option<Vec<Point>> {
        Some(points[..3].to_vec())
    }

    fn warp_image(
        &self,
        frame: &RgbaFrame,
        _h: &Homography,
        _size: (u32, u32),
    ) -> StitchResult<RgbaFrame> {
        Ok(frame.clone())
    }
}

#[test]
fn degenerate_projection_names_the_image() {
    let f = frame(10, 10);
    let tree = SpanningTree::new(0, vec![None]).unwrap();
    let err = plan_layout(
        &tree,
        &[Homography::identity()],
        &[&f],
        &["left.png".to_string()],
        &ThreeCorners,
    )
    .unwrap_err();
    match err {
        StitchError::Geometry(msg) => assert!(msg.contains("left.png")),
        other => panic!("unexpected error {other:?}"),
    }
}

#[test]
fn point_at_infinity_is_a_geometry_error() {
    let f = frame(10, 10);
    let tree = SpanningTree::new(0, vec![None]).unwrap();
    // Maps x = 10 onto the line at infinity.
    let h = Homography::new(1.0, 0.0, 0.0, 0.0, 1.0, 0.0, -0.1, 0.0, 1.0);
    let err = plan_layout(&tree, &[h], &[&f], &names(1), &NativeVision::default()).unwrap_err();
    assert!(matches!(err, StitchError::Geometry(_)));
}

#[test]
fn plan_serializes_transforms_row_major() {
    let f = frame(4, 4);
    let tree = SpanningTree::new(0, vec![None]).unwrap();
    let plan = plan_layout(
        &tree,
        &[Homography::identity()],
        &[&f],
        &names(1),
        &NativeVision::default(),
    )
    .unwrap();
    let json = serde_json::to_value(&plan).unwrap();
    assert_eq!(
        json["images"][0]["transform"],
        serde_json::json!([[1.0, 0.0, 0.0], [0.0, 1.0, 0.0], [0.0, 0.0, 1.0]])
    );
    assert_eq!(json["draw_order"], serde_json::json!([0]));
}
