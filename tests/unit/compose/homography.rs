use super::*;
use crate::foundation::core::{Point, RgbaFrame};
use crate::foundation::math::translation;
use crate::matches::store::{Correspondence, MatchRecord, PairKey};
use crate::vision::{
    CandidateMatch, Descriptors, Features, HomographyEstimate, NativeVision, PointPair,
};

fn assert_close(a: &Homography, b: &Homography) {
    for (x, y) in a.iter().zip(b.iter()) {
        assert!((x - y).abs() < 1e-6, "{a} != {b}");
    }
}

fn grid() -> Vec<Keypoint> {
    let mut out = Vec::new();
    for y in [4.0, 22.0, 39.0, 60.0] {
        for x in [3.0, 17.0, 40.0, 55.0, 71.0] {
            out.push(Keypoint {
                pos: Point::new(x, y),
                score: 1.0,
            });
        }
    }
    out
}

fn shifted(kps: &[Keypoint], dx: f64, dy: f64) -> Vec<Keypoint> {
    kps.iter()
        .map(|k| Keypoint {
            pos: Point::new(k.pos.x + dx, k.pos.y + dy),
            score: k.score,
        })
        .collect()
}

fn identity_record(n: usize) -> MatchRecord {
    MatchRecord {
        correspondences: (0..n)
            .map(|i| Correspondence {
                lo: i,
                hi: i,
                distance: 0.0,
            })
            .collect(),
    }
}

fn names(n: usize) -> Vec<String> {
    (0..n).map(|i| format!("img{i}")).collect()
}

#[test]
fn root_is_exact_identity() {
    let tree = SpanningTree::new(1, vec![Some(1), None, Some(1)]).unwrap();
    let local = vec![
        translation(5.0, 0.0),
        translation(99.0, 99.0),
        translation(0.0, -3.0),
    ];
    let composed = compose_homographies(&tree, &local).unwrap();
    assert_eq!(composed[1], Homography::identity());
    assert_close(&composed[0], &translation(5.0, 0.0));
    assert_close(&composed[2], &translation(0.0, -3.0));
}

#[test]
fn chain_accumulates_translations() {
    // 2 -> 1 -> 0 (root). Nodes listed child-first so the walk has to defer.
    let tree = SpanningTree::new(0, vec![None, Some(0), Some(1)]).unwrap();
    let local = vec![
        Homography::identity(),
        translation(10.0, 2.0),
        translation(7.0, -1.0),
    ];
    let composed = compose_homographies(&tree, &local).unwrap();
    assert_close(&composed[2], &translation(17.0, 1.0));
    assert_close(&composed[1], &translation(10.0, 2.0));
}

#[test]
fn local_step_is_applied_before_the_parent() {
    let scale = Homography::new(2.0, 0.0, 0.0, 0.0, 2.0, 0.0, 0.0, 0.0, 1.0);
    let tree = SpanningTree::new(0, vec![None, Some(0), Some(1)]).unwrap();
    let local = vec![Homography::identity(), scale, translation(3.0, 0.0)];
    let composed = compose_homographies(&tree, &local).unwrap();
    // (x + 3) * 2, not x * 2 + 3.
    assert_close(&composed[2], &(scale * translation(3.0, 0.0)));
    let p = crate::vision::homography::apply_homography_points(&composed[2], &[Point::ZERO])
        .unwrap();
    assert!((p[0].x - 6.0).abs() < 1e-9);
}

#[test]
fn deep_chain_does_not_recurse() {
    // Root is the last node, so resolving node 0 defers through the whole chain.
    let n = 5000;
    let parents = (0..n).map(|i| (i + 1 < n).then_some(i + 1)).collect();
    let tree = SpanningTree::new(n - 1, parents).unwrap();
    let local = vec![translation(1.0, 0.0); n];
    let composed = compose_homographies(&tree, &local).unwrap();
    assert!((composed[0][(0, 2)] - (n - 1) as f64).abs() < 1e-6);
    assert_eq!(composed[n - 1], Homography::identity());
}

#[test]
fn cyclic_parent_map_is_rejected() {
    let tree = SpanningTree::new(0, vec![None, Some(2), Some(1)]).unwrap();
    let local = vec![Homography::identity(); 3];
    assert!(compose_homographies(&tree, &local).is_err());
}

#[test]
fn detached_node_is_an_error() {
    let tree = SpanningTree::new(0, vec![None, None]).unwrap();
    let local = vec![Homography::identity(); 2];
    assert!(matches!(
        compose_homographies(&tree, &local),
        Err(StitchError::Estimation(_))
    ));
}

#[test]
fn pairwise_transform_maps_child_onto_parent_in_either_orientation() {
    let kp0 = grid();
    let kp1 = shifted(&kp0, 10.0, 5.0);
    let mut store = CorrespondenceStore::new();
    store
        .insert(PairKey::new(0, 1).unwrap(), identity_record(kp0.len()))
        .unwrap();
    let vision = NativeVision::default();

    // Record is stored 0 -> 1, edge runs 1 -> 0.
    let tree = SpanningTree::new(0, vec![None, Some(0)]).unwrap();
    let local = pairwise_transforms(
        &tree,
        &store,
        &[kp0.as_slice(), kp1.as_slice()],
        &names(2),
        &vision,
    )
    .unwrap();
    assert_eq!(local[0], Homography::identity());
    assert_close(&local[1], &translation(-10.0, -5.0));

    // Same record, edge 0 -> 1.
    let tree = SpanningTree::new(1, vec![Some(1), None]).unwrap();
    let local = pairwise_transforms(
        &tree,
        &store,
        &[kp0.as_slice(), kp1.as_slice()],
        &names(2),
        &vision,
    )
    .unwrap();
    assert_close(&local[0], &translation(10.0, 5.0));
}

struct NoInliers;

impl VisionPrimitives for NoInliers {
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
            inliers: 0,
        })
    }

    fn transform_points(&self, points: &[Point], _h: &Homography) -> Option<Vec<Point>> {
        Some(points.to_vec())
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
fn zero_inliers_is_an_estimation_error() {
    let kp = grid();
    let mut store = CorrespondenceStore::new();
    store
        .insert(PairKey::new(0, 1).unwrap(), identity_record(kp.len()))
        .unwrap();
    let tree = SpanningTree::new(0, vec![None, Some(0)]).unwrap();
    let err = pairwise_transforms(
        &tree,
        &store,
        &[kp.as_slice(), kp.as_slice()],
        &names(2),
        &NoInliers,
    )
    .unwrap_err();
    match err {
        StitchError::Estimation(msg) => assert!(msg.contains("img1") && msg.contains("img0")),
        other => panic!("unexpected error {other:?}"),
    }
}

#[test]
fn missing_record_is_an_estimation_error() {
    let kp = grid();
    let store = CorrespondenceStore::new();
    let tree = SpanningTree::new(0, vec![None, Some(0)]).unwrap();
    let err = pairwise_transforms(
        &tree,
        &store,
        &[kp.as_slice(), kp.as_slice()],
        &names(2),
        &NativeVision::default(),
    )
    .unwrap_err();
    assert!(matches!(err, StitchError::Estimation(_)));
}
