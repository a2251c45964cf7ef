use super::*;

fn grid_pairs(h: &Homography) -> Vec<PointPair> {
    let mut out = Vec::new();
    for gy in 0..5 {
        for gx in 0..6 {
            let src = Point::new(f64::from(gx) * 17.0 + 3.0, f64::from(gy) * 13.0 + 5.0);
            let dst = apply_one(h, src).unwrap();
            out.push(PointPair { src, dst });
        }
    }
    out
}

fn assert_close(a: &Homography, b: &Homography, tol: f64) {
    let a = normalize_homography(*a);
    let b = normalize_homography(*b);
    for (x, y) in a.iter().zip(b.iter()) {
        assert!((x - y).abs() < tol, "{a} vs {b}");
    }
}

fn perspective() -> Homography {
    Homography::new(0.9, 0.05, 12.0, -0.03, 1.1, -7.0, 0.0004, -0.0002, 1.0)
}

#[test]
fn apply_rejects_points_at_infinity() {
    let h = Homography::new(1.0, 0.0, 0.0, 0.0, 1.0, 0.0, 1.0, 0.0, 0.0);
    assert!(apply_homography_points(&h, &[Point::new(0.0, 3.0)]).is_none());
    let ok = apply_homography_points(&h, &[Point::new(2.0, 4.0)]).unwrap();
    assert_eq!(ok, vec![Point::new(1.0, 2.0)]);
}

#[test]
fn dlt_recovers_exact_homography() {
    let h = perspective();
    let est = dlt(&grid_pairs(&h)).unwrap();
    assert_close(&est, &h, 1e-6);
}

#[test]
fn dlt_needs_four_pairs() {
    let pairs = grid_pairs(&Homography::identity());
    assert!(dlt(&pairs[..3]).is_none());
}

#[test]
fn ransac_ignores_outliers() {
    let h = perspective();
    let mut pairs = grid_pairs(&h);
    let clean = pairs.len();
    for i in 0..8 {
        let f = f64::from(i);
        pairs.push(PointPair {
            src: Point::new(10.0 + f * 9.0, 70.0 - f * 4.0),
            dst: Point::new(300.0 - f * 31.0, -50.0 + f * 23.0),
        });
    }
    let est = estimate_ransac(&pairs, &RansacOptions::default()).unwrap();
    assert_eq!(est.inliers, clean);
    assert_close(&est.matrix, &h, 1e-6);
}

#[test]
fn ransac_is_deterministic_for_a_seed() {
    let pairs = grid_pairs(&perspective());
    let opts = RansacOptions::default();
    let a = estimate_ransac(&pairs, &opts).unwrap();
    let b = estimate_ransac(&pairs, &opts).unwrap();
    assert_eq!(a, b);
}

#[test]
fn too_few_or_degenerate_pairs_have_no_inliers() {
    let opts = RansacOptions::default();
    let few = grid_pairs(&Homography::identity());
    assert_eq!(estimate_ransac(&few[..3], &opts).unwrap().inliers, 0);

    let line: Vec<PointPair> = (0..10)
        .map(|i| {
            let p = Point::new(f64::from(i), 2.0 * f64::from(i));
            PointPair { src: p, dst: p }
        })
        .collect();
    assert_eq!(estimate_ransac(&line, &opts).unwrap().inliers, 0);
}

#[test]
fn invalid_options_are_configuration_errors() {
    let pairs = grid_pairs(&Homography::identity());
    let bad = RansacOptions {
        reproj_threshold: 0.0,
        ..RansacOptions::default()
    };
    assert!(matches!(
        estimate_ransac(&pairs, &bad),
        Err(StitchError::Configuration(_))
    ));
}

#[test]
fn required_iterations_shrinks_with_inlier_ratio() {
    assert_eq!(required_iterations(1.0, 0.995, 2000), 1);
    let half = required_iterations(0.5, 0.995, 2000);
    let most = required_iterations(0.9, 0.995, 2000);
    assert!(most < half);
    assert_eq!(required_iterations(0.0, 0.995, 2000), 2000);
}
