use super::*;

#[test]
fn fitting_rectangle_rounds_outward() {
    let pts = [
        Point::new(-0.5, 2.25),
        Point::new(10.1, 3.0),
        Point::new(4.0, 7.9),
    ];
    let r = fitting_rectangle(&pts).unwrap();
    assert_eq!(
        r,
        FittingRect {
            left: -1,
            top: 2,
            width: 12,
            height: 6,
        }
    );
    assert_eq!(r.right(), 11);
    assert_eq!(r.bottom(), 8);
}

#[test]
fn fitting_rectangle_edges_do_not_depend_on_the_far_side() {
    // 1.5e-14 survives next to 100 but vanishes once 300 is subtracted from it.
    let near = [Point::new(1.5e-14, 0.0), Point::new(100.0 + 1.5e-14, 10.0)];
    let wide = [near[0], near[1], Point::new(-300.0, 0.0)];
    let own = fitting_rectangle(&near).unwrap();
    let all = fitting_rectangle(&wide).unwrap();
    assert_eq!((own.left, own.right()), (0, 101));
    assert_eq!((all.left, all.right()), (-300, 101));
    assert_eq!(all.width, 401);
    assert!(all.contains_rect(own));
}

#[test]
fn fitting_rectangle_rejects_empty_and_non_finite() {
    assert!(fitting_rectangle(std::iter::empty::<&Point>()).is_none());
    assert!(fitting_rectangle(&[Point::new(f64::NAN, 0.0)]).is_none());
    assert!(fitting_rectangle(&[Point::new(0.0, 0.0), Point::new(f64::INFINITY, 1.0)]).is_none());
}

#[test]
fn corners_follow_row_column_order() {
    let frame = RgbaFrame::transparent(40, 30).unwrap();
    assert_eq!(
        frame.corners(),
        [
            Point::new(0.0, 0.0),
            Point::new(40.0, 0.0),
            Point::new(40.0, 30.0),
            Point::new(0.0, 30.0),
        ]
    );
    let r = fitting_rectangle(&frame.corners()).unwrap();
    assert_eq!((r.left, r.top, r.width, r.height), (0, 0, 40, 30));
}

#[test]
fn from_premul_checks_length() {
    assert!(RgbaFrame::from_premul(2, 2, vec![0; 16]).is_ok());
    assert!(matches!(
        RgbaFrame::from_premul(2, 2, vec![0; 15]),
        Err(StitchError::Image(_))
    ));
}

#[test]
fn straight_round_trip_keeps_opaque_pixels() {
    let src = vec![10u8, 20, 30, 255, 200, 100, 50, 255];
    let frame = RgbaFrame::from_straight_rgba8(2, 1, src.clone()).unwrap();
    assert_eq!(frame.data, src);
    assert_eq!(frame.to_straight_rgba_image().unwrap().into_raw(), src);
}

#[test]
fn pixel_outside_is_transparent() {
    let frame = RgbaFrame::from_premul(1, 1, vec![1, 2, 3, 4]).unwrap();
    assert_eq!(frame.pixel(0, 0), [1, 2, 3, 4]);
    assert_eq!(frame.pixel(-1, 0), [0; 4]);
    assert_eq!(frame.pixel(0, 1), [0; 4]);
}

#[test]
fn contains_rect_is_inclusive_of_edges() {
    let outer = FittingRect {
        left: -2,
        top: 0,
        width: 10,
        height: 10,
    };
    let inner = FittingRect {
        left: 0,
        top: 5,
        width: 8,
        height: 5,
    };
    assert!(outer.contains_rect(inner));
    assert!(!inner.contains_rect(outer));
}

#[test]
fn display_name_falls_back_to_the_index() {
    let names = vec!["left".to_string(), "right".to_string()];
    assert_eq!(display_name(&names, 1), "right");
    assert_eq!(display_name(&names, 3), "#3");
}
