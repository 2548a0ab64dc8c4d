use std::f32::consts::{FRAC_PI_2, PI};

use graphstage::{
    EdgeShape, EdgeTopology, Point, Rect, cubic_angle, cubic_point, loop_bezier,
    polygon_contains, polygon_hit_points, quadratic_angle, quadratic_fan_endpoints,
    quadratic_point, segment_angle,
};

fn assert_close(actual: f32, expected: f32) {
    assert!(
        (actual - expected).abs() < 1e-3,
        "expected {expected}, got {actual}"
    );
}

fn assert_point_close(actual: Point, expected: Point) {
    assert_close(actual.x, expected.x);
    assert_close(actual.y, expected.y);
}

fn topology(parallel_count: u32, parallel_seq: u32) -> EdgeTopology {
    EdgeTopology { directed: true, self_loop: false, parallel_count, parallel_seq }
}

#[test]
fn segment_angle_follows_the_chord() {
    assert_close(segment_angle(Point::new(0.0, 0.0), Point::new(10.0, 0.0)), 0.0);
    assert_close(segment_angle(Point::new(0.0, 0.0), Point::new(0.0, 10.0)), FRAC_PI_2);
    assert_close(segment_angle(Point::new(0.0, 0.0), Point::new(-10.0, 0.0)), PI);
}

#[test]
fn zero_length_segment_has_angle_zero() {
    assert_close(segment_angle(Point::new(3.0, 4.0), Point::new(3.0, 4.0)), 0.0);
}

#[test]
fn quadratic_curve_hits_its_endpoints() {
    let s = Point::new(-10.0, 0.0);
    let c = Point::new(0.0, 8.0);
    let e = Point::new(10.0, 0.0);
    assert_point_close(quadratic_point(0.0, s, c, e), s);
    assert_point_close(quadratic_point(1.0, s, c, e), e);
    assert_point_close(quadratic_point(0.5, s, c, e), Point::new(0.0, 4.0));
}

#[test]
fn quadratic_tangent_matches_the_derivative() {
    let s = Point::new(-10.0, 0.0);
    let c = Point::new(0.0, 8.0);
    let e = Point::new(10.0, 0.0);
    // apex of a symmetric arc is horizontal
    assert_close(quadratic_angle(0.5, s, c, e), 0.0);
    // at t=0 the derivative is 2(c - s)
    assert_close(quadratic_angle(0.0, s, c, e), (16.0f32).atan2(20.0));
}

#[test]
fn cubic_curve_hits_its_endpoints() {
    let s = Point::new(0.0, 0.0);
    let c1 = Point::new(0.0, 10.0);
    let c2 = Point::new(10.0, 10.0);
    let e = Point::new(10.0, 0.0);
    assert_point_close(cubic_point(0.0, s, c1, c2, e), s);
    assert_point_close(cubic_point(1.0, s, c1, c2, e), e);
    assert_point_close(cubic_point(0.5, s, c1, c2, e), Point::new(5.0, 7.5));
}

#[test]
fn cubic_tangent_starts_toward_the_first_control() {
    let s = Point::new(0.0, 0.0);
    let c1 = Point::new(0.0, 10.0);
    let c2 = Point::new(10.0, 10.0);
    let e = Point::new(10.0, 0.0);
    assert_close(cubic_angle(0.0, s, c1, c2, e), FRAC_PI_2);
}

#[test]
fn fan_endpoints_swing_to_the_same_side() {
    let s = Point::new(-100.0, 0.0);
    let e = Point::new(100.0, 0.0);
    let (start, end) = quadratic_fan_endpoints(15.0, 15.0, s, e);

    let radian = 15.0 / 180.0 * PI;
    assert_close(start.x, -100.0 + 15.0 * radian.cos());
    assert_close(end.x, 100.0 - 15.0 * radian.cos());
    // both y offsets carry the sign of the degree
    assert_close(start.y, 15.0 * radian.sin());
    assert_close(end.y, 15.0 * radian.sin());

    let (mirror_start, mirror_end) = quadratic_fan_endpoints(15.0, -15.0, s, e);
    assert_close(mirror_start.y, -15.0 * radian.sin());
    assert_close(mirror_end.y, -15.0 * radian.sin());
}

#[test]
fn first_loop_anchors_at_top_and_left() {
    let net = loop_bezier(15.0, 1, Point::new(0.0, 0.0));
    assert_point_close(net.start, Point::new(0.0, -15.0));
    assert_point_close(net.end, Point::new(-15.0, 0.0));
    // len = 50 * 1 * (1/3 + 1)
    let len = 50.0 * (1.0 / 3.0 + 1.0);
    assert_point_close(net.control1, Point::new(0.0, -(15.0 + len)));
    assert_point_close(net.control2, Point::new(-(15.0 + len), 0.0));
}

#[test]
fn loop_anchors_translate_with_the_center() {
    let net = loop_bezier(15.0, 1, Point::new(30.0, 40.0));
    assert_point_close(net.start, Point::new(30.0, 25.0));
    assert_point_close(net.end, Point::new(15.0, 40.0));
}

#[test]
fn stacked_loops_rotate_and_grow() {
    let center = Point::new(0.0, 0.0);
    let first = loop_bezier(15.0, 1, center);
    let second = loop_bezier(15.0, 2, center);

    // anchors stay on the rim but rotate 5 degrees per rank
    assert_close(center.distance_to(second.start), 15.0);
    let start_angle = second.start.y.atan2(second.start.x);
    assert_close(start_angle, (275.0 / 180.0 * PI) - 2.0 * PI);

    // each rank reaches further out than the last
    let first_reach = center.distance_to(first.control1);
    let second_reach = center.distance_to(second.control1);
    assert_close(first_reach, 15.0 + 50.0 * (1.0 / 3.0 + 1.0));
    assert_close(second_reach, 15.0 + 50.0 * 2.0 * (2.0 / 3.0 + 1.0));
    assert!(second_reach > first_reach);
}

#[test]
fn hit_polygon_offsets_and_closes() {
    let line = [Point::new(0.0, 0.0), Point::new(1.0, 0.0), Point::new(2.0, 0.0)];
    let hit = polygon_hit_points(2.0, &line);

    assert_eq!(hit.len(), 7);
    assert_point_close(hit[0], Point::new(0.0, -2.0));
    assert_point_close(hit[1], Point::new(1.0, -2.0));
    assert_point_close(hit[2], Point::new(2.0, -2.0));
    assert_point_close(hit[3], Point::new(2.0, 2.0));
    assert_point_close(hit[4], Point::new(1.0, 2.0));
    assert_point_close(hit[5], Point::new(0.0, 2.0));
    assert_point_close(hit[6], hit[0]);
}

#[test]
fn hit_polygon_of_nothing_is_empty() {
    assert!(polygon_hit_points(2.0, &[]).is_empty());
}

#[test]
fn polygon_containment_uses_even_odd() {
    let square = [
        Point::new(0.0, 0.0),
        Point::new(4.0, 0.0),
        Point::new(4.0, 4.0),
        Point::new(0.0, 4.0),
    ];
    assert!(polygon_contains(&square, Point::new(2.0, 2.0)));
    assert!(!polygon_contains(&square, Point::new(5.0, 2.0)));
    assert!(!polygon_contains(&square, Point::new(-1.0, -1.0)));
    assert!(!polygon_contains(&square[..2], Point::new(2.0, 2.0)));
}

#[test]
fn single_edges_stay_straight() {
    assert_eq!(topology(0, 1).shape(), EdgeShape::Straight);
    assert_eq!(topology(1, 1).shape(), EdgeShape::Straight);
}

#[test]
fn odd_bundles_keep_their_last_edge_straight() {
    assert_eq!(topology(3, 1).shape(), EdgeShape::Quadratic);
    assert_eq!(topology(3, 2).shape(), EdgeShape::Quadratic);
    assert_eq!(topology(3, 3).shape(), EdgeShape::Straight);
    assert_eq!(topology(5, 5).shape(), EdgeShape::Straight);
}

#[test]
fn even_bundles_curve_every_edge() {
    assert_eq!(topology(2, 1).shape(), EdgeShape::Quadratic);
    assert_eq!(topology(2, 2).shape(), EdgeShape::Quadratic);
    assert_eq!(topology(4, 4).shape(), EdgeShape::Quadratic);
}

#[test]
fn self_loops_ignore_bundle_arithmetic() {
    let looped = EdgeTopology { directed: true, self_loop: true, parallel_count: 3, parallel_seq: 3 };
    assert_eq!(looped.shape(), EdgeShape::SelfLoop);
}

#[test]
fn rect_from_corners_normalizes() {
    let rect = Rect::from_corners(Point::new(4.0, 6.0), Point::new(1.0, 2.0));
    assert_eq!(rect, Rect::new(1.0, 2.0, 3.0, 4.0));
    assert_close(rect.right(), 4.0);
    assert_close(rect.bottom(), 6.0);
}

#[test]
fn rect_contains_is_inclusive() {
    let rect = Rect::new(0.0, 0.0, 10.0, 10.0);
    assert!(rect.contains(Point::new(0.0, 0.0)));
    assert!(rect.contains(Point::new(10.0, 10.0)));
    assert!(!rect.contains(Point::new(10.001, 10.0)));
}

#[test]
fn rect_intersection_and_union() {
    let a = Rect::new(0.0, 0.0, 10.0, 10.0);
    let b = Rect::new(10.0, 10.0, 5.0, 5.0);
    let c = Rect::new(20.0, 20.0, 1.0, 1.0);
    assert!(a.intersects(&b), "touching rects intersect");
    assert!(!a.intersects(&c));
    assert_eq!(a.union(&c), Rect::new(0.0, 0.0, 21.0, 21.0));
}

#[test]
fn point_helpers() {
    let a = Point::new(0.0, 0.0);
    let b = Point::new(3.0, 4.0);
    assert_close(a.distance_to(b), 5.0);
    assert_point_close(a.midpoint(b), Point::new(1.5, 2.0));
}
