#![allow(clippy::float_cmp)]

use kurbo::Point;

use super::*;
use crate::camera::Camera;
use crate::store::{BoundingBox, Content, Joint};

const EPSILON: f64 = 1e-9;

fn approx_eq(a: f64, b: f64) -> bool {
    (a - b).abs() < EPSILON
}

fn point_approx_eq(a: Point, b: Point) -> bool {
    approx_eq(a.x, b.x) && approx_eq(a.y, b.y)
}

fn make_part(x: f64, y: f64, bbox: BoundingBox) -> Part {
    let mut part = Part::new(Content::new("p.svg", "<svg/>"), Point::new(x, y));
    part.bounding_box = bbox;
    part
}

// =============================================================
// Pivots
// =============================================================

#[test]
fn pivot_is_bounding_box_center() {
    let part = make_part(0.0, 0.0, BoundingBox::new(10.0, 20.0, 100.0, 50.0));
    assert_eq!(pivot_of(&part), Point::new(60.0, 45.0));
}

#[test]
fn world_pivot_adds_position() {
    let part = make_part(5.0, -5.0, BoundingBox::new(0.0, 0.0, 40.0, 20.0));
    assert_eq!(world_pivot_of(&part), Point::new(25.0, 5.0));
}

#[test]
fn world_pivot_ignores_rotation_and_scale() {
    let mut part = make_part(5.0, 5.0, BoundingBox::new(0.0, 0.0, 40.0, 20.0));
    let before = world_pivot_of(&part);
    part.rotation = 73.0;
    part.scale = 2.5;
    assert_eq!(world_pivot_of(&part), before);
}

// =============================================================
// compose_transform
// =============================================================

#[test]
fn identity_pose_is_pure_translation() {
    let part = make_part(12.0, 34.0, BoundingBox::new(3.0, 4.0, 50.0, 60.0));
    let t = compose_transform(&part);
    let expected = Affine::translate((12.0, 34.0));
    for (a, b) in t.as_coeffs().iter().zip(expected.as_coeffs()) {
        assert!(approx_eq(*a, b), "{t:?} != {expected:?}");
    }
}

#[test]
fn pivot_maps_to_world_pivot_under_any_pose() {
    let mut part = make_part(100.0, 50.0, BoundingBox::new(10.0, 10.0, 80.0, 40.0));
    part.rotation = 137.0;
    part.scale = 0.4;
    let mapped = local_to_scene(&part, pivot_of(&part));
    assert!(point_approx_eq(mapped, world_pivot_of(&part)));
}

#[test]
fn rotation_turns_about_pivot() {
    let mut part = make_part(0.0, 0.0, BoundingBox::new(0.0, 0.0, 100.0, 100.0));
    part.rotation = 90.0;
    // Right-edge midpoint (100, 50) swings to the bottom-edge midpoint.
    let mapped = local_to_scene(&part, Point::new(100.0, 50.0));
    assert!(point_approx_eq(mapped, Point::new(50.0, 100.0)), "{mapped:?}");
}

#[test]
fn scale_grows_about_pivot() {
    let mut part = make_part(10.0, 10.0, BoundingBox::new(0.0, 0.0, 20.0, 20.0));
    part.scale = 2.0;
    let mapped = local_to_scene(&part, Point::new(0.0, 0.0));
    // Pivot (10,10) local -> (20,20) world; corner sits 10*2 away on both axes.
    assert!(point_approx_eq(mapped, Point::new(0.0, 0.0)), "{mapped:?}");
}

#[test]
fn scene_to_local_inverts_compose() {
    let mut part = make_part(-30.0, 70.0, BoundingBox::new(5.0, 5.0, 60.0, 30.0));
    part.rotation = -400.0;
    part.scale = 1.7;
    let local = Point::new(12.0, 19.0);
    let back = scene_to_local(&part, local_to_scene(&part, local)).unwrap();
    assert!(point_approx_eq(back, local));
}

#[test]
fn compose_stays_finite_at_scale_floor() {
    let mut part = make_part(1e6, -1e6, BoundingBox::new(0.0, 0.0, 1e-3, 1e-3));
    part.rotation = 1e7;
    part.scale = crate::consts::DEFAULT_MIN_SCALE;
    let t = compose_transform(&part);
    assert!(t.as_coeffs().iter().all(|c| c.is_finite()));
}

// =============================================================
// Scene space / joints / angles
// =============================================================

#[test]
fn to_scene_space_uses_view() {
    let cam = Camera { pan_x: 10.0, pan_y: 20.0, zoom: 2.0 };
    let scene = to_scene_space(Point::new(30.0, 40.0), &cam);
    assert!(point_approx_eq(scene, Point::new(10.0, 10.0)));
}

#[test]
fn world_joints_follow_transform() {
    let mut part = make_part(100.0, 0.0, BoundingBox::new(0.0, 0.0, 20.0, 20.0));
    part.joints = vec![Joint { id: "hip".into(), x: 10.0, y: 0.0 }];
    part.rotation = 180.0;
    let joints = world_joints(&part);
    assert_eq!(joints.len(), 1);
    assert_eq!(joints[0].0, "hip");
    assert!(point_approx_eq(joints[0].1, Point::new(110.0, 20.0)), "{:?}", joints[0].1);
}

#[test]
fn angle_degrees_axes() {
    assert!(approx_eq(angle_degrees(Vec2::new(1.0, 0.0)).unwrap(), 0.0));
    assert!(approx_eq(angle_degrees(Vec2::new(0.0, 1.0)).unwrap(), 90.0));
    assert!(approx_eq(angle_degrees(Vec2::new(-1.0, 0.0)).unwrap(), 180.0));
}

#[test]
fn angle_degrees_rejects_zero_vector() {
    assert!(angle_degrees(Vec2::ZERO).is_none());
    assert!(angle_degrees(Vec2::new(1e-9, -1e-9)).is_none());
}
