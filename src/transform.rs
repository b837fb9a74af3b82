//! Pure part geometry: pivots, composed transforms, and scene-space mapping.
//!
//! Rotation and scale are always applied about the part's visual center (its
//! bounding-box center), independent of where `position` sits inside the box.
//! Angles are stored in degrees on the pose and converted to radians only
//! here, at the boundary.

#[cfg(test)]
#[path = "transform_test.rs"]
mod transform_test;

use kurbo::{Affine, Point, Vec2};

use crate::camera::ViewTransform;
use crate::consts::GEOMETRY_EPSILON;
use crate::store::Part;

/// Local-space pivot: the bounding-box center.
#[must_use]
pub fn pivot_of(part: &Part) -> Point {
    part.bounding_box.center()
}

/// Scene-space pivot: `position + pivot_of(part)`.
///
/// Rotation and scale act about this point, so it does not move with them.
#[must_use]
pub fn world_pivot_of(part: &Part) -> Point {
    part.position + pivot_of(part).to_vec2()
}

/// Local-to-scene transform for a part.
///
/// Reading right to left: move the pivot to the origin, scale, rotate, move
/// it back, then translate by `position`.
#[must_use]
pub fn compose_transform(part: &Part) -> Affine {
    let pivot = pivot_of(part).to_vec2();
    Affine::translate(part.position.to_vec2())
        * Affine::translate(pivot)
        * Affine::rotate(part.rotation.to_radians())
        * Affine::scale(part.scale)
        * Affine::translate(-pivot)
}

/// Convert a device pointer position into scene space.
#[must_use]
pub fn to_scene_space(device: Point, view: &dyn ViewTransform) -> Point {
    view.to_scene(device)
}

/// Map a part-local point into scene space.
#[must_use]
pub fn local_to_scene(part: &Part, local: Point) -> Point {
    compose_transform(part) * local
}

/// Map a scene point into a part's local space, if the transform is invertible.
#[must_use]
pub fn scene_to_local(part: &Part, scene: Point) -> Option<Point> {
    let transform = compose_transform(part);
    if transform.determinant().abs() < GEOMETRY_EPSILON {
        return None;
    }
    Some(transform.inverse() * scene)
}

/// Scene-space positions of a part's joints, keyed by joint id.
#[must_use]
pub fn world_joints(part: &Part) -> Vec<(String, Point)> {
    let transform = compose_transform(part);
    part.joints
        .iter()
        .map(|joint| (joint.id.clone(), transform * Point::new(joint.x, joint.y)))
        .collect()
}

/// Angle of `v` in degrees, or `None` for a near-zero vector.
#[must_use]
pub fn angle_degrees(v: Vec2) -> Option<f64> {
    if v.hypot() < GEOMETRY_EPSILON {
        return None;
    }
    Some(v.atan2().to_degrees())
}
