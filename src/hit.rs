#[cfg(test)]
#[path = "hit_test.rs"]
mod hit_test;

use kurbo::{Point, Vec2};

use crate::camera::ViewTransform;
use crate::consts::{HANDLE_RADIUS_PX, ROTATE_HANDLE_OFFSET_PX};
use crate::input::GestureKind;
use crate::store::{Part, PartId};
use crate::transform::{local_to_scene, scene_to_local};

/// Which part of a part was hit.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum HitPart {
    Body,
    RotateHandle,
    ResizeHandle,
}

impl HitPart {
    /// The gesture a pointer-down on this target starts.
    #[must_use]
    pub fn gesture(self) -> GestureKind {
        match self {
            Self::Body => GestureKind::Drag,
            Self::RotateHandle => GestureKind::Rotate,
            Self::ResizeHandle => GestureKind::Resize,
        }
    }
}

/// Result of a hit test.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Hit {
    pub part_id: PartId,
    pub part: HitPart,
}

/// Scene-space position of a part's rotate handle.
///
/// Sits `offset` scene units beyond the top-center of the bounding box, along
/// the part's rotated "up" direction.
#[must_use]
pub fn rotate_handle_position(part: &Part, offset: f64) -> Point {
    let bbox = part.bounding_box;
    let top_center = local_to_scene(part, Point::new(bbox.x + bbox.width / 2.0, bbox.y));
    let up = Vec2::from_angle((part.rotation - 90.0).to_radians());
    top_center + up * offset
}

/// Scene-space position of a part's resize handle (bottom-right corner).
#[must_use]
pub fn resize_handle_position(part: &Part) -> Point {
    let bbox = part.bounding_box;
    local_to_scene(part, Point::new(bbox.x + bbox.width, bbox.y + bbox.height))
}

/// Whether `scene_pt` falls inside the part's transformed bounding box.
#[must_use]
pub fn body_contains(part: &Part, scene_pt: Point) -> bool {
    if part.bounding_box.is_unmeasured() {
        return false;
    }
    scene_to_local(part, scene_pt).is_some_and(|local| part.bounding_box.to_rect().contains(local))
}

/// Test which part (if any) is under `scene_pt`.
///
/// Handles of the selected part win over any body. Bodies are tested topmost
/// first, which is the reverse of insertion order.
#[must_use]
pub fn hit_test(
    scene_pt: Point,
    parts: &[Part],
    selected: Option<PartId>,
    view: &dyn ViewTransform,
) -> Option<Hit> {
    let radius = view.device_distance_to_scene(HANDLE_RADIUS_PX);

    if let Some(sel) = selected.and_then(|id| parts.iter().find(|p| p.id == id)) {
        if !sel.bounding_box.is_unmeasured() {
            let offset = view.device_distance_to_scene(ROTATE_HANDLE_OFFSET_PX);
            if rotate_handle_position(sel, offset).distance(scene_pt) <= radius {
                return Some(Hit { part_id: sel.id, part: HitPart::RotateHandle });
            }
            if resize_handle_position(sel).distance(scene_pt) <= radius {
                return Some(Hit { part_id: sel.id, part: HitPart::ResizeHandle });
            }
        }
    }

    parts
        .iter()
        .rev()
        .find(|p| body_contains(p, scene_pt))
        .map(|p| Hit { part_id: p.id, part: HitPart::Body })
}
