#![allow(clippy::float_cmp)]

use std::sync::Arc;

use uuid::Uuid;

use super::*;
use crate::bbox::{ContentMeasurer, MeasureError};
use crate::camera::Camera;
use crate::config::SceneConfig;
use crate::consts::DEFAULT_MIN_SCALE;
use crate::hit::HitPart;
use crate::store::{BoundingBox, Content};

// =============================================================
// Helpers
// =============================================================

const EPSILON: f64 = 1e-9;

struct BoxMeasurer(BoundingBox);

impl ContentMeasurer for BoxMeasurer {
    fn measure(&self, _content: &Content) -> Result<BoundingBox, MeasureError> {
        Ok(self.0)
    }
}

/// One part at the default position (40, 40) with a 100x50 box; world pivot (90, 65).
fn scene_with_part() -> (Scene, PartId) {
    let scene = Scene::new(SceneConfig::default(), Arc::new(BoxMeasurer(BoundingBox::new(0.0, 0.0, 100.0, 50.0))));
    let id = scene.ingest(&[Content::new("torso.svg", "<svg/>")])[0];
    (scene, id)
}

fn pt(x: f64, y: f64) -> Point {
    Point::new(x, y)
}

fn cam() -> Camera {
    Camera::default()
}

fn approx_eq(a: f64, b: f64) -> bool {
    (a - b).abs() < EPSILON
}

// =============================================================
// Drag
// =============================================================

#[test]
fn drag_moves_by_grab_offset() {
    let (scene, id) = scene_with_part();
    let mut session = GestureSession::begin(&scene, id, GestureKind::Drag, pt(60.0, 50.0), &cam()).unwrap();

    assert_eq!(session.on_move(pt(200.0, 300.0), &cam()), MoveOutcome::Applied);
    // Offset captured at pointer-down is (20, 10).
    assert_eq!(scene.part(&id).unwrap().position, pt(180.0, 290.0));
}

#[test]
fn drag_converts_through_view_transform() {
    let (scene, id) = scene_with_part();
    let view = Camera { pan_x: 10.0, pan_y: 10.0, zoom: 2.0 };
    // Device (130, 110) is scene (60, 50).
    let mut session = GestureSession::begin(&scene, id, GestureKind::Drag, pt(130.0, 110.0), &view).unwrap();
    session.on_move(pt(210.0, 210.0), &view);
    // Device (210, 210) is scene (100, 100); minus offset (20, 10).
    assert_eq!(scene.part(&id).unwrap().position, pt(80.0, 90.0));
}

#[test]
fn drag_applies_moves_in_delivery_order() {
    let (scene, id) = scene_with_part();
    let mut session = GestureSession::begin(&scene, id, GestureKind::Drag, pt(40.0, 40.0), &cam()).unwrap();
    for x in [50.0, 70.0, 65.0] {
        session.on_move(pt(x, 40.0), &cam());
    }
    assert_eq!(scene.part(&id).unwrap().position, pt(65.0, 40.0));
}

// =============================================================
// Rotate
// =============================================================

#[test]
fn rotate_applies_delta_from_grab_vector() {
    let (scene, id) = scene_with_part();
    // Grab straight above the pivot (-90 degrees), move to its right (0 degrees).
    let mut session = GestureSession::begin(&scene, id, GestureKind::Rotate, pt(90.0, 25.0), &cam()).unwrap();
    assert_eq!(session.on_move(pt(130.0, 65.0), &cam()), MoveOutcome::Applied);
    assert!(approx_eq(scene.part(&id).unwrap().rotation, 90.0));
}

#[test]
fn rotate_does_not_snap_to_grab_point() {
    let (scene, id) = scene_with_part();
    scene.patch(&id, &PartPatch::rotation(10.0));
    // Grab at 45 degrees off the pivot and do not move yet: rotation stays put.
    let mut session = GestureSession::begin(&scene, id, GestureKind::Rotate, pt(120.0, 95.0), &cam()).unwrap();
    session.on_move(pt(120.0, 95.0), &cam());
    assert!(approx_eq(scene.part(&id).unwrap().rotation, 10.0));

    // Sweep to 135 degrees: +90 regardless of where the grab landed.
    session.on_move(pt(60.0, 95.0), &cam());
    assert!(approx_eq(scene.part(&id).unwrap().rotation, 100.0));
}

#[test]
fn rotate_accumulates_across_gestures_without_wrapping() {
    let (scene, id) = scene_with_part();
    for _ in 0..5 {
        let mut session = GestureSession::begin(&scene, id, GestureKind::Rotate, pt(90.0, 25.0), &cam()).unwrap();
        session.on_move(pt(130.0, 65.0), &cam());
        session.end();
    }
    assert!(approx_eq(scene.part(&id).unwrap().rotation, 450.0));
}

#[test]
fn rotate_skips_pointer_on_pivot() {
    let (scene, id) = scene_with_part();
    let mut session = GestureSession::begin(&scene, id, GestureKind::Rotate, pt(90.0, 25.0), &cam()).unwrap();
    assert_eq!(session.on_move(pt(90.0, 65.0), &cam()), MoveOutcome::Skipped);
    let part = scene.part(&id).unwrap();
    assert_eq!(part.rotation, 0.0);
    assert!(part.rotation.is_finite());
}

#[test]
fn rotate_grabbed_at_pivot_never_updates() {
    let (scene, id) = scene_with_part();
    let mut session = GestureSession::begin(&scene, id, GestureKind::Rotate, pt(90.0, 65.0), &cam()).unwrap();
    assert_eq!(session.on_move(pt(200.0, 65.0), &cam()), MoveOutcome::Skipped);
    assert_eq!(scene.part(&id).unwrap().rotation, 0.0);
}

// =============================================================
// Resize
// =============================================================

#[test]
fn resize_scales_by_distance_ratio() {
    let (scene, id) = scene_with_part();
    let mut session = GestureSession::begin(&scene, id, GestureKind::Resize, pt(140.0, 65.0), &cam()).unwrap();

    session.on_move(pt(190.0, 65.0), &cam());
    assert!(approx_eq(scene.part(&id).unwrap().scale, 2.0));

    session.on_move(pt(90.0, 90.0), &cam());
    assert!(approx_eq(scene.part(&id).unwrap().scale, 0.5));
}

#[test]
fn resize_to_pivot_clamps_to_floor() {
    let (scene, id) = scene_with_part();
    let mut session = GestureSession::begin(&scene, id, GestureKind::Resize, pt(140.0, 65.0), &cam()).unwrap();
    assert_eq!(session.on_move(pt(90.0, 65.0), &cam()), MoveOutcome::Applied);
    assert_eq!(scene.part(&id).unwrap().scale, DEFAULT_MIN_SCALE);
}

#[test]
fn resize_grabbed_at_pivot_stays_finite() {
    let (scene, id) = scene_with_part();
    let mut session = GestureSession::begin(&scene, id, GestureKind::Resize, pt(90.0, 65.0), &cam()).unwrap();
    session.on_move(pt(91.0, 65.0), &cam());
    let scale = scene.part(&id).unwrap().scale;
    assert!(scale.is_finite());
    assert!(scale >= DEFAULT_MIN_SCALE);
}

#[test]
fn scale_floor_holds_across_resize_sequences() {
    let (scene, id) = scene_with_part();
    let grabs = [pt(90.0, 65.0), pt(90.0000001, 65.0), pt(140.0, 65.0), pt(-500.0, 900.0)];
    let moves = [pt(90.0, 65.0), pt(89.9, 65.1), pt(1e6, -1e6), pt(91.0, 64.0), pt(90.0, 65.0)];
    for grab in grabs {
        let mut session = GestureSession::begin(&scene, id, GestureKind::Resize, grab, &cam()).unwrap();
        for to in moves {
            session.on_move(to, &cam());
            let scale = scene.part(&id).unwrap().scale;
            assert!(scale >= DEFAULT_MIN_SCALE, "scale {scale} fell below floor");
            assert!(scale.is_finite());
        }
    }
}

// =============================================================
// Session lifetime
// =============================================================

#[test]
fn begin_on_missing_part_is_none() {
    let (scene, _) = scene_with_part();
    assert!(GestureSession::begin(&scene, Uuid::new_v4(), GestureKind::Drag, pt(0.0, 0.0), &cam()).is_none());
    assert!(scene.active_gesture().is_none());
}

#[test]
fn end_releases_slot_and_stops_moves() {
    let (scene, id) = scene_with_part();
    let session = GestureSession::begin(&scene, id, GestureKind::Drag, pt(40.0, 40.0), &cam()).unwrap();
    assert!(session.is_active());
    session.end();
    assert!(scene.active_gesture().is_none());
}

#[test]
fn dropping_a_session_ends_it() {
    let (scene, id) = scene_with_part();
    {
        let _session = GestureSession::begin(&scene, id, GestureKind::Drag, pt(40.0, 40.0), &cam()).unwrap();
        assert!(scene.active_gesture().is_some());
    }
    assert!(scene.active_gesture().is_none());
}

#[test]
fn new_gesture_supersedes_running_one() {
    let (scene, id) = scene_with_part();
    let mut drag = GestureSession::begin(&scene, id, GestureKind::Drag, pt(40.0, 40.0), &cam()).unwrap();
    let rotate = GestureSession::begin(&scene, id, GestureKind::Rotate, pt(90.0, 25.0), &cam()).unwrap();

    assert!(!drag.is_active());
    assert_eq!(drag.on_move(pt(500.0, 500.0), &cam()), MoveOutcome::Inactive);
    assert_eq!(scene.part(&id).unwrap().position, pt(40.0, 40.0));

    // Ending the superseded session must not release the newer one.
    drag.end();
    assert_eq!(scene.active_gesture().map(|g| g.kind()), Some(GestureKind::Rotate));
    assert!(rotate.is_active());
}

#[test]
fn moves_after_part_vanishes_are_inactive() {
    let (scene, id) = scene_with_part();
    let mut session = GestureSession::begin(&scene, id, GestureKind::Drag, pt(40.0, 40.0), &cam()).unwrap();
    scene.replace_all(&[]);
    assert_eq!(session.on_move(pt(10.0, 10.0), &cam()), MoveOutcome::Inactive);
}

#[test]
fn step_is_pure() {
    let (scene, id) = scene_with_part();
    let part = scene.part(&id).unwrap();
    let state = begin_state(GestureKind::Drag, &part, pt(50.0, 50.0));
    let patch = step(&state, &part, pt(60.0, 60.0), DEFAULT_MIN_SCALE).unwrap();
    assert_eq!(patch.position, Some(pt(50.0, 50.0)));
    assert_eq!(scene.part(&id).unwrap(), part);
}

// =============================================================
// GestureController
// =============================================================

#[test]
fn controller_body_press_selects_and_drags() {
    let (scene, id) = scene_with_part();
    let mut ctl = GestureController::new(scene.clone());

    let hit = ctl.pointer_down(pt(60.0, 50.0), Button::Primary, &cam()).unwrap();
    assert_eq!(hit.part, HitPart::Body);
    assert_eq!(ctl.selection(), Some(id));
    assert_eq!(ctl.active_kind(), Some(GestureKind::Drag));

    assert_eq!(ctl.pointer_move(pt(70.0, 70.0), &cam()), MoveOutcome::Applied);
    assert_eq!(scene.part(&id).unwrap().position, pt(50.0, 60.0));

    assert!(ctl.pointer_up());
    assert!(ctl.active_kind().is_none());
    assert_eq!(ctl.pointer_move(pt(0.0, 0.0), &cam()), MoveOutcome::Inactive);
    assert_eq!(scene.part(&id).unwrap().position, pt(50.0, 60.0));
}

#[test]
fn controller_release_outside_canvas_still_ends() {
    let (scene, _) = scene_with_part();
    let mut ctl = GestureController::new(scene.clone());
    ctl.pointer_down(pt(60.0, 50.0), Button::Primary, &cam());
    ctl.pointer_move(pt(-5000.0, -5000.0), &cam());
    assert!(ctl.pointer_cancel());
    assert!(scene.active_gesture().is_none());
}

#[test]
fn controller_empty_press_clears_selection() {
    let (scene, _) = scene_with_part();
    let mut ctl = GestureController::new(scene);
    ctl.pointer_down(pt(60.0, 50.0), Button::Primary, &cam());
    ctl.pointer_up();
    assert!(ctl.pointer_down(pt(900.0, 900.0), Button::Primary, &cam()).is_none());
    assert!(ctl.selection().is_none());
}

#[test]
fn controller_handle_press_beats_body() {
    let (scene, id) = scene_with_part();
    let mut ctl = GestureController::new(scene.clone());
    ctl.pointer_down(pt(60.0, 50.0), Button::Primary, &cam());
    ctl.pointer_up();

    // Rotate handle sits 24px above the top-center (90, 40).
    let hit = ctl.pointer_down(pt(90.0, 16.0), Button::Primary, &cam()).unwrap();
    assert_eq!(hit.part, HitPart::RotateHandle);
    assert_eq!(ctl.active_kind(), Some(GestureKind::Rotate));
    ctl.pointer_up();

    // Resize handle at the bottom-right corner (140, 90) overlaps the body.
    let hit = ctl.pointer_down(pt(139.0, 89.0), Button::Primary, &cam()).unwrap();
    assert_eq!(hit, Hit { part_id: id, part: HitPart::ResizeHandle });
    assert_eq!(ctl.active_kind(), Some(GestureKind::Resize));
}

#[test]
fn controller_ignores_secondary_button() {
    let (scene, _) = scene_with_part();
    let mut ctl = GestureController::new(scene.clone());
    assert!(ctl.pointer_down(pt(60.0, 50.0), Button::Secondary, &cam()).is_none());
    assert!(scene.active_gesture().is_none());
}

#[test]
fn controller_second_press_replaces_session() {
    let (scene, _) = scene_with_part();
    let mut ctl = GestureController::new(scene.clone());
    ctl.pointer_down(pt(60.0, 50.0), Button::Primary, &cam());
    ctl.pointer_down(pt(90.0, 16.0), Button::Primary, &cam());
    assert_eq!(scene.active_gesture().map(|g| g.kind()), Some(GestureKind::Rotate));
    assert!(ctl.pointer_up());
    assert!(scene.active_gesture().is_none());
}

#[test]
fn controller_up_without_gesture_is_noop() {
    let (scene, _) = scene_with_part();
    let mut ctl = GestureController::new(scene);
    assert!(!ctl.pointer_up());
}
