//! Gesture sessions: drag, rotate, and resize driven by pointer events.
//!
//! DESIGN
//! ======
//! A gesture is an explicit resource. [`GestureSession::begin`] captures the
//! start context into the scene's single gesture slot and hands the caller a
//! session; the caller forwards moves to it and ends it on pointer-up or
//! pointer-cancel, wherever on the input surface that arrives. Ending happens
//! exactly once: [`GestureSession::end`] consumes the session and `Drop`
//! covers every path that forgets to. Beginning another gesture takes over the
//! slot, so the older session goes inert and its moves stop applying.
//!
//! Every move is measured against the context captured at pointer-down
//! (grab offset, grab vector, grab distance), never against the previous move.
//!
//! ERROR HANDLING
//! ==============
//! Degenerate geometry (pointer on the pivot) skips that move. Nothing
//! non-finite ever reaches a stored pose.

#[cfg(test)]
#[path = "gesture_test.rs"]
mod gesture_test;

use kurbo::Point;
use tracing::debug;

use crate::camera::ViewTransform;
use crate::consts::GEOMETRY_EPSILON;
use crate::engine::Scene;
use crate::hit::{Hit, hit_test};
use crate::input::{Button, GestureKind, GestureState};
use crate::store::{Part, PartId, PartPatch};
use crate::transform::{angle_degrees, to_scene_space, world_pivot_of};

/// What a pointer-move did.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MoveOutcome {
    /// The part's pose was updated.
    Applied,
    /// Degenerate geometry for this event; nothing changed.
    Skipped,
    /// The session was ended or superseded, or its part is gone.
    Inactive,
}

// =============================================================================
// GESTURE MATH
// =============================================================================

/// Capture the start context for `kind` on `part` at scene point `grab`.
#[must_use]
pub fn begin_state(kind: GestureKind, part: &Part, grab: Point) -> GestureState {
    match kind {
        GestureKind::Drag => GestureState::Dragging { id: part.id, offset: grab - part.position },
        GestureKind::Rotate => GestureState::Rotating {
            id: part.id,
            initial_vector: grab - world_pivot_of(part),
            initial_rotation: part.rotation,
        },
        GestureKind::Resize => GestureState::Resizing {
            id: part.id,
            initial_distance: (grab - world_pivot_of(part)).hypot(),
            initial_scale: part.scale,
        },
    }
}

/// The pose change a move to scene point `to` produces, or `None` to skip it.
#[must_use]
pub fn step(state: &GestureState, part: &Part, to: Point, min_scale: f64) -> Option<PartPatch> {
    match *state {
        GestureState::Dragging { offset, .. } => {
            let position = to - offset;
            position.is_finite().then(|| PartPatch::position(position))
        }
        GestureState::Rotating { initial_vector, initial_rotation, .. } => {
            let start = angle_degrees(initial_vector)?;
            let current = angle_degrees(to - world_pivot_of(part))?;
            let rotation = initial_rotation + (current - start);
            rotation.is_finite().then(|| PartPatch::rotation(rotation))
        }
        GestureState::Resizing { initial_distance, initial_scale, .. } => {
            let current = (to - world_pivot_of(part)).hypot();
            let ratio = current / initial_distance.max(GEOMETRY_EPSILON);
            let scale = (initial_scale * ratio).max(min_scale);
            scale.is_finite().then(|| PartPatch::scale(scale))
        }
    }
}

// =============================================================================
// SESSION
// =============================================================================

/// One running gesture, owned by the caller until it ends.
#[derive(Debug)]
pub struct GestureSession {
    scene: Scene,
    token: u64,
    part_id: PartId,
    kind: GestureKind,
    ended: bool,
}

impl GestureSession {
    /// Start a gesture on `part_id` at device point `device_pt`.
    ///
    /// Ends whatever gesture was running. Returns `None` if the part is absent.
    #[must_use]
    pub fn begin(
        scene: &Scene,
        part_id: PartId,
        kind: GestureKind,
        device_pt: Point,
        view: &dyn ViewTransform,
    ) -> Option<Self> {
        let grab = to_scene_space(device_pt, view);
        let token = scene.begin_gesture_slot(&part_id, |part| begin_state(kind, part, grab))?;
        debug!(%part_id, ?kind, token, "gesture started");
        Some(Self { scene: scene.clone(), token, part_id, kind, ended: false })
    }

    /// Forward a pointer-move.
    pub fn on_move(&mut self, device_pt: Point, view: &dyn ViewTransform) -> MoveOutcome {
        if self.ended {
            return MoveOutcome::Inactive;
        }
        let to = to_scene_space(device_pt, view);
        self.scene.step_gesture_slot(self.token, to)
    }

    /// End the gesture on pointer-up or pointer-cancel.
    pub fn end(mut self) {
        self.finish();
    }

    /// Whether this session still owns the scene's gesture slot.
    #[must_use]
    pub fn is_active(&self) -> bool {
        !self.ended && self.scene.gesture_token() == Some(self.token)
    }

    #[must_use]
    pub fn part_id(&self) -> PartId {
        self.part_id
    }

    #[must_use]
    pub fn kind(&self) -> GestureKind {
        self.kind
    }

    fn finish(&mut self) {
        if self.ended {
            return;
        }
        self.ended = true;
        let released = self.scene.end_gesture_slot(self.token);
        debug!(part_id = %self.part_id, kind = ?self.kind, token = self.token, released, "gesture ended");
    }
}

impl Drop for GestureSession {
    fn drop(&mut self) {
        self.finish();
    }
}

// =============================================================================
// POINTER ROUTING
// =============================================================================

/// Routes raw pointer events to gesture sessions and tracks selection.
///
/// Pointer-down hit-tests the scene (selected handles first), updates the
/// selection, and starts the matching gesture. Moves and releases go to the
/// running session regardless of where the pointer is.
#[derive(Debug)]
pub struct GestureController {
    scene: Scene,
    selected: Option<PartId>,
    session: Option<GestureSession>,
}

impl GestureController {
    #[must_use]
    pub fn new(scene: Scene) -> Self {
        Self { scene, selected: None, session: None }
    }

    /// Handle a pointer-down. Returns what was hit, if anything.
    pub fn pointer_down(&mut self, device_pt: Point, button: Button, view: &dyn ViewTransform) -> Option<Hit> {
        if button != Button::Primary {
            return None;
        }
        if let Some(previous) = self.session.take() {
            previous.end();
        }

        let scene_pt = to_scene_space(device_pt, view);
        let parts = self.scene.snapshot();
        let Some(hit) = hit_test(scene_pt, &parts, self.selected, view) else {
            self.selected = None;
            return None;
        };

        self.selected = Some(hit.part_id);
        self.session = GestureSession::begin(&self.scene, hit.part_id, hit.part.gesture(), device_pt, view);
        Some(hit)
    }

    /// Handle a pointer-move anywhere on the input surface.
    pub fn pointer_move(&mut self, device_pt: Point, view: &dyn ViewTransform) -> MoveOutcome {
        match self.session.as_mut() {
            Some(session) => session.on_move(device_pt, view),
            None => MoveOutcome::Inactive,
        }
    }

    /// Handle a pointer-up anywhere. Returns true if a gesture ended.
    pub fn pointer_up(&mut self) -> bool {
        match self.session.take() {
            Some(session) => {
                session.end();
                true
            }
            None => false,
        }
    }

    /// Handle a pointer-cancel. Same as pointer-up.
    pub fn pointer_cancel(&mut self) -> bool {
        self.pointer_up()
    }

    /// The currently selected part, if any.
    #[must_use]
    pub fn selection(&self) -> Option<PartId> {
        self.selected
    }

    /// The kind of gesture in progress, if any.
    #[must_use]
    pub fn active_kind(&self) -> Option<GestureKind> {
        self.session.as_ref().filter(|s| s.is_active()).map(GestureSession::kind)
    }
}
