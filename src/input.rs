//! Input model: pointer buttons and the gesture state machine.
//!
//! `GestureState` is the active gesture being tracked between pointer-down
//! and pointer-up. Each variant carries the context captured at gesture start
//! that every later pointer-move is measured against, so a move never depends
//! on the move before it.

#[cfg(test)]
#[path = "input_test.rs"]
mod input_test;

use kurbo::Vec2;

use crate::store::PartId;

/// Mouse button identifier.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Button {
    /// Left mouse button (or single-finger touch).
    Primary,
    /// Middle mouse button (scroll wheel click).
    Middle,
    /// Right mouse button (or two-finger tap).
    Secondary,
}

/// Which gesture a pointer-down starts.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum GestureKind {
    Drag,
    Rotate,
    Resize,
}

/// Internal state for the gesture state machine.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum GestureState {
    /// Moving a part by its body.
    Dragging {
        /// Id of the part being dragged.
        id: PartId,
        /// Pointer position minus part position at pointer-down.
        offset: Vec2,
    },
    /// Turning a part about its pivot by the rotate handle.
    Rotating {
        /// Id of the part being rotated.
        id: PartId,
        /// Pointer minus world pivot at pointer-down.
        initial_vector: Vec2,
        /// Rotation in degrees at pointer-down.
        initial_rotation: f64,
    },
    /// Scaling a part about its pivot by the resize handle.
    Resizing {
        /// Id of the part being resized.
        id: PartId,
        /// Pointer distance from the world pivot at pointer-down.
        initial_distance: f64,
        /// Scale at pointer-down.
        initial_scale: f64,
    },
}

impl GestureState {
    /// The part this gesture manipulates.
    #[must_use]
    pub fn part_id(&self) -> PartId {
        match self {
            Self::Dragging { id, .. } | Self::Rotating { id, .. } | Self::Resizing { id, .. } => *id,
        }
    }

    #[must_use]
    pub fn kind(&self) -> GestureKind {
        match self {
            Self::Dragging { .. } => GestureKind::Drag,
            Self::Rotating { .. } => GestureKind::Rotate,
            Self::Resizing { .. } => GestureKind::Resize,
        }
    }
}
