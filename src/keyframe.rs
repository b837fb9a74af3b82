//! Keyframes: captured poses of the whole rig and their ordered sequence.
//!
//! DESIGN
//! ======
//! A keyframe is a deep copy of every part at capture time; nothing in it
//! points back into the live store, so later edits cannot rewrite history.
//! The sequence is append-only and a keyframe's index is its identity.
//! Loading and timed playback live on [`crate::engine::Scene`], which owns
//! both the recorder and the store it restores into.

#[cfg(test)]
#[path = "keyframe_test.rs"]
mod keyframe_test;

use serde::{Deserialize, Serialize};
use tracing::info;

use crate::error::ErrorCode;
use crate::store::{Part, PartStore};

// =============================================================================
// TYPES
// =============================================================================

#[derive(Debug, thiserror::Error, PartialEq, Eq)]
pub enum KeyframeError {
    #[error("keyframe index {index} out of range (have {len})")]
    OutOfRange { index: usize, len: usize },
    #[error("playback needs a running tokio runtime")]
    NoRuntime,
}

impl ErrorCode for KeyframeError {
    fn error_code(&self) -> &'static str {
        match self {
            Self::OutOfRange { .. } => "E_KEYFRAME_OUT_OF_RANGE",
            Self::NoRuntime => "E_NO_RUNTIME",
        }
    }
}

/// Result of asking for playback.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PlayOutcome {
    /// Playback was scheduled over this many keyframes.
    Started { frames: usize },
    /// Fewer than two keyframes; nothing was scheduled.
    TooFewKeyframes,
}

/// Every part, deep-copied at one instant.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Keyframe {
    pub parts: Vec<Part>,
}

impl Keyframe {
    #[must_use]
    pub fn parts(&self) -> &[Part] {
        &self.parts
    }
}

// =============================================================================
// RECORDER
// =============================================================================

/// Ordered, append-only keyframe sequence.
#[derive(Debug, Clone, Default)]
pub struct KeyframeRecorder {
    frames: Vec<Keyframe>,
}

impl KeyframeRecorder {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Append a snapshot of `store`. Returns the new keyframe's index.
    ///
    /// Capturing an empty store is allowed and stores an empty keyframe.
    pub fn capture(&mut self, store: &PartStore) -> usize {
        self.frames.push(Keyframe { parts: store.snapshot() });
        let index = self.frames.len() - 1;
        info!(index, parts = store.len(), "keyframe captured");
        index
    }

    /// Look up a keyframe by index.
    ///
    /// # Errors
    ///
    /// Returns `OutOfRange` if `index >= len()`.
    pub fn get(&self, index: usize) -> Result<&Keyframe, KeyframeError> {
        self.frames
            .get(index)
            .ok_or(KeyframeError::OutOfRange { index, len: self.frames.len() })
    }

    /// Restore keyframe `index` into `store` as a deep copy.
    ///
    /// # Errors
    ///
    /// Returns `OutOfRange` and leaves `store` untouched if the index is invalid.
    pub fn load_into(&self, index: usize, store: &mut PartStore) -> Result<(), KeyframeError> {
        let frame = self.get(index)?;
        store.replace_all(frame.parts());
        Ok(())
    }

    /// All keyframes in capture order.
    #[must_use]
    pub fn frames(&self) -> &[Keyframe] {
        &self.frames
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.frames.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.frames.is_empty()
    }
}
