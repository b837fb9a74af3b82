//! Scene controller: the one object every layer talks to.
//!
//! DESIGN
//! ======
//! `Scene` is a cheap cloneable handle over the part store, the keyframe
//! recorder, the single gesture slot, and the two timers (deferred measurement
//! and playback). Every mutation runs to completion under one lock, so no
//! observer or reader ever sees a half-applied update. Gesture sessions, the
//! measurement task, and the playback task all hold clones of the same handle.
//!
//! Playback is cancelled by aborting its task and bumping a generation
//! counter; a playback task only loads a frame while its generation is still
//! current, so two playbacks can never interleave their loads.
//!
//! ERROR HANDLING
//! ==============
//! A poisoned lock is recovered rather than propagated; every critical section
//! leaves the store consistent before it can panic. Invalid keyframe indices
//! come back as `KeyframeError` with the store untouched.

#[cfg(test)]
#[path = "engine_test.rs"]
mod engine_test;

use std::fmt;
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};
use std::time::Duration;

use kurbo::Point;
use tokio::runtime::Handle;
use tokio::task::JoinHandle;
use tracing::{debug, info, warn};

use crate::bbox::{self, ContentMeasurer, MeasureReport, SvgMeasurer};
use crate::camera::ViewTransform;
use crate::config::SceneConfig;
use crate::error::ErrorCode;
use crate::gesture::{GestureSession, MoveOutcome, step};
use crate::input::{GestureKind, GestureState};
use crate::keyframe::{Keyframe, KeyframeError, KeyframeRecorder, PlayOutcome};
use crate::persistence::{KeyframeExport, KeyframeTransport, TransportError};
use crate::store::{Content, Observer, Part, PartId, PartPatch, PartStore};

// =============================================================================
// STATE
// =============================================================================

struct ActiveGesture {
    token: u64,
    state: GestureState,
}

struct SceneState {
    store: PartStore,
    recorder: KeyframeRecorder,
    gesture: Option<ActiveGesture>,
    next_gesture_token: u64,
    playback: Option<JoinHandle<()>>,
    playback_generation: u64,
    measure_task: Option<JoinHandle<MeasureReport>>,
}

impl SceneState {
    fn new(config: &SceneConfig) -> Self {
        Self {
            store: PartStore::new(config),
            recorder: KeyframeRecorder::new(),
            gesture: None,
            next_gesture_token: 1,
            playback: None,
            playback_generation: 0,
            measure_task: None,
        }
    }

    fn has_unmeasured(&self) -> bool {
        self.store.parts().iter().any(|p| p.bounding_box.is_unmeasured())
    }

    /// Load keyframe `index`. Returns whether the restored parts need measuring.
    fn load_frame(&mut self, index: usize) -> Result<bool, KeyframeError> {
        self.recorder.load_into(index, &mut self.store)?;
        debug!(index, parts = self.store.len(), "keyframe loaded");
        Ok(self.has_unmeasured())
    }

    fn cancel_playback(&mut self) -> bool {
        let Some(task) = self.playback.take() else {
            return false;
        };
        task.abort();
        self.playback_generation += 1;
        true
    }
}

// =============================================================================
// SCENE
// =============================================================================

/// Shared handle to the rig: parts, keyframes, gesture slot, and timers.
#[derive(Clone)]
pub struct Scene {
    inner: Arc<Mutex<SceneState>>,
    config: SceneConfig,
    measurer: Arc<dyn ContentMeasurer>,
}

impl fmt::Debug for Scene {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        // Observers run under the lock, so never block here.
        let Ok(state) = self.inner.try_lock() else {
            return f.debug_struct("Scene").finish_non_exhaustive();
        };
        f.debug_struct("Scene")
            .field("parts", &state.store.len())
            .field("keyframes", &state.recorder.len())
            .field("gesture", &state.gesture.as_ref().map(|g| g.state))
            .field("playing", &state.playback.is_some())
            .finish_non_exhaustive()
    }
}

impl Scene {
    /// Create an empty scene measuring content with `measurer`.
    #[must_use]
    pub fn new(config: SceneConfig, measurer: Arc<dyn ContentMeasurer>) -> Self {
        Self { inner: Arc::new(Mutex::new(SceneState::new(&config))), config, measurer }
    }

    /// Create an empty scene that measures SVG markup with [`SvgMeasurer`].
    #[must_use]
    pub fn with_svg_measurer(config: SceneConfig) -> Self {
        Self::new(config, Arc::new(SvgMeasurer))
    }

    fn state(&self) -> MutexGuard<'_, SceneState> {
        self.inner.lock().unwrap_or_else(PoisonError::into_inner)
    }

    #[must_use]
    pub fn config(&self) -> &SceneConfig {
        &self.config
    }

    /// Register an observer for every subsequent store mutation.
    pub fn subscribe(&self, observer: Observer) {
        self.state().store.subscribe(observer);
    }

    // --- Store commands ---

    /// Append parts for the unconsumed suffix of the upload list and schedule measurement.
    pub fn ingest(&self, contents: &[Content]) -> Vec<PartId> {
        let ids = self.state().store.append(contents);
        if !ids.is_empty() {
            info!(count = ids.len(), "content ingested");
            self.schedule_measurement();
        }
        ids
    }

    /// Apply a partial update to one part. Returns false if the id is absent.
    pub fn patch(&self, id: &PartId, fields: &PartPatch) -> bool {
        self.state().store.patch(id, fields)
    }

    /// Replace every part with a deep copy of `parts`.
    pub fn replace_all(&self, parts: &[Part]) {
        let needs_measure = {
            let mut state = self.state();
            state.store.replace_all(parts);
            state.has_unmeasured()
        };
        if needs_measure {
            self.schedule_measurement();
        }
    }

    // --- Store queries ---

    /// A deep copy of every part in draw order.
    #[must_use]
    pub fn snapshot(&self) -> Vec<Part> {
        self.state().store.snapshot()
    }

    #[must_use]
    pub fn part(&self, id: &PartId) -> Option<Part> {
        self.state().store.get(id).cloned()
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.state().store.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.state().store.is_empty()
    }

    // --- Measurement ---

    /// Run one measurement pass now over every unmeasured part.
    pub fn measure_now(&self) -> MeasureReport {
        let pending = bbox::unmeasured(&self.state().store);
        if pending.is_empty() {
            return MeasureReport::default();
        }
        let results = bbox::measure_all(self.measurer.as_ref(), &pending);
        let report = bbox::apply(&mut self.state().store, results);
        debug!(
            measured = report.measured,
            unchanged = report.unchanged,
            failed = report.failed,
            pending = report.pending,
            "measurement pass finished"
        );
        report
    }

    /// Schedule deferred measurement passes, replacing any pending schedule.
    ///
    /// Without a tokio runtime the pass runs inline instead.
    pub fn schedule_measurement(&self) {
        let Ok(runtime) = Handle::try_current() else {
            debug!("no runtime; measuring inline");
            self.measure_now();
            return;
        };
        let mut state = self.state();
        if let Some(previous) = state.measure_task.take() {
            previous.abort();
        }
        state.measure_task = Some(runtime.spawn(bbox::measure_passes(
            self.clone(),
            self.config.measure_delay(),
            self.config.measure_retries,
        )));
    }

    /// Wait for the scheduled measurement run and return its final report.
    ///
    /// `None` when nothing is scheduled or the run was replaced before it
    /// finished.
    pub async fn measurement_settled(&self) -> Option<MeasureReport> {
        let task = self.state().measure_task.take()?;
        match task.await {
            Ok(report) => Some(report),
            Err(e) => {
                debug!(error = %e, "measurement run did not finish");
                None
            }
        }
    }

    // --- Gestures ---

    /// Start a gesture session. See [`GestureSession::begin`].
    #[must_use]
    pub fn begin_gesture(
        &self,
        part_id: PartId,
        kind: GestureKind,
        device_pt: Point,
        view: &dyn ViewTransform,
    ) -> Option<GestureSession> {
        GestureSession::begin(self, part_id, kind, device_pt, view)
    }

    /// The gesture currently holding the slot, if any.
    #[must_use]
    pub fn active_gesture(&self) -> Option<GestureState> {
        self.state().gesture.as_ref().map(|g| g.state)
    }

    pub(crate) fn gesture_token(&self) -> Option<u64> {
        self.state().gesture.as_ref().map(|g| g.token)
    }

    /// Claim the gesture slot for `part_id`, superseding any running gesture.
    pub(crate) fn begin_gesture_slot<F>(&self, part_id: &PartId, capture: F) -> Option<u64>
    where
        F: FnOnce(&Part) -> GestureState,
    {
        let mut state = self.state();
        let gesture = capture(state.store.get(part_id)?);
        let token = state.next_gesture_token;
        state.next_gesture_token += 1;
        if let Some(previous) = state.gesture.replace(ActiveGesture { token, state: gesture }) {
            debug!(token = previous.token, "gesture superseded");
        }
        Some(token)
    }

    pub(crate) fn step_gesture_slot(&self, token: u64, to: Point) -> MoveOutcome {
        let min_scale = self.config.min_scale;
        let mut state = self.state();
        let Some(active) = state.gesture.as_ref().filter(|g| g.token == token) else {
            return MoveOutcome::Inactive;
        };
        let gesture = active.state;
        let Some(part) = state.store.get(&gesture.part_id()) else {
            return MoveOutcome::Inactive;
        };
        match step(&gesture, part, to, min_scale) {
            Some(fields) => {
                state.store.patch(&gesture.part_id(), &fields);
                MoveOutcome::Applied
            }
            None => MoveOutcome::Skipped,
        }
    }

    /// Release the slot if `token` still holds it. Returns whether it did.
    pub(crate) fn end_gesture_slot(&self, token: u64) -> bool {
        let mut state = self.state();
        if state.gesture.as_ref().is_some_and(|g| g.token == token) {
            state.gesture = None;
            return true;
        }
        false
    }

    // --- Keyframes ---

    /// Capture the current parts as a new keyframe. Returns its index.
    pub fn capture(&self) -> usize {
        let mut state = self.state();
        let SceneState { store, recorder, .. } = &mut *state;
        recorder.capture(store)
    }

    #[must_use]
    pub fn keyframe_count(&self) -> usize {
        self.state().recorder.len()
    }

    /// A copy of keyframe `index`.
    ///
    /// # Errors
    ///
    /// Returns `OutOfRange` if the index is invalid.
    pub fn keyframe(&self, index: usize) -> Result<Keyframe, KeyframeError> {
        self.state().recorder.get(index).cloned()
    }

    /// Restore keyframe `index` into the store.
    ///
    /// # Errors
    ///
    /// Returns `OutOfRange` and leaves the store untouched if the index is invalid.
    pub fn load(&self, index: usize) -> Result<(), KeyframeError> {
        let needs_measure = self.state().load_frame(index).inspect_err(|e| {
            warn!(index, error = %e, code = e.error_code(), "keyframe load rejected");
        })?;
        if needs_measure {
            self.schedule_measurement();
        }
        Ok(())
    }

    /// Step through every keyframe, one per playback delay.
    ///
    /// Keyframe 0 loads before this returns; the rest load from a background
    /// task. A running playback is cancelled first.
    ///
    /// # Errors
    ///
    /// Returns `NoRuntime` if called outside a tokio runtime.
    pub fn play(&self) -> Result<PlayOutcome, KeyframeError> {
        let (frames, needs_measure) = {
            let mut state = self.state();
            let frames = state.recorder.len();
            if frames < 2 {
                debug!(frames, "playback skipped; need at least two keyframes");
                return Ok(PlayOutcome::TooFewKeyframes);
            }
            let runtime = Handle::try_current().map_err(|_| KeyframeError::NoRuntime)?;

            if state.cancel_playback() {
                info!("previous playback cancelled");
            }
            state.playback_generation += 1;
            let generation = state.playback_generation;
            let needs_measure = state.load_frame(0)?;

            let scene = self.clone();
            let delay = self.config.playback_delay();
            state.playback = Some(runtime.spawn(async move {
                scene.run_playback(generation, frames, delay).await;
            }));
            info!(frames, generation, delay_ms = self.config.playback_delay_ms, "playback started");
            (frames, needs_measure)
        };
        if needs_measure {
            self.schedule_measurement();
        }
        Ok(PlayOutcome::Started { frames })
    }

    async fn run_playback(&self, generation: u64, frames: usize, delay: Duration) {
        for index in 1..frames {
            tokio::time::sleep(delay).await;
            let needs_measure = {
                let mut state = self.state();
                // EDGE: a superseded task may still wake once before its abort lands.
                if state.playback_generation != generation {
                    return;
                }
                match state.load_frame(index) {
                    Ok(needs_measure) => needs_measure,
                    Err(e) => {
                        warn!(index, error = %e, "playback stopped");
                        state.playback = None;
                        return;
                    }
                }
            };
            if needs_measure {
                self.schedule_measurement();
            }
        }

        let mut state = self.state();
        if state.playback_generation == generation {
            state.playback = None;
            debug!(generation, frames, "playback finished");
        }
    }

    /// Cancel any running playback. Returns whether one was running.
    pub fn stop(&self) -> bool {
        let stopped = self.state().cancel_playback();
        if stopped {
            info!("playback stopped");
        }
        stopped
    }

    #[must_use]
    pub fn is_playing(&self) -> bool {
        self.state().playback.is_some()
    }

    // --- Persistence ---

    /// Flatten the keyframe sequence into its export formats.
    #[must_use]
    pub fn export_keyframes(&self) -> KeyframeExport {
        KeyframeExport::from_frames(self.state().recorder.frames())
    }

    /// Export the keyframe sequence and hand it to `transport`.
    ///
    /// # Errors
    ///
    /// Returns the transport's error. Local state is unaffected either way.
    pub async fn publish_keyframes(&self, transport: &dyn KeyframeTransport) -> Result<(), TransportError> {
        let export = self.export_keyframes();
        let frames = export.frames.len();
        match transport.publish(&export).await {
            Ok(()) => {
                info!(frames, "keyframes published");
                Ok(())
            }
            Err(e) => {
                warn!(frames, error = %e, code = e.error_code(), "keyframe publish failed");
                Err(e)
            }
        }
    }
}
