//! Shared numeric constants for the rig engine.

// ── Pose ────────────────────────────────────────────────────────

/// Smallest uniform scale a part may take. Resizing never goes below it.
pub const DEFAULT_MIN_SCALE: f64 = 0.05;

/// Vectors shorter than this are treated as degenerate in gesture math.
pub const GEOMETRY_EPSILON: f64 = 1e-6;

// ── Placement ───────────────────────────────────────────────────

/// Scene x/y of the first appended part.
pub const DEFAULT_APPEND_ORIGIN: f64 = 40.0;

/// Diagonal offset between consecutively appended parts.
pub const DEFAULT_APPEND_STEP: f64 = 30.0;

// ── Timers ──────────────────────────────────────────────────────

/// Delay before each bounding-box measurement pass, in milliseconds.
pub const DEFAULT_MEASURE_DELAY_MS: u64 = 50;

/// Maximum measurement passes per scheduling.
pub const DEFAULT_MEASURE_RETRIES: usize = 5;

/// Delay between keyframes during playback, in milliseconds.
pub const DEFAULT_PLAYBACK_DELAY_MS: u64 = 500;

// ── Hit-testing ─────────────────────────────────────────────────

/// Screen-space hit slop in pixels for handles.
pub const HANDLE_RADIUS_PX: f64 = 8.0;

/// Distance from the bounding box top edge to the rotate handle, in screen pixels.
pub const ROTATE_HANDLE_OFFSET_PX: f64 = 24.0;
