//! Runtime tuning for the scene, loaded from environment variables.
//!
//! Every knob has a compiled-in default in [`crate::consts`]. Unset or
//! unparseable variables fall back to that default; a scale floor that is not
//! a positive finite number is rejected the same way.

#[cfg(test)]
#[path = "config_test.rs"]
mod config_test;

use std::time::Duration;

use crate::consts::{
    DEFAULT_APPEND_ORIGIN, DEFAULT_APPEND_STEP, DEFAULT_MEASURE_DELAY_MS, DEFAULT_MEASURE_RETRIES,
    DEFAULT_MIN_SCALE, DEFAULT_PLAYBACK_DELAY_MS,
};

/// Tuning knobs for a [`crate::engine::Scene`].
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct SceneConfig {
    /// Floor applied to every part's uniform scale.
    pub min_scale: f64,
    /// Scene x/y of the first appended part.
    pub append_origin: f64,
    /// Diagonal offset between consecutively appended parts.
    pub append_step: f64,
    /// Delay before each measurement pass, in milliseconds.
    pub measure_delay_ms: u64,
    /// Maximum measurement passes per scheduling.
    pub measure_retries: usize,
    /// Delay between keyframes during playback, in milliseconds.
    pub playback_delay_ms: u64,
}

impl Default for SceneConfig {
    fn default() -> Self {
        Self {
            min_scale: DEFAULT_MIN_SCALE,
            append_origin: DEFAULT_APPEND_ORIGIN,
            append_step: DEFAULT_APPEND_STEP,
            measure_delay_ms: DEFAULT_MEASURE_DELAY_MS,
            measure_retries: DEFAULT_MEASURE_RETRIES,
            playback_delay_ms: DEFAULT_PLAYBACK_DELAY_MS,
        }
    }
}

impl SceneConfig {
    /// Load the configuration from `RIGBOARD_*` environment variables.
    #[must_use]
    pub fn from_env() -> Self {
        let min_scale = env_parse("RIGBOARD_MIN_SCALE", DEFAULT_MIN_SCALE);
        Self {
            min_scale: if min_scale.is_finite() && min_scale > 0.0 { min_scale } else { DEFAULT_MIN_SCALE },
            append_origin: env_parse("RIGBOARD_APPEND_ORIGIN", DEFAULT_APPEND_ORIGIN),
            append_step: env_parse("RIGBOARD_APPEND_STEP", DEFAULT_APPEND_STEP),
            measure_delay_ms: env_parse("RIGBOARD_MEASURE_DELAY_MS", DEFAULT_MEASURE_DELAY_MS),
            measure_retries: env_parse("RIGBOARD_MEASURE_RETRIES", DEFAULT_MEASURE_RETRIES),
            playback_delay_ms: env_parse("RIGBOARD_PLAYBACK_DELAY_MS", DEFAULT_PLAYBACK_DELAY_MS),
        }
    }

    #[must_use]
    pub fn measure_delay(&self) -> Duration {
        Duration::from_millis(self.measure_delay_ms)
    }

    #[must_use]
    pub fn playback_delay(&self) -> Duration {
        Duration::from_millis(self.playback_delay_ms)
    }
}

pub(crate) fn env_parse<T>(key: &str, default: T) -> T
where
    T: std::str::FromStr + Copy,
{
    match std::env::var(key) {
        Ok(raw) => raw.trim().parse::<T>().unwrap_or(default),
        Err(_) => default,
    }
}
