//! Keyframe persistence: export formats and the transports that ship them.
//!
//! DESIGN
//! ======
//! The in-memory sequence is flattened into plain pose records keyed by part
//! id, in two shapes: frame-major `frames` (one pose collection per keyframe)
//! and part-major `keyframes` (one equal-length pose track per part). Both go
//! out together in a single JSON body to the keyframe endpoint.
//!
//! ERROR HANDLING
//! ==============
//! Transport failures are returned to the caller and never retried here.
//! Nothing in this module touches the scene, so a failed publish leaves all
//! local editing state as it was.

#[cfg(test)]
#[path = "persistence_test.rs"]
mod persistence_test;

use std::collections::BTreeMap;
use std::time::Duration;

use serde::{Deserialize, Serialize};

use crate::error::ErrorCode;
use crate::keyframe::Keyframe;
use crate::store::{Part, PartId};

const KEYFRAMES_PATH: &str = "/keyframes";
const REQUEST_TIMEOUT_SECS: u64 = 30;
const CONNECT_TIMEOUT_SECS: u64 = 5;

// =============================================================================
// TYPES
// =============================================================================

#[derive(Debug, thiserror::Error)]
pub enum TransportError {
    #[error("http client build failed: {0}")]
    HttpClientBuild(String),
    #[error("request failed: {0}")]
    Request(String),
    #[error("rejected with status {status}: {body}")]
    Rejected { status: u16, body: String },
}

impl ErrorCode for TransportError {
    fn error_code(&self) -> &'static str {
        match self {
            Self::HttpClientBuild(_) => "E_TRANSPORT_BUILD",
            Self::Request(_) => "E_TRANSPORT_REQUEST",
            Self::Rejected { .. } => "E_TRANSPORT_REJECTED",
        }
    }
}

/// A part's pose as it goes over the wire.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct PoseRecord {
    pub x: f64,
    pub y: f64,
    pub rotation: f64,
    pub scale: f64,
}

impl From<&Part> for PoseRecord {
    fn from(part: &Part) -> Self {
        Self { x: part.position.x, y: part.position.y, rotation: part.rotation, scale: part.scale }
    }
}

/// Every part's pose in one keyframe.
pub type PoseCollection = BTreeMap<PartId, PoseRecord>;

/// The full exported sequence.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct KeyframeExport {
    /// Part-major tracks, each exactly one entry per keyframe.
    pub keyframes: BTreeMap<PartId, Vec<PoseRecord>>,
    /// Frame-major pose collections in capture order.
    pub frames: Vec<PoseCollection>,
}

impl KeyframeExport {
    #[must_use]
    pub fn from_frames(frames: &[Keyframe]) -> Self {
        Self { keyframes: pose_tracks(frames), frames: pose_collections(frames) }
    }
}

// =============================================================================
// EXPORT
// =============================================================================

/// One pose collection per keyframe, in capture order.
#[must_use]
pub fn pose_collections(frames: &[Keyframe]) -> Vec<PoseCollection> {
    frames
        .iter()
        .map(|frame| frame.parts().iter().map(|p| (p.id, PoseRecord::from(p))).collect())
        .collect()
}

/// One pose track per part, each as long as the sequence.
///
/// A part missing from a keyframe repeats its previous pose; keyframes before
/// its first appearance use its first pose.
#[must_use]
pub fn pose_tracks(frames: &[Keyframe]) -> BTreeMap<PartId, Vec<PoseRecord>> {
    let mut tracks: BTreeMap<PartId, Vec<PoseRecord>> = BTreeMap::new();
    for (index, frame) in frames.iter().enumerate() {
        for part in frame.parts() {
            let pose = PoseRecord::from(part);
            let track = tracks.entry(part.id).or_insert_with(|| vec![pose; index]);
            if let Some(last) = track.last().copied() {
                track.resize(index, last);
            }
            track.push(pose);
        }
    }
    for track in tracks.values_mut() {
        if let Some(last) = track.last().copied() {
            track.resize(frames.len(), last);
        }
    }
    tracks
}

// =============================================================================
// TRANSPORT
// =============================================================================

/// Ships an exported keyframe sequence somewhere durable. Enables mocking in tests.
#[async_trait::async_trait]
pub trait KeyframeTransport: Send + Sync {
    /// Publish `export`.
    ///
    /// # Errors
    ///
    /// Returns a [`TransportError`] if the destination is unreachable or refuses it.
    async fn publish(&self, export: &KeyframeExport) -> Result<(), TransportError>;
}

/// Posts the export as JSON to `{base_url}/keyframes`.
pub struct HttpTransport {
    http: reqwest::Client,
    base_url: String,
}

impl HttpTransport {
    /// # Errors
    ///
    /// Returns `HttpClientBuild` if the HTTP client cannot be constructed.
    pub fn new(base_url: impl Into<String>) -> Result<Self, TransportError> {
        let http = reqwest::Client::builder()
            .timeout(Duration::from_secs(REQUEST_TIMEOUT_SECS))
            .connect_timeout(Duration::from_secs(CONNECT_TIMEOUT_SECS))
            .build()
            .map_err(|e| TransportError::HttpClientBuild(e.to_string()))?;
        Ok(Self { http, base_url: base_url.into() })
    }

    #[must_use]
    pub fn endpoint(&self) -> String {
        format!("{}{KEYFRAMES_PATH}", self.base_url.trim_end_matches('/'))
    }
}

#[async_trait::async_trait]
impl KeyframeTransport for HttpTransport {
    async fn publish(&self, export: &KeyframeExport) -> Result<(), TransportError> {
        let response = self
            .http
            .post(self.endpoint())
            .json(export)
            .send()
            .await
            .map_err(|e| TransportError::Request(e.to_string()))?;

        let status = response.status();
        if status.is_success() {
            return Ok(());
        }
        let body = response
            .text()
            .await
            .map_err(|e| TransportError::Request(e.to_string()))?;
        Err(TransportError::Rejected { status: status.as_u16(), body })
    }
}
