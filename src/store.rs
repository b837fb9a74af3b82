//! Part model: placed content, poses, and the ordered in-memory store.
//!
//! This module defines what is on the rig (`Part`, `Content`, `BoundingBox`,
//! `Joint`), a sparse-update type for incremental edits (`PartPatch`), and the
//! store that owns all live parts (`PartStore`).
//!
//! Insertion order is append-only and is the draw order. Parts enter through
//! [`PartStore::append`], are edited in place through [`PartStore::patch`],
//! and the whole sequence is swapped by [`PartStore::replace_all`] when a
//! keyframe is loaded. Observers hear about every mutation before the
//! mutating call returns, together with the post-mutation parts, so they
//! never need to read the store back.

#[cfg(test)]
#[path = "store_test.rs"]
mod store_test;

use std::collections::HashSet;

use kurbo::{Point, Rect};
use serde::{Deserialize, Serialize};
use tracing::debug;
use uuid::Uuid;

use crate::config::SceneConfig;

/// Unique identifier for a part.
pub type PartId = Uuid;

/// Renderable payload delivered by the upload collaborator.
///
/// The store never looks inside it; only a measurer interprets `svg`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Content {
    /// Uploaded file name.
    pub name: String,
    /// SVG markup.
    pub svg: String,
}

impl Content {
    #[must_use]
    pub fn new(name: impl Into<String>, svg: impl Into<String>) -> Self {
        Self { name: name.into(), svg: svg.into() }
    }
}

/// Local-space extents of a part's rendered content.
///
/// The all-zero box means "not measured yet".
#[derive(Debug, Clone, Copy, PartialEq, Default, Serialize, Deserialize)]
pub struct BoundingBox {
    pub x: f64,
    pub y: f64,
    pub width: f64,
    pub height: f64,
}

impl BoundingBox {
    /// Placeholder carried by parts whose content has not been measured.
    pub const UNMEASURED: Self = Self { x: 0.0, y: 0.0, width: 0.0, height: 0.0 };

    /// Build a box, clamping negative extents to zero.
    #[must_use]
    pub fn new(x: f64, y: f64, width: f64, height: f64) -> Self {
        Self { x, y, width: width.max(0.0), height: height.max(0.0) }
    }

    #[must_use]
    pub fn is_unmeasured(&self) -> bool {
        self.width == 0.0 && self.height == 0.0
    }

    #[must_use]
    pub fn is_finite(&self) -> bool {
        self.x.is_finite() && self.y.is_finite() && self.width.is_finite() && self.height.is_finite()
    }

    #[must_use]
    pub fn center(&self) -> Point {
        Point::new(self.x + self.width / 2.0, self.y + self.height / 2.0)
    }

    #[must_use]
    pub fn to_rect(&self) -> Rect {
        Rect::new(self.x, self.y, self.x + self.width, self.y + self.height)
    }
}

/// A local-space attachment point owned by a part.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Joint {
    pub id: String,
    pub x: f64,
    pub y: f64,
}

/// Placement of a part at one instant.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Pose {
    /// Scene-space origin before pivot-centered rotation and scale.
    pub position: Point,
    /// Clockwise rotation in degrees. Unbounded; accumulates across gestures.
    pub rotation: f64,
    /// Uniform scale, never below the configured floor.
    pub scale: f64,
}

/// One placed instance of content.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Part {
    pub id: PartId,
    pub content: Content,
    pub position: Point,
    pub rotation: f64,
    pub scale: f64,
    pub bounding_box: BoundingBox,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub joints: Vec<Joint>,
}

impl Part {
    /// A part with a fresh id, identity rotation and scale, and no measurement.
    #[must_use]
    pub fn new(content: Content, position: Point) -> Self {
        Self {
            id: Uuid::new_v4(),
            content,
            position,
            rotation: 0.0,
            scale: 1.0,
            bounding_box: BoundingBox::UNMEASURED,
            joints: Vec::new(),
        }
    }

    #[must_use]
    pub fn pose(&self) -> Pose {
        Pose { position: self.position, rotation: self.rotation, scale: self.scale }
    }
}

/// Sparse update for a part. Only present fields are applied.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct PartPatch {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub position: Option<Point>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub rotation: Option<f64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub scale: Option<f64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub bounding_box: Option<BoundingBox>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub joints: Option<Vec<Joint>>,
}

impl PartPatch {
    #[must_use]
    pub fn position(position: Point) -> Self {
        Self { position: Some(position), ..Default::default() }
    }

    #[must_use]
    pub fn rotation(rotation: f64) -> Self {
        Self { rotation: Some(rotation), ..Default::default() }
    }

    #[must_use]
    pub fn scale(scale: f64) -> Self {
        Self { scale: Some(scale), ..Default::default() }
    }

    #[must_use]
    pub fn bounding_box(bounding_box: BoundingBox) -> Self {
        Self { bounding_box: Some(bounding_box), ..Default::default() }
    }
}

/// Mutation notifications delivered to observers.
#[derive(Debug, Clone, PartialEq)]
pub enum SceneChange {
    /// New parts were appended, in order.
    Appended { ids: Vec<PartId> },
    /// One part received a partial update.
    Patched { id: PartId, fields: PartPatch },
    /// The whole collection was swapped.
    Replaced { count: usize },
}

/// Callback invoked synchronously for every mutation with the parts as they
/// stand afterwards, in draw order.
///
/// Observers run while the scene is locked and must not call back into it;
/// everything a renderer needs arrives as the second argument.
pub type Observer = Box<dyn Fn(&SceneChange, &[Part]) + Send + 'static>;

/// Ordered in-memory store of parts.
pub struct PartStore {
    parts: Vec<Part>,
    consumed: usize,
    min_scale: f64,
    append_origin: f64,
    append_step: f64,
    observers: Vec<Observer>,
}

impl PartStore {
    /// Create an empty store using the given configuration's placement and scale floor.
    #[must_use]
    pub fn new(config: &SceneConfig) -> Self {
        Self {
            parts: Vec::new(),
            consumed: 0,
            min_scale: config.min_scale,
            append_origin: config.append_origin,
            append_step: config.append_step,
            observers: Vec::new(),
        }
    }

    /// Register an observer for all subsequent mutations.
    pub fn subscribe(&mut self, observer: Observer) {
        self.observers.push(observer);
    }

    fn notify(&self, change: &SceneChange) {
        for observer in &self.observers {
            observer(change, &self.parts);
        }
    }

    /// Append a part for every payload beyond the consumed count.
    ///
    /// `contents` is the full, ever-growing upload list; entries already
    /// consumed by an earlier call are skipped. Returns the ids created.
    pub fn append(&mut self, contents: &[Content]) -> Vec<PartId> {
        let Some(fresh) = contents.get(self.consumed..) else {
            return Vec::new();
        };
        if fresh.is_empty() {
            return Vec::new();
        }

        let mut ids = Vec::with_capacity(fresh.len());
        for content in fresh {
            #[allow(clippy::cast_precision_loss)]
            let offset = self.append_origin + self.append_step * self.consumed as f64;
            let part = Part::new(content.clone(), Point::new(offset, offset));
            ids.push(part.id);
            self.parts.push(part);
            self.consumed += 1;
        }

        debug!(count = ids.len(), consumed = self.consumed, "parts appended");
        self.notify(&SceneChange::Appended { ids: ids.clone() });
        ids
    }

    /// Swap the whole collection for a deep copy of `parts`.
    ///
    /// Duplicate ids keep their first occurrence and scales are clamped to the floor.
    pub fn replace_all(&mut self, parts: &[Part]) {
        let mut seen = HashSet::with_capacity(parts.len());
        let mut next = Vec::with_capacity(parts.len());
        for part in parts {
            if !seen.insert(part.id) {
                continue;
            }
            let mut copy = part.clone();
            copy.scale = self.clamp_scale(copy.scale);
            let bbox = copy.bounding_box;
            copy.bounding_box = BoundingBox::new(bbox.x, bbox.y, bbox.width, bbox.height);
            next.push(copy);
        }
        self.parts = next;
        self.notify(&SceneChange::Replaced { count: self.parts.len() });
    }

    /// Apply a partial update to one part. Returns false if the id is absent.
    ///
    /// Non-finite values are dropped, scale is clamped to the floor, and
    /// negative box extents are clamped to zero. A patch with nothing left
    /// to apply notifies no one.
    pub fn patch(&mut self, id: &PartId, fields: &PartPatch) -> bool {
        let min_scale = self.min_scale;
        let Some(part) = self.parts.iter_mut().find(|p| p.id == *id) else {
            return false;
        };

        let mut applied = PartPatch::default();
        if let Some(position) = fields.position.filter(|p| p.is_finite()) {
            part.position = position;
            applied.position = Some(position);
        }
        if let Some(rotation) = fields.rotation.filter(|r| r.is_finite()) {
            part.rotation = rotation;
            applied.rotation = Some(rotation);
        }
        if let Some(scale) = fields.scale.filter(|s| s.is_finite()) {
            part.scale = scale.max(min_scale);
            applied.scale = Some(part.scale);
        }
        if let Some(bbox) = fields.bounding_box.filter(BoundingBox::is_finite) {
            let bbox = BoundingBox::new(bbox.x, bbox.y, bbox.width, bbox.height);
            part.bounding_box = bbox;
            applied.bounding_box = Some(bbox);
        }
        if let Some(joints) = &fields.joints {
            part.joints.clone_from(joints);
            applied.joints = Some(joints.clone());
        }

        if applied == PartPatch::default() {
            return true;
        }
        self.notify(&SceneChange::Patched { id: *id, fields: applied });
        true
    }

    /// A deep, independent copy of every part in draw order.
    #[must_use]
    pub fn snapshot(&self) -> Vec<Part> {
        self.parts.clone()
    }

    #[must_use]
    pub fn get(&self, id: &PartId) -> Option<&Part> {
        self.parts.iter().find(|p| p.id == *id)
    }

    /// All parts in draw order (bottom first).
    #[must_use]
    pub fn parts(&self) -> &[Part] {
        &self.parts
    }

    /// How many upload payloads have been turned into parts.
    #[must_use]
    pub fn consumed(&self) -> usize {
        self.consumed
    }

    #[must_use]
    pub fn min_scale(&self) -> f64 {
        self.min_scale
    }

    fn clamp_scale(&self, scale: f64) -> f64 {
        if scale.is_finite() { scale.max(self.min_scale) } else { 1.0 }
    }

    /// Number of parts currently in the store.
    #[must_use]
    pub fn len(&self) -> usize {
        self.parts.len()
    }

    /// Returns `true` if the store contains no parts.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.parts.is_empty()
    }
}

impl Default for PartStore {
    fn default() -> Self {
        Self::new(&SceneConfig::default())
    }
}
