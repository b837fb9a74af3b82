//! Interactive pose engine for composite 2D vector rigs.
//!
//! A rig is an ordered set of independently transformable parts (uploaded SVG
//! content). This crate owns the interactive core: pivot-centered affine
//! composition, screen-to-scene mapping through an injected view transform,
//! the drag/rotate/resize gesture state machines, deferred bounding-box
//! measurement, and keyframe capture and discrete playback. Rendering,
//! uploads, and remote storage are collaborators reached through traits.
//!
//! ## Module layout
//!
//! | Module | Role |
//! |--------|------|
//! | [`engine`] | [`engine::Scene`], the single controller every layer talks to |
//! | [`store`] | Parts, poses, and the ordered [`store::PartStore`] |
//! | [`transform`] | Pure geometry: pivots, composed transforms, scene-space mapping |
//! | [`camera`] | The [`camera::ViewTransform`] capability and a pan/zoom camera |
//! | [`hit`] | Hit-testing part bodies and selection handles |
//! | [`input`] | Gesture state and pointer event types |
//! | [`gesture`] | Gesture sessions and the raw pointer router |
//! | [`bbox`] | Content measurement and the deferred measurement pass |
//! | [`keyframe`] | Keyframe capture, load, and playback outcomes |
//! | [`persistence`] | Keyframe export formats and transports |
//! | [`config`] | Runtime tuning loaded from the environment |
//! | [`consts`] | Shared numeric constants |
//! | [`error`] | Stable error codes for typed errors |

pub mod bbox;
pub mod camera;
pub mod config;
pub mod consts;
pub mod engine;
pub mod error;
pub mod gesture;
pub mod hit;
pub mod input;
pub mod keyframe;
pub mod persistence;
pub mod store;
pub mod transform;

pub use engine::Scene;
