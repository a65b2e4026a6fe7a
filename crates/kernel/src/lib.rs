//! Scene kernel: scene graph, shared matcap materials, donut placement, frame loop.
//!
//! # Invariants
//! - Both shared materials always reference the same texture generation.
//! - Mesh instances never change after insertion; iteration order is stable.
//! - The label mesh is inserted at most once.

pub mod config;
pub mod frame;
pub mod populate;
pub mod scene;

pub use config::{CameraConfig, ConfigError, SceneConfig};
pub use frame::{FrameLoop, FrameTick, LoopState};
pub use populate::populate;
pub use scene::{
    GeometryHandle, MaterialRole, MaterialSlots, MeshId, MeshInstance, Scene, SceneError,
    SceneEvent, SharedMaterial,
};
