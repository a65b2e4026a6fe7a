//! wgpu render backend: matcap-shaded instanced meshes and a damped orbit camera.
//!
//! # Invariants
//! - The renderer reads the scene; its only write is acknowledging material uploads.
//! - Camera motion is view state and never enters the scene.

mod camera;
mod gpu;
mod shaders;

pub use camera::OrbitCamera;
pub use gpu::{MatcapRenderer, RenderStats};
