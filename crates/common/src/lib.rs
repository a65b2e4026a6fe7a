//! Shared leaf types for the donutfield workspace.
//!
//! # Invariants
//! - A `MatcapId` is always one of the bundled textures.
//! - `Viewport` holds no logic beyond derived sizes; every consumer reads it.

mod cancel;
mod types;
mod viewport;

pub use cancel::CancellationToken;
pub use types::{AssetId, MatcapId, SelectionError, Transform};
pub use viewport::{MAX_PIXEL_RATIO, Viewport};
