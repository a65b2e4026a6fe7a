//! Background loading: texture hot-swapping, the label mesh, and frame timing.
//!
//! # Invariants
//! - Workers only decode and build; results are applied on the thread that owns the scene.
//! - A texture is applied only if it answers the most recent selection.

mod loader;
mod swapper;
mod text;
mod timing;
mod worker;

pub use loader::{BackgroundLoader, LoadCompletion, LoadError, LoadQueue, LoadRequest, Ticket};
pub use swapper::{MatcapSwapper, SwapOutcome};
pub use text::{TextLoadError, TextMeshLoader};
pub use timing::{FrameStats, FrameTimer};
pub use worker::BackgroundWorker;
