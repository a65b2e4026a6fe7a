//! Debug tooling: the settings panel with its single "Matcap" control, and
//! read-only scene inspection shared by the panel and the CLI.

mod control;
mod inspector;
mod panel;

pub use control::MatcapControl;
pub use inspector::{MeshInfo, SceneInspector, SceneSummary};
pub use panel::{Diagnostics, RenderCounters, settings_panel};
