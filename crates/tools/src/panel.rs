use crate::control::MatcapControl;
use crate::inspector::SceneSummary;
use donutfield_common::MatcapId;

/// Read-only values shown under the control.
#[derive(Debug, Clone, Default)]
pub struct Diagnostics {
    /// Latest selection, loaded or not.
    pub requested: Option<MatcapId>,
    pub pending: Option<MatcapId>,
    pub active: Option<MatcapId>,
    pub last_error: Option<String>,
    pub text_loading: bool,
    pub frame_ms: f64,
    pub fps: f64,
    pub elapsed_secs: f64,
    pub scene: Option<SceneSummary>,
    /// GPU counters, absent until a renderer exists.
    pub render: Option<RenderCounters>,
}

/// Renderer-side counts, copied from the GPU backend each frame.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct RenderCounters {
    pub batches: usize,
    pub instances: usize,
    pub textures: usize,
}

impl Diagnostics {
    /// Plain text rows shown under the control, in display order.
    pub fn lines(&self) -> Vec<String> {
        let show = |id: Option<MatcapId>| id.map_or_else(|| "-".to_string(), |m| m.to_string());
        let mut lines = vec![format!("Active: {}", show(self.active))];
        if self.requested.is_some() && self.requested != self.active {
            lines.push(format!("Selected: {}", show(self.requested)));
        }
        if self.pending.is_some() {
            lines.push(format!("Loading: {}", show(self.pending)));
        }
        if self.text_loading {
            lines.push("Loading label".to_string());
        }
        lines.push(format!("{:.2} ms ({:.0} fps)", self.frame_ms, self.fps));
        lines.push(format!("Elapsed: {:.1} s", self.elapsed_secs));
        if let Some(scene) = &self.scene {
            lines.push(format!(
                "Meshes: {} ({} donuts{})",
                scene.meshes,
                scene.donuts,
                if scene.has_text { ", text" } else { "" }
            ));
            lines.push(format!("Triangles: {}", scene.triangles));
        }
        if let Some(render) = &self.render {
            lines.push(format!(
                "Draws: {} batches, {} instances, {} textures",
                render.batches, render.instances, render.textures
            ));
        }
        lines
    }
}

/// Draw the settings window in the top-right corner. Returns a matcap change.
pub fn settings_panel(
    ctx: &egui::Context,
    control: &mut MatcapControl,
    diagnostics: &Diagnostics,
) -> Option<MatcapId> {
    let mut changed = None;
    egui::Window::new("Settings")
        .anchor(egui::Align2::RIGHT_TOP, [-8.0, 8.0])
        .resizable(false)
        .collapsible(true)
        .show(ctx, |ui| {
            changed = control.show(ui);
            ui.separator();
            diagnostics_ui(ui, diagnostics);
        });
    changed
}

fn diagnostics_ui(ui: &mut egui::Ui, d: &Diagnostics) {
    if let Some(error) = &d.last_error {
        ui.colored_label(egui::Color32::RED, error);
    }
    for line in d.lines() {
        ui.label(line);
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn panel_draws_headless_without_change() {
        let ctx = egui::Context::default();
        let mut control = MatcapControl::default();
        let diagnostics = Diagnostics {
            pending: MatcapId::new(3).ok(),
            last_error: Some("matcap 4: missing".into()),
            ..Diagnostics::default()
        };
        let mut changes = Vec::new();
        for _ in 0..2 {
            let _ = ctx.run(egui::RawInput::default(), |ctx| {
                changes.push(settings_panel(ctx, &mut control, &diagnostics));
            });
        }
        assert!(changes.iter().all(Option::is_none));
        assert_eq!(control.value(), MatcapId::default());
    }

    #[test]
    fn lines_show_selection_and_render_counts() {
        let diagnostics = Diagnostics {
            requested: MatcapId::new(4).ok(),
            active: MatcapId::new(7).ok(),
            render: Some(RenderCounters {
                batches: 2,
                instances: 101,
                textures: 1,
            }),
            ..Diagnostics::default()
        };
        let lines = diagnostics.lines();
        assert_eq!(lines[0], "Active: 7");
        assert_eq!(lines[1], "Selected: 4");
        assert!(lines.iter().any(|l| l == "Draws: 2 batches, 101 instances, 1 textures"));

        let settled = Diagnostics {
            requested: MatcapId::new(7).ok(),
            ..diagnostics
        };
        assert!(!settled.lines().iter().any(|l| l.starts_with("Selected")));
    }
}
