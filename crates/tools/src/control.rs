use donutfield_common::MatcapId;

/// The "Matcap" dropdown bound to the shared material texture.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct MatcapControl {
    value: MatcapId,
}

impl Default for MatcapControl {
    fn default() -> Self {
        Self::new(MatcapId::default())
    }
}

impl MatcapControl {
    pub const LABEL: &'static str = "Matcap";

    pub fn new(initial: MatcapId) -> Self {
        Self { value: initial }
    }

    pub fn value(&self) -> MatcapId {
        self.value
    }

    pub fn options() -> &'static [MatcapId] {
        &MatcapId::ALL
    }

    /// Set the value. Returns it only when it differs from the current one.
    pub fn set(&mut self, id: MatcapId) -> Option<MatcapId> {
        if id == self.value {
            return None;
        }
        self.value = id;
        tracing::debug!(matcap = %id, "matcap control changed");
        Some(id)
    }

    /// Draw the dropdown. Returns the new value if the user picked a different one.
    pub fn show(&mut self, ui: &mut egui::Ui) -> Option<MatcapId> {
        let mut picked = self.value;
        egui::ComboBox::from_label(Self::LABEL)
            .selected_text(picked.to_string())
            .show_ui(ui, |ui| {
                for &id in Self::options() {
                    ui.selectable_value(&mut picked, id, id.to_string());
                }
            });
        self.set(picked)
    }
}
