use serde::{Deserialize, Serialize};

/// Upper bound on the device pixel ratio applied to the render surface.
pub const MAX_PIXEL_RATIO: f64 = 2.0;

/// Current window size in logical pixels plus the display's pixel density.
///
/// Plain data: camera projection and renderer sizing derive from it.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Viewport {
    pub width: f64,
    pub height: f64,
    pub device_pixel_ratio: f64,
    /// Cap applied to `device_pixel_ratio`; kept across resizes.
    #[serde(default = "default_max_pixel_ratio")]
    pub max_pixel_ratio: f64,
}

fn default_max_pixel_ratio() -> f64 {
    MAX_PIXEL_RATIO
}

impl Default for Viewport {
    fn default() -> Self {
        Self::new(1280.0, 720.0, 1.0)
    }
}

impl Viewport {
    pub fn new(width: f64, height: f64, device_pixel_ratio: f64) -> Self {
        Self {
            width,
            height,
            device_pixel_ratio,
            max_pixel_ratio: MAX_PIXEL_RATIO,
        }
    }

    /// Replace the pixel ratio cap. Non-positive caps fall back to [`MAX_PIXEL_RATIO`].
    pub fn with_max_pixel_ratio(mut self, cap: f64) -> Self {
        self.max_pixel_ratio = if cap > 0.0 { cap } else { MAX_PIXEL_RATIO };
        self
    }

    /// Build from a physical surface size and the window scale factor.
    pub fn from_physical(width: u32, height: u32, scale_factor: f64) -> Self {
        let scale = if scale_factor > 0.0 { scale_factor } else { 1.0 };
        Self::new(width as f64 / scale, height as f64 / scale, scale)
    }

    /// Apply a resize signal. Returns false when nothing changed.
    pub fn resize(&mut self, width: f64, height: f64, device_pixel_ratio: f64) -> bool {
        let next = Self {
            width,
            height,
            device_pixel_ratio,
            ..*self
        };
        if next == *self {
            return false;
        }
        *self = next;
        true
    }

    /// Pixel ratio the renderer uses: the device ratio capped at `max_pixel_ratio`.
    pub fn pixel_ratio(&self) -> f64 {
        self.device_pixel_ratio.min(self.max_pixel_ratio)
    }

    pub fn aspect(&self) -> f32 {
        (self.width / self.height.max(1.0)) as f32
    }

    /// Render surface size in physical pixels, never zero.
    pub fn surface_size(&self) -> (u32, u32) {
        let ratio = self.pixel_ratio();
        let w = (self.width * ratio).round().max(1.0) as u32;
        let h = (self.height * ratio).round().max(1.0) as u32;
        (w, h)
    }
}
