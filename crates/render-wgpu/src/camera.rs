use donutfield_kernel::CameraConfig;
use glam::{Mat4, Vec3};
use std::f32::consts::{PI, TAU};

const MIN_PHI: f32 = 1e-4;
const MAX_PHI: f32 = PI - 1e-4;
const MIN_RADIUS: f32 = 0.05;
const MAX_RADIUS: f32 = 500.0;
const SETTLED: f32 = 1e-6;
/// Radius multiplier per wheel step.
const ZOOM_STEP: f32 = 0.95;

/// Orbit camera with inertia.
///
/// Input accumulates pending deltas; each [`update`](Self::update) applies a
/// `damping_factor` share of them and keeps the rest for later frames, so
/// motion eases out after the pointer is released.
#[derive(Debug, Clone)]
pub struct OrbitCamera {
    pub target: Vec3,
    pub radius: f32,
    /// Azimuth around +Y, measured from +Z.
    pub theta: f32,
    /// Polar angle from +Y.
    pub phi: f32,
    pub fov_y: f32,
    pub aspect: f32,
    pub near: f32,
    pub far: f32,
    pub damping_factor: f32,
    pending_theta: f32,
    pending_phi: f32,
    pending_pan: Vec3,
    /// Natural log of the radius multiplier still to apply.
    pending_dolly: f32,
}

impl Default for OrbitCamera {
    fn default() -> Self {
        Self::from_config(&CameraConfig::default())
    }
}

impl OrbitCamera {
    pub fn from_config(config: &CameraConfig) -> Self {
        let target = Vec3::from_array(config.target);
        let offset = Vec3::from_array(config.position) - target;
        let radius = offset.length().max(MIN_RADIUS);
        Self {
            target,
            radius,
            theta: offset.x.atan2(offset.z),
            phi: (offset.y / radius).clamp(-1.0, 1.0).acos(),
            fov_y: config.fov_degrees.to_radians(),
            aspect: 16.0 / 9.0,
            near: config.near,
            far: config.far,
            damping_factor: config.damping_factor.clamp(0.0, 1.0),
            pending_theta: 0.0,
            pending_phi: 0.0,
            pending_pan: Vec3::ZERO,
            pending_dolly: 0.0,
        }
    }

    pub fn set_aspect(&mut self, aspect: f32) {
        if aspect.is_finite() && aspect > 0.0 {
            self.aspect = aspect;
        }
    }

    pub fn eye_position(&self) -> Vec3 {
        let (sin_phi, cos_phi) = self.phi.sin_cos();
        let (sin_theta, cos_theta) = self.theta.sin_cos();
        self.target + self.radius * Vec3::new(sin_phi * sin_theta, cos_phi, sin_phi * cos_theta)
    }

    /// Queue a rotation from a pointer drag of `dx`, `dy` pixels. A drag across
    /// the full viewport height turns the camera once around.
    pub fn rotate(&mut self, dx: f32, dy: f32, viewport_height: f32) {
        let height = viewport_height.max(1.0);
        self.pending_theta -= TAU * dx / height;
        self.pending_phi -= TAU * dy / height;
    }

    /// Queue a pan so the point under the cursor follows a drag of `dx`, `dy` pixels.
    pub fn pan(&mut self, dx: f32, dy: f32, viewport_height: f32) {
        let height = viewport_height.max(1.0);
        let world_per_pixel = 2.0 * self.radius * (self.fov_y * 0.5).tan() / height;
        let forward = (self.target - self.eye_position()).normalize_or_zero();
        let right = forward.cross(Vec3::Y).normalize_or_zero();
        let up = right.cross(forward);
        self.pending_pan += (-right * dx + up * dy) * world_per_pixel;
    }

    /// Queue a dolly by `steps` wheel notches; positive moves closer.
    pub fn zoom(&mut self, steps: f32) {
        self.pending_dolly += steps * ZOOM_STEP.ln();
    }

    /// Advance damping by one frame. Returns whether the view changed.
    pub fn update(&mut self) -> bool {
        let damping = self.damping_factor;
        let before = (self.eye_position(), self.target);

        self.theta += self.pending_theta * damping;
        self.phi = (self.phi + self.pending_phi * damping).clamp(MIN_PHI, MAX_PHI);
        self.radius = (self.radius * (self.pending_dolly * damping).exp()).clamp(MIN_RADIUS, MAX_RADIUS);
        self.target += self.pending_pan * damping;

        let keep = 1.0 - damping;
        self.pending_theta = settle(self.pending_theta * keep);
        self.pending_phi = settle(self.pending_phi * keep);
        self.pending_pan *= keep;
        if self.pending_pan.length_squared() < SETTLED * SETTLED {
            self.pending_pan = Vec3::ZERO;
        }
        self.pending_dolly = settle(self.pending_dolly * keep);

        let (eye, target) = before;
        eye.distance_squared(self.eye_position()) > SETTLED * SETTLED
            || target.distance_squared(self.target) > SETTLED * SETTLED
    }

    pub fn is_settled(&self) -> bool {
        self.pending_theta == 0.0
            && self.pending_phi == 0.0
            && self.pending_pan == Vec3::ZERO
            && self.pending_dolly == 0.0
    }

    pub fn view_matrix(&self) -> Mat4 {
        Mat4::look_at_rh(self.eye_position(), self.target, Vec3::Y)
    }

    pub fn projection_matrix(&self) -> Mat4 {
        Mat4::perspective_rh(self.fov_y, self.aspect, self.near, self.far)
    }

    pub fn view_projection(&self) -> Mat4 {
        self.projection_matrix() * self.view_matrix()
    }
}

fn settle(value: f32) -> f32 {
    if value.abs() < SETTLED { 0.0 } else { value }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn run_until_settled(camera: &mut OrbitCamera) -> usize {
        let mut frames = 0;
        while !camera.is_settled() {
            camera.update();
            frames += 1;
            assert!(frames < 10_000, "camera never settled");
        }
        frames
    }

    #[test]
    fn starts_at_configured_eye() {
        let camera = OrbitCamera::default();
        assert!(camera.eye_position().distance(Vec3::new(1.0, 1.0, 2.0)) < 1e-5);
        assert!((camera.fov_y - 100f32.to_radians()).abs() < 1e-6);
        assert!(!camera.view_projection().is_nan());
    }

    #[test]
    fn idle_camera_does_not_move() {
        let mut camera = OrbitCamera::default();
        assert!(!camera.update());
        assert!(camera.is_settled());
    }

    #[test]
    fn drag_eases_out_to_full_rotation() {
        let mut camera = OrbitCamera::default();
        let start = camera.theta;
        camera.rotate(100.0, 0.0, 800.0);

        assert!(camera.update());
        let first_step = (camera.theta - start).abs();
        let expected = TAU * 100.0 / 800.0;
        assert!((first_step - expected * 0.05).abs() < 1e-5);

        let frames = run_until_settled(&mut camera);
        assert!(frames > 10);
        assert!(((start - camera.theta) - expected).abs() < 1e-3);
        assert!(camera.is_settled());
    }

    #[test]
    fn polar_angle_stays_off_the_poles() {
        let mut camera = OrbitCamera::default();
        camera.damping_factor = 1.0;
        camera.rotate(0.0, 10_000.0, 100.0);
        camera.update();
        assert!(camera.phi >= MIN_PHI);
        assert!(!camera.view_matrix().is_nan());
    }

    #[test]
    fn zoom_in_shortens_radius() {
        let mut camera = OrbitCamera::default();
        let radius = camera.radius;
        camera.zoom(2.0);
        assert!(camera.update());
        assert!(camera.radius < radius);
    }

    #[test]
    fn zoom_eases_out() {
        let mut camera = OrbitCamera::default();
        let radius = camera.radius;
        camera.zoom(2.0);

        camera.update();
        let first = radius - camera.radius;
        assert!(!camera.is_settled());
        camera.update();
        let second = radius - camera.radius - first;
        assert!(second > 0.0 && second < first);

        let frames = run_until_settled(&mut camera);
        assert!(frames > 10);
        let expected = radius * ZOOM_STEP * ZOOM_STEP;
        assert!((camera.radius - expected).abs() < 1e-3 * radius);
    }

    #[test]
    fn pan_moves_target() {
        let mut camera = OrbitCamera::default();
        camera.pan(50.0, 0.0, 600.0);
        run_until_settled(&mut camera);
        assert!(camera.target.length() > 0.01);
    }

    #[test]
    fn rejects_degenerate_aspect() {
        let mut camera = OrbitCamera::default();
        camera.set_aspect(2.0);
        camera.set_aspect(0.0);
        camera.set_aspect(f32::NAN);
        assert_eq!(camera.aspect, 2.0);
    }
}
