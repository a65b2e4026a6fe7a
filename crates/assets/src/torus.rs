use crate::MeshData;
use glam::Vec3;
use serde::{Deserialize, Serialize};
use std::f32::consts::TAU;

/// Torus lying in the XY plane, centered on the origin.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct TorusParams {
    /// Distance from the torus center to the tube center.
    pub radius: f32,
    /// Tube radius.
    pub tube: f32,
    pub radial_segments: u32,
    pub tubular_segments: u32,
}

impl Default for TorusParams {
    fn default() -> Self {
        Self {
            radius: 0.3,
            tube: 0.2,
            radial_segments: 20,
            tubular_segments: 45,
        }
    }
}

/// Generate a torus with smooth normals.
pub fn torus_mesh(params: &TorusParams) -> MeshData {
    let radial = params.radial_segments.max(3);
    let tubular = params.tubular_segments.max(3);
    let mut mesh = MeshData::default();

    for j in 0..=radial {
        let v = j as f32 / radial as f32 * TAU;
        for i in 0..=tubular {
            let u = i as f32 / tubular as f32 * TAU;
            let ring = params.radius + params.tube * v.cos();
            let position = Vec3::new(ring * u.cos(), ring * u.sin(), params.tube * v.sin());
            let center = Vec3::new(params.radius * u.cos(), params.radius * u.sin(), 0.0);
            mesh.push_vertex(position, (position - center).normalize_or_zero());
        }
    }

    let stride = tubular + 1;
    for j in 1..=radial {
        for i in 1..=tubular {
            let a = stride * j + i - 1;
            let b = stride * (j - 1) + i - 1;
            let c = stride * (j - 1) + i;
            let d = stride * j + i;
            mesh.push_triangle(a, b, d);
            mesh.push_triangle(b, c, d);
        }
    }

    mesh
}
