use crate::scene::{GeometryHandle, MaterialRole, MeshInstance};
use donutfield_common::Transform;
use glam::Vec3;
use rand::Rng;
use std::f32::consts::PI;

/// Scatter `count` instances of one geometry inside a cube of side `spread`
/// centered on the origin.
///
/// Rotation is random about X and Y in `[0, π)`, zero about Z. Scale is uniform
/// in `[0, 1)`. Output order matches generation order, so a seeded `rng`
/// reproduces the same field.
pub fn populate<R: Rng + ?Sized>(
    count: usize,
    geometry: GeometryHandle,
    material: MaterialRole,
    spread: f32,
    rng: &mut R,
) -> Vec<MeshInstance> {
    let half = spread.abs() * 0.5;
    (0..count)
        .map(|_| {
            let position = if half > 0.0 {
                Vec3::new(
                    rng.gen_range(-half..half),
                    rng.gen_range(-half..half),
                    rng.gen_range(-half..half),
                )
            } else {
                Vec3::ZERO
            };
            let rotation = Vec3::new(rng.gen_range(0.0..PI), rng.gen_range(0.0..PI), 0.0);
            let scale = rng.gen_range(0.0..1.0);
            MeshInstance {
                geometry,
                material,
                transform: Transform {
                    position,
                    rotation,
                    scale: Vec3::splat(scale),
                },
            }
        })
        .collect()
}
