use glam::Vec3;

/// Indexed triangle mesh with per-vertex normals.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct MeshData {
    pub positions: Vec<[f32; 3]>,
    pub normals: Vec<[f32; 3]>,
    pub indices: Vec<u32>,
}

/// Axis-aligned bounding box.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Bounds {
    pub min: Vec3,
    pub max: Vec3,
}

impl Bounds {
    pub fn center(&self) -> Vec3 {
        (self.min + self.max) * 0.5
    }

    pub fn size(&self) -> Vec3 {
        self.max - self.min
    }
}

impl MeshData {
    pub fn vertex_count(&self) -> usize {
        self.positions.len()
    }

    pub fn triangle_count(&self) -> usize {
        self.indices.len() / 3
    }

    pub fn is_empty(&self) -> bool {
        self.indices.is_empty()
    }

    /// Append a vertex and return its index.
    pub fn push_vertex(&mut self, position: Vec3, normal: Vec3) -> u32 {
        let index = self.positions.len() as u32;
        self.positions.push(position.to_array());
        self.normals.push(normal.to_array());
        index
    }

    pub fn push_triangle(&mut self, a: u32, b: u32, c: u32) {
        self.indices.extend_from_slice(&[a, b, c]);
    }

    pub fn bounds(&self) -> Option<Bounds> {
        let mut iter = self.positions.iter().map(|p| Vec3::from_array(*p));
        let first = iter.next()?;
        let (min, max) = iter.fold((first, first), |(lo, hi), p| (lo.min(p), hi.max(p)));
        Some(Bounds { min, max })
    }

    /// Translate so the bounding box center sits at the origin.
    pub fn center(&mut self) {
        let Some(bounds) = self.bounds() else {
            return;
        };
        let offset = bounds.center();
        for p in &mut self.positions {
            p[0] -= offset.x;
            p[1] -= offset.y;
            p[2] -= offset.z;
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn center_moves_bounds_to_origin() {
        let mut mesh = MeshData::default();
        let a = mesh.push_vertex(Vec3::new(1.0, 1.0, 1.0), Vec3::Z);
        let b = mesh.push_vertex(Vec3::new(3.0, 1.0, 1.0), Vec3::Z);
        let c = mesh.push_vertex(Vec3::new(3.0, 5.0, 2.0), Vec3::Z);
        mesh.push_triangle(a, b, c);

        mesh.center();
        let bounds = mesh.bounds().unwrap();
        assert!(bounds.center().length() < 1e-6);
        assert_eq!(bounds.size(), Vec3::new(2.0, 4.0, 1.0));
    }

    #[test]
    fn empty_mesh_has_no_bounds() {
        let mut mesh = MeshData::default();
        assert!(mesh.bounds().is_none());
        mesh.center();
        assert!(mesh.is_empty());
    }
}
