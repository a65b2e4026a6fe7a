use donutfield_common::MatcapId;
use donutfield_kernel::{MaterialRole, MeshId, Scene};

/// Read-only queries against the scene for the debug panel and the CLI.
pub struct SceneInspector;

impl SceneInspector {
    pub fn summary(scene: &Scene) -> SceneSummary {
        let (vertices, triangles) = scene.geometries().fold((0, 0), |(v, t), (_, g)| {
            (v + g.vertex_count(), t + g.triangle_count())
        });
        let donuts = scene
            .meshes()
            .values()
            .filter(|m| m.material == MaterialRole::Donut)
            .count();
        SceneSummary {
            meshes: scene.mesh_count(),
            donuts,
            has_text: scene.text_mesh().is_some(),
            geometries: scene.geometries().count(),
            vertices,
            triangles,
            material_generation: scene.materials().generation(),
            matcap: scene.materials().active_matcap(),
            revision: scene.revision(),
        }
    }

    pub fn inspect_mesh(scene: &Scene, id: MeshId) -> Option<MeshInfo> {
        scene.mesh(id).map(|mesh| {
            let t = mesh.transform;
            MeshInfo {
                id,
                material: mesh.material,
                position: t.position.to_array(),
                rotation: t.rotation.to_array(),
                scale: t.scale.x,
            }
        })
    }

    pub fn list_meshes(scene: &Scene) -> Vec<MeshId> {
        scene.meshes().keys().copied().collect()
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct SceneSummary {
    pub meshes: usize,
    pub donuts: usize,
    pub has_text: bool,
    pub geometries: usize,
    pub vertices: usize,
    pub triangles: usize,
    pub material_generation: u64,
    pub matcap: Option<MatcapId>,
    pub revision: u64,
}

impl std::fmt::Display for SceneSummary {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let matcap = self.matcap.map_or_else(|| "none".to_string(), |m| m.to_string());
        write!(
            f,
            "Scene: meshes={} donuts={} text={} triangles={} matcap={}",
            self.meshes, self.donuts, self.has_text, self.triangles, matcap
        )
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct MeshInfo {
    pub id: MeshId,
    pub material: MaterialRole,
    pub position: [f32; 3],
    pub rotation: [f32; 3],
    pub scale: f32,
}

impl std::fmt::Display for MeshInfo {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let [x, y, z] = self.position;
        let [rx, ry, rz] = self.rotation;
        write!(
            f,
            "Mesh {} ({:?}) pos=({x:.2}, {y:.2}, {z:.2}) rot=({rx:.2}, {ry:.2}, {rz:.2}) scale={:.2}",
            self.id.0, self.material, self.scale
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use donutfield_assets::{MeshData, TorusParams, torus_mesh};
    use donutfield_common::Transform;
    use donutfield_kernel::MeshInstance;
    use glam::Vec3;

    fn scene_with_donuts(n: usize) -> Scene {
        let mut scene = Scene::default();
        let torus = scene.add_geometry(torus_mesh(&TorusParams::default())).unwrap();
        let instances = (0..n).map(|i| MeshInstance {
            geometry: torus,
            material: MaterialRole::Donut,
            transform: Transform {
                position: Vec3::new(i as f32, 0.0, 0.0),
                ..Transform::default()
            },
        });
        scene.add_instances(instances).unwrap();
        scene
    }

    #[test]
    fn summary_empty_scene() {
        let summary = SceneInspector::summary(&Scene::default());
        assert_eq!(summary.meshes, 0);
        assert!(!summary.has_text);
        assert_eq!(summary.matcap, None);
        assert!(summary.to_string().contains("matcap=none"));
    }

    #[test]
    fn summary_counts_donuts_and_text() {
        let mut scene = scene_with_donuts(3);
        scene.set_text_mesh(MeshData::default()).unwrap();
        let summary = SceneInspector::summary(&scene);
        assert_eq!(summary.meshes, 4);
        assert_eq!(summary.donuts, 3);
        assert!(summary.has_text);
        assert_eq!(summary.geometries, 2);
        assert_eq!(summary.triangles, 1800);
    }

    #[test]
    fn inspect_and_list() {
        let scene = scene_with_donuts(2);
        let ids = SceneInspector::list_meshes(&scene);
        assert_eq!(ids.len(), 2);
        let info = SceneInspector::inspect_mesh(&scene, ids[1]).unwrap();
        assert_eq!(info.position, [1.0, 0.0, 0.0]);
        assert!(info.to_string().contains("Donut"));
        assert!(SceneInspector::inspect_mesh(&scene, MeshId(99)).is_none());
    }
}
