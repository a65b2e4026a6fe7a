use donutfield_assets::{MatcapTexture, MeshData};
use donutfield_common::{AssetId, MatcapId, Transform};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::sync::Arc;

/// Visual role of a shared material.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub enum MaterialRole {
    Text,
    Donut,
}

impl MaterialRole {
    pub const ALL: [MaterialRole; 2] = [MaterialRole::Text, MaterialRole::Donut];
}

/// Index of a geometry in the scene's geometry table.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct GeometryHandle(pub u32);

/// Identifier of a mesh instance in the scene graph.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct MeshId(pub u32);

/// A positioned copy of a shared geometry and material.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct MeshInstance {
    pub geometry: GeometryHandle,
    pub material: MaterialRole,
    pub transform: Transform,
}

/// Matcap material shared by every mesh of one role.
#[derive(Debug, Clone)]
pub struct SharedMaterial {
    role: MaterialRole,
    texture: Option<Arc<MatcapTexture>>,
    generation: u64,
    needs_update: bool,
}

impl SharedMaterial {
    fn new(role: MaterialRole) -> Self {
        Self {
            role,
            texture: None,
            generation: 0,
            needs_update: false,
        }
    }

    pub fn role(&self) -> MaterialRole {
        self.role
    }

    pub fn texture(&self) -> Option<&Arc<MatcapTexture>> {
        self.texture.as_ref()
    }

    /// Texture generation; 0 means no texture has been applied yet.
    pub fn generation(&self) -> u64 {
        self.generation
    }

    pub fn needs_update(&self) -> bool {
        self.needs_update
    }
}

/// The two shared materials. Both always reference the same texture generation.
#[derive(Debug, Clone)]
pub struct MaterialSlots {
    text: SharedMaterial,
    donut: SharedMaterial,
    generation: u64,
}

impl Default for MaterialSlots {
    fn default() -> Self {
        Self::new()
    }
}

impl MaterialSlots {
    pub fn new() -> Self {
        Self {
            text: SharedMaterial::new(MaterialRole::Text),
            donut: SharedMaterial::new(MaterialRole::Donut),
            generation: 0,
        }
    }

    pub fn get(&self, role: MaterialRole) -> &SharedMaterial {
        match role {
            MaterialRole::Text => &self.text,
            MaterialRole::Donut => &self.donut,
        }
    }

    pub fn iter(&self) -> impl Iterator<Item = &SharedMaterial> {
        [&self.text, &self.donut].into_iter()
    }

    /// Point both materials at `texture` and flag them for upload. This is the
    /// only way material textures change. Returns the new generation.
    pub fn retexture(&mut self, texture: Arc<MatcapTexture>) -> u64 {
        self.generation += 1;
        for slot in [&mut self.text, &mut self.donut] {
            slot.texture = Some(Arc::clone(&texture));
            slot.generation = self.generation;
            slot.needs_update = true;
        }
        tracing::debug!(
            matcap = %texture.matcap,
            asset = %texture.asset,
            generation = self.generation,
            "materials retextured"
        );
        self.generation
    }

    /// Clear the upload flag once a material's texture reached the GPU.
    pub fn acknowledge(&mut self, role: MaterialRole) {
        match role {
            MaterialRole::Text => self.text.needs_update = false,
            MaterialRole::Donut => self.donut.needs_update = false,
        }
    }

    pub fn generation(&self) -> u64 {
        self.generation
    }

    pub fn active_matcap(&self) -> Option<MatcapId> {
        self.donut.texture.as_ref().map(|t| t.matcap)
    }

    pub fn active_asset(&self) -> Option<AssetId> {
        self.donut.texture.as_ref().map(|t| t.asset)
    }

    /// Both materials reference the same generation and the same texture.
    pub fn is_consistent(&self) -> bool {
        self.text.generation == self.donut.generation
            && match (&self.text.texture, &self.donut.texture) {
                (Some(a), Some(b)) => Arc::ptr_eq(a, b),
                (None, None) => true,
                _ => false,
            }
    }
}

/// Events recorded for every structural scene change.
#[derive(Debug, Clone, PartialEq)]
pub enum SceneEvent {
    GeometryAdded {
        handle: GeometryHandle,
        vertices: usize,
        triangles: usize,
    },
    MeshAdded {
        id: MeshId,
        geometry: GeometryHandle,
        material: MaterialRole,
    },
    TextInserted {
        id: MeshId,
    },
    TornDown {
        meshes: usize,
    },
}

/// Errors from scene mutations.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum SceneError {
    #[error("scene has been torn down")]
    TornDown,
    #[error("unknown geometry {0:?}")]
    UnknownGeometry(GeometryHandle),
    #[error("text mesh already present as {0:?}")]
    TextAlreadySet(MeshId),
}

/// The scene graph: geometry table, shared materials, and mesh instances.
///
/// Mesh instances are immutable once inserted. Materials are mutated only
/// through [`MaterialSlots::retexture`]. Iteration order is deterministic.
#[derive(Debug)]
pub struct Scene {
    background: [f32; 4],
    geometries: Vec<Arc<MeshData>>,
    materials: MaterialSlots,
    meshes: BTreeMap<MeshId, MeshInstance>,
    next_mesh: u32,
    text: Option<MeshId>,
    revision: u64,
    torn_down: bool,
    event_log: Vec<SceneEvent>,
}

impl Default for Scene {
    fn default() -> Self {
        Self::new([1.0, 1.0, 1.0, 1.0])
    }
}

impl Scene {
    pub fn new(background: [f32; 4]) -> Self {
        Self {
            background,
            geometries: Vec::new(),
            materials: MaterialSlots::new(),
            meshes: BTreeMap::new(),
            next_mesh: 0,
            text: None,
            revision: 0,
            torn_down: false,
            event_log: Vec::new(),
        }
    }

    pub fn background(&self) -> [f32; 4] {
        self.background
    }

    pub fn materials(&self) -> &MaterialSlots {
        &self.materials
    }

    pub fn materials_mut(&mut self) -> &mut MaterialSlots {
        &mut self.materials
    }

    /// Bumped on every geometry or mesh change; renderers rebuild batches when it moves.
    pub fn revision(&self) -> u64 {
        self.revision
    }

    pub fn is_torn_down(&self) -> bool {
        self.torn_down
    }

    pub fn mesh_count(&self) -> usize {
        self.meshes.len()
    }

    pub fn meshes(&self) -> &BTreeMap<MeshId, MeshInstance> {
        &self.meshes
    }

    pub fn mesh(&self, id: MeshId) -> Option<&MeshInstance> {
        self.meshes.get(&id)
    }

    pub fn text_mesh(&self) -> Option<MeshId> {
        self.text
    }

    pub fn geometry(&self, handle: GeometryHandle) -> Option<&Arc<MeshData>> {
        self.geometries.get(handle.0 as usize)
    }

    pub fn geometries(&self) -> impl Iterator<Item = (GeometryHandle, &Arc<MeshData>)> {
        self.geometries
            .iter()
            .enumerate()
            .map(|(i, g)| (GeometryHandle(i as u32), g))
    }

    pub fn events(&self) -> &[SceneEvent] {
        &self.event_log
    }

    pub fn drain_events(&mut self) -> Vec<SceneEvent> {
        std::mem::take(&mut self.event_log)
    }

    pub fn add_geometry(&mut self, mesh: MeshData) -> Result<GeometryHandle, SceneError> {
        self.ensure_live()?;
        let handle = GeometryHandle(self.geometries.len() as u32);
        self.event_log.push(SceneEvent::GeometryAdded {
            handle,
            vertices: mesh.vertex_count(),
            triangles: mesh.triangle_count(),
        });
        self.geometries.push(Arc::new(mesh));
        self.revision += 1;
        Ok(handle)
    }

    /// Insert instances in order and return their ids.
    pub fn add_instances(
        &mut self,
        instances: impl IntoIterator<Item = MeshInstance>,
    ) -> Result<Vec<MeshId>, SceneError> {
        self.ensure_live()?;
        let mut ids = Vec::new();
        for instance in instances {
            if self.geometry(instance.geometry).is_none() {
                return Err(SceneError::UnknownGeometry(instance.geometry));
            }
            let id = MeshId(self.next_mesh);
            self.next_mesh += 1;
            self.meshes.insert(id, instance);
            self.event_log.push(SceneEvent::MeshAdded {
                id,
                geometry: instance.geometry,
                material: instance.material,
            });
            ids.push(id);
        }
        if !ids.is_empty() {
            self.revision += 1;
        }
        Ok(ids)
    }

    /// Insert the label geometry as a single mesh with the text material.
    /// The label can be set only once.
    pub fn set_text_mesh(&mut self, geometry: MeshData) -> Result<MeshId, SceneError> {
        self.ensure_live()?;
        if let Some(existing) = self.text {
            return Err(SceneError::TextAlreadySet(existing));
        }
        let handle = self.add_geometry(geometry)?;
        let ids = self.add_instances([MeshInstance {
            geometry: handle,
            material: MaterialRole::Text,
            transform: Transform::default(),
        }])?;
        let id = ids[0];
        self.text = Some(id);
        self.event_log.push(SceneEvent::TextInserted { id });
        tracing::info!(?id, "text mesh inserted");
        Ok(id)
    }

    /// Group meshes by geometry and material for instanced drawing.
    pub fn batches(&self) -> BTreeMap<(GeometryHandle, MaterialRole), Vec<&MeshInstance>> {
        let mut batches: BTreeMap<_, Vec<&MeshInstance>> = BTreeMap::new();
        for instance in self.meshes.values() {
            batches
                .entry((instance.geometry, instance.material))
                .or_default()
                .push(instance);
        }
        batches
    }

    /// Release all meshes and geometry. Further mutations fail with [`SceneError::TornDown`].
    pub fn teardown(&mut self) {
        if self.torn_down {
            return;
        }
        let meshes = self.meshes.len();
        self.meshes.clear();
        self.geometries.clear();
        self.text = None;
        self.torn_down = true;
        self.revision += 1;
        self.event_log.push(SceneEvent::TornDown { meshes });
        tracing::info!(meshes, "scene torn down");
    }

    fn ensure_live(&self) -> Result<(), SceneError> {
        if self.torn_down {
            Err(SceneError::TornDown)
        } else {
            Ok(())
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use donutfield_assets::{TorusParams, torus_mesh};

    fn test_texture(matcap: u32, asset: u64) -> Arc<MatcapTexture> {
        Arc::new(MatcapTexture {
            matcap: MatcapId::new(matcap).unwrap(),
            asset: AssetId(asset),
            width: 1,
            height: 1,
            rgba: vec![255, 255, 255, 255],
        })
    }

    #[test]
    fn retexture_updates_both_materials() {
        let mut slots = MaterialSlots::new();
        assert!(slots.is_consistent());
        assert!(slots.active_matcap().is_none());

        let generation = slots.retexture(test_texture(3, 30));
        assert_eq!(generation, 1);
        assert!(slots.is_consistent());
        for role in MaterialRole::ALL {
            let m = slots.get(role);
            assert_eq!(m.generation(), 1);
            assert!(m.needs_update());
            assert_eq!(m.texture().unwrap().matcap.index(), 3);
        }
    }

    #[test]
    fn acknowledge_clears_one_flag() {
        let mut slots = MaterialSlots::new();
        slots.retexture(test_texture(1, 10));
        slots.acknowledge(MaterialRole::Text);
        assert!(!slots.get(MaterialRole::Text).needs_update());
        assert!(slots.get(MaterialRole::Donut).needs_update());
        assert!(slots.is_consistent());
    }

    #[test]
    fn instances_require_known_geometry() {
        let mut scene = Scene::default();
        let err = scene
            .add_instances([MeshInstance {
                geometry: GeometryHandle(3),
                material: MaterialRole::Donut,
                transform: Transform::default(),
            }])
            .unwrap_err();
        assert_eq!(err, SceneError::UnknownGeometry(GeometryHandle(3)));
    }

    #[test]
    fn text_mesh_set_once() {
        let mut scene = Scene::default();
        let id = scene.set_text_mesh(torus_mesh(&TorusParams::default())).unwrap();
        assert_eq!(scene.text_mesh(), Some(id));
        assert_eq!(scene.mesh(id).unwrap().material, MaterialRole::Text);

        let err = scene.set_text_mesh(MeshData::default()).unwrap_err();
        assert_eq!(err, SceneError::TextAlreadySet(id));
        assert_eq!(scene.mesh_count(), 1);
    }

    #[test]
    fn batches_group_by_geometry_and_material() {
        let mut scene = Scene::default();
        let torus = scene.add_geometry(torus_mesh(&TorusParams::default())).unwrap();
        let donut = MeshInstance {
            geometry: torus,
            material: MaterialRole::Donut,
            transform: Transform::default(),
        };
        scene.add_instances(vec![donut; 5]).unwrap();
        scene.set_text_mesh(MeshData::default()).unwrap();

        let batches = scene.batches();
        assert_eq!(batches.len(), 2);
        assert_eq!(batches[&(torus, MaterialRole::Donut)].len(), 5);
    }

    #[test]
    fn revision_moves_on_structural_change() {
        let mut scene = Scene::default();
        let r0 = scene.revision();
        let g = scene.add_geometry(MeshData::default()).unwrap();
        assert!(scene.revision() > r0);
        let r1 = scene.revision();
        scene.materials_mut().retexture(test_texture(2, 2));
        assert_eq!(scene.revision(), r1);
        scene.add_instances([]).unwrap();
        assert_eq!(scene.revision(), r1);
        scene
            .add_instances([MeshInstance {
                geometry: g,
                material: MaterialRole::Donut,
                transform: Transform::default(),
            }])
            .unwrap();
        assert!(scene.revision() > r1);
    }

    #[test]
    fn teardown_clears_and_blocks_mutation() {
        let mut scene = Scene::default();
        scene.set_text_mesh(MeshData::default()).unwrap();
        scene.teardown();
        assert!(scene.is_torn_down());
        assert_eq!(scene.mesh_count(), 0);
        assert_eq!(scene.text_mesh(), None);
        assert_eq!(scene.add_geometry(MeshData::default()), Err(SceneError::TornDown));
        assert_eq!(
            scene.events().last(),
            Some(&SceneEvent::TornDown { meshes: 1 })
        );
    }
}
