use crate::camera::OrbitCamera;
use crate::shaders;
use bytemuck::{Pod, Zeroable};
use donutfield_assets::{MatcapTexture, MeshData};
use donutfield_common::AssetId;
use donutfield_kernel::{GeometryHandle, MaterialRole, Scene};
use std::collections::{BTreeMap, HashMap};
use std::ops::Range;
use wgpu::util::DeviceExt;

#[repr(C)]
#[derive(Copy, Clone, Pod, Zeroable)]
struct CameraUniforms {
    view_proj: [[f32; 4]; 4],
    view: [[f32; 4]; 4],
}

#[repr(C)]
#[derive(Copy, Clone, Pod, Zeroable)]
struct Vertex {
    position: [f32; 3],
    normal: [f32; 3],
}

#[repr(C)]
#[derive(Debug, Copy, Clone, PartialEq, Pod, Zeroable)]
struct InstanceData {
    model_0: [f32; 4],
    model_1: [f32; 4],
    model_2: [f32; 4],
    model_3: [f32; 4],
}

/// A contiguous run of instances sharing geometry and material.
#[derive(Debug, Clone, PartialEq)]
struct DrawBatch {
    geometry: GeometryHandle,
    material: MaterialRole,
    instances: Range<u32>,
}

/// Counters shown in the diagnostics panel.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct RenderStats {
    pub geometries: usize,
    pub batches: usize,
    pub instances: usize,
    pub textures: usize,
}

struct GpuMesh {
    vertex_buffer: wgpu::Buffer,
    index_buffer: wgpu::Buffer,
    index_count: u32,
}

struct GpuTexture {
    _texture: wgpu::Texture,
    view: wgpu::TextureView,
}

struct MaterialBinding {
    generation: u64,
    bind_group: wgpu::BindGroup,
}

/// Flatten the scene into one instance array, grouped for instanced draws.
fn build_batches(scene: &Scene) -> (Vec<InstanceData>, Vec<DrawBatch>) {
    let mut instances = Vec::with_capacity(scene.mesh_count());
    let mut batches = Vec::new();
    for ((geometry, material), meshes) in scene.batches() {
        let start = instances.len() as u32;
        for mesh in meshes {
            let cols = mesh.transform.matrix().to_cols_array_2d();
            instances.push(InstanceData {
                model_0: cols[0],
                model_1: cols[1],
                model_2: cols[2],
                model_3: cols[3],
            });
        }
        batches.push(DrawBatch {
            geometry,
            material,
            instances: start..instances.len() as u32,
        });
    }
    (instances, batches)
}

fn upload_mesh(device: &wgpu::Device, handle: GeometryHandle, mesh: &MeshData) -> GpuMesh {
    let vertices: Vec<Vertex> = mesh
        .positions
        .iter()
        .zip(&mesh.normals)
        .map(|(&position, &normal)| Vertex { position, normal })
        .collect();
    let vertex_buffer = device.create_buffer_init(&wgpu::util::BufferInitDescriptor {
        label: Some(&format!("mesh_{}_vertices", handle.0)),
        contents: bytemuck::cast_slice(&vertices),
        usage: wgpu::BufferUsages::VERTEX,
    });
    let index_buffer = device.create_buffer_init(&wgpu::util::BufferInitDescriptor {
        label: Some(&format!("mesh_{}_indices", handle.0)),
        contents: bytemuck::cast_slice(&mesh.indices),
        usage: wgpu::BufferUsages::INDEX,
    });
    GpuMesh {
        vertex_buffer,
        index_buffer,
        index_count: mesh.indices.len() as u32,
    }
}

fn upload_texture(
    device: &wgpu::Device,
    queue: &wgpu::Queue,
    label: &str,
    width: u32,
    height: u32,
    rgba: &[u8],
) -> GpuTexture {
    let size = wgpu::Extent3d {
        width,
        height,
        depth_or_array_layers: 1,
    };
    let texture = device.create_texture(&wgpu::TextureDescriptor {
        label: Some(label),
        size,
        mip_level_count: 1,
        sample_count: 1,
        dimension: wgpu::TextureDimension::D2,
        format: wgpu::TextureFormat::Rgba8UnormSrgb,
        usage: wgpu::TextureUsages::TEXTURE_BINDING | wgpu::TextureUsages::COPY_DST,
        view_formats: &[],
    });
    queue.write_texture(
        wgpu::TexelCopyTextureInfo {
            texture: &texture,
            mip_level: 0,
            origin: wgpu::Origin3d::ZERO,
            aspect: wgpu::TextureAspect::All,
        },
        rgba,
        wgpu::TexelCopyBufferLayout {
            offset: 0,
            bytes_per_row: Some(width * 4),
            rows_per_image: Some(height),
        },
        size,
    );
    let view = texture.create_view(&wgpu::TextureViewDescriptor::default());
    GpuTexture {
        _texture: texture,
        view,
    }
}

/// Draws the scene with one matcap pipeline and instanced meshes.
pub struct MatcapRenderer {
    pipeline: wgpu::RenderPipeline,
    camera_buffer: wgpu::Buffer,
    camera_bind_group: wgpu::BindGroup,
    material_layout: wgpu::BindGroupLayout,
    sampler: wgpu::Sampler,
    fallback: GpuTexture,
    textures: HashMap<AssetId, GpuTexture>,
    materials: BTreeMap<MaterialRole, MaterialBinding>,
    meshes: Vec<GpuMesh>,
    batches: Vec<DrawBatch>,
    instance_buffer: wgpu::Buffer,
    instance_capacity: usize,
    instance_count: usize,
    scene_revision: Option<u64>,
    clear_color: wgpu::Color,
    depth_texture: wgpu::TextureView,
}

impl MatcapRenderer {
    pub fn new(
        device: &wgpu::Device,
        queue: &wgpu::Queue,
        surface_format: wgpu::TextureFormat,
        width: u32,
        height: u32,
    ) -> Self {
        let camera_buffer = device.create_buffer_init(&wgpu::util::BufferInitDescriptor {
            label: Some("camera_buffer"),
            contents: bytemuck::bytes_of(&CameraUniforms {
                view_proj: glam::Mat4::IDENTITY.to_cols_array_2d(),
                view: glam::Mat4::IDENTITY.to_cols_array_2d(),
            }),
            usage: wgpu::BufferUsages::UNIFORM | wgpu::BufferUsages::COPY_DST,
        });

        let camera_layout = device.create_bind_group_layout(&wgpu::BindGroupLayoutDescriptor {
            label: Some("camera_bind_group_layout"),
            entries: &[wgpu::BindGroupLayoutEntry {
                binding: 0,
                visibility: wgpu::ShaderStages::VERTEX,
                ty: wgpu::BindingType::Buffer {
                    ty: wgpu::BufferBindingType::Uniform,
                    has_dynamic_offset: false,
                    min_binding_size: None,
                },
                count: None,
            }],
        });

        let camera_bind_group = device.create_bind_group(&wgpu::BindGroupDescriptor {
            label: Some("camera_bind_group"),
            layout: &camera_layout,
            entries: &[wgpu::BindGroupEntry {
                binding: 0,
                resource: camera_buffer.as_entire_binding(),
            }],
        });

        let material_layout = device.create_bind_group_layout(&wgpu::BindGroupLayoutDescriptor {
            label: Some("matcap_bind_group_layout"),
            entries: &[
                wgpu::BindGroupLayoutEntry {
                    binding: 0,
                    visibility: wgpu::ShaderStages::FRAGMENT,
                    ty: wgpu::BindingType::Texture {
                        sample_type: wgpu::TextureSampleType::Float { filterable: true },
                        view_dimension: wgpu::TextureViewDimension::D2,
                        multisampled: false,
                    },
                    count: None,
                },
                wgpu::BindGroupLayoutEntry {
                    binding: 1,
                    visibility: wgpu::ShaderStages::FRAGMENT,
                    ty: wgpu::BindingType::Sampler(wgpu::SamplerBindingType::Filtering),
                    count: None,
                },
            ],
        });

        let sampler = device.create_sampler(&wgpu::SamplerDescriptor {
            label: Some("matcap_sampler"),
            address_mode_u: wgpu::AddressMode::ClampToEdge,
            address_mode_v: wgpu::AddressMode::ClampToEdge,
            mag_filter: wgpu::FilterMode::Linear,
            min_filter: wgpu::FilterMode::Linear,
            ..Default::default()
        });

        let pipeline_layout = device.create_pipeline_layout(&wgpu::PipelineLayoutDescriptor {
            label: Some("matcap_pipeline_layout"),
            bind_group_layouts: &[&camera_layout, &material_layout],
            push_constant_ranges: &[],
        });

        let shader = device.create_shader_module(wgpu::ShaderModuleDescriptor {
            label: Some("matcap_shader"),
            source: wgpu::ShaderSource::Wgsl(shaders::MATCAP_SHADER.into()),
        });

        let pipeline = device.create_render_pipeline(&wgpu::RenderPipelineDescriptor {
            label: Some("matcap_pipeline"),
            layout: Some(&pipeline_layout),
            vertex: wgpu::VertexState {
                module: &shader,
                entry_point: Some("vs_main"),
                compilation_options: Default::default(),
                buffers: &[
                    wgpu::VertexBufferLayout {
                        array_stride: std::mem::size_of::<Vertex>() as u64,
                        step_mode: wgpu::VertexStepMode::Vertex,
                        attributes: &wgpu::vertex_attr_array![
                            0 => Float32x3,
                            1 => Float32x3,
                        ],
                    },
                    wgpu::VertexBufferLayout {
                        array_stride: std::mem::size_of::<InstanceData>() as u64,
                        step_mode: wgpu::VertexStepMode::Instance,
                        attributes: &wgpu::vertex_attr_array![
                            2 => Float32x4,
                            3 => Float32x4,
                            4 => Float32x4,
                            5 => Float32x4,
                        ],
                    },
                ],
            },
            fragment: Some(wgpu::FragmentState {
                module: &shader,
                entry_point: Some("fs_main"),
                compilation_options: Default::default(),
                targets: &[Some(wgpu::ColorTargetState {
                    format: surface_format,
                    blend: Some(wgpu::BlendState::REPLACE),
                    write_mask: wgpu::ColorWrites::ALL,
                })],
            }),
            primitive: wgpu::PrimitiveState {
                topology: wgpu::PrimitiveTopology::TriangleList,
                cull_mode: None,
                ..Default::default()
            },
            depth_stencil: Some(wgpu::DepthStencilState {
                format: wgpu::TextureFormat::Depth32Float,
                depth_write_enabled: true,
                depth_compare: wgpu::CompareFunction::Less,
                stencil: Default::default(),
                bias: Default::default(),
            }),
            multisample: Default::default(),
            multiview: None,
            cache: None,
        });

        // Shown until the first matcap arrives.
        let fallback = upload_texture(device, queue, "matcap_fallback", 1, 1, &[255; 4]);

        let instance_capacity = 128;
        let instance_buffer = Self::create_instance_buffer(device, instance_capacity);
        let depth_texture = Self::create_depth_texture(device, width, height);

        Self {
            pipeline,
            camera_buffer,
            camera_bind_group,
            material_layout,
            sampler,
            fallback,
            textures: HashMap::new(),
            materials: BTreeMap::new(),
            meshes: Vec::new(),
            batches: Vec::new(),
            instance_buffer,
            instance_capacity,
            instance_count: 0,
            scene_revision: None,
            clear_color: wgpu::Color::WHITE,
            depth_texture,
        }
    }

    pub fn resize(&mut self, device: &wgpu::Device, width: u32, height: u32) {
        self.depth_texture = Self::create_depth_texture(device, width, height);
    }

    pub fn stats(&self) -> RenderStats {
        RenderStats {
            geometries: self.meshes.len(),
            batches: self.batches.len(),
            instances: self.instance_count,
            textures: self.textures.len(),
        }
    }

    /// Bring GPU resources up to date with `scene`.
    ///
    /// Geometry and instances are rebuilt when the scene revision moves.
    /// Materials flagged for update get a fresh bind group and are acknowledged.
    pub fn sync(&mut self, device: &wgpu::Device, queue: &wgpu::Queue, scene: &mut Scene) {
        let [r, g, b, a] = scene.background();
        self.clear_color = wgpu::Color {
            r: r as f64,
            g: g as f64,
            b: b as f64,
            a: a as f64,
        };

        if self.scene_revision != Some(scene.revision()) {
            self.sync_geometry(device, queue, scene);
            self.scene_revision = Some(scene.revision());
        }

        let mut uploaded = Vec::new();
        for role in MaterialRole::ALL {
            let material = scene.materials().get(role);
            let bound = self.materials.get(&role).map(|b| b.generation);
            if !material.needs_update() && bound == Some(material.generation()) {
                continue;
            }
            let generation = material.generation();
            let texture = material.texture().cloned();
            if let Some(texture) = &texture {
                self.ensure_texture(device, queue, texture);
            }
            let view = texture
                .as_ref()
                .and_then(|t| self.textures.get(&t.asset))
                .map_or(&self.fallback.view, |gpu| &gpu.view);
            let bind_group = device.create_bind_group(&wgpu::BindGroupDescriptor {
                label: Some("matcap_bind_group"),
                layout: &self.material_layout,
                entries: &[
                    wgpu::BindGroupEntry {
                        binding: 0,
                        resource: wgpu::BindingResource::TextureView(view),
                    },
                    wgpu::BindGroupEntry {
                        binding: 1,
                        resource: wgpu::BindingResource::Sampler(&self.sampler),
                    },
                ],
            });
            self.materials.insert(
                role,
                MaterialBinding {
                    generation,
                    bind_group,
                },
            );
            uploaded.push(role);
        }
        for role in uploaded {
            tracing::debug!(?role, "material bound");
            scene.materials_mut().acknowledge(role);
        }
    }

    fn sync_geometry(&mut self, device: &wgpu::Device, queue: &wgpu::Queue, scene: &Scene) {
        let count = scene.geometries().count();
        if count < self.meshes.len() {
            self.meshes.clear();
        }
        for (handle, mesh) in scene.geometries().skip(self.meshes.len()) {
            tracing::debug!(handle = handle.0, vertices = mesh.vertex_count(), "uploading geometry");
            self.meshes.push(upload_mesh(device, handle, mesh));
        }

        let (instances, batches) = build_batches(scene);
        if instances.len() > self.instance_capacity {
            self.instance_capacity = instances.len().next_power_of_two();
            self.instance_buffer = Self::create_instance_buffer(device, self.instance_capacity);
        }
        if !instances.is_empty() {
            queue.write_buffer(&self.instance_buffer, 0, bytemuck::cast_slice(&instances));
        }
        self.instance_count = instances.len();
        self.batches = batches;
    }

    /// Upload `texture` unless a texture with the same content is already resident.
    fn ensure_texture(&mut self, device: &wgpu::Device, queue: &wgpu::Queue, texture: &MatcapTexture) {
        self.textures.entry(texture.asset).or_insert_with(|| {
            tracing::debug!(matcap = %texture.matcap, asset = %texture.asset, "uploading matcap");
            upload_texture(
                device,
                queue,
                &format!("matcap_{}", texture.matcap),
                texture.width,
                texture.height,
                &texture.rgba,
            )
        });
    }

    /// Render one frame to `view`.
    pub fn render(
        &self,
        device: &wgpu::Device,
        queue: &wgpu::Queue,
        view: &wgpu::TextureView,
        camera: &OrbitCamera,
    ) {
        queue.write_buffer(
            &self.camera_buffer,
            0,
            bytemuck::bytes_of(&CameraUniforms {
                view_proj: camera.view_projection().to_cols_array_2d(),
                view: camera.view_matrix().to_cols_array_2d(),
            }),
        );

        let mut encoder = device.create_command_encoder(&wgpu::CommandEncoderDescriptor {
            label: Some("render_encoder"),
        });

        {
            let mut pass = encoder.begin_render_pass(&wgpu::RenderPassDescriptor {
                label: Some("main_pass"),
                color_attachments: &[Some(wgpu::RenderPassColorAttachment {
                    view,
                    resolve_target: None,
                    ops: wgpu::Operations {
                        load: wgpu::LoadOp::Clear(self.clear_color),
                        store: wgpu::StoreOp::Store,
                    },
                })],
                depth_stencil_attachment: Some(wgpu::RenderPassDepthStencilAttachment {
                    view: &self.depth_texture,
                    depth_ops: Some(wgpu::Operations {
                        load: wgpu::LoadOp::Clear(1.0),
                        store: wgpu::StoreOp::Store,
                    }),
                    stencil_ops: None,
                }),
                ..Default::default()
            });

            pass.set_pipeline(&self.pipeline);
            pass.set_bind_group(0, &self.camera_bind_group, &[]);
            pass.set_vertex_buffer(1, self.instance_buffer.slice(..));
            for batch in &self.batches {
                let (Some(mesh), Some(material)) = (
                    self.meshes.get(batch.geometry.0 as usize),
                    self.materials.get(&batch.material),
                ) else {
                    continue;
                };
                if mesh.index_count == 0 {
                    continue;
                }
                pass.set_bind_group(1, &material.bind_group, &[]);
                pass.set_vertex_buffer(0, mesh.vertex_buffer.slice(..));
                pass.set_index_buffer(mesh.index_buffer.slice(..), wgpu::IndexFormat::Uint32);
                pass.draw_indexed(0..mesh.index_count, 0, batch.instances.clone());
            }
        }

        queue.submit(std::iter::once(encoder.finish()));
    }

    fn create_instance_buffer(device: &wgpu::Device, capacity: usize) -> wgpu::Buffer {
        device.create_buffer(&wgpu::BufferDescriptor {
            label: Some("instance_buffer"),
            size: (capacity * std::mem::size_of::<InstanceData>()) as u64,
            usage: wgpu::BufferUsages::VERTEX | wgpu::BufferUsages::COPY_DST,
            mapped_at_creation: false,
        })
    }

    fn create_depth_texture(device: &wgpu::Device, width: u32, height: u32) -> wgpu::TextureView {
        let texture = device.create_texture(&wgpu::TextureDescriptor {
            label: Some("depth_texture"),
            size: wgpu::Extent3d {
                width: width.max(1),
                height: height.max(1),
                depth_or_array_layers: 1,
            },
            mip_level_count: 1,
            sample_count: 1,
            dimension: wgpu::TextureDimension::D2,
            format: wgpu::TextureFormat::Depth32Float,
            usage: wgpu::TextureUsages::RENDER_ATTACHMENT,
            view_formats: &[],
        });
        texture.create_view(&Default::default())
    }
}
