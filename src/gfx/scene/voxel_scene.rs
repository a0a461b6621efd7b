//! wgpu scene
//!
//! Bind groups follow one layout across every program:
//!
//! | group | contents                                                   |
//! |-------|------------------------------------------------------------|
//! | 0     | globals (frame params, camera), owned by the backend       |
//! | 1     | scene uniform (light, voxel volume placement)              |
//! | 2     | shadow map + comparison sampler, or the mip level pair     |
//! | 3     | voxel volume + data targets, or the voxelization inputs    |

use std::path::Path;

use cgmath::{ortho, InnerSpace, Matrix4, Vector3};
use wgpu::util::DeviceExt;

use super::{Bounds, DrawOptions, MeshData, SceneSettings, SceneStages};
use crate::config::ShadingPath;
use crate::error::{GpuError, SceneError};
use crate::gfx::backend::{Viewport, WgpuBackend};
use crate::gfx::camera::OPENGL_TO_WGPU_MATRIX;
use crate::gfx::rendering::pipeline::{
    color_target, create_compute_pipeline, create_render_pipeline, opaque_target, DepthConfig,
    PipelineConfig,
};
use crate::gfx::resources::{TextureResource, VoxelVolume};
use crate::gfx::shaders::ShaderSet;
use crate::wgpu_utils::{binding_types, layout_entry, UniformBuffer, ALL_STAGES, RENDERING};

const ALBEDO_FORMAT: wgpu::TextureFormat = wgpu::TextureFormat::Rgba8Unorm;
const NORMAL_FORMAT: wgpu::TextureFormat = wgpu::TextureFormat::Rgba16Float;
const POSITION_FORMAT: wgpu::TextureFormat = wgpu::TextureFormat::Rgba16Float;
/// Voxelization rasterizes into a write-masked target of this format.
const VOXEL_TARGET_FORMAT: wgpu::TextureFormat = wgpu::TextureFormat::R8Unorm;

/// Points towards the light.
const LIGHT_DIRECTION: [f32; 3] = [0.3, 1.0, 0.4];
const LIGHT_COLOR: [f32; 4] = [1.0, 0.95, 0.85, 3.0];
const VOLUME_PADDING: f32 = 1.05;
const INDIRECT_STRENGTH: f32 = 1.0;
const MIP_WORKGROUP: u32 = 4;

/// Scene block at group 1.
///
/// MUST match `SceneUniform` in `common.wgsl`.
#[repr(C)]
#[derive(Copy, Clone, Debug, PartialEq, bytemuck::Pod, bytemuck::Zeroable)]
pub struct SceneUniform {
    pub light_view_proj: [[f32; 4]; 4],
    pub light_dir: [f32; 4],
    pub light_color: [f32; 4],
    /// xyz min corner of the voxel volume, w edge length.
    pub voxel_origin: [f32; 4],
    /// x resolution, y mip count, z indirect strength.
    pub voxel_params: [f32; 4],
}

impl SceneUniform {
    /// Fits a cubic voxel volume and an orthographic light around `bounds`.
    pub fn new(bounds: &Bounds, voxel_resolution: u32, mip_count: u32) -> Self {
        let center = bounds.center();
        let edge = (bounds.max_extent() * VOLUME_PADDING).max(f32::EPSILON);
        let half = edge * 0.5;

        let light_dir = Vector3::from(LIGHT_DIRECTION).normalize();
        // Half diagonal of the volume cube.
        let radius = half * 3f32.sqrt();
        let eye = center + light_dir * (radius * 2.0);
        let up = if light_dir.y.abs() > 0.99 {
            Vector3::unit_z()
        } else {
            Vector3::unit_y()
        };
        let view = Matrix4::look_at_rh(eye, center, up);
        let proj = OPENGL_TO_WGPU_MATRIX
            * ortho(-radius, radius, -radius, radius, radius * 0.5, radius * 3.5);

        Self {
            light_view_proj: (proj * view).into(),
            light_dir: light_dir.extend(0.0).into(),
            light_color: LIGHT_COLOR,
            voxel_origin: [center.x - half, center.y - half, center.z - half, edge],
            voxel_params: [
                voxel_resolution as f32,
                mip_count as f32,
                INDIRECT_STRENGTH,
                0.0,
            ],
        }
    }
}

struct Layouts {
    scene: wgpu::BindGroupLayout,
    lighting: wgpu::BindGroupLayout,
    textures: wgpu::BindGroupLayout,
    voxelize: wgpu::BindGroupLayout,
    mip: wgpu::BindGroupLayout,
}

impl Layouts {
    fn new(device: &wgpu::Device) -> Self {
        let create = |label: &str, entries: &[wgpu::BindGroupLayoutEntry]| {
            device.create_bind_group_layout(&wgpu::BindGroupLayoutDescriptor {
                label: Some(label),
                entries,
            })
        };
        let fragment = wgpu::ShaderStages::FRAGMENT;

        Self {
            scene: create(
                "Scene Layout",
                &[layout_entry(0, ALL_STAGES, binding_types::uniform())],
            ),
            lighting: create(
                "Lighting Layout",
                &[
                    layout_entry(0, fragment, binding_types::texture_depth_2d()),
                    layout_entry(
                        1,
                        fragment,
                        binding_types::sampler(wgpu::SamplerBindingType::Comparison),
                    ),
                ],
            ),
            textures: create(
                "Scene Textures Layout",
                &[
                    layout_entry(0, fragment, binding_types::texture_3d()),
                    layout_entry(
                        1,
                        fragment,
                        binding_types::sampler(wgpu::SamplerBindingType::Filtering),
                    ),
                    layout_entry(2, fragment, binding_types::texture_2d_unfilterable()),
                    layout_entry(3, fragment, binding_types::texture_2d_unfilterable()),
                    layout_entry(4, fragment, binding_types::texture_2d_unfilterable()),
                ],
            ),
            voxelize: create(
                "Voxelization Layout",
                &[
                    layout_entry(0, RENDERING, binding_types::storage_buffer_read_only()),
                    layout_entry(1, RENDERING, binding_types::storage_buffer_read_only()),
                    layout_entry(
                        2,
                        fragment,
                        binding_types::image_3d(
                            VoxelVolume::FORMAT,
                            wgpu::StorageTextureAccess::WriteOnly,
                        ),
                    ),
                ],
            ),
            mip: create(
                "Voxel Mip Layout",
                &[
                    layout_entry(
                        0,
                        wgpu::ShaderStages::COMPUTE,
                        binding_types::texture_3d(),
                    ),
                    layout_entry(
                        1,
                        wgpu::ShaderStages::COMPUTE,
                        binding_types::image_3d(
                            VoxelVolume::FORMAT,
                            wgpu::StorageTextureAccess::WriteOnly,
                        ),
                    ),
                ],
            ),
        }
    }
}

struct Pipelines {
    shadow: wgpu::RenderPipeline,
    data: wgpu::RenderPipeline,
    voxelize: wgpu::RenderPipeline,
    deferred: wgpu::RenderPipeline,
    forward: wgpu::RenderPipeline,
    overlay: wgpu::RenderPipeline,
    mipmap: wgpu::ComputePipeline,
}

impl Pipelines {
    fn new(gpu: &WgpuBackend, shaders: &ShaderSet, layouts: &Layouts) -> Result<Self, GpuError> {
        let device = gpu.device();
        let state = gpu.render_state();
        let global = gpu.global_layout();
        let surface_target = color_target(gpu.surface_format(), state);
        let draw_layouts = vec![global, &layouts.scene, &layouts.lighting, &layouts.textures];

        let shadow = create_render_pipeline(
            device,
            &gpu.program(shaders.shadow_map)?.module,
            &PipelineConfig::from_render_state("Shadow Pass", state)
                .with_bind_group_layouts(vec![global, &layouts.scene])
                .with_depth(Some(DepthConfig::less())),
        );

        let data = create_render_pipeline(
            device,
            &gpu.program(shaders.draw_data)?.module,
            &PipelineConfig::from_render_state("Data Pass", state)
                .with_bind_group_layouts(vec![global, &layouts.scene])
                .with_depth(Some(DepthConfig::less()))
                .with_color_targets(vec![
                    opaque_target(ALBEDO_FORMAT),
                    opaque_target(NORMAL_FORMAT),
                    opaque_target(POSITION_FORMAT),
                ]),
        );

        let voxelize = create_render_pipeline(
            device,
            &gpu.program(shaders.voxelize)?.module,
            &PipelineConfig::from_render_state("Voxelization", state)
                .with_bind_group_layouts(vec![
                    global,
                    &layouts.scene,
                    &layouts.lighting,
                    &layouts.voxelize,
                ])
                .with_cull_mode(None)
                .with_depth(None)
                .with_color_targets(vec![Some(wgpu::ColorTargetState {
                    format: VOXEL_TARGET_FORMAT,
                    blend: None,
                    write_mask: wgpu::ColorWrites::empty(),
                })])
                .with_no_vertex_buffers(),
        );

        let deferred = create_render_pipeline(
            device,
            &gpu.program(shaders.single_triangle)?.module,
            &PipelineConfig::from_render_state("Deferred Shading", state)
                .with_bind_group_layouts(draw_layouts.clone())
                .with_cull_mode(None)
                .with_depth(None)
                .with_color_targets(vec![surface_target.clone()])
                .with_no_vertex_buffers(),
        );

        let forward = create_render_pipeline(
            device,
            &gpu.program(shaders.draw_scene)?.module,
            &PipelineConfig::from_render_state("Forward Shading", state)
                .with_bind_group_layouts(draw_layouts.clone())
                .with_color_targets(vec![surface_target.clone()]),
        );

        let overlay = create_render_pipeline(
            device,
            &gpu.program(shaders.voxel)?.module,
            &PipelineConfig::from_render_state("Voxel Overlay", state)
                .with_bind_group_layouts(draw_layouts)
                .with_cull_mode(None)
                .with_depth(None)
                .with_color_targets(vec![surface_target])
                .with_no_vertex_buffers(),
        );

        let mipmap = create_compute_pipeline(
            device,
            &gpu.program(shaders.mipmap)?.module,
            "Voxel Mipmap",
            &[global, &layouts.scene, &layouts.mip],
        );

        Ok(Self {
            shadow,
            data,
            voxelize,
            deferred,
            forward,
            overlay,
            mipmap,
        })
    }
}

/// Viewport-sized outputs of the data pass, plus the group 3 bind group
/// that exposes them together with the voxel volume.
struct DataTargets {
    albedo: TextureResource,
    normal: TextureResource,
    position: TextureResource,
    depth: TextureResource,
    bind_group: wgpu::BindGroup,
}

impl DataTargets {
    fn new(
        device: &wgpu::Device,
        layout: &wgpu::BindGroupLayout,
        volume: &VoxelVolume,
        viewport: Viewport,
    ) -> Self {
        let (width, height) = (viewport.width(), viewport.height());
        let albedo =
            TextureResource::create_render_target(device, width, height, ALBEDO_FORMAT, "Albedo");
        let normal =
            TextureResource::create_render_target(device, width, height, NORMAL_FORMAT, "Normal");
        let position = TextureResource::create_render_target(
            device,
            width,
            height,
            POSITION_FORMAT,
            "Position",
        );
        let depth = TextureResource::create_depth_texture(device, width, height, "Data Depth");

        let bind_group = device.create_bind_group(&wgpu::BindGroupDescriptor {
            label: Some("Scene Textures Bind Group"),
            layout,
            entries: &[
                wgpu::BindGroupEntry {
                    binding: 0,
                    resource: wgpu::BindingResource::TextureView(&volume.view),
                },
                wgpu::BindGroupEntry {
                    binding: 1,
                    resource: wgpu::BindingResource::Sampler(&volume.sampler),
                },
                wgpu::BindGroupEntry {
                    binding: 2,
                    resource: wgpu::BindingResource::TextureView(&albedo.view),
                },
                wgpu::BindGroupEntry {
                    binding: 3,
                    resource: wgpu::BindingResource::TextureView(&normal.view),
                },
                wgpu::BindGroupEntry {
                    binding: 4,
                    resource: wgpu::BindingResource::TextureView(&position.view),
                },
            ],
        });

        Self {
            albedo,
            normal,
            position,
            depth,
            bind_group,
        }
    }

    fn destroy(&self) {
        for target in [&self.albedo, &self.normal, &self.position, &self.depth] {
            target.texture.destroy();
        }
    }
}

/// Every GPU object a loaded scene owns.
struct SceneResources {
    vertex_buffer: wgpu::Buffer,
    index_buffer: wgpu::Buffer,
    index_count: u32,
    scene_uniform: UniformBuffer<SceneUniform>,
    scene_bind_group: wgpu::BindGroup,
    shadow_map: TextureResource,
    lighting_bind_group: wgpu::BindGroup,
    volume: VoxelVolume,
    voxel_target: TextureResource,
    voxelize_bind_group: wgpu::BindGroup,
    /// One per level transition: level `i` read, level `i + 1` written.
    mip_bind_groups: Vec<wgpu::BindGroup>,
    layouts: Layouts,
    pipelines: Pipelines,
    targets: Option<DataTargets>,
}

impl SceneResources {
    fn draw_geometry(&self, pass: &mut wgpu::RenderPass<'_>) {
        pass.set_vertex_buffer(0, self.vertex_buffer.slice(..));
        pass.set_index_buffer(self.index_buffer.slice(..), wgpu::IndexFormat::Uint32);
        pass.draw_indexed(0..self.index_count, 0, 0..1);
    }

    fn destroy(&mut self) {
        self.vertex_buffer.destroy();
        self.index_buffer.destroy();
        self.scene_uniform.buffer().destroy();
        self.shadow_map.texture.destroy();
        self.volume.texture.destroy();
        self.voxel_target.texture.destroy();
        if let Some(targets) = self.targets.take() {
            targets.destroy();
        }
    }
}

/// Scene rendered through the wgpu backend.
pub struct VoxelScene {
    name: String,
    bounds: Bounds,
    viewport: Viewport,
    resources: Option<SceneResources>,
}

impl VoxelScene {
    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn bounds(&self) -> &Bounds {
        &self.bounds
    }

    fn resources(&self) -> Result<&SceneResources, SceneError> {
        self.resources
            .as_ref()
            .ok_or_else(|| SceneError::Released(self.name.clone()))
    }

    fn targets(&self) -> Result<(&SceneResources, &DataTargets), SceneError> {
        let resources = self.resources()?;
        let targets = resources
            .targets
            .as_ref()
            .ok_or_else(|| SceneError::MissingTargets(self.name.clone()))?;
        Ok((resources, targets))
    }
}

fn command_encoder(gpu: &WgpuBackend, label: &str) -> wgpu::CommandEncoder {
    gpu.device()
        .create_command_encoder(&wgpu::CommandEncoderDescriptor { label: Some(label) })
}

fn load_color(view: &wgpu::TextureView) -> Option<wgpu::RenderPassColorAttachment<'_>> {
    Some(wgpu::RenderPassColorAttachment {
        view,
        resolve_target: None,
        ops: wgpu::Operations {
            load: wgpu::LoadOp::Load,
            store: wgpu::StoreOp::Store,
        },
    })
}

fn clear_color(view: &wgpu::TextureView) -> Option<wgpu::RenderPassColorAttachment<'_>> {
    Some(wgpu::RenderPassColorAttachment {
        view,
        resolve_target: None,
        ops: wgpu::Operations {
            load: wgpu::LoadOp::Clear(wgpu::Color::TRANSPARENT),
            store: wgpu::StoreOp::Store,
        },
    })
}

fn depth_attachment(
    view: &wgpu::TextureView,
    load: wgpu::LoadOp<f32>,
) -> Option<wgpu::RenderPassDepthStencilAttachment<'_>> {
    Some(wgpu::RenderPassDepthStencilAttachment {
        view,
        depth_ops: Some(wgpu::Operations {
            load,
            store: wgpu::StoreOp::Store,
        }),
        stencil_ops: None,
    })
}

impl SceneStages<WgpuBackend> for VoxelScene {
    fn load(
        gpu: &mut WgpuBackend,
        model_path: &Path,
        shaders: &ShaderSet,
        settings: &SceneSettings,
    ) -> Result<Self, SceneError> {
        let mesh = MeshData::load(model_path)?;
        let bounds = mesh
            .bounds()
            .ok_or_else(|| SceneError::EmptyModel(model_path.display().to_string()))?;
        let name = model_path
            .file_stem()
            .map(|s| s.to_string_lossy().into_owned())
            .unwrap_or_else(|| model_path.display().to_string());

        let device = gpu.device();
        let layouts = Layouts::new(device);
        let pipelines = Pipelines::new(gpu, shaders, &layouts)?;

        let vertex_buffer = device.create_buffer_init(&wgpu::util::BufferInitDescriptor {
            label: Some(&format!("{} Vertices", name)),
            contents: bytemuck::cast_slice(&mesh.vertices),
            usage: wgpu::BufferUsages::VERTEX | wgpu::BufferUsages::STORAGE,
        });
        let index_buffer = device.create_buffer_init(&wgpu::util::BufferInitDescriptor {
            label: Some(&format!("{} Indices", name)),
            contents: bytemuck::cast_slice(&mesh.indices),
            usage: wgpu::BufferUsages::INDEX | wgpu::BufferUsages::STORAGE,
        });

        let resolution = settings.voxel_resolution;
        let volume = VoxelVolume::new(device, resolution);

        let mut scene_uniform = UniformBuffer::new(device);
        scene_uniform.update_content(
            gpu.queue(),
            SceneUniform::new(&bounds, resolution, volume.mip_count()),
        );
        let scene_bind_group = device.create_bind_group(&wgpu::BindGroupDescriptor {
            label: Some("Scene Bind Group"),
            layout: &layouts.scene,
            entries: &[wgpu::BindGroupEntry {
                binding: 0,
                resource: scene_uniform.binding_resource(),
            }],
        });

        let shadow_map = TextureResource::create_shadow_map(device, settings.shadow_map_size);
        let lighting_bind_group = device.create_bind_group(&wgpu::BindGroupDescriptor {
            label: Some("Lighting Bind Group"),
            layout: &layouts.lighting,
            entries: &[
                wgpu::BindGroupEntry {
                    binding: 0,
                    resource: wgpu::BindingResource::TextureView(&shadow_map.view),
                },
                wgpu::BindGroupEntry {
                    binding: 1,
                    resource: wgpu::BindingResource::Sampler(&shadow_map.sampler),
                },
            ],
        });

        let voxel_target = TextureResource::create_render_target(
            device,
            resolution,
            resolution,
            VOXEL_TARGET_FORMAT,
            "Voxelization Target",
        );
        let voxelize_bind_group = device.create_bind_group(&wgpu::BindGroupDescriptor {
            label: Some("Voxelization Bind Group"),
            layout: &layouts.voxelize,
            entries: &[
                wgpu::BindGroupEntry {
                    binding: 0,
                    resource: vertex_buffer.as_entire_binding(),
                },
                wgpu::BindGroupEntry {
                    binding: 1,
                    resource: index_buffer.as_entire_binding(),
                },
                wgpu::BindGroupEntry {
                    binding: 2,
                    resource: wgpu::BindingResource::TextureView(&volume.mip_views[0]),
                },
            ],
        });

        let mip_bind_groups = volume
            .mip_views
            .windows(2)
            .enumerate()
            .map(|(level, pair)| {
                device.create_bind_group(&wgpu::BindGroupDescriptor {
                    label: Some(&format!("Voxel Mip {} -> {}", level, level + 1)),
                    layout: &layouts.mip,
                    entries: &[
                        wgpu::BindGroupEntry {
                            binding: 0,
                            resource: wgpu::BindingResource::TextureView(&pair[0]),
                        },
                        wgpu::BindGroupEntry {
                            binding: 1,
                            resource: wgpu::BindingResource::TextureView(&pair[1]),
                        },
                    ],
                })
            })
            .collect();

        let mut scene = VoxelScene {
            name,
            bounds,
            viewport: settings.viewport,
            resources: Some(SceneResources {
                vertex_buffer,
                index_buffer,
                index_count: mesh.indices.len() as u32,
                scene_uniform,
                scene_bind_group,
                shadow_map,
                lighting_bind_group,
                volume,
                voxel_target,
                voxelize_bind_group,
                mip_bind_groups,
                layouts,
                pipelines,
                targets: None,
            }),
        };
        scene.setup_scene_textures(gpu, settings.viewport)?;
        Ok(scene)
    }

    fn create_shadow(&mut self, gpu: &mut WgpuBackend) -> Result<(), SceneError> {
        let r = self.resources()?;
        let globals = gpu.global_bind_group()?;
        let mut encoder = command_encoder(gpu, "Shadow Encoder");
        {
            let mut pass = encoder.begin_render_pass(&wgpu::RenderPassDescriptor {
                label: Some("Shadow Pass"),
                color_attachments: &[],
                depth_stencil_attachment: depth_attachment(
                    &r.shadow_map.view,
                    wgpu::LoadOp::Clear(1.0),
                ),
                occlusion_query_set: None,
                timestamp_writes: None,
            });
            pass.set_pipeline(&r.pipelines.shadow);
            pass.set_bind_group(0, globals, &[]);
            pass.set_bind_group(1, &r.scene_bind_group, &[]);
            r.draw_geometry(&mut pass);
        }
        gpu.submit(encoder);
        Ok(())
    }

    fn render_data(&mut self, gpu: &mut WgpuBackend) -> Result<(), SceneError> {
        let (r, targets) = self.targets()?;
        let globals = gpu.global_bind_group()?;
        let mut encoder = command_encoder(gpu, "Data Encoder");
        {
            let mut pass = encoder.begin_render_pass(&wgpu::RenderPassDescriptor {
                label: Some("Data Pass"),
                color_attachments: &[
                    clear_color(&targets.albedo.view),
                    clear_color(&targets.normal.view),
                    clear_color(&targets.position.view),
                ],
                depth_stencil_attachment: depth_attachment(
                    &targets.depth.view,
                    wgpu::LoadOp::Clear(1.0),
                ),
                occlusion_query_set: None,
                timestamp_writes: None,
            });
            pass.set_pipeline(&r.pipelines.data);
            pass.set_bind_group(0, globals, &[]);
            pass.set_bind_group(1, &r.scene_bind_group, &[]);
            r.draw_geometry(&mut pass);
        }
        gpu.submit(encoder);
        Ok(())
    }

    fn voxelize(&mut self, gpu: &mut WgpuBackend) -> Result<(), SceneError> {
        let r = self.resources()?;
        let globals = gpu.global_bind_group()?;
        r.volume.clear(gpu.queue());

        let mut encoder = command_encoder(gpu, "Voxelization Encoder");
        {
            let mut pass = encoder.begin_render_pass(&wgpu::RenderPassDescriptor {
                label: Some("Voxelization Pass"),
                color_attachments: &[Some(wgpu::RenderPassColorAttachment {
                    view: &r.voxel_target.view,
                    resolve_target: None,
                    ops: wgpu::Operations {
                        load: wgpu::LoadOp::Clear(wgpu::Color::TRANSPARENT),
                        store: wgpu::StoreOp::Discard,
                    },
                })],
                depth_stencil_attachment: None,
                occlusion_query_set: None,
                timestamp_writes: None,
            });
            pass.set_pipeline(&r.pipelines.voxelize);
            pass.set_bind_group(0, globals, &[]);
            pass.set_bind_group(1, &r.scene_bind_group, &[]);
            pass.set_bind_group(2, &r.lighting_bind_group, &[]);
            pass.set_bind_group(3, &r.voxelize_bind_group, &[]);
            pass.draw(0..r.index_count, 0..1);
        }
        gpu.submit(encoder);
        log::debug!(
            "voxelized {} into {}^3",
            self.name,
            r.volume.resolution()
        );
        Ok(())
    }

    fn mipmap(&mut self, gpu: &mut WgpuBackend) -> Result<(), SceneError> {
        let r = self.resources()?;
        let globals = gpu.global_bind_group()?;
        let mut encoder = command_encoder(gpu, "Mipmap Encoder");
        {
            let mut pass = encoder.begin_compute_pass(&wgpu::ComputePassDescriptor {
                label: Some("Voxel Mipmap Pass"),
                timestamp_writes: None,
            });
            pass.set_pipeline(&r.pipelines.mipmap);
            pass.set_bind_group(0, globals, &[]);
            pass.set_bind_group(1, &r.scene_bind_group, &[]);
            for (level, bind_group) in r.mip_bind_groups.iter().enumerate() {
                let groups = r.volume.level_size(level as u32 + 1).div_ceil(MIP_WORKGROUP);
                pass.set_bind_group(2, bind_group, &[]);
                pass.dispatch_workgroups(groups, groups, groups);
            }
        }
        gpu.submit(encoder);
        Ok(())
    }

    fn draw(&mut self, gpu: &mut WgpuBackend, options: &DrawOptions) -> Result<(), SceneError> {
        let (r, targets) = self.targets()?;
        let globals = gpu.global_bind_group()?;
        let frame = gpu.frame_view()?;
        let depth_test = gpu.render_state().depth_test;

        let mut encoder = command_encoder(gpu, "Draw Encoder");
        {
            let depth = match options.shading {
                ShadingPath::Forward if depth_test => {
                    depth_attachment(gpu.depth_view(), wgpu::LoadOp::Load)
                }
                _ => None,
            };
            let mut pass = encoder.begin_render_pass(&wgpu::RenderPassDescriptor {
                label: Some("Shading Pass"),
                color_attachments: &[load_color(frame)],
                depth_stencil_attachment: depth,
                occlusion_query_set: None,
                timestamp_writes: None,
            });
            pass.set_bind_group(0, globals, &[]);
            pass.set_bind_group(1, &r.scene_bind_group, &[]);
            pass.set_bind_group(2, &r.lighting_bind_group, &[]);
            pass.set_bind_group(3, &targets.bind_group, &[]);
            match options.shading {
                ShadingPath::Deferred => {
                    pass.set_pipeline(&r.pipelines.deferred);
                    pass.draw(0..3, 0..1);
                }
                ShadingPath::Forward => {
                    pass.set_pipeline(&r.pipelines.forward);
                    r.draw_geometry(&mut pass);
                }
            }
        }

        if options.draw_voxel_overlay {
            let mut pass = encoder.begin_render_pass(&wgpu::RenderPassDescriptor {
                label: Some("Voxel Overlay Pass"),
                color_attachments: &[load_color(frame)],
                depth_stencil_attachment: None,
                occlusion_query_set: None,
                timestamp_writes: None,
            });
            pass.set_pipeline(&r.pipelines.overlay);
            pass.set_bind_group(0, globals, &[]);
            pass.set_bind_group(1, &r.scene_bind_group, &[]);
            pass.set_bind_group(2, &r.lighting_bind_group, &[]);
            pass.set_bind_group(3, &targets.bind_group, &[]);
            pass.draw(0..3, 0..1);
        }

        gpu.submit(encoder);
        Ok(())
    }

    fn setup_scene_textures(
        &mut self,
        gpu: &mut WgpuBackend,
        viewport: Viewport,
    ) -> Result<(), SceneError> {
        let name = &self.name;
        let r = self
            .resources
            .as_mut()
            .ok_or_else(|| SceneError::Released(name.clone()))?;
        if let Some(old) = r.targets.take() {
            old.destroy();
        }
        r.targets = Some(DataTargets::new(
            gpu.device(),
            &r.layouts.textures,
            &r.volume,
            viewport,
        ));
        self.viewport = viewport;
        log::debug!(
            "{} targets sized to {}x{}",
            self.name,
            viewport.width(),
            viewport.height()
        );
        Ok(())
    }

    fn viewport(&self) -> Viewport {
        self.viewport
    }

    fn release(&mut self, _gpu: &mut WgpuBackend) {
        if let Some(mut resources) = self.resources.take() {
            resources.destroy();
            log::debug!("released scene {}", self.name);
        }
    }
}
