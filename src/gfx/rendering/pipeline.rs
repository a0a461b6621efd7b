//! Render and compute pipeline creation
//!
//! Pipelines are described with a [`PipelineConfig`] builder and created from
//! an already compiled shader module, so a pipeline can never reference a
//! program that failed to compile.

use wgpu::*;

use crate::gfx::backend::{BlendMode, RenderState};
use crate::gfx::resources::TextureResource;
use crate::gfx::scene::mesh::Vertex;
use crate::gfx::shaders::{COMPUTE_ENTRY, FRAGMENT_ENTRY, VERTEX_ENTRY};

/// Depth attachment used by a pipeline.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct DepthConfig {
    pub format: TextureFormat,
    pub write: bool,
    pub compare: CompareFunction,
}

impl DepthConfig {
    pub fn less() -> Self {
        Self {
            format: TextureResource::DEPTH_FORMAT,
            write: true,
            compare: CompareFunction::Less,
        }
    }
}

/// Configuration for creating a render pipeline
#[derive(Debug, Clone)]
pub struct PipelineConfig<'a> {
    pub label: String,
    pub bind_group_layouts: Vec<&'a BindGroupLayout>,
    pub cull_mode: Option<Face>,
    pub depth: Option<DepthConfig>,
    pub color_targets: Vec<Option<ColorTargetState>>,
    pub no_vertex_buffers: bool,
}

impl<'a> PipelineConfig<'a> {
    /// Starts from the engine's global render state: its culling and, when
    /// depth testing is on, a `Less` depth attachment.
    pub fn from_render_state(label: &str, state: &RenderState) -> Self {
        Self {
            label: label.to_owned(),
            bind_group_layouts: Vec::new(),
            cull_mode: state.cull_back_faces.then_some(Face::Back),
            depth: state.depth_test.then(DepthConfig::less),
            color_targets: Vec::new(),
            no_vertex_buffers: false,
        }
    }

    pub fn with_bind_group_layouts(mut self, layouts: Vec<&'a BindGroupLayout>) -> Self {
        self.bind_group_layouts = layouts;
        self
    }

    pub fn with_cull_mode(mut self, face: Option<Face>) -> Self {
        self.cull_mode = face;
        self
    }

    pub fn with_depth(mut self, depth: Option<DepthConfig>) -> Self {
        self.depth = depth;
        self
    }

    pub fn with_color_targets(mut self, targets: Vec<Option<ColorTargetState>>) -> Self {
        self.color_targets = targets;
        self
    }

    /// Full-screen passes and vertex pulling read no vertex buffers.
    pub fn with_no_vertex_buffers(mut self) -> Self {
        self.no_vertex_buffers = true;
        self
    }
}

/// Color target honoring the global blend mode.
pub fn color_target(format: TextureFormat, state: &RenderState) -> Option<ColorTargetState> {
    let blend = state.blend.map(|mode| match mode {
        BlendMode::SourceOver => BlendState::ALPHA_BLENDING,
    });
    Some(ColorTargetState {
        format,
        blend,
        write_mask: ColorWrites::ALL,
    })
}

/// Color target that is never blended.
pub fn opaque_target(format: TextureFormat) -> Option<ColorTargetState> {
    Some(ColorTargetState {
        format,
        blend: None,
        write_mask: ColorWrites::ALL,
    })
}

pub fn create_render_pipeline(
    device: &Device,
    module: &ShaderModule,
    config: &PipelineConfig,
) -> RenderPipeline {
    let pipeline_layout = device.create_pipeline_layout(&PipelineLayoutDescriptor {
        label: Some(&format!("{} Layout", config.label)),
        bind_group_layouts: &config.bind_group_layouts,
        push_constant_ranges: &[],
    });

    let vertex_buffers: &[VertexBufferLayout] = if config.no_vertex_buffers {
        &[]
    } else {
        &[Vertex::desc()]
    };

    let depth_stencil = config.depth.map(|depth| DepthStencilState {
        format: depth.format,
        depth_write_enabled: depth.write,
        depth_compare: depth.compare,
        stencil: StencilState::default(),
        bias: DepthBiasState::default(),
    });

    device.create_render_pipeline(&RenderPipelineDescriptor {
        label: Some(&config.label),
        layout: Some(&pipeline_layout),
        vertex: VertexState {
            module,
            entry_point: Some(VERTEX_ENTRY),
            buffers: vertex_buffers,
            compilation_options: PipelineCompilationOptions::default(),
        },
        fragment: Some(FragmentState {
            module,
            entry_point: Some(FRAGMENT_ENTRY),
            targets: &config.color_targets,
            compilation_options: PipelineCompilationOptions::default(),
        }),
        primitive: PrimitiveState {
            topology: PrimitiveTopology::TriangleList,
            strip_index_format: None,
            front_face: FrontFace::Ccw,
            cull_mode: config.cull_mode,
            polygon_mode: PolygonMode::Fill,
            unclipped_depth: false,
            conservative: false,
        },
        depth_stencil,
        multisample: MultisampleState::default(),
        multiview: None,
        cache: None,
    })
}

pub fn create_compute_pipeline(
    device: &Device,
    module: &ShaderModule,
    label: &str,
    bind_group_layouts: &[&BindGroupLayout],
) -> ComputePipeline {
    let pipeline_layout = device.create_pipeline_layout(&PipelineLayoutDescriptor {
        label: Some(&format!("{} Layout", label)),
        bind_group_layouts,
        push_constant_ranges: &[],
    });

    device.create_compute_pipeline(&ComputePipelineDescriptor {
        label: Some(label),
        layout: Some(&pipeline_layout),
        module,
        entry_point: Some(COMPUTE_ENTRY),
        compilation_options: PipelineCompilationOptions::default(),
        cache: None,
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_config_follows_render_state() {
        let state = RenderState::standard([0.0; 4]);
        let config = PipelineConfig::from_render_state("draw", &state);
        assert_eq!(config.cull_mode, Some(Face::Back));
        assert_eq!(config.depth, Some(DepthConfig::less()));

        let state = RenderState {
            depth_test: false,
            cull_back_faces: false,
            ..state
        };
        let config = PipelineConfig::from_render_state("draw", &state);
        assert_eq!(config.cull_mode, None);
        assert_eq!(config.depth, None);
    }

    #[test]
    fn test_blend_mode_maps_to_alpha_blending() {
        let state = RenderState::standard([0.0; 4]);
        let target = color_target(TextureFormat::Bgra8Unorm, &state).unwrap();
        assert_eq!(target.blend, Some(BlendState::ALPHA_BLENDING));

        let unblended = RenderState { blend: None, ..state };
        let target = color_target(TextureFormat::Bgra8Unorm, &unblended).unwrap();
        assert_eq!(target.blend, None);
    }
}
