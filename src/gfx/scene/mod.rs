//! # Scenes
//!
//! A scene owns its geometry and every GPU resource derived from it: shadow
//! map, voxel volume and the viewport-sized data-pass targets. The engine
//! drives it through the named stages of [`SceneStages`] in a fixed order.
//!
//! - [`SceneStages`] - the stage contract, generic over the render backend
//! - [`VoxelScene`] - the wgpu implementation
//! - [`MeshData`] - OBJ loading into a flat triangle list

pub mod mesh;
pub mod voxel_scene;

use std::path::Path;

pub use mesh::{Bounds, MeshData, Vertex};
pub use voxel_scene::{SceneUniform, VoxelScene};

use crate::config::ShadingPath;
use crate::error::SceneError;
use crate::gfx::backend::{RenderBackend, Viewport};
use crate::gfx::shaders::ShaderSet;

/// Sizes a scene needs at construction.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SceneSettings {
    pub viewport: Viewport,
    pub voxel_resolution: u32,
    pub shadow_map_size: u32,
}

/// Per-frame choices for the final draw.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct DrawOptions {
    pub shading: ShadingPath,
    pub draw_voxel_overlay: bool,
}

/// The named stages of a scene.
///
/// Stages are only ever called in the orders enforced by
/// [`PassTracker`](crate::gfx::rendering::PassTracker): once
/// shadow, data, voxelize, mipmap after loading, then shadow, data, draw
/// every frame.
pub trait SceneStages<B: RenderBackend>: Sized {
    /// Loads the model and creates all GPU resources.
    fn load(
        gpu: &mut B,
        model_path: &Path,
        shaders: &ShaderSet,
        settings: &SceneSettings,
    ) -> Result<Self, SceneError>;

    /// Renders the shadow map from the light.
    fn create_shadow(&mut self, gpu: &mut B) -> Result<(), SceneError>;

    /// Renders albedo, normal and position into the data targets.
    fn render_data(&mut self, gpu: &mut B) -> Result<(), SceneError>;

    /// Rasterizes the geometry into the finest level of the voxel volume.
    fn voxelize(&mut self, gpu: &mut B) -> Result<(), SceneError>;

    /// Filters the voxel volume down its mip chain.
    fn mipmap(&mut self, gpu: &mut B) -> Result<(), SceneError>;

    /// Final shaded draw into the current frame.
    fn draw(&mut self, gpu: &mut B, options: &DrawOptions) -> Result<(), SceneError>;

    /// Recreates the viewport-sized targets.
    fn setup_scene_textures(&mut self, gpu: &mut B, viewport: Viewport) -> Result<(), SceneError>;

    /// Viewport the current targets were built for.
    fn viewport(&self) -> Viewport;

    /// Releases GPU resources. Must be safe to call more than once.
    fn release(&mut self, _gpu: &mut B) {}
}
