// src/lib.rs
//! vxgi
//!
//! Voxel cone traced global illumination on wgpu and winit. The [`Engine`]
//! sequences a staged pass pipeline (shadow map, data pass, voxelization,
//! voxel mipmapping, final shading) over a swappable
//! [`RenderBackend`](gfx::backend::RenderBackend).

pub mod app;
pub mod assets;
pub mod config;
pub mod engine;
pub mod error;
pub mod gfx;
pub mod logging;
pub mod time;
pub mod wgpu_utils;

// Re-export main types for convenience
pub use app::{VxgiApp, WgpuEngine};
pub use config::{EngineConfig, SceneDescriptor, ShadingPath};
pub use engine::{Engine, FrameParams, FramePhase};
pub use error::{FrameError, InitError, ResizeError};

/// Opens a window and runs the viewer until it is closed.
pub fn run(config: EngineConfig) -> anyhow::Result<()> {
    VxgiApp::new(config)?.run()
}
