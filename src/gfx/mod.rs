//! # Graphics Module
//!
//! Everything between the engine and the GPU.
//!
//! - **Backend** ([`backend`]) - the [`RenderBackend`](backend::RenderBackend)
//!   capability and its wgpu implementation
//! - **Camera** ([`camera`]) - fly camera, projection and input controller
//! - **Rendering** ([`rendering`]) - pass ordering and pipeline helpers
//! - **Resources** ([`resources`]) - global bindings, render targets and the
//!   voxel volume
//! - **Scene** ([`scene`]) - mesh loading and the per-scene render stages
//! - **Shaders** ([`shaders`]) - embedded WGSL programs

pub mod backend;
pub mod camera;
pub mod rendering;
pub mod resources;
pub mod scene;
pub mod shaders;

pub use backend::{RenderBackend, WgpuBackend};
pub use camera::Camera;
pub use scene::{SceneStages, VoxelScene};
