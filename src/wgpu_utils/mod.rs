//! WGPU utility functions and helpers
//!
//! Binding type shorthands and typed uniform buffers.

pub mod binding_types;
pub mod uniform_buffer;

pub use uniform_buffer::UniformBuffer;

/// Layout entry visible to the given stages.
pub fn layout_entry(
    binding: u32,
    visibility: wgpu::ShaderStages,
    ty: wgpu::BindingType,
) -> wgpu::BindGroupLayoutEntry {
    wgpu::BindGroupLayoutEntry {
        binding,
        visibility,
        ty,
        count: None,
    }
}

/// Stages that rasterize or draw.
pub const RENDERING: wgpu::ShaderStages = wgpu::ShaderStages::VERTEX_FRAGMENT;

/// Every stage, for globals also read by compute programs.
pub const ALL_STAGES: wgpu::ShaderStages = wgpu::ShaderStages::VERTEX_FRAGMENT
    .union(wgpu::ShaderStages::COMPUTE);
