//! GPU resource management
//!
//! Handles textures and the global bind group.

pub mod global_bindings;
pub mod texture_resource;

pub use global_bindings::GlobalBindings;
pub use texture_resource::{TextureResource, VoxelVolume};
