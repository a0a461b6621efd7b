//! Graphics capability used by the engine
//!
//! The engine never calls the graphics API directly. It drives a
//! [`RenderBackend`], which is passed by `&mut` to the camera and to every
//! scene stage as the single ambient context. [`WgpuBackend`] is the real
//! implementation; tests provide recording doubles.

pub mod wgpu_backend;

use crate::error::{GpuError, ResizeError, ShaderError};
use crate::gfx::shaders::ProgramSource;

pub use wgpu_backend::WgpuBackend;

/// Uniform slot holding [`FrameParams`](crate::engine::params::FrameParams).
pub const PROGRAM_SLOT: u32 = 0;
/// Uniform slot holding [`CameraUniform`](crate::gfx::camera::CameraUniform).
pub const CAMERA_SLOT: u32 = 1;
/// Number of well-known uniform slots in the global bind group.
pub const GLOBAL_SLOTS: u32 = 2;

/// Opaque handle to a uniform buffer owned by a backend.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct BufferHandle(u32);

impl BufferHandle {
    pub fn new(id: u32) -> Self {
        Self(id)
    }

    pub fn id(self) -> u32 {
        self.0
    }
}

/// Opaque handle to a compiled and linked program.
///
/// Handles only come out of a successful
/// [`RenderBackend::compile_program`], so an invalid handle cannot be bound.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct ProgramHandle(u32);

impl ProgramHandle {
    pub fn new(id: u32) -> Self {
        Self(id)
    }

    pub fn id(self) -> u32 {
        self.0
    }
}

/// Output size in physical pixels. Both dimensions are non-zero.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Viewport {
    width: u32,
    height: u32,
}

impl Viewport {
    pub fn new(width: u32, height: u32) -> Result<Self, ResizeError> {
        if width == 0 || height == 0 {
            return Err(ResizeError::InvalidViewport { width, height });
        }
        Ok(Self { width, height })
    }

    pub fn width(&self) -> u32 {
        self.width
    }

    pub fn height(&self) -> u32 {
        self.height
    }

    pub fn aspect(&self) -> f32 {
        self.width as f32 / self.height as f32
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BlendMode {
    /// `src * src_alpha + dst * (1 - src_alpha)`
    SourceOver,
}

/// Global render state applied once during init.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct RenderState {
    pub depth_test: bool,
    pub cull_back_faces: bool,
    pub blend: Option<BlendMode>,
    pub clear_color: [f32; 4],
}

impl RenderState {
    /// Depth test, back-face culling and source-over blending.
    pub fn standard(clear_color: [f32; 4]) -> Self {
        Self {
            depth_test: true,
            cull_back_faces: true,
            blend: Some(BlendMode::SourceOver),
            clear_color,
        }
    }
}

impl Default for RenderState {
    fn default() -> Self {
        Self::standard([0.0, 0.0, 0.0, 1.0])
    }
}

/// Result of acquiring an output frame.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FrameStatus {
    Ready,
    /// The surface was lost or outdated and has been reconfigured. Nothing
    /// should be drawn this frame.
    Skipped,
}

/// Low-level graphics capability.
///
/// Calls are synchronous submissions from the caller's thread. GPU-side
/// execution is opaque to the engine.
pub trait RenderBackend {
    /// Adapter and backend description, logged after render state setup.
    fn describe(&self) -> String;

    fn apply_render_state(&mut self, state: &RenderState);

    /// Current output size.
    fn viewport(&self) -> Viewport;

    /// Reconfigures the output and viewport transform for a new size.
    fn set_viewport(&mut self, viewport: Viewport);

    /// Allocates a uniform buffer of `size` bytes bound at `slot` of the
    /// global bind group.
    fn create_uniform_buffer(&mut self, slot: u32, size: u64) -> Result<BufferHandle, GpuError>;

    /// Writes `bytes` into an existing buffer at `offset`. Never reallocates.
    fn write_uniform(
        &mut self,
        buffer: BufferHandle,
        offset: u64,
        bytes: &[u8],
    ) -> Result<(), GpuError>;

    fn release_buffer(&mut self, buffer: BufferHandle);

    fn compile_program(&mut self, source: &ProgramSource) -> Result<ProgramHandle, ShaderError>;

    fn release_program(&mut self, program: ProgramHandle);

    /// Acquires the next output frame.
    fn begin_frame(&mut self) -> Result<FrameStatus, GpuError>;

    /// Clears color and depth of the acquired frame.
    fn clear(&mut self, color: [f32; 4]) -> Result<(), GpuError>;

    /// Presents the acquired frame, if any.
    fn present(&mut self);

    /// Drops the acquired frame without presenting it. A frame must be
    /// presented or discarded before the next `begin_frame`.
    fn discard_frame(&mut self);
}
