//! Error types for the engine and its collaborators
//!
//! Initialization failures are fatal and name the stage that failed. Per-frame
//! failures are returned from `Engine::step` for the host to log.

use thiserror::Error;

use crate::gfx::rendering::pass_tracker::Stage;
use crate::gfx::shaders::ShaderStage;

/// Failure reported by a render backend.
#[derive(Debug, Error)]
pub enum GpuError {
    #[error("uniform slot {0} already has a buffer")]
    SlotOccupied(u32),

    #[error("uniform slot {0} does not exist")]
    InvalidSlot(u32),

    #[error("write of {len} bytes at offset {offset} overruns buffer {buffer} ({size} bytes)")]
    WriteOutOfRange {
        buffer: u32,
        offset: u64,
        len: usize,
        size: u64,
    },

    #[error("unknown buffer handle {0}")]
    UnknownBuffer(u32),

    #[error("unknown program handle {0}")]
    UnknownProgram(u32),

    #[error("global bindings are incomplete, slot {0} has no buffer")]
    MissingGlobals(u32),

    #[error("no frame has been acquired")]
    NoFrame,

    #[error("surface out of memory")]
    OutOfMemory,

    #[error("wgpu: {0}")]
    Wgpu(String),
}

impl From<wgpu::Error> for GpuError {
    fn from(err: wgpu::Error) -> Self {
        GpuError::Wgpu(err.to_string())
    }
}

/// A program failed to compile or link.
#[derive(Debug, Error)]
#[error("program '{label}' failed to compile: {message}")]
pub struct ShaderError {
    pub label: String,
    pub message: String,
}

/// Failure while loading or preparing a scene.
#[derive(Debug, Error)]
pub enum SceneError {
    #[error("failed to load model {path}: {source}")]
    Model {
        path: String,
        #[source]
        source: tobj::LoadError,
    },

    #[error("model {0} contains no triangles")]
    EmptyModel(String),

    #[error("scene {0} has already been released")]
    Released(String),

    #[error("scene {0} has no viewport-sized targets")]
    MissingTargets(String),

    #[error(transparent)]
    Gpu(#[from] GpuError),
}

/// A pass was requested before the passes it depends on.
#[derive(Debug, Error, PartialEq, Eq)]
#[error("pass {requested:?} cannot run after {previous:?}")]
pub struct PassOrderError {
    pub requested: Stage,
    pub previous: Option<Stage>,
}

/// Failure during `Engine::init`. Everything acquired before the failure has
/// already been released when this is returned.
#[derive(Debug, Error)]
pub enum InitError {
    #[error("failed to allocate the frame parameter buffer: {0}")]
    ParamBuffer(#[source] GpuError),

    #[error("failed to compile the {stage:?} program: {source}")]
    Shader {
        stage: ShaderStage,
        #[source]
        source: ShaderError,
    },

    #[error("camera not initialized: {0}")]
    Camera(#[source] GpuError),

    #[error("asset folder '{folder}' not found under {root}")]
    AssetFolder { folder: String, root: String },

    #[error("error loading scene {name}: {source}")]
    Scene {
        name: String,
        #[source]
        source: SceneError,
    },

    #[error("scene {name} failed its initial {stage:?} pass: {source}")]
    PrePass {
        name: String,
        stage: Stage,
        #[source]
        source: FrameError,
    },

    #[error("no scenes configured")]
    NoScenes,

    #[error("scene index {index} out of range ({count} scenes)")]
    SceneSelect { index: usize, count: usize },
}

/// Rejected viewport change.
#[derive(Debug, Error)]
pub enum ResizeError {
    #[error("invalid viewport {width}x{height}")]
    InvalidViewport { width: u32, height: u32 },

    #[error("failed to rebuild scene targets: {0}")]
    Scene(#[from] SceneError),
}

/// Failure inside a single frame. The frame is abandoned, never retried.
#[derive(Debug, Error)]
pub enum FrameError {
    #[error("engine is not initialized")]
    NotInitialized,

    #[error("step called while a frame is already in flight")]
    Reentrant,

    #[error("no scene to render")]
    NoScene,

    #[error("scene index {index} out of range ({count} scenes)")]
    SceneSelect { index: usize, count: usize },

    #[error(transparent)]
    PassOrder(#[from] PassOrderError),

    #[error(transparent)]
    Gpu(#[from] GpuError),

    #[error(transparent)]
    Scene(#[from] SceneError),
}
