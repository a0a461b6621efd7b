//! Shader programs used by the pipeline stages
//!
//! WGSL has no linker, so a program is "linked" by concatenating the common
//! prelude, any libraries and the stage files into one module. Every raster
//! program exposes `vs_main`/`fs_main`, every compute program `cs_main`.

use crate::{
    error::InitError,
    gfx::backend::{ProgramHandle, RenderBackend},
};

pub const VERTEX_ENTRY: &str = "vs_main";
pub const FRAGMENT_ENTRY: &str = "fs_main";
pub const COMPUTE_ENTRY: &str = "cs_main";

/// One WGSL source file embedded in the binary.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ShaderFile {
    pub name: &'static str,
    pub source: &'static str,
}

macro_rules! shader_file {
    ($name:literal) => {
        ShaderFile {
            name: $name,
            source: include_str!($name),
        }
    };
}

/// Global structs and group 0 bindings, linked into every program.
pub const COMMON: ShaderFile = shader_file!("common.wgsl");
/// Shadow map lookup and direct lighting (group 2).
pub const LIGHTING: ShaderFile = shader_file!("lighting.wgsl");
/// Voxel volume sampling and cone tracing (group 3, bindings 0-1).
pub const CONE_TRACING: ShaderFile = shader_file!("cone_tracing.wgsl");

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ProgramKind {
    Raster,
    Compute,
}

/// Everything needed to compile one program.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ProgramSource {
    pub label: &'static str,
    pub kind: ProgramKind,
    pub libraries: Vec<ShaderFile>,
    pub stages: Vec<ShaderFile>,
}

impl ProgramSource {
    /// Vertex + fragment program.
    pub fn raster(label: &'static str, vertex: ShaderFile, fragment: ShaderFile) -> Self {
        Self {
            label,
            kind: ProgramKind::Raster,
            libraries: Vec::new(),
            stages: vec![vertex, fragment],
        }
    }

    /// Vertex + fragment program with a per-triangle expansion stage that runs
    /// ahead of the vertex stage.
    pub fn expanded(
        label: &'static str,
        vertex: ShaderFile,
        fragment: ShaderFile,
        expansion: ShaderFile,
    ) -> Self {
        Self {
            label,
            kind: ProgramKind::Raster,
            libraries: Vec::new(),
            stages: vec![expansion, vertex, fragment],
        }
    }

    pub fn compute(label: &'static str, compute: ShaderFile) -> Self {
        Self {
            label,
            kind: ProgramKind::Compute,
            libraries: Vec::new(),
            stages: vec![compute],
        }
    }

    pub fn with_library(mut self, library: ShaderFile) -> Self {
        self.libraries.push(library);
        self
    }

    /// Names of the files in link order.
    pub fn file_names(&self) -> Vec<&'static str> {
        std::iter::once(COMMON.name)
            .chain(self.libraries.iter().map(|f| f.name))
            .chain(self.stages.iter().map(|f| f.name))
            .collect()
    }

    /// Single WGSL module: common prelude, then libraries, then stages.
    pub fn linked_source(&self) -> String {
        let files = std::iter::once(&COMMON)
            .chain(self.libraries.iter())
            .chain(self.stages.iter());

        let mut source = String::new();
        for file in files {
            source.push_str("// ---- ");
            source.push_str(file.name);
            source.push('\n');
            source.push_str(file.source);
            source.push('\n');
        }
        source
    }
}

/// Pipeline stage a program belongs to.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ShaderStage {
    DrawScene,
    DrawData,
    Voxelize,
    SingleTriangle,
    Voxel,
    MipMap,
    ShadowMap,
}

impl ShaderStage {
    /// Compilation order.
    pub const ALL: [ShaderStage; 7] = [
        ShaderStage::DrawScene,
        ShaderStage::DrawData,
        ShaderStage::Voxelize,
        ShaderStage::SingleTriangle,
        ShaderStage::Voxel,
        ShaderStage::MipMap,
        ShaderStage::ShadowMap,
    ];

    pub fn source(self) -> ProgramSource {
        match self {
            ShaderStage::DrawScene => ProgramSource::raster(
                "draw_scene",
                shader_file!("draw_model.vert.wgsl"),
                shader_file!("draw_model.frag.wgsl"),
            )
            .with_library(LIGHTING)
            .with_library(CONE_TRACING),
            ShaderStage::DrawData => ProgramSource::raster(
                "draw_data",
                shader_file!("draw_data.vert.wgsl"),
                shader_file!("draw_data.frag.wgsl"),
            ),
            ShaderStage::Voxelize => ProgramSource::expanded(
                "voxelize",
                shader_file!("voxelization.vert.wgsl"),
                shader_file!("voxelization.frag.wgsl"),
                shader_file!("voxelization.expand.wgsl"),
            )
            .with_library(LIGHTING),
            ShaderStage::SingleTriangle => ProgramSource::raster(
                "single_triangle",
                shader_file!("draw_triangle.vert.wgsl"),
                shader_file!("draw_triangle.frag.wgsl"),
            )
            .with_library(LIGHTING)
            .with_library(CONE_TRACING),
            ShaderStage::Voxel => ProgramSource::raster(
                "voxel",
                shader_file!("draw_voxel.vert.wgsl"),
                shader_file!("draw_voxel.frag.wgsl"),
            )
            .with_library(CONE_TRACING),
            ShaderStage::MipMap => {
                ProgramSource::compute("mipmap", shader_file!("mipmap.comp.wgsl"))
            }
            ShaderStage::ShadowMap => ProgramSource::raster(
                "shadow_map",
                shader_file!("shadow_map.vert.wgsl"),
                shader_file!("shadow_map.frag.wgsl"),
            ),
        }
    }
}

/// Compiled program handles, one per stage.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ShaderSet {
    pub draw_scene: ProgramHandle,
    pub draw_data: ProgramHandle,
    pub voxelize: ProgramHandle,
    pub single_triangle: ProgramHandle,
    pub voxel: ProgramHandle,
    pub mipmap: ProgramHandle,
    pub shadow_map: ProgramHandle,
}

impl ShaderSet {
    /// Compiles every stage's program. On the first failure the programs
    /// compiled so far are released and the failing stage is reported.
    pub fn compile<B: RenderBackend>(gpu: &mut B) -> Result<Self, InitError> {
        let mut compiled: Vec<ProgramHandle> = Vec::with_capacity(ShaderStage::ALL.len());

        for stage in ShaderStage::ALL {
            match gpu.compile_program(&stage.source()) {
                Ok(handle) => {
                    log::debug!("compiled {:?} program ({:?})", stage, handle);
                    compiled.push(handle);
                }
                Err(source) => {
                    for handle in compiled {
                        gpu.release_program(handle);
                    }
                    return Err(InitError::Shader { stage, source });
                }
            }
        }

        Ok(Self {
            draw_scene: compiled[0],
            draw_data: compiled[1],
            voxelize: compiled[2],
            single_triangle: compiled[3],
            voxel: compiled[4],
            mipmap: compiled[5],
            shadow_map: compiled[6],
        })
    }

    pub fn get(&self, stage: ShaderStage) -> ProgramHandle {
        match stage {
            ShaderStage::DrawScene => self.draw_scene,
            ShaderStage::DrawData => self.draw_data,
            ShaderStage::Voxelize => self.voxelize,
            ShaderStage::SingleTriangle => self.single_triangle,
            ShaderStage::Voxel => self.voxel,
            ShaderStage::MipMap => self.mipmap,
            ShaderStage::ShadowMap => self.shadow_map,
        }
    }

    pub fn release<B: RenderBackend>(self, gpu: &mut B) {
        for stage in ShaderStage::ALL {
            gpu.release_program(self.get(stage));
        }
    }
}
