//! Recording doubles shared by the integration tests.
//!
//! [`RecordingBackend`] and [`RecordingScene`] append to one shared event
//! log, so a test can assert on the interleaving of backend calls and scene
//! stages.

#![allow(dead_code)]

use std::cell::RefCell;
use std::collections::{HashMap, HashSet};
use std::path::Path;
use std::rc::Rc;

use vxgi::config::{EngineConfig, SceneDescriptor};
use vxgi::engine::Engine;
use vxgi::error::{GpuError, SceneError, ShaderError};
use vxgi::gfx::backend::{
    BufferHandle, FrameStatus, ProgramHandle, RenderBackend, RenderState, Viewport,
    GLOBAL_SLOTS, PROGRAM_SLOT,
};
use vxgi::gfx::rendering::Stage;
use vxgi::gfx::scene::{DrawOptions, SceneSettings, SceneStages};
use vxgi::gfx::shaders::{ProgramSource, ShaderSet};

pub type TestEngine = Engine<RecordingBackend, RecordingScene>;

#[derive(Debug, Clone, PartialEq)]
pub enum Event {
    ApplyRenderState(RenderState),
    SetViewport(u32, u32),
    CreateBuffer { id: u32, slot: u32, size: u64 },
    Write { id: u32, offset: u64, len: usize },
    ReleaseBuffer(u32),
    Compile(String),
    ReleaseProgram(u32),
    BeginFrame,
    Clear,
    Present,
    Discard,
    SceneLoad(String),
    Pass { scene: String, stage: Stage },
    Draw { scene: String, options: DrawOptions },
    SetupTextures { scene: String, width: u32, height: u32 },
    SceneRelease(String),
}

/// Faults to inject, shared between backend and scenes.
#[derive(Debug, Default)]
pub struct Failures {
    /// Label of the program whose compilation fails.
    pub compile: Option<&'static str>,
    /// Uniform slot whose allocation fails.
    pub buffer_slot: Option<u32>,
    /// Model file whose load fails.
    pub model: Option<&'static str>,
    /// Stage that fails every time it runs.
    pub stage: Option<Stage>,
    /// Number of upcoming frames whose acquisition is skipped.
    pub skip_frames: u32,
}

#[derive(Debug, Default)]
pub struct Shared {
    pub events: Vec<Event>,
    pub failures: Failures,
}

/// Handle to the shared log. Clones observe the same events.
#[derive(Debug, Clone, Default)]
pub struct Log(Rc<RefCell<Shared>>);

impl Log {
    pub fn push(&self, event: Event) {
        self.0.borrow_mut().events.push(event);
    }

    pub fn events(&self) -> Vec<Event> {
        self.0.borrow().events.clone()
    }

    pub fn clear(&self) {
        self.0.borrow_mut().events.clear();
    }

    pub fn count(&self, pred: impl Fn(&Event) -> bool) -> usize {
        self.0.borrow().events.iter().filter(|e| pred(e)).count()
    }

    pub fn fail(&self, configure: impl FnOnce(&mut Failures)) {
        configure(&mut self.0.borrow_mut().failures);
    }

    fn with_failures<T>(&self, f: impl FnOnce(&mut Failures) -> T) -> T {
        f(&mut self.0.borrow_mut().failures)
    }

    /// Ids of buffers created and not yet released.
    pub fn live_buffers(&self) -> HashSet<u32> {
        let mut live = HashSet::new();
        for event in self.0.borrow().events.iter() {
            match event {
                Event::CreateBuffer { id, .. } => {
                    live.insert(*id);
                }
                Event::ReleaseBuffer(id) => {
                    live.remove(id);
                }
                _ => {}
            }
        }
        live
    }

    pub fn compiled(&self) -> usize {
        self.count(|e| matches!(e, Event::Compile(_)))
    }

    pub fn released_programs(&self) -> usize {
        self.count(|e| matches!(e, Event::ReleaseProgram(_)))
    }

    /// Stages run on `scene`, in order.
    pub fn passes(&self, scene: &str) -> Vec<Stage> {
        self.0
            .borrow()
            .events
            .iter()
            .filter_map(|e| match e {
                Event::Pass { scene: s, stage } if s == scene => Some(*stage),
                _ => None,
            })
            .collect()
    }
}

/// Accounting backend: validates handles like the real one and records
/// every call.
pub struct RecordingBackend {
    pub log: Log,
    viewport: Viewport,
    next_id: u32,
    buffers: HashMap<u32, u64>,
    slots: [Option<u32>; GLOBAL_SLOTS as usize],
    programs: HashSet<u32>,
    frame: bool,
}

impl RecordingBackend {
    pub fn new(log: Log) -> Self {
        Self {
            log,
            viewport: viewport(800, 600),
            next_id: 1,
            buffers: HashMap::new(),
            slots: [None; GLOBAL_SLOTS as usize],
            programs: HashSet::new(),
            frame: false,
        }
    }

    fn next_id(&mut self) -> u32 {
        let id = self.next_id;
        self.next_id += 1;
        id
    }

    pub fn has_frame(&self) -> bool {
        self.frame
    }
}

impl RenderBackend for RecordingBackend {
    fn describe(&self) -> String {
        "recording backend".to_owned()
    }

    fn apply_render_state(&mut self, state: &RenderState) {
        self.log.push(Event::ApplyRenderState(*state));
    }

    fn viewport(&self) -> Viewport {
        self.viewport
    }

    fn set_viewport(&mut self, viewport: Viewport) {
        self.viewport = viewport;
        self.log
            .push(Event::SetViewport(viewport.width(), viewport.height()));
    }

    fn create_uniform_buffer(&mut self, slot: u32, size: u64) -> Result<BufferHandle, GpuError> {
        if self.log.with_failures(|f| f.buffer_slot == Some(slot)) {
            return Err(GpuError::Wgpu(format!("injected failure at slot {}", slot)));
        }
        match self.slots.get(slot as usize) {
            None => return Err(GpuError::InvalidSlot(slot)),
            Some(Some(_)) => return Err(GpuError::SlotOccupied(slot)),
            Some(None) => {}
        }
        let id = self.next_id();
        self.buffers.insert(id, size);
        self.slots[slot as usize] = Some(id);
        self.log.push(Event::CreateBuffer { id, slot, size });
        Ok(BufferHandle::new(id))
    }

    fn write_uniform(
        &mut self,
        buffer: BufferHandle,
        offset: u64,
        bytes: &[u8],
    ) -> Result<(), GpuError> {
        let size = *self
            .buffers
            .get(&buffer.id())
            .ok_or(GpuError::UnknownBuffer(buffer.id()))?;
        if offset + bytes.len() as u64 > size {
            return Err(GpuError::WriteOutOfRange {
                buffer: buffer.id(),
                offset,
                len: bytes.len(),
                size,
            });
        }
        self.log.push(Event::Write {
            id: buffer.id(),
            offset,
            len: bytes.len(),
        });
        Ok(())
    }

    fn release_buffer(&mut self, buffer: BufferHandle) {
        self.buffers.remove(&buffer.id());
        for slot in self.slots.iter_mut() {
            if *slot == Some(buffer.id()) {
                *slot = None;
            }
        }
        self.log.push(Event::ReleaseBuffer(buffer.id()));
    }

    fn compile_program(&mut self, source: &ProgramSource) -> Result<ProgramHandle, ShaderError> {
        if self.log.with_failures(|f| f.compile == Some(source.label)) {
            return Err(ShaderError {
                label: source.label.to_owned(),
                message: "injected failure".to_owned(),
            });
        }
        let id = self.next_id();
        self.programs.insert(id);
        self.log.push(Event::Compile(source.label.to_owned()));
        Ok(ProgramHandle::new(id))
    }

    fn release_program(&mut self, program: ProgramHandle) {
        self.programs.remove(&program.id());
        self.log.push(Event::ReleaseProgram(program.id()));
    }

    fn begin_frame(&mut self) -> Result<FrameStatus, GpuError> {
        self.log.push(Event::BeginFrame);
        if self.frame {
            return Err(GpuError::Wgpu("surface texture already acquired".into()));
        }
        let skip = self.log.with_failures(|f| {
            let skip = f.skip_frames > 0;
            f.skip_frames = f.skip_frames.saturating_sub(1);
            skip
        });
        if skip {
            return Ok(FrameStatus::Skipped);
        }
        self.frame = true;
        Ok(FrameStatus::Ready)
    }

    fn clear(&mut self, _color: [f32; 4]) -> Result<(), GpuError> {
        if !self.frame {
            return Err(GpuError::NoFrame);
        }
        self.log.push(Event::Clear);
        Ok(())
    }

    fn present(&mut self) {
        self.frame = false;
        self.log.push(Event::Present);
    }

    fn discard_frame(&mut self) {
        if self.frame {
            self.frame = false;
            self.log.push(Event::Discard);
        }
    }
}

/// Scene double that records its stages instead of drawing.
pub struct RecordingScene {
    name: String,
    log: Log,
    viewport: Viewport,
    released: bool,
}

impl RecordingScene {
    pub fn name(&self) -> &str {
        &self.name
    }

    fn stage(&mut self, stage: Stage) -> Result<(), SceneError> {
        if self.released {
            return Err(SceneError::Released(self.name.clone()));
        }
        self.log.push(Event::Pass {
            scene: self.name.clone(),
            stage,
        });
        if self.log.with_failures(|f| f.stage == Some(stage)) {
            return Err(SceneError::Gpu(GpuError::Wgpu(format!(
                "injected {} failure",
                stage
            ))));
        }
        Ok(())
    }
}

impl SceneStages<RecordingBackend> for RecordingScene {
    fn load(
        gpu: &mut RecordingBackend,
        model_path: &Path,
        _shaders: &ShaderSet,
        settings: &SceneSettings,
    ) -> Result<Self, SceneError> {
        let file = model_path
            .file_name()
            .map(|f| f.to_string_lossy().into_owned())
            .unwrap_or_default();
        if gpu.log.with_failures(|f| f.model == Some(file.as_str())) {
            return Err(SceneError::EmptyModel(file));
        }
        gpu.log.push(Event::SceneLoad(file.clone()));
        Ok(Self {
            name: file,
            log: gpu.log.clone(),
            viewport: settings.viewport,
            released: false,
        })
    }

    fn create_shadow(&mut self, _gpu: &mut RecordingBackend) -> Result<(), SceneError> {
        self.stage(Stage::Shadow)
    }

    fn render_data(&mut self, _gpu: &mut RecordingBackend) -> Result<(), SceneError> {
        self.stage(Stage::Data)
    }

    fn voxelize(&mut self, _gpu: &mut RecordingBackend) -> Result<(), SceneError> {
        self.stage(Stage::Voxelize)
    }

    fn mipmap(&mut self, _gpu: &mut RecordingBackend) -> Result<(), SceneError> {
        self.stage(Stage::MipMap)
    }

    fn draw(&mut self, gpu: &mut RecordingBackend, options: &DrawOptions) -> Result<(), SceneError> {
        if !gpu.has_frame() {
            return Err(SceneError::Gpu(GpuError::NoFrame));
        }
        self.stage(Stage::Draw)?;
        self.log.push(Event::Draw {
            scene: self.name.clone(),
            options: *options,
        });
        Ok(())
    }

    fn setup_scene_textures(
        &mut self,
        _gpu: &mut RecordingBackend,
        viewport: Viewport,
    ) -> Result<(), SceneError> {
        self.viewport = viewport;
        self.log.push(Event::SetupTextures {
            scene: self.name.clone(),
            width: viewport.width(),
            height: viewport.height(),
        });
        Ok(())
    }

    fn viewport(&self) -> Viewport {
        self.viewport
    }

    fn release(&mut self, _gpu: &mut RecordingBackend) {
        if !self.released {
            self.released = true;
            self.log.push(Event::SceneRelease(self.name.clone()));
        }
    }
}

pub fn viewport(width: u32, height: u32) -> Viewport {
    Viewport::new(width, height).unwrap()
}

/// Config with one scene per model, using the bundled asset root.
pub fn config_with(models: &[&str]) -> EngineConfig {
    EngineConfig::default().with_scenes(
        models
            .iter()
            .map(|m| SceneDescriptor::new(m.trim_end_matches(".obj"), m))
            .collect(),
    )
}

pub fn engine(models: &[&str]) -> (TestEngine, Log) {
    let log = Log::default();
    let engine = Engine::new(RecordingBackend::new(log.clone()), config_with(models));
    (engine, log)
}

pub fn program_slot_buffers(log: &Log) -> Vec<u32> {
    log.events()
        .iter()
        .filter_map(|e| match e {
            Event::CreateBuffer { id, slot, .. } if *slot == PROGRAM_SLOT => Some(*id),
            _ => None,
        })
        .collect()
}
