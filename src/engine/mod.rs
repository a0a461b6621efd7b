//! # Engine
//!
//! Top-level orchestrator. Owns the timer, the camera, the scene list, the
//! compiled programs and the frame parameter buffer, and sequences them
//! through [`Engine::init`], [`Engine::step`], [`Engine::resize`] and
//! [`Engine::clean`].
//!
//! ```text
//! init:  render state -> param buffer -> programs -> timer -> camera
//!        -> asset folder -> scenes -> per-scene prepass
//! step:  update (params, camera) -> render (clear, shadow, data, draw)
//! ```

pub mod params;

use crate::assets::{AssetRoot, MODEL_FOLDER};
use crate::config::{EngineConfig, ShadingPath};
use crate::error::{FrameError, GpuError, InitError, ResizeError};
use crate::gfx::backend::{
    BufferHandle, FrameStatus, RenderBackend, RenderState, Viewport, PROGRAM_SLOT,
};
use crate::gfx::camera::{Camera, CameraController};
use crate::gfx::rendering::pass_tracker::{FRAME, PREPASS};
use crate::gfx::rendering::{PassTracker, Stage};
use crate::gfx::scene::{DrawOptions, SceneSettings, SceneStages};
use crate::gfx::shaders::ShaderSet;
use crate::time::Timer;

pub use params::FrameParams;

/// Where the engine is inside a frame.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FramePhase {
    Idle,
    Updating,
    Rendering,
}

/// Render orchestrator for one output surface.
///
/// `B` is the graphics capability, `S` the scene type it drives. The backend
/// is passed by `&mut` to the camera and to every scene stage; nothing is
/// global, so several engines can coexist.
pub struct Engine<B: RenderBackend, S: SceneStages<B>> {
    gpu: B,
    config: EngineConfig,
    timer: Timer,
    camera: Option<Camera>,
    scenes: Vec<S>,
    current_scene: usize,
    shaders: Option<ShaderSet>,
    params: FrameParams,
    program_buffer: Option<BufferHandle>,
    viewport: Option<Viewport>,
    phase: FramePhase,
    passes: PassTracker,
}

impl<B: RenderBackend, S: SceneStages<B>> Engine<B, S> {
    pub fn new(gpu: B, config: EngineConfig) -> Self {
        Self {
            gpu,
            config,
            timer: Timer::new(),
            camera: None,
            scenes: Vec::new(),
            current_scene: 0,
            shaders: None,
            params: FrameParams::default(),
            program_buffer: None,
            viewport: None,
            phase: FramePhase::Idle,
            passes: PassTracker::frame(),
        }
    }

    /// Builds every GPU-global object, loads the configured scenes and runs
    /// their prepass.
    ///
    /// On failure everything acquired so far has been released. Calling this
    /// on a live engine tears the old state down first.
    pub fn init(&mut self) -> Result<(), InitError> {
        if self.is_initialized() {
            log::info!("re-initializing engine");
            self.clean();
        }

        let result = self.try_init();
        if let Err(err) = &result {
            log::error!("init failed: {}", err);
            self.clean();
        }
        result
    }

    fn try_init(&mut self) -> Result<(), InitError> {
        let count = self.config.scenes.len();
        if count == 0 {
            return Err(InitError::NoScenes);
        }
        if self.config.scene_select >= count {
            return Err(InitError::SceneSelect {
                index: self.config.scene_select,
                count,
            });
        }

        let state = RenderState::standard(self.config.clear_color);
        self.gpu.apply_render_state(&state);
        log::info!("{}", self.gpu.describe());

        let buffer = self
            .gpu
            .create_uniform_buffer(PROGRAM_SLOT, FrameParams::size())
            .map_err(InitError::ParamBuffer)?;
        self.program_buffer = Some(buffer);

        let shaders = ShaderSet::compile(&mut self.gpu)?;
        self.shaders = Some(shaders.clone());
        log::info!("programs compiled");

        self.timer.start();

        let viewport = *self.viewport.get_or_insert_with(|| self.gpu.viewport());
        self.params = FrameParams::new(
            viewport,
            self.config.use_ortho,
            self.config.draw_voxel_overlay,
        );

        let mut camera = Camera::new(self.config.camera_start, viewport, self.config.camera_far);
        camera.set_use_ortho(self.config.use_ortho);
        if let Err(err) = camera.init(&mut self.gpu) {
            camera.release(&mut self.gpu);
            return Err(InitError::Camera(err));
        }
        self.camera = Some(camera);
        self.upload_params().map_err(InitError::ParamBuffer)?;

        let assets = &self.config.asset_root;
        let models = assets
            .folder(MODEL_FOLDER)
            .ok_or_else(|| InitError::AssetFolder {
                folder: MODEL_FOLDER.to_owned(),
                root: assets.root().display().to_string(),
            })?;
        log::info!("loading models from {}", models.display());

        let settings = SceneSettings {
            viewport,
            voxel_resolution: self.config.voxel_resolution,
            shadow_map_size: self.config.shadow_map_size,
        };
        for descriptor in &self.config.scenes {
            let path = assets.model_path(&descriptor.model);
            let scene = S::load(&mut self.gpu, &path, &shaders, &settings).map_err(|source| {
                InitError::Scene {
                    name: descriptor.name.clone(),
                    source,
                }
            })?;
            log::info!("loaded scene {} from {}", descriptor.name, path.display());
            self.scenes.push(scene);
        }

        let options = draw_options(&self.config);
        for (scene, descriptor) in self.scenes.iter_mut().zip(&self.config.scenes) {
            prepass(scene, &mut self.gpu, &options).map_err(|(stage, source)| {
                InitError::PrePass {
                    name: descriptor.name.clone(),
                    stage,
                    source,
                }
            })?;
            log::info!("scene {} voxelized", descriptor.name);
        }

        self.current_scene = self.config.scene_select;
        log::info!(
            "engine initialized with {} scene(s), current {}",
            count,
            self.config.scenes[self.current_scene].name
        );
        Ok(())
    }

    /// Runs one frame: [`update`](Self::update) then [`render`](Self::render).
    pub fn step(&mut self) -> Result<(), FrameError> {
        self.update()?;
        self.render()
    }

    /// Advances the frame parameters, uploads them and updates the camera.
    pub fn update(&mut self) -> Result<(), FrameError> {
        self.ensure_initialized()?;
        self.run_phase(FramePhase::Updating, |engine| {
            let dt = engine.timer.lap();
            engine.params.advance(engine.timer.time(), dt);
            engine.upload_params()?;

            let camera = engine.camera.as_mut().ok_or(FrameError::NotInitialized)?;
            camera.update_camera(&mut engine.gpu, dt)?;
            Ok(())
        })
    }

    /// Clears the frame and runs shadow, data and draw for the current scene.
    ///
    /// A skipped frame (surface reconfigured) returns `Ok` without drawing.
    pub fn render(&mut self) -> Result<(), FrameError> {
        self.ensure_initialized()?;
        if self.scenes.is_empty() {
            return Err(FrameError::NoScene);
        }
        self.run_phase(FramePhase::Rendering, |engine| {
            if engine.gpu.begin_frame()? == FrameStatus::Skipped {
                log::debug!("frame {} skipped", engine.params.frame_index);
                return Ok(());
            }
            match engine.draw_frame() {
                Ok(()) => {
                    engine.gpu.present();
                    Ok(())
                }
                Err(err) => {
                    engine.gpu.discard_frame();
                    Err(err)
                }
            }
        })
    }

    fn draw_frame(&mut self) -> Result<(), FrameError> {
        self.gpu.clear(self.config.clear_color)?;

        let options = draw_options(&self.config);
        let scene = self
            .scenes
            .get_mut(self.current_scene)
            .ok_or(FrameError::NoScene)?;
        self.passes.reset();
        for stage in FRAME {
            run_stage(scene, &mut self.gpu, &mut self.passes, *stage, &options)?;
        }
        Ok(())
    }

    /// Writes the frame parameters into the program buffer in place.
    pub fn upload_params(&mut self) -> Result<(), GpuError> {
        let buffer = self
            .program_buffer
            .ok_or(GpuError::MissingGlobals(PROGRAM_SLOT))?;
        self.gpu
            .write_uniform(buffer, 0, bytemuck::bytes_of(&self.params))
    }

    /// Stores the viewport and re-derives the camera frustum and the current
    /// scene's render targets. Before `init` only the viewport is stored.
    pub fn resize(&mut self, width: u32, height: u32) -> Result<(), ResizeError> {
        let viewport = Viewport::new(width, height)?;
        self.viewport = Some(viewport);
        self.params.set_viewport(viewport);
        self.gpu.set_viewport(viewport);

        let Some(camera) = self.camera.as_mut() else {
            log::debug!("viewport {}x{} stored before init", width, height);
            return Ok(());
        };
        camera.set_frustum(viewport);
        if let Some(scene) = self.scenes.get_mut(self.current_scene) {
            scene.setup_scene_textures(&mut self.gpu, viewport)?;
        }
        log::debug!("resized to {}x{}", width, height);
        Ok(())
    }

    /// Releases scenes, camera, programs and the program buffer.
    ///
    /// Idempotent: handles are taken as they are released.
    pub fn clean(&mut self) {
        let released = self.program_buffer.is_some() || self.camera.is_some();

        for mut scene in self.scenes.drain(..) {
            scene.release(&mut self.gpu);
        }
        if let Some(mut camera) = self.camera.take() {
            camera.release(&mut self.gpu);
        }
        if let Some(shaders) = self.shaders.take() {
            shaders.release(&mut self.gpu);
        }
        if let Some(buffer) = self.program_buffer.take() {
            self.gpu.release_buffer(buffer);
        }
        self.current_scene = 0;
        self.phase = FramePhase::Idle;
        self.passes.reset();

        if released {
            log::info!("engine resources released");
        }
    }

    /// Makes scene `index` current, rebuilding its targets if they were sized
    /// for another viewport. Before `init` the choice is only recorded.
    pub fn select_scene(&mut self, index: usize) -> Result<(), FrameError> {
        if !self.is_initialized() {
            self.config.scene_select = index;
            return Ok(());
        }

        let count = self.scenes.len();
        let scene = self
            .scenes
            .get_mut(index)
            .ok_or(FrameError::SceneSelect { index, count })?;
        if let Some(viewport) = self.viewport {
            if scene.viewport() != viewport {
                scene.setup_scene_textures(&mut self.gpu, viewport)?;
            }
        }
        self.current_scene = index;
        self.config.scene_select = index;
        log::info!("scene {} selected", index);
        Ok(())
    }

    pub fn set_asset_root(&mut self, root: AssetRoot) {
        log::debug!("asset root set to {}", root.root().display());
        self.config.asset_root = root;
    }

    pub fn set_use_ortho(&mut self, use_ortho: bool) {
        self.config.use_ortho = use_ortho;
        self.params.set_use_ortho(use_ortho);
        if let Some(camera) = self.camera.as_mut() {
            camera.set_use_ortho(use_ortho);
        }
    }

    pub fn set_draw_voxel_overlay(&mut self, enabled: bool) {
        self.config.draw_voxel_overlay = enabled;
        self.params.set_draw_voxel_overlay(enabled);
    }

    pub fn set_shading(&mut self, shading: ShadingPath) {
        self.config.shading = shading;
    }

    pub fn is_initialized(&self) -> bool {
        self.camera.is_some()
    }

    pub fn backend(&self) -> &B {
        &self.gpu
    }

    pub fn backend_mut(&mut self) -> &mut B {
        &mut self.gpu
    }

    pub fn config(&self) -> &EngineConfig {
        &self.config
    }

    pub fn camera(&self) -> Option<&Camera> {
        self.camera.as_ref()
    }

    /// Input sink for the host's keyboard and mouse events.
    pub fn camera_controller_mut(&mut self) -> Option<&mut CameraController> {
        self.camera.as_mut().map(Camera::controller_mut)
    }

    pub fn scenes(&self) -> &[S] {
        &self.scenes
    }

    pub fn current_scene(&self) -> Option<&S> {
        self.scenes.get(self.current_scene)
    }

    pub fn current_scene_index(&self) -> usize {
        self.current_scene
    }

    pub fn params(&self) -> &FrameParams {
        &self.params
    }

    pub fn program_buffer(&self) -> Option<BufferHandle> {
        self.program_buffer
    }

    pub fn viewport(&self) -> Option<Viewport> {
        self.viewport
    }

    pub fn phase(&self) -> FramePhase {
        self.phase
    }

    fn ensure_initialized(&self) -> Result<(), FrameError> {
        if self.is_initialized() {
            Ok(())
        } else {
            Err(FrameError::NotInitialized)
        }
    }

    /// Runs `f` in `phase`, returning to idle whatever the outcome.
    fn run_phase(
        &mut self,
        phase: FramePhase,
        f: impl FnOnce(&mut Self) -> Result<(), FrameError>,
    ) -> Result<(), FrameError> {
        if self.phase != FramePhase::Idle {
            return Err(FrameError::Reentrant);
        }
        self.phase = phase;
        let result = f(self);
        self.phase = FramePhase::Idle;
        result
    }
}

impl<B: RenderBackend, S: SceneStages<B>> Drop for Engine<B, S> {
    fn drop(&mut self) {
        self.clean();
    }
}

fn draw_options(config: &EngineConfig) -> DrawOptions {
    DrawOptions {
        shading: config.shading,
        draw_voxel_overlay: config.draw_voxel_overlay,
    }
}

/// Records `stage` with the tracker, then runs it on the scene.
fn run_stage<B: RenderBackend, S: SceneStages<B>>(
    scene: &mut S,
    gpu: &mut B,
    passes: &mut PassTracker,
    stage: Stage,
    options: &DrawOptions,
) -> Result<(), FrameError> {
    passes.advance(stage)?;
    log::trace!("{} pass", stage);
    match stage {
        Stage::Shadow => scene.create_shadow(gpu),
        Stage::Data => scene.render_data(gpu),
        Stage::Voxelize => scene.voxelize(gpu),
        Stage::MipMap => scene.mipmap(gpu),
        Stage::Draw => scene.draw(gpu, options),
    }?;
    Ok(())
}

/// One-time shadow, data, voxelize, mipmap sequence for a freshly loaded
/// scene. Reports the stage that failed.
fn prepass<B: RenderBackend, S: SceneStages<B>>(
    scene: &mut S,
    gpu: &mut B,
    options: &DrawOptions,
) -> Result<(), (Stage, FrameError)> {
    let mut passes = PassTracker::prepass();
    for stage in PREPASS {
        run_stage(scene, gpu, &mut passes, *stage, options).map_err(|err| (*stage, err))?;
    }
    Ok(())
}
