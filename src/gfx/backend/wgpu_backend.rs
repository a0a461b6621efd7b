//! wgpu implementation of [`RenderBackend`]
//!
//! Owns the surface, device and queue, the well-known uniform slots with
//! their global bind group, and every compiled shader module. Scenes reach
//! the device through the accessors here to build their own pipelines.

use std::collections::HashMap;

use anyhow::{bail, Context};

use super::{
    BufferHandle, FrameStatus, ProgramHandle, RenderBackend, RenderState, Viewport, CAMERA_SLOT,
    GLOBAL_SLOTS, PROGRAM_SLOT,
};
use crate::error::{GpuError, ShaderError};
use crate::gfx::resources::{GlobalBindings, TextureResource};
use crate::gfx::shaders::{ProgramKind, ProgramSource};

/// Capabilities the voxelization pass cannot run without.
const REQUIRED_DOWNLEVEL: wgpu::DownlevelFlags = wgpu::DownlevelFlags::VERTEX_STORAGE
    .union(wgpu::DownlevelFlags::FRAGMENT_WRITABLE_STORAGE);

struct UniformSlot {
    slot: u32,
    buffer: wgpu::Buffer,
}

/// A linked program: one shader module holding every stage's entry point.
pub struct CompiledProgram {
    pub label: String,
    pub kind: ProgramKind,
    pub module: wgpu::ShaderModule,
}

struct Frame {
    texture: wgpu::SurfaceTexture,
    view: wgpu::TextureView,
}

pub struct WgpuBackend {
    surface: wgpu::Surface<'static>,
    device: wgpu::Device,
    queue: wgpu::Queue,
    config: wgpu::SurfaceConfiguration,
    adapter_info: wgpu::AdapterInfo,
    viewport: Viewport,
    depth_texture: TextureResource,
    render_state: RenderState,
    global_bindings: GlobalBindings,
    buffers: HashMap<u32, UniformSlot>,
    slots: [Option<u32>; GLOBAL_SLOTS as usize],
    programs: HashMap<u32, CompiledProgram>,
    next_id: u32,
    frame: Option<Frame>,
}

impl WgpuBackend {
    /// Acquires adapter and device and configures the surface.
    pub async fn new(
        window: impl Into<wgpu::SurfaceTarget<'static>>,
        width: u32,
        height: u32,
    ) -> anyhow::Result<Self> {
        let instance = wgpu::Instance::new(&wgpu::InstanceDescriptor {
            backends: wgpu::Backends::all(),
            ..Default::default()
        });
        let surface = instance
            .create_surface(window)
            .context("failed to create surface")?;

        let adapter = instance
            .request_adapter(&wgpu::RequestAdapterOptions {
                power_preference: wgpu::PowerPreference::HighPerformance,
                compatible_surface: Some(&surface),
                force_fallback_adapter: false,
            })
            .await
            .context("failed to request adapter")?;

        let downlevel = adapter.get_downlevel_capabilities();
        if !downlevel.flags.contains(REQUIRED_DOWNLEVEL) {
            bail!(
                "adapter '{}' lacks storage access in vertex/fragment stages",
                adapter.get_info().name
            );
        }

        let (device, queue) = adapter
            .request_device(&wgpu::DeviceDescriptor {
                label: Some("WGPU Device"),
                required_features: wgpu::Features::default(),
                required_limits: wgpu::Limits {
                    max_texture_dimension_2d: adapter.limits().max_texture_dimension_2d,
                    ..wgpu::Limits::downlevel_defaults()
                },
                memory_hints: wgpu::MemoryHints::default(),
                trace: wgpu::Trace::Off,
            })
            .await
            .context("failed to request device")?;

        let surface_capabilities = surface.get_capabilities(&adapter);
        let format = surface_capabilities
            .formats
            .iter()
            .copied()
            .find(|f| !f.is_srgb())
            .or_else(|| surface_capabilities.formats.first().copied())
            .context("surface reports no formats")?;
        let alpha_mode = surface_capabilities
            .alpha_modes
            .first()
            .copied()
            .unwrap_or(wgpu::CompositeAlphaMode::Auto);

        let config = wgpu::SurfaceConfiguration {
            usage: wgpu::TextureUsages::RENDER_ATTACHMENT,
            format,
            width: width.max(1),
            height: height.max(1),
            present_mode: wgpu::PresentMode::AutoVsync,
            alpha_mode,
            view_formats: vec![],
            desired_maximum_frame_latency: 2,
        };
        surface.configure(&device, &config);
        let viewport = Viewport::new(config.width, config.height)?;

        let depth_texture = TextureResource::create_depth_texture(
            &device,
            config.width,
            config.height,
            "depth_texture",
        );
        let global_bindings = GlobalBindings::new(&device);

        Ok(Self {
            surface,
            device,
            queue,
            config,
            adapter_info: adapter.get_info(),
            viewport,
            depth_texture,
            render_state: RenderState::default(),
            global_bindings,
            buffers: HashMap::new(),
            slots: [None; GLOBAL_SLOTS as usize],
            programs: HashMap::new(),
            next_id: 1,
            frame: None,
        })
    }

    fn next_id(&mut self) -> u32 {
        let id = self.next_id;
        self.next_id += 1;
        id
    }

    /// Builds the global bind group once every slot holds a buffer.
    fn rebuild_global_bindings(&mut self) {
        let lookup = |slot: u32| self.slots[slot as usize].and_then(|id| self.buffers.get(&id));
        match (lookup(PROGRAM_SLOT), lookup(CAMERA_SLOT)) {
            (Some(program), Some(camera)) => {
                self.global_bindings
                    .create_bind_group(&self.device, &program.buffer, &camera.buffer);
            }
            _ => self.global_bindings.invalidate(),
        }
    }

    pub fn device(&self) -> &wgpu::Device {
        &self.device
    }

    pub fn queue(&self) -> &wgpu::Queue {
        &self.queue
    }

    pub fn program(&self, handle: ProgramHandle) -> Result<&CompiledProgram, GpuError> {
        self.programs
            .get(&handle.id())
            .ok_or(GpuError::UnknownProgram(handle.id()))
    }

    pub fn global_layout(&self) -> &wgpu::BindGroupLayout {
        self.global_bindings.bind_group_layout()
    }

    pub fn global_bind_group(&self) -> Result<&wgpu::BindGroup, GpuError> {
        self.global_bindings.bind_group().ok_or_else(|| {
            let missing = self.slots.iter().position(Option::is_none).unwrap_or(0);
            GpuError::MissingGlobals(missing as u32)
        })
    }

    pub fn surface_format(&self) -> wgpu::TextureFormat {
        self.config.format
    }

    pub fn depth_view(&self) -> &wgpu::TextureView {
        &self.depth_texture.view
    }

    /// View of the frame acquired by `begin_frame`.
    pub fn frame_view(&self) -> Result<&wgpu::TextureView, GpuError> {
        self.frame.as_ref().map(|f| &f.view).ok_or(GpuError::NoFrame)
    }

    pub fn render_state(&self) -> &RenderState {
        &self.render_state
    }

    pub fn submit(&self, encoder: wgpu::CommandEncoder) {
        self.queue.submit(std::iter::once(encoder.finish()));
    }

    fn reconfigure(&mut self) {
        self.surface.configure(&self.device, &self.config);
        self.depth_texture = TextureResource::create_depth_texture(
            &self.device,
            self.config.width,
            self.config.height,
            "depth_texture",
        );
    }
}

impl RenderBackend for WgpuBackend {
    fn describe(&self) -> String {
        let info = &self.adapter_info;
        format!(
            "{} ({:?}, {:?}) driver: {} {}, surface: {:?} {}x{}",
            info.name,
            info.backend,
            info.device_type,
            info.driver,
            info.driver_info,
            self.config.format,
            self.config.width,
            self.config.height,
        )
    }

    fn apply_render_state(&mut self, state: &RenderState) {
        self.render_state = *state;
    }

    fn viewport(&self) -> Viewport {
        self.viewport
    }

    fn set_viewport(&mut self, viewport: Viewport) {
        self.viewport = viewport;
        self.config.width = viewport.width();
        self.config.height = viewport.height();
        self.reconfigure();
    }

    fn create_uniform_buffer(&mut self, slot: u32, size: u64) -> Result<BufferHandle, GpuError> {
        let index = slot as usize;
        match self.slots.get(index) {
            None => return Err(GpuError::InvalidSlot(slot)),
            Some(Some(_)) => return Err(GpuError::SlotOccupied(slot)),
            Some(None) => {}
        }

        let id = self.next_id();
        let buffer = self.device.create_buffer(&wgpu::BufferDescriptor {
            label: Some(&format!("Uniform Slot {}", slot)),
            size: size.next_multiple_of(16),
            usage: wgpu::BufferUsages::UNIFORM | wgpu::BufferUsages::COPY_DST,
            mapped_at_creation: false,
        });
        self.buffers.insert(id, UniformSlot { slot, buffer });
        self.slots[index] = Some(id);
        self.rebuild_global_bindings();

        log::debug!("uniform buffer {} bound at slot {} ({} bytes)", id, slot, size);
        Ok(BufferHandle::new(id))
    }

    fn write_uniform(
        &mut self,
        buffer: BufferHandle,
        offset: u64,
        bytes: &[u8],
    ) -> Result<(), GpuError> {
        let uniform = self
            .buffers
            .get(&buffer.id())
            .ok_or(GpuError::UnknownBuffer(buffer.id()))?;
        let size = uniform.buffer.size();
        if offset + bytes.len() as u64 > size {
            return Err(GpuError::WriteOutOfRange {
                buffer: buffer.id(),
                offset,
                len: bytes.len(),
                size,
            });
        }
        self.queue.write_buffer(&uniform.buffer, offset, bytes);
        Ok(())
    }

    fn release_buffer(&mut self, buffer: BufferHandle) {
        let Some(uniform) = self.buffers.remove(&buffer.id()) else {
            log::warn!("release of unknown buffer {}", buffer.id());
            return;
        };
        uniform.buffer.destroy();
        if let Some(slot) = self.slots.get_mut(uniform.slot as usize) {
            *slot = None;
        }
        self.rebuild_global_bindings();
    }

    fn compile_program(&mut self, source: &ProgramSource) -> Result<ProgramHandle, ShaderError> {
        let linked = source.linked_source();

        self.device.push_error_scope(wgpu::ErrorFilter::Validation);
        let module = self
            .device
            .create_shader_module(wgpu::ShaderModuleDescriptor {
                label: Some(source.label),
                source: wgpu::ShaderSource::Wgsl(linked.into()),
            });
        if let Some(err) = pollster::block_on(self.device.pop_error_scope()) {
            return Err(ShaderError {
                label: source.label.to_owned(),
                message: err.to_string(),
            });
        }

        let id = self.next_id();
        self.programs.insert(
            id,
            CompiledProgram {
                label: source.label.to_owned(),
                kind: source.kind,
                module,
            },
        );
        Ok(ProgramHandle::new(id))
    }

    fn release_program(&mut self, program: ProgramHandle) {
        if self.programs.remove(&program.id()).is_none() {
            log::warn!("release of unknown program {}", program.id());
        }
    }

    fn begin_frame(&mut self) -> Result<FrameStatus, GpuError> {
        // Surfaces hand out one texture at a time.
        self.discard_frame();
        match self.surface.get_current_texture() {
            Ok(texture) => {
                let view = texture
                    .texture
                    .create_view(&wgpu::TextureViewDescriptor::default());
                self.frame = Some(Frame { texture, view });
                Ok(FrameStatus::Ready)
            }
            Err(wgpu::SurfaceError::Lost | wgpu::SurfaceError::Outdated) => {
                log::warn!("surface lost or outdated, reconfiguring");
                self.reconfigure();
                Ok(FrameStatus::Skipped)
            }
            Err(wgpu::SurfaceError::OutOfMemory) => Err(GpuError::OutOfMemory),
            Err(err) => {
                log::warn!("skipping frame: {}", err);
                Ok(FrameStatus::Skipped)
            }
        }
    }

    fn clear(&mut self, color: [f32; 4]) -> Result<(), GpuError> {
        let view = self.frame_view()?;
        let mut encoder = self
            .device
            .create_command_encoder(&wgpu::CommandEncoderDescriptor {
                label: Some("Clear Encoder"),
            });
        {
            let _pass = encoder.begin_render_pass(&wgpu::RenderPassDescriptor {
                label: Some("Clear Pass"),
                color_attachments: &[Some(wgpu::RenderPassColorAttachment {
                    view,
                    resolve_target: None,
                    ops: wgpu::Operations {
                        load: wgpu::LoadOp::Clear(wgpu::Color {
                            r: color[0] as f64,
                            g: color[1] as f64,
                            b: color[2] as f64,
                            a: color[3] as f64,
                        }),
                        store: wgpu::StoreOp::Store,
                    },
                })],
                depth_stencil_attachment: Some(wgpu::RenderPassDepthStencilAttachment {
                    view: &self.depth_texture.view,
                    depth_ops: Some(wgpu::Operations {
                        load: wgpu::LoadOp::Clear(1.0),
                        store: wgpu::StoreOp::Store,
                    }),
                    stencil_ops: None,
                }),
                occlusion_query_set: None,
                timestamp_writes: None,
            });
        }
        self.submit(encoder);
        Ok(())
    }

    fn present(&mut self) {
        if let Some(frame) = self.frame.take() {
            frame.texture.present();
        }
    }

    fn discard_frame(&mut self) {
        if self.frame.take().is_some() {
            log::debug!("discarding unpresented frame");
        }
    }
}
