//! Global uniform bindings
//!
//! Group 0 of every pipeline. It holds the frame parameter buffer at
//! `PROGRAM_SLOT` and the camera buffer at `CAMERA_SLOT`, so stages read
//! globals without per-draw rebinding.

use crate::{
    gfx::backend::{CAMERA_SLOT, GLOBAL_SLOTS, PROGRAM_SLOT},
    wgpu_utils::{binding_types, layout_entry, ALL_STAGES},
};

/// Bind group layout and, once every slot has a buffer, the bind group.
pub struct GlobalBindings {
    bind_group_layout: wgpu::BindGroupLayout,
    bind_group: Option<wgpu::BindGroup>,
}

impl GlobalBindings {
    /// Creates the layout. The bind group is created later by
    /// [`create_bind_group`](Self::create_bind_group).
    pub fn new(device: &wgpu::Device) -> Self {
        let entries: Vec<_> = (0..GLOBAL_SLOTS)
            .map(|slot| layout_entry(slot, ALL_STAGES, binding_types::uniform()))
            .collect();
        let bind_group_layout = device.create_bind_group_layout(&wgpu::BindGroupLayoutDescriptor {
            label: Some("Globals Bind Group Layout"),
            entries: &entries,
        });

        GlobalBindings {
            bind_group_layout,
            bind_group: None,
        }
    }

    pub fn create_bind_group(
        &mut self,
        device: &wgpu::Device,
        program_buffer: &wgpu::Buffer,
        camera_buffer: &wgpu::Buffer,
    ) {
        self.bind_group = Some(device.create_bind_group(&wgpu::BindGroupDescriptor {
            label: Some("Global Bind Group"),
            layout: &self.bind_group_layout,
            entries: &[
                wgpu::BindGroupEntry {
                    binding: PROGRAM_SLOT,
                    resource: program_buffer.as_entire_binding(),
                },
                wgpu::BindGroupEntry {
                    binding: CAMERA_SLOT,
                    resource: camera_buffer.as_entire_binding(),
                },
            ],
        }));
    }

    /// Drops the bind group after one of its buffers was released.
    pub fn invalidate(&mut self) {
        self.bind_group = None;
    }

    pub fn bind_group_layout(&self) -> &wgpu::BindGroupLayout {
        &self.bind_group_layout
    }

    /// `None` until both global buffers exist.
    pub fn bind_group(&self) -> Option<&wgpu::BindGroup> {
        self.bind_group.as_ref()
    }
}
