use std::marker::PhantomData;

/// Typed uniform buffer that skips redundant uploads
///
/// The last uploaded content is kept in a value of the same type, so updates
/// never allocate.
pub struct UniformBuffer<Content> {
    buffer: wgpu::Buffer,
    content_type: PhantomData<Content>,
    previous_content: Option<Content>,
}

impl<Content: bytemuck::Pod + PartialEq> UniformBuffer<Content> {
    fn name() -> &'static str {
        let type_name = std::any::type_name::<Content>();
        match type_name.rfind(':') {
            Some(pos) => &type_name[(pos + 1)..],
            None => type_name,
        }
    }

    pub fn new(device: &wgpu::Device) -> Self {
        let buffer = device.create_buffer(&wgpu::BufferDescriptor {
            label: Some(&format!("UniformBuffer: {}", Self::name())),
            size: std::mem::size_of::<Content>() as u64,
            usage: wgpu::BufferUsages::UNIFORM | wgpu::BufferUsages::COPY_DST,
            mapped_at_creation: false,
        });

        UniformBuffer {
            buffer,
            content_type: PhantomData,
            previous_content: None,
        }
    }

    /// Writes `content` unless it equals what was last written.
    /// Returns whether a write was queued.
    pub fn update_content(&mut self, queue: &wgpu::Queue, content: Content) -> bool {
        if self.previous_content.as_ref() == Some(&content) {
            return false;
        }
        queue.write_buffer(&self.buffer, 0, bytemuck::bytes_of(&content));
        self.previous_content = Some(content);
        true
    }

    pub fn binding_resource(&self) -> wgpu::BindingResource<'_> {
        self.buffer.as_entire_binding()
    }

    pub fn buffer(&self) -> &wgpu::Buffer {
        &self.buffer
    }
}
