//! Typed uniform buffers
//!
//! Each shader reads its constants from one `#[repr(C)]` Pod struct. A
//! [`UniformBuffer`] holds exactly one such value and only touches the queue
//! when the value differs from the last one uploaded, so per-frame callers
//! (objects, views, lights) can push their constants unconditionally.

use wgpu::util::DeviceExt;

use super::binding_builder::{BindGroupBuilder, BindGroupLayoutWithDesc};

/// Last value handed to the GPU, compared bytewise
#[derive(Debug)]
pub struct ContentTracker<Content> {
    last: Option<Content>,
    uploads: u64,
}

impl<Content: bytemuck::Pod> ContentTracker<Content> {
    /// Tracker for a buffer that starts zeroed
    pub fn new() -> Self {
        Self {
            last: None,
            uploads: 0,
        }
    }

    /// Tracker for a buffer created with `content` already in place
    pub fn with_initial(content: Content) -> Self {
        Self {
            last: Some(content),
            uploads: 1,
        }
    }

    /// Records `content` and reports whether it has to be uploaded
    pub fn needs_upload(&mut self, content: &Content) -> bool {
        let unchanged = self
            .last
            .as_ref()
            .is_some_and(|last| bytemuck::bytes_of(last) == bytemuck::bytes_of(content));
        if unchanged {
            return false;
        }
        self.last = Some(*content);
        self.uploads += 1;
        true
    }

    pub fn last(&self) -> Option<&Content> {
        self.last.as_ref()
    }

    /// Number of uploads, including the initial contents
    pub fn uploads(&self) -> u64 {
        self.uploads
    }
}

impl<Content: bytemuck::Pod> Default for ContentTracker<Content> {
    fn default() -> Self {
        Self::new()
    }
}

/// `foo::bar::SpotUniform` -> `SpotUniform`
fn short_type_name<T>() -> &'static str {
    let name = std::any::type_name::<T>();
    name.rsplit("::").next().unwrap_or(name)
}

pub struct UniformBuffer<Content> {
    buffer: wgpu::Buffer,
    tracker: ContentTracker<Content>,
}

impl<Content: bytemuck::Pod> UniformBuffer<Content> {
    fn label() -> String {
        format!("Uniform {}", short_type_name::<Content>())
    }

    /// Zero-filled buffer, written on the first [`UniformBuffer::update_content`]
    pub fn new(device: &wgpu::Device) -> Self {
        let buffer = device.create_buffer(&wgpu::BufferDescriptor {
            label: Some(&Self::label()),
            size: std::mem::size_of::<Content>() as u64,
            usage: wgpu::BufferUsages::UNIFORM | wgpu::BufferUsages::COPY_DST,
            mapped_at_creation: false,
        });

        Self {
            buffer,
            tracker: ContentTracker::new(),
        }
    }

    pub fn new_with_data(device: &wgpu::Device, content: &Content) -> Self {
        let buffer = device.create_buffer_init(&wgpu::util::BufferInitDescriptor {
            label: Some(&Self::label()),
            contents: bytemuck::bytes_of(content),
            usage: wgpu::BufferUsages::UNIFORM | wgpu::BufferUsages::COPY_DST,
        });

        Self {
            buffer,
            tracker: ContentTracker::with_initial(*content),
        }
    }

    /// Queues a write of `content` unless it matches the last upload
    ///
    /// Returns whether a write was queued.
    pub fn update_content(&mut self, queue: &wgpu::Queue, content: Content) -> bool {
        if !self.tracker.needs_upload(&content) {
            return false;
        }
        queue.write_buffer(&self.buffer, 0, bytemuck::bytes_of(&content));
        true
    }

    /// Value the buffer holds once queued writes land
    pub fn content(&self) -> Option<&Content> {
        self.tracker.last()
    }

    pub fn uploads(&self) -> u64 {
        self.tracker.uploads()
    }

    pub fn binding_resource(&self) -> wgpu::BindingResource<'_> {
        self.buffer.as_entire_binding()
    }

    /// Bind group exposing this buffer through a single-binding `layout`
    pub fn bind_group(
        &self,
        device: &wgpu::Device,
        layout: &BindGroupLayoutWithDesc,
        label: &str,
    ) -> wgpu::BindGroup {
        BindGroupBuilder::new(layout)
            .resource(self.binding_resource())
            .create(device, label)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[repr(C)]
    #[derive(Copy, Clone, bytemuck::Pod, bytemuck::Zeroable, Debug)]
    struct Params {
        values: [f32; 4],
    }

    #[test]
    fn test_repeated_content_is_uploaded_once() {
        let mut tracker = ContentTracker::new();
        let params = Params { values: [1.0, 2.0, 3.0, 4.0] };

        assert!(tracker.needs_upload(&params));
        assert!(!tracker.needs_upload(&params));
        assert!(!tracker.needs_upload(&params));
        assert_eq!(tracker.uploads(), 1);
        assert_eq!(tracker.last().map(|p| p.values), Some(params.values));
    }

    #[test]
    fn test_changed_content_is_uploaded() {
        let mut tracker = ContentTracker::with_initial(Params { values: [0.0; 4] });
        assert!(!tracker.needs_upload(&Params { values: [0.0; 4] }));
        assert!(tracker.needs_upload(&Params { values: [0.0, 0.0, 0.0, 1.0] }));
        assert!(tracker.needs_upload(&Params { values: [0.0; 4] }));
        assert_eq!(tracker.uploads(), 3);
    }

    #[test]
    fn test_negative_zero_counts_as_a_change() {
        // Bytewise comparison, so -0.0 and 0.0 differ
        let mut tracker = ContentTracker::with_initial(Params { values: [0.0; 4] });
        assert!(tracker.needs_upload(&Params { values: [-0.0, 0.0, 0.0, 0.0] }));
    }

    #[test]
    fn test_short_type_name() {
        assert_eq!(short_type_name::<Params>(), "Params");
        assert_eq!(short_type_name::<f32>(), "f32");
    }
}
