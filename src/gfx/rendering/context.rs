//! Shared GPU state
//!
//! [`GpuContext`] is created once per device and handed to every component
//! as an `Arc`. It owns the bind group layouts several pipelines agree on and
//! the full-screen quad all screen-space passes draw.

use std::sync::Arc;

use log::{debug, info};

use crate::config::RendererConfig;
use crate::errors::{RenderError, Result};
use crate::gfx::geometry::generate_fullscreen_quad;
use crate::gfx::resources::mesh::Drawable;
use crate::wgpu_utils::{binding_types, BindGroupBuilder, BindGroupLayoutBuilder, BindGroupLayoutWithDesc};

/// Bind group layouts shared between pipelines
pub struct SharedLayouts {
    /// `ViewUniform` of the camera or a light
    pub view: BindGroupLayoutWithDesc,
    /// `ObjectUniform` of one scene object
    pub object: BindGroupLayoutWithDesc,
    /// G-buffer albedo, normal and depth (read as unfilterable float) plus a linear sampler
    pub gbuffer: BindGroupLayoutWithDesc,
    /// One sampled colour texture plus a linear sampler
    pub texture: BindGroupLayoutWithDesc,
}

impl SharedLayouts {
    fn new(device: &wgpu::Device) -> Self {
        Self {
            view: BindGroupLayoutBuilder::new()
                .next_binding_rendering(binding_types::uniform())
                .create(device, "View Bind Group Layout"),
            object: BindGroupLayoutBuilder::new()
                .next_binding_rendering(binding_types::uniform())
                .create(device, "Object Bind Group Layout"),
            gbuffer: BindGroupLayoutBuilder::new()
                .next_binding_fragment(binding_types::texture_2d())
                .next_binding_fragment(binding_types::texture_2d())
                .next_binding_fragment(binding_types::unfilterable_texture_2d())
                .next_binding_fragment(binding_types::filtering_sampler())
                .create(device, "GBuffer Bind Group Layout"),
            texture: BindGroupLayoutBuilder::new()
                .next_binding_fragment(binding_types::texture_2d())
                .next_binding_fragment(binding_types::filtering_sampler())
                .create(device, "Texture Bind Group Layout"),
        }
    }
}

pub struct GpuContext {
    pub device: wgpu::Device,
    pub queue: wgpu::Queue,
    /// Format of the views `Scene::render` presents into
    pub output_format: wgpu::TextureFormat,
    pub config: RendererConfig,
    pub layouts: SharedLayouts,
    /// Clamped bilinear sampler for screen-space lookups
    pub linear_sampler: wgpu::Sampler,
    /// Clip-space quad with position and texcoord streams
    pub fullscreen_quad: Drawable,
}

impl GpuContext {
    pub fn new(
        device: wgpu::Device,
        queue: wgpu::Queue,
        output_format: wgpu::TextureFormat,
        config: RendererConfig,
    ) -> Result<Arc<Self>> {
        let layouts = SharedLayouts::new(&device);

        let linear_sampler = device.create_sampler(&wgpu::SamplerDescriptor {
            label: Some("Linear Clamp Sampler"),
            address_mode_u: wgpu::AddressMode::ClampToEdge,
            address_mode_v: wgpu::AddressMode::ClampToEdge,
            address_mode_w: wgpu::AddressMode::ClampToEdge,
            mag_filter: wgpu::FilterMode::Linear,
            min_filter: wgpu::FilterMode::Linear,
            mipmap_filter: wgpu::FilterMode::Nearest,
            ..Default::default()
        });

        let fullscreen_quad = Drawable::new(&device, &generate_fullscreen_quad(), "Fullscreen Quad")?;

        debug!("GPU context ready, output format {:?}", output_format);

        Ok(Arc::new(Self {
            device,
            queue,
            output_format,
            config,
            layouts,
            linear_sampler,
            fullscreen_quad,
        }))
    }

    /// Creates a context without a surface
    ///
    /// Used for offscreen rendering and tests.
    pub fn new_headless(output_format: wgpu::TextureFormat, config: RendererConfig) -> Result<Arc<Self>> {
        let instance = wgpu::Instance::new(&wgpu::InstanceDescriptor {
            backends: wgpu::Backends::all(),
            ..Default::default()
        });

        let adapter = pollster::block_on(instance.request_adapter(&wgpu::RequestAdapterOptions {
            power_preference: wgpu::PowerPreference::default(),
            compatible_surface: None,
            force_fallback_adapter: false,
        }))?;

        let (device, queue) = request_device(&adapter)?;
        Self::new(device, queue, output_format, config)
    }

    /// Runs `f` inside a validation error scope
    ///
    /// Returns the value together with the validation message, if any error
    /// was raised while `f` ran.
    pub fn capture_validation<T>(&self, f: impl FnOnce(&wgpu::Device) -> T) -> (T, Option<String>) {
        self.device.push_error_scope(wgpu::ErrorFilter::Validation);
        let value = f(&self.device);
        let error = pollster::block_on(self.device.pop_error_scope());
        (value, error.map(|e| e.to_string()))
    }

    /// Like [`GpuContext::capture_validation`], mapping a failure to
    /// [`RenderError::IncompleteTarget`]
    pub fn create_target<T>(&self, label: &str, f: impl FnOnce(&wgpu::Device) -> T) -> Result<T> {
        match self.capture_validation(f) {
            (value, None) => Ok(value),
            (_, Some(log)) => Err(RenderError::IncompleteTarget {
                label: label.to_owned(),
                log,
            }),
        }
    }

    /// Bind group sampling `view` through the shared linear sampler
    pub fn texture_bind_group(&self, view: &wgpu::TextureView, label: &str) -> wgpu::BindGroup {
        BindGroupBuilder::new(&self.layouts.texture)
            .texture(view)
            .sampler(&self.linear_sampler)
            .create(&self.device, label)
    }
}

/// Requests a device with the features and limits the renderer needs
pub fn request_device(adapter: &wgpu::Adapter) -> Result<(wgpu::Device, wgpu::Queue)> {
    let info = adapter.get_info();
    info!("Using adapter '{}' ({:?})", info.name, info.backend);

    let device = pollster::block_on(adapter.request_device(&wgpu::DeviceDescriptor {
        label: Some("Penumbra Device"),
        required_features: wgpu::Features::empty(),
        required_limits: wgpu::Limits {
            max_texture_dimension_2d: adapter.limits().max_texture_dimension_2d,
            ..wgpu::Limits::downlevel_defaults()
        },
        memory_hints: wgpu::MemoryHints::default(),
        trace: wgpu::Trace::Off,
    }))?;

    Ok(device)
}
