//! Depth-only render target for shadow casting lights

use log::debug;

use crate::errors::Result;
use crate::gfx::resources::texture_resource::TextureResource;
use crate::wgpu_utils::{binding_types, BindGroupBuilder, BindGroupLayoutBuilder, BindGroupLayoutWithDesc};

use super::context::GpuContext;

/// Square `Depth32Float` map with a `LessEqual` comparison sampler
pub struct ShadowMap {
    depth: TextureResource,
    bind_group: wgpu::BindGroup,
    size: u32,
}

impl ShadowMap {
    pub const FORMAT: wgpu::TextureFormat = TextureResource::DEPTH_FORMAT;

    /// Layout of [`ShadowMap::bind_group`]: depth texture, comparison sampler
    pub fn bind_group_layout(device: &wgpu::Device) -> BindGroupLayoutWithDesc {
        BindGroupLayoutBuilder::new()
            .next_binding_fragment(binding_types::depth_texture_2d())
            .next_binding_fragment(binding_types::comparison_sampler())
            .create(device, "Shadow Map Bind Group Layout")
    }

    pub fn new(ctx: &GpuContext, layout: &BindGroupLayoutWithDesc, size: u32) -> Result<Self> {
        let depth = ctx.create_target("Shadow Map", |device| {
            TextureResource::create_shadow_map(device, size, "Shadow Map")
        })?;

        let bind_group = BindGroupBuilder::new(layout)
            .texture(&depth.view)
            .sampler(&depth.sampler)
            .create(&ctx.device, "Shadow Map Bind Group");

        debug!("Created shadow map {}x{}", size, size);

        Ok(Self {
            depth,
            bind_group,
            size,
        })
    }

    /// Begins a depth-only pass covering the whole map, cleared to 1
    pub fn begin_depth_pass<'e>(&self, encoder: &'e mut wgpu::CommandEncoder) -> wgpu::RenderPass<'e> {
        encoder.begin_render_pass(&wgpu::RenderPassDescriptor {
            label: Some("Shadow Depth Pass"),
            color_attachments: &[],
            depth_stencil_attachment: Some(wgpu::RenderPassDepthStencilAttachment {
                view: &self.depth.view,
                depth_ops: Some(wgpu::Operations {
                    load: wgpu::LoadOp::Clear(1.0),
                    store: wgpu::StoreOp::Store,
                }),
                stencil_ops: None,
            }),
            occlusion_query_set: None,
            timestamp_writes: None,
        })
    }

    pub fn end_depth_pass(&self, pass: wgpu::RenderPass<'_>) {
        drop(pass);
    }

    pub fn depth(&self) -> &TextureResource {
        &self.depth
    }

    /// Depth texture and comparison sampler
    pub fn bind_group(&self) -> &wgpu::BindGroup {
        &self.bind_group
    }

    pub fn size(&self) -> u32 {
        self.size
    }
}
