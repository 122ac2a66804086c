//! Geometry buffer
//!
//! Holds per-pixel surface attributes written by the geometry pass and read
//! by lights and post filters:
//! - albedo (`Rgba16Float`): object diffuse colour
//! - normal (`Rgba16Float`): eye space normal in `.xyz`
//! - depth (`Depth32Float`): 0..1 window depth

use std::sync::Arc;

use log::debug;

use crate::errors::Result;
use crate::gfx::resources::texture_resource::TextureResource;
use crate::wgpu_utils::BindGroupBuilder;

use super::context::GpuContext;

pub struct GBuffer {
    albedo: TextureResource,
    normal: TextureResource,
    depth: TextureResource,
    bind_group: wgpu::BindGroup,
    width: u32,
    height: u32,
}

impl GBuffer {
    pub const ALBEDO_FORMAT: wgpu::TextureFormat = wgpu::TextureFormat::Rgba16Float;
    pub const NORMAL_FORMAT: wgpu::TextureFormat = wgpu::TextureFormat::Rgba16Float;
    pub const DEPTH_FORMAT: wgpu::TextureFormat = TextureResource::DEPTH_FORMAT;

    /// Allocates all three attachments at `width` x `height`
    pub fn new(ctx: &Arc<GpuContext>, width: u32, height: u32) -> Result<Self> {
        let (albedo, normal, depth) = ctx.create_target("GBuffer", |device| {
            (
                TextureResource::create_render_target(
                    device,
                    width,
                    height,
                    Self::ALBEDO_FORMAT,
                    "GBuffer Albedo",
                ),
                TextureResource::create_render_target(
                    device,
                    width,
                    height,
                    Self::NORMAL_FORMAT,
                    "GBuffer Normal",
                ),
                TextureResource::create_depth_texture(device, width, height, "GBuffer Depth"),
            )
        })?;

        let bind_group = BindGroupBuilder::new(&ctx.layouts.gbuffer)
            .texture(&albedo.view)
            .texture(&normal.view)
            .texture(&depth.view)
            .sampler(&ctx.linear_sampler)
            .create(&ctx.device, "GBuffer Bind Group");

        debug!("Created G-buffer {}x{}", width, height);

        Ok(Self {
            albedo,
            normal,
            depth,
            bind_group,
            width,
            height,
        })
    }

    /// Begins the geometry pass
    ///
    /// Both colour attachments are cleared to zero and depth to 1. The
    /// returned pass keeps the G-buffer bound until it is ended or dropped.
    pub fn begin_write<'e>(&self, encoder: &'e mut wgpu::CommandEncoder) -> wgpu::RenderPass<'e> {
        let clear = wgpu::Operations {
            load: wgpu::LoadOp::Clear(wgpu::Color::TRANSPARENT),
            store: wgpu::StoreOp::Store,
        };

        encoder.begin_render_pass(&wgpu::RenderPassDescriptor {
            label: Some("Geometry Pass"),
            color_attachments: &[
                Some(wgpu::RenderPassColorAttachment {
                    view: &self.albedo.view,
                    resolve_target: None,
                    ops: clear,
                }),
                Some(wgpu::RenderPassColorAttachment {
                    view: &self.normal.view,
                    resolve_target: None,
                    ops: clear,
                }),
            ],
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

    /// Ends the geometry pass
    pub fn end_write(&self, pass: wgpu::RenderPass<'_>) {
        drop(pass);
    }

    /// Colour target states matching the attachments of [`GBuffer::begin_write`]
    pub fn color_targets() -> Vec<Option<wgpu::ColorTargetState>> {
        [Self::ALBEDO_FORMAT, Self::NORMAL_FORMAT]
            .into_iter()
            .map(|format| {
                Some(wgpu::ColorTargetState {
                    format,
                    blend: None,
                    write_mask: wgpu::ColorWrites::ALL,
                })
            })
            .collect()
    }

    pub fn albedo(&self) -> &TextureResource {
        &self.albedo
    }

    pub fn normal(&self) -> &TextureResource {
        &self.normal
    }

    pub fn depth(&self) -> &TextureResource {
        &self.depth
    }

    /// Albedo, normal, depth and a linear sampler, in that binding order
    pub fn bind_group(&self) -> &wgpu::BindGroup {
        &self.bind_group
    }

    pub fn size(&self) -> (u32, u32) {
        (self.width, self.height)
    }
}
