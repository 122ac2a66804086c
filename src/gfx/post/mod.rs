//! Screen-space post processing
//!
//! Filters run after the lighting pass, in registration order. Each one owns
//! an output target at the output resolution and returns a view of it, which
//! becomes the next filter's input. The last output is blitted to the
//! surface.

pub mod blur;
pub mod dof;
pub mod gbuffer_preview;

pub use blur::BlurFilter;
pub use dof::DofFilter;
pub use gbuffer_preview::GBufferPreview;

use cgmath::Matrix4;

use crate::errors::Result;
use crate::gfx::rendering::context::GpuContext;
use crate::gfx::rendering::gbuffer::GBuffer;
use crate::gfx::resources::mesh::Attribute;
use crate::gfx::resources::render_target::begin_color_pass;
use crate::gfx::resources::texture_resource::TextureResource;

/// Format of every filter target
pub const FILTER_FORMAT: wgpu::TextureFormat = TextureResource::HDR_FORMAT;

pub trait PostProcessFilter {
    /// Short name used in logs
    fn label(&self) -> &str;

    /// Renders the filter into its own target and returns that target's view
    fn apply(
        &mut self,
        encoder: &mut wgpu::CommandEncoder,
        gbuffer: &GBuffer,
        input: &wgpu::TextureView,
        projection: &Matrix4<f32>,
        view: &Matrix4<f32>,
    ) -> wgpu::TextureView;

    /// Recreates every size-dependent target
    fn resize(&mut self, width: u32, height: u32) -> Result<()>;
}

/// Draws the full-screen quad into `target` with `pipeline`
///
/// `bind_groups` are bound to consecutive groups starting at 0.
pub(crate) fn fullscreen_pass(
    ctx: &GpuContext,
    encoder: &mut wgpu::CommandEncoder,
    target: &wgpu::TextureView,
    label: &str,
    pipeline: &wgpu::RenderPipeline,
    bind_groups: &[&wgpu::BindGroup],
) {
    log::trace!("Filter pass '{}'", label);
    let mut pass = begin_color_pass(encoder, target, label);
    pass.set_pipeline(pipeline);
    for (index, group) in bind_groups.iter().enumerate() {
        pass.set_bind_group(index as u32, *group, &[]);
    }
    ctx.fullscreen_quad
        .draw(&mut pass, &[Attribute::Position, Attribute::TexCoord]);
}
