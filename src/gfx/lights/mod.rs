//! Light sources
//!
//! Every light shares one lifecycle: constructed with its GPU resources, an
//! optional depth pass rendering shadow casters from the light's point of
//! view, an accumulation draw adding its contribution to the lighting target,
//! and release of everything on drop.

pub mod ambient;
pub mod spot;

pub use ambient::AmbientLight;
pub use spot::SpotLight;

use cgmath::Matrix4;

use crate::gfx::rendering::gbuffer::GBuffer;
use crate::gfx::resources::texture_resource::TextureResource;

/// Blend state of the lighting pass: contributions add up
pub const ADDITIVE: wgpu::BlendState = wgpu::BlendState {
    color: wgpu::BlendComponent {
        src_factor: wgpu::BlendFactor::One,
        dst_factor: wgpu::BlendFactor::One,
        operation: wgpu::BlendOperation::Add,
    },
    alpha: wgpu::BlendComponent {
        src_factor: wgpu::BlendFactor::One,
        dst_factor: wgpu::BlendFactor::One,
        operation: wgpu::BlendOperation::Add,
    },
};

/// Format of the lighting target every light pipeline renders into
pub const LIGHTING_FORMAT: wgpu::TextureFormat = TextureResource::HDR_FORMAT;

/// An active shadow depth pass
///
/// The scene draws its shadow casters into `pass` using `projection` and
/// `view`, then hands the value back to [`Light::end_depth_pass`].
pub struct DepthPass<'e> {
    pub pass: wgpu::RenderPass<'e>,
    pub projection: Matrix4<f32>,
    pub view: Matrix4<f32>,
}

pub trait Light {
    /// Short name used in logs
    fn label(&self) -> &str;

    fn needs_depth_pass(&self) -> bool;

    /// Binds the light's depth target; `None` when the light casts no shadows
    fn begin_depth_pass<'e>(&self, encoder: &'e mut wgpu::CommandEncoder) -> Option<DepthPass<'e>>;

    /// Finishes the depth pass started by [`Light::begin_depth_pass`]
    fn end_depth_pass(&self, pass: DepthPass<'_>) {
        drop(pass);
    }

    /// Draws this light's contribution into the bound lighting pass
    fn render(
        &mut self,
        pass: &mut wgpu::RenderPass<'_>,
        gbuffer: &GBuffer,
        projection: &Matrix4<f32>,
        view: &Matrix4<f32>,
    );
}
