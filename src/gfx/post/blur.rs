//! Bloom style blur
//!
//! The input is box filtered down to a quarter resolution target and squared,
//! so bright areas dominate. The result is blurred with a separable 9 tap
//! Gaussian, bouncing between two quarter resolution targets. Finally the
//! tone mapped input and the blurred highlights are added together.

use std::sync::Arc;

use cgmath::Matrix4;
use log::debug;

use crate::config::BloomConfig;
use crate::errors::Result;
use crate::gfx::rendering::context::GpuContext;
use crate::gfx::rendering::gbuffer::GBuffer;
use crate::gfx::rendering::pipeline::{PipelineConfig, PipelineFactory, FULLSCREEN_VS};
use crate::gfx::resources::render_target::RenderTarget;
use crate::wgpu_utils::{binding_types, BindGroupLayoutBuilder, UniformBuffer};

use super::{fullscreen_pass, PostProcessFilter, FILTER_FORMAT};

/// One side of the symmetric Gaussian kernel, center weight first
pub const GAUSSIAN_WEIGHTS: [f32; 5] = [
    0.2270270270,
    0.1945945946,
    0.1216216216,
    0.0540540541,
    0.0162162162,
];

/// Offset subtracted before the filmic curve
pub const TONE_MAP_TOE: f32 = 0.004;

/// The full 9 tap kernel, from offset -4 to +4
pub fn gaussian_kernel() -> [f32; 9] {
    let mut kernel = [0.0; 9];
    for (i, w) in GAUSSIAN_WEIGHTS.iter().enumerate() {
        kernel[4 + i] = *w;
        kernel[4 - i] = *w;
    }
    kernel
}

/// Filmic tone curve applied to one channel after scaling by `exposure`
pub fn tone_map(channel: f32, exposure: f32) -> f32 {
    let x = (channel * exposure - TONE_MAP_TOE).max(0.0);
    (x * (6.2 * x + 0.5)) / (x * (6.2 * x + 1.7) + 0.06)
}

/// Box filtered quarter resolution copy of a row-major image, before squaring
///
/// Each output texel averages the 4x4 block it covers; blocks cut off by the
/// image border average what is left.
pub fn box_downsample(pixels: &[[f32; 4]], width: u32, height: u32) -> Vec<[f32; 4]> {
    let (out_width, out_height) = quarter_size(width, height);
    let mut out = Vec::with_capacity((out_width * out_height) as usize);

    for oy in 0..out_height {
        for ox in 0..out_width {
            let mut sum = [0.0f32; 4];
            let mut count = 0.0;
            for y in (oy * 4)..((oy * 4 + 4).min(height)) {
                for x in (ox * 4)..((ox * 4 + 4).min(width)) {
                    let p = pixels[(y * width + x) as usize];
                    for c in 0..4 {
                        sum[c] += p[c];
                    }
                    count += 1.0;
                }
            }
            out.push(sum.map(|s| if count > 0.0 { s / count } else { 0.0 }));
        }
    }
    out
}

/// Size of the blur targets for an output of `width` x `height`
pub fn quarter_size(width: u32, height: u32) -> (u32, u32) {
    ((width / 4).max(1), (height / 4).max(1))
}

#[repr(C)]
#[derive(Copy, Clone, bytemuck::Pod, bytemuck::Zeroable, Debug)]
struct BlurUniform {
    texel: [f32; 4],
}

#[repr(C)]
#[derive(Copy, Clone, bytemuck::Pod, bytemuck::Zeroable, Debug)]
struct CompositeUniform {
    params: [f32; 4],
}

/// Quarter resolution ping-pong targets with their sampling bind groups
struct BlurTargets {
    quarter: [RenderTarget; 2],
    quarter_groups: [wgpu::BindGroup; 2],
}

impl BlurTargets {
    fn new(ctx: &GpuContext, width: u32, height: u32) -> Result<Self> {
        let (qw, qh) = quarter_size(width, height);
        let quarter = [
            RenderTarget::new(ctx, qw, qh, FILTER_FORMAT, "Blur Target 0")?,
            RenderTarget::new(ctx, qw, qh, FILTER_FORMAT, "Blur Target 1")?,
        ];
        let quarter_groups = [
            ctx.texture_bind_group(quarter[0].view(), "Blur Source 0"),
            ctx.texture_bind_group(quarter[1].view(), "Blur Source 1"),
        ];
        Ok(Self {
            quarter,
            quarter_groups,
        })
    }
}

pub struct BlurFilter {
    ctx: Arc<GpuContext>,
    config: BloomConfig,
    output: RenderTarget,
    targets: BlurTargets,
    downsample_pipeline: wgpu::RenderPipeline,
    blur_pipeline: wgpu::RenderPipeline,
    composite_pipeline: wgpu::RenderPipeline,
    // downsample, horizontal, vertical
    step_uniforms: [UniformBuffer<BlurUniform>; 3],
    step_groups: [wgpu::BindGroup; 3],
    composite_uniform: UniformBuffer<CompositeUniform>,
    composite_group: wgpu::BindGroup,
}

impl BlurFilter {
    pub fn new(ctx: &Arc<GpuContext>, width: u32, height: u32) -> Result<Self> {
        Self::with_config(ctx, width, height, BloomConfig::default())
    }

    pub fn with_config(
        ctx: &Arc<GpuContext>,
        width: u32,
        height: u32,
        config: BloomConfig,
    ) -> Result<Self> {
        let output = RenderTarget::new(ctx, width, height, FILTER_FORMAT, "Blur Output")?;
        let targets = BlurTargets::new(ctx, width, height)?;

        let uniform_layout = BindGroupLayoutBuilder::new()
            .next_binding_fragment(binding_types::uniform())
            .create(&ctx.device, "Blur Bind Group Layout");

        let step_uniforms = [
            UniformBuffer::new(&ctx.device),
            UniformBuffer::new(&ctx.device),
            UniformBuffer::new(&ctx.device),
        ];
        let step_groups = [0, 1, 2].map(|i| {
            step_uniforms[i].bind_group(&ctx.device, &uniform_layout, "Blur Step Bind Group")
        });

        let composite_uniform = UniformBuffer::new(&ctx.device);
        let composite_group = composite_uniform.bind_group(
            &ctx.device,
            &uniform_layout,
            "Blur Composite Bind Group",
        );

        let mut factory = PipelineFactory::new(ctx.clone());
        factory.load_shader(
            "bloom_blur",
            &format!("{}\n{}", FULLSCREEN_VS, include_str!("blur.wgsl")),
        )?;
        factory.load_shader(
            "bloom_composite",
            &format!("{}\n{}", FULLSCREEN_VS, include_str!("composite.wgsl")),
        )?;

        let blur_layouts = vec![
            ctx.layouts.texture.layout.clone(),
            uniform_layout.layout.clone(),
        ];
        let downsample_pipeline = factory.create_pipeline(
            &PipelineConfig::fullscreen("bloom_blur", FILTER_FORMAT, None)
                .with_label("Bloom Downsample")
                .with_entry_points("vs_fullscreen", "fs_downsample")
                .with_bind_group_layouts(blur_layouts.clone()),
        )?;
        let blur_pipeline = factory.create_pipeline(
            &PipelineConfig::fullscreen("bloom_blur", FILTER_FORMAT, None)
                .with_label("Bloom Gaussian")
                .with_entry_points("vs_fullscreen", "fs_blur")
                .with_bind_group_layouts(blur_layouts),
        )?;
        let composite_pipeline = factory.create_pipeline(
            &PipelineConfig::fullscreen("bloom_composite", FILTER_FORMAT, None)
                .with_label("Bloom Composite")
                .with_entry_points("vs_fullscreen", "fs_composite")
                .with_bind_group_layouts(vec![
                    ctx.layouts.texture.layout.clone(),
                    ctx.layouts.texture.layout.clone(),
                    uniform_layout.layout.clone(),
                ]),
        )?;

        let mut filter = Self {
            ctx: ctx.clone(),
            config,
            output,
            targets,
            downsample_pipeline,
            blur_pipeline,
            composite_pipeline,
            step_uniforms,
            step_groups,
            composite_uniform,
            composite_group,
        };
        filter.write_uniforms(width, height);

        debug!(
            "Created blur filter {}x{}, {} iterations",
            width, height, filter.config.iterations
        );
        Ok(filter)
    }

    pub fn config(&self) -> &BloomConfig {
        &self.config
    }

    pub fn set_debug_overlay(&mut self, enabled: bool) {
        self.config.debug_overlay = enabled;
        self.write_composite_uniform();
    }

    pub fn output(&self) -> &RenderTarget {
        &self.output
    }

    /// Blurred highlights after the last iteration
    pub fn blurred(&self) -> &RenderTarget {
        &self.targets.quarter[0]
    }

    fn write_uniforms(&mut self, width: u32, height: u32) {
        let (qw, qh) = quarter_size(width, height);
        let full_texel = [1.0 / width.max(1) as f32, 1.0 / height.max(1) as f32];
        let quarter_texel = [1.0 / qw as f32, 1.0 / qh as f32];

        let steps = [
            [full_texel[0], full_texel[1], 0.0, 0.0],
            [quarter_texel[0], quarter_texel[1], 1.0, 0.0],
            [quarter_texel[0], quarter_texel[1], 0.0, 1.0],
        ];
        for (uniform, texel) in self.step_uniforms.iter_mut().zip(steps) {
            uniform.update_content(&self.ctx.queue, BlurUniform { texel });
        }
        self.write_composite_uniform();
    }

    fn write_composite_uniform(&mut self) {
        let overlay = if self.config.debug_overlay { 1.0 } else { 0.0 };
        self.composite_uniform.update_content(
            &self.ctx.queue,
            CompositeUniform {
                params: [self.config.exposure, overlay, 0.0, 0.0],
            },
        );
    }
}

impl PostProcessFilter for BlurFilter {
    fn label(&self) -> &str {
        "blur"
    }

    fn apply(
        &mut self,
        encoder: &mut wgpu::CommandEncoder,
        _gbuffer: &GBuffer,
        input: &wgpu::TextureView,
        _projection: &Matrix4<f32>,
        _view: &Matrix4<f32>,
    ) -> wgpu::TextureView {
        let input_group = self.ctx.texture_bind_group(input, "Blur Input");
        let [target_a, target_b] = &self.targets.quarter;
        let [group_a, group_b] = &self.targets.quarter_groups;

        fullscreen_pass(
            &self.ctx,
            encoder,
            target_a.view(),
            "Bloom Downsample",
            &self.downsample_pipeline,
            &[&input_group, &self.step_groups[0]],
        );

        for _ in 0..self.config.iterations {
            fullscreen_pass(
                &self.ctx,
                encoder,
                target_b.view(),
                "Bloom Blur X",
                &self.blur_pipeline,
                &[group_a, &self.step_groups[1]],
            );
            fullscreen_pass(
                &self.ctx,
                encoder,
                target_a.view(),
                "Bloom Blur Y",
                &self.blur_pipeline,
                &[group_b, &self.step_groups[2]],
            );
        }

        fullscreen_pass(
            &self.ctx,
            encoder,
            self.output.view(),
            "Bloom Composite",
            &self.composite_pipeline,
            &[&input_group, group_a, &self.composite_group],
        );
        self.output.view().clone()
    }

    fn resize(&mut self, width: u32, height: u32) -> Result<()> {
        self.output = RenderTarget::new(&self.ctx, width, height, FILTER_FORMAT, "Blur Output")?;
        self.targets = BlurTargets::new(&self.ctx, width, height)?;
        self.write_uniforms(width, height);
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_gaussian_kernel_sums_to_one() {
        let kernel = gaussian_kernel();
        let sum: f32 = kernel.iter().sum();
        assert!((sum - 1.0).abs() < 1e-6);
        assert_eq!(kernel[0], kernel[8]);
        assert_eq!(kernel[4], GAUSSIAN_WEIGHTS[0]);
    }

    #[test]
    fn test_box_downsample_of_constant_is_constant() {
        let (w, h) = (16, 12);
        let pixels = vec![[0.25, 0.5, 0.75, 1.0]; (w * h) as usize];
        let small = box_downsample(&pixels, w, h);
        assert_eq!(small.len(), 4 * 3);
        for p in small {
            assert_eq!(p, [0.25, 0.5, 0.75, 1.0]);
        }
    }

    #[test]
    fn test_box_downsample_averages_blocks() {
        let (w, h) = (8, 4);
        let pixels: Vec<[f32; 4]> = (0..w * h)
            .map(|i| if i % w < 4 { [1.0; 4] } else { [0.0; 4] })
            .collect();
        let small = box_downsample(&pixels, w, h);
        assert_eq!(small, vec![[1.0; 4], [0.0; 4]]);
    }

    #[test]
    fn test_tone_map_curve() {
        assert_eq!(tone_map(0.0, 0.5), 0.0);
        // Below the toe everything is black
        assert_eq!(tone_map(0.006, 0.5), 0.0);

        let mut previous = 0.0;
        for i in 1..100 {
            let v = tone_map(i as f32 * 0.2, 0.5);
            assert!(v > previous && v < 1.0);
            previous = v;
        }
    }

    #[test]
    fn test_quarter_size_never_zero() {
        assert_eq!(quarter_size(1024, 768), (256, 192));
        assert_eq!(quarter_size(3, 2), (1, 1));
    }
}
