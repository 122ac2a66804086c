//! Offscreen colour targets and texture readback

use log::debug;

use crate::errors::{RenderError, Result};
use crate::gfx::rendering::context::GpuContext;

use super::texture_resource::TextureResource;

/// A single sampleable colour attachment
///
/// Used for the lighting output and for every post filter's output and
/// intermediate buffers.
pub struct RenderTarget {
    pub color: TextureResource,
    label: String,
}

impl RenderTarget {
    pub fn new(
        ctx: &GpuContext,
        width: u32,
        height: u32,
        format: wgpu::TextureFormat,
        label: &str,
    ) -> Result<Self> {
        let color = ctx.create_target(label, |device| {
            TextureResource::create_render_target(device, width, height, format, label)
        })?;
        debug!("Created render target '{}' {}x{} {:?}", label, width, height, format);

        Ok(Self {
            color,
            label: label.to_owned(),
        })
    }

    /// HDR target in [`TextureResource::HDR_FORMAT`]
    pub fn new_hdr(ctx: &GpuContext, width: u32, height: u32, label: &str) -> Result<Self> {
        Self::new(ctx, width, height, TextureResource::HDR_FORMAT, label)
    }

    /// Begins a pass drawing into this target, cleared to transparent black
    pub fn begin_pass<'e>(&self, encoder: &'e mut wgpu::CommandEncoder) -> wgpu::RenderPass<'e> {
        begin_color_pass(encoder, &self.color.view, &self.label)
    }

    pub fn view(&self) -> &wgpu::TextureView {
        &self.color.view
    }

    pub fn size(&self) -> (u32, u32) {
        (self.color.width(), self.color.height())
    }

    pub fn label(&self) -> &str {
        &self.label
    }
}

/// Begins a single-attachment pass on `view`, cleared to transparent black
pub fn begin_color_pass<'e>(
    encoder: &'e mut wgpu::CommandEncoder,
    view: &wgpu::TextureView,
    label: &str,
) -> wgpu::RenderPass<'e> {
    encoder.begin_render_pass(&wgpu::RenderPassDescriptor {
        label: Some(label),
        color_attachments: &[Some(wgpu::RenderPassColorAttachment {
            view,
            resolve_target: None,
            ops: wgpu::Operations {
                load: wgpu::LoadOp::Clear(wgpu::Color::TRANSPARENT),
                store: wgpu::StoreOp::Store,
            },
        })],
        depth_stencil_attachment: None,
        occlusion_query_set: None,
        timestamp_writes: None,
    })
}

/// Copies a colour texture back to the CPU as RGBA floats, row-major
///
/// Supports the 8-bit unorm, 16-bit float and 32-bit float RGBA/BGRA formats.
/// Blocks until the GPU has finished all submitted work.
pub fn read_texture(ctx: &GpuContext, texture: &wgpu::Texture) -> Result<Vec<[f32; 4]>> {
    let format = texture.format();
    let texel_size = match format {
        wgpu::TextureFormat::Rgba8Unorm
        | wgpu::TextureFormat::Rgba8UnormSrgb
        | wgpu::TextureFormat::Bgra8Unorm
        | wgpu::TextureFormat::Bgra8UnormSrgb => 4,
        wgpu::TextureFormat::Rgba16Float => 8,
        wgpu::TextureFormat::Rgba32Float => 16,
        other => {
            return Err(RenderError::Readback(format!(
                "unsupported format {:?}",
                other
            )))
        }
    };

    let (width, height) = (texture.width(), texture.height());
    let unpadded_row = width * texel_size;
    let align = wgpu::COPY_BYTES_PER_ROW_ALIGNMENT;
    let padded_row = unpadded_row.div_ceil(align) * align;

    let staging_buffer = ctx.device.create_buffer(&wgpu::BufferDescriptor {
        label: Some("Readback Staging Buffer"),
        size: (padded_row * height) as u64,
        usage: wgpu::BufferUsages::COPY_DST | wgpu::BufferUsages::MAP_READ,
        mapped_at_creation: false,
    });

    let mut encoder = ctx
        .device
        .create_command_encoder(&wgpu::CommandEncoderDescriptor {
            label: Some("Readback Encoder"),
        });

    encoder.copy_texture_to_buffer(
        wgpu::TexelCopyTextureInfo {
            texture,
            mip_level: 0,
            origin: wgpu::Origin3d::ZERO,
            aspect: wgpu::TextureAspect::All,
        },
        wgpu::TexelCopyBufferInfo {
            buffer: &staging_buffer,
            layout: wgpu::TexelCopyBufferLayout {
                offset: 0,
                bytes_per_row: Some(padded_row),
                rows_per_image: Some(height),
            },
        },
        wgpu::Extent3d {
            width,
            height,
            depth_or_array_layers: 1,
        },
    );

    ctx.queue.submit(std::iter::once(encoder.finish()));

    let slice = staging_buffer.slice(..);
    let (tx, rx) = futures::channel::oneshot::channel();
    slice.map_async(wgpu::MapMode::Read, move |result| {
        let _ = tx.send(result);
    });

    ctx.device
        .poll(wgpu::PollType::Wait)
        .map_err(|e| RenderError::Readback(e.to_string()))?;

    match futures::executor::block_on(rx) {
        Ok(Ok(())) => {}
        Ok(Err(e)) => return Err(RenderError::Readback(e.to_string())),
        Err(_) => return Err(RenderError::Readback("map callback dropped".into())),
    }

    let mapped = slice.get_mapped_range();
    let mut pixels = Vec::with_capacity((width * height) as usize);
    for row in mapped.chunks_exact(padded_row as usize) {
        for texel in row[..unpadded_row as usize].chunks_exact(texel_size as usize) {
            pixels.push(decode_texel(format, texel));
        }
    }
    drop(mapped);
    staging_buffer.unmap();

    Ok(pixels)
}

fn decode_texel(format: wgpu::TextureFormat, texel: &[u8]) -> [f32; 4] {
    match format {
        wgpu::TextureFormat::Rgba16Float => {
            let mut out = [0.0; 4];
            for (o, bytes) in out.iter_mut().zip(texel.chunks_exact(2)) {
                *o = half::f16::from_le_bytes([bytes[0], bytes[1]]).to_f32();
            }
            out
        }
        wgpu::TextureFormat::Rgba32Float => {
            let mut out = [0.0; 4];
            for (o, bytes) in out.iter_mut().zip(texel.chunks_exact(4)) {
                *o = f32::from_le_bytes([bytes[0], bytes[1], bytes[2], bytes[3]]);
            }
            out
        }
        wgpu::TextureFormat::Bgra8Unorm | wgpu::TextureFormat::Bgra8UnormSrgb => [
            texel[2] as f32 / 255.0,
            texel[1] as f32 / 255.0,
            texel[0] as f32 / 255.0,
            texel[3] as f32 / 255.0,
        ],
        _ => [
            texel[0] as f32 / 255.0,
            texel[1] as f32 / 255.0,
            texel[2] as f32 / 255.0,
            texel[3] as f32 / 255.0,
        ],
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_decode_half_texel() {
        let mut bytes = Vec::new();
        for v in [0.2f32, 1.0, 0.0, 4.5] {
            bytes.extend_from_slice(&half::f16::from_f32(v).to_le_bytes());
        }
        let texel = decode_texel(wgpu::TextureFormat::Rgba16Float, &bytes);
        assert!((texel[0] - 0.2).abs() < 1e-3);
        assert_eq!(texel[1], 1.0);
        assert_eq!(texel[2], 0.0);
        assert_eq!(texel[3], 4.5);
    }

    #[test]
    fn test_decode_bgra_swizzles() {
        let texel = decode_texel(wgpu::TextureFormat::Bgra8Unorm, &[0, 0, 255, 255]);
        assert_eq!(texel, [1.0, 0.0, 0.0, 1.0]);
    }
}
