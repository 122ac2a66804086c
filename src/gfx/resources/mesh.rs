//! GPU meshes
//!
//! A [`Drawable`] keeps every vertex attribute in its own buffer, so a pass
//! binds only the streams its pipeline consumes: the shadow pass reads
//! positions, the geometry pass positions and normals, full-screen passes
//! positions and texture coordinates.

use log::{debug, warn};
use wgpu::util::DeviceExt;

use crate::errors::Result;
use crate::gfx::geometry::GeometryData;

/// Vertex attribute stream kinds
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Attribute {
    Position,
    Normal,
    TexCoord,
}

impl Attribute {
    pub fn format(self) -> wgpu::VertexFormat {
        match self {
            Attribute::Position | Attribute::Normal => wgpu::VertexFormat::Float32x3,
            Attribute::TexCoord => wgpu::VertexFormat::Float32x2,
        }
    }

    /// Vertex buffer layouts for `attributes`, bound at consecutive slots
    ///
    /// Slot `i` feeds `@location(i)`.
    pub fn layouts(attributes: &[Attribute]) -> Vec<wgpu::VertexBufferLayout<'static>> {
        attributes
            .iter()
            .enumerate()
            .map(|(location, attribute)| attribute.layout(location as u32))
            .collect()
    }

    fn layout(self, location: u32) -> wgpu::VertexBufferLayout<'static> {
        debug_assert!((location as usize) < MAX_STREAMS);
        let slot = (location as usize).min(MAX_STREAMS - 1);
        let table: &'static [[wgpu::VertexAttribute; 1]; MAX_STREAMS] = match self {
            Attribute::Position | Attribute::Normal => &VEC3_SLOTS,
            Attribute::TexCoord => &VEC2_SLOTS,
        };

        wgpu::VertexBufferLayout {
            array_stride: self.format().size(),
            step_mode: wgpu::VertexStepMode::Vertex,
            attributes: &table[slot],
        }
    }
}

/// Streams a single pipeline can consume
const MAX_STREAMS: usize = 3;

const fn slot(format: wgpu::VertexFormat, location: u32) -> [wgpu::VertexAttribute; 1] {
    [wgpu::VertexAttribute {
        format,
        offset: 0,
        shader_location: location,
    }]
}

const VEC3_SLOTS: [[wgpu::VertexAttribute; 1]; MAX_STREAMS] = [
    slot(wgpu::VertexFormat::Float32x3, 0),
    slot(wgpu::VertexFormat::Float32x3, 1),
    slot(wgpu::VertexFormat::Float32x3, 2),
];

const VEC2_SLOTS: [[wgpu::VertexAttribute; 1]; MAX_STREAMS] = [
    slot(wgpu::VertexFormat::Float32x2, 0),
    slot(wgpu::VertexFormat::Float32x2, 1),
    slot(wgpu::VertexFormat::Float32x2, 2),
];

struct VertexStream {
    attribute: Attribute,
    buffer: wgpu::Buffer,
}

/// Indexed mesh with one vertex buffer per attribute
pub struct Drawable {
    streams: Vec<VertexStream>,
    index_buffer: wgpu::Buffer,
    index_count: u32,
    vertex_count: u32,
    topology: wgpu::PrimitiveTopology,
}

impl Drawable {
    /// Uploads `data` after checking its invariants
    pub fn new(device: &wgpu::Device, data: &GeometryData, label: &str) -> Result<Self> {
        data.validate()?;

        let mut streams = vec![VertexStream {
            attribute: Attribute::Position,
            buffer: device.create_buffer_init(&wgpu::util::BufferInitDescriptor {
                label: Some(&format!("{} Positions", label)),
                contents: bytemuck::cast_slice(&data.positions),
                usage: wgpu::BufferUsages::VERTEX,
            }),
        }];

        if !data.normals.is_empty() {
            streams.push(VertexStream {
                attribute: Attribute::Normal,
                buffer: device.create_buffer_init(&wgpu::util::BufferInitDescriptor {
                    label: Some(&format!("{} Normals", label)),
                    contents: bytemuck::cast_slice(&data.normals),
                    usage: wgpu::BufferUsages::VERTEX,
                }),
            });
        }

        if !data.tex_coords.is_empty() {
            streams.push(VertexStream {
                attribute: Attribute::TexCoord,
                buffer: device.create_buffer_init(&wgpu::util::BufferInitDescriptor {
                    label: Some(&format!("{} TexCoords", label)),
                    contents: bytemuck::cast_slice(&data.tex_coords),
                    usage: wgpu::BufferUsages::VERTEX,
                }),
            });
        }

        let index_buffer = device.create_buffer_init(&wgpu::util::BufferInitDescriptor {
            label: Some(&format!("{} Indices", label)),
            contents: bytemuck::cast_slice(&data.indices),
            usage: wgpu::BufferUsages::INDEX,
        });

        debug!(
            "Uploaded drawable '{}': {} vertices, {} indices, {} stream(s)",
            label,
            data.vertex_count(),
            data.indices.len(),
            streams.len()
        );

        Ok(Self {
            streams,
            index_buffer,
            index_count: data.indices.len() as u32,
            vertex_count: data.vertex_count() as u32,
            topology: data.topology,
        })
    }

    pub fn has_attribute(&self, attribute: Attribute) -> bool {
        self.streams.iter().any(|s| s.attribute == attribute)
    }

    pub fn index_count(&self) -> u32 {
        self.index_count
    }

    pub fn vertex_count(&self) -> u32 {
        self.vertex_count
    }

    pub fn topology(&self) -> wgpu::PrimitiveTopology {
        self.topology
    }

    /// Binds `attributes` to vertex slots 0.. in order and issues the draw
    ///
    /// The draw is skipped with a warning when a requested stream is missing.
    pub fn draw(&self, pass: &mut wgpu::RenderPass<'_>, attributes: &[Attribute]) {
        for (slot, attribute) in attributes.iter().enumerate() {
            match self.streams.iter().find(|s| s.attribute == *attribute) {
                Some(stream) => pass.set_vertex_buffer(slot as u32, stream.buffer.slice(..)),
                None => {
                    warn!("Skipping draw: drawable has no {:?} stream", attribute);
                    return;
                }
            }
        }

        pass.set_index_buffer(self.index_buffer.slice(..), wgpu::IndexFormat::Uint32);
        pass.draw_indexed(0..self.index_count, 0, 0..1);
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_layouts_use_consecutive_locations() {
        let layouts = Attribute::layouts(&[Attribute::Position, Attribute::TexCoord]);
        assert_eq!(layouts.len(), 2);
        assert_eq!(layouts[0].attributes[0].shader_location, 0);
        assert_eq!(layouts[0].array_stride, 12);
        assert_eq!(layouts[1].attributes[0].shader_location, 1);
        assert_eq!(layouts[1].attributes[0].format, wgpu::VertexFormat::Float32x2);
        assert_eq!(layouts[1].array_stride, 8);
    }

    #[test]
    fn test_geometry_layout() {
        let layouts = Attribute::layouts(&[Attribute::Position, Attribute::Normal]);
        assert_eq!(layouts[1].attributes[0].shader_location, 1);
        assert_eq!(layouts[1].attributes[0].format, wgpu::VertexFormat::Float32x3);
    }
}
