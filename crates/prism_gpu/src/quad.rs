//! Shared full-screen quad geometry
//!
//! The quad is stored planar in a single vertex buffer: four positions,
//! then four texture coordinates, then four RGBA colors. Filter shaders read
//! each attribute from its own slice of that buffer, so the byte offsets in
//! [`QUAD_VERTEX_LAYOUT`] are part of the buffer format.

use prism_core::{Rect, Size};

/// Number of indices in one quad draw (two triangles)
pub const QUAD_INDEX_COUNT: u32 = 6;

/// Index format of the quad index buffer
pub const QUAD_INDEX_FORMAT: wgpu::IndexFormat = wgpu::IndexFormat::Uint16;

const FLOAT_BYTES: u64 = 4;

/// One vertex attribute read from the quad buffer
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct QuadAttribute {
    /// Attribute name as declared by filter shaders
    pub name: &'static str,
    /// Shader location
    pub location: u32,
    pub format: wgpu::VertexFormat,
    /// Byte offset of the first element inside the quad buffer
    pub offset: u64,
    /// Bytes between consecutive elements (tightly packed)
    pub stride: u64,
    /// Bytes occupied by all four vertices
    pub len: u64,
}

/// Attribute layout of the quad buffer
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct QuadVertexLayout {
    pub position: QuadAttribute,
    pub texture_coord: QuadAttribute,
    pub color: QuadAttribute,
}

/// Layout every filter draw binds: `aVertexPosition` (2 floats),
/// `aTextureCoord` (2 floats) after the four positions and `aColor`
/// (4 floats) after the four texture coordinates.
pub const QUAD_VERTEX_LAYOUT: QuadVertexLayout = QuadVertexLayout {
    position: QuadAttribute {
        name: "aVertexPosition",
        location: 0,
        format: wgpu::VertexFormat::Float32x2,
        offset: 0,
        stride: 2 * FLOAT_BYTES,
        len: 2 * 4 * FLOAT_BYTES,
    },
    texture_coord: QuadAttribute {
        name: "aTextureCoord",
        location: 1,
        format: wgpu::VertexFormat::Float32x2,
        offset: 2 * 4 * 4,
        stride: 2 * FLOAT_BYTES,
        len: 2 * 4 * FLOAT_BYTES,
    },
    color: QuadAttribute {
        name: "aColor",
        location: 2,
        format: wgpu::VertexFormat::Float32x4,
        offset: 4 * 4 * 4,
        stride: 4 * FLOAT_BYTES,
        len: 4 * 4 * FLOAT_BYTES,
    },
};

const POSITION_ATTRIBUTES: [wgpu::VertexAttribute; 1] = [wgpu::VertexAttribute {
    format: wgpu::VertexFormat::Float32x2,
    offset: 0,
    shader_location: 0,
}];

const TEXTURE_COORD_ATTRIBUTES: [wgpu::VertexAttribute; 1] = [wgpu::VertexAttribute {
    format: wgpu::VertexFormat::Float32x2,
    offset: 0,
    shader_location: 1,
}];

const COLOR_ATTRIBUTES: [wgpu::VertexAttribute; 1] = [wgpu::VertexAttribute {
    format: wgpu::VertexFormat::Float32x4,
    offset: 0,
    shader_location: 2,
}];

impl QuadVertexLayout {
    /// Attributes in vertex-buffer slot order
    pub fn attributes(&self) -> [QuadAttribute; 3] {
        [self.position, self.texture_coord, self.color]
    }

    /// Pipeline vertex buffer layouts, one slot per attribute
    pub fn buffer_layouts(&self) -> [wgpu::VertexBufferLayout<'static>; 3] {
        [
            wgpu::VertexBufferLayout {
                array_stride: self.position.stride,
                step_mode: wgpu::VertexStepMode::Vertex,
                attributes: &POSITION_ATTRIBUTES,
            },
            wgpu::VertexBufferLayout {
                array_stride: self.texture_coord.stride,
                step_mode: wgpu::VertexStepMode::Vertex,
                attributes: &TEXTURE_COORD_ATTRIBUTES,
            },
            wgpu::VertexBufferLayout {
                array_stride: self.color.stride,
                step_mode: wgpu::VertexStepMode::Vertex,
                attributes: &COLOR_ATTRIBUTES,
            },
        ]
    }
}

/// Quad geometry remapped per draw to the region being filtered
#[derive(Clone, Debug, PartialEq)]
pub struct Quad {
    /// Corner positions in working-buffer pixels (TL, TR, BR, BL)
    pub vertices: [f32; 8],
    /// Texture coordinates matching `vertices`
    pub uvs: [f32; 8],
    /// Per-corner RGBA tint
    pub colors: [f32; 16],
    pub indices: [u16; 6],
}

impl Default for Quad {
    fn default() -> Self {
        Self::new()
    }
}

impl Quad {
    pub fn new() -> Self {
        Self {
            vertices: [0.0, 0.0, 200.0, 0.0, 200.0, 200.0, 0.0, 200.0],
            uvs: [0.0, 0.0, 1.0, 0.0, 1.0, 1.0, 0.0, 1.0],
            colors: [1.0; 16],
            indices: [0, 1, 2, 0, 2, 3],
        }
    }

    /// Remap the quad onto `frame`, sampling the matching share of a
    /// `total_size` texture.
    pub fn map(&mut self, total_size: Size, frame: Rect) {
        let u = frame.width() / total_size.width;
        let v = frame.height() / total_size.height;
        self.uvs = [0.0, 0.0, u, 0.0, u, v, 0.0, v];

        let (x, y) = (frame.x(), frame.y());
        let (right, bottom) = (frame.right(), frame.bottom());
        self.vertices = [x, y, right, y, right, bottom, x, bottom];
    }

    /// Planar vertex data in [`QUAD_VERTEX_LAYOUT`] order
    pub fn vertex_data(&self) -> [f32; 32] {
        let mut data = [0.0; 32];
        data[..8].copy_from_slice(&self.vertices);
        data[8..16].copy_from_slice(&self.uvs);
        data[16..].copy_from_slice(&self.colors);
        data
    }

    pub fn index_bytes(&self) -> &[u8] {
        bytemuck::cast_slice(&self.indices)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn layout_offsets_match_planar_buffer() {
        let layout = QUAD_VERTEX_LAYOUT;
        assert_eq!(layout.position.offset, 0);
        assert_eq!(layout.texture_coord.offset, 32);
        assert_eq!(layout.color.offset, 64);
        assert_eq!(
            layout.color.offset + layout.color.len,
            std::mem::size_of::<[f32; 32]>() as u64
        );
        assert_eq!(
            layout.attributes().map(|a| a.name),
            ["aVertexPosition", "aTextureCoord", "aColor"]
        );
    }

    #[test]
    fn map_places_vertices_on_frame() {
        let mut quad = Quad::new();
        quad.map(Size::new(800.0, 600.0), Rect::new(0.0, 50.0, 90.0, 100.0));

        assert_eq!(
            quad.vertices,
            [0.0, 50.0, 90.0, 50.0, 90.0, 150.0, 0.0, 150.0]
        );
        assert_eq!(
            quad.uvs,
            [0.0, 0.0, 90.0 / 800.0, 0.0, 90.0 / 800.0, 100.0 / 600.0, 0.0, 100.0 / 600.0]
        );
    }

    #[test]
    fn vertex_data_is_planar() {
        let quad = Quad::new();
        let data = quad.vertex_data();
        assert_eq!(&data[..8], &quad.vertices);
        assert_eq!(&data[8..16], &quad.uvs);
        assert_eq!(&data[16..], &quad.colors);
        assert_eq!(quad.index_bytes().len(), 12);
    }
}
