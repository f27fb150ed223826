//! Interleaved vertex buffers, one per primitive family.
//!
//! A single word-aligned allocation is filled through typed pushes and
//! handed to wgpu as bytes. The fill must come out byte-exact: a count
//! mismatch between the element tally and the writes is a hard error,
//! not something to render around.

use crate::colour::ColourLookup;
use anyhow::{bail, Result};
use scenejson::Geometry;

/// Point record: position (12) + colour (4) + size (4) + point type (4).
pub const POINT_STRIDE: usize = 24;
/// Triangle corner record: position (12) + normal (12) + colour (4) +
/// texcoord (8) + object id word (4).
pub const TRIANGLE_STRIDE: usize = 40;
/// Line record: position (12) + colour (4).
pub const LINE_STRIDE: usize = 16;

/// Texture coordinates used when a block carries none, keyed by
/// `(face % 2 + 1) * wireframe`: zeros for filled surfaces, alternating
/// edge patterns for wireframe rendering.
const TEXCOORD_FALLBACK: [[[f32; 2]; 3]; 3] = [
    [[0.0, 0.0], [0.0, 0.0], [0.0, 0.0]],
    [[0.0, 0.0], [0.0, 255.0], [255.0, 0.0]],
    [[255.0, 255.0], [0.0, 0.0], [0.0, 255.0]],
];

pub struct VertexBuffer {
    words: Vec<u32>,
    cursor: usize,
    stride: usize,
}

impl VertexBuffer {
    pub fn new(elements: usize, stride: usize) -> Self {
        Self {
            words: vec![0u32; elements * stride / 4],
            cursor: 0,
            stride,
        }
    }

    fn push_f32(&mut self, v: f32) {
        self.push_u32(v.to_bits());
    }

    fn push_u32(&mut self, v: u32) {
        // Overflow is detected at finish(); never panic mid-fill
        if let Some(slot) = self.words.get_mut(self.cursor) {
            *slot = v;
        }
        self.cursor += 1;
    }

    pub fn written_bytes(&self) -> usize {
        self.cursor * 4
    }

    /// Verifies the byte-exact fill invariant and yields the raw bytes.
    pub fn finish(self) -> Result<Vec<u32>> {
        if self.cursor != self.words.len() {
            bail!(
                "vertex buffer fill mismatch: wrote {} bytes into {} (stride {})",
                self.cursor * 4,
                self.words.len() * 4,
                self.stride
            );
        }
        Ok(self.words)
    }
}

/// One 24-byte record per point. Sizes scale the object's point size;
/// point type 0 means untyped (-1 to the shader).
pub fn load_points(
    buf: &mut VertexBuffer,
    geom: &Geometry,
    lookup: &ColourLookup,
    pointsize: f32,
    pointtype: i32,
) {
    let ptype = if pointtype > 0 {
        (pointtype - 1) as f32
    } else {
        -1.0
    };
    for i in 0..geom.vertex_count() {
        let i3 = i * 3;
        buf.push_f32(geom.vertices[i3]);
        buf.push_f32(geom.vertices[i3 + 1]);
        buf.push_f32(geom.vertices[i3 + 2]);
        buf.push_u32(lookup.colour(i));
        let size = match &geom.sizes {
            Some(sizes) => sizes.get(i).copied().unwrap_or(1.0) * pointsize,
            None => pointsize,
        };
        buf.push_f32(size);
        buf.push_f32(ptype);
    }
}

/// One 40-byte record per triangle corner, expanded from the index
/// list so the depth sort can emit corner triples directly. A single
/// normal triple in the block is shared flat across every corner.
pub fn load_triangles(
    buf: &mut VertexBuffer,
    geom: &Geometry,
    lookup: &ColourLookup,
    object_id: u32,
    wireframe: bool,
) {
    let t = usize::from(wireframe);
    for (face, tri) in geom.indices.chunks_exact(3).enumerate() {
        let fallback = &TEXCOORD_FALLBACK[(face % 2 + 1) * t];
        for (corner, &id) in tri.iter().enumerate() {
            let id = id as usize;
            let id3 = id * 3;
            buf.push_f32(geom.vertices[id3]);
            buf.push_f32(geom.vertices[id3 + 1]);
            buf.push_f32(geom.vertices[id3 + 2]);
            match &geom.normals {
                Some(normals) if normals.len() == 3 => {
                    buf.push_f32(normals[0]);
                    buf.push_f32(normals[1]);
                    buf.push_f32(normals[2]);
                }
                Some(normals) => {
                    buf.push_f32(normals[id3]);
                    buf.push_f32(normals[id3 + 1]);
                    buf.push_f32(normals[id3 + 2]);
                }
                None => {
                    buf.push_f32(0.0);
                    buf.push_f32(0.0);
                    buf.push_f32(0.0);
                }
            }
            buf.push_u32(lookup.colour(id));
            match &geom.texcoords {
                Some(texcoords) => {
                    buf.push_f32(texcoords[id * 2]);
                    buf.push_f32(texcoords[id * 2 + 1]);
                }
                None => {
                    buf.push_f32(fallback[corner][0]);
                    buf.push_f32(fallback[corner][1]);
                }
            }
            buf.push_u32(object_id);
        }
    }
}

/// One 16-byte record per line vertex.
pub fn load_lines(buf: &mut VertexBuffer, geom: &Geometry, lookup: &ColourLookup) {
    for i in 0..geom.vertex_count() {
        let i3 = i * 3;
        buf.push_f32(geom.vertices[i3]);
        buf.push_f32(geom.vertices[i3 + 1]);
        buf.push_f32(geom.vertices[i3 + 2]);
        buf.push_u32(lookup.colour(i));
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use scenejson::Colour;

    fn lookup(geom: &Geometry) -> ColourLookup<'_> {
        ColourLookup::new(geom, None, Colour::from_rgba(1, 2, 3, 1.0), 1.0)
    }

    #[test]
    fn point_fill_is_byte_exact() {
        let geom = Geometry {
            vertices: vec![0.0; 6],
            sizes: Some(vec![2.0, 3.0]),
            ..Geometry::default()
        };
        let mut buf = VertexBuffer::new(2, POINT_STRIDE);
        load_points(&mut buf, &geom, &lookup(&geom), 10.0, 0);
        assert_eq!(buf.written_bytes(), 2 * POINT_STRIDE);
        let words = buf.finish().unwrap();
        // Second record: size = sizes[1] * pointsize, untyped marker
        assert_eq!(f32::from_bits(words[10]), 30.0);
        assert_eq!(f32::from_bits(words[11]), -1.0);
    }

    #[test]
    fn triangle_fill_expands_corners() {
        let geom = Geometry {
            vertices: vec![0.0, 0.0, 0.0, 1.0, 0.0, 0.0, 0.0, 1.0, 0.0, 1.0, 1.0, 0.0],
            indices: vec![0, 1, 2, 1, 3, 2],
            normals: Some(vec![0.0, 0.0, 1.0]),
            ..Geometry::default()
        };
        let mut buf = VertexBuffer::new(geom.indices.len(), TRIANGLE_STRIDE);
        load_triangles(&mut buf, &geom, &lookup(&geom), 7, false);
        let words = buf.finish().unwrap();
        assert_eq!(words.len(), 6 * TRIANGLE_STRIDE / 4);
        // Shared flat normal on every corner
        for corner in 0..6 {
            assert_eq!(f32::from_bits(words[corner * 10 + 5]), 1.0);
        }
        // Object id word closes each record
        assert_eq!(words[9], 7);
        assert_eq!(words[59], 7);
    }

    #[test]
    fn wireframe_texcoords_alternate_by_face() {
        let geom = Geometry {
            vertices: vec![0.0; 9],
            indices: vec![0, 1, 2, 0, 1, 2],
            ..Geometry::default()
        };
        let mut buf = VertexBuffer::new(6, TRIANGLE_STRIDE);
        load_triangles(&mut buf, &geom, &lookup(&geom), 0, true);
        let words = buf.finish().unwrap();
        // Face 0 uses pattern 1: corner 1 texcoord is (0, 255)
        assert_eq!(f32::from_bits(words[17]), 0.0);
        assert_eq!(f32::from_bits(words[18]), 255.0);
        // Face 1 uses pattern 2: corner 0 texcoord is (255, 255)
        assert_eq!(f32::from_bits(words[37]), 255.0);
        assert_eq!(f32::from_bits(words[38]), 255.0);
    }

    #[test]
    fn filled_surfaces_get_zero_texcoords() {
        let geom = Geometry {
            vertices: vec![0.0; 9],
            indices: vec![0, 1, 2],
            ..Geometry::default()
        };
        let mut buf = VertexBuffer::new(3, TRIANGLE_STRIDE);
        load_triangles(&mut buf, &geom, &lookup(&geom), 0, false);
        let words = buf.finish().unwrap();
        for corner in 0..3 {
            assert_eq!(f32::from_bits(words[corner * 10 + 7]), 0.0);
            assert_eq!(f32::from_bits(words[corner * 10 + 8]), 0.0);
        }
    }

    #[test]
    fn line_fill_is_byte_exact() {
        let geom = Geometry {
            vertices: vec![1.0, 2.0, 3.0, 4.0, 5.0, 6.0],
            ..Geometry::default()
        };
        let mut buf = VertexBuffer::new(2, LINE_STRIDE);
        load_lines(&mut buf, &geom, &lookup(&geom));
        assert_eq!(buf.written_bytes(), 2 * LINE_STRIDE);
        let words = buf.finish().unwrap();
        assert_eq!(f32::from_bits(words[4]), 4.0);
    }

    #[test]
    fn fill_mismatch_is_an_error() {
        let geom = Geometry {
            vertices: vec![0.0; 6],
            ..Geometry::default()
        };
        // Capacity for one point, data for two
        let mut buf = VertexBuffer::new(1, POINT_STRIDE);
        load_points(&mut buf, &geom, &lookup(&geom), 1.0, 0);
        assert!(buf.finish().is_err());

        // Capacity for two, data for one
        let short = Geometry {
            vertices: vec![0.0; 3],
            ..Geometry::default()
        };
        let mut buf = VertexBuffer::new(2, POINT_STRIDE);
        load_points(&mut buf, &short, &lookup(&short), 1.0, 0);
        assert!(buf.finish().is_err());
    }
}
