//! Decoding of raw geometry attributes into typed arrays.
//!
//! Wire data is either a literal JSON number list or a base64 blob of
//! little-endian f32 (u32 for colours and indices). Decode also derives
//! what the wire format leaves implicit: value ranges, and indices for
//! line blocks and gridded triangle surfaces.

use crate::model::{Attrib, AttribData, Family, GeometryBlock, Scene};
use crate::DecodeError;
use base64::engine::general_purpose::STANDARD as BASE64;
use base64::Engine;

/// A geometry block's attributes decoded to typed arrays.
#[derive(Debug, Clone, Default)]
pub struct Geometry {
    /// Flat xyz triples.
    pub vertices: Vec<f32>,
    /// Per-vertex normals, or a single shared triple.
    pub normals: Option<Vec<f32>>,
    /// Scalar per vertex (resampled when shorter).
    pub values: Option<Vec<f32>>,
    pub values_min: f32,
    pub values_max: f32,
    /// Integer-typed raw values: pre-packed colours, not scalars.
    pub values_packed: Option<Vec<u32>>,
    /// Explicit packed RGBA per vertex (resampled when shorter).
    pub colours: Option<Vec<u32>>,
    pub sizes: Option<Vec<f32>>,
    pub texcoords: Option<Vec<f32>>,
    /// Vertex indices; 3 per triangle, 2 per segment, empty for points.
    pub indices: Vec<u32>,
    /// Grid dimensions for surface blocks, zero when not gridded.
    pub width: u32,
    pub height: u32,
}

impl Geometry {
    pub fn vertex_count(&self) -> usize {
        self.vertices.len() / 3
    }

    pub fn triangle_count(&self) -> usize {
        self.indices.len() / 3
    }

    /// Cross-sections are gridded slices whose quads must always draw
    /// last; they get no sort centroid.
    pub fn is_cross_section(&self) -> bool {
        self.width > 0
    }
}

fn decode_f32(attr: &Attrib) -> Result<Vec<f32>, DecodeError> {
    match &attr.data {
        AttribData::Encoded(text) => {
            let bytes = BASE64.decode(text)?;
            if bytes.len() % 4 != 0 {
                return Err(DecodeError::Truncated(bytes.len()));
            }
            Ok(bytes
                .chunks_exact(4)
                .map(|c| f32::from_le_bytes([c[0], c[1], c[2], c[3]]))
                .collect())
        }
        AttribData::Literal(nums) => Ok(nums.iter().map(|&v| v as f32).collect()),
    }
}

fn decode_u32(attr: &Attrib) -> Result<Vec<u32>, DecodeError> {
    match &attr.data {
        AttribData::Encoded(text) => {
            let bytes = BASE64.decode(text)?;
            if bytes.len() % 4 != 0 {
                return Err(DecodeError::Truncated(bytes.len()));
            }
            Ok(bytes
                .chunks_exact(4)
                .map(|c| u32::from_le_bytes([c[0], c[1], c[2], c[3]]))
                .collect())
        }
        AttribData::Literal(nums) => Ok(nums.iter().map(|&v| v as u32).collect()),
    }
}

/// Decodes one geometry block. On success the block's `geom` field is
/// populated and the raw attributes are left in place for round-trips.
pub fn decode_block(block: &mut GeometryBlock, family: Family) -> Result<(), DecodeError> {
    let vertices = match &block.vertices {
        Some(attr) => decode_f32(attr)?,
        None => return Err(DecodeError::NoVertices),
    };
    if vertices.is_empty() || vertices.len() % 3 != 0 {
        return Err(DecodeError::LengthMismatch {
            attr: "vertices",
            got: vertices.len(),
            expect: vertices.len() / 3,
        });
    }
    let vertex_count = vertices.len() / 3;

    let mut geom = Geometry {
        vertices,
        width: block.width.unwrap_or(0),
        height: block.height.unwrap_or(0),
        ..Geometry::default()
    };

    if let Some(attr) = &block.normals {
        let normals = decode_f32(attr)?;
        // A single shared triple is a flat surface normal
        if normals.len() != 3 && normals.len() != geom.vertices.len() {
            return Err(DecodeError::LengthMismatch {
                attr: "normals",
                got: normals.len(),
                expect: vertex_count,
            });
        }
        geom.normals = Some(normals);
    }

    if let Some(attr) = &block.values {
        if attr.integer_typed() {
            geom.values_packed = Some(decode_u32(attr)?);
        } else {
            let values = decode_f32(attr)?;
            // Ranges cached on the wire take precedence over the data
            let (mut min, mut max) = (f32::MAX, f32::MIN);
            for &v in &values {
                min = min.min(v);
                max = max.max(v);
            }
            geom.values_min = attr.minimum.map(|v| v as f32).unwrap_or(min);
            geom.values_max = attr.maximum.map(|v| v as f32).unwrap_or(max);
            geom.values = Some(values);
        }
    }

    if let Some(attr) = &block.colours {
        geom.colours = Some(decode_u32(attr)?);
    }
    if let Some(attr) = &block.sizes {
        geom.sizes = Some(decode_f32(attr)?);
    }
    if let Some(attr) = &block.texcoords {
        let texcoords = decode_f32(attr)?;
        if texcoords.len() != vertex_count * 2 {
            return Err(DecodeError::LengthMismatch {
                attr: "texcoords",
                got: texcoords.len(),
                expect: vertex_count,
            });
        }
        geom.texcoords = Some(texcoords);
    }

    geom.indices = match &block.indices {
        Some(attr) => decode_u32(attr)?,
        None => match family {
            Family::Lines => (0..vertex_count as u32).collect(),
            Family::Triangles => grid_indices(geom.width, geom.height)?,
            _ => Vec::new(),
        },
    };
    for &index in &geom.indices {
        if index as usize >= vertex_count {
            return Err(DecodeError::IndexRange {
                index,
                vertices: vertex_count,
            });
        }
    }

    block.geom = Some(geom);
    Ok(())
}

/// Two triangles per grid cell, fixed winding, matching the surface
/// strips the server emits without explicit indices.
fn grid_indices(width: u32, height: u32) -> Result<Vec<u32>, DecodeError> {
    if width < 2 || height < 2 {
        return Err(DecodeError::NoGridDims);
    }
    let mut buf = Vec::with_capacity(((width - 1) * (height - 1) * 6) as usize);
    for j in 0..height - 1 {
        let offset0 = j * width;
        let offset1 = (j + 1) * width;
        for k in 0..width - 1 {
            buf.push(offset0 + k);
            buf.push(offset1 + k);
            buf.push(offset0 + k + 1);

            buf.push(offset1 + k);
            buf.push(offset0 + k + 1);
            buf.push(offset1 + k + 1);
        }
    }
    Ok(buf)
}

/// Decodes every geometry block in the scene. A malformed block drops
/// that one block and logs it; the rest of the scene still loads.
pub fn decode_scene(scene: &mut Scene) {
    for (id, obj) in scene.objects.iter_mut().enumerate() {
        let name = obj.name.clone().unwrap_or_else(|| format!("object {id}"));
        for family in Family::ALL {
            for block in obj.blocks_mut(family) {
                match decode_block(block, family) {
                    Ok(()) => {
                        if let Some(geom) = &block.geom {
                            log::debug!(
                                "Loaded {} {} vertices from {}",
                                geom.vertex_count(),
                                family.key(),
                                name
                            );
                        }
                    }
                    Err(err) => {
                        log::error!("Skipping {} block of {}: {}", family.key(), name, err);
                        block.geom = None;
                    }
                }
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::{Attrib, AttribData};
    use base64::engine::general_purpose::STANDARD as BASE64;
    use base64::Engine;

    fn literal(nums: &[f64]) -> Attrib {
        Attrib {
            data: AttribData::Literal(nums.to_vec()),
            minimum: None,
            maximum: None,
            kind: None,
        }
    }

    fn encoded_f32(vals: &[f32]) -> Attrib {
        let mut bytes = Vec::new();
        for v in vals {
            bytes.extend_from_slice(&v.to_le_bytes());
        }
        Attrib {
            data: AttribData::Encoded(BASE64.encode(bytes)),
            minimum: None,
            maximum: None,
            kind: None,
        }
    }

    #[test]
    fn base64_little_endian_round_trip() {
        let mut block = GeometryBlock {
            vertices: Some(encoded_f32(&[1.0, 2.5, -3.0])),
            ..GeometryBlock::default()
        };
        decode_block(&mut block, Family::Points).unwrap();
        assert_eq!(block.geom.unwrap().vertices, vec![1.0, 2.5, -3.0]);
    }

    #[test]
    fn value_range_computed_only_when_absent() {
        let mut block = GeometryBlock {
            vertices: Some(literal(&[0.0; 9])),
            values: Some(literal(&[5.0, -1.0, 3.0])),
            ..GeometryBlock::default()
        };
        decode_block(&mut block, Family::Points).unwrap();
        let geom = block.geom.as_ref().unwrap();
        assert_eq!(geom.values_min, -1.0);
        assert_eq!(geom.values_max, 5.0);

        // Supplied bounds win even when the data disagrees
        let mut block = GeometryBlock {
            vertices: Some(literal(&[0.0; 9])),
            values: Some(Attrib {
                minimum: Some(0.0),
                maximum: Some(10.0),
                ..literal(&[5.0, -1.0, 3.0])
            }),
            ..GeometryBlock::default()
        };
        decode_block(&mut block, Family::Points).unwrap();
        let geom = block.geom.as_ref().unwrap();
        assert_eq!(geom.values_min, 0.0);
        assert_eq!(geom.values_max, 10.0);
    }

    #[test]
    fn line_indices_synthesized() {
        let mut block = GeometryBlock {
            vertices: Some(literal(&[0.0; 12])),
            ..GeometryBlock::default()
        };
        decode_block(&mut block, Family::Lines).unwrap();
        assert_eq!(block.geom.unwrap().indices, vec![0, 1, 2, 3]);
    }

    #[test]
    fn grid_indices_two_triangles_per_cell() {
        // 3x2 grid: two cells, four triangles
        let mut block = GeometryBlock {
            vertices: Some(literal(&[0.0; 18])),
            width: Some(3),
            height: Some(2),
            ..GeometryBlock::default()
        };
        decode_block(&mut block, Family::Triangles).unwrap();
        let geom = block.geom.unwrap();
        assert_eq!(
            geom.indices,
            vec![0, 3, 1, 3, 1, 4, 1, 4, 2, 4, 2, 5]
        );
        assert!(geom.is_cross_section());
    }

    #[test]
    fn out_of_range_index_rejected() {
        let mut block = GeometryBlock {
            vertices: Some(literal(&[0.0; 9])),
            indices: Some(literal(&[0.0, 1.0, 7.0])),
            ..GeometryBlock::default()
        };
        let err = decode_block(&mut block, Family::Triangles).unwrap_err();
        assert!(matches!(err, DecodeError::IndexRange { index: 7, .. }));
    }

    #[test]
    fn integer_values_kept_packed() {
        let mut block = GeometryBlock {
            vertices: Some(literal(&[0.0; 9])),
            values: Some(Attrib {
                kind: Some("integer".to_string()),
                ..literal(&[0xff00ff00u32 as f64, 1.0, 2.0])
            }),
            ..GeometryBlock::default()
        };
        decode_block(&mut block, Family::Points).unwrap();
        let geom = block.geom.unwrap();
        assert!(geom.values.is_none());
        assert_eq!(geom.values_packed.unwrap()[0], 0xff00ff00);
    }

    #[test]
    fn bad_block_does_not_poison_scene() {
        let mut scene = Scene::default();
        scene.objects.push(crate::model::SceneObject {
            name: Some("good".into()),
            points: vec![GeometryBlock {
                vertices: Some(literal(&[0.0, 0.0, 0.0])),
                ..GeometryBlock::default()
            }],
            ..Default::default()
        });
        scene.objects.push(crate::model::SceneObject {
            name: Some("bad".into()),
            triangles: vec![GeometryBlock {
                vertices: Some(literal(&[0.0; 9])),
                indices: Some(literal(&[9.0, 0.0, 1.0])),
                ..GeometryBlock::default()
            }],
            ..Default::default()
        });
        decode_scene(&mut scene);
        assert!(scene.objects[0].points[0].geom.is_some());
        assert!(scene.objects[1].triangles[0].geom.is_none());
    }
}
