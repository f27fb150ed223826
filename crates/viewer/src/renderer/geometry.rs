//! Per-family geometry state: interleaved vertex buffers, the sort
//! positions cache and the depth-ordered index buffers.
//!
//! Two dirty flags drive the update path and are serviced in order on
//! each draw: `reload` rebuilds the vertex buffer (geometry or
//! attributes changed) and implies a re-sort; `sort` rebuilds only the
//! index buffer from cached positions. The positions cache survives
//! pure rotations, since model-space centroids do not move.

use crate::colour::{triangle_centroids, ColourLookup};
use crate::depth::{DepthKeyBuilder, FARTHEST_KEY};
use crate::sort::{msb_radix_sort, SortIdx};
use crate::vertex::{
    load_lines, load_points, load_triangles, VertexBuffer, LINE_STRIDE, POINT_STRIDE,
    TRIANGLE_STRIDE,
};
use anyhow::Result;
use glam::Mat4;
use scenejson::{Family, Scene};
use wgpu::util::DeviceExt;

/// Sort slot for one primitive.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum SortPos {
    /// Object hidden: excluded from the index buffer entirely.
    Hidden,
    /// No usable position (cross-section): sentinel key, drawn last.
    DrawLast,
    /// Model-space centroid or vertex.
    At([f32; 3]),
}

/// Collects one sort position per primitive, in vertex-buffer order.
/// Hidden objects still occupy slots so indices stay aligned with the
/// vertex buffer.
pub fn collect_positions(scene: &Scene, family: Family) -> Vec<SortPos> {
    let mut positions = Vec::new();
    for obj in &scene.objects {
        let visible = obj.is_visible();
        for block in obj.blocks(family) {
            let Some(geom) = &block.geom else { continue };
            match family {
                Family::Points => {
                    for i in 0..geom.vertex_count() {
                        positions.push(if visible {
                            let i3 = i * 3;
                            SortPos::At([
                                geom.vertices[i3],
                                geom.vertices[i3 + 1],
                                geom.vertices[i3 + 2],
                            ])
                        } else {
                            SortPos::Hidden
                        });
                    }
                }
                Family::Triangles => {
                    let centroids = triangle_centroids(geom);
                    for t in 0..geom.triangle_count() {
                        positions.push(if !visible {
                            SortPos::Hidden
                        } else if centroids.is_empty() {
                            SortPos::DrawLast
                        } else if centroids.len() == 1 {
                            SortPos::At(centroids[0])
                        } else {
                            SortPos::At(centroids[t])
                        });
                    }
                }
                _ => {}
            }
        }
    }
    positions
}

/// Depth-sorts the primitives and emits the index buffer: singleton
/// indices for points, corner triples for triangles. Ascending key
/// order is back-to-front.
pub fn sorted_indices(
    positions: &[SortPos],
    family: Family,
    model_view: &Mat4,
    bbox_min: [f32; 3],
    bbox_max: [f32; 3],
) -> Vec<u32> {
    let builder = DepthKeyBuilder::new(model_view, bbox_min, bbox_max);
    let mut distances = Vec::with_capacity(positions.len());
    for (i, pos) in positions.iter().enumerate() {
        match pos {
            SortPos::Hidden => {}
            SortPos::DrawLast => distances.push(SortIdx {
                idx: i as u32,
                key: FARTHEST_KEY,
            }),
            SortPos::At(p) => distances.push(SortIdx {
                idx: i as u32,
                key: builder.key(*p),
            }),
        }
    }
    msb_radix_sort(&mut distances);

    let mut indices = Vec::with_capacity(match family {
        Family::Triangles => distances.len() * 3,
        _ => distances.len(),
    });
    for d in &distances {
        match family {
            Family::Triangles => {
                let i3 = d.idx * 3;
                indices.push(i3);
                indices.push(i3 + 1);
                indices.push(i3 + 2);
            }
            _ => indices.push(d.idx),
        }
    }
    indices
}

/// Line indices in original order, rebased per block onto the shared
/// vertex buffer. Hidden objects contribute nothing; no depth sort.
pub fn line_indices(scene: &Scene) -> Vec<u32> {
    let mut indices = Vec::new();
    let mut base = 0u32;
    for obj in &scene.objects {
        let visible = obj.is_visible();
        for block in obj.blocks(Family::Lines) {
            let Some(geom) = &block.geom else { continue };
            if visible {
                indices.extend(geom.indices.iter().map(|&i| base + i));
            }
            base += geom.vertex_count() as u32;
        }
    }
    indices
}

pub struct FamilyRenderer {
    pub family: Family,
    pub reload: bool,
    pub sort: bool,
    /// Index count to draw; zero skips the family.
    pub elements: u32,
    positions: Option<Vec<SortPos>>,
    pub vertex_buffer: Option<wgpu::Buffer>,
    pub index_buffer: Option<wgpu::Buffer>,
}

impl FamilyRenderer {
    pub fn new(family: Family) -> Self {
        Self {
            family,
            reload: true,
            sort: true,
            elements: 0,
            positions: None,
            vertex_buffer: None,
            index_buffer: None,
        }
    }

    fn stride(&self) -> usize {
        match self.family {
            Family::Points => POINT_STRIDE,
            Family::Triangles => TRIANGLE_STRIDE,
            _ => LINE_STRIDE,
        }
    }

    /// Vertex-buffer capacity in records. Triangles expand per corner.
    fn vb_elements(&self, scene: &Scene) -> usize {
        let mut count = 0;
        for obj in &scene.objects {
            for block in obj.blocks(self.family) {
                if let Some(geom) = &block.geom {
                    count += match self.family {
                        Family::Triangles => geom.indices.len(),
                        _ => geom.vertex_count(),
                    };
                }
            }
        }
        count
    }

    /// Rebuilds the interleaved vertex buffer from the scene. Hidden
    /// objects are included; visibility is an index-buffer concern.
    pub fn update_buffers(&mut self, device: &wgpu::Device, scene: &Scene) -> Result<()> {
        self.positions = None;
        let elements = self.vb_elements(scene);
        if elements == 0 {
            self.vertex_buffer = None;
            self.index_buffer = None;
            self.elements = 0;
            return Ok(());
        }
        log::debug!(
            "Updating {} data ({} elements)",
            self.family.key(),
            elements
        );

        let mut buf = VertexBuffer::new(elements, self.stride());
        for (id, obj) in scene.objects.iter().enumerate() {
            let base = obj.colour.unwrap_or_default();
            let opacity = obj.opacity();
            let map = obj
                .colourmap
                .filter(|&cm| cm >= 0)
                .and_then(|cm| scene.colourmaps.get(cm as usize))
                .map(|cmap| (cmap, cmap.palette()));
            for block in obj.blocks(self.family) {
                let Some(geom) = &block.geom else { continue };
                let lookup = ColourLookup::new(
                    geom,
                    map.as_ref().map(|(cmap, palette)| (*cmap, palette)),
                    base,
                    opacity,
                );
                match self.family {
                    Family::Points => {
                        let pointsize = obj.pointsize.unwrap_or(1.0);
                        let pointtype = obj
                            .pointtype
                            .or(scene.properties.pointtype)
                            .unwrap_or(0);
                        load_points(&mut buf, geom, &lookup, pointsize, pointtype);
                    }
                    Family::Triangles => {
                        load_triangles(
                            &mut buf,
                            geom,
                            &lookup,
                            id as u32,
                            obj.wireframe.unwrap_or(false),
                        );
                    }
                    _ => load_lines(&mut buf, geom, &lookup),
                }
            }
        }

        let words = buf.finish()?;
        self.vertex_buffer = Some(device.create_buffer_init(
            &wgpu::util::BufferInitDescriptor {
                label: Some("Family VB"),
                contents: bytemuck::cast_slice(&words),
                usage: wgpu::BufferUsages::VERTEX,
            },
        ));
        Ok(())
    }

    /// Rebuilds the index buffer in draw order. For sortable families
    /// this runs the depth sort; `rotated` lets the positions cache be
    /// reused. Lines just copy their indices.
    pub fn load_elements(
        &mut self,
        device: &wgpu::Device,
        scene: &Scene,
        model_view: &Mat4,
        bbox: ([f32; 3], [f32; 3]),
        rotated: bool,
    ) {
        let indices = if self.family == Family::Lines {
            line_indices(scene)
        } else {
            if self.positions.is_none() || !rotated {
                self.positions = Some(collect_positions(scene, self.family));
            }
            let positions = self.positions.as_deref().unwrap_or(&[]);
            sorted_indices(positions, self.family, model_view, bbox.0, bbox.1)
        };

        self.elements = indices.len() as u32;
        self.index_buffer = if indices.is_empty() {
            None
        } else {
            Some(
                device.create_buffer_init(&wgpu::util::BufferInitDescriptor {
                    label: Some("Family IB"),
                    contents: bytemuck::cast_slice(&indices),
                    usage: wgpu::BufferUsages::INDEX,
                }),
            )
        };
    }

    /// Drops cached sort positions, forcing the next sort to rebuild
    /// them (visibility changed, geometry reloaded).
    pub fn invalidate_positions(&mut self) {
        self.positions = None;
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use glam::Vec3;
    use scenejson::{Geometry, GeometryBlock, SceneObject};

    fn triangle_block(z: f32) -> GeometryBlock {
        GeometryBlock {
            geom: Some(Geometry {
                vertices: vec![0.0, 0.0, z, 1.0, 0.0, z, 0.0, 1.0, z],
                indices: vec![0, 1, 2],
                ..Geometry::default()
            }),
            ..GeometryBlock::default()
        }
    }

    fn two_triangle_scene() -> Scene {
        let mut scene = Scene::default();
        scene.objects.push(SceneObject {
            name: Some("near".into()),
            triangles: vec![triangle_block(5.0)],
            ..Default::default()
        });
        scene.objects.push(SceneObject {
            name: Some("far".into()),
            triangles: vec![triangle_block(0.0)],
            ..Default::default()
        });
        scene
    }

    // Camera at z=+10 looking toward -Z: z=5 is near, z=0 is far.
    fn looking_down_z() -> Mat4 {
        Mat4::look_at_rh(Vec3::new(0.0, 0.0, 10.0), Vec3::ZERO, Vec3::Y)
    }

    #[test]
    fn two_triangles_draw_back_to_front() {
        let scene = two_triangle_scene();
        let positions = collect_positions(&scene, Family::Triangles);
        assert_eq!(positions.len(), 2);

        let mv = looking_down_z();
        let indices =
            sorted_indices(&positions, Family::Triangles, &mv, [0.0; 3], [1.0, 1.0, 5.0]);
        // Far triangle (slot 1) first, near triangle (slot 0) last
        assert_eq!(indices, vec![3, 4, 5, 0, 1, 2]);
    }

    #[test]
    fn sort_is_idempotent_for_a_fixed_camera() {
        let scene = two_triangle_scene();
        let positions = collect_positions(&scene, Family::Triangles);
        let mv = looking_down_z();
        let a = sorted_indices(&positions, Family::Triangles, &mv, [0.0; 3], [1.0, 1.0, 5.0]);
        let b = sorted_indices(&positions, Family::Triangles, &mv, [0.0; 3], [1.0, 1.0, 5.0]);
        assert_eq!(a, b);
    }

    #[test]
    fn hidden_toggle_round_trips() {
        let mut scene = two_triangle_scene();
        let mv = looking_down_z();
        let bbox = ([0.0; 3], [1.0, 1.0, 5.0]);

        let before = sorted_indices(
            &collect_positions(&scene, Family::Triangles),
            Family::Triangles,
            &mv,
            bbox.0,
            bbox.1,
        );

        scene.objects[0].visible = Some(false);
        let hidden = sorted_indices(
            &collect_positions(&scene, Family::Triangles),
            Family::Triangles,
            &mv,
            bbox.0,
            bbox.1,
        );
        // Only the far triangle remains, and slots did not shift
        assert_eq!(hidden, vec![3, 4, 5]);

        scene.objects[0].visible = Some(true);
        let after = sorted_indices(
            &collect_positions(&scene, Family::Triangles),
            Family::Triangles,
            &mv,
            bbox.0,
            bbox.1,
        );
        assert_eq!(before, after);
    }

    #[test]
    fn cross_sections_draw_last() {
        let mut scene = two_triangle_scene();
        // Farthest possible triangle, but tagged as a cross-section
        scene.objects.push(SceneObject {
            triangles: vec![GeometryBlock {
                geom: Some(Geometry {
                    vertices: vec![0.0, 0.0, -50.0, 1.0, 0.0, -50.0, 0.0, 1.0, -50.0],
                    indices: vec![0, 1, 2],
                    width: 2,
                    height: 2,
                    ..Geometry::default()
                }),
                ..GeometryBlock::default()
            }],
            ..Default::default()
        });

        let positions = collect_positions(&scene, Family::Triangles);
        assert_eq!(positions[2], SortPos::DrawLast);

        let mv = looking_down_z();
        let indices = sorted_indices(
            &positions,
            Family::Triangles,
            &mv,
            [0.0, 0.0, -50.0],
            [1.0, 1.0, 6.0],
        );
        // Sentinel key sorts to the end despite being farthest
        assert_eq!(indices, vec![3, 4, 5, 0, 1, 2, 6, 7, 8]);
    }

    #[test]
    fn hidden_points_keep_buffer_alignment() {
        let mut scene = Scene::default();
        scene.objects.push(SceneObject {
            visible: Some(false),
            points: vec![GeometryBlock {
                geom: Some(Geometry {
                    vertices: vec![0.0; 6],
                    ..Geometry::default()
                }),
                ..GeometryBlock::default()
            }],
            ..Default::default()
        });
        scene.objects.push(SceneObject {
            points: vec![GeometryBlock {
                geom: Some(Geometry {
                    vertices: vec![1.0, 1.0, 1.0],
                    ..Geometry::default()
                }),
                ..GeometryBlock::default()
            }],
            ..Default::default()
        });

        let positions = collect_positions(&scene, Family::Points);
        assert_eq!(positions.len(), 3);
        let indices = sorted_indices(
            &positions,
            Family::Points,
            &looking_down_z(),
            [0.0; 3],
            [1.0; 3],
        );
        // Only the visible point survives, at its unshifted slot
        assert_eq!(indices, vec![2]);
    }

    #[test]
    fn line_indices_ignore_the_camera() {
        let mut scene = Scene::default();
        scene.objects.push(SceneObject {
            lines: vec![
                GeometryBlock {
                    geom: Some(Geometry {
                        vertices: vec![0.0; 9],
                        indices: vec![0, 1, 1, 2],
                        ..Geometry::default()
                    }),
                    ..GeometryBlock::default()
                },
                GeometryBlock {
                    geom: Some(Geometry {
                        vertices: vec![0.0; 6],
                        indices: vec![0, 1],
                        ..Geometry::default()
                    }),
                    ..GeometryBlock::default()
                },
            ],
            ..Default::default()
        });

        let indices = line_indices(&scene);
        // Second block rebased past the first block's three vertices
        assert_eq!(indices, vec![0, 1, 1, 2, 3, 4]);
        // No camera input at all: any pose yields the same order
        assert_eq!(indices, line_indices(&scene));
    }
}
