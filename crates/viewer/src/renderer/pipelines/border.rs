//! Bounding-box wireframe: a fixed eight-vertex cuboid with 24 line
//! indices, rebuilt only when the box itself changes.

use glam::Mat4;
use wgpu::util::DeviceExt;

#[repr(C)]
#[derive(Copy, Clone, Debug, bytemuck::Pod, bytemuck::Zeroable)]
pub struct BorderUniforms {
    pub model_view_proj: Mat4, // 64
    pub colour: [f32; 4],      // +16 -> 80
}

const _: [(); 80] = [(); core::mem::size_of::<BorderUniforms>()];

/// Edge list of the cuboid: top ring, bottom ring, four verticals.
const BOX_INDICES: [u16; 24] = [
    0, 1, 1, 2, 2, 3, 3, 0, //
    4, 5, 5, 6, 6, 7, 7, 4, //
    0, 4, 3, 7, 1, 5, 2, 6,
];

fn box_vertices(min: [f32; 3], max: [f32; 3]) -> [[f32; 3]; 8] {
    [
        [min[0], min[1], max[2]],
        [min[0], max[1], max[2]],
        [max[0], max[1], max[2]],
        [max[0], min[1], max[2]],
        [min[0], min[1], min[2]],
        [min[0], max[1], min[2]],
        [max[0], max[1], min[2]],
        [max[0], min[1], min[2]],
    ]
}

pub struct BorderPipeline {
    pipeline: wgpu::RenderPipeline,
    bind_group: wgpu::BindGroup,
    uniform_buffer: wgpu::Buffer,
    vertex_buffer: wgpu::Buffer,
    index_buffer: wgpu::Buffer,
    bbox: ([f32; 3], [f32; 3]),
}

impl BorderPipeline {
    pub fn new(
        device: &wgpu::Device,
        color_fmt: wgpu::TextureFormat,
        depth_fmt: wgpu::TextureFormat,
    ) -> Self {
        let uniform_buffer = device.create_buffer(&wgpu::BufferDescriptor {
            label: Some("Border Uniforms"),
            size: std::mem::size_of::<BorderUniforms>() as u64,
            usage: wgpu::BufferUsages::UNIFORM | wgpu::BufferUsages::COPY_DST,
            mapped_at_creation: false,
        });

        let layout = device.create_bind_group_layout(&wgpu::BindGroupLayoutDescriptor {
            label: Some("Border BGL"),
            entries: &[wgpu::BindGroupLayoutEntry {
                binding: 0,
                visibility: wgpu::ShaderStages::VERTEX | wgpu::ShaderStages::FRAGMENT,
                ty: wgpu::BindingType::Buffer {
                    ty: wgpu::BufferBindingType::Uniform,
                    has_dynamic_offset: false,
                    min_binding_size: None,
                },
                count: None,
            }],
        });
        let bind_group = device.create_bind_group(&wgpu::BindGroupDescriptor {
            label: Some("Border Bind Group"),
            layout: &layout,
            entries: &[wgpu::BindGroupEntry {
                binding: 0,
                resource: uniform_buffer.as_entire_binding(),
            }],
        });

        let vertex_buffer = device.create_buffer(&wgpu::BufferDescriptor {
            label: Some("Border VB"),
            size: (8 * 3 * 4) as u64,
            usage: wgpu::BufferUsages::VERTEX | wgpu::BufferUsages::COPY_DST,
            mapped_at_creation: false,
        });
        let index_buffer = device.create_buffer_init(&wgpu::util::BufferInitDescriptor {
            label: Some("Border IB"),
            contents: bytemuck::cast_slice(&BOX_INDICES),
            usage: wgpu::BufferUsages::INDEX,
        });

        let shader = device.create_shader_module(wgpu::ShaderModuleDescriptor {
            label: Some("Border WGSL"),
            source: wgpu::ShaderSource::Wgsl(BORDER_WGSL.into()),
        });

        let pipeline_layout = device.create_pipeline_layout(&wgpu::PipelineLayoutDescriptor {
            label: Some("Border Pipeline Layout"),
            bind_group_layouts: &[&layout],
            push_constant_ranges: &[],
        });

        let pipeline = device.create_render_pipeline(&wgpu::RenderPipelineDescriptor {
            label: Some("Border Pipeline"),
            layout: Some(&pipeline_layout),
            vertex: wgpu::VertexState {
                module: &shader,
                entry_point: "vs_main",
                buffers: &[wgpu::VertexBufferLayout {
                    array_stride: 12,
                    step_mode: wgpu::VertexStepMode::Vertex,
                    attributes: &wgpu::vertex_attr_array![0 => Float32x3],
                }],
                compilation_options: wgpu::PipelineCompilationOptions::default(),
            },
            fragment: Some(wgpu::FragmentState {
                module: &shader,
                entry_point: "fs_main",
                targets: &[Some(wgpu::ColorTargetState {
                    format: color_fmt,
                    blend: Some(wgpu::BlendState::ALPHA_BLENDING),
                    write_mask: wgpu::ColorWrites::ALL,
                })],
                compilation_options: wgpu::PipelineCompilationOptions::default(),
            }),
            primitive: wgpu::PrimitiveState {
                topology: wgpu::PrimitiveTopology::LineList,
                ..wgpu::PrimitiveState::default()
            },
            depth_stencil: Some(super::depth_state(depth_fmt)),
            multisample: wgpu::MultisampleState::default(),
            multiview: None,
        });

        Self {
            pipeline,
            bind_group,
            uniform_buffer,
            vertex_buffer,
            index_buffer,
            bbox: ([f32::MAX; 3], [f32::MAX; 3]),
        }
    }

    /// Uploads box vertices when the bounding box changed.
    pub fn update_box(&mut self, queue: &wgpu::Queue, min: [f32; 3], max: [f32; 3]) {
        if self.bbox == (min, max) {
            return;
        }
        self.bbox = (min, max);
        queue.write_buffer(
            &self.vertex_buffer,
            0,
            bytemuck::cast_slice(&box_vertices(min, max)),
        );
    }

    pub fn write_uniforms(&self, queue: &wgpu::Queue, uniforms: &BorderUniforms) {
        queue.write_buffer(&self.uniform_buffer, 0, bytemuck::bytes_of(uniforms));
    }

    pub fn draw<'a>(&'a self, rpass: &mut wgpu::RenderPass<'a>) {
        rpass.set_pipeline(&self.pipeline);
        rpass.set_bind_group(0, &self.bind_group, &[]);
        rpass.set_vertex_buffer(0, self.vertex_buffer.slice(..));
        rpass.set_index_buffer(self.index_buffer.slice(..), wgpu::IndexFormat::Uint16);
        rpass.draw_indexed(0..24, 0, 0..1);
    }
}

const BORDER_WGSL: &str = r#"
struct BorderUniforms {
    model_view_proj: mat4x4<f32>,
    colour: vec4<f32>,
};
@group(0) @binding(0) var<uniform> U: BorderUniforms;

@vertex
fn vs_main(@location(0) pos: vec3<f32>) -> @builtin(position) vec4<f32> {
    return U.model_view_proj * vec4<f32>(pos, 1.0);
}

@fragment
fn fs_main() -> @location(0) vec4<f32> {
    return U.colour;
}
"#;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn box_vertices_cover_all_corners() {
        let verts = box_vertices([0.0, 0.0, 0.0], [1.0, 2.0, 3.0]);
        assert_eq!(verts[0], [0.0, 0.0, 3.0]);
        assert_eq!(verts[6], [1.0, 2.0, 0.0]);
        // Every corner appears exactly once
        let mut seen = std::collections::HashSet::new();
        for v in verts {
            assert!(seen.insert(format!("{v:?}")));
        }
    }

    #[test]
    fn every_edge_connects_distinct_corners() {
        for pair in BOX_INDICES.chunks_exact(2) {
            assert_ne!(pair[0], pair[1]);
            assert!(pair[0] < 8 && pair[1] < 8);
        }
        // 12 edges, each corner on exactly 3 of them
        let mut degree = [0u32; 8];
        for &i in &BOX_INDICES {
            degree[i as usize] += 1;
        }
        assert!(degree.iter().all(|&d| d == 3));
    }
}
