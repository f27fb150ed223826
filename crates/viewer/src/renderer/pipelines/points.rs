//! Point renderer: 24-byte records drawn as an indexed point list in
//! depth-sorted order. wgpu point primitives are a single pixel, so the
//! per-point size modulates alpha instead of raster extent.

use super::{depth_state, scene_uniform_binding, SceneUniforms, COMMON_WGSL, TRANSPARENCY_BLEND};
use crate::vertex::POINT_STRIDE;

pub struct PointPipeline {
    pipeline: wgpu::RenderPipeline,
    bind_group: wgpu::BindGroup,
    uniform_buffer: wgpu::Buffer,
}

impl PointPipeline {
    pub fn new(
        device: &wgpu::Device,
        color_fmt: wgpu::TextureFormat,
        depth_fmt: wgpu::TextureFormat,
    ) -> Self {
        let (uniform_buffer, layout, bind_group) =
            scene_uniform_binding(device, "Point Uniforms");

        let shader = device.create_shader_module(wgpu::ShaderModuleDescriptor {
            label: Some("Point WGSL"),
            source: wgpu::ShaderSource::Wgsl(format!("{COMMON_WGSL}{POINT_WGSL}").into()),
        });

        let pipeline_layout = device.create_pipeline_layout(&wgpu::PipelineLayoutDescriptor {
            label: Some("Point Pipeline Layout"),
            bind_group_layouts: &[&layout],
            push_constant_ranges: &[],
        });

        let pipeline = device.create_render_pipeline(&wgpu::RenderPipelineDescriptor {
            label: Some("Point Pipeline"),
            layout: Some(&pipeline_layout),
            vertex: wgpu::VertexState {
                module: &shader,
                entry_point: "vs_main",
                buffers: &[wgpu::VertexBufferLayout {
                    array_stride: POINT_STRIDE as u64,
                    step_mode: wgpu::VertexStepMode::Vertex,
                    attributes: &wgpu::vertex_attr_array![
                        0 => Float32x3,
                        1 => Unorm8x4,
                        2 => Float32,
                        3 => Float32,
                    ],
                }],
                compilation_options: wgpu::PipelineCompilationOptions::default(),
            },
            fragment: Some(wgpu::FragmentState {
                module: &shader,
                entry_point: "fs_main",
                targets: &[Some(wgpu::ColorTargetState {
                    format: color_fmt,
                    blend: Some(TRANSPARENCY_BLEND),
                    write_mask: wgpu::ColorWrites::ALL,
                })],
                compilation_options: wgpu::PipelineCompilationOptions::default(),
            }),
            primitive: wgpu::PrimitiveState {
                topology: wgpu::PrimitiveTopology::PointList,
                ..wgpu::PrimitiveState::default()
            },
            depth_stencil: Some(depth_state(depth_fmt)),
            multisample: wgpu::MultisampleState::default(),
            multiview: None,
        });

        Self {
            pipeline,
            bind_group,
            uniform_buffer,
        }
    }

    pub fn write_uniforms(&self, queue: &wgpu::Queue, uniforms: &SceneUniforms) {
        queue.write_buffer(&self.uniform_buffer, 0, bytemuck::bytes_of(uniforms));
    }

    pub fn draw<'a>(
        &'a self,
        rpass: &mut wgpu::RenderPass<'a>,
        vertices: &'a wgpu::Buffer,
        indices: &'a wgpu::Buffer,
        count: u32,
    ) {
        rpass.set_pipeline(&self.pipeline);
        rpass.set_bind_group(0, &self.bind_group, &[]);
        rpass.set_vertex_buffer(0, vertices.slice(..));
        rpass.set_index_buffer(indices.slice(..), wgpu::IndexFormat::Uint32);
        rpass.draw_indexed(0..count, 0, 0..1);
    }
}

const POINT_WGSL: &str = r#"
struct VSOut {
    @builtin(position) clip: vec4<f32>,
    @location(0) colour: vec4<f32>,
    @location(1) model_pos: vec3<f32>,
    @location(2) fade: f32,
}

@vertex
fn vs_main(
    @location(0) pos: vec3<f32>,
    @location(1) colour: vec4<f32>,
    @location(2) size: f32,
    @location(3) point_type: f32,
) -> VSOut {
    var out: VSOut;
    out.clip = U.model_view_proj * vec4<f32>(pos, 1.0);
    out.colour = colour;
    out.model_pos = pos;
    // Sub-unit sizes fade out rather than shrink below one pixel.
    // Untyped points (point_type < 0) draw the same as type 0.
    out.fade = clamp(size * U.point_scale, 0.0, 1.0);
    return out;
}

@fragment
fn fs_main(in: VSOut) -> @location(0) vec4<f32> {
    if (clipped(in.model_pos)) {
        discard;
    }
    let rgb = adjust_colour(in.colour.rgb);
    return vec4<f32>(rgb, in.colour.a * in.fade * U.opacity);
}
"#;
