//! Triangle renderer: 40-byte corner records, indexed in depth-sorted
//! triple order. Face culling is per object, so it happens in the
//! fragment shader from a uniform flag array rather than pipeline state.

use super::{depth_state, scene_uniform_binding, SceneUniforms, COMMON_WGSL, TRANSPARENCY_BLEND};
use crate::vertex::TRIANGLE_STRIDE;

/// Cull flags are packed four per vec4<u32> uniform slot.
pub const MAX_OBJECTS: usize = 64;

#[repr(C)]
#[derive(Copy, Clone, Debug, bytemuck::Pod, bytemuck::Zeroable)]
pub struct CullUniforms {
    pub flags: [[u32; 4]; MAX_OBJECTS / 4],
}

const _: [(); 256] = [(); core::mem::size_of::<CullUniforms>()];

impl CullUniforms {
    pub fn from_flags(cullface: &[bool]) -> Self {
        let mut flags = [[0u32; 4]; MAX_OBJECTS / 4];
        for (id, &cull) in cullface.iter().take(MAX_OBJECTS).enumerate() {
            flags[id / 4][id % 4] = u32::from(cull);
        }
        Self { flags }
    }
}

pub struct TrianglePipeline {
    pipeline: wgpu::RenderPipeline,
    bind_group: wgpu::BindGroup,
    cull_bind_group: wgpu::BindGroup,
    uniform_buffer: wgpu::Buffer,
    cull_buffer: wgpu::Buffer,
}

impl TrianglePipeline {
    pub fn new(
        device: &wgpu::Device,
        color_fmt: wgpu::TextureFormat,
        depth_fmt: wgpu::TextureFormat,
    ) -> Self {
        let (uniform_buffer, scene_layout, bind_group) =
            scene_uniform_binding(device, "Triangle Uniforms");

        let cull_buffer = device.create_buffer(&wgpu::BufferDescriptor {
            label: Some("Cull Flag Uniforms"),
            size: std::mem::size_of::<CullUniforms>() as u64,
            usage: wgpu::BufferUsages::UNIFORM | wgpu::BufferUsages::COPY_DST,
            mapped_at_creation: false,
        });
        let cull_layout = device.create_bind_group_layout(&wgpu::BindGroupLayoutDescriptor {
            label: Some("Cull Flag BGL"),
            entries: &[wgpu::BindGroupLayoutEntry {
                binding: 0,
                visibility: wgpu::ShaderStages::FRAGMENT,
                ty: wgpu::BindingType::Buffer {
                    ty: wgpu::BufferBindingType::Uniform,
                    has_dynamic_offset: false,
                    min_binding_size: None,
                },
                count: None,
            }],
        });
        let cull_bind_group = device.create_bind_group(&wgpu::BindGroupDescriptor {
            label: Some("Cull Flag Bind Group"),
            layout: &cull_layout,
            entries: &[wgpu::BindGroupEntry {
                binding: 0,
                resource: cull_buffer.as_entire_binding(),
            }],
        });

        let shader = device.create_shader_module(wgpu::ShaderModuleDescriptor {
            label: Some("Triangle WGSL"),
            source: wgpu::ShaderSource::Wgsl(format!("{COMMON_WGSL}{TRIANGLE_WGSL}").into()),
        });

        let pipeline_layout = device.create_pipeline_layout(&wgpu::PipelineLayoutDescriptor {
            label: Some("Triangle Pipeline Layout"),
            bind_group_layouts: &[&scene_layout, &cull_layout],
            push_constant_ranges: &[],
        });

        let pipeline = device.create_render_pipeline(&wgpu::RenderPipelineDescriptor {
            label: Some("Triangle Pipeline"),
            layout: Some(&pipeline_layout),
            vertex: wgpu::VertexState {
                module: &shader,
                entry_point: "vs_main",
                buffers: &[wgpu::VertexBufferLayout {
                    array_stride: TRIANGLE_STRIDE as u64,
                    step_mode: wgpu::VertexStepMode::Vertex,
                    attributes: &wgpu::vertex_attr_array![
                        0 => Float32x3,
                        1 => Float32x3,
                        2 => Unorm8x4,
                        3 => Float32x2,
                        4 => Uint32,
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
                topology: wgpu::PrimitiveTopology::TriangleList,
                cull_mode: None,
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
            cull_buffer,
            cull_bind_group,
        }
    }

    pub fn write_uniforms(
        &self,
        queue: &wgpu::Queue,
        uniforms: &SceneUniforms,
        cull: &CullUniforms,
    ) {
        queue.write_buffer(&self.uniform_buffer, 0, bytemuck::bytes_of(uniforms));
        queue.write_buffer(&self.cull_buffer, 0, bytemuck::bytes_of(cull));
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
        rpass.set_bind_group(1, &self.cull_bind_group, &[]);
        rpass.set_vertex_buffer(0, vertices.slice(..));
        rpass.set_index_buffer(indices.slice(..), wgpu::IndexFormat::Uint32);
        rpass.draw_indexed(0..count, 0, 0..1);
    }
}

const TRIANGLE_WGSL: &str = r#"
struct CullUniforms {
    flags: array<vec4<u32>, 16>,
};
@group(1) @binding(0) var<uniform> C: CullUniforms;

struct VSOut {
    @builtin(position) clip: vec4<f32>,
    @location(0) colour: vec4<f32>,
    @location(1) model_pos: vec3<f32>,
    @location(2) eye_normal: vec3<f32>,
    @location(3) @interpolate(flat) object_id: u32,
}

@vertex
fn vs_main(
    @location(0) pos: vec3<f32>,
    @location(1) normal: vec3<f32>,
    @location(2) colour: vec4<f32>,
    @location(3) texcoord: vec2<f32>,
    @location(4) object_id: u32,
) -> VSOut {
    var out: VSOut;
    out.clip = U.model_view_proj * vec4<f32>(pos, 1.0);
    out.colour = colour;
    out.model_pos = pos;
    out.eye_normal = (U.model_view * vec4<f32>(normal, 0.0)).xyz;
    out.object_id = object_id;
    return out;
}

@fragment
fn fs_main(in: VSOut, @builtin(front_facing) front_facing: bool) -> @location(0) vec4<f32> {
    if (clipped(in.model_pos)) {
        discard;
    }
    if (C.flags[in.object_id / 4u][in.object_id % 4u] != 0u && !front_facing) {
        discard;
    }

    // Headlight shading: light travels down the eye-space Z axis.
    var n = in.eye_normal;
    if (length(n) < 0.0001) {
        n = vec3<f32>(0.0, 0.0, 1.0);
    } else {
        n = normalize(n);
    }
    let lambert = abs(n.z);
    var lit = in.colour.rgb * (U.ambient + U.diffuse * lambert);
    if (U.specular > 0.0) {
        lit += vec3<f32>(U.specular * pow(lambert, 32.0));
    }
    let rgb = adjust_colour(lit);
    return vec4<f32>(rgb, in.colour.a * U.opacity);
}
"#;
