//! One render pipeline per primitive family, each with inline WGSL.

pub mod border;
pub mod lines;
pub mod points;
pub mod triangles;

use glam::Mat4;

/// Blend state for pre-sorted transparency: colour uses source alpha,
/// the alpha channel itself accumulates with One so a transparent
/// surface over another keeps coverage.
pub const TRANSPARENCY_BLEND: wgpu::BlendState = wgpu::BlendState {
    color: wgpu::BlendComponent {
        src_factor: wgpu::BlendFactor::SrcAlpha,
        dst_factor: wgpu::BlendFactor::OneMinusSrcAlpha,
        operation: wgpu::BlendOperation::Add,
    },
    alpha: wgpu::BlendComponent {
        src_factor: wgpu::BlendFactor::One,
        dst_factor: wgpu::BlendFactor::OneMinusSrcAlpha,
        operation: wgpu::BlendOperation::Add,
    },
};

/// Depth state shared by the family pipelines. LEqual so co-planar
/// primitives drawn later (nearer in sort order) still land.
pub fn depth_state(format: wgpu::TextureFormat) -> wgpu::DepthStencilState {
    wgpu::DepthStencilState {
        format,
        depth_write_enabled: true,
        depth_compare: wgpu::CompareFunction::LessEqual,
        stencil: wgpu::StencilState::default(),
        bias: wgpu::DepthBiasState::default(),
    }
}

/// Frame uniforms shared by the family pipelines, std140 layout.
#[repr(C)]
#[derive(Copy, Clone, Debug, bytemuck::Pod, bytemuck::Zeroable)]
pub struct SceneUniforms {
    pub model_view_proj: Mat4, // 64
    pub model_view: Mat4,      // +64 -> 128
    /// World-space clip box, w unused.
    pub clip_min: [f32; 4], // +16 -> 144
    pub clip_max: [f32; 4], // +16 -> 160
    pub ambient: f32,
    pub diffuse: f32,
    pub specular: f32,
    pub opacity: f32, // +16 -> 176
    pub brightness: f32,
    pub contrast: f32,
    pub saturation: f32,
    pub point_scale: f32, // +16 -> 192
}

// Buffer size must match the WGSL-reflected struct size.
const _: [(); 192] = [(); core::mem::size_of::<SceneUniforms>()];

impl Default for SceneUniforms {
    fn default() -> Self {
        Self {
            model_view_proj: Mat4::IDENTITY,
            model_view: Mat4::IDENTITY,
            clip_min: [f32::MIN; 4],
            clip_max: [f32::MAX; 4],
            ambient: 0.4,
            diffuse: 0.8,
            specular: 0.0,
            opacity: 1.0,
            brightness: 0.0,
            contrast: 1.0,
            saturation: 1.0,
            point_scale: 1.0,
        }
    }
}

/// WGSL fragment shared by every family shader: uniform block, clip-box
/// discard and the brightness/contrast/saturation adjustment.
pub const COMMON_WGSL: &str = r#"
struct SceneUniforms {
    model_view_proj: mat4x4<f32>,
    model_view: mat4x4<f32>,
    clip_min: vec4<f32>,
    clip_max: vec4<f32>,
    ambient: f32,
    diffuse: f32,
    specular: f32,
    opacity: f32,
    brightness: f32,
    contrast: f32,
    saturation: f32,
    point_scale: f32,
};
@group(0) @binding(0) var<uniform> U: SceneUniforms;

fn clipped(p: vec3<f32>) -> bool {
    return any(p < U.clip_min.xyz) || any(p > U.clip_max.xyz);
}

fn adjust_colour(c: vec3<f32>) -> vec3<f32> {
    var rgb = c + vec3<f32>(U.brightness);
    rgb = (rgb - vec3<f32>(0.5)) * U.contrast + vec3<f32>(0.5);
    let grey = dot(rgb, vec3<f32>(0.299, 0.587, 0.114));
    rgb = mix(vec3<f32>(grey), rgb, U.saturation);
    return clamp(rgb, vec3<f32>(0.0), vec3<f32>(1.0));
}
"#;

/// Creates the shared scene-uniform buffer, bind group layout and bind
/// group used at group 0 by every family pipeline.
pub fn scene_uniform_binding(
    device: &wgpu::Device,
    label: &str,
) -> (wgpu::Buffer, wgpu::BindGroupLayout, wgpu::BindGroup) {
    let buffer = device.create_buffer(&wgpu::BufferDescriptor {
        label: Some(label),
        size: std::mem::size_of::<SceneUniforms>() as u64,
        usage: wgpu::BufferUsages::UNIFORM | wgpu::BufferUsages::COPY_DST,
        mapped_at_creation: false,
    });
    let layout = device.create_bind_group_layout(&wgpu::BindGroupLayoutDescriptor {
        label: Some(label),
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
        label: Some(label),
        layout: &layout,
        entries: &[wgpu::BindGroupEntry {
            binding: 0,
            resource: buffer.as_entire_binding(),
        }],
    });
    (buffer, layout, bind_group)
}
