//! Rendering orchestrator: GPU context, depth target, per-family
//! geometry state and pipelines, and the frame draw.

pub mod context;
pub mod geometry;
pub mod pipelines;
pub mod targets;

use self::{
    context::GfxContext,
    geometry::FamilyRenderer,
    pipelines::{
        border::{BorderPipeline, BorderUniforms},
        lines::LinePipeline,
        points::PointPipeline,
        triangles::{CullUniforms, TrianglePipeline},
        SceneUniforms,
    },
    targets::Targets,
};
use crate::camera::Camera;
use anyhow::Result;
use scenejson::{Colour, Family, Scene};
use std::sync::Arc;
use winit::window::Window;

/// UI-controlled draw options.
pub struct RenderSettings {
    pub show_border: bool,
    pub point_scale: f32,
}

impl Default for RenderSettings {
    fn default() -> Self {
        Self {
            show_border: true,
            point_scale: 1.0,
        }
    }
}

pub struct Renderer {
    pub gfx: GfxContext,
    pub targets: Targets,
    pub points: FamilyRenderer,
    pub triangles: FamilyRenderer,
    pub lines: FamilyRenderer,
    point_pipeline: Option<PointPipeline>,
    triangle_pipeline: Option<TrianglePipeline>,
    line_pipeline: Option<LinePipeline>,
    border: Option<BorderPipeline>,
    pub egui_renderer: egui_wgpu::Renderer,
}

/// Builds a pipeline inside a validation error scope. A failed build
/// disables that family for the session instead of panicking later.
fn guarded<T>(device: &wgpu::Device, label: &str, build: impl FnOnce() -> T) -> Option<T> {
    device.push_error_scope(wgpu::ErrorFilter::Validation);
    let built = build();
    match pollster::block_on(device.pop_error_scope()) {
        None => Some(built),
        Some(err) => {
            log::error!("{} disabled for this session: {}", label, err);
            None
        }
    }
}

impl Renderer {
    pub async fn new(window: Arc<Window>) -> Result<Self> {
        let gfx = GfxContext::new(window).await?;
        let targets = Targets::new(&gfx.device, gfx.size);

        let color_fmt = gfx.config.format;
        let depth_fmt = targets.depth_fmt;
        let point_pipeline = guarded(&gfx.device, "point renderer", || {
            PointPipeline::new(&gfx.device, color_fmt, depth_fmt)
        });
        let triangle_pipeline = guarded(&gfx.device, "triangle renderer", || {
            TrianglePipeline::new(&gfx.device, color_fmt, depth_fmt)
        });
        let line_pipeline = guarded(&gfx.device, "line renderer", || {
            LinePipeline::new(&gfx.device, color_fmt, depth_fmt)
        });
        let border = guarded(&gfx.device, "border renderer", || {
            BorderPipeline::new(&gfx.device, color_fmt, depth_fmt)
        });

        let egui_renderer = egui_wgpu::Renderer::new(&gfx.device, color_fmt, None, 1);

        Ok(Self {
            gfx,
            targets,
            points: FamilyRenderer::new(Family::Points),
            triangles: FamilyRenderer::new(Family::Triangles),
            lines: FamilyRenderer::new(Family::Lines),
            point_pipeline,
            triangle_pipeline,
            line_pipeline,
            border,
            egui_renderer,
        })
    }

    pub fn resize(&mut self, new_size: winit::dpi::PhysicalSize<u32>) {
        if new_size.width > 0 && new_size.height > 0 {
            self.gfx.resize(new_size);
            self.targets.resize(&self.gfx.device, new_size);
        }
    }

    fn families(&mut self) -> [&mut FamilyRenderer; 3] {
        [&mut self.triangles, &mut self.points, &mut self.lines]
    }

    /// Geometry or attributes changed: rebuild vertex buffers.
    pub fn mark_reload(&mut self) {
        for fam in self.families() {
            fam.reload = true;
            fam.sort = true;
        }
    }

    /// Draw order is stale: re-sort from cached positions.
    pub fn mark_sort(&mut self) {
        for fam in self.families() {
            fam.sort = true;
        }
    }

    /// Visibility changed: re-sort and rebuild the positions cache.
    pub fn mark_visibility_change(&mut self) {
        for fam in self.families() {
            fam.sort = true;
            fam.invalidate_positions();
        }
    }

    pub fn render(
        &mut self,
        swap_view: &wgpu::TextureView,
        scene: &Scene,
        camera: &Camera,
        settings: &RenderSettings,
        rotated: bool,
    ) {
        // 1. Service dirty flags: reload before sort, once per frame.
        let model_view = camera.model_view();
        let bbox = (camera.min.into(), camera.max.into());
        let device = &self.gfx.device;
        for fam in [&mut self.triangles, &mut self.points, &mut self.lines] {
            if fam.reload {
                if let Err(err) = fam.update_buffers(device, scene) {
                    log::error!("{} reload failed: {}", fam.family.key(), err);
                    fam.elements = 0;
                }
                fam.reload = false;
                fam.sort = true;
            }
            if fam.sort {
                fam.load_elements(device, scene, &model_view, bbox, rotated);
                fam.sort = false;
            }
        }

        // 2. Frame uniforms.
        let props = &scene.properties;
        let aspect = self.gfx.size.width as f32 / self.gfx.size.height.max(1) as f32;
        let mvp = camera.projection(aspect) * model_view;
        let (fmin, fmax) = props.clip_fractions();
        let mut clip_min = [f32::MIN; 4];
        let mut clip_max = [f32::MAX; 4];
        for i in 0..3 {
            clip_min[i] = camera.min[i] + camera.dims[i] * fmin[i];
            clip_max[i] = camera.min[i] + camera.dims[i] * fmax[i];
        }
        let uniforms = SceneUniforms {
            model_view_proj: mvp,
            model_view,
            clip_min,
            clip_max,
            ambient: props.ambient.unwrap_or(0.4),
            diffuse: props.diffuse.unwrap_or(0.8),
            specular: props.specular.unwrap_or(0.0),
            opacity: props.opacity.unwrap_or(1.0),
            brightness: props.brightness.unwrap_or(0.0),
            contrast: props.contrast.unwrap_or(1.0),
            saturation: props.saturation.unwrap_or(1.0),
            point_scale: props.scalepoints.unwrap_or(1.0) * settings.point_scale,
        };
        let cull: Vec<bool> = scene
            .objects
            .iter()
            .map(|o| o.cullface.unwrap_or(false))
            .collect();

        let queue = &self.gfx.queue;
        if let Some(p) = &self.point_pipeline {
            p.write_uniforms(queue, &uniforms);
        }
        if let Some(p) = &self.triangle_pipeline {
            p.write_uniforms(queue, &uniforms, &CullUniforms::from_flags(&cull));
        }
        if let Some(p) = &self.line_pipeline {
            p.write_uniforms(queue, &uniforms);
        }
        if let Some(border) = &mut self.border {
            border.update_box(queue, bbox.0, bbox.1);
            border.write_uniforms(
                queue,
                &BorderUniforms {
                    model_view_proj: mvp,
                    colour: Colour::from_rgba(0xaa, 0xaa, 0xaa, 1.0).rgba_f32(),
                },
            );
        }

        // 3. Geometry pass: clear to the scene background, depth LEqual,
        //    families drawn in pre-sorted index order.
        let background = props.background.unwrap_or(Colour::from_rgba(0, 0, 0, 1.0));
        let [r, g, b, a] = background.rgba_f32();

        let mut encoder = self
            .gfx
            .device
            .create_command_encoder(&wgpu::CommandEncoderDescriptor {
                label: Some("Frame Encoder"),
            });
        {
            let mut pass = encoder.begin_render_pass(&wgpu::RenderPassDescriptor {
                label: Some("Geometry Pass"),
                color_attachments: &[Some(wgpu::RenderPassColorAttachment {
                    view: swap_view,
                    resolve_target: None,
                    ops: wgpu::Operations {
                        load: wgpu::LoadOp::Clear(wgpu::Color {
                            r: r as f64,
                            g: g as f64,
                            b: b as f64,
                            a: a as f64,
                        }),
                        store: wgpu::StoreOp::Store,
                    },
                })],
                depth_stencil_attachment: Some(wgpu::RenderPassDepthStencilAttachment {
                    view: &self.targets.depth,
                    depth_ops: Some(wgpu::Operations {
                        load: wgpu::LoadOp::Clear(1.0),
                        store: wgpu::StoreOp::Store,
                    }),
                    stencil_ops: None,
                }),
                timestamp_writes: None,
                occlusion_query_set: None,
            });

            if let (Some(pipeline), Some(vb), Some(ib)) = (
                &self.triangle_pipeline,
                &self.triangles.vertex_buffer,
                &self.triangles.index_buffer,
            ) {
                if self.triangles.elements > 0 {
                    pipeline.draw(&mut pass, vb, ib, self.triangles.elements);
                }
            }
            if let (Some(pipeline), Some(vb), Some(ib)) = (
                &self.point_pipeline,
                &self.points.vertex_buffer,
                &self.points.index_buffer,
            ) {
                if self.points.elements > 0 {
                    pipeline.draw(&mut pass, vb, ib, self.points.elements);
                }
            }
            if let (Some(pipeline), Some(vb), Some(ib)) = (
                &self.line_pipeline,
                &self.lines.vertex_buffer,
                &self.lines.index_buffer,
            ) {
                if self.lines.elements > 0 {
                    pipeline.draw(&mut pass, vb, ib, self.lines.elements);
                }
            }
            if settings.show_border {
                if let Some(border) = &self.border {
                    border.draw(&mut pass);
                }
            }
        }

        self.gfx.queue.submit(std::iter::once(encoder.finish()));
    }
}
