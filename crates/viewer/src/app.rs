//! Application shell: window events, mouse navigation, sort
//! scheduling and the per-frame draw.

use crate::{
    camera::Camera,
    commands::Command,
    renderer::{RenderSettings, Renderer},
    scheduler::{SortMode, SortScheduler},
    ui,
};
use anyhow::Result;
use scenejson::Scene;
use std::sync::Arc;
use std::time::Instant;
use winit::{
    event::{ElementState, MouseButton, MouseScrollDelta, WindowEvent},
    window::Window,
};

pub struct App {
    pub renderer: Renderer,
    pub camera: Camera,
    pub scene: Scene,
    pub scheduler: SortScheduler,
    pub settings: RenderSettings,
    pub egui_ctx: egui::Context,
    pub egui_state: egui_winit::State,

    cursor: Option<(f64, f64)>,
    left_down: bool,
    middle_down: bool,
    right_down: bool,
    ctrl_down: bool,
    /// Rotation happened since the last button release.
    dragging_rotation: bool,
    /// The next frame's re-sort was triggered by rotation only, so the
    /// renderer may reuse its cached model-space positions.
    rotation_sort: bool,
}

impl App {
    pub async fn new(window: Arc<Window>, mut scene: Scene, sort_mode: SortMode) -> Result<Self> {
        let renderer = Renderer::new(window.clone()).await?;
        let camera = Camera::from_view(scene.view());

        let egui_ctx = egui::Context::default();
        let egui_state = egui_winit::State::new(
            egui_ctx.clone(),
            egui_ctx.viewport_id(),
            &*window,
            None,
            None,
        );

        Ok(Self {
            renderer,
            camera,
            scene,
            scheduler: SortScheduler::new(sort_mode),
            settings: RenderSettings::default(),
            egui_ctx,
            egui_state,
            cursor: None,
            left_down: false,
            middle_down: false,
            right_down: false,
            ctrl_down: false,
            dragging_rotation: false,
            rotation_sort: false,
        })
    }

    pub fn resize(&mut self, new_size: winit::dpi::PhysicalSize<u32>) {
        // Projection is rebuilt from gfx.size every frame.
        self.renderer.resize(new_size);
    }

    /// A camera rotation happened: ask the scheduler whether to sort
    /// now or wait for the rotation to settle.
    fn on_rotation(&mut self) {
        self.dragging_rotation = true;
        if self.camera.is_flat() {
            return;
        }
        if self.scheduler.rotated(Instant::now()) {
            self.renderer.mark_sort();
            self.rotation_sort = true;
        }
    }

    pub fn handle_event(&mut self, window: &Window, event: &WindowEvent) -> bool {
        let response = self.egui_state.on_window_event(window, event);
        if response.consumed {
            return true;
        }

        match event {
            WindowEvent::Resized(physical_size) => {
                self.resize(*physical_size);
            }
            WindowEvent::ModifiersChanged(modifiers) => {
                self.ctrl_down = modifiers.state().control_key();
            }
            WindowEvent::MouseInput { state, button, .. } => {
                let pressed = *state == ElementState::Pressed;
                match button {
                    MouseButton::Left => self.left_down = pressed,
                    MouseButton::Middle => self.middle_down = pressed,
                    MouseButton::Right => self.right_down = pressed,
                    _ => {}
                }
                if !pressed {
                    self.end_drag(*button);
                }
            }
            WindowEvent::CursorMoved { position, .. } => {
                let (x, y) = (position.x, position.y);
                if let Some((px, py)) = self.cursor {
                    let dx = (x - px) as f32;
                    let dy = (y - py) as f32;
                    self.drag(dx, dy);
                }
                self.cursor = Some((x, y));
            }
            WindowEvent::MouseWheel { delta, .. } => {
                let spin = match delta {
                    MouseScrollDelta::LineDelta(_, y) => *y,
                    MouseScrollDelta::PixelDelta(pos) => pos.y as f32 / 20.0,
                };
                if self.ctrl_down {
                    self.camera.zoom_clip(spin * 0.01);
                } else {
                    self.camera.zoom(spin * 0.01);
                }
            }
            _ => {}
        }

        false
    }

    fn drag(&mut self, dx: f32, dy: f32) {
        if self.left_down {
            self.camera.rotate_y(dx / 5.0);
            self.camera.rotate_x(dy / 5.0);
            self.on_rotation();
        } else if self.middle_down {
            self.camera.rotate_z((dx * dx + dy * dy).sqrt() / 5.0);
            self.on_rotation();
        } else if self.right_down {
            let scale = self.camera.model_size / 1000.0;
            self.camera.translate.x += dx * scale;
            self.camera.translate.y -= dy * scale;
        }
    }

    fn end_drag(&mut self, button: MouseButton) {
        match button {
            MouseButton::Left | MouseButton::Middle => {
                if self.dragging_rotation {
                    if self.scheduler.finish_drag() {
                        self.renderer.mark_sort();
                        self.rotation_sort = true;
                    }
                    log::debug!("{}", Command::Rotation(self.camera.rotate).format());
                    self.dragging_rotation = false;
                }
            }
            MouseButton::Right => {
                log::debug!("{}", Command::Translation(self.camera.translate).format());
            }
            _ => {}
        }
    }

    pub fn render(&mut self, window: &Window) -> Result<(), wgpu::SurfaceError> {
        // A debounced sort deadline may have passed since the last event.
        if self.scheduler.poll(Instant::now()) {
            self.renderer.mark_sort();
            self.rotation_sort = true;
        }

        let frame = self.renderer.gfx.surface.get_current_texture()?;
        let swap_view = frame
            .texture
            .create_view(&wgpu::TextureViewDescriptor::default());

        self.renderer.render(
            &swap_view,
            &self.scene,
            &self.camera,
            &self.settings,
            self.rotation_sort,
        );
        self.rotation_sort = false;

        let egui_input = self.egui_state.take_egui_input(window);
        self.egui_ctx.begin_frame(egui_input);

        let mut sort_mode = self.scheduler.mode();
        let panel = ui::draw_control_panel(
            &self.egui_ctx,
            &mut self.scene,
            &mut self.settings,
            &mut sort_mode,
        );
        if sort_mode != self.scheduler.mode() {
            self.scheduler.set_mode(sort_mode);
            if sort_mode != SortMode::Disabled {
                self.renderer.mark_sort();
            }
        }
        if panel.visibility_changed {
            self.renderer.mark_visibility_change();
        }

        ui::draw_hud(
            &self.egui_ctx,
            self.renderer.triangles.elements,
            self.renderer.points.elements,
            self.renderer.lines.elements,
        );

        let egui_output = self.egui_ctx.end_frame();
        let shapes = self
            .egui_ctx
            .tessellate(egui_output.shapes, self.egui_ctx.pixels_per_point());

        let screen_descriptor = egui_wgpu::ScreenDescriptor {
            size_in_pixels: [
                self.renderer.gfx.config.width,
                self.renderer.gfx.config.height,
            ],
            pixels_per_point: self.egui_ctx.pixels_per_point(),
        };

        let mut encoder = self
            .renderer
            .gfx
            .device
            .create_command_encoder(&wgpu::CommandEncoderDescriptor {
                label: Some("UI Encoder"),
            });

        for (id, delta) in &egui_output.textures_delta.set {
            self.renderer.egui_renderer.update_texture(
                &self.renderer.gfx.device,
                &self.renderer.gfx.queue,
                *id,
                delta,
            );
        }

        self.renderer.egui_renderer.update_buffers(
            &self.renderer.gfx.device,
            &self.renderer.gfx.queue,
            &mut encoder,
            &shapes,
            &screen_descriptor,
        );

        {
            let mut render_pass = encoder.begin_render_pass(&wgpu::RenderPassDescriptor {
                label: Some("EGUI Pass"),
                color_attachments: &[Some(wgpu::RenderPassColorAttachment {
                    view: &swap_view,
                    resolve_target: None,
                    ops: wgpu::Operations {
                        load: wgpu::LoadOp::Load,
                        store: wgpu::StoreOp::Store,
                    },
                })],
                depth_stencil_attachment: None,
                timestamp_writes: None,
                occlusion_query_set: None,
            });

            self.renderer
                .egui_renderer
                .render(&mut render_pass, &shapes, &screen_descriptor);
        }

        for id in &egui_output.textures_delta.free {
            self.renderer.egui_renderer.free_texture(id);
        }

        self.renderer
            .gfx
            .queue
            .submit(std::iter::once(encoder.finish()));
        frame.present();

        Ok(())
    }
}
