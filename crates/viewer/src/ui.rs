//! egui control panel and HUD.

use crate::renderer::RenderSettings;
use crate::scheduler::SortMode;
use scenejson::Scene;

/// What the panel changed this frame.
#[derive(Default)]
pub struct PanelResponse {
    pub visibility_changed: bool,
}

pub fn draw_control_panel(
    ctx: &egui::Context,
    scene: &mut Scene,
    settings: &mut RenderSettings,
    sort_mode: &mut SortMode,
) -> PanelResponse {
    let mut response = PanelResponse::default();

    egui::Window::new("Scene")
        .default_width(220.0)
        .show(ctx, |ui| {
            ui.label("Objects");
            for (id, obj) in scene.objects.iter_mut().enumerate() {
                let mut visible = obj.is_visible();
                let name = obj.name.clone().unwrap_or_else(|| format!("object {id}"));
                if ui.checkbox(&mut visible, name).changed() {
                    obj.visible = Some(visible);
                    response.visibility_changed = true;
                }
            }

            ui.separator();
            ui.checkbox(&mut settings.show_border, "Bounding box");
            ui.add(
                egui::Slider::new(&mut settings.point_scale, 0.1..=10.0)
                    .logarithmic(true)
                    .text("Point scale"),
            );

            ui.separator();
            ui.label("Depth sort");
            ui.radio_value(sort_mode, SortMode::Deferred, "After rotation settles");
            ui.radio_value(sort_mode, SortMode::Immediate, "Every rotation");
            ui.radio_value(sort_mode, SortMode::Disabled, "Off");
        });

    response
}

pub fn draw_hud(ctx: &egui::Context, triangles: u32, points: u32, lines: u32) {
    egui::Area::new(egui::Id::new("hud"))
        .anchor(egui::Align2::LEFT_BOTTOM, [8.0, -8.0])
        .show(ctx, |ui| {
            ui.label(format!(
                "{} triangle indices | {} points | {} line indices",
                triangles, points, lines
            ));
        });
}
