//! Entry point for the scene viewer.

use anyhow::{Context, Result};
use clap::{Parser, ValueEnum};
use scene_viewer::{app::App, scheduler::SortMode};
use std::{path::PathBuf, sync::Arc};
use winit::{
    event::{Event, WindowEvent},
    event_loop::{ControlFlow, EventLoop},
    keyboard::{KeyCode, PhysicalKey},
    window::WindowBuilder,
};

#[derive(Clone, Copy, Debug, ValueEnum)]
enum SortArg {
    Deferred,
    Immediate,
    Off,
}

impl From<SortArg> for SortMode {
    fn from(arg: SortArg) -> Self {
        match arg {
            SortArg::Deferred => SortMode::Deferred,
            SortArg::Immediate => SortMode::Immediate,
            SortArg::Off => SortMode::Disabled,
        }
    }
}

#[derive(Parser, Debug)]
#[command(version, about = "Depth-sorted scene viewer")]
struct Args {
    /// Scene JSON file to load.
    scene: PathBuf,

    /// When to re-sort transparent geometry after rotation.
    #[arg(long, value_enum, default_value = "deferred")]
    sort: SortArg,
}

fn main() -> Result<()> {
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("info")).init();

    let args = Args::parse();
    let json = std::fs::read_to_string(&args.scene)
        .with_context(|| format!("reading {}", args.scene.display()))?;
    let scene = scenejson::Scene::from_json(&json)?;
    log::info!(
        "Loaded scene: {} objects, {} colour maps",
        scene.objects.len(),
        scene.colourmaps.len()
    );

    let event_loop = EventLoop::new()?;
    let window = Arc::new(
        WindowBuilder::new()
            .with_title("Scene Viewer")
            .with_inner_size(winit::dpi::LogicalSize::new(1280, 720))
            .build(&event_loop)?,
    );

    let mut app = pollster::block_on(App::new(window.clone(), scene, args.sort.into()))?;

    event_loop.run(move |event, elwt| {
        elwt.set_control_flow(ControlFlow::Poll);

        match event {
            Event::WindowEvent { window_id, event } if window_id == window.id() => {
                if !app.handle_event(&window, &event) {
                    match event {
                        WindowEvent::CloseRequested => elwt.exit(),
                        WindowEvent::KeyboardInput { event, .. } => {
                            if event.physical_key == PhysicalKey::Code(KeyCode::Escape) {
                                elwt.exit();
                            }
                        }
                        WindowEvent::RedrawRequested => match app.render(&window) {
                            Ok(_) => {}
                            Err(wgpu::SurfaceError::Lost) => {
                                app.resize(app.renderer.gfx.size);
                            }
                            Err(wgpu::SurfaceError::OutOfMemory) => {
                                log::error!("WGPU out of memory – exiting.");
                                elwt.exit();
                            }
                            Err(e) => log::error!("Render error: {:?}", e),
                        },
                        _ => {}
                    }
                }
            }
            Event::AboutToWait => {
                window.request_redraw();
            }
            _ => {}
        }
    })?;

    Ok(())
}
