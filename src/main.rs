use anyhow::Context;
use eframe::egui;
use glam::Vec2;
use std::path::PathBuf;
use stormvale::config::{default_settings_path, load_or_default};
use stormvale::rendering::picking::Ray;
use stormvale::ui::show_tweak_panel;
use stormvale::utils::logging::{init_logging, log_system_info, LOG_FILE};
use stormvale::{FrameClock, SceneApp, SceneSink, VERSION};
use tracing::{error, info};

/// Largest edge of the top-down map texture
const MAP_RESOLUTION: usize = 512;

struct PreviewApp {
    scene: SceneApp,
    clock: FrameClock,
    map: Option<egui::TextureHandle>,
    map_generation: u64,
    settings_path: PathBuf,
    status: String,
}

impl PreviewApp {
    fn refresh_map(&mut self, ctx: &egui::Context) {
        let terrain = self.scene.terrain();
        if terrain.generation() == self.map_generation {
            return;
        }
        let Some(mesh) = terrain.mesh() else {
            return;
        };

        let stride = mesh.segments as usize + 1;
        let step = (stride / MAP_RESOLUTION).max(1);
        let size = stride.div_ceil(step);
        let mut rgb = Vec::with_capacity(size * size * 3);
        for row in (0..stride).step_by(step) {
            for col in (0..stride).step_by(step) {
                rgb.extend_from_slice(&mesh.vertices[row * stride + col].color().to_srgb8());
            }
        }

        let image = egui::ColorImage::from_rgb([size, size], &rgb);
        self.map = Some(ctx.load_texture("terrain-map", image, egui::TextureOptions::NEAREST));
        self.map_generation = terrain.generation();
    }

    fn show_map(&mut self, ui: &mut egui::Ui) {
        let width = self.scene.settings().terrain.width;
        let half = width / 2.0;
        let edge = ui.available_width().min(ui.available_height());
        let (response, painter) = ui.allocate_painter(egui::vec2(edge, edge), egui::Sense::click());
        let rect = response.rect;

        let to_screen = |x: f32, z: f32| {
            egui::pos2(
                rect.min.x + (x + half) / width * rect.width(),
                rect.min.y + (z + half) / width * rect.height(),
            )
        };

        match &self.map {
            Some(texture) => {
                painter.image(
                    texture.id(),
                    rect,
                    egui::Rect::from_min_max(egui::pos2(0.0, 0.0), egui::pos2(1.0, 1.0)),
                    egui::Color32::WHITE,
                );
            }
            None => {
                painter.rect_filled(rect, 0.0, egui::Color32::from_gray(30));
                painter.text(
                    rect.center(),
                    egui::Align2::CENTER_CENTER,
                    "Waiting for height map…",
                    egui::FontId::proportional(16.0),
                    egui::Color32::LIGHT_GRAY,
                );
            }
        }

        let scale = rect.width() / width;
        for tree in self.scene.terrain().trees() {
            let p = tree.placement.position;
            painter.circle_filled(to_screen(p.x, p.z), 1.5, egui::Color32::from_rgb(10, 60, 10));
        }

        let lava = self.scene.lava();
        let center = lava.surface_center();
        painter.circle_filled(
            to_screen(center.x, center.z),
            lava.surface_radius() * scale,
            egui::Color32::from_rgb(255, 69, 0),
        );
        for projectile in lava.projectiles() {
            if let Some(node) = self.scene.scene().node(projectile.node) {
                let p = node.transform.position;
                painter.circle_filled(to_screen(p.x, p.z), 3.0 * scale.max(0.5), egui::Color32::RED);
            }
        }

        if let Some(pos) = response.interact_pointer_pos().filter(|_| response.clicked()) {
            let x = (pos.x - rect.min.x) / rect.width() * width - half;
            let z = (pos.y - rect.min.y) / rect.height() * width - half;
            if let Some(hit) = self.scene.pointer_ray(Vec2::ZERO, Ray::vertical(x, z, 1000.0)) {
                info!("Lava clicked at {:?}", hit);
            }
        }
    }

    fn show_status(&self, ui: &mut egui::Ui) {
        ui.label(format!("Terrain generation: {}", self.scene.terrain().generation()));
        ui.label(format!("Trees: {}", self.scene.terrain().trees().len()));
        ui.label(format!("Projectiles: {}", self.scene.lava().projectiles().len()));
        ui.label(format!(
            "Rain: {} ({} drops)",
            if self.scene.rain().is_enabled() { "on" } else { "off" },
            self.scene.rain().len()
        ));
        if let Some(sun) = self.scene.lighting().last_sun() {
            ui.label(format!("Sun height ratio: {:.2}", sun.height_ratio));
        }
        ui.label(format!("Lightning: {:.0}", self.scene.lighting().lightning().intensity()));
        ui.label(match self.scene.physics() {
            Some(physics) => format!("Physics: {} ({} bodies)", physics.name(), physics.body_count()),
            None => "Physics: visual only".to_string(),
        });
        for failure in self.scene.setup_failures() {
            ui.colored_label(egui::Color32::YELLOW, format!("{}: {}", failure.step, failure.reason));
        }
        if !self.status.is_empty() {
            ui.label(&self.status);
        }
    }
}

impl eframe::App for PreviewApp {
    fn update(&mut self, ctx: &egui::Context, _frame: &mut eframe::Frame) {
        let time = self.clock.tick();
        self.scene.frame(time);
        self.refresh_map(ctx);

        egui::SidePanel::left("tweak_panel").show(ctx, |ui| {
            egui::ScrollArea::vertical().show(ui, |ui| {
                let camera = self.scene.camera_status();
                let output = show_tweak_panel(ui, self.scene.panel(), self.scene.settings(), &|_| camera.clone());
                for (param, value) in output.edits {
                    self.scene.edit(param, value);
                }
                for param in output.finished {
                    self.scene.finish_edit(param);
                }
                if output.save_requested {
                    self.status = match self.scene.save_settings(&self.settings_path) {
                        Ok(()) => format!("Saved to {}", self.settings_path.display()),
                        Err(e) => {
                            error!("Saving settings failed: {}", e);
                            format!("Save failed: {}", e)
                        }
                    };
                }
                ui.separator();
                self.show_status(ui);
            });
        });

        egui::CentralPanel::default().show(ctx, |ui| self.show_map(ui));
        ctx.request_repaint();
    }

    fn on_exit(&mut self, _gl: Option<&eframe::glow::Context>) {
        self.scene.teardown();
    }
}

fn main() -> anyhow::Result<()> {
    init_logging(LOG_FILE)?;
    log_system_info();

    let arg_path = std::env::args().nth(1).map(PathBuf::from);
    let settings = load_or_default(arg_path.as_deref());
    let settings_path = arg_path
        .or_else(default_settings_path)
        .unwrap_or_else(|| PathBuf::from("settings.toml"));

    let mut scene = SceneApp::new(settings).context("creating scene")?;
    scene.setup();

    let app = PreviewApp {
        scene,
        clock: FrameClock::default(),
        map: None,
        map_generation: 0,
        settings_path,
        status: String::new(),
    };

    eframe::run_native(
        &format!("Stormvale {}", VERSION),
        eframe::NativeOptions::default(),
        Box::new(move |_cc| Ok(Box::new(app))),
    )
    .map_err(|e| anyhow::anyhow!("preview window failed: {}", e))
}
