use bevy::prelude::{error, info, Vec2, Vec3, Vec4};
use bevy_egui::egui;
use cloud_engine::volume::{MAX_FREQUENCY, MAX_OCTAVES, MAX_VOLUME_SIZE, MIN_VOLUME_SIZE};
use cloud_engine::{CameraMode, CloudSettings, VolumeParams};

use crate::ui_strings::{NoiseStrings, UiStrings};
use crate::viewer::CloudViewer;

#[derive(Default)]
struct OverlayActions {
    save: bool,
    reset: bool,
    regenerate: bool,
    toggle_camera: bool,
}

fn vec2_drag(ui: &mut egui::Ui, label: &str, v: &mut Vec2, speed: f32) {
    ui.horizontal(|ui| {
        ui.label(label);
        ui.add(egui::DragValue::new(&mut v.x).speed(speed).prefix("x "));
        ui.add(egui::DragValue::new(&mut v.y).speed(speed).prefix("y "));
    });
}

fn vec3_drag(ui: &mut egui::Ui, label: &str, v: &mut Vec3, speed: f32) {
    ui.horizontal(|ui| {
        ui.label(label);
        ui.add(egui::DragValue::new(&mut v.x).speed(speed).prefix("x "));
        ui.add(egui::DragValue::new(&mut v.y).speed(speed).prefix("y "));
        ui.add(egui::DragValue::new(&mut v.z).speed(speed).prefix("z "));
    });
}

fn color_edit(ui: &mut egui::Ui, label: &str, v: &mut Vec4) {
    ui.horizontal(|ui| {
        ui.label(label);
        let mut rgb = [v.x, v.y, v.z];
        if ui.color_edit_button_rgb(&mut rgb).changed() {
            *v = Vec4::new(rgb[0], rgb[1], rgb[2], v.w);
        }
    });
}

fn volume_ui(ui: &mut egui::Ui, title: &str, text: &NoiseStrings, params: &mut VolumeParams) {
    egui::CollapsingHeader::new(title).default_open(false).show(ui, |ui| {
        ui.horizontal(|ui| {
            ui.label(&text.seed);
            ui.add(egui::DragValue::new(&mut params.seed));
        });
        ui.add(egui::Slider::new(&mut params.size, MIN_VOLUME_SIZE..=MAX_VOLUME_SIZE).text(&text.size));
        ui.add(egui::Slider::new(&mut params.frequency, 1..=MAX_FREQUENCY).text(&text.frequency));
        ui.add(egui::Slider::new(&mut params.octaves, 1..=MAX_OCTAVES).text(&text.octaves));
        ui.label(&text.tuning);
        for (i, channel) in ["r", "g", "b", "a"].into_iter().enumerate() {
            ui.add(egui::Slider::new(&mut params.tuning[i], 0.0..=1.0).text(channel));
        }
    });
}

fn settings_ui(ui: &mut egui::Ui, text: &UiStrings, settings: &mut CloudSettings) {
    volume_ui(ui, &text.noise.shape, &text.noise, &mut settings.shape);
    volume_ui(ui, &text.noise.detail, &text.noise, &mut settings.detail);

    egui::CollapsingHeader::new(&text.density.title).default_open(true).show(ui, |ui| {
        let d = &mut settings.density;
        vec3_drag(ui, &text.density.box_center, &mut d.box_center, 0.05);
        ui.add(egui::Slider::new(&mut d.side_length, 0.1..=20.0).text(&text.density.side_length));
        ui.add(egui::Slider::new(&mut d.height, 0.1..=20.0).text(&text.density.height));
        ui.add(egui::Slider::new(&mut d.coverage, 0.0..=1.0).text(&text.density.coverage));
        ui.add(egui::Slider::new(&mut d.density, 0.0..=20.0).text(&text.density.density));
        ui.add(egui::Slider::new(&mut d.density_eps, 0.0..=0.5).text(&text.density.density_eps));
        ui.add(egui::Slider::new(&mut d.detail_weight, 0.0..=1.0).text(&text.density.detail_weight));
        ui.add(egui::Slider::new(&mut d.shape_scale, 0.1..=10.0).text(&text.density.shape_scale));
        ui.add(egui::Slider::new(&mut d.detail_scale, 0.05..=5.0).text(&text.density.detail_scale));
    });

    egui::CollapsingHeader::new(&text.lighting.title).default_open(false).show(ui, |ui| {
        let l = &mut settings.lighting;
        vec3_drag(ui, &text.lighting.light_position, &mut l.light_position, 0.1);
        color_edit(ui, &text.lighting.light_color, &mut l.light_color);
        ui.add(egui::Slider::new(&mut l.light_intensity, 0.0..=50.0).text(&text.lighting.light_intensity));
        ui.add(egui::Slider::new(&mut l.lightmarch_steps, 1..=cloud_engine::lighting::MAX_LIGHTMARCH_STEPS).text(&text.lighting.lightmarch_steps));
        ui.add(egui::Slider::new(&mut l.cloud_absorption, 0.0..=5.0).text(&text.lighting.cloud_absorption));
        ui.add(egui::Slider::new(&mut l.sun_absorption, 0.0..=5.0).text(&text.lighting.sun_absorption));
        ui.add(egui::Slider::new(&mut l.min_light_energy, 0.0..=1.0).text(&text.lighting.min_light_energy));
        ui.add(egui::Slider::new(&mut l.in_scatter, -0.95..=0.95).text(&text.lighting.in_scatter));
        ui.add(egui::Slider::new(&mut l.out_scatter, -0.95..=0.95).text(&text.lighting.out_scatter));
        ui.add(egui::Slider::new(&mut l.ivo, 0.0..=1.0).text(&text.lighting.ivo));
        ui.add(egui::Slider::new(&mut l.sci, 0.0..=5.0).text(&text.lighting.sci));
        ui.add(egui::Slider::new(&mut l.sce, 0.0..=32.0).text(&text.lighting.sce));
    });

    egui::CollapsingHeader::new(&text.animation.title).default_open(false).show(ui, |ui| {
        let a = &mut settings.animation;
        vec2_drag(ui, &text.animation.shape_speed, &mut a.shape_speed, 1.0);
        vec2_drag(ui, &text.animation.detail_speed, &mut a.detail_speed, 1.0);
        ui.checkbox(&mut a.paused, &text.animation.paused);
    });

    egui::CollapsingHeader::new(&text.render.title).default_open(false).show(ui, |ui| {
        let r = &mut settings.render;
        ui.add(egui::Slider::new(&mut r.march_steps, 1..=cloud_engine::march::MAX_MARCH_STEPS).text(&text.render.march_steps));
        ui.add(egui::Slider::new(&mut r.resolution_divisor, 1..=cloud_engine::march::MAX_RESOLUTION_DIVISOR).text(&text.render.resolution_divisor));
        color_edit(ui, &text.render.background, &mut r.background);
        let p = &mut settings.reprojection;
        ui.checkbox(&mut p.enabled, &text.render.reprojection);
        ui.add_enabled(
            p.enabled,
            egui::Slider::new(&mut p.history_blend, 0.0..=cloud_engine::reprojection::MAX_HISTORY_BLEND).text(&text.render.history_blend),
        );
    });
}

pub fn draw(ctx: &egui::Context, viewer: &mut CloudViewer) {
    let mut actions = OverlayActions::default();
    let stats = viewer.scene().stats();
    let fps = viewer.fps;
    let text = viewer.ui.clone();

    egui::Window::new(&text.overlay.title).default_width(320.0).vscroll(true).show(ctx, |ui| {
        egui::CollapsingHeader::new(&text.stats.title).default_open(true).show(ui, |ui| {
            ui.label(format!("{}: {:.1}", text.stats.fps, fps));
            ui.label(format!("{}: {}x{}", text.stats.render_size, stats.render_size.x, stats.render_size.y));
            ui.label(format!("{}: {}", text.stats.reproj_idx, stats.reproj_idx));
            ui.label(format!("{}: {}", text.stats.history, stats.history_valid));
            ui.label(format!("{}: {}", text.stats.generations, stats.generations));
            ui.label(format!("{}: {:.1} ms", text.stats.last_generation, stats.last_generation.as_secs_f32() * 1000.0));
            ui.label(format!("{}: {}", text.stats.threads, stats.threads));
        });
        ui.colored_label(egui::Color32::GRAY, &text.app.controls_hint);
        ui.separator();

        let scene = viewer.scene_mut();
        egui::CollapsingHeader::new(&text.camera.title).default_open(false).show(ui, |ui| {
            let camera = scene.camera_mut();
            ui.horizontal(|ui| {
                ui.label(&text.camera.mode);
                let current = match camera.mode() {
                    CameraMode::Orbit => &text.camera.orbit,
                    CameraMode::FreeFly => &text.camera.free_fly,
                };
                if ui.button(current).clicked() {
                    actions.toggle_camera = true;
                }
            });
            let mut fov = camera.fov_degrees();
            if ui.add(egui::Slider::new(&mut fov, 30.0..=150.0).text(&text.camera.fov)).changed() {
                camera.set_fov_degrees(fov);
            }
            let mut speed = camera.move_speed();
            if ui.add(egui::Slider::new(&mut speed, 0.1..=20.0).logarithmic(true).text(&text.camera.move_speed)).changed() {
                camera.set_move_speed(speed);
            }
        });
        settings_ui(ui, &text, scene.settings_mut());

        ui.separator();
        ui.horizontal(|ui| {
            actions.save = ui.button(&text.overlay.save).clicked();
            actions.reset = ui.button(&text.overlay.reset).clicked();
            actions.regenerate = ui.button(&text.overlay.regenerate).clicked();
            if ui.button(&text.overlay.screenshot).clicked() {
                viewer.screenshot_requested = true;
            }
        });
    });

    if actions.toggle_camera {
        viewer.scene_mut().camera_mut().toggle_mode();
    }
    if actions.reset {
        info!("Settings reset to defaults");
        *viewer.scene_mut().settings_mut() = CloudSettings::default();
    }
    if actions.regenerate {
        if let Err(e) = viewer.scene_mut().regenerate() {
            error!("Regeneration failed: {e}");
        }
    }
    if actions.save {
        viewer.save_settings();
    }
}
