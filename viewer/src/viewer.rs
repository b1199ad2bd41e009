use bevy::app::AppExit;
use bevy::diagnostic::{DiagnosticsStore, FrameTimeDiagnosticsPlugin};
use bevy::input::mouse::{MouseMotion, MouseWheel};
use bevy::prelude::*;
use bevy::window::WindowResized;
use bevy_egui::{egui, EguiContexts};
use cloud_engine::{run_frame, CloudError, CloudScene, CloudSettings, FrameInput, FrameRenderer};

use crate::controls::{self, EguiFocus};
use crate::overlay;
use crate::present;
use crate::ui_strings::{self, UiStrings, UI_STRINGS_PATH};

pub const SETTINGS_PATH: &str = "clouds.ron";

/// The cloud scene plus everything the window adds around it.
#[derive(Resource)]
pub struct CloudViewer {
    scene: CloudScene,
    pub ui: UiStrings,
    pub fps: f32,
    pub screenshot_requested: bool,
}

impl CloudViewer {
    pub fn new(settings: CloudSettings, width: u32, height: u32, ui: UiStrings) -> Result<Self, CloudError> {
        Ok(Self { scene: CloudScene::new(settings, width, height)?, ui, fps: 0.0, screenshot_requested: false })
    }

    pub fn scene(&self) -> &CloudScene {
        &self.scene
    }

    pub fn scene_mut(&mut self) -> &mut CloudScene {
        &mut self.scene
    }

    /// Writes the current settings, including the live camera pose, to `clouds.ron`.
    pub fn save_settings(&self) {
        let mut settings = self.scene.settings().clone();
        let camera = self.scene.camera();
        settings.camera.position = camera.position();
        settings.camera.fov_degrees = camera.fov_degrees();
        settings.camera.move_speed = camera.move_speed();
        settings.camera.mode = camera.mode();
        if let Err(e) = settings.save(SETTINGS_PATH) {
            error!("Failed to save settings: {e}");
        }
    }
}

impl FrameRenderer for CloudViewer {
    type Overlay = egui::Context;

    fn handle_input(&mut self, input: &FrameInput) {
        self.scene.handle_input(input);
    }

    fn update(&mut self, dt: f32) {
        self.scene.update(dt);
    }

    fn render_scene(&mut self) -> Result<(), CloudError> {
        self.scene.render_scene()
    }

    fn render_overlay(&mut self, ctx: &mut egui::Context) {
        overlay::draw(ctx, self);
    }

    fn resize(&mut self, width: u32, height: u32) {
        self.scene.resize(width, height);
    }
}

pub struct CloudViewerPlugin;

impl Plugin for CloudViewerPlugin {
    fn build(&self, app: &mut App) {
        app.add_systems(Startup, (setup_viewer, present::setup_target).chain())
            .add_systems(
                Update,
                (handle_resize, drive_frame, present::present_frame, controls::take_screenshot)
                    .chain()
                    .run_if(resource_exists::<CloudViewer>()),
            );
    }
}

fn setup_viewer(
    mut commands: Commands,
    mut windows: Query<&mut Window, With<bevy::window::PrimaryWindow>>,
    mut exit: EventWriter<AppExit>,
) {
    let settings = CloudSettings::load_or_init(SETTINGS_PATH);
    let ui = ui_strings::load_or_default(UI_STRINGS_PATH);
    let (width, height) = match windows.get_single_mut() {
        Ok(mut window) => {
            window.title = ui.app.window_title.clone();
            (window.width() as u32, window.height() as u32)
        }
        Err(_) => (1600, 900),
    };

    let bg = settings.render.background;
    commands.insert_resource(ClearColor(Color::rgba(bg.x, bg.y, bg.z, bg.w)));
    match CloudViewer::new(settings, width, height, ui) {
        Ok(viewer) => {
            info!("Cloud viewer started at {width}x{height}");
            commands.insert_resource(viewer);
        }
        Err(e) => {
            error!("Failed to start cloud renderer: {e}");
            exit.send(AppExit);
        }
    }
}

fn handle_resize(mut events: EventReader<WindowResized>, mut viewer: ResMut<CloudViewer>) {
    if let Some(e) = events.read().last() {
        viewer.resize(e.width.max(1.0) as u32, e.height.max(1.0) as u32);
    }
}

#[allow(clippy::too_many_arguments)]
fn drive_frame(
    time: Res<Time>,
    keys: Res<Input<KeyCode>>,
    buttons: Res<Input<MouseButton>>,
    mut motion: EventReader<MouseMotion>,
    mut wheel: EventReader<MouseWheel>,
    diagnostics: Res<DiagnosticsStore>,
    mut contexts: EguiContexts,
    mut viewer: ResMut<CloudViewer>,
    mut exit: EventWriter<AppExit>,
) {
    if let Some(fps) = diagnostics.get(FrameTimeDiagnosticsPlugin::FPS).and_then(|d| d.smoothed()) {
        viewer.fps = fps as f32;
    }

    let mut ctx = contexts.ctx_mut().clone();
    let focus = EguiFocus { pointer: ctx.wants_pointer_input(), keyboard: ctx.wants_keyboard_input() };
    let input = controls::gather_input(&keys, &buttons, &mut motion, &mut wheel, focus);

    if let Err(e) = run_frame(&mut *viewer, &input, time.delta_seconds(), &mut ctx) {
        error!("Cloud frame failed: {e}");
        exit.send(AppExit);
    }
}
