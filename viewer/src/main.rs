use bevy::diagnostic::FrameTimeDiagnosticsPlugin;
use bevy::log::LogPlugin;
use bevy::prelude::*;
use bevy_egui::EguiPlugin;

mod controls;
mod overlay;
mod present;
mod ui_strings;
mod viewer;

use crate::viewer::CloudViewerPlugin;

fn main() {
    App::new()
        .insert_resource(ClearColor(Color::rgb_u8(0, 32, 48)))
        .add_plugins(DefaultPlugins
            .set(WindowPlugin {
                primary_window: Some(Window {
                    title: "Clouds".into(),
                    resolution: (1600.0, 900.0).into(),
                    resizable: true,
                    ..default()
                }),
                ..default()
            })
            .set(LogPlugin {
                filter: "info,wgpu_core=warn,wgpu_hal=warn,cloud_engine=info".into(),
                level: bevy::log::Level::INFO,
            })
        )
        .add_plugins(FrameTimeDiagnosticsPlugin::default())
        .add_plugins(EguiPlugin)
        .add_plugins(CloudViewerPlugin)
        .run();
}
