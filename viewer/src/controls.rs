use bevy::input::mouse::{MouseMotion, MouseScrollUnit, MouseWheel};
use bevy::prelude::*;
use cloud_engine::FrameInput;

use crate::viewer::CloudViewer;

pub const SCREENSHOT_DIR: &str = "screenshots";
const PIXELS_PER_LINE: f32 = 50.0;

/// Pointer and keyboard state the overlay already claimed this frame.
#[derive(Debug, Clone, Copy, Default)]
pub struct EguiFocus {
    pub pointer: bool,
    pub keyboard: bool,
}

fn axis(keys: &Input<KeyCode>, positive: KeyCode, negative: KeyCode) -> f32 {
    let mut value = 0.0;
    if keys.pressed(positive) { value += 1.0; }
    if keys.pressed(negative) { value -= 1.0; }
    value
}

/// Collects this frame's input into the renderer's windowing-agnostic form.
pub fn gather_input(
    keys: &Input<KeyCode>,
    buttons: &Input<MouseButton>,
    motion: &mut EventReader<MouseMotion>,
    wheel: &mut EventReader<MouseWheel>,
    focus: EguiFocus,
) -> FrameInput {
    let look_delta: Vec2 = motion.read().map(|m| m.delta).sum();
    let scroll: f32 = wheel
        .read()
        .map(|w| match w.unit {
            MouseScrollUnit::Line => w.y,
            MouseScrollUnit::Pixel => w.y / PIXELS_PER_LINE,
        })
        .sum();

    let mut input = FrameInput::default();
    if !focus.pointer {
        input.looking = buttons.pressed(MouseButton::Right);
        input.look_delta = look_delta;
        input.scroll = scroll;
    }
    if !focus.keyboard {
        input.movement = Vec3::new(
            axis(keys, KeyCode::D, KeyCode::A),
            axis(keys, KeyCode::E, KeyCode::Q),
            axis(keys, KeyCode::W, KeyCode::S),
        );
        input.sprint = keys.pressed(KeyCode::ShiftLeft) || keys.pressed(KeyCode::ShiftRight);
        input.toggle_camera_mode = keys.just_pressed(KeyCode::Tab);
    }
    input
}

pub fn screenshot_path() -> String {
    format!("{SCREENSHOT_DIR}/clouds_{}.png", chrono::Local::now().format("%Y%m%d_%H%M%S%.3f"))
}

pub fn take_screenshot(keys: Res<Input<KeyCode>>, mut viewer: ResMut<CloudViewer>) {
    if keys.just_pressed(KeyCode::F12) {
        viewer.screenshot_requested = true;
    }
    if !viewer.screenshot_requested {
        return;
    }
    viewer.screenshot_requested = false;
    let path = screenshot_path();
    match viewer.scene().save_screenshot(&path) {
        Ok(()) => info!("Screenshot saved to {path}"),
        Err(e) => error!("Failed to save screenshot {path}: {e}"),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn screenshot_names_are_timestamped_pngs() {
        let path = screenshot_path();
        assert!(path.starts_with("screenshots/clouds_"));
        assert!(path.ends_with(".png"));
    }

    #[test]
    fn opposing_keys_cancel() {
        let mut keys = Input::<KeyCode>::default();
        keys.press(KeyCode::W);
        keys.press(KeyCode::S);
        keys.press(KeyCode::D);
        assert_eq!(axis(&keys, KeyCode::W, KeyCode::S), 0.0);
        assert_eq!(axis(&keys, KeyCode::D, KeyCode::A), 1.0);
    }
}
