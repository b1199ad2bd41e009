use glam::{Vec2, Vec3};

use crate::api::CloudError;

/// Windowing-agnostic input gathered once per frame.
#[derive(Debug, Clone, Copy, Default, PartialEq)]
pub struct FrameInput {
    /// Movement intent: x right, y up, z forward, each in [-1, 1].
    pub movement: Vec3,
    /// Pointer motion in pixels since the previous frame.
    pub look_delta: Vec2,
    /// Whether pointer motion should turn the camera this frame.
    pub looking: bool,
    /// Scroll lines since the previous frame.
    pub scroll: f32,
    pub toggle_camera_mode: bool,
    pub sprint: bool,
}

/// Capability set the frame loop drives.
pub trait FrameRenderer {
    /// Context handed to the debug overlay (an immediate-mode UI in the viewer).
    type Overlay: ?Sized;

    fn handle_input(&mut self, input: &FrameInput);

    fn update(&mut self, dt: f32);

    fn render_scene(&mut self) -> Result<(), CloudError>;

    fn render_overlay(&mut self, overlay: &mut Self::Overlay);

    fn resize(&mut self, width: u32, height: u32);
}

/// Runs one frame: input, update, scene, overlay. Presentation is left to the caller.
pub fn run_frame<R: FrameRenderer>(
    renderer: &mut R,
    input: &FrameInput,
    dt: f32,
    overlay: &mut R::Overlay,
) -> Result<(), CloudError> {
    renderer.handle_input(input);
    renderer.update(dt);
    renderer.render_scene()?;
    renderer.render_overlay(overlay);
    Ok(())
}
