use glam::{Mat4, UVec2, Vec2, Vec3};
use serde::{Deserialize, Serialize};

use crate::api::CloudError;
use crate::frame::FrameInput;
use crate::params::ParameterSink;

pub const MIN_FOV_DEGREES: f32 = 10.0;
pub const MAX_FOV_DEGREES: f32 = 179.0;
const PITCH_LIMIT: f32 = 1.55;
const MIN_ORBIT_DISTANCE: f32 = 0.5;
const MAX_ORBIT_DISTANCE: f32 = 200.0;
const ZOOM_PER_LINE: f32 = 0.9;
const SPRINT_MULTIPLIER: f32 = 3.0;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub enum CameraMode {
    /// Circles `target` at a fixed distance.
    #[default]
    Orbit,
    FreeFly,
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct CameraSettings {
    pub position: Vec3,
    pub target: Vec3,
    pub fov_degrees: f32,
    pub mode: CameraMode,
    pub move_speed: f32,
    pub look_sensitivity: f32,
}

impl Default for CameraSettings {
    fn default() -> Self {
        Self {
            position: Vec3::new(5.0, 2.0, 5.0),
            target: Vec3::ZERO,
            fov_degrees: 90.0,
            mode: CameraMode::Orbit,
            move_speed: 2.5,
            look_sensitivity: 0.0025,
        }
    }
}

impl CameraSettings {
    pub fn sanitized(&self) -> Self {
        Self {
            fov_degrees: self.fov_degrees.clamp(MIN_FOV_DEGREES, MAX_FOV_DEGREES),
            move_speed: self.move_speed.max(0.0),
            look_sensitivity: self.look_sensitivity.max(0.0),
            ..*self
        }
    }

    pub fn validate(&self) -> Result<(), CloudError> {
        if !(MIN_FOV_DEGREES..=MAX_FOV_DEGREES).contains(&self.fov_degrees) {
            return Err(CloudError::InvalidConfig(format!(
                "camera.fov_degrees must be within {MIN_FOV_DEGREES}..={MAX_FOV_DEGREES}, got {}",
                self.fov_degrees
            )));
        }
        if self.position == self.target {
            return Err(CloudError::InvalidConfig("camera.position and camera.target coincide".into()));
        }
        Ok(())
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct Camera {
    position: Vec3,
    yaw: f32,
    pitch: f32,
    fov_degrees: f32,
    mode: CameraMode,
    target: Vec3,
    z_near: f32,
    z_far: f32,
    move_speed: f32,
    look_sensitivity: f32,
}

impl Default for Camera {
    fn default() -> Self {
        Self::from_settings(&CameraSettings::default())
    }
}

impl Camera {
    pub fn from_settings(settings: &CameraSettings) -> Self {
        let settings = settings.sanitized();
        let mut camera = Self {
            position: settings.position,
            yaw: 0.0,
            pitch: 0.0,
            fov_degrees: settings.fov_degrees,
            mode: settings.mode,
            target: settings.target,
            z_near: 0.05,
            z_far: 1000.0,
            move_speed: settings.move_speed,
            look_sensitivity: settings.look_sensitivity,
        };
        camera.look_at(settings.target);
        camera
    }

    pub fn looking_at(position: Vec3, target: Vec3) -> Self {
        Self::from_settings(&CameraSettings { position, target, ..Default::default() })
    }

    pub fn position(&self) -> Vec3 {
        self.position
    }

    pub fn yaw(&self) -> f32 {
        self.yaw
    }

    pub fn pitch(&self) -> f32 {
        self.pitch
    }

    pub fn mode(&self) -> CameraMode {
        self.mode
    }

    pub fn target(&self) -> Vec3 {
        self.target
    }

    pub fn fov_degrees(&self) -> f32 {
        self.fov_degrees
    }

    pub fn set_fov_degrees(&mut self, fov: f32) {
        self.fov_degrees = fov.clamp(MIN_FOV_DEGREES, MAX_FOV_DEGREES);
    }

    pub fn move_speed(&self) -> f32 {
        self.move_speed
    }

    /// Free-fly speed in units per second; negative speeds are clamped to 0.
    pub fn set_move_speed(&mut self, speed: f32) {
        self.move_speed = speed.max(0.0);
    }

    pub fn forward(&self) -> Vec3 {
        Vec3::new(
            self.yaw.sin() * self.pitch.cos(),
            self.pitch.sin(),
            self.yaw.cos() * self.pitch.cos(),
        )
        .normalize()
    }

    /// Turns toward `target` without moving.
    pub fn look_at(&mut self, target: Vec3) {
        let dir = (target - self.position).normalize_or_zero();
        if dir == Vec3::ZERO {
            return;
        }
        self.yaw = dir.x.atan2(dir.z);
        self.pitch = dir.y.clamp(-1.0, 1.0).asin().clamp(-PITCH_LIMIT, PITCH_LIMIT);
    }

    pub fn toggle_mode(&mut self) {
        self.mode = match self.mode {
            CameraMode::Orbit => CameraMode::FreeFly,
            CameraMode::FreeFly => {
                self.look_at(self.target);
                CameraMode::Orbit
            }
        };
    }

    pub fn view(&self) -> Mat4 {
        Mat4::look_at_rh(self.position, self.position + self.forward(), Vec3::Y)
    }

    pub fn projection(&self, aspect: f32) -> Mat4 {
        Mat4::perspective_rh(self.fov_degrees.to_radians(), aspect.max(1e-3), self.z_near, self.z_far)
    }

    pub fn view_projection(&self, aspect: f32) -> Mat4 {
        self.projection(aspect) * self.view()
    }

    /// World-space ray through the center of `pixel`, rows top to bottom.
    pub fn ray(&self, pixel: UVec2, viewport: UVec2) -> (Vec3, Vec3) {
        let viewport = viewport.max(UVec2::ONE).as_vec2();
        let ndc = Vec2::new(
            (pixel.x as f32 + 0.5) / viewport.x * 2.0 - 1.0,
            1.0 - (pixel.y as f32 + 0.5) / viewport.y * 2.0,
        );
        let inverse = self.view_projection(viewport.x / viewport.y).inverse();
        let through = inverse.project_point3(ndc.extend(0.5));
        (self.position, (through - self.position).normalize_or_zero())
    }

    pub fn integrate_input(&mut self, input: &FrameInput, dt: f32) {
        if input.toggle_camera_mode {
            self.toggle_mode();
        }
        let turned = input.looking && input.look_delta != Vec2::ZERO;
        if turned {
            self.yaw -= input.look_delta.x * self.look_sensitivity;
            self.pitch = (self.pitch - input.look_delta.y * self.look_sensitivity).clamp(-PITCH_LIMIT, PITCH_LIMIT);
        }
        let dt = if dt.is_finite() { dt.max(0.0) } else { 0.0 };

        match self.mode {
            // Only re-derive the position on change so a still camera stays bit-identical.
            CameraMode::Orbit if turned || input.scroll != 0.0 || input.toggle_camera_mode => {
                let mut distance = self.position.distance(self.target);
                if input.scroll != 0.0 {
                    distance *= ZOOM_PER_LINE.powf(input.scroll);
                }
                let distance = distance.clamp(MIN_ORBIT_DISTANCE, MAX_ORBIT_DISTANCE);
                self.position = self.target - self.forward() * distance;
            }
            CameraMode::Orbit => {}
            CameraMode::FreeFly => {
                let forward = self.forward();
                let right = forward.cross(Vec3::Y).normalize_or_zero();
                let up = right.cross(forward).normalize_or_zero();
                let intent = right * input.movement.x + up * input.movement.y + forward * input.movement.z;
                if intent.length_squared() > 0.0 {
                    let speed = if input.sprint { self.move_speed * SPRINT_MULTIPLIER } else { self.move_speed };
                    self.position += intent.normalize() * speed * dt;
                }
            }
        }
    }

    pub fn push(&self, sink: &mut dyn ParameterSink, aspect: f32) -> Result<(), CloudError> {
        sink.set_vec3("cameraPos", self.position)?;
        sink.set_matrix4("viewMtx", self.view())?;
        sink.set_matrix4("projMtx", self.projection(aspect))?;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn close(a: Vec3, b: Vec3) -> bool {
        (a - b).abs().max_element() < 1e-4
    }

    #[test]
    fn default_camera_faces_the_origin() {
        let camera = Camera::default();
        assert_eq!(camera.position(), Vec3::new(5.0, 2.0, 5.0));
        assert!(close(camera.forward(), (-camera.position()).normalize()));
        assert_eq!(camera.fov_degrees(), 90.0);
    }

    #[test]
    fn center_ray_follows_forward() {
        let camera = Camera::looking_at(Vec3::new(0.0, 0.0, 6.0), Vec3::ZERO);
        let (origin, dir) = camera.ray(UVec2::new(50, 50), UVec2::new(101, 101));
        assert_eq!(origin, camera.position());
        assert!(close(dir, Vec3::NEG_Z));
        let (_, left) = camera.ray(UVec2::new(0, 50), UVec2::new(101, 101));
        assert!(left.x < 0.0);
        let (_, top) = camera.ray(UVec2::new(50, 0), UVec2::new(101, 101));
        assert!(top.y > 0.0);
    }

    #[test]
    fn orbit_keeps_distance_and_zooms() {
        let mut camera = Camera::default();
        let distance = camera.position().distance(camera.target());
        let turn = FrameInput { looking: true, look_delta: Vec2::new(200.0, -40.0), ..Default::default() };
        camera.integrate_input(&turn, 0.016);
        assert!((camera.position().distance(camera.target()) - distance).abs() < 1e-4);
        assert!(close(camera.forward(), (camera.target() - camera.position()).normalize()));

        camera.integrate_input(&FrameInput { scroll: 2.0, ..Default::default() }, 0.016);
        let zoomed = camera.position().distance(camera.target());
        assert!((zoomed - distance * 0.81).abs() < 1e-3);
    }

    #[test]
    fn free_fly_moves_along_view() {
        let mut camera = Camera::looking_at(Vec3::new(0.0, 0.0, 6.0), Vec3::ZERO);
        camera.integrate_input(&FrameInput { toggle_camera_mode: true, ..Default::default() }, 0.0);
        assert_eq!(camera.mode(), CameraMode::FreeFly);
        let forward = FrameInput { movement: Vec3::Z, ..Default::default() };
        camera.integrate_input(&forward, 1.0);
        assert!(close(camera.position(), Vec3::new(0.0, 0.0, 3.5)));
        camera.integrate_input(&FrameInput { movement: Vec3::Z, sprint: true, ..Default::default() }, 0.1);
        assert!(close(camera.position(), Vec3::new(0.0, 0.0, 2.75)));
    }

    #[test]
    fn move_speed_scales_free_fly_and_never_reverses() {
        let mut camera = Camera::looking_at(Vec3::new(0.0, 0.0, 6.0), Vec3::ZERO);
        camera.toggle_mode();
        let forward = FrameInput { movement: Vec3::Z, ..Default::default() };

        camera.set_move_speed(-3.0);
        assert_eq!(camera.move_speed(), 0.0);
        camera.integrate_input(&forward, 1.0);
        assert!(close(camera.position(), Vec3::new(0.0, 0.0, 6.0)));

        camera.set_move_speed(4.0);
        camera.integrate_input(&forward, 0.5);
        assert!(close(camera.position(), Vec3::new(0.0, 0.0, 4.0)));
    }

    #[test]
    fn pitch_and_fov_are_limited() {
        let mut camera = Camera::default();
        let up = FrameInput { looking: true, look_delta: Vec2::new(0.0, -1.0e6), ..Default::default() };
        camera.integrate_input(&up, 0.016);
        assert!(camera.pitch() <= PITCH_LIMIT);
        camera.set_fov_degrees(400.0);
        assert_eq!(camera.fov_degrees(), MAX_FOV_DEGREES);
        camera.set_fov_degrees(1.0);
        assert_eq!(camera.fov_degrees(), MIN_FOV_DEGREES);
        assert!(CameraSettings { fov_degrees: 5.0, ..Default::default() }.validate().is_err());
    }
}
