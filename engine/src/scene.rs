use std::path::Path;
use std::time::Duration;

use glam::UVec2;
use tracing::info;

use crate::animation::AnimationDriver;
use crate::api::CloudError;
use crate::buffer::ColorBuffer;
use crate::camera::Camera;
use crate::compute::RayonDevice;
use crate::density::VolumeBindings;
use crate::frame::{FrameInput, FrameRenderer};
use crate::march::{MarchUniforms, RayMarcher};
use crate::reprojection::{CompositeUniforms, ReprojectionState};
use crate::settings::CloudSettings;
use crate::volume::{NoiseVolume, VolumeGenerator};

#[derive(Debug, Clone, Copy, PartialEq, Default)]
pub struct SceneStats {
    pub frames: u64,
    pub reproj_idx: u32,
    pub history_valid: bool,
    pub generations: u64,
    pub last_generation: Duration,
    pub viewport: UVec2,
    pub render_size: UVec2,
    pub threads: usize,
}

/// The whole cloud pipeline behind the frame-loop hooks.
pub struct CloudScene {
    device: RayonDevice,
    settings: CloudSettings,
    generated: CloudSettings,
    shape: NoiseVolume,
    detail: NoiseVolume,
    generator: VolumeGenerator,
    camera: Camera,
    animation: AnimationDriver,
    reprojection: ReprojectionState,
    marcher: RayMarcher,
    march_uniforms: MarchUniforms,
    composite_uniforms: CompositeUniforms,
    frame: ColorBuffer,
    pending_input: FrameInput,
    viewport: UVec2,
    frames: u64,
    presenting_history: bool,
}

impl CloudScene {
    /// Builds the device and generates both volumes; fails when either step does.
    pub fn new(mut settings: CloudSettings, width: u32, height: u32) -> Result<Self, CloudError> {
        settings.sanitize();
        let device = RayonDevice::new(settings.render.threads)?;
        let viewport = UVec2::new(width, height).max(UVec2::ONE);
        let render_size = settings.render.render_size(viewport.x, viewport.y);
        let mut scene = Self {
            device,
            camera: Camera::from_settings(&settings.camera),
            generated: settings.clone(),
            shape: NoiseVolume::new(settings.shape.size),
            detail: NoiseVolume::new(settings.detail.size),
            generator: VolumeGenerator::new(),
            animation: AnimationDriver::new(),
            reprojection: ReprojectionState::new(render_size.x, render_size.y),
            marcher: RayMarcher::new(),
            march_uniforms: MarchUniforms::default(),
            composite_uniforms: CompositeUniforms::default(),
            frame: ColorBuffer::new(render_size.x, render_size.y, settings.render.background),
            pending_input: FrameInput::default(),
            viewport,
            frames: 0,
            presenting_history: false,
            settings,
        };
        scene.regenerate()?;
        info!(width = viewport.x, height = viewport.y, "cloud scene ready");
        Ok(scene)
    }

    pub fn settings(&self) -> &CloudSettings {
        &self.settings
    }

    /// Edits take effect on the next `render_scene`.
    pub fn settings_mut(&mut self) -> &mut CloudSettings {
        &mut self.settings
    }

    pub fn camera(&self) -> &Camera {
        &self.camera
    }

    pub fn camera_mut(&mut self) -> &mut Camera {
        &mut self.camera
    }

    pub fn animation(&self) -> &AnimationDriver {
        &self.animation
    }

    pub fn reprojection(&self) -> &ReprojectionState {
        &self.reprojection
    }

    pub fn volumes(&self) -> (&NoiseVolume, &NoiseVolume) {
        (&self.shape, &self.detail)
    }

    pub fn device(&self) -> &RayonDevice {
        &self.device
    }

    /// Frame to show: the composite when reprojection is on, else the fresh march.
    pub fn presented(&self) -> &ColorBuffer {
        if self.presenting_history {
            self.reprojection.history()
        } else {
            &self.frame
        }
    }

    /// Output of the latest ray-march pass, before compositing.
    pub fn fresh_frame(&self) -> &ColorBuffer {
        &self.frame
    }

    pub fn stats(&self) -> SceneStats {
        SceneStats {
            frames: self.frames,
            reproj_idx: self.reprojection.index(),
            history_valid: self.reprojection.history_valid(),
            generations: self.generator.generations(),
            last_generation: self.generator.last_elapsed(),
            viewport: self.viewport,
            render_size: self.frame.size(),
            threads: self.device.threads(),
        }
    }

    /// Regenerates both noise volumes from the current settings.
    pub fn regenerate(&mut self) -> Result<(), CloudError> {
        self.generator.generate(
            &self.device,
            &mut self.shape,
            &self.settings.shape,
            &mut self.detail,
            &self.settings.detail,
        )?;
        self.generated = self.settings.clone();
        self.reprojection.invalidate("volumes regenerated");
        Ok(())
    }

    pub fn save_screenshot<P: AsRef<Path>>(&self, path: P) -> Result<(), CloudError> {
        let path = path.as_ref();
        self.presented().save_png(path)?;
        info!(path = %path.display(), "screenshot saved");
        Ok(())
    }

    fn aspect(&self) -> f32 {
        self.viewport.x as f32 / self.viewport.y as f32
    }

    fn push_uniforms(&mut self) -> Result<(), CloudError> {
        let aspect = self.aspect();
        let mut density = self.settings.density;
        density.shape_tuning = self.settings.shape.tuning;
        density.detail_tuning = self.settings.detail.tuning;
        self.animation.apply(&mut density);

        density.push(&mut self.march_uniforms)?;
        self.settings.lighting.push(&mut self.march_uniforms)?;
        self.settings.render.push(&mut self.march_uniforms)?;
        self.camera.push(&mut self.march_uniforms, aspect)?;
        self.reprojection.push_frame(&mut self.march_uniforms, self.settings.reprojection.enabled)?;
        self.settings.reprojection.push(&mut self.composite_uniforms)?;
        Ok(())
    }
}

impl FrameRenderer for CloudScene {
    /// Headless: nothing is drawn on top of the frame.
    type Overlay = ();

    fn handle_input(&mut self, input: &FrameInput) {
        self.pending_input = *input;
    }

    fn update(&mut self, dt: f32) {
        let input = std::mem::take(&mut self.pending_input);
        self.camera.integrate_input(&input, dt);
        self.animation.update(dt, &self.settings.animation);
    }

    fn render_scene(&mut self) -> Result<(), CloudError> {
        self.settings.sanitize();
        if self.settings.needs_regeneration(&self.generated) {
            self.regenerate()?;
        }

        let render_size = self.settings.render.render_size(self.viewport.x, self.viewport.y);
        self.frame.resize(render_size.x, render_size.y, self.settings.render.background);
        self.push_uniforms()?;
        self.reprojection.observe_view_projection(self.camera.view_projection(self.aspect()));

        let bindings = VolumeBindings { shape: &self.shape, detail: &self.detail };
        self.marcher.render(&self.device, bindings, &self.march_uniforms, &mut self.frame)?;

        if self.settings.reprojection.enabled {
            self.reprojection.composite(&self.device, &self.frame, &self.composite_uniforms)?;
            self.presenting_history = true;
        } else {
            self.reprojection.bypass();
            self.presenting_history = false;
        }
        self.reprojection.advance();
        self.frames += 1;
        Ok(())
    }

    fn render_overlay(&mut self, _overlay: &mut ()) {}

    fn resize(&mut self, width: u32, height: u32) {
        self.viewport = UVec2::new(width, height).max(UVec2::ONE);
        let render_size = self.settings.render.render_size(self.viewport.x, self.viewport.y);
        self.reprojection.resize(render_size.x, render_size.y);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::frame::run_frame;
    use crate::volume::VolumeParams;

    fn small_settings() -> CloudSettings {
        let mut settings = CloudSettings::default();
        settings.shape = VolumeParams { size: 32, ..VolumeParams::shape() };
        settings.render.threads = 2;
        settings.render.march_steps = 16;
        settings.render.resolution_divisor = 8;
        settings
    }

    #[test]
    fn frames_advance_the_reprojection_cycle() {
        let mut scene = CloudScene::new(small_settings(), 160, 96).unwrap();
        for frame in 1..=20u64 {
            run_frame(&mut scene, &FrameInput::default(), 0.016, &mut ()).unwrap();
            assert_eq!(scene.stats().frames, frame);
            assert_eq!(scene.stats().reproj_idx, (frame % 16) as u32);
        }
        assert_eq!(scene.presented().size(), UVec2::new(20, 12));
        assert!(scene.stats().history_valid);
    }

    #[test]
    fn only_noise_edits_regenerate() {
        let mut scene = CloudScene::new(small_settings(), 64, 64).unwrap();
        assert_eq!(scene.stats().generations, 1);
        scene.settings_mut().density.coverage = 0.9;
        scene.render_scene().unwrap();
        assert_eq!(scene.stats().generations, 1);
        scene.settings_mut().detail.seed = 99;
        scene.render_scene().unwrap();
        assert_eq!(scene.stats().generations, 2);
        assert_eq!(scene.volumes().1.params().map(|p| p.seed), Some(99));
    }

    #[test]
    fn disabled_reprojection_presents_fresh_frame() {
        let mut settings = small_settings();
        settings.reprojection.enabled = false;
        let mut scene = CloudScene::new(settings, 64, 64).unwrap();
        for _ in 0..2 {
            scene.render_scene().unwrap();
            assert!(!scene.stats().history_valid);
            assert_eq!(scene.presented().size(), UVec2::new(8, 8));
            assert!(std::ptr::eq(scene.presented(), scene.fresh_frame()));
            assert_eq!(scene.presented(), scene.fresh_frame());
        }
        assert_eq!(scene.reprojection().composites(), 0);
    }

    #[test]
    fn degenerate_edits_are_clamped_before_marching() {
        let mut scene = CloudScene::new(small_settings(), 64, 64).unwrap();
        scene.settings_mut().density.side_length = 0.0;
        scene.settings_mut().render.march_steps = 0;
        scene.render_scene().unwrap();
        assert!(scene.settings().density.side_length > 0.0);
        assert_eq!(scene.settings().render.march_steps, 1);
    }
}
