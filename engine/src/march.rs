use glam::{Mat4, UVec2, UVec3, Vec2, Vec3, Vec4, Vec4Swizzles};
use serde::{Deserialize, Serialize};
use tracing::debug;

use crate::api::CloudError;
use crate::buffer::ColorBuffer;
use crate::compute::{ComputeDevice, DispatchGrid};
use crate::density::{DensityField, DensityFieldParams, VolumeBindings};
use crate::lighting::LightingParams;
use crate::params::{ParamKind, ParameterSink};

pub const MAX_MARCH_STEPS: u32 = 512;
pub const MAX_RESOLUTION_DIVISOR: u32 = 16;
pub const PIXEL_WORKGROUP: UVec3 = UVec3::new(8, 8, 1);
/// Rays stop marching once this little light still gets through.
pub const EARLY_EXIT_TRANSMITTANCE: f32 = 0.01;

const BAYER_4X4: [u32; 16] = [0, 8, 2, 10, 12, 4, 14, 6, 3, 11, 1, 9, 15, 7, 13, 5];

/// Primary march and output configuration.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct RenderParams {
    pub march_steps: u32,
    /// Window size is divided by this to get the ray-marched resolution.
    pub resolution_divisor: u32,
    pub background: Vec4,
    /// Compute threads, 0 for one per core.
    pub threads: usize,
}

impl Default for RenderParams {
    fn default() -> Self {
        Self {
            march_steps: 48,
            resolution_divisor: 4,
            background: Vec4::new(0.0, 32.0 / 255.0, 48.0 / 255.0, 1.0),
            threads: 0,
        }
    }
}

impl RenderParams {
    pub fn sanitized(&self) -> Self {
        Self {
            march_steps: self.march_steps.clamp(1, MAX_MARCH_STEPS),
            resolution_divisor: self.resolution_divisor.clamp(1, MAX_RESOLUTION_DIVISOR),
            background: self.background.clamp(Vec4::ZERO, Vec4::ONE),
            ..*self
        }
    }

    pub fn validate(&self) -> Result<(), CloudError> {
        if self.march_steps == 0 || self.march_steps > MAX_MARCH_STEPS {
            return Err(CloudError::InvalidConfig(format!(
                "render.march_steps must be within 1..={MAX_MARCH_STEPS}, got {}",
                self.march_steps
            )));
        }
        if self.resolution_divisor == 0 || self.resolution_divisor > MAX_RESOLUTION_DIVISOR {
            return Err(CloudError::InvalidConfig(format!(
                "render.resolution_divisor must be within 1..={MAX_RESOLUTION_DIVISOR}, got {}",
                self.resolution_divisor
            )));
        }
        Ok(())
    }

    /// Ray-marched resolution for a window of `width` x `height`.
    pub fn render_size(&self, width: u32, height: u32) -> UVec2 {
        let divisor = self.resolution_divisor.max(1);
        UVec2::new((width / divisor).max(1), (height / divisor).max(1))
    }

    pub fn push(&self, sink: &mut dyn ParameterSink) -> Result<(), CloudError> {
        sink.set_int("marchStepCount", self.march_steps as i32)?;
        sink.set_color("clearColor", self.background)?;
        Ok(())
    }
}

const MARCH_PARAMETERS: &[(&str, ParamKind)] = &[
    ("cloudsBoxCenter", ParamKind::Vec3),
    ("cloudsBoxSideLength", ParamKind::Scalar),
    ("cloudsBoxHeight", ParamKind::Scalar),
    ("globalCoverage", ParamKind::Scalar),
    ("globalDensity", ParamKind::Scalar),
    ("densityEps", ParamKind::Scalar),
    ("detailWeight", ParamKind::Scalar),
    ("shapeScale", ParamKind::Scalar),
    ("detailScale", ParamKind::Scalar),
    ("shapeSettings", ParamKind::Vec4),
    ("detailSettings", ParamKind::Vec4),
    ("shapeOffset", ParamKind::Vec2),
    ("detailOffset", ParamKind::Vec2),
    ("lightPos", ParamKind::Vec3),
    ("lightColor", ParamKind::Color),
    ("lightIntensity", ParamKind::Scalar),
    ("lightmarchStepCount", ParamKind::Int),
    ("cloudAbsorption", ParamKind::Scalar),
    ("sunAbsorption", ParamKind::Scalar),
    ("minLightEnergy", ParamKind::Scalar),
    ("inScatter", ParamKind::Scalar),
    ("outScatter", ParamKind::Scalar),
    ("ivo", ParamKind::Scalar),
    ("sci", ParamKind::Scalar),
    ("sce", ParamKind::Scalar),
    ("cameraPos", ParamKind::Vec3),
    ("viewMtx", ParamKind::Matrix4),
    ("projMtx", ParamKind::Matrix4),
    ("marchStepCount", ParamKind::Int),
    ("clearColor", ParamKind::Color),
    ("reprojIdx", ParamKind::Int),
    ("useReprojection", ParamKind::Bool),
];

/// Parameter block of the ray-march pass.
#[derive(Debug, Clone, PartialEq)]
pub struct MarchUniforms {
    pub density: DensityFieldParams,
    pub lighting: LightingParams,
    pub camera_position: Vec3,
    pub view: Mat4,
    pub projection: Mat4,
    pub march_steps: u32,
    pub clear_color: Vec4,
    pub reproj_idx: u32,
    pub use_reprojection: bool,
}

impl Default for MarchUniforms {
    fn default() -> Self {
        let render = RenderParams::default();
        Self {
            density: DensityFieldParams::default(),
            lighting: LightingParams::default(),
            camera_position: Vec3::ZERO,
            view: Mat4::IDENTITY,
            projection: Mat4::IDENTITY,
            march_steps: render.march_steps,
            clear_color: render.background,
            reproj_idx: 0,
            use_reprojection: false,
        }
    }
}

impl ParameterSink for MarchUniforms {
    fn program(&self) -> &'static str {
        "raymarch"
    }

    fn declared(&self) -> &'static [(&'static str, ParamKind)] {
        MARCH_PARAMETERS
    }

    fn set_scalar(&mut self, name: &str, value: f32) -> Result<(), CloudError> {
        let slot = match name {
            "cloudsBoxSideLength" => &mut self.density.side_length,
            "cloudsBoxHeight" => &mut self.density.height,
            "globalCoverage" => &mut self.density.coverage,
            "globalDensity" => &mut self.density.density,
            "densityEps" => &mut self.density.density_eps,
            "detailWeight" => &mut self.density.detail_weight,
            "shapeScale" => &mut self.density.shape_scale,
            "detailScale" => &mut self.density.detail_scale,
            "lightIntensity" => &mut self.lighting.light_intensity,
            "cloudAbsorption" => &mut self.lighting.cloud_absorption,
            "sunAbsorption" => &mut self.lighting.sun_absorption,
            "minLightEnergy" => &mut self.lighting.min_light_energy,
            "inScatter" => &mut self.lighting.in_scatter,
            "outScatter" => &mut self.lighting.out_scatter,
            "ivo" => &mut self.lighting.ivo,
            "sci" => &mut self.lighting.sci,
            "sce" => &mut self.lighting.sce,
            _ => return Err(self.reject(name, ParamKind::Scalar)),
        };
        *slot = value;
        Ok(())
    }

    fn set_int(&mut self, name: &str, value: i32) -> Result<(), CloudError> {
        let slot = match name {
            "lightmarchStepCount" => &mut self.lighting.lightmarch_steps,
            "marchStepCount" => &mut self.march_steps,
            "reprojIdx" => &mut self.reproj_idx,
            _ => return Err(self.reject(name, ParamKind::Int)),
        };
        *slot = value.max(0) as u32;
        Ok(())
    }

    fn set_bool(&mut self, name: &str, value: bool) -> Result<(), CloudError> {
        match name {
            "useReprojection" => self.use_reprojection = value,
            _ => return Err(self.reject(name, ParamKind::Bool)),
        }
        Ok(())
    }

    fn set_vec2(&mut self, name: &str, value: Vec2) -> Result<(), CloudError> {
        let slot = match name {
            "shapeOffset" => &mut self.density.shape_offset,
            "detailOffset" => &mut self.density.detail_offset,
            _ => return Err(self.reject(name, ParamKind::Vec2)),
        };
        *slot = value;
        Ok(())
    }

    fn set_vec3(&mut self, name: &str, value: Vec3) -> Result<(), CloudError> {
        let slot = match name {
            "cloudsBoxCenter" => &mut self.density.box_center,
            "lightPos" => &mut self.lighting.light_position,
            "cameraPos" => &mut self.camera_position,
            _ => return Err(self.reject(name, ParamKind::Vec3)),
        };
        *slot = value;
        Ok(())
    }

    fn set_vec4(&mut self, name: &str, value: Vec4) -> Result<(), CloudError> {
        let slot = match name {
            "shapeSettings" => &mut self.density.shape_tuning,
            "detailSettings" => &mut self.density.detail_tuning,
            _ => return Err(self.reject(name, ParamKind::Vec4)),
        };
        *slot = value;
        Ok(())
    }

    fn set_matrix4(&mut self, name: &str, value: Mat4) -> Result<(), CloudError> {
        let slot = match name {
            "viewMtx" => &mut self.view,
            "projMtx" => &mut self.projection,
            _ => return Err(self.reject(name, ParamKind::Matrix4)),
        };
        *slot = value;
        Ok(())
    }

    fn set_color(&mut self, name: &str, value: Vec4) -> Result<(), CloudError> {
        let slot = match name {
            "lightColor" => &mut self.lighting.light_color,
            "clearColor" => &mut self.clear_color,
            _ => return Err(self.reject(name, ParamKind::Color)),
        };
        *slot = value;
        Ok(())
    }
}

/// Per-pixel sample offset along the ray in [0, 1).
///
/// A 4x4 ordered dither; with reprojection on it advances with the frame index so
/// 16 consecutive frames visit every offset once.
pub fn march_jitter(pixel: UVec2, reproj_idx: u32, use_reprojection: bool) -> f32 {
    let bayer = BAYER_4X4[((pixel.y % 4) * 4 + pixel.x % 4) as usize];
    let rank = if use_reprojection { (bayer + reproj_idx) % 16 } else { bayer };
    (rank as f32 + 0.5) / 16.0
}

/// Everything one pixel needs to shade its ray.
struct RayContext<'a> {
    field: DensityField<'a>,
    lighting: LightingParams,
    steps: u32,
    background: Vec4,
}

impl RayContext<'_> {
    fn shade(&self, origin: Vec3, dir: Vec3, jitter: f32) -> Vec4 {
        let Some((near, far)) = self.field.bounds().intersect(origin, dir) else {
            return self.background;
        };
        let step = (far - near) / self.steps as f32;
        if step <= 0.0 {
            return self.background;
        }
        let radiance = self.lighting.light_color.xyz() * self.lighting.light_intensity;

        let mut transmittance = 1.0;
        let mut light = Vec3::ZERO;
        let mut t = near + step * jitter;
        for _ in 0..self.steps {
            let p = origin + dir * t;
            let density = self.field.query(p);
            if density > 0.0 {
                // Point light: the scattering angle changes along the ray.
                let to_light = (self.lighting.light_position - p).normalize_or_zero();
                let phase = self.lighting.phase(dir.dot(to_light));
                let light_transmittance = self.lighting.light_march(&self.field, p);
                light += radiance * (transmittance * light_transmittance * phase * density * step);
                transmittance *= (-density * step * self.lighting.sun_absorption).exp();
                if transmittance < EARLY_EXIT_TRANSMITTANCE {
                    break;
                }
            }
            t += step;
        }
        (self.background.xyz() * transmittance + light).extend(self.background.w)
    }
}

/// Full-screen ray-march pass.
#[derive(Debug, Default)]
pub struct RayMarcher {
    frames: u64,
}

impl RayMarcher {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn frames(&self) -> u64 {
        self.frames
    }

    /// Shades a single ray against the bound volumes.
    pub fn shade_ray(bindings: VolumeBindings, uniforms: &MarchUniforms, origin: Vec3, dir: Vec3, jitter: f32) -> Vec4 {
        Self::context(bindings, uniforms).shade(origin, dir, jitter)
    }

    fn context<'a>(bindings: VolumeBindings<'a>, uniforms: &MarchUniforms) -> RayContext<'a> {
        RayContext {
            field: DensityField::new(&uniforms.density, bindings),
            lighting: uniforms.lighting.sanitized(),
            steps: uniforms.march_steps.clamp(1, MAX_MARCH_STEPS),
            background: uniforms.clear_color,
        }
    }

    /// Ray-marches every pixel of `target`. The barrier has run by the time this
    /// returns.
    pub fn render<D: ComputeDevice>(
        &mut self,
        device: &D,
        bindings: VolumeBindings,
        uniforms: &MarchUniforms,
        target: &mut ColorBuffer,
    ) -> Result<(), CloudError> {
        let ctx = Self::context(bindings, uniforms);
        let size = target.size();
        let inverse_view_proj = (uniforms.projection * uniforms.view).inverse();
        let origin = uniforms.camera_position;
        let extent = size.extend(1);

        let kernel = |id: UVec3| {
            let ndc = Vec2::new(
                (id.x as f32 + 0.5) / size.x as f32 * 2.0 - 1.0,
                1.0 - (id.y as f32 + 0.5) / size.y as f32 * 2.0,
            );
            let through = inverse_view_proj.project_point3(ndc.extend(0.5));
            let dir = (through - origin).normalize_or_zero();
            if dir == Vec3::ZERO {
                return ctx.background;
            }
            let jitter = march_jitter(id.truncate(), uniforms.reproj_idx, uniforms.use_reprojection);
            ctx.shade(origin, dir, jitter)
        };
        device
            .dispatch(DispatchGrid::covering(extent, PIXEL_WORKGROUP), extent, &mut target.pixels, kernel)?
            .barrier();
        self.frames += 1;
        debug!(width = size.x, height = size.y, steps = ctx.steps, "ray march pass");
        Ok(())
    }
}
