use std::f32::consts::PI;

use glam::{Vec3, Vec4};
use serde::{Deserialize, Serialize};

use crate::api::CloudError;
use crate::density::DensityField;
use crate::params::ParameterSink;

pub const MAX_LIGHTMARCH_STEPS: u32 = 64;

/// Single point light and the scattering model of the cloud medium.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct LightingParams {
    pub light_position: Vec3,
    pub light_color: Vec4,
    pub light_intensity: f32,
    pub lightmarch_steps: u32,
    pub cloud_absorption: f32,
    pub sun_absorption: f32,
    pub min_light_energy: f32,
    pub in_scatter: f32,
    pub out_scatter: f32,
    /// In-vs-out scattering balance.
    pub ivo: f32,
    /// Silver-lining intensity.
    pub sci: f32,
    /// Silver-lining exponent.
    pub sce: f32,
}

impl Default for LightingParams {
    fn default() -> Self {
        Self {
            light_position: Vec3::new(4.0, 8.0, 2.0),
            light_color: Vec4::new(1.0, 0.96, 0.9, 1.0),
            light_intensity: 12.0,
            lightmarch_steps: 6,
            cloud_absorption: 0.75,
            sun_absorption: 1.0,
            min_light_energy: 0.1,
            in_scatter: 0.3,
            out_scatter: 0.2,
            ivo: 0.5,
            sci: 1.0,
            sce: 2.0,
        }
    }
}

impl LightingParams {
    pub fn sanitized(&self) -> Self {
        Self {
            lightmarch_steps: self.lightmarch_steps.clamp(1, MAX_LIGHTMARCH_STEPS),
            cloud_absorption: self.cloud_absorption.max(0.0),
            sun_absorption: self.sun_absorption.max(0.0),
            min_light_energy: self.min_light_energy.clamp(0.0, 1.0),
            light_intensity: self.light_intensity.max(0.0),
            in_scatter: self.in_scatter.clamp(-0.99, 0.99),
            out_scatter: self.out_scatter.clamp(-0.99, 0.99),
            ivo: self.ivo.clamp(0.0, 1.0),
            sci: self.sci.max(0.0),
            sce: self.sce.max(0.0),
            ..*self
        }
    }

    pub fn validate(&self) -> Result<(), CloudError> {
        if self.lightmarch_steps == 0 || self.lightmarch_steps > MAX_LIGHTMARCH_STEPS {
            return Err(CloudError::InvalidConfig(format!(
                "lighting.lightmarch_steps must be within 1..={MAX_LIGHTMARCH_STEPS}, got {}",
                self.lightmarch_steps
            )));
        }
        if !(0.0..=1.0).contains(&self.min_light_energy) {
            return Err(CloudError::InvalidConfig(format!(
                "lighting.min_light_energy must be within [0, 1], got {}",
                self.min_light_energy
            )));
        }
        if self.cloud_absorption < 0.0 || self.sun_absorption < 0.0 {
            return Err(CloudError::InvalidConfig("absorption coefficients must be non-negative".into()));
        }
        if self.in_scatter.abs() >= 1.0 || self.out_scatter.abs() >= 1.0 {
            return Err(CloudError::InvalidConfig("scatter coefficients must be within (-1, 1)".into()));
        }
        Ok(())
    }

    pub fn push(&self, sink: &mut dyn ParameterSink) -> Result<(), CloudError> {
        sink.set_vec3("lightPos", self.light_position)?;
        sink.set_color("lightColor", self.light_color)?;
        sink.set_scalar("lightIntensity", self.light_intensity)?;
        sink.set_int("lightmarchStepCount", self.lightmarch_steps as i32)?;
        sink.set_scalar("cloudAbsorption", self.cloud_absorption)?;
        sink.set_scalar("sunAbsorption", self.sun_absorption)?;
        sink.set_scalar("minLightEnergy", self.min_light_energy)?;
        sink.set_scalar("inScatter", self.in_scatter)?;
        sink.set_scalar("outScatter", self.out_scatter)?;
        sink.set_scalar("ivo", self.ivo)?;
        sink.set_scalar("sci", self.sci)?;
        sink.set_scalar("sce", self.sce)?;
        Ok(())
    }

    /// Scattering weight for the cosine between the view ray and the light direction.
    pub fn phase(&self, cos_angle: f32) -> f32 {
        let forward = henyey_greenstein(cos_angle, self.in_scatter)
            .max(self.sci * cos_angle.clamp(0.0, 1.0).powf(self.sce));
        let backward = henyey_greenstein(cos_angle, -self.out_scatter);
        forward + (backward - forward) * self.ivo
    }

    /// Transmittance from `p` toward the light through `field`, floored at
    /// `min_light_energy`.
    pub fn light_march(&self, field: &DensityField, p: Vec3) -> f32 {
        let to_light = self.light_position - p;
        let light_distance = to_light.length();
        if light_distance <= f32::EPSILON {
            return 1.0;
        }
        let dir = to_light / light_distance;
        let distance = field.bounds().exit_distance(p, dir).min(light_distance);
        let steps = self.lightmarch_steps.max(1);
        let step = distance / steps as f32;

        let mut optical_depth = 0.0;
        for i in 0..steps {
            let sample = p + dir * (step * (i as f32 + 0.5));
            optical_depth += field.query(sample) * step;
        }
        let transmittance = (-optical_depth * self.cloud_absorption).exp();
        transmittance.max(self.min_light_energy)
    }
}

/// Henyey-Greenstein phase function, normalised over the sphere.
pub fn henyey_greenstein(cos_angle: f32, g: f32) -> f32 {
    let g2 = g * g;
    let denom = (1.0 + g2 - 2.0 * g * cos_angle).max(1e-6);
    (1.0 - g2) / (4.0 * PI * denom.powf(1.5))
}
