use glam::{Vec2, Vec3, Vec4};
use serde::{Deserialize, Serialize};

use crate::api::CloudError;
use crate::params::ParameterSink;
use crate::volume::{NoiseVolume, VolumeParams};

pub const MIN_BOX_EXTENT: f32 = 0.01;
pub const MIN_GRID_SCALE: f32 = 0.001;

/// Axis-aligned cloud container.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct CloudBox {
    pub center: Vec3,
    pub half_extent: Vec3,
}

impl CloudBox {
    pub fn new(center: Vec3, side_length: f32, height: f32) -> Self {
        Self { center, half_extent: Vec3::new(side_length, height, side_length) * 0.5 }
    }

    pub fn min(&self) -> Vec3 {
        self.center - self.half_extent
    }

    pub fn max(&self) -> Vec3 {
        self.center + self.half_extent
    }

    pub fn contains(&self, p: Vec3) -> bool {
        (p - self.center).abs().cmple(self.half_extent).all()
    }

    /// Slab test. Returns the entry and exit distances along `dir`, with the entry
    /// clamped to zero when `origin` is inside.
    pub fn intersect(&self, origin: Vec3, dir: Vec3) -> Option<(f32, f32)> {
        let inv = dir.recip();
        let t0 = (self.min() - origin) * inv;
        let t1 = (self.max() - origin) * inv;
        let near = t0.min(t1).max_element().max(0.0);
        let far = t0.max(t1).min_element();
        (far >= near && far.is_finite()).then_some((near, far))
    }

    /// Distance from `origin` (inside the box) to the boundary along `dir`.
    pub fn exit_distance(&self, origin: Vec3, dir: Vec3) -> f32 {
        self.intersect(origin, dir).map(|(_, far)| far).unwrap_or(0.0)
    }
}

/// Global density controls and container of the cloud layer.
///
/// Offsets and tuning vectors are refreshed every frame from the animation driver and
/// the generated volumes, so they are not persisted.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct DensityFieldParams {
    pub box_center: Vec3,
    pub side_length: f32,
    pub height: f32,
    pub coverage: f32,
    pub density: f32,
    pub density_eps: f32,
    pub detail_weight: f32,
    pub shape_scale: f32,
    pub detail_scale: f32,
    #[serde(skip)]
    pub shape_tuning: Vec4,
    #[serde(skip)]
    pub detail_tuning: Vec4,
    #[serde(skip)]
    pub shape_offset: Vec2,
    #[serde(skip)]
    pub detail_offset: Vec2,
}

impl Default for DensityFieldParams {
    fn default() -> Self {
        Self {
            box_center: Vec3::ZERO,
            side_length: 2.0,
            height: 2.0,
            coverage: 0.55,
            density: 4.0,
            density_eps: 0.01,
            detail_weight: 0.35,
            shape_scale: 2.0,
            detail_scale: 0.5,
            shape_tuning: VolumeParams::shape().tuning,
            detail_tuning: VolumeParams::detail().tuning,
            shape_offset: Vec2::ZERO,
            detail_offset: Vec2::ZERO,
        }
    }
}

impl DensityFieldParams {
    pub fn bounds(&self) -> CloudBox {
        CloudBox::new(self.box_center, self.side_length, self.height)
    }

    pub fn sanitized(&self) -> Self {
        Self {
            side_length: if self.side_length.is_finite() { self.side_length.max(MIN_BOX_EXTENT) } else { MIN_BOX_EXTENT },
            height: if self.height.is_finite() { self.height.max(MIN_BOX_EXTENT) } else { MIN_BOX_EXTENT },
            coverage: self.coverage.clamp(0.0, 1.0),
            density: self.density.max(0.0),
            density_eps: self.density_eps.max(0.0),
            detail_weight: self.detail_weight.max(0.0),
            shape_scale: self.shape_scale.max(MIN_GRID_SCALE),
            detail_scale: self.detail_scale.max(MIN_GRID_SCALE),
            ..*self
        }
    }

    pub fn validate(&self) -> Result<(), CloudError> {
        if !(self.side_length > 0.0) || !(self.height > 0.0) {
            return Err(CloudError::InvalidConfig(format!(
                "density box must have positive side length and height, got {} x {}",
                self.side_length, self.height
            )));
        }
        if !(0.0..=1.0).contains(&self.coverage) {
            return Err(CloudError::InvalidConfig(format!("density.coverage must be within [0, 1], got {}", self.coverage)));
        }
        if !(self.shape_scale > 0.0) || !(self.detail_scale > 0.0) {
            return Err(CloudError::InvalidConfig("density grid scales must be positive".into()));
        }
        if self.density < 0.0 || self.density_eps < 0.0 || self.detail_weight < 0.0 {
            return Err(CloudError::InvalidConfig("density, density_eps and detail_weight must be non-negative".into()));
        }
        Ok(())
    }

    pub fn push(&self, sink: &mut dyn ParameterSink) -> Result<(), CloudError> {
        sink.set_vec3("cloudsBoxCenter", self.box_center)?;
        sink.set_scalar("cloudsBoxSideLength", self.side_length)?;
        sink.set_scalar("cloudsBoxHeight", self.height)?;
        sink.set_scalar("globalCoverage", self.coverage)?;
        sink.set_scalar("globalDensity", self.density)?;
        sink.set_scalar("densityEps", self.density_eps)?;
        sink.set_scalar("detailWeight", self.detail_weight)?;
        sink.set_scalar("shapeScale", self.shape_scale)?;
        sink.set_scalar("detailScale", self.detail_scale)?;
        sink.set_vec4("shapeSettings", self.shape_tuning)?;
        sink.set_vec4("detailSettings", self.detail_tuning)?;
        sink.set_vec2("shapeOffset", self.shape_offset)?;
        sink.set_vec2("detailOffset", self.detail_offset)?;
        Ok(())
    }
}

/// Volumes bound for reading by one draw.
#[derive(Debug, Clone, Copy)]
pub struct VolumeBindings<'a> {
    pub shape: &'a NoiseVolume,
    pub detail: &'a NoiseVolume,
}

/// Read-only density query over the bound volumes.
pub struct DensityField<'a> {
    params: DensityFieldParams,
    bounds: CloudBox,
    bindings: VolumeBindings<'a>,
    inv_shape_weight: f32,
    inv_detail_weight: f32,
}

fn inverse_weight(tuning: Vec4) -> f32 {
    let sum = tuning.max(Vec4::ZERO).dot(Vec4::ONE);
    if sum > f32::EPSILON { 1.0 / sum } else { 0.0 }
}

impl<'a> DensityField<'a> {
    pub fn new(params: &DensityFieldParams, bindings: VolumeBindings<'a>) -> Self {
        let params = params.sanitized();
        Self {
            bounds: params.bounds(),
            inv_shape_weight: inverse_weight(params.shape_tuning),
            inv_detail_weight: inverse_weight(params.detail_tuning),
            params,
            bindings,
        }
    }

    pub fn params(&self) -> &DensityFieldParams {
        &self.params
    }

    pub fn bounds(&self) -> &CloudBox {
        &self.bounds
    }

    /// Shape eroded by detail, in roughly [-1, 1], before coverage and density.
    pub fn raw(&self, p: Vec3) -> f32 {
        let shape_uvw = p / self.params.shape_scale + Vec3::new(self.params.shape_offset.x, 0.0, self.params.shape_offset.y);
        let detail_uvw = p / self.params.detail_scale + Vec3::new(self.params.detail_offset.x, 0.0, self.params.detail_offset.y);
        let shape = self.bindings.shape.sample(shape_uvw).dot(Vec4::ONE) * self.inv_shape_weight;
        let detail = self.bindings.detail.sample(detail_uvw).dot(Vec4::ONE) * self.inv_detail_weight;
        shape - (1.0 - shape) * detail * self.params.detail_weight
    }

    /// Density at a world position: zero outside the box and for values below `density_eps`.
    pub fn query(&self, p: Vec3) -> f32 {
        if !self.bounds.contains(p) {
            return 0.0;
        }
        let threshold = 1.0 - self.params.coverage;
        let density = (self.raw(p) - threshold).max(0.0) * self.params.density;
        if density < self.params.density_eps {
            0.0
        } else {
            density
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::compute::RayonDevice;
    use crate::volume::VolumeGenerator;

    fn volumes() -> (NoiseVolume, NoiseVolume) {
        let device = RayonDevice::new(2).unwrap();
        let mut shape = NoiseVolume::new(1);
        let mut detail = NoiseVolume::new(1);
        let shape_params = VolumeParams { size: 32, ..VolumeParams::shape() };
        VolumeGenerator::new()
            .generate(&device, &mut shape, &shape_params, &mut detail, &VolumeParams::detail())
            .unwrap();
        (shape, detail)
    }

    fn interior_points() -> Vec<Vec3> {
        let mut points = Vec::new();
        for i in 0..9 {
            for j in 0..9 {
                for k in 0..9 {
                    points.push(Vec3::new(i as f32, j as f32, k as f32) * 0.3 - Vec3::splat(1.2));
                }
            }
        }
        points
    }

    #[test]
    fn box_membership_scenario() {
        let bounds = CloudBox::new(Vec3::ZERO, 2.0, 2.0);
        assert!(bounds.contains(Vec3::ZERO));
        assert!(!bounds.contains(Vec3::new(5.0, 0.0, 0.0)));

        let (shape, detail) = volumes();
        let params = DensityFieldParams { coverage: 1.0, density_eps: 0.0, ..Default::default() };
        let field = DensityField::new(&params, VolumeBindings { shape: &shape, detail: &detail });
        assert_eq!(field.query(Vec3::new(5.0, 0.0, 0.0)), 0.0);
    }

    #[test]
    fn density_is_never_negative() {
        let (shape, detail) = volumes();
        for coverage in [0.0, 0.3, 0.7, 1.0] {
            let params = DensityFieldParams { coverage, ..Default::default() };
            let field = DensityField::new(&params, VolumeBindings { shape: &shape, detail: &detail });
            for p in interior_points() {
                assert!(field.query(p) >= 0.0);
            }
        }
    }

    #[test]
    fn values_below_epsilon_are_discarded() {
        let (shape, detail) = volumes();
        let params = DensityFieldParams { coverage: 1.0, density: 1.0, density_eps: 0.5, ..Default::default() };
        let field = DensityField::new(&params, VolumeBindings { shape: &shape, detail: &detail });
        for p in interior_points() {
            let d = field.query(p);
            assert!(d == 0.0 || d >= 0.5, "density {d} leaked under epsilon");
        }
    }

    #[test]
    fn full_coverage_applies_no_threshold() {
        let (shape, detail) = volumes();
        let full = DensityFieldParams { coverage: 1.0, density_eps: 0.0, ..Default::default() };
        let half = DensityFieldParams { coverage: 0.5, ..full };
        let bindings = VolumeBindings { shape: &shape, detail: &detail };
        let full_field = DensityField::new(&full, bindings);
        let half_field = DensityField::new(&half, bindings);
        let mut any_positive = false;
        for p in interior_points() {
            let expected = full_field.raw(p).max(0.0) * full.density;
            assert!((full_field.query(p) - expected).abs() < 1e-6);
            assert!(full_field.query(p) >= half_field.query(p));
            any_positive |= full_field.query(p) > 0.0;
        }
        assert!(any_positive);
    }

    #[test]
    fn animation_offset_shifts_sampling() {
        let (shape, detail) = volumes();
        let bindings = VolumeBindings { shape: &shape, detail: &detail };
        let still = DensityFieldParams { detail_weight: 0.0, ..Default::default() };
        let moved = DensityFieldParams { shape_offset: Vec2::new(0.25, 0.0), ..still };
        let a = DensityField::new(&still, bindings);
        let b = DensityField::new(&moved, bindings);
        // Offset is in texture space, so it equals a world shift of offset * scale.
        let p = Vec3::new(0.1, 0.2, 0.3);
        let shifted = p + Vec3::new(0.25 * still.shape_scale, 0.0, 0.0);
        assert!((b.raw(p) - a.raw(shifted)).abs() < 1e-4);
        assert_ne!(a.raw(p), b.raw(p));
    }

    #[test]
    fn ray_box_intersection() {
        let bounds = CloudBox::new(Vec3::ZERO, 2.0, 2.0);
        let (near, far) = bounds.intersect(Vec3::new(-5.0, 0.0, 0.0), Vec3::X).unwrap();
        assert!((near - 4.0).abs() < 1e-5 && (far - 6.0).abs() < 1e-5);
        let (near, far) = bounds.intersect(Vec3::ZERO, Vec3::Y).unwrap();
        assert_eq!(near, 0.0);
        assert!((far - 1.0).abs() < 1e-5);
        assert!(bounds.intersect(Vec3::new(-5.0, 3.0, 0.0), Vec3::X).is_none());
        assert!(bounds.intersect(Vec3::new(5.0, 0.0, 0.0), Vec3::X).is_none());
    }

    #[test]
    fn degenerate_box_is_clamped_or_rejected() {
        let params = DensityFieldParams { side_length: 0.0, height: -1.0, ..Default::default() };
        assert!(params.validate().is_err());
        let clamped = params.sanitized();
        assert_eq!(clamped.side_length, MIN_BOX_EXTENT);
        assert_eq!(clamped.height, MIN_BOX_EXTENT);
        assert!(clamped.validate().is_ok());
    }
}
