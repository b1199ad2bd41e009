use std::time::{Duration, Instant};

use glam::{UVec3, Vec3, Vec4};
use serde::{Deserialize, Serialize};
use tracing::info;

use crate::api::CloudError;
use crate::compute::{ComputeDevice, DispatchGrid};
use crate::noise::NoiseSampler;

pub const MIN_VOLUME_SIZE: u32 = 32;
pub const MAX_VOLUME_SIZE: u32 = 128;
pub const MAX_OCTAVES: u32 = 8;
pub const MAX_FREQUENCY: u32 = 32;
pub const WORKGROUP_SIZE: UVec3 = UVec3::splat(8);

/// Seed offset of the auxiliary channel's sampler.
const AUX_SEED_SALT: u32 = 0x9E37_79B9;

/// Generation parameters of one noise volume.
///
/// `tuning` weights the four channels: xyz are fBm layers at `frequency`,
/// `2 * frequency` and `4 * frequency` cells per tile, w the billow layer.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct VolumeParams {
    pub seed: u32,
    pub size: u32,
    pub frequency: u32,
    pub octaves: u32,
    pub tuning: Vec4,
}

impl Default for VolumeParams {
    fn default() -> Self {
        Self::shape()
    }
}

impl VolumeParams {
    pub fn shape() -> Self {
        Self { seed: 1, size: 64, frequency: 4, octaves: 3, tuning: Vec4::new(1.0, 0.5, 0.25, 0.5) }
    }

    pub fn detail() -> Self {
        Self { seed: 2, size: 32, frequency: 8, octaves: 2, tuning: Vec4::new(1.0, 0.5, 0.25, 0.0) }
    }

    pub fn sanitized(&self) -> Self {
        Self {
            seed: self.seed,
            size: self.size.clamp(MIN_VOLUME_SIZE, MAX_VOLUME_SIZE),
            frequency: self.frequency.clamp(1, MAX_FREQUENCY),
            octaves: self.octaves.clamp(1, MAX_OCTAVES),
            tuning: self.tuning.max(Vec4::ZERO),
        }
    }

    pub fn validate(&self, name: &str) -> Result<(), CloudError> {
        if !(MIN_VOLUME_SIZE..=MAX_VOLUME_SIZE).contains(&self.size) {
            return Err(CloudError::InvalidConfig(format!(
                "{name}.size must be within {MIN_VOLUME_SIZE}..={MAX_VOLUME_SIZE}, got {}",
                self.size
            )));
        }
        if self.frequency == 0 || self.frequency > MAX_FREQUENCY {
            return Err(CloudError::InvalidConfig(format!("{name}.frequency must be within 1..={MAX_FREQUENCY}")));
        }
        if self.octaves == 0 || self.octaves > MAX_OCTAVES {
            return Err(CloudError::InvalidConfig(format!("{name}.octaves must be within 1..={MAX_OCTAVES}")));
        }
        if self.tuning.cmplt(Vec4::ZERO).any() || !self.tuning.is_finite() {
            return Err(CloudError::InvalidConfig(format!("{name}.tuning must be finite and non-negative")));
        }
        Ok(())
    }

    /// Sum of the channel weights, the largest value a voxel's channels can add up to.
    pub fn weight_sum(&self) -> f32 {
        self.tuning.max(Vec4::ZERO).dot(Vec4::ONE)
    }
}

/// Cubic grid of 4-channel noise samples.
#[derive(Debug, Clone)]
pub struct NoiseVolume {
    side: u32,
    voxels: Vec<Vec4>,
    params: Option<VolumeParams>,
    generation: u64,
}

impl NoiseVolume {
    pub fn new(side: u32) -> Self {
        let side = side.max(1);
        Self { side, voxels: vec![Vec4::ZERO; (side * side * side) as usize], params: None, generation: 0 }
    }

    pub fn side(&self) -> u32 { self.side }
    pub fn voxels(&self) -> &[Vec4] { &self.voxels }

    /// Parameters of the last completed generation.
    pub fn params(&self) -> Option<&VolumeParams> {
        self.params.as_ref()
    }

    pub fn generation(&self) -> u64 {
        self.generation
    }

    fn reset(&mut self, side: u32) {
        if side != self.side {
            *self = Self { generation: self.generation, ..Self::new(side) };
        }
    }

    #[inline]
    fn index(&self, x: u32, y: u32, z: u32) -> usize {
        ((z * self.side + y) * self.side + x) as usize
    }

    pub fn voxel(&self, x: u32, y: u32, z: u32) -> Vec4 {
        self.voxels[self.index(x, y, z)]
    }

    /// Trilinear sample at normalised coordinates; the volume repeats every unit.
    pub fn sample(&self, uvw: Vec3) -> Vec4 {
        let n = self.side as i32;
        let p = uvw * self.side as f32 - Vec3::splat(0.5);
        let base = p.floor();
        let t = p - base;
        let x0 = (base.x as i32).rem_euclid(n) as u32;
        let y0 = (base.y as i32).rem_euclid(n) as u32;
        let z0 = (base.z as i32).rem_euclid(n) as u32;
        let x1 = (x0 + 1) % self.side;
        let y1 = (y0 + 1) % self.side;
        let z1 = (z0 + 1) % self.side;

        let c00 = self.voxel(x0, y0, z0).lerp(self.voxel(x1, y0, z0), t.x);
        let c10 = self.voxel(x0, y1, z0).lerp(self.voxel(x1, y1, z0), t.x);
        let c01 = self.voxel(x0, y0, z1).lerp(self.voxel(x1, y0, z1), t.x);
        let c11 = self.voxel(x0, y1, z1).lerp(self.voxel(x1, y1, z1), t.x);

        c00.lerp(c10, t.y).lerp(c01.lerp(c11, t.y), t.z)
    }

    /// Each channel divided by its weight and quantised to a byte; for inspection.
    pub fn to_rgba8(&self) -> Vec<u8> {
        let weights = self.params.map(|p| p.tuning).unwrap_or(Vec4::ONE);
        let inv = Vec4::select(weights.cmpgt(Vec4::ZERO), weights.recip(), Vec4::ZERO);
        let mut bytes = Vec::with_capacity(self.voxels.len() * 4);
        for v in &self.voxels {
            let c = (*v * inv).clamp(Vec4::ZERO, Vec4::ONE) * 255.0 + Vec4::splat(0.5);
            bytes.extend_from_slice(&[c.x as u8, c.y as u8, c.z as u8, c.w as u8]);
        }
        bytes
    }
}

/// Per-voxel noise evaluation run by every dispatch invocation.
struct VolumeKernel {
    noise: NoiseSampler,
    aux: NoiseSampler,
    params: VolumeParams,
    inv_side: f32,
}

impl VolumeKernel {
    fn new(params: &VolumeParams) -> Self {
        Self {
            noise: NoiseSampler::new(params.seed, 1.0, 1.0),
            aux: NoiseSampler::new(params.seed.wrapping_add(AUX_SEED_SALT), 1.0, 1.0),
            params: *params,
            inv_side: 1.0 / params.size as f32,
        }
    }

    fn voxel(&self, id: UVec3) -> Vec4 {
        let uvw = (id.as_vec3() + Vec3::splat(0.5)) * self.inv_side;
        let mut out = Vec4::ZERO;
        for c in 0..3 {
            let period = (self.params.frequency << c) as i32;
            let n = self.noise.fbm3_periodic(uvw * period as f32, period, self.params.octaves);
            out[c] = (0.5 + 0.5 * n).clamp(0.0, 1.0) * self.params.tuning[c];
        }
        let period = self.params.frequency as i32;
        let billow = 1.0 - self.aux.fbm3_periodic(uvw * period as f32, period, self.params.octaves).abs();
        out.w = billow.clamp(0.0, 1.0) * self.params.tuning.w;
        out
    }
}

/// Fills the shape and detail volumes on a compute device.
#[derive(Debug, Default)]
pub struct VolumeGenerator {
    generations: u64,
    last_elapsed: Duration,
}

impl VolumeGenerator {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn generations(&self) -> u64 {
        self.generations
    }

    pub fn last_elapsed(&self) -> Duration {
        self.last_elapsed
    }

    /// Overwrites both volumes. Each dispatch is followed by a barrier, so the
    /// volumes are safe to sample as soon as this returns.
    pub fn generate<D: ComputeDevice>(
        &mut self,
        device: &D,
        shape: &mut NoiseVolume,
        shape_params: &VolumeParams,
        detail: &mut NoiseVolume,
        detail_params: &VolumeParams,
    ) -> Result<(), CloudError> {
        let start = Instant::now();
        Self::fill(device, shape, shape_params)?;
        Self::fill(device, detail, detail_params)?;
        self.generations += 1;
        self.last_elapsed = start.elapsed();
        info!(
            shape = shape.side(),
            detail = detail.side(),
            elapsed_ms = self.last_elapsed.as_secs_f32() * 1000.0,
            "noise volumes generated"
        );
        Ok(())
    }

    fn fill<D: ComputeDevice>(device: &D, volume: &mut NoiseVolume, params: &VolumeParams) -> Result<(), CloudError> {
        let params = params.sanitized();
        volume.reset(params.size);
        let kernel = VolumeKernel::new(&params);
        let extent = UVec3::splat(params.size);
        device
            .dispatch(DispatchGrid::covering(extent, WORKGROUP_SIZE), extent, &mut volume.voxels, |id| kernel.voxel(id))
            .map_err(|e| CloudError::Generation(e.to_string()))?
            .barrier();
        volume.params = Some(params);
        volume.generation += 1;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::compute::RayonDevice;

    fn small(seed: u32) -> VolumeParams {
        VolumeParams { seed, size: 32, frequency: 2, octaves: 2, tuning: Vec4::new(1.0, 0.5, 0.25, 0.75) }
    }

    fn generate(shape: VolumeParams, detail: VolumeParams) -> (RayonDevice, NoiseVolume, NoiseVolume) {
        let device = RayonDevice::new(2).unwrap();
        let mut a = NoiseVolume::new(1);
        let mut b = NoiseVolume::new(1);
        VolumeGenerator::new().generate(&device, &mut a, &shape, &mut b, &detail).unwrap();
        (device, a, b)
    }

    #[test]
    fn channels_stay_within_their_weights() {
        let params = small(4);
        let (_, shape, _) = generate(params, small(5));
        assert_eq!(shape.voxels().len(), 32 * 32 * 32);
        for v in shape.voxels() {
            assert!(v.cmpge(Vec4::ZERO).all());
            assert!(v.cmple(params.tuning + Vec4::splat(1e-6)).all());
        }
        assert_eq!(shape.params(), Some(&params));
    }

    #[test]
    fn generation_is_deterministic_and_fenced() {
        let (device, a, _) = generate(small(9), small(10));
        let (_, b, _) = generate(small(9), small(10));
        assert_eq!(a.voxels(), b.voxels());
        assert_eq!(device.dispatch_count(), 2);
        assert_eq!(device.barrier_count(), 2);
    }

    #[test]
    fn zero_weight_channel_is_empty() {
        let mut params = small(3);
        params.tuning.w = 0.0;
        let (_, shape, _) = generate(params, small(1));
        assert!(shape.voxels().iter().all(|v| v.w == 0.0));
    }

    #[test]
    fn trilinear_sampling_wraps_seamlessly() {
        let (_, shape, _) = generate(small(12), small(13));
        for k in 0..16 {
            let uvw = Vec3::new(0.03 * k as f32, 0.61, 0.27);
            let a = shape.sample(uvw);
            let b = shape.sample(uvw + Vec3::X);
            assert!((a - b).abs().max_element() < 1e-4);
        }
        // Exactly on voxel centres the sample is the voxel itself.
        let centre = Vec3::new(3.5, 7.5, 1.5) / 32.0;
        assert!((shape.sample(centre) - shape.voxel(3, 7, 1)).abs().max_element() < 1e-5);
    }

    #[test]
    fn generated_field_tiles_across_volume_edges() {
        let (_, shape, _) = generate(small(14), small(15));
        // Neighbouring voxels across the wrap seam differ about as much as interior neighbours.
        let mut seam = 0.0f32;
        let mut interior = 0.0f32;
        for y in 0..32 {
            for z in 0..32 {
                seam = seam.max((shape.voxel(31, y, z) - shape.voxel(0, y, z)).abs().max_element());
                interior = interior.max((shape.voxel(15, y, z) - shape.voxel(16, y, z)).abs().max_element());
            }
        }
        assert!(seam <= interior * 2.0 + 1e-3, "seam {seam} interior {interior}");
    }

    #[test]
    fn regenerating_with_new_size_reallocates() {
        let device = RayonDevice::new(1).unwrap();
        let mut generator = VolumeGenerator::new();
        let mut shape = NoiseVolume::new(1);
        let mut detail = NoiseVolume::new(1);
        generator.generate(&device, &mut shape, &small(1), &mut detail, &small(2)).unwrap();
        let mut bigger = small(1);
        bigger.size = 48;
        generator.generate(&device, &mut shape, &bigger, &mut detail, &small(2)).unwrap();
        assert_eq!(shape.side(), 48);
        assert_eq!(shape.voxels().len(), 48 * 48 * 48);
        assert_eq!(shape.generation(), 2);
        assert_eq!(generator.generations(), 2);
    }

    #[test]
    fn out_of_range_params_are_clamped_or_rejected() {
        let params = VolumeParams { seed: 0, size: 4, frequency: 0, octaves: 99, tuning: Vec4::new(-1.0, 1.0, 1.0, 1.0) };
        assert!(params.validate("shape").is_err());
        let clamped = params.sanitized();
        assert_eq!(clamped.size, MIN_VOLUME_SIZE);
        assert_eq!(clamped.frequency, 1);
        assert_eq!(clamped.octaves, MAX_OCTAVES);
        assert_eq!(clamped.tuning.x, 0.0);
        assert!(clamped.validate("shape").is_ok());
    }
}
