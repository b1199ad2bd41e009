use glam::{Vec2, Vec3};

use crate::permutation::PermutationTable;

const TABLE_SIZE: usize = 1024;
const TABLE_MAX: i32 = 255;

/// Brings the 2D gradient sum (gradients of length up to sqrt(5)) back to roughly [-1, 1].
const NORMALIZE_2D: f32 = 0.66666;

#[inline]
pub fn fade(t: f32) -> f32 {
    t * t * t * (t * (t * 6.0 - 15.0) + 10.0)
}

#[inline]
pub fn lerp(t: f32, a: f32, b: f32) -> f32 {
    a + t * (b - a)
}

/// Low 3 bits of the hash pick one of 8 directions; the second axis is weighted by 2.
#[inline]
fn grad2(hash: i32, x: f32, y: f32) -> f32 {
    let h = hash & 7;
    let (u, v) = if h < 4 { (x, y) } else { (y, x) };
    (if h & 1 != 0 { -u } else { u }) + (if h & 2 != 0 { -2.0 * v } else { 2.0 * v })
}

/// Low 4 bits pick one of the 12 cube-edge directions (4 repeated).
#[inline]
fn grad3(hash: i32, x: f32, y: f32, z: f32) -> f32 {
    let h = hash & 15;
    let u = if h < 8 { x } else { y };
    let v = if h < 4 {
        y
    } else if h == 12 || h == 14 {
        x
    } else {
        z
    };
    (if h & 1 == 0 { u } else { -u }) + (if h & 2 == 0 { v } else { -v })
}

/// Tileable Perlin-style gradient noise driven by an owned permutation table.
#[derive(Debug, Clone)]
pub struct NoiseSampler {
    perm: PermutationTable,
    pub frequency: f32,
    pub amplitude: f32,
    pub offset: Vec2,
}

impl NoiseSampler {
    pub fn new(seed: u32, frequency: f32, amplitude: f32) -> Self {
        Self {
            perm: PermutationTable::new(TABLE_SIZE, TABLE_MAX, seed),
            frequency,
            amplitude,
            offset: Vec2::ZERO,
        }
    }

    pub fn seed(&self) -> u32 {
        self.perm.seed()
    }

    pub fn set_seed(&mut self, seed: u32) {
        self.perm.build(seed);
    }

    pub fn set_offset(&mut self, offset: Vec2) {
        self.offset = offset;
    }

    /// Period of the lattice hash, in lattice cells.
    pub fn table_period(&self) -> usize {
        self.perm.size()
    }

    pub fn sample(&self, x: f32, y: f32) -> f32 {
        let x = (x + self.offset.x) * self.frequency;
        let y = (y + self.offset.y) * self.frequency;

        let x_floor = x.floor();
        let y_floor = y.floor();
        let ix0 = x_floor as i32;
        let iy0 = y_floor as i32;
        let ix1 = ix0.wrapping_add(1);
        let iy1 = iy0.wrapping_add(1);

        let fx0 = x - x_floor;
        let fy0 = y - y_floor;
        let fx1 = fx0 - 1.0;
        let fy1 = fy0 - 1.0;

        let s = fade(fx0);
        let t = fade(fy0);

        let n0 = lerp(
            t,
            grad2(self.perm.lookup2(ix0, iy0), fx0, fy0),
            grad2(self.perm.lookup2(ix0, iy1), fx0, fy1),
        );
        let n1 = lerp(
            t,
            grad2(self.perm.lookup2(ix1, iy0), fx1, fy0),
            grad2(self.perm.lookup2(ix1, iy1), fx1, fy1),
        );

        NORMALIZE_2D * lerp(s, n0, n1) * self.amplitude
    }

    /// 3D noise at a world position; the 2D offset shifts the horizontal (x, z) plane.
    pub fn sample3(&self, p: Vec3) -> f32 {
        let p = (p + Vec3::new(self.offset.x, 0.0, self.offset.y)) * self.frequency;
        self.gradient3(p, None) * self.amplitude
    }

    /// 3D noise for `p` given directly in lattice units, repeating every `period` cells.
    ///
    /// Frequency and offset are ignored: the caller owns the lattice mapping so that
    /// a unit cube scaled by `period` tiles without seams.
    pub fn sample3_periodic(&self, p: Vec3, period: i32) -> f32 {
        self.gradient3(p, Some(period.max(1))) * self.amplitude
    }

    /// Periodic fractal sum. Each octave doubles both frequency and period and halves
    /// the weight; the sum is normalised by the total weight.
    pub fn fbm3_periodic(&self, p: Vec3, period: i32, octaves: u32) -> f32 {
        let octaves = octaves.max(1);
        let mut sum = 0.0;
        let mut weight = 1.0;
        let mut total = 0.0;
        let mut scale = 1.0;
        let mut period = period.max(1);
        for _ in 0..octaves {
            sum += weight * self.sample3_periodic(p * scale, period);
            total += weight;
            weight *= 0.5;
            scale *= 2.0;
            period = period.saturating_mul(2);
        }
        sum / total
    }

    fn gradient3(&self, p: Vec3, period: Option<i32>) -> f32 {
        let floor = p.floor();
        let f0 = p - floor;
        let f1 = f0 - Vec3::ONE;

        let wrap = |i: i32| match period {
            Some(n) => i.rem_euclid(n),
            None => i,
        };
        let (ix, iy, iz) = (floor.x as i32, floor.y as i32, floor.z as i32);
        let (x0, x1) = (wrap(ix), wrap(ix.wrapping_add(1)));
        let (y0, y1) = (wrap(iy), wrap(iy.wrapping_add(1)));
        let (z0, z1) = (wrap(iz), wrap(iz.wrapping_add(1)));

        let u = fade(f0.x);
        let v = fade(f0.y);
        let w = fade(f0.z);

        let corner = |x: i32, y: i32, z: i32, d: Vec3| grad3(self.perm.lookup3(x, y, z), d.x, d.y, d.z);

        let n000 = corner(x0, y0, z0, Vec3::new(f0.x, f0.y, f0.z));
        let n100 = corner(x1, y0, z0, Vec3::new(f1.x, f0.y, f0.z));
        let n010 = corner(x0, y1, z0, Vec3::new(f0.x, f1.y, f0.z));
        let n110 = corner(x1, y1, z0, Vec3::new(f1.x, f1.y, f0.z));
        let n001 = corner(x0, y0, z1, Vec3::new(f0.x, f0.y, f1.z));
        let n101 = corner(x1, y0, z1, Vec3::new(f1.x, f0.y, f1.z));
        let n011 = corner(x0, y1, z1, Vec3::new(f0.x, f1.y, f1.z));
        let n111 = corner(x1, y1, z1, Vec3::new(f1.x, f1.y, f1.z));

        let nx00 = lerp(u, n000, n100);
        let nx10 = lerp(u, n010, n110);
        let nx01 = lerp(u, n001, n101);
        let nx11 = lerp(u, n011, n111);

        lerp(w, lerp(v, nx00, nx10), lerp(v, nx01, nx11))
    }
}
