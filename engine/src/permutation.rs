use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};

/// Seeded integer lookup table used as the hash source of the gradient noise.
///
/// Every lookup is masked with `size - 1`, so any `i32` (including negative
/// lattice coordinates) is a valid index.
#[derive(Debug, Clone)]
pub struct PermutationTable {
    size: usize,
    wrap_mask: i32,
    max_value: i32,
    seed: u32,
    entries: Vec<i32>,
}

impl PermutationTable {
    /// `size` is rounded up to a power of two.
    pub fn new(size: usize, max_value: i32, seed: u32) -> Self {
        let size = size.max(2).next_power_of_two();
        let mut table = Self {
            size,
            wrap_mask: (size - 1) as i32,
            max_value: max_value.max(1),
            seed,
            entries: Vec::new(),
        };
        table.build(seed);
        table
    }

    /// Refills the table from `seed`. Does nothing when the seed is unchanged.
    pub fn build(&mut self, seed: u32) {
        if self.seed == seed && !self.entries.is_empty() {
            return;
        }
        self.seed = seed;
        let mut rng = StdRng::seed_from_u64(seed as u64);
        self.entries = (0..self.size).map(|_| rng.gen_range(0..i32::MAX)).collect();
    }

    pub fn size(&self) -> usize { self.size }
    pub fn wrap_mask(&self) -> i32 { self.wrap_mask }
    pub fn max_value(&self) -> i32 { self.max_value }
    pub fn seed(&self) -> u32 { self.seed }

    #[inline]
    fn entry(&self, i: i32) -> i32 {
        self.entries[(i & self.wrap_mask) as usize]
    }

    /// 1D hash in `[0, max_value]`.
    #[inline]
    pub fn lookup1(&self, i: i32) -> i32 {
        self.entry(i) & self.max_value
    }

    /// 2D hash in `[0, size)`.
    #[inline]
    pub fn lookup2(&self, i: i32, j: i32) -> i32 {
        self.entry(j.wrapping_add(self.entry(i))) & self.wrap_mask
    }

    /// 3D hash in `[0, size)`.
    #[inline]
    pub fn lookup3(&self, i: i32, j: i32, k: i32) -> i32 {
        self.entry(k.wrapping_add(self.lookup2(i, j))) & self.wrap_mask
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn same_seed_builds_identical_tables() {
        let a = PermutationTable::new(1024, 255, 42);
        let b = PermutationTable::new(1024, 255, 42);
        for i in 0..1024 {
            assert_eq!(a.lookup1(i), b.lookup1(i));
            assert_eq!(a.lookup2(i, i * 3), b.lookup2(i, i * 3));
        }
    }

    #[test]
    fn rebuild_with_new_seed_changes_entries_and_back() {
        let mut table = PermutationTable::new(256, 255, 1);
        let before: Vec<i32> = (0..256).map(|i| table.lookup2(i, 0)).collect();
        table.build(2);
        let changed: Vec<i32> = (0..256).map(|i| table.lookup2(i, 0)).collect();
        assert_ne!(before, changed);
        table.build(1);
        let restored: Vec<i32> = (0..256).map(|i| table.lookup2(i, 0)).collect();
        assert_eq!(before, restored);
    }

    #[test]
    fn lookups_stay_masked_for_extreme_indices() {
        let table = PermutationTable::new(1000, 255, 7);
        assert_eq!(table.size(), 1024);
        for &i in &[i32::MIN, -1, 0, 1, i32::MAX] {
            assert!((0..=255).contains(&table.lookup1(i)));
            assert!((0..1024).contains(&table.lookup2(i, i)));
            assert!((0..1024).contains(&table.lookup3(i, i.wrapping_neg(), i)));
        }
    }

    #[test]
    fn lookup_wraps_with_table_size() {
        let table = PermutationTable::new(64, 63, 9);
        assert_eq!(table.lookup1(5), table.lookup1(5 + 64));
        assert_eq!(table.lookup2(3, 4), table.lookup2(3 + 64, 4 + 64));
    }
}
