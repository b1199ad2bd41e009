use std::sync::atomic::{fence, AtomicU64, Ordering};

use glam::UVec3;
use rayon::prelude::*;
use rayon::{ThreadPool, ThreadPoolBuilder};
use tracing::{debug, info};

use crate::api::CloudError;

/// Workgroup layout of a dispatch, mirroring `dispatch(groupsX, groupsY, groupsZ)`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct DispatchGrid {
    pub groups: UVec3,
    pub local_size: UVec3,
}

impl DispatchGrid {
    /// Smallest grid of `local_size` workgroups that covers `extent`.
    pub fn covering(extent: UVec3, local_size: UVec3) -> Self {
        let local_size = local_size.max(UVec3::ONE);
        let groups = (extent + local_size - UVec3::ONE) / local_size;
        Self { groups, local_size }
    }

    pub fn invocations(&self) -> UVec3 {
        self.groups * self.local_size
    }
}

/// Writes issued by a dispatch that readers may not observe yet.
///
/// Holds the dispatch target borrowed until [`PendingWrites::barrier`] runs, so the
/// storage cannot be sampled between the write pass and its barrier.
#[must_use = "writes are not visible to readers until `barrier` is called"]
pub struct PendingWrites<'a, D: ComputeDevice + ?Sized> {
    device: &'a D,
    invocations: u64,
}

impl<'a, D: ComputeDevice + ?Sized> PendingWrites<'a, D> {
    pub fn new(device: &'a D, invocations: u64) -> Self {
        Self { device, invocations }
    }

    pub fn invocations(&self) -> u64 {
        self.invocations
    }

    /// Full read/write memory barrier; releases the target for reading.
    pub fn barrier(self) {
        self.device.memory_barrier();
    }
}

/// Massively parallel executor for voxel and pixel kernels.
pub trait ComputeDevice: Send + Sync {
    /// Runs `kernel` once per invocation id inside `extent` and stores each result in
    /// `target`, laid out x-fastest then y then z.
    fn dispatch<'a, T, K>(
        &'a self,
        grid: DispatchGrid,
        extent: UVec3,
        target: &'a mut [T],
        kernel: K,
    ) -> Result<PendingWrites<'a, Self>, CloudError>
    where
        Self: Sized,
        T: Send,
        K: Fn(UVec3) -> T + Sync;

    fn memory_barrier(&self);
}

/// Checks that `grid` covers `extent` and that `extent` matches the storage length.
pub fn validate_dispatch(grid: &DispatchGrid, extent: UVec3, len: usize) -> Result<(), CloudError> {
    if extent.cmpeq(UVec3::ZERO).any() {
        return Err(CloudError::Dispatch(format!("empty extent {extent}")));
    }
    let count = extent.x as usize * extent.y as usize * extent.z as usize;
    if count != len {
        return Err(CloudError::Dispatch(format!(
            "extent {extent} holds {count} invocations but target has {len} slots"
        )));
    }
    if grid.invocations().cmplt(extent).any() {
        return Err(CloudError::Dispatch(format!(
            "{} groups of {} do not cover extent {extent}",
            grid.groups, grid.local_size
        )));
    }
    Ok(())
}

/// Compute device backed by a dedicated rayon pool.
pub struct RayonDevice {
    pool: ThreadPool,
    dispatches: AtomicU64,
    barriers: AtomicU64,
}

impl RayonDevice {
    /// `threads == 0` lets rayon pick one worker per logical core.
    pub fn new(threads: usize) -> Result<Self, CloudError> {
        let pool = ThreadPoolBuilder::new()
            .num_threads(threads)
            .thread_name(|i| format!("cloud-compute-{i}"))
            .build()
            .map_err(|e| CloudError::DeviceInit(e.to_string()))?;
        info!(threads = pool.current_num_threads(), "compute device ready");
        Ok(Self { pool, dispatches: AtomicU64::new(0), barriers: AtomicU64::new(0) })
    }

    pub fn threads(&self) -> usize {
        self.pool.current_num_threads()
    }

    pub fn dispatch_count(&self) -> u64 {
        self.dispatches.load(Ordering::Relaxed)
    }

    pub fn barrier_count(&self) -> u64 {
        self.barriers.load(Ordering::SeqCst)
    }
}

impl ComputeDevice for RayonDevice {
    fn dispatch<'a, T, K>(
        &'a self,
        grid: DispatchGrid,
        extent: UVec3,
        target: &'a mut [T],
        kernel: K,
    ) -> Result<PendingWrites<'a, Self>, CloudError>
    where
        T: Send,
        K: Fn(UVec3) -> T + Sync,
    {
        validate_dispatch(&grid, extent, target.len())?;
        let width = extent.x as usize;
        let height = extent.y as usize;
        let kernel = &kernel;
        self.pool.install(|| {
            target.par_chunks_mut(width).enumerate().for_each(|(row, out)| {
                let y = (row % height) as u32;
                let z = (row / height) as u32;
                for (x, slot) in out.iter_mut().enumerate() {
                    *slot = kernel(UVec3::new(x as u32, y, z));
                }
            });
        });
        self.dispatches.fetch_add(1, Ordering::Relaxed);
        let invocations = target.len() as u64;
        debug!(groups = %grid.groups, invocations, "dispatch complete");
        Ok(PendingWrites::new(self, invocations))
    }

    fn memory_barrier(&self) {
        fence(Ordering::SeqCst);
        self.barriers.fetch_add(1, Ordering::SeqCst);
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn covering_rounds_groups_up() {
        let grid = DispatchGrid::covering(UVec3::new(17, 8, 1), UVec3::new(8, 8, 1));
        assert_eq!(grid.groups, UVec3::new(3, 1, 1));
        assert_eq!(grid.invocations(), UVec3::new(24, 8, 1));
    }

    #[test]
    fn dispatch_visits_every_invocation_once_in_order() {
        let device = RayonDevice::new(2).unwrap();
        let extent = UVec3::new(5, 3, 2);
        let mut out = vec![UVec3::ZERO; 30];
        let grid = DispatchGrid::covering(extent, UVec3::splat(4));
        device.dispatch(grid, extent, &mut out, |id| id).unwrap().barrier();
        for (i, id) in out.iter().enumerate() {
            let expected = UVec3::new((i % 5) as u32, ((i / 5) % 3) as u32, (i / 15) as u32);
            assert_eq!(*id, expected);
        }
        assert_eq!(device.dispatch_count(), 1);
        assert_eq!(device.barrier_count(), 1);
    }

    #[test]
    fn dispatch_rejects_mismatched_storage() {
        let device = RayonDevice::new(1).unwrap();
        let extent = UVec3::new(4, 4, 1);
        let mut out = vec![0u32; 15];
        let grid = DispatchGrid::covering(extent, UVec3::ONE);
        assert!(matches!(device.dispatch(grid, extent, &mut out, |_| 1u32), Err(CloudError::Dispatch(_))));
    }

    #[test]
    fn dispatch_rejects_grid_smaller_than_extent() {
        let device = RayonDevice::new(1).unwrap();
        let extent = UVec3::new(16, 1, 1);
        let mut out = vec![0u32; 16];
        let grid = DispatchGrid { groups: UVec3::ONE, local_size: UVec3::new(8, 1, 1) };
        assert!(device.dispatch(grid, extent, &mut out, |_| 1u32).is_err());
    }
}
