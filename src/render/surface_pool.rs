use std::collections::HashMap;

use crate::compile::plan::{SurfaceDesc, SurfaceFormat};
use crate::foundation::core::Extent;
use crate::foundation::error::{OutlineError, OutlineResult};

/// Pool configuration for cached transient images.
#[derive(Debug, Clone, Copy, PartialEq, Eq, serde::Serialize, serde::Deserialize)]
pub struct SurfacePoolOpts {
    /// Maximum bytes retained across all buckets.
    pub max_pool_bytes: usize,
    /// Maximum number of retained images per (extent, format) bucket.
    pub max_surfaces_per_bucket: usize,
}

impl Default for SurfacePoolOpts {
    fn default() -> Self {
        Self {
            max_pool_bytes: 256 * 1024 * 1024,
            max_surfaces_per_bucket: 4,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
struct SurfaceKey {
    extent: Extent,
    format: SurfaceFormat,
}

impl SurfaceKey {
    fn from_desc(desc: &SurfaceDesc) -> Self {
        Self {
            extent: desc.extent,
            format: desc.format,
        }
    }

    fn len(self) -> usize {
        self.extent
            .pixel_count()
            .saturating_mul(self.format.channels())
    }

    fn byte_len(self) -> usize {
        self.len().saturating_mul(std::mem::size_of::<f32>())
    }
}

/// Pool counters.
#[derive(Debug, Default, Clone, PartialEq, Eq)]
pub struct SurfacePoolStats {
    /// Images currently cached.
    pub retained_surfaces: usize,
    /// Bytes currently cached.
    pub retained_bytes: usize,
    /// Fresh allocations since creation.
    pub alloc_surfaces: u64,
    /// Bytes of fresh allocations since creation.
    pub alloc_bytes: u64,
    /// Borrows served from the cache.
    pub reused_surfaces: u64,
    /// Releases dropped because a cap was hit.
    pub dropped_on_release: u64,
}

struct Bucket {
    surfaces: Vec<Vec<f32>>,
}

/// Bounded pooled allocator for per-frame coverage and color images.
///
/// Keyed by `(extent, format)`. Borrowed images are zeroed; allocation failures surface as
/// [`OutlineError::BufferAllocation`] instead of aborting.
pub(crate) struct SurfacePool {
    opts: SurfacePoolOpts,
    stats: SurfacePoolStats,

    bucket_idx_by_key: HashMap<SurfaceKey, usize>,
    buckets: Vec<Bucket>,
}

impl SurfacePool {
    pub(crate) fn new(opts: SurfacePoolOpts) -> Self {
        Self {
            opts,
            stats: SurfacePoolStats::default(),
            bucket_idx_by_key: HashMap::new(),
            buckets: Vec::new(),
        }
    }

    pub(crate) fn stats(&self) -> SurfacePoolStats {
        self.stats.clone()
    }

    pub(crate) fn borrow(&mut self, desc: &SurfaceDesc) -> OutlineResult<Vec<f32>> {
        let key = SurfaceKey::from_desc(desc);
        if let Some(&bi) = self.bucket_idx_by_key.get(&key)
            && let Some(mut data) = self.buckets[bi].surfaces.pop()
        {
            self.stats.retained_surfaces = self.stats.retained_surfaces.saturating_sub(1);
            self.stats.retained_bytes = self.stats.retained_bytes.saturating_sub(key.byte_len());
            self.stats.reused_surfaces = self.stats.reused_surfaces.saturating_add(1);
            data.fill(0.0);
            return Ok(data);
        }

        let len = key.len();
        let mut data = Vec::new();
        data.try_reserve_exact(len).map_err(|e| {
            OutlineError::buffer_allocation(format!(
                "surface '{}' ({} bytes): {e}",
                desc.name,
                key.byte_len()
            ))
        })?;
        data.resize(len, 0.0);

        self.stats.alloc_surfaces = self.stats.alloc_surfaces.saturating_add(1);
        self.stats.alloc_bytes = self.stats.alloc_bytes.saturating_add(key.byte_len() as u64);
        Ok(data)
    }

    pub(crate) fn release(&mut self, desc: &SurfaceDesc, data: Vec<f32>) {
        if self.opts.max_pool_bytes == 0 || self.opts.max_surfaces_per_bucket == 0 {
            self.stats.dropped_on_release = self.stats.dropped_on_release.saturating_add(1);
            return;
        }

        let key = SurfaceKey::from_desc(desc);
        let bytes = key.byte_len();
        if data.len() != key.len()
            || self.stats.retained_bytes.saturating_add(bytes) > self.opts.max_pool_bytes
        {
            self.stats.dropped_on_release = self.stats.dropped_on_release.saturating_add(1);
            return;
        }

        let bi = match self.bucket_idx_by_key.get(&key).copied() {
            Some(i) => i,
            None => {
                let i = self.buckets.len();
                self.buckets.push(Bucket {
                    surfaces: Vec::new(),
                });
                self.bucket_idx_by_key.insert(key, i);
                i
            }
        };

        let bucket = &mut self.buckets[bi];
        if bucket.surfaces.len() >= self.opts.max_surfaces_per_bucket {
            self.stats.dropped_on_release = self.stats.dropped_on_release.saturating_add(1);
            return;
        }

        bucket.surfaces.push(data);
        self.stats.retained_surfaces = self.stats.retained_surfaces.saturating_add(1);
        self.stats.retained_bytes = self.stats.retained_bytes.saturating_add(bytes);
    }

    /// Drop every cached image.
    pub(crate) fn clear(&mut self) {
        self.buckets.clear();
        self.bucket_idx_by_key.clear();
        self.stats.retained_surfaces = 0;
        self.stats.retained_bytes = 0;
    }
}

#[cfg(test)]
#[path = "../../tests/unit/render/surface_pool.rs"]
mod tests;
