use image::Rgba32FImage;

use crate::compile::plan::{
    BlurPass, CombinePass, FramePlan, MaskPass, ResolvePass, SurfaceDesc, SurfaceFormat, SurfaceId,
    SurfaceOrigin,
};
use crate::effects::blur::blur_axis;
use crate::effects::resolve::{CoverageInputs, resolve_into};
use crate::foundation::core::Mat4;
use crate::foundation::error::{OutlineError, OutlineResult};
use crate::render::backend::{FrameInputs, FrameStats, PassBackend};
use crate::render::raster::{CoverageTarget, RasterState, rasterize_mesh};
use crate::render::surface_pool::{SurfacePool, SurfacePoolOpts, SurfacePoolStats};

/// Options for [`CpuBackend`].
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, serde::Serialize, serde::Deserialize)]
pub struct CpuBackendOpts {
    /// Transient image pool limits.
    pub pool: SurfacePoolOpts,
    /// Upper bound on transient bytes alive at once during a frame.
    pub frame_budget_bytes: Option<usize>,
}

/// Reference backend executing every pass on `f32` buffers, parallel over rows with `rayon`.
pub struct CpuBackend {
    opts: CpuBackendOpts,
    pool: SurfacePool,
    surfaces: ExecSurfaces,
    raster: RasterState,
    live_bytes: usize,
    stats: FrameStats,
}

impl CpuBackend {
    /// Backend with the given options.
    pub fn new(opts: CpuBackendOpts) -> Self {
        Self {
            pool: SurfacePool::new(opts.pool),
            opts,
            surfaces: ExecSurfaces::default(),
            raster: RasterState {
                view: Mat4::IDENTITY,
                projection: Mat4::IDENTITY,
            },
            live_bytes: 0,
            stats: FrameStats::default(),
        }
    }

    /// Options in effect.
    pub fn opts(&self) -> CpuBackendOpts {
        self.opts
    }

    /// Counters of the transient image pool.
    pub fn pool_stats(&self) -> SurfacePoolStats {
        self.pool.stats()
    }

    /// Drop every pooled image.
    pub fn trim_pool(&mut self) {
        self.pool.clear();
    }

    fn draw_group_masks(
        &mut self,
        pass: &MaskPass,
        inputs: &FrameInputs<'_>,
    ) -> OutlineResult<()> {
        let camera = inputs.camera;
        let projection = if pass.remove_jitter {
            camera.projection
        } else {
            self.raster.projection
        };
        let state = self.raster.override_projection(projection);

        for draw in &pass.draws {
            let desc = self.surfaces.desc(draw.target)?;
            let (extent, channels) = (desc.extent, desc.format.channels());
            let drawables = inputs.scene.drawables(draw.layer, camera)?;
            let data = self.surfaces.get_mut(draw.target)?;
            let mut target = CoverageTarget::new(data, extent, channels, draw.channel)?;
            for d in drawables {
                let mvp = state.model_view_projection(d.model);
                let drawn = rasterize_mesh(&mut target, &d.mesh, mvp);
                self.stats.draw_calls += 1;
                self.stats.triangles += drawn as u64;
            }
        }
        Ok(())
    }
}

impl Default for CpuBackend {
    fn default() -> Self {
        Self::new(CpuBackendOpts::default())
    }
}

impl PassBackend for CpuBackend {
    fn begin_frame(&mut self, plan: &FramePlan, inputs: &FrameInputs<'_>) -> OutlineResult<()> {
        self.surfaces.reset(&plan.surfaces);
        self.raster = RasterState {
            view: inputs.camera.view,
            projection: inputs.camera.active_projection(),
        };
        self.live_bytes = 0;
        self.stats = FrameStats::default();
        Ok(())
    }

    fn ensure_surface(&mut self, id: SurfaceId, desc: &SurfaceDesc) -> OutlineResult<()> {
        if self.surfaces.is_bound(id) {
            return Ok(());
        }
        let bytes = desc.byte_len();
        if let Some(budget) = self.opts.frame_budget_bytes
            && self.live_bytes.saturating_add(bytes) > budget
        {
            return Err(OutlineError::buffer_allocation(format!(
                "surface '{}' needs {bytes} bytes, frame budget {budget} has {} left",
                desc.name,
                budget.saturating_sub(self.live_bytes)
            )));
        }
        let data = self.pool.borrow(desc)?;
        self.surfaces.put(id, data)?;
        self.live_bytes += bytes;
        self.stats.surfaces_allocated += 1;
        self.stats.bytes_allocated += bytes as u64;
        Ok(())
    }

    fn import_color(&mut self, id: SurfaceId, color: &Rgba32FImage) -> OutlineResult<()> {
        let src = color.as_raw();
        let mut data = Vec::new();
        data.try_reserve_exact(src.len()).map_err(|e| {
            OutlineError::buffer_allocation(format!("camera color import: {e}"))
        })?;
        data.extend_from_slice(src);
        self.surfaces.put(id, data)
    }

    fn exec_render_masks(
        &mut self,
        pass: &MaskPass,
        inputs: &FrameInputs<'_>,
    ) -> OutlineResult<()> {
        for &id in &pass.clear {
            self.surfaces.get_mut(id)?.fill(0.0);
        }
        self.draw_group_masks(pass, inputs)?;
        if let Some((from, to)) = pass.snapshot {
            self.surfaces.with_output(to, |s, out| {
                let src = s.get(from)?;
                if src.len() != out.len() {
                    return Err(OutlineError::evaluation(
                        "coverage snapshot between mismatched surfaces",
                    ));
                }
                out.copy_from_slice(src);
                Ok(())
            })?;
        }
        self.stats.passes_executed += 1;
        Ok(())
    }

    fn exec_combine(&mut self, pass: &CombinePass) -> OutlineResult<()> {
        let out_channels = self.surfaces.desc(pass.output)?.format.channels();
        if pass.inputs.len() > out_channels {
            return Err(OutlineError::validation(format!(
                "cannot pack {} masks into {out_channels} channels",
                pass.inputs.len()
            )));
        }
        self.surfaces.with_output(pass.output, |s, out| {
            out.fill(0.0);
            for (channel, &input) in pass.inputs.iter().enumerate() {
                if s.desc(input)?.format != SurfaceFormat::Coverage1 {
                    return Err(OutlineError::validation(
                        "combine inputs must be single-channel coverage",
                    ));
                }
                let src = s.get(input)?;
                for (px, &v) in out.chunks_exact_mut(out_channels).zip(src) {
                    px[channel] = v;
                }
            }
            Ok(())
        })?;
        self.stats.passes_executed += 1;
        Ok(())
    }

    fn exec_blur(&mut self, pass: &BlurPass) -> OutlineResult<()> {
        let desc = self.surfaces.desc(pass.input)?;
        let (extent, channels) = (desc.extent, desc.format.channels());
        self.surfaces.with_output(pass.output, |s, out| {
            blur_axis(
                s.get(pass.input)?,
                out,
                extent,
                channels,
                &pass.kernel,
                pass.axis,
            )
        })?;
        self.stats.passes_executed += 1;
        Ok(())
    }

    fn exec_resolve(&mut self, pass: &ResolvePass) -> OutlineResult<()> {
        let desc = self.surfaces.desc(pass.sharp)?;
        let (extent, channels) = (desc.extent, desc.format.channels());
        self.surfaces.with_output(pass.target, |s, out| {
            let coverage = CoverageInputs {
                sharp: s.get(pass.sharp)?,
                blurred: s.get(pass.blurred)?,
                channels,
                extent,
            };
            resolve_into(out, s.get(pass.source)?, coverage, &pass.groups)
        })?;
        self.stats.passes_executed += 1;
        Ok(())
    }

    fn release_surface(&mut self, id: SurfaceId, desc: &SurfaceDesc) -> OutlineResult<()> {
        let data = self.surfaces.take(id)?;
        if desc.origin == SurfaceOrigin::Transient {
            self.live_bytes = self.live_bytes.saturating_sub(desc.byte_len());
            self.pool.release(desc, data);
        }
        Ok(())
    }

    fn readback_color(&mut self, id: SurfaceId, plan: &FramePlan) -> OutlineResult<Rgba32FImage> {
        let desc = plan.surface(id)?;
        if desc.format != SurfaceFormat::Rgba32F {
            return Err(OutlineError::validation(format!(
                "final surface '{}' is not a color surface",
                desc.name
            )));
        }
        let data = self.surfaces.take(id)?;
        self.live_bytes = self.live_bytes.saturating_sub(desc.byte_len());
        Rgba32FImage::from_raw(desc.extent.width, desc.extent.height, data)
            .ok_or_else(|| OutlineError::evaluation("final surface has the wrong length"))
    }

    fn end_frame(&mut self) -> FrameStats {
        for (desc, data) in self.surfaces.drain() {
            if desc.origin == SurfaceOrigin::Transient {
                self.pool.release(&desc, data);
            }
        }
        self.live_bytes = 0;
        std::mem::take(&mut self.stats)
    }
}

#[derive(Default)]
struct ExecSurfaces {
    descs: Vec<SurfaceDesc>,
    data: Vec<Option<Vec<f32>>>,
}

impl ExecSurfaces {
    fn reset(&mut self, descs: &[SurfaceDesc]) {
        self.descs = descs.to_vec();
        self.data.clear();
        self.data.resize_with(descs.len(), || None);
    }

    fn desc(&self, id: SurfaceId) -> OutlineResult<&SurfaceDesc> {
        self.descs
            .get(id.index())
            .ok_or_else(|| OutlineError::evaluation(format!("unknown surface {}", id.0)))
    }

    fn is_bound(&self, id: SurfaceId) -> bool {
        matches!(self.data.get(id.index()), Some(Some(_)))
    }

    fn get(&self, id: SurfaceId) -> OutlineResult<&[f32]> {
        match self.data.get(id.index()) {
            Some(Some(d)) => Ok(d),
            _ => Err(self.unbound(id)),
        }
    }

    fn get_mut(&mut self, id: SurfaceId) -> OutlineResult<&mut [f32]> {
        let err = self.unbound(id);
        match self.data.get_mut(id.index()) {
            Some(Some(d)) => Ok(d),
            _ => Err(err),
        }
    }

    fn put(&mut self, id: SurfaceId, data: Vec<f32>) -> OutlineResult<()> {
        let slot = self
            .data
            .get_mut(id.index())
            .ok_or_else(|| OutlineError::evaluation(format!("unknown surface {}", id.0)))?;
        *slot = Some(data);
        Ok(())
    }

    fn take(&mut self, id: SurfaceId) -> OutlineResult<Vec<f32>> {
        let err = self.unbound(id);
        self.data
            .get_mut(id.index())
            .and_then(Option::take)
            .ok_or(err)
    }

    // The output is moved out while `f` runs so inputs stay readable next to it.
    fn with_output(
        &mut self,
        output: SurfaceId,
        f: impl FnOnce(&Self, &mut [f32]) -> OutlineResult<()>,
    ) -> OutlineResult<()> {
        let mut out = self.take(output)?;
        let res = f(self, &mut out);
        self.put(output, out)?;
        res
    }

    fn drain(&mut self) -> impl Iterator<Item = (SurfaceDesc, Vec<f32>)> + '_ {
        self.descs
            .iter()
            .zip(self.data.iter_mut())
            .filter_map(|(desc, slot)| slot.take().map(|d| (desc.clone(), d)))
    }

    fn unbound(&self, id: SurfaceId) -> OutlineError {
        let name = self.descs.get(id.index()).map_or("?", |d| d.name);
        OutlineError::evaluation(format!("surface '{name}' is not bound"))
    }
}

#[cfg(test)]
#[path = "../../tests/unit/render/cpu.rs"]
mod tests;
