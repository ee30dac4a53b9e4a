use image::Rgba32FImage;

use crate::compile::plan::{
    BlurPass, CombinePass, FramePlan, MaskPass, Pass, ResolvePass, SurfaceDesc, SurfaceId,
    SurfaceOrigin,
};
use crate::foundation::error::{OutlineError, OutlineResult};
use crate::render::program::{OutlineProgram, SubProgram};
use crate::scene::camera::CameraFrame;
use crate::scene::drawable::SceneQuery;

/// Per-frame execution counters. A skipped frame reports all zeros.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, serde::Serialize, serde::Deserialize)]
pub struct FrameStats {
    /// Drawables rasterized by the mask pass, summed over groups.
    pub draw_calls: u64,
    /// Triangles that survived near-plane clipping.
    pub triangles: u64,
    /// Transient surfaces acquired (fresh or pooled).
    pub surfaces_allocated: u64,
    /// Bytes of transient surfaces acquired.
    pub bytes_allocated: u64,
    /// Passes run to completion.
    pub passes_executed: u64,
}

/// A finished frame: the new camera color and what it cost.
#[derive(Clone, Debug)]
pub struct RenderedFrame {
    /// Premultiplied linear color replacing the camera target.
    pub color: Rgba32FImage,
    /// Execution counters.
    pub stats: FrameStats,
}

/// Read-only collaborators a frame executes against.
#[derive(Clone, Copy)]
pub struct FrameInputs<'a> {
    /// Camera context of this frame.
    pub camera: &'a CameraFrame,
    /// Host scene query used by the mask pass.
    pub scene: &'a dyn SceneQuery,
    /// Loaded outline program.
    pub program: &'a OutlineProgram,
    /// Current camera color, premultiplied linear RGBA.
    pub camera_color: &'a Rgba32FImage,
}

/// Backend contract for executing a [`FramePlan`].
///
/// [`execute_plan`] drives the calls; a backend only has to implement each pass in isolation.
pub trait PassBackend {
    /// Prepare per-frame state.
    fn begin_frame(&mut self, plan: &FramePlan, inputs: &FrameInputs<'_>) -> OutlineResult<()>;

    /// Acquire storage for a transient surface before its first use.
    fn ensure_surface(&mut self, id: SurfaceId, desc: &SurfaceDesc) -> OutlineResult<()>;

    /// Bind the host's camera color to the imported surface.
    fn import_color(&mut self, id: SurfaceId, color: &Rgba32FImage) -> OutlineResult<()>;

    /// Draw group silhouettes.
    fn exec_render_masks(&mut self, pass: &MaskPass, inputs: &FrameInputs<'_>)
    -> OutlineResult<()>;

    /// Pack per-group coverage.
    fn exec_combine(&mut self, pass: &CombinePass) -> OutlineResult<()>;

    /// One blur direction.
    fn exec_blur(&mut self, pass: &BlurPass) -> OutlineResult<()>;

    /// Composite the overlay.
    fn exec_resolve(&mut self, pass: &ResolvePass) -> OutlineResult<()>;

    /// Give a surface back after its last use.
    fn release_surface(&mut self, id: SurfaceId, desc: &SurfaceDesc) -> OutlineResult<()>;

    /// Hand the final surface to the host.
    fn readback_color(&mut self, id: SurfaceId, plan: &FramePlan) -> OutlineResult<Rgba32FImage>;

    /// Drop leftover per-frame state and report counters. Always called, including after a
    /// failed pass.
    fn end_frame(&mut self) -> FrameStats;
}

/// Validate and run `plan` on `backend`.
///
/// Transient surfaces are acquired right before their first pass and released right after their
/// last one; the final surface is moved out to the caller. On error the backend still ends the
/// frame, so pooled storage is recovered and the host's color is untouched.
pub fn execute_plan<B: PassBackend + ?Sized>(
    backend: &mut B,
    plan: &FramePlan,
    inputs: &FrameInputs<'_>,
) -> OutlineResult<RenderedFrame> {
    plan.validate()?;
    let (w, h) = inputs.camera_color.dimensions();
    if w != plan.extent.width || h != plan.extent.height {
        return Err(OutlineError::validation(format!(
            "camera color is {w}x{h}, plan expects {}x{}",
            plan.extent.width, plan.extent.height
        )));
    }

    let run = |backend: &mut B| -> OutlineResult<Rgba32FImage> {
        backend.begin_frame(plan, inputs)?;
        backend.import_color(plan.camera_color, inputs.camera_color)?;

        let lifetimes = plan.lifetimes();
        for (idx, pass) in plan.passes.iter().enumerate() {
            inputs
                .program
                .require(SubProgram::for_stage(pass.stage()))?;

            for (sid, life) in lifetimes.iter().enumerate() {
                if let Some(life) = life
                    && life.first == idx
                    && plan.surfaces[sid].origin == SurfaceOrigin::Transient
                {
                    backend.ensure_surface(surface_id(sid)?, &plan.surfaces[sid])?;
                }
            }

            tracing::debug!(pass = pass.name(), "executing outline pass");
            match pass {
                Pass::RenderMasks(p) => backend.exec_render_masks(p, inputs)?,
                Pass::CombineMasks(p) => backend.exec_combine(p)?,
                Pass::Blur(p) => backend.exec_blur(p)?,
                Pass::Resolve(p) => backend.exec_resolve(p)?,
            }

            for (sid, life) in lifetimes.iter().enumerate() {
                if let Some(life) = life
                    && life.last == idx
                    && sid != plan.final_surface.index()
                {
                    backend.release_surface(surface_id(sid)?, &plan.surfaces[sid])?;
                }
            }
        }

        backend.readback_color(plan.final_surface, plan)
    };

    let color = run(backend);
    let stats = backend.end_frame();
    Ok(RenderedFrame {
        color: color?,
        stats,
    })
}

fn surface_id(idx: usize) -> OutlineResult<SurfaceId> {
    Ok(SurfaceId(
        idx.try_into()
            .map_err(|_| OutlineError::evaluation("surface id overflow"))?,
    ))
}

#[cfg(test)]
#[path = "../../tests/unit/render/backend.rs"]
mod tests;
