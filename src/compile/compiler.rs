use smallvec::SmallVec;

use crate::compile::plan::{
    BlurPass, CombinePass, FramePlan, MaskDraw, MaskPass, Pass, ResolvePass, SurfaceDesc,
    SurfaceFormat, SurfaceId, SurfaceOrigin,
};
use crate::effects::blur::{BlurAxis, GaussianKernel};
use crate::foundation::core::RenderingLayerMask;
use crate::foundation::error::{OutlineError, OutlineResult};
use crate::scene::camera::CameraFrame;
use crate::settings::config::{EffectConfig, MAX_GROUPS};

/// Where group coverage is drawn.
#[derive(
    Clone, Copy, Debug, Default, PartialEq, Eq, Hash, serde::Serialize, serde::Deserialize,
)]
pub enum MaskLayout {
    /// One shared target, each group writing its own channel. The target doubles as the vertical
    /// blur output, so the raw coverage is snapshotted right after drawing.
    #[default]
    Packed,
    /// One single-channel target per group, packed by a combine pass before blurring.
    PerGroup,
}

/// Plan compilation options.
#[derive(Clone, Debug, PartialEq, serde::Serialize, serde::Deserialize)]
pub struct PlanOptions {
    /// Coverage layout.
    pub layout: MaskLayout,
    /// Rendering-layer bit selecting each group's objects.
    pub group_layers: [RenderingLayerMask; MAX_GROUPS],
    /// Draw coverage with the unjittered projection when temporal jitter is active.
    pub remove_jitter: bool,
}

impl Default for PlanOptions {
    fn default() -> Self {
        Self {
            layout: MaskLayout::Packed,
            group_layers: [
                RenderingLayerMask(1 << 1),
                RenderingLayerMask(1 << 2),
                RenderingLayerMask(1 << 3),
                RenderingLayerMask(1 << 4),
            ],
            remove_jitter: true,
        }
    }
}

impl PlanOptions {
    fn validate(&self, groups: usize) -> OutlineResult<()> {
        let layers = &self.group_layers[..groups];
        for (i, a) in layers.iter().enumerate() {
            if a.is_empty() {
                return Err(OutlineError::validation(format!(
                    "outline group {i} has an empty rendering layer mask"
                )));
            }
            if layers[i + 1..].iter().any(|b| a.intersects(*b)) {
                return Err(OutlineError::validation(format!(
                    "outline group {i} shares rendering layer bits with another group"
                )));
            }
        }
        Ok(())
    }
}

/// Build the frame plan `RenderObjects -> [CombineMasks] -> HorizontalBlur -> VerticalBlur ->
/// Resolve` for one camera.
pub fn compile_outline_plan(
    config: &EffectConfig,
    camera: &CameraFrame,
    opts: &PlanOptions,
) -> OutlineResult<FramePlan> {
    let groups = config.group_count();
    opts.validate(groups)?;

    let extent = camera.extent;
    let channels = config.coverage_channels();
    let coverage = SurfaceFormat::coverage(channels);
    let kernel = GaussianKernel::from_radius(config.blur_radius())?;
    let remove_jitter = opts.remove_jitter && camera.jitter_active();

    let mut surfaces = vec![SurfaceDesc {
        name: "_CameraColor",
        extent,
        format: SurfaceFormat::Rgba32F,
        origin: SurfaceOrigin::ImportedCameraColor,
    }];
    let mut declare = |desc: SurfaceDesc| {
        let id = SurfaceId(surfaces.len() as u32);
        surfaces.push(desc);
        id
    };
    let camera_color = SurfaceId(0);

    let mut passes = Vec::with_capacity(5);
    let (sharp, horizontal, vertical);

    match opts.layout {
        MaskLayout::Packed => {
            sharp = declare(SurfaceDesc::transient(
                "_OutlineCombinedMask",
                extent,
                coverage,
            ));
            horizontal = declare(SurfaceDesc::transient(
                "_OutlineHorizontalBlur",
                extent,
                coverage,
            ));
            vertical = declare(SurfaceDesc::transient(
                "_OutlineVerticalBlur",
                extent,
                coverage,
            ));

            passes.push(Pass::RenderMasks(MaskPass {
                draws: (0..groups)
                    .map(|g| MaskDraw {
                        group: g,
                        layer: opts.group_layers[g],
                        target: vertical,
                        channel: g,
                    })
                    .collect(),
                clear: SmallVec::from_slice(&[vertical]),
                snapshot: Some((vertical, sharp)),
                remove_jitter,
            }));
        }
        MaskLayout::PerGroup => {
            const MASK_NAMES: [&str; MAX_GROUPS] = [
                "_OutlineMask1",
                "_OutlineMask2",
                "_OutlineMask3",
                "_OutlineMask4",
            ];
            let masks: SmallVec<[SurfaceId; MAX_GROUPS]> = (0..groups)
                .map(|g| {
                    declare(SurfaceDesc::transient(
                        MASK_NAMES[g],
                        extent,
                        SurfaceFormat::Coverage1,
                    ))
                })
                .collect();
            passes.push(Pass::RenderMasks(MaskPass {
                draws: masks
                    .iter()
                    .enumerate()
                    .map(|(g, &target)| MaskDraw {
                        group: g,
                        layer: opts.group_layers[g],
                        target,
                        channel: 0,
                    })
                    .collect(),
                clear: masks.clone(),
                snapshot: None,
                remove_jitter,
            }));

            sharp = if groups == 1 {
                masks[0]
            } else {
                let combined = declare(SurfaceDesc::transient(
                    "_OutlineCombinedMask",
                    extent,
                    coverage,
                ));
                passes.push(Pass::CombineMasks(CombinePass {
                    inputs: masks,
                    output: combined,
                }));
                combined
            };
            horizontal = declare(SurfaceDesc::transient(
                "_OutlineHorizontalBlur",
                extent,
                coverage,
            ));
            vertical = declare(SurfaceDesc::transient(
                "_OutlineVerticalBlur",
                extent,
                coverage,
            ));
        }
    }

    let blur_source = match opts.layout {
        MaskLayout::Packed => vertical,
        MaskLayout::PerGroup => sharp,
    };
    passes.push(Pass::Blur(BlurPass {
        axis: BlurAxis::Horizontal,
        input: blur_source,
        output: horizontal,
        kernel: kernel.clone(),
        aliased_output: false,
    }));
    passes.push(Pass::Blur(BlurPass {
        axis: BlurAxis::Vertical,
        input: horizontal,
        output: vertical,
        kernel,
        aliased_output: opts.layout == MaskLayout::Packed,
    }));

    let target = declare(SurfaceDesc::transient(
        "_OutlineResolve",
        extent,
        SurfaceFormat::Rgba32F,
    ));
    passes.push(Pass::Resolve(ResolvePass {
        source: camera_color,
        sharp,
        blurred: vertical,
        target,
        groups: config.groups().iter().copied().collect(),
    }));

    let plan = FramePlan {
        extent,
        surfaces,
        passes,
        camera_color,
        final_surface: target,
    };
    plan.validate()?;
    Ok(plan)
}

#[cfg(test)]
#[path = "../../tests/unit/compile/compiler.rs"]
mod tests;
