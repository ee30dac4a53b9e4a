use image::Rgba32FImage;

use crate::compile::compiler::{MaskLayout, PlanOptions, compile_outline_plan};
use crate::foundation::core::RenderingLayerMask;
use crate::foundation::error::OutlineError;
use crate::render::backend::{FrameInputs, FrameStats, PassBackend, RenderedFrame, execute_plan};
use crate::render::cpu::{CpuBackend, CpuBackendOpts};
use crate::render::program::{BuiltinProgram, OutlineProgram, ProgramSource};
use crate::scene::camera::CameraFrame;
use crate::scene::drawable::SceneQuery;
use crate::settings::config::{EffectConfig, MAX_GROUPS};
use crate::settings::stack::SettingsStack;

/// Host stage the outline is recorded in.
#[derive(
    Clone, Copy, Debug, Default, PartialEq, Eq, Hash, serde::Serialize, serde::Deserialize,
)]
pub enum InjectionPoint {
    /// Before the host's post-processing stack, so bloom and tonemapping apply to the outline.
    #[default]
    BeforePostProcessing,
    /// After the host's post-processing stack.
    AfterPostProcessing,
}

/// Options of [`OutlineFeature`].
#[derive(Clone, Debug, PartialEq, serde::Serialize, serde::Deserialize)]
#[serde(default)]
pub struct FeatureOptions {
    /// Master switch.
    pub enabled: bool,
    /// Host stage the feature runs in.
    pub injection_point: InjectionPoint,
    /// Coverage layout.
    pub layout: MaskLayout,
    /// Rendering-layer bit selecting each group's objects; must be non-empty and disjoint.
    pub group_layers: [RenderingLayerMask; MAX_GROUPS],
    /// Draw coverage without temporal jitter.
    pub remove_jitter: bool,
    /// CPU backend pool and budget.
    pub backend: CpuBackendOpts,
}

impl Default for FeatureOptions {
    fn default() -> Self {
        let plan = PlanOptions::default();
        Self {
            enabled: true,
            injection_point: InjectionPoint::default(),
            layout: plan.layout,
            group_layers: plan.group_layers,
            remove_jitter: plan.remove_jitter,
            backend: CpuBackendOpts::default(),
        }
    }
}

impl FeatureOptions {
    fn plan_options(&self) -> PlanOptions {
        PlanOptions {
            layout: self.layout,
            group_layers: self.group_layers,
            remove_jitter: self.remove_jitter,
        }
    }
}

/// Why a frame was not rendered. None of these allocate or draw anything.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum SkipReason {
    /// [`FeatureOptions::enabled`] is off.
    FeatureDisabled,
    /// Post-processing is off globally or for this camera.
    PostProcessingDisabled,
    /// No group has a visible color or fill.
    InactiveConfiguration,
    /// Preview and reflection cameras never show the outline.
    IneligibleCamera,
    /// The outline program could not be loaded; retried next frame.
    ResourceUnavailable,
}

/// Result of [`OutlineFeature::render`].
#[derive(Debug)]
pub enum FrameOutcome {
    /// The outline was composited; `color` replaces the camera target.
    Rendered(RenderedFrame),
    /// The gate rejected the frame; keep the camera color.
    Skipped(SkipReason),
    /// A pass failed; keep the camera color, the next frame tries again.
    Failed(OutlineError),
}

impl FrameOutcome {
    /// `true` for [`FrameOutcome::Rendered`].
    pub fn is_rendered(&self) -> bool {
        matches!(self, Self::Rendered(_))
    }

    /// Skip reason, if the frame was skipped.
    pub fn skip_reason(&self) -> Option<SkipReason> {
        match self {
            Self::Skipped(r) => Some(*r),
            _ => None,
        }
    }

    /// Execution counters; zero unless rendered.
    pub fn stats(&self) -> FrameStats {
        match self {
            Self::Rendered(f) => f.stats,
            _ => FrameStats::default(),
        }
    }

    /// Camera color to continue the host frame with: the resolved image when rendered,
    /// `original` otherwise.
    pub fn into_color(self, original: Rgba32FImage) -> Rgba32FImage {
        match self {
            Self::Rendered(f) => f.color,
            _ => original,
        }
    }
}

/// Per-frame inputs supplied by the host pipeline.
#[derive(Clone, Copy)]
pub struct FrameContext<'a> {
    /// Camera being rendered.
    pub camera: &'a CameraFrame,
    /// Scene query for the mask pass.
    pub scene: &'a dyn SceneQuery,
    /// Current camera color, premultiplied linear RGBA at the camera's extent.
    pub camera_color: &'a Rgba32FImage,
    /// Whether the host's post-processing stage is enabled at all.
    pub post_processing_enabled: bool,
}

impl<'a> FrameContext<'a> {
    /// Context with post-processing enabled.
    pub fn new(
        camera: &'a CameraFrame,
        scene: &'a dyn SceneQuery,
        camera_color: &'a Rgba32FImage,
    ) -> Self {
        Self {
            camera,
            scene,
            camera_color,
            post_processing_enabled: true,
        }
    }
}

/// The outline post-process: gates each frame, compiles the pass plan and runs it.
///
/// Errors never escape [`OutlineFeature::render`]; they become [`FrameOutcome::Skipped`] or
/// [`FrameOutcome::Failed`] and the host keeps its camera color.
pub struct OutlineFeature<S = BuiltinProgram, B = CpuBackend> {
    options: FeatureOptions,
    source: S,
    backend: B,
    program: Option<OutlineProgram>,
    load_failed: bool,
}

impl OutlineFeature {
    /// Feature with the builtin program and the CPU backend configured from `options`.
    pub fn new(options: FeatureOptions) -> Self {
        let backend = CpuBackend::new(options.backend);
        Self::with_parts(options, BuiltinProgram, backend)
    }
}

impl Default for OutlineFeature {
    fn default() -> Self {
        Self::new(FeatureOptions::default())
    }
}

impl<S: ProgramSource, B: PassBackend> OutlineFeature<S, B> {
    /// Feature with a custom program source and backend.
    pub fn with_parts(options: FeatureOptions, source: S, backend: B) -> Self {
        Self {
            options,
            source,
            backend,
            program: None,
            load_failed: false,
        }
    }

    /// Options in effect.
    pub fn options(&self) -> &FeatureOptions {
        &self.options
    }

    /// Replace the options; takes effect next frame.
    pub fn set_options(&mut self, options: FeatureOptions) {
        self.options = options;
    }

    /// Host stage to record the feature in.
    pub fn injection_point(&self) -> InjectionPoint {
        self.options.injection_point
    }

    /// The backend.
    pub fn backend(&self) -> &B {
        &self.backend
    }

    /// Mutable backend access.
    pub fn backend_mut(&mut self) -> &mut B {
        &mut self.backend
    }

    /// Currently loaded program, if any.
    pub fn program(&self) -> Option<&OutlineProgram> {
        self.program.as_ref()
    }

    /// Forget the loaded program so the next frame reloads it.
    pub fn invalidate_program(&mut self) {
        self.program = None;
    }

    /// Resolve `stack` and render with the result.
    pub fn render_with_stack(
        &mut self,
        frame: &FrameContext<'_>,
        stack: &SettingsStack,
    ) -> FrameOutcome {
        let config = stack.resolve();
        self.render(frame, &config)
    }

    /// Run the outline for one camera frame.
    ///
    /// Gate order: feature and post-processing switches, configuration activity, camera
    /// eligibility, program availability. A failing gate returns before any allocation.
    #[tracing::instrument(
        level = "debug",
        skip_all,
        fields(
            camera = ?frame.camera.kind,
            width = frame.camera.extent.width,
            height = frame.camera.extent.height,
        )
    )]
    pub fn render(&mut self, frame: &FrameContext<'_>, config: &EffectConfig) -> FrameOutcome {
        if let Some(reason) = self.gate(frame, config) {
            tracing::debug!(?reason, "outline skipped");
            return FrameOutcome::Skipped(reason);
        }
        let Some(program) = self.program.as_ref() else {
            return FrameOutcome::Skipped(SkipReason::ResourceUnavailable);
        };

        let plan = match compile_outline_plan(config, frame.camera, &self.options.plan_options())
        {
            Ok(plan) => plan,
            Err(err) => {
                tracing::warn!(error = %err, "outline plan rejected");
                return FrameOutcome::Failed(err);
            }
        };

        let inputs = FrameInputs {
            camera: frame.camera,
            scene: frame.scene,
            program,
            camera_color: frame.camera_color,
        };
        match execute_plan(&mut self.backend, &plan, &inputs) {
            Ok(rendered) => {
                tracing::debug!(stats = ?rendered.stats, "outline rendered");
                FrameOutcome::Rendered(rendered)
            }
            Err(err) => {
                if matches!(err, OutlineError::ResourceUnavailable(_)) {
                    self.program = None;
                }
                tracing::warn!(error = %err, "outline frame failed");
                FrameOutcome::Failed(err)
            }
        }
    }

    fn gate(&mut self, frame: &FrameContext<'_>, config: &EffectConfig) -> Option<SkipReason> {
        if !self.options.enabled {
            return Some(SkipReason::FeatureDisabled);
        }
        if !frame.post_processing_enabled || !frame.camera.post_processing {
            return Some(SkipReason::PostProcessingDisabled);
        }
        if !config.is_active() {
            return Some(SkipReason::InactiveConfiguration);
        }
        if !frame.camera.kind.is_eligible() {
            return Some(SkipReason::IneligibleCamera);
        }
        if !self.ensure_program() {
            return Some(SkipReason::ResourceUnavailable);
        }
        None
    }

    fn ensure_program(&mut self) -> bool {
        if self.program.is_some() {
            return true;
        }
        match self.source.load() {
            Ok(program) => {
                if self.load_failed {
                    tracing::info!(program = program.name(), "outline program available again");
                }
                self.load_failed = false;
                self.program = Some(program);
                true
            }
            Err(err) => {
                if !self.load_failed {
                    tracing::warn!(error = %err, "outline program unavailable, effect disabled");
                }
                self.load_failed = true;
                false
            }
        }
    }
}

#[cfg(test)]
#[path = "../../tests/unit/pipeline/feature.rs"]
mod tests;
