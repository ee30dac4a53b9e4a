//! Multi-group blurred outline post-process.
//!
//! Objects tagged with up to four rendering-layer bits are drawn as flat coverage, the coverage
//! is blurred with a separable Gaussian, and a resolve pass turns sharp and blurred coverage into a
//! colored ring (plus an optional interior fill) composited over the camera color.
//!
//! The per-frame flow is:
//!
//! - Resolve an [`EffectConfig`] (directly or from a [`SettingsStack`])
//! - Hand it to [`OutlineFeature::render`] together with a [`FrameContext`]
//! - Continue the host frame with [`FrameOutcome::into_color`]
//!
//! Internally a frame compiles to a [`FramePlan`] of passes with declared surface accesses,
//! executed by a [`PassBackend`] ([`CpuBackend`] by default).
#![forbid(unsafe_code)]
#![deny(missing_docs)]

mod foundation;

pub(crate) mod compile;
pub(crate) mod effects;
pub(crate) mod pipeline;
pub(crate) mod render;
pub(crate) mod scene;
pub(crate) mod settings;

pub use image::Rgba32FImage;

pub use crate::foundation::core::{
    Extent, LinearRgba, Mat4, Rect, RenderingLayerMask, Vec2, Vec3, Vec4,
};
pub use crate::foundation::error::{OutlineError, OutlineResult};

pub use crate::settings::config::{
    BlurRadius, EffectConfig, MAX_BLUR_RADIUS, MAX_GROUPS, MIN_BLUR_RADIUS, OutlineGroupConfig,
};
pub use crate::settings::stack::{EffectOverrides, GroupOverrides, SettingsLayer, SettingsStack};

pub use crate::scene::camera::{AntialiasingMode, CameraFrame, CameraKind};
pub use crate::scene::drawable::{Drawable, Mesh, SceneList, SceneQuery};

pub use crate::compile::compiler::{MaskLayout, PlanOptions, compile_outline_plan};
pub use crate::compile::plan::{
    AccessKind, BlurPass, CombinePass, FramePlan, MaskDraw, MaskPass, Pass, PassStage,
    ResolvePass, SurfaceAccess, SurfaceDesc, SurfaceFormat, SurfaceId, SurfaceLifetime,
    SurfaceOrigin,
};

pub use crate::effects::blur::{BlurAxis, GaussianKernel, blur_axis};
pub use crate::effects::resolve::{
    CoverageInputs, group_alpha, overlay_pixel, resolve_into, resolve_overlay, ring_intensity,
};

pub use crate::render::backend::{
    FrameInputs, FrameStats, PassBackend, RenderedFrame, execute_plan,
};
pub use crate::render::cpu::{CpuBackend, CpuBackendOpts};
pub use crate::render::program::{BuiltinProgram, OutlineProgram, ProgramSource, SubProgram};
pub use crate::render::raster::{
    CoverageTarget, ProjectionOverride, RasterState, rasterize_clip_triangle, rasterize_mesh,
};
pub use crate::render::surface_pool::{SurfacePoolOpts, SurfacePoolStats};

pub use crate::pipeline::feature::{
    FeatureOptions, FrameContext, FrameOutcome, InjectionPoint, OutlineFeature, SkipReason,
};

/// Named inputs consumed by the outline program's sub-programs.
pub mod uniforms {
    pub use crate::render::program::{
        BLIT_TEXTURE, BLUR_KERNEL_RADIUS, BLUR_STANDARD_DEVIATION, BLURRED_OBJECTS_MASK,
        FILL_ALPHAS, OUTLINE_COLORS, OUTLINE_FALL_OFFS, OUTLINE_MASK_COLOR,
        RENDERED_OBJECTS_MASK,
    };
}
