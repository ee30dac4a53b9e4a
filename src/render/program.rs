//! Shading program resource model.
//!
//! The outline runs a single program with indexed sub-programs, one per pass kind. Programs come
//! from a [`ProgramSource`] supplied by the host's asset system; [`BuiltinProgram`] provides the
//! CPU reference implementation.

use smallvec::SmallVec;

use crate::compile::plan::PassStage;
use crate::foundation::error::{OutlineError, OutlineResult};

/// Uniform carrying the per-group colors.
pub const OUTLINE_COLORS: &str = "_OutlineColors";
/// Uniform carrying the per-group fall-offs.
pub const OUTLINE_FALL_OFFS: &str = "_OutlineFallOffs";
/// Uniform carrying the per-group fill alphas.
pub const FILL_ALPHAS: &str = "_FillAlphas";
/// Uniform carrying the blur kernel radius.
pub const BLUR_KERNEL_RADIUS: &str = "_BlurKernelRadius";
/// Uniform carrying the blur standard deviation.
pub const BLUR_STANDARD_DEVIATION: &str = "_BlurStandardDeviation";
/// Per-draw channel selector of the mask pass.
pub const OUTLINE_MASK_COLOR: &str = "_OutlineMaskColor";
/// Unblurred coverage texture.
pub const RENDERED_OBJECTS_MASK: &str = "_OutlineRenderedObjectsMaskTexture";
/// Blurred coverage texture.
pub const BLURRED_OBJECTS_MASK: &str = "_OutlineBlurredRenderedObjectsMaskTexture";
/// Generic source texture of a full-screen pass.
pub const BLIT_TEXTURE: &str = "_BlitTexture";

/// Indexed sub-program of [`OutlineProgram`].
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, serde::Serialize, serde::Deserialize)]
#[repr(u8)]
pub enum SubProgram {
    /// Constant-coverage override used to draw silhouettes.
    RenderMask = 0,
    /// First blur sub-pass.
    HorizontalBlur = 1,
    /// Second blur sub-pass.
    VerticalBlur = 2,
    /// Overlay resolve.
    Resolve = 3,
    /// Channel packing for per-group coverage targets.
    CombineMasks = 4,
}

impl SubProgram {
    /// Every sub-program, in index order.
    pub const ALL: [Self; 5] = [
        Self::RenderMask,
        Self::HorizontalBlur,
        Self::VerticalBlur,
        Self::Resolve,
        Self::CombineMasks,
    ];

    /// Pass index inside the program.
    pub fn index(self) -> usize {
        self as usize
    }

    /// Sub-program executing `stage`.
    pub fn for_stage(stage: PassStage) -> Self {
        match stage {
            PassStage::RenderObjects => Self::RenderMask,
            PassStage::CombineMasks => Self::CombineMasks,
            PassStage::HorizontalBlur => Self::HorizontalBlur,
            PassStage::VerticalBlur => Self::VerticalBlur,
            PassStage::Resolve => Self::Resolve,
        }
    }

    /// Named inputs the sub-program consumes.
    pub fn inputs(self) -> &'static [&'static str] {
        match self {
            Self::RenderMask => &[OUTLINE_MASK_COLOR],
            Self::HorizontalBlur | Self::VerticalBlur => {
                &[BLIT_TEXTURE, BLUR_KERNEL_RADIUS, BLUR_STANDARD_DEVIATION]
            }
            Self::Resolve => &[
                BLIT_TEXTURE,
                RENDERED_OBJECTS_MASK,
                BLURRED_OBJECTS_MASK,
                OUTLINE_COLORS,
                OUTLINE_FALL_OFFS,
                FILL_ALPHAS,
            ],
            Self::CombineMasks => &[BLIT_TEXTURE],
        }
    }
}

/// A loaded outline program.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct OutlineProgram {
    name: String,
    sub_programs: SmallVec<[SubProgram; 5]>,
}

impl OutlineProgram {
    /// Program exposing `sub_programs`; duplicates are rejected.
    pub fn new(
        name: impl Into<String>,
        sub_programs: impl IntoIterator<Item = SubProgram>,
    ) -> OutlineResult<Self> {
        let mut subs: SmallVec<[SubProgram; 5]> = SmallVec::new();
        for sub in sub_programs {
            if subs.contains(&sub) {
                return Err(OutlineError::validation(format!(
                    "sub-program {sub:?} listed twice"
                )));
            }
            subs.push(sub);
        }
        subs.sort_by_key(|s| s.index());
        Ok(Self {
            name: name.into(),
            sub_programs: subs,
        })
    }

    /// The CPU reference program with every sub-program.
    pub fn builtin() -> Self {
        Self {
            name: "Outline/Builtin".to_owned(),
            sub_programs: SubProgram::ALL.into_iter().collect(),
        }
    }

    /// Program name.
    pub fn name(&self) -> &str {
        &self.name
    }

    /// Available sub-programs, in index order.
    pub fn sub_programs(&self) -> &[SubProgram] {
        &self.sub_programs
    }

    /// `true` when `sub` is available.
    pub fn has(&self, sub: SubProgram) -> bool {
        self.sub_programs.contains(&sub)
    }

    /// Fail with [`OutlineError::ResourceUnavailable`] when `sub` is missing.
    pub fn require(&self, sub: SubProgram) -> OutlineResult<()> {
        if self.has(sub) {
            Ok(())
        } else {
            Err(OutlineError::resource_unavailable(format!(
                "program '{}' has no {sub:?} sub-program (pass {})",
                self.name,
                sub.index()
            )))
        }
    }
}

/// Loader for the outline program; the host's asset system implements this.
pub trait ProgramSource {
    /// Load (or reload) the program. Called again on later frames while it keeps failing.
    fn load(&mut self) -> OutlineResult<OutlineProgram>;
}

/// Source returning [`OutlineProgram::builtin`].
#[derive(Clone, Copy, Debug, Default)]
pub struct BuiltinProgram;

impl ProgramSource for BuiltinProgram {
    fn load(&mut self) -> OutlineResult<OutlineProgram> {
        Ok(OutlineProgram::builtin())
    }
}

#[cfg(test)]
#[path = "../../tests/unit/render/program.rs"]
mod tests;
