use smallvec::SmallVec;

use crate::effects::blur::{BlurAxis, GaussianKernel};
use crate::foundation::core::{Extent, RenderingLayerMask};
use crate::foundation::error::{OutlineError, OutlineResult};
use crate::settings::config::{MAX_GROUPS, OutlineGroupConfig};

#[derive(Clone, Debug)]
/// Backend-agnostic plan for one frame of the outline effect.
///
/// A plan consists of:
/// - surface declarations (`surfaces`), one of which is the imported camera color
/// - an ordered sequence of passes (`passes`), each declaring what it reads and writes
/// - a declared output surface (`final_surface`) that replaces the camera color
///
/// [`FramePlan::validate`] checks the declarations for read-after-write hazards before any
/// backend touches a pixel.
pub struct FramePlan {
    /// Camera target size shared by every surface.
    pub extent: Extent,
    /// Surface declarations, indexed by [`SurfaceId`].
    pub surfaces: Vec<SurfaceDesc>,
    /// Passes in execution order.
    pub passes: Vec<Pass>,
    /// The imported camera color surface.
    pub camera_color: SurfaceId,
    /// Surface handed back to the host as the new camera color.
    pub final_surface: SurfaceId,
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, PartialOrd, Ord)]
/// Identifier for a surface declared in [`FramePlan::surfaces`].
pub struct SurfaceId(
    /// Raw index in [`FramePlan::surfaces`].
    pub u32,
);

impl SurfaceId {
    pub(crate) fn index(self) -> usize {
        self.0 as usize
    }
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
/// Pixel layout of a surface.
pub enum SurfaceFormat {
    /// One coverage channel.
    Coverage1,
    /// Four coverage channels, one per group.
    Coverage4,
    /// Premultiplied linear RGBA.
    Rgba32F,
}

impl SurfaceFormat {
    /// Interleaved `f32` values per pixel.
    pub fn channels(self) -> usize {
        match self {
            Self::Coverage1 => 1,
            Self::Coverage4 | Self::Rgba32F => 4,
        }
    }

    /// Coverage format carrying `channels` channels.
    pub fn coverage(channels: usize) -> Self {
        if channels == 1 {
            Self::Coverage1
        } else {
            Self::Coverage4
        }
    }
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
/// Who owns a surface's storage.
pub enum SurfaceOrigin {
    /// Allocated for this frame and released after its last use.
    Transient,
    /// The host's camera color; read-only for the outline passes.
    ImportedCameraColor,
}

#[derive(Clone, Debug, PartialEq, Eq)]
/// Surface declaration.
pub struct SurfaceDesc {
    /// Debug name.
    pub name: &'static str,
    /// Size in pixels.
    pub extent: Extent,
    /// Pixel layout.
    pub format: SurfaceFormat,
    /// Storage ownership.
    pub origin: SurfaceOrigin,
}

impl SurfaceDesc {
    pub(crate) fn transient(name: &'static str, extent: Extent, format: SurfaceFormat) -> Self {
        Self {
            name,
            extent,
            format,
            origin: SurfaceOrigin::Transient,
        }
    }

    /// Bytes of `f32` storage the surface needs.
    pub fn byte_len(&self) -> usize {
        self.extent
            .pixel_count()
            .saturating_mul(self.format.channels())
            .saturating_mul(std::mem::size_of::<f32>())
    }
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
/// How a pass touches a surface.
pub enum AccessKind {
    /// Sampled as input.
    Read,
    /// Partially written on top of existing content.
    Write,
    /// Every pixel overwritten.
    WriteAll,
    /// Overwrites a surface whose previous content was consumed by earlier passes.
    WriteAliased,
}

impl AccessKind {
    /// `true` for every write flavor.
    pub fn is_write(self) -> bool {
        !matches!(self, Self::Read)
    }
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
/// One declared surface access.
pub struct SurfaceAccess {
    /// Surface touched.
    pub surface: SurfaceId,
    /// Access kind.
    pub kind: AccessKind,
}

impl SurfaceAccess {
    fn new(surface: SurfaceId, kind: AccessKind) -> Self {
        Self { surface, kind }
    }
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
/// Stage of the outline state machine.
pub enum PassStage {
    /// Draw group silhouettes into coverage.
    RenderObjects,
    /// Pack per-group coverage into one multi-channel image.
    CombineMasks,
    /// First blur sub-pass.
    HorizontalBlur,
    /// Second blur sub-pass.
    VerticalBlur,
    /// Composite the overlay onto the camera color.
    Resolve,
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
/// One group's draw into a coverage channel.
pub struct MaskDraw {
    /// Group index.
    pub group: usize,
    /// Rendering layers selecting the group's objects.
    pub layer: RenderingLayerMask,
    /// Coverage surface written.
    pub target: SurfaceId,
    /// Channel of `target` receiving 1.0 where the geometry covers a pixel.
    pub channel: usize,
}

#[derive(Clone, Debug)]
/// Draw every group's silhouettes into cleared coverage targets.
pub struct MaskPass {
    /// Draws in group order.
    pub draws: SmallVec<[MaskDraw; MAX_GROUPS]>,
    /// Targets cleared to zero before drawing.
    pub clear: SmallVec<[SurfaceId; MAX_GROUPS]>,
    /// Copy `(from, to)` after drawing, preserving the raw coverage before `from` is blurred over.
    pub snapshot: Option<(SurfaceId, SurfaceId)>,
    /// Render with the unjittered projection.
    pub remove_jitter: bool,
}

#[derive(Clone, Debug)]
/// Pack single-channel coverage images into one multi-channel image.
pub struct CombinePass {
    /// Input `i` lands in output channel `i`.
    pub inputs: SmallVec<[SurfaceId; MAX_GROUPS]>,
    /// Packed output.
    pub output: SurfaceId,
}

#[derive(Clone, Debug)]
/// One 1-D Gaussian pass.
pub struct BlurPass {
    /// Sampling direction.
    pub axis: BlurAxis,
    /// Input surface.
    pub input: SurfaceId,
    /// Output surface, never the input.
    pub output: SurfaceId,
    /// Normalized kernel.
    pub kernel: GaussianKernel,
    /// Output reuses a surface whose earlier content has already been consumed.
    pub aliased_output: bool,
}

#[derive(Clone, Debug)]
/// Final composite of the outline overlay onto the source camera color.
pub struct ResolvePass {
    /// Camera color read as the background.
    pub source: SurfaceId,
    /// Unblurred coverage.
    pub sharp: SurfaceId,
    /// Blurred coverage.
    pub blurred: SurfaceId,
    /// Fresh output surface.
    pub target: SurfaceId,
    /// Group parameters, group `i` reading coverage channel `i`.
    pub groups: SmallVec<[OutlineGroupConfig; MAX_GROUPS]>,
}

#[derive(Clone, Debug)]
/// A single pass in a [`FramePlan`].
pub enum Pass {
    /// Silhouette draws.
    RenderMasks(MaskPass),
    /// Channel packing.
    CombineMasks(CombinePass),
    /// Horizontal or vertical blur.
    Blur(BlurPass),
    /// Overlay composite.
    Resolve(ResolvePass),
}

impl Pass {
    /// Stage this pass implements.
    pub fn stage(&self) -> PassStage {
        match self {
            Self::RenderMasks(_) => PassStage::RenderObjects,
            Self::CombineMasks(_) => PassStage::CombineMasks,
            Self::Blur(p) => match p.axis {
                BlurAxis::Horizontal => PassStage::HorizontalBlur,
                BlurAxis::Vertical => PassStage::VerticalBlur,
            },
            Self::Resolve(_) => PassStage::Resolve,
        }
    }

    /// Human-readable pass name.
    pub fn name(&self) -> &'static str {
        match self.stage() {
            PassStage::RenderObjects => "Outline Render Objects Pass",
            PassStage::CombineMasks => "Outline Combine Masks Pass",
            PassStage::HorizontalBlur => "Outline Horizontal Blur Pass",
            PassStage::VerticalBlur => "Outline Vertical Blur Pass",
            PassStage::Resolve => "Outline Resolve Pass",
        }
    }

    /// Declared surface accesses.
    pub fn accesses(&self) -> SmallVec<[SurfaceAccess; 8]> {
        let mut out = SmallVec::new();
        match self {
            Self::RenderMasks(p) => {
                for &s in &p.clear {
                    out.push(SurfaceAccess::new(s, AccessKind::WriteAll));
                }
                for d in &p.draws {
                    if !p.clear.contains(&d.target) {
                        out.push(SurfaceAccess::new(d.target, AccessKind::Write));
                    }
                }
                if let Some((_, to)) = p.snapshot {
                    out.push(SurfaceAccess::new(to, AccessKind::WriteAll));
                }
            }
            Self::CombineMasks(p) => {
                for &s in &p.inputs {
                    out.push(SurfaceAccess::new(s, AccessKind::Read));
                }
                out.push(SurfaceAccess::new(p.output, AccessKind::WriteAll));
            }
            Self::Blur(p) => {
                out.push(SurfaceAccess::new(p.input, AccessKind::Read));
                let kind = if p.aliased_output {
                    AccessKind::WriteAliased
                } else {
                    AccessKind::WriteAll
                };
                out.push(SurfaceAccess::new(p.output, kind));
            }
            Self::Resolve(p) => {
                out.push(SurfaceAccess::new(p.source, AccessKind::Read));
                out.push(SurfaceAccess::new(p.sharp, AccessKind::Read));
                out.push(SurfaceAccess::new(p.blurred, AccessKind::Read));
                out.push(SurfaceAccess::new(p.target, AccessKind::WriteAll));
            }
        }
        out
    }
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
/// First and last pass index touching a surface.
pub struct SurfaceLifetime {
    /// First pass using the surface.
    pub first: usize,
    /// Last pass using the surface.
    pub last: usize,
}

impl FramePlan {
    /// Surface declaration for `id`.
    pub fn surface(&self, id: SurfaceId) -> OutlineResult<&SurfaceDesc> {
        self.surfaces
            .get(id.index())
            .ok_or_else(|| OutlineError::validation(format!("unknown surface {}", id.0)))
    }

    /// Check the declared accesses for hazards.
    ///
    /// Rejected: an empty extent, reads of surfaces nothing has produced yet, in-place passes, silent rewrites
    /// (a second write must be declared [`AccessKind::WriteAliased`]), writes to the imported
    /// camera color, and an output that is never produced.
    pub fn validate(&self) -> OutlineResult<()> {
        if self.extent.is_empty() {
            return Err(OutlineError::validation(format!(
                "plan extent {}x{} has no pixels",
                self.extent.width, self.extent.height
            )));
        }
        for desc in &self.surfaces {
            if desc.extent != self.extent {
                return Err(OutlineError::validation(format!(
                    "surface '{}' does not match the plan extent",
                    desc.name
                )));
            }
        }
        if self.surface(self.camera_color)?.origin != SurfaceOrigin::ImportedCameraColor {
            return Err(OutlineError::validation(
                "camera color surface must be imported",
            ));
        }
        if self.surface(self.final_surface)?.origin != SurfaceOrigin::Transient {
            return Err(OutlineError::validation(
                "final surface must be a fresh transient surface",
            ));
        }

        let mut written: Vec<bool> = self
            .surfaces
            .iter()
            .map(|d| d.origin == SurfaceOrigin::ImportedCameraColor)
            .collect();

        for pass in &self.passes {
            let accesses = pass.accesses();
            for a in &accesses {
                let desc = self.surface(a.surface)?;
                if a.kind == AccessKind::Read {
                    if !written[a.surface.index()] {
                        return Err(OutlineError::validation(format!(
                            "{} reads '{}' before any pass wrote it",
                            pass.name(),
                            desc.name
                        )));
                    }
                    if accesses
                        .iter()
                        .any(|b| b.surface == a.surface && b.kind.is_write())
                    {
                        return Err(OutlineError::validation(format!(
                            "{} reads and writes '{}' in place",
                            pass.name(),
                            desc.name
                        )));
                    }
                }
            }
            for a in accesses.iter().filter(|a| a.kind.is_write()) {
                let desc = self.surface(a.surface)?;
                if desc.origin == SurfaceOrigin::ImportedCameraColor {
                    return Err(OutlineError::validation(format!(
                        "{} writes the imported camera color",
                        pass.name()
                    )));
                }
                if written[a.surface.index()] && a.kind != AccessKind::WriteAliased {
                    return Err(OutlineError::validation(format!(
                        "{} rewrites '{}' without declaring the alias",
                        pass.name(),
                        desc.name
                    )));
                }
            }
            for a in accesses.iter().filter(|a| a.kind.is_write()) {
                written[a.surface.index()] = true;
            }
        }

        if !written[self.final_surface.index()] {
            return Err(OutlineError::validation("final surface is never written"));
        }
        Ok(())
    }

    /// Per-surface first/last pass use; `None` for surfaces no pass touches.
    pub fn lifetimes(&self) -> Vec<Option<SurfaceLifetime>> {
        let mut out: Vec<Option<SurfaceLifetime>> = vec![None; self.surfaces.len()];
        for (idx, pass) in self.passes.iter().enumerate() {
            for a in pass.accesses() {
                let Some(slot) = out.get_mut(a.surface.index()) else {
                    continue;
                };
                match slot {
                    Some(l) => l.last = idx,
                    None => {
                        *slot = Some(SurfaceLifetime {
                            first: idx,
                            last: idx,
                        })
                    }
                }
            }
        }
        out
    }

    /// Stages in execution order.
    pub fn stages(&self) -> Vec<PassStage> {
        self.passes.iter().map(Pass::stage).collect()
    }
}

#[cfg(test)]
#[path = "../../tests/unit/compile/plan.rs"]
mod tests;
