use crate::foundation::core::{Extent, Mat4, Vec2, Vec3, Vec4};

/// Camera category reported by the host.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, serde::Serialize, serde::Deserialize)]
pub enum CameraKind {
    /// Regular in-game camera.
    Game,
    /// Editor scene view.
    SceneView,
    /// Asset/material preview camera.
    Preview,
    /// Reflection probe capture camera.
    Reflection,
    /// Stereo/XR camera.
    VirtualReality,
}

impl CameraKind {
    /// Preview and reflection cameras never pay for, nor show, the outline.
    pub fn is_eligible(self) -> bool {
        !matches!(self, Self::Preview | Self::Reflection)
    }
}

/// Antialiasing mode of the host pipeline for this camera.
#[derive(
    Clone, Copy, Debug, Default, PartialEq, Eq, Hash, serde::Serialize, serde::Deserialize,
)]
pub enum AntialiasingMode {
    /// No antialiasing.
    #[default]
    None,
    /// Fast approximate AA (post filter, no jitter).
    Fxaa,
    /// Subpixel morphological AA (post filter, no jitter).
    Smaa,
    /// Temporal AA: the projection is jittered every frame.
    Temporal,
}

impl AntialiasingMode {
    /// `true` when the mode offsets the projection by a sub-pixel jitter.
    pub fn uses_jitter(self) -> bool {
        matches!(self, Self::Temporal)
    }
}

/// Per-frame camera context supplied by the host.
#[derive(Clone, Debug, PartialEq)]
pub struct CameraFrame {
    /// Camera category.
    pub kind: CameraKind,
    /// Color target resolution.
    pub extent: Extent,
    /// World-to-view matrix.
    pub view: Mat4,
    /// Unjittered view-to-clip matrix.
    pub projection: Mat4,
    /// View-to-clip matrix with this frame's temporal jitter applied.
    pub jittered_projection: Mat4,
    /// Antialiasing mode.
    pub antialiasing: AntialiasingMode,
    /// Whether post-processing is enabled for this camera.
    pub post_processing: bool,
}

impl CameraFrame {
    /// Game camera without jitter and with post-processing enabled.
    pub fn new(kind: CameraKind, extent: Extent, view: Mat4, projection: Mat4) -> Self {
        Self {
            kind,
            extent,
            view,
            projection,
            jittered_projection: projection,
            antialiasing: AntialiasingMode::None,
            post_processing: true,
        }
    }

    /// Orthographic camera mapping world `(x, y)` on the `z = 0` plane to pixel `(x, y)`, with
    /// `y` pointing down.
    pub fn orthographic_pixels(extent: Extent) -> Self {
        let projection = Mat4::orthographic_rh(
            0.0,
            extent.width as f32,
            extent.height as f32,
            0.0,
            -1.0,
            1.0,
        );
        Self::new(CameraKind::Game, extent, Mat4::IDENTITY, projection)
    }

    /// Set the antialiasing mode.
    pub fn with_antialiasing(mut self, antialiasing: AntialiasingMode) -> Self {
        self.antialiasing = antialiasing;
        self
    }

    /// Set the camera kind.
    pub fn with_kind(mut self, kind: CameraKind) -> Self {
        self.kind = kind;
        self
    }

    /// Offset the jittered projection by `jitter` pixels (x right, y down).
    pub fn with_pixel_jitter(mut self, jitter: Vec2) -> Self {
        let ndc = Vec3::new(
            2.0 * jitter.x / self.extent.width as f32,
            -2.0 * jitter.y / self.extent.height as f32,
            0.0,
        );
        self.jittered_projection = Mat4::from_translation(ndc) * self.projection;
        self
    }

    /// `true` when the active projection differs from the unjittered one.
    pub fn jitter_active(&self) -> bool {
        self.antialiasing.uses_jitter() && self.jittered_projection != self.projection
    }

    /// Projection the host renders the scene with this frame.
    pub fn active_projection(&self) -> Mat4 {
        if self.jitter_active() {
            self.jittered_projection
        } else {
            self.projection
        }
    }
}

pub(crate) const MIN_CLIP_W: f32 = 1e-5;

/// Clip-space position to pixel coordinates; `None` behind the eye.
pub(crate) fn clip_to_pixel(extent: Extent, clip: Vec4) -> Option<Vec2> {
    if clip.w <= MIN_CLIP_W {
        return None;
    }
    Some(ndc_to_pixel(extent, Vec2::new(clip.x / clip.w, clip.y / clip.w)))
}

pub(crate) fn ndc_to_pixel(extent: Extent, ndc: Vec2) -> Vec2 {
    Vec2::new(
        (ndc.x + 1.0) * 0.5 * extent.width as f32,
        (1.0 - ndc.y) * 0.5 * extent.height as f32,
    )
}

#[cfg(test)]
#[path = "../../tests/unit/scene/camera.rs"]
mod tests;
