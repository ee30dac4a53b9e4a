use crate::foundation::error::{OutlineError, OutlineResult};

pub use glam::{Mat4, Vec2, Vec3, Vec4};
pub use kurbo::Rect;

/// Linear RGBA color with straight (non-premultiplied) alpha.
#[derive(Clone, Copy, Debug, PartialEq, serde::Serialize, serde::Deserialize)]
pub struct LinearRgba {
    /// Red channel.
    pub r: f32,
    /// Green channel.
    pub g: f32,
    /// Blue channel.
    pub b: f32,
    /// Alpha channel.
    pub a: f32,
}

impl LinearRgba {
    /// Fully transparent black.
    pub const TRANSPARENT: Self = Self::new(0.0, 0.0, 0.0, 0.0);

    /// Create a color from its four channels.
    pub const fn new(r: f32, g: f32, b: f32, a: f32) -> Self {
        Self { r, g, b, a }
    }

    /// Same color with a different alpha.
    pub fn with_alpha(self, a: f32) -> Self {
        Self { a, ..self }
    }

    /// Premultiplied `[r, g, b, a]` at alpha `alpha` (the color's own alpha is ignored).
    pub fn premul_at(self, alpha: f32) -> [f32; 4] {
        [self.r * alpha, self.g * alpha, self.b * alpha, alpha]
    }

    /// Same color with every non-finite channel replaced by `0.0`.
    pub fn finite_or_zero(self) -> Self {
        let f = |v: f32| if v.is_finite() { v } else { 0.0 };
        Self::new(f(self.r), f(self.g), f(self.b), f(self.a))
    }

    /// Channel-wise linear interpolation toward `other`.
    pub fn lerp(self, other: Self, t: f32) -> Self {
        Self {
            r: crate::foundation::math::lerp(self.r, other.r, t),
            g: crate::foundation::math::lerp(self.g, other.g, t),
            b: crate::foundation::math::lerp(self.b, other.b, t),
            a: crate::foundation::math::lerp(self.a, other.a, t),
        }
    }
}

/// Image dimensions in pixels.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, serde::Serialize, serde::Deserialize)]
pub struct Extent {
    /// Width in pixels.
    pub width: u32,
    /// Height in pixels.
    pub height: u32,
}

impl Extent {
    /// Create an extent; both sides must be non-zero.
    pub fn new(width: u32, height: u32) -> OutlineResult<Self> {
        if width == 0 || height == 0 {
            return Err(OutlineError::validation("extent width and height must be > 0"));
        }
        Ok(Self { width, height })
    }

    /// `true` when either side is zero; only reachable by building the struct directly.
    pub fn is_empty(self) -> bool {
        self.width == 0 || self.height == 0
    }

    /// Number of pixels.
    pub fn pixel_count(self) -> usize {
        (self.width as usize).saturating_mul(self.height as usize)
    }

    /// Length of a tightly packed buffer with `channels` floats per pixel.
    pub fn buffer_len(self, channels: usize) -> OutlineResult<usize> {
        (self.width as usize)
            .checked_mul(self.height as usize)
            .and_then(|v| v.checked_mul(channels))
            .ok_or_else(|| OutlineError::validation("buffer size overflow"))
    }

    /// Viewport rectangle `[0, width] x [0, height]`.
    pub fn rect(self) -> Rect {
        Rect::new(0.0, 0.0, f64::from(self.width), f64::from(self.height))
    }
}

/// Per-object rendering-layer bits; each outline group owns one disjoint bit.
#[derive(
    Clone, Copy, Debug, Default, PartialEq, Eq, Hash, serde::Serialize, serde::Deserialize,
)]
pub struct RenderingLayerMask(pub u32);

impl RenderingLayerMask {
    /// No layers.
    pub const NONE: Self = Self(0);
    /// Every layer.
    pub const ALL: Self = Self(u32::MAX);

    /// Mask with the single bit `bit` set.
    pub fn from_bit(bit: u32) -> OutlineResult<Self> {
        if bit >= 32 {
            return Err(OutlineError::validation(
                "rendering layer bit must be in 0..32",
            ));
        }
        Ok(Self(1 << bit))
    }

    /// `true` when the two masks share at least one bit.
    pub fn intersects(self, other: Self) -> bool {
        self.0 & other.0 != 0
    }

    /// `true` when no bit is set.
    pub fn is_empty(self) -> bool {
        self.0 == 0
    }
}

impl std::ops::BitOr for RenderingLayerMask {
    type Output = Self;

    fn bitor(self, rhs: Self) -> Self {
        Self(self.0 | rhs.0)
    }
}

impl std::ops::BitOrAssign for RenderingLayerMask {
    fn bitor_assign(&mut self, rhs: Self) {
        self.0 |= rhs.0;
    }
}

#[cfg(test)]
#[path = "../../tests/unit/foundation/core.rs"]
mod tests;
