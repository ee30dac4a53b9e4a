use smallvec::SmallVec;

use crate::foundation::core::LinearRgba;
use crate::foundation::error::{OutlineError, OutlineResult};
use crate::foundation::math::saturate;

/// Maximum number of independently configured outline groups.
pub const MAX_GROUPS: usize = 4;

/// Smallest accepted blur radius in pixels.
pub const MIN_BLUR_RADIUS: u32 = 2;

/// Largest accepted blur radius in pixels.
pub const MAX_BLUR_RADIUS: u32 = 32;

const DEFAULT_BLUR_RADIUS: u32 = 5;
const DEFAULT_COLOR: LinearRgba = LinearRgba::new(0.3, 0.75, 1.0, 1.0);
const DEFAULT_FALL_OFF: f32 = 0.015;

/// Gaussian blur radius, clamped to `[MIN_BLUR_RADIUS, MAX_BLUR_RADIUS]` on construction.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, serde::Serialize, serde::Deserialize)]
#[serde(from = "u32", into = "u32")]
pub struct BlurRadius(u32);

impl BlurRadius {
    /// Clamp `radius` into the accepted range.
    pub fn new(radius: u32) -> Self {
        Self(radius.clamp(MIN_BLUR_RADIUS, MAX_BLUR_RADIUS))
    }

    /// Radius in pixels.
    pub fn get(self) -> u32 {
        self.0
    }

    /// Standard deviation used for the kernel: `floor(radius / 2)`.
    pub fn std_dev(self) -> u32 {
        self.0 / 2
    }
}

impl Default for BlurRadius {
    fn default() -> Self {
        Self(DEFAULT_BLUR_RADIUS)
    }
}

impl From<u32> for BlurRadius {
    fn from(v: u32) -> Self {
        Self::new(v)
    }
}

impl From<BlurRadius> for u32 {
    fn from(v: BlurRadius) -> Self {
        v.0
    }
}

/// Tunables of one outline group.
///
/// `fall_off` and `fill_alpha` are clamped to `[0, 1]` whenever they are written, including
/// through deserialization.
#[derive(Clone, Copy, Debug, PartialEq, serde::Serialize, serde::Deserialize)]
#[serde(from = "GroupConfigRepr")]
pub struct OutlineGroupConfig {
    color: LinearRgba,
    fall_off: f32,
    fill_alpha: f32,
}

#[derive(serde::Deserialize)]
#[serde(default)]
struct GroupConfigRepr {
    color: LinearRgba,
    fall_off: f32,
    fill_alpha: f32,
}

impl Default for GroupConfigRepr {
    fn default() -> Self {
        Self {
            color: DEFAULT_COLOR,
            fall_off: DEFAULT_FALL_OFF,
            fill_alpha: 0.0,
        }
    }
}

impl From<GroupConfigRepr> for OutlineGroupConfig {
    fn from(r: GroupConfigRepr) -> Self {
        Self::new(r.color, r.fall_off, r.fill_alpha)
    }
}

impl Default for OutlineGroupConfig {
    fn default() -> Self {
        Self::new(DEFAULT_COLOR, DEFAULT_FALL_OFF, 0.0)
    }
}

impl OutlineGroupConfig {
    /// Create a group config, clamping `fall_off` and `fill_alpha`. Non-finite color channels
    /// become `0.0`.
    pub fn new(color: LinearRgba, fall_off: f32, fill_alpha: f32) -> Self {
        Self {
            color: color.finite_or_zero(),
            fall_off: saturate(fall_off),
            fill_alpha: saturate(fill_alpha),
        }
    }

    /// A group that contributes nothing: zero color alpha and zero fill.
    pub fn inactive() -> Self {
        Self::new(DEFAULT_COLOR.with_alpha(0.0), DEFAULT_FALL_OFF, 0.0)
    }

    /// Outline color; its alpha scales the ring.
    pub fn color(&self) -> LinearRgba {
        self.color
    }

    /// Ring fall-off in `[0, 1]`.
    pub fn fall_off(&self) -> f32 {
        self.fall_off
    }

    /// Interior fill alpha in `[0, 1]`.
    pub fn fill_alpha(&self) -> f32 {
        self.fill_alpha
    }

    /// Replace the color; non-finite channels become `0.0`.
    pub fn set_color(&mut self, color: LinearRgba) {
        self.color = color.finite_or_zero();
    }

    /// Replace the fall-off (clamped).
    pub fn set_fall_off(&mut self, fall_off: f32) {
        self.fall_off = saturate(fall_off);
    }

    /// Replace the fill alpha (clamped).
    pub fn set_fill_alpha(&mut self, fill_alpha: f32) {
        self.fill_alpha = saturate(fill_alpha);
    }

    /// `true` when the group can produce any visible pixel.
    pub fn is_active(&self) -> bool {
        self.color.a > 0.0 || self.fill_alpha > 0.0
    }
}

/// Read-only per-frame snapshot of every outline parameter.
#[derive(Clone, Debug, PartialEq, serde::Serialize, serde::Deserialize)]
#[serde(try_from = "EffectConfigRepr")]
pub struct EffectConfig {
    groups: SmallVec<[OutlineGroupConfig; MAX_GROUPS]>,
    blur_radius: BlurRadius,
}

#[derive(serde::Deserialize)]
struct EffectConfigRepr {
    groups: Vec<OutlineGroupConfig>,
    #[serde(default)]
    blur_radius: BlurRadius,
}

impl TryFrom<EffectConfigRepr> for EffectConfig {
    type Error = OutlineError;

    fn try_from(mut r: EffectConfigRepr) -> OutlineResult<Self> {
        if r.groups.len() > MAX_GROUPS {
            tracing::warn!(
                groups = r.groups.len(),
                max = MAX_GROUPS,
                "extra outline groups ignored"
            );
            r.groups.truncate(MAX_GROUPS);
        }
        Self::new(r.groups, r.blur_radius.get())
    }
}

impl Default for EffectConfig {
    fn default() -> Self {
        Self {
            groups: std::iter::repeat_n(OutlineGroupConfig::default(), MAX_GROUPS).collect(),
            blur_radius: BlurRadius::default(),
        }
    }
}

impl EffectConfig {
    /// Create a config with `1..=MAX_GROUPS` groups. The radius is clamped.
    pub fn new(
        groups: impl IntoIterator<Item = OutlineGroupConfig>,
        blur_radius: u32,
    ) -> OutlineResult<Self> {
        let groups: SmallVec<[OutlineGroupConfig; MAX_GROUPS]> = groups.into_iter().collect();
        if groups.is_empty() || groups.len() > MAX_GROUPS {
            return Err(OutlineError::validation(format!(
                "outline group count must be in 1..={MAX_GROUPS}, got {}",
                groups.len()
            )));
        }
        Ok(Self {
            groups,
            blur_radius: BlurRadius::new(blur_radius),
        })
    }

    /// Single-group config.
    pub fn single(group: OutlineGroupConfig, blur_radius: u32) -> Self {
        let mut groups = SmallVec::new();
        groups.push(group);
        Self {
            groups,
            blur_radius: BlurRadius::new(blur_radius),
        }
    }

    /// Parse a JSON snapshot, clamping every bounded parameter. Groups past [`MAX_GROUPS`] are
    /// dropped; an empty group list is an error.
    pub fn from_json(json: &str) -> OutlineResult<Self> {
        serde_json::from_str(json).map_err(|e| OutlineError::serde(e.to_string()))
    }

    /// Serialize to JSON.
    pub fn to_json(&self) -> OutlineResult<String> {
        serde_json::to_string_pretty(self).map_err(|e| OutlineError::serde(e.to_string()))
    }

    /// Groups in index order.
    pub fn groups(&self) -> &[OutlineGroupConfig] {
        &self.groups
    }

    pub(crate) fn groups_mut(&mut self) -> &mut [OutlineGroupConfig] {
        &mut self.groups
    }

    /// Number of configured groups.
    pub fn group_count(&self) -> usize {
        self.groups.len()
    }

    /// Group `index`, if configured.
    pub fn group(&self, index: usize) -> Option<&OutlineGroupConfig> {
        self.groups.get(index)
    }

    /// Replace group `index`.
    pub fn set_group(&mut self, index: usize, group: OutlineGroupConfig) -> OutlineResult<()> {
        let slot = self
            .groups
            .get_mut(index)
            .ok_or_else(|| OutlineError::validation(format!("no outline group {index}")))?;
        *slot = group;
        Ok(())
    }

    /// Blur radius.
    pub fn blur_radius(&self) -> BlurRadius {
        self.blur_radius
    }

    /// Replace the blur radius (clamped).
    pub fn set_blur_radius(&mut self, radius: u32) {
        self.blur_radius = BlurRadius::new(radius);
    }

    /// Kernel standard deviation derived from the radius.
    pub fn blur_std_dev(&self) -> u32 {
        self.blur_radius.std_dev()
    }

    /// Channels of the coverage buffers: 1 for a single group, 4 otherwise.
    pub fn coverage_channels(&self) -> usize {
        if self.groups.len() == 1 { 1 } else { 4 }
    }

    /// `true` when at least one group has non-zero color alpha or fill alpha.
    pub fn is_active(&self) -> bool {
        self.groups.iter().any(OutlineGroupConfig::is_active)
    }
}

#[cfg(test)]
#[path = "../../tests/unit/settings/config.rs"]
mod tests;
