//! Layered settings resolution.
//!
//! A [`SettingsStack`] holds a base [`EffectConfig`] plus any number of weighted partial
//! overrides. The host mutates the stack between frames; the outline pipeline only ever receives
//! the resolved snapshot from [`SettingsStack::resolve`].

use crate::foundation::core::LinearRgba;
use crate::foundation::error::{OutlineError, OutlineResult};
use crate::foundation::math::{lerp, saturate};
use crate::settings::config::EffectConfig;

/// Optional per-group parameter overrides.
#[derive(Clone, Debug, Default, PartialEq, serde::Serialize, serde::Deserialize)]
#[serde(default)]
pub struct GroupOverrides {
    /// Override for the group color.
    pub color: Option<LinearRgba>,
    /// Override for the ring fall-off.
    pub fall_off: Option<f32>,
    /// Override for the interior fill alpha.
    pub fill_alpha: Option<f32>,
}

/// Partial override of an [`EffectConfig`]; `None` leaves the parameter untouched.
#[derive(Clone, Debug, Default, PartialEq, serde::Serialize, serde::Deserialize)]
#[serde(default)]
pub struct EffectOverrides {
    /// Override for the blur radius.
    pub blur_radius: Option<u32>,
    /// Per-group overrides, by group index.
    pub groups: Vec<GroupOverrides>,
}

/// One weighted layer of overrides.
#[derive(Clone, Debug, PartialEq, serde::Serialize, serde::Deserialize)]
pub struct SettingsLayer {
    /// Layer name, unique within a stack.
    pub name: String,
    /// Lower priorities are applied first.
    #[serde(default)]
    pub priority: i32,
    /// Blend weight in `[0, 1]`.
    #[serde(default = "default_weight")]
    pub weight: f32,
    /// Parameters this layer overrides.
    #[serde(default)]
    pub overrides: EffectOverrides,
}

fn default_weight() -> f32 {
    1.0
}

/// Base configuration plus weighted override layers.
#[derive(Clone, Debug, Default, PartialEq, serde::Serialize, serde::Deserialize)]
pub struct SettingsStack {
    base: EffectConfig,
    #[serde(default)]
    layers: Vec<SettingsLayer>,
}

impl SettingsStack {
    /// Stack with no layers.
    pub fn new(base: EffectConfig) -> Self {
        Self {
            base,
            layers: Vec::new(),
        }
    }

    /// Parse a stack from JSON.
    pub fn from_json(json: &str) -> OutlineResult<Self> {
        let mut stack: Self =
            serde_json::from_str(json).map_err(|e| OutlineError::serde(e.to_string()))?;
        let layers = std::mem::take(&mut stack.layers);
        for layer in layers {
            stack.push_layer(layer)?;
        }
        Ok(stack)
    }

    /// Base configuration.
    pub fn base(&self) -> &EffectConfig {
        &self.base
    }

    /// Replace the base configuration.
    pub fn set_base(&mut self, base: EffectConfig) {
        self.base = base;
    }

    /// Layers in insertion order.
    pub fn layers(&self) -> &[SettingsLayer] {
        &self.layers
    }

    /// Add a layer. Names must be unique and weights finite; the weight is clamped.
    pub fn push_layer(&mut self, mut layer: SettingsLayer) -> OutlineResult<()> {
        if self.layers.iter().any(|l| l.name == layer.name) {
            return Err(OutlineError::validation(format!(
                "settings layer '{}' already exists",
                layer.name
            )));
        }
        if !layer.weight.is_finite() {
            return Err(OutlineError::validation("settings layer weight must be finite"));
        }
        layer.weight = saturate(layer.weight);
        self.layers.push(layer);
        Ok(())
    }

    /// Remove the layer named `name`; returns whether it existed.
    pub fn remove_layer(&mut self, name: &str) -> bool {
        let before = self.layers.len();
        self.layers.retain(|l| l.name != name);
        before != self.layers.len()
    }

    /// Change the weight of layer `name` (clamped).
    pub fn set_weight(&mut self, name: &str, weight: f32) -> OutlineResult<()> {
        if !weight.is_finite() {
            return Err(OutlineError::validation("settings layer weight must be finite"));
        }
        let layer = self
            .layers
            .iter_mut()
            .find(|l| l.name == name)
            .ok_or_else(|| OutlineError::validation(format!("no settings layer '{name}'")))?;
        layer.weight = saturate(weight);
        Ok(())
    }

    /// Blend every layer over the base, in ascending priority, into a frame snapshot.
    pub fn resolve(&self) -> EffectConfig {
        let mut order: Vec<&SettingsLayer> = self.layers.iter().collect();
        order.sort_by_key(|l| l.priority);

        let mut cfg = self.base.clone();
        for layer in order {
            if layer.weight <= 0.0 {
                continue;
            }
            apply_layer(&mut cfg, layer);
        }
        cfg
    }
}

fn apply_layer(cfg: &mut EffectConfig, layer: &SettingsLayer) {
    let w = layer.weight;
    let ov = &layer.overrides;

    if let Some(radius) = ov.blur_radius {
        let cur = cfg.blur_radius().get() as f32;
        cfg.set_blur_radius(lerp(cur, radius as f32, w).round() as u32);
    }

    if ov.groups.len() > cfg.group_count() {
        tracing::debug!(
            layer = %layer.name,
            overrides = ov.groups.len(),
            groups = cfg.group_count(),
            "ignoring overrides for unconfigured outline groups"
        );
    }

    for (group, go) in cfg.groups_mut().iter_mut().zip(&ov.groups) {
        if let Some(color) = go.color {
            group.set_color(group.color().lerp(color, w));
        }
        if let Some(fall_off) = go.fall_off {
            group.set_fall_off(lerp(group.fall_off(), fall_off, w));
        }
        if let Some(fill) = go.fill_alpha {
            group.set_fill_alpha(lerp(group.fill_alpha(), fill, w));
        }
    }
}

#[cfg(test)]
#[path = "../../tests/unit/settings/stack.rs"]
mod tests;
