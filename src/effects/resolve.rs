//! Per-pixel resolve of sharp and blurred coverage into the outline overlay.
//!
//! For each group `g` (channel `g` of both coverage images):
//!
//! - `ring = step(blurred > 0)` when `fall_off == 0`, else `saturate(blurred / fall_off)`
//! - `outline = color.a * ring * (1 - sharp)`; the silhouette interior never gets a ring
//! - `fill = fill_alpha * sharp`
//! - group alpha `= saturate(outline + fill)`, colored with `color.rgb`
//!
//! Group layers are stacked with premultiplied alpha-over in ascending group index (group 0 at
//! the bottom), then the overlay is composited over the source color.

use rayon::prelude::*;

use crate::foundation::core::Extent;
use crate::foundation::error::{OutlineError, OutlineResult};
use crate::foundation::math::{over_premul, saturate};
use crate::settings::config::OutlineGroupConfig;

/// Ring strength from blurred coverage; monotonically non-decreasing in `blurred`.
pub fn ring_intensity(blurred: f32, fall_off: f32) -> f32 {
    if blurred <= 0.0 {
        return 0.0;
    }
    if fall_off <= f32::EPSILON {
        return 1.0;
    }
    saturate(blurred / fall_off)
}

/// Opacity of one group at a pixel.
pub fn group_alpha(group: &OutlineGroupConfig, sharp: f32, blurred: f32) -> f32 {
    let sharp = saturate(sharp);
    let outline =
        saturate(group.color().a) * ring_intensity(blurred, group.fall_off()) * (1.0 - sharp);
    let fill = group.fill_alpha() * sharp;
    saturate(outline + fill)
}

/// Premultiplied overlay color of every group at one pixel.
pub fn overlay_pixel(groups: &[OutlineGroupConfig], sharp: &[f32], blurred: &[f32]) -> [f32; 4] {
    let mut acc = [0.0f32; 4];
    for (g, group) in groups.iter().enumerate() {
        let a = group_alpha(group, sharp[g], blurred[g]);
        if a <= 0.0 {
            continue;
        }
        acc = over_premul(acc, group.color().premul_at(a));
    }
    acc
}

/// Coverage images consumed by the resolve.
#[derive(Clone, Copy, Debug)]
pub struct CoverageInputs<'a> {
    /// Unblurred coverage.
    pub sharp: &'a [f32],
    /// Blurred coverage.
    pub blurred: &'a [f32],
    /// Interleaved channels in both images.
    pub channels: usize,
    /// Image size.
    pub extent: Extent,
}

impl CoverageInputs<'_> {
    fn validate(&self, groups: &[OutlineGroupConfig]) -> OutlineResult<()> {
        if self.extent.is_empty() {
            return Err(OutlineError::validation("resolve needs a non-empty extent"));
        }
        let expected = self.extent.buffer_len(self.channels)?;
        if self.sharp.len() != expected || self.blurred.len() != expected {
            return Err(OutlineError::evaluation(
                "resolve expects coverage images matching width*height*channels",
            ));
        }
        if groups.is_empty() || groups.len() > self.channels {
            return Err(OutlineError::validation(format!(
                "resolve of {} groups needs 1..={} coverage channels",
                groups.len(),
                self.channels
            )));
        }
        Ok(())
    }
}

/// Premultiplied RGBA overlay alone, without a source image.
pub fn resolve_overlay(
    coverage: CoverageInputs<'_>,
    groups: &[OutlineGroupConfig],
) -> OutlineResult<Vec<f32>> {
    coverage.validate(groups)?;
    let mut out = vec![0.0f32; coverage.extent.buffer_len(4)?];
    let ch = coverage.channels;
    out.par_chunks_mut(4).enumerate().for_each(|(i, px)| {
        let cov = i * ch..(i + 1) * ch;
        px.copy_from_slice(&overlay_pixel(
            groups,
            &coverage.sharp[cov.clone()],
            &coverage.blurred[cov],
        ));
    });
    Ok(out)
}

/// Composite the overlay over `source` (premultiplied RGBA) into `dst`.
pub fn resolve_into(
    dst: &mut [f32],
    source: &[f32],
    coverage: CoverageInputs<'_>,
    groups: &[OutlineGroupConfig],
) -> OutlineResult<()> {
    coverage.validate(groups)?;
    let expected = coverage.extent.buffer_len(4)?;
    if dst.len() != expected || source.len() != expected {
        return Err(OutlineError::evaluation(
            "resolve expects color images matching width*height*4",
        ));
    }

    let ch = coverage.channels;
    let row_px = coverage.extent.width as usize;
    dst.par_chunks_mut(row_px * 4)
        .zip(source.par_chunks(row_px * 4))
        .enumerate()
        .for_each(|(y, (out_row, src_row))| {
            for x in 0..row_px {
                let i = y * row_px + x;
                let cov = i * ch..(i + 1) * ch;
                let overlay = overlay_pixel(
                    groups,
                    &coverage.sharp[cov.clone()],
                    &coverage.blurred[cov],
                );
                let s = &src_row[x * 4..x * 4 + 4];
                let out = over_premul([s[0], s[1], s[2], s[3]], overlay);
                out_row[x * 4..x * 4 + 4].copy_from_slice(&out);
            }
        });
    Ok(())
}

#[cfg(test)]
#[path = "../../tests/unit/effects/resolve.rs"]
mod tests;
