use rayon::prelude::*;

use crate::foundation::core::Extent;
use crate::foundation::error::{OutlineError, OutlineResult};
use crate::settings::config::BlurRadius;

/// Normalized 1-D Gaussian kernel with `2 * radius + 1` taps.
#[derive(Clone, Debug, PartialEq)]
pub struct GaussianKernel {
    weights: Vec<f32>,
}

/// Direction of a 1-D blur pass.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum BlurAxis {
    /// Samples along rows.
    Horizontal,
    /// Samples along columns.
    Vertical,
}

impl GaussianKernel {
    /// Build `w(k) = exp(-k^2 / (2 std_dev^2))` for `k` in `[-radius, radius]`, normalized to sum
    /// to one. `radius == 0` or `std_dev == 0` degenerates to the identity kernel.
    pub fn new(radius: u32, std_dev: f32) -> OutlineResult<Self> {
        if !std_dev.is_finite() || std_dev < 0.0 {
            return Err(OutlineError::validation(
                "blur standard deviation must be finite and >= 0",
            ));
        }
        if radius == 0 || std_dev == 0.0 {
            return Ok(Self::identity());
        }

        let r = radius as i64;
        let denom = 2.0 * f64::from(std_dev) * f64::from(std_dev);
        let raw: Vec<f64> = (-r..=r)
            .map(|k| {
                let x = k as f64;
                (-x * x / denom).exp()
            })
            .collect();
        let sum: f64 = raw.iter().sum();
        if sum <= 0.0 {
            return Err(OutlineError::evaluation("gaussian kernel sum is zero"));
        }
        Ok(Self {
            weights: raw.into_iter().map(|w| (w / sum) as f32).collect(),
        })
    }

    /// Kernel for a configured radius, with `std_dev = floor(radius / 2)`.
    pub fn from_radius(radius: BlurRadius) -> OutlineResult<Self> {
        Self::new(radius.get(), radius.std_dev() as f32)
    }

    /// Single tap of weight one.
    pub fn identity() -> Self {
        Self {
            weights: vec![1.0],
        }
    }

    /// Taps on each side of the center.
    pub fn radius(&self) -> usize {
        self.weights.len() / 2
    }

    /// Normalized weights, index `radius()` is offset zero.
    pub fn weights(&self) -> &[f32] {
        &self.weights
    }

    /// `true` for the single-tap kernel.
    pub fn is_identity(&self) -> bool {
        self.weights.len() == 1
    }
}

/// One 1-D convolution of a `channels`-interleaved image from `src` into `dst`.
///
/// Channels are filtered independently; samples outside the image clamp to the nearest edge
/// pixel.
pub fn blur_axis(
    src: &[f32],
    dst: &mut [f32],
    extent: Extent,
    channels: usize,
    kernel: &GaussianKernel,
    axis: BlurAxis,
) -> OutlineResult<()> {
    let expected = extent.buffer_len(channels)?;
    if extent.is_empty() {
        return Err(OutlineError::validation("blur_axis needs a non-empty extent"));
    }
    if channels == 0 || src.len() != expected || dst.len() != expected {
        return Err(OutlineError::evaluation(
            "blur_axis expects src and dst matching width*height*channels",
        ));
    }
    if kernel.is_identity() {
        dst.copy_from_slice(src);
        return Ok(());
    }

    let w = extent.width as i64;
    let h = extent.height as i64;
    let radius = kernel.radius() as i64;
    let weights = kernel.weights();
    let row_len = extent.width as usize * channels;

    dst.par_chunks_mut(row_len)
        .enumerate()
        .for_each(|(y, row)| {
            let y = y as i64;
            for x in 0..w {
                let out = &mut row[x as usize * channels..(x as usize + 1) * channels];
                out.fill(0.0);
                for (ki, &kw) in weights.iter().enumerate() {
                    let d = ki as i64 - radius;
                    let (sx, sy) = match axis {
                        BlurAxis::Horizontal => ((x + d).clamp(0, w - 1), y),
                        BlurAxis::Vertical => (x, (y + d).clamp(0, h - 1)),
                    };
                    let idx = (sy * w + sx) as usize * channels;
                    for (o, &s) in out.iter_mut().zip(&src[idx..idx + channels]) {
                        *o += kw * s;
                    }
                }
            }
        });
    Ok(())
}

#[cfg(test)]
#[path = "../../tests/unit/effects/blur.rs"]
mod tests;
