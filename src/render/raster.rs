//! Coverage rasterizer backing the mask pass.
//!
//! Triangles are clipped against the `w > MIN_CLIP_W` plane in clip space, projected to pixels and
//! filled with constant coverage `1.0`. Sampling happens at pixel centers with a top-left fill
//! rule, so two triangles sharing an edge never both claim a pixel on it and an axis-aligned
//! square covers exactly its footprint. Both windings are drawn.

use std::ops::{Deref, DerefMut};

use smallvec::SmallVec;

use crate::foundation::core::{Extent, Mat4, Vec2, Vec4};
use crate::foundation::error::{OutlineError, OutlineResult};
use crate::scene::camera::{MIN_CLIP_W, ndc_to_pixel};
use crate::scene::drawable::Mesh;

/// Matrices the mask pass draws with.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct RasterState {
    /// World-to-view matrix.
    pub view: Mat4,
    /// View-to-clip matrix.
    pub projection: Mat4,
}

impl RasterState {
    /// Combined object-to-clip matrix for `model`.
    pub fn model_view_projection(&self, model: Mat4) -> Mat4 {
        self.projection * self.view * model
    }

    /// Swap in `projection` until the returned guard drops.
    pub fn override_projection(&mut self, projection: Mat4) -> ProjectionOverride<'_> {
        let saved = std::mem::replace(&mut self.projection, projection);
        ProjectionOverride { state: self, saved }
    }
}

/// Scoped projection replacement; the previous projection comes back on drop, including when the
/// draws inside the scope bail out with an error.
#[derive(Debug)]
pub struct ProjectionOverride<'a> {
    state: &'a mut RasterState,
    saved: Mat4,
}

impl Deref for ProjectionOverride<'_> {
    type Target = RasterState;

    fn deref(&self) -> &RasterState {
        self.state
    }
}

impl DerefMut for ProjectionOverride<'_> {
    fn deref_mut(&mut self) -> &mut RasterState {
        self.state
    }
}

impl Drop for ProjectionOverride<'_> {
    fn drop(&mut self) {
        self.state.projection = self.saved;
    }
}

/// Writable view of one channel of an interleaved coverage image.
#[derive(Debug)]
pub struct CoverageTarget<'a> {
    data: &'a mut [f32],
    extent: Extent,
    channels: usize,
    channel: usize,
}

impl<'a> CoverageTarget<'a> {
    /// Wrap `data` (`width * height * channels` values) for writes into `channel`.
    pub fn new(
        data: &'a mut [f32],
        extent: Extent,
        channels: usize,
        channel: usize,
    ) -> OutlineResult<Self> {
        if channel >= channels {
            return Err(OutlineError::validation(format!(
                "coverage channel {channel} out of range for {channels} channels"
            )));
        }
        if data.len() != extent.buffer_len(channels)? {
            return Err(OutlineError::evaluation(
                "coverage target expects width*height*channels values",
            ));
        }
        Ok(Self {
            data,
            extent,
            channels,
            channel,
        })
    }

    fn set(&mut self, x: u32, y: u32) {
        let idx = (y as usize * self.extent.width as usize + x as usize) * self.channels;
        self.data[idx + self.channel] = 1.0;
    }
}

/// Rasterize every triangle of `mesh` through `mvp`; returns the number of triangles that
/// survived near-plane clipping.
pub fn rasterize_mesh(target: &mut CoverageTarget<'_>, mesh: &Mesh, mvp: Mat4) -> usize {
    let mut drawn = 0;
    for [a, b, c] in mesh.triangles() {
        let clip = [
            mvp * a.extend(1.0),
            mvp * b.extend(1.0),
            mvp * c.extend(1.0),
        ];
        if rasterize_clip_triangle(target, clip) {
            drawn += 1;
        }
    }
    drawn
}

/// Rasterize one clip-space triangle; `false` when it lies entirely behind the eye.
pub fn rasterize_clip_triangle(target: &mut CoverageTarget<'_>, clip: [Vec4; 3]) -> bool {
    let poly = clip_near(clip);
    if poly.len() < 3 {
        return false;
    }
    let extent = target.extent;
    let px: SmallVec<[Vec2; 4]> = poly
        .iter()
        .map(|v| ndc_to_pixel(extent, Vec2::new(v.x / v.w, v.y / v.w)))
        .collect();
    for i in 1..px.len() - 1 {
        fill_triangle(target, [px[0], px[i], px[i + 1]]);
    }
    true
}

// Sutherland-Hodgman against the single plane `w = MIN_CLIP_W`.
fn clip_near(tri: [Vec4; 3]) -> SmallVec<[Vec4; 4]> {
    let mut out = SmallVec::new();
    for i in 0..3 {
        let cur = tri[i];
        let next = tri[(i + 1) % 3];
        let cur_in = cur.w > MIN_CLIP_W;
        let next_in = next.w > MIN_CLIP_W;
        if cur_in {
            out.push(cur);
        }
        if cur_in != next_in {
            let t = (MIN_CLIP_W - cur.w) / (next.w - cur.w);
            let mut v = cur.lerp(next, t);
            v.w = v.w.max(MIN_CLIP_W);
            out.push(v);
        }
    }
    out
}

fn edge(a: Vec2, b: Vec2, p: Vec2) -> f32 {
    (b.x - a.x) * (p.y - a.y) - (b.y - a.y) * (p.x - a.x)
}

// Pixel space has y pointing down; with positive area a top edge runs rightwards along the top
// and a left edge runs upwards.
fn is_top_left(a: Vec2, b: Vec2) -> bool {
    let d = b - a;
    (d.y == 0.0 && d.x > 0.0) || d.y < 0.0
}

fn fill_triangle(target: &mut CoverageTarget<'_>, v: [Vec2; 3]) {
    let [v0, mut v1, mut v2] = v;
    let area = edge(v0, v1, v2);
    if !area.is_finite() || area == 0.0 {
        return;
    }
    if area < 0.0 {
        std::mem::swap(&mut v1, &mut v2);
    }

    let w = target.extent.width as f32;
    let h = target.extent.height as f32;
    let min = v0.min(v1).min(v2);
    let max = v0.max(v1).max(v2);
    let x0 = (min.x - 0.5).ceil().clamp(0.0, w) as u32;
    let y0 = (min.y - 0.5).ceil().clamp(0.0, h) as u32;
    let x1 = (max.x - 0.5).floor().clamp(-1.0, w - 1.0);
    let y1 = (max.y - 0.5).floor().clamp(-1.0, h - 1.0);
    if x1 < 0.0 || y1 < 0.0 {
        return;
    }
    let (x1, y1) = (x1 as u32, y1 as u32);

    let edges = [(v1, v2), (v2, v0), (v0, v1)];
    let top_left = edges.map(|(a, b)| is_top_left(a, b));

    for y in y0..=y1 {
        for x in x0..=x1 {
            let p = Vec2::new(x as f32 + 0.5, y as f32 + 0.5);
            let inside = edges.iter().zip(top_left).all(|(&(a, b), tl)| {
                let e = edge(a, b, p);
                e > 0.0 || (e == 0.0 && tl)
            });
            if inside {
                target.set(x, y);
            }
        }
    }
}

#[cfg(test)]
#[path = "../../tests/unit/render/raster.rs"]
mod tests;
