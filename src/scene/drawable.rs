use std::sync::Arc;

use crate::foundation::core::{Mat4, Rect, RenderingLayerMask, Vec2, Vec3};
use crate::foundation::error::{OutlineError, OutlineResult};
use crate::scene::camera::{CameraFrame, clip_to_pixel};

/// Indexed triangle mesh in object space.
#[derive(Clone, Debug, PartialEq)]
pub struct Mesh {
    positions: Vec<Vec3>,
    indices: Vec<u32>,
}

impl Mesh {
    /// Create a mesh; `indices` must describe whole triangles referencing valid positions.
    pub fn new(positions: Vec<Vec3>, indices: Vec<u32>) -> OutlineResult<Self> {
        if !indices.len().is_multiple_of(3) {
            return Err(OutlineError::validation(
                "mesh index count must be a multiple of 3",
            ));
        }
        if let Some(&bad) = indices.iter().find(|&&i| i as usize >= positions.len()) {
            return Err(OutlineError::validation(format!(
                "mesh index {bad} out of range for {} positions",
                positions.len()
            )));
        }
        Ok(Self { positions, indices })
    }

    /// Axis-aligned rectangle on the `z = 0` plane.
    pub fn quad(min: Vec2, max: Vec2) -> Self {
        Self {
            positions: vec![
                Vec3::new(min.x, min.y, 0.0),
                Vec3::new(max.x, min.y, 0.0),
                Vec3::new(max.x, max.y, 0.0),
                Vec3::new(min.x, max.y, 0.0),
            ],
            indices: vec![0, 1, 2, 0, 2, 3],
        }
    }

    /// Number of triangles.
    pub fn triangle_count(&self) -> usize {
        self.indices.len() / 3
    }

    /// Object-space triangles.
    pub fn triangles(&self) -> impl Iterator<Item = [Vec3; 3]> + '_ {
        self.indices.chunks_exact(3).map(|t| {
            [
                self.positions[t[0] as usize],
                self.positions[t[1] as usize],
                self.positions[t[2] as usize],
            ]
        })
    }

    /// Object-space bounding box, `None` for an empty mesh.
    pub fn bounds(&self) -> Option<(Vec3, Vec3)> {
        let first = *self.positions.first()?;
        Some(
            self.positions
                .iter()
                .fold((first, first), |(lo, hi), &p| (lo.min(p), hi.max(p))),
        )
    }
}

/// A renderable object as exposed by the host scene.
#[derive(Clone, Debug)]
pub struct Drawable {
    /// Debug name.
    pub name: String,
    /// Shared geometry.
    pub mesh: Arc<Mesh>,
    /// Object-to-world matrix.
    pub model: Mat4,
    /// Rendering layers the object belongs to.
    pub layers: RenderingLayerMask,
    /// Hidden objects are never returned by queries.
    pub visible: bool,
}

impl Drawable {
    /// Visible drawable with identity transform.
    pub fn new(name: impl Into<String>, mesh: Arc<Mesh>, layers: RenderingLayerMask) -> Self {
        Self {
            name: name.into(),
            mesh,
            model: Mat4::IDENTITY,
            layers,
            visible: true,
        }
    }

    /// Set the object-to-world matrix.
    pub fn with_model(mut self, model: Mat4) -> Self {
        self.model = model;
        self
    }

    /// Conservative pixel-space bounds, `None` when any corner is behind the eye.
    pub fn screen_bounds(&self, camera: &CameraFrame) -> Option<Rect> {
        let (lo, hi) = self.mesh.bounds()?;
        let mvp = camera.projection * camera.view * self.model;
        let mut rect: Option<Rect> = None;
        for i in 0..8u8 {
            let corner = Vec3::new(
                if i & 1 == 0 { lo.x } else { hi.x },
                if i & 2 == 0 { lo.y } else { hi.y },
                if i & 4 == 0 { lo.z } else { hi.z },
            );
            let px = clip_to_pixel(camera.extent, mvp * corner.extend(1.0))?;
            let p = kurbo::Point::new(f64::from(px.x), f64::from(px.y));
            rect = Some(match rect {
                Some(r) => r.union_pt(p),
                None => Rect::from_points(p, p),
            });
        }
        rect.map(|r| r.inflate(1.0, 1.0))
    }
}

/// Scene-query capability supplied by the host's culling system.
pub trait SceneQuery {
    /// Drawables tagged with any bit of `layer`, as seen by `camera`.
    fn drawables<'a>(
        &'a self,
        layer: RenderingLayerMask,
        camera: &CameraFrame,
    ) -> OutlineResult<Vec<&'a Drawable>>;
}

/// Flat list of drawables with layer filtering and screen-bounds culling.
#[derive(Clone, Debug, Default)]
pub struct SceneList {
    drawables: Vec<Drawable>,
}

impl SceneList {
    /// Empty scene.
    pub fn new() -> Self {
        Self::default()
    }

    /// Add a drawable.
    pub fn push(&mut self, drawable: Drawable) {
        self.drawables.push(drawable);
    }

    /// All drawables, in insertion order.
    pub fn iter(&self) -> impl Iterator<Item = &Drawable> {
        self.drawables.iter()
    }

    /// Number of drawables.
    pub fn len(&self) -> usize {
        self.drawables.len()
    }

    /// `true` when the scene holds no drawable.
    pub fn is_empty(&self) -> bool {
        self.drawables.is_empty()
    }
}

impl FromIterator<Drawable> for SceneList {
    fn from_iter<I: IntoIterator<Item = Drawable>>(iter: I) -> Self {
        Self {
            drawables: iter.into_iter().collect(),
        }
    }
}

impl SceneQuery for SceneList {
    fn drawables<'a>(
        &'a self,
        layer: RenderingLayerMask,
        camera: &CameraFrame,
    ) -> OutlineResult<Vec<&'a Drawable>> {
        let viewport = camera.extent.rect();
        Ok(self
            .drawables
            .iter()
            .filter(|d| d.visible && d.layers.intersects(layer))
            .filter(|d| on_screen(d, camera, viewport))
            .collect())
    }
}

fn on_screen(d: &Drawable, camera: &CameraFrame, viewport: Rect) -> bool {
    match d.screen_bounds(camera) {
        Some(bounds) => {
            let hit = bounds.intersect(viewport);
            hit.width() > 0.0 && hit.height() > 0.0
        }
        // Straddles the eye plane: let the rasterizer clip it.
        None => d.mesh.triangle_count() > 0,
    }
}

#[cfg(test)]
#[path = "../../tests/unit/scene/drawable.rs"]
mod tests;
