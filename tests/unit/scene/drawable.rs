use super::*;
use crate::foundation::core::Extent;

fn camera() -> CameraFrame {
    CameraFrame::orthographic_pixels(Extent::new(32, 32).unwrap())
}

fn square(name: &str, at: Vec2, layers: RenderingLayerMask) -> Drawable {
    Drawable::new(
        name,
        Arc::new(Mesh::quad(at, at + Vec2::splat(4.0))),
        layers,
    )
}

#[test]
fn mesh_validates_indices() {
    assert!(Mesh::new(vec![Vec3::ZERO; 3], vec![0, 1]).is_err());
    assert!(Mesh::new(vec![Vec3::ZERO; 3], vec![0, 1, 3]).is_err());
    let m = Mesh::new(vec![Vec3::ZERO; 3], vec![0, 1, 2]).unwrap();
    assert_eq!(m.triangle_count(), 1);
}

#[test]
fn quad_bounds_cover_corners() {
    let m = Mesh::quad(Vec2::new(1.0, 2.0), Vec2::new(3.0, 5.0));
    let (lo, hi) = m.bounds().unwrap();
    assert_eq!(lo, Vec3::new(1.0, 2.0, 0.0));
    assert_eq!(hi, Vec3::new(3.0, 5.0, 0.0));
    assert_eq!(m.triangles().count(), 2);
}

#[test]
fn query_filters_by_layer_bit() {
    let a = RenderingLayerMask::from_bit(1).unwrap();
    let b = RenderingLayerMask::from_bit(2).unwrap();
    let scene: SceneList = [
        square("a", Vec2::new(2.0, 2.0), a),
        square("b", Vec2::new(8.0, 8.0), b),
        square("ab", Vec2::new(14.0, 14.0), a | b),
    ]
    .into_iter()
    .collect();

    let names = |layer| {
        scene
            .drawables(layer, &camera())
            .unwrap()
            .into_iter()
            .map(|d| d.name.clone())
            .collect::<Vec<_>>()
    };
    assert_eq!(names(a), vec!["a", "ab"]);
    assert_eq!(names(b), vec!["b", "ab"]);
}

#[test]
fn hidden_and_offscreen_drawables_are_culled() {
    let a = RenderingLayerMask::from_bit(1).unwrap();
    let mut hidden = square("hidden", Vec2::new(2.0, 2.0), a);
    hidden.visible = false;
    let offscreen = square("offscreen", Vec2::new(100.0, 100.0), a);
    let scene: SceneList = [hidden, offscreen].into_iter().collect();
    assert!(scene.drawables(a, &camera()).unwrap().is_empty());
}
