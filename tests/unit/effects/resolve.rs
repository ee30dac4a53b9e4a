use super::*;
use crate::foundation::core::LinearRgba;

fn red(alpha: f32, fall_off: f32, fill: f32) -> OutlineGroupConfig {
    OutlineGroupConfig::new(LinearRgba::new(1.0, 0.0, 0.0, alpha), fall_off, fill)
}

#[test]
fn ring_is_zero_without_blurred_coverage() {
    assert_eq!(ring_intensity(0.0, 0.0), 0.0);
    assert_eq!(ring_intensity(0.0, 0.5), 0.0);
}

#[test]
fn zero_fall_off_is_a_hard_step() {
    assert_eq!(ring_intensity(1e-6, 0.0), 1.0);
    assert_eq!(ring_intensity(0.9, 0.0), 1.0);
}

#[test]
fn ring_is_monotonic_in_blurred_coverage() {
    for fall_off in [0.015, 0.3, 1.0] {
        let mut prev = 0.0;
        for i in 0..=100 {
            let v = ring_intensity(i as f32 / 100.0, fall_off);
            assert!(v >= prev);
            prev = v;
        }
    }
}

#[test]
fn large_fall_off_is_softer() {
    assert!(ring_intensity(0.1, 1.0) < ring_intensity(0.1, 0.015));
}

#[test]
fn interior_gets_no_ring() {
    assert_eq!(group_alpha(&red(1.0, 0.015, 0.0), 1.0, 0.8), 0.0);
}

#[test]
fn fill_only_colors_interior() {
    let g = red(0.0, 0.5, 1.0);
    assert_eq!(group_alpha(&g, 1.0, 0.7), 1.0);
    assert_eq!(group_alpha(&g, 0.0, 0.7), 0.0);
}

#[test]
fn inactive_groups_leave_overlay_untouched() {
    let groups = [OutlineGroupConfig::inactive(), red(1.0, 0.015, 0.0)];
    let px = overlay_pixel(&groups, &[0.0, 0.0], &[0.5, 0.5]);
    assert_eq!(px, [1.0, 0.0, 0.0, 1.0]);
}

#[test]
fn higher_group_index_is_on_top() {
    let blue = OutlineGroupConfig::new(LinearRgba::new(0.0, 0.0, 1.0, 1.0), 0.015, 0.0);
    let px = overlay_pixel(&[red(1.0, 0.015, 0.0), blue], &[0.0, 0.0], &[0.5, 0.5]);
    assert_eq!(px, [0.0, 0.0, 1.0, 1.0]);
}

#[test]
fn resolve_composites_over_source() {
    let extent = Extent::new(2, 1).unwrap();
    let sharp = [1.0, 0.0];
    let blurred = [1.0, 0.0];
    let source = [0.0, 0.5, 0.0, 1.0, 0.0, 0.5, 0.0, 1.0];
    let mut dst = [0.0f32; 8];
    resolve_into(
        &mut dst,
        &source,
        CoverageInputs {
            sharp: &sharp,
            blurred: &blurred,
            channels: 1,
            extent,
        },
        &[red(1.0, 0.015, 0.5)],
    )
    .unwrap();
    assert_eq!(&dst[..4], &[0.5, 0.25, 0.0, 1.0]);
    assert_eq!(&dst[4..], &source[4..]);
}

#[test]
fn too_many_groups_for_channels_is_rejected() {
    let extent = Extent::new(1, 1).unwrap();
    let err = resolve_overlay(
        CoverageInputs {
            sharp: &[0.0],
            blurred: &[0.0],
            channels: 1,
            extent,
        },
        &[red(1.0, 0.0, 0.0), red(1.0, 0.0, 0.0)],
    );
    assert!(err.is_err());
}

#[test]
fn empty_extent_is_an_error() {
    let extent = Extent {
        width: 0,
        height: 2,
    };
    let coverage = CoverageInputs {
        sharp: &[],
        blurred: &[],
        channels: 1,
        extent,
    };
    let err = resolve_into(&mut [], &[], coverage, &[red(1.0, 0.0, 0.0)]).unwrap_err();
    assert!(matches!(err, OutlineError::Validation(_)));
}

#[test]
fn non_finite_color_never_reaches_the_output() {
    let color = LinearRgba::new(f32::NAN, 1.0, f32::INFINITY, 1.0);
    let group = OutlineGroupConfig::new(color, 0.0, 0.0);
    let px = overlay_pixel(&[group], &[0.0], &[0.5]);
    assert!(px.iter().all(|v| v.is_finite()), "{px:?}");
    assert_eq!(px, [0.0, 1.0, 0.0, 1.0]);
}
