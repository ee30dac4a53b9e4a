use super::*;

fn extent(w: u32, h: u32) -> Extent {
    Extent::new(w, h).unwrap()
}

fn separable(src: &[f32], e: Extent, ch: usize, k: &GaussianKernel, first: BlurAxis) -> Vec<f32> {
    let second = match first {
        BlurAxis::Horizontal => BlurAxis::Vertical,
        BlurAxis::Vertical => BlurAxis::Horizontal,
    };
    let mut tmp = vec![0.0; src.len()];
    let mut out = vec![0.0; src.len()];
    blur_axis(src, &mut tmp, e, ch, k, first).unwrap();
    blur_axis(&tmp, &mut out, e, ch, k, second).unwrap();
    out
}

#[test]
fn kernel_is_normalized_and_symmetric() {
    let k = GaussianKernel::new(5, 2.0).unwrap();
    assert_eq!(k.weights().len(), 11);
    let sum: f32 = k.weights().iter().sum();
    assert!((sum - 1.0).abs() < 1e-5);
    for i in 0..k.radius() {
        assert_eq!(k.weights()[i], k.weights()[k.weights().len() - 1 - i]);
    }
    assert!(k.weights()[5] > k.weights()[4]);
}

#[test]
fn kernel_from_radius_uses_half_radius_std_dev() {
    let k = GaussianKernel::from_radius(BlurRadius::new(8)).unwrap();
    assert_eq!(k.radius(), 8);
    let expected = GaussianKernel::new(8, 4.0).unwrap();
    assert_eq!(k, expected);
}

#[test]
fn degenerate_kernels_are_identity() {
    assert!(GaussianKernel::new(0, 3.0).unwrap().is_identity());
    assert!(GaussianKernel::new(4, 0.0).unwrap().is_identity());
    assert!(GaussianKernel::new(4, -1.0).is_err());
    assert!(GaussianKernel::new(4, f32::NAN).is_err());
}

#[test]
fn identity_kernel_reproduces_input_exactly() {
    let e = extent(5, 4);
    let src: Vec<f32> = (0..20).map(|i| if i % 3 == 0 { 1.0 } else { 0.0 }).collect();
    let out = separable(&src, e, 1, &GaussianKernel::identity(), BlurAxis::Horizontal);
    assert_eq!(out, src);
}

#[test]
fn constant_image_stays_constant() {
    let e = extent(6, 5);
    let src = [0.25f32, 0.5, 0.75, 1.0].repeat(e.pixel_count());
    let k = GaussianKernel::new(3, 1.0).unwrap();
    let out = separable(&src, e, 4, &k, BlurAxis::Horizontal);
    for (a, b) in out.iter().zip(&src) {
        assert!((a - b).abs() < 1e-5);
    }
}

#[test]
fn clamp_to_edge_does_not_darken_borders() {
    let e = extent(4, 4);
    let src = vec![1.0; 16];
    let k = GaussianKernel::new(3, 1.5).unwrap();
    let out = separable(&src, e, 1, &k, BlurAxis::Horizontal);
    assert!(out.iter().all(|v| (v - 1.0).abs() < 1e-5));
}

#[test]
fn channels_do_not_mix() {
    let e = extent(7, 7);
    let mut src = vec![0.0; e.pixel_count() * 4];
    let center = (3 * 7 + 3) * 4;
    src[center + 2] = 1.0;
    let k = GaussianKernel::new(2, 1.0).unwrap();
    let out = separable(&src, e, 4, &k, BlurAxis::Horizontal);
    for px in out.chunks_exact(4) {
        assert_eq!(px[0], 0.0);
        assert_eq!(px[1], 0.0);
        assert_eq!(px[3], 0.0);
    }
    let energy: f32 = out.chunks_exact(4).map(|px| px[2]).sum();
    assert!((energy - 1.0).abs() < 1e-4);
}

#[test]
fn support_is_limited_to_radius() {
    let e = extent(15, 1);
    let mut src = vec![0.0; 15];
    src[7] = 1.0;
    let k = GaussianKernel::new(3, 1.0).unwrap();
    let mut out = vec![0.0; 15];
    blur_axis(&src, &mut out, e, 1, &k, BlurAxis::Horizontal).unwrap();
    for (x, v) in out.iter().enumerate() {
        if (4..=10).contains(&x) {
            assert!(*v > 0.0, "x={x}");
        } else {
            assert_eq!(*v, 0.0, "x={x}");
        }
    }
}

#[test]
fn axis_order_commutes_for_symmetric_kernel() {
    let e = extent(9, 7);
    let src: Vec<f32> = (0..e.pixel_count())
        .map(|i| ((i * 37) % 11) as f32 / 10.0)
        .collect();
    let k = GaussianKernel::new(3, 1.0).unwrap();
    let hv = separable(&src, e, 1, &k, BlurAxis::Horizontal);
    let vh = separable(&src, e, 1, &k, BlurAxis::Vertical);
    for (a, b) in hv.iter().zip(&vh) {
        assert!((a - b).abs() < 1e-5);
    }
}

#[test]
fn mismatched_buffers_are_rejected() {
    let e = extent(2, 2);
    let mut dst = vec![0.0; 3];
    let k = GaussianKernel::identity();
    assert!(blur_axis(&[0.0; 4], &mut dst, e, 1, &k, BlurAxis::Vertical).is_err());
}

#[test]
fn empty_extent_is_an_error() {
    let e = Extent {
        width: 0,
        height: 3,
    };
    let k = GaussianKernel::new(2, 1.0).unwrap();
    let err = blur_axis(&[], &mut [], e, 1, &k, BlurAxis::Horizontal).unwrap_err();
    assert!(matches!(err, OutlineError::Validation(_)));
}
