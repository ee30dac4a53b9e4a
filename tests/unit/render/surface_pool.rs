use super::*;

fn desc(w: u32, h: u32, format: SurfaceFormat) -> SurfaceDesc {
    SurfaceDesc::transient("t", Extent::new(w, h).unwrap(), format)
}

#[test]
fn borrow_allocates_zeroed_buffer_of_right_len() {
    let mut p = SurfacePool::new(SurfacePoolOpts::default());
    let d = desc(4, 3, SurfaceFormat::Coverage4);
    let data = p.borrow(&d).unwrap();
    assert_eq!(data.len(), 4 * 3 * 4);
    assert!(data.iter().all(|&v| v == 0.0));
    assert_eq!(p.stats().alloc_surfaces, 1);
    assert_eq!(p.stats().alloc_bytes, d.byte_len() as u64);
}

#[test]
fn released_buffer_is_reused_and_cleared() {
    let mut p = SurfacePool::new(SurfacePoolOpts::default());
    let d = desc(4, 4, SurfaceFormat::Coverage1);
    let mut a = p.borrow(&d).unwrap();
    a.fill(0.75);
    p.release(&d, a);
    assert_eq!(p.stats().retained_surfaces, 1);

    let b = p.borrow(&d).unwrap();
    assert!(b.iter().all(|&v| v == 0.0));
    let st = p.stats();
    assert_eq!(st.alloc_surfaces, 1);
    assert_eq!(st.reused_surfaces, 1);
    assert_eq!(st.retained_surfaces, 0);
}

#[test]
fn formats_do_not_share_buckets() {
    let mut p = SurfacePool::new(SurfacePoolOpts::default());
    let one = desc(4, 4, SurfaceFormat::Coverage1);
    let four = desc(4, 4, SurfaceFormat::Coverage4);
    let a = p.borrow(&one).unwrap();
    p.release(&one, a);
    let b = p.borrow(&four).unwrap();
    assert_eq!(b.len(), 64);
    assert_eq!(p.stats().alloc_surfaces, 2);
}

#[test]
fn pool_honors_bucket_cap() {
    let mut p = SurfacePool::new(SurfacePoolOpts {
        max_pool_bytes: 1 << 30,
        max_surfaces_per_bucket: 1,
    });
    let d = desc(8, 8, SurfaceFormat::Rgba32F);

    let a = p.borrow(&d).unwrap();
    let b = p.borrow(&d).unwrap();
    p.release(&d, a);
    p.release(&d, b);

    let st = p.stats();
    assert_eq!(st.retained_surfaces, 1);
    assert_eq!(st.dropped_on_release, 1);
}

#[test]
fn pool_honors_global_byte_cap() {
    let d = desc(8, 8, SurfaceFormat::Coverage1);
    let mut p = SurfacePool::new(SurfacePoolOpts {
        max_pool_bytes: d.byte_len(),
        max_surfaces_per_bucket: 8,
    });

    let a = p.borrow(&d).unwrap();
    let b = p.borrow(&d).unwrap();
    p.release(&d, a);
    p.release(&d, b);

    let st = p.stats();
    assert_eq!(st.retained_bytes, d.byte_len());
    assert_eq!(st.retained_surfaces, 1);
    assert!(st.dropped_on_release >= 1);

    p.clear();
    assert_eq!(p.stats().retained_bytes, 0);
}
