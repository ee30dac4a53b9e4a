use super::*;
use crate::compile::plan::{AccessKind, PassStage};
use crate::foundation::core::{Extent, Vec2};
use crate::scene::camera::AntialiasingMode;
use crate::settings::config::OutlineGroupConfig;

fn camera() -> CameraFrame {
    CameraFrame::orthographic_pixels(Extent::new(16, 8).unwrap())
}

#[test]
fn packed_plan_has_four_stages_and_aliases_vertical_blur() {
    let plan =
        compile_outline_plan(&EffectConfig::default(), &camera(), &PlanOptions::default())
            .unwrap();
    assert_eq!(
        plan.stages(),
        vec![
            PassStage::RenderObjects,
            PassStage::HorizontalBlur,
            PassStage::VerticalBlur,
            PassStage::Resolve,
        ]
    );
    assert_eq!(plan.surfaces.len(), 5);

    let Pass::RenderMasks(mask) = &plan.passes[0] else {
        panic!("expected mask pass first");
    };
    assert_eq!(mask.draws.len(), 4);
    let (from, to) = mask.snapshot.unwrap();
    assert!(mask.draws.iter().all(|d| d.target == from));
    assert_eq!(
        mask.draws.iter().map(|d| d.channel).collect::<Vec<_>>(),
        vec![0, 1, 2, 3]
    );

    let vertical = plan.passes[2].accesses();
    assert!(
        vertical
            .iter()
            .any(|a| a.surface == from && a.kind == AccessKind::WriteAliased)
    );

    let Pass::Resolve(resolve) = &plan.passes[3] else {
        panic!("expected resolve last");
    };
    assert_eq!(resolve.sharp, to);
    assert_eq!(resolve.blurred, from);
    assert_eq!(resolve.source, plan.camera_color);
    assert_eq!(plan.final_surface, resolve.target);
}

#[test]
fn per_group_plan_inserts_combine() {
    let opts = PlanOptions {
        layout: MaskLayout::PerGroup,
        ..PlanOptions::default()
    };
    let plan = compile_outline_plan(&EffectConfig::default(), &camera(), &opts).unwrap();
    assert_eq!(
        plan.stages(),
        vec![
            PassStage::RenderObjects,
            PassStage::CombineMasks,
            PassStage::HorizontalBlur,
            PassStage::VerticalBlur,
            PassStage::Resolve,
        ]
    );
    assert!(plan.passes.iter().all(|p| {
        p.accesses()
            .iter()
            .all(|a| a.kind != AccessKind::WriteAliased)
    }));
}

#[test]
fn single_group_uses_one_channel_and_skips_combine() {
    let cfg = EffectConfig::single(OutlineGroupConfig::default(), 5);
    let opts = PlanOptions {
        layout: MaskLayout::PerGroup,
        ..PlanOptions::default()
    };
    let plan = compile_outline_plan(&cfg, &camera(), &opts).unwrap();
    assert!(!plan.stages().contains(&PassStage::CombineMasks));
    assert!(
        plan.surfaces
            .iter()
            .filter(|s| s.origin == SurfaceOrigin::Transient && s.name != "_OutlineResolve")
            .all(|s| s.format == SurfaceFormat::Coverage1)
    );
}

#[test]
fn jitter_removal_follows_camera_and_option() {
    let jittered = camera()
        .with_antialiasing(AntialiasingMode::Temporal)
        .with_pixel_jitter(Vec2::new(0.3, -0.2));
    let cfg = EffectConfig::default();

    let remove = |cam: &CameraFrame, opts: &PlanOptions| {
        let plan = compile_outline_plan(&cfg, cam, opts).unwrap();
        match &plan.passes[0] {
            Pass::RenderMasks(m) => m.remove_jitter,
            _ => unreachable!(),
        }
    };
    assert!(remove(&jittered, &PlanOptions::default()));
    assert!(!remove(&camera(), &PlanOptions::default()));
    assert!(!remove(
        &jittered,
        &PlanOptions {
            remove_jitter: false,
            ..PlanOptions::default()
        }
    ));
}

#[test]
fn overlapping_group_layers_are_rejected() {
    let mut opts = PlanOptions::default();
    opts.group_layers[2] = opts.group_layers[0];
    assert!(compile_outline_plan(&EffectConfig::default(), &camera(), &opts).is_err());

    let mut opts = PlanOptions::default();
    opts.group_layers[0] = RenderingLayerMask::NONE;
    assert!(compile_outline_plan(&EffectConfig::default(), &camera(), &opts).is_err());
}

#[test]
fn kernel_tracks_configured_radius() {
    let mut cfg = EffectConfig::default();
    cfg.set_blur_radius(9);
    let plan = compile_outline_plan(&cfg, &camera(), &PlanOptions::default()).unwrap();
    let Pass::Blur(blur) = &plan.passes[1] else {
        panic!("expected blur");
    };
    assert_eq!(blur.kernel.radius(), 9);
}
