use std::sync::Arc;

use super::*;
use crate::foundation::core::{Extent, LinearRgba, Vec2};
use crate::foundation::error::OutlineResult;
use crate::scene::camera::CameraKind;
use crate::scene::drawable::{Drawable, Mesh, SceneList};
use crate::settings::config::OutlineGroupConfig;
use crate::settings::stack::{EffectOverrides, GroupOverrides, SettingsLayer};

struct Host {
    camera: CameraFrame,
    scene: SceneList,
    color: Rgba32FImage,
}

impl Host {
    fn new() -> Self {
        let extent = Extent::new(24, 24).unwrap();
        let quad = Arc::new(Mesh::quad(Vec2::new(8.0, 8.0), Vec2::new(16.0, 16.0)));
        Self {
            camera: CameraFrame::orthographic_pixels(extent),
            scene: [Drawable::new("box", quad, RenderingLayerMask(1 << 1))]
                .into_iter()
                .collect(),
            color: Rgba32FImage::from_pixel(24, 24, image::Rgba([0.0, 0.0, 0.25, 1.0])),
        }
    }

    fn frame(&self) -> FrameContext<'_> {
        FrameContext::new(&self.camera, &self.scene, &self.color)
    }
}

struct FlakySource {
    failures_left: u32,
    loads: u32,
}

impl ProgramSource for FlakySource {
    fn load(&mut self) -> OutlineResult<OutlineProgram> {
        self.loads += 1;
        if self.failures_left > 0 {
            self.failures_left -= 1;
            return Err(OutlineError::resource_unavailable("shader still compiling"));
        }
        Ok(OutlineProgram::builtin())
    }
}

fn inactive_config() -> EffectConfig {
    EffectConfig::new(vec![OutlineGroupConfig::inactive(); 4], 5).unwrap()
}

#[test]
fn active_config_renders() {
    let host = Host::new();
    let mut feature = OutlineFeature::default();
    let out = feature.render(&host.frame(), &EffectConfig::default());
    assert!(out.is_rendered());
    let stats = out.stats();
    assert_eq!(stats.draw_calls, 1);
    assert_eq!(stats.passes_executed, 4);
    let color = out.into_color(host.color.clone());
    assert_ne!(color, host.color);
}

#[test]
fn gate_reports_reasons_in_order() {
    let mut host = Host::new();
    let mut feature = OutlineFeature::default();

    feature.set_options(FeatureOptions {
        enabled: false,
        ..FeatureOptions::default()
    });
    assert_eq!(
        feature
            .render(&host.frame(), &inactive_config())
            .skip_reason(),
        Some(SkipReason::FeatureDisabled)
    );

    feature.set_options(FeatureOptions::default());
    let mut frame = host.frame();
    frame.post_processing_enabled = false;
    assert_eq!(
        feature.render(&frame, &EffectConfig::default()).skip_reason(),
        Some(SkipReason::PostProcessingDisabled)
    );

    assert_eq!(
        feature
            .render(&host.frame(), &inactive_config())
            .skip_reason(),
        Some(SkipReason::InactiveConfiguration)
    );

    host.camera = host.camera.clone().with_kind(CameraKind::Reflection);
    assert_eq!(
        feature
            .render(&host.frame(), &EffectConfig::default())
            .skip_reason(),
        Some(SkipReason::IneligibleCamera)
    );
    host.camera = host.camera.clone().with_kind(CameraKind::Preview);
    assert_eq!(
        feature
            .render(&host.frame(), &EffectConfig::default())
            .skip_reason(),
        Some(SkipReason::IneligibleCamera)
    );
    host.camera = host.camera.clone().with_kind(CameraKind::SceneView);
    assert!(
        feature
            .render(&host.frame(), &EffectConfig::default())
            .is_rendered()
    );
}

#[test]
fn skipped_frame_allocates_nothing() {
    let host = Host::new();
    let mut feature = OutlineFeature::default();
    let out = feature.render(&host.frame(), &inactive_config());
    assert_eq!(out.stats(), FrameStats::default());
    assert_eq!(feature.backend().pool_stats().alloc_surfaces, 0);
    assert!(feature.program().is_none());
}

#[test]
fn fill_only_group_is_active() {
    let host = Host::new();
    let cfg = EffectConfig::single(
        OutlineGroupConfig::new(LinearRgba::new(1.0, 1.0, 0.0, 0.0), 0.015, 0.5),
        5,
    );
    let mut feature = OutlineFeature::default();
    assert!(feature.render(&host.frame(), &cfg).is_rendered());
}

#[test]
fn missing_program_is_retried_every_frame() {
    let host = Host::new();
    let mut feature = OutlineFeature::with_parts(
        FeatureOptions::default(),
        FlakySource {
            failures_left: 2,
            loads: 0,
        },
        CpuBackend::default(),
    );
    let cfg = EffectConfig::default();

    for _ in 0..2 {
        let out = feature.render(&host.frame(), &cfg);
        assert_eq!(out.skip_reason(), Some(SkipReason::ResourceUnavailable));
        assert_eq!(out.stats(), FrameStats::default());
    }
    assert!(feature.render(&host.frame(), &cfg).is_rendered());
    assert!(feature.render(&host.frame(), &cfg).is_rendered());
    assert_eq!(feature.source.loads, 3);
}

#[test]
fn failed_frame_keeps_the_original_color() {
    let host = Host::new();
    let mut feature = OutlineFeature::new(FeatureOptions {
        backend: CpuBackendOpts {
            frame_budget_bytes: Some(64),
            ..CpuBackendOpts::default()
        },
        ..FeatureOptions::default()
    });
    let out = feature.render(&host.frame(), &EffectConfig::default());
    assert!(matches!(
        out,
        FrameOutcome::Failed(OutlineError::BufferAllocation(_))
    ));
    assert_eq!(out.into_color(host.color.clone()), host.color);

    feature.set_options(FeatureOptions::default());
    *feature.backend_mut() = CpuBackend::default();
    assert!(
        feature
            .render(&host.frame(), &EffectConfig::default())
            .is_rendered()
    );
}

#[test]
fn overlapping_layers_fail_without_panicking() {
    let host = Host::new();
    let mut options = FeatureOptions::default();
    options.group_layers[1] = options.group_layers[0];
    let mut feature = OutlineFeature::new(options);
    let out = feature.render(&host.frame(), &EffectConfig::default());
    assert!(matches!(out, FrameOutcome::Failed(OutlineError::Validation(_))));
}

#[test]
fn stack_overrides_reach_the_frame() {
    let host = Host::new();
    let mut stack = SettingsStack::new(inactive_config());
    let mut feature = OutlineFeature::default();
    assert_eq!(
        feature
            .render_with_stack(&host.frame(), &stack)
            .skip_reason(),
        Some(SkipReason::InactiveConfiguration)
    );

    stack
        .push_layer(SettingsLayer {
            name: "highlight".into(),
            priority: 0,
            weight: 1.0,
            overrides: EffectOverrides {
                blur_radius: None,
                groups: vec![GroupOverrides {
                    color: Some(LinearRgba::new(1.0, 0.0, 0.0, 1.0)),
                    ..GroupOverrides::default()
                }],
            },
        })
        .unwrap();
    assert!(
        feature
            .render_with_stack(&host.frame(), &stack)
            .is_rendered()
    );
}

#[test]
fn options_round_trip_through_json() {
    let opts = FeatureOptions {
        layout: MaskLayout::PerGroup,
        injection_point: InjectionPoint::AfterPostProcessing,
        ..FeatureOptions::default()
    };
    let json = serde_json::to_string(&opts).unwrap();
    let back: FeatureOptions = serde_json::from_str(&json).unwrap();
    assert_eq!(back, opts);

    let partial: FeatureOptions = serde_json::from_str(r#"{"enabled": false}"#).unwrap();
    assert!(!partial.enabled);
    assert_eq!(partial.layout, MaskLayout::Packed);
}

#[test]
fn zero_sized_camera_fails_without_panicking() {
    let mut host = Host::new();
    host.camera.extent = Extent {
        width: 0,
        height: 4,
    };
    host.color = Rgba32FImage::new(0, 4);
    let mut feature = OutlineFeature::default();
    let out = feature.render(&host.frame(), &EffectConfig::default());
    assert!(matches!(out, FrameOutcome::Failed(OutlineError::Validation(_))));
    assert_eq!(feature.backend().pool_stats().alloc_surfaces, 0);

    host.scene = SceneList::new();
    host.camera.extent = Extent {
        width: 0,
        height: 0,
    };
    host.color = Rgba32FImage::new(0, 0);
    let out = feature.render(&host.frame(), &EffectConfig::default());
    assert!(matches!(out, FrameOutcome::Failed(OutlineError::Validation(_))));
}
