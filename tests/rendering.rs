//! Headless end-to-end frames
//!
//! Every test skips itself when no adapter is available. The camera looks
//! straight down at a white floor from 3 units up, so every pixel sees the
//! floor at the same eye depth.

use std::sync::Arc;

use cgmath::Vector4;
use penumbra::gfx::post::blur::tone_map;
use penumbra::gfx::post::gbuffer_preview::{preview_depth, preview_normal};
use penumbra::prelude::*;

const SIZE: u32 = 64;
const PRESENT_FORMAT: wgpu::TextureFormat = wgpu::TextureFormat::Rgba8Unorm;
const CAMERA_HEIGHT: f32 = 3.0;
const TOLERANCE: f32 = 2.0 / 255.0;

fn headless() -> Option<Arc<GpuContext>> {
    let _ = env_logger::builder().is_test(true).try_init();
    match GpuContext::new_headless(PRESENT_FORMAT, RendererConfig::default()) {
        Ok(ctx) => Some(ctx),
        Err(e) => {
            eprintln!("Skipping, no GPU available: {}", e);
            None
        }
    }
}

/// White floor seen straight from above, filling the whole view
fn floor_scene(ctx: &Arc<GpuContext>) -> Scene {
    let mut scene = Scene::new(ctx, SIZE, SIZE).expect("scene");
    let floor = Object::new(ctx, &generate_plane(20.0, 20.0, 1, 1), [1.0; 4]).expect("floor");
    scene.add_object(floor).expect("add floor");
    scene.set_camera_perspective(Deg(60.0), 1.0, 0.01, 100.0);
    scene.set_camera_look_at(
        Point3::new(0.0, CAMERA_HEIGHT, 0.0),
        Point3::new(0.0, 0.0, 0.0),
        Vector3::new(0.0, 0.0, -1.0),
    );
    scene
}

/// Spot light at the camera position, aimed at the floor below
fn overhead_spot(ctx: &Arc<GpuContext>, color: Vector3<f32>) -> SpotLight {
    SpotLight::new(
        ctx,
        Point3::new(0.0, CAMERA_HEIGHT, 0.0),
        Point3::new(0.0, 0.0, 0.0),
        Vector3::new(0.0, 0.0, -1.0),
        2.0,
        color,
    )
    .expect("spot")
}

fn lit_floor_scene(ctx: &Arc<GpuContext>) -> Scene {
    let mut scene = floor_scene(ctx);
    scene.add_light(AmbientLight::new(ctx).expect("ambient"));
    scene.add_light(overhead_spot(ctx, Vector3::new(0.5, 0.0, 0.0)));
    scene
}

fn render_and_read(ctx: &Arc<GpuContext>, scene: &mut Scene) -> Vec<[f32; 4]> {
    let target = RenderTarget::new(ctx, SIZE, SIZE, PRESENT_FORMAT, "Test Present").expect("target");
    scene.render(target.view());
    read_texture(ctx, &target.color.texture).expect("readback")
}

fn pixel(pixels: &[[f32; 4]], x: u32, y: u32) -> [f32; 4] {
    pixels[(y * SIZE + x) as usize]
}

fn center(pixels: &[[f32; 4]]) -> [f32; 4] {
    pixel(pixels, SIZE / 2, SIZE / 2)
}

fn assert_close(actual: f32, expected: f32, tolerance: f32) {
    assert!(
        (actual - expected).abs() <= tolerance,
        "expected {} within {}, got {}",
        expected,
        tolerance,
        actual
    );
}

fn assert_rgb_close(actual: [f32; 4], expected: [f32; 3], tolerance: f32) {
    for channel in 0..3 {
        assert_close(actual[channel], expected[channel], tolerance);
    }
}

#[test]
fn test_scene_without_lights_is_black() {
    let Some(ctx) = headless() else { return };
    let mut scene = floor_scene(&ctx);

    let pixels = render_and_read(&ctx, &mut scene);
    for pixel in pixels {
        assert_eq!(&pixel[..3], &[0.0, 0.0, 0.0]);
    }
}

#[test]
fn test_gbuffer_matches_scene_size() {
    let Some(ctx) = headless() else { return };
    let mut scene = Scene::new(&ctx, 96, 48).expect("scene");
    assert_eq!(scene.gbuffer().size(), (96, 48));
    assert_eq!(scene.output().size(), (96, 48));

    scene.resize(40, 30).expect("resize");
    assert_eq!(scene.size(), (40, 30));
    assert_eq!(scene.gbuffer().size(), (40, 30));
    assert_eq!(scene.output().size(), (40, 30));
}

#[test]
fn test_depth_readers_build_on_every_backend() {
    let Some(ctx) = headless() else { return };

    // Depth is read with textureLoad, which GL only allows on float textures
    assert!(matches!(
        ctx.layouts.gbuffer.entries[2].ty,
        wgpu::BindingType::Texture {
            sample_type: wgpu::TextureSampleType::Float { filterable: false },
            ..
        }
    ));

    overhead_spot(&ctx, Vector3::new(1.0, 1.0, 1.0));
    DofFilter::new(&ctx, SIZE, SIZE, CAMERA_HEIGHT).unwrap_or_else(|e| panic!("dof: {}", e));
    GBufferPreview::new(&ctx, SIZE, SIZE).unwrap_or_else(|e| panic!("preview: {}", e));
}

#[test]
fn test_ambient_light_scales_albedo() {
    let Some(ctx) = headless() else { return };
    let mut scene = floor_scene(&ctx);
    scene.add_light(AmbientLight::new(&ctx).expect("ambient"));

    let pixels = render_and_read(&ctx, &mut scene);
    let expected = AmbientLight::contribution([1.0; 4]);
    assert_rgb_close(center(&pixels), [expected[0], expected[1], expected[2]], TOLERANCE);
}

#[test]
fn test_spot_light_adds_to_ambient() {
    let Some(ctx) = headless() else { return };
    let mut scene = lit_floor_scene(&ctx);

    // The view ray of the centre pixel leaves the light volume through the
    // cone's base, so this also needs the base to be closed
    let pixels = render_and_read(&ctx, &mut scene);
    let lit = center(&pixels);
    assert!(lit[0] > 0.2 + 0.25, "red {}", lit[0]);
    assert!(lit[0] >= lit[1]);

    // Corners lie far outside the cone and keep the ambient term only
    for corner in [pixel(&pixels, 0, 0), pixel(&pixels, SIZE - 1, SIZE - 1)] {
        assert_rgb_close(corner, [0.2; 3], TOLERANCE);
    }
}

#[test]
fn test_frame_plan_is_stable_across_frames() {
    let Some(ctx) = headless() else { return };
    let mut scene = floor_scene(&ctx);
    scene.add_light(AmbientLight::new(&ctx).expect("ambient"));
    scene.add_light(overhead_spot(&ctx, Vector3::new(0.0, 0.5, 0.0)));
    assert!(scene.last_frame().is_none());

    render_and_read(&ctx, &mut scene);
    let first = scene.last_frame().cloned().expect("first plan");
    render_and_read(&ctx, &mut scene);
    let second = scene.last_frame().cloned().expect("second plan");

    assert_eq!(first, second);
    assert!(first.is_well_ordered());
    assert_eq!(
        first.passes(),
        &[
            Pass::Shadow { light: 1 },
            Pass::Geometry,
            Pass::Lighting { lights: 2 },
            Pass::Present,
        ]
    );
}

#[test]
fn test_filters_chain_in_registration_order() {
    let Some(ctx) = headless() else { return };
    let mut scene = floor_scene(&ctx);
    scene.add_light(AmbientLight::new(&ctx).expect("ambient"));
    scene.add_light(overhead_spot(&ctx, Vector3::new(0.0, 0.0, 0.5)));
    scene.add_post_filter(DofFilter::new(&ctx, SIZE, SIZE, CAMERA_HEIGHT).expect("dof"));
    let bloom = BloomConfig::default().with_debug_overlay(false);
    scene.add_post_filter(BlurFilter::with_config(&ctx, SIZE, SIZE, bloom).expect("blur"));

    assert_eq!(scene.filter_labels(), vec!["dof", "blur"]);

    let pixels = render_and_read(&ctx, &mut scene);
    let plan = scene.last_frame().expect("plan");
    let filters: Vec<usize> = plan.filters().collect();
    assert_eq!(filters, vec![0, 1]);

    // Bloom tone maps, so the lit floor stays visible and within range
    let lit = center(&pixels);
    assert!(lit[2] > 0.0);
    assert!(lit.iter().all(|c| (0.0..=1.0).contains(c)));
}

#[test]
fn test_in_focus_image_passes_through_dof() {
    let Some(ctx) = headless() else { return };

    let mut plain = lit_floor_scene(&ctx);
    let reference = render_and_read(&ctx, &mut plain);

    // Focused on the floor, so the circle of confusion vanishes everywhere
    let mut focused = lit_floor_scene(&ctx);
    focused.add_post_filter(DofFilter::new(&ctx, SIZE, SIZE, CAMERA_HEIGHT).expect("dof"));
    let filtered = render_and_read(&ctx, &mut focused);

    let reds: Vec<f32> = reference.iter().map(|p| p[0]).collect();
    let spread = reds.iter().cloned().fold(f32::MIN, f32::max) - reds.iter().cloned().fold(f32::MAX, f32::min);
    assert!(spread > 0.1, "reference image is flat");

    for (i, (a, b)) in reference.iter().zip(&filtered).enumerate() {
        for channel in 0..3 {
            assert!(
                (a[channel] - b[channel]).abs() <= TOLERANCE,
                "pixel {} channel {}: {} vs {}",
                i,
                channel,
                a[channel],
                b[channel]
            );
        }
    }
}

#[test]
fn test_bloom_of_constant_image() {
    let Some(ctx) = headless() else { return };
    let mut scene = floor_scene(&ctx);
    scene.add_light(AmbientLight::new(&ctx).expect("ambient"));
    let config = BloomConfig::default().with_debug_overlay(false);
    scene.add_post_filter(BlurFilter::with_config(&ctx, SIZE, SIZE, config).expect("blur"));

    // A constant c downsamples to c, squares to c^2 and keeps that value
    // through the normalised blur, so every pixel is tone_map(c) + c^2
    let c = 0.2;
    let expected = tone_map(c, config.exposure) + c * c;

    let pixels = render_and_read(&ctx, &mut scene);
    for p in &pixels {
        assert_rgb_close(*p, [expected; 3], 3.0 / 255.0);
    }
}

#[test]
fn test_gbuffer_preview_columns() {
    let Some(ctx) = headless() else { return };
    let mut scene = floor_scene(&ctx);
    scene.add_post_filter(GBufferPreview::new(&ctx, SIZE, SIZE).expect("preview"));

    let clip = scene.camera_projection() * Vector4::new(0.0, 0.0, -CAMERA_HEIGHT, 1.0);
    let depth = preview_depth(clip.z / clip.w);
    let normal = preview_normal([0.0, 0.0, 1.0]);

    let pixels = render_and_read(&ctx, &mut scene);
    let y = SIZE / 2;
    assert_rgb_close(pixel(&pixels, SIZE / 6, y), [1.0; 3], TOLERANCE);
    assert_rgb_close(pixel(&pixels, SIZE / 2, y), [depth; 3], 0.01);
    assert_rgb_close(pixel(&pixels, SIZE - SIZE / 6, y), normal, TOLERANCE);
}

#[test]
fn test_object_without_normals_is_rejected() {
    let Some(ctx) = headless() else { return };
    let mut scene = Scene::new(&ctx, SIZE, SIZE).expect("scene");
    let cone = generate_cone(1.0, 2.0, 8);
    match Object::new(&ctx, &cone, [1.0; 4]) {
        Ok(object) => {
            assert!(matches!(
                scene.add_object(object),
                Err(RenderError::InvalidMesh(_))
            ));
        }
        Err(e) => assert!(matches!(e, RenderError::InvalidMesh(_))),
    }
}
