//! # Spot Lights Demo
//!
//! Three objects on a floor, lit by an ambient term and three coloured,
//! shadow casting spot lights. The camera circles the scene.
//!
//! ## Usage:
//! ```bash
//! cargo run --example spotlights -- [model.obj] [--dof] [--bloom] [--gbuffer]
//! ```
//!
//! Without a model, spheres and a cube stand in. `RUST_LOG=info` prints the
//! frame time every 1000 frames.

use std::path::PathBuf;

use anyhow::Context;
use penumbra::prelude::*;

#[derive(Debug, Default)]
struct Options {
    model: Option<PathBuf>,
    dof: bool,
    bloom: bool,
    gbuffer: bool,
}

fn parse_args() -> Options {
    let mut options = Options::default();
    for arg in std::env::args().skip(1) {
        match arg.as_str() {
            "--dof" => options.dof = true,
            "--bloom" => options.bloom = true,
            "--gbuffer" => options.gbuffer = true,
            other if other.starts_with("--") => log::warn!("Ignoring unknown flag {}", other),
            path => options.model = Some(PathBuf::from(path)),
        }
    }
    options
}

const OBJECT_POSITIONS: [[f32; 3]; 3] = [[0.0, 1.0, -2.0], [0.0, 1.0, 0.0], [0.0, 1.0, 2.0]];

fn build_scene(ctx: &std::sync::Arc<GpuContext>, width: u32, height: u32, options: &Options) -> Result<Scene> {
    let mut scene = Scene::new(ctx, width, height)?;
    let white = [1.0, 1.0, 1.0, 1.0];

    let model = match &options.model {
        Some(path) => Some(load_obj(path)?),
        None => None,
    };

    for (i, position) in OBJECT_POSITIONS.iter().enumerate() {
        let geometry = match &model {
            Some(model) => model.clone(),
            None if i == 1 => generate_cube(),
            None => generate_sphere(48, 24),
        };
        let mut object = Object::new(ctx, &geometry, white)?;
        object.set_translation(Vector3::from(*position));
        scene.add_object(object)?;
    }
    scene.add_object(Object::new(ctx, &generate_plane(20.0, 20.0, 1, 1), white)?)?;

    scene.add_light(AmbientLight::new(ctx)?);
    let colors = [
        Vector3::new(0.5, 0.0, 0.0),
        Vector3::new(0.0, 0.5, 0.0),
        Vector3::new(0.0, 0.0, 0.5),
    ];
    for (z, color) in [-2.0, 0.0, 2.0].into_iter().zip(colors) {
        scene.add_light(SpotLight::new(
            ctx,
            Point3::new(0.0, 3.0, z),
            Point3::new(0.0, 0.0, z),
            Vector3::new(0.0, 0.0, -1.0),
            2.0,
            color,
        )?);
    }

    if options.dof {
        scene.add_post_filter(DofFilter::new(ctx, width, height, 3.4)?);
    }
    if options.bloom {
        scene.add_post_filter(BlurFilter::new(ctx, width, height)?);
    }
    if options.gbuffer {
        scene.add_post_filter(GBufferPreview::new(ctx, width, height)?);
    }

    log::info!("Frame plan: {}", scene.frame_plan());
    Ok(scene)
}

fn main() -> anyhow::Result<()> {
    env_logger::init();

    let options = parse_args();
    let config = RendererConfig::from_env().with_title("Penumbra - Spot Lights");
    let mut orbit = OrbitCamera::default();

    PenumbraApp::new(config)?
        .with_setup(move |ctx, width, height| build_scene(ctx, width, height, &options))
        .with_update(move |scene, frame| {
            scene.set_camera_perspective(Deg(60.0), frame.aspect(), 0.01, 100.0);
            scene.set_camera_look_at(orbit.eye(), orbit.target, orbit.up);
            orbit.advance();
        })
        .run()
        .context("spot light demo failed")
}
