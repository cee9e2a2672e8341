use std::path::PathBuf;

use clap::Args;
use glam::{Mat4, Vec3};
use indicatif::{ProgressBar, ProgressIterator, ProgressStyle};
use log::{info, warn};
use thiserror::Error;

use hydrolex_fluids::{
    body::BodyStore,
    grid::Bounds,
    lattice::Aabb,
    particle::{BoundaryParticle, FluidParticle, ParticleKind},
    scene::{Scene, Volume},
    sph::SphParams,
    SphError,
};
use hydrolex_io::{
    decode::{DecodingError, FluidDataDecoder},
    encode::{EncodingError, FluidDataEncoder},
    SceneFrame,
};

#[derive(Debug, Clone, Args)]
pub struct RunArgs {
    /// Directory to record frames into. Nothing is recorded when omitted.
    #[arg(short, long)]
    pub output: Option<PathBuf>,
    #[arg(long, default_value_t = 60)]
    pub fps: u32,
    /// Simulated time in seconds.
    #[arg(long, default_value_t = 5.0)]
    pub duration: f32,
    /// Solver steps per recorded frame.
    #[arg(long, default_value_t = 4)]
    pub substeps: u32,
    /// Particle radius. Sets both packing and smoothing length.
    #[arg(long, default_value_t = 0.05)]
    pub radius: f32,
    #[arg(long, default_value_t = 1000.0)]
    pub rest_density: f32,
    #[arg(long, default_value_t = 2000.0)]
    pub gas_constant: f32,
    #[arg(long, default_value_t = 0.5)]
    pub viscosity: f32,
    #[arg(long, default_value_t = 4.0)]
    pub kernel_radius_rate: f32,
}

#[derive(Debug, Error)]
pub enum RunError {
    #[error(transparent)]
    Sph(#[from] SphError),
    #[error(transparent)]
    Encoding(#[from] EncodingError),
    #[error(transparent)]
    Decoding(#[from] DecodingError),
    #[error(transparent)]
    Template(#[from] indicatif::style::TemplateError),
}

/// A closed box of boundary particles with a block of water in one corner.
fn dam_break(args: &RunArgs, size: Vec3) -> Scene {
    let params = SphParams {
        kernel_radius_rate: args.kernel_radius_rate,
        ..Default::default()
    };

    let mut scene = Scene::new(params);

    let r = args.radius;
    let mass = args.rest_density * (2.0 * r).powi(3);

    let water = ParticleKind::Fluid {
        particle: FluidParticle {
            radius: r,
            rest_density: args.rest_density,
            viscosity: args.viscosity,
            gas_constant: args.gas_constant,
        },
        mass,
    };
    let wall = ParticleKind::Boundary(BoundaryParticle {
        radius: r,
        mass,
        rest_density: args.rest_density,
    });

    let t = 2.0 * r;
    let slabs = [
        // Floor and ceiling.
        Aabb::new(Vec3::new(-t, -t, -t), Vec3::new(size.x + 2.0 * t, t, size.z + 2.0 * t)),
        Aabb::new(Vec3::new(-t, size.y, -t), Vec3::new(size.x + 2.0 * t, t, size.z + 2.0 * t)),
        // Walls along x.
        Aabb::new(Vec3::new(-t, 0.0, -t), Vec3::new(t, size.y, size.z + 2.0 * t)),
        Aabb::new(Vec3::new(size.x, 0.0, -t), Vec3::new(t, size.y, size.z + 2.0 * t)),
        // Walls along z.
        Aabb::new(Vec3::new(0.0, 0.0, -t), Vec3::new(size.x, size.y, t)),
        Aabb::new(Vec3::new(0.0, 0.0, size.z), Vec3::new(size.x, size.y, t)),
    ];

    for bounds in slabs {
        scene.add_volume(Volume::new(bounds, Mat4::IDENTITY, wall));
    }

    let water_width = 0.4;
    let water_height = 0.6;
    scene.add_volume(Volume::new(
        Aabb::new(Vec3::ZERO, Vec3::new(water_width * size.x, water_height * size.y, size.z)),
        Mat4::IDENTITY,
        water,
    ));

    scene
}

pub fn run(args: RunArgs) -> Result<(), RunError> {
    let size = Vec3::new(2.0, 1.0, 0.5);
    let mut scene = dam_break(&args, size);
    let mut bodies = BodyStore::new();

    let report = scene.spawn_pending(&mut bodies)?;
    if let Some(&(_, e)) = report.failed.first() {
        return Err(e.into());
    }
    info!("spawned {} particles ({} fluid, {} boundary)", report.spawned, scene.fluid().len(), scene.boundary().len());

    let frames = (args.duration * args.fps as f32).ceil() as u64;
    let substeps = args.substeps.max(1);
    let dt = 1.0 / (args.fps as f32 * substeps as f32);

    let mut encoder = match &args.output {
        Some(path) => {
            let mut encoder = FluidDataEncoder::new(path.clone(), frames, args.fps)?;
            encoder.encode_metadata(&scene)?;
            Some(encoder)
        }
        None => None,
    };

    let domain = Bounds {
        min: Vec3::ZERO,
        max: size,
    };

    let bar_template = "Running Simulation {spinner:.green} [{elapsed}] [{bar:50.white/white}] {pos}/{len} ({eta})";
    let style = ProgressStyle::with_template(bar_template)?
        .progress_chars("=> ").tick_chars("⠋⠙⠹⠸⠼⠴⠦⠧⠇⠏");
    let progress = ProgressBar::new(frames).with_style(style);

    let mut degenerate = 0;

    for _frame in (0..frames).progress_with(progress) {
        for _ in 0..substeps {
            let report = scene.step(dt, &mut bodies);
            degenerate += report.diagnostics.len();

            bodies.integrate(dt);
            bodies.confine(domain);
        }

        if let Some(encoder) = encoder.as_mut() {
            encoder.encode_frame(&SceneFrame { scene: &scene, bodies: &bodies })?;
        }
    }

    if degenerate > 0 {
        warn!("{degenerate} particle updates were skipped for zero density");
    }

    if let Some(encoder) = encoder {
        info!("recorded {frames} frames to {}", encoder.path().display());
    }

    Ok(())
}

pub fn print_info(path: PathBuf) -> Result<(), RunError> {
    let mut decoder = FluidDataDecoder::new(path);
    let meta = decoder.decode_metadata()?;

    println!("fps:                {}", meta.fps);
    println!("frames:             {}", meta.num_frames);
    println!("kernel radius rate: {}", meta.kernel_radius_rate);
    println!("gravity:            {}", meta.gravity);

    if let Some(frame) = decoder.decode_frame()? {
        println!("particles:          {}", frame.positions.len());
    }

    Ok(())
}
