/// Command-line front end: builds a scene, renders one frame per rotation
/// angle and writes each as `frame_<angle>.png`.
use anyhow::{Context, Result};
use clap::Parser;
use glam::{Mat4, Vec3};
use mimalloc::MiMalloc;
use noise::{NoiseFn, Perlin};
use soft_renderer::mesh::obj::load_obj;
use soft_renderer::*;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::time::Instant;

#[global_allocator]
static GLOBAL: MiMalloc = MiMalloc;

#[derive(Parser, Debug)]
#[command(name = "soft_renderer", version, about)]
struct Args {
    #[arg(long, default_value_t = 800)]
    width: usize,

    #[arg(long, default_value_t = 800)]
    height: usize,

    /// Shadow map resolution (square)
    #[arg(long, default_value_t = 2048)]
    shadow_size: usize,

    /// Model rotations about +Y, in degrees; one frame per angle
    #[arg(long, value_delimiter = ',', default_values_t = [0.0, 30.0, 90.0, 180.0, 270.0])]
    angles: Vec<f32>,

    #[arg(long, default_value = ".")]
    output_dir: PathBuf,

    /// Wavefront model; a procedural cube on a ground plane is used otherwise
    #[arg(long)]
    model: Option<PathBuf>,

    #[arg(long)]
    diffuse: Option<PathBuf>,

    /// Tangent-space normal map
    #[arg(long)]
    normal_map: Option<PathBuf>,

    #[arg(long)]
    specular: Option<PathBuf>,

    /// Discard texels with low diffuse alpha
    #[arg(long, default_value_t = false)]
    alpha_test: bool,

    #[arg(long, default_value_t = false)]
    no_ssao: bool,

    #[arg(long, default_value_t = false)]
    no_culling: bool,

    /// Worker threads (defaults to available parallelism)
    #[arg(long)]
    threads: Option<usize>,

    /// Seed for the SSAO kernel and the procedural texture
    #[arg(long, default_value_t = 12345)]
    seed: u64,

    /// Log the function counters after rendering (needs the `profiling` feature)
    #[arg(long, default_value_t = false)]
    counters: bool,
}

fn main() -> Result<()> {
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("info")).init();
    let args = Args::parse();

    let pool = match args.threads {
        Some(n) => ThreadPool::new(n),
        None => ThreadPool::with_available_parallelism(),
    }
    .context("failed to start render workers")?;
    log::info!("{} render workers", pool.thread_count());

    let (mesh, material, ground) = load_assets(&args)?;

    let mut config = RendererConfig::default();
    config.rasterizer.backface_culling = !args.no_culling;
    config.ssao = if args.no_ssao {
        None
    } else {
        Some(SsaoConfig {
            seed: args.seed,
            ..Default::default()
        })
    };
    let renderer = Renderer::new(config);

    let mut buffers = RenderBuffers::new(args.width, args.height, args.shadow_size, args.shadow_size)
        .with_clear_color([20, 20, 28, 255]);

    std::fs::create_dir_all(&args.output_dir)
        .with_context(|| format!("failed to create {}", args.output_dir.display()))?;

    let camera = Camera::new(Vec3::new(0.0, 0.5, 3.0), Vec3::ZERO, Vec3::Y, 3.0);
    let light_position = Vec3::ONE.normalize() * 3.0;

    FUNCTION_COUNTERS.reset();
    let start = Instant::now();
    for &angle in &args.angles {
        let mut scene = Scene::new(camera, light_position);
        scene.add_model(
            ModelInstance::new(mesh.clone(), material.clone())
                .with_transform(Mat4::from_rotation_y(angle.to_radians())),
        );
        if let Some(ground) = &ground {
            scene.add_model(ground.clone());
        }

        let stats = renderer.render(&pool, &scene, &mut buffers);
        log::info!(
            "angle {angle}: {} triangles, {} fragments, {:.2}ms",
            stats.color.triangles,
            stats.color.fragments_shaded,
            stats.total_time().as_secs_f64() * 1000.0
        );

        let path = args.output_dir.join(format!("frame_{angle}.png"));
        save_frame(&buffers, &path)?;
    }
    log::info!(
        "rendered {} frames in {:.2}ms",
        args.angles.len(),
        start.elapsed().as_secs_f64() * 1000.0
    );

    if args.counters {
        FUNCTION_COUNTERS.snapshot().log_report();
    }
    Ok(())
}

/// Mesh and material for the rotating model, plus a static ground plane for
/// the procedural scene.
fn load_assets(args: &Args) -> Result<(Arc<Mesh>, Arc<Material>, Option<ModelInstance>)> {
    let load = |path: &Option<PathBuf>| -> Result<Option<Texture>> {
        path.as_ref()
            .map(|p| Texture::from_path(p).with_context(|| format!("loading {}", p.display())))
            .transpose()
    };

    let mut material = Material::default();
    if let Some(diffuse) = load(&args.diffuse)? {
        material.diffuse = diffuse;
    }
    if let Some(normal) = load(&args.normal_map)? {
        material.normal = normal;
    }
    material.specular = load(&args.specular)?;
    material.alpha_test = args.alpha_test;

    match &args.model {
        Some(path) => {
            let mesh = load_obj(path).with_context(|| format!("loading {}", path.display()))?;
            Ok((Arc::new(mesh), Arc::new(material), None))
        }
        None => {
            if args.diffuse.is_none() {
                material.diffuse = marble_texture(args.seed, 256);
            }
            if args.specular.is_none() {
                material.specular = Some(Texture::solid([160, 160, 160, 255]));
            }
            let ground = ModelInstance::new(
                Arc::new(Mesh::plane(4.0)),
                Arc::new(Material::with_diffuse(Texture::solid([200, 200, 190, 255]))),
            )
            .with_transform(Mat4::from_translation(Vec3::new(0.0, -0.5, 0.0)));
            Ok((Arc::new(Mesh::cube(1.0)), Arc::new(material), Some(ground)))
        }
    }
}

/// Perlin-veined diffuse texture for the procedural cube.
fn marble_texture(seed: u64, size: u32) -> Texture {
    let perlin = Perlin::new(seed as u32);
    let scale = 8.0 / size as f64;
    Texture::from_fn(size, size, |x, y| {
        let n = perlin.get([x as f64 * scale, y as f64 * scale]);
        let vein = ((x as f64 * scale + n * 4.0).sin() * 0.5 + 0.5) as f32;
        let shade = (150.0 + 100.0 * vein) as u8;
        [shade, shade, (shade as f32 * 0.9) as u8, 255]
    })
}

fn save_frame(buffers: &RenderBuffers, path: &Path) -> Result<()> {
    perf_scope!("encode frame");
    buffers
        .color
        .to_image()
        .save(path)
        .with_context(|| format!("failed to write {}", path.display()))?;
    log::info!("wrote {}", path.display());
    Ok(())
}
