use anyhow::{Context, bail};
use clap::{Parser, Subcommand};
use donutfield_assets::{
    FsTextureSource, TextureSource, TypefaceFont, centered_text_mesh, torus_mesh,
};
use donutfield_common::MatcapId;
use donutfield_kernel::{MaterialRole, Scene, SceneConfig, populate};
use donutfield_tools::SceneInspector;
use rand::SeedableRng;
use rand::rngs::StdRng;
use std::path::PathBuf;
use tracing_subscriber::EnvFilter;

#[derive(Parser)]
#[command(name = "donutfield-cli", about = "Headless donutfield commands")]
struct Cli {
    /// Enable verbose logging
    #[arg(short, long)]
    verbose: bool,

    /// Directory holding textures/ and fonts/
    #[arg(long, default_value = "./static", global = true)]
    assets_dir: PathBuf,

    /// Scene config JSON; missing keys keep their defaults
    #[arg(long, global = true)]
    config: Option<PathBuf>,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Print version and scene defaults
    Info,
    /// Print the effective scene configuration as JSON
    Config,
    /// Scatter donuts and summarize the result
    Populate {
        /// Number of donuts
        #[arg(short, long, default_value_t = 100)]
        count: usize,
        /// RNG seed for reproducible placement
        #[arg(short, long, default_value_t = 42)]
        seed: u64,
        /// Print this many meshes
        #[arg(long, default_value_t = 5)]
        show: usize,
    },
    /// Verify that every matcap and the font load
    Assets,
    /// Build the label mesh and print its statistics
    Text {
        /// Label to extrude
        #[arg(long)]
        label: Option<String>,
    },
}

fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();

    let filter = if cli.verbose { "debug" } else { "info" };
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::new(filter))
        .init();

    let config = SceneConfig::load(cli.config.as_deref()).context("loading scene config")?;
    tracing::debug!(assets = %cli.assets_dir.display(), "donutfield-cli starting");

    match cli.command {
        Commands::Info => {
            println!("donutfield-cli v{}", env!("CARGO_PKG_VERSION"));
            println!("label: {:?}", config.label);
            println!("donuts: {} within {} units", config.donut_count, config.spread);
            println!(
                "matcaps: {}..={} (default {})",
                MatcapId::MIN,
                MatcapId::MAX,
                MatcapId::default()
            );
            let [x, y, z] = config.camera.position;
            println!(
                "camera: eye=({x}, {y}, {z}) fov={} near={} far={}",
                config.camera.fov_degrees, config.camera.near, config.camera.far
            );
            println!("pixel ratio cap: {}", config.max_pixel_ratio);
        }
        Commands::Config => {
            println!("{}", serde_json::to_string_pretty(&config)?);
        }
        Commands::Populate { count, seed, show } => {
            let mut scene = Scene::new(config.background);
            let torus = scene.add_geometry(torus_mesh(&config.torus))?;
            let mut rng = StdRng::seed_from_u64(seed);
            let instances = populate(count, torus, MaterialRole::Donut, config.spread, &mut rng);
            scene.add_instances(instances)?;

            println!("{}", SceneInspector::summary(&scene));
            for id in SceneInspector::list_meshes(&scene).into_iter().take(show) {
                if let Some(info) = SceneInspector::inspect_mesh(&scene, id) {
                    println!("  {info}");
                }
            }
        }
        Commands::Assets => {
            let source = FsTextureSource::new(&cli.assets_dir);
            let mut failures = 0;
            for id in MatcapId::ALL {
                match source.load(id) {
                    Ok(texture) => println!(
                        "matcap {id}: {}x{} asset={}",
                        texture.width, texture.height, texture.asset
                    ),
                    Err(e) => {
                        failures += 1;
                        println!("matcap {id}: FAILED {e}");
                    }
                }
            }
            let font_path = cli.assets_dir.join(&config.font_path);
            match TypefaceFont::from_path(&font_path) {
                Ok(font) => println!("font: {} ({} glyphs)", font.family, font.glyph_count()),
                Err(e) => {
                    failures += 1;
                    println!("font: FAILED {e}");
                }
            }
            if failures > 0 {
                bail!("{failures} asset(s) failed to load from {}", cli.assets_dir.display());
            }
        }
        Commands::Text { label } => {
            let label = label.unwrap_or(config.label);
            let font_path = cli.assets_dir.join(&config.font_path);
            let font = TypefaceFont::from_path(&font_path)
                .with_context(|| format!("loading {}", font_path.display()))?;
            let mesh = centered_text_mesh(&font, &label, &config.text)?;
            println!("text {label:?}: {} vertices, {} triangles", mesh.vertex_count(), mesh.triangle_count());
            if let Some(bounds) = mesh.bounds() {
                let size = bounds.size();
                let center = bounds.center();
                println!(
                    "size=({:.3}, {:.3}, {:.3}) center=({:.3}, {:.3}, {:.3})",
                    size.x, size.y, size.z, center.x, center.y, center.z
                );
            }
        }
    }

    Ok(())
}
