//! Cyberay CLI - renders the demo level progressively and writes a PNG.

use std::env;
use std::path::{Path, PathBuf};
use std::time::Instant;

use anyhow::{anyhow, bail, Context, Result};
use cyberay::prelude::*;
use image::imageops::{self, FilterType};
use tracing_subscriber::prelude::*;
use tracing_subscriber::EnvFilter;

const DEFAULT_CONFIG: &str = "cyberay.json";
const DEFAULT_OUTPUT: &str = "cyberay.png";
const DEFAULT_PASSES: u32 = 16;

/// Command-line overrides on top of the config file.
struct Options {
    config: Option<PathBuf>,
    output: PathBuf,
    passes: u32,
    size: Option<(u32, u32)>,
    threads: Option<usize>,
    max_depth: Option<u32>,
    samples: Option<u32>,
    scale: Option<f32>,
    verbosity: &'static str,
}

impl Default for Options {
    fn default() -> Self {
        Self {
            config: None,
            output: PathBuf::from(DEFAULT_OUTPUT),
            passes: DEFAULT_PASSES,
            size: None,
            threads: None,
            max_depth: None,
            samples: None,
            scale: None,
            verbosity: "info",
        }
    }
}

fn main() {
    let args: Vec<String> = env::args().collect();
    let opts = match parse_args(&args[1..]) {
        Ok(Some(opts)) => opts,
        Ok(None) => {
            print_help(&args[0]);
            return;
        }
        Err(e) => {
            eprintln!("Error: {e}");
            eprintln!("Try '{} -h' for usage.", args[0]);
            std::process::exit(1);
        }
    };

    init_tracing(opts.verbosity);

    if let Err(e) = run(&opts) {
        tracing::error!("{e:#}");
        std::process::exit(1);
    }
}

fn init_tracing(default_level: &str) {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default_level));
    tracing_subscriber::registry()
        .with(tracing_subscriber::fmt::layer().with_target(false))
        .with(filter)
        .init();
}

fn print_help(prog: &str) {
    println!("Cyberay - interactive path tracer");
    println!();
    println!("Usage: {} [options]", prog);
    println!();
    println!("Options:");
    println!("  -s, --size <WxH>     Framebuffer size");
    println!("  -t, --threads <N>    Worker threads (0 = one per CPU)");
    println!("  --iter <N>           Maximum path depth");
    println!("  -S, --samples <N>    Primary rays per pixel per pass");
    println!("  --scale <F>          Output scale factor");
    println!("  -p, --passes <N>     Progressive passes to render (default {})", DEFAULT_PASSES);
    println!("  -o, --output <FILE>  Output PNG (default {})", DEFAULT_OUTPUT);
    println!("  -c, --config <FILE>  Config file (default {} if present)", DEFAULT_CONFIG);
    println!("  -v, --verbose        Debug output");
    println!("  -q, --quiet          Warnings and errors only");
    println!("  -h, --help           Show this help");
}

/// Returns `None` when help was requested.
fn parse_args(args: &[String]) -> Result<Option<Options>> {
    let mut opts = Options::default();
    let mut it = args.iter();

    while let Some(arg) = it.next() {
        let arg = arg.as_str();
        let mut value = |name: &str| {
            it.next()
                .map(String::as_str)
                .ok_or_else(|| anyhow!("{name} expects an argument"))
        };
        match arg {
            "-s" | "--size" => opts.size = Some(parse_size(value(arg)?)?),
            "-t" | "--threads" => opts.threads = Some(parse_num(arg, value(arg)?)?),
            "--iter" => opts.max_depth = Some(parse_num(arg, value(arg)?)?),
            "-S" | "--samples" => opts.samples = Some(parse_num(arg, value(arg)?)?),
            "--scale" => opts.scale = Some(parse_num(arg, value(arg)?)?),
            "-p" | "--passes" => opts.passes = parse_num(arg, value(arg)?)?,
            "-o" | "--output" => opts.output = PathBuf::from(value(arg)?),
            "-c" | "--config" => opts.config = Some(PathBuf::from(value(arg)?)),
            "-v" | "--verbose" => opts.verbosity = "debug",
            "-q" | "--quiet" => opts.verbosity = "warn",
            "-h" | "--help" => return Ok(None),
            other => bail!("unrecognized option: {other}"),
        }
    }
    Ok(Some(opts))
}

fn parse_num<T: std::str::FromStr>(opt: &str, s: &str) -> Result<T> {
    s.parse().map_err(|_| anyhow!("{opt}: invalid number '{s}'"))
}

fn parse_size(s: &str) -> Result<(u32, u32)> {
    let (w, h) = s
        .split_once(['x', 'X'])
        .ok_or_else(|| anyhow!("-s: expected <width>x<height>, got '{s}'"))?;
    Ok((parse_num("-s", w)?, parse_num("-s", h)?))
}

fn load_config(opts: &Options) -> Result<RenderConfig> {
    let mut config = match &opts.config {
        Some(path) => RenderConfig::load(path).with_context(|| format!("loading {}", path.display()))?,
        None if Path::new(DEFAULT_CONFIG).exists() => {
            RenderConfig::load(DEFAULT_CONFIG).with_context(|| format!("loading {DEFAULT_CONFIG}"))?
        }
        None => RenderConfig::default(),
    };

    if let Some((w, h)) = opts.size {
        config.width = w;
        config.height = h;
    }
    if let Some(n) = opts.threads {
        config.threads = n;
    }
    if let Some(n) = opts.max_depth {
        config.max_depth = n;
    }
    if let Some(n) = opts.samples {
        config.samples = n;
    }
    if let Some(f) = opts.scale {
        config.scale = f;
    }
    config.validate()?;
    Ok(config)
}

fn run(opts: &Options) -> Result<()> {
    tracing::info!(
        "cyberay (built {} {})",
        env!("CYBERAY_BUILD_DATE"),
        env!("CYBERAY_BUILD_TIME")
    );

    let config = load_config(opts)?;
    tracing::debug!(?config, "configuration");

    tracing::info!("Loading level");
    let scene = Scene::new(demo::level(), demo::BACKGROUND)?;
    let stats = scene.static_bvh().stats();
    tracing::info!(
        faces = scene.triangle_count(),
        nodes = stats.nodes,
        leaves = stats.leaves,
        depth = stats.max_depth,
        "level ready"
    );

    let fov = config.fov;
    let mut ctx = RenderContext::new(config, scene)?;
    ctx.set_camera(Camera::new(demo::camera_xform(), fov));

    let start = Instant::now();
    for pass in 0..opts.passes {
        let t0 = Instant::now();
        ctx.render()?;
        tracing::info!(
            "pass {}/{}: {} msec",
            pass + 1,
            opts.passes,
            t0.elapsed().as_millis()
        );
    }
    tracing::info!("{} passes in {:.2} sec", opts.passes, start.elapsed().as_secs_f32());

    save_image(ctx.framebuffer(), ctx.config().output_size(), &opts.output).with_context(|| format!("writing {}", opts.output.display()))?;
    tracing::info!("Wrote {}", opts.output.display());
    Ok(())
}

/// HDR formats get the linear accumulation, everything else 8-bit sRGB.
/// The image is resampled when `size` differs from the framebuffer.
fn save_image(fb: &Framebuffer, size: (u32, u32), path: &Path) -> Result<()> {
    let ext = path.extension().and_then(|e| e.to_str()).unwrap_or("").to_ascii_lowercase();
    let (w, h) = size;
    let scaled = (w, h) != (fb.width(), fb.height());
    match ext.as_str() {
        "exr" | "hdr" => {
            let img = fb.to_rgb32f().ok_or_else(|| anyhow!("framebuffer size mismatch"))?;
            if scaled {
                imageops::resize(&img, w, h, FilterType::Triangle).save(path)?;
            } else {
                img.save(path)?;
            }
        }
        _ => {
            let img = fb.to_rgb8();
            if scaled {
                imageops::resize(&img, w, h, FilterType::Triangle).save(path)?;
            } else {
                img.save(path)?;
            }
        }
    }
    Ok(())
}
