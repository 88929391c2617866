use clap::{Parser, Subcommand, ValueEnum};
use std::path::{Path, PathBuf};
use thumbcache::config::{self, ThumbConfig};
use thumbcache::imaging::{ImageKind, ResizeMode};
use thumbcache::request::RequestSpec;
use thumbcache::{Thumbnailer, batch, output};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

#[derive(Parser)]
#[command(name = "thumbcache")]
#[command(about = "On-demand thumbnails with a content-keyed disk cache")]
#[command(long_about = "\
On-demand thumbnails with a content-keyed disk cache

Sources are local paths or http(s) URLs. Each thumbnail is written once,
named by a hash of the source, its modification time and every request
parameter; repeating a request returns the cached file without decoding.

Sizing (combine as needed):
  --width/--height       missing side follows the source aspect ratio
  --long-side/--short-side
                         pin the source's longer or shorter side
  --crop                 fill the box exactly, trimming one axis
  --fit                  shrink to fit inside the box
  --extrapolate          allow upscaling past the source size

Run 'thumbcache gen-config' to generate a documented thumbcache.toml.")]
#[command(version)]
struct Cli {
    /// Directory holding thumbcache.toml
    #[arg(long, default_value = ".", global = true)]
    config: PathBuf,

    /// Thumbnail cache directory (overrides cache_dir from the config; an
    /// unconfigured remote cache moves to <DIR>/remote)
    #[arg(long, global = true)]
    cache_dir: Option<PathBuf>,

    /// Debug logging (RUST_LOG takes precedence)
    #[arg(short, long, global = true)]
    verbose: bool,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand)]
enum Command {
    /// Produce (or find) one thumbnail and print its reference
    Thumb(ThumbArgs),
    /// Run every [[thumb]] request in a TOML batch file
    Batch {
        /// Batch file
        file: PathBuf,
    },
    /// Print a stock thumbcache.toml with all options documented
    GenConfig,
}

#[derive(Clone, Copy, ValueEnum)]
enum OutputType {
    Gif,
    Jpeg,
    Png,
}

impl From<OutputType> for ImageKind {
    fn from(t: OutputType) -> Self {
        match t {
            OutputType::Gif => ImageKind::Gif,
            OutputType::Jpeg => ImageKind::Jpeg,
            OutputType::Png => ImageKind::Png,
        }
    }
}

#[derive(clap::Args)]
struct ThumbArgs {
    /// Local path or http(s) URL
    source: String,

    #[arg(long)]
    width: Option<u32>,

    #[arg(long)]
    height: Option<u32>,

    /// Pin the longer source side to this size
    #[arg(long, conflicts_with = "short_side")]
    long_side: Option<u32>,

    /// Pin the shorter source side to this size
    #[arg(long)]
    short_side: Option<u32>,

    /// Fill width x height exactly, trimming the excess
    #[arg(long, conflicts_with = "fit")]
    crop: bool,

    /// Fit inside width x height
    #[arg(long)]
    fit: bool,

    /// Allow upscaling beyond the source size
    #[arg(long)]
    extrapolate: bool,

    /// Apply an unsharp mask after resizing
    #[arg(long)]
    sharpen: bool,

    /// Output format (default: same as source)
    #[arg(long = "type", value_enum)]
    output_type: Option<OutputType>,

    /// JPEG quality 1-100 (default from config)
    #[arg(long, value_parser = clap::value_parser!(u8).range(1..=100))]
    quality: Option<u8>,

    /// File name stem instead of the cache key
    #[arg(long)]
    name: Option<String>,

    /// Image to use when the source is unavailable
    #[arg(long)]
    default: Option<PathBuf>,

    /// Prefix for the printed reference
    #[arg(long)]
    base_url: Option<String>,

    /// Seconds to trust a downloaded copy (default from config)
    #[arg(long)]
    cache_lifetime: Option<u64>,

    /// Re-download a stale remote source without asking the server
    #[arg(long)]
    force_refresh: bool,
}

impl ThumbArgs {
    fn into_spec(self) -> RequestSpec {
        let mode = if self.crop {
            Some(ResizeMode::Crop)
        } else if self.fit {
            Some(ResizeMode::FitIn)
        } else {
            None
        };
        RequestSpec {
            source: self.source,
            width: self.width,
            height: self.height,
            long_side: self.long_side,
            short_side: self.short_side,
            mode,
            extrapolate: self.extrapolate,
            sharpen: self.sharpen,
            output_type: self.output_type.map(ImageKind::from),
            quality: self.quality,
            name: self.name,
            default: self.default,
            base_url: self.base_url,
            cache_lifetime: self.cache_lifetime,
            force_refresh: self.force_refresh,
        }
    }
}

fn main() -> Result<(), Box<dyn std::error::Error>> {
    let cli = Cli::parse();
    init_logging(cli.verbose);

    match cli.command {
        Command::Thumb(args) => {
            let config = load_config(&cli.config, cli.cache_dir)?;
            let thumbnailer = Thumbnailer::new(config)?;
            let result = thumbnailer.thumb(&args.into_spec().into_request())?;
            output::print_thumb_output(result.as_ref());
        }
        Command::Batch { file } => {
            let config = load_config(&cli.config, cli.cache_dir)?;
            let specs = batch::load_batch(&file)?;
            init_thread_pool(&config.processing);
            let thumbnailer = Thumbnailer::new(config)?;
            let report = batch::run_batch(&thumbnailer, specs);
            output::print_batch_report(&report);
            let failures = report.failures();
            if failures > 0 {
                return Err(format!("{failures} request(s) failed").into());
            }
        }
        Command::GenConfig => {
            print!("{}", config::stock_config_toml());
        }
    }

    Ok(())
}

/// Load `thumbcache.toml` and apply command-line overrides.
fn load_config(
    dir: &Path,
    cache_dir: Option<PathBuf>,
) -> Result<ThumbConfig, config::ConfigError> {
    let mut config = config::load_config(dir)?;
    if let Some(cache_dir) = cache_dir {
        config.relocate_cache(cache_dir);
    }
    Ok(config)
}

/// Structured logs go to stderr; stdout carries only command output.
fn init_logging(verbose: bool) {
    let env_filter = if verbose {
        "thumbcache=debug"
    } else {
        "thumbcache=info"
    };

    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| env_filter.into()),
        )
        .with(tracing_subscriber::fmt::layer().with_writer(std::io::stderr))
        .init();
}

/// Initialize the rayon thread pool based on processing config.
///
/// Caps at the number of available CPU cores; the user can constrain down, not up.
fn init_thread_pool(processing: &config::ProcessingConfig) {
    let threads = config::effective_threads(processing);
    rayon::ThreadPoolBuilder::new()
        .num_threads(threads)
        .build_global()
        .ok();
}
