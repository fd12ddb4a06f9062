use clap::{Parser, Subcommand};
use responsive_picture::config::{self, Config};
use responsive_picture::picture::{PictureAssembler, PictureRequest};
use responsive_picture::ratio::{self, RatioSpec};
use responsive_picture::sizes::{self, BreakpointKey, ContainerSpec, SizesRequest};
use responsive_picture::source::{ImageSource, StaticImage, StaticImageHost};
use responsive_picture::{error::InputError, markup};
use serde::Deserialize;
use std::path::PathBuf;
use tracing_subscriber::EnvFilter;

#[derive(Parser)]
#[command(name = "responsive-picture")]
#[command(about = "Responsive <picture> markup and sizes attributes")]
#[command(long_about = "\
Responsive <picture> markup and sizes attributes

Computes the geometry behind responsive images: display aspect ratios,
focus-aware object-position, and the `sizes` ladder derived from a grid of
breakpoints and column spans.

Examples:

  responsive-picture sizes --classes \"md:6 lg:4\"
  responsive-picture sizes --share lg=0.5 --share default=1 --no-container
  responsive-picture picture --request hero.json
  responsive-picture gen-config > config.toml

A picture request file holds the pre-resolved image and the render options:

  {
    \"image\":   { \"width\": 1600, \"height\": 900, \"extension\": \"jpg\",
                 \"url\": \"/media/hero.jpg\", \"srcset\": \"...\" },
    \"request\": { \"ratio\": \"16/9\", \"lazy\": true, \"sizes\": \"lg:8\" }
  }

Set RUST_LOG=debug to trace rendering decisions.")]
#[command(version)]
struct Cli {
    /// Directory containing config.toml (stock defaults when omitted)
    #[arg(long, global = true)]
    config: Option<PathBuf>,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand)]
enum Command {
    /// Render a sizes attribute
    Sizes(SizesArgs),
    /// Render markup for one image described in a JSON file
    Picture {
        /// JSON file with `image` and `request` objects
        #[arg(long)]
        request: PathBuf,
    },
    /// Print a stock config.toml with all options documented
    GenConfig,
}

#[derive(clap::Args)]
struct SizesArgs {
    /// Column-span tokens, e.g. "md:6 lg:4"
    #[arg(long)]
    classes: Option<String>,

    /// Explicit share per breakpoint, e.g. `lg=0.5` (repeatable)
    #[arg(long = "share", value_parser = parse_share)]
    shares: Vec<(BreakpointKey, f64)>,

    /// Container width in pixels, or a named width from config
    #[arg(long, conflicts_with = "no_container")]
    container_width: Option<String>,

    /// Viewport-relative widths only
    #[arg(long)]
    no_container: bool,

    /// Intrinsic image width
    #[arg(long, default_value_t = 0)]
    width: u32,

    /// Intrinsic image height
    #[arg(long, default_value_t = 0)]
    height: u32,

    /// Display ratio: "16/9", "auto", or a number
    #[arg(long, value_parser = parse_ratio)]
    ratio: Option<RatioSpec>,
}

#[derive(Deserialize)]
#[serde(deny_unknown_fields)]
struct PictureJob {
    image: StaticImage,
    #[serde(default)]
    request: PictureRequest,
}

fn main() -> Result<(), Box<dyn std::error::Error>> {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::from_default_env())
        .with_writer(std::io::stderr)
        .init();

    let cli = Cli::parse();

    match cli.command {
        Command::Sizes(args) => {
            let config = load(cli.config.as_ref())?;
            let request = sizes_request(&args)?;
            println!("{}", sizes::render(&config.grid, &request)?);
        }
        Command::Picture { request } => {
            let config = load(cli.config.as_ref())?;
            let content = std::fs::read_to_string(&request)?;
            let job: PictureJob = serde_json::from_str(&content)?;

            let mut host = StaticImageHost::new();
            host.insert("image", job.image);
            let output = PictureAssembler::new(&config, &host)
                .render(&ImageSource::Path("image".to_string()), &job.request)?;
            println!("{}", markup::render_optional(output.as_ref()).into_string());
        }
        Command::GenConfig => {
            print!("{}", config::stock_config_toml());
        }
    }

    Ok(())
}

fn load(dir: Option<&PathBuf>) -> Result<Config, config::ConfigError> {
    match dir {
        Some(dir) => config::load_config(dir),
        None => Ok(Config::default()),
    }
}

fn sizes_request(args: &SizesArgs) -> Result<SizesRequest, Box<dyn std::error::Error>> {
    let ratio = match args.ratio {
        Some(spec) => ratio::resolve(spec, args.width, args.height)?,
        None => None,
    };
    let container = match (&args.container_width, args.no_container) {
        (_, true) => ContainerSpec::Off,
        (Some(width), false) => match width.parse::<u32>() {
            Ok(px) => ContainerSpec::Width(px),
            Err(_) => ContainerSpec::Named(width.clone()),
        },
        (None, false) => ContainerSpec::Inherit,
    };
    let spans = match &args.classes {
        Some(classes) => sizes::parse_column_spans(classes)?,
        None => Vec::new(),
    };

    Ok(SizesRequest {
        width: args.width,
        height: args.height,
        ratio,
        container,
        shares: args.shares.clone(),
        spans,
    })
}

/// `lg=0.5` or `1200=0.5`.
fn parse_share(s: &str) -> Result<(BreakpointKey, f64), String> {
    let (key, share) = s
        .split_once('=')
        .ok_or_else(|| format!("expected breakpoint=share, got '{s}'"))?;
    let share: f64 = share
        .trim()
        .parse()
        .map_err(|_| format!("invalid share '{share}'"))?;
    let key = match key.trim().parse::<BreakpointKey>() {
        Ok(key) => key,
        Err(never) => match never {},
    };
    Ok((key, share))
}

fn parse_ratio(s: &str) -> Result<RatioSpec, InputError> {
    match s.parse::<f64>() {
        Ok(value) => RatioSpec::from_number(value),
        Err(_) => s.parse(),
    }
}
