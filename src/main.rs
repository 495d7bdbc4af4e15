use clap::{ArgAction, Parser, Subcommand, ValueEnum};
use product_canvas::batch::{BatchOptions, BatchRunner};
use product_canvas::imaging::{Remover, RustBackend};
use product_canvas::process::ImageProcessor;
use product_canvas::{config, inputs, output, presets};
use std::path::PathBuf;
use std::process::ExitCode;
use tracing_subscriber::EnvFilter;

#[derive(Parser)]
#[command(name = "product-canvas")]
#[command(about = "Normalize product photos onto fixed-size canvases")]
#[command(long_about = "\
Normalize product photos onto fixed-size canvases

Each image is keyed off its background, cropped to the product, scaled so the
product covers a fixed share of the canvas, centered and saved as PNG or JPEG.
Inputs may be image files, directories or ZIP archives.

Settings are layered, later layers win:

  stock defaults → --preset NAME → --config FILE → command-line flags

Run 'product-canvas presets' to list presets and 'product-canvas gen-config'
to generate a documented config.toml.")]
#[command(version)]
struct Cli {
    /// Log more (-v info, -vv debug, -vvv trace). RUST_LOG overrides.
    #[arg(short, long, action = ArgAction::Count, global = true)]
    verbose: u8,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand)]
enum Command {
    /// Process images and directories into an output directory
    Process(ProcessArgs),
    /// List the built-in presets
    Presets,
    /// Print a config.toml with all options documented
    GenConfig {
        /// Print the resolved settings of a preset instead of the stock file
        #[arg(long)]
        preset: Option<String>,
    },
}

#[derive(Clone, Copy, ValueEnum)]
enum FormatArg {
    Png,
    #[value(alias = "jpg")]
    Jpeg,
}

#[derive(Clone, Copy, ValueEnum)]
enum RemoverArg {
    EdgeKey,
    Model,
}

#[derive(clap::Args)]
struct ProcessArgs {
    /// Image files, directories (searched recursively) or ZIP archives
    #[arg(required = true)]
    inputs: Vec<PathBuf>,

    /// Output directory
    #[arg(short, long, default_value = "output")]
    output: PathBuf,

    /// Config file (TOML)
    #[arg(long)]
    config: Option<PathBuf>,

    /// Start from a named preset
    #[arg(short, long)]
    preset: Option<String>,

    /// Canvas width in pixels
    #[arg(short = 'W', long)]
    width: Option<u32>,

    /// Canvas height in pixels
    #[arg(short = 'H', long)]
    height: Option<u32>,

    /// Keep the original background
    #[arg(long)]
    no_bg_removal: bool,

    /// Background remover (model needs the `model` build feature)
    #[arg(long, value_enum)]
    remover: Option<RemoverArg>,

    /// Cached model id or model directory for --remover model
    #[arg(long)]
    model: Option<String>,

    /// Use the whole image instead of cropping to the product
    #[arg(long)]
    no_auto_crop: bool,

    /// Share of the canvas the product should cover, in (0, 1]
    #[arg(long)]
    fill_ratio: Option<f64>,

    /// Margin kept around the product when cropping, in pixels
    #[arg(long)]
    padding: Option<u32>,

    /// Minimum length of the product's longer edge, in pixels
    #[arg(long)]
    min_dimension: Option<u32>,

    /// Output format
    #[arg(long, value_enum, ignore_case = true)]
    format: Option<FormatArg>,

    /// PNG compression level
    #[arg(long, value_parser = clap::value_parser!(u8).range(0..=9))]
    compress: Option<u8>,

    /// JPEG quality
    #[arg(long, value_parser = clap::value_parser!(u8).range(1..=100))]
    quality: Option<u8>,

    /// Skip adaptive PNG filtering (faster, larger files)
    #[arg(long)]
    no_optimize: bool,

    /// Parallel workers (default: number of CPU cores)
    #[arg(short, long)]
    jobs: Option<usize>,

    /// Write a JSON report of every outcome
    #[arg(long)]
    report: Option<PathBuf>,

    /// Write the resolved settings as a config file
    #[arg(long)]
    save_config: Option<PathBuf>,
}

impl ProcessArgs {
    /// Command-line flags as the top config layer. Only flags that were given
    /// appear, so lower layers keep everything else.
    fn overrides(&self) -> toml::Value {
        let mut processing = toml::Table::new();
        let mut set = |key: &str, value: toml::Value| {
            processing.insert(key.to_string(), value);
        };
        if let Some(w) = self.width {
            set("target_width", toml::Value::Integer(w.into()));
        }
        if let Some(h) = self.height {
            set("target_height", toml::Value::Integer(h.into()));
        }
        if self.no_bg_removal {
            set("remove_background", toml::Value::Boolean(false));
        }
        if self.no_auto_crop {
            set("auto_crop", toml::Value::Boolean(false));
        }
        if let Some(ratio) = self.fill_ratio {
            set("fill_ratio", toml::Value::Float(ratio));
        }
        if let Some(padding) = self.padding {
            set("crop_padding", toml::Value::Integer(padding.into()));
        }
        if let Some(min) = self.min_dimension {
            set("min_dimension", toml::Value::Integer(min.into()));
        }
        if let Some(format) = self.format {
            let name = match format {
                FormatArg::Png => "png",
                FormatArg::Jpeg => "jpeg",
            };
            set("output_format", toml::Value::String(name.to_string()));
        }
        if let Some(level) = self.compress {
            set("compress_level", toml::Value::Integer(level.into()));
        }
        if let Some(quality) = self.quality {
            set("jpeg_quality", toml::Value::Integer(quality.into()));
        }
        if self.no_optimize {
            set("optimize", toml::Value::Boolean(false));
        }

        let mut remover = toml::Table::new();
        if let Some(kind) = self.remover {
            let name = match kind {
                RemoverArg::EdgeKey => "edge_key",
                RemoverArg::Model => "model",
            };
            remover.insert("kind".into(), toml::Value::String(name.to_string()));
        }
        if let Some(model) = &self.model {
            remover.insert("model".into(), toml::Value::String(model.clone()));
        }

        let mut root = toml::Table::new();
        root.insert("processing".into(), toml::Value::Table(processing));
        if !remover.is_empty() {
            root.insert("remover".into(), toml::Value::Table(remover));
        }
        if let Some(jobs) = self.jobs {
            let mut batch = toml::Table::new();
            batch.insert(
                "max_processes".into(),
                toml::Value::Integer(i64::try_from(jobs).unwrap_or(i64::MAX)),
            );
            root.insert("batch".into(), toml::Value::Table(batch));
        }
        toml::Value::Table(root)
    }
}

fn main() -> Result<ExitCode, Box<dyn std::error::Error>> {
    let cli = Cli::parse();
    init_tracing(cli.verbose);

    match cli.command {
        Command::Process(args) => run_process(&args),
        Command::Presets => {
            output::print_presets(presets::PRESETS);
            Ok(ExitCode::SUCCESS)
        }
        Command::GenConfig { preset } => {
            match preset {
                Some(name) => {
                    let resolved = config::load_config(Some(name.as_str()), None, None)?;
                    print!("{}", resolved.to_toml()?);
                }
                None => print!("{}", config::stock_config_toml()),
            }
            Ok(ExitCode::SUCCESS)
        }
    }
}

fn run_process(args: &ProcessArgs) -> Result<ExitCode, Box<dyn std::error::Error>> {
    let resolved = config::load_config(
        args.preset.as_deref(),
        args.config.as_deref(),
        Some(args.overrides()),
    )?;
    if let Some(path) = &args.save_config {
        std::fs::write(path, resolved.to_toml()?)?;
    }

    // Holds the directories archives were unpacked into until the batch ends.
    let collected = inputs::collect_images(&args.inputs);
    output::print_config(&resolved.processing);
    output::print_skipped(&collected.skipped);
    if collected.images.is_empty() {
        return Err("no supported images found in the given paths".into());
    }

    let backend = RustBackend::new();
    let remover = Remover::build(resolved.remover.kind, resolved.remover.model.as_deref())?;
    tracing::info!(remover = %resolved.remover.kind, "background remover ready");
    let processor = ImageProcessor::new(&backend, &remover, &resolved.processing);
    let runner = BatchRunner::new(
        processor,
        BatchOptions {
            workers: config::effective_threads(&resolved.batch),
            ..Default::default()
        },
    );

    let result = runner.run(&collected.images, &args.output, output::print_progress)?;

    if let Some(path) = &args.report {
        std::fs::write(path, serde_json::to_string_pretty(&result)?)?;
    }
    output::print_batch_summary(&result);

    Ok(if result.all_succeeded() {
        ExitCode::SUCCESS
    } else {
        ExitCode::FAILURE
    })
}

/// Install the stderr log subscriber. `RUST_LOG` wins over `-v`.
fn init_tracing(verbose: u8) {
    let default = match verbose {
        0 => "warn",
        1 => "info",
        2 => "debug",
        _ => "trace",
    };
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default));
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .with_target(false)
        .init();
}
