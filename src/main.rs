//! quotecard: render quote cards from a CSV file

use std::path::{Path, PathBuf};

use anyhow::{bail, Context, Result};
use clap::{Parser, Subcommand};
use log::{info, warn};

use quotecard::assets::{AssetPaths, Assets};
use quotecard::batch::BatchRunner;
use quotecard::output::{self, DEFAULT_KEEP};
use quotecard::records::read_records;
use quotecard::rendering::{self, CardRenderer};
use quotecard::{CardConfig, Record};

/// Texts drawn by `debug-bounds` when none are given
const DEBUG_SAMPLES: [&str; 4] = [
    "每个人都有自己的时区，不要被别人的节奏打乱",
    "完美主义是进步的敌人",
    "真正的成长发生在舒适圈之外",
    "接受自己的脆弱是力量的体现",
];

#[derive(Parser)]
#[command(name = "quotecard")]
#[command(author, version, about, long_about = None)]
struct Cli {
    #[command(subcommand)]
    command: Commands,

    /// Enable debug logging
    #[arg(short, long, global = true)]
    verbose: bool,

    /// JSON file overriding parts of the default card configuration
    #[arg(long, global = true)]
    config: Option<PathBuf>,

    /// Multiply every pixel dimension, e.g. 0.25 for quick drafts
    #[arg(long, global = true)]
    scale: Option<f32>,

    /// Input CSV with id, content and reflection columns
    #[arg(long, global = true, default_value = "resources/quotes.csv")]
    quotes: PathBuf,

    #[arg(long, global = true, default_value = "resources/logo.png")]
    logo: PathBuf,

    /// Directory of <theme>.png icons plus secondary.png
    #[arg(long, global = true, default_value = "resources/icons")]
    icons: PathBuf,

    #[arg(long, global = true, default_value = "resources/fonts/SmileySans-Oblique.ttf")]
    font: PathBuf,

    #[arg(short, long, global = true, default_value = "output")]
    output: PathBuf,
}

#[derive(Subcommand)]
enum Commands {
    /// Render one card per record
    Render {
        /// Only render the first N records
        #[arg(long)]
        limit: Option<usize>,
    },

    /// Render the first valid record as PREVIEW<suffix>.png
    Preview,

    /// Outline the bitmap bounds of rendered text blocks
    DebugBounds {
        /// Texts to outline (defaults to a built-in sample set)
        texts: Vec<String>,
    },

    /// Delete generated files from the output directory
    Clean {
        /// Actually delete; without it only the plan is printed
        #[arg(long)]
        yes: bool,
    },
}

fn init_logger(verbose: bool) {
    let level = if verbose {
        log::LevelFilter::Debug
    } else {
        log::LevelFilter::Info
    };
    env_logger::Builder::new()
        .filter_level(level)
        .parse_default_env()
        .init();
}

fn load_config(path: Option<&Path>, scale: Option<f32>) -> Result<CardConfig> {
    let config = match path {
        Some(path) => {
            let text = std::fs::read_to_string(path)
                .with_context(|| format!("failed to read config {}", path.display()))?;
            serde_json::from_str(&text).with_context(|| format!("invalid config {}", path.display()))?
        }
        None => CardConfig::default(),
    };
    match scale {
        Some(s) if !(s.is_finite() && s > 0.0) => bail!("--scale must be a positive number, got {}", s),
        Some(s) => Ok(config.scaled(s)),
        None => Ok(config),
    }
}

impl Cli {
    fn asset_paths(&self) -> AssetPaths {
        AssetPaths {
            logo: self.logo.clone(),
            icons_dir: self.icons.clone(),
            font: self.font.clone(),
        }
    }
}

fn render(cli: &Cli, renderer: &CardRenderer, limit: Option<usize>) -> Result<()> {
    let rows = read_records(&cli.quotes).with_context(|| format!("cannot load {}", cli.quotes.display()))?;
    let assets = Assets::load(&cli.asset_paths());
    let runner = BatchRunner::new(renderer, &assets, &cli.output);
    let summary = runner.run(rows, limit)?;

    println!(
        "{} card(s) written to {}, {} failed ({:.1} MiB)",
        summary.succeeded.len(),
        cli.output.display(),
        summary.failed.len(),
        output::mib(summary.total_bytes())
    );
    for failure in &summary.failed {
        println!("  row {} '{}': {}", failure.index, failure.id, failure.reason);
    }
    Ok(())
}

fn preview(cli: &Cli, renderer: &CardRenderer) -> Result<()> {
    let rows = read_records(&cli.quotes).with_context(|| format!("cannot load {}", cli.quotes.display()))?;
    let record: Record = rows
        .into_iter()
        .find_map(|row| row.record.ok())
        .context("no valid record to preview")?;
    let assets = Assets::load(&cli.asset_paths());
    output::ensure_output_dir(&cli.output)?;

    let path = output::output_path(&cli.output, "PREVIEW", &renderer.config().export.suffix);
    let runner = BatchRunner::new(renderer, &assets, &cli.output);
    let bytes = runner.render_to(&record, &path)?;
    println!("Preview of '{}' written to {} ({:.1} MiB)", record.id, path.display(), output::mib(bytes));
    Ok(())
}

fn debug_bounds(cli: &Cli, renderer: &CardRenderer, texts: &[String]) -> Result<()> {
    let texts: Vec<&str> = if texts.is_empty() {
        DEBUG_SAMPLES.to_vec()
    } else {
        texts.iter().map(String::as_str).collect()
    };
    let assets = Assets::load(&cli.asset_paths());
    output::ensure_output_dir(&cli.output)?;

    for (i, text) in texts.iter().enumerate() {
        let image = renderer.debug_bounds(text, &assets)?;
        let png = output::encode_png(&rendering::flatten(&image), renderer.config().export.dpi)?;
        let path = cli.output.join(format!("DEBUG_bounds_{}.png", i + 1));
        let bytes = output::write_atomic(&path, &png)?;
        info!("{} -> {} ({:.1} MiB)", text, path.display(), output::mib(bytes));
    }
    println!("Wrote {} bounds preview(s) to {}", texts.len(), cli.output.display());
    Ok(())
}

fn clean(cli: &Cli, yes: bool) -> Result<()> {
    let dir = &cli.output;
    if !dir.is_dir() {
        warn!("Output directory {} does not exist", dir.display());
        return Ok(());
    }
    let plan = output::plan_cleanup(dir, &DEFAULT_KEEP)?;
    if plan.delete.is_empty() {
        println!("Nothing to delete in {} ({} protected file(s))", dir.display(), plan.kept.len());
        return Ok(());
    }
    if !yes {
        println!(
            "Would delete {} item(s), {:.1} MiB, from {}:",
            plan.delete.len(),
            output::mib(plan.bytes),
            dir.display()
        );
        for path in &plan.delete {
            println!("  {}", path.display());
        }
        println!("Re-run with --yes to delete.");
        return Ok(());
    }

    let report = output::clean_output_dir(dir, &DEFAULT_KEEP)?;
    println!(
        "Deleted {} item(s), freed {:.1} MiB, kept {} protected file(s)",
        report.deleted,
        output::mib(report.freed_bytes),
        report.kept
    );
    if !report.failed.is_empty() {
        for (path, reason) in &report.failed {
            println!("  failed: {} ({})", path.display(), reason);
        }
        bail!("{} item(s) could not be deleted", report.failed.len());
    }
    Ok(())
}

fn main() -> Result<()> {
    let cli = Cli::parse();
    init_logger(cli.verbose);

    if let Commands::Clean { yes } = cli.command {
        return clean(&cli, yes);
    }

    let config = load_config(cli.config.as_deref(), cli.scale)?;
    let renderer = CardRenderer::new(config).context("invalid card configuration")?;

    match &cli.command {
        Commands::Render { limit } => render(&cli, &renderer, *limit),
        Commands::Preview => preview(&cli, &renderer),
        Commands::DebugBounds { texts } => debug_bounds(&cli, &renderer, texts),
        Commands::Clean { .. } => Ok(()),
    }
}
