use std::path::PathBuf;
use std::time::Duration;

use anyhow::{Context, Result};
use clap::{Args, Parser, Subcommand, ValueEnum};
use mldeck::config::{self, AppConfig};
use mldeck::discovery::{
    CandidateSource, FallbackSource, HtmlCatalog, HttpTransport, JsonCatalog, MediaType,
};
use mldeck::models::SamplingOverrides;
use mldeck::orchestration::RunLog;
use mldeck::pipeline::{load_species_specs, DeckBuilder, DeckOptions, FetchOptions, FetchRunner};
use mldeck::tabular::Table;
use tracing::info;
use tracing_subscriber::EnvFilter;

#[derive(Parser)]
#[command(name = "mldeck", version, about = "Build Anki bird decks from Macaulay Library media")]
struct Cli {
    /// Log at debug level unless RUST_LOG says otherwise.
    #[arg(short, long, global = true)]
    verbose: bool,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand)]
enum Command {
    /// Discover and sample catalog assets per species into a selection CSV.
    Fetch(FetchArgs),
    /// Download selected assets and write an Anki import CSV.
    Deck(DeckArgs),
    /// Show the effective configuration.
    Config {
        /// Write the current settings to the config file.
        #[arg(long)]
        init: bool,
    },
}

#[derive(Clone, Copy, ValueEnum)]
enum Mode {
    Json,
    Html,
}

#[derive(Clone, Copy, ValueEnum)]
enum Media {
    Photo,
    Audio,
}

impl From<Media> for MediaType {
    fn from(media: Media) -> Self {
        match media {
            Media::Photo => MediaType::Photo,
            Media::Audio => MediaType::Audio,
        }
    }
}

#[derive(Args)]
struct FetchArgs {
    /// Fetch-spec CSV (Species, Limit, optional Tags/Region/Months/MinRating/...).
    #[arg(long)]
    input: PathBuf,
    #[arg(long, default_value = "photos.csv")]
    out: PathBuf,
    #[arg(long, value_enum, default_value = "json")]
    mode: Mode,
    /// Defaults to `sampling.media_type` from the config.
    #[arg(long, value_enum)]
    media: Option<Media>,
    #[arg(long)]
    pages: Option<u32>,
    #[arg(long)]
    seed: Option<u64>,
    #[arg(long)]
    min_rating: Option<f64>,
    #[arg(long)]
    max_per_observer: Option<usize>,
    #[arg(long)]
    low_quality_frac: Option<f64>,
    /// Keep discovered candidates per species here and reuse them on later runs.
    #[arg(long)]
    cache_dir: Option<PathBuf>,
    /// Print per-species counts without writing anything.
    #[arg(long)]
    dry_run: bool,
}

#[derive(Args)]
struct DeckArgs {
    /// Selection CSV (ML_ID, Species, optional Tags).
    #[arg(long)]
    input: PathBuf,
    #[arg(long)]
    out_dir: PathBuf,
    #[arg(long)]
    media_dir: PathBuf,
    #[arg(long, value_enum)]
    media: Option<Media>,
    /// Seconds to wait after each download.
    #[arg(long, default_value_t = 0.5)]
    delay: f64,
}

fn main() {
    let cli = Cli::parse();
    init_tracing(cli.verbose);
    if let Err(err) = run(cli.command) {
        eprintln!("Error: {err:#}");
        std::process::exit(1);
    }
}

fn init_tracing(verbose: bool) {
    let fallback = if verbose { "debug" } else { "info" };
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(fallback));
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .init();
}

fn run(command: Command) -> Result<()> {
    let config = config::load_or_default()?;
    match command {
        Command::Fetch(args) => fetch(&config, args),
        Command::Deck(args) => deck(&config, args),
        Command::Config { init } => show_config(&config, init),
    }
}

fn media_type(config: &AppConfig, flag: Option<Media>) -> MediaType {
    flag.map(Into::into).unwrap_or(config.sampling.media_type)
}

fn fetch(config: &AppConfig, args: FetchArgs) -> Result<()> {
    let specs = load_species_specs(&args.input)?;
    info!(species = specs.len(), input = %args.input.display(), "loaded fetch spec");

    let transport = HttpTransport::new(&config.network)?;
    let json = JsonCatalog::new(&transport, config.network.catalog_json_url.clone());
    let html = HtmlCatalog::new(&transport, config.network.catalog_html_url.clone());
    let source: Box<dyn CandidateSource + '_> = match args.mode {
        Mode::Json => Box::new(FallbackSource::new(json, html)),
        Mode::Html => Box::new(html),
    };

    let options = FetchOptions {
        out: args.out,
        media_type: media_type(config, args.media),
        pages: args.pages.unwrap_or(config.sampling.pages),
        seed: args.seed.unwrap_or(config.sampling.seed),
        overrides: SamplingOverrides {
            min_rating: args.min_rating,
            max_per_observer: args.max_per_observer,
            low_quality_frac: args.low_quality_frac,
        },
        cache_dir: args.cache_dir,
        dry_run: args.dry_run,
    };
    let dry_run = options.dry_run;
    let log = RunLog::new(&config::logs_dir()?);
    let summary = FetchRunner::new(source, options, config.sampling.clone())
        .with_log(&log)
        .run(&specs)?;

    if dry_run {
        for outcome in &summary.outcomes {
            println!("{}", outcome.describe());
        }
        return Ok(());
    }
    if let Some(out) = &summary.out_path {
        println!("Wrote {} rows to {}", summary.rows.len(), out.display());
    }
    if let Some(errors) = &summary.errors_path {
        println!(
            "{} species had problems; see {}",
            summary.issues.len(),
            errors.display()
        );
    }
    Ok(())
}

fn deck(config: &AppConfig, args: DeckArgs) -> Result<()> {
    let selection = Table::read(&args.input)?;
    let delay = Duration::try_from_secs_f64(args.delay.max(0.0))
        .context("Invalid --delay value")?;
    let transport = HttpTransport::for_downloads(&config.network, delay)?;
    let options = DeckOptions {
        out_dir: args.out_dir,
        media_dir: args.media_dir,
        media_type: media_type(config, args.media),
    };
    let log = RunLog::new(&config::logs_dir()?);
    let summary = DeckBuilder::new(&transport, &config.network, options)
        .with_log(&log)
        .build(&selection)?;

    println!(
        "Wrote {} notes to {}",
        summary.notes.len(),
        summary.import_path.display()
    );
    if let Some(dir) = summary.media_files.first().and_then(|p| p.parent()) {
        println!("Media in: {}", dir.display());
    }
    if let Some(errors) = &summary.errors_path {
        println!("{} errors logged to {}", summary.issues.len(), errors.display());
    }
    Ok(())
}

fn show_config(config: &AppConfig, init: bool) -> Result<()> {
    let path = if init {
        let path = config::save(config)?;
        println!("Configuration written to {}", path.display());
        path
    } else {
        config::config_file_path()?
    };
    println!("# {}", path.display());
    print!("{}", toml::to_string_pretty(config)?);
    Ok(())
}
