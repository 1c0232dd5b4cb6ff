//! mdfix-tagger - tag untagged audio files by acoustic fingerprint
//!
//! Thin command-line host around [`TaggingPipeline`]: resolves configuration,
//! installs logging, displays progress and prints the final summary.

use anyhow::{Context, Result};
use clap::Parser;
use mdfix_common::config::{load_toml_config, resolve_acoustid_api_key, resolve_root_folder};
use mdfix_common::Progress;
use mdfix_tagger::logging::init_logging;
use mdfix_tagger::services::fingerprinter::locate_fpcalc;
use mdfix_tagger::services::{LibraryScanner, LoftyTagStore, TagInspector};
use mdfix_tagger::{Collaborators, PipelineSettings, TaggingPipeline};
use std::path::PathBuf;
use std::sync::Arc;
use tracing::{info, warn};

/// Command-line arguments for mdfix-tagger
#[derive(Parser, Debug)]
#[command(name = "mdfix-tagger")]
#[command(about = "Identify and tag untagged audio files via AcoustID and MusicBrainz")]
#[command(version)]
struct Args {
    /// Music library root (falls back to ROOT_FOLDER, then the config file)
    root: Option<PathBuf>,

    /// AcoustID application key (falls back to ACOUSTID_API_KEY, then the config file)
    #[arg(long)]
    api_key: Option<String>,

    /// Configuration file [default: <config dir>/mdfix/config.toml]
    #[arg(short, long)]
    config: Option<PathBuf>,

    /// Log level or filter directive, e.g. "debug" or "mdfix_tagger=trace"
    #[arg(long, env = "MDFIX_LOG_LEVEL")]
    log_level: Option<String>,

    /// Also write logs to this file
    #[arg(long)]
    log_file: Option<PathBuf>,

    /// Only report how many files need tagging; move and write nothing
    #[arg(long)]
    dry_scan: bool,
}

#[tokio::main]
async fn main() -> Result<()> {
    let args = Args::parse();

    // .env is optional; real environment variables take precedence
    let dotenv_path = dotenvy::dotenv().ok();

    let loaded = load_toml_config(args.config.as_deref())?;
    let mut config = loaded.config;
    if let Some(level) = args.log_level {
        config.logging.level = level;
    }
    if let Some(file) = args.log_file {
        config.logging.file = Some(file);
    }

    init_logging(&config.logging)?;

    info!(
        "Starting mdfix-tagger {} ({}, built {}, {})",
        env!("CARGO_PKG_VERSION"),
        env!("GIT_HASH"),
        env!("BUILD_TIMESTAMP"),
        env!("BUILD_PROFILE")
    );
    match &loaded.source {
        Some(path) => info!("Config: {}", path.display()),
        None => warn!("No config file found, using defaults"),
    }
    if let Some(path) = dotenv_path {
        info!("Environment loaded from {}", path.display());
    }

    let root = resolve_root_folder(args.root.as_deref(), &config)?;
    info!("Library root: {}", root.display());

    let settings = PipelineSettings::from(&config);

    if args.dry_scan {
        let inspector = TagInspector::new(Arc::new(LoftyTagStore::new()));
        let scan = LibraryScanner::new(settings.audio_extensions.clone())
            .scan(&root, &inspector)
            .context("Scan failed")?;

        if scan.untagged.is_empty() {
            println!("All {} files already tagged", scan.already_tagged);
        } else {
            println!(
                "{} of {} files need tagging",
                scan.untagged.len(),
                scan.total()
            );
            for path in &scan.untagged {
                println!("  {}", path.display());
            }
        }
        return Ok(());
    }

    let api_key = resolve_acoustid_api_key(args.api_key.as_deref(), &config)?;
    let fpcalc = locate_fpcalc(config.fpcalc_path.as_deref())
        .context("Chromaprint fpcalc is required; install it or set fpcalc_path")?;
    info!("fpcalc: {}", fpcalc.display());

    let pipeline = TaggingPipeline::new(settings, Collaborators::production(fpcalc)?);

    let show_progress = |progress: Progress| -> Result<()> {
        info!(
            completed = progress.completed,
            total = progress.total,
            "Progress: {:.0}%",
            progress.fraction() * 100.0
        );
        Ok(())
    };

    let summary = pipeline
        .run(&root, &api_key, Some(&show_progress))
        .await
        .context("Tagging run failed")?;

    println!("{} files tagged successfully", summary);
    Ok(())
}
