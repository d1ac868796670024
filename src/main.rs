//! Seogen - Resumable SEO Metadata Generation
//!
//! Entry point: parses arguments, sets up logging, loads configuration and
//! dispatches to the pipeline, the environment check or config scaffolding.

use anyhow::Result;
use clap::Parser;
use std::path::Path;
use tracing::{info, Level};
use tracing_appender::{non_blocking, rolling};
use tracing_subscriber::{fmt, layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

use seogen::cli::{Args, Commands};
use seogen::config::{Config, LoggingConfig};
use seogen::error::SeoError;
use seogen::orchestrator::Termination;
use seogen::workflow::{check_environment, Workflow};

#[tokio::main]
async fn main() -> Result<()> {
    let args = Args::parse();

    // Load configuration
    let mut config = match &args.config {
        Some(config_path) => Config::from_file(config_path)?,
        None => {
            if Path::new("seogen.toml").exists() {
                Config::from_file("seogen.toml")?
            } else {
                Config::default()
            }
        }
    };

    setup_logging(&config.logging, args.verbose, args.log_level.as_deref())?;
    info!("Starting Seogen - SEO metadata generation");

    match args.command {
        Commands::Run {
            media_dir,
            transcript_dir,
            output_dir,
            api_key,
            model,
            max_items,
            force_reprocess,
            reprocess_degraded,
            checkpoint_interval,
            no_progress,
        } => {
            if let Some(dir) = media_dir {
                config.input.media_dir = dir;
            }
            if let Some(dir) = transcript_dir {
                config.input.transcript_dir = dir;
            }
            if let Some(dir) = output_dir {
                config.output.dir = dir;
            }
            if let Some(model) = model {
                config.client.model = model;
            }
            if let Some(interval) = checkpoint_interval {
                config.generation.checkpoint_interval = interval;
            }
            if max_items.is_some() {
                config.generation.max_items = max_items;
            }
            config.generation.force_reprocess |= force_reprocess;
            config.generation.reprocess_degraded |= reprocess_degraded;
            if no_progress {
                config.generation.show_progress = false;
            }

            let workflow = Workflow::new(config, api_key.as_deref())?;
            let report = workflow.run().await?;
            report.print_summary();

            match &report.termination {
                Termination::Completed => info!("Seogen run completed successfully"),
                Termination::Interrupted => return Err(SeoError::Interrupted.into()),
                Termination::Aborted(reason) => {
                    return Err(anyhow::anyhow!("Run aborted: {}", reason));
                }
            }
        }
        Commands::Check { api_key } => {
            let checks = check_environment(&config, api_key.as_deref());
            println!("\nEnvironment check:");
            println!("{}", "-".repeat(80));
            for check in &checks {
                let mark = if check.ok { "OK" } else { "FAIL" };
                println!("{:<6} {:<22} {}", mark, check.name, check.detail);
            }

            let failed = checks.iter().filter(|c| !c.ok).count();
            if failed > 0 {
                return Err(SeoError::Configuration(format!("{} check(s) failed", failed)).into());
            }
            println!("\nAll checks passed");
        }
        Commands::Init { output, force } => {
            if output.exists() && !force {
                return Err(SeoError::Configuration(format!(
                    "{} already exists (use --force to overwrite)",
                    output.display()
                ))
                .into());
            }
            config.save_to_file(&output)?;
            println!("Wrote configuration to {}", output.display());
        }
    }

    Ok(())
}

/// Setup logging to both console and file
fn setup_logging(logging: &LoggingConfig, verbose: bool, level_override: Option<&str>) -> Result<()> {
    std::fs::create_dir_all(&logging.dir)?;

    // Set up file appender with daily rotation
    let file_appender = rolling::daily(&logging.dir, "seogen.log");
    let (non_blocking_file, _guard) = non_blocking(file_appender);
    // Keep the guard alive for the duration of the program
    std::mem::forget(_guard);

    let log_level = if verbose {
        Level::DEBUG
    } else {
        let level = level_override.unwrap_or(logging.level.as_str());
        level
            .parse::<Level>()
            .map_err(|_| SeoError::Configuration(format!("Invalid log level '{}'", level)))?
    };

    let console_layer = fmt::layer().with_target(false);

    let file_layer = fmt::layer()
        .with_writer(non_blocking_file)
        .with_target(false)
        .with_file(true)
        .with_line_number(true)
        .with_ansi(false); // No ANSI colors in file

    tracing_subscriber::registry()
        .with(EnvFilter::from_default_env().add_directive(log_level.into()))
        .with(console_layer)
        .with(file_layer)
        .try_init()
        .map_err(|e| anyhow::anyhow!("Failed to initialize logging: {}", e))?;

    info!(
        "Logging initialized - level: {}, file: {}",
        log_level,
        logging.dir.join("seogen.log").display()
    );

    Ok(())
}
