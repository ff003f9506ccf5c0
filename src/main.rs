mod cli;

use std::path::Path;

use anyhow::{Context, Result};
use clap::Parser;
use cli::{Cli, Commands};
use posterforge::{logging, orchestrator, orchestrator::Orchestrator, registry::ServiceRegistry};
use posterforge_common::config::{self, Config};

fn load_config(dir: &Path) -> Result<(Config, String)> {
    let env = config::current_env();
    let config = Config::load(dir, &env)
        .with_context(|| format!("loading configuration from {}", dir.display()))?;
    Ok((config, env))
}

async fn run(config: Config, strict: bool) -> Result<()> {
    let registry =
        ServiceRegistry::from_config(&config).context("failed to initialise services")?;
    let orchestrator = Orchestrator::from_config(&config, &registry)
        .context("failed to build processing pipeline")?
        .strict(strict);

    let signals = tokio::spawn(orchestrator::cancel_on_signal(
        orchestrator.context().clone(),
    ));
    let report = orchestrator.run().await;
    signals.abort();
    orchestrator.shutdown().await;

    let report = report.context("run aborted")?;
    tracing::info!(
        libraries = report.libraries_processed,
        skipped = report.libraries_skipped,
        failed = report.libraries_failed,
        posters = report.posters_composed,
        poster_errors = report.poster_errors,
        cancelled = report.cancelled,
        "posterforge finished"
    );
    Ok(())
}

fn validate(dir: &Path) -> Result<()> {
    let (config, env) = load_config(dir)?;
    println!("Configuration valid (env {env})");
    println!(
        "Plex: {}",
        if config.plex.enabled { config.plex.url.as_str() } else { "disabled" }
    );
    for library in &config.plex.libraries {
        println!(
            "  library {:?}: {}{}",
            library.name,
            if library.enabled { "enabled" } else { "disabled" },
            if library.refresh { ", refresh" } else { "" }
        );
    }
    println!("TMDB: {}", if config.tmdb.enabled { "enabled" } else { "disabled" });
    println!("Max threads: {}", config.max_threads());
    println!(
        "Timeouts: run {}s, library {}s, rating {}s",
        config.library_processing_timeout().as_secs(),
        config.library_timeout().as_secs(),
        config.rating_timeout().as_secs()
    );
    Ok(())
}

fn main() -> Result<()> {
    let cli = Cli::parse();

    match cli.command {
        Commands::Run { strict } => {
            let (config, env) = load_config(&cli.config_dir)?;
            logging::init(&config.logger, cli.verbose)?;
            tracing::info!(env = %env, config_dir = %cli.config_dir.display(), "Starting posterforge");

            let rt = tokio::runtime::Runtime::new()?;
            rt.block_on(run(config, strict))
        }
        Commands::Validate => validate(&cli.config_dir),
        Commands::Version => {
            println!("posterforge {}", env!("CARGO_PKG_VERSION"));
            Ok(())
        }
    }
}
