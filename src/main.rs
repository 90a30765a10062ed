//! Sortify service
//!
//! Watches the downloads folder and sorts new files by extension.

use anyhow::{Context, Result};
use clap::Parser;
use sortify::{Config, SharedRuleSet, SortEngine, Watcher};
use std::path::PathBuf;
use std::time::Duration;
use tracing::{error, info, warn};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

#[derive(Parser, Debug)]
#[command(name = "sortify")]
#[command(author, version, about = "Sorts new downloads into folders by extension")]
struct Cli {
    /// Path to config file
    #[arg(short, long, value_name = "FILE")]
    config: Option<PathBuf>,

    /// Enable verbose logging
    #[arg(short, long)]
    verbose: bool,

    #[command(subcommand)]
    command: Option<Commands>,
}

#[derive(clap::Subcommand, Debug)]
enum Commands {
    /// Watch and sort in the foreground (default)
    Run,

    /// List all rules
    List,

    /// Validate config file
    Check,

    /// Sort files already in the folder once (dry-run by default)
    Sort {
        /// Actually move files (not just dry-run)
        #[arg(long)]
        apply: bool,

        /// Directory to sort instead of the configured one
        #[arg(short, long)]
        dir: Option<PathBuf>,
    },

    /// Write a default config file
    Init {
        /// Overwrite an existing config
        #[arg(long)]
        force: bool,
    },
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();

    let config = Config::load(cli.config.as_deref())?;
    init_logging(&config, cli.verbose)?;

    match cli.command {
        None | Some(Commands::Run) => {
            run_service(cli.config, config).await?;
        }
        Some(Commands::List) => {
            let rules = config.rule_set();
            let status = if rules.is_enabled() { "enabled" } else { "disabled" };
            println!("Sorting is {}", status);
            println!("Rules:");
            for (i, rule) in rules.rules().iter().enumerate() {
                println!("  [{}] {} -> {}", i + 1, rule.extension, rule.folder_name);
            }
        }
        Some(Commands::Check) => {
            let rules = config.rule_set();
            println!("✓ Config is valid");
            println!("  {} rules", rules.len());
            let dropped = config.rules.len() - rules.len();
            if dropped > 0 {
                println!("  {} invalid rules ignored", dropped);
            }
            match config.watch_path() {
                Some(path) if path.is_dir() => println!("  watching {}", path.display()),
                Some(path) => println!("  ✗ watch folder missing: {}", path.display()),
                None => println!("  ✗ no watch folder could be determined"),
            }
        }
        Some(Commands::Sort { apply, dir }) => {
            let root = dir
                .map(|d| sortify::expand_path(&d))
                .or_else(|| config.watch_path())
                .context("Could not determine the directory to sort")?;

            let mut options = config.engine_options();
            options.lock_grace_period = Duration::ZERO;
            let engine = SortEngine::new(&root, SharedRuleSet::new(config.rule_set()), options);

            if !engine.rules().is_enabled() {
                println!("Sorting is disabled in the config; nothing to do");
                return Ok(());
            }

            println!("Processing: {}", root.display());
            if apply {
                let moved = engine.sort_existing().await?;
                println!("  Moved {} files", moved);
            } else {
                let entries = std::fs::read_dir(&root)
                    .with_context(|| format!("Failed to read {}", root.display()))?;
                for entry in entries.flatten() {
                    let path = entry.path();
                    if path.is_file()
                        && let Some(dest) = engine.plan(&path)
                    {
                        println!("  [dry-run] {} -> {}", path.display(), dest.display());
                    }
                }
            }
        }
        Some(Commands::Init { force }) => {
            let path = cli
                .config
                .or_else(Config::default_path)
                .context("Could not determine config path")?;
            if path.exists() && !force {
                anyhow::bail!(
                    "Config already exists at {} (use --force to overwrite)",
                    path.display()
                );
            }
            Config::default().save(Some(path.as_path()))?;
            println!("Wrote {}", path.display());
        }
    }

    Ok(())
}

/// Install the tracing subscriber.
///
/// `SORTIFY_LOG` wins over `--verbose`, which wins over the configured level.
fn init_logging(config: &Config, verbose: bool) -> Result<()> {
    let level = if verbose {
        "debug".to_string()
    } else {
        config.general.log_level.clone()
    };
    let filter = tracing_subscriber::EnvFilter::new(std::env::var("SORTIFY_LOG").unwrap_or(level));

    let (stderr_layer, file_layer) = match &config.general.log_file {
        Some(path) => {
            let path = sortify::expand_path(path);
            if let Some(parent) = path.parent() {
                std::fs::create_dir_all(parent).with_context(|| {
                    format!("Failed to create log directory: {}", parent.display())
                })?;
            }
            let file = std::fs::OpenOptions::new()
                .create(true)
                .append(true)
                .open(&path)
                .with_context(|| format!("Failed to open log file: {}", path.display()))?;
            let layer = tracing_subscriber::fmt::layer()
                .with_target(false)
                .with_ansi(false)
                .with_writer(std::sync::Mutex::new(file));
            (None, Some(layer))
        }
        None => (
            Some(
                tracing_subscriber::fmt::layer()
                    .with_target(false)
                    .with_writer(std::io::stderr),
            ),
            None,
        ),
    };

    tracing_subscriber::registry()
        .with(filter)
        .with(stderr_layer)
        .with(file_layer)
        .init();

    Ok(())
}

async fn run_service(config_path: Option<PathBuf>, config: Config) -> Result<()> {
    let root = config
        .watch_path()
        .context("Could not determine the directory to watch")?;
    let rules = SharedRuleSet::new(config.rule_set());
    info!(
        "Loaded config with {} rules (sorting {})",
        rules.load().len(),
        if rules.is_enabled() { "enabled" } else { "disabled" }
    );

    let engine = SortEngine::new(&root, rules.clone(), config.engine_options());
    let watcher = Watcher::new(&root)?;

    if config.general.sort_existing_on_start
        && let Err(e) = engine.sort_existing().await
    {
        error!("Initial sort failed: {:#}", e);
    }

    #[cfg(unix)]
    spawn_reload_on_hangup(config_path, rules)?;
    #[cfg(not(unix))]
    let _ = (config_path, rules);

    info!(
        "Sortify running on {}. Press Ctrl+C to stop.",
        watcher.root().display()
    );
    engine.run(watcher, shutdown_signal()).await;

    Ok(())
}

/// Re-read the config on SIGHUP and swap in its rules
#[cfg(unix)]
fn spawn_reload_on_hangup(config_path: Option<PathBuf>, rules: SharedRuleSet) -> Result<()> {
    use tokio::signal::unix::{SignalKind, signal};

    let mut hangup = signal(SignalKind::hangup()).context("Failed to listen for SIGHUP")?;
    tokio::spawn(async move {
        while hangup.recv().await.is_some() {
            info!("Reloading configuration...");
            match Config::load(config_path.as_deref()) {
                Ok(config) => {
                    rules.replace(config.rule_set());
                    info!("Watch folder and engine settings take effect after a restart");
                }
                Err(e) => error!("Reload failed, keeping current rules: {:#}", e),
            }
        }
    });
    Ok(())
}

async fn shutdown_signal() {
    #[cfg(unix)]
    {
        use tokio::signal::unix::{SignalKind, signal};

        match signal(SignalKind::terminate()) {
            Ok(mut terminate) => {
                tokio::select! {
                    _ = tokio::signal::ctrl_c() => {}
                    _ = terminate.recv() => {}
                }
            }
            Err(e) => {
                warn!("Failed to listen for SIGTERM: {}", e);
                let _ = tokio::signal::ctrl_c().await;
            }
        }
    }

    #[cfg(not(unix))]
    {
        let _ = tokio::signal::ctrl_c().await;
    }

    info!("Shutting down...");
}
