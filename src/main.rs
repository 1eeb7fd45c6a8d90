//! Geocache CLI - resolve, inspect and persist the map's current location

use clap::{Parser, Subcommand};
use geocache::config::{self, GeocacheConfig};
use geocache::resolver::ResolveOptions;
use geocache::ui::{self, Icons};
use geocache::{Coordinate, Error, LocationContext};
use std::path::{Path, PathBuf};
use std::time::Duration;
use tokio::io::{AsyncBufReadExt, BufReader};
use tracing_subscriber::{EnvFilter, fmt, prelude::*};

#[derive(Parser)]
#[command(name = "geocache")]
#[command(version)]
#[command(about = "Offline-first location cache for map widgets")]
#[command(long_about = r#"
Geocache decides where a map should be centered and remembers the answer:
  • the stored location, when there is one
  • otherwise a live fix from the device
  • otherwise a static default

Example usage:
  geocache init
  geocache center
  geocache locate
  geocache save 40.7128 -74.0060
  printf '1,2\n1.1,2.1\n' | geocache track
"#)]
struct Cli {
    /// Enable verbose logging
    #[arg(short, long, global = true)]
    verbose: bool,

    /// Suppress human-readable output (errors are still shown)
    #[arg(short, long, global = true)]
    quiet: bool,

    /// Print machine-readable JSON instead of human output
    #[arg(long, global = true)]
    json: bool,

    /// Path to the config file (defaults to ./geocache.toml)
    #[arg(short, long, global = true)]
    config: Option<PathBuf>,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Write a default config file
    Init {
        /// Overwrite an existing config
        #[arg(long)]
        force: bool,
    },

    /// Show the stored location
    Show,

    /// Store a location explicitly
    Save {
        #[arg(allow_negative_numbers = true)]
        latitude: f64,
        #[arg(allow_negative_numbers = true)]
        longitude: f64,
    },

    /// Best-effort map center: stored value, live fix or default. Never fails.
    Center,

    /// Force a live fix from the device and store it
    Locate,

    /// Resolve with explicit options
    Resolve {
        /// Skip the stored value and always ask the device
        #[arg(long)]
        fresh: bool,

        /// Fail instead of returning the fallback when the device fails
        #[arg(long)]
        strict: bool,

        /// Maximum time to wait for a live fix
        #[arg(long, default_value = "10000")]
        timeout_ms: u64,

        /// Fallback as "lat,lon"
        #[arg(long, allow_hyphen_values = true)]
        fallback: Option<Coordinate>,
    },

    /// Read marker positions ("lat,lon" per line) from stdin and persist them debounced
    Track {
        /// Quiet window before a position is stored
        #[arg(long)]
        debounce_ms: Option<u64>,
    },
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();
    geocache::output::set_quiet(cli.quiet);

    // Initialize logging
    let filter = if cli.verbose {
        EnvFilter::new("debug")
    } else {
        EnvFilter::new("info")
    };

    tracing_subscriber::registry()
        .with(fmt::layer().with_writer(std::io::stderr))
        .with(filter)
        .init();

    let config_path = cli.config.clone().unwrap_or_else(config::default_config_path);

    if let Commands::Init { force } = cli.command {
        config::write_config(&config_path, &GeocacheConfig::with_defaults(), force)?;
        if cli.json {
            emit(&serde_json::json!({ "config": config_path }))?;
        } else {
            ui::success(&format!("Wrote {}", config_path.display()));
        }
        return Ok(());
    }

    let config = config::load_config(Some(&config_path))?.unwrap_or_else(|| {
        tracing::debug!("No config at {}, using defaults", config_path.display());
        GeocacheConfig::with_defaults()
    });
    let base = base_dir(&config_path);
    let mut context = LocationContext::from_config(&config, &base);

    match cli.command {
        Commands::Init { .. } => unreachable!("handled above"),

        Commands::Show => {
            let stored = context.store.get().await;
            if cli.json {
                emit(&serde_json::json!({ "location": stored }))?;
            } else {
                match stored {
                    Some(c) => ui::coordinate(Icons::DATABASE, "stored", &c),
                    None => ui::warn("No location stored yet"),
                }
            }
        }

        Commands::Save { latitude, longitude } => {
            let c = Coordinate::validated(latitude, longitude)?;
            context.store.put(c).await?;
            if cli.json {
                emit(&serde_json::json!({ "location": c }))?;
            } else {
                ui::coordinate(Icons::PIN, "saved", &c);
            }
        }

        Commands::Center => {
            let c = context.resolver.best_effort().await;
            context.resolver.flush_pending_writes().await;
            if cli.json {
                emit(&serde_json::json!({ "location": c }))?;
            } else {
                ui::coordinate(Icons::GLOBE, "center", &c);
            }
        }

        Commands::Locate => {
            let result = context.resolver.locate_now().await;
            context.resolver.flush_pending_writes().await;
            match result {
                Ok(c) if cli.json => emit(&serde_json::json!({ "location": c }))?,
                Ok(c) => ui::coordinate(Icons::SATELLITE, "live", &c),
                Err(Error::Location(e)) => {
                    if cli.json {
                        emit(&serde_json::json!({ "error": e.kind, "message": e.to_string() }))?;
                    } else {
                        ui::error(&e.to_string());
                    }
                    std::process::exit(1);
                }
                Err(e) => return Err(e.into()),
            }
        }

        Commands::Resolve { fresh, strict, timeout_ms, fallback } => {
            let options = ResolveOptions {
                force_fresh: fresh,
                throw_on_error: strict,
                timeout: Duration::from_millis(timeout_ms),
                fallback: fallback.unwrap_or(context.resolver.fallback()),
            };
            let resolution = context.resolver.resolve_detailed(&options).await;
            context.resolver.flush_pending_writes().await;
            let resolution = resolution?;
            if cli.json {
                emit(&resolution)?;
            } else {
                ui::resolution(&resolution);
            }
        }

        Commands::Track { debounce_ms } => {
            if let Some(ms) = debounce_ms {
                let mut overridden = config.clone();
                overridden.surface.debounce_ms = Some(ms);
                context = LocationContext::from_config(&overridden, &base);
            }
            track_stdin(&context, cli.json).await?;
        }
    }

    Ok(())
}

async fn track_stdin(context: &LocationContext, json: bool) -> anyhow::Result<()> {
    if !json {
        ui::header(
            Icons::PIN,
            &format!("Tracking marker positions (debounce {:?})", context.debounce()),
        );
    }

    let debouncer = context.marker_debouncer();
    let mut lines = BufReader::new(tokio::io::stdin()).lines();
    let mut accepted = 0usize;

    while let Some(line) = lines.next_line().await? {
        let line = line.trim();
        if line.is_empty() {
            continue;
        }
        match line.parse::<Coordinate>() {
            Ok(c) => {
                debouncer.position_changed(c);
                accepted += 1;
            }
            Err(e) => ui::warn(&format!("Skipping {:?}: {}", line, e)),
        }
    }

    debouncer.close().await;
    let stored = context.store.get().await;

    if json {
        emit(&serde_json::json!({ "positions": accepted, "location": stored }))?;
    } else if let Some(c) = stored {
        ui::info("Positions received", &accepted.to_string());
        ui::coordinate(Icons::DATABASE, "stored", &c);
    }
    Ok(())
}

fn emit<T: serde::Serialize>(value: &T) -> anyhow::Result<()> {
    println!("{}", serde_json::to_string_pretty(value)?);
    Ok(())
}

/// Relative paths in the config resolve against the config file's directory.
fn base_dir(config_path: &Path) -> PathBuf {
    match config_path.parent() {
        Some(parent) if !parent.as_os_str().is_empty() => parent.to_path_buf(),
        _ => PathBuf::from("."),
    }
}
