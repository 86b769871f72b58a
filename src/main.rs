//! Berth settings CLI.
//!
//! Operator tooling over the settings engine: resolve per-scope env
//! maps, inspect and mutate the override documents, suggest bindings,
//! and watch the settings directory for changes.

use anyhow::Result;
use berth_settings::catalog::{NullCapabilities, ServiceCatalog, StaticCatalog};
use berth_settings::engine::SettingsEngine;
use berth_settings::store::SettingsPaths;
use berth_settings::store::watcher::{WatcherConfig, start_settings_watcher};
use berth_settings::types::{Resolution, Suggestion};
use clap::{Parser, Subcommand, ValueEnum};
use std::collections::BTreeMap;
use std::fs::OpenOptions;
use std::path::PathBuf;
use std::sync::Arc;
use tracing::{Level, info, warn};
use tracing_subscriber::FmtSubscriber;

/// Output format for resolution results.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, ValueEnum)]
enum Format {
    #[default]
    Text,
    Json,
}

/// Berth settings resolution engine
#[derive(Parser, Debug)]
#[command(author, version, about, long_about = None)]
struct Cli {
    /// Settings directory (default: $BERTH_CONFIG_DIR, then ./berth)
    #[arg(short, long, global = true)]
    dir: Option<PathBuf>,

    /// Service catalog file (default: <dir>/services.yaml)
    #[arg(long, global = true)]
    catalog: Option<PathBuf>,

    /// Enable verbose logging
    #[arg(short, long, global = true)]
    verbose: bool,

    /// Logging output: 0/off, 1/stdout, 2/stderr (default), or filename
    #[arg(short, long, default_value = "2", global = true)]
    log: String,

    /// Output format
    #[arg(short, long, value_enum, default_value_t = Format::Text, global = true)]
    format: Format,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Resolve the env map a service template sees
    Service { service_id: String },

    /// Resolve the env map for a deploy-target preview
    DeployConfig {
        deploy_target: String,
        service_id: String,
    },

    /// Resolve the env map a running deployment sees
    Deployment { deployment_id: String },

    /// Look up a single settings path
    Get {
        path: String,
        #[arg(long)]
        default: Option<String>,
    },

    /// Write a settings path (sensitive names route to the secret store)
    Set { path: String, value: String },

    /// Delete a settings path from the mutable stores
    Delete { path: String },

    /// Suggest settings paths matching an env var name
    Suggest { env_var: String },

    /// Watch the settings directory and reload on change
    Watch,
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();
    init_logging(&cli)?;

    let paths = cli
        .dir
        .clone()
        .map(SettingsPaths::in_dir)
        .unwrap_or_else(SettingsPaths::discover);
    let catalog_path = cli
        .catalog
        .clone()
        .unwrap_or_else(|| paths.dir.join("services.yaml"));
    let catalog: Arc<dyn ServiceCatalog> = if catalog_path.exists() {
        Arc::new(StaticCatalog::from_file(&catalog_path)?)
    } else {
        warn!(
            "no service catalog at {}, resolving with an empty one",
            catalog_path.display()
        );
        Arc::new(StaticCatalog::default())
    };

    let engine = SettingsEngine::load(paths.clone(), catalog, Arc::new(NullCapabilities))?;

    match cli.command {
        Command::Service { service_id } => {
            print_resolutions(&engine.for_service(&service_id)?, cli.format)?;
        }
        Command::DeployConfig {
            deploy_target,
            service_id,
        } => {
            print_resolutions(
                &engine.for_deploy_config(&deploy_target, &service_id)?,
                cli.format,
            )?;
        }
        Command::Deployment { deployment_id } => {
            print_resolutions(&engine.for_deployment(&deployment_id)?, cli.format)?;
        }
        Command::Get { path, default } => match engine.get(&path, default.as_deref()).await? {
            Some(value) => println!("{}", value),
            None => {
                eprintln!("{}: not found", path);
                std::process::exit(1);
            }
        },
        Command::Set { path, value } => {
            engine.set(&path, &value).await?;
        }
        Command::Delete { path } => {
            let removed = engine.delete(&path).await?;
            println!("{}", removed);
        }
        Command::Suggest { env_var } => {
            print_suggestions(&engine.get_suggestions(&env_var), cli.format)?;
        }
        Command::Watch => {
            watch_loop(&engine, &paths).await?;
        }
    }

    Ok(())
}

fn init_logging(cli: &Cli) -> Result<()> {
    let level = if cli.verbose {
        Level::DEBUG
    } else {
        Level::INFO
    };
    match cli.log.as_str() {
        "0" | "off" => {}
        "1" | "stdout" => {
            let subscriber = FmtSubscriber::builder()
                .with_max_level(level)
                .with_writer(std::io::stdout)
                .finish();
            tracing::subscriber::set_global_default(subscriber)?;
        }
        "2" | "stderr" => {
            let subscriber = FmtSubscriber::builder()
                .with_max_level(level)
                .with_writer(std::io::stderr)
                .finish();
            tracing::subscriber::set_global_default(subscriber)?;
        }
        filename => {
            let file = OpenOptions::new().create(true).append(true).open(filename)?;
            let subscriber = FmtSubscriber::builder()
                .with_max_level(level)
                .with_writer(file)
                .with_ansi(false)
                .finish();
            tracing::subscriber::set_global_default(subscriber)?;
        }
    }
    Ok(())
}

fn print_resolutions(map: &BTreeMap<String, Resolution>, format: Format) -> Result<()> {
    match format {
        Format::Json => println!("{}", serde_json::to_string_pretty(map)?),
        Format::Text => {
            for (var, resolution) in map {
                if let Some(value) = &resolution.value {
                    let via = resolution
                        .path
                        .as_deref()
                        .map(|path| format!(" via {}", path))
                        .unwrap_or_default();
                    println!("{}={}  [{}{}]", var, value, resolution.source, via);
                } else {
                    println!("{}  [{}]", var, resolution.source);
                }
            }
        }
    }
    Ok(())
}

fn print_suggestions(suggestions: &[Suggestion], format: Format) -> Result<()> {
    match format {
        Format::Json => println!("{}", serde_json::to_string_pretty(suggestions)?),
        Format::Text => {
            for suggestion in suggestions {
                let marker = if suggestion.has_value { "*" } else { " " };
                println!("{} {}  ({})", marker, suggestion.path, suggestion.label);
            }
        }
    }
    Ok(())
}

async fn watch_loop(engine: &SettingsEngine, paths: &SettingsPaths) -> Result<()> {
    let mut handle = start_settings_watcher(paths, WatcherConfig::default())?;
    info!("watching for settings changes, ctrl-c to stop");
    loop {
        tokio::select! {
            _ = tokio::signal::ctrl_c() => {
                info!("stopping watcher");
                return Ok(());
            }
            event = handle.wait_for_change() => {
                let Some(event) = event else {
                    return Ok(());
                };
                if !event.requires_reload() {
                    warn!("watcher reported an error event: {:?}", event);
                    continue;
                }
                match engine.reload() {
                    Ok(()) => info!("snapshot reloaded after {:?}", event),
                    Err(err) => {
                        warn!(error = %err, "reload failed, keeping last-known-good snapshot");
                    }
                }
            }
        }
    }
}
