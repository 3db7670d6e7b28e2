//! plaud-mirror command line
//!
//! Thin front-end over the library: connect an account, sync, keep a
//! scheduler running, and transcribe.

use anyhow::{bail, Context, Result};
use clap::{Parser, Subcommand, ValueEnum};
use serde::Serialize;
use std::path::PathBuf;

use plaud_mirror_lib::database::{DatabaseManager, ProviderCapability, UpsertProviderConfig};
use plaud_mirror_lib::plaud::servers::resolve_api_base;
use plaud_mirror_lib::plaud::{PlaudClient, RemoteCatalog};
use plaud_mirror_lib::providers::ProviderKind;
use plaud_mirror_lib::state::AppState;
use plaud_mirror_lib::sync::{SyncDispatch, SyncTrigger};

/// Mirror Plaud recordings locally and keep them transcribed
#[derive(Parser, Debug)]
#[command(name = "plaud-mirror")]
#[command(author, version, about, long_about = None)]
#[command(propagate_version = true)]
struct Cli {
    #[command(subcommand)]
    command: Commands,

    /// Local account the command acts for
    #[arg(long, global = true, env = "PLAUD_MIRROR_USER", default_value = "me@localhost")]
    email: String,

    /// SQLite database path
    #[arg(long, global = true, env = "PLAUD_MIRROR_DB")]
    db: Option<PathBuf>,

    /// Directory downloaded audio is kept in
    #[arg(long, global = true, env = "PLAUD_MIRROR_AUDIO_DIR")]
    audio_dir: Option<PathBuf>,

    /// Output in JSON format for scripting
    #[arg(long, global = true)]
    json: bool,
}

#[derive(Subcommand, Debug)]
enum Commands {
    /// Store a Plaud bearer token after checking it works
    Connect {
        #[arg(long, env = "PLAUD_TOKEN", hide_env_values = true)]
        token: String,
        /// "global", "eu" or a full API URL
        #[arg(long, default_value = "global")]
        server: String,
        /// Only mirror recordings from this device
        #[arg(long)]
        device: Option<String>,
    },
    /// List devices bound to the Plaud account
    Devices,
    /// Run one sync now
    Sync,
    /// Keep syncing on the configured interval until interrupted
    Watch,
    /// List mirrored recordings
    Recordings {
        /// Include recordings trashed on Plaud
        #[arg(long)]
        all: bool,
    },
    /// Transcribe one recording
    Transcribe {
        recording_id: String,
        /// Transcribe again even if a transcript exists
        #[arg(long)]
        force: bool,
    },
    /// Transcribe every recording still missing a transcript
    Backfill,
    /// Manage AI providers
    Provider {
        #[command(subcommand)]
        action: ProviderAction,
    },
    /// Show or change sync settings
    Settings {
        #[command(subcommand)]
        action: Option<SettingsAction>,
    },
}

#[derive(Subcommand, Debug)]
enum ProviderAction {
    /// Add a provider configuration
    Add {
        /// openai, groq, together, openrouter, lmstudio, ollama or custom
        #[arg(long)]
        kind: String,
        #[arg(long, env = "PLAUD_MIRROR_PROVIDER_KEY", hide_env_values = true, default_value = "")]
        api_key: String,
        #[arg(long)]
        base_url: Option<String>,
        #[arg(long)]
        model: Option<String>,
        /// Make it the default transcription provider
        #[arg(long)]
        default: bool,
    },
    /// Make a configuration the default for a capability
    Default {
        id: String,
        #[arg(long, value_enum, default_value_t = Capability::Transcription)]
        capability: Capability,
    },
    /// List configured providers
    List,
}

#[derive(Subcommand, Debug)]
enum SettingsAction {
    /// Set one setting by key
    Set { key: String, value: String },
}

#[derive(ValueEnum, Clone, Copy, Debug)]
enum Capability {
    Transcription,
    Enhancement,
}

impl From<Capability> for ProviderCapability {
    fn from(c: Capability) -> Self {
        match c {
            Capability::Transcription => ProviderCapability::Transcription,
            Capability::Enhancement => ProviderCapability::Enhancement,
        }
    }
}

const NUMBER_SETTINGS: [&str; 3] = ["sync_interval_ms", "min_interval_ms", "backfill_concurrency"];
const BOOL_SETTINGS: [&str; 6] = [
    "auto_sync_enabled",
    "sync_on_mount",
    "sync_on_visibility_change",
    "sync_notifications",
    "auto_transcribe",
    "import_plaud_transcripts",
];

#[tokio::main]
async fn main() {
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("info"))
        .format_timestamp_millis()
        .init();

    let cli = Cli::parse();
    if let Err(e) = run(cli).await {
        log::error!("{:#}", e);
        eprintln!("Error: {:#}", e);
        std::process::exit(1);
    }
}

async fn run(cli: Cli) -> Result<()> {
    let db_path = cli.db.clone().unwrap_or_else(DatabaseManager::default_path);
    let db = DatabaseManager::new(db_path.clone())
        .with_context(|| format!("Failed to open database at {}", db_path.display()))?;
    log::info!("Database ready at {}", db_path.display());

    db.fail_interrupted_transcriptions()?;
    let user = db.get_or_create_user(&cli.email)?;
    let state = AppState::new(db, cli.audio_dir.clone());
    let json = cli.json;

    match cli.command {
        Commands::Connect { token, server, device } => {
            let api_base = resolve_api_base(&server).map_err(anyhow::Error::msg)?;
            let client = PlaudClient::new(api_base, token.clone())?;
            let devices = client.list_devices().await.context("Plaud rejected the connection")?;
            state.db().upsert_plaud_connection(&user.id, &token, &server, device.as_deref())?;
            println!("Connected {} ({} device(s))", user.email, devices.len());
        }
        Commands::Devices => {
            let devices = state.catalog_for(&user.id)?.list_devices().await?;
            if json {
                print_json(&devices)?;
            } else {
                for device in devices {
                    println!("{}\t{}\t{}", device.sn, device.name, device.model);
                }
            }
        }
        Commands::Sync => {
            let dispatch = state.sync_now(&user.id).await?;
            report_dispatch(&dispatch, json)?;
            state.shutdown();
        }
        Commands::Watch => {
            let handle = state.scheduler(&user.id)?;
            report_dispatch(&handle.request_sync(SyncTrigger::Mount).await, json)?;
            log::info!("Watching for new recordings, Ctrl-C to stop");
            tokio::signal::ctrl_c().await.context("Failed to listen for Ctrl-C")?;
            state.shutdown();
        }
        Commands::Recordings { all } => {
            let recordings = state.db().list_recordings(&user.id, all)?;
            if json {
                print_json(&recordings)?;
            } else {
                for recording in recordings {
                    let status = state
                        .db()
                        .get_transcription(&recording.id)?
                        .map(|t| t.status.to_string())
                        .unwrap_or_else(|| "none".to_string());
                    let trash = if recording.is_trash { " [trash]" } else { "" };
                    println!("{}\t{}\t{}{}", recording.id, status, recording.filename, trash);
                }
            }
        }
        Commands::Transcribe { recording_id, force } => {
            let transcription = state.jobs().transcribe(&user.id, &recording_id, force).await?;
            if json {
                print_json(&transcription)?;
            } else {
                println!("{}", transcription.text.unwrap_or_default());
            }
        }
        Commands::Backfill => {
            let report = state.sweeper().backfill(&user.id).await;
            if json {
                print_json(&report)?;
            } else {
                println!("Filled {} transcript(s)", report.filled);
                for error in &report.errors {
                    let id = if error.recording_id.is_empty() { "(sweep)" } else { error.recording_id.as_str() };
                    println!("  {}: {}", id, error.message);
                }
            }
        }
        Commands::Provider { action } => provider_command(&state, &user.id, action, json)?,
        Commands::Settings { action } => {
            if let Some(SettingsAction::Set { key, value }) = action {
                set_setting(&state, &user.id, &key, &value).await?;
            }
            print_json(&state.db().load_sync_settings(&user.id)?)?;
        }
    }

    Ok(())
}

fn provider_command(state: &AppState, user_id: &str, action: ProviderAction, json: bool) -> Result<()> {
    match action {
        ProviderAction::Add { kind, api_key, base_url, model, default } => {
            let kind: ProviderKind = kind.parse().map_err(anyhow::Error::msg)?;
            if kind.requires_api_key() && api_key.is_empty() {
                bail!("{} needs an API key (--api-key)", kind);
            }
            let config = state.db().upsert_provider_config(user_id, &UpsertProviderConfig {
                provider: kind.name().to_string(),
                base_url,
                api_key,
                default_model: model,
                is_default_transcription: default,
                ..Default::default()
            })?;
            println!("Added {} provider {}", config.provider, config.id);
        }
        ProviderAction::Default { id, capability } => {
            state.db().set_default_provider(user_id, &id, capability.into())?;
            println!("{} is now the default for {}", id, ProviderCapability::from(capability));
        }
        ProviderAction::List => {
            let configs = state.db().list_provider_configs(user_id)?;
            if json {
                print_json(&configs)?;
            } else {
                for config in configs {
                    let mut flags = Vec::new();
                    if config.is_default_transcription {
                        flags.push("transcription");
                    }
                    if config.is_default_enhancement {
                        flags.push("enhancement");
                    }
                    println!("{}\t{}\t{}", config.id, config.provider, flags.join(","));
                }
            }
        }
    }
    Ok(())
}

async fn set_setting(state: &AppState, user_id: &str, key: &str, value: &str) -> Result<()> {
    if NUMBER_SETTINGS.contains(&key) {
        value.parse::<u64>().with_context(|| format!("{} must be a number", key))?;
        state.db().set_setting(user_id, key, value, "number")?;
    } else if BOOL_SETTINGS.contains(&key) {
        if value != "true" && value != "false" {
            bail!("{} must be true or false", key);
        }
        state.db().set_setting(user_id, key, value, "boolean")?;
    } else if key == "default_transcription_language" {
        state.db().set_setting(user_id, key, value, "string")?;
    } else {
        bail!("Unknown setting: {}", key);
    }

    let settings = state.db().load_sync_settings(user_id)?;
    state.update_sync_settings(user_id, settings).await
}

fn report_dispatch(dispatch: &SyncDispatch, json: bool) -> Result<()> {
    if json {
        if let Some(result) = dispatch.result() {
            print_json(result)?;
        }
        return Ok(());
    }

    match dispatch {
        SyncDispatch::Ran(result) | SyncDispatch::Joined(result) => {
            if let Some(error) = &result.error {
                println!("Sync failed: {}", error);
            } else {
                println!(
                    "Synced: {} new, {} updated, {} trashed",
                    result.new_recordings, result.updated_recordings, result.trashed_recordings
                );
            }
        }
        SyncDispatch::Skipped { reason, .. } => println!("Sync skipped: {:?}", reason),
    }
    Ok(())
}

fn print_json<T: Serialize + ?Sized>(value: &T) -> Result<()> {
    println!("{}", serde_json::to_string_pretty(value)?);
    Ok(())
}
