/// Hush Player - headless guided-audio session player
use clap::{Parser, Subcommand};
use hush_core::{Category, InMemoryCatalog, InMemoryStore, PersistenceStore, SessionId};
use hush_player::platform::format_clock;
use hush_player::{
    forward_expiry_notices, headless_platform, list_sessions, load_catalog, playable_session,
    HushConfig,
};
use hush_playback::{PlaybackEvent, PlaybackService, PlaybackState};
use std::path::PathBuf;
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::broadcast::error::RecvError;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

#[derive(Parser)]
#[command(name = "hush-player")]
#[command(about = "Headless Hush guided-audio player", long_about = None)]
struct Cli {
    /// Configuration file path (defaults to ./hush.toml when present)
    #[arg(short, long, global = true, env = "HUSH_CONFIG")]
    config: Option<PathBuf>,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// List catalog sessions
    List {
        /// Only show one category
        #[arg(short = 'C', long, value_parser = parse_category)]
        category: Option<Category>,
    },
    /// Play a session until it completes or is interrupted
    Play {
        /// Session identifier
        session_id: String,
        /// Start offset in seconds (defaults to the last saved position)
        #[arg(short, long, value_parser = parse_seconds)]
        offset: Option<Duration>,
        /// Loop the session
        #[arg(short, long)]
        repeat: bool,
        /// Rating (1-5) attached to the completion record
        #[arg(long, value_parser = clap::value_parser!(u8).range(1..=5))]
        rating: Option<u8>,
    },
}

fn parse_category(value: &str) -> Result<Category, String> {
    Category::from_str(&value.to_ascii_lowercase())
        .ok_or_else(|| format!("unknown category: {value}"))
}

fn parse_seconds(value: &str) -> Result<Duration, String> {
    let secs: f64 = value.parse().map_err(|e| format!("{e}"))?;
    Duration::try_from_secs_f64(secs).map_err(|e| e.to_string())
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();

    let config = HushConfig::load(cli.config.as_deref())?;
    config.validate()?;

    // Initialize tracing
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| config.log_filter.clone().into()),
        )
        .with(tracing_subscriber::fmt::layer())
        .init();

    let catalog = load_catalog(&config.catalog_path)?;

    match cli.command {
        Commands::List { category } => {
            list(&catalog, category).await?;
        }
        Commands::Play {
            session_id,
            offset,
            repeat,
            rating,
        } => {
            play(config, &catalog, &session_id, offset, repeat, rating).await?;
        }
    }

    Ok(())
}

async fn list(catalog: &InMemoryCatalog, category: Option<Category>) -> anyhow::Result<()> {
    let sessions = list_sessions(catalog, category).await?;

    println!("Sessions:");
    for session in sessions {
        let length = session
            .duration
            .map_or_else(|| "--:--".to_string(), format_clock);
        let lock = if session.premium { " [premium]" } else { "" };
        println!(
            "  {} - {} ({}, {}){}",
            session.id, session.title, session.category, length, lock
        );
    }

    Ok(())
}

async fn play(
    config: HushConfig,
    catalog: &InMemoryCatalog,
    session_id: &str,
    offset: Option<Duration>,
    repeat: bool,
    rating: Option<u8>,
) -> anyhow::Result<()> {
    let entitlements = config.entitlements.provider();
    let session = playable_session(catalog, &entitlements, &SessionId::new(session_id)).await?;

    let store: Arc<dyn PersistenceStore> = Arc::new(InMemoryStore::new());
    let (platform, notices) = headless_platform(&config, store);

    let mut playback = config.playback.clone();
    playback.repeat |= repeat;
    let handle = PlaybackService::spawn(playback, platform);
    if let Some(notices) = notices {
        tokio::spawn(forward_expiry_notices(notices, handle.signal_sender()));
    }

    let mut status = handle.subscribe_state();
    let mut events = handle.subscribe_events();

    tracing::info!("Starting {} - {}", session.id, session.title);
    let state = handle.start(session, offset).await?;
    tracing::info!("Session is {}", state);
    if let Some(rating) = rating {
        handle.set_pending_rating(rating);
    }

    let ctrl_c = tokio::signal::ctrl_c();
    tokio::pin!(ctrl_c);

    loop {
        tokio::select! {
            _ = &mut ctrl_c => {
                tracing::info!("Interrupted, stopping playback");
                handle.stop();
                break;
            }
            changed = status.changed() => {
                if changed.is_err() {
                    break;
                }
                let current = *status.borrow_and_update();
                if matches!(current.state, PlaybackState::Idle | PlaybackState::Failed) {
                    break;
                }
            }
            event = events.recv() => match event {
                Ok(event) => report(&event),
                Err(RecvError::Lagged(_)) => {}
                Err(RecvError::Closed) => break,
            },
        }
    }

    // Events queued alongside the final state change
    while let Ok(event) = events.try_recv() {
        report(&event);
    }

    if handle.status().state == PlaybackState::Failed {
        anyhow::bail!("Playback failed");
    }

    Ok(())
}

fn report(event: &PlaybackEvent) {
    match event {
        PlaybackEvent::CompletionRecorded(record) => {
            println!(
                "Completed {} after {}",
                record.session_id,
                format_clock(record.duration_played)
            );
        }
        PlaybackEvent::Warning { message } => tracing::warn!("{}", message),
        PlaybackEvent::Error { message } => tracing::error!("{}", message),
        _ => {}
    }
}
