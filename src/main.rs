use anyhow::Result;
use serenity::{model::gateway::GatewayIntents, Client};
use songbird::{SerenityInit, Songbird};
use std::{path::Path, sync::Arc};
use tracing::{error, info};
use tracing_appender::non_blocking::WorkerGuard;
use tracing_subscriber::{fmt, prelude::*, EnvFilter};

use guild_jukebox::{
    audio::{songbird::SongbirdVoice, MusicManager},
    bot::JukeboxBot,
    config::Config,
    keep_alive,
    sources::{FallbackResolver, YtDlpExtractor},
};

#[tokio::main]
async fn main() -> Result<()> {
    let config = Config::load()?;
    let _log_guard = init_tracing(&config)?;

    info!("🎵 Starting Guild Jukebox v{}", env!("CARGO_PKG_VERSION"));

    if std::env::args().any(|arg| arg == "--health-check") {
        return health_check(&config).await;
    }

    info!("{}", config.summary());

    let cookies = config.cookies();
    if cookies.is_none() {
        info!("🍪 No cookies file at {}, extracting anonymously", config.cookies_file.display());
    }
    let resolver = Arc::new(FallbackResolver::new(
        YtDlpExtractor::new(config.ytdlp_path.clone()),
        cookies,
    ));

    let songbird = Songbird::serenity();
    let voice = Arc::new(SongbirdVoice::new(songbird.clone())?);
    let music = Arc::new(MusicManager::new(voice, resolver, config.poll_interval()));

    keep_alive::spawn(config.keep_alive_port);

    let intents = GatewayIntents::GUILDS
        | GatewayIntents::GUILD_VOICE_STATES
        | GatewayIntents::GUILD_MESSAGES
        | GatewayIntents::MESSAGE_CONTENT;

    let handler = JukeboxBot::new(config.clone(), music);

    let mut client = Client::builder(&config.discord_token, intents)
        .event_handler(handler)
        .register_songbird_with(songbird)
        .await?;

    let shard_manager = client.shard_manager.clone();
    tokio::spawn(async move {
        match tokio::signal::ctrl_c().await {
            Ok(()) => {
                info!("⚠️ Shutdown signal received, closing...");
                shard_manager.shutdown_all().await;
            }
            Err(e) => error!("Could not listen for Ctrl+C: {:?}", e),
        }
    });

    info!("🚀 Bot started");
    if let Err(why) = client.start().await {
        error!("Client error: {:?}", why);
    }

    Ok(())
}

/// Console gets our crate at debug; the log file gets serenity and songbird
/// at debug for digging into gateway and voice problems.
fn init_tracing(config: &Config) -> Result<WorkerGuard> {
    let console_filter = EnvFilter::from_default_env()
        .add_directive("guild_jukebox=debug".parse()?)
        .add_directive("serenity=info".parse()?)
        .add_directive("songbird=info".parse()?);

    let log_dir = config
        .log_file
        .parent()
        .filter(|dir| !dir.as_os_str().is_empty())
        .unwrap_or_else(|| Path::new("."));
    let log_name = config
        .log_file
        .file_name()
        .ok_or_else(|| anyhow::anyhow!("LOG_FILE must name a file"))?;

    let (file_writer, guard) =
        tracing_appender::non_blocking(tracing_appender::rolling::never(log_dir, log_name));

    tracing_subscriber::registry()
        .with(fmt::layer().with_filter(console_filter))
        .with(
            fmt::layer()
                .with_writer(file_writer)
                .with_ansi(false)
                .with_filter(EnvFilter::new("serenity=debug,songbird=debug")),
        )
        .init();

    Ok(guard)
}

async fn health_check(config: &Config) -> Result<()> {
    let yt_dlp = async_process::Command::new(&config.ytdlp_path)
        .arg("--version")
        .output()
        .await?;

    if yt_dlp.status.success() {
        println!("OK");
        Ok(())
    } else {
        anyhow::bail!("{} is not usable", config.ytdlp_path.display());
    }
}
