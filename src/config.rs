use anyhow::{Context, Result};
use std::{path::PathBuf, time::Duration};

#[derive(Debug, Clone)]
pub struct Config {
    // Discord
    pub discord_token: String,
    pub guild_id: Option<u64>, // slash commands registered to this guild only
    pub command_prefix: String,

    // Extraction
    pub ytdlp_path: PathBuf,
    pub cookies_file: PathBuf,

    // Playback
    pub poll_interval_ms: u64,

    // Ops
    pub log_file: PathBuf,
    pub keep_alive_port: u16,
}

impl Config {
    pub fn load() -> Result<Self> {
        dotenvy::dotenv().ok();
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    /// Builds a config from any key → value source. Unset keys take defaults.
    pub fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Result<Self> {
        let defaults = Self::default();
        let var = |key: &str| lookup(key).filter(|value| !value.trim().is_empty());

        let config = Self {
            discord_token: var("DISCORD_TOKEN").context("DISCORD_TOKEN is not set")?,
            guild_id: match var("GUILD_ID") {
                Some(id) => Some(id.trim().parse::<u64>().context("GUILD_ID must be a numeric id")?),
                None => None,
            },
            command_prefix: var("COMMAND_PREFIX").unwrap_or(defaults.command_prefix),

            ytdlp_path: var("YTDLP_PATH").map_or(defaults.ytdlp_path, PathBuf::from),
            cookies_file: var("COOKIES_FILE").map_or(defaults.cookies_file, PathBuf::from),

            poll_interval_ms: match var("POLL_INTERVAL_MS") {
                Some(ms) => ms.trim().parse::<u64>().context("POLL_INTERVAL_MS must be an integer")?,
                None => defaults.poll_interval_ms,
            },

            log_file: var("LOG_FILE").map_or(defaults.log_file, PathBuf::from),
            keep_alive_port: match var("KEEP_ALIVE_PORT") {
                Some(port) => port.trim().parse::<u16>().context("KEEP_ALIVE_PORT must be a port number")?,
                None => defaults.keep_alive_port,
            },
        };

        config.validate()?;
        Ok(config)
    }

    /// Sanity checks that would otherwise surface as confusing runtime behavior.
    pub fn validate(&self) -> Result<()> {
        if self.discord_token.trim().is_empty() {
            anyhow::bail!("Discord token cannot be empty");
        }

        if self.poll_interval_ms == 0 {
            anyhow::bail!("Poll interval must be greater than 0");
        }

        if self.command_prefix.is_empty() {
            anyhow::bail!("Command prefix cannot be empty");
        }

        Ok(())
    }

    pub fn poll_interval(&self) -> Duration {
        Duration::from_millis(self.poll_interval_ms)
    }

    /// The cookies file, if one is actually on disk.
    pub fn cookies(&self) -> Option<PathBuf> {
        self.cookies_file.is_file().then(|| self.cookies_file.clone())
    }

    /// Token-free summary for the startup log.
    pub fn summary(&self) -> String {
        format!(
            "Config Summary:\n  \
            Discord: commands {} (prefix '{}')\n  \
            Extractor: {} (cookies: {})\n  \
            Playback: poll every {}ms\n  \
            Ops: log file {}, keep-alive {}",
            self.guild_id
                .map_or("global".to_string(), |id| format!("in guild {}", id)),
            self.command_prefix,
            self.ytdlp_path.display(),
            if self.cookies().is_some() { "yes" } else { "no" },
            self.poll_interval_ms,
            self.log_file.display(),
            if self.keep_alive_port == 0 {
                "disabled".to_string()
            } else {
                format!("on port {}", self.keep_alive_port)
            }
        )
    }
}

impl Default for Config {
    fn default() -> Self {
        Self {
            // Discord (no default token)
            discord_token: String::new(),
            guild_id: None,
            command_prefix: "/".to_string(),

            ytdlp_path: "yt-dlp".into(),
            cookies_file: "cookies.txt".into(),

            poll_interval_ms: 500,

            log_file: "discord.log".into(),
            keep_alive_port: 8080,
        }
    }
}
