//! # Bot Module
//!
//! Discord glue for Guild Jukebox.
//!
//! [`JukeboxBot`] implements Serenity's [`EventHandler`] and does three things:
//!
//! - Registers the slash commands once the gateway is ready
//! - Turns slash and prefix commands into [`MusicManager`] calls
//! - Tells the manager when Discord drops the bot's voice connection
//!
//! Everything that decides *what* happens lives in [`crate::audio`]; this
//! module only translates.

use anyhow::Result;
use serenity::{
    all::{Context, EventHandler, GuildId, Interaction, Message, Ready, VoiceState},
    async_trait,
};
use std::sync::Arc;
use tracing::{error, info, warn};

pub mod commands;
pub mod context;
pub mod handlers;

use crate::{audio::MusicManager, config::Config};

/// Serenity event handler shared by every shard.
pub struct JukeboxBot {
    config: Arc<Config>,
    music: Arc<MusicManager>,
}

impl JukeboxBot {
    pub fn new(config: Config, music: Arc<MusicManager>) -> Self {
        Self {
            config: Arc::new(config),
            music,
        }
    }

    /// Registers slash commands, to one guild if `GUILD_ID` is set, globally otherwise.
    ///
    /// Guild commands propagate in about a second; global ones can take up to an hour.
    async fn register_commands(&self, ctx: &Context) -> Result<()> {
        info!("📝 Registering slash commands...");

        match self.config.guild_id {
            Some(guild_id) => {
                let guild_id = GuildId::new(guild_id);

                if !ctx.cache.guilds().contains(&guild_id) {
                    warn!("⚠️ Bot is not a member of configured guild {}", guild_id);
                    return Ok(());
                }

                commands::register_guild_commands(ctx, guild_id).await?;
                info!("✅ Guild commands registered for {}", guild_id);
            }
            None => {
                commands::register_global_commands(ctx).await?;
                info!("✅ Global commands registered");
            }
        }

        Ok(())
    }
}

#[async_trait]
impl EventHandler for JukeboxBot {
    async fn ready(&self, ctx: Context, ready: Ready) {
        info!("🤖 {} is online!", ready.user.name);
        info!("📊 Connected to {} guilds", ready.guilds.len());

        if let Err(e) = self.register_commands(&ctx).await {
            error!("Failed to register commands: {:?}", e);
        }
    }

    async fn interaction_create(&self, ctx: Context, interaction: Interaction) {
        if let Interaction::Command(command) = interaction {
            if let Err(e) = handlers::handle_command(&ctx, command, &self.music).await {
                error!("Error handling command: {:?}", e);
            }
        }
    }

    async fn message(&self, ctx: Context, message: Message) {
        if message.author.bot {
            return;
        }

        if let Err(e) =
            handlers::handle_message(&ctx, &message, &self.config.command_prefix, &self.music).await
        {
            error!("Error handling message command: {:?}", e);
        }
    }

    /// Only the bot's own state matters: leaving a channel without `/stop`
    /// (kicked, channel deleted, network drop) invalidates the session.
    async fn voice_state_update(&self, ctx: Context, old: Option<VoiceState>, new: VoiceState) {
        let current_user_id = ctx.cache.current_user().id;
        if new.user_id != current_user_id {
            return;
        }

        if old.is_some() && new.channel_id.is_none() {
            if let Some(guild_id) = new.guild_id {
                self.music.handle_bot_disconnected(guild_id);
            }
        }
    }
}
