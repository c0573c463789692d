use serenity::model::id::{ChannelId, GuildId};
use std::{sync::Arc, time::Duration};
use tracing::{error, info, warn};

use super::{
    player::{GuildPlayer, PlayerRegistry},
    queue::QueueRegistry,
    session::{VoiceManager, VoiceSession},
    track::TrackRequest,
};
use crate::{
    bot::context::{CommandContext, Reply},
    error::{MusicError, Result, VoiceError},
    sources::TrackResolver,
    ui::embeds::TrackCard,
};

pub const NOT_IN_GUILD: &str = "This command only works in a server.";
pub const NOT_IN_VOICE: &str = "You are not in a voice channel.";
pub const CONNECT_FAILED: &str = "Error connecting to the voice channel.";
pub const RESOLVE_FAILED: &str = "Error retrieving audio information. Please try another URL.";
pub const SEARCHING: &str = "🔍 Searching...";

/// Where a submitted track ended up.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SubmitOutcome {
    /// Nothing was playing or waiting; the player picks it up next.
    Starting,
    /// Behind at least one other track.
    Queued,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PauseOutcome {
    Paused,
    NothingPlaying,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ResumeOutcome {
    Resumed,
    NotPaused,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SkipOutcome {
    Skipped,
    NothingToSkip,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StopOutcome {
    Disconnected,
    NotConnected,
}

impl PauseOutcome {
    pub fn reply_text(self) -> Option<&'static str> {
        match self {
            PauseOutcome::Paused => Some("Paused"),
            PauseOutcome::NothingPlaying => Some("Nothing is playing"),
        }
    }
}

impl ResumeOutcome {
    pub fn reply_text(self) -> Option<&'static str> {
        match self {
            ResumeOutcome::Resumed => Some("Resumed"),
            ResumeOutcome::NotPaused => None,
        }
    }
}

impl SkipOutcome {
    pub fn reply_text(self) -> Option<&'static str> {
        match self {
            SkipOutcome::Skipped => Some("Skipped"),
            SkipOutcome::NothingToSkip => Some("Nothing to skip"),
        }
    }
}

impl StopOutcome {
    pub fn reply_text(self) -> Option<&'static str> {
        match self {
            StopOutcome::Disconnected => Some("Disconnected"),
            StopOutcome::NotConnected => None,
        }
    }
}

/// Owns every guild's queue and player, and the seams they run against.
///
/// One instance lives for the whole process and is shared by all command
/// handlers.
pub struct MusicManager {
    queues: QueueRegistry,
    players: PlayerRegistry,
    voice: Arc<dyn VoiceManager>,
    resolver: Arc<dyn TrackResolver>,
    poll_interval: Duration,
}

impl MusicManager {
    pub fn new(
        voice: Arc<dyn VoiceManager>,
        resolver: Arc<dyn TrackResolver>,
        poll_interval: Duration,
    ) -> Self {
        Self {
            queues: QueueRegistry::new(),
            players: PlayerRegistry::new(),
            voice,
            resolver,
            poll_interval,
        }
    }

    /// Resolves `query` and appends it to the requester's guild queue.
    ///
    /// Every failure has already been reported to the requester when this
    /// returns `Err`. Resolution failures never create a queue or a player.
    pub async fn submit_track(&self, ctx: &CommandContext, query: &str) -> Result<SubmitOutcome> {
        let Some(guild_id) = ctx.guild_id() else {
            ctx.reply(Reply::text(NOT_IN_GUILD).ephemeral()).await;
            return Err(MusicError::NotInGuild);
        };

        let Some(channel_id) = ctx.voice_channel() else {
            ctx.reply(Reply::text(NOT_IN_VOICE).ephemeral()).await;
            return Err(MusicError::NotInVoiceChannel);
        };

        let session = match self.ensure_connected(guild_id, channel_id).await {
            Ok(session) => session,
            Err(e) => {
                error!("❌ Voice connection failed in guild {}: {}", guild_id, e);
                ctx.reply(Reply::text(CONNECT_FAILED).ephemeral()).await;
                return Err(e.into());
            }
        };

        let status = ctx.reply(Reply::text(SEARCHING).ephemeral()).await;

        let track = match self.resolver.resolve(query).await {
            Ok(track) => track,
            Err(e) => {
                error!("❌ Could not resolve '{}' in guild {}: {}", query, guild_id, e);
                if let Some(message) = status {
                    ctx.reply_target().delete(message).await;
                }
                ctx.reply(Reply::text(RESOLVE_FAILED).ephemeral()).await;
                return Err(e.into());
            }
        };

        let queue = self.queues.get_or_create(guild_id);
        // Snapshot before the push; the player may pick the item up at once.
        let was_idle = !session.is_playing().await && queue.is_empty();

        let card = TrackCard::queued(&track);
        queue.enqueue(TrackRequest::new(track, ctx.requester(), ctx.reply_target()));
        info!(
            "➕ Queued '{}' in guild {} ({} waiting)",
            card.title,
            guild_id,
            queue.len()
        );

        if let Some(message) = status {
            ctx.reply_target().delete(message).await;
        }

        if !was_idle {
            ctx.reply(Reply::card(card)).await;
        }

        self.ensure_player(guild_id);

        Ok(if was_idle {
            SubmitOutcome::Starting
        } else {
            SubmitOutcome::Queued
        })
    }

    pub async fn pause(&self, guild_id: GuildId) -> PauseOutcome {
        let Some(session) = self.voice.session(guild_id) else {
            return PauseOutcome::NothingPlaying;
        };

        if session.is_playing().await {
            session.pause().await;
            info!("⏸️ Paused playback in guild {}", guild_id);
            PauseOutcome::Paused
        } else {
            PauseOutcome::NothingPlaying
        }
    }

    pub async fn resume(&self, guild_id: GuildId) -> ResumeOutcome {
        let Some(session) = self.voice.session(guild_id) else {
            return ResumeOutcome::NotPaused;
        };

        if session.is_paused().await {
            session.resume().await;
            info!("▶️ Resumed playback in guild {}", guild_id);
            ResumeOutcome::Resumed
        } else {
            ResumeOutcome::NotPaused
        }
    }

    /// Stops the current stream. The player notices on its next poll and
    /// moves on to whatever is queued.
    pub async fn skip(&self, guild_id: GuildId) -> SkipOutcome {
        let Some(session) = self.voice.session(guild_id) else {
            return SkipOutcome::NothingToSkip;
        };

        if session.is_playing().await || session.is_paused().await {
            session.stop().await;
            info!("⏭️ Skipped track in guild {}", guild_id);
            SkipOutcome::Skipped
        } else {
            SkipOutcome::NothingToSkip
        }
    }

    /// Leaves voice. The queue and the player task stay; queued items are
    /// dropped one by one as the player finds no connection for them.
    pub async fn stop(&self, guild_id: GuildId) -> StopOutcome {
        if self.voice.session(guild_id).is_none() {
            return StopOutcome::NotConnected;
        }

        if let Err(e) = self.voice.disconnect(guild_id).await {
            warn!("Disconnect in guild {} reported an error: {}", guild_id, e);
        }
        info!("⏹️ Stopped and disconnected in guild {}", guild_id);
        StopOutcome::Disconnected
    }

    /// The platform closed the bot's voice connection without a stop command.
    pub fn handle_bot_disconnected(&self, guild_id: GuildId) {
        self.voice.forget(guild_id);
        info!("🔌 Voice connection closed in guild {}", guild_id);
    }

    pub fn queue_len(&self, guild_id: GuildId) -> usize {
        self.queues.get(guild_id).map_or(0, |queue| queue.len())
    }

    pub fn has_queue(&self, guild_id: GuildId) -> bool {
        self.queues.get(guild_id).is_some()
    }

    pub fn has_player(&self, guild_id: GuildId) -> bool {
        self.players.is_running(guild_id)
    }

    pub fn players_spawned(&self) -> usize {
        self.players.spawn_count()
    }

    async fn ensure_connected(
        &self,
        guild_id: GuildId,
        channel_id: ChannelId,
    ) -> std::result::Result<Arc<dyn VoiceSession>, VoiceError> {
        let session = match self.voice.session(guild_id) {
            Some(session) => session,
            None => self.voice.connect(guild_id, channel_id).await?,
        };

        if session.is_connected().await {
            Ok(session)
        } else {
            Err(VoiceError::NotConnected)
        }
    }

    fn ensure_player(&self, guild_id: GuildId) {
        let queue = self.queues.get_or_create(guild_id);
        let voice = self.voice.clone();
        let poll_interval = self.poll_interval;

        let started = self.players.ensure_running(guild_id, move || {
            tokio::spawn(GuildPlayer::new(guild_id, queue, voice, poll_interval).run())
        });
        if started {
            info!("🎶 Started player for guild {}", guild_id);
        }
    }
}
