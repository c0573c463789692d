//! Voice platform seam.
//!
//! The core sequences calls against these traits and owns none of the
//! transport. Production uses [`super::songbird::SongbirdVoice`]; tests use
//! in-memory fakes.

use async_trait::async_trait;
use serenity::model::id::{ChannelId, GuildId};
use std::sync::Arc;

use super::track::StreamHeaders;
use crate::error::VoiceError;

/// Called when a stream ends, with the error text if it failed.
///
/// Side effects only (logging). Nothing may drive playback from here; the
/// player loop's status polling is the only thing that advances a queue.
pub type PlaybackHook = Box<dyn Fn(Option<String>) + Send + Sync>;

/// Live voice connection for one guild.
#[async_trait]
pub trait VoiceSession: Send + Sync {
    async fn is_connected(&self) -> bool;

    async fn is_playing(&self) -> bool;

    async fn is_paused(&self) -> bool;

    /// Starts streaming `stream_url`, replacing nothing already queued on the platform side.
    async fn play(
        &self,
        stream_url: &str,
        headers: &StreamHeaders,
        on_finish: PlaybackHook,
    ) -> Result<(), VoiceError>;

    async fn pause(&self);

    async fn resume(&self);

    /// Stops the current stream only. The connection stays up.
    async fn stop(&self);
}

/// Owns the per-guild voice connections.
#[async_trait]
pub trait VoiceManager: Send + Sync {
    /// Joins `channel_id`, reusing a live connection for the guild if one exists.
    async fn connect(
        &self,
        guild_id: GuildId,
        channel_id: ChannelId,
    ) -> Result<Arc<dyn VoiceSession>, VoiceError>;

    async fn disconnect(&self, guild_id: GuildId) -> Result<(), VoiceError>;

    /// Current session for the guild, if one was ever established and not dropped.
    fn session(&self, guild_id: GuildId) -> Option<Arc<dyn VoiceSession>>;

    /// Drops bookkeeping for a connection the platform already closed.
    fn forget(&self, guild_id: GuildId);
}
