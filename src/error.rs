//! Error types for the playback core.
//!
//! Glue code (startup, Discord handlers) works with `anyhow`; everything the
//! queue and player touch returns one of these so callers can decide what the
//! user gets to see.

use thiserror::Error;

/// Failures while turning a URL or search term into a playable stream.
#[derive(Error, Debug)]
pub enum ResolveError {
    #[error("failed to launch extractor: {0}")]
    Spawn(#[from] std::io::Error),

    #[error("extractor exited with failure: {0}")]
    ExtractorFailed(String),

    #[error("extractor returned malformed output: {0}")]
    InvalidOutput(#[from] serde_json::Error),

    #[error("playlist has no entries")]
    EmptyPlaylist,

    #[error("no stream url in extractor output")]
    MissingStreamUrl,
}

/// Failures talking to the voice platform.
#[derive(Error, Debug)]
pub enum VoiceError {
    #[error("could not join voice channel: {0}")]
    Connect(String),

    #[error("voice session is not connected")]
    NotConnected,

    #[error("voice client is not initialised")]
    Unavailable,
}

/// Errors surfaced by the entry points in [`crate::audio::manager`].
#[derive(Error, Debug)]
pub enum MusicError {
    #[error("command used outside of a guild")]
    NotInGuild,

    #[error("requester is not in a voice channel")]
    NotInVoiceChannel,

    #[error(transparent)]
    VoiceConnect(#[from] VoiceError),

    #[error(transparent)]
    Resolution(#[from] ResolveError),
}

pub type Result<T> = std::result::Result<T, MusicError>;
