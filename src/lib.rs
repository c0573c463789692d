//! # Guild Jukebox
//!
//! Discord music bot: each guild gets its own FIFO of requested tracks and a
//! long-lived player task that streams them, one at a time, into the guild's
//! voice channel.
//!
//! - [`audio`] - queues, players and the voice seam
//! - [`sources`] - turning URLs and search terms into streams
//! - [`bot`] - Discord event handling and commands
//! - [`ui`] - embeds shown to users

pub mod audio;
pub mod bot;
pub mod config;
pub mod error;
pub mod keep_alive;
pub mod sources;
pub mod ui;

#[cfg(test)]
pub(crate) mod testing;
