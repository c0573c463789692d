//! # Audio Module
//!
//! Per-guild queueing and playback for Guild Jukebox.
//!
//! ## Architecture
//!
//! ### [`queue`] - Guild Queues
//! - Unbounded FIFO per guild, many producers, one consumer
//! - Lazily created, never removed
//!
//! ### [`player`] - Player Loop
//! - One long-lived task per guild, spawned on first submission
//! - Advances only by polling the voice session, never from callbacks
//!
//! ### [`manager`] - Entry Points
//! - `submit_track`, `pause`, `resume`, `skip`, `stop`
//! - Owns the registries and decides what the requester hears back
//!
//! ### [`session`] / [`songbird`] - Voice Seam
//! - Trait boundary between the core and the voice transport
//! - Songbird implementation streaming over HTTP
//!
//! ## Concurrency
//!
//! Every guild is independent: its own queue, its own player task, its own
//! voice session. Resolution awaits an extractor subprocess, so a slow lookup
//! stalls only the command that asked for it.

pub mod manager;
pub mod player;
pub mod queue;
pub mod session;
pub mod songbird;
pub mod track;

pub use manager::MusicManager;
pub use track::{ResolvedTrack, TrackRequest};
