use dashmap::{mapref::entry::Entry, DashMap};
use serenity::model::id::GuildId;
use std::{
    sync::{
        atomic::{AtomicUsize, Ordering},
        Arc,
    },
    time::Duration,
};
use tokio::task::JoinHandle;
use tracing::{debug, error, info, warn};

use super::{
    queue::GuildQueue,
    session::{PlaybackHook, VoiceManager, VoiceSession},
    track::TrackRequest,
};
use crate::{bot::context::Reply, ui::embeds::TrackCard};

/// The per-guild playback loop.
///
/// Cycles through awaiting (parked in [`GuildQueue::dequeue`]), streaming
/// (session re-checked, stream started, requester told) and waiting for
/// completion (polling until the session is neither playing nor paused).
/// It never exits on its own.
pub struct GuildPlayer {
    guild_id: GuildId,
    queue: Arc<GuildQueue>,
    voice: Arc<dyn VoiceManager>,
    poll_interval: Duration,
}

impl GuildPlayer {
    pub fn new(
        guild_id: GuildId,
        queue: Arc<GuildQueue>,
        voice: Arc<dyn VoiceManager>,
        poll_interval: Duration,
    ) -> Self {
        Self {
            guild_id,
            queue,
            voice,
            poll_interval,
        }
    }

    pub async fn run(self) {
        info!("▶️ Player loop started for guild {}", self.guild_id);
        loop {
            let request = self.queue.dequeue().await;
            self.play(request).await;
        }
    }

    async fn play(&self, request: TrackRequest) {
        let session = match self.voice.session(self.guild_id) {
            Some(session) => session,
            None => {
                warn!(
                    "Dropping '{}' in guild {}: no voice session",
                    request.title(),
                    self.guild_id
                );
                return;
            }
        };
        if !session.is_connected().await {
            warn!(
                "Dropping '{}' in guild {}: voice session is no longer connected",
                request.title(),
                self.guild_id
            );
            return;
        }

        let guild_id = self.guild_id;
        let title = request.title().to_string();
        let on_finish: PlaybackHook = Box::new(move |error| match error {
            Some(e) => error!("Player error in guild {} on '{}': {}", guild_id, title, e),
            None => debug!("Stream for '{}' ended in guild {}", title, guild_id),
        });

        if let Err(e) = session
            .play(request.stream_url(), request.headers(), on_finish)
            .await
        {
            error!(
                "Could not start '{}' in guild {}: {}",
                request.title(),
                self.guild_id,
                e
            );
            return;
        }

        info!("🎵 Now playing '{}' in guild {}", request.title(), self.guild_id);
        request
            .reply_to()
            .send(Reply::card(TrackCard::now_playing(
                request.track(),
                request.requested_by(),
            )))
            .await;

        self.wait_for_completion(session.as_ref()).await;
        debug!("Finished '{}' in guild {}", request.title(), self.guild_id);
    }

    /// Skips, stops, errors and natural ends all look the same from here.
    async fn wait_for_completion(&self, session: &dyn VoiceSession) {
        while session.is_playing().await || session.is_paused().await {
            tokio::time::sleep(self.poll_interval).await;
        }
    }
}

/// Guild id → running player task.
///
/// Holds the invariant that a guild has at most one live player.
#[derive(Debug, Default)]
pub struct PlayerRegistry {
    players: DashMap<GuildId, JoinHandle<()>>,
    spawned: AtomicUsize,
}

impl PlayerRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Spawns a player via `spawn` unless a live one is registered.
    ///
    /// The check and the insert happen under the same map entry lock, so
    /// racing callers for one guild spawn exactly once. Returns whether a
    /// new task was started.
    pub fn ensure_running<F>(&self, guild_id: GuildId, spawn: F) -> bool
    where
        F: FnOnce() -> JoinHandle<()>,
    {
        let started = match self.players.entry(guild_id) {
            Entry::Occupied(mut entry) => {
                if entry.get().is_finished() {
                    warn!("Player for guild {} had exited, restarting", guild_id);
                    entry.insert(spawn());
                    true
                } else {
                    false
                }
            }
            Entry::Vacant(entry) => {
                entry.insert(spawn());
                true
            }
        };

        if started {
            self.spawned.fetch_add(1, Ordering::Relaxed);
        }
        started
    }

    pub fn is_running(&self, guild_id: GuildId) -> bool {
        self.players
            .get(&guild_id)
            .map_or(false, |handle| !handle.is_finished())
    }

    /// Total tasks ever started, across all guilds.
    pub fn spawn_count(&self) -> usize {
        self.spawned.load(Ordering::Relaxed)
    }
}

impl Drop for PlayerRegistry {
    fn drop(&mut self) {
        for entry in self.players.iter() {
            entry.value().abort();
        }
    }
}
