use dashmap::DashMap;
use parking_lot::Mutex;
use serenity::model::id::GuildId;
use std::{collections::VecDeque, sync::Arc};
use tokio::sync::Notify;
use tracing::debug;

use super::track::TrackRequest;

/// Unbounded FIFO of pending tracks for one guild.
///
/// Any number of producers may [`enqueue`](Self::enqueue); a single consumer
/// (the guild's player task) waits in [`dequeue`](Self::dequeue).
#[derive(Debug, Default)]
pub struct GuildQueue {
    items: Mutex<VecDeque<TrackRequest>>,
    available: Notify,
}

impl GuildQueue {
    pub fn new() -> Self {
        Self::default()
    }

    /// Appends to the tail. Never blocks, never rejects.
    pub fn enqueue(&self, request: TrackRequest) {
        self.items.lock().push_back(request);
        // notify_one keeps a permit when nobody waits, so a consumer that
        // checks the deque and then parks cannot miss this push
        self.available.notify_one();
    }

    /// Waits until an item is available and returns the oldest one.
    pub async fn dequeue(&self) -> TrackRequest {
        loop {
            if let Some(request) = self.items.lock().pop_front() {
                return request;
            }
            self.available.notified().await;
        }
    }

    /// Snapshot only; may be stale by the time the caller acts on it.
    pub fn is_empty(&self) -> bool {
        self.items.lock().is_empty()
    }

    pub fn len(&self) -> usize {
        self.items.lock().len()
    }
}

/// Guild id → queue, created lazily on first use and kept for the process lifetime.
#[derive(Debug, Default)]
pub struct QueueRegistry {
    queues: DashMap<GuildId, Arc<GuildQueue>>,
}

impl QueueRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Returns the guild's queue, creating it if absent.
    ///
    /// Creation goes through the map entry, so concurrent first calls for the
    /// same guild all observe one queue.
    pub fn get_or_create(&self, guild_id: GuildId) -> Arc<GuildQueue> {
        self.queues
            .entry(guild_id)
            .or_insert_with(|| {
                debug!("Creating queue for guild {}", guild_id);
                Arc::new(GuildQueue::new())
            })
            .clone()
    }

    pub fn get(&self, guild_id: GuildId) -> Option<Arc<GuildQueue>> {
        self.queues.get(&guild_id).map(|q| q.clone())
    }

    pub fn enqueue(&self, guild_id: GuildId, request: TrackRequest) {
        self.get_or_create(guild_id).enqueue(request);
    }

    /// True when the guild has no queue yet or its queue holds nothing.
    pub fn is_empty(&self, guild_id: GuildId) -> bool {
        self.get(guild_id).map_or(true, |q| q.is_empty())
    }
}
