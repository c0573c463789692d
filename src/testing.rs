//! In-memory stand-ins for the voice platform, the chat platform and the
//! resolver, shared by unit tests across the crate.

use async_trait::async_trait;
use dashmap::DashMap;
use parking_lot::Mutex;
use serenity::model::id::{ChannelId, GuildId, MessageId, UserId};
use std::{
    sync::{
        atomic::{AtomicBool, AtomicU64, AtomicUsize, Ordering},
        Arc,
    },
    time::Duration,
};

use crate::{
    audio::{
        session::{PlaybackHook, VoiceManager, VoiceSession},
        track::{ResolvedTrack, StreamHeaders, TrackRequest},
    },
    bot::context::{CommandContext, Reply, ReplyTarget},
    error::{ResolveError, VoiceError},
    sources::TrackResolver,
    ui::embeds::CardKind,
};

const WAIT_LIMIT: Duration = Duration::from_secs(2);

/// Polls `condition` until it holds, panicking after a couple of seconds.
pub async fn wait_until(mut condition: impl FnMut() -> bool) {
    let deadline = tokio::time::Instant::now() + WAIT_LIMIT;
    while !condition() {
        assert!(
            tokio::time::Instant::now() < deadline,
            "condition not reached in time"
        );
        tokio::time::sleep(Duration::from_millis(2)).await;
    }
}

pub fn requester() -> UserId {
    UserId::new(1)
}

/// A queued request whose stream url is its title.
pub fn request(title: &str) -> TrackRequest {
    TrackRequest::new(
        ResolvedTrack::new(title, title),
        requester(),
        Arc::new(RecordingReplies::new()),
    )
}

pub fn context(
    guild_id: Option<GuildId>,
    voice_channel: Option<ChannelId>,
    replies: &Arc<RecordingReplies>,
) -> CommandContext {
    CommandContext::new(guild_id, requester(), voice_channel, replies.clone())
}

/// Keeps every reply and deletion for later inspection.
#[derive(Default)]
pub struct RecordingReplies {
    sent: Mutex<Vec<Reply>>,
    deleted: Mutex<Vec<MessageId>>,
    next_id: AtomicU64,
}

impl RecordingReplies {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn texts(&self) -> Vec<String> {
        self.sent
            .lock()
            .iter()
            .filter_map(|reply| reply.content.clone())
            .collect()
    }

    pub fn cards(&self, kind: CardKind) -> usize {
        self.sent
            .lock()
            .iter()
            .filter(|reply| reply.card.as_ref().map_or(false, |card| card.kind == kind))
            .count()
    }

    pub fn deleted(&self) -> Vec<MessageId> {
        self.deleted.lock().clone()
    }

    pub fn all_ephemeral(&self) -> bool {
        self.sent.lock().iter().all(|reply| reply.ephemeral)
    }

    pub async fn wait_for_card(&self, kind: CardKind) {
        wait_until(|| self.cards(kind) > 0).await;
    }
}

#[async_trait]
impl ReplyTarget for RecordingReplies {
    async fn send(&self, reply: Reply) -> Option<MessageId> {
        self.sent.lock().push(reply);
        let id = self.next_id.fetch_add(1, Ordering::Relaxed) + 1;
        Some(MessageId::new(id))
    }

    async fn delete(&self, message: MessageId) {
        self.deleted.lock().push(message);
    }
}

#[derive(Default)]
struct SessionState {
    current: Option<String>,
    paused: bool,
    played: Vec<String>,
    stops: usize,
}

/// Voice session that "plays" until a test finishes, fails or stops the track.
pub struct FakeSession {
    connected: AtomicBool,
    state: Mutex<SessionState>,
    hook: Mutex<Option<PlaybackHook>>,
}

impl FakeSession {
    pub fn new() -> Self {
        Self {
            connected: AtomicBool::new(true),
            state: Mutex::new(SessionState::default()),
            hook: Mutex::new(None),
        }
    }

    pub fn set_connected(&self, connected: bool) {
        self.connected.store(connected, Ordering::SeqCst);
    }

    /// Stream urls in the order they were started.
    pub fn played(&self) -> Vec<String> {
        self.state.lock().played.clone()
    }

    pub fn stop_count(&self) -> usize {
        self.state.lock().stops
    }

    pub async fn wait_for_plays(&self, count: usize) {
        wait_until(|| self.state.lock().played.len() >= count).await;
    }

    /// The current track reaches its natural end.
    pub fn finish_current(&self) {
        self.end_current(None);
    }

    pub fn fail_current(&self, reason: &str) {
        self.end_current(Some(reason.to_string()));
    }

    fn end_current(&self, error: Option<String>) {
        let was_playing = {
            let mut state = self.state.lock();
            state.paused = false;
            state.current.take().is_some()
        };
        let hook = self.hook.lock().take();
        if let (true, Some(hook)) = (was_playing, hook) {
            hook(error);
        }
    }

    fn disconnect(&self) {
        self.set_connected(false);
        self.end_current(None);
    }
}

#[async_trait]
impl VoiceSession for FakeSession {
    async fn is_connected(&self) -> bool {
        self.connected.load(Ordering::SeqCst)
    }

    async fn is_playing(&self) -> bool {
        let state = self.state.lock();
        state.current.is_some() && !state.paused
    }

    async fn is_paused(&self) -> bool {
        let state = self.state.lock();
        state.current.is_some() && state.paused
    }

    async fn play(
        &self,
        stream_url: &str,
        _headers: &StreamHeaders,
        on_finish: PlaybackHook,
    ) -> Result<(), VoiceError> {
        if !self.connected.load(Ordering::SeqCst) {
            return Err(VoiceError::NotConnected);
        }

        {
            let mut state = self.state.lock();
            state.current = Some(stream_url.to_string());
            state.paused = false;
            state.played.push(stream_url.to_string());
        }
        *self.hook.lock() = Some(on_finish);
        Ok(())
    }

    async fn pause(&self) {
        let mut state = self.state.lock();
        if state.current.is_some() {
            state.paused = true;
        }
    }

    async fn resume(&self) {
        self.state.lock().paused = false;
    }

    async fn stop(&self) {
        self.state.lock().stops += 1;
        self.end_current(None);
    }
}

/// Voice manager handing out [`FakeSession`]s.
#[derive(Default)]
pub struct FakeVoice {
    sessions: DashMap<GuildId, Arc<FakeSession>>,
    connects: AtomicUsize,
    refuse: AtomicBool,
}

impl FakeVoice {
    pub fn new() -> Self {
        Self::default()
    }

    /// Installs a connected session as if a join already happened.
    pub fn connected_session(&self, guild_id: GuildId) -> Arc<FakeSession> {
        self.sessions
            .entry(guild_id)
            .or_insert_with(|| Arc::new(FakeSession::new()))
            .clone()
    }

    pub fn fake_session(&self, guild_id: GuildId) -> Option<Arc<FakeSession>> {
        self.sessions.get(&guild_id).map(|s| s.clone())
    }

    pub fn connect_count(&self) -> usize {
        self.connects.load(Ordering::SeqCst)
    }

    pub fn fail_connects(&self) {
        self.refuse.store(true, Ordering::SeqCst);
    }
}

#[async_trait]
impl VoiceManager for FakeVoice {
    async fn connect(
        &self,
        guild_id: GuildId,
        _channel_id: ChannelId,
    ) -> Result<Arc<dyn VoiceSession>, VoiceError> {
        if self.refuse.load(Ordering::SeqCst) {
            return Err(VoiceError::Connect("connection refused".to_string()));
        }

        self.connects.fetch_add(1, Ordering::SeqCst);
        Ok(self.connected_session(guild_id))
    }

    async fn disconnect(&self, guild_id: GuildId) -> Result<(), VoiceError> {
        if let Some((_, session)) = self.sessions.remove(&guild_id) {
            session.disconnect();
        }
        Ok(())
    }

    fn session(&self, guild_id: GuildId) -> Option<Arc<dyn VoiceSession>> {
        self.fake_session(guild_id)
            .map(|session| session as Arc<dyn VoiceSession>)
    }

    fn forget(&self, guild_id: GuildId) {
        self.sessions.remove(&guild_id);
    }
}

/// Resolves any query to a track titled after it. Queries starting with
/// `fail` are rejected the way an unsupported URL would be.
#[derive(Clone, Default)]
pub struct FakeResolver {
    calls: Arc<AtomicUsize>,
}

impl FakeResolver {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn calls(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl TrackResolver for FakeResolver {
    async fn resolve(&self, query: &str) -> Result<ResolvedTrack, ResolveError> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        tokio::task::yield_now().await;
        if query.starts_with("fail") {
            return Err(ResolveError::ExtractorFailed(format!(
                "Unsupported URL: {}",
                query
            )));
        }
        Ok(ResolvedTrack::new(query, query))
    }
}
