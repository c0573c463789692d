use async_trait::async_trait;
use dashmap::{mapref::entry::Entry, DashMap};
use parking_lot::Mutex;
use reqwest::header::{HeaderMap, HeaderName, HeaderValue};
use serenity::model::id::{ChannelId, GuildId};
use songbird::{
    input::HttpRequest,
    tracks::{PlayMode, TrackHandle},
    Call, Event, EventContext, EventHandler as VoiceEventHandler, Songbird, TrackEvent,
};
use std::{
    sync::{
        atomic::{AtomicBool, Ordering},
        Arc,
    },
    time::Duration,
};
use tracing::{debug, info, warn};

use super::{
    session::{PlaybackHook, VoiceManager, VoiceSession},
    track::StreamHeaders,
};
use crate::error::VoiceError;

/// Browser identity presented to stream hosts; extractor-supplied
/// `User-Agent` headers are replaced by this one.
pub const STREAM_USER_AGENT: &str = "Mozilla/5.0 (Windows NT 10.0; Win64; x64) AppleWebKit/537.36 (KHTML, like Gecko) Chrome/131.0.0.0 Safari/537.36";

/// Songbird-backed voice connections.
pub struct SongbirdVoice {
    manager: Arc<Songbird>,
    http: reqwest::Client,
    sessions: DashMap<GuildId, Arc<SongbirdSession>>,
}

impl SongbirdVoice {
    pub fn new(manager: Arc<Songbird>) -> anyhow::Result<Self> {
        // No overall request timeout: a stream lives as long as the track.
        // Dropped reads are resumed by songbird with ranged requests.
        let http = reqwest::Client::builder()
            .user_agent(STREAM_USER_AGENT)
            .connect_timeout(Duration::from_secs(10))
            .tcp_keepalive(Duration::from_secs(30))
            .pool_idle_timeout(Duration::from_secs(60))
            .build()?;

        Ok(Self {
            manager,
            http,
            sessions: DashMap::new(),
        })
    }
}

#[async_trait]
impl VoiceManager for SongbirdVoice {
    async fn connect(
        &self,
        guild_id: GuildId,
        channel_id: ChannelId,
    ) -> Result<Arc<dyn VoiceSession>, VoiceError> {
        if let Some(existing) = self.sessions.get(&guild_id).map(|s| s.clone()) {
            if existing.is_connected().await {
                debug!("Reusing voice connection in guild {}", guild_id);
                return Ok(existing);
            }
        }

        let call = self
            .manager
            .join(guild_id, channel_id)
            .await
            .map_err(|e| VoiceError::Connect(format!("{:?}", e)))?;

        info!("🔊 Joined voice channel {} in guild {}", channel_id, guild_id);

        let session = claim_session(
            &self.sessions,
            guild_id,
            &call,
            |session| &session.call,
            || SongbirdSession {
                guild_id,
                call: call.clone(),
                http: self.http.clone(),
                current: Mutex::new(None),
            },
        );
        Ok(session)
    }

    async fn disconnect(&self, guild_id: GuildId) -> Result<(), VoiceError> {
        self.sessions.remove(&guild_id);

        match self.manager.remove(guild_id).await {
            Ok(()) => {
                info!("👋 Left voice channel in guild {}", guild_id);
                Ok(())
            }
            Err(songbird::error::JoinError::NoCall) => Ok(()),
            Err(e) => Err(VoiceError::Connect(format!("{:?}", e))),
        }
    }

    fn session(&self, guild_id: GuildId) -> Option<Arc<dyn VoiceSession>> {
        self.sessions
            .get(&guild_id)
            .map(|s| s.clone() as Arc<dyn VoiceSession>)
    }

    fn forget(&self, guild_id: GuildId) {
        if self.sessions.remove(&guild_id).is_some() {
            debug!("Dropped voice session for guild {}", guild_id);
        }
    }
}

/// Registers the session for `call`, or returns the one already registered
/// on the same call.
///
/// Songbird hands every joiner of a guild the same `Call`, so racing joins
/// all end up sharing one session (and its current track). A different call
/// means the old connection was torn down and gets replaced.
fn claim_session<S, C>(
    sessions: &DashMap<GuildId, Arc<S>>,
    guild_id: GuildId,
    call: &Arc<C>,
    call_of: impl Fn(&S) -> &Arc<C>,
    build: impl FnOnce() -> S,
) -> Arc<S> {
    match sessions.entry(guild_id) {
        Entry::Occupied(mut entry) => {
            if !Arc::ptr_eq(call_of(entry.get()), call) {
                entry.insert(Arc::new(build()));
            }
            entry.get().clone()
        }
        Entry::Vacant(entry) => entry.insert(Arc::new(build())).value().clone(),
    }
}

struct SongbirdSession {
    guild_id: GuildId,
    call: Arc<tokio::sync::Mutex<Call>>,
    http: reqwest::Client,
    current: Mutex<Option<TrackHandle>>,
}

impl SongbirdSession {
    fn current_track(&self) -> Option<TrackHandle> {
        self.current.lock().clone()
    }

    async fn play_mode(&self) -> Option<PlayMode> {
        let track = self.current_track()?;
        track.get_info().await.ok().map(|state| state.playing)
    }
}

#[async_trait]
impl VoiceSession for SongbirdSession {
    async fn is_connected(&self) -> bool {
        self.call.lock().await.current_connection().is_some()
    }

    async fn is_playing(&self) -> bool {
        matches!(self.play_mode().await, Some(PlayMode::Play))
    }

    async fn is_paused(&self) -> bool {
        matches!(self.play_mode().await, Some(PlayMode::Pause))
    }

    async fn play(
        &self,
        stream_url: &str,
        headers: &StreamHeaders,
        on_finish: PlaybackHook,
    ) -> Result<(), VoiceError> {
        let input = HttpRequest::new_with_headers(
            self.http.clone(),
            stream_url.to_string(),
            header_map(headers),
        );

        let handle = {
            let mut call = self.call.lock().await;
            if call.current_connection().is_none() {
                return Err(VoiceError::NotConnected);
            }
            call.play_input(input.into())
        };

        let hook = PlaybackLogger::new(self.guild_id, on_finish);
        for event in [TrackEvent::End, TrackEvent::Error] {
            if let Err(e) = handle.add_event(Event::Track(event), hook.clone()) {
                warn!("Could not attach playback hook in guild {}: {:?}", self.guild_id, e);
            }
        }

        *self.current.lock() = Some(handle);
        Ok(())
    }

    async fn pause(&self) {
        if let Some(track) = self.current_track() {
            let _ = track.pause();
        }
    }

    async fn resume(&self) {
        if let Some(track) = self.current_track() {
            let _ = track.play();
        }
    }

    async fn stop(&self) {
        if let Some(track) = self.current.lock().take() {
            let _ = track.stop();
        }
    }
}

/// Logs how a stream ended. Returns no follow-up event, so it cannot steer playback.
///
/// Registered for both `End` and `Error`; the hook runs once per track
/// whichever arrives first.
#[derive(Clone)]
struct PlaybackLogger {
    guild_id: GuildId,
    on_finish: Arc<dyn Fn(Option<String>) + Send + Sync>,
    fired: Arc<AtomicBool>,
}

impl PlaybackLogger {
    fn new(guild_id: GuildId, on_finish: PlaybackHook) -> Self {
        Self {
            guild_id,
            on_finish: Arc::from(on_finish),
            fired: Arc::new(AtomicBool::new(false)),
        }
    }

    fn report(&self, error: Option<String>) {
        if self.fired.swap(true, Ordering::SeqCst) {
            return;
        }
        debug!("Track finished in guild {}: {:?}", self.guild_id, error);
        (self.on_finish)(error);
    }
}

#[async_trait]
impl VoiceEventHandler for PlaybackLogger {
    async fn act(&self, ctx: &EventContext<'_>) -> Option<Event> {
        if let EventContext::Track(tracks) = ctx {
            for (state, _handle) in *tracks {
                let error = match &state.playing {
                    PlayMode::Errored(e) => Some(format!("{:?}", e)),
                    _ => None,
                };
                self.report(error);
            }
        }

        None
    }
}

/// Converts extractor headers, skipping the ones the transport sets itself.
pub fn header_map(headers: &StreamHeaders) -> HeaderMap {
    let mut map = HeaderMap::new();
    for (name, value) in headers {
        if name.eq_ignore_ascii_case("user-agent") || name.eq_ignore_ascii_case("host") {
            continue;
        }
        match (
            HeaderName::from_bytes(name.as_bytes()),
            HeaderValue::from_str(value),
        ) {
            (Ok(name), Ok(value)) => {
                map.insert(name, value);
            }
            _ => debug!("Skipping unusable stream header {}", name),
        }
    }
    map
}

#[cfg(test)]
mod tests {
    use super::*;
    use parking_lot::Mutex as PlMutex;
    use pretty_assertions::assert_eq;

    struct Slot {
        call: Arc<u8>,
        id: usize,
    }

    #[test]
    fn test_racing_joins_share_one_session() {
        let sessions: Arc<DashMap<GuildId, Arc<Slot>>> = Arc::new(DashMap::new());
        let guild = GuildId::new(9);
        let call = Arc::new(0u8);

        let handles: Vec<_> = (0..16)
            .map(|id| {
                let sessions = sessions.clone();
                let call = call.clone();
                std::thread::spawn(move || {
                    claim_session(&sessions, guild, &call, |s| &s.call, || Slot {
                        call: call.clone(),
                        id,
                    })
                })
            })
            .collect();

        let claimed: Vec<Arc<Slot>> = handles
            .into_iter()
            .map(|h| h.join().expect("thread panicked"))
            .collect();
        assert!(claimed.windows(2).all(|w| Arc::ptr_eq(&w[0], &w[1])));
        assert_eq!(sessions.len(), 1);
    }

    #[test]
    fn test_new_call_replaces_session() {
        let sessions: DashMap<GuildId, Arc<Slot>> = DashMap::new();
        let guild = GuildId::new(9);
        let old_call = Arc::new(0u8);
        let new_call = Arc::new(1u8);

        let first = claim_session(&sessions, guild, &old_call, |s| &s.call, || Slot {
            call: old_call.clone(),
            id: 1,
        });
        let again = claim_session(&sessions, guild, &old_call, |s| &s.call, || Slot {
            call: old_call.clone(),
            id: 2,
        });
        assert_eq!(again.id, first.id);

        let replaced = claim_session(&sessions, guild, &new_call, |s| &s.call, || Slot {
            call: new_call.clone(),
            id: 3,
        });
        assert_eq!(replaced.id, 3);
        assert_eq!(sessions.get(&guild).map(|s| s.id), Some(3));
    }

    #[test]
    fn test_playback_hook_runs_once_per_track() {
        let seen = Arc::new(PlMutex::new(Vec::new()));
        let hook: PlaybackHook = {
            let seen = seen.clone();
            Box::new(move |error| seen.lock().push(error))
        };

        let logger = PlaybackLogger::new(GuildId::new(1), hook);
        let on_end = logger.clone();
        logger.report(Some("decode failed".to_string()));
        on_end.report(None);

        assert_eq!(*seen.lock(), vec![Some("decode failed".to_string())]);
    }

    #[test]
    fn test_header_map_drops_user_agent_and_host() {
        let headers: StreamHeaders = [
            ("User-Agent", "yt-dlp"),
            ("HOST", "example.com"),
            ("Accept", "*/*"),
            ("Referer", "https://www.youtube.com/"),
            ("Bad Header", "x"),
        ]
        .into_iter()
        .map(|(k, v)| (k.to_string(), v.to_string()))
        .collect();

        let map = header_map(&headers);
        assert_eq!(map.len(), 2);
        assert_eq!(map.get("accept").and_then(|v| v.to_str().ok()), Some("*/*"));
        assert_eq!(
            map.get("referer").and_then(|v| v.to_str().ok()),
            Some("https://www.youtube.com/")
        );
        assert!(map.get("user-agent").is_none());
        assert!(map.get("host").is_none());
    }
}
