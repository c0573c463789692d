use serenity::model::id::UserId;
use std::{collections::BTreeMap, sync::Arc, time::Duration};

use crate::bot::context::ReplyTarget;

/// Headers the stream host expects on every request.
pub type StreamHeaders = BTreeMap<String, String>;

/// Metadata produced by a resolver, before anyone has asked for it.
#[derive(Debug, Clone, PartialEq)]
pub struct ResolvedTrack {
    pub stream_url: String,
    pub title: String,
    pub thumbnail: Option<String>,
    pub duration: Option<Duration>,
    pub page_url: Option<String>,
    pub headers: StreamHeaders,
}

impl ResolvedTrack {
    pub fn new(stream_url: impl Into<String>, title: impl Into<String>) -> Self {
        Self {
            stream_url: stream_url.into(),
            title: title.into(),
            thumbnail: None,
            duration: None,
            page_url: None,
            headers: StreamHeaders::new(),
        }
    }
}

/// A resolved track plus whoever asked for it.
///
/// Owned by the guild queue until dequeued, then by the player until the
/// track stops. Never mutated after construction.
#[derive(Clone)]
pub struct TrackRequest {
    track: ResolvedTrack,
    requested_by: UserId,
    reply_to: Arc<dyn ReplyTarget>,
}

impl TrackRequest {
    pub fn new(track: ResolvedTrack, requested_by: UserId, reply_to: Arc<dyn ReplyTarget>) -> Self {
        Self {
            track,
            requested_by,
            reply_to,
        }
    }

    pub fn track(&self) -> &ResolvedTrack {
        &self.track
    }

    pub fn title(&self) -> &str {
        &self.track.title
    }

    pub fn stream_url(&self) -> &str {
        &self.track.stream_url
    }

    pub fn headers(&self) -> &StreamHeaders {
        &self.track.headers
    }

    pub fn requested_by(&self) -> UserId {
        self.requested_by
    }

    pub fn reply_to(&self) -> &Arc<dyn ReplyTarget> {
        &self.reply_to
    }
}

impl std::fmt::Debug for TrackRequest {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("TrackRequest")
            .field("track", &self.track)
            .field("requested_by", &self.requested_by)
            .finish_non_exhaustive()
    }
}
