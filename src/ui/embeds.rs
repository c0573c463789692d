use serenity::{
    all::Colour,
    builder::{CreateEmbed, CreateEmbedFooter},
    model::id::UserId,
};
use std::time::Duration;
use url::Url;

use crate::audio::track::ResolvedTrack;

/// Color palette used by every card the bot sends.
pub mod colors {
    use serenity::all::Colour;

    pub const NOW_PLAYING_BLUE: Colour = Colour::new(0x3498DB);
    pub const QUEUED_GREEN: Colour = Colour::new(0x2ECC71);
}

const STANDARD_FOOTER: &str = "🎵 Guild Jukebox";

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CardKind {
    NowPlaying,
    Queued,
}

impl CardKind {
    fn title(self) -> &'static str {
        match self {
            CardKind::NowPlaying => "Now Playing",
            CardKind::Queued => "Added to queue",
        }
    }

    fn colour(self) -> Colour {
        match self {
            CardKind::NowPlaying => colors::NOW_PLAYING_BLUE,
            CardKind::Queued => colors::QUEUED_GREEN,
        }
    }
}

/// Platform-neutral description of a track announcement.
///
/// Built by the playback core, rendered to an embed only at the edge.
#[derive(Debug, Clone, PartialEq)]
pub struct TrackCard {
    pub kind: CardKind,
    pub title: String,
    pub page_url: Option<String>,
    pub thumbnail: Option<String>,
    pub duration: Option<Duration>,
    pub requested_by: Option<UserId>,
}

impl TrackCard {
    /// Card announcing that a track started.
    pub fn now_playing(track: &ResolvedTrack, requested_by: UserId) -> Self {
        Self {
            kind: CardKind::NowPlaying,
            title: track.title.clone(),
            page_url: track.page_url.clone(),
            thumbnail: track.thumbnail.clone(),
            duration: track.duration,
            requested_by: Some(requested_by),
        }
    }

    /// Card confirming a track went to the back of the queue.
    pub fn queued(track: &ResolvedTrack) -> Self {
        Self {
            kind: CardKind::Queued,
            title: track.title.clone(),
            page_url: track.page_url.clone(),
            thumbnail: track.thumbnail.clone(),
            duration: None,
            requested_by: None,
        }
    }

    /// Title as markdown, linked when the page url is usable.
    pub fn description(&self) -> String {
        match self.page_url.as_deref().filter(|url| Url::parse(url).is_ok()) {
            Some(url) => format!("[{}]({})", self.title, url),
            None => format!("**{}**", self.title),
        }
    }

    pub fn to_embed(&self) -> CreateEmbed {
        let mut embed = CreateEmbed::default()
            .title(self.kind.title())
            .description(self.description())
            .color(self.kind.colour());

        if let Some(thumbnail) = self.thumbnail.as_deref().filter(|url| Url::parse(url).is_ok()) {
            embed = embed.thumbnail(thumbnail);
        }

        if let Some(duration) = self.duration {
            embed = embed.field("Duration", format_duration(duration), true);
        }

        if let Some(user) = self.requested_by {
            embed = embed.field("Requested by", format!("<@{}>", user), true);
        }

        embed.footer(CreateEmbedFooter::new(STANDARD_FOOTER))
    }
}

/// `MM:SS`, with minutes allowed past 59 for long tracks.
pub fn format_duration(duration: Duration) -> String {
    let total_seconds = duration.as_secs();
    format!("{:02}:{:02}", total_seconds / 60, total_seconds % 60)
}
