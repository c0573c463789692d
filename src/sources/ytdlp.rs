use async_trait::async_trait;
use serde::Deserialize;
use std::{path::PathBuf, process::Stdio, time::Duration};
use tokio::process::Command;
use tracing::{debug, info};

use super::{ExtractionProfile, Extractor};
use crate::{
    audio::track::{ResolvedTrack, StreamHeaders},
    error::ResolveError,
};

/// Extractor backed by the `yt-dlp` executable.
pub struct YtDlpExtractor {
    binary: PathBuf,
}

impl YtDlpExtractor {
    pub fn new(binary: impl Into<PathBuf>) -> Self {
        Self {
            binary: binary.into(),
        }
    }

    /// Arguments for one attempt; the query always comes last, after `--`.
    pub fn build_args(query: &str, profile: &ExtractionProfile) -> Vec<String> {
        let mut args: Vec<String> = [
            "--dump-single-json",
            "--format",
            "bestaudio/best",
            "--no-playlist",
            "--quiet",
            "--no-warnings",
            "--default-search",
            "auto",
            "--source-address",
            "0.0.0.0",
            "--no-check-certificates",
            "--no-cache-dir",
            "--user-agent",
        ]
        .iter()
        .map(|s| s.to_string())
        .collect();
        args.push(profile.user_agent.clone());

        if let Some(extractor_args) = &profile.extractor_args {
            args.push("--extractor-args".to_string());
            args.push(extractor_args.clone());
        }

        if let Some(cookies) = &profile.cookies_file {
            args.push("--cookies".to_string());
            args.push(cookies.display().to_string());
        }

        args.push("--".to_string());
        args.push(query.to_string());
        args
    }
}

#[async_trait]
impl Extractor for YtDlpExtractor {
    async fn extract(&self, query: &str, profile: &ExtractionProfile) -> Result<ResolvedTrack, ResolveError> {
        let mut cmd = Command::new(&self.binary);
        cmd.args(Self::build_args(query, profile))
            .stdin(Stdio::null())
            .stdout(Stdio::piped())
            .stderr(Stdio::piped())
            .kill_on_drop(true);

        debug!("Running {:?} with {} profile", cmd, profile.name);

        let output = cmd.output().await?;

        if !output.status.success() {
            let stderr = String::from_utf8_lossy(&output.stderr);
            return Err(ResolveError::ExtractorFailed(stderr.trim().to_string()));
        }

        let track = parse_info(&String::from_utf8_lossy(&output.stdout))?;
        info!("✅ Resolved '{}' with {} profile", track.title, profile.name);
        Ok(track)
    }
}

/// The subset of yt-dlp's info dict the bot reads.
#[derive(Debug, Deserialize)]
struct YtDlpInfo {
    url: Option<String>,
    title: Option<String>,
    #[serde(default)]
    http_headers: StreamHeaders,
    thumbnail: Option<String>,
    duration: Option<f64>,
    webpage_url: Option<String>,
    entries: Option<Vec<YtDlpInfo>>,
}

/// Parses `--dump-single-json` output. Playlists resolve to their first entry.
pub fn parse_info(json: &str) -> Result<ResolvedTrack, ResolveError> {
    let mut info: YtDlpInfo = serde_json::from_str(json)?;

    if let Some(entries) = info.entries.take() {
        info = entries
            .into_iter()
            .next()
            .ok_or(ResolveError::EmptyPlaylist)?;
    }

    let stream_url = info.url.ok_or(ResolveError::MissingStreamUrl)?;

    Ok(ResolvedTrack {
        stream_url,
        title: info.title.unwrap_or_else(|| "Unknown".to_string()),
        thumbnail: info.thumbnail,
        duration: info
            .duration
            .filter(|secs| secs.is_finite() && *secs >= 0.0)
            .map(|secs| Duration::from_secs(secs as u64)),
        page_url: info.webpage_url,
        headers: info.http_headers,
    })
}
