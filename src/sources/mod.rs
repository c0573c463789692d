//! # Sources
//!
//! Turns a URL or search term into a [`ResolvedTrack`].
//!
//! Extraction is an async subprocess call, so a slow lookup only holds up
//! the command that asked for it. Every lookup gets two chances: the full [`ExtractionProfile::primary`]
//! first, then the stripped-down [`ExtractionProfile::fallback`].

pub mod ytdlp;

use async_trait::async_trait;
use std::path::PathBuf;
use tracing::{info, warn};

pub use ytdlp::YtDlpExtractor;

use crate::{audio::track::ResolvedTrack, error::ResolveError};

/// Desktop Chrome identity used by the primary profile.
pub const PRIMARY_USER_AGENT: &str = "Mozilla/5.0 (Windows NT 10.0; Win64; x64) AppleWebKit/537.36 (KHTML, like Gecko) Chrome/131.0.0.0 Safari/537.36";

/// Link-preview crawler identity used by the fallback profile.
pub const FALLBACK_USER_AGENT: &str =
    "facebookexternalhit/1.1 (+http://www.facebook.com/externalhit_uatext.php)";

/// Client identities asked for on the first attempt.
pub const PRIMARY_EXTRACTOR_ARGS: &str = "youtube:player_client=ios,android,web";

/// Options for one extraction attempt.
#[derive(Debug, Clone, PartialEq)]
pub struct ExtractionProfile {
    pub name: &'static str,
    pub user_agent: String,
    pub extractor_args: Option<String>,
    pub cookies_file: Option<PathBuf>,
}

impl ExtractionProfile {
    pub fn primary(cookies_file: Option<PathBuf>) -> Self {
        Self {
            name: "primary",
            user_agent: PRIMARY_USER_AGENT.to_string(),
            extractor_args: Some(PRIMARY_EXTRACTOR_ARGS.to_string()),
            cookies_file,
        }
    }

    /// Same as primary minus the extractor arguments, with a crawler user agent.
    pub fn fallback(cookies_file: Option<PathBuf>) -> Self {
        Self {
            name: "fallback",
            user_agent: FALLBACK_USER_AGENT.to_string(),
            extractor_args: None,
            cookies_file,
        }
    }
}

/// Anything that can resolve a query asynchronously.
#[async_trait]
pub trait TrackResolver: Send + Sync {
    async fn resolve(&self, query: &str) -> Result<ResolvedTrack, ResolveError>;
}

/// One extraction attempt with a given profile.
#[cfg_attr(test, mockall::automock)]
#[async_trait]
pub trait Extractor: Send + Sync {
    async fn extract(&self, query: &str, profile: &ExtractionProfile) -> Result<ResolvedTrack, ResolveError>;
}

/// Runs an [`Extractor`], retrying once with the fallback profile.
pub struct FallbackResolver<E> {
    extractor: E,
    primary: ExtractionProfile,
    fallback: ExtractionProfile,
}

impl<E: Extractor> FallbackResolver<E> {
    pub fn new(extractor: E, cookies_file: Option<PathBuf>) -> Self {
        Self {
            extractor,
            primary: ExtractionProfile::primary(cookies_file.clone()),
            fallback: ExtractionProfile::fallback(cookies_file),
        }
    }
}

#[async_trait]
impl<E: Extractor> TrackResolver for FallbackResolver<E> {
    async fn resolve(&self, query: &str) -> Result<ResolvedTrack, ResolveError> {
        info!("🔍 Resolving: {}", query);

        match self.extractor.extract(query, &self.primary).await {
            Ok(track) => Ok(track),
            Err(e) => {
                warn!(
                    "Extraction with {} profile failed for {}: {}. Retrying with {} profile",
                    self.primary.name, query, e, self.fallback.name
                );
                self.extractor.extract(query, &self.fallback).await
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    #[tokio::test]
    async fn test_primary_success_skips_fallback() {
        let mut extractor = MockExtractor::new();
        extractor
            .expect_extract()
            .withf(|query, profile| query == "lofi" && profile.name == "primary")
            .times(1)
            .returning(|_, _| Ok(ResolvedTrack::new("https://cdn/1", "Lofi")));

        let resolver = FallbackResolver::new(extractor, None);
        let track = resolver.resolve("lofi").await.expect("resolve");
        assert_eq!(track.title, "Lofi");
    }

    #[tokio::test]
    async fn test_primary_failure_retries_with_fallback_profile() {
        let mut extractor = MockExtractor::new();
        let mut seq = mockall::Sequence::new();
        extractor
            .expect_extract()
            .withf(|_, profile| profile.extractor_args.is_some())
            .times(1)
            .in_sequence(&mut seq)
            .returning(|_, _| Err(ResolveError::ExtractorFailed("HTTP Error 403".into())));
        extractor
            .expect_extract()
            .withf(|_, profile| {
                profile.extractor_args.is_none() && profile.user_agent == FALLBACK_USER_AGENT
            })
            .times(1)
            .in_sequence(&mut seq)
            .returning(|_, _| Ok(ResolvedTrack::new("https://cdn/2", "Recovered")));

        let resolver = FallbackResolver::new(extractor, Some(PathBuf::from("cookies.txt")));
        let track = resolver.resolve("https://youtu.be/x").await.expect("resolve");
        assert_eq!(track.title, "Recovered");
    }

    #[tokio::test]
    async fn test_both_attempts_failing_is_an_error() {
        let mut extractor = MockExtractor::new();
        extractor
            .expect_extract()
            .withf(|query, _| query == "bad")
            .times(2)
            .returning(|_, _| Err(ResolveError::ExtractorFailed("unsupported url".into())));

        let resolver = FallbackResolver::new(extractor, None);
        let err = resolver.resolve("bad").await.unwrap_err();
        assert!(matches!(err, ResolveError::ExtractorFailed(_)));
    }

    #[test]
    fn test_profiles_share_cookies() {
        let cookies = Some(PathBuf::from("cookies.txt"));
        let primary = ExtractionProfile::primary(cookies.clone());
        let fallback = ExtractionProfile::fallback(cookies.clone());

        assert_eq!(primary.cookies_file, cookies);
        assert_eq!(fallback.cookies_file, cookies);
        assert_eq!(primary.extractor_args.as_deref(), Some(PRIMARY_EXTRACTOR_ARGS));
        assert_ne!(primary.user_agent, fallback.user_agent);
    }
}
