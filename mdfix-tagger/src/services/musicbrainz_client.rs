//! MusicBrainz API client
//!
//! Fetches full recording metadata (title, artist credits, releases) by
//! recording MBID, rate limited to 1 request per second.

use crate::services::rate_limiter::RateLimiter;
use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use std::time::Duration;
use thiserror::Error;

const MUSICBRAINZ_BASE_URL: &str = "https://musicbrainz.org/ws/2";
const USER_AGENT: &str = concat!(
    "MetadataFixer/",
    env!("CARGO_PKG_VERSION"),
    " ( https://musicbrainz.org )"
);
const RATE_LIMIT_MS: u64 = 1000; // 1 request per second

/// MusicBrainz client errors
#[derive(Debug, Error)]
pub enum MusicBrainzError {
    #[error("Network error: {0}")]
    NetworkError(String),

    #[error("Recording not found: {0}")]
    RecordingNotFound(String),

    #[error("Rate limit exceeded")]
    RateLimitExceeded,

    #[error("API error {0}: {1}")]
    ApiError(u16, String),

    #[error("Parse error: {0}")]
    ParseError(String),
}

impl MusicBrainzError {
    /// Connection-level failure, worth waiting before the next request
    pub fn is_network(&self) -> bool {
        matches!(
            self,
            MusicBrainzError::NetworkError(_) | MusicBrainzError::RateLimitExceeded
        )
    }
}

/// MusicBrainz recording
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct Recording {
    /// Recording MBID
    pub id: String,
    /// Recording title
    #[serde(default)]
    pub title: Option<String>,
    /// Artist credits for this recording
    #[serde(rename = "artist-credit", default)]
    pub artist_credit: Vec<ArtistCredit>,
    /// Releases containing this recording
    #[serde(default)]
    pub releases: Vec<Release>,
}

impl Recording {
    /// Credited artist names joined by ", ", skipping empty names
    pub fn artist_names(&self) -> Option<String> {
        let names: Vec<&str> = self
            .artist_credit
            .iter()
            .map(ArtistCredit::name)
            .filter(|name| !name.trim().is_empty())
            .collect();

        (!names.is_empty()).then(|| names.join(", "))
    }
}

/// One entry of a recording's artist credit
///
/// Credits arrive either as structured records with a nested artist or as
/// bare strings; both shapes are resolved here so callers only see a name.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize, Serialize)]
#[serde(from = "RawArtistCredit")]
pub enum ArtistCredit {
    /// Structured credit, carrying the credited artist's name
    Named(String),
    /// Plain text credit
    Plain(String),
}

impl ArtistCredit {
    pub fn name(&self) -> &str {
        match self {
            ArtistCredit::Named(name) | ArtistCredit::Plain(name) => name,
        }
    }
}

#[derive(Deserialize)]
#[serde(untagged)]
enum RawArtistCredit {
    Named { artist: CreditedArtist },
    Plain(String),
}

#[derive(Deserialize)]
struct CreditedArtist {
    #[serde(default)]
    name: String,
}

impl From<RawArtistCredit> for ArtistCredit {
    fn from(raw: RawArtistCredit) -> Self {
        match raw {
            RawArtistCredit::Named { artist } => ArtistCredit::Named(artist.name),
            RawArtistCredit::Plain(text) => ArtistCredit::Plain(text),
        }
    }
}

/// MusicBrainz release
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct Release {
    /// Release title
    #[serde(default)]
    pub title: Option<String>,
    /// Release date (YYYY, YYYY-MM or YYYY-MM-DD)
    #[serde(default)]
    pub date: Option<String>,
}

/// Recording metadata lookup
#[async_trait]
pub trait RecordingLookup: Send + Sync {
    async fn lookup_recording(&self, recording_id: &str) -> Result<Recording, MusicBrainzError>;
}

/// MusicBrainz API client
pub struct MusicBrainzClient {
    http_client: reqwest::Client,
    rate_limiter: RateLimiter,
    base_url: String,
}

impl MusicBrainzClient {
    pub fn new() -> Result<Self, MusicBrainzError> {
        let http_client = reqwest::Client::builder()
            .user_agent(USER_AGENT)
            .timeout(Duration::from_secs(30))
            .build()
            .map_err(|e| MusicBrainzError::NetworkError(e.to_string()))?;

        Ok(Self {
            http_client,
            rate_limiter: RateLimiter::new(Duration::from_millis(RATE_LIMIT_MS)),
            base_url: MUSICBRAINZ_BASE_URL.to_string(),
        })
    }

    /// Override the web service root
    pub fn with_base_url(mut self, base_url: impl Into<String>) -> Self {
        self.base_url = base_url.into();
        self
    }
}

#[async_trait]
impl RecordingLookup for MusicBrainzClient {
    async fn lookup_recording(&self, recording_id: &str) -> Result<Recording, MusicBrainzError> {
        self.rate_limiter.wait().await;

        let url = format!(
            "{}/recording/{}?inc=artists+releases&fmt=json",
            self.base_url, recording_id
        );

        tracing::debug!(mbid = %recording_id, url = %url, "Querying MusicBrainz API");

        let response = self
            .http_client
            .get(&url)
            .send()
            .await
            .map_err(|e| MusicBrainzError::NetworkError(e.to_string()))?;

        let status = response.status();

        if status == reqwest::StatusCode::NOT_FOUND {
            return Err(MusicBrainzError::RecordingNotFound(recording_id.to_string()));
        }

        if status == reqwest::StatusCode::SERVICE_UNAVAILABLE {
            return Err(MusicBrainzError::RateLimitExceeded);
        }

        if !status.is_success() {
            let error_text = response.text().await.unwrap_or_default();
            return Err(MusicBrainzError::ApiError(status.as_u16(), error_text));
        }

        let body = response
            .text()
            .await
            .map_err(|e| MusicBrainzError::NetworkError(e.to_string()))?;
        let recording = parse_recording(&body)?;

        let artist = recording.artist_names().unwrap_or_else(|| "Unknown".to_string());
        tracing::info!(
            mbid = %recording_id,
            title = recording.title.as_deref().unwrap_or("Unknown"),
            artist = %artist,
            "Retrieved recording from MusicBrainz"
        );

        Ok(recording)
    }
}

/// Parse a recording lookup response body
pub fn parse_recording(body: &str) -> Result<Recording, MusicBrainzError> {
    serde_json::from_str(body).map_err(|e| MusicBrainzError::ParseError(e.to_string()))
}
