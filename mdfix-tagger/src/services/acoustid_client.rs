//! AcoustID API client
//!
//! Resolves Chromaprint fingerprints to ranked MusicBrainz recording
//! candidates.
//!
//! # API Reference
//! - Endpoint: https://api.acoustid.org/v2/lookup
//! - Documentation: https://acoustid.org/webservice

use crate::services::fingerprinter::Fingerprint;
use crate::services::rate_limiter::RateLimiter;
use crate::types::MatchCandidate;
use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use std::time::Duration;
use thiserror::Error;

const ACOUSTID_BASE_URL: &str = "https://api.acoustid.org/v2/lookup";
const USER_AGENT: &str = concat!("mdfix/", env!("CARGO_PKG_VERSION"));
const RATE_LIMIT_MS: u64 = 334; // 3 requests per second (~333ms between requests)

/// AcoustID error codes that mean the application key was refused
const INVALID_KEY_CODES: [i64; 3] = [4, 5, 6];

/// AcoustID client errors
#[derive(Debug, Error)]
pub enum AcoustIdError {
    #[error("Network error: {0}")]
    NetworkError(String),

    #[error("API error {0}: {1}")]
    ApiError(i64, String),

    #[error("Parse error: {0}")]
    ParseError(String),

    #[error("Invalid API key")]
    InvalidApiKey,
}

/// AcoustID lookup response
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct AcoustIdResponse {
    pub status: String,
    #[serde(default)]
    pub results: Vec<AcoustIdResult>,
    pub error: Option<AcoustIdApiError>,
}

#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct AcoustIdApiError {
    pub code: i64,
    pub message: String,
}

#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct AcoustIdResult {
    pub id: String, // AcoustID
    pub score: f64, // Match confidence (0.0 to 1.0)
    pub recordings: Option<Vec<AcoustIdRecording>>,
}

#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct AcoustIdRecording {
    pub id: String, // MusicBrainz Recording MBID
    pub title: Option<String>,
    pub artists: Option<Vec<AcoustIdArtist>>,
}

#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct AcoustIdArtist {
    pub id: String, // MusicBrainz Artist MBID
    pub name: String,
}

impl AcoustIdResponse {
    /// Flatten results into candidates, preserving the service's ordering
    ///
    /// Each recording of each result becomes one candidate carrying the
    /// result's score. Results without recordings are skipped.
    pub fn candidates(&self) -> Vec<MatchCandidate> {
        self.results
            .iter()
            .flat_map(|result| {
                result.recordings.iter().flatten().map(move |recording| MatchCandidate {
                    score: result.score,
                    recording_id: recording.id.clone(),
                    title: recording.title.clone(),
                    artist: recording.artists.as_ref().and_then(|artists| {
                        let names: Vec<&str> = artists
                            .iter()
                            .map(|a| a.name.as_str())
                            .filter(|n| !n.is_empty())
                            .collect();
                        (!names.is_empty()).then(|| names.join(", "))
                    }),
                })
            })
            .collect()
    }
}

/// Fingerprint match service
#[async_trait]
pub trait MatchService: Send + Sync {
    /// Ranked candidates for a fingerprint, in service order
    async fn lookup(
        &self,
        api_key: &str,
        fingerprint: &Fingerprint,
    ) -> Result<Vec<MatchCandidate>, AcoustIdError>;
}

/// AcoustID API client
pub struct AcoustIdClient {
    http_client: reqwest::Client,
    rate_limiter: RateLimiter,
    base_url: String,
}

impl AcoustIdClient {
    pub fn new() -> Result<Self, AcoustIdError> {
        let http_client = reqwest::Client::builder()
            .user_agent(USER_AGENT)
            .timeout(Duration::from_secs(30))
            .build()
            .map_err(|e| AcoustIdError::NetworkError(e.to_string()))?;

        Ok(Self {
            http_client,
            rate_limiter: RateLimiter::new(Duration::from_millis(RATE_LIMIT_MS)),
            base_url: ACOUSTID_BASE_URL.to_string(),
        })
    }

    /// Override the lookup endpoint
    pub fn with_base_url(mut self, base_url: impl Into<String>) -> Self {
        self.base_url = base_url.into();
        self
    }

    /// Lookup recordings by Chromaprint fingerprint
    pub async fn lookup_raw(
        &self,
        api_key: &str,
        fingerprint: &Fingerprint,
    ) -> Result<AcoustIdResponse, AcoustIdError> {
        self.rate_limiter.wait().await;

        let duration = fingerprint.duration_seconds().to_string();
        let params = [
            ("client", api_key),
            ("meta", "recordings"),
            ("duration", duration.as_str()),
            ("fingerprint", fingerprint.fingerprint.as_str()),
        ];

        tracing::debug!(duration_seconds = %duration, "Querying AcoustID API");

        let response = self
            .http_client
            .post(&self.base_url)
            .form(&params)
            .send()
            .await
            .map_err(|e| AcoustIdError::NetworkError(e.to_string()))?;

        let status = response.status();
        if status == reqwest::StatusCode::UNAUTHORIZED {
            return Err(AcoustIdError::InvalidApiKey);
        }

        // Error details are reported in the JSON body, also for 4xx responses
        let body = response
            .text()
            .await
            .map_err(|e| AcoustIdError::NetworkError(e.to_string()))?;

        let parsed = parse_lookup_response(&body);
        if !status.is_success() {
            return match parsed {
                Err(AcoustIdError::ParseError(_)) => {
                    Err(AcoustIdError::ApiError(i64::from(status.as_u16()), body))
                }
                other => other,
            };
        }
        parsed
    }
}

/// Parse a lookup response body, mapping API-level errors
pub fn parse_lookup_response(body: &str) -> Result<AcoustIdResponse, AcoustIdError> {
    let response: AcoustIdResponse =
        serde_json::from_str(body).map_err(|e| AcoustIdError::ParseError(e.to_string()))?;

    if response.status != "ok" {
        return Err(match &response.error {
            Some(error) if INVALID_KEY_CODES.contains(&error.code) => AcoustIdError::InvalidApiKey,
            Some(error) => AcoustIdError::ApiError(error.code, error.message.clone()),
            None => AcoustIdError::ApiError(0, format!("status {}", response.status)),
        });
    }

    Ok(response)
}

#[async_trait]
impl MatchService for AcoustIdClient {
    async fn lookup(
        &self,
        api_key: &str,
        fingerprint: &Fingerprint,
    ) -> Result<Vec<MatchCandidate>, AcoustIdError> {
        let response = self.lookup_raw(api_key, fingerprint).await?;
        let candidates = response.candidates();

        if let Some(top) = candidates.first() {
            tracing::info!(
                recording = %top.recording_id,
                score = top.score,
                candidates = candidates.len(),
                "AcoustID lookup successful"
            );
        }

        Ok(candidates)
    }
}
