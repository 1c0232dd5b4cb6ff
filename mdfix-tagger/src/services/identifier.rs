//! Fingerprint identification
//!
//! Fingerprints a file, asks the match service for candidates and turns the
//! first acceptable candidate into a [`TagSet`] using MusicBrainz metadata.
//!
//! Every external call is fallible; a failed identification yields `None`
//! and leaves the decision about filename fallback to the caller.

use crate::services::acoustid_client::MatchService;
use crate::services::fingerprinter::Fingerprinter;
use crate::services::musicbrainz_client::{Recording, RecordingLookup};
use crate::types::{MatchCandidate, TagSet};
use mdfix_common::config::PacingConfig;
use std::path::Path;
use std::sync::Arc;
use std::time::Duration;
use tracing::{debug, error, warn};

/// Candidates must score strictly above this value
pub const ACCEPTANCE_THRESHOLD: f64 = 0.6;

/// Shortest allowed pause between fingerprint lookups
pub const MIN_LOOKUP_INTERVAL_MS: u64 = 1200;

/// Delays imposed around external requests
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Pacing {
    /// After every successful fingerprint lookup
    pub lookup_interval: Duration,
    /// After a failed fingerprint lookup
    pub failure_backoff: Duration,
    /// After a network error while fetching a recording
    pub fetch_retry_delay: Duration,
}

impl Default for Pacing {
    fn default() -> Self {
        Self::from(&PacingConfig::default())
    }
}

impl From<&PacingConfig> for Pacing {
    fn from(config: &PacingConfig) -> Self {
        let lookup_interval_ms = config.lookup_interval_ms.max(MIN_LOOKUP_INTERVAL_MS);
        if lookup_interval_ms != config.lookup_interval_ms {
            warn!(
                configured = config.lookup_interval_ms,
                "lookup_interval_ms below AcoustID limit, using {}ms",
                MIN_LOOKUP_INTERVAL_MS
            );
        }

        Self {
            lookup_interval: Duration::from_millis(lookup_interval_ms),
            failure_backoff: Duration::from_millis(config.failure_backoff_ms),
            fetch_retry_delay: Duration::from_millis(config.fetch_retry_delay_ms),
        }
    }
}

/// True if a candidate passes the acceptance threshold
pub fn is_acceptable(candidate: &MatchCandidate) -> bool {
    candidate.score > ACCEPTANCE_THRESHOLD
}

/// Build the tag set for an accepted candidate from its recording
pub fn build_tag_set(candidate: &MatchCandidate, recording: &Recording) -> TagSet {
    let first_release = recording.releases.first();

    TagSet {
        title: recording
            .title
            .clone()
            .or_else(|| candidate.title.clone())
            .or_else(|| Some(String::new())),
        artist: Some(recording.artist_names().unwrap_or_default()),
        album: first_release.map(|r| r.title.clone().unwrap_or_default()),
        date: first_release.map(|r| r.date.clone().unwrap_or_default()),
    }
}

/// Fingerprint identifier
pub struct Identifier {
    fingerprinter: Arc<dyn Fingerprinter>,
    match_service: Arc<dyn MatchService>,
    recordings: Arc<dyn RecordingLookup>,
    pacing: Pacing,
}

impl Identifier {
    pub fn new(
        fingerprinter: Arc<dyn Fingerprinter>,
        match_service: Arc<dyn MatchService>,
        recordings: Arc<dyn RecordingLookup>,
        pacing: Pacing,
    ) -> Self {
        Self {
            fingerprinter,
            match_service,
            recordings,
            pacing,
        }
    }

    /// Identify a track, returning the tags to write
    ///
    /// **Algorithm:**
    /// 1. Fingerprint and look up candidates; on failure back off and give up
    /// 2. Wait the lookup interval regardless of response time
    /// 3. Walk candidates in service order, accepting scores above 0.6
    /// 4. Fetch the recording; a network error waits, then tries the next candidate
    /// 5. Build tags from the first successful fetch
    pub async fn identify(&self, track: &Path, api_key: &str) -> Option<TagSet> {
        let candidates = match self.lookup_candidates(track, api_key).await {
            Ok(candidates) => candidates,
            Err(message) => {
                warn!(file = %track.display(), "Fingerprinting failed: {}", message);
                tokio::time::sleep(self.pacing.failure_backoff).await;
                return None;
            }
        };

        // respect rate limit
        tokio::time::sleep(self.pacing.lookup_interval).await;

        for candidate in candidates.iter().filter(|c| is_acceptable(c)) {
            debug!(
                file = %track.display(),
                recording = %candidate.recording_id,
                score = candidate.score,
                "Accepted candidate"
            );

            match self.recordings.lookup_recording(&candidate.recording_id).await {
                Ok(recording) => return Some(build_tag_set(candidate, &recording)),
                Err(e) if e.is_network() => {
                    warn!(
                        file = %track.display(),
                        recording = %candidate.recording_id,
                        "Network error: {}. Retrying after {:?}...",
                        e,
                        self.pacing.fetch_retry_delay
                    );
                    tokio::time::sleep(self.pacing.fetch_retry_delay).await;
                }
                Err(e) => {
                    error!(
                        file = %track.display(),
                        recording = %candidate.recording_id,
                        "Error fetching MusicBrainz data: {}",
                        e
                    );
                }
            }
        }

        None
    }

    async fn lookup_candidates(
        &self,
        track: &Path,
        api_key: &str,
    ) -> Result<Vec<MatchCandidate>, String> {
        let fingerprint = self
            .fingerprinter
            .fingerprint(track)
            .await
            .map_err(|e| e.to_string())?;

        self.match_service
            .lookup(api_key, &fingerprint)
            .await
            .map_err(|e| e.to_string())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::services::musicbrainz_client::{ArtistCredit, Release};

    fn candidate(score: f64) -> MatchCandidate {
        MatchCandidate {
            score,
            recording_id: "mbid".to_string(),
            title: Some("Provisional".to_string()),
            artist: Some("Someone".to_string()),
        }
    }

    #[test]
    fn test_threshold_is_strict() {
        assert!(is_acceptable(&candidate(0.61)));
        assert!(!is_acceptable(&candidate(0.6)));
        assert!(!is_acceptable(&candidate(0.2)));
    }

    #[test]
    fn test_pacing_from_config() {
        let pacing = Pacing::default();
        assert_eq!(pacing.lookup_interval, Duration::from_millis(1200));
        assert_eq!(pacing.failure_backoff, Duration::from_secs(1));
        assert_eq!(pacing.fetch_retry_delay, Duration::from_secs(3));
    }

    #[test]
    fn test_lookup_interval_cannot_go_below_limit() {
        let fast = PacingConfig {
            lookup_interval_ms: 0,
            ..PacingConfig::default()
        };
        assert_eq!(Pacing::from(&fast).lookup_interval, Duration::from_millis(1200));

        let slow = PacingConfig {
            lookup_interval_ms: 2500,
            ..PacingConfig::default()
        };
        assert_eq!(Pacing::from(&slow).lookup_interval, Duration::from_millis(2500));
    }

    #[test]
    fn test_build_tag_set_full() {
        let recording = Recording {
            id: "mbid".to_string(),
            title: Some("Real Title".to_string()),
            artist_credit: vec![
                ArtistCredit::Named("A".to_string()),
                ArtistCredit::Plain("B".to_string()),
            ],
            releases: vec![
                Release {
                    title: Some("Album".to_string()),
                    date: Some("1999".to_string()),
                },
                Release {
                    title: Some("Other".to_string()),
                    date: None,
                },
            ],
        };

        let tags = build_tag_set(&candidate(0.9), &recording);
        assert_eq!(tags.title.as_deref(), Some("Real Title"));
        assert_eq!(tags.artist.as_deref(), Some("A, B"));
        assert_eq!(tags.album.as_deref(), Some("Album"));
        assert_eq!(tags.date.as_deref(), Some("1999"));
    }

    #[test]
    fn test_build_tag_set_falls_back_to_provisional_title() {
        let recording = Recording {
            id: "mbid".to_string(),
            title: None,
            artist_credit: vec![],
            releases: vec![],
        };

        let tags = build_tag_set(&candidate(0.9), &recording);
        assert_eq!(tags.title.as_deref(), Some("Provisional"));
        assert_eq!(tags.artist.as_deref(), Some(""));
        assert_eq!(tags.album, None);
        assert_eq!(tags.date, None);
    }
}
