//! AcoustID and MusicBrainz clients against local HTTP stand-ins
//!
//! Each test serves a small axum router on an ephemeral port and points a
//! fresh client at it, so the status code mappings the identifier relies on
//! are exercised over real HTTP.

use axum::{
    extract::Path,
    http::StatusCode,
    response::{IntoResponse, Response},
    routing::{get, post},
    Form, Json, Router,
};
use mdfix_tagger::services::{
    AcoustIdClient, AcoustIdError, ArtistCredit, Fingerprint, MatchService, MusicBrainzClient,
    MusicBrainzError, RecordingLookup,
};
use serde_json::json;
use std::collections::HashMap;
use std::net::SocketAddr;

const APP_KEY: &str = "app-key";

async fn serve(app: Router) -> SocketAddr {
    let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();
    tokio::spawn(async move {
        axum::serve(listener, app).await.unwrap();
    });
    addr
}

fn fingerprint() -> Fingerprint {
    Fingerprint {
        duration: 212.4,
        fingerprint: "AQADtMmybfGO8NCNEESLnzHyXNOHeHnG".to_string(),
    }
}

/// Lookup endpoint that only accepts [`APP_KEY`]
async fn lookup(Form(params): Form<HashMap<String, String>>) -> Response {
    if params.get("client").map(String::as_str) != Some(APP_KEY) {
        return (StatusCode::UNAUTHORIZED, "unknown application").into_response();
    }
    if params.get("meta").map(String::as_str) != Some("recordings")
        || params.get("duration").map(String::as_str) != Some("212")
    {
        return (StatusCode::BAD_REQUEST, "unexpected parameters").into_response();
    }

    Json(json!({
        "status": "ok",
        "results": [
            {
                "id": "acoustid-1",
                "score": 0.93,
                "recordings": [
                    {"id": "mbid-first", "title": "Opening", "artists": [{"id": "a1", "name": "Band"}]},
                    {"id": "mbid-second"}
                ]
            },
            {
                "id": "acoustid-2",
                "score": 0.41,
                "recordings": [{"id": "mbid-third"}]
            }
        ]
    }))
    .into_response()
}

async fn rejected_fingerprint() -> Response {
    (
        StatusCode::BAD_REQUEST,
        Json(json!({
            "status": "error",
            "error": {"code": 3, "message": "invalid fingerprint"}
        })),
    )
        .into_response()
}

async fn acoustid_server() -> SocketAddr {
    serve(
        Router::new()
            .route("/v2/lookup", post(lookup))
            .route("/v2/rejecting", post(rejected_fingerprint)),
    )
    .await
}

fn acoustid_client(addr: SocketAddr, path: &str) -> AcoustIdClient {
    AcoustIdClient::new()
        .unwrap()
        .with_base_url(format!("http://{}{}", addr, path))
}

#[tokio::test]
async fn test_acoustid_unauthorized_is_invalid_key() {
    let addr = acoustid_server().await;

    let result = acoustid_client(addr, "/v2/lookup")
        .lookup("revoked-key", &fingerprint())
        .await;

    assert!(matches!(result, Err(AcoustIdError::InvalidApiKey)));
}

#[tokio::test]
async fn test_acoustid_candidates_in_service_order() {
    let addr = acoustid_server().await;

    let candidates = acoustid_client(addr, "/v2/lookup")
        .lookup(APP_KEY, &fingerprint())
        .await
        .unwrap();

    let ids: Vec<&str> = candidates.iter().map(|c| c.recording_id.as_str()).collect();
    assert_eq!(ids, vec!["mbid-first", "mbid-second", "mbid-third"]);
    assert_eq!(candidates[0].score, 0.93);
    assert_eq!(candidates[0].artist.as_deref(), Some("Band"));
    assert_eq!(candidates[1].score, 0.93);
    assert_eq!(candidates[2].score, 0.41);
}

#[tokio::test]
async fn test_acoustid_error_body_on_bad_request() {
    let addr = acoustid_server().await;

    match acoustid_client(addr, "/v2/rejecting")
        .lookup(APP_KEY, &fingerprint())
        .await
    {
        Err(AcoustIdError::ApiError(code, message)) => {
            assert_eq!(code, 3);
            assert_eq!(message, "invalid fingerprint");
        }
        other => panic!("Expected ApiError, got {:?}", other),
    }
}

/// Recording endpoint whose behavior is chosen by the requested id
async fn recording(Path(id): Path<String>) -> Response {
    match id.as_str() {
        "missing" => (StatusCode::NOT_FOUND, "not found").into_response(),
        "busy" => (StatusCode::SERVICE_UNAVAILABLE, "slow down").into_response(),
        "broken" => (StatusCode::INTERNAL_SERVER_ERROR, "database down").into_response(),
        _ => Json(json!({
            "id": id,
            "title": "Opening",
            "artist-credit": [
                {"name": "Band", "joinphrase": "", "artist": {"id": "a1", "name": "Band"}}
            ],
            "releases": [{"id": "r1", "title": "Debut", "date": "1994-03"}]
        }))
        .into_response(),
    }
}

async fn musicbrainz_client() -> MusicBrainzClient {
    let addr = serve(Router::new().route("/ws/2/recording/:id", get(recording))).await;
    MusicBrainzClient::new()
        .unwrap()
        .with_base_url(format!("http://{}/ws/2", addr))
}

#[tokio::test]
async fn test_musicbrainz_not_found() {
    let result = musicbrainz_client().await.lookup_recording("missing").await;

    match result {
        Err(MusicBrainzError::RecordingNotFound(id)) => assert_eq!(id, "missing"),
        other => panic!("Expected RecordingNotFound, got {:?}", other),
    }
}

#[tokio::test]
async fn test_musicbrainz_unavailable_counts_as_network_failure() {
    let error = musicbrainz_client()
        .await
        .lookup_recording("busy")
        .await
        .unwrap_err();

    assert!(matches!(error, MusicBrainzError::RateLimitExceeded));
    assert!(error.is_network());
}

#[tokio::test]
async fn test_musicbrainz_server_error_is_not_network() {
    let error = musicbrainz_client()
        .await
        .lookup_recording("broken")
        .await
        .unwrap_err();

    match &error {
        MusicBrainzError::ApiError(status, body) => {
            assert_eq!(*status, 500);
            assert_eq!(body, "database down");
        }
        other => panic!("Expected ApiError, got {:?}", other),
    }
    assert!(!error.is_network());
}

#[tokio::test]
async fn test_musicbrainz_recording_parsed() {
    let recording = musicbrainz_client()
        .await
        .lookup_recording("mbid-first")
        .await
        .unwrap();

    assert_eq!(recording.id, "mbid-first");
    assert_eq!(recording.title.as_deref(), Some("Opening"));
    assert_eq!(recording.artist_credit, vec![ArtistCredit::Named("Band".to_string())]);
    assert_eq!(recording.releases[0].date.as_deref(), Some("1994-03"));
}
