//! Integration tests driving the token manager and playback session
//! against a mock Spotify served by axum on a loopback port.

use std::{
    collections::HashMap,
    sync::{
        Arc,
        atomic::{AtomicUsize, Ordering},
    },
};

use axum::{
    Form, Json, Router,
    extract::Query,
    http::{HeaderMap, StatusCode},
    response::IntoResponse,
    routing::{get, post, put},
};
use base64::{Engine, engine::general_purpose::STANDARD};
use serde_json::{Value, json};
use tokio::sync::Mutex;

use spotdeck::{
    management::TokenManager,
    spotify::player::PlaybackSession,
    types::{Credentials, TrackPoll},
};

fn credentials() -> Credentials {
    Credentials {
        client_id: "id".to_string(),
        client_secret: "secret".to_string(),
        redirect_uri: "http://127.0.0.1:9/callback".to_string(),
    }
}

// Binds the mock on an ephemeral port and returns its base URL.
async fn serve(app: Router) -> String {
    let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();
    tokio::spawn(async move {
        axum::serve(listener, app).await.unwrap();
    });
    format!("http://{addr}")
}

fn token_json() -> Json<Value> {
    Json(json!({
        "access_token": "T1",
        "refresh_token": "R1",
        "expires_in": 3600
    }))
}

// Token endpoint that always hands out T1/R1.
fn token_ok() -> axum::routing::MethodRouter {
    post(|| async { token_json() })
}

async fn authed_session(base: &str) -> PlaybackSession {
    let mut tokens = TokenManager::new(credentials(), format!("{base}/api/token"));
    tokens.acquire("abc").await.unwrap();
    PlaybackSession::new(tokens, format!("{base}/v1"))
}

fn now_playing_json(uri: &str, playing: bool) -> Value {
    json!({
        "is_playing": playing,
        "progress_ms": 30_000,
        "item": {
            "name": "Song",
            "uri": uri,
            "duration_ms": 120_000,
            "album": { "name": "Album" },
            "artists": [{ "name": "X" }, { "name": "Y" }]
        }
    })
}

#[tokio::test]
async fn authorization_code_exchange_populates_token() {
    let seen: Arc<Mutex<Vec<(String, HashMap<String, String>)>>> =
        Arc::new(Mutex::new(Vec::new()));
    let recorded = Arc::clone(&seen);

    let app = Router::new().route(
        "/api/token",
        post(
            move |headers: HeaderMap, Form(form): Form<HashMap<String, String>>| {
                let recorded = Arc::clone(&recorded);
                async move {
                    let auth = headers
                        .get("authorization")
                        .and_then(|v| v.to_str().ok())
                        .unwrap_or_default()
                        .to_string();
                    recorded.lock().await.push((auth, form));
                    token_json()
                }
            },
        ),
    );
    let base = serve(app).await;

    let mut tokens = TokenManager::new(credentials(), format!("{base}/api/token"));
    tokens.acquire("abc").await.unwrap();

    assert!(tokens.is_valid());
    let token = tokens.token().unwrap();
    assert_eq!(token.access_token, "T1");
    assert_eq!(token.refresh_token, "R1");
    assert_eq!(token.expires_in, 3600);

    let seen = seen.lock().await;
    let (auth, form) = &seen[0];
    assert_eq!(auth, &format!("Basic {}", STANDARD.encode("id:secret")));
    assert_eq!(form.get("grant_type").unwrap(), "authorization_code");
    assert_eq!(form.get("code").unwrap(), "abc");
    assert_eq!(
        form.get("redirect_uri").unwrap(),
        "http://127.0.0.1:9/callback"
    );
}

#[tokio::test]
async fn refresh_retains_prior_refresh_token_when_omitted() {
    let app = Router::new().route(
        "/api/token",
        post(|Form(form): Form<HashMap<String, String>>| async move {
            if form.get("grant_type").map(String::as_str) == Some("refresh_token") {
                assert_eq!(form.get("refresh_token").unwrap(), "R1");
                // Spotify does not always reissue a refresh token
                Json(json!({ "access_token": "T2", "expires_in": 3600 }))
            } else {
                token_json()
            }
        }),
    );
    let base = serve(app).await;

    let mut tokens = TokenManager::new(credentials(), format!("{base}/api/token"));
    tokens.acquire("abc").await.unwrap();
    tokens.refresh().await.unwrap();

    assert!(tokens.is_valid());
    let token = tokens.token().unwrap();
    assert_eq!(token.access_token, "T2");
    assert_eq!(token.refresh_token, "R1");
}

#[tokio::test]
async fn failed_refresh_leaves_state_invalid() {
    let app = Router::new().route(
        "/api/token",
        post(|Form(form): Form<HashMap<String, String>>| async move {
            if form.get("grant_type").map(String::as_str) == Some("refresh_token") {
                (StatusCode::BAD_REQUEST, "invalid_grant").into_response()
            } else {
                token_json().into_response()
            }
        }),
    );
    let base = serve(app).await;

    let mut tokens = TokenManager::new(credentials(), format!("{base}/api/token"));
    tokens.acquire("abc").await.unwrap();
    assert!(tokens.is_valid());

    let result = tokens.refresh().await;
    assert!(result.is_err());
    // Validity is checkable right after the failed refresh
    assert!(!tokens.is_valid());
    assert!(tokens.token().is_none());
}

#[tokio::test]
async fn is_liked_depends_on_the_literal_body() {
    let body: Arc<Mutex<String>> = Arc::new(Mutex::new("[ true ]".to_string()));
    let served = Arc::clone(&body);

    let app = Router::new()
        .route("/api/token", token_ok())
        .route(
            "/v1/me/tracks/contains",
            get(move |Query(_q): Query<HashMap<String, String>>| {
                let served = Arc::clone(&served);
                async move { served.lock().await.clone() }
            }),
        );
    let base = serve(app).await;
    let mut session = authed_session(&base).await;

    assert!(session.is_liked("xyz").await.unwrap());

    // Same JSON value, different whitespace: the compact-serialization
    // contract treats it as not liked
    *body.lock().await = "[true]".to_string();
    assert!(!session.is_liked("xyz").await.unwrap());

    *body.lock().await = "[ false ]".to_string();
    assert!(!session.is_liked("xyz").await.unwrap());
}

#[tokio::test]
async fn fetch_maps_fields_and_nothing_playing_keeps_previous_track() {
    let payload: Arc<Mutex<Value>> =
        Arc::new(Mutex::new(now_playing_json("spotify:track:xyz", true)));
    let served = Arc::clone(&payload);

    let app = Router::new()
        .route("/api/token", token_ok())
        .route(
            "/v1/me/player/currently-playing",
            get(move || {
                let served = Arc::clone(&served);
                async move { Json(served.lock().await.clone()) }
            }),
        )
        .route(
            "/v1/me/tracks/contains",
            get(|| async { "[ true ]".to_string() }),
        );
    let base = serve(app).await;
    let mut session = authed_session(&base).await;

    let poll = session.fetch_current_track().await.unwrap();
    let TrackPoll::Playing(state) = poll else {
        panic!("expected a playing state");
    };
    let track = state.track.as_ref().unwrap();
    assert_eq!(track.id, "xyz");
    assert_eq!(track.name, "Song");
    assert_eq!(track.album, "Album");
    assert_eq!(track.artist, "X");
    assert_eq!(track.duration_ms, 120_000);
    assert!(track.liked);
    assert!(state.is_playing);
    assert_eq!(state.position_ms, 30_000);

    // Empty player: distinct success, previous track stays in place
    *payload.lock().await = json!({ "is_playing": false, "item": null });
    let poll = session.fetch_current_track().await.unwrap();
    assert_eq!(poll, TrackPoll::NothingPlaying);
    assert_eq!(session.state().track.as_ref().unwrap().id, "xyz");
}

#[tokio::test]
async fn fetch_falls_back_to_unknown_artist() {
    let app = Router::new()
        .route("/api/token", token_ok())
        .route(
            "/v1/me/player/currently-playing",
            get(|| async {
                Json(json!({
                    "is_playing": true,
                    "progress_ms": 0,
                    "item": {
                        "name": "Song",
                        "uri": "spotify:track:xyz",
                        "duration_ms": 120_000,
                        "album": { "name": "Album" },
                        "artists": []
                    }
                }))
            }),
        )
        .route(
            "/v1/me/tracks/contains",
            get(|| async { "[ false ]".to_string() }),
        );
    let base = serve(app).await;
    let mut session = authed_session(&base).await;

    session.fetch_current_track().await.unwrap();
    let track = session.state().track.as_ref().unwrap();
    assert_eq!(track.artist, "Unknown Artist");
    assert!(!track.liked);
}

#[tokio::test]
async fn toggle_play_pause_from_paused_hits_play_and_refetches_once() {
    let play_hits = Arc::new(AtomicUsize::new(0));
    let pause_hits = Arc::new(AtomicUsize::new(0));
    let fetch_hits = Arc::new(AtomicUsize::new(0));
    let (play, pause, fetch) = (
        Arc::clone(&play_hits),
        Arc::clone(&pause_hits),
        Arc::clone(&fetch_hits),
    );

    let app = Router::new()
        .route("/api/token", token_ok())
        .route(
            "/v1/me/player/play",
            put(move || {
                let play = Arc::clone(&play);
                async move {
                    play.fetch_add(1, Ordering::SeqCst);
                    StatusCode::NO_CONTENT
                }
            }),
        )
        .route(
            "/v1/me/player/pause",
            put(move || {
                let pause = Arc::clone(&pause);
                async move {
                    pause.fetch_add(1, Ordering::SeqCst);
                    StatusCode::NO_CONTENT
                }
            }),
        )
        .route(
            "/v1/me/player/currently-playing",
            get(move || {
                let fetch = Arc::clone(&fetch);
                async move {
                    fetch.fetch_add(1, Ordering::SeqCst);
                    Json(now_playing_json("spotify:track:xyz", true))
                }
            }),
        )
        .route(
            "/v1/me/tracks/contains",
            get(|| async { "[ false ]".to_string() }),
        );
    let base = serve(app).await;
    let mut session = authed_session(&base).await;

    // Fresh session starts paused, so the pre-flip negation picks /play
    session.toggle_play_pause().await.unwrap();

    assert_eq!(play_hits.load(Ordering::SeqCst), 1);
    assert_eq!(pause_hits.load(Ordering::SeqCst), 0);
    assert_eq!(fetch_hits.load(Ordering::SeqCst), 1);
    assert!(session.state().is_playing);
}

#[tokio::test]
async fn toggle_liked_unlikes_a_liked_track() {
    let like_hits = Arc::new(AtomicUsize::new(0));
    let dislike_hits = Arc::new(AtomicUsize::new(0));
    let (like, dislike) = (Arc::clone(&like_hits), Arc::clone(&dislike_hits));

    let app = Router::new()
        .route("/api/token", token_ok())
        .route(
            "/v1/me/player/currently-playing",
            get(|| async { Json(now_playing_json("spotify:track:xyz", true)) }),
        )
        .route(
            "/v1/me/tracks/contains",
            get(|| async { "[ true ]".to_string() }),
        )
        .route(
            "/v1/me/tracks",
            put(move || {
                let like = Arc::clone(&like);
                async move {
                    like.fetch_add(1, Ordering::SeqCst);
                    StatusCode::OK
                }
            })
            .delete(move || {
                let dislike = Arc::clone(&dislike);
                async move {
                    dislike.fetch_add(1, Ordering::SeqCst);
                    StatusCode::OK
                }
            }),
        );
    let base = serve(app).await;
    let mut session = authed_session(&base).await;

    session.fetch_current_track().await.unwrap();
    assert!(session.state().track.as_ref().unwrap().liked);

    session.toggle_liked("xyz").await.unwrap();

    assert_eq!(dislike_hits.load(Ordering::SeqCst), 1);
    assert_eq!(like_hits.load(Ordering::SeqCst), 0);
    assert!(!session.state().track.as_ref().unwrap().liked);
}

#[tokio::test]
async fn set_volume_updates_local_state_only_on_success() {
    let queries: Arc<Mutex<Vec<HashMap<String, String>>>> = Arc::new(Mutex::new(Vec::new()));
    let recorded = Arc::clone(&queries);

    let app = Router::new().route("/api/token", token_ok()).route(
        "/v1/me/player/volume",
        put(move |Query(q): Query<HashMap<String, String>>| {
            let recorded = Arc::clone(&recorded);
            async move {
                recorded.lock().await.push(q);
                StatusCode::NO_CONTENT
            }
        }),
    );
    let base = serve(app).await;
    let mut session = authed_session(&base).await;

    session.set_volume(42).await.unwrap();
    assert_eq!(session.state().volume_percent, 42);
    assert_eq!(
        queries.lock().await[0].get("volume_percent").unwrap(),
        "42"
    );

    // Now a server that rejects the call: no local update
    let app = Router::new().route("/api/token", token_ok()).route(
        "/v1/me/player/volume",
        put(|| async { (StatusCode::NOT_FOUND, "no active device") }),
    );
    let base = serve(app).await;
    let mut session = authed_session(&base).await;

    assert!(session.set_volume(15).await.is_err());
    assert_eq!(session.state().volume_percent, 0);
}

#[tokio::test]
async fn play_album_sends_context_uri_and_reconciles() {
    let bodies: Arc<Mutex<Vec<String>>> = Arc::new(Mutex::new(Vec::new()));
    let recorded = Arc::clone(&bodies);
    let fetch_hits = Arc::new(AtomicUsize::new(0));
    let fetch = Arc::clone(&fetch_hits);

    let app = Router::new()
        .route("/api/token", token_ok())
        .route(
            "/v1/me/player/play",
            put(move |body: String| {
                let recorded = Arc::clone(&recorded);
                async move {
                    recorded.lock().await.push(body);
                    StatusCode::NO_CONTENT
                }
            }),
        )
        .route(
            "/v1/me/player/currently-playing",
            get(move || {
                let fetch = Arc::clone(&fetch);
                async move {
                    fetch.fetch_add(1, Ordering::SeqCst);
                    Json(now_playing_json("spotify:track:first", true))
                }
            }),
        )
        .route(
            "/v1/me/tracks/contains",
            get(|| async { "[ false ]".to_string() }),
        );
    let base = serve(app).await;
    let mut session = authed_session(&base).await;

    session.play_album("spotify:album:42").await.unwrap();

    let bodies = bodies.lock().await;
    let body: Value = serde_json::from_str(&bodies[0]).unwrap();
    assert_eq!(body["context_uri"], "spotify:album:42");
    assert_eq!(fetch_hits.load(Ordering::SeqCst), 1);
    assert_eq!(session.state().track.as_ref().unwrap().id, "first");
}

#[tokio::test]
async fn playback_calls_carry_the_bearer_token() {
    let auth_headers: Arc<Mutex<Vec<String>>> = Arc::new(Mutex::new(Vec::new()));
    let recorded = Arc::clone(&auth_headers);

    let app = Router::new()
        .route("/api/token", token_ok())
        .route(
            "/v1/me/tracks/contains",
            get(move |headers: HeaderMap| {
                let recorded = Arc::clone(&recorded);
                async move {
                    let auth = headers
                        .get("authorization")
                        .and_then(|v| v.to_str().ok())
                        .unwrap_or_default()
                        .to_string();
                    recorded.lock().await.push(auth);
                    "[ false ]".to_string()
                }
            }),
        );
    let base = serve(app).await;
    let mut session = authed_session(&base).await;

    session.is_liked("xyz").await.unwrap();
    assert_eq!(auth_headers.lock().await[0], "Bearer T1");
}
