//! The playback session: device-level intents translated into Spotify Web
//! API calls, with the in-memory [`PlaybackState`] tracking the last known
//! server truth.
//!
//! The session holds one shared HTTP client; requests never overlap because
//! everything runs from a single control loop. Several operations update
//! local state optimistically and reconcile with an unconditional follow-up
//! fetch — a failed toggle therefore self-corrects on the very next
//! exchange. Nothing here renders: callers receive outcomes and decide
//! when and what to draw.

use std::time::Duration;

use reqwest::{Client, Response, StatusCode, header::CONTENT_LENGTH};
use tokio::time::sleep;

use crate::{
    error::ApiError,
    management::TokenManager,
    types::{CurrentlyPlayingResponse, PlaybackState, Track, TrackPoll},
    utils, warning,
};

/// Playback state is not immediately consistent after starting an album;
/// the follow-up fetch waits out this grace period first.
const ALBUM_SETTLE_DELAY: Duration = Duration::from_secs(1);

/// Issues playback API calls and owns the [`PlaybackState`].
pub struct PlaybackSession {
    client: Client,
    api_url: String,
    tokens: TokenManager,
    state: PlaybackState,
}

impl PlaybackSession {
    /// Creates a session over an already-constructed token manager.
    ///
    /// `api_url` is the Web API base including the version segment, e.g.
    /// `https://api.spotify.com/v1`.
    pub fn new(tokens: TokenManager, api_url: String) -> Self {
        PlaybackSession {
            client: Client::new(),
            api_url,
            tokens,
            state: PlaybackState::default(),
        }
    }

    /// Last known playback state. Empty until the first successful fetch.
    pub fn state(&self) -> &PlaybackState {
        &self.state
    }

    /// Fetches the currently playing track and replaces the local state.
    ///
    /// An empty player (`item` null or absent) returns
    /// [`TrackPoll::NothingPlaying`] and leaves the previous state
    /// untouched — stale data keeps showing until something plays again.
    /// The liked flag is re-checked per fetch; a failed liked lookup is
    /// logged and shown as not liked, as losing the flag is preferable to
    /// failing the whole poll. Non-200 responses and malformed bodies
    /// propagate without mutating state.
    pub async fn fetch_current_track(&mut self) -> Result<TrackPoll, ApiError> {
        let token = self.bearer().await?;
        let response = self
            .client
            .get(format!("{}/me/player/currently-playing", self.api_url))
            .bearer_auth(&token)
            .send()
            .await?;

        if response.status() != StatusCode::OK {
            return Err(status_error("fetching current track", response).await);
        }

        let body = response.text().await?;
        let parsed: CurrentlyPlayingResponse = serde_json::from_str(&body)?;

        let Some(item) = parsed.item else {
            return Ok(TrackPoll::NothingPlaying);
        };

        let track_id = utils::track_id_from_uri(&item.uri).to_string();
        let liked = match self.is_liked(&track_id).await {
            Ok(liked) => liked,
            Err(e) => {
                warning!("Liked check failed: {}", e);
                false
            }
        };

        self.state.track = Some(Track {
            id: track_id,
            name: item.name,
            album: item.album.name,
            artist: utils::primary_artist(&item.artists),
            duration_ms: item.duration_ms,
            liked,
        });
        self.state.is_playing = parsed.is_playing;
        self.state.position_ms = parsed.progress_ms.unwrap_or(0);

        Ok(TrackPoll::Playing(self.state.clone()))
    }

    /// Checks whether a track is in the user's liked songs.
    ///
    /// True iff the response body is exactly the literal `"[ true ]"` —
    /// the API's compact array serialization is relied on verbatim, a
    /// deliberate, load-bearing contract covered by tests.
    pub async fn is_liked(&mut self, track_id: &str) -> Result<bool, ApiError> {
        let token = self.bearer().await?;
        let response = self
            .client
            .get(format!(
                "{}/me/tracks/contains?ids={}",
                self.api_url, track_id
            ))
            .bearer_auth(&token)
            .send()
            .await?;

        if response.status() != StatusCode::OK {
            return Err(status_error("checking liked status", response).await);
        }

        let body = response.text().await?;
        Ok(body == "[ true ]")
    }

    /// Flips the liked status of a track.
    ///
    /// Re-checks the current status, flips the local flag optimistically
    /// to the new value, then issues the matching like/unlike call. Ok
    /// means the round trip succeeded, not that the track ended up liked.
    pub async fn toggle_liked(&mut self, track_id: &str) -> Result<(), ApiError> {
        let liked_now = self.is_liked(track_id).await?;

        if let Some(track) = self.state.track.as_mut() {
            track.liked = !liked_now;
        }

        if liked_now {
            self.dislike_song(track_id).await
        } else {
            self.like_song(track_id).await
        }
    }

    /// Adds a track to the user's liked songs. Spotify answers 200 here,
    /// not 204.
    async fn like_song(&mut self, track_id: &str) -> Result<(), ApiError> {
        let token = self.bearer().await?;
        let body = serde_json::json!({ "ids": [track_id] });
        let response = self
            .client
            .put(format!("{}/me/tracks?ids={}", self.api_url, track_id))
            .bearer_auth(&token)
            .json(&body)
            .send()
            .await?;

        if response.status() != StatusCode::OK {
            return Err(status_error("adding to liked songs", response).await);
        }
        Ok(())
    }

    /// Removes a track from the user's liked songs; success is 200.
    async fn dislike_song(&mut self, track_id: &str) -> Result<(), ApiError> {
        let token = self.bearer().await?;
        let response = self
            .client
            .delete(format!("{}/me/tracks?ids={}", self.api_url, track_id))
            .bearer_auth(&token)
            .send()
            .await?;

        if response.status() != StatusCode::OK {
            return Err(status_error("removing from liked songs", response).await);
        }
        Ok(())
    }

    /// Toggles between play and pause.
    ///
    /// The local flag flips optimistically before the call and the
    /// endpoint is chosen from the pre-flip state's negation. The
    /// follow-up fetch runs whether or not the PUT succeeded, so the
    /// optimistic flip is reconciled against server truth either way.
    pub async fn toggle_play_pause(&mut self) -> Result<(), ApiError> {
        let was_playing = self.state.is_playing;
        self.state.is_playing = !was_playing;
        let verb = if was_playing { "pause" } else { "play" };

        let outcome = self
            .put_no_body(&format!("me/player/{verb}"), "toggling playback")
            .await;

        if let Err(e) = self.fetch_current_track().await {
            warning!("State reconcile after play/pause failed: {}", e);
        }
        outcome
    }

    /// Skips to the next track; always reconciles with a follow-up fetch.
    pub async fn skip_forward(&mut self) -> Result<(), ApiError> {
        let outcome = self.post_player("next").await;
        if let Err(e) = self.fetch_current_track().await {
            warning!("State reconcile after skip failed: {}", e);
        }
        outcome
    }

    /// Returns to the previous track; always reconciles with a follow-up
    /// fetch.
    pub async fn skip_back(&mut self) -> Result<(), ApiError> {
        let outcome = self.post_player("previous").await;
        if let Err(e) = self.fetch_current_track().await {
            warning!("State reconcile after skip failed: {}", e);
        }
        outcome
    }

    /// Sets the player volume.
    ///
    /// Unlike play/pause there is no optimistic update: the local
    /// `volume_percent` changes only after the server confirmed with 204.
    pub async fn set_volume(&mut self, percent: u8) -> Result<(), ApiError> {
        let percent = percent.min(100);
        self.put_no_body(
            &format!("me/player/volume?volume_percent={percent}"),
            "setting volume",
        )
        .await?;

        self.state.volume_percent = percent;
        Ok(())
    }

    /// Starts playback of a context (e.g. an album) by its URI.
    ///
    /// After the PUT the session waits out a fixed settle delay before the
    /// reconciling fetch, because playback state lags behind this call.
    pub async fn play_album(&mut self, context_uri: &str) -> Result<(), ApiError> {
        let token = self.bearer().await?;
        let body = serde_json::json!({ "context_uri": context_uri });
        let outcome = match self
            .client
            .put(format!("{}/me/player/play", self.api_url))
            .bearer_auth(&token)
            .json(&body)
            .send()
            .await
        {
            Ok(response) if response.status() == StatusCode::NO_CONTENT => Ok(()),
            Ok(response) => Err(status_error("starting album", response).await),
            Err(e) => Err(ApiError::Transport(e)),
        };

        sleep(ALBUM_SETTLE_DELAY).await;
        if let Err(e) = self.fetch_current_track().await {
            warning!("State reconcile after album start failed: {}", e);
        }
        outcome
    }

    /// Empty-body PUT to a player endpoint; 204 is the only success.
    async fn put_no_body(&mut self, path: &str, action: &str) -> Result<(), ApiError> {
        let token = self.bearer().await?;
        let response = self
            .client
            .put(format!("{}/{}", self.api_url, path))
            .bearer_auth(&token)
            .header(CONTENT_LENGTH, "0")
            .send()
            .await?;

        if response.status() != StatusCode::NO_CONTENT {
            return Err(status_error(action, response).await);
        }
        Ok(())
    }

    /// Empty POST to `me/player/<verb>`; 204 is the only success.
    async fn post_player(&mut self, verb: &str) -> Result<(), ApiError> {
        let token = self.bearer().await?;
        let response = self
            .client
            .post(format!("{}/me/player/{}", self.api_url, verb))
            .bearer_auth(&token)
            .send()
            .await?;

        if response.status() != StatusCode::NO_CONTENT {
            return Err(status_error("skipping track", response).await);
        }
        Ok(())
    }

    /// A bearer token checked for staleness right before the call. Auth
    /// failures surface as a normal `ApiError` like any other failed
    /// exchange.
    async fn bearer(&mut self) -> Result<String, ApiError> {
        Ok(self.tokens.bearer().await?)
    }
}

/// Builds the status error for a non-success response, logging it with the
/// body the way every failed exchange is logged.
async fn status_error(action: &str, response: Response) -> ApiError {
    let status = response.status();
    let body = response.text().await.unwrap_or_default();
    warning!("Error {}: {} {}", action, status, body);
    ApiError::Status { status, body }
}
