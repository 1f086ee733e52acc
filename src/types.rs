use serde::{Deserialize, Serialize};

/// Spotify application credentials, supplied once at startup from
/// configuration and never mutated.
#[derive(Debug, Clone)]
pub struct Credentials {
    pub client_id: String,
    pub client_secret: String,
    pub redirect_uri: String,
}

/// An access/refresh token pair with its issue time.
///
/// `obtained_at` is a unix timestamp in seconds; the token is stale at or
/// before `obtained_at + expires_in`.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Token {
    pub access_token: String,
    pub refresh_token: String,
    pub expires_in: u64,
    pub obtained_at: u64,
}

/// The currently reported track.
///
/// `id` is the bare Spotify track identifier, i.e. the substring of the
/// track URI after the last `:`.
#[derive(Debug, Clone, PartialEq)]
pub struct Track {
    pub id: String,
    pub name: String,
    pub album: String,
    pub artist: String,
    pub duration_ms: u64,
    pub liked: bool,
}

/// Last known playback truth, owned exclusively by the playback session.
///
/// Replaced wholesale on every successful currently-playing fetch and
/// partially mutated (`is_playing`, `track.liked`, `volume_percent`) by
/// control operations. Starts empty; stale data may remain after a failed
/// poll until the next successful one.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct PlaybackState {
    pub track: Option<Track>,
    pub is_playing: bool,
    pub position_ms: u64,
    pub volume_percent: u8,
}

/// Outcome of a currently-playing fetch.
///
/// An empty player (`item` null or absent) is a success distinct from any
/// error; the previous state is left untouched in that case.
#[derive(Debug, Clone, PartialEq)]
pub enum TrackPoll {
    Playing(PlaybackState),
    NothingPlaying,
}

/// Wire shape of a token-endpoint response.
///
/// `refresh_token` is optional because Spotify does not always reissue one
/// on the refresh grant.
#[derive(Debug, Clone, Deserialize)]
pub struct TokenResponse {
    pub access_token: String,
    #[serde(default)]
    pub refresh_token: Option<String>,
    pub expires_in: u64,
}

/// Wire shape of `GET /me/player/currently-playing`.
#[derive(Debug, Clone, Deserialize)]
pub struct CurrentlyPlayingResponse {
    #[serde(default)]
    pub item: Option<PlayingItem>,
    #[serde(default)]
    pub is_playing: bool,
    #[serde(default)]
    pub progress_ms: Option<u64>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct PlayingItem {
    pub name: String,
    pub uri: String,
    #[serde(default)]
    pub duration_ms: u64,
    pub album: AlbumRef,
    #[serde(default)]
    pub artists: Vec<ArtistRef>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct AlbumRef {
    pub name: String,
}

#[derive(Debug, Clone, Deserialize)]
pub struct ArtistRef {
    pub name: String,
}
