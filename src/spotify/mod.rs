//! # Spotify Integration Module
//!
//! The HTTP layer against Spotify's services, split by concern:
//!
//! - [`auth`] - OAuth2 token grants (authorization-code and refresh-token)
//!   against the accounts service, authenticated with HTTP Basic built from
//!   the client id and secret.
//! - [`player`] - The playback session: translates device-level intents
//!   (toggle play, skip, like, volume, play album) into Web API calls and
//!   keeps the in-memory [`crate::types::PlaybackState`] consistent with
//!   the last known server truth.
//!
//! All exchanges are plain request/response over `reqwest`; failures map
//! into the taxonomy in [`crate::error`] and are never retried here — the
//! driver decides whether the next poll or button press tries again.

pub mod auth;
pub mod player;
