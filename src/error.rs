//! Error taxonomy for token and playback operations.
//!
//! Every operation returns a `Result` to its caller; nothing in the control
//! loop panics on a failed exchange. Non-success HTTP responses keep the
//! raw body for diagnostics.

use reqwest::StatusCode;
use thiserror::Error;

/// Failures surfaced by playback operations against the Spotify Web API.
#[derive(Debug, Error)]
pub enum ApiError {
    /// Connection, DNS or TLS failure before a status code was received.
    #[error("transport failure: {0}")]
    Transport(#[from] reqwest::Error),

    /// The API answered with a status the operation does not accept.
    #[error("unexpected status {status}: {body}")]
    Status { status: StatusCode, body: String },

    /// The response body did not have the expected JSON shape.
    #[error("malformed response: {0}")]
    Parse(#[from] serde_json::Error),

    /// No usable bearer token; acquiring or refreshing one failed.
    #[error(transparent)]
    Auth(#[from] AuthError),
}

/// Failures specific to the OAuth2 token exchange.
#[derive(Debug, Error)]
pub enum AuthError {
    #[error("transport failure: {0}")]
    Transport(#[from] reqwest::Error),

    #[error("token endpoint returned {status}: {body}")]
    Status { status: StatusCode, body: String },

    #[error("malformed token response: {0}")]
    Parse(#[from] serde_json::Error),

    /// An operation needed a token before any grant succeeded.
    #[error("not authenticated; complete the authorization flow first")]
    NotAuthenticated,
}
